//! Single-pass declaration scanner over the lexer's token stream.
//!
//! The scanner is a small state machine. It tracks brace frames so that only
//! top-level declarations (directly in a file or a braced namespace) are
//! reported, and records method signatures found directly in a type body.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use phf::phf_set;

use super::lexer::{Token, TokenKind};
use super::FileTypes;
use crate::catalog::{qualify, MethodDescriptor, TypeDescriptor, TypeKind, Visibility};

static TYPE_MODIFIERS: phf::Set<&'static str> = phf_set! {
    "abstract",
    "final",
    "readonly",
};

static MEMBER_MODIFIERS: phf::Set<&'static str> = phf_set! {
    "public",
    "protected",
    "private",
    "static",
    "abstract",
    "final",
    "readonly",
    "var",
};

/// An open brace and what it belongs to.
#[derive(Debug, Clone, Copy)]
enum Frame {
    Namespace,
    /// Body of the type at this index in the output.
    Type(usize),
    Block,
}

#[derive(Debug, Clone, Copy, Default)]
struct TypeModifiers {
    is_abstract: bool,
    is_final: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct MemberModifiers {
    visibility: Option<Visibility>,
    is_static: bool,
    is_abstract: bool,
    awaiting_name: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    None,
    Extends,
    Implements,
}

#[derive(Debug, Default)]
struct ImportState {
    prefix: Option<String>,
    current: String,
    alias: Option<String>,
    in_alias: bool,
    started: bool,
    skip: bool,
}

#[derive(Debug)]
enum State {
    Idle,
    Namespace(String),
    Import(ImportState),
    TypeName {
        kind: TypeKind,
        modifiers: TypeModifiers,
    },
    TypeHeader {
        index: usize,
        clause: Clause,
        current: String,
    },
}

pub(super) struct Scanner {
    file: PathBuf,
    state: State,
    frames: Vec<Frame>,
    namespace: String,
    first_namespace: Option<String>,
    /// Lowercased alias -> fully-qualified target.
    imports: HashMap<String, String>,
    pending: TypeModifiers,
    member: MemberModifiers,
    types: Vec<TypeDescriptor>,
    completed: usize,
}

impl Scanner {
    pub(super) fn new(file: &Path) -> Self {
        Self {
            file: file.to_path_buf(),
            state: State::Idle,
            frames: Vec::new(),
            namespace: String::new(),
            first_namespace: None,
            imports: HashMap::new(),
            pending: TypeModifiers::default(),
            member: MemberModifiers::default(),
            types: Vec::new(),
            completed: 0,
        }
    }

    /// Run over `tokens`, stopping once `limit` declarations have closed.
    pub(super) fn run(mut self, tokens: &[Token<'_>], limit: Option<usize>) -> FileTypes {
        let mut prev: Option<Token<'_>> = None;
        for token in tokens.iter().filter(|t| !t.is_trivia()) {
            self.step(token, prev.as_ref());
            if limit.is_some_and(|n| self.completed >= n) {
                break;
            }
            prev = Some(*token);
        }

        let mut types = self.types;
        if let Some(n) = limit {
            types.truncate(n);
        }
        FileTypes {
            namespace: self.first_namespace.unwrap_or(self.namespace),
            types,
        }
    }

    fn step(&mut self, tok: &Token<'_>, prev: Option<&Token<'_>>) {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => self.idle(tok, prev),
            State::Namespace(text) => self.namespace_step(tok, text),
            State::Import(import) => self.import_step(tok, import),
            State::TypeName { kind, modifiers } => {
                if tok.kind == TokenKind::Ident {
                    self.open_type(kind, modifiers, tok.text);
                } else {
                    self.idle(tok, prev);
                }
            }
            State::TypeHeader {
                index,
                clause,
                current,
            } => self.header_step(tok, index, clause, current),
        }
    }

    fn at_declaration_scope(&self) -> bool {
        self.frames.iter().all(|f| matches!(f, Frame::Namespace))
    }

    fn idle(&mut self, tok: &Token<'_>, prev: Option<&Token<'_>>) {
        if tok.is_punct('}') {
            self.close_frame();
            return;
        }

        if let Some(Frame::Type(index)) = self.frames.last().copied() {
            self.member_step(tok, index);
            return;
        }

        if tok.is_punct('{') {
            self.frames.push(Frame::Block);
            self.pending = TypeModifiers::default();
            return;
        }

        if !self.at_declaration_scope() || tok.kind != TokenKind::Ident {
            self.pending = TypeModifiers::default();
            return;
        }

        let lower = tok.text.to_ascii_lowercase();
        if TYPE_MODIFIERS.contains(lower.as_str()) {
            match lower.as_str() {
                "abstract" => self.pending.is_abstract = true,
                "final" => self.pending.is_final = true,
                _ => {}
            }
            return;
        }

        let modifiers = std::mem::take(&mut self.pending);
        match lower.as_str() {
            "namespace" => self.state = State::Namespace(String::new()),
            "use" => self.state = State::Import(ImportState::default()),
            _ => {
                if let Some(kind) = TypeKind::from_keyword(&lower) {
                    if !is_member_access(prev) {
                        self.state = State::TypeName { kind, modifiers };
                    }
                }
            }
        }
    }

    fn close_frame(&mut self) {
        match self.frames.pop() {
            Some(Frame::Type(_)) => self.completed += 1,
            Some(Frame::Namespace) => {
                self.namespace.clear();
                self.imports.clear();
            }
            _ => {}
        }
        self.pending = TypeModifiers::default();
        self.member = MemberModifiers::default();
    }

    fn namespace_step(&mut self, tok: &Token<'_>, mut text: String) {
        if tok.is_name_part() {
            // `namespace\foo()` is a relative name, not a declaration.
            if text.is_empty() && tok.kind == TokenKind::NsSeparator {
                return;
            }
            text.push_str(tok.text);
            self.state = State::Namespace(text);
            return;
        }

        self.namespace = text.trim().to_string();
        self.imports.clear();
        if tok.is_punct('{') {
            self.frames.push(Frame::Namespace);
        }
    }

    fn import_step(&mut self, tok: &Token<'_>, mut import: ImportState) {
        if import.skip {
            if !tok.is_terminator() {
                self.state = State::Import(import);
            }
            return;
        }

        if !import.started {
            import.started = true;
            if tok.is_punct('(') {
                // closure `use (...)`
                return;
            }
            if tok.is_keyword("function") || tok.is_keyword("const") {
                import.skip = true;
                self.state = State::Import(import);
                return;
            }
        }

        if tok.is_keyword("as") {
            import.in_alias = true;
        } else if tok.is_name_part() {
            if import.in_alias {
                import.alias = Some(tok.text.to_string());
            } else {
                import.current.push_str(tok.text);
            }
        } else if tok.is_punct('{') {
            let prefix = import.current.trim_end_matches('\\').to_string();
            import.prefix = Some(prefix);
            import.current.clear();
        } else if tok.is_punct(',') || tok.is_punct('}') {
            self.commit_import(&mut import);
        } else {
            // `;` or anything unexpected ends the statement.
            self.commit_import(&mut import);
            return;
        }
        self.state = State::Import(import);
    }

    fn commit_import(&mut self, import: &mut ImportState) {
        let current = std::mem::take(&mut import.current);
        let alias = import.alias.take();
        import.in_alias = false;
        if current.is_empty() {
            return;
        }

        let target = match &import.prefix {
            Some(prefix) => format!("{}\\{}", prefix, current),
            None => current,
        };
        let target = target.trim_start_matches('\\').to_string();
        let alias = alias.unwrap_or_else(|| {
            target
                .rsplit('\\')
                .next()
                .unwrap_or(target.as_str())
                .to_string()
        });
        self.imports.insert(alias.to_ascii_lowercase(), target);
    }

    fn open_type(&mut self, kind: TypeKind, modifiers: TypeModifiers, short_name: &str) {
        let mut ty = TypeDescriptor::new(kind, qualify(&self.namespace, short_name))
            .with_file(&self.file);
        if kind == TypeKind::Class {
            ty.is_abstract = modifiers.is_abstract;
            ty.is_final = modifiers.is_final;
        }

        if self.first_namespace.is_none() {
            self.first_namespace = Some(self.namespace.clone());
        }
        self.types.push(ty);
        self.state = State::TypeHeader {
            index: self.types.len() - 1,
            clause: Clause::None,
            current: String::new(),
        };
    }

    fn header_step(&mut self, tok: &Token<'_>, index: usize, mut clause: Clause, mut current: String) {
        if tok.is_keyword("extends") {
            self.flush_header_name(index, clause, &mut current);
            clause = Clause::Extends;
        } else if tok.is_keyword("implements") {
            self.flush_header_name(index, clause, &mut current);
            clause = Clause::Implements;
        } else if tok.is_name_part() {
            current.push_str(tok.text);
        } else if tok.is_punct(',') {
            self.flush_header_name(index, clause, &mut current);
        } else if tok.is_punct('{') {
            self.flush_header_name(index, clause, &mut current);
            self.frames.push(Frame::Type(index));
            self.member = MemberModifiers::default();
            return;
        } else {
            // Malformed header: keep what was collected and resume scanning.
            self.flush_header_name(index, clause, &mut current);
            return;
        }

        self.state = State::TypeHeader {
            index,
            clause,
            current,
        };
    }

    fn flush_header_name(&mut self, index: usize, clause: Clause, current: &mut String) {
        let raw = std::mem::take(current);
        if raw.is_empty() {
            return;
        }
        let resolved = self.resolve_name(&raw);
        let ty = &mut self.types[index];
        match clause {
            Clause::Extends if ty.kind == TypeKind::Interface => ty.add_interface(resolved),
            Clause::Extends => ty.parent = Some(resolved),
            Clause::Implements => ty.add_interface(resolved),
            Clause::None => {}
        }
    }

    fn member_step(&mut self, tok: &Token<'_>, index: usize) {
        if tok.is_punct('{') {
            self.frames.push(Frame::Block);
            self.member = MemberModifiers::default();
            return;
        }
        if tok.is_terminator() {
            self.member = MemberModifiers::default();
            return;
        }

        if tok.kind != TokenKind::Ident {
            if self.member.awaiting_name && !tok.is_punct('&') {
                self.member.awaiting_name = false;
            }
            return;
        }

        if self.member.awaiting_name {
            self.member.awaiting_name = false;
            let kind = self.types[index].kind;
            let mut method = MethodDescriptor::new(
                tok.text,
                self.member.visibility.unwrap_or(Visibility::Public),
            );
            method.is_static = self.member.is_static;
            method.is_abstract = self.member.is_abstract || kind == TypeKind::Interface;
            self.types[index].methods.push(method);
            return;
        }

        let lower = tok.text.to_ascii_lowercase();
        if lower == "function" {
            self.member.awaiting_name = true;
        } else if MEMBER_MODIFIERS.contains(lower.as_str()) {
            if let Some(visibility) = Visibility::from_keyword(&lower) {
                self.member.visibility.get_or_insert(visibility);
            }
            match lower.as_str() {
                "static" => self.member.is_static = true,
                "abstract" => self.member.is_abstract = true,
                _ => {}
            }
        }
    }

    /// Resolve a name from an `extends`/`implements` clause.
    fn resolve_name(&self, raw: &str) -> String {
        if let Some(stripped) = raw.strip_prefix('\\') {
            return stripped.to_string();
        }
        if raw
            .get(..10)
            .is_some_and(|head| head.eq_ignore_ascii_case("namespace\\"))
        {
            return qualify(&self.namespace, &raw[10..]);
        }

        let (first, rest) = match raw.split_once('\\') {
            Some((first, rest)) => (first, Some(rest)),
            None => (raw, None),
        };
        if let Some(target) = self.imports.get(&first.to_ascii_lowercase()) {
            return match rest {
                Some(rest) => format!("{}\\{}", target, rest),
                None => target.clone(),
            };
        }
        qualify(&self.namespace, raw)
    }
}

/// `Foo::class`, `$a->class` and `new class` are not declarations.
fn is_member_access(prev: Option<&Token<'_>>) -> bool {
    match prev {
        Some(p) => p.is_punct(':') || p.is_punct('>') || p.is_keyword("new"),
        None => false,
    }
}
