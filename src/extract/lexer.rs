//! Lexer producing a flat token stream from PHP source.
//!
//! The lexer only distinguishes what the declaration scanner needs: trivia
//! (whitespace, comments, attributes, inline HTML), string-like literals,
//! identifiers, variables, namespace separators and single-byte punctuation.
//! Every token boundary falls on an ASCII byte, so token text is always a
//! valid `&str` slice of the input.

use super::ExtractError;

/// Classification of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Text outside `<?php ... ?>`.
    InlineHtml,
    OpenTag,
    CloseTag,
    Whitespace,
    Comment,
    DocComment,
    /// `#[...]`, brackets balanced.
    Attribute,
    /// Single-quoted, double-quoted or backtick literal.
    String,
    /// Heredoc or nowdoc literal.
    Heredoc,
    Variable,
    Ident,
    NsSeparator,
    Number,
    Punct,
}

/// A lexed token borrowing its text from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Line the token starts on (1-indexed).
    pub line: usize,
}

impl Token<'_> {
    /// Tokens the scanner never looks at.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace
                | TokenKind::Comment
                | TokenKind::DocComment
                | TokenKind::Attribute
                | TokenKind::InlineHtml
                | TokenKind::OpenTag
        )
    }

    /// Case-insensitive keyword test.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Ident && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn is_punct(&self, ch: char) -> bool {
        self.kind == TokenKind::Punct && self.text.len() == 1 && self.text.starts_with(ch)
    }

    /// `;` or a closing tag, both of which end a statement.
    pub fn is_terminator(&self) -> bool {
        self.is_punct(';') || self.kind == TokenKind::CloseTag
    }

    /// Identifier or separator, the building blocks of a qualified name.
    pub fn is_name_part(&self) -> bool {
        matches!(self.kind, TokenKind::Ident | TokenKind::NsSeparator)
    }
}

/// Split `source` into tokens.
///
/// Sources without any open tag are lexed as code from the first byte.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, ExtractError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    in_code: bool,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            in_code: !src.contains("<?"),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, ExtractError> {
        if self.pos >= self.bytes.len() {
            return Ok(None);
        }

        let start = self.pos;
        let line = self.line;
        let kind = if self.in_code {
            self.lex_code()?
        } else {
            self.lex_outside()
        };

        let text = &self.src[start..self.pos];
        self.line += text.bytes().filter(|&b| b == b'\n').count();
        Ok(Some(Token { kind, text, line }))
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    fn lex_outside(&mut self) -> TokenKind {
        if let Some(len) = self.open_tag_len() {
            self.pos += len;
            self.in_code = true;
            return TokenKind::OpenTag;
        }
        match find(self.rest(), b"<?") {
            Some(offset) => self.pos += offset,
            None => self.pos = self.bytes.len(),
        }
        TokenKind::InlineHtml
    }

    fn open_tag_len(&self) -> Option<usize> {
        let rest = self.rest();
        if rest.len() >= 5 && rest[..5].eq_ignore_ascii_case(b"<?php") {
            Some(5)
        } else if rest.starts_with(b"<?=") {
            Some(3)
        } else if rest.starts_with(b"<?") {
            Some(2)
        } else {
            None
        }
    }

    fn lex_code(&mut self) -> Result<TokenKind, ExtractError> {
        let rest = self.rest();
        let b = rest[0];

        let kind = if b.is_ascii_whitespace() {
            self.eat_while(|c| c.is_ascii_whitespace());
            TokenKind::Whitespace
        } else if rest.starts_with(b"?>") {
            self.pos += 2;
            self.in_code = false;
            TokenKind::CloseTag
        } else if rest.starts_with(b"#[") {
            self.lex_attribute()?;
            TokenKind::Attribute
        } else if b == b'#' || rest.starts_with(b"//") {
            self.lex_line_comment();
            TokenKind::Comment
        } else if rest.starts_with(b"/*") {
            self.lex_block_comment()?
        } else if b == b'\'' || b == b'"' || b == b'`' {
            self.lex_quoted(b)?;
            TokenKind::String
        } else if rest.starts_with(b"<<<") {
            if self.lex_heredoc()? {
                TokenKind::Heredoc
            } else {
                self.pos += 1;
                TokenKind::Punct
            }
        } else if b == b'$' && rest.get(1).copied().is_some_and(is_ident_start) {
            self.pos += 1;
            self.eat_while(is_ident_char);
            TokenKind::Variable
        } else if is_ident_start(b) {
            self.eat_while(is_ident_char);
            TokenKind::Ident
        } else if b.is_ascii_digit() {
            self.eat_while(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'.');
            TokenKind::Number
        } else if b == b'\\' {
            self.pos += 1;
            TokenKind::NsSeparator
        } else {
            self.pos += 1;
            TokenKind::Punct
        };

        Ok(kind)
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.pos < self.bytes.len() && pred(self.bytes[self.pos]) {
            self.pos += 1;
        }
    }

    /// `//` and `#` comments run to the end of the line or a closing tag.
    fn lex_line_comment(&mut self) {
        while self.pos < self.bytes.len() {
            let rest = self.rest();
            if rest[0] == b'\n' || rest.starts_with(b"?>") {
                break;
            }
            self.pos += 1;
        }
    }

    fn lex_block_comment(&mut self) -> Result<TokenKind, ExtractError> {
        let line = self.line;
        let rest = self.rest();
        let is_doc = rest.starts_with(b"/**") && !rest.starts_with(b"/**/");

        match find(&rest[2..], b"*/") {
            Some(offset) => {
                self.pos += 2 + offset + 2;
                Ok(if is_doc {
                    TokenKind::DocComment
                } else {
                    TokenKind::Comment
                })
            }
            None => Err(ExtractError::Unterminated {
                what: "comment",
                line,
            }),
        }
    }

    /// Consume a quoted literal starting at the current quote byte.
    fn lex_quoted(&mut self, quote: u8) -> Result<(), ExtractError> {
        let line = self.line;
        self.pos += 1;
        loop {
            if self.pos >= self.bytes.len() {
                return Err(ExtractError::Unterminated {
                    what: "string",
                    line,
                });
            }
            let c = self.bytes[self.pos];
            if c == b'\\' {
                self.pos += 2;
                continue;
            }
            self.pos += 1;
            if c == quote {
                return Ok(());
            }
        }
    }

    fn lex_attribute(&mut self) -> Result<(), ExtractError> {
        let line = self.line;
        self.pos += 2;
        let mut depth = 1usize;
        loop {
            if self.pos >= self.bytes.len() {
                return Err(ExtractError::Unterminated {
                    what: "attribute",
                    line,
                });
            }
            match self.bytes[self.pos] {
                b'[' => {
                    depth += 1;
                    self.pos += 1;
                }
                b']' => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                q @ (b'\'' | b'"') => self.lex_quoted(q)?,
                _ => self.pos += 1,
            }
        }
    }

    /// Consume a heredoc or nowdoc. Returns false without consuming anything
    /// when `<<<` does not start a valid header.
    fn lex_heredoc(&mut self) -> Result<bool, ExtractError> {
        let line = self.line;
        let bytes = self.bytes;
        let mut i = self.pos + 3;

        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }
        let quote = match bytes.get(i) {
            Some(&q @ (b'\'' | b'"')) => {
                i += 1;
                Some(q)
            }
            _ => None,
        };

        let label_start = i;
        if !bytes.get(i).copied().is_some_and(is_ident_start) {
            return Ok(false);
        }
        while i < bytes.len() && is_ident_char(bytes[i]) {
            i += 1;
        }
        let label = &bytes[label_start..i];

        if let Some(q) = quote {
            if bytes.get(i) != Some(&q) {
                return Ok(false);
            }
            i += 1;
        }
        if bytes.get(i) == Some(&b'\r') {
            i += 1;
        }
        if bytes.get(i) != Some(&b'\n') {
            return Ok(false);
        }
        i += 1;

        // The closing label may be indented and must not continue as an identifier.
        while i < bytes.len() {
            let mut j = i;
            while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
                j += 1;
            }
            if bytes[j..].starts_with(label) {
                let end = j + label.len();
                if !bytes.get(end).copied().is_some_and(is_ident_char) {
                    self.pos = end;
                    return Ok(true);
                }
            }
            match find(&bytes[i..], b"\n") {
                Some(offset) => i += offset + 1,
                None => break,
            }
        }

        Err(ExtractError::Unterminated {
            what: "heredoc",
            line,
        })
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn significant(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .filter(|t| !t.is_trivia())
            .map(|t| (t.kind, t.text.to_string()))
            .collect()
    }

    #[test]
    fn test_keywords_inside_literals_stay_literals() {
        let tokens = significant(
            "<?php\n$a = 'class Foo';\n// class Bar\n/* interface Baz */\n$b = \"trait \\\"Q\\\"\";\n",
        );
        let idents: Vec<_> = tokens
            .iter()
            .filter(|(k, _)| *k == TokenKind::Ident)
            .collect();
        assert!(idents.is_empty(), "unexpected identifiers: {:?}", idents);
        assert_eq!(
            tokens
                .iter()
                .filter(|(k, _)| *k == TokenKind::String)
                .count(),
            2
        );
    }

    #[test]
    fn test_qualified_name_tokens() {
        let tokens = significant("<?php namespace App\\Domain;");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Ident, "namespace".to_string()),
                (TokenKind::Ident, "App".to_string()),
                (TokenKind::NsSeparator, "\\".to_string()),
                (TokenKind::Ident, "Domain".to_string()),
                (TokenKind::Punct, ";".to_string()),
            ]
        );
    }

    #[test]
    fn test_inline_html_before_open_tag() {
        let tokens = tokenize("<html>{ class }</html><?php class A {}").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::InlineHtml);
        assert_eq!(tokens[0].text, "<html>{ class }</html>");
        assert_eq!(tokens[1].kind, TokenKind::OpenTag);
    }

    #[test]
    fn test_close_tag_returns_to_html() {
        let tokens = tokenize("<?php $x = 1 ?> class Nope { <?php class Yes {}").unwrap();
        let html: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::InlineHtml)
            .collect();
        assert_eq!(html.len(), 1);
        assert!(html[0].text.contains("class Nope"));
        assert!(tokens.iter().any(|t| t.kind == TokenKind::CloseTag));
    }

    #[test]
    fn test_source_without_open_tag_is_code() {
        let tokens = significant("final class Foo {}");
        assert_eq!(tokens[0], (TokenKind::Ident, "final".to_string()));
    }

    #[test]
    fn test_heredoc_and_nowdoc() {
        let source = "<?php\n$a = <<<EOT\nclass Hidden {}\n  EOT;\n$b = <<<'RAW'\ninterface Gone {}\nRAW;\nclass Seen {}\n";
        let tokens = significant(source);
        let heredocs = tokens
            .iter()
            .filter(|(k, _)| *k == TokenKind::Heredoc)
            .count();
        assert_eq!(heredocs, 2);
        let idents: Vec<_> = tokens
            .iter()
            .filter(|(k, _)| *k == TokenKind::Ident)
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(idents, vec!["class", "Seen"]);
    }

    #[test]
    fn test_attribute_is_trivia() {
        let tokens = tokenize("<?php #[Route('/a[b]')] final class A {}").unwrap();
        let attr = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Attribute)
            .unwrap();
        assert_eq!(attr.text, "#[Route('/a[b]')]");
        assert!(attr.is_trivia());
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("<?php\n\nclass A {}").unwrap();
        let class = tokens.iter().find(|t| t.is_keyword("class")).unwrap();
        assert_eq!(class.line, 3);
    }

    #[test]
    fn test_unterminated_literals_fail() {
        assert_eq!(
            tokenize("<?php /* never closed"),
            Err(ExtractError::Unterminated {
                what: "comment",
                line: 1
            })
        );
        assert!(matches!(
            tokenize("<?php\n$a = 'open;"),
            Err(ExtractError::Unterminated { what: "string", line: 2 })
        ));
        assert!(matches!(
            tokenize("<?php $a = <<<EOT\nbody\n"),
            Err(ExtractError::Unterminated { what: "heredoc", .. })
        ));
    }

    #[test]
    fn test_shift_operator_is_not_heredoc() {
        let tokens = significant("<?php $a = $b <<< 2;");
        assert!(tokens.iter().all(|(k, _)| *k != TokenKind::Heredoc));
    }
}
