//! Type metadata records shared by the catalog, selectors and rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Namespace separator used in fully-qualified names.
pub const NS_SEPARATOR: char = '\\';

/// Kind of declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Trait,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Trait => "trait",
        }
    }

    /// Map a declaration keyword (case-insensitive) to a kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "class" => Some(TypeKind::Class),
            "interface" => Some(TypeKind::Interface),
            "trait" => Some(TypeKind::Trait),
            _ => None,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// A method signature declared directly on a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_constructor: bool,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, visibility: Visibility) -> Self {
        let name = name.into();
        let is_constructor = name.eq_ignore_ascii_case("__construct");
        Self {
            name,
            visibility,
            is_static: false,
            is_abstract: false,
            is_constructor,
        }
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// Static metadata for one declared type.
///
/// Relationships to other types are kept as fully-qualified names and are
/// resolved through [`crate::catalog::Catalog`] when needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Fully-qualified name without a leading separator (e.g. `App\Service\Mailer`).
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_final: bool,
    /// Built into the hosting environment; resolvable but never selected.
    #[serde(default)]
    pub is_internal: bool,
    #[serde(default)]
    pub declaring_file: Option<PathBuf>,
    #[serde(default)]
    pub parent: Option<String>,
    /// Directly implemented interfaces (for an interface: the interfaces it extends).
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

impl TypeDescriptor {
    pub fn new(kind: TypeKind, name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            name: normalize_name(&name).to_string(),
            kind,
            is_abstract: false,
            is_final: false,
            is_internal: false,
            declaring_file: None,
            parent: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.declaring_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        let parent: String = parent.into();
        self.parent = Some(normalize_name(&parent).to_string());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.add_interface(interface.into());
        self
    }

    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// Record an interface once, keeping declaration order.
    pub(crate) fn add_interface(&mut self, interface: String) {
        let interface = normalize_name(&interface).to_string();
        if !self.interfaces.iter().any(|i| names_match(i, &interface)) {
            self.interfaces.push(interface);
        }
    }

    /// The name after the last namespace separator.
    pub fn short_name(&self) -> &str {
        match self.name.rsplit_once(NS_SEPARATOR) {
            Some((_, short)) => short,
            None => &self.name,
        }
    }

    /// The enclosing namespace, empty for the global namespace.
    pub fn namespace(&self) -> &str {
        match self.name.rsplit_once(NS_SEPARATOR) {
            Some((ns, _)) => ns,
            None => "",
        }
    }

    pub fn is_class(&self) -> bool {
        self.kind == TypeKind::Class
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_trait(&self) -> bool {
        self.kind == TypeKind::Trait
    }

    pub fn public_methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.iter().filter(|m| m.is_public())
    }

    /// Number of public methods, constructors excluded.
    pub fn public_method_count(&self) -> usize {
        self.public_methods().filter(|m| !m.is_constructor).count()
    }

    pub fn has_public_method(&self, name: &str) -> bool {
        self.public_methods()
            .any(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Whether `interface` is among the directly declared interfaces.
    pub fn implements_directly(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| names_match(i, interface))
    }

    /// Whether `class` is the directly declared parent.
    pub fn extends_directly(&self, class: &str) -> bool {
        self.parent
            .as_deref()
            .map(|p| names_match(p, class))
            .unwrap_or(false)
    }

    pub fn has_supertypes(&self) -> bool {
        self.parent.is_some() || !self.interfaces.is_empty()
    }

    /// Key used for per-file bookkeeping; empty for types without a file.
    pub fn file_key(&self) -> String {
        self.declaring_file
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Strip a leading namespace separator.
pub fn normalize_name(name: &str) -> &str {
    name.trim_start_matches(NS_SEPARATOR)
}

/// Compare two type names the way the language does: case-insensitively,
/// ignoring a leading separator.
pub fn names_match(a: &str, b: &str) -> bool {
    normalize_name(a).eq_ignore_ascii_case(normalize_name(b))
}

/// Join a namespace and a short name.
pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", namespace, NS_SEPARATOR, name)
    }
}
