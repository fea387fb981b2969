//! Composable type selection over a [`Catalog`].
//!
//! A `Selector` is an immutable list of filters. Every builder method returns
//! a new selector, so a base selector can be shared and refined in several
//! directions. Filters combine with logical AND.

use regex::Regex;

use crate::catalog::{Catalog, TypeDescriptor};

#[derive(Debug, Clone)]
enum Filter {
    InNamespace(String),
    ExcludingAbstract,
    ExcludingInterfaces,
    ExcludingTraits,
    Matching(Regex),
    Implementing(String),
    Extending(String),
}

impl Filter {
    fn accepts(&self, ty: &TypeDescriptor) -> bool {
        match self {
            // Plain string prefix: "App\Foo" also accepts "App\FooBar".
            Filter::InNamespace(prefix) => starts_with_ignore_case(ty.namespace(), prefix),
            Filter::ExcludingAbstract => !ty.is_abstract,
            Filter::ExcludingInterfaces => !ty.is_interface(),
            Filter::ExcludingTraits => !ty.is_trait(),
            Filter::Matching(pattern) => pattern.is_match(&ty.name),
            Filter::Implementing(interface) => ty.implements_directly(interface),
            Filter::Extending(class) => ty.extends_directly(class),
        }
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Query over the types of a catalog.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    filters: Vec<Filter>,
}

impl Selector {
    /// A selector matching every non-internal type.
    pub fn new() -> Self {
        Self::default()
    }

    fn with(&self, filter: Filter) -> Self {
        let mut filters = self.filters.clone();
        filters.push(filter);
        Self { filters }
    }

    /// Types whose namespace starts with `prefix` (raw string prefix, ASCII
    /// case-insensitive).
    pub fn in_namespace(&self, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        self.with(Filter::InNamespace(
            prefix.trim_start_matches('\\').to_string(),
        ))
    }

    pub fn excluding_abstract(&self) -> Self {
        self.with(Filter::ExcludingAbstract)
    }

    pub fn excluding_interfaces(&self) -> Self {
        self.with(Filter::ExcludingInterfaces)
    }

    pub fn excluding_traits(&self) -> Self {
        self.with(Filter::ExcludingTraits)
    }

    /// Types whose fully-qualified name contains a match for `pattern`.
    pub fn matching(&self, pattern: Regex) -> Self {
        self.with(Filter::Matching(pattern))
    }

    /// Types directly implementing `interface`.
    pub fn implementing(&self, interface: impl Into<String>) -> Self {
        self.with(Filter::Implementing(interface.into()))
    }

    /// Types directly extending `class`.
    pub fn extending(&self, class: impl Into<String>) -> Self {
        self.with(Filter::Extending(class.into()))
    }

    /// Whether `ty` passes every filter. Internal types never do.
    pub fn accepts(&self, ty: &TypeDescriptor) -> bool {
        !ty.is_internal && self.filters.iter().all(|f| f.accepts(ty))
    }

    /// Matching descriptors in catalog discovery order.
    pub fn get(&self, catalog: &Catalog) -> Vec<TypeDescriptor> {
        catalog
            .iter()
            .filter(|ty| self.accepts(ty))
            .cloned()
            .collect()
    }
}
