//! Type catalog: a name-indexed registry of every type known for one run.
//!
//! A catalog is built once from a set of source roots merged with the types
//! the hosting environment already knows about. Later lookups never touch
//! the filesystem. Rebuilding means building a new catalog; entries are never
//! updated in place.

mod builtins;
mod discover;
mod types;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;

use crate::extract;

pub use builtins::BUILTIN_TYPES;
pub use discover::{collect_source_files, SourceFilter};
pub use types::{
    names_match, normalize_name, qualify, MethodDescriptor, TypeDescriptor, TypeKind, Visibility,
    NS_SEPARATOR,
};

/// Registry of type descriptors in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: Vec<TypeDescriptor>,
    /// Lowercased name -> position in `types`.
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover types under `roots` with the default builder settings.
    pub fn discover<P: AsRef<Path>>(roots: &[P]) -> Self {
        CatalogBuilder::new().build(roots)
    }

    /// Insert a descriptor unless one with the same name exists.
    ///
    /// Returns false when an earlier entry kept its place.
    pub fn insert(&mut self, ty: TypeDescriptor) -> bool {
        let key = index_key(&ty.name);
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.types.len());
        self.types.push(ty);
        true
    }

    /// Look up a type by fully-qualified name (case-insensitive, leading `\` ignored).
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.index.get(&index_key(name)).map(|&i| &self.types[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&index_key(name))
    }

    /// Resolve the declared parent of `ty`, if it is known.
    pub fn parent_of(&self, ty: &TypeDescriptor) -> Option<&TypeDescriptor> {
        ty.parent.as_deref().and_then(|p| self.get(p))
    }

    /// All entries in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, TypeDescriptor> {
        self.types.iter()
    }

    /// Entries that are not provided by the hosting environment.
    pub fn user_types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter().filter(|t| !t.is_internal)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a TypeDescriptor;
    type IntoIter = std::slice::Iter<'a, TypeDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.types.iter()
    }
}

fn index_key(name: &str) -> String {
    normalize_name(name).to_ascii_lowercase()
}

/// Builds a [`Catalog`] from source roots and known types.
///
/// Known types are merged before scanned ones, so on a name clash the
/// already-known metadata wins.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    known: Vec<TypeDescriptor>,
    include_builtins: bool,
    filter: SourceFilter,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self {
            known: Vec::new(),
            include_builtins: true,
            filter: SourceFilter::default(),
        }
    }

    /// Add types already known to the hosting environment.
    pub fn known_types<I: IntoIterator<Item = TypeDescriptor>>(mut self, types: I) -> Self {
        self.known.extend(types);
        self
    }

    /// Set whether the runtime built-in types are merged in (default: true).
    pub fn include_builtins(mut self, include: bool) -> Self {
        self.include_builtins = include;
        self
    }

    /// Set the source file extensions (without dot).
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extensions: Vec<String> = extensions.into_iter().map(Into::into).collect();
        if !extensions.is_empty() {
            self.filter.extensions = extensions;
        }
        self
    }

    /// Skip files matching `excluded`.
    pub fn excluding(mut self, excluded: GlobSet) -> Self {
        self.filter.excluded = Some(excluded);
        self
    }

    pub fn source_filter(&self) -> &SourceFilter {
        &self.filter
    }

    /// Every source file under `roots`, in discovery order.
    pub fn source_files<P: AsRef<Path>>(&self, roots: &[P]) -> Vec<PathBuf> {
        roots
            .iter()
            .flat_map(|root| collect_source_files(root.as_ref(), &self.filter))
            .collect()
    }

    /// Build the catalog.
    ///
    /// Files that cannot be read or tokenized are skipped.
    pub fn build<P: AsRef<Path>>(&self, roots: &[P]) -> Catalog {
        let mut catalog = Catalog::new();

        if self.include_builtins {
            for ty in BUILTIN_TYPES.iter() {
                catalog.insert(ty.clone());
            }
        }
        for ty in &self.known {
            if !catalog.insert(ty.clone()) {
                tracing::debug!("known type {} already registered", ty.name);
            }
        }

        for file in self.source_files(roots) {
            match scan_file(&file) {
                Ok(Some(ty)) => {
                    tracing::debug!("discovered {} {} in {}", ty.kind, ty.name, file.display());
                    let name = ty.name.clone();
                    if !catalog.insert(ty) {
                        tracing::debug!("{} already registered, keeping first", name);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("skipping {}: {}", file.display(), e),
            }
        }

        catalog
    }
}

fn scan_file(path: &Path) -> anyhow::Result<Option<TypeDescriptor>> {
    let source = fs::read_to_string(path)?;
    Ok(extract::extract_first(path, &source)?)
}
