//! Source tree walking for catalog discovery.

use globset::GlobSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules"];

/// Which files under a root count as sources.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    /// Extensions without the dot, compared case-insensitively.
    pub extensions: Vec<String>,
    pub excluded: Option<GlobSet>,
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self {
            extensions: vec!["php".to_string()],
            excluded: None,
        }
    }
}

impl SourceFilter {
    fn has_source_extension(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        let Some(set) = &self.excluded else {
            return false;
        };
        if set.is_match(path) {
            return true;
        }
        path.strip_prefix(root)
            .map(|rel| set.is_match(rel))
            .unwrap_or(false)
    }
}

/// Collect source files under `root` in file-name order.
///
/// Unreadable entries are skipped; a missing root yields no files.
pub fn collect_source_files(root: &Path, filter: &SourceFilter) -> Vec<PathBuf> {
    if root.is_file() {
        return if filter.has_source_extension(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if filter.has_source_extension(path) && !filter.is_excluded(root, path) {
            files.push(path.to_path_buf());
        }
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::{Glob, GlobSetBuilder};
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "<?php").unwrap();
    }

    #[test]
    fn test_collects_sorted_php_files() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "b/Second.php");
        touch(temp.path(), "a/First.php");
        touch(temp.path(), "a/notes.txt");
        touch(temp.path(), "vendor/lib/Dep.php");
        touch(temp.path(), ".cache/Hidden.php");

        let files = collect_source_files(temp.path(), &SourceFilter::default());
        let rel: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(temp.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["a/First.php", "b/Second.php"]);
    }

    #[test]
    fn test_excluded_globs() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/Keep.php");
        touch(temp.path(), "src/Legacy/Old.php");

        let mut builder = GlobSetBuilder::new();
        builder.add(Glob::new("**/Legacy/**").unwrap());
        let filter = SourceFilter {
            excluded: Some(builder.build().unwrap()),
            ..Default::default()
        };

        let files = collect_source_files(temp.path(), &filter);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("Keep.php"));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let files = collect_source_files(&temp.path().join("nope"), &SourceFilter::default());
        assert!(files.is_empty());
    }
}
