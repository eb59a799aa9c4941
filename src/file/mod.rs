use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

mod extract;

pub use extract::extract;

/// Recursive file walker filtering by extension
///
/// Yields regular files whose extension (case-folded) is in the accepted
/// set. Unreadable subdirectories are skipped silently so one bad directory
/// never aborts a whole search.
pub struct FileWalker {
    root: PathBuf,
    extensions: HashSet<String>,
}

impl FileWalker {
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
        }
    }

    /// Walk files lazily in depth-first order
    pub fn files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        debug!("Starting file walk in: {}", self.root.display());

        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| self.accepts(entry.path()))
            .map(|entry| entry.into_path())
    }

    /// Whether a path's extension is in the accepted set
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

/// Normalize a user-supplied extension: trim, strip the leading dot, lowercase
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_walks_nested_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.txt"), "b").unwrap();

        let walker = FileWalker::new(dir.path(), &exts(&["txt"]));
        let mut found: Vec<_> = walker
            .files()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        found.sort();

        assert_eq!(found, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_filters_unaccepted_extensions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("keep.txt"), "x").unwrap();
        fs::write(dir.path().join("skip.rs"), "x").unwrap();
        fs::write(dir.path().join("noext"), "x").unwrap();

        let walker = FileWalker::new(dir.path(), &exts(&["txt", "pdf"]));
        let found: Vec<_> = walker.files().collect();

        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("keep.txt"));
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("UPPER.TXT"), "x").unwrap();

        let walker = FileWalker::new(dir.path(), &exts(&["txt"]));
        assert_eq!(walker.files().count(), 1);
    }

    #[test]
    fn test_dotted_and_mixed_case_input_extensions() {
        let walker = FileWalker::new("/tmp", &exts(&[".TXT", " .Pdf"]));
        assert!(walker.accepts(Path::new("/tmp/a.txt")));
        assert!(walker.accepts(Path::new("/tmp/b.pdf")));
        assert!(!walker.accepts(Path::new("/tmp/c.md")));
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let walker = FileWalker::new("/nonexistent/filesage-test", &exts(&["txt"]));
        assert_eq!(walker.files().count(), 0);
    }
}
