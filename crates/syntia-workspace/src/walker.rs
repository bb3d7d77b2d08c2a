// ABOUTME: Directory listing for the file tree panel.
// ABOUTME: Default implementation honours .gitignore through the ignore crate.

use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

pub trait DirectoryWalker {
    /// Direct children of `dir`, directories first, then by name
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;
}

/// One-level listing that skips ignored files
#[derive(Debug, Clone, Default)]
pub struct IgnoreWalker {
    show_hidden: bool,
}

impl IgnoreWalker {
    pub fn new(show_hidden: bool) -> Self {
        Self { show_hidden }
    }
}

impl DirectoryWalker for IgnoreWalker {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            ));
        }

        let mut walker = WalkBuilder::new(dir);
        walker
            .hidden(!self.show_hidden)
            .git_ignore(true)
            .git_exclude(true)
            .require_git(false)
            .parents(true)
            .max_depth(Some(1))
            .filter_entry(|entry| entry.file_name() != ".git");

        let mut entries = Vec::new();
        for result in walker.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type().is_some_and(|t| t.is_dir()),
                path: entry.into_path(),
            });
        }

        entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn lists_one_level_dirs_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("b.md"), "# b").unwrap();
        fs::write(dir.path().join("a.py"), "").unwrap();

        let entries = IgnoreWalker::default().list(dir.path()).unwrap();
        assert_eq!(names(&entries), vec!["src", "a.py", "b.md"]);
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].path, dir.path().join("a.py"));
    }

    #[test]
    fn respects_gitignore_and_hidden() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "target/\n*.log\n").unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("debug.log"), "").unwrap();
        fs::write(dir.path().join(".env"), "").unwrap();
        fs::write(dir.path().join("keep.txt"), "").unwrap();

        let entries = IgnoreWalker::new(false).list(dir.path()).unwrap();
        assert_eq!(names(&entries), vec!["keep.txt"]);

        let entries = IgnoreWalker::new(true).list(dir.path()).unwrap();
        assert_eq!(names(&entries), vec![".env", ".gitignore", "keep.txt"]);
    }

    #[test]
    fn missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = IgnoreWalker::default().list(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
