//! In-memory filesystem for staged template trees
//!
//! Paths are normalized POSIX strings relative to the tree root, so lookups
//! are platform-neutral and iteration order is deterministic.

use std::collections::BTreeMap;

use crate::path::normalize_posix;

/// Represents a file with content and the provider that staged it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
    /// Id of the provider whose template tree supplied the file
    pub provider: Option<String>,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            provider: None,
        }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }

    /// Content as text, or `None` for binary files (NUL bytes or invalid UTF-8)
    pub fn as_text(&self) -> Option<&str> {
        if self.content.contains(&0) {
            return None;
        }
        std::str::from_utf8(&self.content).ok()
    }
}

/// In-memory filesystem for fast file manipulation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFS {
    /// Files stored as normalized path -> file mapping
    files: BTreeMap<String, File>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a file
    pub fn add_file(&mut self, path: &str, file: File) {
        self.files.insert(normalize_posix(path), file);
    }

    /// Add a file with string content
    pub fn add_file_string(&mut self, path: &str, content: &str) {
        self.add_file(path, File::from_string(content));
    }

    /// Get a file by path
    pub fn get_file(&self, path: &str) -> Option<&File> {
        self.files.get(&normalize_posix(path))
    }

    /// Check if a file exists
    pub fn exists(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_posix(path))
    }

    /// List all files in path order
    pub fn list_files(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Merge another filesystem into this one (last-write-wins)
    pub fn merge(&mut self, other: &MemoryFS) {
        for (path, file) in &other.files {
            self.files.insert(path.clone(), file.clone());
        }
    }

    /// Iterate over all files as (path, file) pairs
    pub fn files(&self) -> impl Iterator<Item = (&str, &File)> {
        self.files.iter().map(|(path, file)| (path.as_str(), file))
    }
}

impl FromIterator<(String, File)> for MemoryFS {
    fn from_iter<I: IntoIterator<Item = (String, File)>>(iter: I) -> Self {
        let mut fs = MemoryFS::new();
        for (path, file) in iter {
            fs.add_file(&path, file);
        }
        fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_normalized() {
        let mut fs = MemoryFS::new();
        fs.add_file_string("./docs\\README.md", "hello");
        assert!(fs.exists("docs/README.md"));
        assert_eq!(fs.list_files(), vec!["docs/README.md"]);
        assert_eq!(fs.get_file("docs//README.md").unwrap().as_text(), Some("hello"));
    }

    #[test]
    fn test_merge_is_last_write_wins() {
        let mut base = MemoryFS::new();
        base.add_file("a.txt", File::from_string("base").with_provider("p1"));
        base.add_file_string("b.txt", "only base");

        let mut other = MemoryFS::new();
        other.add_file("a.txt", File::from_string("other").with_provider("p2"));

        base.merge(&other);
        let a = base.get_file("a.txt").unwrap();
        assert_eq!(a.as_text(), Some("other"));
        assert_eq!(a.provider.as_deref(), Some("p2"));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_binary_detection() {
        assert_eq!(File::new(vec![0x89, b'P', b'N', b'G', 0]).as_text(), None);
        assert_eq!(File::new(vec![0xff, 0xfe]).as_text(), None);
        assert_eq!(File::from_string("text").as_text(), Some("text"));
    }

    #[test]
    fn test_collect_normalizes_paths() {
        let fs: MemoryFS = vec![("./a\\b.txt".to_string(), File::from_string("x"))]
            .into_iter()
            .collect();
        assert!(fs.exists("a/b.txt"));
        assert!(!fs.is_empty());
    }
}
