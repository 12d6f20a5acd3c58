//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing tests to run on macOS and in CI environments without Linux.

use crate::collector::traits::FileSystem;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct Entries {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
}

/// In-memory filesystem for testing.
///
/// Clones share one backing store: a test keeps a handle and rewrites
/// counter files between ticks while the collector owns another handle.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    entries: Arc<RwLock<Entries>>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a file with the given content.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .files
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Removes a file, simulating a source that became unreadable.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .files
            .remove(path.as_ref());
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let fs = MockFs::new();
        fs.add_file("/proc/stat", "cpu  1 2 3 4\n");

        let content = fs.read_to_string(Path::new("/proc/stat")).unwrap();
        assert_eq!(content, "cpu  1 2 3 4\n");
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/proc/diskstats"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_mock_fs_clones_share_state() {
        let fs = MockFs::new();
        let handle = fs.clone();
        handle.add_file("/proc/stat", "cpu  5 0 5 90\n");

        assert_eq!(
            fs.read_to_string(Path::new("/proc/stat")).unwrap(),
            "cpu  5 0 5 90\n"
        );

        handle.remove_file("/proc/stat");
        assert!(fs.read_to_string(Path::new("/proc/stat")).is_err());
    }
}
