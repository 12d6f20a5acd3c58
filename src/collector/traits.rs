//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait lets the collector read either the real `/proc`
//! on Linux or an in-memory mock in tests and on other platforms.

use std::io;
use std::path::Path;

/// Abstraction for filesystem operations.
///
/// Counter sources are re-read from the beginning on every call; the
/// trait therefore only needs whole-file reads.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    ///
    /// # Arguments
    /// * `path` - Path to the file to read
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_real_fs_read_to_string() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "   8       0 sda 1 2 3 4 5 6 7 8 0 9 10").unwrap();

        let fs = RealFs::new();
        let content = fs.read_to_string(file.path()).unwrap();
        assert!(content.contains("sda"));
    }

    #[test]
    fn test_real_fs_rereads_changed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diskstats");
        std::fs::write(&path, "   8       0 sda 1 0 8 0 0 0 0 0 0 1 1\n").unwrap();

        let fs = RealFs::new();
        let first = fs.read_to_string(&path).unwrap();
        std::fs::write(&path, "   8       0 sda 2 0 16 0 0 0 0 0 0 2 2\n").unwrap();
        let second = fs.read_to_string(&path).unwrap();

        assert_ne!(first, second);
        assert!(second.contains("sda 2 "));
    }

    #[test]
    fn test_real_fs_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = RealFs::new()
            .read_to_string(&dir.path().join("stat"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
