//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait allows the probe to work with both the real `/proc`
//! filesystem and mock implementations for testing on any host.

use std::io;
use std::path::{Path, PathBuf};

/// Capacity figures of a mounted filesystem, as reported by `statvfs(3)`.
///
/// Counts are in units of `fragment_size` bytes (blocks) or inodes (files).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatVfs {
    /// Preferred I/O block size (`f_bsize`).
    pub block_size: u64,
    /// Fundamental block size (`f_frsize`).
    pub fragment_size: u64,
    /// Total data blocks (`f_blocks`).
    pub blocks: u64,
    /// Free blocks (`f_bfree`).
    pub blocks_free: u64,
    /// Free blocks available to unprivileged users (`f_bavail`).
    pub blocks_available: u64,
    /// Total inodes (`f_files`).
    pub files: u64,
    /// Free inodes (`f_ffree`).
    pub files_free: u64,
    /// Free inodes available to unprivileged users (`f_favail`).
    pub files_available: u64,
}

/// Abstraction for filesystem operations.
///
/// This trait allows the probe to read from the real filesystem or from
/// a mock implementation for testing purposes.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Lists entries in a directory.
    ///
    /// # Returns
    /// A vector of paths to entries in the directory, or an I/O error.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Queries capacity of the filesystem mounted at `path`.
    fn statvfs(&self, path: &Path) -> io::Result<StatVfs>;
}

/// Real filesystem implementation that delegates to `std::fs` and `statvfs(3)`.
///
/// Use this in production to read from the actual `/proc` filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }

    #[allow(clippy::unnecessary_cast)]
    fn statvfs(&self, path: &Path) -> io::Result<StatVfs> {
        let st = nix::sys::statvfs::statvfs(path).map_err(io::Error::from)?;
        Ok(StatVfs {
            block_size: st.block_size() as u64,
            fragment_size: st.fragment_size() as u64,
            blocks: st.blocks() as u64,
            blocks_free: st.blocks_free() as u64,
            blocks_available: st.blocks_available() as u64,
            files: st.files() as u64,
            files_free: st.files_free() as u64,
            files_available: st.files_available() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_fs_read_to_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meminfo");
        std::fs::write(&path, "MemTotal: 16384 kB\n").unwrap();

        let fs = RealFs::new();
        let content = fs.read_to_string(&path).unwrap();
        assert!(content.starts_with("MemTotal:"));
    }

    #[test]
    fn test_real_fs_read_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("1")).unwrap();
        std::fs::write(dir.path().join("stat"), "cpu 1 2 3 4\n").unwrap();

        let fs = RealFs::new();
        let mut names: Vec<String> = fs
            .read_dir(dir.path())
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect();
        names.sort();
        assert_eq!(names, vec!["1", "stat"]);
    }

    #[test]
    fn test_real_fs_statvfs() {
        let dir = tempfile::tempdir().unwrap();
        let st = RealFs::new().statvfs(dir.path()).unwrap();

        assert!(st.fragment_size > 0);
        assert!(st.blocks_free <= st.blocks);
        assert!(st.blocks_available <= st.blocks_free);
    }

    #[test]
    fn test_real_fs_statvfs_missing_path() {
        let err = RealFs::new()
            .statvfs(Path::new("/nonexistent/path/12345"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
