//! File access used by the engine: source reads and artifact writes.
//!
//! - [`DiskFs`]: the real file system
//! - [`MemoryFs`]: a virtual tree for hosts that generate sources
//!   programmatically, and for tests

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

pub trait Filesystem: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write the whole buffer, creating parent directories first.
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFs;

impl Filesystem for DiskFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// In-memory file tree. Counts writes so callers can observe flushes.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: Mutex<FxHashMap<PathBuf, Vec<u8>>>,
    writes: AtomicUsize,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a file without counting it as an engine write.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.files.lock().insert(path.into(), bytes.into());
    }

    pub fn remove(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().remove(path)
    }

    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().get(path).cloned()
    }

    /// Number of `write` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Filesystem for MemoryFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.get(path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
        })
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.files.lock().insert(path.to_path_buf(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }
}

/// Allows sharing one tree between the engine and its host.
impl<T: Filesystem + ?Sized> Filesystem for std::sync::Arc<T> {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        (**self).write(path, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disk_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("web/public/main.js");
        DiskFs.write(&path, b"x").unwrap();
        assert!(DiskFs.exists(&path));
        assert_eq!(DiskFs.read(&path).unwrap(), b"x");
    }

    #[test]
    fn test_disk_read_missing() {
        let dir = TempDir::new().unwrap();
        let err = DiskFs.read(&dir.path().join("gone.js")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_memory_fs_counts_writes() {
        let fs = MemoryFs::new();
        fs.insert("/src/a.js", "A");
        assert_eq!(fs.write_count(), 0);
        fs.write(Path::new("/out/main.js"), b"A").unwrap();
        assert_eq!(fs.write_count(), 1);
        assert!(fs.exists(Path::new("/out/main.js")));
        assert!(fs.read(Path::new("/missing")).is_err());
    }
}
