// ABOUTME: File system access used by buffers.
// ABOUTME: A trait seam over std::fs so other backends can stand in.

use std::io;
use std::path::Path;
use std::time::SystemTime;

pub trait FileSystem: Send {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Last modification time, `None` when the platform can't report one
    fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>>;
}

/// Plain `std::fs` access. Files are read and written verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(path, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>> {
        let metadata = std::fs::metadata(path)?;
        Ok(metadata.modified().ok())
    }
}
