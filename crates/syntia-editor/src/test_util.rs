// ABOUTME: In-memory file system for tests.
// ABOUTME: Can fail reads and writes on demand and fake modification times.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use crate::fs::FileSystem;

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<PathBuf, (Vec<u8>, u64)>,
    denied: HashSet<PathBuf>,
    read_only: HashSet<PathBuf>,
    clock: u64,
}

/// In-memory file system. Clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create or overwrite a file, bumping its modification time
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        let mut state = self.state();
        state.clock += 1;
        let stamp = state.clock;
        state.files.insert(path.into(), (contents.into(), stamp));
    }

    pub fn remove(&self, path: &Path) {
        self.state().files.remove(path);
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.state().files.get(path).map(|(bytes, _)| bytes.clone())
    }

    /// Reads and writes of `path` fail with `PermissionDenied`
    pub fn deny(&self, path: impl Into<PathBuf>) {
        self.state().denied.insert(path.into());
    }

    /// Writes of `path` fail with `PermissionDenied`; reads still work
    pub fn set_read_only(&self, path: impl Into<PathBuf>, read_only: bool) {
        let path = path.into();
        let mut state = self.state();
        if read_only {
            state.read_only.insert(path);
        } else {
            state.read_only.remove(&path);
        }
    }
}

fn permission_denied(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("permission denied: {}", path.display()),
    )
}

impl FileSystem for MemoryFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let state = self.state();
        if state.denied.contains(path) {
            return Err(permission_denied(path));
        }
        state
            .files
            .get(path)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        {
            let state = self.state();
            if state.denied.contains(path) || state.read_only.contains(path) {
                return Err(permission_denied(path));
            }
        }
        self.insert(path, bytes.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.state().files.contains_key(path)
    }

    /// Any path that is a strict prefix of a stored file counts as a directory
    fn is_dir(&self, path: &Path) -> bool {
        self.state()
            .files
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }

    fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>> {
        let state = self.state();
        let (_, stamp) = state
            .files
            .get(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))?;
        Ok(Some(SystemTime::UNIX_EPOCH + Duration::from_secs(*stamp)))
    }
}
