// ABOUTME: In-memory text of one open file plus its save state.
// ABOUTME: Tracks dirtiness against the last saved snapshot and disk stamp.

use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use syntia_core::{Language, LanguageDetector};

use crate::fs::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    AccessDenied(PathBuf),

    #[error("{} is not valid UTF-8 text", .0.display())]
    DecodeError(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to write {}: {source}", .path.display())]
    WriteError { path: PathBuf, source: io::Error },

    #[error("{} has unsaved changes", .0.display())]
    UnsavedChanges(PathBuf),
}

/// What the disk looks like compared to when the buffer last touched it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskStatus {
    Unchanged,
    Modified,
    Deleted,
}

#[derive(Debug)]
pub struct Buffer {
    id: BufferId,
    path: PathBuf,
    text: String,
    /// Content as of the last open/save/reload
    saved: String,
    dirty: bool,
    language: Language,
    disk_stamp: Option<SystemTime>,
    /// Backing file vanished while open
    detached: bool,
}

impl Buffer {
    /// Read `path` into a new clean buffer
    pub fn open(
        id: BufferId,
        path: &Path,
        fs: &dyn FileSystem,
        detector: &dyn LanguageDetector,
    ) -> Result<Self, BufferError> {
        let bytes = fs.read(path).map_err(|e| read_error(path, e))?;
        let text =
            String::from_utf8(bytes).map_err(|_| BufferError::DecodeError(path.to_path_buf()))?;
        let language = detector.detect(path, &text);
        let disk_stamp = fs.modified(path).ok().flatten();

        tracing::debug!("Opened {} as {} ({} bytes)", path.display(), language, text.len());

        Ok(Self {
            id,
            path: path.to_path_buf(),
            saved: text.clone(),
            text,
            dirty: false,
            language,
            disk_stamp,
            detached: false,
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// File name shown on the tab
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Replace the chars in `range` with `new_text`.
    ///
    /// Positions past the end clamp to the end and a reversed range is treated
    /// as empty at its start, so this never fails.
    pub fn edit(&mut self, range: Range<usize>, new_text: &str) {
        let start = self.byte_offset(range.start);
        let end = self.byte_offset(range.end.max(range.start));
        self.text.replace_range(start..end, new_text);
        self.refresh_dirty();
    }

    /// Replace the whole content
    pub fn replace_all(&mut self, text: &str) {
        if self.text != text {
            self.text = text.to_string();
        }
        self.refresh_dirty();
    }

    /// Write the content to disk. On failure the buffer stays dirty.
    pub fn save(&mut self, fs: &dyn FileSystem) -> Result<(), BufferError> {
        fs.write(&self.path, self.text.as_bytes())
            .map_err(|source| BufferError::WriteError {
                path: self.path.clone(),
                source,
            })?;

        self.saved.clone_from(&self.text);
        self.dirty = false;
        self.detached = false;
        self.disk_stamp = fs.modified(&self.path).ok().flatten();
        tracing::info!("Saved {} ({} bytes)", self.path.display(), self.text.len());
        Ok(())
    }

    /// Check whether the buffer may be discarded
    pub fn close(&self, force: bool) -> Result<(), BufferError> {
        if self.dirty && !force {
            return Err(BufferError::UnsavedChanges(self.path.clone()));
        }
        if self.dirty {
            tracing::info!("Discarding unsaved changes in {}", self.path.display());
        }
        Ok(())
    }

    /// Compare the file on disk with what this buffer last read or wrote.
    /// A deleted file marks the buffer detached.
    pub fn check_disk(&mut self, fs: &dyn FileSystem) -> DiskStatus {
        if !fs.exists(&self.path) {
            self.detached = true;
            return DiskStatus::Deleted;
        }
        match fs.modified(&self.path) {
            Ok(stamp) if stamp != self.disk_stamp => DiskStatus::Modified,
            _ => DiskStatus::Unchanged,
        }
    }

    /// Replace the content with what is on disk, dropping in-memory edits
    pub fn reload(&mut self, fs: &dyn FileSystem) -> Result<(), BufferError> {
        let bytes = fs.read(&self.path).map_err(|e| read_error(&self.path, e))?;
        let text =
            String::from_utf8(bytes).map_err(|_| BufferError::DecodeError(self.path.clone()))?;
        self.saved.clone_from(&text);
        self.text = text;
        self.dirty = false;
        self.detached = false;
        self.disk_stamp = fs.modified(&self.path).ok().flatten();
        Ok(())
    }

    /// Remember the current disk stamp without touching the content
    pub fn acknowledge_disk(&mut self, fs: &dyn FileSystem) {
        self.disk_stamp = fs.modified(&self.path).ok().flatten();
    }

    fn refresh_dirty(&mut self) {
        self.dirty = self.text != self.saved;
    }

    fn byte_offset(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(offset, _)| offset)
            .unwrap_or(self.text.len())
    }
}

fn read_error(path: &Path, error: io::Error) -> BufferError {
    match error.kind() {
        io::ErrorKind::NotFound => BufferError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => BufferError::AccessDenied(path.to_path_buf()),
        io::ErrorKind::InvalidData => BufferError::DecodeError(path.to_path_buf()),
        _ => BufferError::Read {
            path: path.to_path_buf(),
            source: error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::StdFileSystem;
    use crate::test_util::MemoryFileSystem;
    use syntia_core::ExtensionDetector;

    fn open(fs: &MemoryFileSystem, path: &str) -> Buffer {
        Buffer::open(BufferId(1), Path::new(path), fs, &ExtensionDetector).unwrap()
    }

    #[test]
    fn open_is_clean_and_detects_language() {
        let fs = MemoryFileSystem::new();
        fs.insert("/p/a.py", "print(1)\n");

        let buffer = open(&fs, "/p/a.py");
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.text(), "print(1)\n");
        assert_eq!(buffer.language(), Language::Python);
        assert_eq!(buffer.file_name(), "a.py");
    }

    #[test]
    fn open_maps_failures() {
        let fs = MemoryFileSystem::new();
        fs.insert("/p/locked.txt", "secret");
        fs.deny("/p/locked.txt");
        fs.insert("/p/blob.bin", vec![0xff, 0xfe, 0x00]);

        let missing = Buffer::open(BufferId(1), Path::new("/p/nope"), &fs, &ExtensionDetector);
        assert!(matches!(missing, Err(BufferError::NotFound(_))));

        let locked = Buffer::open(BufferId(2), Path::new("/p/locked.txt"), &fs, &ExtensionDetector);
        assert!(matches!(locked, Err(BufferError::AccessDenied(_))));

        let blob = Buffer::open(BufferId(3), Path::new("/p/blob.bin"), &fs, &ExtensionDetector);
        assert!(matches!(blob, Err(BufferError::DecodeError(_))));
    }

    #[test]
    fn edit_clamps_out_of_range_positions() {
        let fs = MemoryFileSystem::new();
        fs.insert("/p/a.txt", "héllo");
        let mut buffer = open(&fs, "/p/a.txt");

        buffer.edit(1..2, "e");
        assert_eq!(buffer.text(), "hello");

        buffer.edit(100..200, "!");
        assert_eq!(buffer.text(), "hello!");

        buffer.edit(3..1, "_");
        assert_eq!(buffer.text(), "hel_lo!");
        assert!(buffer.is_dirty());
    }

    #[test]
    fn reverting_to_saved_clears_dirty() {
        let fs = MemoryFileSystem::new();
        fs.insert("/p/a.txt", "abc");
        let mut buffer = open(&fs, "/p/a.txt");

        buffer.edit(3..3, "d");
        assert!(buffer.is_dirty());
        buffer.edit(3..4, "");
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn failed_save_keeps_dirty() {
        let fs = MemoryFileSystem::new();
        fs.insert("/p/a.txt", "abc");
        let mut buffer = open(&fs, "/p/a.txt");
        buffer.edit(0..0, "x");
        fs.set_read_only("/p/a.txt", true);

        let result = buffer.save(&fs);
        assert!(matches!(result, Err(BufferError::WriteError { .. })));
        assert!(buffer.is_dirty());
        assert_eq!(fs.contents(Path::new("/p/a.txt")).unwrap(), b"abc");
    }

    #[test]
    fn close_requires_force_when_dirty() {
        let fs = MemoryFileSystem::new();
        fs.insert("/p/a.txt", "abc");
        let mut buffer = open(&fs, "/p/a.txt");
        assert!(buffer.close(false).is_ok());

        buffer.edit(0..0, "x");
        assert!(matches!(buffer.close(false), Err(BufferError::UnsavedChanges(_))));
        assert!(buffer.close(true).is_ok());
    }

    #[test]
    fn save_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.py");
        std::fs::write(&path, "x = 1\n").unwrap();

        let fs = StdFileSystem;
        let mut buffer = Buffer::open(BufferId(7), &path, &fs, &ExtensionDetector).unwrap();
        buffer.edit(0..0, "# header\n");
        buffer.edit(buffer.char_len()..buffer.char_len(), "y = 2\n");
        buffer.save(&fs).unwrap();

        assert!(!buffer.is_dirty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), buffer.text());
        assert_eq!(buffer.text(), "# header\nx = 1\ny = 2\n");
    }

    #[test]
    fn external_changes_are_detected() {
        let fs = MemoryFileSystem::new();
        fs.insert("/p/a.txt", "one");
        let mut buffer = open(&fs, "/p/a.txt");
        assert_eq!(buffer.check_disk(&fs), DiskStatus::Unchanged);

        fs.insert("/p/a.txt", "two");
        assert_eq!(buffer.check_disk(&fs), DiskStatus::Modified);
        buffer.reload(&fs).unwrap();
        assert_eq!(buffer.text(), "two");
        assert_eq!(buffer.check_disk(&fs), DiskStatus::Unchanged);

        fs.remove(Path::new("/p/a.txt"));
        assert_eq!(buffer.check_disk(&fs), DiskStatus::Deleted);
        assert!(buffer.is_detached());

        buffer.save(&fs).unwrap();
        assert!(!buffer.is_detached());
        assert!(fs.exists(Path::new("/p/a.txt")));
    }
}
