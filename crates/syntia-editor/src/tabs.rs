// ABOUTME: Ordered registry of editor tabs, one buffer per tab.
// ABOUTME: Handles de-duplication by path, activation, closing, and reordering.

use std::path::Path;

use crate::buffer::{Buffer, BufferError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(pub u64);

/// Extra cells each tab header takes beyond its title
const TAB_PADDING: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum TabError {
    #[error("Tab index {index} out of range ({len} tabs open)")]
    OutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

#[derive(Debug)]
pub struct Tab {
    id: TabId,
    buffer: Buffer,
}

impl Tab {
    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    pub fn into_buffer(self) -> Buffer {
        self.buffer
    }

    pub fn title(&self) -> String {
        self.buffer.file_name()
    }

    /// Title with a trailing `*` while the buffer has unsaved changes
    pub fn display_title(&self) -> String {
        if self.buffer.is_dirty() {
            format!("{}*", self.title())
        } else {
            self.title()
        }
    }
}

#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: Vec<Tab>,
    active: Option<usize>,
    next_id: u64,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tab> {
        self.tabs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tab> {
        self.tabs.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&Tab> {
        self.tabs.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Tab> {
        self.tabs.get_mut(index)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&Tab> {
        self.active.and_then(|i| self.tabs.get(i))
    }

    pub fn active_mut(&mut self) -> Option<&mut Tab> {
        self.active.and_then(|i| self.tabs.get_mut(i))
    }

    pub fn find_by_path(&self, path: &Path) -> Option<usize> {
        self.tabs.iter().position(|t| t.buffer.path() == path)
    }

    pub fn index_of(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }

    /// Indices of tabs with unsaved changes
    pub fn dirty_tabs(&self) -> Vec<usize> {
        self.tabs
            .iter()
            .enumerate()
            .filter(|(_, t)| t.buffer.is_dirty())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.tabs.iter().any(|t| t.buffer.is_dirty())
    }

    /// Add a tab for `buffer` and make it active.
    ///
    /// If a tab for the same path is already open, that tab is activated and
    /// `buffer` is dropped.
    pub fn open_tab(&mut self, buffer: Buffer) -> TabId {
        if let Some(index) = self.find_by_path(buffer.path()) {
            tracing::info!("{} already open, switching to tab {}", buffer.path().display(), index);
            self.active = Some(index);
            return self.tabs[index].id;
        }

        let id = TabId(self.next_id);
        self.next_id += 1;
        self.tabs.push(Tab { id, buffer });
        self.active = Some(self.tabs.len() - 1);
        tracing::debug!("Opened tab {:?} at index {}", id, self.tabs.len() - 1);
        id
    }

    /// Close the tab at `index`.
    ///
    /// Fails with `UnsavedChanges` when its buffer is dirty and `force` is
    /// false. When the active tab closes, the tab now at the same position
    /// becomes active, or the one just below it.
    pub fn close_tab(&mut self, index: usize, force: bool) -> Result<Tab, TabError> {
        let tab = self.tabs.get(index).ok_or(TabError::OutOfRange {
            index,
            len: self.tabs.len(),
        })?;
        tab.buffer.close(force)?;

        let removed = self.tabs.remove(index);
        self.active = match self.active {
            _ if self.tabs.is_empty() => None,
            Some(active) if active == index => Some(index.min(self.tabs.len() - 1)),
            Some(active) if active > index => Some(active - 1),
            other => other,
        };

        tracing::debug!("Closed tab {:?}, active is now {:?}", removed.id, self.active);
        Ok(removed)
    }

    pub fn switch_to(&mut self, index: usize) -> Result<(), TabError> {
        if index >= self.tabs.len() {
            return Err(TabError::OutOfRange {
                index,
                len: self.tabs.len(),
            });
        }
        self.active = Some(index);
        Ok(())
    }

    /// Move the tab at `from` to position `to`. The active tab stays the same tab.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), TabError> {
        let len = self.tabs.len();
        for index in [from, to] {
            if index >= len {
                return Err(TabError::OutOfRange { index, len });
            }
        }

        let active_id = self.active().map(|t| t.id);
        let tab = self.tabs.remove(from);
        self.tabs.insert(to, tab);
        self.active = active_id.and_then(|id| self.index_of(id));
        Ok(())
    }

    /// Which tab header covers column `x` of the tab strip
    pub fn tab_at_column(&self, x: usize) -> Option<usize> {
        let mut start = 0;
        for (index, tab) in self.tabs.iter().enumerate() {
            let width = tab.title().chars().count() + TAB_PADDING;
            if x < start + width {
                return Some(index);
            }
            start += width;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferId;
    use crate::test_util::MemoryFileSystem;
    use syntia_core::ExtensionDetector;

    fn registry_with(fs: &MemoryFileSystem, names: &[&str]) -> TabRegistry {
        let mut tabs = TabRegistry::new();
        for (i, name) in names.iter().enumerate() {
            let path = format!("/p/{name}");
            fs.insert(path.clone(), format!("content of {name}"));
            let buffer =
                Buffer::open(BufferId(i as u64), Path::new(&path), fs, &ExtensionDetector).unwrap();
            tabs.open_tab(buffer);
        }
        tabs
    }

    fn titles(tabs: &TabRegistry) -> Vec<String> {
        tabs.iter().map(|t| t.title()).collect()
    }

    #[test]
    fn opening_same_path_twice_switches() {
        let fs = MemoryFileSystem::new();
        let mut tabs = registry_with(&fs, &["a.py", "b.py"]);
        let first_id = tabs.get(0).unwrap().id();

        let again = Buffer::open(BufferId(9), Path::new("/p/a.py"), &fs, &ExtensionDetector).unwrap();
        let id = tabs.open_tab(again);

        assert_eq!(id, first_id);
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs.active_index(), Some(0));
    }

    #[test]
    fn closing_active_picks_same_position_then_lower() {
        let fs = MemoryFileSystem::new();
        let mut tabs = registry_with(&fs, &["a", "b", "c"]);

        tabs.switch_to(1).unwrap();
        tabs.close_tab(1, false).unwrap();
        assert_eq!(titles(&tabs), vec!["a", "c"]);
        assert_eq!(tabs.active().unwrap().title(), "c");

        tabs.close_tab(1, false).unwrap();
        assert_eq!(tabs.active().unwrap().title(), "a");

        tabs.close_tab(0, false).unwrap();
        assert!(tabs.is_empty());
        assert_eq!(tabs.active_index(), None);
    }

    #[test]
    fn closing_before_active_keeps_identity() {
        let fs = MemoryFileSystem::new();
        let mut tabs = registry_with(&fs, &["a", "b", "c"]);
        let c_id = tabs.get(2).unwrap().id();

        tabs.close_tab(0, false).unwrap();
        assert_eq!(tabs.active().unwrap().id(), c_id);
        assert_eq!(tabs.index_of(c_id), Some(1));
    }

    #[test]
    fn dirty_tab_needs_force() {
        let fs = MemoryFileSystem::new();
        let mut tabs = registry_with(&fs, &["a.py"]);
        tabs.active_mut().unwrap().buffer_mut().edit(0..0, "x");
        assert_eq!(tabs.active().unwrap().display_title(), "a.py*");

        let result = tabs.close_tab(0, false);
        assert!(matches!(result, Err(TabError::Buffer(BufferError::UnsavedChanges(_)))));
        assert_eq!(tabs.len(), 1);

        tabs.close_tab(0, true).unwrap();
        assert!(tabs.is_empty());
    }

    #[test]
    fn out_of_range_indices() {
        let fs = MemoryFileSystem::new();
        let mut tabs = registry_with(&fs, &["a"]);

        assert!(matches!(tabs.switch_to(3), Err(TabError::OutOfRange { index: 3, len: 1 })));
        assert!(matches!(tabs.close_tab(1, true), Err(TabError::OutOfRange { .. })));
        assert!(matches!(tabs.reorder(0, 5), Err(TabError::OutOfRange { .. })));
    }

    #[test]
    fn switch_is_idempotent() {
        let fs = MemoryFileSystem::new();
        let mut tabs = registry_with(&fs, &["a", "b"]);
        tabs.switch_to(0).unwrap();
        tabs.switch_to(0).unwrap();
        assert_eq!(tabs.active_index(), Some(0));
        assert_eq!(titles(&tabs), vec!["a", "b"]);
    }

    #[test]
    fn reorder_keeps_active_tab() {
        let fs = MemoryFileSystem::new();
        let mut tabs = registry_with(&fs, &["a", "b", "c"]);
        tabs.switch_to(0).unwrap();

        tabs.reorder(0, 2).unwrap();
        assert_eq!(titles(&tabs), vec!["b", "c", "a"]);
        assert_eq!(tabs.active().unwrap().title(), "a");
        assert_eq!(tabs.active_index(), Some(2));
    }

    #[test]
    fn hit_test_tab_strip() {
        let fs = MemoryFileSystem::new();
        // "a.py" occupies 8 cells, "b.rs" the next 8
        let tabs = registry_with(&fs, &["a.py", "b.rs"]);

        assert_eq!(tabs.tab_at_column(0), Some(0));
        assert_eq!(tabs.tab_at_column(7), Some(0));
        assert_eq!(tabs.tab_at_column(8), Some(1));
        assert_eq!(tabs.tab_at_column(16), None);
    }
}
