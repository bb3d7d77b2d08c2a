// ABOUTME: Rendered markdown documents shown in the preview panel.
// ABOUTME: One document per open markdown file; one of them is on display.

use std::path::{Path, PathBuf};

use crate::markdown::PreviewDocument;

#[derive(Debug, Default)]
pub struct Preview {
    documents: Vec<(PathBuf, PreviewDocument)>,
    shown: Option<PathBuf>,
}

impl Preview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.documents.iter().map(|(p, _)| p.as_path())
    }

    pub fn document(&self, path: &Path) -> Option<&PreviewDocument> {
        self.documents.iter().find(|(p, _)| p == path).map(|(_, d)| d)
    }

    pub fn shown_path(&self) -> Option<&Path> {
        self.shown.as_deref()
    }

    /// The document currently on display
    pub fn shown(&self) -> Option<&PreviewDocument> {
        self.shown.as_deref().and_then(|p| self.document(p))
    }

    /// Add or replace the document for `path` and display it
    pub fn upsert(&mut self, path: &Path, document: PreviewDocument) {
        match self.documents.iter_mut().find(|(p, _)| p == path) {
            Some((_, existing)) => *existing = document,
            None => self.documents.push((path.to_path_buf(), document)),
        }
        self.shown = Some(path.to_path_buf());
    }

    /// Display the existing document for `path`. False if there is none.
    pub fn show(&mut self, path: &Path) -> bool {
        if self.document(path).is_none() {
            return false;
        }
        self.shown = Some(path.to_path_buf());
        true
    }

    /// Drop the document for `path`. The most recently added one left is displayed.
    pub fn remove(&mut self, path: &Path) -> bool {
        let Some(index) = self.documents.iter().position(|(p, _)| p == path) else {
            return false;
        };
        self.documents.remove(index);
        if self.shown.as_deref() == Some(path) {
            self.shown = self.documents.last().map(|(p, _)| p.clone());
        }
        true
    }
}
