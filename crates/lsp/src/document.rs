//! Open documents and their latest analysis.

use std::collections::HashMap;
use std::path::PathBuf;

use epilog_core::{analyze, Analysis, Dialect};

/// Tracks which documents are currently open in the editor.
#[derive(Default)]
pub struct DocumentState {
    documents: HashMap<String, DocumentInfo>,
}

/// Information about a single open document.
pub struct DocumentInfo {
    /// File system path for this document.
    pub path: PathBuf,
    /// Editor-reported version number.
    pub version: i32,
    /// Analysis of the latest content from the editor.
    pub analysis: Analysis,
}

impl DocumentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened document.
    pub fn open(&mut self, uri: &str, path: PathBuf, version: i32, dialect: Dialect, text: &str) {
        tracing::debug!(uri, ?dialect, version, "document opened");
        self.documents.insert(
            uri.to_owned(),
            DocumentInfo {
                path,
                version,
                analysis: analyze(text, dialect),
            },
        );
    }

    /// Replace the content of an open document and analyze it again.
    /// Returns false when the document is not tracked.
    pub fn change(&mut self, uri: &str, version: i32, text: &str) -> bool {
        match self.documents.get_mut(uri) {
            Some(doc) => {
                doc.version = version;
                doc.analysis = analyze(text, doc.analysis.dialect);
                true
            }
            None => {
                tracing::warn!(uri, "change for a document that is not open");
                false
            }
        }
    }

    /// Remove a closed document from tracking.
    pub fn close(&mut self, uri: &str) {
        self.documents.remove(uri);
    }

    pub fn get(&self, uri: &str) -> Option<&DocumentInfo> {
        self.documents.get(uri)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
