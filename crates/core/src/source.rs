//! File access used by document loading and the structural validators.
//!
//! The [`SourceProvider`] trait keeps file-existence checks out of the
//! validators themselves, so manifests and scripts can be checked against
//! an in-memory file set in tests.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::error::EpilogError;

pub trait SourceProvider {
    /// Read the full text of a document.
    fn read_source(&self, path: &Path) -> Result<String, EpilogError>;

    /// Whether `path` names an existing regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Resolve a path written inside a document against that document's
    /// directory.
    fn resolve(&self, base: &Path, relative: &str) -> PathBuf {
        base.join(relative)
    }
}

/// Delegates to `std::fs`.
pub struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn read_source(&self, path: &Path) -> Result<String, EpilogError> {
        std::fs::read_to_string(path).map_err(|e| EpilogError::io(path, e))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Maps normalized paths to file contents.
#[derive(Default)]
pub struct InMemoryProvider {
    files: HashMap<PathBuf, String>,
}

impl InMemoryProvider {
    pub fn with_file(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.files
            .insert(Self::normalize_path(path.as_ref()), text.into());
        self
    }

    /// Resolve `.` and `..` without touching the filesystem.
    fn normalize_path(path: &Path) -> PathBuf {
        let mut components = Vec::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    components.pop();
                }
                other => components.push(other),
            }
        }
        components.iter().collect()
    }
}

impl SourceProvider for InMemoryProvider {
    fn read_source(&self, path: &Path) -> Result<String, EpilogError> {
        let normalized = Self::normalize_path(path);
        self.files.get(&normalized).cloned().ok_or_else(|| {
            EpilogError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("file not found in memory: {}", normalized.display()),
                ),
            )
        })
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&Self::normalize_path(path))
    }

    fn resolve(&self, base: &Path, relative: &str) -> PathBuf {
        Self::normalize_path(&base.join(relative))
    }
}
