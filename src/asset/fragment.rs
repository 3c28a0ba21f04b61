use std::path::{Path, PathBuf};

/// One source file's contribution to an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFragment {
    pub path: PathBuf,
    pub content: Vec<u8>,
}

impl ContentFragment {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content as text, lossy for non-UTF-8 bytes.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}
