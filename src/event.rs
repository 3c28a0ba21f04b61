//! File lifecycle events delivered by a watcher or a host.

use std::fmt;
use std::str::FromStr;

use crate::error::AssetError;

/// What happened to a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileEvent {
    Create,
    Write,
    Modify,
    /// Old path of a rename. The new path arrives as its own `Create`/`Write`.
    Rename,
    Remove,
    Delete,
}

impl FileEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Write => "write",
            Self::Modify => "modify",
            Self::Rename => "rename",
            Self::Remove => "remove",
            Self::Delete => "delete",
        }
    }

    /// The source is gone, so there is nothing to read.
    pub const fn is_removal(self) -> bool {
        matches!(self, Self::Remove | Self::Delete)
    }

    /// Events that carry new content for a path.
    pub const fn is_upsert(self) -> bool {
        matches!(self, Self::Create | Self::Write | Self::Modify)
    }

    /// Explicit mutation of already-registered content. Arms the write gate.
    pub const fn is_mutation(self) -> bool {
        matches!(self, Self::Write | Self::Modify | Self::Remove | Self::Delete)
    }
}

impl fmt::Display for FileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileEvent {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "write" => Ok(Self::Write),
            "modify" => Ok(Self::Modify),
            "rename" => Ok(Self::Rename),
            "remove" => Ok(Self::Remove),
            "delete" => Ok(Self::Delete),
            _ => Err(AssetError::UnknownEvent(s.to_string())),
        }
    }
}
