//! Path normalization utilities.
//!
//! - `normalize_path` - absolute, symlink-resolved form, also for paths
//!   that no longer exist (removed sources)
//! - `path_key` - case-insensitive comparison key

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Relative paths are joined with the current directory, `.`/`..` are
/// resolved lexically, and the deepest existing ancestor is canonicalized
/// so a deleted file still normalizes under the same prefix as its
/// directory.
///
/// # Example
/// ```ignore
/// let abs = normalize_path(Path::new("./web/theme/a.js"));
/// ```
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    let cleaned = clean(&absolute);

    let mut missing = Vec::new();
    let mut ancestor = cleaned.as_path();
    loop {
        if let Ok(canonical) = ancestor.canonicalize() {
            return missing.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (ancestor.parent(), ancestor.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                ancestor = parent;
            }
            _ => return cleaned,
        }
    }
}

/// Case-insensitive, separator-agnostic key of a normalized path.
pub fn path_key(path: &Path) -> String {
    normalize_path(path)
        .to_string_lossy()
        .replace('\\', "/")
        .to_lowercase()
}

/// Resolve `.` and `..` without touching the file system.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
