//! Create/write/rename/remove semantics over one ordered sequence.
//!
//! A rename reaches us as `rename(old)` followed by `create(new)` with the
//! same bytes. `rename` itself changes nothing; the later upsert finds the
//! orphaned entry by content and re-keys it in place, so the output keeps
//! exactly one copy and the original position.

use std::path::PathBuf;

use super::fragment::ContentFragment;
use crate::event::FileEvent;

/// What an event did to a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Appended as a new entry.
    Inserted,
    /// Content replaced in place.
    Updated,
    /// An entry with identical content was re-keyed from `from`.
    Recovered { from: PathBuf },
    Removed,
    /// No-op: rename, unchanged content, or removal of an untracked path.
    Unchanged,
}

impl Outcome {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Apply `event` for `fragment.path` to `section`.
pub fn apply(section: &mut Vec<ContentFragment>, event: FileEvent, fragment: ContentFragment) -> Outcome {
    match event {
        FileEvent::Create | FileEvent::Write | FileEvent::Modify => upsert(section, fragment),
        FileEvent::Rename => Outcome::Unchanged,
        FileEvent::Remove | FileEvent::Delete => remove(section, &fragment.path),
    }
}

/// Single-slot variant: an upsert replaces whatever the section held,
/// a removal clears it only when `fragment.path` is the current occupant.
pub fn replace(section: &mut Vec<ContentFragment>, event: FileEvent, fragment: ContentFragment) -> Outcome {
    match event {
        FileEvent::Create | FileEvent::Write | FileEvent::Modify => {
            if let [only] = section.as_slice()
                && only.path == fragment.path
                && only.content == fragment.content
            {
                return Outcome::Unchanged;
            }
            let had_entry = !section.is_empty();
            section.clear();
            section.push(fragment);
            if had_entry { Outcome::Updated } else { Outcome::Inserted }
        }
        FileEvent::Rename => Outcome::Unchanged,
        FileEvent::Remove | FileEvent::Delete => remove(section, &fragment.path),
    }
}

fn upsert(section: &mut Vec<ContentFragment>, fragment: ContentFragment) -> Outcome {
    if let Some(existing) = section.iter_mut().find(|f| f.path == fragment.path) {
        if existing.content == fragment.content {
            return Outcome::Unchanged;
        }
        existing.content = fragment.content;
        return Outcome::Updated;
    }

    // Empty files are placeholders, never rename evidence.
    if !fragment.content.is_empty()
        && let Some(orphan) = section.iter_mut().find(|f| f.content == fragment.content)
    {
        let from = std::mem::replace(&mut orphan.path, fragment.path);
        return Outcome::Recovered { from };
    }

    section.push(fragment);
    Outcome::Inserted
}

fn remove(section: &mut Vec<ContentFragment>, path: &std::path::Path) -> Outcome {
    match section.iter().position(|f| f.path == path) {
        Some(idx) => {
            section.remove(idx);
            Outcome::Removed
        }
        None => Outcome::Unchanged,
    }
}
