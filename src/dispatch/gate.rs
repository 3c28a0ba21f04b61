//! Write gate: decides whether a reconciled event reaches the disk.
//!
//! ```text
//! Suppressed ──(output missing | write | modify | remove | delete)──▶ Armed
//! ```
//!
//! The transition is one-way. While suppressed, events only update memory,
//! which lets a host replay `create` for every file already on disk at
//! startup without rewriting outputs that are already current.

use crate::event::FileEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteGate {
    #[default]
    Suppressed,
    Armed,
}

impl WriteGate {
    /// Arm if `event` qualifies, then report whether writing is allowed.
    pub fn admit(&mut self, event: FileEvent, output_exists: bool) -> bool {
        if *self == Self::Suppressed && (!output_exists || event.is_mutation()) {
            *self = Self::Armed;
        }
        self.is_armed()
    }

    pub fn is_armed(self) -> bool {
        self == Self::Armed
    }
}
