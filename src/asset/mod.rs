//! Artifact content model and the rules that mutate it.

pub mod document;
mod fragment;
mod kind;
pub mod minify;
pub mod preamble;
pub mod reconcile;
mod store;

// Types
pub use fragment::ContentFragment;
pub use kind::{ArtifactKind, FAVICON_NAME};
pub use store::{ArtifactStore, Section};

// Capabilities
pub use minify::{Minifiers, Minify};
pub use preamble::{FilePreamble, Preamble, StaticPreamble, StrictMode};

pub use document::{DocumentOutcome, DocumentPolicy, SplitPoint};
pub use reconcile::Outcome;
