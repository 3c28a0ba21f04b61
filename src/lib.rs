//! Incremental asset bundler.
//!
//! Theme and module source files are merged into one artifact per media
//! type (`main.js`, `style.css`, `sprite.svg`, `favicon.svg`,
//! `index.html`) and kept current as files change. The host feeds file
//! events to an [`AssetMin`] engine, which reconciles them in memory and
//! rewrites the affected artifact.

pub mod asset;
pub mod config;
pub mod dispatch;
pub mod embed;
pub mod error;
pub mod event;
pub mod fs;
pub mod logger;
pub mod serve;
pub mod utils;
pub mod watch;

pub use asset::ArtifactKind;
pub use config::AssetConfig;
pub use dispatch::AssetMin;
pub use error::{AssetError, EventError};
pub use event::FileEvent;
pub use fs::{DiskFs, Filesystem, MemoryFs};
