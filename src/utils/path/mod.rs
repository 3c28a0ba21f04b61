//! Path utilities.
//!
//! - [`fs`]: file system path normalization (`normalize_path`, `path_key`)

pub mod fs;

pub use fs::{normalize_path, path_key};
