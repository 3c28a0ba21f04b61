//! Initial registration of every source already on disk.

use std::path::PathBuf;

use jwalk::WalkDir;

use super::is_candidate;
use crate::dispatch::AssetMin;
use crate::event::FileEvent;
use crate::fs::Filesystem;
use crate::{debug, log};

/// Supported source files under `roots`, sorted per root, roots in order.
pub fn scan_sources(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for root in roots {
        if !root.is_dir() {
            debug!("watch"; "skip missing root {}", root.display());
            continue;
        }
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path())
            .filter(|p| is_candidate(p))
            .collect();
        files.sort();
        for file in files {
            if !found.contains(&file) {
                found.push(file);
            }
        }
    }
    found
}

/// Register every file as `create`. Failures are logged and skipped.
///
/// Returns how many files were registered.
pub fn register_all<F: Filesystem>(engine: &AssetMin<F>, roots: &[PathBuf]) -> usize {
    let mut count = 0;
    for path in scan_sources(roots) {
        if engine.is_output(&path) {
            continue;
        }
        match engine.handle_path(&path, FileEvent::Create) {
            Ok(()) => count += 1,
            Err(e) => log!("error"; "{}", e),
        }
    }
    debug!("watch"; "registered {} sources", count);
    count
}
