//! File watcher feeding the engine.
//!
//! ```text
//! notify → translate (kind → FileEvent) → filter → AssetMin::handle_path
//! ```
//!
//! No debouncing here: the engine serializes events under its lock and
//! waits out its own settle delay before reading. Outputs are never
//! watched-through: they are skipped here and again by the engine guard.

mod scan;

pub use scan::{register_all, scan_sources};

use std::path::{Path, PathBuf};

use crossbeam::channel::{self, Receiver};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::asset::ArtifactKind;
use crate::dispatch::AssetMin;
use crate::event::FileEvent;
use crate::fs::Filesystem;
use crate::debug;
use crate::logger::{status_error, status_success, status_warning};
use crate::utils::path::path_key;

/// Check if path is a temp/backup file (editor artifacts)
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// A path the engine may accept: supported extension, not an editor artifact.
pub fn is_candidate(path: &Path) -> bool {
    if is_temp_file(path) {
        return false;
    }
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default();
    ArtifactKind::EXTENSIONS.contains(&ext.as_str())
}

/// Map one notify event to engine events, one per affected path.
pub fn translate(event: &notify::Event) -> Vec<(PathBuf, FileEvent)> {
    let single = |kind: FileEvent| {
        event
            .paths
            .iter()
            .map(|p| (p.clone(), kind))
            .collect::<Vec<_>>()
    };

    match event.kind {
        EventKind::Create(_) => single(FileEvent::Create),
        EventKind::Remove(_) => single(FileEvent::Remove),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => single(FileEvent::Rename),
            RenameMode::To => single(FileEvent::Create),
            RenameMode::Both => match event.paths.as_slice() {
                [from, to] => vec![
                    (from.clone(), FileEvent::Rename),
                    (to.clone(), FileEvent::Create),
                ],
                _ => Vec::new(),
            },
            // Backends that can't tell the two sides apart: decide by existence.
            RenameMode::Any | RenameMode::Other => event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        FileEvent::Create
                    } else {
                        FileEvent::Rename
                    };
                    (p.clone(), kind)
                })
                .collect(),
        },
        EventKind::Modify(_) => single(FileEvent::Write),
        _ => Vec::new(),
    }
}

/// Recursive watcher over the theme and source roots.
pub struct AssetWatcher {
    notify_rx: Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    /// `path_key` of the script preamble file, if watched.
    preamble_key: Option<String>,
}

impl AssetWatcher {
    /// Start watching immediately; events buffer until [`Self::run`].
    pub fn new(roots: &[PathBuf]) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        // Skip non-existent roots
        for root in roots {
            if root.is_dir() {
                watcher.watch(root, RecursiveMode::Recursive)?;
                debug!("watch"; "watching {}", root.display());
            }
        }

        Ok(Self {
            notify_rx,
            watcher,
            preamble_key: None,
        })
    }

    /// Also watch the script preamble file; a change to it recompiles the
    /// script artifact instead of being registered as a fragment.
    pub fn watch_preamble(&mut self, file: &Path) -> notify::Result<()> {
        if file.is_file() {
            self.watcher.watch(file, RecursiveMode::NonRecursive)?;
        }
        self.preamble_key = Some(path_key(file));
        Ok(())
    }

    /// Feed events to `engine` until `shutdown` fires or disconnects.
    pub fn run<F: Filesystem>(self, engine: &AssetMin<F>, shutdown: &Receiver<()>) {
        loop {
            channel::select! {
                recv(self.notify_rx) -> msg => match msg {
                    Ok(Ok(event)) => self.forward(engine, &event),
                    Ok(Err(e)) => status_warning(&format!("notify error: {e}")),
                    Err(_) => break,
                },
                recv(shutdown) -> _ => break,
            }
        }
        debug!("watch"; "stopped");
    }

    fn forward<F: Filesystem>(&self, engine: &AssetMin<F>, event: &notify::Event) {
        debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);
        for (path, kind) in translate(event) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            if self.preamble_key.as_deref() == Some(path_key(&path).as_str()) {
                match engine.force_recompile(ArtifactKind::Script.extension()) {
                    Ok(()) => status_success(&format!("preamble {name}")),
                    Err(e) => status_error(&format!("preamble {name}"), &e.to_string()),
                }
                continue;
            }
            if !is_candidate(&path) || engine.is_output(&path) {
                continue;
            }
            if kind.is_upsert() && path.is_dir() {
                continue;
            }
            match engine.handle_path(&path, kind) {
                Ok(()) => status_success(&format!("{kind} {name}")),
                Err(e) => status_error(&format!("{kind} {name}"), &e.to_string()),
            }
        }
    }
}
