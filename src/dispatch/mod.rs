//! Event dispatcher: routes file events to artifact stores and flushes
//! them to disk.
//!
//! ```text
//! handle_event(name, ext, path, event)
//!   ├─ own output?        → skip (feedback guard)
//!   ├─ route by extension → ArtifactKind
//!   ├─ lock
//!   ├─ settle, read       (not for rename/remove/delete)
//!   ├─ reconcile          (document: DocumentPolicy, favicon: single slot)
//!   ├─ write gate         → memory-only while suppressed
//!   └─ serialize → minify → write
//! ```
//!
//! One lock covers everything after the guard, so events apply atomically
//! in arrival order and no two writes interleave.

mod gate;
#[cfg(test)]
mod tests;

pub use gate::WriteGate;

use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;

use crate::asset::{
    ArtifactKind, ArtifactStore, ContentFragment, DocumentOutcome, DocumentPolicy, FilePreamble,
    Minifiers, Outcome, Preamble, Section, StrictMode, document, reconcile,
};
use crate::config::AssetConfig;
use crate::error::{AssetError, EventError};
use crate::event::FileEvent;
use crate::fs::{DiskFs, Filesystem};
use crate::utils::path::path_key;
use crate::{debug, log};

/// The aggregation engine. Construct once per host and share by reference.
pub struct AssetMin<F: Filesystem = DiskFs> {
    fs: F,
    minifiers: Minifiers,
    shell_name: String,
    app_name: String,
    settle_delay: Duration,
    /// `path_key` of every output, for the feedback guard.
    output_keys: Vec<String>,
    state: Mutex<State>,
}

struct State {
    /// Indexed by `ArtifactKind as usize`, i.e. `ArtifactKind::ALL` order.
    stores: [ArtifactStore; 5],
    gate: WriteGate,
}

impl State {
    fn store(&self, kind: ArtifactKind) -> &ArtifactStore {
        &self.stores[kind as usize]
    }
}

// ============================================================================
// construction
// ============================================================================

impl<F: Filesystem> AssetMin<F> {
    /// Engine with the minifiers selected by `[build] minify`.
    pub fn new(config: &AssetConfig, fs: F) -> Self {
        let minifiers = if config.build.minify {
            Minifiers::standard()
        } else {
            Minifiers::passthrough()
        };
        Self::with_minifiers(config, fs, minifiers)
    }

    pub fn with_minifiers(config: &AssetConfig, fs: F, minifiers: Minifiers) -> Self {
        let paths = &config.paths;
        let app_name = &config.build.app_name;
        let stores = ArtifactKind::ALL.map(|kind| {
            let store = ArtifactStore::new(kind, &paths.output, &paths.theme, app_name);
            match kind {
                ArtifactKind::Script => store.with_preamble(script_preamble(config)),
                _ => store,
            }
        });
        let output_keys = stores.iter().map(|s| path_key(s.output_path())).collect();

        let engine = Self {
            fs,
            minifiers,
            shell_name: config.build.shell.clone(),
            app_name: app_name.clone(),
            settle_delay: config.settle_delay(),
            output_keys,
            state: Mutex::new(State {
                stores,
                gate: WriteGate::default(),
            }),
        };
        engine.adopt_existing_document();
        engine
    }

    /// Replace the preamble of one artifact.
    pub fn with_preamble(mut self, kind: ArtifactKind, preamble: impl Preamble + 'static) -> Self {
        self.state.get_mut().stores[kind as usize].set_preamble(Box::new(preamble));
        self
    }

    /// Keep a document output that is already on disk as the shell.
    fn adopt_existing_document(&self) {
        let mut state = self.state.lock();
        let store = &mut state.stores[ArtifactKind::Document as usize];
        let path = store.output_path().to_path_buf();
        if !self.fs.exists(&path) {
            return;
        }
        match self.fs.read(&path) {
            Ok(content) => {
                let point = document::adopt_shell(store, ContentFragment::new(&path, content));
                debug!("asset"; "adopted existing {} as shell, split at {}", path.display(), point);
            }
            Err(err) => log!("warning"; "cannot adopt {}: {}", path.display(), err),
        }
    }
}

fn script_preamble(config: &AssetConfig) -> StrictMode {
    match &config.script.preamble_file {
        Some(file) => StrictMode::with_initializer(FilePreamble(file.clone())),
        None => StrictMode::new(),
    }
}

// ============================================================================
// events
// ============================================================================

impl<F: Filesystem> AssetMin<F> {
    /// Apply one watcher event.
    ///
    /// `extension` includes the dot (`.js`). Events for the engine's own
    /// outputs succeed without doing anything.
    pub fn handle_event(
        &self,
        file_name: &str,
        extension: &str,
        file_path: &Path,
        event: FileEvent,
    ) -> Result<(), EventError> {
        self.dispatch(file_name, extension, file_path, event, None)
    }

    /// [`Self::handle_event`] with name and extension taken from `path`.
    pub fn handle_path(&self, path: &Path, event: FileEvent) -> Result<(), EventError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.dispatch(&file_name, &extension_of(path), path, event, None)
    }

    /// Apply `content` for `file_name` as a `write`, without reading disk.
    pub fn update_content_directly(
        &self,
        file_name: &str,
        content: impl Into<Vec<u8>>,
    ) -> Result<(), EventError> {
        let path = Path::new(file_name);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.dispatch(
            &name,
            &extension_of(path),
            path,
            FileEvent::Write,
            Some(content.into()),
        )
    }

    fn dispatch(
        &self,
        file_name: &str,
        extension: &str,
        file_path: &Path,
        event: FileEvent,
        content: Option<Vec<u8>>,
    ) -> Result<(), EventError> {
        let fail = |cause: AssetError| EventError::new(event, extension, file_path, cause);

        if file_path.as_os_str().is_empty() {
            return Err(fail(AssetError::EmptyPath));
        }
        if self.is_output(file_path) {
            debug!("asset"; "skip own output {}", file_path.display());
            return Ok(());
        }
        let kind = ArtifactKind::route(extension, file_name)
            .ok_or_else(|| fail(AssetError::UnsupportedExtension(extension.to_string())))?;

        let mut state = self.state.lock();

        let content = match content {
            Some(content) => content,
            // rename is a no-op and remove/delete have nothing left to read
            None if !event.is_upsert() => Vec::new(),
            None => self.read_settled(file_path).map_err(fail)?,
        };
        debug!("asset"; "{} {} {}", extension, event, file_path.display());

        self.apply(&mut state, kind, event, ContentFragment::new(file_path, content))
            .map_err(fail)
    }

    fn read_settled(&self, path: &Path) -> Result<Vec<u8>, AssetError> {
        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }
        self.fs.read(path).map_err(|error| AssetError::Read {
            path: path.to_path_buf(),
            error,
        })
    }

    fn apply(
        &self,
        state: &mut State,
        kind: ArtifactKind,
        event: FileEvent,
        fragment: ContentFragment,
    ) -> Result<(), AssetError> {
        let State { stores, gate } = state;
        let store = &mut stores[kind as usize];
        let path = fragment.path.clone();

        match kind {
            ArtifactKind::Document => {
                let policy = DocumentPolicy {
                    shell_name: &self.shell_name,
                    app_name: &self.app_name,
                };
                match policy.apply(store, event, fragment) {
                    DocumentOutcome::Standalone => {
                        log!("asset"; "ignored standalone document {}", path.display());
                        return Ok(());
                    }
                    DocumentOutcome::Shell(point) if point.is_explicit() => {
                        debug!("asset"; "shell {} split at {}", path.display(), point);
                    }
                    DocumentOutcome::Shell(point) => {
                        log!("warning"; "no module marker in {}, split at {}", path.display(), point);
                    }
                    DocumentOutcome::ShellReset => {
                        log!("asset"; "shell {} removed, default document restored", path.display());
                    }
                    DocumentOutcome::Module(outcome) => trace_outcome(&outcome, &path),
                }
            }
            ArtifactKind::Favicon => {
                let outcome = reconcile::replace(store.section_mut(Section::Middle), event, fragment);
                trace_outcome(&outcome, &path);
            }
            ArtifactKind::Script | ArtifactKind::Stylesheet | ArtifactKind::Sprite => {
                let section = store.section_for(&path);
                let outcome = reconcile::apply(store.section_mut(section), event, fragment);
                trace_outcome(&outcome, &path);
            }
        }

        let output_exists = self.fs.exists(store.output_path());
        if !gate.admit(event, output_exists) {
            debug!("asset"; "{} kept in memory, writes suppressed", kind);
            return Ok(());
        }
        if is_empty_favicon(store) {
            debug!("asset"; "favicon slot empty, nothing to write");
            return Ok(());
        }
        self.flush(store)
    }

    /// Serialize, minify and write one store.
    fn flush(&self, store: &ArtifactStore) -> Result<(), AssetError> {
        let merged = store.serialize()?;
        let minified = self.minifiers.minify(store.kind(), &merged)?;
        let output = store.output_path();
        self.fs
            .write(output, &minified)
            .map_err(|error| AssetError::Write {
                path: output.to_path_buf(),
                error,
            })?;
        debug!("asset"; "wrote {} ({} bytes)", output.display(), minified.len());
        Ok(())
    }
}

fn is_empty_favicon(store: &ArtifactStore) -> bool {
    store.kind() == ArtifactKind::Favicon && store.section(Section::Middle).is_empty()
}

fn trace_outcome(outcome: &Outcome, path: &Path) {
    if let Outcome::Recovered { from } = outcome {
        debug!("asset"; "{} renamed to {}", from.display(), path.display());
    }
}

// ============================================================================
// host api
// ============================================================================

impl<F: Filesystem> AssetMin<F> {
    /// Re-serialize and write every artifact for `extension`, ignoring the
    /// write gate. `.svg` covers both sprite and favicon; an empty favicon
    /// is skipped.
    pub fn force_recompile(&self, extension: &str) -> Result<(), AssetError> {
        let ext = normalize_extension(extension);
        let kinds: Vec<_> = ArtifactKind::ALL
            .into_iter()
            .filter(|kind| kind.extension() == ext)
            .collect();
        if kinds.is_empty() {
            return Err(AssetError::UnsupportedExtension(extension.to_string()));
        }

        let state = self.state.lock();
        for kind in kinds {
            let store = state.store(kind);
            if is_empty_favicon(store) {
                debug!("asset"; "no favicon registered, skipping");
                continue;
            }
            self.flush(store)?;
        }
        Ok(())
    }

    /// [`Self::force_recompile`] for every supported extension.
    pub fn recompile_all(&self) -> Result<(), AssetError> {
        ArtifactKind::EXTENSIONS
            .iter()
            .try_for_each(|ext| self.force_recompile(ext))
    }

    /// Every output path, for the host watcher to exclude.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        let state = self.state.lock();
        state
            .stores
            .iter()
            .map(|s| s.output_path().to_path_buf())
            .collect()
    }

    pub fn output_path(&self, kind: ArtifactKind) -> PathBuf {
        self.state.lock().store(kind).output_path().to_path_buf()
    }

    /// Whether `path` is one of the engine's outputs (case-insensitive).
    pub fn is_output(&self, path: &Path) -> bool {
        let key = path_key(path);
        self.output_keys.contains(&key)
    }

    /// The merged buffer before minification.
    pub fn serialize(&self, kind: ArtifactKind) -> Result<Vec<u8>, AssetError> {
        self.state.lock().store(kind).serialize()
    }

    /// What would be written for `kind` right now.
    pub fn minified_content(&self, kind: ArtifactKind) -> Result<Vec<u8>, AssetError> {
        let merged = self.serialize(kind)?;
        self.minifiers.minify(kind, &merged)
    }

    pub fn is_write_enabled(&self) -> bool {
        self.state.lock().gate.is_armed()
    }

    /// Forget every source fragment. Boilerplate and an adopted shell stay.
    pub fn clear_sources(&self) {
        let mut state = self.state.lock();
        for store in &mut state.stores {
            store.clear_sources();
        }
    }

    pub fn filesystem(&self) -> &F {
        &self.fs
    }
}

/// `.JS` / `js` → `.js`
fn normalize_extension(extension: &str) -> String {
    format!(".{}", extension.trim_start_matches('.').to_ascii_lowercase())
}

/// Extension of `path` with its leading dot, or an empty string.
fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
