//! Per-artifact ordered content model.
//!
//! ```text
//! preamble → open[..] → middle[..] → close[..]
//! ```
//!
//! `open` holds theme fragments (and boilerplate/shell heads), `middle`
//! ordinary module fragments in arrival order, `close` only boilerplate or
//! the tail of an adopted shell. Every fragment is followed by a newline.

use std::path::{Path, PathBuf};

use super::document;
use super::fragment::ContentFragment;
use super::kind::ArtifactKind;
use super::preamble::{Preamble, strip_leading_use_strict};
use crate::error::AssetError;
use crate::utils::path::normalize_path;

pub(crate) const SPRITE_OPEN: &str = r#"<svg class="sprite-icons" xmlns="http://www.w3.org/2000/svg" role="img" aria-hidden="true" focusable="false">
<defs>"#;
pub(crate) const SPRITE_CLOSE: &str = "</defs>\n</svg>";

/// One of the three ordered sequences of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Open,
    Middle,
    Close,
}

/// Ordered fragments of one output artifact.
pub struct ArtifactStore {
    kind: ArtifactKind,
    output_path: PathBuf,
    theme_root: PathBuf,
    preamble: Option<Box<dyn Preamble>>,
    open: Vec<ContentFragment>,
    middle: Vec<ContentFragment>,
    close: Vec<ContentFragment>,
}

impl ArtifactStore {
    /// Create a store with the kind's default boilerplate.
    pub fn new(kind: ArtifactKind, output_dir: &Path, theme_root: &Path, app_name: &str) -> Self {
        let (open, close) = boilerplate(kind, app_name);
        Self {
            kind,
            output_path: output_dir.join(kind.output_name()),
            theme_root: normalize_path(theme_root),
            preamble: None,
            open,
            middle: Vec::new(),
            close,
        }
    }

    pub fn with_preamble(mut self, preamble: impl Preamble + 'static) -> Self {
        self.set_preamble(Box::new(preamble));
        self
    }

    pub fn set_preamble(&mut self, preamble: Box<dyn Preamble>) {
        self.preamble = Some(preamble);
    }

    pub const fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub const fn media_type(&self) -> &'static str {
        self.kind.media_type()
    }

    pub fn theme_root(&self) -> &Path {
        &self.theme_root
    }

    pub fn section(&self, section: Section) -> &[ContentFragment] {
        match section {
            Section::Open => &self.open,
            Section::Middle => &self.middle,
            Section::Close => &self.close,
        }
    }

    pub(crate) fn section_mut(&mut self, section: Section) -> &mut Vec<ContentFragment> {
        match section {
            Section::Open => &mut self.open,
            Section::Middle => &mut self.middle,
            Section::Close => &mut self.close,
        }
    }

    /// Position of the fragment keyed by `path` in `section`.
    pub fn index_of(&self, section: Section, path: &Path) -> Option<usize> {
        self.section(section).iter().position(|f| f.path == path)
    }

    /// Whether `path` lives under the theme root.
    pub fn is_theme_path(&self, path: &Path) -> bool {
        normalize_path(path).starts_with(&self.theme_root)
    }

    /// Sequence a source fragment belongs to: `open` for theme files.
    pub fn section_for(&self, path: &Path) -> Section {
        if self.is_theme_path(path) {
            Section::Open
        } else {
            Section::Middle
        }
    }

    /// Replace `open` and `close` wholesale.
    pub(crate) fn replace_shell(&mut self, open: ContentFragment, close: ContentFragment) {
        self.open = vec![open];
        self.close = vec![close];
    }

    /// Restore the built-in `open`/`close` boilerplate.
    pub(crate) fn reset_shell(&mut self, app_name: &str) {
        let (open, close) = boilerplate(self.kind, app_name);
        self.open = open;
        self.close = close;
    }

    /// Drop all source fragments, keeping boilerplate and an adopted shell.
    pub fn clear_sources(&mut self) {
        if self.kind != ArtifactKind::Document {
            let theme_root = &self.theme_root;
            self.open
                .retain(|f| !normalize_path(&f.path).starts_with(theme_root));
        }
        self.middle.clear();
    }

    /// Merge `preamble → open → middle → close` into one buffer.
    ///
    /// A failing preamble fails the whole call; nothing partial is returned.
    pub fn serialize(&self) -> Result<Vec<u8>, AssetError> {
        let mut buf = Vec::new();

        if let Some(preamble) = &self.preamble {
            let code = preamble.render().map_err(|e| AssetError::Preamble {
                media_type: self.media_type(),
                message: format!("{e:#}"),
            })?;
            buf.extend_from_slice(code.as_bytes());
            buf.push(b'\n');
        }

        for fragment in self.open.iter().chain(&self.middle).chain(&self.close) {
            buf.extend_from_slice(self.fragment_bytes(fragment));
            buf.push(b'\n');
        }

        Ok(buf)
    }

    fn fragment_bytes<'a>(&self, fragment: &'a ContentFragment) -> &'a [u8] {
        if self.kind != ArtifactKind::Script {
            return &fragment.content;
        }
        match std::str::from_utf8(&fragment.content) {
            Ok(code) => strip_leading_use_strict(code).as_bytes(),
            Err(_) => &fragment.content,
        }
    }
}

/// Default `open`/`close` sequences for a kind.
fn boilerplate(kind: ArtifactKind, app_name: &str) -> (Vec<ContentFragment>, Vec<ContentFragment>) {
    match kind {
        ArtifactKind::Sprite => (
            vec![ContentFragment::new("sprite-open.svg", SPRITE_OPEN)],
            vec![ContentFragment::new("sprite-close.svg", SPRITE_CLOSE)],
        ),
        ArtifactKind::Document => (
            vec![document::default_open(app_name)],
            vec![document::default_close()],
        ),
        ArtifactKind::Script | ArtifactKind::Stylesheet | ArtifactKind::Favicon => {
            (Vec::new(), Vec::new())
        }
    }
}
