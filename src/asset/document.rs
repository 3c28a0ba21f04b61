//! Structural merge for the document artifact.
//!
//! Two jobs:
//! - refuse complete standalone documents as modules (an author's full-page
//!   template must not be nested inside the page)
//! - adopt a shell document from the theme root, splitting it into
//!   `open`/`close` around the module insertion point
//!
//! The split is a heuristic over raw text, tried in this order:
//!
//! | # | Insertion point                   | Split                         |
//! |---|-----------------------------------|-------------------------------|
//! | 1 | `<!-- MODULES -->` marker comment | around the marker (dropped)   |
//! | 2 | `{{.Modules}}` template variable  | around the variable (dropped) |
//! | 3 | `<main>` container                | before `</main>`              |
//! | 4 | first `<script>`                  | before the tag                |
//! | 5 | `</body>`                         | before the tag                |
//! | 6 | none                              | end of file                   |

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::fragment::ContentFragment;
use super::kind::ArtifactKind;
use super::minify::minify_markup;
use super::reconcile::{self, Outcome};
use super::store::{ArtifactStore, Section};
use crate::event::FileEvent;

static MARKER_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!--\s*MODULES(?:_PLACEHOLDER)?\s*-->").unwrap());
static TEMPLATE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{\{\s*\.?Modules\s*\}\}").unwrap());
static MAIN_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<main[\s>]").unwrap());
static MAIN_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</main\s*>").unwrap());
static SCRIPT_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<script[\s>]").unwrap());
static BODY_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<body[^>]*>").unwrap());
static BODY_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</body\s*>").unwrap());

/// Which heuristic located the insertion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPoint {
    Marker,
    TemplateVar,
    Main,
    Script,
    BodyClose,
    EndOfFile,
}

impl SplitPoint {
    /// Explicit markers are authored; everything else is a guess.
    pub const fn is_explicit(self) -> bool {
        matches!(self, Self::Marker | Self::TemplateVar)
    }
}

impl fmt::Display for SplitPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Marker => "marker comment",
            Self::TemplateVar => "template variable",
            Self::Main => "</main>",
            Self::Script => "first <script>",
            Self::BodyClose => "</body>",
            Self::EndOfFile => "end of file",
        })
    }
}

/// What a document event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// A complete document arrived where a module was expected.
    Standalone,
    /// The shell was (re)adopted.
    Shell(SplitPoint),
    /// The shell was removed; defaults are back.
    ShellReset,
    Module(Outcome),
}

/// Whether `content` is a full document rather than a fragment.
pub fn is_standalone_document(content: &str) -> bool {
    let lower = content.to_ascii_lowercase();
    ["<!doctype", "<html", "</html>", "</body>"]
        .iter()
        .all(|tag| lower.contains(tag))
}

/// Split a shell into `(open, close)` at its insertion point.
pub fn split_shell(shell: &str) -> (&str, &str, SplitPoint) {
    for (re, point) in [
        (&MARKER_COMMENT, SplitPoint::Marker),
        (&TEMPLATE_VAR, SplitPoint::TemplateVar),
    ] {
        if let Some(m) = re.find(shell) {
            return (&shell[..m.start()], &shell[m.end()..], point);
        }
    }

    if let Some(open) = MAIN_OPEN.find(shell)
        && let Some(close) = MAIN_CLOSE.find_at(shell, open.end())
    {
        return split_at(shell, close.start(), SplitPoint::Main);
    }
    if let Some(m) = SCRIPT_OPEN.find(shell) {
        return split_at(shell, m.start(), SplitPoint::Script);
    }
    if let Some(m) = BODY_CLOSE.find(shell) {
        return split_at(shell, m.start(), SplitPoint::BodyClose);
    }
    (shell, "", SplitPoint::EndOfFile)
}

fn split_at(shell: &str, at: usize, point: SplitPoint) -> (&str, &str, SplitPoint) {
    let (open, close) = shell.split_at(at);
    (open, close, point)
}

/// Remove module markup left in the body of a previously generated page.
///
/// Both sides are compared in minified markup form, since the page on disk
/// went through the markup minifier. Only the region after `<body>` is
/// searched, and each module is removed once. `text` comes back untouched
/// when nothing matched.
pub fn strip_modules<'a>(text: &str, modules: impl IntoIterator<Item = &'a str>) -> String {
    let start = BODY_OPEN.find(text).map_or(0, |m| m.end());
    let (head, body) = text.split_at(start);

    let mut region = minify_markup(body);
    let mut changed = false;
    for module in modules {
        let markup = minify_markup(module);
        if !markup.is_empty() && region.contains(&markup) {
            region = region.replacen(&markup, "", 1);
            changed = true;
        }
    }
    if changed {
        format!("{head}{region}")
    } else {
        text.to_string()
    }
}

pub(crate) fn default_open(app_name: &str) -> ContentFragment {
    let head = format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>{app_name}</title>
<link rel="stylesheet" href="{css}" type="text/css" />
</head>
<body>"#,
        css = ArtifactKind::Stylesheet.output_name(),
    );
    ContentFragment::new("index-open.html", head)
}

pub(crate) fn default_close() -> ContentFragment {
    let tail = format!(
        r#"<script src="{js}" type="text/javascript"></script>
</body>
</html>"#,
        js = ArtifactKind::Script.output_name(),
    );
    ContentFragment::new("index-close.html", tail)
}

/// Event handling for the document store.
pub struct DocumentPolicy<'a> {
    /// Reserved shell file name under the theme root (e.g. `index.html`).
    pub shell_name: &'a str,
    pub app_name: &'a str,
}

impl DocumentPolicy<'_> {
    fn is_shell(&self, store: &ArtifactStore, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(self.shell_name))
            && store.is_theme_path(path)
    }

    /// Apply one event. Modules always land in `middle`: `open`/`close`
    /// belong to the shell.
    pub fn apply(
        &self,
        store: &mut ArtifactStore,
        event: FileEvent,
        fragment: ContentFragment,
    ) -> DocumentOutcome {
        if self.is_shell(store, &fragment.path) {
            return match event {
                FileEvent::Rename => DocumentOutcome::Module(Outcome::Unchanged),
                FileEvent::Remove | FileEvent::Delete => {
                    store.reset_shell(self.app_name);
                    DocumentOutcome::ShellReset
                }
                FileEvent::Create | FileEvent::Write | FileEvent::Modify => {
                    DocumentOutcome::Shell(adopt_shell(store, fragment))
                }
            };
        }

        if event.is_upsert() && is_standalone_document(&fragment.text()) {
            return DocumentOutcome::Standalone;
        }

        let module = fragment.text().into_owned();
        let outcome = reconcile::apply(store.section_mut(Section::Middle), event, fragment);
        if event.is_upsert() && !module.trim().is_empty() {
            purge_stale(store, &module);
        }
        DocumentOutcome::Module(outcome)
    }
}

/// Replace `open`/`close` with the two halves of `shell`.
///
/// A shell read back from the store's own output still carries the modules
/// of the previous run; those already tracked are stripped from `open`.
pub fn adopt_shell(store: &mut ArtifactStore, shell: ContentFragment) -> SplitPoint {
    let ContentFragment { path, content } = shell;
    let text = String::from_utf8_lossy(&content);
    let (open, close, point) = split_shell(&text);
    let open = if path == store.output_path() {
        let modules: Vec<_> = store.section(Section::Middle).iter().map(|f| f.text()).collect();
        strip_modules(open, modules.iter().map(|m| m.as_ref()))
    } else {
        open.to_string()
    };
    let close = close.to_string();
    store.replace_shell(
        ContentFragment::new(path.clone(), open),
        ContentFragment::new(path, close),
    );
    point
}

/// Drop a module's markup left inside a head adopted from the output.
fn purge_stale(store: &mut ArtifactStore, module: &str) {
    let output = store.output_path().to_path_buf();
    for fragment in store.section_mut(Section::Open) {
        if fragment.path != output {
            continue;
        }
        let stripped = strip_modules(&fragment.text(), [module]);
        fragment.content = stripped.into_bytes();
    }
}
