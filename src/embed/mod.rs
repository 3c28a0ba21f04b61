//! Embedded starter files.
//!
//! When a project has no theme source for an artifact, a minified starter
//! version is written to the output root so the page works from the first
//! run. Existing files are never overwritten.
//!
//! | Template      | Output        | Variables      |
//! |---------------|---------------|----------------|
//! | `index.html`  | `index.html`  | `__APP_NAME__` |
//! | `style.css`   | `style.css`   |                |
//! | `script.js`   | `main.js`     | `__APP_NAME__` |
//! | `favicon.svg` | `favicon.svg` |                |

mod template;

pub use template::{Template, TemplateVars};

use std::path::PathBuf;

use crate::asset::{ArtifactKind, Minifiers};
use crate::config::AssetConfig;
use crate::error::AssetError;
use crate::fs::Filesystem;
use crate::log;

/// Variables shared by every starter template.
pub struct AppVars {
    pub app_name: String,
}

impl TemplateVars for AppVars {
    fn apply(&self, content: &str) -> String {
        content.replace("__APP_NAME__", &self.app_name)
    }
}

pub const INDEX_HTML: Template<AppVars> =
    Template::new("index.html", include_str!("templates/index.html"));

pub const STYLE_CSS: Template<AppVars> =
    Template::new("style.css", include_str!("templates/style.css"));

pub const SCRIPT_JS: Template<AppVars> =
    Template::new("script.js", include_str!("templates/script.js"));

pub const FAVICON_SVG: Template<AppVars> =
    Template::new("favicon.svg", include_str!("templates/favicon.svg"));

/// Starter template per artifact. The sprite has none: its boilerplate
/// is already a valid empty sprite.
const DEFAULTS: [(ArtifactKind, Template<AppVars>); 4] = [
    (ArtifactKind::Script, SCRIPT_JS),
    (ArtifactKind::Stylesheet, STYLE_CSS),
    (ArtifactKind::Document, INDEX_HTML),
    (ArtifactKind::Favicon, FAVICON_SVG),
];

/// Write the starter file for every artifact whose theme source and output
/// are both missing. Returns the written paths.
///
/// Run this before constructing the engine so a generated `index.html` is
/// adopted as the shell.
pub fn write_defaults(
    config: &AssetConfig,
    fs: &impl Filesystem,
    minifiers: &Minifiers,
) -> Result<Vec<PathBuf>, AssetError> {
    let vars = AppVars {
        app_name: config.build.app_name.clone(),
    };
    let mut written = Vec::new();

    for (kind, template) in DEFAULTS {
        let source_name = match kind {
            ArtifactKind::Document => config.build.shell.as_str(),
            _ => kind.output_name(),
        };
        let source = config.paths.theme.join(source_name);
        if fs.exists(&source) {
            continue;
        }
        let target = config.paths.output.join(kind.output_name());
        if fs.exists(&target) {
            continue;
        }

        let minified = minifiers.minify(kind, template.render(&vars).as_bytes())?;
        fs.write(&target, &minified)
            .map_err(|error| AssetError::Write {
                path: target.clone(),
                error,
            })?;
        log!("asset"; "generated default {}", target.display());
        written.push(target);
    }
    Ok(written)
}
