//! Artifact kind definitions.

use std::fmt;

/// File name that routes an `.svg` source to the favicon instead of the sprite.
pub const FAVICON_NAME: &str = "favicon.svg";

/// One generated output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    /// `main.js`: runtime preamble + script fragments.
    Script,
    /// `style.css`
    Stylesheet,
    /// `sprite.svg`: `<symbol>` fragments inside a `<defs>` wrapper.
    Sprite,
    /// `favicon.svg`: a single icon, latest write wins.
    Favicon,
    /// `index.html`: shell document with module fragments spliced in.
    Document,
}

impl ArtifactKind {
    pub const ALL: [Self; 5] = [
        Self::Script,
        Self::Stylesheet,
        Self::Sprite,
        Self::Favicon,
        Self::Document,
    ];

    /// Source extensions the engine accepts.
    pub const EXTENSIONS: [&'static str; 4] = [".js", ".css", ".svg", ".html"];

    /// Route a source file by extension. `.svg` splits on the file name.
    pub fn route(extension: &str, file_name: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "js" => Some(Self::Script),
            "css" => Some(Self::Stylesheet),
            "svg" if is_favicon(file_name) => Some(Self::Favicon),
            "svg" => Some(Self::Sprite),
            "html" => Some(Self::Document),
            _ => None,
        }
    }

    /// First artifact registered for an extension (favicon never wins here).
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::route(extension, "")
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Script => ".js",
            Self::Stylesheet => ".css",
            Self::Sprite | Self::Favicon => ".svg",
            Self::Document => ".html",
        }
    }

    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Script => "text/javascript",
            Self::Stylesheet => "text/css",
            Self::Sprite | Self::Favicon => "image/svg+xml",
            Self::Document => "text/html",
        }
    }

    /// File name of the artifact inside the output root.
    pub const fn output_name(self) -> &'static str {
        match self {
            Self::Script => "main.js",
            Self::Stylesheet => "style.css",
            Self::Sprite => "sprite.svg",
            Self::Favicon => FAVICON_NAME,
            Self::Document => "index.html",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.output_name())
    }
}

fn is_favicon(file_name: &str) -> bool {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    name.eq_ignore_ascii_case(FAVICON_NAME)
}
