//! Host configuration for `assetmin.toml`.
//!
//! # Sections
//!
//! | Section    | Purpose                                           |
//! |------------|---------------------------------------------------|
//! | `[paths]`  | Theme root, output root, extra source roots       |
//! | `[build]`  | Minify toggle, settle delay, app name, shell name |
//! | `[script]` | Optional initializer appended to the preamble     |
//! | `[serve]`  | Development server (interface, port)              |
//!
//! The engine never reads this file: the host loads an [`AssetConfig`]
//! and hands it to [`crate::dispatch::AssetMin::new`].

mod error;
mod util;

pub use error::ConfigError;
pub use util::find_config_file;

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::log;
use util::resolve_against;

/// Default config file name.
pub const CONFIG_FILE: &str = "assetmin.toml";

// ============================================================================
// root configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Directory containing the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub script: ScriptConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

// ============================================================================
// sections
// ============================================================================

/// `[paths]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Files under this root are ordered before every module.
    pub theme: PathBuf,
    /// One artifact per media type is written here.
    pub output: PathBuf,
    /// Additional roots scanned and watched for modules.
    pub sources: Vec<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            theme: "web/theme".into(),
            output: "web/public".into(),
            sources: vec!["modules".into()],
        }
    }
}

/// `[build]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub minify: bool,
    /// Pause before reading a changed source, in milliseconds.
    pub settle_delay_ms: u64,
    pub app_name: String,
    /// Reserved file name of the document shell inside the theme root.
    pub shell: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            minify: true,
            settle_delay_ms: 20,
            app_name: "App".into(),
            shell: "index.html".into(),
        }
    }
}

/// `[script]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Appended after `'use strict';` at the top of `main.js`.
    pub preamble_file: Option<PathBuf>,
}

/// `[serve]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub interface: IpAddr,
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 4430,
        }
    }
}

// ============================================================================
// loading
// ============================================================================

impl AssetConfig {
    /// Load and validate the config at `path`.
    ///
    /// A missing file yields the defaults rooted at the current directory,
    /// so a bare project works without any config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let (mut config, root) = match find_config_file(path) {
            Some(found) => {
                let config = Self::from_path(&found)?;
                let root = found
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                (config, root)
            }
            None => {
                let cwd = std::env::current_dir()
                    .map_err(|err| ConfigError::Io(PathBuf::from("."), err))?;
                (Self::default(), cwd)
            }
        };
        config.set_root(&root);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} ignored: {}", display_path, fields.join(", "));
    }

    /// Set the root and resolve every relative path against it.
    pub fn set_root(&mut self, root: &Path) {
        self.root = root.to_path_buf();
        self.paths.theme = resolve_against(root, &self.paths.theme);
        self.paths.output = resolve_against(root, &self.paths.output);
        for source in &mut self.paths.sources {
            *source = resolve_against(root, source);
        }
        if let Some(file) = &mut self.script.preamble_file {
            *file = resolve_against(root, file);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let shell = Path::new(&self.build.shell);
        if shell.components().count() != 1 {
            return Err(ConfigError::Validation(format!(
                "[build] shell must be a bare file name, got `{}`",
                self.build.shell
            )));
        }
        if !self.build.shell.to_ascii_lowercase().ends_with(".html") {
            return Err(ConfigError::Validation(format!(
                "[build] shell must be an .html file, got `{}`",
                self.build.shell
            )));
        }
        if self.build.app_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "[build] app_name must not be empty".into(),
            ));
        }
        if self.paths.theme == self.paths.output {
            return Err(ConfigError::Validation(
                "[paths] theme and output must differ".into(),
            ));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.build.settle_delay_ms)
    }

    /// Theme root followed by every source root, without duplicates.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.paths.theme.clone()];
        for source in &self.paths.sources {
            if !roots.contains(source) {
                roots.push(source.clone());
            }
        }
        roots
    }
}

/// Parse a config and panic on unknown fields (catches typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> AssetConfig {
    let (parsed, ignored) = AssetConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
