//! Code emitted before every fragment of an artifact.
//!
//! The script artifact opens with `'use strict';` plus an optional
//! runtime initializer (e.g. a wasm loader). Fragments that carry their
//! own leading directive get it stripped, so the bundle has exactly one.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Produces the text written before all fragments of an artifact.
pub trait Preamble: Send + Sync {
    fn render(&self) -> Result<String>;
}

/// `'use strict';` followed by an optional initializer preamble.
#[derive(Default)]
pub struct StrictMode {
    init: Option<Box<dyn Preamble>>,
}

impl StrictMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initializer(init: impl Preamble + 'static) -> Self {
        Self {
            init: Some(Box::new(init)),
        }
    }
}

impl Preamble for StrictMode {
    fn render(&self) -> Result<String> {
        let mut out = String::from("'use strict';");
        if let Some(init) = &self.init {
            let code = init.render().context("runtime initializer")?;
            out.push_str(strip_leading_use_strict(&code));
        }
        Ok(out)
    }
}

/// Fixed text.
pub struct StaticPreamble(pub String);

impl Preamble for StaticPreamble {
    fn render(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Contents of a file, read on every render so edits are picked up
/// by the next recompile.
pub struct FilePreamble(pub PathBuf);

impl Preamble for FilePreamble {
    fn render(&self) -> Result<String> {
        std::fs::read_to_string(&self.0)
            .with_context(|| format!("failed to read preamble `{}`", self.0.display()))
    }
}

/// Remove a `"use strict"` / `'use strict'` directive at the very start of
/// `code`, with its trailing semicolon and same-line whitespace.
///
/// Leading whitespace before the directive is dropped too. Anything else
/// is returned unchanged.
pub fn strip_leading_use_strict(code: &str) -> &str {
    let trimmed = code.trim_start();
    let Some(quote) = trimmed.chars().next().filter(|c| matches!(c, '"' | '\'')) else {
        return code;
    };

    let body = &trimmed[1..];
    let directive = "use strict";
    let is_directive = body
        .get(..directive.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(directive))
        && body[directive.len()..].starts_with(quote);
    if !is_directive {
        return code;
    }

    let rest = &body[directive.len() + 1..];
    rest.trim_start_matches([';', ' ', '\t', '\r'])
}
