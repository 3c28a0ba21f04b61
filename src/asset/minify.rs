//! Minification per artifact kind.
//!
//! Uses oxc for JavaScript and lightningcss for CSS. Markup (HTML, SVG)
//! only gets inter-tag whitespace collapsed.

use std::sync::LazyLock;

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use regex::Regex;
use rustc_hash::FxHashMap;

use super::kind::ArtifactKind;
use super::preamble::strip_leading_use_strict;
use crate::error::AssetError;

/// Byte-stream minifier for one media type.
pub trait Minify: Send + Sync {
    /// Returns the minified text, or a message describing why the source
    /// was rejected.
    fn minify(&self, source: &str) -> Result<String, String>;
}

pub struct JsMinifier;

impl Minify for JsMinifier {
    fn minify(&self, source: &str) -> Result<String, String> {
        minify_js(source)
    }
}

pub struct CssMinifier;

impl Minify for CssMinifier {
    fn minify(&self, source: &str) -> Result<String, String> {
        minify_css(source)
    }
}

pub struct MarkupMinifier;

impl Minify for MarkupMinifier {
    fn minify(&self, source: &str) -> Result<String, String> {
        Ok(minify_markup(source))
    }
}

/// Returns the source unchanged.
pub struct Passthrough;

impl Minify for Passthrough {
    fn minify(&self, source: &str) -> Result<String, String> {
        Ok(source.to_string())
    }
}

/// Minify JavaScript source code.
///
/// The bundle is loaded as a classic script: top-level declarations are
/// globals and the `'use strict'` prologue is significant, so both survive.
pub fn minify_js(source: &str) -> Result<String, String> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_script(true);
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        let messages: Vec<String> = ret.errors.iter().map(ToString::to_string).collect();
        return Err(messages.join("; "));
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(keep_strict_prologue(source, code))
}

/// Re-add a leading `'use strict'` directive the minifier dropped.
fn keep_strict_prologue(source: &str, code: String) -> String {
    let strict = |s: &str| strip_leading_use_strict(s).len() != s.len();
    if strict(source) && !strict(&code) {
        format!("\"use strict\";{code}")
    } else {
        code
    }
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Result<String, String> {
    let stylesheet =
        StyleSheet::parse(source, ParserOptions::default()).map_err(|e| e.to_string())?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(result.code)
}

static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());

/// Trim every line and drop whitespace between tags.
pub fn minify_markup(source: &str) -> String {
    let joined = source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    BETWEEN_TAGS.replace_all(&joined, "><").into_owned()
}

/// One minifier per artifact kind.
pub struct Minifiers {
    by_kind: FxHashMap<ArtifactKind, Box<dyn Minify>>,
}

impl Minifiers {
    /// oxc / lightningcss / markup collapsing.
    pub fn standard() -> Self {
        let mut by_kind: FxHashMap<ArtifactKind, Box<dyn Minify>> = FxHashMap::default();
        by_kind.insert(ArtifactKind::Script, Box::new(JsMinifier));
        by_kind.insert(ArtifactKind::Stylesheet, Box::new(CssMinifier));
        for kind in [ArtifactKind::Sprite, ArtifactKind::Favicon, ArtifactKind::Document] {
            by_kind.insert(kind, Box::new(MarkupMinifier));
        }
        Self { by_kind }
    }

    /// Every kind passes through untouched.
    pub fn passthrough() -> Self {
        let by_kind = ArtifactKind::ALL
            .into_iter()
            .map(|kind| (kind, Box::new(Passthrough) as Box<dyn Minify>))
            .collect();
        Self { by_kind }
    }

    /// Replace the minifier for `kind`.
    pub fn set(&mut self, kind: ArtifactKind, minifier: impl Minify + 'static) {
        self.by_kind.insert(kind, Box::new(minifier));
    }

    /// Minify a serialized artifact. Non-UTF-8 input is rejected.
    pub fn minify(&self, kind: ArtifactKind, bytes: &[u8]) -> Result<Vec<u8>, AssetError> {
        let fail = |message: String| AssetError::Minify {
            media_type: kind.media_type(),
            message,
        };
        let source = std::str::from_utf8(bytes).map_err(|e| fail(e.to_string()))?;
        match self.by_kind.get(&kind) {
            Some(minifier) => minifier.minify(source).map(String::into_bytes).map_err(fail),
            None => Ok(bytes.to_vec()),
        }
    }
}
