//! External CSS-preprocessor boundary.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! The pipeline treats the preprocessor as an external engine behind the
//! [`CssCompiler`] trait: assembled source text in, compiled CSS and a
//! source map out, or a structured error carrying the engine's message.
//! The production implementation is [`GrassCompiler`], backed by the
//! grass crate (a pure Rust dart-sass implementation).

use std::path::PathBuf;

use grass::{Options, OutputStyle};

use crate::error::StyleError;

/// Options for one compile invocation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Logical file name for the assembled source, used in error messages
    /// and the emitted source map (the source never exists on disk).
    pub logical_name: String,

    /// Directories to search for import resolution, including the
    /// extension registry's registered paths.
    pub load_paths: Vec<PathBuf>,

    /// Whether to produce compressed output.
    pub minified: bool,
}

/// Output of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCss {
    pub css: String,
    pub source_map: String,
}

/// The external compiler boundary.
///
/// Implementations must be callable from multiple concurrent workers;
/// the pipeline never serializes compiles behind a lock.
pub trait CssCompiler: Send + Sync {
    /// Compile assembled preprocessor source to CSS.
    ///
    /// # Errors
    ///
    /// Returns [`StyleError::CompilationFailed`] with the engine's
    /// message when the source is rejected.
    fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompiledCss, StyleError>;
}

/// Production compiler backed by grass.
#[derive(Debug, Default)]
pub struct GrassCompiler;

impl GrassCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl CssCompiler for GrassCompiler {
    fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompiledCss, StyleError> {
        let style = if options.minified {
            OutputStyle::Compressed
        } else {
            OutputStyle::Expanded
        };

        let grass_options = Options::default()
            .load_paths(&options.load_paths)
            .style(style);

        let css = grass::from_string(source, &grass_options).map_err(|e| {
            StyleError::CompilationFailed {
                target: options.logical_name.clone(),
                message: e.to_string(),
            }
        })?;

        // grass does not emit source maps; a minimal v3 map naming the
        // logical source keeps the artifact layout uniform.
        let source_map = minimal_source_map(&options.logical_name);

        Ok(CompiledCss { css, source_map })
    }
}

/// An empty source-map v3 document referencing the logical source file.
fn minimal_source_map(logical_name: &str) -> String {
    serde_json::json!({
        "version": 3,
        "sources": [logical_name],
        "names": [],
        "mappings": "",
    })
    .to_string()
}
