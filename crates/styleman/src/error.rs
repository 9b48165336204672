//! Error types for stylesheet pipeline operations.
//!
//! Copyright (c) 2025 Posit, PBC

use thiserror::Error;

/// Errors that can occur while building or caching stylesheets
#[derive(Debug, Error)]
pub enum StyleError {
    /// The external CSS compiler rejected the assembled source.
    ///
    /// Carries the engine's message verbatim. Compile errors are never
    /// retried and never absorbed into empty results: the caller that
    /// requested this specific artifact always sees the failure.
    #[error("CSS compilation failed for {target}: {message}")]
    CompilationFailed { target: String, message: String },

    /// An unknown target name was supplied (e.g., parsed from a URL).
    #[error("unknown stylesheet target: {0}")]
    UnknownTarget(String),

    /// Cache store file I/O error
    #[error("cache store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache index row (de)serialization error
    #[error("cache index row error: {0}")]
    Json(#[from] serde_json::Error),
}
