//! Runtime error types for mockyaml.
//!
//! `mockyaml_core::error::ConfigError` covers load-time failures; this
//! module covers everything that can go wrong while the server is serving
//! requests (compiling a single scenario, rendering a template, watching
//! the filesystem).

use thiserror::Error;

/// Top-level runtime error type.
#[derive(Debug, Error)]
pub enum MockError {
    /// A loaded scenario directory failed validation (duplicate id, structural
    /// YAML error, include-resolution failure). Fatal for the reload that
    /// produced it; the previous index keeps serving.
    #[error("config error: {0}")]
    Config(#[from] mockyaml_core::error::ConfigError),

    /// A single scenario failed to compile (invalid regex, unknown engine,
    /// template compile failure, unsafe body_file path). Non-fatal: the
    /// scenario is dropped and the rest of the reload continues.
    #[error("compile error for scenario '{id}': {message}")]
    Compile {
        /// Offending scenario id.
        id: String,
        /// Human-readable description.
        message: String,
    },

    /// Template rendering failed at request time.
    #[error("render error: {0}")]
    Render(String),

    /// Pagination post-processing failed; callers should log and fall back
    /// to the unmodified body rather than propagate this.
    #[error("pagination error: {0}")]
    Pagination(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for mockyaml operations.
pub type Result<T> = std::result::Result<T, MockError>;
