//! Shared configuration and compile-time error types.
//!
//! These cover every failure mode that can occur while turning a directory
//! of scenario YAML into a loaded set of scenarios: walking the tree,
//! parsing YAML, resolving `!include` directives, and validating the
//! resulting structure. Errors here are load-time; request-time failures
//! live in `mockyaml::error`.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed.
    #[error("parse error in {path}{}: {message}", line.map_or_else(String::new, |l| format!(" (line {l})")))]
    ParseError {
        /// Path to the scenario file.
        path: PathBuf,
        /// Line number where the error occurred, if the parser reported one.
        line: Option<usize>,
        /// Error message from the YAML parser.
        message: String,
    },

    /// Configuration validation failed.
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the scenario file.
        path: String,
        /// List of validation issues found.
        errors: Vec<ValidationIssue>,
    },

    /// An `!include` directive forms a cycle, or exceeds the maximum nesting depth.
    #[error("circular include detected: {cycle:?}")]
    CircularInclude {
        /// The chain of file paths leading back to the cycle.
        cycle: Vec<PathBuf>,
    },

    /// An `!include` directive exceeded the configured maximum nesting depth.
    #[error("include depth exceeded ({max}) at {path}")]
    IncludeDepthExceeded {
        /// Path where the depth limit was hit.
        path: PathBuf,
        /// The configured maximum depth.
        max: usize,
    },

    /// An `!include` directive resolved outside the configured root.
    #[error("include path escapes root: {path}")]
    IncludeEscapesRoot {
        /// The rejected path.
        path: PathBuf,
    },

    /// Referenced file not found.
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Two scenarios share the same `id`.
    #[error("duplicate scenario id '{id}' in {first} and {second}")]
    DuplicateId {
        /// The duplicated identifier.
        id: String,
        /// First file where the id was seen.
        first: PathBuf,
        /// Second file where the id was seen again.
        second: PathBuf,
    },

    /// Field has an invalid value.
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with the invalid value.
        field: String,
        /// The actual value provided.
        value: String,
        /// Description of what was expected.
        expected: String,
    },

    /// I/O failure while walking the scenario directory or reading a file.
    #[error("io error reading {path}: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g. `scenarios[2].when.path`).
    pub path: String,
    /// Description of the issue.
    pub message: String,
    /// Severity of the issue.
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Validation failure that prevents the scenario from loading.
    Error,
    /// Potential issue that does not prevent loading.
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_issue_display() {
        let issue = ValidationIssue {
            path: "scenarios[0].when".to_string(),
            message: "missing method".to_string(),
            severity: Severity::Error,
        };
        assert_eq!(
            issue.to_string(),
            "error: missing method at scenarios[0].when"
        );
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::ParseError {
            path: PathBuf::from("scenarios/users.yaml"),
            line: Some(42),
            message: "unexpected token".to_string(),
        };
        assert!(err.to_string().contains("scenarios/users.yaml"));
        assert!(err.to_string().contains("unexpected token"));
    }

    #[test]
    fn duplicate_id_display() {
        let err = ConfigError::DuplicateId {
            id: "A".to_string(),
            first: PathBuf::from("a.yaml"),
            second: PathBuf::from("b.yaml"),
        };
        assert!(err.to_string().contains("A"));
    }
}
