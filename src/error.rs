//! Error types for promptlint operations.
//!
//! Defines error types for the subsystems that can actually fail:
//! - Document parsing (frontmatter YAML)
//! - Library loading (directory walk, file IO)
//! - Configuration loading and validation
//!
//! Documentation defects found in prompt files are not errors. They are
//! reported as diagnostics by the linter.

use thiserror::Error;

/// Errors that can occur while parsing a single prompt document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Frontmatter is not valid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("Frontmatter must be a YAML mapping, found {0}")]
    NotAMapping(String),

    #[error("Frontmatter field '{field}' has an unsupported shape: {message}")]
    FieldShape { field: String, message: String },
}

/// Errors that can occur while loading a prompt library from disk.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Library root '{0}' does not exist")]
    RootNotFound(String),

    #[error("Library root '{0}' is not a directory")]
    NotADirectory(String),

    #[error("Failed to walk library: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown rule '{0}'")]
    UnknownRule(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
