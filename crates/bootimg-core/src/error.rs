//! # Error Types
//!
//! Structured error hierarchy for image registration and serving. All
//! errors use `thiserror` for derive-based `Display` and `Error`.
//!
//! - Composition errors carry the template format and the underlying cause.
//! - Configuration errors are fatal at startup and name the offending input.
//! - `NotFound` is not fatal; the HTTP layer maps it to a 404.

use std::path::PathBuf;

use thiserror::Error;

use crate::format::ImageFormat;

/// Top-level error type for registry operations.
#[derive(Error, Debug)]
pub enum ImageError {
    /// The artifact composer failed; nothing was registered.
    #[error("composition error: {0}")]
    Composition(#[from] ComposeError),

    /// No artifact resolves for the given token or name.
    #[error("image not found: {0}")]
    NotFound(String),

    /// Invalid construction-time parameters.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The logical name cannot identify an artifact.
    #[error("invalid image name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Failure inside an [`crate::Composer`].
#[derive(Error, Debug)]
pub enum ComposeError {
    /// The base template could not be opened for reading.
    #[error("{format} base template unavailable: {source}")]
    TemplateUnavailable {
        /// Which template was selected.
        format: ImageFormat,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while building the artifact.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The composer refused the configuration payload.
    #[error("configuration payload rejected: {0}")]
    Rejected(String),
}

/// Invalid startup configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A base template file does not exist or cannot be inspected.
    #[error("{format} base template {path} is missing: {source}")]
    MissingTemplate {
        /// Which template.
        format: ImageFormat,
        /// Configured location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A base template path exists but is not a regular file.
    #[error("{format} base template {path} is not a regular file")]
    NotAFile {
        /// Which template.
        format: ImageFormat,
        /// Configured location.
        path: PathBuf,
    },

    /// A template was supplied in the wrong slot.
    #[error("expected a {expected} base template, got {actual}")]
    FormatMismatch {
        /// Slot format.
        expected: ImageFormat,
        /// Supplied template format.
        actual: ImageFormat,
    },

    /// The base URL is not an absolute http(s) origin.
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}
