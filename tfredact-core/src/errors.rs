//! errors.rs - Custom error types for the tfredact-core library.
//!
//! Every failure that must stop a filter invocation is represented here. Degraded
//! configuration (a missing or malformed project file) is deliberately *not* an error:
//! the resolver falls back to the defaults and reports a warning instead.
//!
//! License: MIT OR APACHE 2.0

use thiserror::Error;

/// Result alias used across the filtering API.
pub type Result<T> = std::result::Result<T, FilterError>;

/// This enum represents all possible error types in the `tfredact-core` library.
///
/// Marked `#[non_exhaustive]` so new failure modes can be added without breaking
/// downstream matches.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FilterError {
    /// The input bytes are not valid JSON at all.
    #[error("failed to parse {document} JSON: {source}")]
    InvalidJson {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The input is JSON but does not have the shape of the expected document.
    #[error("invalid Terraform {document}: {reason}")]
    InvalidDocument {
        document: &'static str,
        reason: String,
    },

    /// The caller asked to skip filtering while the platform enforces it.
    #[error("filtering is required by your organization's settings: {0}")]
    PolicyViolation(String),

    /// Re-emitting the filtered document failed; nothing was written.
    #[error("failed to serialize filtered {document}: {source}")]
    Serialization {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown output format: {0}")]
    UnknownOutputFormat(String),

    #[error("An unexpected I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
}

impl FilterError {
    pub(crate) fn invalid(document: &'static str, reason: impl Into<String>) -> Self {
        FilterError::InvalidDocument {
            document,
            reason: reason.into(),
        }
    }
}
