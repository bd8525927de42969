//! Typed errors raised by the decoding and configuration layers.
//!
//! Everything above these layers (file I/O, rendering, the CLI) propagates
//! `anyhow::Error` with context instead.

use thiserror::Error;

/// A single audit log line could not be turned into an `AuditRecord`.
///
/// Per-record: the reader reports it and moves on to the next line.
#[derive(Debug, Error)]
pub enum MalformedRecordError {
    #[error("line is not a decodable audit record: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

/// The filter configuration is unusable. Fatal before any record is read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid pattern {pattern:?} in {field}: {source}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
