//! Crate-wide error taxonomy.
//!
//! Core functions report failures by kind and never log-and-swallow; the
//! orchestration layer decides what becomes user-visible.

use thiserror::Error;

/// Errors surfaced by the indexing core.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The reference reader found its next expected symbol out of step with
    /// the tree position. Fatal for the affected document: its reference
    /// table is discarded.
    #[error("symbol sequence out of step in {uri}: expected {expected}, found {found}")]
    TornTree {
        uri: String,
        expected: String,
        found: String,
    },

    /// A document that was expected to be open/tracked is not.
    #[error("unknown document: {0}")]
    UnknownDocument(String),

    /// Persistent-index IO failure. Retried once by the caller; on repeat
    /// failure the document degrades to in-memory-only indexing.
    #[error("persistent index failure at {path}: {source}")]
    IndexIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Persistent-index payload could not be decoded.
    #[error("persistent index corrupt at {path}: {source}")]
    IndexCorrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type IndexResult<T> = Result<T, IndexError>;
