//! Foundation types for the phindex toolchain.
//!
//! This module provides fundamental types used throughout the indexer:
//! - [`Position`], [`Span`] - Line/column positions for locations
//! - [`LineIndex`] - Byte-offset to line/column conversion
//! - [`Location`] - A span inside a named document
//! - [`IndexError`], [`IndexResult`] - The crate-wide error taxonomy
//!
//! This module has NO dependencies on other phindex modules.

mod error;
mod line_index;
mod position;

pub use error::{IndexError, IndexResult};
pub use line_index::LineIndex;
pub use position::{Location, Position, Span};

// Re-export text-size types for convenience
pub use text_size::{TextRange, TextSize};
