//! # phindex
//!
//! Core library for PHP parsing, symbol indexing, and semantic analysis.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide        → IDE features (completion, hover, signature help, goto-def)
//!   ↓
//! workspace  → orchestration: document lifecycle, bulk indexing, persistence
//!   ↓
//! semantic   → symbol model, stores, name resolution, type inference
//!   ↓
//! document   → open-document tracking with debounced reparse
//!   ↓
//! docblock   → documentation-comment micro-parser
//!   ↓
//! parser     → Logos lexer, recursive-descent parser, spanned AST
//!   ↓
//! core       → primitives (Position, Span, LineIndex, error taxonomy)
//! ```

// ============================================================================
// MODULES (dependency order: core → parser → docblock → document → semantic
// → index → workspace → ide)
// ============================================================================

/// Foundation types: Position, Span, LineIndex, error taxonomy
pub mod core;

/// Parser: Logos lexer, recursive-descent parser, spanned AST
pub mod parser;

/// Documentation-comment micro-parser (`@param`, `@return`, ...)
pub mod docblock;

/// Open-document tracking: text, versions, debounced reparse
pub mod document;

/// Semantic model: symbols, references, resolution, type inference
pub mod semantic;

/// Persistent keyed index
pub mod index;

/// Orchestration: drives parsing and indexing over a workspace
pub mod workspace;

/// IDE features: completion, hover, signature help, navigation
pub mod ide;

// Re-export foundation types
pub use crate::core::{IndexError, IndexResult, LineIndex, Location, Position, Span};
