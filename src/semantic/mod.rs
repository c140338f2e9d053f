//! # Semantic Analysis
//!
//! Transforms parsed ASTs into a queryable semantic model: per-file symbol
//! tables merged into a workspace-wide store, plus per-file reference tables
//! binding every name occurrence to a resolved fully qualified name and an
//! inferred type.

pub mod builtin;
pub mod member_aggregator;
pub mod name_resolver;
pub mod reference;
pub mod reference_reader;
pub mod reference_store;
pub mod symbol;
pub mod symbol_reader;
pub mod symbol_store;
pub mod type_string;

pub use member_aggregator::{MemberAggregator, MergeStrategy};
pub use name_resolver::{ClassContext, ImportRule, NameKind, NameResolver, ResolvedName};
pub use reference::{Reference, ReferenceKind, ReferenceTable, ScopeChild, ScopeId, ScopeNode};
pub use reference_reader::ReferenceReader;
pub use reference_store::ReferenceStore;
pub use symbol::{
    DocInfo, Modifiers, Related, Symbol, SymbolId, SymbolKind, SymbolTable, namespace_of, not_fqn,
};
pub use symbol_reader::SymbolReader;
pub use symbol_store::{SymbolHandle, SymbolStore};

/// A fully qualified name with all namespace segments resolved
pub type Fqn = String;
