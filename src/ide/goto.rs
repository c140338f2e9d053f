//! Go-to-definition.

use crate::core::{Location, Position};
use crate::semantic::{MergeStrategy, ReferenceStore, SymbolStore};

/// Definition locations for the reference enclosing `position`.
pub fn definition(
    symbols: &SymbolStore,
    references: &ReferenceStore,
    uri: &str,
    position: Position,
) -> Vec<Location> {
    let Some(reference) = references.reference_at_position(uri, position) else {
        return Vec::new();
    };
    symbols
        .find_symbols_by_reference(reference, MergeStrategy::Override)
        .iter()
        .filter_map(|handle| symbols.symbol(handle))
        .filter_map(|symbol| symbol.location.clone())
        .collect()
}
