//! Per-document reference tables with positional and predicate queries.
//!
//! Closing a document freezes its table (no further mutation from reparse)
//! until it is removed outright.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::core::Position;

use super::reference::{Reference, ReferenceTable, ScopeId};

/// Store of reference tables keyed by URI
#[derive(Debug, Default)]
pub struct ReferenceStore {
    tables: FxHashMap<String, ReferenceTable>,
    frozen: FxHashSet<String>,
}

impl ReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, uri: &str) -> Option<&ReferenceTable> {
        self.tables.get(uri)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Register a table, replacing any prior table for the same URI.
    /// Frozen (closed) tables are not replaced.
    pub fn add(&mut self, table: ReferenceTable) {
        let uri = table.uri().to_string();
        if self.frozen.contains(&uri) {
            trace!("[REF_STORE] skip add for frozen {}", uri);
            return;
        }
        self.tables.insert(uri, table);
    }

    /// Freeze a table: it stays queryable but stops updating
    pub fn close(&mut self, uri: &str) {
        if self.tables.contains_key(uri) {
            self.frozen.insert(uri.to_string());
        }
    }

    /// Re-open a previously closed table for updates
    pub fn reopen(&mut self, uri: &str) {
        self.frozen.remove(uri);
    }

    pub fn remove(&mut self, uri: &str) -> Option<ReferenceTable> {
        self.frozen.remove(uri);
        self.tables.remove(uri)
    }

    /// The innermost reference enclosing a position
    pub fn reference_at_position(&self, uri: &str, position: Position) -> Option<&Reference> {
        self.tables.get(uri)?.reference_at_position(position)
    }

    /// The innermost scope enclosing a position
    pub fn scope_at_position(&self, uri: &str, position: Position) -> Option<ScopeId> {
        Some(self.tables.get(uri)?.scope_at_position(position))
    }

    /// Linear scan over one document's references
    pub fn references<'s>(
        &'s self,
        uri: &str,
        mut predicate: impl FnMut(&Reference) -> bool + 's,
    ) -> Vec<&'s Reference> {
        match self.tables.get(uri) {
            Some(table) => table.references().filter(move |r| predicate(r)).collect(),
            None => Vec::new(),
        }
    }

    /// Linear scan over every document's references
    pub fn references_everywhere(
        &self,
        mut predicate: impl FnMut(&Reference) -> bool,
    ) -> Vec<(&str, &Reference)> {
        let mut out = Vec::new();
        for (uri, table) in &self.tables {
            for reference in table.references() {
                if predicate(reference) {
                    out.push((uri.as_str(), reference));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Location, Span};
    use crate::semantic::reference::ReferenceKind;

    fn table(uri: &str, name: &str) -> ReferenceTable {
        let mut table = ReferenceTable::new(uri, Span::from_coords(0, 0, 10, 0));
        let root = table.root();
        table.add_reference(
            root,
            Reference::new(
                ReferenceKind::Class,
                name,
                Location::new(uri, Span::from_coords(0, 0, 0, 5)),
            ),
        );
        table
    }

    #[test]
    fn test_add_replace_remove() {
        let mut store = ReferenceStore::new();
        store.add(table("file:///a.php", "A"));
        store.add(table("file:///a.php", "B"));
        let found = store.reference_at_position("file:///a.php", Position::new(0, 1));
        assert_eq!(found.unwrap().name, "B");
        store.remove("file:///a.php");
        assert!(store.table("file:///a.php").is_none());
    }

    #[test]
    fn test_close_freezes_until_remove() {
        let mut store = ReferenceStore::new();
        store.add(table("file:///a.php", "A"));
        store.close("file:///a.php");
        store.add(table("file:///a.php", "B"));
        let found = store.reference_at_position("file:///a.php", Position::new(0, 1));
        assert_eq!(found.unwrap().name, "A", "frozen table must not change");
        store.remove("file:///a.php");
        store.add(table("file:///a.php", "B"));
        assert_eq!(
            store
                .reference_at_position("file:///a.php", Position::new(0, 1))
                .unwrap()
                .name,
            "B"
        );
    }

    #[test]
    fn test_predicate_scan() {
        let mut store = ReferenceStore::new();
        store.add(table("file:///a.php", "A"));
        store.add(table("file:///b.php", "A"));
        let hits = store.references_everywhere(|r| r.name == "A");
        assert_eq!(hits.len(), 2);
    }
}
