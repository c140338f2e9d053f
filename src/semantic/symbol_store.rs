//! Workspace symbol store: per-URI tables merged into keyed indices.
//!
//! Add/remove are atomic per URI: removal deletes every index entry the
//! table contributed; add re-indexes after filtering out symbols that must
//! never leak into workspace search (parameters, file roots, `use` aliases,
//! and located variables; built-in globals carry no location and remain
//! searchable).

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::trace;

use super::member_aggregator::{MemberAggregator, MergeStrategy};
use super::reference::{Reference, ReferenceKind};
use super::symbol::{Modifiers, Symbol, SymbolId, SymbolKind, SymbolTable, not_fqn};
use super::type_string;

/// A symbol addressed across tables
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolHandle {
    pub uri: String,
    pub id: SymbolId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexEntry {
    uri: String,
    id: SymbolId,
}

/// Workspace-wide keyed symbol indices
#[derive(Debug, Default)]
pub struct SymbolStore {
    tables: FxHashMap<String, SymbolTable>,
    /// Search key → contributing symbols. Keys are case-folded for
    /// case-insensitive kinds and exact for constants/variables.
    name_index: BTreeMap<String, Vec<IndexEntry>>,
    /// Keys contributed per URI, for atomic removal
    keys_by_uri: FxHashMap<String, Vec<String>>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, uri: &str) -> Option<&SymbolTable> {
        self.tables.get(uri)
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|s| s.as_str())
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn symbol(&self, handle: &SymbolHandle) -> Option<&Symbol> {
        self.tables.get(&handle.uri)?.get(handle.id)
    }

    /// Register a table, replacing any prior table for the same URI.
    pub fn add(&mut self, table: SymbolTable) {
        let uri = table.uri().to_string();
        self.remove(&uri);
        let mut keys = Vec::new();
        for id in table.preorder() {
            let symbol = table.symbol(id);
            if !Self::is_indexable(symbol) {
                continue;
            }
            for key in Self::keys_for(symbol) {
                self.name_index
                    .entry(key.clone())
                    .or_default()
                    .push(IndexEntry {
                        uri: uri.clone(),
                        id,
                    });
                keys.push(key);
            }
        }
        trace!("[SYMBOL_STORE] add {} ({} keys)", uri, keys.len());
        self.keys_by_uri.insert(uri.clone(), keys);
        self.tables.insert(uri, table);
    }

    /// Remove a table and every index entry it contributed.
    pub fn remove(&mut self, uri: &str) -> Option<SymbolTable> {
        if let Some(keys) = self.keys_by_uri.remove(uri) {
            for key in keys {
                if let Some(entries) = self.name_index.get_mut(&key) {
                    entries.retain(|entry| entry.uri != uri);
                    if entries.is_empty() {
                        self.name_index.remove(&key);
                    }
                }
            }
        }
        self.tables.remove(uri)
    }

    /// Symbols that participate in workspace search
    fn is_indexable(symbol: &Symbol) -> bool {
        if symbol.modifiers.contains(Modifiers::USE) {
            return false;
        }
        match symbol.kind {
            SymbolKind::Parameter | SymbolKind::File => false,
            // Built-in globals have no location and remain searchable
            SymbolKind::Variable => symbol.location.is_none(),
            _ => true,
        }
    }

    /// Search keys for a symbol. Namespaces contribute one key per non-empty
    /// suffix of their segmented name so partial namespaces prefix-match.
    fn keys_for(symbol: &Symbol) -> Vec<String> {
        let fold = symbol.kind.is_case_insensitive();
        let key = |name: &str| {
            if fold {
                name.to_ascii_lowercase()
            } else {
                name.to_string()
            }
        };
        match symbol.kind {
            SymbolKind::Namespace => {
                let mut keys = Vec::new();
                let mut rest = symbol.name.as_str();
                loop {
                    if !rest.is_empty() {
                        keys.push(key(rest));
                    }
                    match rest.split_once('\\') {
                        Some((_, tail)) => rest = tail,
                        None => break,
                    }
                }
                keys
            }
            _ => vec![key(&symbol.name)],
        }
    }

    fn fold_for(symbol: &Symbol, text: &str) -> String {
        if symbol.kind.is_case_insensitive() {
            text.to_ascii_lowercase()
        } else {
            text.to_string()
        }
    }

    /// Exact-match lookup on a search key.
    pub fn find(
        &self,
        text: &str,
        mut predicate: impl FnMut(&Symbol) -> bool,
    ) -> Vec<SymbolHandle> {
        let mut out = Vec::new();
        let folded = text.to_ascii_lowercase();
        let mut keys = vec![folded];
        if text != keys[0] {
            keys.push(text.to_string());
        }
        for key in &keys {
            if let Some(entries) = self.name_index.get(key) {
                for entry in entries {
                    let Some(symbol) = self.tables.get(&entry.uri).and_then(|t| t.get(entry.id))
                    else {
                        continue;
                    };
                    if Self::fold_for(symbol, text) != *key {
                        continue;
                    }
                    if predicate(symbol) {
                        let handle = SymbolHandle {
                            uri: entry.uri.clone(),
                            id: entry.id,
                        };
                        if !out.contains(&handle) {
                            out.push(handle);
                        }
                    }
                }
            }
        }
        out
    }

    /// Prefix-match lookup, ranked: exact > word-boundary prefix > other
    /// prefix; ties by shorter name then lexicographic order.
    pub fn match_prefix(
        &self,
        text: &str,
        mut predicate: impl FnMut(&Symbol) -> bool,
    ) -> Vec<SymbolHandle> {
        if text.is_empty() {
            return Vec::new();
        }
        let folded = text.to_ascii_lowercase();
        let mut ranked: Vec<(u8, usize, String, SymbolHandle)> = Vec::new();
        let mut scan = |prefix: &str, store: &Self, folded_scan: bool| {
            for (key, entries) in store
                .name_index
                .range(prefix.to_string()..)
                .take_while(|(k, _)| k.starts_with(prefix))
            {
                for entry in entries {
                    let Some(symbol) = store.tables.get(&entry.uri).and_then(|t| t.get(entry.id))
                    else {
                        continue;
                    };
                    // Case-insensitive kinds are indexed under folded keys;
                    // only accept them from the folded scan (and vice versa)
                    if symbol.kind.is_case_insensitive() != folded_scan {
                        continue;
                    }
                    if !predicate(symbol) {
                        continue;
                    }
                    let rank = if key.len() == prefix.len() {
                        0
                    } else if is_word_boundary(key.as_bytes()[prefix.len()]) {
                        1
                    } else {
                        2
                    };
                    ranked.push((
                        rank,
                        symbol.name.len(),
                        symbol.name.clone(),
                        SymbolHandle {
                            uri: entry.uri.clone(),
                            id: entry.id,
                        },
                    ));
                }
            }
        };
        scan(&folded, self, true);
        scan(text, self, false);
        ranked.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
        let mut out = Vec::new();
        for (_, _, _, handle) in ranked {
            if !out.contains(&handle) {
                out.push(handle);
            }
        }
        out
    }

    /// Iterate all indexed symbols of a kind
    pub fn symbols_of_kind(&self, kind: SymbolKind) -> Vec<SymbolHandle> {
        let mut out = Vec::new();
        for (uri, table) in &self.tables {
            for id in table.preorder() {
                let symbol = table.symbol(id);
                if symbol.kind == kind && Self::is_indexable(symbol) {
                    out.push(SymbolHandle {
                        uri: uri.clone(),
                        id,
                    });
                }
            }
        }
        out
    }

    /// Global-variables view: `@global`-declared and built-in globals
    pub fn global_variables(&self) -> Vec<SymbolHandle> {
        let mut out = self.symbols_of_kind(SymbolKind::GlobalVariable);
        for (uri, table) in &self.tables {
            for id in table.preorder() {
                let symbol = table.symbol(id);
                if symbol.kind == SymbolKind::Variable && symbol.location.is_none() {
                    out.push(SymbolHandle {
                        uri: uri.clone(),
                        id,
                    });
                }
            }
        }
        out
    }

    /// Resolve a reference to its candidate declarations.
    ///
    /// Class-like, function, and constant references look up by FQN (with
    /// the written-form fallback for unqualified functions/constants);
    /// member references resolve their scope type to class FQNs and
    /// enumerate members under `strategy`.
    pub fn find_symbols_by_reference(
        &self,
        reference: &Reference,
        strategy: MergeStrategy,
    ) -> Vec<SymbolHandle> {
        match reference.kind {
            ReferenceKind::Class
            | ReferenceKind::Interface
            | ReferenceKind::Trait
            | ReferenceKind::Namespace => self.find(&reference.name, |s| {
                matches!(
                    s.kind,
                    SymbolKind::Class
                        | SymbolKind::Interface
                        | SymbolKind::Trait
                        | SymbolKind::Namespace
                )
            }),
            ReferenceKind::Constructor => {
                // The constructor declaration, else the class itself
                let classes = self.find(&reference.name, |s| s.kind.is_class_like());
                let aggregator = MemberAggregator::new(self);
                let constructor = aggregator.first_member(&reference.name, |symbol| {
                    symbol.kind == SymbolKind::Method
                        && symbol.name.eq_ignore_ascii_case("__construct")
                });
                match constructor {
                    Some(found) => vec![found],
                    None => classes,
                }
            }
            ReferenceKind::Function => {
                let mut out = self.find(&reference.name, |s| s.kind == SymbolKind::Function);
                if out.is_empty() {
                    if let Some(alt) = &reference.alt_name {
                        out = self.find(alt, |s| s.kind == SymbolKind::Function);
                    }
                }
                out
            }
            ReferenceKind::Constant => {
                let mut out = self.find(&reference.name, |s| s.kind == SymbolKind::Constant);
                if out.is_empty() {
                    if let Some(alt) = &reference.alt_name {
                        out = self.find(alt, |s| s.kind == SymbolKind::Constant);
                    }
                }
                out
            }
            ReferenceKind::Method => self.find_members(reference, strategy, |symbol, name| {
                symbol.kind == SymbolKind::Method && symbol.name.eq_ignore_ascii_case(name)
            }),
            ReferenceKind::Property => self.find_members(reference, strategy, |symbol, name| {
                symbol.kind == SymbolKind::Property
                    && (symbol.name == name
                        || symbol.name.strip_prefix('$') == Some(name))
            }),
            ReferenceKind::ClassConstant => {
                self.find_members(reference, strategy, |symbol, name| {
                    symbol.kind == SymbolKind::ClassConstant && symbol.name == name
                })
            }
            ReferenceKind::Variable | ReferenceKind::Parameter => Vec::new(),
        }
    }

    fn find_members(
        &self,
        reference: &Reference,
        strategy: MergeStrategy,
        mut matches: impl FnMut(&Symbol, &str) -> bool,
    ) -> Vec<SymbolHandle> {
        let Some(scope_type) = reference.scope.as_deref() else {
            return Vec::new();
        };
        let aggregator = MemberAggregator::new(self);
        let mut out = Vec::new();
        for class_fqn in type_string::atomic_class_array(scope_type) {
            for handle in aggregator.members(&class_fqn, strategy) {
                let Some(symbol) = self.symbol(&handle) else {
                    continue;
                };
                if matches(symbol, &reference.name) && !out.contains(&handle) {
                    out.push(handle);
                }
            }
        }
        out
    }

    /// Reduce a set of symbol handles to the union of their declared or
    /// documented types.
    pub fn merged_type_of(&self, handles: &[SymbolHandle]) -> String {
        let mut merged = String::new();
        for handle in handles {
            let Some(symbol) = self.symbol(handle) else {
                continue;
            };
            let declared = symbol
                .type_string
                .as_deref()
                .or(symbol.doc.as_ref().and_then(|d| d.type_string.as_deref()))
                .unwrap_or("");
            merged = type_string::merge(&merged, declared);
        }
        merged
    }

    /// Exact FQN of a class-like symbol as stored (corrects written case)
    pub fn canonical_class_name(&self, fqn: &str) -> Option<String> {
        self.find(fqn, |s| s.kind.is_class_like())
            .first()
            .and_then(|handle| self.symbol(handle))
            .map(|symbol| symbol.name.clone())
    }

    /// Short name completion label for a symbol
    pub fn short_name(symbol: &Symbol) -> &str {
        if symbol.kind.is_namespaced() {
            not_fqn(&symbol.name)
        } else {
            &symbol.name
        }
    }
}

fn is_word_boundary(byte: u8) -> bool {
    byte == b'\\' || byte == b'_' || byte == b'$' || byte.is_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LineIndex;
    use crate::parser;
    use crate::semantic::symbol_reader::SymbolReader;

    fn table_for(uri: &str, text: &str) -> SymbolTable {
        let parse = parser::parse(text);
        let line_index = LineIndex::new(text);
        SymbolReader::read(uri, text, &line_index, &parse.file)
    }

    fn store_with(text: &str) -> SymbolStore {
        let mut store = SymbolStore::new();
        store.add(table_for("file:///a.php", text));
        store
    }

    #[test]
    fn test_find_class_case_insensitive() {
        let store = store_with("<?php namespace App; class FooBar {}");
        assert_eq!(store.find("app\\foobar", |_| true).len(), 1);
        assert_eq!(store.find("App\\FooBar", |_| true).len(), 1);
        assert_eq!(store.find("App\\FooBaz", |_| true).len(), 0);
    }

    #[test]
    fn test_find_constant_case_sensitive() {
        let store = store_with("<?php const LIMIT = 1;");
        assert_eq!(store.find("LIMIT", |_| true).len(), 1);
        assert_eq!(store.find("limit", |_| true).len(), 0);
    }

    #[test]
    fn test_match_prefix_and_ranking() {
        let store = store_with(
            "<?php class Map {} class Mapper {} class BitMap {} function map_all() {}",
        );
        let handles = store.match_prefix("Map", |_| true);
        let names: Vec<_> = handles
            .iter()
            .map(|h| store.symbol(h).unwrap().name.clone())
            .collect();
        // exact first, then word-boundary prefix (map_all), then plain prefix
        assert_eq!(names[0], "Map");
        assert!(names.contains(&"Mapper".to_string()));
        assert!(names.contains(&"map_all".to_string()));
        assert!(!names.contains(&"BitMap".to_string()));
    }

    #[test]
    fn test_key_discipline() {
        let store = store_with("<?php class FooBar {} const LIMIT = 1;");
        for (name, _) in [("FooBar", ()), ("LIMIT", ())] {
            let found = store.find(name, |_| true);
            assert_eq!(found.len(), 1);
            let prefix = &name[..3];
            let matched = store.match_prefix(prefix, |_| true);
            assert!(
                matched.iter().any(|h| found.contains(h)),
                "prefix match must return exact-match symbols for {name}"
            );
        }
    }

    #[test]
    fn test_namespace_segment_keys() {
        let store = store_with("<?php namespace Very\\Deep\\Name; class X {}");
        assert!(!store.match_prefix("Deep", |s| s.kind == SymbolKind::Namespace).is_empty());
        assert!(!store.match_prefix("Name", |s| s.kind == SymbolKind::Namespace).is_empty());
    }

    #[test]
    fn test_add_remove_round_trip() {
        let mut store = SymbolStore::new();
        store.add(table_for("file:///base.php", "<?php class Keep {}"));
        let before_names = store.match_prefix("K", |_| true).len();
        let before_kinds = store.symbols_of_kind(SymbolKind::Class).len();

        store.add(table_for("file:///tmp.php", "<?php class Gone { function m() {} }"));
        assert!(store.table("file:///tmp.php").is_some());
        store.remove("file:///tmp.php");

        assert!(store.table("file:///tmp.php").is_none());
        assert_eq!(store.match_prefix("K", |_| true).len(), before_names);
        assert_eq!(store.symbols_of_kind(SymbolKind::Class).len(), before_kinds);
        assert!(store.find("Gone", |_| true).is_empty());
    }

    #[test]
    fn test_excluded_from_search() {
        let store = store_with("<?php use A\\B; function f($param) { $local = 1; }");
        assert!(store.find("$param", |_| true).is_empty(), "parameters excluded");
        assert!(store.find("$local", |_| true).is_empty(), "located variables excluded");
        assert!(store.find("B", |_| true).is_empty(), "use aliases excluded");
        assert_eq!(store.find("f", |_| true).len(), 1);
    }

    #[test]
    fn test_replacing_table_reindexes() {
        let mut store = SymbolStore::new();
        store.add(table_for("file:///a.php", "<?php class Old {}"));
        store.add(table_for("file:///a.php", "<?php class New {}"));
        assert!(store.find("Old", |_| true).is_empty());
        assert_eq!(store.find("New", |_| true).len(), 1);
    }
}
