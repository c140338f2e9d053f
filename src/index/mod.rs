//! Persistent keyed index.
//!
//! A byte-ordered keyed store with four sub-spaces:
//!
//! ```text
//! symbols/<symbol-key>                      → symbol record
//! by-uri/<uri>/<n>                          → symbol keys for a file
//! refs/<uri>                                → reference table
//! completion/<token>#<uri>#<symbol-key>     → compact completion entry
//! ```
//!
//! Keys are UTF-8 byte-ordered; enumeration uses prefix range scans. The
//! store snapshots to `<cache>/<md5(root)>/index.json`. Writes batch per
//! document; IO failures retry once and then degrade to in-memory only.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{IndexError, IndexResult, Span};
use crate::semantic::{ReferenceTable, Symbol, SymbolKind, SymbolTable};

/// Compact entry behind a completion key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEntry {
    pub uri: String,
    pub kind: SymbolKind,
    pub range: Span,
    pub name: String,
}

/// Byte-ordered keyed store with prefix scans and a JSON snapshot.
#[derive(Debug)]
pub struct IndexStore {
    path: Option<PathBuf>,
    map: BTreeMap<String, String>,
    dirty: bool,
}

impl IndexStore {
    /// In-memory store without persistence
    pub fn memory() -> Self {
        Self {
            path: None,
            map: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Directory for a workspace root: `<cache>/.indexer/<md5(root)>`
    pub fn directory_for(cache_home: &Path, root_path: &str) -> PathBuf {
        let digest = md5::compute(root_path.as_bytes());
        cache_home.join(".indexer").join(format!("{digest:x}"))
    }

    /// Open the store at `directory`, loading a prior snapshot when present.
    /// A failed load retries once, then degrades to memory-only.
    pub fn open(directory: &Path) -> Self {
        let path = directory.join("index.json");
        match Self::try_load(&path).or_else(|error| {
            warn!("[INDEX] load failed, retrying once: {}", error);
            Self::try_load(&path)
        }) {
            Ok(map) => {
                debug!("[INDEX] opened {} ({} keys)", path.display(), map.len());
                Self {
                    path: Some(path),
                    map,
                    dirty: false,
                }
            }
            Err(error) => {
                warn!("[INDEX] degrading to memory-only: {}", error);
                Self::memory()
            }
        }
    }

    fn try_load(path: &Path) -> IndexResult<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = std::fs::read(path).map_err(|source| IndexError::IndexIo {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| IndexError::IndexCorrupt {
            path: path.display().to_string(),
            source,
        })
    }

    /// Whether the store persists to disk
    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn put(&mut self, key: String, value: String) {
        self.map.insert(key, value);
        self.dirty = true;
    }

    /// Range scan over `[prefix, prefix + "\u{10FFFF}")`
    pub fn scan_prefix<'s>(&'s self, prefix: &'s str) -> impl Iterator<Item = (&'s str, &'s str)> {
        self.map
            .range(prefix.to_string()..)
            .take_while(move |(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn delete_prefix(&mut self, prefix: &str) {
        let keys: Vec<String> = self
            .scan_prefix(prefix)
            .map(|(key, _)| key.to_string())
            .collect();
        for key in keys {
            self.map.remove(&key);
            self.dirty = true;
        }
    }

    // ------------------------------------------------------------------
    // Document batches
    // ------------------------------------------------------------------

    /// Write one document's symbol table (and reference table) as a batch,
    /// replacing everything the document contributed before.
    pub fn write_document(&mut self, table: &SymbolTable, references: Option<&ReferenceTable>) {
        let uri = table.uri();
        self.remove_document(uri);

        let mut n = 0;
        for id in table.preorder() {
            let symbol = table.symbol(id);
            if matches!(symbol.kind, SymbolKind::File | SymbolKind::Parameter) {
                continue;
            }
            let Ok(record) = serde_json::to_string(symbol) else {
                continue;
            };
            let symbol_key = symbol_key(symbol);
            self.put(format!("symbols/{symbol_key}"), record);
            self.put(format!("by-uri/{uri}/{n}"), symbol_key.clone());
            n += 1;

            if let Some(location) = &symbol.location {
                let entry = CompletionEntry {
                    uri: uri.to_string(),
                    kind: symbol.kind,
                    range: location.range,
                    name: symbol.name.clone(),
                };
                let Ok(payload) = serde_json::to_string(&entry) else {
                    continue;
                };
                let fold = symbol.kind.is_case_insensitive();
                for token in tokenize_key(&symbol.name, fold) {
                    self.put(format!("completion/{token}#{uri}#{symbol_key}"), payload.clone());
                }
            }
        }

        if let Some(references) = references {
            if let Ok(payload) = serde_json::to_string(references) {
                self.put(format!("refs/{uri}"), payload);
            }
        }
        debug!("[INDEX] wrote {} ({} symbols)", uri, n);
    }

    /// Delete every key a document contributed.
    pub fn remove_document(&mut self, uri: &str) {
        // The by-uri list names the symbol keys to drop
        let symbol_keys: Vec<String> = self
            .scan_prefix(&format!("by-uri/{uri}/"))
            .map(|(_, value)| value.to_string())
            .collect();
        for key in symbol_keys {
            self.map.remove(&format!("symbols/{key}"));
            self.dirty = true;
        }
        self.delete_prefix(&format!("by-uri/{uri}/"));
        self.map.remove(&format!("refs/{uri}"));

        let stale: Vec<String> = self
            .scan_prefix("completion/")
            .filter(|(key, _)| {
                key.split('#').nth(1) == Some(uri)
            })
            .map(|(key, _)| key.to_string())
            .collect();
        for key in stale {
            self.map.remove(&key);
            self.dirty = true;
        }
    }

    /// Completion entries whose tokens start with `prefix`
    pub fn completion_candidates(&self, prefix: &str) -> Vec<CompletionEntry> {
        let mut out = Vec::new();
        for folded in [prefix.to_ascii_lowercase(), prefix.to_string()] {
            for (_, value) in self.scan_prefix(&format!("completion/{folded}")) {
                if let Ok(entry) = serde_json::from_str::<CompletionEntry>(value) {
                    if !out.contains(&entry) {
                        out.push(entry);
                    }
                }
            }
            if prefix == folded {
                break;
            }
        }
        out
    }

    /// Snapshot to disk. Retries once; on repeat failure the error is
    /// returned and the store keeps its in-memory state.
    pub fn flush(&mut self) -> IndexResult<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }
        match self.try_flush(&path).or_else(|error| {
            warn!("[INDEX] flush failed, retrying once: {}", error);
            self.try_flush(&path)
        }) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    fn try_flush(&self, path: &Path) -> IndexResult<()> {
        let io_error = |source| IndexError::IndexIo {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let payload = serde_json::to_vec(&self.map).map_err(|source| IndexError::IndexCorrupt {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, payload).map_err(io_error)
    }
}

/// Stable key for a symbol record: name, plus scope for members so two
/// classes' members never collide.
fn symbol_key(symbol: &Symbol) -> String {
    match &symbol.scope {
        Some(scope) if !scope.is_empty() => format!("{scope}::{}", symbol.name),
        _ => symbol.name.clone(),
    }
}

/// Split a name on word boundaries (case transitions, `_`, `\`, `$`) and
/// index each token; case-folded for class/method/function/trait/interface
/// kinds, preserved for constants and variables.
pub fn tokenize_key(name: &str, fold: bool) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut push = |token: &str| {
        if token.is_empty() {
            return;
        }
        let token = if fold {
            token.to_ascii_lowercase()
        } else {
            token.to_string()
        };
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    };

    let bytes = name.as_bytes();
    let mut start = 0;
    for i in 0..bytes.len() {
        let b = bytes[i];
        if b == b'_' || b == b'\\' || b == b'$' {
            push(&name[start..i]);
            start = i + 1;
        } else if b.is_ascii_uppercase()
            && i > start
            && bytes[i - 1].is_ascii_lowercase()
        {
            push(&name[start..i]);
            start = i;
        }
    }
    push(&name[start..]);
    // The full name is a token too, so exact-prefix queries hit
    push(name);
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LineIndex;
    use crate::parser;
    use crate::semantic::SymbolReader;

    fn sample_table(uri: &str) -> SymbolTable {
        let text = "<?php namespace App; class HttpServer { public function listenNow() {} } const MAX_RETRIES = 3;";
        let parse = parser::parse(text);
        let line_index = LineIndex::new(text);
        SymbolReader::read(uri, text, &line_index, &parse.file)
    }

    #[test]
    fn test_tokenize_key() {
        assert_eq!(
            tokenize_key("App\\HttpServer", true),
            vec!["app", "http", "server", "httpserver", "app\\httpserver"]
        );
        assert_eq!(
            tokenize_key("MAX_RETRIES", false),
            vec!["MAX", "RETRIES", "MAX_RETRIES"]
        );
        assert_eq!(tokenize_key("$dbConn", false), vec!["db", "Conn", "$dbConn"]);
    }

    #[test]
    fn test_write_scan_remove_round_trip() {
        let mut store = IndexStore::memory();
        store.write_document(&sample_table("file:///a.php"), None);
        assert!(store.get("refs/file:///a.php").is_none());
        assert!(
            store
                .scan_prefix("by-uri/file:///a.php/")
                .next()
                .is_some()
        );
        assert!(!store.completion_candidates("http").is_empty());
        assert!(!store.completion_candidates("listen").is_empty());

        store.remove_document("file:///a.php");
        assert!(store.scan_prefix("by-uri/").next().is_none());
        assert!(store.scan_prefix("symbols/").next().is_none());
        assert!(store.completion_candidates("http").is_empty());
    }

    #[test]
    fn test_prefix_scan_is_bounded() {
        let mut store = IndexStore::memory();
        store.put("aa/1".into(), "1".into());
        store.put("ab/1".into(), "2".into());
        store.put("b/1".into(), "3".into());
        let keys: Vec<_> = store.scan_prefix("a").map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["aa/1", "ab/1"]);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = IndexStore::open(dir.path());
        assert!(store.is_persistent());
        store.write_document(&sample_table("file:///a.php"), None);
        store.flush().expect("flush");

        let reloaded = IndexStore::open(dir.path());
        assert!(!reloaded.is_empty());
        assert!(!reloaded.completion_candidates("http").is_empty());
    }

    #[test]
    fn test_directory_for_is_stable() {
        let a = IndexStore::directory_for(Path::new("/home/u"), "/proj");
        let b = IndexStore::directory_for(Path::new("/home/u"), "/proj");
        let c = IndexStore::directory_for(Path::new("/home/u"), "/other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("/home/u/.indexer"));
    }

    #[test]
    fn test_corrupt_snapshot_degrades_to_memory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("index.json"), b"{not json").expect("write");
        let store = IndexStore::open(dir.path());
        assert!(!store.is_persistent(), "corrupt snapshot degrades");
        assert!(store.is_empty());
    }
}
