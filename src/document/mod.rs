//! Parsed-document store: open files, their text and syntax trees.
//!
//! Edits buffer content changes and mark the document dirty; the reparse is
//! debounced (default 250 ms) and performed by `poll_due`/`flush` on the
//! cooperative executor. Each document sits behind its own mutex so a
//! request handler can hold it steady for the duration of a query.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::core::{LineIndex, Span};
use crate::parser::{self, Parse};

/// Default debounce window before a dirty document reparses
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// One open document with its current parse
#[derive(Debug)]
pub struct ParsedDocument {
    pub uri: String,
    pub version: i32,
    pub text: String,
    pub line_index: LineIndex,
    pub parse: Parse,
}

impl ParsedDocument {
    fn new(uri: String, version: i32, text: String) -> Self {
        let parse = parser::parse(&text);
        let line_index = LineIndex::new(&text);
        Self {
            uri,
            version,
            text,
            line_index,
            parse,
        }
    }

    fn reparse(&mut self) {
        self.line_index = LineIndex::new(&self.text);
        self.parse = parser::parse(&self.text);
    }
}

/// A single content change from an editor
#[derive(Debug, Clone)]
pub enum ContentChange {
    /// Replace the whole document
    Full(String),
    /// Splice `text` over `range`
    Splice { range: Span, text: String },
}

struct DocumentEntry {
    document: Arc<Mutex<ParsedDocument>>,
    /// Set when unreparsed edits are pending
    dirty_since: Option<Instant>,
}

/// Tracks open files; reparse is debounced and poll-driven
pub struct ParsedDocumentStore {
    entries: FxHashMap<String, DocumentEntry>,
    debounce: Duration,
}

impl Default for ParsedDocumentStore {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl ParsedDocumentStore {
    pub fn new(debounce: Duration) -> Self {
        Self {
            entries: FxHashMap::default(),
            debounce,
        }
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    /// Open (or re-open) a document. Parses immediately.
    pub fn open(&mut self, uri: &str, version: i32, text: String) -> Arc<Mutex<ParsedDocument>> {
        debug!("[DOCUMENTS] open {} v{}", uri, version);
        let document = Arc::new(Mutex::new(ParsedDocument::new(
            uri.to_string(),
            version,
            text,
        )));
        self.entries.insert(
            uri.to_string(),
            DocumentEntry {
                document: Arc::clone(&document),
                dirty_since: None,
            },
        );
        document
    }

    /// Handle to the per-URI mutex guarding the document
    pub fn document(&self, uri: &str) -> Option<Arc<Mutex<ParsedDocument>>> {
        self.entries.get(uri).map(|e| Arc::clone(&e.document))
    }

    pub fn close(&mut self, uri: &str) -> bool {
        debug!("[DOCUMENTS] close {}", uri);
        self.entries.remove(uri).is_some()
    }

    /// Apply content changes in order and mark the document dirty.
    /// The reparse happens later, at `poll_due`/`flush`.
    pub fn edit(&mut self, uri: &str, version: i32, changes: &[ContentChange], now: Instant) -> bool {
        let Some(entry) = self.entries.get_mut(uri) else {
            return false;
        };
        {
            let mut document = entry.document.lock();
            for change in changes {
                match change {
                    ContentChange::Full(text) => {
                        document.text = text.clone();
                        // Splice offsets are resolved against the text as
                        // edited so far
                        document.line_index = LineIndex::new(&document.text);
                    }
                    ContentChange::Splice { range, text } => {
                        let start =
                            usize::from(document.line_index.offset(range.start)).min(document.text.len());
                        let end =
                            usize::from(document.line_index.offset(range.end)).min(document.text.len());
                        let (start, end) = (start.min(end), start.max(end));
                        document.text.replace_range(start..end, text);
                        document.line_index = LineIndex::new(&document.text);
                    }
                }
            }
            document.version = version;
        }
        entry.dirty_since = Some(now);
        trace!("[DOCUMENTS] edit {} v{} ({} changes)", uri, version, changes.len());
        true
    }

    /// Reparse documents whose debounce window has elapsed.
    /// Returns the URIs that changed so callers can swap their tables.
    pub fn poll_due(&mut self, now: Instant) -> Vec<String> {
        let mut changed = Vec::new();
        for (uri, entry) in &mut self.entries {
            if let Some(since) = entry.dirty_since {
                if now.duration_since(since) >= self.debounce {
                    entry.document.lock().reparse();
                    entry.dirty_since = None;
                    changed.push(uri.clone());
                }
            }
        }
        for uri in &changed {
            debug!("[DOCUMENTS] reparsed {}", uri);
        }
        changed
    }

    /// Force an immediate reparse of one dirty document.
    pub fn flush(&mut self, uri: &str) -> bool {
        let Some(entry) = self.entries.get_mut(uri) else {
            return false;
        };
        if entry.dirty_since.is_none() {
            return false;
        }
        entry.document.lock().reparse();
        entry.dirty_since = None;
        true
    }

    /// Whether a document has pending unreparsed edits
    pub fn is_dirty(&self, uri: &str) -> bool {
        self.entries
            .get(uri)
            .is_some_and(|e| e.dirty_since.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Position;

    fn span(sl: u32, sc: u32, el: u32, ec: u32) -> Span {
        Span::new(Position::new(sl, sc), Position::new(el, ec))
    }

    #[test]
    fn test_open_parses_immediately() {
        let mut store = ParsedDocumentStore::default();
        let doc = store.open("file:///t.php", 1, "<?php class A {}".to_string());
        let doc = doc.lock();
        assert!(doc.parse.ok());
        assert_eq!(doc.version, 1);
    }

    #[test]
    fn test_splice_edit_and_debounce() {
        let mut store = ParsedDocumentStore::new(Duration::from_millis(250));
        store.open("file:///t.php", 1, "<?php class A {}".to_string());
        let t0 = Instant::now();
        store.edit(
            "file:///t.php",
            2,
            &[ContentChange::Splice {
                range: span(0, 12, 0, 13),
                text: "B".to_string(),
            }],
            t0,
        );
        assert!(store.is_dirty("file:///t.php"));
        // Within the window nothing reparses
        assert!(store.poll_due(t0 + Duration::from_millis(100)).is_empty());
        let changed = store.poll_due(t0 + Duration::from_millis(300));
        assert_eq!(changed, vec!["file:///t.php".to_string()]);
        let doc = store.document("file:///t.php").unwrap();
        let doc = doc.lock();
        assert!(doc.text.contains("class B"));
        assert_eq!(doc.version, 2);
    }

    #[test]
    fn test_full_replacement_then_flush() {
        let mut store = ParsedDocumentStore::default();
        store.open("file:///t.php", 1, "<?php class A {}".to_string());
        store.edit(
            "file:///t.php",
            2,
            &[ContentChange::Full("<?php function f() {}".to_string())],
            Instant::now(),
        );
        assert!(store.flush("file:///t.php"));
        let doc = store.document("file:///t.php").unwrap();
        assert!(doc.lock().text.starts_with("<?php function"));
        assert!(!store.is_dirty("file:///t.php"));
    }

    #[test]
    fn test_changes_apply_in_order() {
        let mut store = ParsedDocumentStore::default();
        store.open("file:///t.php", 1, "<?php $a;".to_string());
        store.edit(
            "file:///t.php",
            2,
            &[
                ContentChange::Full("<?php $bb;".to_string()),
                ContentChange::Splice {
                    range: span(0, 6, 0, 9),
                    text: "$ccc".to_string(),
                },
            ],
            Instant::now(),
        );
        store.flush("file:///t.php");
        let doc = store.document("file:///t.php").unwrap();
        assert_eq!(doc.lock().text, "<?php $ccc;");
    }

    #[test]
    fn test_close_removes() {
        let mut store = ParsedDocumentStore::default();
        store.open("file:///t.php", 1, "<?php".to_string());
        assert!(store.close("file:///t.php"));
        assert!(!store.contains("file:///t.php"));
        assert!(!store.close("file:///t.php"));
    }
}
