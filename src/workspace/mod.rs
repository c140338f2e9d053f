//! Orchestration: drives parsing, symbol reading, and reference reading over
//! the documents of a workspace.
//!
//! The orchestrator owns the parsed-document store, the symbol store, the
//! reference store, and the persistent index as plain fields; nothing is
//! process-global. For any document the observable order is parse →
//! symbol-table swap → reference-table swap.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::IndexError;
use crate::document::{ContentChange, ParsedDocumentStore};
use crate::index::IndexStore;
use crate::semantic::{
    ReferenceReader, ReferenceStore, SymbolReader, SymbolStore, builtin,
};

/// Workspace configuration
#[derive(Debug, Clone)]
pub struct WorkspaceSettings {
    /// Source file extension (without dot)
    pub file_extension: String,
    /// Debounce window for reparse after edits
    pub debounce: std::time::Duration,
    /// Cache home for the persistent index; `None` keeps the index in memory
    pub cache_home: Option<PathBuf>,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            file_extension: "php".to_string(),
            debounce: crate::document::DEFAULT_DEBOUNCE,
            cache_home: None,
        }
    }
}

/// The owning orchestrator for one workspace
pub struct Workspace {
    settings: WorkspaceSettings,
    documents: ParsedDocumentStore,
    symbols: SymbolStore,
    references: ReferenceStore,
    index: IndexStore,
}

impl Workspace {
    /// Create a workspace with the built-in symbol table installed.
    pub fn new(settings: WorkspaceSettings) -> Self {
        let documents = ParsedDocumentStore::new(settings.debounce);
        let mut symbols = SymbolStore::new();
        symbols.add(builtin::builtin_table());
        Self {
            settings,
            documents,
            symbols,
            references: ReferenceStore::new(),
            index: IndexStore::memory(),
        }
    }

    /// Open the persistent index for `root_path` and collect the source
    /// files to be indexed. Bulk work happens through the returned job, one
    /// file per step, so interactive requests can preempt it.
    pub fn initialise(&mut self, root_path: &Path) -> IndexingJob {
        if let Some(cache_home) = &self.settings.cache_home {
            let directory =
                IndexStore::directory_for(cache_home, &root_path.display().to_string());
            self.index = IndexStore::open(&directory);
        }
        let extension = self.settings.file_extension.clone();
        let mut files: Vec<PathBuf> = WalkDir::new(root_path)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case(&extension))
            })
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        info!(
            "[WORKSPACE] initialise {}: {} source files",
            root_path.display(),
            files.len()
        );
        IndexingJob::new(files)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn documents(&self) -> &ParsedDocumentStore {
        &self.documents
    }

    pub fn symbols(&self) -> &SymbolStore {
        &self.symbols
    }

    pub fn references(&self) -> &ReferenceStore {
        &self.references
    }

    pub fn index(&self) -> &IndexStore {
        &self.index
    }

    // ------------------------------------------------------------------
    // Document lifecycle
    // ------------------------------------------------------------------

    /// Index a file from disk without opening it as an editor document.
    pub fn index_file(&mut self, path: &Path) -> bool {
        let uri = uri_for_path(path);
        match std::fs::read_to_string(path) {
            Ok(text) => {
                self.rebuild(&uri, &text);
                true
            }
            Err(error) => {
                warn!("[WORKSPACE] cannot read {}: {}", path.display(), error);
                false
            }
        }
    }

    /// Open a document: parse, build the symbol table, register it, then
    /// build and register the reference table.
    pub fn open_document(&mut self, uri: &str, version: i32, text: String) {
        self.documents.open(uri, version, text.clone());
        self.references.reopen(uri);
        self.rebuild(uri, &text);
    }

    /// Apply content changes; the reparse is debounced until `poll`.
    pub fn edit_document(
        &mut self,
        uri: &str,
        version: i32,
        changes: &[ContentChange],
        now: Instant,
    ) -> bool {
        self.documents.edit(uri, version, changes, now)
    }

    /// Drive debounced reparses; table swaps follow document order.
    pub fn poll(&mut self, now: Instant) -> Vec<String> {
        let changed = self.documents.poll_due(now);
        for uri in &changed {
            self.rebuild_from_document(uri);
        }
        changed
    }

    /// Force a dirty document through reparse and reindex immediately.
    pub fn flush_document(&mut self, uri: &str) -> bool {
        if self.documents.flush(uri) {
            self.rebuild_from_document(uri);
            true
        } else {
            false
        }
    }

    /// Close a document: the parsed document is dropped and the reference
    /// table frozen; the symbol table persists so the workspace view stays
    /// complete.
    pub fn close_document(&mut self, uri: &str) {
        self.documents.close(uri);
        self.references.close(uri);
    }

    /// Remove a document entirely (file deleted from the workspace).
    pub fn remove(&mut self, uri: &str) {
        self.documents.close(uri);
        self.references.remove(uri);
        self.symbols.remove(uri);
        self.index.remove_document(uri);
    }

    /// Flush the persistent index to disk.
    pub fn flush_index(&mut self) {
        if let Err(error) = self.index.flush() {
            warn!("[WORKSPACE] index flush failed: {}", error);
        }
    }

    // ------------------------------------------------------------------
    // Rebuild pipeline
    // ------------------------------------------------------------------

    fn rebuild_from_document(&mut self, uri: &str) {
        let Some(document) = self.documents.document(uri) else {
            return;
        };
        let document = document.lock();
        let text = document.text.clone();
        drop(document);
        self.rebuild(uri, &text);
    }

    /// parse → symbol-table swap → reference-table swap
    fn rebuild(&mut self, uri: &str, text: &str) {
        let (parse, line_index) = match self.documents.document(uri) {
            Some(document) => {
                let document = document.lock();
                (document.parse.clone(), document.line_index.clone())
            }
            None => (
                crate::parser::parse(text),
                crate::core::LineIndex::new(text),
            ),
        };

        let table = SymbolReader::read(uri, text, &line_index, &parse.file);
        self.symbols.add(table);

        // The reference reader runs against the freshly registered table so
        // the document's own globals are visible to its own bodies
        let reference_table = {
            let Some(table) = self.symbols.table(uri) else {
                return;
            };
            ReferenceReader::read(uri, &line_index, &self.symbols, table, &parse.file)
        };
        match reference_table {
            Ok(reference_table) => {
                if let Some(table) = self.symbols.table(uri) {
                    self.index.write_document(table, Some(&reference_table));
                }
                self.references.add(reference_table);
            }
            Err(IndexError::TornTree { uri, expected, found }) => {
                warn!(
                    "[WORKSPACE] torn tree in {}: expected {}, found {}; reference table discarded",
                    uri, expected, found
                );
                self.references.remove(&uri);
            }
            Err(error) => {
                warn!("[WORKSPACE] reference read failed: {}", error);
            }
        }
        debug!("[WORKSPACE] rebuilt {}", uri);
    }
}

/// Cooperative bulk-indexing job: one file per step, cancellable at each
/// yield point.
pub struct IndexingJob {
    files: Vec<PathBuf>,
    cursor: usize,
    cancel: CancellationToken,
}

impl IndexingJob {
    fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            cursor: 0,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn remaining(&self) -> usize {
        self.files.len() - self.cursor
    }

    /// Index one file. Returns `false` when done or cancelled.
    pub fn run_step(&mut self, workspace: &mut Workspace) -> bool {
        if self.cancel.is_cancelled() {
            debug!("[WORKSPACE] bulk indexing cancelled at {}", self.cursor);
            return false;
        }
        let Some(path) = self.files.get(self.cursor) else {
            return false;
        };
        let path = path.clone();
        self.cursor += 1;
        workspace.index_file(&path);
        self.cursor < self.files.len()
    }

    /// Drive the job to completion; returns the number of files visited.
    pub fn run_to_completion(mut self, workspace: &mut Workspace) -> usize {
        while self.run_step(workspace) {}
        workspace.flush_index();
        self.cursor
    }
}

/// `file://` URI for a filesystem path
pub fn uri_for_path(path: &Path) -> String {
    format!("file://{}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Position, Span};
    use crate::semantic::SymbolKind;

    fn workspace() -> Workspace {
        Workspace::new(WorkspaceSettings::default())
    }

    #[test]
    fn test_open_document_builds_both_tables() {
        let mut ws = workspace();
        ws.open_document("file:///t.php", 1, "<?php class A { function m() {} }".into());
        assert!(ws.symbols().table("file:///t.php").is_some());
        assert!(ws.references().table("file:///t.php").is_some());
        assert_eq!(ws.symbols().find("A", |_| true).len(), 1);
    }

    #[test]
    fn test_edit_then_poll_swaps_tables() {
        let mut ws = workspace();
        ws.open_document("file:///t.php", 1, "<?php class A {}".into());
        let t0 = Instant::now();
        ws.edit_document(
            "file:///t.php",
            2,
            &[ContentChange::Full("<?php class Renamed {}".into())],
            t0,
        );
        // not yet: debounce window still open
        assert_eq!(ws.symbols().find("Renamed", |_| true).len(), 0);
        let changed = ws.poll(t0 + std::time::Duration::from_millis(300));
        assert_eq!(changed.len(), 1);
        assert_eq!(ws.symbols().find("Renamed", |_| true).len(), 1);
        assert!(ws.symbols().find("A", |s| s.kind == SymbolKind::Class).is_empty());
    }

    #[test]
    fn test_close_keeps_symbols_drops_updates() {
        let mut ws = workspace();
        ws.open_document("file:///t.php", 1, "<?php class Kept {}".into());
        ws.close_document("file:///t.php");
        assert!(!ws.documents().contains("file:///t.php"));
        assert_eq!(ws.symbols().find("Kept", |_| true).len(), 1, "symbols persist");
        // frozen reference table remains queryable
        assert!(ws.references().table("file:///t.php").is_some());
    }

    #[test]
    fn test_remove_drops_everything() {
        let mut ws = workspace();
        ws.open_document("file:///t.php", 1, "<?php class Gone {}".into());
        ws.remove("file:///t.php");
        assert!(ws.symbols().table("file:///t.php").is_none());
        assert!(ws.references().table("file:///t.php").is_none());
        assert!(ws.symbols().find("Gone", |_| true).is_empty());
    }

    #[test]
    fn test_bulk_indexing_job() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.php"), "<?php class FromDiskA {}").expect("write");
        std::fs::write(dir.path().join("b.php"), "<?php class FromDiskB {}").expect("write");
        std::fs::write(dir.path().join("ignored.txt"), "not php").expect("write");

        let mut ws = workspace();
        let job = ws.initialise(dir.path());
        assert_eq!(job.remaining(), 2);
        let visited = job.run_to_completion(&mut ws);
        assert_eq!(visited, 2);
        assert_eq!(ws.symbols().find("FromDiskA", |_| true).len(), 1);
        assert_eq!(ws.symbols().find("FromDiskB", |_| true).len(), 1);
    }

    #[test]
    fn test_bulk_indexing_cancellation() {
        let dir = tempfile::tempdir().expect("tempdir");
        for i in 0..5 {
            std::fs::write(dir.path().join(format!("f{i}.php")), "<?php class X {}")
                .expect("write");
        }
        let mut ws = workspace();
        let mut job = ws.initialise(dir.path());
        let token = job.cancel_token();
        assert!(job.run_step(&mut ws));
        token.cancel();
        assert!(!job.run_step(&mut ws), "cancelled at the yield point");
        assert!(job.remaining() > 0);
    }

    #[test]
    fn test_cross_file_resolution_after_indexing() {
        let mut ws = workspace();
        ws.open_document("file:///lib.php", 1, "<?php namespace Lib; class Conn { function ping(): bool {} }".into());
        ws.open_document(
            "file:///app.php",
            1,
            "<?php namespace App; use Lib\\Conn; $c = new Conn(); $ok = $c->ping();".into(),
        );
        let reference = ws
            .references()
            .reference_at_position("file:///app.php", Position::new(0, 63))
            .expect("reference at ping()");
        assert_eq!(reference.type_string.as_deref(), Some("bool"));
    }

    #[test]
    fn test_uri_for_path() {
        assert_eq!(uri_for_path(Path::new("/a/b.php")), "file:///a/b.php");
    }

    #[test]
    fn test_splice_edit_reindexes() {
        let mut ws = workspace();
        ws.open_document("file:///t.php", 1, "<?php class Abc {}".into());
        let t0 = Instant::now();
        ws.edit_document(
            "file:///t.php",
            2,
            &[ContentChange::Splice {
                range: Span::from_coords(0, 12, 0, 15),
                text: "Xyz".into(),
            }],
            t0,
        );
        assert!(ws.flush_document("file:///t.php"));
        assert_eq!(ws.symbols().find("Xyz", |_| true).len(), 1);
    }
}
