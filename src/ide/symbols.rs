//! Document and workspace symbol queries.

use crate::core::Location;
use crate::semantic::{Modifiers, SymbolId, SymbolKind, SymbolStore, SymbolTable, not_fqn};

/// A symbol with its nested children, for outline views.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    pub children: Vec<DocumentSymbol>,
}

/// Hierarchical outline of one document.
pub fn document_symbols(symbols: &SymbolStore, uri: &str) -> Vec<DocumentSymbol> {
    let Some(table) = symbols.table(uri) else {
        return Vec::new();
    };
    collect(table, table.root())
}

fn collect(table: &SymbolTable, parent: SymbolId) -> Vec<DocumentSymbol> {
    let mut out = Vec::new();
    for id in &table.symbol(parent).children {
        let symbol = table.symbol(*id);
        // Outline views list declarations, not variables or import aliases
        if symbol.modifiers.contains(Modifiers::USE)
            || matches!(symbol.kind, SymbolKind::Variable | SymbolKind::Parameter)
        {
            continue;
        }
        let Some(location) = symbol.location.clone() else {
            continue;
        };
        out.push(DocumentSymbol {
            name: not_fqn(&symbol.name).to_string(),
            kind: symbol.kind,
            location,
            children: collect(table, *id),
        });
    }
    out
}

/// Ranked workspace-wide symbol search.
pub fn workspace_symbols(symbols: &SymbolStore, query: &str) -> Vec<(String, SymbolKind, Location)> {
    symbols
        .match_prefix(query, |_| true)
        .iter()
        .filter_map(|handle| {
            let symbol = symbols.symbol(handle)?;
            let location = symbol.location.clone()?;
            Some((symbol.name.clone(), symbol.kind, location))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::{Workspace, WorkspaceSettings};

    #[test]
    fn test_document_outline() {
        let mut ws = Workspace::new(WorkspaceSettings::default());
        ws.open_document(
            "file:///t.php",
            1,
            "<?php namespace N; use A\\B; class C { const K = 1; public $p; function m($x) {} }"
                .into(),
        );
        let outline = document_symbols(ws.symbols(), "file:///t.php");
        assert_eq!(outline.len(), 1);
        let ns = &outline[0];
        assert_eq!(ns.kind, SymbolKind::Namespace);
        let class = ns
            .children
            .iter()
            .find(|c| c.kind == SymbolKind::Class)
            .expect("class in outline");
        assert_eq!(class.name, "C");
        let kinds: Vec<_> = class.children.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&SymbolKind::ClassConstant));
        assert!(kinds.contains(&SymbolKind::Property));
        assert!(kinds.contains(&SymbolKind::Method));
        let method = class
            .children
            .iter()
            .find(|c| c.kind == SymbolKind::Method)
            .expect("method");
        assert!(method.children.is_empty(), "parameters are not outlined");
    }

    #[test]
    fn test_workspace_symbols_ranked() {
        let mut ws = Workspace::new(WorkspaceSettings::default());
        ws.open_document(
            "file:///t.php",
            1,
            "<?php class Map {} class Mapper {} function map_reduce() {}".into(),
        );
        let results = workspace_symbols(ws.symbols(), "Map");
        assert!(!results.is_empty());
        assert_eq!(results[0].0, "Map", "exact match ranks first");
    }
}
