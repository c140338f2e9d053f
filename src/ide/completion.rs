//! Completion suggestions implementation.

use crate::core::Position;
use crate::semantic::{
    MemberAggregator, MergeStrategy, Modifiers, ReferenceKind, ReferenceStore, Symbol, SymbolKind,
    SymbolStore, not_fqn, type_string,
};

/// Kind of completion item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionKind {
    Class,
    Interface,
    Trait,
    Method,
    Property,
    Constant,
    ClassConstant,
    Function,
    Variable,
    Namespace,
}

impl CompletionKind {
    fn from_symbol(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Interface => CompletionKind::Interface,
            SymbolKind::Trait => CompletionKind::Trait,
            SymbolKind::Method | SymbolKind::Constructor => CompletionKind::Method,
            SymbolKind::Property => CompletionKind::Property,
            SymbolKind::Constant => CompletionKind::Constant,
            SymbolKind::ClassConstant => CompletionKind::ClassConstant,
            SymbolKind::Function => CompletionKind::Function,
            SymbolKind::Variable | SymbolKind::Parameter | SymbolKind::GlobalVariable => {
                CompletionKind::Variable
            }
            SymbolKind::Namespace => CompletionKind::Namespace,
            SymbolKind::Class | SymbolKind::File => CompletionKind::Class,
        }
    }

    /// Convert to the LSP completion item kind number.
    pub fn to_lsp(self) -> u32 {
        match self {
            CompletionKind::Class => 7,
            CompletionKind::Interface => 8,
            CompletionKind::Trait => 7,
            CompletionKind::Method => 2,
            CompletionKind::Property => 10,
            CompletionKind::Constant | CompletionKind::ClassConstant => 21,
            CompletionKind::Function => 3,
            CompletionKind::Variable => 6,
            CompletionKind::Namespace => 9,
        }
    }
}

/// A completion suggestion.
#[derive(Clone, Debug)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    /// Shown after the label (type or signature)
    pub detail: Option<String>,
    pub documentation: Option<String>,
    /// Lower sorts first
    pub sort_priority: u32,
}

impl CompletionItem {
    fn new(label: impl Into<String>, kind: CompletionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            documentation: None,
            sort_priority: 100,
        }
    }

    fn from_symbol(symbol: &Symbol) -> Self {
        let mut item = Self::new(
            SymbolStore::short_name(symbol).to_string(),
            CompletionKind::from_symbol(symbol.kind),
        );
        if let Some(type_string) = &symbol.type_string {
            if !type_string.is_empty() {
                item.detail = Some(type_string.clone());
            }
        }
        if let Some(doc) = &symbol.doc {
            item.documentation = Some(doc.description.clone());
        }
        item
    }
}

/// Completion suggestions at a position.
///
/// Member accesses complete against the aggregated members of the scope
/// type; variable positions complete against the enclosing lexical scope;
/// name positions prefix-search the workspace.
pub fn completions(
    symbols: &SymbolStore,
    references: &ReferenceStore,
    uri: &str,
    position: Position,
) -> Vec<CompletionItem> {
    let mut items = Vec::new();
    let reference = references.reference_at_position(uri, position);

    match reference {
        Some(reference)
            if matches!(
                reference.kind,
                ReferenceKind::Method | ReferenceKind::Property | ReferenceKind::ClassConstant
            ) =>
        {
            let Some(scope_type) = reference.scope.as_deref() else {
                return items;
            };
            let aggregator = MemberAggregator::new(symbols);
            let written = reference.name.as_str();
            for class_fqn in type_string::atomic_class_array(scope_type) {
                for handle in aggregator.members(&class_fqn, MergeStrategy::Override) {
                    let Some(symbol) = symbols.symbol(&handle) else {
                        continue;
                    };
                    let label = symbol.name.trim_start_matches('$');
                    if !written.is_empty()
                        && !label
                            .to_ascii_lowercase()
                            .starts_with(&written.to_ascii_lowercase())
                    {
                        continue;
                    }
                    let mut item = CompletionItem::from_symbol(symbol);
                    if symbol.kind == SymbolKind::Method {
                        if let Some(table) = symbols.table(&handle.uri) {
                            item.detail = Some(table.signature_string(handle.id));
                        }
                    }
                    // Accessible members first; private/protected from other
                    // classes still listed, later
                    if !symbol.modifiers.contains(Modifiers::PUBLIC) {
                        item.sort_priority = 200;
                    }
                    items.push(item);
                }
            }
        }
        Some(reference) if reference.kind == ReferenceKind::Variable => {
            if let Some(scope) = references.scope_at_position(uri, position) {
                if let Some(table) = references.table(uri) {
                    let mut seen: Vec<&str> = Vec::new();
                    for variable in table.scope_variables(scope) {
                        if variable.name.starts_with(reference.name.as_str())
                            && !seen.contains(&variable.name.as_str())
                        {
                            seen.push(&variable.name);
                            let mut item =
                                CompletionItem::new(variable.name.clone(), CompletionKind::Variable);
                            item.detail = variable.type_string.clone().filter(|t| !t.is_empty());
                            item.sort_priority = 10;
                            items.push(item);
                        }
                    }
                }
            }
        }
        Some(reference) => {
            // Name position: prefix search on the written form
            let written = reference
                .alt_name
                .as_deref()
                .unwrap_or_else(|| not_fqn(&reference.name));
            for handle in symbols.match_prefix(written, |s| {
                matches!(
                    s.kind,
                    SymbolKind::Class
                        | SymbolKind::Interface
                        | SymbolKind::Trait
                        | SymbolKind::Function
                        | SymbolKind::Constant
                        | SymbolKind::Namespace
                )
            }) {
                if let Some(symbol) = symbols.symbol(&handle) {
                    items.push(CompletionItem::from_symbol(symbol));
                }
            }
        }
        None => {
            // No reference here: offer the enclosing scope's variables
            if let (Some(scope), Some(table)) = (
                references.scope_at_position(uri, position),
                references.table(uri),
            ) {
                let mut seen: Vec<&str> = Vec::new();
                for variable in table.scope_variables(scope) {
                    if !seen.contains(&variable.name.as_str()) {
                        seen.push(&variable.name);
                        items.push(CompletionItem::new(
                            variable.name.clone(),
                            CompletionKind::Variable,
                        ));
                    }
                }
            }
        }
    }

    items.sort_by(|a, b| a.sort_priority.cmp(&b.sort_priority).then(a.label.cmp(&b.label)));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::{Workspace, WorkspaceSettings};

    fn workspace_with(text: &str) -> Workspace {
        let mut ws = Workspace::new(WorkspaceSettings::default());
        ws.open_document("file:///t.php", 1, text.to_string());
        ws
    }

    #[test]
    fn test_member_completion_inherits() {
        let text = "<?php class A { public function inherited() {} } class B extends A { public function own() {} } (new B)->own();";
        let ws = workspace_with(text);
        // position of `own` after ->
        let at = Position::new(0, text.find("->own").unwrap() as u32 + 2);
        let items = completions(ws.symbols(), ws.references(), "file:///t.php", at);
        let labels: Vec<_> = items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"own"));
    }

    #[test]
    fn test_member_completion_lists_inherited_on_empty_prefix() {
        let text = "<?php class A { public function inherited() {} } class B extends A {} $b = new B(); $b->inherited();";
        let ws = workspace_with(text);
        let at = Position::new(0, text.rfind("inherited").unwrap() as u32 + 1);
        let items = completions(ws.symbols(), ws.references(), "file:///t.php", at);
        assert!(items.iter().any(|i| i.label == "inherited"));
    }

    #[test]
    fn test_variable_completion_from_scope() {
        let text = "<?php function f($param) { $value = 1; $v; }";
        let ws = workspace_with(text);
        let at = Position::new(0, text.find("$v;").unwrap() as u32 + 1);
        let items = completions(ws.symbols(), ws.references(), "file:///t.php", at);
        let labels: Vec<_> = items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"$value"));
        assert!(!labels.contains(&"$param"), "prefix $v filters");
    }

    #[test]
    fn test_name_completion_prefix_search() {
        let text = "<?php class Mapper {} class Mapping {} new Map();";
        let ws = workspace_with(text);
        let at = Position::new(0, text.find("Map()").unwrap() as u32 + 1);
        let items = completions(ws.symbols(), ws.references(), "file:///t.php", at);
        let labels: Vec<_> = items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"Mapper"));
        assert!(labels.contains(&"Mapping"));
    }

    #[test]
    fn test_method_completion_detail_is_signature() {
        let text = "<?php class F { public function m(int $a, $b = 1): void {} } (new F)->m();";
        let ws = workspace_with(text);
        let at = Position::new(0, text.rfind("m()").unwrap() as u32);
        let items = completions(ws.symbols(), ws.references(), "file:///t.php", at);
        let m = items.iter().find(|i| i.label == "m").expect("method item");
        assert_eq!(m.detail.as_deref(), Some("(int $a, $b = 1): void"));
    }
}
