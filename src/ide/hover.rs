//! Hover contents for the reference under the cursor.

use crate::core::{Position, Span};
use crate::semantic::{
    MergeStrategy, ReferenceStore, Symbol, SymbolHandle, SymbolKind, SymbolStore,
};

/// Hover result: rendered contents plus the range they apply to.
#[derive(Debug, Clone, PartialEq)]
pub struct Hover {
    pub contents: String,
    pub range: Span,
}

/// Hover for the reference enclosing `position`.
pub fn hover(
    symbols: &SymbolStore,
    references: &ReferenceStore,
    uri: &str,
    position: Position,
) -> Option<Hover> {
    let reference = references.reference_at_position(uri, position)?;
    let handles = symbols.find_symbols_by_reference(reference, MergeStrategy::Documented);
    let handle = handles.first()?;
    let symbol = symbols.symbol(handle)?;
    let mut contents = render_declaration(symbols, handle, symbol);

    // Inherit the description from the nearest documented declaration
    let description = handles
        .iter()
        .filter_map(|h| symbols.symbol(h))
        .find_map(|s| s.doc.as_ref().map(|d| d.description.clone()));
    if let Some(description) = description {
        contents.push_str("\n\n");
        contents.push_str(&description);
    }

    Some(Hover {
        contents,
        range: reference.location.range,
    })
}

fn render_declaration(symbols: &SymbolStore, handle: &SymbolHandle, symbol: &Symbol) -> String {
    let signature = symbols
        .table(&handle.uri)
        .map(|table| table.signature_string(handle.id))
        .unwrap_or_default();
    match symbol.kind {
        SymbolKind::Class => format!("class {}", symbol.name),
        SymbolKind::Interface => format!("interface {}", symbol.name),
        SymbolKind::Trait => format!("trait {}", symbol.name),
        SymbolKind::Namespace => format!("namespace {}", symbol.name),
        SymbolKind::Function => format!("function {}{}", symbol.name, signature),
        SymbolKind::Method | SymbolKind::Constructor => {
            let scope = symbol.scope.as_deref().unwrap_or("");
            format!("function {}::{}{}", scope, symbol.name, signature)
        }
        SymbolKind::Property => {
            let scope = symbol.scope.as_deref().unwrap_or("");
            let type_string = symbol.type_string.as_deref().unwrap_or("mixed");
            format!("{} {}::{}", type_string, scope, symbol.name)
        }
        SymbolKind::ClassConstant => {
            let scope = symbol.scope.as_deref().unwrap_or("");
            format!("const {}::{}", scope, symbol.name)
        }
        SymbolKind::Constant => match &symbol.value {
            Some(value) => format!("const {} = {}", symbol.name, value),
            None => format!("const {}", symbol.name),
        },
        SymbolKind::Variable | SymbolKind::Parameter | SymbolKind::GlobalVariable => {
            let type_string = symbol.type_string.as_deref().unwrap_or("mixed");
            format!("{} {}", type_string, symbol.name)
        }
        SymbolKind::File => symbol.name.clone(),
    }
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
    fn test_hover_method_signature_and_doc() {
        let text = "<?php class F { /** Does things. */ public function m(int $a): bool {} } (new F)->m();";
        let ws = workspace_with(text);
        let at = Position::new(0, text.rfind("m()").unwrap() as u32);
        let hover = hover(ws.symbols(), ws.references(), "file:///t.php", at).expect("hover");
        assert!(hover.contents.contains("function F::m(int $a): bool"));
        assert!(hover.contents.contains("Does things."));
    }

    #[test]
    fn test_hover_inherits_doc_from_base() {
        let text = "<?php class A { /** Base doc. */ public function m() {} } class B extends A { public function m() {} } (new B)->m();";
        let ws = workspace_with(text);
        let at = Position::new(0, text.rfind("m()").unwrap() as u32);
        let hover = hover(ws.symbols(), ws.references(), "file:///t.php", at).expect("hover");
        assert!(hover.contents.contains("B::m"), "nearest declaration first");
        assert!(hover.contents.contains("Base doc."), "doc inherited");
    }

    #[test]
    fn test_hover_class() {
        let text = "<?php namespace N; class Conn {} new Conn();";
        let ws = workspace_with(text);
        let at = Position::new(0, text.rfind("Conn()").unwrap() as u32 + 1);
        let hover = hover(ws.symbols(), ws.references(), "file:///t.php", at).expect("hover");
        assert!(hover.contents.contains("class N\\Conn"));
    }

    #[test]
    fn test_hover_none_outside_references() {
        let ws = workspace_with("<?php $x = 1;");
        assert!(hover(ws.symbols(), ws.references(), "file:///t.php", Position::new(5, 0)).is_none());
    }
}
