//! Find-references.

use crate::core::{Location, Position};
use crate::semantic::{
    MemberAggregator, Reference, ReferenceKind, ReferenceStore, SymbolStore, type_string,
};

/// Every location in the workspace referring to the entity under the cursor.
///
/// Unresolved references still participate: matching is by resolved name
/// (case-folded per kind), with member references additionally requiring the
/// scope types to be related.
pub fn find_references(
    symbols: &SymbolStore,
    references: &ReferenceStore,
    uri: &str,
    position: Position,
) -> Vec<Location> {
    let Some(origin) = references.reference_at_position(uri, position) else {
        return Vec::new();
    };
    let origin = origin.clone();
    let aggregator = MemberAggregator::new(symbols);

    references
        .references_everywhere(|candidate| matches(&origin, candidate, &aggregator))
        .into_iter()
        .map(|(_, reference)| reference.location.clone())
        .collect()
}

fn matches(origin: &Reference, candidate: &Reference, aggregator: &MemberAggregator) -> bool {
    if !kinds_compatible(origin.kind, candidate.kind) {
        return false;
    }
    match origin.kind {
        ReferenceKind::Method => {
            candidate.name.eq_ignore_ascii_case(&origin.name)
                && scopes_related(origin, candidate, aggregator)
        }
        ReferenceKind::Property | ReferenceKind::ClassConstant => {
            candidate.name == origin.name && scopes_related(origin, candidate, aggregator)
        }
        ReferenceKind::Variable | ReferenceKind::Parameter => candidate.name == origin.name,
        ReferenceKind::Constant => candidate.name == origin.name,
        _ => candidate.name.eq_ignore_ascii_case(&origin.name),
    }
}

/// `new C()` sites and `C` type references refer to the same class
fn kinds_compatible(a: ReferenceKind, b: ReferenceKind) -> bool {
    let class_like = |k| {
        matches!(
            k,
            ReferenceKind::Class
                | ReferenceKind::Interface
                | ReferenceKind::Trait
                | ReferenceKind::Constructor
        )
    };
    let variable_like = |k| matches!(k, ReferenceKind::Variable | ReferenceKind::Parameter);
    a == b || (class_like(a) && class_like(b)) || (variable_like(a) && variable_like(b))
}

fn scopes_related(origin: &Reference, candidate: &Reference, aggregator: &MemberAggregator) -> bool {
    let origin_classes = origin
        .scope
        .as_deref()
        .map(type_string::atomic_class_array)
        .unwrap_or_default();
    let candidate_classes = candidate
        .scope
        .as_deref()
        .map(type_string::atomic_class_array)
        .unwrap_or_default();
    if origin_classes.is_empty() || candidate_classes.is_empty() {
        return true;
    }
    origin_classes.iter().any(|a| {
        candidate_classes.iter().any(|b| {
            a.eq_ignore_ascii_case(b)
                || aggregator.is_associated(a, b)
                || aggregator.is_associated(b, a)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::{Workspace, WorkspaceSettings};

    #[test]
    fn test_class_references_include_new_and_type() {
        let mut ws = Workspace::new(WorkspaceSettings::default());
        ws.open_document("file:///a.php", 1, "<?php class Conn {}".into());
        ws.open_document(
            "file:///b.php",
            1,
            "<?php function f(Conn $c) { $x = new Conn(); }".into(),
        );
        let at = Position::new(0, 13); // inside `Conn` declaration name
        let locations = find_references(ws.symbols(), ws.references(), "file:///a.php", at);
        // declaration, parameter type, constructor site
        assert_eq!(locations.len(), 3);
        assert!(locations.iter().any(|l| l.uri == "file:///b.php"));
    }

    #[test]
    fn test_method_references_respect_scope() {
        let mut ws = Workspace::new(WorkspaceSettings::default());
        let text = "<?php class A { public function go() {} } class Unrelated { public function go() {} } (new A)->go();";
        ws.open_document("file:///t.php", 1, text.into());
        let at = Position::new(0, text.rfind("go()").unwrap() as u32);
        let locations = find_references(ws.symbols(), ws.references(), "file:///t.php", at);
        // A::go declaration and the call; Unrelated::go excluded
        assert_eq!(locations.len(), 2);
    }

    #[test]
    fn test_variable_references_by_name() {
        let mut ws = Workspace::new(WorkspaceSettings::default());
        let text = "<?php $x = 1; $y = $x + $x;";
        ws.open_document("file:///t.php", 1, text.into());
        let at = Position::new(0, 7);
        let locations = find_references(ws.symbols(), ws.references(), "file:///t.php", at);
        assert_eq!(locations.len(), 3);
    }
}
