//! Reference model: name occurrences bound to resolved FQNs, organized in a
//! tree of lexical scopes.
//!
//! The root scope spans the whole file; function, method, closure, and
//! namespace bodies push nested scopes. Scope children are an ordered mix of
//! sub-scopes and references.

use serde::{Deserialize, Serialize};

use crate::core::{Location, Position, Span};

/// Kind of a reference occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Class,
    Interface,
    Trait,
    Constant,
    Property,
    Method,
    Function,
    Parameter,
    Variable,
    Namespace,
    ClassConstant,
    Constructor,
}

/// A textual occurrence bound to a resolved name and an inferred type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// FQN where applicable, local name otherwise
    pub name: String,
    pub location: Location,
    /// For member references: the type string of the accessed scope.
    /// For other kinds: the enclosing declaration FQN when useful.
    pub scope: Option<String>,
    pub type_string: Option<String>,
    /// Written form when it differs from the resolved name
    /// (`self`/`parent`/`static`, or an unqualified function/constant whose
    /// runtime lookup may fall back to the global binding)
    pub alt_name: Option<String>,
}

impl Reference {
    pub fn new(kind: ReferenceKind, name: impl Into<String>, location: Location) -> Self {
        Self {
            kind,
            name: name.into(),
            location,
            scope: None,
            type_string: None,
            alt_name: None,
        }
    }
}

/// Identifier of a scope node inside one reference table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Ordered scope content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScopeChild {
    Scope(ScopeId),
    Reference(Reference),
}

/// A lexical region bounding variable lifetimes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeNode {
    pub location: Location,
    pub children: Vec<ScopeChild>,
}

/// Per-document reference table rooted at the file scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTable {
    uri: String,
    scopes: Vec<ScopeNode>,
}

impl ReferenceTable {
    pub fn new(uri: impl Into<String>, file_span: Span) -> Self {
        let uri = uri.into();
        let root = ScopeNode {
            location: Location::new(uri.clone(), file_span),
            children: Vec::new(),
        };
        Self {
            uri,
            scopes: vec![root],
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &ScopeNode {
        &self.scopes[id.index()]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Open a nested scope under `parent`
    pub fn push_scope(&mut self, parent: ScopeId, location: Location) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(ScopeNode {
            location,
            children: Vec::new(),
        });
        self.scopes[parent.index()].children.push(ScopeChild::Scope(id));
        id
    }

    /// Append a reference to a scope
    pub fn add_reference(&mut self, scope: ScopeId, reference: Reference) {
        self.scopes[scope.index()]
            .children
            .push(ScopeChild::Reference(reference));
    }

    /// All references in document order
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        ReferenceIter {
            table: self,
            stack: vec![(self.root(), 0)],
        }
    }

    /// The innermost reference whose location encloses `position`
    pub fn reference_at_position(&self, position: Position) -> Option<&Reference> {
        let mut best: Option<&Reference> = None;
        for reference in self.references() {
            if reference.location.range.contains(position) {
                let better = match best {
                    None => true,
                    Some(current) => current.location.range.encloses(reference.location.range),
                };
                if better {
                    best = Some(reference);
                }
            }
        }
        best
    }

    /// The innermost scope enclosing `position`
    pub fn scope_at_position(&self, position: Position) -> ScopeId {
        let mut current = self.root();
        'descend: loop {
            for child in &self.scopes[current.index()].children {
                if let ScopeChild::Scope(id) = child {
                    if self.scopes[id.index()].location.range.contains(position) {
                        current = *id;
                        continue 'descend;
                    }
                }
            }
            return current;
        }
    }

    /// Variable and parameter references visible in a scope (direct children)
    pub fn scope_variables(&self, scope: ScopeId) -> impl Iterator<Item = &Reference> {
        self.scopes[scope.index()]
            .children
            .iter()
            .filter_map(|child| match child {
                ScopeChild::Reference(reference)
                    if matches!(
                        reference.kind,
                        ReferenceKind::Variable | ReferenceKind::Parameter
                    ) =>
                {
                    Some(reference)
                }
                _ => None,
            })
    }
}

struct ReferenceIter<'a> {
    table: &'a ReferenceTable,
    stack: Vec<(ScopeId, usize)>,
}

impl<'a> Iterator for ReferenceIter<'a> {
    type Item = &'a Reference;

    fn next(&mut self) -> Option<&'a Reference> {
        loop {
            let (scope, index) = self.stack.last_mut()?;
            let node = self.table.scope(*scope);
            let Some(child) = node.children.get(*index) else {
                self.stack.pop();
                continue;
            };
            *index += 1;
            match child {
                ScopeChild::Scope(id) => self.stack.push((*id, 0)),
                ScopeChild::Reference(reference) => return Some(reference),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Location {
        Location::new(
            "file:///t.php",
            Span::from_coords(start_line, start_col, end_line, end_col),
        )
    }

    fn sample_table() -> ReferenceTable {
        let mut table = ReferenceTable::new("file:///t.php", Span::from_coords(0, 0, 10, 0));
        let root = table.root();
        table.add_reference(
            root,
            Reference::new(ReferenceKind::Class, "A\\B", loc(0, 6, 0, 9)),
        );
        let inner = table.push_scope(root, loc(1, 0, 5, 0));
        table.add_reference(
            inner,
            Reference::new(ReferenceKind::Variable, "$x", loc(2, 4, 2, 6)),
        );
        table
    }

    #[test]
    fn test_reference_at_position() {
        let table = sample_table();
        let found = table.reference_at_position(Position::new(0, 7)).unwrap();
        assert_eq!(found.name, "A\\B");
        assert!(table.reference_at_position(Position::new(9, 0)).is_none());
    }

    #[test]
    fn test_scope_at_position() {
        let table = sample_table();
        assert_eq!(table.scope_at_position(Position::new(2, 4)).0, 1);
        assert_eq!(table.scope_at_position(Position::new(8, 0)).0, 0);
    }

    #[test]
    fn test_references_in_document_order() {
        let table = sample_table();
        let names: Vec<_> = table.references().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A\\B", "$x"]);
    }

    #[test]
    fn test_scope_variables() {
        let table = sample_table();
        let inner = ScopeId(1);
        let vars: Vec<_> = table.scope_variables(inner).map(|r| r.name.as_str()).collect();
        assert_eq!(vars, vec!["$x"]);
    }
}
