//! Symbol model: the shape of a symbol record and its per-file tree.
//!
//! A [`SymbolTable`] owns one arena of symbols rooted at a kind=File symbol
//! spanning the document. Tables are created per parse, replace any prior
//! table for the same URI, and are removed on close.

use serde::{Deserialize, Serialize};

use crate::core::Location;

/// Unique identifier for a symbol in its table's arena.
/// Uses u32 for compact storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a declarative entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
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
    File,
    GlobalVariable,
}

impl SymbolKind {
    /// Kinds whose `name` field is a fully qualified name
    pub fn is_namespaced(self) -> bool {
        matches!(
            self,
            SymbolKind::Class
                | SymbolKind::Interface
                | SymbolKind::Trait
                | SymbolKind::Constant
                | SymbolKind::Function
                | SymbolKind::Namespace
        )
    }

    pub fn is_class_like(self) -> bool {
        matches!(
            self,
            SymbolKind::Class | SymbolKind::Interface | SymbolKind::Trait
        )
    }

    /// Case-insensitive name keying (classes, interfaces, traits, methods,
    /// functions); constants and variables are case-sensitive
    pub fn is_case_insensitive(self) -> bool {
        matches!(
            self,
            SymbolKind::Class
                | SymbolKind::Interface
                | SymbolKind::Trait
                | SymbolKind::Method
                | SymbolKind::Function
                | SymbolKind::Constructor
                | SymbolKind::Namespace
        )
    }
}

/// Modifier bitset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Modifiers(u32);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const PUBLIC: Modifiers = Modifiers(1);
    pub const PROTECTED: Modifiers = Modifiers(1 << 1);
    pub const PRIVATE: Modifiers = Modifiers(1 << 2);
    pub const FINAL: Modifiers = Modifiers(1 << 3);
    pub const ABSTRACT: Modifiers = Modifiers(1 << 4);
    pub const STATIC: Modifiers = Modifiers(1 << 5);
    pub const READONLY: Modifiers = Modifiers(1 << 6);
    pub const WRITEONLY: Modifiers = Modifiers(1 << 7);
    pub const MAGIC: Modifiers = Modifiers(1 << 8);
    pub const ANONYMOUS: Modifiers = Modifiers(1 << 9);
    pub const REFERENCE: Modifiers = Modifiers(1 << 10);
    pub const VARIADIC: Modifiers = Modifiers(1 << 11);
    pub const USE: Modifiers = Modifiers(1 << 12);

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Modifiers) {
        self.0 |= other.0;
    }

    pub fn with(mut self, other: Modifiers) -> Modifiers {
        self.insert(other);
        self
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether any of Public/Protected/Private is present
    pub fn has_visibility(self) -> bool {
        self.contains(Modifiers::PUBLIC)
            || self.contains(Modifiers::PROTECTED)
            || self.contains(Modifiers::PRIVATE)
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;
    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

/// A related symbol: base class, implemented interface, used trait, or the
/// target of a `use` alias. Carries only the target kind and FQN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Related {
    pub kind: SymbolKind,
    pub name: String,
}

impl Related {
    pub fn new(kind: SymbolKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Documentation attached to a symbol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocInfo {
    pub description: String,
    /// Documented type (`@var`, `@return`, `@param`), already resolved
    pub type_string: Option<String>,
}

/// A compile-time declarative entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// FQN for namespaced kinds, local identifier otherwise
    pub name: String,
    /// Enclosing class or namespace FQN
    pub scope: Option<String>,
    pub modifiers: Modifiers,
    pub type_string: Option<String>,
    /// Literal text for constants and defaults
    pub value: Option<String>,
    pub doc: Option<DocInfo>,
    pub location: Option<Location>,
    /// Bases, implements, used traits, or the `use` alias target
    pub associated: Vec<Related>,
    /// Direct children, in declaration order
    pub children: Vec<SymbolId>,
}

impl Symbol {
    pub fn new(kind: SymbolKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            scope: None,
            modifiers: Modifiers::NONE,
            type_string: None,
            value: None,
            doc: None,
            location: None,
            associated: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Substring after the last namespace separator
pub fn not_fqn(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}

/// Substring before the last namespace separator (empty if none)
pub fn namespace_of(name: &str) -> &str {
    match name.rfind('\\') {
        Some(at) => &name[..at],
        None => "",
    }
}

/// Per-file symbol table: arena rooted at a kind=File symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    uri: String,
    arena: Vec<Symbol>,
    /// Pre-order sequence of declarative symbols, used by the reference
    /// reader to walk in lockstep
    declarations: Vec<SymbolId>,
}

impl SymbolTable {
    /// Create a table containing only the File root
    pub fn new(uri: impl Into<String>, root: Symbol) -> Self {
        Self {
            uri: uri.into(),
            arena: vec![root],
            declarations: Vec::new(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn root(&self) -> SymbolId {
        SymbolId(0)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.arena[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.arena[id.index()]
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.arena.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Add a symbol to the arena without linking it to a parent
    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId::new(self.arena.len());
        self.arena.push(symbol);
        id
    }

    /// Add a symbol as the last child of `parent`
    pub fn add_child(&mut self, parent: SymbolId, symbol: Symbol) -> SymbolId {
        let id = self.alloc(symbol);
        self.arena[parent.index()].children.push(id);
        id
    }

    /// Record a declarative symbol in emission order
    pub fn push_declaration(&mut self, id: SymbolId) {
        self.declarations.push(id);
    }

    pub fn declarations(&self) -> &[SymbolId] {
        &self.declarations
    }

    /// Direct children of `parent` matching a predicate
    pub fn filter_children<'a>(
        &'a self,
        parent: SymbolId,
        mut predicate: impl FnMut(&Symbol) -> bool + 'a,
    ) -> impl Iterator<Item = SymbolId> + 'a {
        self.symbol(parent)
            .children
            .iter()
            .copied()
            .filter(move |id| predicate(self.symbol(*id)))
    }

    /// First direct child of `parent` matching a predicate
    pub fn find_child(
        &self,
        parent: SymbolId,
        mut predicate: impl FnMut(&Symbol) -> bool,
    ) -> Option<SymbolId> {
        self.symbol(parent)
            .children
            .iter()
            .copied()
            .find(|id| predicate(self.symbol(*id)))
    }

    /// Stamp a scope name onto a set of children
    pub fn set_scope(&mut self, children: &[SymbolId], scope: &str) {
        for id in children {
            self.arena[id.index()].scope = Some(scope.to_string());
        }
    }

    /// Pre-order traversal from the root
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            table: self,
            stack: vec![self.root()],
        }
    }

    /// Innermost symbol whose location encloses `position`
    pub fn symbol_at_position(&self, position: crate::core::Position) -> Option<SymbolId> {
        let mut best: Option<SymbolId> = None;
        for id in self.preorder() {
            if let Some(location) = &self.symbol(id).location {
                if location.range.contains(position) {
                    best = Some(id);
                }
            }
        }
        best
    }

    /// Render a function-like symbol as `(t1 $p1, t2 $p2 = default): ret`
    pub fn signature_string(&self, id: SymbolId) -> String {
        let symbol = self.symbol(id);
        let mut out = String::from("(");
        let mut first = true;
        for child in &symbol.children {
            let param = self.symbol(*child);
            if param.kind != SymbolKind::Parameter {
                continue;
            }
            if !first {
                out.push_str(", ");
            }
            first = false;
            if let Some(type_string) = &param.type_string {
                if !type_string.is_empty() {
                    out.push_str(type_string);
                    out.push(' ');
                }
            }
            if param.modifiers.contains(Modifiers::REFERENCE) {
                out.push('&');
            }
            if param.modifiers.contains(Modifiers::VARIADIC) {
                out.push_str("...");
            }
            out.push_str(&param.name);
            if let Some(value) = &param.value {
                out.push_str(" = ");
                out.push_str(value);
            }
        }
        out.push(')');
        if let Some(return_type) = &symbol.type_string {
            if !return_type.is_empty() {
                out.push_str(": ");
                out.push_str(return_type);
            }
        }
        out
    }
}

/// Explicit-state pre-order iterator over a table
pub struct Preorder<'a> {
    table: &'a SymbolTable,
    stack: Vec<SymbolId>,
}

impl Iterator for Preorder<'_> {
    type Item = SymbolId;

    fn next(&mut self) -> Option<SymbolId> {
        let id = self.stack.pop()?;
        let symbol = self.table.symbol(id);
        for child in symbol.children.iter().rev() {
            self.stack.push(*child);
        }
        Some(id)
    }
}
