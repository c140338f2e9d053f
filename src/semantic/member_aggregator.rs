//! Type aggregator: observable members of a class-like symbol.
//!
//! Linearization is depth-first over `associated` entries in declaration
//! order, with precedence own > traits > base > interfaces and
//! case-insensitive cycle detection.

use rustc_hash::FxHashSet;

use super::symbol::{Symbol, SymbolKind};
use super::symbol_store::{SymbolHandle, SymbolStore};

/// How inherited members merge with own declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Own declared members only
    None,
    /// Own plus inherited; nearest declaration wins on name collision
    Override,
    /// Like Override, but an overridden member survives when the override
    /// carries no doc-comment and the base does
    Documented,
    /// Every accessible declaration, de-duplicated by
    /// (kind, name, declaring scope)
    All,
}

/// Read-only member-merging view over the symbol store
pub struct MemberAggregator<'s> {
    store: &'s SymbolStore,
}

impl<'s> MemberAggregator<'s> {
    pub fn new(store: &'s SymbolStore) -> Self {
        Self { store }
    }

    /// Members of `class_fqn` under the given merge strategy, in
    /// linearization order.
    pub fn members(&self, class_fqn: &str, strategy: MergeStrategy) -> Vec<SymbolHandle> {
        let mut visited = FxHashSet::default();
        let mut out: Vec<SymbolHandle> = Vec::new();
        self.collect(class_fqn, strategy, &mut visited, &mut out);
        out
    }

    fn collect(
        &self,
        class_fqn: &str,
        strategy: MergeStrategy,
        visited: &mut FxHashSet<String>,
        out: &mut Vec<SymbolHandle>,
    ) {
        if !visited.insert(class_fqn.to_ascii_lowercase()) {
            return;
        }
        let Some(class) = self
            .store
            .find(class_fqn, |s| s.kind.is_class_like())
            .into_iter()
            .next()
        else {
            return;
        };
        let Some(class_symbol) = self.store.symbol(&class) else {
            return;
        };
        let table = match self.store.table(&class.uri) {
            Some(table) => table,
            None => return,
        };

        // Own members first
        for child in &class_symbol.children {
            let Some(symbol) = table.get(*child) else {
                continue;
            };
            if !is_member(symbol) {
                continue;
            }
            let handle = SymbolHandle {
                uri: class.uri.clone(),
                id: *child,
            };
            self.push_member(symbol, handle, strategy, out);
        }

        if strategy == MergeStrategy::None {
            return;
        }

        // Then traits, then the base class, then interfaces
        let associated = class_symbol.associated.clone();
        for related in associated
            .iter()
            .filter(|r| r.kind == SymbolKind::Trait)
            .chain(associated.iter().filter(|r| r.kind == SymbolKind::Class))
            .chain(associated.iter().filter(|r| r.kind == SymbolKind::Interface))
        {
            self.collect(&related.name, strategy, visited, out);
        }
    }

    fn push_member(
        &self,
        symbol: &Symbol,
        handle: SymbolHandle,
        strategy: MergeStrategy,
        out: &mut Vec<SymbolHandle>,
    ) {
        match strategy {
            MergeStrategy::None | MergeStrategy::Override | MergeStrategy::Documented => {
                if let Some(existing) = out.iter().position(|h| {
                    self.store
                        .symbol(h)
                        .is_some_and(|s| same_member(s, symbol))
                }) {
                    // The nearer declaration is already present. Under
                    // Documented, keep the farther one too when it documents
                    // an undocumented override.
                    if strategy == MergeStrategy::Documented {
                        let winner_has_doc = out
                            .get(existing)
                            .and_then(|h| self.store.symbol(h))
                            .is_some_and(|s| s.doc.is_some());
                        if !winner_has_doc && symbol.doc.is_some() {
                            out.push(handle);
                        }
                    }
                    return;
                }
                out.push(handle);
            }
            MergeStrategy::All => {
                let duplicate = out.iter().any(|h| {
                    self.store.symbol(h).is_some_and(|s| {
                        s.kind == symbol.kind && s.name == symbol.name && s.scope == symbol.scope
                    })
                });
                if !duplicate {
                    out.push(handle);
                }
            }
        }
    }

    /// First member satisfying a predicate, in linearization order.
    pub fn first_member(
        &self,
        class_fqn: &str,
        mut predicate: impl FnMut(&Symbol) -> bool,
    ) -> Option<SymbolHandle> {
        self.members(class_fqn, MergeStrategy::Override)
            .into_iter()
            .find(|handle| self.store.symbol(handle).is_some_and(&mut predicate))
    }

    /// Whether `base_fqn` appears in the base-class chain of `class_fqn`
    pub fn is_base_class(&self, class_fqn: &str, base_fqn: &str) -> bool {
        let mut visited = FxHashSet::default();
        let mut current = class_fqn.to_string();
        loop {
            if !visited.insert(current.to_ascii_lowercase()) {
                return false;
            }
            let Some(symbol) = self
                .store
                .find(&current, |s| s.kind.is_class_like())
                .into_iter()
                .next()
                .and_then(|handle| self.store.symbol(&handle).cloned())
            else {
                return false;
            };
            let Some(base) = symbol
                .associated
                .iter()
                .find(|r| r.kind == SymbolKind::Class)
            else {
                return false;
            };
            if base.name.eq_ignore_ascii_case(base_fqn) {
                return true;
            }
            current = base.name.clone();
        }
    }

    /// Whether `target_fqn` appears anywhere in the associated graph of
    /// `class_fqn` (bases, interfaces, traits, transitively)
    pub fn is_associated(&self, class_fqn: &str, target_fqn: &str) -> bool {
        let mut visited = FxHashSet::default();
        let mut stack = vec![class_fqn.to_string()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.to_ascii_lowercase()) {
                continue;
            }
            if current.eq_ignore_ascii_case(target_fqn) && !current.eq_ignore_ascii_case(class_fqn)
            {
                return true;
            }
            let Some(symbol) = self
                .store
                .find(&current, |s| s.kind.is_class_like())
                .into_iter()
                .next()
                .and_then(|handle| self.store.symbol(&handle).cloned())
            else {
                continue;
            };
            for related in &symbol.associated {
                stack.push(related.name.clone());
            }
        }
        false
    }
}

/// Children that count as observable members
fn is_member(symbol: &Symbol) -> bool {
    matches!(
        symbol.kind,
        SymbolKind::Method | SymbolKind::Property | SymbolKind::ClassConstant
    )
}

/// Collision key for Override/Documented shadowing
fn same_member(a: &Symbol, b: &Symbol) -> bool {
    if a.kind != b.kind {
        return false;
    }
    match a.kind {
        SymbolKind::Method => a.name.eq_ignore_ascii_case(&b.name),
        _ => a.name == b.name,
    }
}
