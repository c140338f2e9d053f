//! Reference reader: second tree-walk emitting the per-document reference
//! table with flow-sensitive variable typing.
//!
//! The reader consumes the parse tree in lockstep with the symbol table
//! built earlier: at every construct the symbol reader emitted a declarative
//! symbol for, the next symbol is popped from the pre-order list and used to
//! reconstitute the name resolver. Any mismatch indicates a torn tree and is
//! fatal for the document.

use indexmap::IndexMap;
use text_size::TextRange;
use tracing::trace;

use crate::core::{IndexError, IndexResult, LineIndex, Location};
use crate::docblock;
use crate::parser::ast::*;

use super::member_aggregator::MergeStrategy;
use super::name_resolver::{ClassContext, ImportRule, NameKind, NameResolver};
use super::reference::{Reference, ReferenceKind, ReferenceTable, ScopeId};
use super::symbol::{Modifiers, Symbol, SymbolId, SymbolKind, SymbolTable};
use super::symbol_reader::is_superglobal;
use super::symbol_store::SymbolStore;
use super::type_string;

/// Stack of function scopes, each a stack of branch sets.
#[derive(Debug, Default)]
struct VariableTable {
    scopes: Vec<VarScope>,
}

#[derive(Debug, Default)]
struct VarScope {
    branches: Vec<IndexMap<String, String>>,
}

impl VarScope {
    fn new() -> Self {
        Self {
            branches: vec![IndexMap::new()],
        }
    }
}

impl VariableTable {
    /// Creates the workspace-level top scope
    fn new() -> Self {
        Self {
            scopes: vec![VarScope::new()],
        }
    }

    /// Open a function scope, preserving the listed names' current types
    fn push_scope(&mut self, carry: &[(String, String)]) {
        let mut scope = VarScope::new();
        for (name, type_string) in carry {
            scope.branches[0].insert(name.clone(), type_string.clone());
        }
        self.scopes.push(scope);
    }

    fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Write into the innermost branch set of the innermost scope
    fn set(&mut self, name: &str, type_string: String) {
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(branch) = scope.branches.last_mut() {
                branch.insert(name.to_string(), type_string);
            }
        }
    }

    /// Search the innermost scope's branch sets inner-to-outer; lookup stops
    /// at the scope boundary
    fn get(&self, name: &str) -> Option<String> {
        let scope = self.scopes.last()?;
        scope
            .branches
            .iter()
            .rev()
            .find_map(|branch| branch.get(name).cloned())
    }

    /// Read a binding from the workspace-level top scope
    fn get_global(&self, name: &str) -> Option<String> {
        let scope = self.scopes.first()?;
        scope
            .branches
            .first()
            .and_then(|branch| branch.get(name).cloned())
    }

    fn set_global(&mut self, name: &str, type_string: String) {
        if let Some(scope) = self.scopes.first_mut() {
            if let Some(branch) = scope.branches.first_mut() {
                branch.insert(name.to_string(), type_string);
            }
        }
    }

    fn push_branch(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.branches.push(IndexMap::new());
        }
    }

    fn pop_branch(&mut self) -> IndexMap<String, String> {
        match self.scopes.last_mut() {
            Some(scope) if scope.branches.len() > 1 => {
                scope.branches.pop().unwrap_or_default()
            }
            _ => IndexMap::new(),
        }
    }

    /// Merge branch bindings by type-union into the enclosing branch set
    fn prune_branches(&mut self, branches: Vec<IndexMap<String, String>>) {
        let mut merged: IndexMap<String, String> = IndexMap::new();
        for branch in branches {
            for (name, type_string) in branch {
                let entry = merged.entry(name).or_default();
                *entry = type_string::merge(entry, &type_string);
            }
        }
        for (name, type_string) in merged {
            let with_existing = match self.get(&name) {
                Some(existing) => type_string::merge(&existing, &type_string),
                None => type_string,
            };
            self.set(&name, with_existing);
        }
    }

    /// Snapshot of every visible binding in the innermost scope
    fn bindings(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();
        if let Some(scope) = self.scopes.last() {
            for branch in &scope.branches {
                for (name, type_string) in branch {
                    match out.iter_mut().find(|(n, _)| n == name) {
                        Some((_, existing)) => *existing = type_string.clone(),
                        None => out.push((name.clone(), type_string.clone())),
                    }
                }
            }
        }
        out
    }
}

/// Second visitor: emits a reference for each name-kind occurrence.
pub struct ReferenceReader<'a> {
    uri: &'a str,
    line_index: &'a LineIndex,
    store: &'a SymbolStore,
    symbols: &'a SymbolTable,
    cursor: usize,
    resolver: NameResolver,
    table: ReferenceTable,
    scope: ScopeId,
    variables: VariableTable,
}

impl<'a> ReferenceReader<'a> {
    /// Read a document's references. The symbol table must be the one just
    /// produced for the same tree.
    pub fn read(
        uri: &'a str,
        line_index: &'a LineIndex,
        store: &'a SymbolStore,
        symbols: &'a SymbolTable,
        file: &SourceFile,
    ) -> IndexResult<ReferenceTable> {
        let file_span = line_index.span(file.range);
        let mut variables = VariableTable::new();
        // Seed the top scope from the global-variable view. This runs after
        // the document's own symbol table registered with the store, so a
        // file's own `@global` declarations are visible to its own bodies.
        for handle in store.global_variables() {
            if let Some(symbol) = store.symbol(&handle) {
                if let Some(type_string) = &symbol.type_string {
                    variables.set_global(&symbol.name, type_string.clone());
                }
            }
        }
        let table = ReferenceTable::new(uri, file_span);
        let mut reader = ReferenceReader {
            uri,
            line_index,
            store,
            symbols,
            cursor: 0,
            resolver: NameResolver::new(),
            scope: table.root(),
            table,
            variables,
        };
        // The file body is a scope of its own above the workspace top scope
        reader.variables.push_scope(&[]);
        reader.walk_stmts(file.stmts.as_slice())?;
        trace!("[REF_READER] {} scopes for {}", reader.table.scope_count(), uri);
        Ok(reader.table)
    }

    // ------------------------------------------------------------------
    // Lockstep bookkeeping
    // ------------------------------------------------------------------

    fn pop_declaration(
        &mut self,
        expected: &str,
        accept: impl Fn(&Symbol) -> bool,
    ) -> IndexResult<SymbolId> {
        let id = self
            .symbols
            .declarations()
            .get(self.cursor)
            .copied()
            .ok_or_else(|| IndexError::TornTree {
                uri: self.uri.to_string(),
                expected: expected.to_string(),
                found: "end of symbol sequence".to_string(),
            })?;
        let symbol = self.symbols.symbol(id);
        if !accept(symbol) {
            return Err(IndexError::TornTree {
                uri: self.uri.to_string(),
                expected: expected.to_string(),
                found: format!("{:?} {}", symbol.kind, symbol.name),
            });
        }
        self.cursor += 1;
        Ok(id)
    }

    fn location(&self, range: TextRange) -> Location {
        Location::new(self.uri, self.line_index.span(range))
    }

    fn emit(&mut self, reference: Reference) {
        self.table.add_reference(self.scope, reference);
    }

    /// Run `walk` inside a nested lexical scope
    fn in_scope(
        &mut self,
        range: TextRange,
        walk: impl FnOnce(&mut Self) -> IndexResult<()>,
    ) -> IndexResult<()> {
        let parent = self.scope;
        self.scope = self.table.push_scope(parent, self.location(range));
        let result = walk(self);
        self.scope = parent;
        result
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn walk_stmts(&mut self, stmts: &[Stmt]) -> IndexResult<()> {
        for stmt in stmts {
            self.walk_stmt(stmt)?;
        }
        Ok(())
    }

    fn walk_stmt(&mut self, stmt: &Stmt) -> IndexResult<()> {
        match stmt {
            Stmt::Namespace(ns) => self.walk_namespace(ns),
            Stmt::Use(decl) => self.walk_use(decl),
            Stmt::Class(decl) => self.walk_class(decl),
            Stmt::Interface(decl) => self.walk_interface(decl),
            Stmt::Trait(decl) => self.walk_trait(decl),
            Stmt::Function(decl) => self.walk_function(decl),
            Stmt::Const(decl) => self.walk_const(decl),
            Stmt::Global(decl) => self.walk_global(decl),
            Stmt::StaticVar(decl) => {
                for entry in &decl.entries {
                    let type_string = match &entry.default {
                        Some(expr) => self.infer_expr(expr)?,
                        None => String::new(),
                    };
                    self.bind_variable(&entry.name, type_string);
                }
                Ok(())
            }
            Stmt::Echo(echo) => {
                for expr in &echo.exprs {
                    self.infer_expr(expr)?;
                }
                Ok(())
            }
            Stmt::Expr(expr_stmt) => self.walk_expr_stmt(expr_stmt),
            Stmt::If(if_stmt) => self.walk_if(if_stmt),
            Stmt::While(w) => {
                self.infer_expr(&w.cond)?;
                self.walk_stmt(&w.body)
            }
            Stmt::DoWhile(w) => {
                self.walk_stmt(&w.body)?;
                self.infer_expr(&w.cond)?;
                Ok(())
            }
            Stmt::For(f) => {
                for expr in f.init.iter().chain(&f.cond).chain(&f.step) {
                    self.infer_expr(expr)?;
                }
                self.walk_stmt(&f.body)
            }
            Stmt::Foreach(f) => self.walk_foreach(f),
            Stmt::Switch(s) => self.walk_switch(s),
            Stmt::Try(t) => self.walk_try(t),
            Stmt::Return(r) => {
                if let Some(expr) = &r.expr {
                    self.infer_expr(expr)?;
                }
                Ok(())
            }
            Stmt::Throw(t) => {
                self.infer_expr(&t.expr)?;
                Ok(())
            }
            Stmt::Block(b) => self.walk_stmts(&b.stmts),
            Stmt::Break(_)
            | Stmt::Continue(_)
            | Stmt::InlineHtml(_)
            | Stmt::Nop(_)
            | Stmt::Error(_) => Ok(()),
        }
    }

    fn walk_namespace(&mut self, ns: &NamespaceDecl) -> IndexResult<()> {
        let id = self.pop_declaration("namespace", |s| s.kind == SymbolKind::Namespace)?;
        let name = self.symbols.symbol(id).name.clone();
        self.resolver.set_namespace(name.clone());
        if let Some(decl_name) = &ns.name {
            self.emit(Reference::new(
                ReferenceKind::Namespace,
                name,
                self.location(decl_name.range),
            ));
        }
        if let Some(body) = &ns.body {
            self.in_scope(ns.range, |reader| reader.walk_stmts(body))?;
            self.resolver.set_namespace("");
        }
        Ok(())
    }

    fn walk_use(&mut self, decl: &UseDecl) -> IndexResult<()> {
        for clause in &decl.clauses {
            let id = self.pop_declaration("use clause", |s| {
                s.modifiers.contains(Modifiers::USE)
            })?;
            let symbol = self.symbols.symbol(id);
            let alias = symbol.name.clone();
            let Some(target) = symbol.associated.first().cloned() else {
                continue;
            };
            let (name_kind, ref_kind) = match target.kind {
                SymbolKind::Function => (NameKind::Function, ReferenceKind::Function),
                SymbolKind::Constant => (NameKind::Constant, ReferenceKind::Constant),
                _ => (NameKind::Class, ReferenceKind::Class),
            };
            self.resolver.add_rule(ImportRule {
                kind: name_kind,
                alias,
                fqn: target.name.clone(),
            });
            self.emit(Reference::new(
                ref_kind,
                target.name,
                self.location(clause.target.range),
            ));
        }
        Ok(())
    }

    fn class_context_of(symbol: &Symbol) -> ClassContext {
        ClassContext {
            fqn: symbol.name.clone(),
            base: symbol
                .associated
                .iter()
                .find(|r| r.kind == SymbolKind::Class)
                .map(|r| r.name.clone()),
        }
    }

    fn walk_class(&mut self, decl: &ClassDecl) -> IndexResult<()> {
        let id = self.pop_declaration("class", |s| s.kind == SymbolKind::Class)?;
        let symbol = self.symbols.symbol(id);
        let fqn = symbol.name.clone();
        let context = Self::class_context_of(symbol);
        self.emit(Reference::new(
            ReferenceKind::Class,
            fqn.clone(),
            self.location(decl.name.range),
        ));
        if let Some(extends) = &decl.extends {
            self.emit_name_reference(extends, NameKind::Class, ReferenceKind::Class);
        }
        for implemented in &decl.implements {
            self.emit_name_reference(implemented, NameKind::Class, ReferenceKind::Class);
        }
        self.resolver.push_class(context);
        self.walk_members(&decl.members, &fqn)?;
        self.resolver.pop_class();
        Ok(())
    }

    fn walk_interface(&mut self, decl: &InterfaceDecl) -> IndexResult<()> {
        let id = self.pop_declaration("interface", |s| s.kind == SymbolKind::Interface)?;
        let fqn = self.symbols.symbol(id).name.clone();
        self.emit(Reference::new(
            ReferenceKind::Interface,
            fqn.clone(),
            self.location(decl.name.range),
        ));
        for extended in &decl.extends {
            self.emit_name_reference(extended, NameKind::Class, ReferenceKind::Class);
        }
        self.resolver.push_class(ClassContext {
            fqn: fqn.clone(),
            base: None,
        });
        self.walk_members(&decl.members, &fqn)?;
        self.resolver.pop_class();
        Ok(())
    }

    fn walk_trait(&mut self, decl: &TraitDecl) -> IndexResult<()> {
        let id = self.pop_declaration("trait", |s| s.kind == SymbolKind::Trait)?;
        let fqn = self.symbols.symbol(id).name.clone();
        self.emit(Reference::new(
            ReferenceKind::Trait,
            fqn.clone(),
            self.location(decl.name.range),
        ));
        self.resolver.push_class(ClassContext {
            fqn: fqn.clone(),
            base: None,
        });
        self.walk_members(&decl.members, &fqn)?;
        self.resolver.pop_class();
        Ok(())
    }

    fn walk_members(&mut self, members: &[Member], class_fqn: &str) -> IndexResult<()> {
        for member in members {
            match member {
                Member::Method(method) => self.walk_method(method, class_fqn)?,
                Member::Property(prop) => self.walk_property(prop, class_fqn)?,
                Member::ClassConst(konst) => self.walk_class_const(konst, class_fqn)?,
                Member::UseTrait(use_trait) => {
                    for name in &use_trait.names {
                        self.emit_name_reference(name, NameKind::Class, ReferenceKind::Class);
                    }
                }
                Member::Error(_) => {}
            }
        }
        Ok(())
    }

    fn walk_method(&mut self, decl: &MethodDecl, class_fqn: &str) -> IndexResult<()> {
        let id = self.pop_declaration("method", |s| s.kind == SymbolKind::Method)?;
        let symbol = self.symbols.symbol(id);
        let name = symbol.name.clone();
        let type_string = symbol.type_string.clone();
        let is_static = symbol.modifiers.contains(Modifiers::STATIC);
        self.emit(Reference {
            kind: ReferenceKind::Method,
            name,
            location: self.location(decl.name.range),
            scope: Some(class_fqn.to_string()),
            type_string,
            alt_name: None,
        });
        let carry = if is_static {
            Vec::new()
        } else {
            vec![("$this".to_string(), class_fqn.to_string())]
        };
        self.in_scope(decl.range, |reader| {
            reader.variables.push_scope(&carry);
            let result = (|| {
                reader.walk_param_list(&decl.params)?;
                if let Some(return_type) = &decl.return_type {
                    reader.emit_type_decl_refs(return_type);
                }
                if let Some(body) = &decl.body {
                    reader.walk_stmts(body)?;
                }
                Ok(())
            })();
            reader.variables.pop_scope();
            result
        })
    }

    fn walk_function(&mut self, decl: &FunctionDecl) -> IndexResult<()> {
        let id = self.pop_declaration("function", |s| s.kind == SymbolKind::Function)?;
        let symbol = self.symbols.symbol(id);
        let name = symbol.name.clone();
        let type_string = symbol.type_string.clone();
        self.emit(Reference {
            kind: ReferenceKind::Function,
            name,
            location: self.location(decl.name.range),
            scope: None,
            type_string,
            alt_name: None,
        });
        self.in_scope(decl.range, |reader| {
            reader.variables.push_scope(&[]);
            let result = (|| {
                reader.walk_param_list(&decl.params)?;
                if let Some(return_type) = &decl.return_type {
                    reader.emit_type_decl_refs(return_type);
                }
                reader.walk_stmts(&decl.body)
            })();
            reader.variables.pop_scope();
            result
        })
    }

    fn walk_param_list(&mut self, params: &[Param]) -> IndexResult<()> {
        for param in params {
            let id = self.pop_declaration("parameter", |s| s.kind == SymbolKind::Parameter)?;
            let symbol = self.symbols.symbol(id);
            let type_string = symbol.type_string.clone().unwrap_or_default();
            self.variables.set(&param.name.text, type_string.clone());
            if let Some(type_decl) = &param.type_decl {
                self.emit_type_decl_refs(type_decl);
            }
            self.emit(Reference {
                kind: ReferenceKind::Parameter,
                name: param.name.text.clone(),
                location: self.location(param.name.range),
                scope: None,
                type_string: Some(type_string),
                alt_name: None,
            });
            if let Some(default) = &param.default {
                self.infer_expr(default)?;
            }
        }
        Ok(())
    }

    fn walk_property(&mut self, decl: &PropertyDecl, class_fqn: &str) -> IndexResult<()> {
        if let Some(type_decl) = &decl.type_decl {
            self.emit_type_decl_refs(type_decl);
        }
        for entry in &decl.entries {
            let id = self.pop_declaration("property", |s| s.kind == SymbolKind::Property)?;
            let symbol = self.symbols.symbol(id);
            let name = symbol.name.clone();
            let type_string = symbol.type_string.clone();
            self.emit(Reference {
                kind: ReferenceKind::Property,
                name,
                location: self.location(entry.name.range),
                scope: Some(class_fqn.to_string()),
                type_string,
                alt_name: None,
            });
            if let Some(default) = &entry.default {
                self.infer_expr(default)?;
            }
        }
        Ok(())
    }

    fn walk_class_const(&mut self, decl: &ClassConstDecl, class_fqn: &str) -> IndexResult<()> {
        for entry in &decl.entries {
            let id =
                self.pop_declaration("class constant", |s| s.kind == SymbolKind::ClassConstant)?;
            let name = self.symbols.symbol(id).name.clone();
            self.emit(Reference {
                kind: ReferenceKind::ClassConstant,
                name,
                location: self.location(entry.name.range),
                scope: Some(class_fqn.to_string()),
                type_string: None,
                alt_name: None,
            });
            if let Some(value) = &entry.value {
                self.infer_expr(value)?;
            }
        }
        Ok(())
    }

    fn walk_const(&mut self, decl: &ConstDecl) -> IndexResult<()> {
        for element in &decl.elements {
            let id = self.pop_declaration("constant", |s| s.kind == SymbolKind::Constant)?;
            let name = self.symbols.symbol(id).name.clone();
            self.emit(Reference::new(
                ReferenceKind::Constant,
                name,
                self.location(element.name.range),
            ));
            if let Some(value) = &element.value {
                self.infer_expr(value)?;
            }
        }
        Ok(())
    }

    /// `global $x` binds the local name to the workspace-level top scope
    fn walk_global(&mut self, decl: &GlobalDecl) -> IndexResult<()> {
        for var in &decl.vars {
            let type_string = self.variables.get_global(&var.text).unwrap_or_default();
            self.variables.set(&var.text, type_string.clone());
            self.emit(Reference {
                kind: ReferenceKind::Variable,
                name: var.text.clone(),
                location: self.location(var.range),
                scope: None,
                type_string: Some(type_string),
                alt_name: None,
            });
        }
        Ok(())
    }

    fn walk_if(&mut self, if_stmt: &IfStmt) -> IndexResult<()> {
        self.infer_expr(&if_stmt.cond)?;
        let mut collected = Vec::new();

        self.variables.push_branch();
        self.apply_refinements(&if_stmt.cond);
        self.walk_stmt(&if_stmt.then)?;
        collected.push(self.variables.pop_branch());

        for (cond, body) in &if_stmt.elseifs {
            self.infer_expr(cond)?;
            self.variables.push_branch();
            self.apply_refinements(cond);
            self.walk_stmt(body)?;
            collected.push(self.variables.pop_branch());
        }

        if let Some(else_) = &if_stmt.else_ {
            self.variables.push_branch();
            self.walk_stmt(else_)?;
            collected.push(self.variables.pop_branch());
        }

        self.variables.prune_branches(collected);
        Ok(())
    }

    /// `$x instanceof T` refines `$x` to `T` within the conditional
    fn apply_refinements(&mut self, cond: &Expr) {
        match cond {
            Expr::Instanceof { expr, class, .. } => {
                if let (Expr::Variable(var), ClassRef::Name(name)) = (expr.as_ref(), class) {
                    let resolved = self.resolve_class_name(name);
                    if !resolved.fqn.is_empty() {
                        self.variables.set(&var.text, resolved.fqn);
                    }
                }
            }
            Expr::Binary {
                lhs,
                op: BinaryOp::And,
                rhs,
                ..
            } => {
                self.apply_refinements(lhs);
                self.apply_refinements(rhs);
            }
            Expr::Paren { expr, .. } => self.apply_refinements(expr),
            _ => {}
        }
    }

    fn walk_switch(&mut self, switch: &SwitchStmt) -> IndexResult<()> {
        self.infer_expr(&switch.subject)?;
        let mut collected = Vec::new();
        for case in &switch.cases {
            if let Some(test) = &case.test {
                self.infer_expr(test)?;
            }
            self.variables.push_branch();
            self.walk_stmts(&case.body)?;
            collected.push(self.variables.pop_branch());
        }
        self.variables.prune_branches(collected);
        Ok(())
    }

    fn walk_try(&mut self, try_stmt: &TryStmt) -> IndexResult<()> {
        self.walk_stmts(&try_stmt.body)?;
        for catch in &try_stmt.catches {
            let mut caught = String::new();
            for name in &catch.types {
                let resolved = self.resolve_class_name(name);
                self.emit(Reference {
                    kind: ReferenceKind::Class,
                    name: resolved.fqn.clone(),
                    location: self.location(name.range),
                    scope: None,
                    type_string: None,
                    alt_name: resolved.alt_name,
                });
                caught = type_string::merge(&caught, &resolved.fqn);
            }
            if let Some(var) = &catch.var {
                self.bind_variable(var, caught);
            }
            self.walk_stmts(&catch.body)?;
        }
        if let Some(finally) = &try_stmt.finally {
            self.walk_stmts(finally)?;
        }
        Ok(())
    }

    fn walk_foreach(&mut self, foreach: &ForeachStmt) -> IndexResult<()> {
        let collection = self.infer_expr(&foreach.collection)?;
        if let Some(key) = &foreach.key {
            self.bind_variable(key, "int|string".to_string());
        }
        if let Some(value) = &foreach.value {
            let element = type_string::array_dereference(&collection);
            self.bind_variable(value, element);
        }
        self.walk_stmt(&foreach.body)
    }

    fn walk_expr_stmt(&mut self, stmt: &ExprStmt) -> IndexResult<()> {
        // An `@var` hint immediately preceding an assignment overrides the
        // inferred type for the assigned variable
        let hint = stmt.doc.as_ref().and_then(|doc| {
            let block = docblock::parse(&doc.text);
            block
                .vars
                .first()
                .map(|tag| self.resolver.resolve_type_string(&tag.type_string))
        });
        if let (Some(hint), Expr::Assign { target, value, .. }) = (&hint, &stmt.expr) {
            if let Expr::Variable(var) = target.as_ref() {
                self.infer_expr(value)?;
                self.bind_variable(var, hint.clone());
                return Ok(());
            }
        }
        self.infer_expr(&stmt.expr)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn bind_variable(&mut self, var: &VarName, type_string: String) {
        if var.text != "$this" && !is_superglobal(&var.text) {
            self.variables.set(&var.text, type_string.clone());
        }
        self.emit(Reference {
            kind: ReferenceKind::Variable,
            name: var.text.clone(),
            location: self.location(var.range),
            scope: None,
            type_string: Some(type_string),
            alt_name: None,
        });
    }

    fn resolve_class_name(&self, name: &Name) -> super::name_resolver::ResolvedName {
        self.resolver.resolve(&name.text, NameKind::Class)
    }

    fn emit_name_reference(&mut self, name: &Name, kind: NameKind, ref_kind: ReferenceKind) {
        let resolved = self.resolver.resolve(&name.text, kind);
        self.emit(Reference {
            kind: ref_kind,
            name: resolved.fqn,
            location: self.location(name.range),
            scope: None,
            type_string: None,
            alt_name: resolved.alt_name,
        });
    }

    /// References for the class-like atoms of a written type declaration
    fn emit_type_decl_refs(&mut self, type_decl: &TypeDecl) {
        for name in &type_decl.names {
            if type_string::is_scalar(&name.text) {
                continue;
            }
            self.emit_name_reference(name, NameKind::Class, ReferenceKind::Class);
        }
    }

    /// The type of `$this` / `self` in the current context
    fn current_class_fqn(&self) -> String {
        self.resolver
            .current_class()
            .map(|c| c.fqn.clone())
            .unwrap_or_default()
    }

    /// Replace `self`/`static` atoms with the class a member was found on
    fn resolve_self_static(type_string: &str, class_fqn: &str) -> String {
        if class_fqn.is_empty() {
            return type_string.to_string();
        }
        type_string::name_resolve(type_string, |atom| atom.to_string())
            .split('|')
            .map(|atom| {
                if atom.eq_ignore_ascii_case("self") || atom.eq_ignore_ascii_case("static") {
                    class_fqn.to_string()
                } else {
                    atom.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Member lookup: scope type → merged member type
    fn member_type(&mut self, reference: &Reference) -> String {
        let handles = self
            .store
            .find_symbols_by_reference(reference, MergeStrategy::Override);
        let merged = self.store.merged_type_of(&handles);
        let class_context = reference.scope.as_deref().unwrap_or("");
        let first_class = type_string::atomic_class_array(class_context)
            .into_iter()
            .next()
            .unwrap_or_default();
        Self::resolve_self_static(&merged, &first_class)
    }

    /// Infer an expression's type, emitting references along the way.
    fn infer_expr(&mut self, expr: &Expr) -> IndexResult<String> {
        match expr {
            Expr::Error(_) => Ok(String::new()),
            Expr::Literal(literal) => Ok(match literal.kind {
                LiteralKind::Int => "int".to_string(),
                LiteralKind::Float => "float".to_string(),
                LiteralKind::String => "string".to_string(),
                LiteralKind::Bool => "bool".to_string(),
                LiteralKind::Null => "null".to_string(),
            }),
            Expr::Variable(var) => {
                let type_string = if var.text == "$this" {
                    self.current_class_fqn()
                } else if is_superglobal(&var.text) {
                    "array".to_string()
                } else {
                    self.variables.get(&var.text).unwrap_or_default()
                };
                self.emit(Reference {
                    kind: ReferenceKind::Variable,
                    name: var.text.clone(),
                    location: self.location(var.range),
                    scope: None,
                    type_string: Some(type_string.clone()),
                    alt_name: None,
                });
                Ok(type_string)
            }
            Expr::Name(name) => {
                // Bare name in expression position: constant fetch
                let resolved = self.resolver.resolve(&name.text, NameKind::Constant);
                let reference = Reference {
                    kind: ReferenceKind::Constant,
                    name: resolved.fqn,
                    location: self.location(name.range),
                    scope: None,
                    type_string: None,
                    alt_name: resolved.alt_name,
                };
                let handles = self
                    .store
                    .find_symbols_by_reference(&reference, MergeStrategy::None);
                let type_string = self.store.merged_type_of(&handles);
                self.emit(reference);
                Ok(type_string)
            }
            Expr::Array { entries, .. } => {
                let mut element = String::new();
                for entry in entries {
                    if let Some(key) = &entry.key {
                        self.infer_expr(key)?;
                    }
                    let value = self.infer_expr(&entry.value)?;
                    element = type_string::merge(&element, &value);
                }
                Ok(if element.is_empty() {
                    "array".to_string()
                } else {
                    type_string::array_reference(&element)
                })
            }
            Expr::Call { callee, args, .. } => {
                let return_type = match callee.as_ref() {
                    Expr::Name(name) => {
                        let resolved = self.resolver.resolve(&name.text, NameKind::Function);
                        let reference = Reference {
                            kind: ReferenceKind::Function,
                            name: resolved.fqn,
                            location: self.location(name.range),
                            scope: None,
                            type_string: None,
                            alt_name: resolved.alt_name,
                        };
                        let handles = self
                            .store
                            .find_symbols_by_reference(&reference, MergeStrategy::None);
                        let type_string = self.store.merged_type_of(&handles);
                        self.emit(reference);
                        type_string
                    }
                    other => {
                        self.infer_expr(other)?;
                        String::new()
                    }
                };
                for arg in args {
                    self.infer_expr(&arg.value)?;
                }
                Ok(return_type)
            }
            Expr::New { class, args, .. } => {
                let type_string = match class {
                    NewClass::Name(name) => {
                        let resolved = self.resolve_class_name(name);
                        let fqn = if resolved.fqn.is_empty() {
                            self.current_class_fqn()
                        } else {
                            resolved.fqn.clone()
                        };
                        self.emit(Reference {
                            kind: ReferenceKind::Constructor,
                            name: fqn.clone(),
                            location: self.location(name.range),
                            scope: None,
                            type_string: None,
                            alt_name: resolved.alt_name,
                        });
                        fqn
                    }
                    NewClass::Anonymous(anon) => self.walk_anon_class(anon)?,
                    NewClass::Expr(inner) => {
                        self.infer_expr(inner)?;
                        String::new()
                    }
                };
                for arg in args {
                    self.infer_expr(&arg.value)?;
                }
                Ok(type_string)
            }
            Expr::MethodCall {
                recv, name, args, ..
            } => {
                let recv_type = self.infer_expr(recv)?;
                let member = self.member_reference(
                    name,
                    recv_type,
                    ReferenceKind::Method,
                )?;
                for arg in args {
                    self.infer_expr(&arg.value)?;
                }
                Ok(member)
            }
            Expr::PropFetch { recv, name, .. } => {
                let recv_type = self.infer_expr(recv)?;
                self.member_reference(name, recv_type, ReferenceKind::Property)
            }
            Expr::StaticCall { class, name, args, .. } => {
                let scope_type = self.class_ref_type(class)?;
                let member = self.member_reference(name, scope_type, ReferenceKind::Method)?;
                for arg in args {
                    self.infer_expr(&arg.value)?;
                }
                Ok(member)
            }
            Expr::StaticPropFetch { class, name, .. } => {
                let scope_type = self.class_ref_type(class)?;
                let reference = Reference {
                    kind: ReferenceKind::Property,
                    name: name.text.clone(),
                    location: self.location(name.range),
                    scope: Some(scope_type),
                    type_string: None,
                    alt_name: None,
                };
                let type_string = self.member_type(&reference);
                let mut reference = reference;
                reference.type_string = Some(type_string.clone());
                self.emit(reference);
                Ok(type_string)
            }
            Expr::ClassConstFetch { class, name, .. } => {
                let scope_type = self.class_ref_type(class)?;
                if name.text == "class" {
                    return Ok("string".to_string());
                }
                let reference = Reference {
                    kind: ReferenceKind::ClassConstant,
                    name: name.text.clone(),
                    location: self.location(name.range),
                    scope: Some(scope_type),
                    type_string: None,
                    alt_name: None,
                };
                let type_string = self.member_type(&reference);
                let mut reference = reference;
                reference.type_string = Some(type_string.clone());
                self.emit(reference);
                Ok(type_string)
            }
            Expr::Subscript { base, index, .. } => {
                let base_type = self.infer_expr(base)?;
                if let Some(index) = index {
                    self.infer_expr(index)?;
                }
                Ok(type_string::array_dereference(&base_type))
            }
            Expr::Assign {
                target,
                op,
                value,
                ..
            } => self.infer_assign(target, *op, value),
            Expr::Binary { lhs, op, rhs, .. } => {
                let left = self.infer_expr(lhs)?;
                let right = self.infer_expr(rhs)?;
                Ok(Self::binary_type(*op, &left, &right))
            }
            Expr::Unary { op, expr, .. } => {
                let inner = self.infer_expr(expr)?;
                Ok(match op {
                    UnaryOp::Not => "bool".to_string(),
                    UnaryOp::Print => "int".to_string(),
                    UnaryOp::Neg | UnaryOp::Plus => inner,
                    UnaryOp::BitNot => "int".to_string(),
                    UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                        inner
                    }
                    UnaryOp::Silence => inner,
                })
            }
            Expr::Instanceof { expr, class, .. } => {
                self.infer_expr(expr)?;
                if let ClassRef::Name(name) = class {
                    self.emit_name_reference(name, NameKind::Class, ReferenceKind::Class);
                } else if let ClassRef::Expr(inner) = class {
                    self.infer_expr(inner)?;
                }
                Ok("bool".to_string())
            }
            Expr::Ternary {
                cond, then, else_, ..
            } => {
                let cond_type = self.infer_expr(cond)?;
                let then_type = match then {
                    Some(then) => self.infer_expr(then)?,
                    // Short form `?:` reuses the subject
                    None => cond_type,
                };
                let else_type = self.infer_expr(else_)?;
                Ok(type_string::merge(&then_type, &else_type))
            }
            Expr::Match { subject, arms, .. } => {
                self.infer_expr(subject)?;
                let mut merged = String::new();
                for arm in arms {
                    if let Some(conditions) = &arm.conditions {
                        for cond in conditions {
                            self.infer_expr(cond)?;
                        }
                    }
                    let arm_type = self.infer_expr(&arm.body)?;
                    merged = type_string::merge(&merged, &arm_type);
                }
                Ok(merged)
            }
            Expr::Closure(closure) => self.walk_closure(closure),
            Expr::ArrowFn(arrow) => self.walk_arrow_fn(arrow),
            Expr::Cast { kind, expr, .. } => {
                self.infer_expr(expr)?;
                Ok(match kind {
                    CastKind::Int => "int",
                    CastKind::Float => "float",
                    CastKind::String => "string",
                    CastKind::Bool => "bool",
                    CastKind::Array => "array",
                    CastKind::Object => "object",
                }
                .to_string())
            }
            Expr::Clone { expr, .. } => self.infer_expr(expr),
            Expr::Yield { expr, .. } => {
                if let Some(expr) = expr {
                    self.infer_expr(expr)?;
                }
                Ok(String::new())
            }
            Expr::Paren { expr, .. } => self.infer_expr(expr),
        }
    }

    fn infer_assign(
        &mut self,
        target: &Expr,
        op: AssignOp,
        value: &Expr,
    ) -> IndexResult<String> {
        match target {
            Expr::Variable(var) => {
                let value_type = self.infer_expr(value)?;
                let bound = match op {
                    AssignOp::Assign => value_type,
                    AssignOp::Concat => "string".to_string(),
                    AssignOp::Coalesce | AssignOp::Arith => {
                        let existing = self.variables.get(&var.text).unwrap_or_default();
                        type_string::merge(&existing, &value_type)
                    }
                };
                self.bind_variable(var, bound.clone());
                Ok(bound)
            }
            Expr::Subscript { base, index, .. } => {
                // Walk the target first so reference order matches the tree
                let base_type = self.infer_expr(base)?;
                if let Some(index) = index {
                    self.infer_expr(index)?;
                }
                let value_type = self.infer_expr(value)?;
                // Writing through a subscript promotes the parent variable
                if let Expr::Variable(var) = base.as_ref() {
                    if !value_type.is_empty() {
                        let promoted =
                            type_string::merge(&base_type, &type_string::array_reference(&value_type));
                        self.variables.set(&var.text, promoted);
                    }
                }
                Ok(value_type)
            }
            other => {
                self.infer_expr(other)?;
                self.infer_expr(value)
            }
        }
    }

    fn binary_type(op: BinaryOp, left: &str, right: &str) -> String {
        match op {
            BinaryOp::Concat => "string".to_string(),
            BinaryOp::Coalesce => type_string::merge(left, right),
            BinaryOp::And
            | BinaryOp::Or
            | BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Identical
            | BinaryOp::NotIdentical
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::LtEq
            | BinaryOp::GtEq => "bool".to_string(),
            BinaryOp::Spaceship => "int".to_string(),
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl
            | BinaryOp::Shr | BinaryOp::Mod => "int".to_string(),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Pow => {
                if left == "float" || right == "float" {
                    "float".to_string()
                } else if left == "int" && right == "int" {
                    "int".to_string()
                } else {
                    "int|float".to_string()
                }
            }
            BinaryOp::Div => "int|float".to_string(),
        }
    }

    fn class_ref_type(&mut self, class: &ClassRef) -> IndexResult<String> {
        match class {
            ClassRef::Name(name) => {
                let resolved = self.resolve_class_name(name);
                let fqn = if resolved.fqn.is_empty() {
                    self.current_class_fqn()
                } else {
                    resolved.fqn.clone()
                };
                self.emit(Reference {
                    kind: ReferenceKind::Class,
                    name: fqn.clone(),
                    location: self.location(name.range),
                    scope: None,
                    type_string: None,
                    alt_name: resolved.alt_name,
                });
                Ok(fqn)
            }
            ClassRef::Expr(inner) => self.infer_expr(inner),
        }
    }

    fn member_reference(
        &mut self,
        name: &MemberName,
        scope_type: String,
        kind: ReferenceKind,
    ) -> IndexResult<String> {
        match name {
            MemberName::Name(ident) => {
                let reference = Reference {
                    kind,
                    name: ident.text.clone(),
                    location: self.location(ident.range),
                    scope: Some(scope_type),
                    type_string: None,
                    alt_name: None,
                };
                let type_string = self.member_type(&reference);
                let mut reference = reference;
                reference.type_string = Some(type_string.clone());
                self.emit(reference);
                Ok(type_string)
            }
            MemberName::Expr(inner) => {
                self.infer_expr(inner)?;
                Ok(String::new())
            }
        }
    }

    // ------------------------------------------------------------------
    // Function-like expressions
    // ------------------------------------------------------------------

    fn walk_closure(&mut self, closure: &ClosureExpr) -> IndexResult<String> {
        self.pop_declaration("anonymous function", |s| {
            s.kind == SymbolKind::Function && s.modifiers.contains(Modifiers::ANONYMOUS)
        })?;
        // Carry the `use`-captured names and `$this` into the new scope
        let mut carry: Vec<(String, String)> = Vec::new();
        for capture in &closure.uses {
            let type_string = self.variables.get(&capture.name.text).unwrap_or_default();
            carry.push((capture.name.text.clone(), type_string));
        }
        if !closure.is_static {
            let this = self.current_class_fqn();
            if !this.is_empty() {
                carry.push(("$this".to_string(), this));
            }
        }
        self.in_scope(closure.range, |reader| {
            reader.variables.push_scope(&carry);
            let result = (|| {
                reader.walk_param_list(&closure.params)?;
                if let Some(return_type) = &closure.return_type {
                    reader.emit_type_decl_refs(return_type);
                }
                for capture in &closure.uses {
                    let type_string =
                        reader.variables.get(&capture.name.text).unwrap_or_default();
                    reader.emit(Reference {
                        kind: ReferenceKind::Variable,
                        name: capture.name.text.clone(),
                        location: reader.location(capture.name.range),
                        scope: None,
                        type_string: Some(type_string),
                        alt_name: None,
                    });
                }
                reader.walk_stmts(&closure.body)
            })();
            reader.variables.pop_scope();
            result
        })?;
        Ok("Closure".to_string())
    }

    fn walk_arrow_fn(&mut self, arrow: &ArrowFnExpr) -> IndexResult<String> {
        self.pop_declaration("arrow function", |s| {
            s.kind == SymbolKind::Function && s.modifiers.contains(Modifiers::ANONYMOUS)
        })?;
        // Arrow functions capture the enclosing scope by value
        let carry = self.variables.bindings();
        self.in_scope(arrow.range, |reader| {
            reader.variables.push_scope(&carry);
            let result = (|| {
                reader.walk_param_list(&arrow.params)?;
                if let Some(return_type) = &arrow.return_type {
                    reader.emit_type_decl_refs(return_type);
                }
                reader.infer_expr(&arrow.body).map(|_| ())
            })();
            reader.variables.pop_scope();
            result
        })?;
        Ok("Closure".to_string())
    }

    fn walk_anon_class(&mut self, anon: &AnonClassExpr) -> IndexResult<String> {
        let id = self.pop_declaration("anonymous class", |s| {
            s.kind == SymbolKind::Class && s.modifiers.contains(Modifiers::ANONYMOUS)
        })?;
        let symbol = self.symbols.symbol(id);
        let fqn = symbol.name.clone();
        let context = Self::class_context_of(symbol);
        if let Some(extends) = &anon.extends {
            self.emit_name_reference(extends, NameKind::Class, ReferenceKind::Class);
        }
        for implemented in &anon.implements {
            self.emit_name_reference(implemented, NameKind::Class, ReferenceKind::Class);
        }
        self.resolver.push_class(context);
        self.walk_members(&anon.members, &fqn)?;
        self.resolver.pop_class();
        Ok(fqn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::semantic::symbol_reader::SymbolReader;

    fn read_refs(text: &str) -> (SymbolStore, ReferenceTable) {
        let uri = "file:///t.php";
        let parse = parser::parse(text);
        let line_index = LineIndex::new(text);
        let table = SymbolReader::read(uri, text, &line_index, &parse.file);
        let mut store = SymbolStore::new();
        store.add(super::super::builtin::builtin_table());
        store.add(table);
        let symbols = store.table(uri).unwrap();
        let refs =
            ReferenceReader::read(uri, &line_index, &store, symbols, &parse.file).unwrap();
        // the store outlives symbols borrow; reconstruct the pair
        let refs = refs.clone();
        drop(symbols);
        (store, refs)
    }

    fn find_ref<'t>(
        table: &'t ReferenceTable,
        kind: ReferenceKind,
        name: &str,
    ) -> &'t Reference {
        table
            .references()
            .find(|r| r.kind == kind && r.name == name)
            .unwrap_or_else(|| panic!("no {kind:?} reference named {name}"))
    }

    fn last_type_of(table: &ReferenceTable, var: &str) -> String {
        table
            .references()
            .filter(|r| r.kind == ReferenceKind::Variable && r.name == var)
            .last()
            .and_then(|r| r.type_string.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_constructor_reference_resolves_import() {
        let (_, refs) = read_refs("<?php namespace A; use B\\C; $x = new C();");
        let ctor = find_ref(&refs, ReferenceKind::Constructor, "B\\C");
        assert!(ctor.alt_name.is_none());
        assert_eq!(last_type_of(&refs, "$x"), "B\\C");
    }

    #[test]
    fn test_branch_union() {
        let (_, refs) =
            read_refs("<?php class A {} class B {} if ($c) { $x = new A(); } else { $x = new B(); } $x;");
        assert_eq!(last_type_of(&refs, "$x"), "A|B");
    }

    #[test]
    fn test_foreach_element_type() {
        let (_, refs) =
            read_refs("<?php class A {} class B {} $arr = [new A(), new B()]; foreach ($arr as $v) { $v; } $v;");
        assert_eq!(last_type_of(&refs, "$v"), "A|B");
    }

    #[test]
    fn test_instanceof_refinement_merges_at_close() {
        let (_, refs) = read_refs(
            "<?php class A {} class T {} $x = new A(); if ($x instanceof T) { $x; } $x;",
        );
        // inside the branch the refined type is visible; after the close the
        // union of refined and unrefined remains
        assert_eq!(last_type_of(&refs, "$x"), "A|T");
    }

    #[test]
    fn test_method_call_type_through_store() {
        let (_, refs) = read_refs(
            "<?php class B { } class F { function make(): B {} } $f = new F(); $b = $f->make();",
        );
        let call = find_ref(&refs, ReferenceKind::Method, "make");
        assert_eq!(call.scope.as_deref(), Some("F"));
        assert_eq!(call.type_string.as_deref(), Some("B"));
        assert_eq!(last_type_of(&refs, "$b"), "B");
    }

    #[test]
    fn test_property_chain() {
        let (_, refs) = read_refs(
            "<?php class Inner { function go(): int {} } class Outer { public Inner $inner; } $o = new Outer(); $o->inner->go();",
        );
        let prop = find_ref(&refs, ReferenceKind::Property, "inner");
        assert_eq!(prop.type_string.as_deref(), Some("Inner"));
        let call = find_ref(&refs, ReferenceKind::Method, "go");
        assert_eq!(call.scope.as_deref(), Some("Inner"));
        assert_eq!(call.type_string.as_deref(), Some("int"));
    }

    #[test]
    fn test_var_doc_overrides() {
        let (_, refs) = read_refs("<?php class A {} /** @var A[] $rows */ $rows = load(); $rows;");
        assert_eq!(last_type_of(&refs, "$rows"), "A[]");
    }

    #[test]
    fn test_subscript_assignment_promotes() {
        let (_, refs) = read_refs("<?php class A {} $list = []; $list[] = new A(); $list;");
        assert_eq!(last_type_of(&refs, "$list"), "array|A[]");
    }

    #[test]
    fn test_subscript_read_dereferences() {
        let (_, refs) = read_refs("<?php class A {} /** @var A[] $rows */ $rows = x(); $one = $rows[0];");
        assert_eq!(last_type_of(&refs, "$one"), "A");
    }

    #[test]
    fn test_global_binding() {
        let (_, refs) = read_refs(
            "<?php /** @global Db $db */ global $db; function f() { global $db; $db; }",
        );
        assert_eq!(last_type_of(&refs, "$db"), "Db");
    }

    #[test]
    fn test_self_parent_static_alt_names() {
        let (_, refs) = read_refs(
            "<?php class A { static function make(): static {} } class B extends A { function f() { self::make(); parent::f2(); } }",
        );
        let self_ref = refs
            .references()
            .find(|r| r.alt_name.as_deref() == Some("self"))
            .unwrap();
        assert_eq!(self_ref.name, "B");
        let parent_ref = refs
            .references()
            .find(|r| r.alt_name.as_deref() == Some("parent"))
            .unwrap();
        assert_eq!(parent_ref.name, "A");
    }

    #[test]
    fn test_unresolved_function_keeps_alt_name() {
        let (_, refs) = read_refs("<?php namespace N; foo();");
        let call = refs
            .references()
            .find(|r| r.kind == ReferenceKind::Function)
            .unwrap();
        assert_eq!(call.name, "N\\foo");
        assert_eq!(call.alt_name.as_deref(), Some("foo"));
    }

    #[test]
    fn test_closure_captures_and_scope() {
        let (_, refs) = read_refs(
            "<?php class A {} $a = new A(); $f = function () use ($a) { $a; };",
        );
        // the capture keeps its type inside the closure scope
        let inner_uses: Vec<_> = refs
            .references()
            .filter(|r| r.kind == ReferenceKind::Variable && r.name == "$a")
            .collect();
        assert!(inner_uses.iter().all(|r| r.type_string.as_deref() == Some("A")));
        assert!(refs.scope_count() >= 2, "closure body pushes a scope");
    }

    #[test]
    fn test_ternary_and_coalesce_union() {
        let (_, refs) = read_refs(
            "<?php class A {} class B {} $x = $c ? new A() : new B(); $y = $u ?? new A();",
        );
        assert_eq!(last_type_of(&refs, "$x"), "A|B");
        assert!(last_type_of(&refs, "$y").contains('A'));
    }

    #[test]
    fn test_lockstep_mismatch_is_fatal() {
        let uri = "file:///t.php";
        let text_a = "<?php class A { function m() {} }";
        let text_b = "<?php function other() {}";
        let parse_a = parser::parse(text_a);
        let parse_b = parser::parse(text_b);
        let line_index = LineIndex::new(text_a);
        let table = SymbolReader::read(uri, text_a, &line_index, &parse_a.file);
        let mut store = SymbolStore::new();
        store.add(table);
        let symbols = store.table(uri).unwrap();
        let result = ReferenceReader::read(uri, &line_index, &store, symbols, &parse_b.file);
        assert!(matches!(result, Err(IndexError::TornTree { .. })));
    }

    #[test]
    fn test_scope_at_position_finds_function_scope() {
        let (_, refs) = read_refs("<?php function f($p) { $x = 1; }\n$top = 2;");
        let inside = refs.scope_at_position(crate::core::Position::new(0, 25));
        assert_ne!(inside, refs.root());
        let vars: Vec<_> = refs
            .scope_variables(inside)
            .map(|r| r.name.clone())
            .collect();
        assert!(vars.contains(&"$p".to_string()));
        assert!(vars.contains(&"$x".to_string()));
    }
}
