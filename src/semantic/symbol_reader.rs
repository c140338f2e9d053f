//! Symbol reader: walks a syntax tree and produces the per-file symbol table.
//!
//! One symbol per declarative construct. The reader also records the
//! pre-order sequence of declarative symbols so the reference reader can
//! later consume the same tree in lockstep.

use rustc_hash::FxHashSet;
use text_size::TextRange;
use tracing::trace;

use crate::core::{LineIndex, Location};
use crate::docblock::{self, DocBlock, PropertyAccess};
use crate::parser::ast::*;

use super::name_resolver::{ClassContext, ImportRule, NameKind, NameResolver};
use super::symbol::{DocInfo, Modifiers, Related, Symbol, SymbolId, SymbolKind, SymbolTable};

/// Superglobals are never emitted as declared variables
pub const SUPERGLOBALS: &[&str] = &[
    "$GLOBALS", "$_SERVER", "$_GET", "$_POST", "$_FILES", "$_COOKIE", "$_SESSION", "$_REQUEST",
    "$_ENV",
];

pub fn is_superglobal(name: &str) -> bool {
    SUPERGLOBALS.contains(&name)
}

/// Variable bookkeeping for one function-like body (or the file body)
#[derive(Default)]
struct BodyScope {
    /// Names already emitted in this body
    vars: FxHashSet<String>,
    /// Owning function FQN used to stamp locals
    scope_name: Option<String>,
}

/// Streaming tree-walk synthesizing a hierarchical symbol tree.
pub struct SymbolReader<'a> {
    uri: &'a str,
    text: &'a str,
    line_index: &'a LineIndex,
    table: SymbolTable,
    resolver: NameResolver,
}

impl<'a> SymbolReader<'a> {
    pub fn new(uri: &'a str, text: &'a str, line_index: &'a LineIndex) -> Self {
        let root = Symbol::new(SymbolKind::File, uri)
            .with_location(Location::new(uri, line_index.span(TextRange::new(
                0.into(),
                (text.len() as u32).into(),
            ))));
        Self {
            uri,
            text,
            line_index,
            table: SymbolTable::new(uri, root),
            resolver: NameResolver::new(),
        }
    }

    /// Read a parsed document into a symbol table.
    pub fn read(uri: &str, text: &str, line_index: &LineIndex, file: &SourceFile) -> SymbolTable {
        let mut reader = SymbolReader::new(uri, text, line_index);
        reader.walk_file(file);
        trace!(
            "[SYMBOL_READER] {} symbols for {}",
            reader.table.len(),
            uri
        );
        reader.table
    }

    fn walk_file(&mut self, file: &SourceFile) {
        let root = self.table.root();
        let mut parent = root;
        let mut body = BodyScope::default();
        let stmts = &file.stmts;
        for stmt in stmts {
            if let Stmt::Namespace(ns) = stmt {
                parent = self.walk_namespace(ns, root);
            } else {
                self.walk_stmt(stmt, parent, &mut body);
            }
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn location(&self, range: TextRange) -> Location {
        Location::new(self.uri, self.line_index.span(range))
    }

    fn text_of(&self, range: TextRange) -> &str {
        &self.text[usize::from(range.start())..usize::from(range.end())]
    }

    /// Synthesized name for anonymous classes and functions
    fn anon_name(&self, range: TextRange) -> String {
        format!("#anon#{}#{}", self.uri, u32::from(range.start()))
    }

    fn qualify(&self, name: &str) -> String {
        if self.resolver.namespace().is_empty() {
            name.to_string()
        } else {
            format!("{}\\{}", self.resolver.namespace(), name)
        }
    }

    fn emit(&mut self, parent: SymbolId, symbol: Symbol, declarative: bool) -> SymbolId {
        let id = self.table.add_child(parent, symbol);
        if declarative {
            self.table.push_declaration(id);
        }
        id
    }

    fn doc_info(block: &DocBlock) -> Option<DocInfo> {
        if block.summary.is_empty() && block.description.is_empty() {
            return None;
        }
        let description = if block.description.is_empty() {
            block.summary.clone()
        } else {
            format!("{}\n\n{}", block.summary, block.description)
        };
        Some(DocInfo {
            description,
            type_string: None,
        })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn walk_stmt(&mut self, stmt: &Stmt, parent: SymbolId, body: &mut BodyScope) {
        match stmt {
            Stmt::Namespace(ns) => {
                // A namespace nested below the file level still resets the
                // resolver; attach it to the file root
                let root = self.table.root();
                self.walk_namespace(ns, root);
            }
            Stmt::Use(decl) => self.walk_use(decl, parent),
            Stmt::Class(decl) => self.walk_class(decl, parent),
            Stmt::Interface(decl) => self.walk_interface(decl, parent),
            Stmt::Trait(decl) => self.walk_trait(decl, parent),
            Stmt::Function(decl) => self.walk_function(decl, parent),
            Stmt::Const(decl) => self.walk_const(decl, parent),
            Stmt::Global(decl) => self.walk_global(decl, parent),
            Stmt::StaticVar(decl) => {
                for entry in &decl.entries {
                    self.emit_variable(parent, body, &entry.name, None);
                }
            }
            Stmt::Echo(echo) => {
                for expr in &echo.exprs {
                    self.walk_expr(expr, parent, body);
                }
            }
            Stmt::Expr(expr_stmt) => self.walk_expr_stmt(expr_stmt, parent, body),
            Stmt::If(if_stmt) => {
                self.walk_expr(&if_stmt.cond, parent, body);
                self.walk_stmt(&if_stmt.then, parent, body);
                for (cond, stmt) in &if_stmt.elseifs {
                    self.walk_expr(cond, parent, body);
                    self.walk_stmt(stmt, parent, body);
                }
                if let Some(else_) = &if_stmt.else_ {
                    self.walk_stmt(else_, parent, body);
                }
            }
            Stmt::While(w) => {
                self.walk_expr(&w.cond, parent, body);
                self.walk_stmt(&w.body, parent, body);
            }
            Stmt::DoWhile(w) => {
                self.walk_stmt(&w.body, parent, body);
                self.walk_expr(&w.cond, parent, body);
            }
            Stmt::For(f) => {
                for expr in f.init.iter().chain(&f.cond).chain(&f.step) {
                    self.walk_expr(expr, parent, body);
                }
                self.walk_stmt(&f.body, parent, body);
            }
            Stmt::Foreach(f) => {
                self.walk_expr(&f.collection, parent, body);
                if let Some(key) = &f.key {
                    self.emit_variable(parent, body, key, None);
                }
                if let Some(value) = &f.value {
                    self.emit_variable(parent, body, value, None);
                }
                self.walk_stmt(&f.body, parent, body);
            }
            Stmt::Switch(s) => {
                self.walk_expr(&s.subject, parent, body);
                for case in &s.cases {
                    if let Some(test) = &case.test {
                        self.walk_expr(test, parent, body);
                    }
                    for stmt in &case.body {
                        self.walk_stmt(stmt, parent, body);
                    }
                }
            }
            Stmt::Try(t) => {
                for stmt in &t.body {
                    self.walk_stmt(stmt, parent, body);
                }
                for catch in &t.catches {
                    if let Some(var) = &catch.var {
                        self.emit_variable(parent, body, var, None);
                    }
                    for stmt in &catch.body {
                        self.walk_stmt(stmt, parent, body);
                    }
                }
                if let Some(finally) = &t.finally {
                    for stmt in finally {
                        self.walk_stmt(stmt, parent, body);
                    }
                }
            }
            Stmt::Return(r) => {
                if let Some(expr) = &r.expr {
                    self.walk_expr(expr, parent, body);
                }
            }
            Stmt::Throw(t) => self.walk_expr(&t.expr, parent, body),
            Stmt::Block(b) => {
                for stmt in &b.stmts {
                    self.walk_stmt(stmt, parent, body);
                }
            }
            Stmt::Break(_)
            | Stmt::Continue(_)
            | Stmt::InlineHtml(_)
            | Stmt::Nop(_)
            | Stmt::Error(_) => {}
        }
    }

    /// Returns the parent for statements that follow the declaration: the
    /// namespace symbol for the unbraced form (it persists to the next
    /// namespace definition), the file root after a braced block.
    fn walk_namespace(&mut self, ns: &NamespaceDecl, root: SymbolId) -> SymbolId {
        let name = ns.name.as_ref().map(|n| n.text.clone()).unwrap_or_default();
        self.resolver.set_namespace(name.clone());
        let symbol = Symbol::new(SymbolKind::Namespace, name).with_location(self.location(ns.range));
        let ns_id = self.emit(root, symbol, true);
        if let Some(body_stmts) = &ns.body {
            let mut body = BodyScope::default();
            for stmt in body_stmts {
                self.walk_stmt(stmt, ns_id, &mut body);
            }
            // A braced namespace restores the empty namespace on exit
            self.resolver.set_namespace("");
            return root;
        }
        ns_id
    }

    fn walk_use(&mut self, decl: &UseDecl, parent: SymbolId) {
        for clause in &decl.clauses {
            let target = clause.target.text.trim_start_matches('\\').to_string();
            let alias = clause
                .alias
                .as_ref()
                .map(|a| a.text.clone())
                .unwrap_or_else(|| clause.target.tail().to_string());
            let kind = match clause.kind {
                UseKind::Class => SymbolKind::Class,
                UseKind::Function => SymbolKind::Function,
                UseKind::Const => SymbolKind::Constant,
            };
            let name_kind = match clause.kind {
                UseKind::Class => NameKind::Class,
                UseKind::Function => NameKind::Function,
                UseKind::Const => NameKind::Constant,
            };
            self.resolver.add_rule(ImportRule {
                kind: name_kind,
                alias: alias.clone(),
                fqn: target.clone(),
            });
            let mut symbol = Symbol::new(SymbolKind::Variable, alias)
                .with_location(self.location(clause.range))
                .with_modifiers(Modifiers::USE);
            // The alias symbol takes the target's kind; a shadow entry holds
            // the target FQN
            symbol.kind = kind;
            symbol.associated.push(Related::new(kind, target));
            self.emit(parent, symbol, true);
        }
    }

    fn class_doc_block(decl_doc: &Option<DocComment>) -> Option<DocBlock> {
        decl_doc.as_ref().map(|doc| docblock::parse(&doc.text))
    }

    fn walk_class(&mut self, decl: &ClassDecl, parent: SymbolId) {
        let fqn = self.qualify(&decl.name.text);
        let mut modifiers = Modifiers::NONE;
        for m in &decl.modifiers {
            match m {
                MemberModifier::Abstract => modifiers.insert(Modifiers::ABSTRACT),
                MemberModifier::Final => modifiers.insert(Modifiers::FINAL),
                MemberModifier::Readonly => modifiers.insert(Modifiers::READONLY),
                _ => {}
            }
        }
        let base = decl
            .extends
            .as_ref()
            .map(|name| self.resolver.resolve(&name.text, NameKind::Class).fqn);
        let mut symbol = Symbol::new(SymbolKind::Class, fqn.clone())
            .with_location(self.location(decl.range))
            .with_modifiers(modifiers);
        if let Some(base) = &base {
            symbol.associated.push(Related::new(SymbolKind::Class, base.clone()));
        }
        for implemented in &decl.implements {
            let fqn = self.resolver.resolve(&implemented.text, NameKind::Class).fqn;
            symbol.associated.push(Related::new(SymbolKind::Interface, fqn));
        }
        let block = Self::class_doc_block(&decl.doc);
        if let Some(block) = &block {
            symbol.doc = Self::doc_info(block);
        }
        let class_id = self.emit(parent, symbol, true);
        self.resolver.push_class(ClassContext {
            fqn: fqn.clone(),
            base,
        });
        self.walk_members(&decl.members, class_id, &fqn);
        if let Some(block) = &block {
            self.emit_magic_members(class_id, &fqn, block);
        }
        self.resolver.pop_class();
    }

    fn walk_interface(&mut self, decl: &InterfaceDecl, parent: SymbolId) {
        let fqn = self.qualify(&decl.name.text);
        let mut symbol =
            Symbol::new(SymbolKind::Interface, fqn.clone()).with_location(self.location(decl.range));
        for extended in &decl.extends {
            let target = self.resolver.resolve(&extended.text, NameKind::Class).fqn;
            symbol
                .associated
                .push(Related::new(SymbolKind::Interface, target));
        }
        let block = Self::class_doc_block(&decl.doc);
        if let Some(block) = &block {
            symbol.doc = Self::doc_info(block);
        }
        let id = self.emit(parent, symbol, true);
        self.resolver.push_class(ClassContext {
            fqn: fqn.clone(),
            base: None,
        });
        self.walk_members(&decl.members, id, &fqn);
        if let Some(block) = &block {
            self.emit_magic_members(id, &fqn, block);
        }
        self.resolver.pop_class();
    }

    fn walk_trait(&mut self, decl: &TraitDecl, parent: SymbolId) {
        let fqn = self.qualify(&decl.name.text);
        let mut symbol =
            Symbol::new(SymbolKind::Trait, fqn.clone()).with_location(self.location(decl.range));
        let block = Self::class_doc_block(&decl.doc);
        if let Some(block) = &block {
            symbol.doc = Self::doc_info(block);
        }
        let id = self.emit(parent, symbol, true);
        self.resolver.push_class(ClassContext {
            fqn: fqn.clone(),
            base: None,
        });
        self.walk_members(&decl.members, id, &fqn);
        if let Some(block) = &block {
            self.emit_magic_members(id, &fqn, block);
        }
        self.resolver.pop_class();
    }

    fn walk_members(&mut self, members: &[Member], class_id: SymbolId, class_fqn: &str) {
        for member in members {
            match member {
                Member::Method(method) => self.walk_method(method, class_id, class_fqn),
                Member::Property(prop) => self.walk_property(prop, class_id, class_fqn),
                Member::ClassConst(konst) => self.walk_class_const(konst, class_id, class_fqn),
                Member::UseTrait(use_trait) => {
                    for name in &use_trait.names {
                        let fqn = self.resolver.resolve(&name.text, NameKind::Class).fqn;
                        self.table
                            .symbol_mut(class_id)
                            .associated
                            .push(Related::new(SymbolKind::Trait, fqn));
                    }
                }
                Member::Error(_) => {}
            }
        }
    }

    fn member_modifiers(list: &[MemberModifier]) -> Modifiers {
        let mut modifiers = Modifiers::NONE;
        for m in list {
            match m {
                MemberModifier::Public | MemberModifier::Var => {
                    modifiers.insert(Modifiers::PUBLIC)
                }
                MemberModifier::Protected => modifiers.insert(Modifiers::PROTECTED),
                MemberModifier::Private => modifiers.insert(Modifiers::PRIVATE),
                MemberModifier::Static => modifiers.insert(Modifiers::STATIC),
                MemberModifier::Abstract => modifiers.insert(Modifiers::ABSTRACT),
                MemberModifier::Final => modifiers.insert(Modifiers::FINAL),
                MemberModifier::Readonly => modifiers.insert(Modifiers::READONLY),
            }
        }
        modifiers
    }

    fn walk_method(&mut self, decl: &MethodDecl, class_id: SymbolId, class_fqn: &str) {
        let mut modifiers = Self::member_modifiers(&decl.modifiers);
        if !modifiers.has_visibility() {
            // Methods default to public
            modifiers.insert(Modifiers::PUBLIC);
        }
        if decl.by_ref {
            modifiers.insert(Modifiers::REFERENCE);
        }
        let block = decl.doc.as_ref().map(|doc| docblock::parse(&doc.text));
        let mut symbol = Symbol::new(SymbolKind::Method, decl.name.text.clone())
            .with_location(self.location(decl.range))
            .with_modifiers(modifiers);
        symbol.scope = Some(class_fqn.to_string());
        symbol.type_string = self.callable_return_type(&decl.return_type, block.as_ref());
        if let Some(block) = &block {
            symbol.doc = Self::doc_info(block);
        }
        let method_id = self.emit(class_id, symbol, true);
        // Promotion applies to constructor parameters only
        let promoted_into = decl
            .name
            .text
            .eq_ignore_ascii_case("__construct")
            .then_some(class_id);
        let scope_name = format!("{}::{}", class_fqn, decl.name.text);
        self.walk_params(&decl.params, method_id, block.as_ref(), promoted_into, &scope_name);
        if let Some(stmts) = &decl.body {
            let mut body = BodyScope {
                vars: FxHashSet::default(),
                scope_name: Some(scope_name),
            };
            for stmt in stmts {
                self.walk_stmt(stmt, method_id, &mut body);
            }
        }
    }

    /// Return type from `@return` when documented, else the declaration
    fn callable_return_type(
        &self,
        return_type: &Option<TypeDecl>,
        block: Option<&DocBlock>,
    ) -> Option<String> {
        if let Some(tag) = block.and_then(|b| b.return_tag.as_ref()) {
            return Some(self.resolver.resolve_type_string(&tag.type_string));
        }
        return_type
            .as_ref()
            .map(|decl| self.resolver.resolve_type_string(&decl.written()))
    }

    fn walk_params(
        &mut self,
        params: &[Param],
        callable_id: SymbolId,
        block: Option<&DocBlock>,
        promoted_into: Option<SymbolId>,
        scope_name: &str,
    ) {
        for param in params {
            let mut modifiers = Modifiers::NONE;
            if param.by_ref {
                modifiers.insert(Modifiers::REFERENCE);
            }
            if param.variadic {
                modifiers.insert(Modifiers::VARIADIC);
            }
            let documented = block
                .and_then(|b| b.param(&param.name.text))
                .map(|tag| self.resolver.resolve_type_string(&tag.type_string));
            let declared = param
                .type_decl
                .as_ref()
                .map(|decl| self.resolver.resolve_type_string(&decl.written()));
            let mut symbol = Symbol::new(SymbolKind::Parameter, param.name.text.clone())
                .with_location(self.location(param.range))
                .with_modifiers(modifiers);
            symbol.scope = Some(scope_name.to_string());
            symbol.type_string = documented.clone().or(declared.clone());
            symbol.value = param.default.as_ref().map(|d| self.text_of(d.range()).to_string());
            self.emit(callable_id, symbol, true);

            // Constructor property promotion
            if let (Some(class_id), true) = (
                promoted_into,
                param.modifiers.iter().any(|m| {
                    matches!(
                        m,
                        MemberModifier::Public
                            | MemberModifier::Protected
                            | MemberModifier::Private
                            | MemberModifier::Readonly
                    )
                }),
            ) {
                let mut prop_modifiers = Self::member_modifiers(&param.modifiers);
                if !prop_modifiers.has_visibility() {
                    prop_modifiers.insert(Modifiers::PUBLIC);
                }
                let class_fqn = self.table.symbol(class_id).name.clone();
                let mut prop = Symbol::new(SymbolKind::Property, param.name.text.clone())
                    .with_location(self.location(param.range))
                    .with_modifiers(prop_modifiers);
                prop.scope = Some(class_fqn);
                prop.type_string = documented.or(declared);
                self.emit(class_id, prop, false);
            }
        }
    }

    fn walk_property(&mut self, decl: &PropertyDecl, class_id: SymbolId, class_fqn: &str) {
        let mut modifiers = Self::member_modifiers(&decl.modifiers);
        if !modifiers.has_visibility() {
            modifiers.insert(Modifiers::PUBLIC);
        }
        let block = decl.doc.as_ref().map(|doc| docblock::parse(&doc.text));
        let declared = decl
            .type_decl
            .as_ref()
            .map(|t| self.resolver.resolve_type_string(&t.written()));
        for entry in &decl.entries {
            let documented = block
                .as_ref()
                .and_then(|b| b.var(&entry.name.text))
                .map(|tag| self.resolver.resolve_type_string(&tag.type_string));
            let mut symbol = Symbol::new(SymbolKind::Property, entry.name.text.clone())
                .with_location(self.location(entry.range))
                .with_modifiers(modifiers);
            symbol.scope = Some(class_fqn.to_string());
            symbol.type_string = documented.or_else(|| declared.clone());
            symbol.value = entry
                .default
                .as_ref()
                .map(|d| self.text_of(d.range()).to_string());
            if let Some(block) = &block {
                symbol.doc = Self::doc_info(block);
            }
            self.emit(class_id, symbol, true);
        }
    }

    fn walk_class_const(&mut self, decl: &ClassConstDecl, class_id: SymbolId, class_fqn: &str) {
        let mut modifiers = Self::member_modifiers(&decl.modifiers);
        if !modifiers.has_visibility() {
            modifiers.insert(Modifiers::PUBLIC);
        }
        // Class constants are implicitly static
        modifiers.insert(Modifiers::STATIC);
        let block = decl.doc.as_ref().map(|doc| docblock::parse(&doc.text));
        for entry in &decl.entries {
            let mut symbol = Symbol::new(SymbolKind::ClassConstant, entry.name.text.clone())
                .with_location(self.location(entry.range))
                .with_modifiers(modifiers);
            symbol.scope = Some(class_fqn.to_string());
            symbol.value = entry
                .value
                .as_ref()
                .map(|v| self.text_of(v.range()).to_string());
            if let Some(block) = &block {
                symbol.doc = Self::doc_info(block);
            }
            self.emit(class_id, symbol, true);
        }
    }

    fn emit_magic_members(&mut self, class_id: SymbolId, class_fqn: &str, block: &DocBlock) {
        for tag in &block.properties {
            let mut modifiers = Modifiers::MAGIC | Modifiers::PUBLIC;
            match tag.access {
                PropertyAccess::ReadOnly => modifiers.insert(Modifiers::READONLY),
                PropertyAccess::WriteOnly => modifiers.insert(Modifiers::WRITEONLY),
                PropertyAccess::ReadWrite => {}
            }
            let mut symbol = Symbol::new(SymbolKind::Property, tag.name.clone())
                .with_modifiers(modifiers);
            symbol.scope = Some(class_fqn.to_string());
            symbol.type_string = Some(self.resolver.resolve_type_string(&tag.type_string));
            if !tag.description.is_empty() {
                symbol.doc = Some(DocInfo {
                    description: tag.description.clone(),
                    type_string: None,
                });
            }
            self.emit(class_id, symbol, false);
        }
        for tag in &block.methods {
            let mut modifiers = Modifiers::MAGIC | Modifiers::PUBLIC;
            if tag.is_static {
                modifiers.insert(Modifiers::STATIC);
            }
            let mut symbol =
                Symbol::new(SymbolKind::Method, tag.name.clone()).with_modifiers(modifiers);
            symbol.scope = Some(class_fqn.to_string());
            symbol.type_string = Some(self.resolver.resolve_type_string(&tag.return_type));
            if !tag.description.is_empty() {
                symbol.doc = Some(DocInfo {
                    description: tag.description.clone(),
                    type_string: None,
                });
            }
            let method_id = self.emit(class_id, symbol, false);
            for param in &tag.params {
                let mut param_symbol = Symbol::new(SymbolKind::Parameter, param.name.clone())
                    .with_modifiers(Modifiers::MAGIC);
                param_symbol.scope = Some(format!("{}::{}", class_fqn, tag.name));
                param_symbol.type_string =
                    Some(self.resolver.resolve_type_string(&param.type_string));
                self.emit(method_id, param_symbol, false);
            }
        }
    }

    fn walk_function(&mut self, decl: &FunctionDecl, parent: SymbolId) {
        let fqn = self.qualify(&decl.name.text);
        let block = decl.doc.as_ref().map(|doc| docblock::parse(&doc.text));
        let mut modifiers = Modifiers::NONE;
        if decl.by_ref {
            modifiers.insert(Modifiers::REFERENCE);
        }
        let mut symbol = Symbol::new(SymbolKind::Function, fqn.clone())
            .with_location(self.location(decl.range))
            .with_modifiers(modifiers);
        symbol.type_string = self.callable_return_type(&decl.return_type, block.as_ref());
        if let Some(block) = &block {
            symbol.doc = Self::doc_info(block);
        }
        let func_id = self.emit(parent, symbol, true);
        self.walk_params(&decl.params, func_id, block.as_ref(), None, &fqn);
        let mut body = BodyScope {
            vars: FxHashSet::default(),
            scope_name: Some(fqn),
        };
        for stmt in &decl.body {
            self.walk_stmt(stmt, func_id, &mut body);
        }
    }

    fn walk_const(&mut self, decl: &ConstDecl, parent: SymbolId) {
        let block = decl.doc.as_ref().map(|doc| docblock::parse(&doc.text));
        for element in &decl.elements {
            let fqn = self.qualify(&element.name.text);
            let mut symbol = Symbol::new(SymbolKind::Constant, fqn)
                .with_location(self.location(element.range));
            symbol.value = element
                .value
                .as_ref()
                .map(|v| self.text_of(v.range()).to_string());
            if let Some(block) = &block {
                symbol.doc = Self::doc_info(block);
            }
            self.emit(parent, symbol, true);
        }
    }

    fn walk_global(&mut self, decl: &GlobalDecl, parent: SymbolId) {
        let Some(block) = decl.doc.as_ref().map(|doc| docblock::parse(&doc.text)) else {
            return;
        };
        if block.globals.is_empty() {
            return;
        }
        for var in &decl.vars {
            let tag = block
                .globals
                .iter()
                .find(|g| g.name.as_deref() == Some(var.text.as_str()))
                .or_else(|| block.globals.first());
            if let Some(tag) = tag {
                let mut symbol = Symbol::new(SymbolKind::GlobalVariable, var.text.clone())
                    .with_location(self.location(var.range));
                symbol.type_string = Some(self.resolver.resolve_type_string(&tag.type_string));
                if !tag.description.is_empty() {
                    symbol.doc = Some(DocInfo {
                        description: tag.description.clone(),
                        type_string: None,
                    });
                }
                self.emit(parent, symbol, false);
            }
        }
    }

    fn walk_expr_stmt(&mut self, stmt: &ExprStmt, parent: SymbolId, body: &mut BodyScope) {
        // `define('NAME', value)` at statement level declares a constant
        if let Expr::Call { callee, args, .. } = &stmt.expr {
            if let Expr::Name(name) = callee.as_ref() {
                if name.text.eq_ignore_ascii_case("define") {
                    self.emit_define(args, parent);
                }
            }
        }
        let var_doc = stmt
            .doc
            .as_ref()
            .map(|doc| docblock::parse(&doc.text))
            .and_then(|block| {
                block
                    .vars
                    .first()
                    .map(|tag| self.resolver.resolve_type_string(&tag.type_string))
            });
        self.walk_expr_with_doc(&stmt.expr, parent, body, var_doc);
    }

    fn emit_define(&mut self, args: &[Arg], parent: SymbolId) {
        let [first, rest @ ..] = args else { return };
        let Expr::Literal(literal) = &first.value else {
            return;
        };
        if literal.kind != LiteralKind::String {
            return;
        }
        let name = literal
            .text
            .trim_matches(|c| c == '\'' || c == '"')
            .trim_start_matches('\\')
            .to_string();
        if name.is_empty() {
            return;
        }
        let mut symbol =
            Symbol::new(SymbolKind::Constant, name).with_location(self.location(literal.range));
        if let Some(value) = rest.first() {
            if let Expr::Literal(value_literal) = &value.value {
                symbol.value = Some(value_literal.text.clone());
            }
        }
        self.emit(parent, symbol, false);
    }

    fn emit_variable(
        &mut self,
        parent: SymbolId,
        body: &mut BodyScope,
        name: &VarName,
        type_string: Option<String>,
    ) {
        if name.text == "$this" || is_superglobal(&name.text) {
            return;
        }
        if !body.vars.insert(name.text.clone()) {
            return;
        }
        let mut symbol = Symbol::new(SymbolKind::Variable, name.text.clone())
            .with_location(self.location(name.range));
        symbol.scope = body.scope_name.clone();
        symbol.type_string = type_string;
        self.emit(parent, symbol, false);
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn walk_expr(&mut self, expr: &Expr, parent: SymbolId, body: &mut BodyScope) {
        self.walk_expr_with_doc(expr, parent, body, None);
    }

    fn walk_expr_with_doc(
        &mut self,
        expr: &Expr,
        parent: SymbolId,
        body: &mut BodyScope,
        var_doc: Option<String>,
    ) {
        match expr {
            Expr::Assign { target, value, .. } => {
                if let Expr::Variable(name) = target.as_ref() {
                    self.emit_variable(parent, body, name, var_doc);
                } else {
                    self.walk_expr(target, parent, body);
                }
                self.walk_expr(value, parent, body);
            }
            Expr::Closure(closure) => self.walk_closure(closure, parent, body),
            Expr::ArrowFn(arrow) => self.walk_arrow_fn(arrow, parent, body),
            Expr::New { class, args, .. } => {
                if let NewClass::Anonymous(anon) = class {
                    self.walk_anon_class(anon, parent, body);
                }
                for arg in args {
                    self.walk_expr(&arg.value, parent, body);
                }
            }
            Expr::Call { callee, args, .. } => {
                self.walk_expr(callee, parent, body);
                for arg in args {
                    self.walk_expr(&arg.value, parent, body);
                }
            }
            Expr::MethodCall {
                recv, name, args, ..
            } => {
                self.walk_expr(recv, parent, body);
                if let MemberName::Expr(inner) = name {
                    self.walk_expr(inner, parent, body);
                }
                for arg in args {
                    self.walk_expr(&arg.value, parent, body);
                }
            }
            Expr::StaticCall { name, args, class, .. } => {
                if let ClassRef::Expr(inner) = class {
                    self.walk_expr(inner, parent, body);
                }
                if let MemberName::Expr(inner) = name {
                    self.walk_expr(inner, parent, body);
                }
                for arg in args {
                    self.walk_expr(&arg.value, parent, body);
                }
            }
            Expr::PropFetch { recv, name, .. } => {
                self.walk_expr(recv, parent, body);
                if let MemberName::Expr(inner) = name {
                    self.walk_expr(inner, parent, body);
                }
            }
            Expr::StaticPropFetch { class, .. } => {
                if let ClassRef::Expr(inner) = class {
                    self.walk_expr(inner, parent, body);
                }
            }
            Expr::ClassConstFetch { class, .. } => {
                if let ClassRef::Expr(inner) = class {
                    self.walk_expr(inner, parent, body);
                }
            }
            Expr::Subscript { base, index, .. } => {
                self.walk_expr(base, parent, body);
                if let Some(index) = index {
                    self.walk_expr(index, parent, body);
                }
            }
            Expr::Array { entries, .. } => {
                for entry in entries {
                    if let Some(key) = &entry.key {
                        self.walk_expr(key, parent, body);
                    }
                    self.walk_expr(&entry.value, parent, body);
                }
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.walk_expr(lhs, parent, body);
                self.walk_expr(rhs, parent, body);
            }
            Expr::Unary { expr, .. }
            | Expr::Cast { expr, .. }
            | Expr::Clone { expr, .. }
            | Expr::Paren { expr, .. } => self.walk_expr(expr, parent, body),
            Expr::Instanceof { expr, class, .. } => {
                self.walk_expr(expr, parent, body);
                if let ClassRef::Expr(inner) = class {
                    self.walk_expr(inner, parent, body);
                }
            }
            Expr::Ternary {
                cond, then, else_, ..
            } => {
                self.walk_expr(cond, parent, body);
                if let Some(then) = then {
                    self.walk_expr(then, parent, body);
                }
                self.walk_expr(else_, parent, body);
            }
            Expr::Match { subject, arms, .. } => {
                self.walk_expr(subject, parent, body);
                for arm in arms {
                    if let Some(conditions) = &arm.conditions {
                        for cond in conditions {
                            self.walk_expr(cond, parent, body);
                        }
                    }
                    self.walk_expr(&arm.body, parent, body);
                }
            }
            Expr::Yield { expr, .. } => {
                if let Some(expr) = expr {
                    self.walk_expr(expr, parent, body);
                }
            }
            Expr::Variable(_) | Expr::Name(_) | Expr::Literal(_) | Expr::Error(_) => {}
        }
    }

    fn walk_closure(&mut self, closure: &ClosureExpr, parent: SymbolId, _outer: &mut BodyScope) {
        let name = self.anon_name(closure.range);
        let block = closure.doc.as_ref().map(|doc| docblock::parse(&doc.text));
        let mut symbol = Symbol::new(SymbolKind::Function, name.clone())
            .with_location(self.location(closure.range))
            .with_modifiers(Modifiers::ANONYMOUS);
        symbol.type_string = self.callable_return_type(&closure.return_type, block.as_ref());
        let closure_id = self.emit(parent, symbol, true);
        self.walk_params(&closure.params, closure_id, block.as_ref(), None, &name);
        let mut body = BodyScope {
            vars: FxHashSet::default(),
            scope_name: Some(name.clone()),
        };
        // `use` captures materialize as variables owned by the closure
        for capture in &closure.uses {
            let mut symbol = Symbol::new(SymbolKind::Variable, capture.name.text.clone())
                .with_location(self.location(capture.name.range))
                .with_modifiers(Modifiers::USE);
            symbol.scope = Some(name.clone());
            self.emit(closure_id, symbol, false);
            body.vars.insert(capture.name.text.clone());
        }
        for stmt in &closure.body {
            self.walk_stmt(stmt, closure_id, &mut body);
        }
    }

    fn walk_arrow_fn(&mut self, arrow: &ArrowFnExpr, parent: SymbolId, _outer: &mut BodyScope) {
        let name = self.anon_name(arrow.range);
        let mut symbol = Symbol::new(SymbolKind::Function, name.clone())
            .with_location(self.location(arrow.range))
            .with_modifiers(Modifiers::ANONYMOUS);
        symbol.type_string = self.callable_return_type(&arrow.return_type, None);
        let arrow_id = self.emit(parent, symbol, true);
        self.walk_params(&arrow.params, arrow_id, None, None, &name);
        let mut body = BodyScope {
            vars: FxHashSet::default(),
            scope_name: Some(name),
        };
        self.walk_expr(&arrow.body, arrow_id, &mut body);
    }

    fn walk_anon_class(&mut self, anon: &AnonClassExpr, parent: SymbolId, _outer: &mut BodyScope) {
        let name = self.anon_name(anon.range);
        let base = anon
            .extends
            .as_ref()
            .map(|n| self.resolver.resolve(&n.text, NameKind::Class).fqn);
        let mut symbol = Symbol::new(SymbolKind::Class, name.clone())
            .with_location(self.location(anon.range))
            .with_modifiers(Modifiers::ANONYMOUS);
        if let Some(base) = &base {
            symbol
                .associated
                .push(Related::new(SymbolKind::Class, base.clone()));
        }
        for implemented in &anon.implements {
            let target = self.resolver.resolve(&implemented.text, NameKind::Class).fqn;
            symbol
                .associated
                .push(Related::new(SymbolKind::Interface, target));
        }
        let block = Self::class_doc_block(&anon.doc);
        if let Some(block) = &block {
            symbol.doc = Self::doc_info(block);
        }
        let id = self.emit(parent, symbol, true);
        self.resolver.push_class(ClassContext {
            fqn: name.clone(),
            base,
        });
        self.walk_members(&anon.members, id, &name);
        self.resolver.pop_class();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn read(text: &str) -> SymbolTable {
        let parse = parser::parse(text);
        let line_index = LineIndex::new(text);
        SymbolReader::read("file:///t.php", text, &line_index, &parse.file)
    }

    fn find_by_name<'t>(table: &'t SymbolTable, name: &str) -> &'t Symbol {
        let id = table
            .preorder()
            .find(|id| table.symbol(*id).name == name)
            .unwrap_or_else(|| panic!("symbol {name} not found"));
        table.symbol(id)
    }

    #[test]
    fn test_namespace_use_nesting() {
        let table = read("<?php namespace A; use B\\C; $x = new C();");
        let root = table.symbol(table.root());
        assert_eq!(root.kind, SymbolKind::File);
        let ns_id = table
            .find_child(table.root(), |s| s.kind == SymbolKind::Namespace)
            .unwrap();
        let ns = table.symbol(ns_id);
        assert_eq!(ns.name, "A");
        let use_id = table
            .find_child(ns_id, |s| s.modifiers.contains(Modifiers::USE))
            .unwrap();
        let use_symbol = table.symbol(use_id);
        assert_eq!(use_symbol.name, "C");
        assert_eq!(use_symbol.associated[0].kind, SymbolKind::Class);
        assert_eq!(use_symbol.associated[0].name, "B\\C");
        // the assigned variable nests under the namespace
        let var_id = table
            .find_child(ns_id, |s| s.kind == SymbolKind::Variable)
            .unwrap();
        assert_eq!(table.symbol(var_id).name, "$x");
    }

    #[test]
    fn test_class_members_and_defaults() {
        let table = read(
            "<?php class F { const K = 1; private $p = 2; function m($a) {} protected static function s() {} }",
        );
        let class = find_by_name(&table, "F");
        assert_eq!(class.kind, SymbolKind::Class);

        let konst = find_by_name(&table, "K");
        assert_eq!(konst.kind, SymbolKind::ClassConstant);
        assert!(konst.modifiers.contains(Modifiers::STATIC));
        assert_eq!(konst.value.as_deref(), Some("1"));
        assert_eq!(konst.scope.as_deref(), Some("F"));

        let prop = find_by_name(&table, "$p");
        assert!(prop.modifiers.contains(Modifiers::PRIVATE));
        assert_eq!(prop.value.as_deref(), Some("2"));

        let method = find_by_name(&table, "m");
        assert!(method.modifiers.contains(Modifiers::PUBLIC), "default public");
        let stat = find_by_name(&table, "s");
        assert!(stat.modifiers.contains(Modifiers::PROTECTED));
        assert!(stat.modifiers.contains(Modifiers::STATIC));
    }

    #[test]
    fn test_class_associated_order() {
        let table = read("<?php class C extends B implements I, J { use T; }");
        let class = find_by_name(&table, "C");
        let entries: Vec<_> = class
            .associated
            .iter()
            .map(|r| (r.kind, r.name.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![
                (SymbolKind::Class, "B"),
                (SymbolKind::Interface, "I"),
                (SymbolKind::Interface, "J"),
                (SymbolKind::Trait, "T"),
            ]
        );
    }

    #[test]
    fn test_function_params_and_doc() {
        let table = read(
            "<?php namespace N; /** @param A\\B $x desc\n * @return C */ function f($x, int $y = 0) {}",
        );
        let func = find_by_name(&table, "N\\f");
        assert_eq!(func.kind, SymbolKind::Function);
        assert_eq!(func.type_string.as_deref(), Some("N\\C"));
        let x = find_by_name(&table, "$x");
        assert_eq!(x.kind, SymbolKind::Parameter);
        assert_eq!(x.type_string.as_deref(), Some("N\\A\\B"));
        let y = find_by_name(&table, "$y");
        assert_eq!(y.type_string.as_deref(), Some("int"));
        assert_eq!(y.value.as_deref(), Some("0"));
    }

    #[test]
    fn test_define_constant() {
        let table = read("<?php define('APP_VERSION', '1.2');");
        let konst = find_by_name(&table, "APP_VERSION");
        assert_eq!(konst.kind, SymbolKind::Constant);
        assert_eq!(konst.value.as_deref(), Some("'1.2'"));
    }

    #[test]
    fn test_define_strips_leading_separator() {
        let table = read("<?php define('\\\\NS\\\\LIMIT', 5);");
        let konst = table
            .preorder()
            .map(|id| table.symbol(id))
            .find(|s| s.kind == SymbolKind::Constant)
            .unwrap();
        assert!(!konst.name.starts_with('\\'));
    }

    #[test]
    fn test_variable_dedup_and_superglobals() {
        let table = read("<?php function f() { $a = 1; $a = 2; $this; $_GET; $b = 3; }");
        let vars: Vec<_> = table
            .preorder()
            .map(|id| table.symbol(id))
            .filter(|s| s.kind == SymbolKind::Variable)
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(vars, vec!["$a", "$b"]);
    }

    #[test]
    fn test_anonymous_class_and_closure_names() {
        let table = read("<?php $f = function ($p) use ($q) {}; $c = new class {};");
        let symbols: Vec<_> = table
            .preorder()
            .map(|id| table.symbol(id))
            .filter(|s| s.modifiers.contains(Modifiers::ANONYMOUS))
            .collect();
        assert_eq!(symbols.len(), 2);
        assert!(symbols[0].name.starts_with("#anon#file:///t.php#"));
        assert_eq!(symbols[0].kind, SymbolKind::Function);
        assert_eq!(symbols[1].kind, SymbolKind::Class);
        // capture is a Variable child with the Use modifier
        let capture = find_by_name(&table, "$q");
        assert!(capture.modifiers.contains(Modifiers::USE));
    }

    #[test]
    fn test_magic_members() {
        let table = read(
            "<?php /** @property int $count\n * @method static B make(string $n) */ class C {}",
        );
        let count = find_by_name(&table, "$count");
        assert!(count.modifiers.contains(Modifiers::MAGIC));
        assert_eq!(count.type_string.as_deref(), Some("int"));
        let make = find_by_name(&table, "make");
        assert!(make.modifiers.contains(Modifiers::MAGIC));
        assert!(make.modifiers.contains(Modifiers::STATIC));
        assert!(make.modifiers.contains(Modifiers::PUBLIC));
    }

    #[test]
    fn test_catch_variable() {
        let table = read("<?php try {} catch (\\Exception $e) {}");
        let var = find_by_name(&table, "$e");
        assert_eq!(var.kind, SymbolKind::Variable);
    }

    #[test]
    fn test_global_with_doc_tag() {
        let table = read("<?php function f() { /** @global Db\\Conn $db */ global $db; }");
        let global = table
            .preorder()
            .map(|id| table.symbol(id))
            .find(|s| s.kind == SymbolKind::GlobalVariable)
            .unwrap();
        assert_eq!(global.name, "$db");
        assert_eq!(global.type_string.as_deref(), Some("Db\\Conn"));
    }

    #[test]
    fn test_idempotent_reading() {
        let text = "<?php namespace A; use B\\C; class D extends C { function m(int $p) { $v = 1; } }";
        let first = read(text);
        let second = read(text);
        assert_eq!(first, second);
    }

    #[test]
    fn test_declaration_sequence() {
        let table = read("<?php namespace A; use B\\C; class D { function m($p) {} } const K = 1;");
        let kinds: Vec<_> = table
            .declarations()
            .iter()
            .map(|id| table.symbol(*id).kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                SymbolKind::Namespace,
                SymbolKind::Class, // the use clause takes its target's kind
                SymbolKind::Class,
                SymbolKind::Method,
                SymbolKind::Parameter,
                SymbolKind::Constant,
            ]
        );
    }

    #[test]
    fn test_braced_namespace_restores_global() {
        let table = read("<?php namespace A { class X {} } namespace { class Y {} }");
        let x = find_by_name(&table, "A\\X");
        assert_eq!(x.kind, SymbolKind::Class);
        let y = find_by_name(&table, "Y");
        assert_eq!(y.kind, SymbolKind::Class);
    }
}
