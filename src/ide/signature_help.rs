//! Signature help: the active call's signature and parameter.

use text_size::TextSize;

use crate::core::Position;
use crate::document::ParsedDocument;
use crate::semantic::{
    MergeStrategy, ReferenceStore, SymbolKind, SymbolStore,
};
use crate::parser::ast::*;

/// One parameter of a signature.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub label: String,
    pub documentation: Option<String>,
}

/// One callable signature.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureInfo {
    pub label: String,
    pub parameters: Vec<ParameterInfo>,
    pub documentation: Option<String>,
}

/// Signature help result.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureHelp {
    pub signatures: Vec<SignatureInfo>,
    pub active_signature: u32,
    pub active_parameter: u32,
}

/// Signature help at a position inside a call's argument list.
///
/// The syntax tree locates the innermost enclosing call and the active
/// argument; the reference table resolves the callee.
pub fn signature_help(
    symbols: &SymbolStore,
    references: &ReferenceStore,
    document: &ParsedDocument,
    position: Position,
) -> Option<SignatureHelp> {
    let offset = document.line_index.offset(position);
    let call = find_call(&document.parse.file, offset)?;

    // Resolve the callee through the reference emitted at its name
    let callee_position = document.line_index.position(call.callee_range.start());
    let reference = references.reference_at_position(&document.uri, callee_position)?;
    let handles = symbols.find_symbols_by_reference(reference, MergeStrategy::Override);
    let handle = handles.first()?;
    let callable = symbols.symbol(handle)?;
    let table = symbols.table(&handle.uri)?;

    // Constructors display under the class name, not `__construct`
    let name = if reference.kind == crate::semantic::ReferenceKind::Constructor {
        crate::semantic::not_fqn(&reference.name)
    } else {
        crate::semantic::not_fqn(&callable.name)
    };
    let mut parameters = Vec::new();
    for child in &callable.children {
        let param = table.symbol(*child);
        if param.kind != SymbolKind::Parameter {
            continue;
        }
        let mut label = String::new();
        if let Some(type_string) = &param.type_string {
            if !type_string.is_empty() {
                label.push_str(type_string);
                label.push(' ');
            }
        }
        label.push_str(&param.name);
        if let Some(value) = &param.value {
            label.push_str(" = ");
            label.push_str(value);
        }
        parameters.push(ParameterInfo {
            label,
            documentation: param.doc.as_ref().map(|d| d.description.clone()),
        });
    }
    let label = format!(
        "{}({})",
        name,
        parameters
            .iter()
            .map(|p| p.label.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let active_parameter = call
        .args
        .iter()
        .filter(|arg| arg.range.end() < offset)
        .count() as u32;

    Some(SignatureHelp {
        signatures: vec![SignatureInfo {
            label,
            parameters,
            documentation: callable.doc.as_ref().map(|d| d.description.clone()),
        }],
        active_signature: 0,
        active_parameter,
    })
}

/// The innermost call-like node whose argument region encloses `offset`.
struct CallSite<'a> {
    callee_range: text_size::TextRange,
    args: &'a [Arg],
}

fn find_call(file: &SourceFile, offset: TextSize) -> Option<CallSite<'_>> {
    let mut best: Option<CallSite<'_>> = None;
    for stmt in &file.stmts {
        visit_stmt(stmt, offset, &mut best);
    }
    best
}

fn consider<'a>(
    range: text_size::TextRange,
    callee_range: text_size::TextRange,
    args: &'a [Arg],
    offset: TextSize,
    best: &mut Option<CallSite<'a>>,
) {
    // Inside the call, after the callee name (the argument region)
    if range.contains(offset) && offset > callee_range.end() {
        let deeper = match best {
            Some(existing) => callee_range.start() >= existing.callee_range.start(),
            None => true,
        };
        if deeper {
            *best = Some(CallSite { callee_range, args });
        }
    }
}

fn visit_stmt<'a>(stmt: &'a Stmt, offset: TextSize, best: &mut Option<CallSite<'a>>) {
    match stmt {
        Stmt::Namespace(ns) => {
            if let Some(body) = &ns.body {
                for stmt in body {
                    visit_stmt(stmt, offset, best);
                }
            }
        }
        Stmt::Class(decl) => visit_members(&decl.members, offset, best),
        Stmt::Interface(decl) => visit_members(&decl.members, offset, best),
        Stmt::Trait(decl) => visit_members(&decl.members, offset, best),
        Stmt::Function(decl) => {
            for stmt in &decl.body {
                visit_stmt(stmt, offset, best);
            }
        }
        Stmt::Const(decl) => {
            for element in &decl.elements {
                if let Some(value) = &element.value {
                    visit_expr(value, offset, best);
                }
            }
        }
        Stmt::StaticVar(decl) => {
            for entry in &decl.entries {
                if let Some(default) = &entry.default {
                    visit_expr(default, offset, best);
                }
            }
        }
        Stmt::Echo(echo) => {
            for expr in &echo.exprs {
                visit_expr(expr, offset, best);
            }
        }
        Stmt::Expr(expr_stmt) => visit_expr(&expr_stmt.expr, offset, best),
        Stmt::If(if_stmt) => {
            visit_expr(&if_stmt.cond, offset, best);
            visit_stmt(&if_stmt.then, offset, best);
            for (cond, body) in &if_stmt.elseifs {
                visit_expr(cond, offset, best);
                visit_stmt(body, offset, best);
            }
            if let Some(else_) = &if_stmt.else_ {
                visit_stmt(else_, offset, best);
            }
        }
        Stmt::While(w) => {
            visit_expr(&w.cond, offset, best);
            visit_stmt(&w.body, offset, best);
        }
        Stmt::DoWhile(w) => {
            visit_stmt(&w.body, offset, best);
            visit_expr(&w.cond, offset, best);
        }
        Stmt::For(f) => {
            for expr in f.init.iter().chain(&f.cond).chain(&f.step) {
                visit_expr(expr, offset, best);
            }
            visit_stmt(&f.body, offset, best);
        }
        Stmt::Foreach(f) => {
            visit_expr(&f.collection, offset, best);
            visit_stmt(&f.body, offset, best);
        }
        Stmt::Switch(s) => {
            visit_expr(&s.subject, offset, best);
            for case in &s.cases {
                if let Some(test) = &case.test {
                    visit_expr(test, offset, best);
                }
                for stmt in &case.body {
                    visit_stmt(stmt, offset, best);
                }
            }
        }
        Stmt::Try(t) => {
            for stmt in &t.body {
                visit_stmt(stmt, offset, best);
            }
            for catch in &t.catches {
                for stmt in &catch.body {
                    visit_stmt(stmt, offset, best);
                }
            }
            if let Some(finally) = &t.finally {
                for stmt in finally {
                    visit_stmt(stmt, offset, best);
                }
            }
        }
        Stmt::Return(r) => {
            if let Some(expr) = &r.expr {
                visit_expr(expr, offset, best);
            }
        }
        Stmt::Throw(t) => visit_expr(&t.expr, offset, best),
        Stmt::Block(b) => {
            for stmt in &b.stmts {
                visit_stmt(stmt, offset, best);
            }
        }
        Stmt::Global(_)
        | Stmt::Use(_)
        | Stmt::Break(_)
        | Stmt::Continue(_)
        | Stmt::InlineHtml(_)
        | Stmt::Nop(_)
        | Stmt::Error(_) => {}
    }
}

fn visit_members<'a>(members: &'a [Member], offset: TextSize, best: &mut Option<CallSite<'a>>) {
    for member in members {
        match member {
            Member::Method(method) => {
                if let Some(body) = &method.body {
                    for stmt in body {
                        visit_stmt(stmt, offset, best);
                    }
                }
            }
            Member::Property(prop) => {
                for entry in &prop.entries {
                    if let Some(default) = &entry.default {
                        visit_expr(default, offset, best);
                    }
                }
            }
            Member::ClassConst(konst) => {
                for entry in &konst.entries {
                    if let Some(value) = &entry.value {
                        visit_expr(value, offset, best);
                    }
                }
            }
            Member::UseTrait(_) | Member::Error(_) => {}
        }
    }
}

fn visit_expr<'a>(expr: &'a Expr, offset: TextSize, best: &mut Option<CallSite<'a>>) {
    match expr {
        Expr::Call { callee, args, range } => {
            consider(*range, callee.range(), args, offset, best);
            visit_expr(callee, offset, best);
            for arg in args {
                visit_expr(&arg.value, offset, best);
            }
        }
        Expr::New { class, args, range } => {
            let callee_range = match class {
                NewClass::Name(name) => name.range,
                NewClass::Anonymous(anon) => anon.range,
                NewClass::Expr(inner) => inner.range(),
            };
            consider(*range, callee_range, args, offset, best);
            if let NewClass::Anonymous(anon) = class {
                visit_members(&anon.members, offset, best);
            }
            for arg in args {
                visit_expr(&arg.value, offset, best);
            }
        }
        Expr::MethodCall {
            recv, name, args, range, ..
        } => {
            let callee_range = match name {
                MemberName::Name(ident) => ident.range,
                MemberName::Expr(inner) => inner.range(),
            };
            consider(*range, callee_range, args, offset, best);
            visit_expr(recv, offset, best);
            for arg in args {
                visit_expr(&arg.value, offset, best);
            }
        }
        Expr::StaticCall { name, args, range, .. } => {
            let callee_range = match name {
                MemberName::Name(ident) => ident.range,
                MemberName::Expr(inner) => inner.range(),
            };
            consider(*range, callee_range, args, offset, best);
            for arg in args {
                visit_expr(&arg.value, offset, best);
            }
        }
        Expr::Array { entries, .. } => {
            for entry in entries {
                if let Some(key) = &entry.key {
                    visit_expr(key, offset, best);
                }
                visit_expr(&entry.value, offset, best);
            }
        }
        Expr::Assign { target, value, .. } => {
            visit_expr(target, offset, best);
            visit_expr(value, offset, best);
        }
        Expr::Binary { lhs, rhs, .. } => {
            visit_expr(lhs, offset, best);
            visit_expr(rhs, offset, best);
        }
        Expr::Unary { expr, .. }
        | Expr::Cast { expr, .. }
        | Expr::Clone { expr, .. }
        | Expr::Paren { expr, .. } => visit_expr(expr, offset, best),
        Expr::Instanceof { expr, .. } => visit_expr(expr, offset, best),
        Expr::Ternary {
            cond, then, else_, ..
        } => {
            visit_expr(cond, offset, best);
            if let Some(then) = then {
                visit_expr(then, offset, best);
            }
            visit_expr(else_, offset, best);
        }
        Expr::Match { subject, arms, .. } => {
            visit_expr(subject, offset, best);
            for arm in arms {
                if let Some(conditions) = &arm.conditions {
                    for cond in conditions {
                        visit_expr(cond, offset, best);
                    }
                }
                visit_expr(&arm.body, offset, best);
            }
        }
        Expr::Closure(closure) => {
            for stmt in &closure.body {
                visit_stmt(stmt, offset, best);
            }
        }
        Expr::ArrowFn(arrow) => visit_expr(&arrow.body, offset, best),
        Expr::Subscript { base, index, .. } => {
            visit_expr(base, offset, best);
            if let Some(index) = index {
                visit_expr(index, offset, best);
            }
        }
        Expr::PropFetch { recv, .. } => visit_expr(recv, offset, best),
        Expr::StaticPropFetch { .. }
        | Expr::ClassConstFetch { .. }
        | Expr::Yield { .. }
        | Expr::Variable(_)
        | Expr::Name(_)
        | Expr::Literal(_)
        | Expr::Error(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::{Workspace, WorkspaceSettings};

    fn help_at(text: &str, col: u32) -> Option<SignatureHelp> {
        let mut ws = Workspace::new(WorkspaceSettings::default());
        ws.open_document("file:///t.php", 1, text.to_string());
        let document = ws.documents().document("file:///t.php").expect("document");
        let document = document.lock();
        signature_help(
            ws.symbols(),
            ws.references(),
            &document,
            Position::new(0, col),
        )
    }

    #[test]
    fn test_constructor_signature_first_parameter() {
        let text = "<?php class F { function __construct($p){} } new F($a);";
        let col = text.find("($a").unwrap() as u32 + 1;
        let help = help_at(text, col).expect("signature help");
        assert_eq!(help.signatures[0].label, "F($p)");
        assert_eq!(help.signatures[0].parameters.len(), 1);
        assert_eq!(help.active_parameter, 0);
    }

    #[test]
    fn test_second_argument_position() {
        let text = "<?php function fn1($p1,$p2=1){} fn1($x,);";
        let col = text.find("($x,").unwrap() as u32 + 4;
        let help = help_at(text, col).expect("signature help");
        assert_eq!(help.signatures[0].label, "fn1($p1, $p2 = 1)");
        assert_eq!(help.active_parameter, 1);
    }

    #[test]
    fn test_method_call_signature() {
        let text = "<?php class F { function m(int $a, string $b) {} } (new F)->m(1, );";
        let col = text.rfind(", )").unwrap() as u32 + 1;
        let help = help_at(text, col).expect("signature help");
        assert_eq!(help.signatures[0].label, "m(int $a, string $b)");
        assert_eq!(help.active_parameter, 1);
    }

    #[test]
    fn test_no_help_outside_calls() {
        let text = "<?php $x = 1;";
        assert!(help_at(text, 8).is_none());
    }
}
