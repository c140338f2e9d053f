//! End-to-end scenarios through the full pipeline: parse → symbol table →
//! symbol store → reference table → IDE queries.

use phindex::Position;
use phindex::ide;
use phindex::semantic::{
    MemberAggregator, MergeStrategy, Modifiers, ReferenceKind, SymbolKind,
};
use phindex::workspace::{Workspace, WorkspaceSettings};

const URI: &str = "file:///t.php";

fn workspace_with(text: &str) -> Workspace {
    let mut ws = Workspace::new(WorkspaceSettings::default());
    ws.open_document(URI, 1, text.to_string());
    ws
}

fn col(text: &str, needle: &str) -> u32 {
    text.find(needle).unwrap_or_else(|| panic!("{needle} not in text")) as u32
}

#[test]
fn namespace_use_and_constructor() {
    let text = "<?php namespace A; use B\\C; $x = new C();";
    let ws = workspace_with(text);

    // Symbol tree: File → Namespace "A" → use alias "C" targeting B\C
    let table = ws.symbols().table(URI).expect("symbol table");
    let root = table.root();
    assert_eq!(table.symbol(root).kind, SymbolKind::File);
    let ns = table
        .find_child(root, |s| s.kind == SymbolKind::Namespace)
        .expect("namespace child");
    assert_eq!(table.symbol(ns).name, "A");
    let use_symbol = table
        .find_child(ns, |s| s.modifiers.contains(Modifiers::USE))
        .expect("use symbol");
    let use_symbol = table.symbol(use_symbol);
    assert_eq!(use_symbol.name, "C");
    assert_eq!(use_symbol.associated[0].kind, SymbolKind::Class);
    assert_eq!(use_symbol.associated[0].name, "B\\C");

    // Reference at `new C()` is a Constructor bound to B\C, no alt name
    let at = Position::new(0, col(text, "C()"));
    let reference = ws
        .references()
        .reference_at_position(URI, at)
        .expect("constructor reference");
    assert_eq!(reference.kind, ReferenceKind::Constructor);
    assert_eq!(reference.name, "B\\C");
    assert!(reference.alt_name.is_none());

    // The variable table reports $x : B\C after the statement
    let var = ws
        .references()
        .references(URI, |r| r.kind == ReferenceKind::Variable && r.name == "$x")
        .into_iter()
        .next()
        .expect("variable reference");
    assert_eq!(var.type_string.as_deref(), Some("B\\C"));
}

#[test]
fn constructor_completion_and_signature_help() {
    let text = "<?php class F { function __construct($p){} } new F($a);";
    let ws = workspace_with(text);

    let document = ws.documents().document(URI).expect("document");
    let document = document.lock();
    let help = ide::signature_help(
        ws.symbols(),
        ws.references(),
        &document,
        Position::new(0, col(text, "($a") + 1),
    )
    .expect("signature help");
    assert_eq!(help.signatures[0].label, "F($p)");
    assert_eq!(help.signatures[0].parameters.len(), 1);
    assert_eq!(help.active_parameter, 0);
}

#[test]
fn signature_help_second_argument() {
    let text = "<?php function fn1($p1,$p2=1){} fn1($x,);";
    let ws = workspace_with(text);

    let document = ws.documents().document(URI).expect("document");
    let document = document.lock();
    let help = ide::signature_help(
        ws.symbols(),
        ws.references(),
        &document,
        Position::new(0, col(text, "($x,") + 4),
    )
    .expect("signature help");
    assert_eq!(help.active_parameter, 1);
    assert_eq!(help.signatures[0].label, "fn1($p1, $p2 = 1)");
}

#[test]
fn override_and_all_merge_strategies() {
    let text = "<?php class A { public function m(){} } class B extends A { public function m(){} } (new B)->m();";
    let ws = workspace_with(text);
    let aggregator = MemberAggregator::new(ws.symbols());

    let override_members: Vec<_> = aggregator
        .members("B", MergeStrategy::Override)
        .iter()
        .filter_map(|h| ws.symbols().symbol(h))
        .filter(|s| s.name == "m")
        .map(|s| s.scope.clone().unwrap_or_default())
        .collect();
    assert_eq!(override_members, vec!["B".to_string()], "B::m shadows A::m");

    let all_members: Vec<_> = aggregator
        .members("B", MergeStrategy::All)
        .iter()
        .filter_map(|h| ws.symbols().symbol(h))
        .filter(|s| s.name == "m")
        .map(|s| s.scope.clone().unwrap_or_default())
        .collect();
    assert_eq!(
        all_members,
        vec!["B".to_string(), "A".to_string()],
        "All returns both, B::m first"
    );
}

#[test]
fn branch_union_types() {
    let text = "<?php class A {} class B {} if($c) $x = new A(); else $x = new B(); $x;";
    let ws = workspace_with(text);
    let last = ws
        .references()
        .references(URI, |r| r.kind == ReferenceKind::Variable && r.name == "$x")
        .into_iter()
        .next_back()
        .expect("variable reference");
    assert_eq!(last.type_string.as_deref(), Some("A|B"));
}

#[test]
fn foreach_element_union_persists_after_loop() {
    let text = "<?php class A {} class B {} $arr = [new A(), new B()]; foreach ($arr as $v) { $v; } $v;";
    let ws = workspace_with(text);

    // inside the loop body
    let inside_at = Position::new(0, col(text, "$v; }"));
    let inside = ws
        .references()
        .reference_at_position(URI, inside_at)
        .expect("reference in body");
    assert_eq!(inside.type_string.as_deref(), Some("A|B"));

    // scopes are function-level: the binding survives the loop
    let last = ws
        .references()
        .references(URI, |r| r.kind == ReferenceKind::Variable && r.name == "$v")
        .into_iter()
        .next_back()
        .expect("trailing reference");
    assert_eq!(last.type_string.as_deref(), Some("A|B"));
}

#[test]
fn goto_definition_and_find_references_across_files() {
    let mut ws = Workspace::new(WorkspaceSettings::default());
    ws.open_document(
        "file:///lib.php",
        1,
        "<?php namespace Lib; class Conn { public function ping(): bool {} }".to_string(),
    );
    let app = "<?php namespace App; use Lib\\Conn; $c = new Conn(); $c->ping();";
    ws.open_document("file:///app.php", 1, app.to_string());

    let defs = ide::definition(
        ws.symbols(),
        ws.references(),
        "file:///app.php",
        Position::new(0, col(app, "Conn()") + 1),
    );
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].uri, "file:///lib.php");

    let refs = ide::find_references(
        ws.symbols(),
        ws.references(),
        "file:///app.php",
        Position::new(0, col(app, "ping")),
    );
    assert_eq!(refs.len(), 2, "declaration and call site");
}

#[test]
fn workspace_symbol_search_is_ranked() {
    let ws = workspace_with("<?php class Map {} class Mapper {} class Remap {}");
    let results = ide::workspace_symbols(ws.symbols(), "Map");
    assert!(results.len() >= 2);
    assert_eq!(results[0].0, "Map");
    assert!(results.iter().all(|(name, ..)| name != "Remap"));
}

#[test]
fn magic_members_complete_and_hover() {
    let text = "<?php /** @property int $count\n * @method B make() */ class C {} class B {} $c = new C(); $c->count;";
    let ws = workspace_with(text);
    let aggregator = MemberAggregator::new(ws.symbols());
    let members: Vec<_> = aggregator
        .members("C", MergeStrategy::Override)
        .iter()
        .filter_map(|h| ws.symbols().symbol(h))
        .map(|s| s.name.clone())
        .collect();
    assert!(members.contains(&"$count".to_string()));
    assert!(members.contains(&"make".to_string()));
}

#[test]
fn parse_errors_still_yield_tables() {
    let text = "<?php class Good {} class { broken function ok2() {}";
    let mut ws = Workspace::new(WorkspaceSettings::default());
    ws.open_document(URI, 1, text.to_string());
    assert!(ws.symbols().table(URI).is_some());
    assert!(ws.references().table(URI).is_some());
    assert_eq!(ws.symbols().find("Good", |_| true).len(), 1);
}
