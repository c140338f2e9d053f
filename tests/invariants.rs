//! Universal invariants of the indexing pipeline.

use phindex::core::LineIndex;
use phindex::parser;
use phindex::semantic::{
    NameKind, NameResolver, ReferenceKind, SymbolKind, SymbolReader, SymbolStore, type_string,
};
use phindex::workspace::{Workspace, WorkspaceSettings};

const URI: &str = "file:///t.php";

fn read_table(uri: &str, text: &str) -> phindex::semantic::SymbolTable {
    let parse = parser::parse(text);
    let line_index = LineIndex::new(text);
    SymbolReader::read(uri, text, &line_index, &parse.file)
}

#[test]
fn idempotent_indexing() {
    let text = "<?php namespace A\\B; use C\\D; /** @return D */ function f(int $x = 1) { $v = new D(); } class E extends D { const K = 2; public ?E $next; }";
    let first = read_table(URI, text);
    let second = read_table(URI, text);
    assert_eq!(first, second, "re-indexing the same text is location-equal");
}

#[test]
fn add_remove_round_trip() {
    let mut store = SymbolStore::new();
    store.add(read_table("file:///base.php", "<?php class Base { function m() {} }"));

    let find_before = store.find("Base", |_| true);
    let match_before = store.match_prefix("Ba", |_| true);
    let kinds_before = store.symbols_of_kind(SymbolKind::Class).len();

    store.add(read_table(
        URI,
        "<?php namespace Tmp; class Extra { public $p; } function tmp_fn() {} const TMP_K = 1;",
    ));
    assert!(!store.find("Tmp\\Extra", |_| true).is_empty());
    store.remove(URI);

    assert_eq!(store.find("Base", |_| true), find_before);
    assert_eq!(store.match_prefix("Ba", |_| true), match_before);
    assert_eq!(store.symbols_of_kind(SymbolKind::Class).len(), kinds_before);
    assert!(store.table(URI).is_none());
    assert!(store.find("Tmp\\Extra", |_| true).is_empty());
    assert!(store.find("TMP_K", |_| true).is_empty());
}

#[test]
fn key_discipline_find_implies_match() {
    let mut store = SymbolStore::new();
    store.add(read_table(
        URI,
        "<?php namespace Deep\\Nest; class HttpServer {} const MAX_RETRIES = 1; function do_work() {}",
    ));
    for name in ["Deep\\Nest\\HttpServer", "Deep\\Nest\\do_work", "MAX_RETRIES"] {
        let found = store.find(name, |_| true);
        assert_eq!(found.len(), 1, "find({name})");
        for take in 1..name.len() {
            if !name.is_char_boundary(take) {
                continue;
            }
            let prefix = &name[..take];
            let matched = store.match_prefix(prefix, |_| true);
            assert!(
                found.iter().all(|handle| matched.contains(handle)),
                "match({prefix}) must include find({name})"
            );
        }
    }
}

#[test]
fn name_resolver_monotonicity() {
    // Without new use/namespace declarations between two points, the same
    // written name resolves identically
    let mut resolver = NameResolver::new();
    resolver.set_namespace("App");
    let early = resolver.resolve("Conn", NameKind::Class);
    let again = resolver.resolve("Conn", NameKind::Class);
    assert_eq!(early, again);

    // A use declaration in between may change it
    resolver.add_rule(phindex::semantic::ImportRule {
        kind: NameKind::Class,
        alias: "Conn".into(),
        fqn: "Db\\Conn".into(),
    });
    let later = resolver.resolve("Conn", NameKind::Class);
    assert_eq!(later.fqn, "Db\\Conn");
    assert_ne!(early.fqn, later.fqn);
}

#[test]
fn type_merge_laws() {
    let samples = ["A", "A|B", "int|Foo[]", "Db\\Conn|null"];
    for a in samples {
        assert_eq!(type_string::merge(a, ""), a);
        assert_eq!(type_string::merge(a, a), a);
        for b in samples {
            let ab = type_string::merge(a, b);
            let ba = type_string::merge(b, a);
            let mut left: Vec<_> = type_string::atoms(&ab).collect();
            let mut right: Vec<_> = type_string::atoms(&ba).collect();
            left.sort_unstable();
            right.sort_unstable();
            assert_eq!(left, right, "merge({a},{b}) set-equals merge({b},{a})");
        }
        assert_eq!(
            type_string::array_dereference(&type_string::array_reference(a)),
            a,
            "deref(ref({a})) round-trips"
        );
    }
}

#[test]
fn reference_symbol_lockstep() {
    // Every declarative symbol the reader produced corresponds to the
    // reference reader's traversal: a successful read proves the sequences
    // agree end-to-end
    let text = "<?php namespace N; use A\\B; class C extends B { const K = 1; public $p = 2; function m($a, $b = 1) { $f = function () use ($a) { return $a; }; $c = new class {}; } } function top() {} const G = 3;";
    let mut ws = Workspace::new(WorkspaceSettings::default());
    ws.open_document(URI, 1, text.to_string());
    assert!(
        ws.references().table(URI).is_some(),
        "lockstep read succeeded"
    );
    let declarations = ws.symbols().table(URI).expect("table").declarations().len();
    assert!(declarations >= 10, "declarative sequence is populated");
}

#[test]
fn unresolved_references_still_recorded() {
    let mut ws = Workspace::new(WorkspaceSettings::default());
    ws.open_document(URI, 1, "<?php namespace N; unknown_fn(new MissingClass());".into());
    let function_ref = ws
        .references()
        .references(URI, |r| r.kind == ReferenceKind::Function)
        .into_iter()
        .next()
        .expect("unresolved call still recorded");
    assert_eq!(function_ref.name, "N\\unknown_fn");
    assert_eq!(function_ref.alt_name.as_deref(), Some("unknown_fn"));
    assert_eq!(function_ref.type_string, None);

    let ctor = ws
        .references()
        .references(URI, |r| r.kind == ReferenceKind::Constructor)
        .into_iter()
        .next()
        .expect("unresolved constructor still recorded");
    assert_eq!(ctor.name, "N\\MissingClass");
}
