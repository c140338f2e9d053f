//! Shipped built-in symbol table: core language stubs installed at startup.
//!
//! Covers the classes, interfaces, functions, constants, and superglobals
//! the indexer needs to resolve everyday code. Superglobals carry no
//! location so they stay visible to workspace search.

use super::symbol::{Modifiers, Related, Symbol, SymbolId, SymbolKind, SymbolTable};

/// URI under which the built-in table registers
pub const BUILTIN_URI: &str = "phindex://builtin";

/// Build the built-in symbol table.
pub fn builtin_table() -> SymbolTable {
    let mut table = SymbolTable::new(BUILTIN_URI, Symbol::new(SymbolKind::File, BUILTIN_URI));
    let root = table.root();

    interfaces(&mut table, root);
    throwables(&mut table, root);
    classes(&mut table, root);
    functions(&mut table, root);
    constants(&mut table, root);
    superglobals(&mut table, root);

    table
}

fn interfaces(table: &mut SymbolTable, root: SymbolId) {
    for name in [
        "Throwable",
        "Traversable",
        "IteratorAggregate",
        "ArrayAccess",
        "Countable",
        "Stringable",
        "JsonSerializable",
    ] {
        table.add_child(root, Symbol::new(SymbolKind::Interface, name));
    }

    let mut iterator = Symbol::new(SymbolKind::Interface, "Iterator");
    iterator
        .associated
        .push(Related::new(SymbolKind::Interface, "Traversable"));
    let iterator = table.add_child(root, iterator);
    for (name, return_type) in [
        ("current", "mixed"),
        ("key", "mixed"),
        ("next", "void"),
        ("rewind", "void"),
        ("valid", "bool"),
    ] {
        method(table, iterator, "Iterator", name, &[], return_type, false);
    }
}

fn throwables(table: &mut SymbolTable, root: SymbolId) {
    for (name, base) in [
        ("Exception", None),
        ("Error", None),
        ("ErrorException", Some("Exception")),
        ("TypeError", Some("Error")),
        ("ValueError", Some("Error")),
        ("ArgumentCountError", Some("TypeError")),
        ("ArithmeticError", Some("Error")),
        ("DivisionByZeroError", Some("ArithmeticError")),
        ("LogicException", Some("Exception")),
        ("BadFunctionCallException", Some("LogicException")),
        ("BadMethodCallException", Some("BadFunctionCallException")),
        ("DomainException", Some("LogicException")),
        ("InvalidArgumentException", Some("LogicException")),
        ("LengthException", Some("LogicException")),
        ("OutOfRangeException", Some("LogicException")),
        ("RuntimeException", Some("Exception")),
        ("OutOfBoundsException", Some("RuntimeException")),
        ("OverflowException", Some("RuntimeException")),
        ("RangeException", Some("RuntimeException")),
        ("UnderflowException", Some("RuntimeException")),
        ("UnexpectedValueException", Some("RuntimeException")),
        ("JsonException", Some("Exception")),
    ] {
        let mut symbol = Symbol::new(SymbolKind::Class, name);
        if let Some(base) = base {
            symbol.associated.push(Related::new(SymbolKind::Class, base));
        } else {
            symbol
                .associated
                .push(Related::new(SymbolKind::Interface, "Throwable"));
        }
        let class = table.add_child(root, symbol);
        if base.is_none() {
            method(
                table,
                class,
                name,
                "__construct",
                &[("string", "$message", Some("\"\"")), ("int", "$code", Some("0"))],
                "",
                false,
            );
            for (method_name, return_type) in [
                ("getMessage", "string"),
                ("getCode", "int"),
                ("getFile", "string"),
                ("getLine", "int"),
                ("getTrace", "array"),
                ("getTraceAsString", "string"),
                ("getPrevious", "Throwable|null"),
                ("__toString", "string"),
            ] {
                method(table, class, name, method_name, &[], return_type, false);
            }
        }
    }
}

fn classes(table: &mut SymbolTable, root: SymbolId) {
    table.add_child(root, Symbol::new(SymbolKind::Class, "stdClass"));

    let mut closure = Symbol::new(SymbolKind::Class, "Closure");
    closure.modifiers = Modifiers::FINAL;
    let closure = table.add_child(root, closure);
    method(
        table,
        closure,
        "Closure",
        "bind",
        &[("Closure", "$closure", None), ("object|null", "$newThis", None)],
        "Closure|null",
        true,
    );
    method(
        table,
        closure,
        "Closure",
        "bindTo",
        &[("object|null", "$newThis", None)],
        "Closure|null",
        false,
    );
    method(table, closure, "Closure", "call", &[("object", "$newThis", None)], "mixed", false);

    let mut generator = Symbol::new(SymbolKind::Class, "Generator");
    generator
        .associated
        .push(Related::new(SymbolKind::Interface, "Iterator"));
    let generator = table.add_child(root, generator);
    for (name, return_type) in [
        ("current", "mixed"),
        ("send", "mixed"),
        ("getReturn", "mixed"),
        ("valid", "bool"),
        ("rewind", "void"),
    ] {
        method(table, generator, "Generator", name, &[], return_type, false);
    }

    let mut array_object = Symbol::new(SymbolKind::Class, "ArrayObject");
    for interface in ["IteratorAggregate", "ArrayAccess", "Countable"] {
        array_object
            .associated
            .push(Related::new(SymbolKind::Interface, interface));
    }
    table.add_child(root, array_object);
}

fn functions(table: &mut SymbolTable, root: SymbolId) {
    let defs: &[(&str, &[(&str, &str, Option<&str>)], &str)] = &[
        ("strlen", &[("string", "$string", None)], "int"),
        ("count", &[("Countable|array", "$value", None)], "int"),
        ("in_array", &[("mixed", "$needle", None), ("array", "$haystack", None), ("bool", "$strict", Some("false"))], "bool"),
        ("array_map", &[("callable|null", "$callback", None), ("array", "$array", None)], "array"),
        ("array_filter", &[("array", "$array", None), ("callable|null", "$callback", Some("null"))], "array"),
        ("array_keys", &[("array", "$array", None)], "array"),
        ("array_values", &[("array", "$array", None)], "array"),
        ("array_merge", &[("array", "$arrays", None)], "array"),
        ("array_key_exists", &[("string|int", "$key", None), ("array", "$array", None)], "bool"),
        ("sort", &[("array", "$array", None)], "bool"),
        ("implode", &[("string", "$separator", None), ("array", "$array", None)], "string"),
        ("explode", &[("string", "$separator", None), ("string", "$string", None)], "string[]"),
        ("sprintf", &[("string", "$format", None), ("mixed", "$values", None)], "string"),
        ("printf", &[("string", "$format", None), ("mixed", "$values", None)], "int"),
        ("str_replace", &[("string|array", "$search", None), ("string|array", "$replace", None), ("string|array", "$subject", None)], "string|array"),
        ("substr", &[("string", "$string", None), ("int", "$offset", None), ("int|null", "$length", Some("null"))], "string"),
        ("strpos", &[("string", "$haystack", None), ("string", "$needle", None)], "int|bool"),
        ("strtolower", &[("string", "$string", None)], "string"),
        ("strtoupper", &[("string", "$string", None)], "string"),
        ("trim", &[("string", "$string", None)], "string"),
        ("is_array", &[("mixed", "$value", None)], "bool"),
        ("is_string", &[("mixed", "$value", None)], "bool"),
        ("is_int", &[("mixed", "$value", None)], "bool"),
        ("is_null", &[("mixed", "$value", None)], "bool"),
        ("is_callable", &[("mixed", "$value", None)], "bool"),
        ("isset", &[("mixed", "$var", None)], "bool"),
        ("empty", &[("mixed", "$var", None)], "bool"),
        ("unset", &[("mixed", "$var", None)], "void"),
        ("var_dump", &[("mixed", "$value", None)], "void"),
        ("print_r", &[("mixed", "$value", None), ("bool", "$return", Some("false"))], "string|bool"),
        ("json_encode", &[("mixed", "$value", None), ("int", "$flags", Some("0"))], "string|bool"),
        ("json_decode", &[("string", "$json", None), ("bool|null", "$associative", Some("null"))], "mixed"),
        ("define", &[("string", "$constant_name", None), ("mixed", "$value", None)], "bool"),
        ("defined", &[("string", "$constant_name", None)], "bool"),
        ("constant", &[("string", "$name", None)], "mixed"),
        ("function_exists", &[("string", "$function", None)], "bool"),
        ("class_exists", &[("string", "$class", None), ("bool", "$autoload", Some("true"))], "bool"),
        ("method_exists", &[("object|string", "$object_or_class", None), ("string", "$method", None)], "bool"),
        ("get_class", &[("object", "$object", None)], "string"),
        ("gettype", &[("mixed", "$value", None)], "string"),
        ("intval", &[("mixed", "$value", None)], "int"),
        ("strval", &[("mixed", "$value", None)], "string"),
        ("floatval", &[("mixed", "$value", None)], "float"),
        ("boolval", &[("mixed", "$value", None)], "bool"),
        ("array_key_first", &[("array", "$array", None)], "string|int|null"),
        ("array_key_last", &[("array", "$array", None)], "string|int|null"),
        ("file_get_contents", &[("string", "$filename", None)], "string|bool"),
        ("file_put_contents", &[("string", "$filename", None), ("mixed", "$data", None)], "int|bool"),
    ];
    for (name, params, return_type) in defs {
        let mut symbol = Symbol::new(SymbolKind::Function, *name);
        if !return_type.is_empty() {
            symbol.type_string = Some((*return_type).to_string());
        }
        let function = table.add_child(root, symbol);
        for (type_string, param_name, default) in *params {
            let mut param = Symbol::new(SymbolKind::Parameter, *param_name);
            param.type_string = Some((*type_string).to_string());
            param.value = default.map(|d| d.to_string());
            param.scope = Some((*name).to_string());
            table.add_child(function, param);
        }
    }
}

fn constants(table: &mut SymbolTable, root: SymbolId) {
    for (name, type_string) in [
        ("PHP_EOL", "string"),
        ("PHP_VERSION", "string"),
        ("PHP_OS", "string"),
        ("PHP_INT_MAX", "int"),
        ("PHP_INT_MIN", "int"),
        ("PHP_INT_SIZE", "int"),
        ("PHP_FLOAT_EPSILON", "float"),
        ("PHP_FLOAT_MAX", "float"),
        ("DIRECTORY_SEPARATOR", "string"),
        ("E_ALL", "int"),
        ("E_ERROR", "int"),
        ("E_WARNING", "int"),
        ("E_NOTICE", "int"),
        ("E_DEPRECATED", "int"),
        ("JSON_PRETTY_PRINT", "int"),
        ("JSON_THROW_ON_ERROR", "int"),
        ("SORT_REGULAR", "int"),
        ("M_PI", "float"),
    ] {
        let mut symbol = Symbol::new(SymbolKind::Constant, name);
        symbol.type_string = Some(type_string.to_string());
        table.add_child(root, symbol);
    }
}

fn superglobals(table: &mut SymbolTable, root: SymbolId) {
    for name in [
        "$GLOBALS", "$_SERVER", "$_GET", "$_POST", "$_FILES", "$_COOKIE", "$_SESSION",
        "$_REQUEST", "$_ENV",
    ] {
        let mut symbol = Symbol::new(SymbolKind::Variable, name);
        symbol.type_string = Some("array".to_string());
        table.add_child(root, symbol);
    }
}

fn method(
    table: &mut SymbolTable,
    class: SymbolId,
    class_name: &str,
    name: &str,
    params: &[(&str, &str, Option<&str>)],
    return_type: &str,
    is_static: bool,
) {
    let mut modifiers = Modifiers::PUBLIC;
    if is_static {
        modifiers.insert(Modifiers::STATIC);
    }
    let mut symbol = Symbol::new(SymbolKind::Method, name).with_modifiers(modifiers);
    symbol.scope = Some(class_name.to_string());
    if !return_type.is_empty() {
        symbol.type_string = Some(return_type.to_string());
    }
    let method = table.add_child(class, symbol);
    for (type_string, param_name, default) in params {
        let mut param = Symbol::new(SymbolKind::Parameter, *param_name);
        param.type_string = Some((*type_string).to_string());
        param.value = default.map(|d| d.to_string());
        param.scope = Some(format!("{class_name}::{name}"));
        table.add_child(method, param);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::symbol_store::SymbolStore;

    #[test]
    fn test_builtins_install_and_resolve() {
        let mut store = SymbolStore::new();
        store.add(builtin_table());
        assert_eq!(store.find("strlen", |_| true).len(), 1);
        assert_eq!(store.find("Exception", |_| true).len(), 1);
        assert_eq!(store.find("PHP_EOL", |_| true).len(), 1);
        // constants stay case-sensitive
        assert!(store.find("php_eol", |_| true).is_empty());
    }

    #[test]
    fn test_superglobals_searchable_without_location() {
        let mut store = SymbolStore::new();
        store.add(builtin_table());
        let found = store.find("$_SERVER", |_| true);
        assert_eq!(found.len(), 1);
        assert!(store.symbol(&found[0]).unwrap().location.is_none());
    }

    #[test]
    fn test_exception_members_via_aggregator() {
        use crate::semantic::member_aggregator::{MemberAggregator, MergeStrategy};
        let mut store = SymbolStore::new();
        store.add(builtin_table());
        let aggregator = MemberAggregator::new(&store);
        let members = aggregator.members("RuntimeException", MergeStrategy::Override);
        let names: Vec<_> = members
            .iter()
            .filter_map(|h| store.symbol(h))
            .map(|s| s.name.as_str().to_string())
            .collect();
        assert!(names.contains(&"getMessage".to_string()), "inherited from Exception");
    }
}
