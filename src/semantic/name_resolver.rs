//! Name resolution: namespace and import rules.
//!
//! Converts a written name into its fully qualified form given the current
//! namespace, the `use` rules declared so far, and the enclosing class for
//! `self`/`parent`/`static`. The resolver reflects only declarations that
//! lexically precede the query point; readers feed it as they walk.

use tracing::trace;

use super::type_string;

/// Identifier kind disambiguating import-rule lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    Class,
    Function,
    Constant,
}

/// One `use` import binding
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRule {
    pub kind: NameKind,
    /// Alias visible in this file (the clause alias, or the target tail)
    pub alias: String,
    /// Fully qualified target
    pub fqn: String,
}

/// Outcome of resolving a written name
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedName {
    pub fqn: String,
    /// The written form, kept when the runtime may fall back to another
    /// binding (unqualified functions/constants) or when resolution is
    /// deferred (`self`/`parent`/`static`)
    pub alt_name: Option<String>,
}

impl ResolvedName {
    fn plain(fqn: String) -> Self {
        Self {
            fqn,
            alt_name: None,
        }
    }
}

/// Enclosing class context for reserved-name resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ClassContext {
    pub fqn: String,
    pub base: Option<String>,
}

/// Per-lexical-point resolver state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameResolver {
    namespace: String,
    rules: Vec<ImportRule>,
    class_stack: Vec<ClassContext>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = namespace.into();
    }

    pub fn rules(&self) -> &[ImportRule] {
        &self.rules
    }

    /// Append an import rule. Rules are ordered by declaration position.
    pub fn add_rule(&mut self, rule: ImportRule) {
        trace!(
            "[RESOLVER] use {:?} {} => {}",
            rule.kind, rule.alias, rule.fqn
        );
        self.rules.push(rule);
    }

    pub fn push_class(&mut self, context: ClassContext) {
        self.class_stack.push(context);
    }

    pub fn pop_class(&mut self) {
        self.class_stack.pop();
    }

    pub fn current_class(&self) -> Option<&ClassContext> {
        self.class_stack.last()
    }

    /// Resolve a written name to its FQN for the given identifier kind.
    pub fn resolve(&self, written: &str, kind: NameKind) -> ResolvedName {
        if written.is_empty() {
            return ResolvedName::plain(String::new());
        }

        // Reserved class names resolve later against the class stack
        if kind == NameKind::Class && is_reserved_class_name(written) {
            let fqn = self
                .resolve_reserved(written)
                .unwrap_or_default();
            return ResolvedName {
                fqn,
                alt_name: Some(written.to_string()),
            };
        }

        // Fully qualified: strip the leading separator
        if let Some(rest) = written.strip_prefix('\\') {
            return ResolvedName::plain(rest.to_string());
        }

        // Relative: replace the `namespace` prefix with the current namespace
        if let Some(rest) = strip_relative_prefix(written) {
            return ResolvedName::plain(self.prepend_namespace(rest));
        }

        if let Some((head, rest)) = written.split_once('\\') {
            // Qualified: only class-kind imports apply to the first segment
            if let Some(rule) = self.find_rule(head, NameKind::Class) {
                return ResolvedName::plain(format!("{}\\{}", rule.fqn, rest));
            }
            return ResolvedName::plain(self.prepend_namespace(written));
        }

        // Unqualified
        if let Some(rule) = self.find_rule(written, kind) {
            return ResolvedName::plain(rule.fqn.clone());
        }
        let fqn = self.prepend_namespace(written);
        match kind {
            // The runtime falls back to the global binding when the
            // namespaced function/constant is absent
            NameKind::Function | NameKind::Constant if !self.namespace.is_empty() => {
                ResolvedName {
                    fqn,
                    alt_name: Some(written.to_string()),
                }
            }
            _ => ResolvedName::plain(fqn),
        }
    }

    /// Resolve `self`/`static`/`parent` against the class stack.
    pub fn resolve_reserved(&self, written: &str) -> Option<String> {
        let context = self.current_class()?;
        if written.eq_ignore_ascii_case("self") || written.eq_ignore_ascii_case("static") {
            Some(context.fqn.clone())
        } else if written.eq_ignore_ascii_case("parent") {
            context.base.clone()
        } else {
            None
        }
    }

    /// Resolve every non-scalar atom of a type string.
    pub fn resolve_type_string(&self, written: &str) -> String {
        type_string::name_resolve(written, |atom| self.resolve(atom, NameKind::Class).fqn)
    }

    fn find_rule(&self, alias: &str, kind: NameKind) -> Option<&ImportRule> {
        self.rules.iter().find(|rule| {
            rule.kind == kind
                && match kind {
                    // Constants are case-sensitive; classes and functions fold
                    NameKind::Constant => rule.alias == alias,
                    _ => rule.alias.eq_ignore_ascii_case(alias),
                }
        })
    }

    fn prepend_namespace(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}\\{}", self.namespace, name)
        }
    }
}

fn is_reserved_class_name(written: &str) -> bool {
    written.eq_ignore_ascii_case("self")
        || written.eq_ignore_ascii_case("parent")
        || written.eq_ignore_ascii_case("static")
}

fn strip_relative_prefix(written: &str) -> Option<&str> {
    let (head, rest) = written.split_once('\\')?;
    if head.eq_ignore_ascii_case("namespace") {
        Some(rest)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_in(namespace: &str) -> NameResolver {
        let mut resolver = NameResolver::new();
        resolver.set_namespace(namespace);
        resolver
    }

    #[test]
    fn test_fully_qualified() {
        let resolver = resolver_in("App");
        let resolved = resolver.resolve("\\Other\\Thing", NameKind::Class);
        assert_eq!(resolved.fqn, "Other\\Thing");
        assert!(resolved.alt_name.is_none());
    }

    #[test]
    fn test_relative() {
        let resolver = resolver_in("App");
        let resolved = resolver.resolve("namespace\\Sub\\Thing", NameKind::Class);
        assert_eq!(resolved.fqn, "App\\Sub\\Thing");
    }

    #[test]
    fn test_unqualified_import_wins() {
        let mut resolver = resolver_in("App");
        resolver.add_rule(ImportRule {
            kind: NameKind::Class,
            alias: "C".to_string(),
            fqn: "B\\C".to_string(),
        });
        let resolved = resolver.resolve("C", NameKind::Class);
        assert_eq!(resolved.fqn, "B\\C");
        assert!(resolved.alt_name.is_none());
    }

    #[test]
    fn test_unqualified_falls_back_to_namespace() {
        let resolver = resolver_in("App");
        let resolved = resolver.resolve("C", NameKind::Class);
        assert_eq!(resolved.fqn, "App\\C");
        assert!(resolved.alt_name.is_none());
    }

    #[test]
    fn test_unqualified_function_records_alt_name() {
        let resolver = resolver_in("App");
        let resolved = resolver.resolve("strlen", NameKind::Function);
        assert_eq!(resolved.fqn, "App\\strlen");
        assert_eq!(resolved.alt_name.as_deref(), Some("strlen"));
    }

    #[test]
    fn test_unqualified_function_in_global_namespace() {
        let resolver = resolver_in("");
        let resolved = resolver.resolve("strlen", NameKind::Function);
        assert_eq!(resolved.fqn, "strlen");
        assert!(resolved.alt_name.is_none());
    }

    #[test]
    fn test_qualified_consults_class_imports_only() {
        let mut resolver = resolver_in("App");
        resolver.add_rule(ImportRule {
            kind: NameKind::Class,
            alias: "C".to_string(),
            fqn: "B\\C".to_string(),
        });
        resolver.add_rule(ImportRule {
            kind: NameKind::Function,
            alias: "f".to_string(),
            fqn: "B\\f".to_string(),
        });
        let resolved = resolver.resolve("C\\Inner", NameKind::Class);
        assert_eq!(resolved.fqn, "B\\C\\Inner");
        // A function import never matches a qualified first segment
        let resolved = resolver.resolve("f\\x", NameKind::Class);
        assert_eq!(resolved.fqn, "App\\f\\x");
    }

    #[test]
    fn test_import_alias_case_sensitivity() {
        let mut resolver = resolver_in("");
        resolver.add_rule(ImportRule {
            kind: NameKind::Class,
            alias: "Conn".to_string(),
            fqn: "Db\\Conn".to_string(),
        });
        resolver.add_rule(ImportRule {
            kind: NameKind::Constant,
            alias: "LIMIT".to_string(),
            fqn: "Db\\LIMIT".to_string(),
        });
        assert_eq!(resolver.resolve("conn", NameKind::Class).fqn, "Db\\Conn");
        assert_eq!(resolver.resolve("limit", NameKind::Constant).fqn, "limit");
    }

    #[test]
    fn test_reserved_names_use_class_stack() {
        let mut resolver = resolver_in("App");
        resolver.push_class(ClassContext {
            fqn: "App\\B".to_string(),
            base: Some("App\\A".to_string()),
        });
        let resolved = resolver.resolve("self", NameKind::Class);
        assert_eq!(resolved.fqn, "App\\B");
        assert_eq!(resolved.alt_name.as_deref(), Some("self"));
        let resolved = resolver.resolve("parent", NameKind::Class);
        assert_eq!(resolved.fqn, "App\\A");
        assert_eq!(resolved.alt_name.as_deref(), Some("parent"));
    }

    #[test]
    fn test_type_string_resolution() {
        let mut resolver = resolver_in("App");
        resolver.add_rule(ImportRule {
            kind: NameKind::Class,
            alias: "C".to_string(),
            fqn: "B\\C".to_string(),
        });
        assert_eq!(
            resolver.resolve_type_string("C[]|int|Other"),
            "B\\C[]|int|App\\Other"
        );
    }
}
