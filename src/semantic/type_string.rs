//! Type-string algebra.
//!
//! Types are canonical `|`-joined unions of atoms; a trailing `[]` denotes
//! array-of. Object atoms are fully qualified names once resolved; scalar
//! tokens pass through every operation verbatim.

/// Tokens that are never namespace-resolved
const SCALAR_TOKENS: &[&str] = &[
    "int", "string", "bool", "float", "iterable", "void", "self", "static", "parent", "array",
    "callable", "mixed", "null", "object",
];

/// Check whether an atom is a scalar token (case-insensitive, `[]` ignored)
pub fn is_scalar(atom: &str) -> bool {
    let base = atom.trim_end_matches("[]");
    SCALAR_TOKENS.iter().any(|s| base.eq_ignore_ascii_case(s))
}

/// Iterate the atoms of a type string
pub fn atoms(type_string: &str) -> impl Iterator<Item = &str> {
    type_string.split('|').filter(|a| !a.is_empty())
}

/// Set-union of two type strings.
///
/// Commutative up to atom order, associative, idempotent. Exact duplicate
/// atoms are dropped (case-sensitive, as written).
pub fn merge(a: &str, b: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for atom in atoms(a).chain(atoms(b)) {
        if !out.contains(&atom) {
            out.push(atom);
        }
    }
    out.join("|")
}

/// Strip one `[]` level from each atom.
///
/// Atoms without a `[]` suffix are not indexable and are dropped; an empty
/// result degrades to `mixed`.
pub fn array_dereference(type_string: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for atom in atoms(type_string) {
        if let Some(inner) = atom.strip_suffix("[]") {
            if !inner.is_empty() && !out.contains(&inner) {
                out.push(inner);
            }
        }
    }
    if out.is_empty() {
        "mixed".to_string()
    } else {
        out.join("|")
    }
}

/// Add one `[]` level to each atom
pub fn array_reference(type_string: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for atom in atoms(type_string) {
        let suffixed = format!("{atom}[]");
        if !out.contains(&suffixed) {
            out.push(suffixed);
        }
    }
    out.join("|")
}

/// Object-class atoms: neither scalar nor array-typed, `[]` suffix stripped.
///
/// These are the candidates for object member lookup.
pub fn atomic_class_array(type_string: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for atom in atoms(type_string) {
        if atom.ends_with("[]") || is_scalar(atom) {
            continue;
        }
        let name = atom.to_string();
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// Resolve each non-scalar atom through `resolve`, preserving `[]` suffixes
/// and scalar tokens verbatim.
pub fn name_resolve(type_string: &str, resolve: impl Fn(&str) -> String) -> String {
    let mut out: Vec<String> = Vec::new();
    for atom in atoms(type_string) {
        let resolved = if is_scalar(atom) {
            atom.to_string()
        } else {
            let mut suffix_len = 0;
            let mut base = atom;
            while let Some(stripped) = base.strip_suffix("[]") {
                base = stripped;
                suffix_len += 1;
            }
            let mut resolved = resolve(base);
            if resolved.is_empty() {
                resolved = base.to_string();
            }
            resolved.push_str(&"[]".repeat(suffix_len));
            resolved
        };
        if !out.contains(&resolved) {
            out.push(resolved);
        }
    }
    out.join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_laws() {
        assert_eq!(merge("A", ""), "A");
        assert_eq!(merge("", "A"), "A");
        assert_eq!(merge("A", "A"), "A");
        assert_eq!(merge("A|B", "B|C"), "A|B|C");
        // commutative up to ordering: compare as sets
        let ab = merge("A", "B");
        let ba = merge("B", "A");
        let mut left: Vec<_> = atoms(&ab).collect();
        let mut right: Vec<_> = atoms(&ba).collect();
        left.sort_unstable();
        right.sort_unstable();
        assert_eq!(left, right);
    }

    #[test]
    fn test_merge_case_sensitive_atoms() {
        assert_eq!(merge("Foo", "foo"), "Foo|foo");
    }

    #[test]
    fn test_array_dereference() {
        assert_eq!(array_dereference("A[]|B"), "A");
        assert_eq!(array_dereference("A[][]"), "A[]");
        assert_eq!(array_dereference("int"), "mixed");
        assert_eq!(array_dereference(""), "mixed");
    }

    #[test]
    fn test_array_round_trip() {
        let original = "A|B\\C";
        assert_eq!(array_dereference(&array_reference(original)), original);
    }

    #[test]
    fn test_atomic_class_array() {
        assert_eq!(
            atomic_class_array("A\\B|int|C[]|null|D"),
            vec!["A\\B".to_string(), "D".to_string()]
        );
    }

    #[test]
    fn test_name_resolve_preserves_scalars() {
        let resolved = name_resolve("C|int|null|C[]", |name| format!("App\\{name}"));
        assert_eq!(resolved, "App\\C|int|null|App\\C[]");
    }

    #[test]
    fn test_is_scalar_case_insensitive() {
        assert!(is_scalar("Int"));
        assert!(is_scalar("NULL"));
        assert!(is_scalar("string[]"));
        assert!(!is_scalar("Stringy"));
    }
}
