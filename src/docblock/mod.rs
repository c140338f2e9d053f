//! Documentation-comment micro-parser.
//!
//! Extracts the tags the indexer consumes: `@param`, `@return`, `@var`,
//! `@property[-read|-write]`, `@method`, `@global`. Types are `|`-unions of
//! atoms with an optional `[]` suffix; they are resolved against the
//! surrounding name resolver at tag-application time, not here.

/// Parsed `/** ... */` comment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocBlock {
    /// First text paragraph
    pub summary: String,
    /// Remaining text paragraphs
    pub description: String,
    pub params: Vec<ParamTag>,
    pub return_tag: Option<TypeTag>,
    pub vars: Vec<VarTag>,
    pub properties: Vec<PropertyTag>,
    pub methods: Vec<MethodTag>,
    pub globals: Vec<VarTag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamTag {
    pub type_string: String,
    /// Includes the `$` sigil
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeTag {
    pub type_string: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarTag {
    pub type_string: String,
    pub name: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAccess {
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTag {
    pub access: PropertyAccess,
    pub type_string: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodTagParam {
    pub type_string: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodTag {
    pub is_static: bool,
    pub return_type: String,
    pub name: String,
    pub params: Vec<MethodTagParam>,
    pub description: String,
}

impl DocBlock {
    /// Look up the documented type of a parameter by `$name`
    pub fn param(&self, name: &str) -> Option<&ParamTag> {
        self.params.iter().find(|p| p.name == name)
    }

    /// First `@var` tag matching `$name`, or the first anonymous one
    pub fn var(&self, name: &str) -> Option<&VarTag> {
        self.vars
            .iter()
            .find(|v| v.name.as_deref() == Some(name))
            .or_else(|| self.vars.iter().find(|v| v.name.is_none()))
    }
}

/// Parse a `/** ... */` comment body.
pub fn parse(text: &str) -> DocBlock {
    let mut block = DocBlock::default();
    let mut text_lines: Vec<String> = Vec::new();

    for raw in strip_delimiters(text).lines() {
        let line = strip_leading_star(raw);
        if let Some(rest) = line.strip_prefix('@') {
            parse_tag(&mut block, rest);
        } else {
            text_lines.push(line.to_string());
        }
    }

    // Summary = first paragraph, description = the rest
    let joined = text_lines.join("\n");
    let trimmed = joined.trim();
    if let Some((summary, rest)) = trimmed.split_once("\n\n") {
        block.summary = summary.trim().to_string();
        block.description = rest.trim().to_string();
    } else {
        block.summary = trimmed.to_string();
    }
    block
}

fn strip_delimiters(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("/**").unwrap_or(text);
    text.strip_suffix("*/").unwrap_or(text)
}

fn strip_leading_star(line: &str) -> &str {
    let trimmed = line.trim_start();
    let trimmed = trimmed.strip_prefix('*').unwrap_or(trimmed);
    trimmed.strip_prefix(' ').unwrap_or(trimmed)
}

fn parse_tag(block: &mut DocBlock, rest: &str) {
    let (tag, body) = match rest.split_once(char::is_whitespace) {
        Some((tag, body)) => (tag, body.trim()),
        None => (rest, ""),
    };
    match tag {
        "param" => {
            let (type_string, rest) = take_word(body);
            let (name, description) = take_word(rest);
            if !type_string.is_empty() && name.starts_with('$') {
                block.params.push(ParamTag {
                    type_string: type_string.to_string(),
                    name: name.to_string(),
                    description: description.to_string(),
                });
            }
        }
        "return" => {
            let (type_string, description) = take_word(body);
            if !type_string.is_empty() {
                block.return_tag = Some(TypeTag {
                    type_string: type_string.to_string(),
                    description: description.to_string(),
                });
            }
        }
        "var" => {
            if let Some(tag) = parse_var_body(body) {
                block.vars.push(tag);
            }
        }
        "global" => {
            if let Some(tag) = parse_var_body(body) {
                block.globals.push(tag);
            }
        }
        "property" | "property-read" | "property-write" => {
            let access = match tag {
                "property-read" => PropertyAccess::ReadOnly,
                "property-write" => PropertyAccess::WriteOnly,
                _ => PropertyAccess::ReadWrite,
            };
            let (type_string, rest) = take_word(body);
            let (name, description) = take_word(rest);
            if !type_string.is_empty() && name.starts_with('$') {
                block.properties.push(PropertyTag {
                    access,
                    type_string: type_string.to_string(),
                    name: name.to_string(),
                    description: description.to_string(),
                });
            }
        }
        "method" => {
            if let Some(tag) = parse_method_body(body) {
                block.methods.push(tag);
            }
        }
        _ => {}
    }
}

fn parse_var_body(body: &str) -> Option<VarTag> {
    let (type_string, rest) = take_word(body);
    if type_string.is_empty() {
        return None;
    }
    let (maybe_name, description) = take_word(rest);
    if maybe_name.starts_with('$') {
        Some(VarTag {
            type_string: type_string.to_string(),
            name: Some(maybe_name.to_string()),
            description: description.to_string(),
        })
    } else {
        Some(VarTag {
            type_string: type_string.to_string(),
            name: None,
            description: rest.trim().to_string(),
        })
    }
}

/// `@method [static] <returnType> name(<type $p, ...>) <desc>`
fn parse_method_body(body: &str) -> Option<MethodTag> {
    let (first, rest) = take_word(body);
    let (is_static, return_type, rest) = if first == "static" {
        let (ret, rest) = take_word(rest);
        (true, ret, rest)
    } else {
        (false, first, rest)
    };
    if return_type.is_empty() {
        return None;
    }

    // The name runs up to the parameter list; a tag without parens documents
    // a method with no parameters
    let (signature, description) = match rest.find(')') {
        Some(close) => (&rest[..=close], rest[close + 1..].trim()),
        None => {
            let (name, description) = take_word(rest);
            if name.is_empty() {
                return None;
            }
            return Some(MethodTag {
                is_static,
                return_type: return_type.to_string(),
                name: name.trim_end_matches("()").to_string(),
                params: Vec::new(),
                description: description.to_string(),
            });
        }
    };
    let open = signature.find('(')?;
    let name = signature[..open].trim();
    if name.is_empty() {
        return None;
    }
    let mut params = Vec::new();
    let inner = &signature[open + 1..signature.len() - 1];
    for piece in inner.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let (first, second) = take_word(piece);
        let (type_string, name) = if first.starts_with('$') {
            ("mixed", first)
        } else {
            let (name, _) = take_word(second);
            (first, name)
        };
        if name.starts_with('$') {
            params.push(MethodTagParam {
                type_string: type_string.to_string(),
                name: name.split('=').next().unwrap_or(name).trim().to_string(),
            });
        }
    }
    Some(MethodTag {
        is_static,
        return_type: return_type.to_string(),
        name: name.to_string(),
        params,
        description: description.to_string(),
    })
}

fn take_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_and_description() {
        let block = parse("/**\n * Short summary.\n *\n * Longer body\n * over lines.\n */");
        assert_eq!(block.summary, "Short summary.");
        assert!(block.description.contains("Longer body"));
    }

    #[test]
    fn test_param_and_return() {
        let block = parse(
            "/**\n * @param int|string $id The identifier\n * @param A\\B $x\n * @return self|null on failure\n */",
        );
        assert_eq!(block.params.len(), 2);
        assert_eq!(block.params[0].type_string, "int|string");
        assert_eq!(block.params[0].name, "$id");
        assert_eq!(block.params[0].description, "The identifier");
        assert_eq!(block.params[1].type_string, "A\\B");
        let ret = block.return_tag.unwrap();
        assert_eq!(ret.type_string, "self|null");
    }

    #[test]
    fn test_var_with_and_without_name() {
        let anonymous = parse("/** @var Foo[] the rows */");
        assert_eq!(anonymous.vars[0].type_string, "Foo[]");
        assert_eq!(anonymous.vars[0].name, None);

        let named = parse("/** @var Foo $row */");
        assert_eq!(named.vars[0].name.as_deref(), Some("$row"));
    }

    #[test]
    fn test_property_tags() {
        let block = parse(
            "/**\n * @property int $count\n * @property-read string $name label\n * @property-write Foo $target\n */",
        );
        assert_eq!(block.properties.len(), 3);
        assert_eq!(block.properties[0].access, PropertyAccess::ReadWrite);
        assert_eq!(block.properties[1].access, PropertyAccess::ReadOnly);
        assert_eq!(block.properties[1].description, "label");
        assert_eq!(block.properties[2].access, PropertyAccess::WriteOnly);
    }

    #[test]
    fn test_method_tag() {
        let block = parse(
            "/** @method static Builder query(string $sql, array $bindings) Runs a query */",
        );
        let method = &block.methods[0];
        assert!(method.is_static);
        assert_eq!(method.return_type, "Builder");
        assert_eq!(method.name, "query");
        assert_eq!(method.params.len(), 2);
        assert_eq!(method.params[0].type_string, "string");
        assert_eq!(method.params[0].name, "$sql");
        assert_eq!(method.description, "Runs a query");
    }

    #[test]
    fn test_method_tag_untyped_params() {
        let block = parse("/** @method Foo make($a, $b) */");
        let method = &block.methods[0];
        assert_eq!(method.params.len(), 2);
        assert_eq!(method.params[0].type_string, "mixed");
    }

    #[test]
    fn test_global_tag() {
        let block = parse("/** @global Db\\Conn $db */");
        assert_eq!(block.globals[0].type_string, "Db\\Conn");
        assert_eq!(block.globals[0].name.as_deref(), Some("$db"));
    }
}
