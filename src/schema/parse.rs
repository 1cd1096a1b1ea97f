//! Line-based parser for the bracket-nested schema text format.
//!
//! Section headers nest by bracket count (`[a]`, `[[b]]`); everything else
//! is a scalar declaration `name = check # comment` or a comment/blank line.

use indexmap::IndexMap;

use super::{parse_check, ScalarSpec, SchemaError, SectionSpec};

#[derive(Debug, Default)]
struct RawSection {
    scalars: IndexMap<String, ScalarSpec>,
    children: IndexMap<String, RawSection>,
}

pub(crate) fn parse_schema(text: &str) -> Result<SectionSpec, SchemaError> {
    // Stack of open sections; index equals nesting depth.
    let mut stack: Vec<(Option<String>, RawSection)> = vec![(None, RawSection::default())];

    for (index, raw_line) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if trimmed.starts_with('[') {
            let (depth, name) = parse_header(trimmed, line)?;
            while stack.len() > depth {
                pop_section(&mut stack);
            }
            if stack.len() < depth {
                return Err(SchemaError::Parse {
                    line,
                    message: format!("section '[{name}]' skips a nesting level"),
                });
            }
            let parent = &stack.last().expect("root never popped").1;
            if parent.children.contains_key(&name) || parent.scalars.contains_key(&name) {
                return Err(SchemaError::Parse {
                    line,
                    message: format!("duplicate name '{name}'"),
                });
            }
            stack.push((Some(name), RawSection::default()));
            continue;
        }

        let (name, check_src, comment) = split_scalar_line(trimmed, line)?;
        if name == "__many__" {
            return Err(SchemaError::Parse {
                line,
                message: "repeatable scalars are not supported".to_string(),
            });
        }
        let parsed = parse_check(&check_src, line)?;
        let mut spec = ScalarSpec::from_parts(
            parsed.type_name,
            parsed.args,
            parsed.kwargs,
            parsed.default,
            None,
        );
        if let Some(comment) = comment {
            spec = spec.with_comment(comment);
        }

        let top = &mut stack.last_mut().expect("root never popped").1;
        if top.scalars.contains_key(&name) || top.children.contains_key(&name) {
            return Err(SchemaError::Parse {
                line,
                message: format!("duplicate name '{name}'"),
            });
        }
        top.scalars.insert(name, spec);
    }

    while stack.len() > 1 {
        pop_section(&mut stack);
    }
    let (_, root) = stack.pop().expect("root present");
    build(root)
}

fn pop_section(stack: &mut Vec<(Option<String>, RawSection)>) {
    let (name, section) = stack.pop().expect("caller checks depth");
    let name = name.expect("only root is unnamed");
    stack
        .last_mut()
        .expect("root never popped")
        .1
        .children
        .insert(name, section);
}

fn build(raw: RawSection) -> Result<SectionSpec, SchemaError> {
    let mut spec = SectionSpec::new();
    for (name, scalar) in raw.scalars {
        spec.insert_scalar(name, scalar);
    }
    for (name, child) in raw.children {
        let child = build(child)?;
        if name == "__many__" {
            spec.set_wildcard(child);
        } else {
            spec.insert_section(name, child);
        }
    }
    Ok(spec)
}

/// Parses `[name]` / `[[name]]` headers; returns (depth, name).
fn parse_header(line: &str, line_no: usize) -> Result<(usize, String), SchemaError> {
    let bad = |message: String| SchemaError::Parse {
        line: line_no,
        message,
    };

    let depth = line.chars().take_while(|&c| c == '[').count();
    let rest = &line[depth..];
    let Some(close) = rest.find(']') else {
        return Err(bad("unclosed section header".to_string()));
    };
    let name = rest[..close].trim();
    let name = name
        .strip_prefix('\'')
        .and_then(|n| n.strip_suffix('\''))
        .or_else(|| name.strip_prefix('"').and_then(|n| n.strip_suffix('"')))
        .unwrap_or(name);
    if name.is_empty() {
        return Err(bad("empty section name".to_string()));
    }

    let after = &rest[close..];
    let closers = after.chars().take_while(|&c| c == ']').count();
    if closers != depth {
        return Err(bad(format!(
            "section header has {depth} opening and {closers} closing brackets"
        )));
    }
    let trailing = after[closers..].trim();
    if !trailing.is_empty() && !trailing.starts_with('#') {
        return Err(bad(format!("unexpected text after section header: '{trailing}'")));
    }

    Ok((depth, name.to_string()))
}

/// Splits `name = check # comment`, honoring quotes in the check part.
fn split_scalar_line(
    line: &str,
    line_no: usize,
) -> Result<(String, String, Option<String>), SchemaError> {
    let Some(eq) = line.find('=') else {
        return Err(SchemaError::Parse {
            line: line_no,
            message: format!("expected 'name = check' or a section header: '{line}'"),
        });
    };
    let name = line[..eq].trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(SchemaError::Parse {
            line: line_no,
            message: format!("bad scalar name '{name}'"),
        });
    }

    let rest = &line[eq + 1..];
    let mut in_quote: Option<char> = None;
    let mut split_at = rest.len();
    for (i, c) in rest.char_indices() {
        match in_quote {
            Some(q) if c == q => in_quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => in_quote = Some(c),
            None if c == '#' => {
                split_at = i;
                break;
            }
            None => {}
        }
    }

    let check_src = rest[..split_at].trim().to_string();
    if check_src.is_empty() {
        return Err(SchemaError::Parse {
            line: line_no,
            message: format!("scalar '{name}' has no check expression"),
        });
    }
    let comment = rest[split_at..]
        .trim_start_matches('#')
        .trim()
        .to_string();
    let comment = (!comment.is_empty()).then_some(comment);

    Ok((name.to_string(), check_src, comment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    const SCHEMA: &str = "\
# top-level comment
interval = float(default=1.0, min=0.1)  # poll interval, seconds
name = string(min=1)

[logging]
level = option('debug', 'info', 'warn', default='info')

[servers]
[[__many__]]
enabled = boolean(default=True)
host = ip_addr(default='127.0.0.1')
[[fallback]]
enabled = boolean(default=False)
";

    #[test]
    fn test_parses_nested_structure() {
        let root = parse_schema(SCHEMA).unwrap();
        assert!(root.scalar("interval").is_some());
        assert_eq!(
            root.scalar("interval").unwrap().comment(),
            Some("poll interval, seconds")
        );
        assert!(root.section("logging").is_some());

        let servers = root.section("servers").unwrap();
        let many = servers.wildcard().expect("wildcard template");
        assert_eq!(
            many.scalar("enabled").unwrap().default(),
            Some(&Value::Str("True".to_string()))
        );
        assert!(servers.section("fallback").is_some());
    }

    #[test]
    fn test_declaration_order_preserved() {
        let root = parse_schema(SCHEMA).unwrap();
        let names: Vec<&str> = root.scalars().map(|(name, _)| name).collect();
        assert_eq!(names, ["interval", "name"]);
    }

    #[test]
    fn test_depth_jump_rejected() {
        let err = parse_schema("[a]\n[[[c]]]\nx = integer\n").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        assert!(parse_schema("x = integer\nx = float\n").is_err());
        assert!(parse_schema("[a]\nx = integer\n[a]\ny = float\n").is_err());
    }

    #[test]
    fn test_sibling_after_nested_section() {
        let root = parse_schema("[a]\n[[inner]]\nx = integer\n[b]\ny = float\n").unwrap();
        assert!(root.section("a").unwrap().section("inner").is_some());
        assert!(root.section("b").unwrap().scalar("y").is_some());
    }

    #[test]
    fn test_repeatable_scalar_rejected() {
        assert!(parse_schema("__many__ = integer\n").is_err());
    }

    #[test]
    fn test_hash_inside_quotes_not_a_comment() {
        let root = parse_schema("tag = string(default='#1')\n").unwrap();
        assert_eq!(
            root.scalar("tag").unwrap().default(),
            Some(&Value::Str("#1".to_string()))
        );
        assert_eq!(root.scalar("tag").unwrap().comment(), None);
    }
}
