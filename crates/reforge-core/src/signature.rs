//! Function signature discovery and type classification
//!
//! Candidate sources are plain text. The harness makes exactly one
//! assumption about their shape: each source defines one target callable,
//! resolved as the first `def` whose name does not start with an underscore.
//! Everything else here is a best-effort reading of that callable's
//! parameter list: good enough to drive input synthesis, never a type
//! checker.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// Category a parameter's declared type maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeCategory {
    Int,
    Float,
    Str,
    Bool,
    List,
    Dict,
    Set,
    Unknown,
}

impl TypeCategory {
    /// Classify a type annotation string.
    ///
    /// Lowercase substring match; first hit in the fixed priority order
    /// wins, so `List[int]` classifies as `Int`. Best-effort only;
    /// callers degrade to the `Unknown` pool rather than failing.
    pub fn classify(annotation: &str) -> Self {
        let lowered = annotation.to_lowercase();
        const PRIORITY: [(&str, TypeCategory); 7] = [
            ("int", TypeCategory::Int),
            ("float", TypeCategory::Float),
            ("str", TypeCategory::Str),
            ("list", TypeCategory::List),
            ("dict", TypeCategory::Dict),
            ("set", TypeCategory::Set),
            ("bool", TypeCategory::Bool),
        ];
        for (needle, category) in PRIORITY {
            if lowered.contains(needle) {
                return category;
            }
        }
        TypeCategory::Unknown
    }
}

/// One declared parameter of the target callable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name as written in the source
    pub name: String,

    /// Category derived from the annotation (`Unknown` when absent)
    pub category: TypeCategory,

    /// Whether the parameter declares a default
    pub has_default: bool,

    /// The default, when it is a literal the harness can read
    pub default: Option<Value>,
}

/// Ordered parameter list of the target callable, derived once from source
/// text and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Name of the discovered callable
    pub name: String,

    /// Positional parameters in declaration order
    pub params: Vec<ParameterSpec>,
}

impl FunctionSignature {
    /// Discover the target callable in a source blob and derive its
    /// signature.
    ///
    /// Returns [`EvalError::InvalidSource`] when no public `def` exists;
    /// that is the one shape requirement the harness places on candidates.
    pub fn parse(source: &str) -> EvalResult<Self> {
        let def_re = Regex::new(r"(?m)^\s*def\s+([A-Za-z][A-Za-z0-9_]*)\s*\(")
            .expect("static regex");

        for caps in def_re.captures_iter(source) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if name.starts_with('_') {
                continue;
            }
            let open = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let param_text = match read_balanced(&source[open..]) {
                Some(inner) => inner,
                None => continue,
            };
            let params = parse_params(param_text);
            return Ok(Self {
                name: name.to_string(),
                params,
            });
        }

        Err(EvalError::InvalidSource(
            "no public callable found in source".to_string(),
        ))
    }

    /// Number of positional parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Read up to the parenthesis matching the one just consumed, returning the
/// text between them. Handles nested brackets and string literals so
/// annotated defaults like `x: dict = {"a": (1, 2)}` survive.
fn read_balanced(rest: &str) -> Option<&str> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (i, ch) in rest.char_indices() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&rest[..i]);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

fn parse_params(text: &str) -> Vec<ParameterSpec> {
    split_top_level(text, ',')
        .into_iter()
        .filter_map(|raw| parse_param(raw.trim()))
        .collect()
}

fn parse_param(raw: &str) -> Option<ParameterSpec> {
    if raw.is_empty() || raw.starts_with('*') || raw == "/" || raw == "self" {
        // *args / **kwargs / positional markers carry no synthesizable slot
        return None;
    }

    let (head, default_text) = match split_once_top_level(raw, '=') {
        Some((head, default)) => (head.trim(), Some(default.trim())),
        None => (raw, None),
    };

    let (name, annotation) = match split_once_top_level(head, ':') {
        Some((name, annotation)) => (name.trim(), Some(annotation.trim())),
        None => (head.trim(), None),
    };

    let category = annotation
        .map(TypeCategory::classify)
        .unwrap_or(TypeCategory::Unknown);

    let default = default_text.and_then(parse_literal);

    Some(ParameterSpec {
        name: name.to_string(),
        category,
        has_default: default_text.is_some(),
        default,
    })
}

/// Split on a separator, ignoring separators nested in brackets or quotes.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                c if c == sep && depth == 0 => {
                    parts.push(&text[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&text[start..]);
    parts
}

fn split_once_top_level(text: &str, sep: char) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                c if c == sep && depth == 0 => {
                    return Some((&text[..i], &text[i + c.len_utf8()..]));
                }
                _ => {}
            },
        }
    }
    None
}

/// Parse a literal default into a [`Value`]. Unreadable defaults yield
/// `None`; the parameter still records that a default exists.
fn parse_literal(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    match trimmed {
        "None" => return Some(Value::Null),
        "True" => return Some(Value::Bool(true)),
        "False" => return Some(Value::Bool(false)),
        "[]" => return Some(Value::List(Vec::new())),
        "{}" => return Some(Value::Dict(Default::default())),
        "set()" => return Some(Value::Set(Default::default())),
        _ => {}
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::Int(i));
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Some(Value::Float(f));
    }

    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0] as char, bytes[bytes.len() - 1] as char);
        if (first == '\'' || first == '"') && last == first {
            return Some(Value::Str(trimmed[1..trimmed.len() - 1].to_string()));
        }
    }

    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        let inner = &trimmed[1..trimmed.len() - 1];
        let items: Option<Vec<Value>> = split_top_level(inner, ',')
            .into_iter()
            .map(|item| parse_literal(item.trim()))
            .collect();
        return items.map(Value::List);
    }

    None
}
