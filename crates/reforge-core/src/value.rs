//! Closed value model for test inputs and execution outputs
//!
//! Every value that crosses the execution boundary (synthesized inputs,
//! oracle expectations, variant outputs) is one of these shapes. The wire
//! form is adjacently tagged JSON (`{"t": "int", "v": 3}`) so the runner
//! script on the other side of the boundary can encode and decode without
//! guessing; non-finite floats travel as strings because JSON has no
//! representation for them.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A value flowing through the harness.
///
/// `Raw` carries the textual rendering of anything the wire codec could not
/// type; it only ever matches another value through the representation
/// fallback of the comparator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "lowercase")]
pub enum Value {
    /// Absence of a value (`None` on the interpreter side)
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Double-precision float; non-finite values are legal
    Float(#[serde(with = "float_wire")] f64),
    /// String
    Str(String),
    /// Ordered sequence
    List(Vec<Value>),
    /// String-keyed mapping with deterministic iteration order
    Dict(BTreeMap<String, Value>),
    /// Unordered collection; the total order on `Value` keeps it canonical
    Set(BTreeSet<Value>),
    /// Untyped textual representation
    Raw(String),
}

impl Value {
    /// Build a string value
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Build a list value
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    /// Build a set value
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Set(items.into_iter().collect())
    }

    /// Build a dict value from string keys
    pub fn dict<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Numeric view, if this value is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Rank used for cross-type total ordering
    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Str(_) => 4,
            Value::List(_) => 5,
            Value::Dict(_) => 6,
            Value::Set(_) => 7,
            Value::Raw(_) => 8,
        }
    }
}

// Exact structural equality via the total order; numeric tolerance lives in
// the comparator, not here. NaN equals itself so sets stay well-formed.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Dict(a), Value::Dict(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::Raw(a), Value::Raw(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl fmt::Display for Value {
    /// Interpreter-literal rendering, used for logs, the report table, and
    /// the representation-equality fallback of the comparator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", format_float(*v)),
            Value::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Set(items) => {
                if items.is_empty() {
                    return write!(f, "set()");
                }
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
            Value::Raw(s) => write!(f, "{}", s),
        }
    }
}

fn format_float(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if v == v.trunc() && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Wire codec for floats: finite values as JSON numbers, non-finite values
/// as the strings `"inf"`, `"-inf"`, `"nan"`.
mod float_wire {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Number(f64),
            Text(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Number(n) => Ok(n),
            Wire::Text(s) => match s.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(serde::de::Error::custom(format!(
                    "unrecognized float literal: {other}"
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality_is_exact() {
        assert_eq!(Value::Int(1), Value::Int(1));
        // Cross-type numeric equality belongs to the comparator, not here
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_eq!(
            Value::list([Value::Int(1), Value::Int(2)]),
            Value::list([Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_nan_is_self_equal() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn test_set_order_is_canonical() {
        let a = Value::set([Value::Int(3), Value::Int(1), Value::Int(2)]);
        let b = Value::set([Value::Int(2), Value::Int(3), Value::Int(1)]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "{1, 2, 3}");
    }

    #[test]
    fn test_wire_round_trip() {
        let values = vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(-9999),
            Value::Float(3.14159),
            Value::str("123abc"),
            Value::list([Value::Int(1), Value::str("a")]),
            Value::dict([("key", Value::str("value"))]),
            Value::set([Value::Int(1), Value::Int(2)]),
        ];
        for value in values {
            let json = serde_json::to_string(&value).unwrap();
            let back: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value, back);
        }
    }

    #[test]
    fn test_wire_infinity_as_string() {
        let json = serde_json::to_string(&Value::Float(f64::INFINITY)).unwrap();
        assert_eq!(json, r#"{"t":"float","v":"inf"}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_display_matches_interpreter_literals() {
        assert_eq!(Value::Null.to_string(), "None");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::str("test").to_string(), "'test'");
        assert_eq!(
            Value::dict([("key", Value::str("value"))]).to_string(),
            "{'key': 'value'}"
        );
        assert_eq!(Value::Set(BTreeSet::new()).to_string(), "set()");
    }
}
