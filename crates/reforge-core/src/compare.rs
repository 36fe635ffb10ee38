//! Differential output comparison
//!
//! Decides whether a variant's outcome on one input is equivalent to what
//! the oracle expects there. The check order is a contract: the
//! expected-failure rule first, then type-specific equivalence, and the
//! representation fallback only when no specific rule applies. Two values
//! that merely render alike are never silently equated while a specific
//! rule covers them.

use crate::value::Value;
use crate::variant::ExecutionOutcome;

/// Tolerance for numeric equivalence
pub const NUMERIC_EPSILON: f64 = 1e-9;

/// Judge one variant outcome against the oracle expectation for its case.
///
/// `expected == None` means the baseline failed on this input; the variant
/// is correct there iff it also fails. A variant that unexpectedly
/// succeeds on such a case is non-matching even though it "worked".
pub fn outputs_match(outcome: &ExecutionOutcome, expected: Option<&Value>) -> bool {
    match expected {
        None => !outcome.success,
        Some(want) => match outcome.value() {
            Some(got) => equivalent(got, want),
            None => false,
        },
    }
}

/// Type-directed equivalence between two successful outputs.
pub fn equivalent(got: &Value, want: &Value) -> bool {
    match (got, want) {
        (Value::List(a), Value::List(b)) => a == b,
        (Value::Dict(a), Value::Dict(b)) => a == b,
        (Value::Set(a), Value::Set(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => match (got.as_number(), want.as_number()) {
            (Some(a), Some(b)) => (a - b).abs() < NUMERIC_EPSILON,
            _ => got.to_string() == want.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(value: Value) -> ExecutionOutcome {
        ExecutionOutcome::success(value, 0.1)
    }

    fn failed() -> ExecutionOutcome {
        ExecutionOutcome::failure("TypeError: boom", 0.0)
    }

    #[test]
    fn test_expected_failure_requires_failure() {
        assert!(outputs_match(&failed(), None));
        // Succeeding where the baseline failed is wrong, even though it "worked"
        assert!(!outputs_match(&ok(Value::Int(3)), None));
    }

    #[test]
    fn test_failure_where_value_expected() {
        assert!(!outputs_match(&failed(), Some(&Value::Int(3))));
    }

    #[test]
    fn test_numeric_tolerance() {
        assert!(equivalent(&Value::Float(1.0000000001), &Value::Float(1.0)));
        assert!(!equivalent(&Value::Float(1.001), &Value::Float(1.0)));
        // Int and float compare cross-type
        assert!(equivalent(&Value::Int(2), &Value::Float(2.0)));
    }

    #[test]
    fn test_numeric_comparison_is_commutative() {
        let pairs = [
            (Value::Float(1.0), Value::Float(1.0 + 1e-12)),
            (Value::Int(5), Value::Float(5.2)),
            (Value::Float(f64::INFINITY), Value::Float(f64::INFINITY)),
        ];
        for (a, b) in pairs {
            assert_eq!(equivalent(&a, &b), equivalent(&b, &a));
        }
    }

    #[test]
    fn test_string_comparison_is_lenient() {
        assert!(equivalent(&Value::str("  Hello "), &Value::str("hello")));
        assert!(!equivalent(&Value::str("hello"), &Value::str("world")));
    }

    #[test]
    fn test_collections_require_exact_structure() {
        assert!(equivalent(
            &Value::list([Value::Int(1), Value::Int(2)]),
            &Value::list([Value::Int(1), Value::Int(2)]),
        ));
        assert!(!equivalent(
            &Value::list([Value::Int(2), Value::Int(1)]),
            &Value::list([Value::Int(1), Value::Int(2)]),
        ));
        // Structural equality inside collections is exact, not tolerant
        assert!(!equivalent(
            &Value::list([Value::Int(1)]),
            &Value::list([Value::Float(1.0)]),
        ));
    }

    #[test]
    fn test_specific_rules_precede_representation_fallback() {
        // A string that renders like a list is not a list
        assert!(!equivalent(&Value::str("[1, 2]"), &Value::list([Value::Int(1), Value::Int(2)])));
        // Both sides untyped: representation equality applies
        assert!(equivalent(&Value::Raw("<obj 1>".into()), &Value::Raw("<obj 1>".into())));
        assert!(equivalent(&Value::Null, &Value::Null));
        assert!(equivalent(&Value::Bool(true), &Value::Bool(true)));
        assert!(!equivalent(&Value::Bool(true), &Value::Int(1)));
    }
}
