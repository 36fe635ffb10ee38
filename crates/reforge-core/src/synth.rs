//! Test case synthesis
//!
//! Builds the bounded input set every candidate is judged on. The pools are
//! fixed literal tables keyed by parameter category, so for a given
//! signature the synthesizer always produces the same case sequence;
//! reproducibility is part of the contract, not an accident.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::signature::{FunctionSignature, ParameterSpec, TypeCategory};
use crate::value::Value;

/// Cases produced for a single-parameter signature
const SINGLE_PARAM_CASES: usize = 6;
/// Pool prefix taken per parameter when forming cross-products
const MULTI_PARAM_POOL: usize = 3;
/// Cap on cross-product size
const MULTI_PARAM_CAP: usize = 8;

/// One positional input tuple.
///
/// Generated once per signature and reused for the baseline and every
/// variant: every candidate is judged on exactly the same input set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Positional argument values; length equals signature arity
    pub args: Vec<Value>,
}

impl TestCase {
    /// Build a case from argument values
    pub fn new(args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            args: args.into_iter().collect(),
        }
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        if self.args.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

/// Synthesize the input set for a signature.
///
/// Arity 1 takes the first six pool values as standalone cases; higher
/// arities take the first three values per parameter and form the full
/// cross-product, truncated deterministically at eight tuples.
pub fn synthesize(signature: &FunctionSignature) -> Vec<TestCase> {
    let pools: Vec<Vec<Value>> = signature.params.iter().map(pool_for).collect();

    match pools.len() {
        0 => vec![TestCase::new([])],
        1 => pools[0]
            .iter()
            .take(SINGLE_PARAM_CASES)
            .map(|value| TestCase::new([value.clone()]))
            .collect(),
        _ => cross_product(&pools),
    }
}

/// Minimal input set used when synthesis degrades (e.g. the signature was
/// unparsable). Evaluation proceeds on these rather than aborting.
pub fn fallback_cases() -> Vec<TestCase> {
    vec![
        TestCase::new([Value::Int(0)]),
        TestCase::new([Value::Int(1)]),
        TestCase::new([Value::Int(5)]),
    ]
}

/// Literal pool for one parameter: the declared default first (when
/// readable), then the fixed table for its category.
fn pool_for(param: &ParameterSpec) -> Vec<Value> {
    let mut pool = Vec::new();
    if let Some(default) = &param.default {
        pool.push(default.clone());
    }
    pool.extend(category_pool(param.category));
    pool
}

fn category_pool(category: TypeCategory) -> Vec<Value> {
    match category {
        TypeCategory::Int => vec![
            Value::Int(0),
            Value::Int(1),
            Value::Int(-1),
            Value::Int(9999),
            Value::Int(-9999),
        ],
        TypeCategory::Float => vec![
            Value::Float(0.0),
            Value::Float(1.0),
            Value::Float(-1.0),
            Value::Float(3.14159),
            Value::Float(f64::INFINITY),
            Value::Float(f64::NEG_INFINITY),
        ],
        TypeCategory::Str => vec![
            Value::str(""),
            Value::str("a"),
            Value::str("test"),
            Value::str("long".repeat(100)),
            Value::str(" "),
            Value::str("!@#$%^&*()_+"),
            Value::str("123abc"),
        ],
        TypeCategory::List => vec![
            Value::List(Vec::new()),
            Value::list([Value::Int(1)]),
            Value::list([Value::Int(1), Value::Int(2), Value::Int(3)]),
            Value::list((0..100).map(Value::Int)),
        ],
        TypeCategory::Bool => vec![Value::Bool(true), Value::Bool(false)],
        TypeCategory::Dict => vec![
            Value::Dict(Default::default()),
            Value::dict([("key", Value::str("value"))]),
            Value::dict([("one", Value::Int(1)), ("two", Value::Int(2))]),
            Value::dict((0..10).map(|i| (format!("k{}", i), Value::Int(i)))),
        ],
        TypeCategory::Set => vec![
            Value::Set(Default::default()),
            Value::set([Value::Int(1), Value::Int(2), Value::Int(3)]),
            Value::set((0..10).map(Value::Int)),
        ],
        TypeCategory::Unknown => vec![
            Value::Null,
            Value::Int(0),
            Value::Int(1),
            Value::Int(5),
        ],
    }
}

/// Full cross-product over pool prefixes, rightmost parameter varying
/// fastest, truncated at the cap. Truncation keeps the leading tuples
/// rather than sampling so runs stay reproducible.
fn cross_product(pools: &[Vec<Value>]) -> Vec<TestCase> {
    let prefixes: Vec<&[Value]> = pools
        .iter()
        .map(|pool| &pool[..pool.len().min(MULTI_PARAM_POOL)])
        .collect();

    if prefixes.iter().any(|p| p.is_empty()) {
        return Vec::new();
    }

    let mut cases = Vec::new();
    let mut indices = vec![0usize; prefixes.len()];
    loop {
        cases.push(TestCase::new(
            indices
                .iter()
                .zip(&prefixes)
                .map(|(&i, pool)| pool[i].clone()),
        ));
        if cases.len() == MULTI_PARAM_CAP {
            break;
        }

        // Odometer increment, rightmost digit first
        let mut pos = prefixes.len();
        loop {
            if pos == 0 {
                return cases;
            }
            pos -= 1;
            indices[pos] += 1;
            if indices[pos] < prefixes[pos].len() {
                break;
            }
            indices[pos] = 0;
        }
    }
    cases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::FunctionSignature;

    fn parse(source: &str) -> FunctionSignature {
        FunctionSignature::parse(source).unwrap()
    }

    #[test]
    fn test_single_int_parameter() {
        let cases = synthesize(&parse("def f(x: int):\n    pass\n"));
        let expected: Vec<TestCase> = [0, 1, -1, 9999, -9999]
            .into_iter()
            .map(|i| TestCase::new([Value::Int(i)]))
            .collect();
        assert_eq!(cases, expected);
    }

    #[test]
    fn test_default_leads_the_pool() {
        let cases = synthesize(&parse("def f(x: int = 7):\n    pass\n"));
        assert_eq!(cases.len(), 6);
        assert_eq!(cases[0], TestCase::new([Value::Int(7)]));
        assert_eq!(cases[1], TestCase::new([Value::Int(0)]));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let sig = parse("def f(a: int, b: str):\n    pass\n");
        assert_eq!(synthesize(&sig), synthesize(&sig));
    }

    #[test]
    fn test_cross_product_is_capped() {
        let cases = synthesize(&parse("def f(a: int, b: int, c: int):\n    pass\n"));
        assert_eq!(cases.len(), 8);
        // Rightmost parameter varies fastest
        assert_eq!(
            cases[0],
            TestCase::new([Value::Int(0), Value::Int(0), Value::Int(0)])
        );
        assert_eq!(
            cases[1],
            TestCase::new([Value::Int(0), Value::Int(0), Value::Int(1)])
        );
    }

    #[test]
    fn test_bool_pool_is_short() {
        let cases = synthesize(&parse("def f(flag: bool):\n    pass\n"));
        assert_eq!(
            cases,
            vec![
                TestCase::new([Value::Bool(true)]),
                TestCase::new([Value::Bool(false)]),
            ]
        );
    }

    #[test]
    fn test_two_bools_product() {
        let cases = synthesize(&parse("def f(a: bool, b: bool):\n    pass\n"));
        assert_eq!(cases.len(), 4);
    }

    #[test]
    fn test_unknown_annotation_uses_generic_pool() {
        let cases = synthesize(&parse("def f(x):\n    pass\n"));
        assert_eq!(cases[0], TestCase::new([Value::Null]));
        assert_eq!(cases.len(), 4);
    }

    #[test]
    fn test_fallback_shape() {
        let cases = fallback_cases();
        assert_eq!(cases.len(), 3);
        assert!(cases.iter().all(|c| c.args.len() == 1));
    }

    #[test]
    fn test_long_string_is_400_chars() {
        let cases = synthesize(&parse("def f(s: str):\n    pass\n"));
        let long = &cases[3];
        match &long.args[0] {
            Value::Str(s) => assert_eq!(s.len(), 400),
            other => panic!("expected string, got {other}"),
        }
    }
}
