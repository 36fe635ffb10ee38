//! Candidate variants, execution outcomes, and per-variant reports

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Lifecycle of a candidate.
///
/// `Created → Deployed → Tested → (Removed | Abandoned)`. Transitions are
/// written only by the test runner; `Abandoned` marks a candidate whose
/// deployment failed. It contributes zero successes and is excluded from
/// ranking but still appears in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantState {
    Created,
    Deployed,
    Tested,
    Removed,
    Abandoned,
}

/// One candidate implementation under evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    /// Stable identifier ("baseline", "variant-1", ...)
    pub id: String,

    /// Candidate source text
    pub source: String,

    /// Current lifecycle state
    pub state: VariantState,
}

impl Variant {
    /// Create a fresh candidate
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            state: VariantState::Created,
        }
    }
}

/// What one execution produced: a decoded value on success, the error text
/// otherwise. Transport errors land here as error text too; this layer
/// does not distinguish them from program failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutput {
    /// The candidate returned a value
    Value(Value),
    /// The candidate (or the transport to it) failed
    Error(String),
}

/// Result of running one candidate against one input tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Whether the execution produced a value
    pub success: bool,

    /// Returned value or error text
    pub output: ExecutionOutput,

    /// Wall-clock seconds spent inside the candidate
    pub latency_seconds: f64,
}

impl ExecutionOutcome {
    /// Successful execution with a decoded value
    pub fn success(value: Value, latency_seconds: f64) -> Self {
        Self {
            success: true,
            output: ExecutionOutput::Value(value),
            latency_seconds,
        }
    }

    /// Failed execution carrying the error text
    pub fn failure(error: impl Into<String>, latency_seconds: f64) -> Self {
        Self {
            success: false,
            output: ExecutionOutput::Error(error.into()),
            latency_seconds,
        }
    }

    /// The decoded value, when this outcome succeeded
    pub fn value(&self) -> Option<&Value> {
        match &self.output {
            ExecutionOutput::Value(v) => Some(v),
            ExecutionOutput::Error(_) => None,
        }
    }
}

/// An [`ExecutionOutcome`] tied to its test case plus the comparator
/// verdict for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    /// Index into the oracle table this result belongs to
    pub case_index: usize,

    /// Raw execution outcome
    pub outcome: ExecutionOutcome,

    /// Comparator verdict against the oracle expectation
    pub matched: bool,
}

/// Accumulated results for one candidate, built incrementally by the test
/// runner and read-only once its cases complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantReport {
    /// Candidate this report describes
    pub variant_id: String,

    /// Final lifecycle state
    pub state: VariantState,

    /// Number of cases whose comparator verdict was a match
    pub success_count: usize,

    /// Sum of latencies over matched cases that were expected to produce
    /// output; expected-failure cases contribute exactly zero
    pub total_latency: f64,

    /// Per-case outcomes in oracle order
    pub per_case: Vec<CaseResult>,
}

impl VariantReport {
    /// Empty report for a candidate entering testing
    pub fn new(variant_id: impl Into<String>) -> Self {
        Self {
            variant_id: variant_id.into(),
            state: VariantState::Created,
            success_count: 0,
            total_latency: 0.0,
            per_case: Vec::new(),
        }
    }

    /// Report for a candidate whose deployment failed: zero successes, no
    /// cases, retained so callers can tell "failed to deploy" apart from
    /// "failed every test".
    pub fn abandoned(variant_id: impl Into<String>) -> Self {
        Self {
            variant_id: variant_id.into(),
            state: VariantState::Abandoned,
            success_count: 0,
            total_latency: 0.0,
            per_case: Vec::new(),
        }
    }

    /// Record one scored case. `count_latency` is true only when the oracle
    /// expected output for this case.
    pub fn record(&mut self, result: CaseResult, count_latency: bool) {
        if result.matched {
            self.success_count += 1;
            if count_latency {
                self.total_latency += result.outcome.latency_seconds;
            }
        }
        self.per_case.push(result);
    }

    /// Whether this candidate matched the oracle on all `n` cases
    pub fn is_fully_correct(&self, oracle_size: usize) -> bool {
        self.state != VariantState::Abandoned && self.success_count == oracle_size
    }

    /// Average latency per executed case
    pub fn avg_latency(&self) -> f64 {
        if self.per_case.is_empty() {
            0.0
        } else {
            self.total_latency / self.per_case.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched_case(index: usize, latency: f64) -> CaseResult {
        CaseResult {
            case_index: index,
            outcome: ExecutionOutcome::success(Value::Int(1), latency),
            matched: true,
        }
    }

    #[test]
    fn test_record_counts_matches() {
        let mut report = VariantReport::new("variant-1");
        report.record(matched_case(0, 0.5), true);
        report.record(
            CaseResult {
                case_index: 1,
                outcome: ExecutionOutcome::failure("boom", 0.1),
                matched: false,
            },
            true,
        );
        assert_eq!(report.success_count, 1);
        assert_eq!(report.total_latency, 0.5);
        assert_eq!(report.per_case.len(), 2);
    }

    #[test]
    fn test_expected_failure_latency_excluded() {
        let mut report = VariantReport::new("variant-1");
        report.record(matched_case(0, 2.0), false);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.total_latency, 0.0);
    }

    #[test]
    fn test_abandoned_never_fully_correct() {
        let report = VariantReport::abandoned("variant-2");
        assert_eq!(report.success_count, 0);
        assert!(report.per_case.is_empty());
        assert!(!report.is_fully_correct(0));
    }
}
