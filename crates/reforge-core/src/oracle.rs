//! Reference oracle construction
//!
//! Ground truth comes from running the baseline itself over the
//! synthesized input set. The build is deliberately sequential so the
//! table's order never depends on scheduler jitter, and it is a
//! precondition barrier: no variant executes until the full table exists.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::backend::{ExecutionBackend, TransportError};
use crate::error::{EvalError, EvalResult};
use crate::synth::TestCase;
use crate::value::Value;

/// One row of ground truth.
///
/// `expected == None` is a sentinel meaning the baseline raised/failed on
/// this input, distinct from a successful run whose value happens to be
/// null. Variants are judged correct on such a case only if they also
/// fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleEntry {
    /// The input tuple
    pub case: TestCase,

    /// Baseline output, or `None` when the baseline failed here
    pub expected: Option<Value>,
}

/// The full ground-truth table. Produced once per run, then shared
/// read-only with the comparator and the runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleTable {
    /// Entries in synthesis order
    pub entries: Vec<OracleEntry>,
}

impl OracleTable {
    /// Number of cases
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no cases
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of cases on which the baseline itself failed
    pub fn expected_failures(&self) -> usize {
        self.entries.iter().filter(|e| e.expected.is_none()).count()
    }
}

/// Builds the oracle table by probing the baseline through the execution
/// backend.
pub struct OracleBuilder {
    backend: Arc<dyn ExecutionBackend>,
}

impl OracleBuilder {
    /// Create a builder over a backend
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        Self { backend }
    }

    /// Deploy the baseline, execute every case in order, and tear the
    /// baseline's environment down again.
    ///
    /// A baseline that fails to deploy is fatal ([`EvalError::OracleBuild`]):
    /// without ground truth no comparison is meaningful. A transport error
    /// on an individual probe is recorded as a baseline failure on that
    /// case, exactly like a program-level error.
    pub async fn build(
        &self,
        baseline_id: &str,
        baseline_source: &str,
        cases: &[TestCase],
        cancel: &CancellationToken,
    ) -> EvalResult<OracleTable> {
        let env = self
            .backend
            .deploy(baseline_id, baseline_source)
            .await
            .map_err(|e| EvalError::oracle_build(e.to_string()))?;

        tracing::info!(
            baseline = %baseline_id,
            cases = cases.len(),
            "building reference oracle"
        );

        let mut entries = Vec::with_capacity(cases.len());
        for (index, case) in cases.iter().enumerate() {
            if cancel.is_cancelled() {
                self.backend.teardown(env).await;
                return Err(EvalError::Cancelled);
            }

            let expected = match self.backend.execute(&env, case).await {
                Ok(outcome) if outcome.success => outcome.value().cloned(),
                Ok(_) => {
                    tracing::debug!(
                        case = index,
                        input = %case,
                        "baseline failed; marking case as expected failure"
                    );
                    None
                }
                Err(TransportError::UnknownEnvironment(id)) => {
                    // The environment vanished under us; nothing further
                    // can be observed, so the whole build is unusable.
                    self.backend.teardown(env).await;
                    return Err(EvalError::oracle_build(format!(
                        "baseline environment {id} disappeared during probing"
                    )));
                }
                Err(e) => {
                    tracing::warn!(case = index, error = %e, "transport error while probing baseline");
                    None
                }
            };

            entries.push(OracleEntry {
                case: case.clone(),
                expected,
            });
        }

        self.backend.teardown(env).await;

        let table = OracleTable { entries };
        tracing::info!(
            cases = table.len(),
            expected_failures = table.expected_failures(),
            "oracle table complete"
        );
        Ok(table)
    }
}
