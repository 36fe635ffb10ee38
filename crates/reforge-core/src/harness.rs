//! Evaluation harness facade
//!
//! Wires the phases together for one run: derive the signature, synthesize
//! the input set, build the oracle, fan the variants out through the
//! runner, and reduce the reports to a winner. Case- and variant-level
//! failures stay inside the report; only a failed oracle build aborts.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::backend::ExecutionBackend;
use crate::config::HarnessConfig;
use crate::error::EvalResult;
use crate::oracle::{OracleBuilder, OracleEntry, OracleTable};
use crate::provider::CandidateSet;
use crate::runner::{EnvironmentRegistry, TestRunner};
use crate::select::{select_best, Selection};
use crate::signature::FunctionSignature;
use crate::synth::{fallback_cases, synthesize};
use crate::variant::VariantReport;

/// Everything one evaluation run produced.
#[derive(Debug, Serialize)]
pub struct EvaluationOutcome {
    /// Name of the baseline the run judged against
    pub baseline_id: String,

    /// Signature the synthesizer worked from (absent when synthesis
    /// degraded to the fallback set)
    pub signature: Option<FunctionSignature>,

    /// Whether the fallback input set was used
    pub synthesis_degraded: bool,

    /// Ground truth rows, in synthesis order
    pub cases: Vec<OracleEntry>,

    /// Per-variant reports in encounter order (baseline first)
    pub reports: Vec<VariantReport>,

    /// The selector's verdict; `None` when every variant was abandoned
    pub selection: Option<Selection>,

    /// Environments kept alive for inspection (empty unless configured)
    #[serde(skip)]
    pub registry: EnvironmentRegistry,
}

impl EvaluationOutcome {
    /// Number of oracle cases every variant was judged on
    pub fn oracle_size(&self) -> usize {
        self.cases.len()
    }

    /// The winning report, when a winner exists
    pub fn winner(&self) -> Option<&VariantReport> {
        self.selection
            .as_ref()
            .and_then(|s| self.reports.get(s.winner_index))
    }
}

/// One-shot evaluation runner over a backend.
pub struct EvalHarness {
    backend: Arc<dyn ExecutionBackend>,
    config: HarnessConfig,
    cancel: CancellationToken,
}

impl EvalHarness {
    /// Harness over a backend with the given configuration
    pub fn new(backend: Arc<dyn ExecutionBackend>, config: HarnessConfig) -> Self {
        Self {
            backend,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops further dispatch when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Evaluate a candidate set: baseline ground truth first, then every
    /// competitor (baseline included) over the same inputs.
    pub async fn evaluate(&self, set: &CandidateSet) -> EvalResult<EvaluationOutcome> {
        let (signature, cases, synthesis_degraded) =
            match FunctionSignature::parse(&set.baseline.code) {
                Ok(signature) => {
                    let cases = synthesize(&signature);
                    (Some(signature), cases, false)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "synthesis degraded; using fallback input set");
                    (None, fallback_cases(), true)
                }
            };

        tracing::info!(
            baseline = %set.baseline.name,
            variants = set.variants.len(),
            cases = cases.len(),
            "starting evaluation"
        );

        // Precondition barrier: no variant runs until ground truth exists
        let oracle = OracleBuilder::new(Arc::clone(&self.backend))
            .build(
                &format!("{}-oracle", set.baseline.name),
                &set.baseline.code,
                &cases,
                &self.cancel,
            )
            .await?;
        let oracle = Arc::new(oracle);

        let runner = TestRunner::new(Arc::clone(&self.backend))
            .with_cancellation(self.cancel.clone())
            .with_keep_environments(self.config.keep_environments);
        let output = runner.run(set.to_variants(), Arc::clone(&oracle)).await;

        let selection = select_best(&output.reports, oracle.len());
        match &selection {
            Some(s) if !s.fully_correct => {
                tracing::warn!(
                    winner = %s.winner_id,
                    "best variant is not fully correct"
                );
            }
            Some(s) => {
                tracing::info!(winner = %s.winner_id, "selected winner");
            }
            None => {
                tracing::warn!("no variant survived deployment; nothing to rank");
            }
        }

        let table: &OracleTable = &oracle;
        Ok(EvaluationOutcome {
            baseline_id: set.baseline.name.clone(),
            signature,
            synthesis_degraded,
            cases: table.entries.clone(),
            reports: output.reports,
            selection,
            registry: output.registry,
        })
    }
}
