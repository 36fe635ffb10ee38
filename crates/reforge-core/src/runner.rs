//! Parallel variant test runner
//!
//! Deploys every candidate concurrently, fans the oracle's cases out
//! across variants (sequential within a variant, parallel across them),
//! scores each case with the comparator, and owns the lifecycle of every
//! execution environment it creates. Environments live in an explicit
//! registry, never global state, and are torn down when the run completes
//! or is cancelled.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::backend::{EnvironmentHandle, ExecutionBackend};
use crate::compare::outputs_match;
use crate::oracle::OracleTable;
use crate::variant::{CaseResult, ExecutionOutcome, Variant, VariantReport, VariantState};

/// Owned registry of live execution environments.
///
/// The runner registers every successful deployment here and drives
/// teardown from completion or cancellation; callers who opt to keep
/// environments receive the registry and own the leftover handles.
#[derive(Debug, Default)]
pub struct EnvironmentRegistry {
    handles: Vec<EnvironmentHandle>,
}

impl EnvironmentRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Track one live environment
    pub fn register(&mut self, handle: EnvironmentHandle) {
        self.handles.push(handle);
    }

    /// Live handles, in registration order
    pub fn handles(&self) -> &[EnvironmentHandle] {
        &self.handles
    }

    /// Number of live environments
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Tear down every registered environment, best-effort.
    pub async fn teardown_all(&mut self, backend: &dyn ExecutionBackend) {
        for handle in self.handles.drain(..) {
            backend.teardown(handle).await;
        }
    }
}

/// Result of one runner invocation: every variant's report in encounter
/// order plus the registry of environments still alive.
#[derive(Debug)]
pub struct RunOutput {
    /// Per-variant reports, ordered as the variants were passed in
    pub reports: Vec<VariantReport>,

    /// Environments left alive (empty unless environment retention was
    /// requested)
    pub registry: EnvironmentRegistry,
}

/// Concurrent dispatcher for (variant × case) executions.
pub struct TestRunner {
    backend: Arc<dyn ExecutionBackend>,
    cancel: CancellationToken,
    keep_environments: bool,
}

impl TestRunner {
    /// Runner over a backend, with a fresh cancellation token
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            backend,
            cancel: CancellationToken::new(),
            keep_environments: false,
        }
    }

    /// Tie the runner to an external cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Leave environments alive after the run (for inspection)
    pub fn with_keep_environments(mut self, keep: bool) -> Self {
        self.keep_environments = keep;
        self
    }

    /// Run every variant against the full oracle table.
    ///
    /// Deploys all variants concurrently; a variant whose deployment fails
    /// is reported as abandoned and excluded from execution but kept in
    /// the output. Each deployed variant then walks the oracle cases in
    /// order inside its own task. Cancellation stops further dispatch;
    /// whatever was already scored stays in the reports.
    pub async fn run(&self, variants: Vec<Variant>, oracle: Arc<OracleTable>) -> RunOutput {
        let mut registry = EnvironmentRegistry::new();
        let mut reports: Vec<Option<VariantReport>> = Vec::with_capacity(variants.len());
        let mut deployed: Vec<(usize, Variant, EnvironmentHandle)> = Vec::new();

        // Concurrent deployment phase
        let deploy_results = {
            let futures = variants.into_iter().enumerate().map(|(index, mut variant)| {
                let backend = Arc::clone(&self.backend);
                let cancel = self.cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return (index, variant, None);
                    }
                    match backend.deploy(&variant.id, &variant.source).await {
                        Ok(handle) => {
                            variant.state = VariantState::Deployed;
                            (index, variant, Some(handle))
                        }
                        Err(e) => {
                            tracing::warn!(variant_id = %variant.id, error = %e, "deployment failed");
                            variant.state = VariantState::Abandoned;
                            (index, variant, None)
                        }
                    }
                }
            });
            futures::future::join_all(futures).await
        };

        for (index, variant, handle) in deploy_results {
            debug_assert_eq!(index, reports.len());
            match handle {
                Some(handle) => {
                    registry.register(handle.clone());
                    reports.push(None);
                    deployed.push((index, variant, handle));
                }
                None => {
                    reports.push(Some(VariantReport::abandoned(&variant.id)));
                }
            }
        }

        // Cross-variant parallel execution phase
        let mut tasks = JoinSet::new();
        for (index, variant, handle) in deployed {
            let backend = Arc::clone(&self.backend);
            let oracle = Arc::clone(&oracle);
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                let report = test_variant(backend, oracle, cancel, variant, handle).await;
                (index, report)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => reports[index] = Some(report),
                Err(e) => tracing::error!(error = %e, "variant task panicked"),
            }
        }

        let mut reports: Vec<VariantReport> = reports
            .into_iter()
            .flatten()
            .collect();

        if self.keep_environments {
            tracing::info!(
                environments = registry.len(),
                "keeping execution environments alive"
            );
        } else {
            registry.teardown_all(self.backend.as_ref()).await;
            for report in &mut reports {
                if report.state == VariantState::Tested {
                    report.state = VariantState::Removed;
                }
            }
        }

        RunOutput { reports, registry }
    }
}

/// Execute every oracle case against one deployed variant.
async fn test_variant(
    backend: Arc<dyn ExecutionBackend>,
    oracle: Arc<OracleTable>,
    cancel: CancellationToken,
    variant: Variant,
    handle: EnvironmentHandle,
) -> VariantReport {
    let mut report = VariantReport::new(&variant.id);
    report.state = VariantState::Deployed;
    let mut completed = true;

    for (case_index, entry) in oracle.entries.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::debug!(variant_id = %variant.id, case = case_index, "cancelled before dispatch");
            completed = false;
            break;
        }

        let outcome = match backend.execute(&handle, &entry.case).await {
            Ok(outcome) => outcome,
            // Transport errors are failed executions at this layer; callers
            // needing the distinction classify the output text
            Err(e) => ExecutionOutcome::failure(e.to_string(), 0.0),
        };

        let matched = outputs_match(&outcome, entry.expected.as_ref());
        if !matched {
            tracing::debug!(
                variant_id = %variant.id,
                case = case_index,
                input = %entry.case,
                "output mismatch"
            );
        }

        report.record(
            CaseResult {
                case_index,
                outcome,
                matched,
            },
            entry.expected.is_some(),
        );
    }

    if completed {
        report.state = VariantState::Tested;
        tracing::info!(
            variant_id = %variant.id,
            passed = report.success_count,
            total = oracle.len(),
            "variant testing complete"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::ScriptedBackend;
    use crate::oracle::{OracleEntry, OracleTable};
    use crate::synth::TestCase;
    use crate::value::Value;

    fn oracle_of(entries: Vec<(i64, Option<Value>)>) -> Arc<OracleTable> {
        Arc::new(OracleTable {
            entries: entries
                .into_iter()
                .map(|(input, expected)| OracleEntry {
                    case: TestCase::new([Value::Int(input)]),
                    expected,
                })
                .collect(),
        })
    }

    #[tokio::test]
    async fn test_reports_keep_encounter_order() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .on_execute("a", |case| Ok(ExecutionOutcome::success(case.args[0].clone(), 0.1)))
                .on_execute("b", |case| Ok(ExecutionOutcome::success(case.args[0].clone(), 0.2))),
        );
        let oracle = oracle_of(vec![(1, Some(Value::Int(1))), (2, Some(Value::Int(2)))]);
        let runner = TestRunner::new(backend);
        let output = runner
            .run(
                vec![Variant::new("a", "def f(x): pass"), Variant::new("b", "def f(x): pass")],
                oracle,
            )
            .await;

        let ids: Vec<&str> = output.reports.iter().map(|r| r.variant_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(output.reports.iter().all(|r| r.success_count == 2));
        assert!(output.registry.is_empty());
    }

    #[tokio::test]
    async fn test_deploy_failure_is_reported_not_dropped() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .fail_deploy("broken")
                .on_execute("ok", |case| Ok(ExecutionOutcome::success(case.args[0].clone(), 0.1))),
        );
        let oracle = oracle_of(vec![(1, Some(Value::Int(1)))]);
        let runner = TestRunner::new(backend);
        let output = runner
            .run(
                vec![Variant::new("broken", "x"), Variant::new("ok", "def f(x): pass")],
                oracle,
            )
            .await;

        assert_eq!(output.reports.len(), 2);
        assert_eq!(output.reports[0].state, VariantState::Abandoned);
        assert_eq!(output.reports[0].success_count, 0);
        assert!(output.reports[0].per_case.is_empty());
        assert_eq!(output.reports[1].success_count, 1);
    }

    #[tokio::test]
    async fn test_transport_error_becomes_failed_case() {
        let backend = Arc::new(ScriptedBackend::new().on_execute("a", |_| {
            Err(crate::backend::TransportError::Channel("pipe burst".into()))
        }));
        let oracle = oracle_of(vec![(1, Some(Value::Int(1)))]);
        let runner = TestRunner::new(backend);
        let output = runner.run(vec![Variant::new("a", "def f(x): pass")], oracle).await;

        let report = &output.reports[0];
        assert_eq!(report.success_count, 0);
        assert_eq!(report.per_case.len(), 1);
        assert!(!report.per_case[0].outcome.success);
        assert!(!report.per_case[0].matched);
    }

    #[tokio::test]
    async fn test_transport_error_matches_expected_failure() {
        // A case the baseline failed on: a transport error counts as a
        // failure there, which is what the oracle expects
        let backend = Arc::new(ScriptedBackend::new().on_execute("a", |_| {
            Err(crate::backend::TransportError::Channel("pipe burst".into()))
        }));
        let oracle = oracle_of(vec![(1, None)]);
        let runner = TestRunner::new(backend);
        let output = runner.run(vec![Variant::new("a", "def f(x): pass")], oracle).await;

        assert_eq!(output.reports[0].success_count, 1);
        assert_eq!(output.reports[0].total_latency, 0.0);
    }

    #[tokio::test]
    async fn test_cancellation_stops_dispatch() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let backend = Arc::new(
            ScriptedBackend::new()
                .on_execute("a", |case| Ok(ExecutionOutcome::success(case.args[0].clone(), 0.1))),
        );
        let oracle = oracle_of(vec![(1, Some(Value::Int(1))), (2, Some(Value::Int(2)))]);
        let runner = TestRunner::new(backend).with_cancellation(cancel);
        let output = runner.run(vec![Variant::new("a", "def f(x): pass")], oracle).await;

        // Already-cancelled token: deployment is skipped entirely
        assert_eq!(output.reports.len(), 1);
        assert_eq!(output.reports[0].state, VariantState::Abandoned);
    }

    #[tokio::test]
    async fn test_keep_environments_returns_registry() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .on_execute("a", |case| Ok(ExecutionOutcome::success(case.args[0].clone(), 0.1))),
        );
        let oracle = oracle_of(vec![(1, Some(Value::Int(1)))]);
        let runner = TestRunner::new(Arc::clone(&backend) as Arc<dyn ExecutionBackend>)
            .with_keep_environments(true);
        let output = runner.run(vec![Variant::new("a", "def f(x): pass")], oracle).await;

        assert_eq!(output.registry.len(), 1);
        assert_eq!(output.reports[0].state, VariantState::Tested);
        assert_eq!(backend.torn_down(), 0);
    }
}
