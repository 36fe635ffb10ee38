//! Result rendering and persistence
//!
//! The harness hands its consumer a structured [`EvaluationOutcome`];
//! these helpers turn it into the comparison table shown on stdout and a
//! timestamped JSON file for later analysis.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::EvalResult;
use crate::harness::EvaluationOutcome;
use crate::variant::{ExecutionOutput, VariantState};

const MISMATCHES_SHOWN: usize = 3;
const FIELD_WIDTH: usize = 30;

/// Render the per-variant comparison table.
pub fn render_table(outcome: &EvaluationOutcome) -> String {
    let total = outcome.oracle_size();
    let mut out = String::new();

    out.push_str(&format!(
        "{:<15} {:<15} {:<15} {:<15} {:<10}\n",
        "Variant", "Success Rate", "Total Time", "Avg Time/Case", "Status"
    ));
    out.push_str(&"═".repeat(80));
    out.push('\n');

    for report in &outcome.reports {
        let (rate, total_time, avg_time, status) = match report.state {
            VariantState::Abandoned => (
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "💥 deploy",
            ),
            _ => (
                format!("{}/{}", report.success_count, total),
                format!("{:.4}s", report.total_latency),
                format!("{:.4}s", report.avg_latency()),
                if report.is_fully_correct(total) {
                    "✅"
                } else {
                    "❌"
                },
            ),
        };
        out.push_str(&format!(
            "{:<15} {:<15} {:<15} {:<15} {:<10}\n",
            report.variant_id, rate, total_time, avg_time, status
        ));

        let mismatches: Vec<_> = report
            .per_case
            .iter()
            .filter(|case| !case.matched)
            .collect();
        if !mismatches.is_empty() {
            out.push_str(&format!("   Failed cases for {}:\n", report.variant_id));
            for (i, case) in mismatches.iter().take(MISMATCHES_SHOWN).enumerate() {
                let entry = &outcome.cases[case.case_index];
                let expected = match &entry.expected {
                    Some(value) => value.to_string(),
                    None => "<failure>".to_string(),
                };
                let got = match &case.outcome.output {
                    ExecutionOutput::Value(value) => value.to_string(),
                    ExecutionOutput::Error(text) => format!("error: {text}"),
                };
                out.push_str(&format!(
                    "   {}. Input: {}\n      Expected: {}\n      Got: {}\n",
                    i + 1,
                    truncate(&entry.case.to_string()),
                    truncate(&expected),
                    truncate(&got),
                ));
            }
            if mismatches.len() > MISMATCHES_SHOWN {
                out.push_str(&format!(
                    "      ...and {} more failures\n",
                    mismatches.len() - MISMATCHES_SHOWN
                ));
            }
        }
    }

    out
}

/// Render the winner block, including the explicit warning when the best
/// variant is not fully correct.
pub fn render_winner(outcome: &EvaluationOutcome) -> String {
    let mut out = String::new();
    match (&outcome.selection, outcome.winner()) {
        (Some(selection), Some(report)) => {
            if !selection.fully_correct {
                out.push_str("⚠️  Warning: no variant passed every case; best effort winner below\n");
            }
            out.push_str(&format!("Winner: {}\n", selection.winner_id));
            out.push_str(&format!(
                "Success rate: {}/{}\n",
                report.success_count,
                outcome.oracle_size()
            ));
            out.push_str(&format!("Total time: {:.4}s\n", report.total_latency));
        }
        _ => {
            out.push_str("No winner: every variant failed to deploy\n");
        }
    }
    out
}

/// JSON persistence of evaluation outcomes.
pub struct JsonReporter;

impl JsonReporter {
    /// Serialize an outcome to pretty JSON
    pub fn generate(outcome: &EvaluationOutcome) -> EvalResult<String> {
        Ok(serde_json::to_string_pretty(outcome)?)
    }

    /// Write the outcome to `<dir>/eval_<timestamp>.json`
    pub async fn save(outcome: &EvaluationOutcome, dir: &Path) -> EvalResult<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("eval_{timestamp}.json"));
        tokio::fs::write(&path, Self::generate(outcome)?).await?;
        tracing::info!(path = %path.display(), "saved evaluation report");
        Ok(path)
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > FIELD_WIDTH {
        let head: String = text.chars().take(FIELD_WIDTH).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleEntry;
    use crate::runner::EnvironmentRegistry;
    use crate::select::Selection;
    use crate::synth::TestCase;
    use crate::value::Value;
    use crate::variant::{CaseResult, ExecutionOutcome, VariantReport, VariantState};

    fn outcome_with_one_mismatch() -> EvaluationOutcome {
        let mut report = VariantReport::new("variant-1");
        report.state = VariantState::Removed;
        report.record(
            CaseResult {
                case_index: 0,
                outcome: ExecutionOutcome::success(Value::Int(2), 0.1),
                matched: false,
            },
            true,
        );
        EvaluationOutcome {
            baseline_id: "square".into(),
            signature: None,
            synthesis_degraded: false,
            cases: vec![OracleEntry {
                case: TestCase::new([Value::Int(1)]),
                expected: Some(Value::Int(1)),
            }],
            reports: vec![report],
            selection: Some(Selection {
                winner_index: 0,
                winner_id: "variant-1".into(),
                fully_correct: false,
            }),
            registry: EnvironmentRegistry::new(),
        }
    }

    #[test]
    fn test_table_shows_mismatch_details() {
        let table = render_table(&outcome_with_one_mismatch());
        assert!(table.contains("variant-1"));
        assert!(table.contains("0/1"));
        assert!(table.contains("Expected: 1"));
        assert!(table.contains("Got: 2"));
    }

    #[test]
    fn test_winner_block_warns_on_partial() {
        let rendered = render_winner(&outcome_with_one_mismatch());
        assert!(rendered.contains("Warning"));
        assert!(rendered.contains("Winner: variant-1"));
    }

    #[test]
    fn test_json_report_is_valid() {
        let json = JsonReporter::generate(&outcome_with_one_mismatch()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["baseline_id"], "square");
        assert!(parsed["reports"].is_array());
    }

    #[test]
    fn test_truncate_long_values() {
        let long = "x".repeat(100);
        let shown = truncate(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), FIELD_WIDTH + 3);
    }
}
