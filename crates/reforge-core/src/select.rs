//! Winner selection
//!
//! Correctness first, speed second: among fully correct variants the
//! fastest wins; when nothing is fully correct the best-effort winner is
//! surfaced with an explicit flag so callers never mistake it for a clean
//! success.

use serde::{Deserialize, Serialize};

use crate::variant::{VariantReport, VariantState};

/// The selector's verdict for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    /// Index of the winner in the report list
    pub winner_index: usize,

    /// Id of the winning variant
    pub winner_id: String,

    /// Whether the winner matched the oracle on every case. `false` is a
    /// user-visible warning condition, not a silent success.
    pub fully_correct: bool,
}

/// Reduce the report list to a single winner.
///
/// Abandoned variants never win. Among reports with `success_count ==
/// oracle_size`, the lowest total latency wins, ties broken by encounter
/// order. If no variant is fully correct, the winner maximizes
/// `success_count` and then minimizes latency, and is flagged as not
/// fully correct. Returns `None` only when every variant was abandoned
/// (or the list is empty).
pub fn select_best(reports: &[VariantReport], oracle_size: usize) -> Option<Selection> {
    let ranked: Vec<(usize, &VariantReport)> = reports
        .iter()
        .enumerate()
        .filter(|(_, r)| r.state != VariantState::Abandoned)
        .collect();

    if ranked.is_empty() {
        return None;
    }

    let fully_correct: Vec<(usize, &VariantReport)> = ranked
        .iter()
        .filter(|(_, r)| r.success_count == oracle_size)
        .copied()
        .collect();

    if !fully_correct.is_empty() {
        // Strict less-than keeps the first-encountered report on ties
        let mut best = fully_correct[0];
        for candidate in &fully_correct[1..] {
            if candidate.1.total_latency < best.1.total_latency {
                best = *candidate;
            }
        }
        return Some(Selection {
            winner_index: best.0,
            winner_id: best.1.variant_id.clone(),
            fully_correct: true,
        });
    }

    let mut best = ranked[0];
    for candidate in &ranked[1..] {
        let better = candidate.1.success_count > best.1.success_count
            || (candidate.1.success_count == best.1.success_count
                && candidate.1.total_latency < best.1.total_latency);
        if better {
            best = *candidate;
        }
    }
    Some(Selection {
        winner_index: best.0,
        winner_id: best.1.variant_id.clone(),
        fully_correct: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: &str, successes: usize, latency: f64) -> VariantReport {
        let mut r = VariantReport::new(id);
        r.state = VariantState::Tested;
        r.success_count = successes;
        r.total_latency = latency;
        r
    }

    #[test]
    fn test_fastest_fully_correct_wins() {
        let reports = vec![report("slow", 6, 5.0), report("fast", 6, 2.0)];
        let selection = select_best(&reports, 6).unwrap();
        assert_eq!(selection.winner_id, "fast");
        assert!(selection.fully_correct);
    }

    #[test]
    fn test_correctness_beats_speed() {
        let reports = vec![report("correct", 6, 9.0), report("fast_but_wrong", 5, 0.1)];
        let selection = select_best(&reports, 6).unwrap();
        assert_eq!(selection.winner_id, "correct");
        assert!(selection.fully_correct);
    }

    #[test]
    fn test_tie_broken_by_encounter_order() {
        let reports = vec![report("first", 6, 2.0), report("second", 6, 2.0)];
        let selection = select_best(&reports, 6).unwrap();
        assert_eq!(selection.winner_index, 0);
    }

    #[test]
    fn test_partial_fallback_flags_winner() {
        let reports = vec![report("a", 4, 1.0), report("b", 5, 3.0), report("c", 5, 2.0)];
        let selection = select_best(&reports, 6).unwrap();
        assert_eq!(selection.winner_id, "c");
        assert!(!selection.fully_correct);
    }

    #[test]
    fn test_abandoned_variants_never_win() {
        let mut abandoned = VariantReport::abandoned("ghost");
        abandoned.success_count = 0;
        let reports = vec![abandoned, report("a", 1, 1.0)];
        let selection = select_best(&reports, 6).unwrap();
        assert_eq!(selection.winner_id, "a");
        assert!(!selection.fully_correct);
    }

    #[test]
    fn test_all_abandoned_yields_no_winner() {
        let reports = vec![
            VariantReport::abandoned("x"),
            VariantReport::abandoned("y"),
        ];
        assert!(select_best(&reports, 3).is_none());
    }

    #[test]
    fn test_empty_oracle_means_everyone_is_correct() {
        let reports = vec![report("a", 0, 0.0)];
        let selection = select_best(&reports, 0).unwrap();
        assert!(selection.fully_correct);
    }
}
