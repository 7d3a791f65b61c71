pub mod parse;
pub mod prompt;
pub mod reconcile;

use crate::model::{JudgeEntry, SourceResponse};

pub use parse::{parse_judge_entries, parse_meta_scores, JudgeVerdicts, Parsed};
pub use prompt::{build_meta_prompt, build_run_prompt};
pub use reconcile::{normalize_label, reconcile, MatchedEntry, Reconciled};

pub const PARSE_FAILURE_EXPLANATION: &str = "Judge output could not be parsed";

/// Zero-score stand-ins recorded when the judge's per-run output is unusable,
/// one per dispatched source, so the run is still persisted.
pub fn placeholder_entries(dispatched: &[SourceResponse], reason: &str) -> Vec<JudgeEntry> {
    dispatched
        .iter()
        .map(|r| JudgeEntry {
            source: r.source.clone(),
            score: 0.0,
            explanation: format!(
                "{} ({}); score recorded as 0, re-run to obtain a real judgment.",
                PARSE_FAILURE_EXPLANATION, reason
            ),
        })
        .collect()
}
