// score_policy.rs - what to do with judge scores outside the rubric's 0..=100 band
//
// The judge is a probabilistic model and nothing forces it to respect the rubric range.

use serde::{Deserialize, Serialize};

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

/// Policy applied to every judge-provided score before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolicy {
    /// Store the score exactly as the judge returned it (default).
    ///
    /// Out-of-range values are logged but kept, so the history shows what the
    /// judge actually said.
    #[default]
    Verbatim,

    /// Clamp into 0..=100.
    Clamp,

    /// Drop the entry; it is reported like a reconciliation mismatch.
    Reject,
}

/// Result of applying a [`ScorePolicy`] to one score.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreDecision {
    Keep(f64),
    Adjusted { original: f64, stored: f64 },
    Rejected { reason: String },
}

impl ScorePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbatim" => Some(ScorePolicy::Verbatim),
            "clamp" => Some(ScorePolicy::Clamp),
            "reject" => Some(ScorePolicy::Reject),
            _ => None,
        }
    }

    pub fn apply(&self, score: f64) -> ScoreDecision {
        // NaN and infinities cannot be charted or averaged; no policy keeps them.
        if !score.is_finite() {
            return ScoreDecision::Rejected {
                reason: format!("non-finite score {}", score),
            };
        }
        if (SCORE_MIN..=SCORE_MAX).contains(&score) {
            return ScoreDecision::Keep(score);
        }

        match self {
            ScorePolicy::Verbatim => {
                tracing::warn!(
                    event = "sourcewatch.score.out_of_range",
                    score,
                    policy = "verbatim",
                    "judge score outside 0..=100 stored as given"
                );
                ScoreDecision::Keep(score)
            }
            ScorePolicy::Clamp => ScoreDecision::Adjusted {
                original: score,
                stored: score.clamp(SCORE_MIN, SCORE_MAX),
            },
            ScorePolicy::Reject => ScoreDecision::Rejected {
                reason: format!("score {} outside 0..=100", score),
            },
        }
    }
}

impl ScoreDecision {
    pub fn stored(&self) -> Option<f64> {
        match self {
            ScoreDecision::Keep(s) => Some(*s),
            ScoreDecision::Adjusted { stored, .. } => Some(*stored),
            ScoreDecision::Rejected { .. } => None,
        }
    }
}
