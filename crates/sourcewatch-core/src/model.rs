use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub golden_truth: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

/// Seed entry for the question bank (import files).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    #[serde(alias = "text")]
    pub question: String,
    #[serde(alias = "goldenTruth")]
    pub golden_truth: String,
}

/// One persisted, scored answer of one source to one question in one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResult {
    pub id: i64,
    pub question_id: i64,
    pub source: String,
    pub ai_response: String,
    pub score: f64,
    pub explanation: String,
    pub created_at: DateTime<Utc>,
}

/// A TestResult joined with its question text, as fed to the meta rubric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub question_id: i64,
    pub question_text: String,
    pub score: f64,
    pub explanation: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetaEvaluation {
    pub id: i64,
    pub source: String,
    pub accuracy: f64,
    pub completeness: f64,
    pub clarity: f64,
    pub consistency: f64,
    pub overall: f64,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Category scores and narrative as returned by the judge, before persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetaScores {
    #[serde(default)]
    pub source: Option<String>,
    pub accuracy: f64,
    pub completeness: f64,
    pub clarity: f64,
    pub consistency: f64,
    pub overall: f64,
    pub summary: String,
}

/// A response collected from one source during fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceResponse {
    pub source: String,
    pub content: String,
}

/// One scored entry as emitted by the judge, label not yet reconciled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudgeEntry {
    pub source: String,
    pub score: f64,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

/// A judge entry that was not persisted, and why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DroppedEntry {
    pub label: String,
    pub reason: String,
}

/// Result of one run of the per-question pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub question_id: i64,
    pub results: Vec<TestResult>,
    pub failed_sources: Vec<SourceFailure>,
    pub dropped: Vec<DroppedEntry>,
    /// True when the judge output was unparsable and placeholders were recorded.
    pub judge_output_malformed: bool,
}

impl RunOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed_sources.is_empty() && self.dropped.is_empty() && !self.judge_output_malformed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRunReport {
    pub question_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendPoint {
    pub date: chrono::NaiveDate,
    pub mean_score: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceTrend {
    pub source: String,
    pub points: Vec<TrendPoint>,
}
