use super::guard::RunGuard;
use crate::config::Settings;
use crate::errors::{EvalError, TransportError};
use crate::judge::{
    build_run_prompt, parse_judge_entries, placeholder_entries, reconcile, Parsed,
};
use crate::model::{
    DroppedEntry, QuestionRunReport, RunOutcome, SourceFailure, SourceResponse, TestResult,
};
use crate::providers::llm::JudgeClient;
use crate::providers::source::SourceAdapter;
use crate::score_policy::{ScoreDecision, ScorePolicy};
use crate::storage::{QuestionBank, ResultStore};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Duration};

#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// Adapter calls in flight at once during fan-out.
    pub parallel: usize,
    /// Per adapter call; `None` leaves it to the transport.
    pub timeout_seconds: Option<u64>,
    pub score_policy: ScorePolicy,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            parallel: 4,
            timeout_seconds: None,
            score_policy: ScorePolicy::Verbatim,
        }
    }
}

impl RunPolicy {
    pub fn from_settings(s: &Settings) -> Self {
        Self {
            parallel: s.parallel(),
            timeout_seconds: s.timeout_seconds,
            score_policy: s.score_policy,
        }
    }
}

/// Per-question pipeline: fan-out, judge, parse, reconcile, persist.
#[derive(Clone)]
pub struct Evaluator {
    pub questions: Arc<dyn QuestionBank>,
    pub results: Arc<dyn ResultStore>,
    pub adapters: Vec<Arc<dyn SourceAdapter>>,
    pub judge: Arc<dyn JudgeClient>,
    pub policy: RunPolicy,
    pub guard: RunGuard,
}

impl Evaluator {
    pub fn new(
        questions: Arc<dyn QuestionBank>,
        results: Arc<dyn ResultStore>,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        judge: Arc<dyn JudgeClient>,
        policy: RunPolicy,
    ) -> Self {
        Self {
            questions,
            results,
            adapters,
            judge,
            policy,
            guard: RunGuard::new(),
        }
    }

    /// Shares `guard` with other evaluators so their runs exclude each other.
    pub fn with_guard(mut self, guard: RunGuard) -> Self {
        self.guard = guard;
        self
    }

    pub async fn run_test(&self, question_id: i64) -> Result<RunOutcome, EvalError> {
        let _permit = self.guard.try_acquire()?;
        self.run_question(question_id).await
    }

    /// Runs every question in the bank, one after another. A failing question
    /// is recorded in its report and the loop moves on.
    pub async fn run_all_tests(&self) -> Result<Vec<QuestionRunReport>, EvalError> {
        let _permit = self.guard.try_acquire()?;
        let questions = self.questions.list_questions()?;
        tracing::info!(
            event = "sourcewatch.run_all.start",
            questions = questions.len(),
            sources = self.adapters.len(),
            "running all questions"
        );

        let mut reports = Vec::with_capacity(questions.len());
        for q in questions {
            let report = match self.run_question(q.id).await {
                Ok(outcome) => QuestionRunReport {
                    question_id: q.id,
                    outcome: Some(outcome),
                    error: None,
                },
                Err(e) => {
                    tracing::error!(
                        event = "sourcewatch.run_all.question_failed",
                        question_id = q.id,
                        error = %e,
                        "question failed; continuing"
                    );
                    QuestionRunReport {
                        question_id: q.id,
                        outcome: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            reports.push(report);
        }
        Ok(reports)
    }

    /// Judges and stores a response obtained outside the configured sources.
    pub async fn evaluate_provided(
        &self,
        question_id: i64,
        source: &str,
        response_text: &str,
    ) -> Result<RunOutcome, EvalError> {
        let _permit = self.guard.try_acquire()?;
        let question = self
            .questions
            .get_question(question_id)?
            .ok_or(EvalError::QuestionNotFound(question_id))?;

        let responses = vec![SourceResponse {
            source: source.to_string(),
            content: response_text.to_string(),
        }];
        self.judge_and_persist(question.id, &question.golden_truth, responses, Vec::new())
            .await
    }

    pub fn list_results(&self, question_id: i64) -> Result<Vec<TestResult>, EvalError> {
        Ok(self.results.list_by_question(question_id)?)
    }

    async fn run_question(&self, question_id: i64) -> Result<RunOutcome, EvalError> {
        if self.adapters.is_empty() {
            return Err(EvalError::NoSources);
        }
        let question = self
            .questions
            .get_question(question_id)?
            .ok_or(EvalError::QuestionNotFound(question_id))?;

        let (responses, failed) = self.fan_out(question.id, &question.text).await;
        if responses.is_empty() {
            return Err(EvalError::NoResponses { question_id });
        }

        self.judge_and_persist(question.id, &question.golden_truth, responses, failed)
            .await
    }

    /// Asks every adapter concurrently and waits for all of them. Successes
    /// come back in adapter order.
    async fn fan_out(
        &self,
        question_id: i64,
        text: &str,
    ) -> (Vec<SourceResponse>, Vec<SourceFailure>) {
        let sem = Arc::new(Semaphore::new(self.policy.parallel.max(1)));
        let mut handles = Vec::with_capacity(self.adapters.len());

        for adapter in &self.adapters {
            let sem = sem.clone();
            let adapter = adapter.clone();
            let source = adapter.id().to_string();
            let text = text.to_string();
            let limit = self.policy.timeout_seconds;
            let h = tokio::spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| TransportError::Format(format!("semaphore closed: {}", e)))?;
                match limit {
                    Some(secs) => timeout(Duration::from_secs(secs), adapter.answer(&text))
                        .await
                        .map_err(|_| TransportError::Timeout(secs))?,
                    None => adapter.answer(&text).await,
                }
            });
            handles.push((source, h));
        }

        let mut responses = Vec::new();
        let mut failed = Vec::new();
        for (source, h) in handles {
            let error = match h.await {
                Ok(Ok(content)) => {
                    responses.push(SourceResponse { source, content });
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(e) => format!("task failed: {}", e),
            };
            tracing::warn!(
                event = "sourcewatch.run.source_failed",
                question_id,
                source = %source,
                error = %error,
                "source did not answer"
            );
            failed.push(SourceFailure { source, error });
        }
        (responses, failed)
    }

    async fn judge_and_persist(
        &self,
        question_id: i64,
        golden_truth: &str,
        responses: Vec<SourceResponse>,
        failed_sources: Vec<SourceFailure>,
    ) -> Result<RunOutcome, EvalError> {
        let prompt = build_run_prompt(golden_truth, &responses);
        let raw = self.judge.complete(&prompt).await?;

        let mut dropped: Vec<DroppedEntry> = Vec::new();
        let mut judge_output_malformed = false;
        let entries = match parse_judge_entries(&raw) {
            Parsed::Ok(v) => {
                dropped.extend(v.rejected);
                v.entries
            }
            Parsed::Malformed { reason, raw } => {
                tracing::warn!(
                    event = "sourcewatch.judge.malformed_output",
                    question_id,
                    reason = %reason,
                    raw_len = raw.len(),
                    "recording zero-score placeholders"
                );
                judge_output_malformed = true;
                placeholder_entries(&responses, &reason)
            }
        };

        let reconciled = reconcile(&entries, &responses);
        dropped.extend(reconciled.dropped);

        let mut results = Vec::with_capacity(reconciled.matched.len());
        for m in reconciled.matched {
            let score = match self.policy.score_policy.apply(m.score) {
                ScoreDecision::Keep(s) => s,
                ScoreDecision::Adjusted { original, stored } => {
                    tracing::warn!(
                        event = "sourcewatch.score.clamped",
                        source = %m.source,
                        original,
                        stored,
                        "judge score clamped into 0..=100"
                    );
                    stored
                }
                ScoreDecision::Rejected { reason } => {
                    tracing::warn!(
                        event = "sourcewatch.score.rejected",
                        source = %m.source,
                        reason = %reason,
                        "dropping judge entry"
                    );
                    dropped.push(DroppedEntry {
                        label: m.source,
                        reason,
                    });
                    continue;
                }
            };
            let row = self.results.insert_result(
                question_id,
                &m.source,
                &m.response_text,
                score,
                &m.explanation,
            )?;
            results.push(row);
        }

        tracing::info!(
            event = "sourcewatch.run.complete",
            question_id,
            stored = results.len(),
            failed = failed_sources.len(),
            dropped = dropped.len(),
            judge_output_malformed,
            "run finished"
        );

        Ok(RunOutcome {
            question_id,
            results,
            failed_sources,
            dropped,
            judge_output_malformed,
        })
    }
}
