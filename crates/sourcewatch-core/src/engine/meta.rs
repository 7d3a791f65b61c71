use super::guard::RunGuard;
use crate::errors::{EvalError, JudgeOutputError};
use crate::judge::{build_meta_prompt, normalize_label, parse_meta_scores, Parsed};
use crate::model::{HistoryRecord, MetaEvaluation};
use crate::providers::llm::JudgeClient;
use crate::storage::{MetaStore, QuestionBank, ResultStore};
use std::collections::HashMap;
use std::sync::Arc;

const QUESTION_UNAVAILABLE: &str = "(question unavailable)";

/// Digests the full history of one source into a dated snapshot.
#[derive(Clone)]
pub struct MetaEvaluator {
    pub questions: Arc<dyn QuestionBank>,
    pub results: Arc<dyn ResultStore>,
    pub meta: Arc<dyn MetaStore>,
    pub judge: Arc<dyn JudgeClient>,
    pub guard: RunGuard,
}

impl MetaEvaluator {
    pub fn new(
        questions: Arc<dyn QuestionBank>,
        results: Arc<dyn ResultStore>,
        meta: Arc<dyn MetaStore>,
        judge: Arc<dyn JudgeClient>,
    ) -> Self {
        Self {
            questions,
            results,
            meta,
            judge,
            guard: RunGuard::new(),
        }
    }

    pub fn with_guard(mut self, guard: RunGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Every call appends a new snapshot, even when the history is unchanged.
    pub async fn run_meta_eval(&self, source: &str) -> Result<MetaEvaluation, EvalError> {
        let _permit = self.guard.try_acquire()?;
        self.evaluate_source(source).await
    }

    /// Evaluates each source in turn; a failure for one source does not stop
    /// the others.
    pub async fn run_meta_eval_all(
        &self,
        sources: &[String],
    ) -> Result<Vec<(String, Result<MetaEvaluation, EvalError>)>, EvalError> {
        let _permit = self.guard.try_acquire()?;
        let mut out = Vec::with_capacity(sources.len());
        for source in sources {
            let res = self.evaluate_source(source).await;
            if let Err(e) = &res {
                tracing::warn!(
                    event = "sourcewatch.meta.source_failed",
                    source = %source,
                    error = %e,
                    "meta evaluation failed; continuing"
                );
            }
            out.push((source.clone(), res));
        }
        Ok(out)
    }

    pub fn list_meta_evaluations(
        &self,
        source: Option<&str>,
    ) -> Result<Vec<MetaEvaluation>, EvalError> {
        Ok(self.meta.list_meta(source)?)
    }

    async fn evaluate_source(&self, source: &str) -> Result<MetaEvaluation, EvalError> {
        let history = self.history(source)?;
        if history.is_empty() {
            return Err(EvalError::NoData {
                source_id: source.to_string(),
            });
        }

        let prompt = build_meta_prompt(source, &history);
        tracing::info!(
            event = "sourcewatch.meta.start",
            source = %source,
            records = history.len(),
            model = %self.judge.model(),
            "requesting meta evaluation"
        );
        let raw = self.judge.complete(&prompt).await?;

        let scores = match parse_meta_scores(&raw) {
            Parsed::Ok(s) => s,
            Parsed::Malformed { reason, raw } => {
                tracing::warn!(
                    event = "sourcewatch.meta.malformed_output",
                    source = %source,
                    reason = %reason,
                    "meta evaluation output unusable"
                );
                return Err(JudgeOutputError { reason, raw }.into());
            }
        };

        if let Some(echoed) = scores.source.as_deref() {
            if normalize_label(echoed) != source {
                tracing::warn!(
                    event = "sourcewatch.meta.source_mismatch",
                    source = %source,
                    echoed = %echoed,
                    "judge named a different source; storing under the requested one"
                );
            }
        }

        let row = self.meta.insert_meta(source, &scores)?;
        tracing::info!(
            event = "sourcewatch.meta.complete",
            source = %source,
            id = row.id,
            overall = row.overall,
            "meta evaluation stored"
        );
        Ok(row)
    }

    fn history(&self, source: &str) -> Result<Vec<HistoryRecord>, EvalError> {
        let results = self.results.list_by_source(source)?;
        let mut texts: HashMap<i64, String> = HashMap::new();
        let mut out = Vec::with_capacity(results.len());

        for r in results {
            if !texts.contains_key(&r.question_id) {
                let text = self
                    .questions
                    .get_question(r.question_id)?
                    .map(|q| q.text)
                    .unwrap_or_else(|| QUESTION_UNAVAILABLE.to_string());
                texts.insert(r.question_id, text);
            }
            out.push(HistoryRecord {
                question_id: r.question_id,
                question_text: texts
                    .get(&r.question_id)
                    .cloned()
                    .unwrap_or_default(),
                score: r.score,
                explanation: r.explanation,
                created_at: r.created_at,
            });
        }
        Ok(out)
    }
}
