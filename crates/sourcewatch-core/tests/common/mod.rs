#![allow(dead_code)]

use async_trait::async_trait;
use sourcewatch_core::errors::{JudgeUnavailableError, StoreError, TransportError};
use sourcewatch_core::model::{NewQuestion, Question, TestResult};
use sourcewatch_core::providers::llm::JudgeClient;
use sourcewatch_core::providers::source::SourceAdapter;
use sourcewatch_core::storage::{QuestionBank, ResultStore, Store};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn store() -> Store {
    let s = Store::memory().unwrap();
    s.init_schema().unwrap();
    s
}

pub fn seed(store: &Store, question: &str, golden_truth: &str) -> Question {
    store
        .insert_question(
            &NewQuestion {
                question: question.into(),
                golden_truth: golden_truth.into(),
            },
            None,
        )
        .unwrap()
}

pub enum Reply {
    Answer(String),
    Fail,
    Hang,
}

pub struct StubAdapter {
    pub id: String,
    pub reply: Reply,
}

impl StubAdapter {
    pub fn answering(id: &str, answer: &str) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            id: id.into(),
            reply: Reply::Answer(answer.into()),
        })
    }

    pub fn failing(id: &str) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            id: id.into(),
            reply: Reply::Fail,
        })
    }

    pub fn hanging(id: &str) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            id: id.into(),
            reply: Reply::Hang,
        })
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn answer(&self, _question: &str) -> Result<String, TransportError> {
        match &self.reply {
            Reply::Answer(a) => Ok(a.clone()),
            Reply::Fail => Err(TransportError::Status {
                status: 503,
                body: "unavailable".into(),
            }),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok("too late".into())
            }
        }
    }
}

/// Judge that returns canned text and remembers every prompt it saw.
pub struct ScriptedJudge {
    pub reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedJudge {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl JudgeClient for ScriptedJudge {
    async fn complete(&self, prompt: &str) -> Result<String, JudgeUnavailableError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| JudgeUnavailableError::new("connection refused"))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Result store that fails on the n-th insert (1-based) and delegates otherwise.
pub struct FlakyResults {
    pub inner: Store,
    pub fail_on: usize,
    pub inserts: AtomicUsize,
}

impl QuestionBank for FlakyResults {
    fn get_question(&self, id: i64) -> Result<Option<Question>, StoreError> {
        self.inner.get_question(id)
    }

    fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        self.inner.list_questions()
    }
}

impl ResultStore for FlakyResults {
    fn insert_result(
        &self,
        question_id: i64,
        source: &str,
        ai_response: &str,
        score: f64,
        explanation: &str,
    ) -> Result<TestResult, StoreError> {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(StoreError::Poisoned);
        }
        self.inner
            .insert_result(question_id, source, ai_response, score, explanation)
    }

    fn list_by_question(&self, question_id: i64) -> Result<Vec<TestResult>, StoreError> {
        self.inner.list_by_question(question_id)
    }

    fn list_by_source(&self, source: &str) -> Result<Vec<TestResult>, StoreError> {
        self.inner.list_by_source(source)
    }

    fn list_all(&self) -> Result<Vec<TestResult>, StoreError> {
        self.inner.list_all()
    }
}
