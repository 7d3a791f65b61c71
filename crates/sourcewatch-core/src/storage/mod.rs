pub mod schema;
pub mod store;

pub use store::Store;

use crate::errors::StoreError;
use crate::model::{MetaEvaluation, MetaScores, Question, TestResult};

/// Read access to the question bank. Writes belong to the bank's own CRUD layer.
pub trait QuestionBank: Send + Sync {
    fn get_question(&self, id: i64) -> Result<Option<Question>, StoreError>;
    fn list_questions(&self) -> Result<Vec<Question>, StoreError>;
}

/// Append-only persistence of scored answers.
pub trait ResultStore: Send + Sync {
    fn insert_result(
        &self,
        question_id: i64,
        source: &str,
        ai_response: &str,
        score: f64,
        explanation: &str,
    ) -> Result<TestResult, StoreError>;

    /// Newest first.
    fn list_by_question(&self, question_id: i64) -> Result<Vec<TestResult>, StoreError>;

    /// Oldest first; the meta rubric relies on chronological order.
    fn list_by_source(&self, source: &str) -> Result<Vec<TestResult>, StoreError>;

    /// Oldest first.
    fn list_all(&self) -> Result<Vec<TestResult>, StoreError>;
}

/// Append-only persistence of meta-evaluation snapshots.
pub trait MetaStore: Send + Sync {
    fn insert_meta(&self, source: &str, scores: &MetaScores) -> Result<MetaEvaluation, StoreError>;

    /// Newest first, optionally restricted to one source.
    fn list_meta(&self, source: Option<&str>) -> Result<Vec<MetaEvaluation>, StoreError>;
}
