use thiserror::Error;

/// Failure of a single source adapter call.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth failed: {0}")]
    Auth(String),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response format: {0}")]
    Format(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("no recorded answer for question")]
    ReplayMiss,
}

#[derive(Debug, Error)]
#[error("judge unavailable: {message}")]
pub struct JudgeUnavailableError {
    pub message: String,
}

impl JudgeUnavailableError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for JudgeUnavailableError {
    fn from(e: reqwest::Error) -> Self {
        Self::new(e.to_string())
    }
}

#[derive(Debug, Error)]
#[error("judge output could not be parsed: {reason}")]
pub struct JudgeOutputError {
    pub reason: String,
    pub raw: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid stored timestamp '{0}'")]
    Timestamp(String),

    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

/// Errors surfaced by the evaluation and meta-evaluation pipelines.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("question {0} not found")]
    QuestionNotFound(i64),

    #[error("no results for source: {source_id}")]
    NoData { source_id: String },

    #[error("no sources configured")]
    NoSources,

    #[error("every source failed for question {question_id}")]
    NoResponses { question_id: i64 },

    #[error("an evaluation run is already in progress")]
    RunInProgress,

    #[error(transparent)]
    JudgeUnavailable(#[from] JudgeUnavailableError),

    #[error(transparent)]
    JudgeOutput(#[from] JudgeOutputError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EvalError {
    /// True for outcomes a caller should render as "not found" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EvalError::QuestionNotFound(_) | EvalError::NoData { .. }
        )
    }
}
