use crate::errors::TransportError;
use async_trait::async_trait;

/// One monitored backend. Transport, auth and query shaping stay private to
/// the implementation; the pipeline only sees question in, answer out.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable label persisted as `test_results.source`.
    fn id(&self) -> &str;

    async fn answer(&self, question: &str) -> Result<String, TransportError>;
}
