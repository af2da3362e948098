//! Fact extraction — an out-of-scope, best-effort side effect triggered by
//! the executor after a successful routing decision (§4.6 step 3). Failures
//! must never surface to the caller: they are logged and dropped.

use async_trait::async_trait;
use tracing::warn;

#[async_trait]
pub trait FactExtractor: Send + Sync {
    async fn extract(&self, conversation_id: &str, branch_id: &str, content: &str);
}

/// No-op extractor used until a real fact-extraction backend is wired in.
/// Keeping it behind the trait means the executor's fire-and-forget call site
/// never changes when one is.
pub struct NoopFactExtractor;

#[async_trait]
impl FactExtractor for NoopFactExtractor {
    async fn extract(&self, conversation_id: &str, branch_id: &str, _content: &str) {
        warn!(
            "fact extraction not configured, skipping for conversation {} branch {}",
            conversation_id, branch_id
        );
    }
}
