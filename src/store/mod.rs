//! Branch Store — transactional persistence for conversations, branches
//! (with centroid + lineage), and messages. All pipeline and executor access
//! to durable state goes through this trait — no direct DB calls in the
//! pipeline, classifier, or executor.

pub mod models;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::DriftResult;
use models::{Branch, BranchSummary, DriftType, Message, Role};

pub use sqlite::SqliteBranchStore;

#[async_trait]
pub trait BranchStore: Send + Sync {
    /// Idempotent conversation creation. Must tolerate concurrent duplicate
    /// inserts: a unique-key violation on `conversationId` is swallowed and
    /// treated as success; any other error propagates.
    async fn upsert_conversation(&self, conversation_id: &str) -> DriftResult<()>;

    /// All branches for a conversation, ordered by `updatedAt` desc (ties by
    /// id desc), each carrying its message count. `is_current` is always
    /// `false` here — the pipeline fills it in against an explicit
    /// `currentBranchId` or the first row.
    async fn list_branches(&self, conversation_id: &str) -> DriftResult<Vec<BranchSummary>>;

    /// Content of the chronologically latest message in a branch, if any.
    async fn load_last_message_content(&self, branch_id: &str) -> DriftResult<Option<String>>;

    /// Fetch a single branch by id. Fails with `NotFound` if it doesn't exist.
    async fn load_branch(&self, branch_id: &str) -> DriftResult<Branch>;

    async fn create_branch(
        &self,
        conversation_id: &str,
        parent_branch_id: Option<&str>,
        summary: &str,
        centroid: &[f32],
        drift_type: DriftType,
    ) -> DriftResult<Branch>;

    async fn insert_message(
        &self,
        conversation_id: &str,
        branch_id: &str,
        role: Role,
        content: &str,
        embedding: &[f32],
    ) -> DriftResult<Message>;

    async fn update_centroid(&self, branch_id: &str, centroid: &[f32]) -> DriftResult<()>;

    /// Insert a message and, if `update_centroid` is true, update that
    /// branch's centroid in the same transaction — the message count read
    /// and the centroid write must not be torn apart by a concurrent commit
    /// on the same branch (§5).
    async fn commit_message_with_centroid(
        &self,
        conversation_id: &str,
        branch_id: &str,
        role: Role,
        content: &str,
        embedding: &[f32],
        update_centroid: bool,
    ) -> DriftResult<Message>;
}
