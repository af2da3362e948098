//! Routing Pipeline — the ordered stage sequence that turns an incoming
//! message into a routing decision and a durable write (§4.4).
//!
//! All five stages are critical: the first one to fail aborts the request.
//! The whole run is wrapped in a hard deadline (`policy.pipeline_timeout_ms`,
//! default 10,000ms) — on expiry the caller sees `Timeout`, but any rows
//! already committed by the Executor stay committed (§5).

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::classifier::{self, ClassifyInput};
use crate::config::routing::{RoutingConfig, RoutingOverrides};
use crate::embedding::EmbeddingClient;
use crate::error::{DriftError, DriftResult};
use crate::executor::{Executor, RouteResponse};
use crate::facts::FactExtractor;
use crate::store::models::{BranchSummary, Role};
use crate::store::BranchStore;
use crate::utils::timeout::with_timeout;

#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub conversation_id: String,
    pub content: String,
    pub role: Role,
    pub current_branch_id: Option<String>,
    pub extract_facts: Option<bool>,
    pub overrides: RoutingOverrides,
}

pub struct RoutingPipeline {
    store: Arc<dyn BranchStore>,
    embedding_client: Arc<dyn EmbeddingClient>,
    executor: Executor,
    policy: RoutingConfig,
}

impl RoutingPipeline {
    pub fn new(
        store: Arc<dyn BranchStore>,
        embedding_client: Arc<dyn EmbeddingClient>,
        facts: Arc<dyn FactExtractor>,
        policy: RoutingConfig,
    ) -> Self {
        let executor = Executor::new(Arc::clone(&store), facts);
        Self {
            store,
            embedding_client,
            executor,
            policy,
        }
    }

    pub async fn route(&self, req: RouteRequest) -> DriftResult<RouteResponse> {
        let policy = self.policy.with_overrides(req.overrides);
        let timeout = Duration::from_millis(policy.pipeline_timeout_ms);

        with_timeout(timeout, self.run(req, policy)).await
    }

    async fn run(&self, req: RouteRequest, policy: RoutingConfig) -> DriftResult<RouteResponse> {
        let mut reason_codes: Vec<String> = Vec::new();

        // 1. Validate.
        self.validate(&req).await?;

        // 2. LoadBranches.
        let (current, others, last_message_content) =
            self.load_branches(&req, &policy, &mut reason_codes).await?;

        // 3. Embed.
        let embedding = self
            .embedding_client
            .embed(&req.content, policy.preprocess_embeddings)
            .await?;

        // 4. Classify.
        let classify_input = ClassifyInput {
            role: req.role,
            content: &req.content,
            embedding: &embedding,
            current_branch: current.as_ref(),
            other_branches: &others,
            last_message_content: last_message_content.as_deref(),
            policy,
        };
        let classification = classifier::classify(classify_input, &self.embedding_client).await?;
        reason_codes.extend(classification.reason_codes.iter().cloned());
        debug!(
            "conversation {} classified as {:?}: {}",
            req.conversation_id, classification.action, classification.reason
        );

        // 5. Execute.
        let extract_facts = req.extract_facts.unwrap_or(policy.extract_facts_default);
        let mut response = self
            .executor
            .execute(
                &req.conversation_id,
                req.role,
                &req.content,
                &embedding,
                current.as_ref().map(|b| b.id.as_str()),
                classification,
                extract_facts,
            )
            .await?;

        // `response.reason_codes` is the classifier's codes verbatim; `reason_codes`
        // already holds the earlier stages' codes (e.g. `new_conversation`) followed
        // by the classifier's, so it's the full breadcrumb trail (§4.4) as-is.
        response.reason_codes = reason_codes;

        info!(
            "conversation {} -> {:?} branch {}",
            req.conversation_id, response.action, response.branch_id
        );

        Ok(response)
    }

    async fn validate(&self, req: &RouteRequest) -> DriftResult<()> {
        if req.conversation_id.trim().is_empty() {
            return Err(DriftError::invalid_input("conversationId is required"));
        }
        if req.content.trim().is_empty() {
            return Err(DriftError::invalid_input("content is required"));
        }

        self.store.upsert_conversation(&req.conversation_id).await?;
        Ok(())
    }

    async fn load_branches(
        &self,
        req: &RouteRequest,
        policy: &RoutingConfig,
        reason_codes: &mut Vec<String>,
    ) -> DriftResult<(Option<BranchSummary>, Vec<BranchSummary>, Option<String>)> {
        let mut branches = self.store.list_branches(&req.conversation_id).await?;

        if branches.is_empty() {
            reason_codes.push("new_conversation".to_string());
            return Ok((None, Vec::new(), None));
        }

        // Resolve the current branch against the full list — an explicitly
        // requested currentBranchId must resolve even if it isn't among the
        // maxBranchesForContext most recently updated branches. The cap only
        // bounds how many *other* branches the classifier scores as ROUTE
        // candidates, not whether a valid, existing branch id is found.
        let current_index = match &req.current_branch_id {
            Some(id) => branches
                .iter()
                .position(|b| &b.id == id)
                .ok_or_else(|| DriftError::branch_not_found(format!("branch {} not found", id)))?,
            // Branches are already ordered updatedAt desc, id desc — the
            // first row is the most recently updated one.
            None => 0,
        };

        let mut current = branches.remove(current_index);
        current.is_current = true;
        branches.truncate(policy.max_branches_for_context);

        let last_message_content = self
            .store
            .load_last_message_content(&current.id)
            .await?;

        Ok((Some(current), branches, last_message_content))
    }
}
