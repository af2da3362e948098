//! Executor — materializes a `Classification` into branch/message writes
//! and triggers the asynchronous, best-effort fact-extraction side effect
//! (§4.6).

use std::sync::Arc;

use serde::Serialize;

use crate::classifier::{Action, Classification};
use crate::error::{DriftError, DriftResult};
use crate::facts::FactExtractor;
use crate::similarity::DriftAction;
use crate::store::models::{DriftType, Role};
use crate::store::BranchStore;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub action: Action,
    pub drift_action: DriftAction,
    pub conversation_id: String,
    pub branch_id: String,
    pub message_id: String,
    pub previous_branch_id: Option<String>,
    pub is_new_branch: bool,
    pub is_new_cluster: bool,
    pub branch_topic: Option<String>,
    pub similarity: f32,
    pub confidence: f32,
    pub reason: String,
    pub reason_codes: Vec<String>,
}

pub struct Executor {
    store: Arc<dyn BranchStore>,
    facts: Arc<dyn FactExtractor>,
}

impl Executor {
    pub fn new(store: Arc<dyn BranchStore>, facts: Arc<dyn FactExtractor>) -> Self {
        Self { store, facts }
    }

    /// Turn a classification into durable writes. Branch creation always
    /// seeds the new branch's centroid with the triggering message's
    /// embedding; STAY and ROUTE update the target branch's centroid and
    /// message count in one transaction (§5).
    pub async fn execute(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        embedding: &[f32],
        current_branch_id: Option<&str>,
        classification: Classification,
        extract_facts: bool,
    ) -> DriftResult<RouteResponse> {
        let previous_branch_id = current_branch_id.map(|s| s.to_string());

        let (branch_id, message_id, is_new_branch) = match classification.action {
            Action::Stay | Action::Route => {
                let target = classification.target_branch_id.clone().ok_or_else(|| {
                    DriftError::invalid_input(format!(
                        "{:?} classification missing a target branch id",
                        classification.action
                    ))
                })?;

                let message = self
                    .store
                    .commit_message_with_centroid(conversation_id, &target, role, content, embedding, true)
                    .await?;

                (target, message.id, false)
            }
            Action::Branch => {
                let parent_id = classification.target_branch_id.clone();
                let summary = classification
                    .new_branch_topic
                    .clone()
                    .unwrap_or_else(|| "untitled".to_string());
                let drift_type = if classification.drift_action
                    == crate::similarity::DriftAction::BranchNewCluster
                {
                    DriftType::Semantic
                } else {
                    DriftType::Functional
                };

                let branch = self
                    .store
                    .create_branch(
                        conversation_id,
                        parent_id.as_deref(),
                        &summary,
                        embedding,
                        drift_type,
                    )
                    .await?;

                let message = self
                    .store
                    .insert_message(conversation_id, &branch.id, role, content, embedding)
                    .await?;

                (branch.id, message.id, true)
            }
        };

        // Fact extraction only fires for BRANCH/ROUTE, against the branch the
        // conversation is leaving behind — not the one it just landed on
        // (§4.6 step 3). STAY never departs anywhere, so it never fires.
        let departing_branch = previous_branch_id.clone();
        if extract_facts && matches!(classification.action, Action::Branch | Action::Route) {
            if let Some(departing) = departing_branch {
                let facts = Arc::clone(&self.facts);
                let conversation_id = conversation_id.to_string();
                let content = content.to_string();
                tokio::spawn(async move {
                    facts.extract(&conversation_id, &departing, &content).await;
                });
            }
        }

        Ok(RouteResponse {
            action: classification.action,
            drift_action: classification.drift_action,
            conversation_id: conversation_id.to_string(),
            branch_id,
            message_id,
            previous_branch_id,
            is_new_branch,
            is_new_cluster: classification.drift_action
                == crate::similarity::DriftAction::BranchNewCluster,
            branch_topic: classification.new_branch_topic,
            similarity: classification.similarity,
            confidence: classification.confidence,
            reason: classification.reason,
            reason_codes: classification.reason_codes,
        })
    }
}
