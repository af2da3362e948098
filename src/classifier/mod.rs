//! Classifier — the decision brain. Produces a `Classification` (action +
//! driftAction + target + reason + scores) from branch state, the new
//! message's embedding, and the embedding service's linguistic analysis
//! (§4.5).

pub mod topic;

use std::sync::Arc;

use crate::config::routing::{RoutingConfig, TOPIC_RETURN_BOOST_FACTOR};
use crate::embedding::{DriftAnalysis, EmbeddingClient};
use crate::error::DriftResult;
use crate::similarity::{self, DriftAction};
use crate::store::models::{BranchSummary, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Stay,
    Route,
    Branch,
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub action: Action,
    pub drift_action: DriftAction,
    /// Target branch id for STAY/ROUTE. Unset for BRANCH (the executor mints
    /// a fresh id).
    pub target_branch_id: Option<String>,
    pub new_branch_topic: Option<String>,
    pub similarity: f32,
    pub confidence: f32,
    pub reason: String,
    pub reason_codes: Vec<String>,
}

pub struct ClassifyInput<'a> {
    pub role: Role,
    pub content: &'a str,
    pub embedding: &'a [f32],
    pub current_branch: Option<&'a BranchSummary>,
    pub other_branches: &'a [BranchSummary],
    pub last_message_content: Option<&'a str>,
    pub policy: RoutingConfig,
}

/// Run the classifier's decision order (§4.5 A through G). First match wins.
pub async fn classify(
    input: ClassifyInput<'_>,
    embedding_client: &Arc<dyn EmbeddingClient>,
) -> DriftResult<Classification> {
    // A. Assistant auto-STAY.
    if input.role == Role::Assistant {
        if let Some(current) = input.current_branch {
            return Ok(Classification {
                action: Action::Stay,
                drift_action: DriftAction::Stay,
                target_branch_id: Some(current.id.clone()),
                new_branch_topic: None,
                similarity: 1.0,
                confidence: 1.0,
                reason: "assistant_auto_stay".to_string(),
                reason_codes: vec!["assistant_auto_stay".to_string()],
            });
        }
        // No branch exists yet but an assistant message arrived first — still
        // needs somewhere to land; falls through to the first-branch rule.
    }

    // B. First branch.
    let Some(current) = input.current_branch else {
        let topic = topic::extract_topic(input.content);
        return Ok(Classification {
            action: Action::Branch,
            drift_action: DriftAction::BranchNewCluster,
            target_branch_id: None,
            new_branch_topic: Some(topic),
            similarity: 0.0,
            confidence: 1.0,
            reason: "first_branch".to_string(),
            reason_codes: vec!["first_branch".to_string()],
        });
    };

    // C. Uninitialized centroid.
    if current.centroid.is_empty() {
        return Ok(Classification {
            action: Action::Stay,
            drift_action: DriftAction::Stay,
            target_branch_id: Some(current.id.clone()),
            new_branch_topic: None,
            similarity: 1.0,
            confidence: 1.0,
            reason: "branch_no_centroid".to_string(),
            reason_codes: vec!["branch_no_centroid".to_string()],
        });
    }

    // D. Score current branch.
    let mut reason_codes = Vec::new();
    let (sim, analysis) = score_against_current(&input, current, embedding_client).await?;

    let act = similarity::drift_action(
        sim,
        input.policy.stay_threshold,
        input.policy.new_cluster_threshold,
    );

    for boost in &analysis.boosts_applied {
        reason_codes.push(boost.clone());
    }

    // E. STAY.
    if act == DriftAction::Stay {
        reason_codes.push("similar_to_current".to_string());
        let reason = if analysis.boosts_applied.is_empty() {
            format!(
                "similar_to_current (sim {:.3} > stayθ {:.3})",
                sim, input.policy.stay_threshold
            )
        } else {
            format!(
                "similar_to_current (sim {:.3} > stayθ {:.3}, boosts: {})",
                sim,
                input.policy.stay_threshold,
                analysis.boosts_applied.join(", ")
            )
        };

        return Ok(Classification {
            action: Action::Stay,
            drift_action: DriftAction::Stay,
            target_branch_id: Some(current.id.clone()),
            new_branch_topic: None,
            similarity: sim,
            confidence: sim,
            reason,
            reason_codes,
        });
    }

    // F. ROUTE candidate search.
    let topic_return = analysis.analysis.has_topic_return_signal;
    if let Some(best) = rank_route_candidates(input.other_branches, input.embedding, topic_return)?
    {
        if best.score > input.policy.route_threshold {
            if topic_return {
                reason_codes.push("topic_return_signal".to_string());
            }
            reason_codes.push("route_existing".to_string());
            let boost_note = if topic_return { ", topic_return_boost" } else { "" };
            let reason = format!(
                "routing_to_existing \"{}\" (score {:.3} > routeθ {:.3}{})",
                best.summary, best.score, input.policy.route_threshold, boost_note
            );

            return Ok(Classification {
                action: Action::Route,
                drift_action: similarity::drift_action(
                    best.score,
                    input.policy.stay_threshold,
                    input.policy.new_cluster_threshold,
                ),
                target_branch_id: Some(best.id),
                new_branch_topic: None,
                similarity: best.score,
                confidence: best.score,
                reason,
                reason_codes,
            });
        }
    }

    // G. BRANCH.
    let topic = topic::extract_topic(input.content);
    reason_codes.push(if act == DriftAction::BranchNewCluster {
        "branch_new_cluster".to_string()
    } else {
        "branch_same_cluster".to_string()
    });

    Ok(Classification {
        action: Action::Branch,
        drift_action: act,
        target_branch_id: Some(current.id.clone()), // parent for the new branch
        new_branch_topic: Some(topic),
        similarity: sim,
        confidence: 1.0 - sim,
        reason: format!(
            "{} (sim {:.3})",
            if act == DriftAction::BranchNewCluster {
                "branch_new_cluster"
            } else {
                "branch_same_cluster"
            },
            sim
        ),
        reason_codes,
    })
}

async fn score_against_current(
    input: &ClassifyInput<'_>,
    current: &BranchSummary,
    embedding_client: &Arc<dyn EmbeddingClient>,
) -> DriftResult<(f32, DriftAnalysis)> {
    let raw = similarity::cosine(input.embedding, &current.centroid)
        .map_err(|e| crate::error::DriftError::internal(e.to_string()))?;

    let Some(last) = input.last_message_content else {
        return Ok((raw, DriftAnalysis::fallback(raw)));
    };

    match embedding_client
        .analyze_drift(input.content, last, input.embedding, &current.centroid)
        .await
    {
        Ok(analysis) => Ok((analysis.boosted_similarity, analysis)),
        Err(_) => Ok((raw, DriftAnalysis::fallback(raw))),
    }
}

struct RouteCandidate {
    id: String,
    summary: String,
    score: f32,
    updated_at: chrono::DateTime<chrono::Utc>,
}

/// Score every other branch's centroid against the new embedding, apply the
/// topic-return boost if signalled, and rank by (score desc, updatedAt desc,
/// id desc). Branches with an empty centroid are skipped.
fn rank_route_candidates(
    others: &[BranchSummary],
    embedding: &[f32],
    topic_return_signal: bool,
) -> DriftResult<Option<RouteCandidate>> {
    let mut candidates = Vec::new();

    for branch in others {
        if branch.centroid.is_empty() {
            continue;
        }

        let raw = similarity::cosine(embedding, &branch.centroid)
            .map_err(|e| crate::error::DriftError::internal(e.to_string()))?;

        let score = if topic_return_signal {
            (raw * TOPIC_RETURN_BOOST_FACTOR).min(1.0)
        } else {
            raw
        };

        candidates.push(RouteCandidate {
            id: branch.id.clone(),
            summary: branch.summary.clone(),
            score,
            updated_at: branch.updated_at,
        });
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
            .then_with(|| b.id.cmp(&a.id))
    });

    Ok(candidates.into_iter().next())
}
