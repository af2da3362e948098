// src/config/routing.rs
// Thresholds and policy knobs for the drift-routing pipeline.
//
// The source this was distilled from carried two defaults for stayThreshold:
// an env-configurable 0.38 in the executor and an in-file 0.47 in the
// classifier. We pick the env-configurable path with fallback 0.47 as the one
// canonical default (see DESIGN.md) — nothing else in this crate may declare
// its own threshold constant.

use serde::{Deserialize, Serialize};

/// Multiplier applied to other-branch scores when the embedding service
/// reports a topic-return signal. Not env-overridable: a policy constant.
pub const TOPIC_RETURN_BOOST_FACTOR: f32 = 2.5;

/// Centroid update weight for user-authored messages.
pub const USER_CENTROID_WEIGHT: f32 = 3.0;

/// Centroid update weight for assistant-authored messages.
pub const ASSISTANT_CENTROID_WEIGHT: f32 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub stay_threshold: f32,
    pub new_cluster_threshold: f32,
    pub route_threshold: f32,
    pub max_branches_for_context: usize,
    pub pipeline_timeout_ms: u64,
    pub extract_facts_default: bool,
    pub preprocess_embeddings: bool,
}

impl RoutingConfig {
    pub fn from_env() -> Self {
        Self {
            stay_threshold: super::helpers::env_parsed("DRIFT_STAY_THRESHOLD", 0.47),
            new_cluster_threshold: super::helpers::env_parsed("DRIFT_NEW_CLUSTER_THRESHOLD", 0.20),
            route_threshold: super::helpers::env_parsed("DRIFT_ROUTE_THRESHOLD", 0.42),
            max_branches_for_context: super::helpers::env_parsed("DRIFT_MAX_BRANCHES", 10),
            pipeline_timeout_ms: super::helpers::env_parsed("DRIFT_PIPELINE_TIMEOUT_MS", 10_000),
            extract_facts_default: super::helpers::env_parsed(
                "DRIFT_EXTRACT_FACTS_DEFAULT",
                true,
            ),
            preprocess_embeddings: super::helpers::env_parsed(
                "DRIFT_PREPROCESS_EMBEDDINGS",
                false,
            ),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            stay_threshold: 0.47,
            new_cluster_threshold: 0.20,
            route_threshold: 0.42,
            max_branches_for_context: 10,
            pipeline_timeout_ms: 10_000,
            extract_facts_default: true,
            preprocess_embeddings: false,
        }
    }
}

/// Per-request overrides for the otherwise-global routing policy.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingOverrides {
    pub stay_threshold: Option<f32>,
    pub new_cluster_threshold: Option<f32>,
    pub route_threshold: Option<f32>,
}

impl RoutingConfig {
    /// Apply per-request threshold overrides, leaving policy constants untouched.
    pub fn with_overrides(&self, overrides: RoutingOverrides) -> Self {
        Self {
            stay_threshold: overrides.stay_threshold.unwrap_or(self.stay_threshold),
            new_cluster_threshold: overrides
                .new_cluster_threshold
                .unwrap_or(self.new_cluster_threshold),
            route_threshold: overrides.route_threshold.unwrap_or(self.route_threshold),
            ..*self
        }
    }
}
