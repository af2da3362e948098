// tests/pipeline_routing_test.rs
// End-to-end routing scenarios against an in-memory SQLite store and a
// deterministic fake embedding client, mirroring the literal scenarios a
// drift-routing engine is expected to handle.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;

use driftroute::classifier::Action;
use driftroute::config::routing::{RoutingConfig, RoutingOverrides};
use driftroute::embedding::{DriftAnalysis, EmbeddingClient, HealthStatus};
use driftroute::error::{DriftError, DriftResult};
use driftroute::facts::NoopFactExtractor;
use driftroute::pipeline::{RouteRequest, RoutingPipeline};
use driftroute::store::models::Role;
use driftroute::store::SqliteBranchStore;

const MSG_FIRST: &str = "I want to book a hotel in Paris for my trip next month";
const MSG_PARAPHRASE: &str = "Looking to reserve accommodation in Paris for next month";
const MSG_OFF_TOPIC: &str = "How do I fix a Python memory leak?";
const MSG_ROUTE_BACK: &str = "Back to Paris - any hotel near the Eiffel Tower?";
const MSG_ASSISTANT: &str = "Completely unrelated assistant text about quantum chromodynamics";

struct FakeEmbeddingClient;

impl FakeEmbeddingClient {
    fn vector_for(text: &str) -> Vec<f32> {
        match text {
            MSG_FIRST => vec![1.0, 0.0, 0.0],
            MSG_PARAPHRASE => vec![0.95, 0.05, 0.0],
            MSG_OFF_TOPIC => vec![0.0, 1.0, 0.0],
            MSG_ROUTE_BACK => vec![0.9, 0.0, 0.1],
            MSG_ASSISTANT => vec![0.0, 0.0, 1.0],
            other => match other.strip_prefix("topic-").and_then(|n| n.parse::<usize>().ok()) {
                // A one-hot vector per topic index: mutually orthogonal, so
                // every distinct topic is a fresh cluster relative to every
                // other, letting tests build many unrelated branches.
                Some(n) => {
                    let mut v = vec![0.0; 8];
                    v[n] = 1.0;
                    v
                }
                None => panic!("unmapped fixture text: {other}"),
            },
        }
    }
}

#[async_trait]
impl EmbeddingClient for FakeEmbeddingClient {
    async fn embed(&self, text: &str, _preprocess: bool) -> DriftResult<Vec<f32>> {
        Ok(Self::vector_for(text))
    }

    async fn similarity(&self, t1: &str, t2: &str, _preprocess: bool) -> DriftResult<f32> {
        driftroute::similarity::cosine(&Self::vector_for(t1), &Self::vector_for(t2))
            .map_err(|e| DriftError::internal(e.to_string()))
    }

    async fn analyze_drift(
        &self,
        current: &str,
        _previous: &str,
        current_embedding: &[f32],
        branch_centroid: &[f32],
    ) -> DriftResult<DriftAnalysis> {
        let raw = driftroute::similarity::cosine(current_embedding, branch_centroid)
            .map_err(|e| DriftError::internal(e.to_string()))?;

        let mut analysis = DriftAnalysis::fallback(raw);
        analysis.analysis.has_topic_return_signal = current.to_lowercase().contains("back to");
        Ok(analysis)
    }

    async fn health(&self) -> DriftResult<HealthStatus> {
        Ok(HealthStatus {
            status: "ok".to_string(),
            model: None,
            dimension: Some(3),
        })
    }
}

async fn test_pipeline() -> RoutingPipeline {
    test_pipeline_with_policy(RoutingConfig::default()).await
}

async fn test_pipeline_with_policy(policy: RoutingConfig) -> RoutingPipeline {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite pool");

    let store = SqliteBranchStore::new(pool);
    store.run_migrations().await.expect("run migrations");

    RoutingPipeline::new(
        Arc::new(store),
        Arc::new(FakeEmbeddingClient),
        Arc::new(NoopFactExtractor),
        policy,
    )
}

fn request(conversation_id: &str, content: &str, role: Role) -> RouteRequest {
    RouteRequest {
        conversation_id: conversation_id.to_string(),
        content: content.to_string(),
        role,
        current_branch_id: None,
        extract_facts: Some(false),
        overrides: RoutingOverrides::default(),
    }
}

#[tokio::test]
async fn first_message_creates_a_new_cluster_branch() {
    let pipeline = test_pipeline().await;

    let response = pipeline
        .route(request("c1", MSG_FIRST, Role::User))
        .await
        .expect("route succeeds");

    assert_eq!(response.action, Action::Branch);
    assert_eq!(response.is_new_branch, true);
    assert_eq!(response.is_new_cluster, true);
    assert_eq!(response.similarity, 0.0);
}

#[tokio::test]
async fn paraphrase_stays_on_the_same_branch() {
    let pipeline = test_pipeline().await;

    let first = pipeline
        .route(request("c2", MSG_FIRST, Role::User))
        .await
        .unwrap();

    let second = pipeline
        .route(request("c2", MSG_PARAPHRASE, Role::User))
        .await
        .unwrap();

    assert_eq!(second.action, Action::Stay);
    assert_eq!(second.branch_id, first.branch_id);
    assert!(second.similarity > 0.47);
}

#[tokio::test]
async fn off_topic_message_opens_a_new_cluster_branch() {
    let pipeline = test_pipeline().await;

    pipeline.route(request("c3", MSG_FIRST, Role::User)).await.unwrap();
    pipeline
        .route(request("c3", MSG_PARAPHRASE, Role::User))
        .await
        .unwrap();

    let third = pipeline
        .route(request("c3", MSG_OFF_TOPIC, Role::User))
        .await
        .unwrap();

    assert_eq!(third.action, Action::Branch);
    assert_eq!(third.is_new_branch, true);
    assert_eq!(third.is_new_cluster, true);
}

#[tokio::test]
async fn route_back_returns_to_the_original_branch_on_topic_return_signal() {
    let pipeline = test_pipeline().await;

    let first = pipeline.route(request("c4", MSG_FIRST, Role::User)).await.unwrap();
    pipeline
        .route(request("c4", MSG_PARAPHRASE, Role::User))
        .await
        .unwrap();
    pipeline
        .route(request("c4", MSG_OFF_TOPIC, Role::User))
        .await
        .unwrap();

    let fourth = pipeline
        .route(request("c4", MSG_ROUTE_BACK, Role::User))
        .await
        .unwrap();

    assert_eq!(fourth.action, Action::Route);
    assert_eq!(fourth.branch_id, first.branch_id);
    assert_eq!(fourth.is_new_branch, false);
}

#[tokio::test]
async fn assistant_messages_never_branch() {
    let pipeline = test_pipeline().await;

    pipeline.route(request("c5", MSG_FIRST, Role::User)).await.unwrap();

    let reply = pipeline
        .route(request("c5", MSG_ASSISTANT, Role::Assistant))
        .await
        .unwrap();

    assert_eq!(reply.action, Action::Stay);
    assert_eq!(reply.similarity, 1.0);
    assert_eq!(reply.reason_codes, vec!["assistant_auto_stay".to_string()]);
}

#[tokio::test]
async fn empty_content_is_rejected() {
    let pipeline = test_pipeline().await;

    let err = pipeline
        .route(request("c6", "", Role::User))
        .await
        .expect_err("empty content must fail validation");

    match err {
        DriftError::InvalidInput(msg) => assert!(msg.contains("content")),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_current_branch_id_fails_with_branch_not_found() {
    let pipeline = test_pipeline().await;

    pipeline.route(request("c7", MSG_FIRST, Role::User)).await.unwrap();

    let mut req = request("c7", MSG_PARAPHRASE, Role::User);
    req.current_branch_id = Some("does-not-exist".to_string());

    let err = pipeline.route(req).await.expect_err("unknown branch id must fail");
    assert!(matches!(err, DriftError::BranchNotFound(_)));
}

#[tokio::test]
async fn explicit_current_branch_id_resolves_even_when_truncated_from_context_cap() {
    let policy = RoutingConfig {
        max_branches_for_context: 3,
        ..RoutingConfig::default()
    };
    let pipeline = test_pipeline_with_policy(policy).await;

    // Five distinct, mutually orthogonal topics each open a new cluster
    // branch. Branch 0 is the oldest by updatedAt and falls outside a
    // 3-branch context cap if current-branch resolution ran after
    // truncation instead of before it.
    let first = pipeline
        .route(request("c8", "topic-0", Role::User))
        .await
        .unwrap();
    for i in 1..5 {
        pipeline
            .route(request("c8", &format!("topic-{i}"), Role::User))
            .await
            .unwrap();
    }

    let mut req = request("c8", "topic-0", Role::User);
    req.current_branch_id = Some(first.branch_id.clone());

    let response = pipeline
        .route(req)
        .await
        .expect("an explicitly requested current branch id must resolve even when truncated out of the context window");

    assert_eq!(response.action, Action::Stay);
    assert_eq!(response.branch_id, first.branch_id);
}
