// src/state.rs
// Shared application state handed to every axum handler via `State<Arc<AppState>>`.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::routing::RoutingConfig;
use crate::embedding::EmbeddingClient;
use crate::pipeline::RoutingPipeline;
use crate::store::BranchStore;

pub struct AppState {
    pub pipeline: RoutingPipeline,
    pub sqlite_pool: SqlitePool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn BranchStore>,
        embedding_client: Arc<dyn EmbeddingClient>,
        facts: Arc<dyn crate::facts::FactExtractor>,
        policy: RoutingConfig,
        sqlite_pool: SqlitePool,
    ) -> Self {
        Self {
            pipeline: RoutingPipeline::new(store, embedding_client, facts, policy),
            sqlite_pool,
        }
    }
}
