// src/main.rs
//
// Drift-routing engine HTTP server bootstrap.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use driftroute::config::CONFIG;
use driftroute::embedding::HttpEmbeddingClient;
use driftroute::facts::NoopFactExtractor;
use driftroute::state::AppState;
use driftroute::store::SqliteBranchStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&CONFIG.log_level))
        .init();

    info!("starting driftroute on {}", CONFIG.bind_address());

    let connect_options: SqliteConnectOptions = CONFIG
        .database
        .url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(CONFIG.database.max_connections)
        .connect_with(connect_options)
        .await?;

    let store = SqliteBranchStore::new(pool.clone());
    store.run_migrations().await?;

    let embedding_client = Arc::new(HttpEmbeddingClient::new(&CONFIG.embedding));
    let facts = Arc::new(NoopFactExtractor);

    let state = Arc::new(AppState::new(
        Arc::new(store),
        embedding_client,
        facts,
        CONFIG.routing,
        pool,
    ));

    let app: Router = driftroute::api::http::create_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_millis(
            CONFIG.routing.pipeline_timeout_ms + 1_000,
        )))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(CONFIG.bind_address()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
