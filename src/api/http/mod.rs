// src/api/http/mod.rs

pub mod health;
pub mod routing;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(routing::create_routing_router())
        .merge(health::create_health_router())
}
