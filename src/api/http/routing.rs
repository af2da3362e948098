// src/api/http/routing.rs
//
// The routing endpoint: POST /messages, aliased at POST /drift/route (§6).

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::config::routing::RoutingOverrides;
use crate::error::{DriftError, DriftResult};
use crate::executor::RouteResponse;
use crate::pipeline::RouteRequest;
use crate::state::AppState;
use crate::store::models::Role;

pub fn create_routing_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/messages", post(route_message))
        .route("/drift/route", post(route_message))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteMessageRequest {
    conversation_id: String,
    content: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    current_branch_id: Option<String>,
    #[serde(default)]
    extract_facts: Option<bool>,
    #[serde(default)]
    overrides: RoutingOverrides,
}

#[derive(Debug, Serialize)]
struct ApiSuccess {
    success: bool,
    data: RouteResponse,
}

async fn route_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RouteMessageRequest>,
) -> DriftResult<Json<ApiSuccess>> {
    let role = match req.role.as_deref() {
        None => Role::User,
        Some(raw) => {
            Role::parse(raw).ok_or_else(|| DriftError::invalid_input(format!("invalid role: {raw}")))?
        }
    };

    let response = state
        .pipeline
        .route(RouteRequest {
            conversation_id: req.conversation_id,
            content: req.content,
            role,
            current_branch_id: req.current_branch_id,
            extract_facts: req.extract_facts,
            overrides: req.overrides,
        })
        .await?;

    Ok(Json(ApiSuccess {
        success: true,
        data: response,
    }))
}
