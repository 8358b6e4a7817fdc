//! API service routes

use axum::{Json, Router, middleware, response::IntoResponse, routing::get};
use common::auth::require_auth;
use serde_json::json;

use crate::AppState;

pub mod notifications;
pub mod profile;
pub mod seed;
pub mod tasks;
pub mod tracking;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .merge(profile::routes())
        .merge(tasks::routes())
        .merge(tracking::routes())
        .merge(notifications::routes())
        .merge(seed::routes())
        .route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            require_auth,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state.clone())
        .merge(auth::routes::auth_routes(state.auth))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}
