//! Demo data route

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;
use common::{auth::AuthUser, error::ApiResult};
use tracing::info;

use crate::{AppState, models::Envelope, seed::build_demo_plan};

pub fn routes() -> Router<AppState> {
    Router::new().route("/seed/demo-data", post(seed_demo_data))
}

/// Replace the caller's tasks and check-ins with generated demo data
pub async fn seed_demo_data(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    info!("Seeding demo data for user {}", user.id);

    let today = Utc::now().date_naive();
    let plan = build_demo_plan(today, &state.seed_policy, &mut rand::thread_rng());
    let report = plan.apply(&state.repositories, user.id).await?;

    Ok((
        StatusCode::CREATED,
        Envelope::with_message(report, "Created demo data successfully"),
    ))
}
