//! Check-in and wearable routes. Every submission is a new entry.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use common::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    models::{NewCheckIn, NewWearableSample},
};

use crate::{
    AppState,
    models::{Envelope, LimitQuery},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tracking/daily-checkin", post(create_check_in))
        .route("/tracking/history", get(get_check_in_history))
        .route("/tracking/wearable-data", post(create_wearable_sample))
        .route("/tracking/wearables", get(get_wearable_samples))
}

pub async fn create_check_in(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<NewCheckIn>,
) -> ApiResult<impl IntoResponse> {
    payload.validate().map_err(ApiError::BadRequest)?;
    let check_in = state
        .repositories
        .tracking
        .insert_check_in(user.id, payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Envelope::with_message(check_in, "Check-in saved successfully"),
    ))
}

/// Most recent first, `?limit=` defaults to 7
pub async fn get_check_in_history(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LimitQuery>,
) -> ApiResult<impl IntoResponse> {
    let check_ins = state
        .repositories
        .tracking
        .list_check_ins(user.id, query.resolve())
        .await?;
    Ok(Envelope::data(check_ins))
}

pub async fn create_wearable_sample(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<NewWearableSample>,
) -> ApiResult<impl IntoResponse> {
    payload.validate().map_err(ApiError::BadRequest)?;
    let sample = state
        .repositories
        .tracking
        .insert_wearable_sample(user.id, payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Envelope::with_message(sample, "Wearable data saved successfully"),
    ))
}

pub async fn get_wearable_samples(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LimitQuery>,
) -> ApiResult<impl IntoResponse> {
    let samples = state
        .repositories
        .tracking
        .list_wearable_samples(user.id, query.resolve())
        .await?;
    Ok(Envelope::data(samples))
}
