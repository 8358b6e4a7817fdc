//! Device registration, push sending and the notification inbox

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use common::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    models::NewNotification,
};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    AppState,
    models::{DeviceRequest, Envelope, SendReport, SendRequest, parse_id},
    notifier::PushMessage,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(list_notifications)
                .post(create_notification)
                .delete(clear_notifications),
        )
        .route(
            "/notifications/devices",
            get(list_devices).post(register_device),
        )
        .route("/notifications/devices/:token", delete(remove_device))
        .route("/notifications/send", post(send_notification))
        .route("/notifications/:id/read", patch(mark_notification_read))
        .route("/notifications/:id", delete(delete_notification))
}

fn notification_not_found() -> ApiError {
    ApiError::NotFound("Notification not found".to_string())
}

pub async fn register_device(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<DeviceRequest>,
) -> ApiResult<impl IntoResponse> {
    let token = payload.token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest("Device token is required".to_string()));
    }

    let device = state
        .repositories
        .notifications
        .register_device(user.id, token, payload.platform)
        .await?;

    info!("Registered device for user {}", user.id);
    Ok((
        StatusCode::CREATED,
        Envelope::with_message(device, "Device registered successfully"),
    ))
}

pub async fn list_devices(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let devices = state
        .repositories
        .notifications
        .list_devices(user.id)
        .await?;
    Ok(Envelope::data(devices))
}

pub async fn remove_device(
    State(state): State<AppState>,
    user: AuthUser,
    Path(token): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if !state
        .repositories
        .notifications
        .remove_device(user.id, &token)
        .await?
    {
        return Err(ApiError::NotFound("Device not found".to_string()));
    }
    Ok(Json(json!({
        "success": true,
        "message": "Device removed successfully",
    })))
}

/// Push to one token, or to every device of the caller, then keep a copy in the inbox.
///
/// Fails with 502 only when no delivery succeeded.
pub async fn send_notification(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<SendRequest>,
) -> ApiResult<impl IntoResponse> {
    let tokens: Vec<String> = match payload.token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => vec![token.to_string()],
        _ => state
            .repositories
            .notifications
            .list_devices(user.id)
            .await?
            .into_iter()
            .map(|device| device.token)
            .collect(),
    };
    if tokens.is_empty() {
        return Err(ApiError::BadRequest(
            "No registered devices to notify".to_string(),
        ));
    }

    let notification = NewNotification {
        title: payload.title,
        body: payload.body,
        data: payload.data,
    };
    let title = notification.title_or_default();
    let body = notification.body.clone().unwrap_or_default();
    let data = notification.data_or_default();

    let mut delivered = 0;
    let mut failed = 0;
    for token in tokens {
        let message = PushMessage {
            token,
            title: title.clone(),
            body: body.clone(),
            data: data.clone(),
        };
        match state.push.send(&message).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                warn!("Push to a device of user {} failed: {}", user.id, e);
                failed += 1;
            }
        }
    }

    if delivered == 0 {
        return Err(ApiError::Upstream(format!(
            "Push delivery failed for all {} devices",
            failed
        )));
    }

    let notification = state
        .repositories
        .notifications
        .append_notification(user.id, notification)
        .await?;

    Ok(Envelope::with_message(
        SendReport {
            delivered,
            failed,
            notification,
        },
        "Notification sent",
    ))
}

/// Append to the inbox without pushing
pub async fn create_notification(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<NewNotification>,
) -> ApiResult<impl IntoResponse> {
    let notification = state
        .repositories
        .notifications
        .append_notification(user.id, payload)
        .await?;
    Ok((StatusCode::CREATED, Envelope::data(notification)))
}

/// Newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let notifications = state
        .repositories
        .notifications
        .list_notifications(user.id)
        .await?;
    Ok(Envelope::data(notifications))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let notification = state
        .repositories
        .notifications
        .mark_notification_read(user.id, id)
        .await?
        .ok_or_else(notification_not_found)?;
    Ok(Envelope::data(notification))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    if !state
        .repositories
        .notifications
        .delete_notification(user.id, id)
        .await?
    {
        return Err(notification_not_found());
    }
    Ok(Json(json!({
        "success": true,
        "message": "Notification deleted",
    })))
}

pub async fn clear_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let removed = state
        .repositories
        .notifications
        .clear_notifications(user.id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Notifications cleared",
        "removed": removed,
    })))
}
