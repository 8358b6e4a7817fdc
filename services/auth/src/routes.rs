//! Authentication service routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use common::{
    auth::{AuthUser, require_auth},
    error::{ApiError, ApiResult, AuthFailure},
    extract::ApiJson,
    models::{NewUser, PublicUser, User, user::normalize_email},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    AppState,
    password::{hash_password, verify_password},
    validation::{validate_email, validate_name, validate_password},
};

/// Request for user signup
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response for signup and login
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

/// Token issuance routes, without `/health`, for mounting into another router
pub fn auth_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(state.gate(), require_auth));

    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .merge(protected_routes)
        .with_state(state)
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes(state))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

fn issue_token(state: &AppState, user: &User, message: &str) -> ApiResult<TokenResponse> {
    let token = state.jwt_service.generate_token(user.id).map_err(|e| {
        error!("Failed to generate token: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(TokenResponse {
        success: true,
        message: message.to_string(),
        token,
        user: PublicUser::from(user),
    })
}

/// User signup endpoint
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = payload.name.trim().to_string();
    let email = normalize_email(&payload.email);

    validate_name(&name).map_err(ApiError::BadRequest)?;
    validate_email(&email).map_err(ApiError::BadRequest)?;
    validate_password(&payload.password).map_err(ApiError::BadRequest)?;

    info!("Signup attempt for: {}", email);

    if state.users.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::BadRequest(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!("{}", e);
        ApiError::InternalServerError
    })?;

    // The unique constraint still rejects a concurrent signup that passed the check
    let user = state
        .users
        .create_user(NewUser {
            name,
            email,
            password_hash,
        })
        .await?;

    info!("User registered: {}", user.id);
    let response = issue_token(&state, &user, "User registered successfully")?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email);
    validate_email(&email).map_err(ApiError::BadRequest)?;
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }

    info!("Login attempt for: {}", email);

    if !state.rate_limiter.is_allowed(&email).await {
        warn!("Login throttled for: {}", email);
        return Err(ApiError::TooManyRequests(
            "Too many failed login attempts. Please try again later.".to_string(),
        ));
    }

    let user = match state.users.find_user_by_email(&email).await? {
        Some(user) => user,
        None => {
            state.rate_limiter.record_failure(&email).await;
            return Err(ApiError::Unauthorized(AuthFailure::BadCredentials));
        }
    };

    let valid = verify_password(&user.password_hash, &payload.password).map_err(|e| {
        error!("Stored hash for {} is unusable: {}", user.id, e);
        ApiError::InternalServerError
    })?;

    if !valid {
        state.rate_limiter.record_failure(&email).await;
        return Err(ApiError::Unauthorized(AuthFailure::BadCredentials));
    }

    state.rate_limiter.reset(&email).await;
    let response = issue_token(&state, &user, "Login successful")?;
    Ok((StatusCode::OK, Json(response)))
}

/// Current user endpoint
pub async fn me(user: AuthUser) -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "user": user,
    }))
}
