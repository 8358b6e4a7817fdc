//! Authentication gate shared by the services
//!
//! `require_auth` validates the bearer token, loads the user it names and
//! inserts an [`AuthUser`] into the request extensions. Handlers take
//! `AuthUser` as an extractor; it is the only source of the caller's id.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, AuthFailure},
    jwt::JwtService,
    models::User,
    store::UserStore,
};

/// Authenticated user information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// Everything the gate needs to admit a request
#[derive(Clone)]
pub struct AuthGate {
    pub jwt: JwtService,
    pub users: Arc<dyn UserStore>,
}

impl AuthGate {
    pub fn new(jwt: JwtService, users: Arc<dyn UserStore>) -> Self {
        Self { jwt, users }
    }

    /// Resolve an `Authorization` header value to the user it belongs to.
    ///
    /// Token problems are `ApiError::Unauthorized`; a failed user lookup is a
    /// storage error and renders as 500.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<AuthUser, ApiError> {
        let token = bearer_token(header)?;
        let claims = self.jwt.validate_token(token)?;

        let user = self
            .users
            .find_user_by_id(claims.sub)
            .await
            .inspect_err(|e| error!("Failed to load user {}: {}", claims.sub, e))?
            .ok_or(AuthFailure::UnknownUser)?;

        Ok(AuthUser::from(&user))
    }
}

/// Pull the token out of a `Bearer <token>` header value
fn bearer_token(header: Option<&str>) -> Result<&str, AuthFailure> {
    let header = header.ok_or(AuthFailure::MissingToken)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthFailure::MissingToken)?
        .trim();

    if token.is_empty() {
        return Err(AuthFailure::MalformedToken);
    }
    Ok(token)
}

/// Authentication middleware
pub async fn require_auth(
    State(gate): State<AuthGate>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .map(str::to_owned);

    let user = gate
        .authenticate(header.as_deref())
        .await
        .inspect_err(|e| {
            if let ApiError::Unauthorized(reason) = e {
                warn!("Rejected request to {}: {}", req.uri().path(), reason.message());
            }
        })?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized(AuthFailure::MissingToken))
    }
}
