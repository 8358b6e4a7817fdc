//! Application state shared across handlers

use common::{auth::AuthGate, jwt::JwtService, store::UserStore};
use std::sync::Arc;

use crate::rate_limiter::{RateLimiter, RateLimiterConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub jwt_service: JwtService,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        jwt_service: JwtService,
        throttle: RateLimiterConfig,
    ) -> Self {
        Self {
            users,
            jwt_service,
            rate_limiter: RateLimiter::new(throttle),
        }
    }

    /// Gate for the routes that need a signed-in caller
    pub fn gate(&self) -> AuthGate {
        AuthGate::new(self.jwt_service.clone(), self.users.clone())
    }
}
