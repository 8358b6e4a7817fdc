//! Aura authentication service
//!
//! Issues tokens (signup, login) and resolves the current user. The router is
//! exposed so the api service can mount the same routes in-process.

pub mod config;
pub mod password;
pub mod rate_limiter;
pub mod routes;
pub mod state;
pub mod validation;

pub use state::AppState;
