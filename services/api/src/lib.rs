//! Aura API service
//!
//! Profile facets, tasks and day planning, check-ins and wearables, demo
//! data and notifications, all behind the bearer-token gate. The signup and
//! login routes of the auth service are mounted alongside.

pub mod config;
pub mod models;
pub mod notifier;
pub mod planner;
pub mod routes;
pub mod seed;
pub mod state;
pub mod statistics;

pub use state::AppState;
