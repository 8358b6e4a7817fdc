//! Common library for the Aura services
//!
//! This crate provides shared functionality used across the Aura services:
//! the domain model, storage traits with their PostgreSQL and in-memory
//! backends, token handling, the authentication gate and the HTTP error type.
//!
//! ```rust,no_run
//! use common::store::{StorageConfig, open};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StorageConfig::from_env()?;
//!     let repositories = open(&config).await?;
//!     let user = repositories.users.find_user_by_email("asha@example.com").await?;
//!     println!("Found user: {}", user.is_some());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod database;
pub mod error;
pub mod extract;
pub mod jwt;
pub mod models;
pub mod store;
