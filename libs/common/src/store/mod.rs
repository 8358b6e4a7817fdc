//! Storage layer
//!
//! Each collection sits behind an object-safe trait so the services can run
//! against PostgreSQL in production and against the in-memory (optionally
//! file-backed) store in demo mode and in tests. Every method takes the owning
//! `user_id` and every backend filters on it.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use uuid::Uuid;

use crate::{
    database::{DatabaseConfig, init_pool, migrate},
    error::StoreResult,
    models::{
        CheckIn, DayCount, DeviceToken, FacetKind, FacetRecord, NewCheckIn, NewNotification,
        NewUser, NewWearableSample, Notification, SyncOutcome, Task, TaskChanges, TaskDraft, User,
        WearableSample,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; fails with `StoreError::Duplicate` when the email is taken
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Create or update the facet document for `(user_id, kind)`.
    ///
    /// On create the document is `defaults` overlaid with `patch`; on update
    /// the fields present in `patch` overwrite the stored ones.
    async fn upsert_facet(
        &self,
        user_id: Uuid,
        kind: FacetKind,
        patch: Value,
        defaults: Value,
    ) -> StoreResult<FacetRecord>;
    async fn find_facet(&self, user_id: Uuid, kind: FacetKind) -> StoreResult<Option<FacetRecord>>;
    async fn delete_facet(&self, user_id: Uuid, kind: FacetKind) -> StoreResult<bool>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, user_id: Uuid, date: NaiveDate, draft: TaskDraft)
    -> StoreResult<Task>;
    /// With a date: day ordering. Without: newest date first.
    async fn list_tasks(&self, user_id: Uuid, date: Option<NaiveDate>) -> StoreResult<Vec<Task>>;
    async fn find_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Task>>;
    async fn update_task(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>>;
    async fn delete_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool>;
    /// Full-sync: drop every task of the date and insert `drafts`, atomically
    async fn replace_tasks_for_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        drafts: Vec<TaskDraft>,
    ) -> StoreResult<Vec<Task>>;
    /// Upsert-if-absent: insert when the date is empty, otherwise keep the
    /// existing tasks unless `replace` is set
    async fn insert_tasks_if_absent(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        drafts: Vec<TaskDraft>,
        replace: bool,
    ) -> StoreResult<SyncOutcome>;
    /// Completed/total counts for each date in `from..=to` that has tasks
    async fn count_tasks_by_date(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<DayCount>>;
    async fn delete_all_tasks(&self, user_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait TrackingStore: Send + Sync {
    async fn insert_check_in(&self, user_id: Uuid, check_in: NewCheckIn) -> StoreResult<CheckIn>;
    /// Most recent first
    async fn list_check_ins(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<CheckIn>>;
    async fn delete_all_check_ins(&self, user_id: Uuid) -> StoreResult<u64>;
    async fn insert_wearable_sample(
        &self,
        user_id: Uuid,
        sample: NewWearableSample,
    ) -> StoreResult<WearableSample>;
    /// Most recent first
    async fn list_wearable_samples(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<WearableSample>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn register_device(
        &self,
        user_id: Uuid,
        token: &str,
        platform: Option<String>,
    ) -> StoreResult<DeviceToken>;
    async fn list_devices(&self, user_id: Uuid) -> StoreResult<Vec<DeviceToken>>;
    async fn remove_device(&self, user_id: Uuid, token: &str) -> StoreResult<bool>;
    async fn append_notification(
        &self,
        user_id: Uuid,
        notification: NewNotification,
    ) -> StoreResult<Notification>;
    /// Newest first
    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>>;
    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<Notification>>;
    async fn delete_notification(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool>;
    async fn clear_notifications(&self, user_id: Uuid) -> StoreResult<u64>;
}

/// Handles to every collection, shared across handlers
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub tracking: Arc<dyn TrackingStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Repositories {
    /// Every collection served by one backend
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: UserStore + ProfileStore + TaskStore + TrackingStore + NotificationStore + 'static,
    {
        Self {
            users: backend.clone(),
            profiles: backend.clone(),
            tasks: backend.clone(),
            tracking: backend.clone(),
            notifications: backend,
        }
    }

    /// Fresh in-memory repositories
    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }
}

/// Which backend serves the repositories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
    File(PathBuf),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

impl StorageConfig {
    /// Create a new StorageConfig from environment variables
    ///
    /// # Environment Variables
    /// - `STORAGE_BACKEND`: `postgres`, `memory` or `file` (default: `postgres`)
    /// - `STORAGE_SNAPSHOT_PATH`: snapshot location for `file` (default: `aura-data.json`)
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "postgres".to_string());
        let backend = match backend.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            "file" => {
                let path = std::env::var("STORAGE_SNAPSHOT_PATH")
                    .unwrap_or_else(|_| "aura-data.json".to_string());
                StorageBackend::File(PathBuf::from(path))
            }
            other => anyhow::bail!("Unsupported STORAGE_BACKEND '{}'", other),
        };

        Ok(StorageConfig { backend })
    }
}

/// Open the configured backend
pub async fn open(config: &StorageConfig) -> anyhow::Result<Repositories> {
    match &config.backend {
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;
            migrate(&pool).await?;
            info!("Using PostgreSQL storage");
            Ok(Repositories::from_backend(Arc::new(PgStore::new(pool))))
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            Ok(Repositories::in_memory())
        }
        StorageBackend::File(path) => {
            let store = MemoryStore::open_snapshot(path).await?;
            info!("Using file storage at {}", path.display());
            Ok(Repositories::from_backend(Arc::new(store)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_storage_config_from_env() {
        unsafe {
            std::env::set_var("STORAGE_BACKEND", "file");
            std::env::set_var("STORAGE_SNAPSHOT_PATH", "/tmp/aura-test.json");
        }

        let config = StorageConfig::from_env().unwrap();
        assert_eq!(
            config.backend,
            StorageBackend::File(PathBuf::from("/tmp/aura-test.json"))
        );

        unsafe {
            std::env::set_var("STORAGE_BACKEND", "memory");
        }
        assert_eq!(
            StorageConfig::from_env().unwrap().backend,
            StorageBackend::Memory
        );

        unsafe {
            std::env::set_var("STORAGE_BACKEND", "mongo");
        }
        assert!(StorageConfig::from_env().is_err());

        unsafe {
            std::env::remove_var("STORAGE_BACKEND");
            std::env::remove_var("STORAGE_SNAPSHOT_PATH");
        }
        assert_eq!(
            StorageConfig::from_env().unwrap().backend,
            StorageBackend::Postgres
        );
    }
}
