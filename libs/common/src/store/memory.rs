//! In-memory storage backend
//!
//! All collections live behind one `RwLock`. A write holds the lock for the
//! whole operation, which makes the multi-step task reconciliations atomic.
//! When opened with a snapshot path, the state is loaded from that JSON file
//! at start and rewritten after every mutation. A mutation whose snapshot
//! write fails is not applied.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{NotificationStore, ProfileStore, TaskStore, TrackingStore, UserStore};
use crate::{
    error::{StoreError, StoreResult},
    models::{
        CheckIn, DayCount, DeviceToken, FacetKind, FacetRecord, NewCheckIn, NewNotification,
        NewUser, NewWearableSample, Notification, SyncOutcome, Task, TaskChanges, TaskDraft, User,
        WearableSample,
        profile::merge_documents,
        task::{parse_start_minute, sort_for_day, sort_for_listing},
    },
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct State {
    users: Vec<User>,
    facets: Vec<FacetRecord>,
    tasks: Vec<Task>,
    check_ins: Vec<CheckIn>,
    wearables: Vec<WearableSample>,
    devices: Vec<DeviceToken>,
    notifications: Vec<Notification>,
    #[serde(skip)]
    next_seq: i64,
}

impl State {
    fn next_seq(&mut self) -> i64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Rebuild the fields that are not part of the snapshot
    fn restore_derived(&mut self) {
        let mut seq = 0;
        for task in &mut self.tasks {
            seq += 1;
            task.seq = seq;
            task.start_minute = task.time.as_deref().and_then(parse_start_minute);
        }
        for check_in in &mut self.check_ins {
            seq += 1;
            check_in.seq = seq;
        }
        for sample in &mut self.wearables {
            seq += 1;
            sample.seq = seq;
        }
        for notification in &mut self.notifications {
            seq += 1;
            notification.seq = seq;
        }
        self.next_seq = seq;
    }

    fn tasks_for_date(&self, user_id: Uuid, date: NaiveDate) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id && t.date == date)
            .cloned()
            .collect();
        sort_for_day(&mut tasks);
        tasks
    }

    fn insert_drafts(&mut self, user_id: Uuid, date: NaiveDate, drafts: Vec<TaskDraft>) {
        let now = Utc::now();
        for draft in drafts {
            let seq = self.next_seq();
            self.tasks.push(draft.into_task(user_id, date, seq, now));
        }
    }
}

/// Store backed by process memory, optionally persisted to a JSON snapshot
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a file-backed store, loading the snapshot when it exists
    pub async fn open_snapshot(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let mut state: State = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Snapshot(format!("{}: {}", path.display(), e)))?;
                state.restore_derived();
                info!(
                    "Loaded snapshot {} ({} users, {} tasks)",
                    path.display(),
                    state.users.len(),
                    state.tasks.len()
                );
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => State::default(),
            Err(e) => {
                return Err(StoreError::Snapshot(format!("{}: {}", path.display(), e)));
            }
        };

        Ok(Self {
            state: RwLock::new(state),
            snapshot: Some(path),
        })
    }

    /// Apply `change` under the write lock.
    ///
    /// With a snapshot configured the change is made on a copy, and the copy
    /// replaces the live state only after it has been written to disk.
    async fn mutate<T, F>(&self, change: F) -> StoreResult<T>
    where
        F: FnOnce(&mut State) -> StoreResult<T> + Send,
        T: Send,
    {
        let mut state = self.state.write().await;
        let Some(path) = &self.snapshot else {
            return change(&mut *state);
        };

        let mut next = (*state).clone();
        let value = change(&mut next)?;
        write_snapshot(path, &next).await?;
        *state = next;
        Ok(value)
    }
}

async fn write_snapshot(path: &Path, state: &State) -> StoreResult<()> {
    let bytes =
        serde_json::to_vec_pretty(state).map_err(|e| StoreError::Snapshot(e.to_string()))?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| StoreError::Snapshot(format!("{}: {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::Snapshot(format!("{}: {}", path.display(), e)))?;
    debug!("Snapshot written to {}", path.display());
    Ok(())
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        self.mutate(|state| {
            if state.users.iter().any(|u| u.email == new_user.email) {
                return Err(StoreError::Duplicate(
                    "User with this email already exists".to_string(),
                ));
            }

            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                name: new_user.name,
                email: new_user.email,
                password_hash: new_user.password_hash,
                created_at: now,
                updated_at: now,
            };
            state.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn upsert_facet(
        &self,
        user_id: Uuid,
        kind: FacetKind,
        patch: Value,
        defaults: Value,
    ) -> StoreResult<FacetRecord> {
        self.mutate(|state| {
            let now = Utc::now();
            let record = match state
                .facets
                .iter_mut()
                .find(|f| f.user_id == user_id && f.kind == kind)
            {
                Some(existing) => {
                    merge_documents(&mut existing.data, &patch);
                    existing.updated_at = now;
                    existing.clone()
                }
                None => {
                    let mut data = defaults;
                    merge_documents(&mut data, &patch);
                    let record = FacetRecord {
                        user_id,
                        kind,
                        data,
                        created_at: now,
                        updated_at: now,
                    };
                    state.facets.push(record.clone());
                    record
                }
            };
            Ok(record)
        })
        .await
    }

    async fn find_facet(&self, user_id: Uuid, kind: FacetKind) -> StoreResult<Option<FacetRecord>> {
        let state = self.state.read().await;
        Ok(state
            .facets
            .iter()
            .find(|f| f.user_id == user_id && f.kind == kind)
            .cloned())
    }

    async fn delete_facet(&self, user_id: Uuid, kind: FacetKind) -> StoreResult<bool> {
        self.mutate(|state| {
            let before = state.facets.len();
            state
                .facets
                .retain(|f| !(f.user_id == user_id && f.kind == kind));
            Ok(state.facets.len() != before)
        })
        .await
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        draft: TaskDraft,
    ) -> StoreResult<Task> {
        self.mutate(|state| {
            let seq = state.next_seq();
            let task = draft.into_task(user_id, date, seq, Utc::now());
            state.tasks.push(task.clone());
            Ok(task)
        })
        .await
    }

    async fn list_tasks(&self, user_id: Uuid, date: Option<NaiveDate>) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        match date {
            Some(date) => Ok(state.tasks_for_date(user_id, date)),
            None => {
                let mut tasks: Vec<Task> = state
                    .tasks
                    .iter()
                    .filter(|t| t.user_id == user_id)
                    .cloned()
                    .collect();
                sort_for_listing(&mut tasks);
                Ok(tasks)
            }
        }
    }

    async fn find_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    async fn update_task(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>> {
        self.mutate(|state| {
            let Some(task) = state
                .tasks
                .iter_mut()
                .find(|t| t.id == id && t.user_id == user_id)
            else {
                return Ok(None);
            };

            task.apply(&changes);
            task.updated_at = Utc::now();
            Ok(Some(task.clone()))
        })
        .await
    }

    async fn delete_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        self.mutate(|state| {
            let before = state.tasks.len();
            state.tasks.retain(|t| !(t.id == id && t.user_id == user_id));
            Ok(state.tasks.len() != before)
        })
        .await
    }

    async fn replace_tasks_for_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        drafts: Vec<TaskDraft>,
    ) -> StoreResult<Vec<Task>> {
        self.mutate(|state| {
            state
                .tasks
                .retain(|t| !(t.user_id == user_id && t.date == date));
            state.insert_drafts(user_id, date, drafts);
            Ok(state.tasks_for_date(user_id, date))
        })
        .await
    }

    async fn insert_tasks_if_absent(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        drafts: Vec<TaskDraft>,
        replace: bool,
    ) -> StoreResult<SyncOutcome> {
        {
            let state = self.state.read().await;
            let existing = state.tasks_for_date(user_id, date);
            if !existing.is_empty() && !replace {
                return Ok(SyncOutcome::Unchanged(existing));
            }
        }

        self.mutate(|state| {
            let existing = state.tasks_for_date(user_id, date);
            if !existing.is_empty() && !replace {
                return Ok(SyncOutcome::Unchanged(existing));
            }

            if !existing.is_empty() {
                state
                    .tasks
                    .retain(|t| !(t.user_id == user_id && t.date == date));
            }
            state.insert_drafts(user_id, date, drafts);

            let tasks = state.tasks_for_date(user_id, date);
            if existing.is_empty() {
                Ok(SyncOutcome::Inserted(tasks))
            } else {
                Ok(SyncOutcome::Replaced(tasks))
            }
        })
        .await
    }

    async fn count_tasks_by_date(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<DayCount>> {
        let state = self.state.read().await;
        let mut counts: BTreeMap<NaiveDate, DayCount> = BTreeMap::new();
        for task in state
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id && t.date >= from && t.date <= to)
        {
            let entry = counts.entry(task.date).or_insert(DayCount {
                date: task.date,
                completed: 0,
                total: 0,
            });
            entry.total += 1;
            if task.is_completed() {
                entry.completed += 1;
            }
        }
        Ok(counts.into_values().collect())
    }

    async fn delete_all_tasks(&self, user_id: Uuid) -> StoreResult<u64> {
        self.mutate(|state| {
            let before = state.tasks.len();
            state.tasks.retain(|t| t.user_id != user_id);
            Ok((before - state.tasks.len()) as u64)
        })
        .await
    }
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn insert_check_in(&self, user_id: Uuid, check_in: NewCheckIn) -> StoreResult<CheckIn> {
        self.mutate(|state| {
            let now = Utc::now();
            let seq = state.next_seq();
            let record = CheckIn {
                id: Uuid::new_v4(),
                user_id,
                energy_level: check_in.energy_level,
                mood: check_in.mood,
                sleep_quality: check_in.sleep_quality,
                date: check_in.date.unwrap_or(now),
                seq,
                created_at: now,
            };
            state.check_ins.push(record.clone());
            Ok(record)
        })
        .await
    }

    async fn list_check_ins(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<CheckIn>> {
        let state = self.state.read().await;
        let mut check_ins: Vec<CheckIn> = state
            .check_ins
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        check_ins.sort_by(|a, b| (b.date, b.seq).cmp(&(a.date, a.seq)));
        check_ins.truncate(limit.max(0) as usize);
        Ok(check_ins)
    }

    async fn delete_all_check_ins(&self, user_id: Uuid) -> StoreResult<u64> {
        self.mutate(|state| {
            let before = state.check_ins.len();
            state.check_ins.retain(|c| c.user_id != user_id);
            Ok((before - state.check_ins.len()) as u64)
        })
        .await
    }

    async fn insert_wearable_sample(
        &self,
        user_id: Uuid,
        sample: NewWearableSample,
    ) -> StoreResult<WearableSample> {
        self.mutate(|state| {
            let now = Utc::now();
            let seq = state.next_seq();
            let record = WearableSample {
                id: Uuid::new_v4(),
                user_id,
                step_count: sample.step_count,
                resting_heart_rate: sample.resting_heart_rate,
                sleep_stages: sample.sleep_stages,
                activity_intensity: sample.activity_intensity,
                recorded_at: sample.recorded_at.unwrap_or(now),
                seq,
                created_at: now,
            };
            state.wearables.push(record.clone());
            Ok(record)
        })
        .await
    }

    async fn list_wearable_samples(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<WearableSample>> {
        let state = self.state.read().await;
        let mut samples: Vec<WearableSample> = state
            .wearables
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        samples.sort_by(|a, b| (b.recorded_at, b.seq).cmp(&(a.recorded_at, a.seq)));
        samples.truncate(limit.max(0) as usize);
        Ok(samples)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn register_device(
        &self,
        user_id: Uuid,
        token: &str,
        platform: Option<String>,
    ) -> StoreResult<DeviceToken> {
        self.mutate(|state| {
            let device = match state
                .devices
                .iter_mut()
                .find(|d| d.user_id == user_id && d.token == token)
            {
                Some(existing) => {
                    if platform.is_some() {
                        existing.platform = platform;
                    }
                    existing.clone()
                }
                None => {
                    let device = DeviceToken {
                        user_id,
                        token: token.to_string(),
                        platform,
                        created_at: Utc::now(),
                    };
                    state.devices.push(device.clone());
                    device
                }
            };
            Ok(device)
        })
        .await
    }

    async fn list_devices(&self, user_id: Uuid) -> StoreResult<Vec<DeviceToken>> {
        let state = self.state.read().await;
        Ok(state
            .devices
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn remove_device(&self, user_id: Uuid, token: &str) -> StoreResult<bool> {
        self.mutate(|state| {
            let before = state.devices.len();
            state
                .devices
                .retain(|d| !(d.user_id == user_id && d.token == token));
            Ok(state.devices.len() != before)
        })
        .await
    }

    async fn append_notification(
        &self,
        user_id: Uuid,
        notification: NewNotification,
    ) -> StoreResult<Notification> {
        self.mutate(|state| {
            let seq = state.next_seq();
            let record = Notification {
                id: Uuid::new_v4(),
                user_id,
                title: notification.title_or_default(),
                body: notification.body.clone().unwrap_or_default(),
                data: notification.data_or_default(),
                read: false,
                seq,
                created_at: Utc::now(),
            };
            state.notifications.push(record.clone());
            Ok(record)
        })
        .await
    }

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let state = self.state.read().await;
        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| (b.created_at, b.seq).cmp(&(a.created_at, a.seq)));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<Notification>> {
        self.mutate(|state| {
            let Some(notification) = state
                .notifications
                .iter_mut()
                .find(|n| n.id == id && n.user_id == user_id)
            else {
                return Ok(None);
            };
            notification.read = true;
            Ok(Some(notification.clone()))
        })
        .await
    }

    async fn delete_notification(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        self.mutate(|state| {
            let before = state.notifications.len();
            state
                .notifications
                .retain(|n| !(n.id == id && n.user_id == user_id));
            Ok(state.notifications.len() != before)
        })
        .await
    }

    async fn clear_notifications(&self, user_id: Uuid) -> StoreResult<u64> {
        self.mutate(|state| {
            let before = state.notifications.len();
            state.notifications.retain(|n| n.user_id != user_id);
            Ok((before - state.notifications.len()) as u64)
        })
        .await
    }
}
