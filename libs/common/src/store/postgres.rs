//! PostgreSQL storage backend

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use super::{NotificationStore, ProfileStore, TaskStore, TrackingStore, UserStore};
use crate::{
    error::{StoreError, StoreResult},
    models::{
        CheckIn, DayCount, DeviceToken, FacetKind, FacetRecord, NewCheckIn, NewNotification,
        NewUser, NewWearableSample, Notification, SyncOutcome, Task, TaskChanges, TaskDraft, User,
        WearableSample,
        tracking::SleepStages,
    },
};

const TASK_COLUMNS: &str = "id, seq, user_id, title, description, time, start_minute, \
    duration_minutes, priority, status, reason, ai_suggestion, avoid, is_ai_generated, date, \
    created_at, updated_at";

const DAY_ORDER: &str = "start_minute ASC NULLS LAST, created_at ASC, seq ASC";

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over an initialized pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_column<T: std::str::FromStr<Err = String>>(row: &PgRow, column: &str) -> StoreResult<T> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(StoreError::Corrupt)
}

fn duplicate_or(e: sqlx::Error, message: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(message.to_string())
        }
        _ => StoreError::Query(e),
    }
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn facet_from_row(row: &PgRow) -> StoreResult<FacetRecord> {
    Ok(FacetRecord {
        user_id: row.try_get("user_id")?,
        kind: parse_column(row, "kind")?,
        data: row.try_get("data")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn task_from_row(row: &PgRow) -> StoreResult<Task> {
    Ok(Task {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        time: row.try_get("time")?,
        duration_minutes: row.try_get("duration_minutes")?,
        priority: parse_column(row, "priority")?,
        status: parse_column(row, "status")?,
        reason: row.try_get("reason")?,
        ai_suggestion: row.try_get("ai_suggestion")?,
        avoid: row.try_get("avoid")?,
        is_ai_generated: row.try_get("is_ai_generated")?,
        date: row.try_get("date")?,
        start_minute: row.try_get("start_minute")?,
        seq: row.try_get("seq")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn check_in_from_row(row: &PgRow) -> StoreResult<CheckIn> {
    Ok(CheckIn {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        energy_level: row.try_get("energy_level")?,
        mood: parse_column(row, "mood")?,
        sleep_quality: parse_column(row, "sleep_quality")?,
        date: row.try_get("date")?,
        seq: row.try_get("seq")?,
        created_at: row.try_get("created_at")?,
    })
}

fn wearable_from_row(row: &PgRow) -> StoreResult<WearableSample> {
    let intensity: Option<String> = row.try_get("activity_intensity")?;
    Ok(WearableSample {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        step_count: row.try_get("step_count")?,
        resting_heart_rate: row.try_get("resting_heart_rate")?,
        sleep_stages: SleepStages {
            deep: row.try_get("sleep_deep")?,
            light: row.try_get("sleep_light")?,
            rem: row.try_get("sleep_rem")?,
        },
        activity_intensity: intensity
            .map(|s| s.parse())
            .transpose()
            .map_err(StoreError::Corrupt)?,
        recorded_at: row.try_get("recorded_at")?,
        seq: row.try_get("seq")?,
        created_at: row.try_get("created_at")?,
    })
}

fn device_from_row(row: &PgRow) -> StoreResult<DeviceToken> {
    Ok(DeviceToken {
        user_id: row.try_get("user_id")?,
        token: row.try_get("token")?,
        platform: row.try_get("platform")?,
        created_at: row.try_get("created_at")?,
    })
}

fn notification_from_row(row: &PgRow) -> StoreResult<Notification> {
    Ok(Notification {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        data: row.try_get("data")?,
        read: row.try_get("read")?,
        seq: row.try_get("seq")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn insert_draft(
    conn: &mut PgConnection,
    user_id: Uuid,
    date: NaiveDate,
    draft: TaskDraft,
) -> StoreResult<Task> {
    let status = draft.resolved_status();
    let start_minute = draft
        .time
        .as_deref()
        .and_then(crate::models::task::parse_start_minute);

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO tasks (id, user_id, title, description, time, start_minute, duration_minutes,
                           priority, status, reason, ai_suggestion, avoid, is_ai_generated, date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING {}
        "#,
        TASK_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.time)
    .bind(start_minute)
    .bind(draft.duration_minutes)
    .bind(draft.priority.as_str())
    .bind(status.as_str())
    .bind(&draft.reason)
    .bind(&draft.ai_suggestion)
    .bind(draft.avoid)
    .bind(draft.is_ai_generated)
    .bind(date)
    .fetch_one(&mut *conn)
    .await?;

    task_from_row(&row)
}

async fn tasks_for_date(
    conn: &mut PgConnection,
    user_id: Uuid,
    date: NaiveDate,
) -> StoreResult<Vec<Task>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tasks WHERE user_id = $1 AND date = $2 ORDER BY {}",
        TASK_COLUMNS, DAY_ORDER
    ))
    .bind(user_id)
    .bind(date)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(task_from_row).collect()
}

/// Serialize reconciliations of one user's day for the rest of the transaction
async fn lock_day(conn: &mut PgConnection, user_id: Uuid, date: NaiveDate) -> StoreResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("{}:{}", user_id, date))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        info!("Creating new user: {}", new_user.email);

        let row = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, "User with this email already exists"))?;

        user_from_row(&row)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        debug!("Finding user by email: {}", email);

        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        debug!("Finding user by ID: {}", id);

        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn upsert_facet(
        &self,
        user_id: Uuid,
        kind: FacetKind,
        patch: Value,
        defaults: Value,
    ) -> StoreResult<FacetRecord> {
        info!("Upserting {} facet for user {}", kind.as_str(), user_id);

        let row = sqlx::query(
            r#"
            INSERT INTO profile_facets (user_id, kind, data)
            VALUES ($1, $2, $3::jsonb || $4::jsonb)
            ON CONFLICT (user_id, kind)
            DO UPDATE SET data = profile_facets.data || $4::jsonb, updated_at = NOW()
            RETURNING user_id, kind, data, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(&defaults)
        .bind(&patch)
        .fetch_one(&self.pool)
        .await?;

        facet_from_row(&row)
    }

    async fn find_facet(&self, user_id: Uuid, kind: FacetKind) -> StoreResult<Option<FacetRecord>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, kind, data, created_at, updated_at
            FROM profile_facets
            WHERE user_id = $1 AND kind = $2
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(facet_from_row).transpose()
    }

    async fn delete_facet(&self, user_id: Uuid, kind: FacetKind) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM profile_facets WHERE user_id = $1 AND kind = $2")
            .bind(user_id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        draft: TaskDraft,
    ) -> StoreResult<Task> {
        let mut conn = self.pool.acquire().await?;
        insert_draft(&mut conn, user_id, date, draft).await
    }

    async fn list_tasks(&self, user_id: Uuid, date: Option<NaiveDate>) -> StoreResult<Vec<Task>> {
        match date {
            Some(date) => {
                let mut conn = self.pool.acquire().await?;
                tasks_for_date(&mut conn, user_id, date).await
            }
            None => {
                let rows = sqlx::query(&format!(
                    "SELECT {} FROM tasks WHERE user_id = $1 ORDER BY date DESC, {}",
                    TASK_COLUMNS, DAY_ORDER
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

                rows.iter().map(task_from_row).collect()
            }
        }
    }

    async fn find_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(task_from_row).transpose()
    }

    async fn update_task(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2 FOR UPDATE",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut task = task_from_row(&row)?;
        task.apply(&changes);

        let row = sqlx::query(&format!(
            r#"
            UPDATE tasks
            SET title = $3, description = $4, time = $5, start_minute = $6,
                duration_minutes = $7, priority = $8, status = $9, reason = $10,
                ai_suggestion = $11, avoid = $12, date = $13, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.time)
        .bind(task.start_minute)
        .bind(task.duration_minutes)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(&task.reason)
        .bind(&task.ai_suggestion)
        .bind(task.avoid)
        .bind(task.date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        task_from_row(&row).map(Some)
    }

    async fn delete_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn replace_tasks_for_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        drafts: Vec<TaskDraft>,
    ) -> StoreResult<Vec<Task>> {
        let mut tx = self.pool.begin().await?;
        lock_day(&mut tx, user_id, date).await?;

        let deleted = sqlx::query("DELETE FROM tasks WHERE user_id = $1 AND date = $2")
            .bind(user_id)
            .bind(date)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let inserted = drafts.len();
        for draft in drafts {
            insert_draft(&mut tx, user_id, date, draft).await?;
        }

        let tasks = tasks_for_date(&mut tx, user_id, date).await?;
        tx.commit().await?;

        info!(
            "Replaced {} tasks with {} for user {} on {}",
            deleted, inserted, user_id, date
        );
        Ok(tasks)
    }

    async fn insert_tasks_if_absent(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        drafts: Vec<TaskDraft>,
        replace: bool,
    ) -> StoreResult<SyncOutcome> {
        let mut tx = self.pool.begin().await?;
        lock_day(&mut tx, user_id, date).await?;

        let existing = tasks_for_date(&mut tx, user_id, date).await?;
        if !existing.is_empty() && !replace {
            tx.commit().await?;
            return Ok(SyncOutcome::Unchanged(existing));
        }

        if !existing.is_empty() {
            sqlx::query("DELETE FROM tasks WHERE user_id = $1 AND date = $2")
                .bind(user_id)
                .bind(date)
                .execute(&mut *tx)
                .await?;
        }
        for draft in drafts {
            insert_draft(&mut tx, user_id, date, draft).await?;
        }

        let tasks = tasks_for_date(&mut tx, user_id, date).await?;
        tx.commit().await?;

        if existing.is_empty() {
            Ok(SyncOutcome::Inserted(tasks))
        } else {
            Ok(SyncOutcome::Replaced(tasks))
        }
    }

    async fn count_tasks_by_date(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<DayCount>> {
        let rows = sqlx::query(
            r#"
            SELECT date,
                   COUNT(*) FILTER (WHERE status = 'Completed') AS completed,
                   COUNT(*) AS total
            FROM tasks
            WHERE user_id = $1 AND date BETWEEN $2 AND $3
            GROUP BY date
            ORDER BY date
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DayCount {
                    date: row.try_get("date")?,
                    completed: row.try_get("completed")?,
                    total: row.try_get("total")?,
                })
            })
            .collect()
    }

    async fn delete_all_tasks(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TrackingStore for PgStore {
    async fn insert_check_in(&self, user_id: Uuid, check_in: NewCheckIn) -> StoreResult<CheckIn> {
        let row = sqlx::query(
            r#"
            INSERT INTO daily_check_ins (id, user_id, energy_level, mood, sleep_quality, date)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW()))
            RETURNING id, seq, user_id, energy_level, mood, sleep_quality, date, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(check_in.energy_level)
        .bind(check_in.mood.as_str())
        .bind(check_in.sleep_quality.as_str())
        .bind(check_in.date)
        .fetch_one(&self.pool)
        .await?;

        check_in_from_row(&row)
    }

    async fn list_check_ins(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<CheckIn>> {
        let rows = sqlx::query(
            r#"
            SELECT id, seq, user_id, energy_level, mood, sleep_quality, date, created_at
            FROM daily_check_ins
            WHERE user_id = $1
            ORDER BY date DESC, seq DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(check_in_from_row).collect()
    }

    async fn delete_all_check_ins(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM daily_check_ins WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_wearable_sample(
        &self,
        user_id: Uuid,
        sample: NewWearableSample,
    ) -> StoreResult<WearableSample> {
        let row = sqlx::query(
            r#"
            INSERT INTO wearable_samples (id, user_id, step_count, resting_heart_rate,
                                          sleep_deep, sleep_light, sleep_rem,
                                          activity_intensity, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, NOW()))
            RETURNING id, seq, user_id, step_count, resting_heart_rate, sleep_deep,
                      sleep_light, sleep_rem, activity_intensity, recorded_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(sample.step_count)
        .bind(sample.resting_heart_rate)
        .bind(sample.sleep_stages.deep)
        .bind(sample.sleep_stages.light)
        .bind(sample.sleep_stages.rem)
        .bind(sample.activity_intensity.map(|i| i.as_str()))
        .bind(sample.recorded_at)
        .fetch_one(&self.pool)
        .await?;

        wearable_from_row(&row)
    }

    async fn list_wearable_samples(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<WearableSample>> {
        let rows = sqlx::query(
            r#"
            SELECT id, seq, user_id, step_count, resting_heart_rate, sleep_deep,
                   sleep_light, sleep_rem, activity_intensity, recorded_at, created_at
            FROM wearable_samples
            WHERE user_id = $1
            ORDER BY recorded_at DESC, seq DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(wearable_from_row).collect()
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn register_device(
        &self,
        user_id: Uuid,
        token: &str,
        platform: Option<String>,
    ) -> StoreResult<DeviceToken> {
        let row = sqlx::query(
            r#"
            INSERT INTO device_tokens (user_id, token, platform)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, token)
            DO UPDATE SET platform = COALESCE(EXCLUDED.platform, device_tokens.platform)
            RETURNING user_id, token, platform, created_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(&platform)
        .fetch_one(&self.pool)
        .await?;

        device_from_row(&row)
    }

    async fn list_devices(&self, user_id: Uuid) -> StoreResult<Vec<DeviceToken>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, token, platform, created_at
            FROM device_tokens
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(device_from_row).collect()
    }

    async fn remove_device(&self, user_id: Uuid, token: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM device_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn append_notification(
        &self,
        user_id: Uuid,
        notification: NewNotification,
    ) -> StoreResult<Notification> {
        let row = sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, body, data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, seq, user_id, title, body, data, read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(notification.title_or_default())
        .bind(notification.body.clone().unwrap_or_default())
        .bind(notification.data_or_default())
        .fetch_one(&self.pool)
        .await?;

        notification_from_row(&row)
    }

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, seq, user_id, title, body, data, read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, seq DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<Notification>> {
        let row = sqlx::query(
            r#"
            UPDATE notifications SET read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING id, seq, user_id, title, body, data, read, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(notification_from_row).transpose()
    }

    async fn delete_notification(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_notifications(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
