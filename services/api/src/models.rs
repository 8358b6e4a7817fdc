//! API models for request and response payloads

use axum::Json;
use chrono::NaiveDate;
use common::{
    error::{ApiError, ApiResult},
    models::{Notification, Task, TaskDraft, TaskStatus},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Success envelope: `{"success": true, "data": ...}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data,
        })
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data,
        })
    }
}

/// Task as returned to clients, with the boolean completion flag alongside the status
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,
    pub completed: bool,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        let completed = task.is_completed();
        Self { task, completed }
    }
}

pub fn task_responses(tasks: Vec<Task>) -> Vec<TaskResponse> {
    tasks.into_iter().map(TaskResponse::from).collect()
}

/// `POST /tasks`
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub draft: TaskDraft,
}

/// `PATCH /tasks/:id/status`
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl StatusRequest {
    pub fn resolve(&self) -> ApiResult<TaskStatus> {
        self.status
            .or(self.completed.map(TaskStatus::from_completed))
            .ok_or_else(|| ApiError::BadRequest("status or completed is required".to_string()))
    }
}

/// `POST /tasks/sync` and `POST /tasks/ai-sync`
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub tasks: Option<Vec<TaskDraft>>,
    #[serde(default)]
    pub replace: Option<bool>,
}

impl SyncRequest {
    /// Date and task list, both mandatory, with every draft validated
    pub fn into_parts(self) -> ApiResult<(NaiveDate, Vec<TaskDraft>)> {
        let (Some(date), Some(mut tasks)) = (self.date, self.tasks) else {
            return Err(ApiError::BadRequest(
                "Date and tasks array required".to_string(),
            ));
        };
        for draft in tasks.iter_mut() {
            draft.validate().map_err(ApiError::BadRequest)?;
        }
        Ok((date, tasks))
    }
}

/// `POST /tasks/plan`
#[derive(Debug, Default, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// `POST /tasks/edit`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub edit_request: String,
}

/// `?date=` on task listings
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// `?limit=` on history listings
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<String>,
}

pub const DEFAULT_HISTORY_LIMIT: i64 = 7;
pub const MAX_HISTORY_LIMIT: i64 = 100;

impl LimitQuery {
    /// Positive integer limits are honored up to the cap; anything else means the default
    pub fn resolve(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|limit| *limit > 0)
            .map(|limit| limit.min(MAX_HISTORY_LIMIT))
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
    }
}

/// One entry of the 7-day statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStatistics {
    pub day_name: String,
    pub date: NaiveDate,
    pub completed: i64,
    pub total: i64,
}

/// `POST /notifications/devices`
#[derive(Debug, Deserialize)]
pub struct DeviceRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub platform: Option<String>,
}

/// `POST /notifications/send`
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Result of a send
#[derive(Debug, Serialize)]
pub struct SendReport {
    pub delivered: usize,
    pub failed: usize,
    pub notification: Notification,
}

/// Parse a path or query id
pub fn parse_id(raw: &str) -> ApiResult<Uuid> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid id '{}'", raw)))
}

/// Parse a `YYYY-MM-DD` path or query date
pub fn parse_date(raw: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}
