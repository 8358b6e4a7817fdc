//! Client for the external task planner
//!
//! The planner is a third-party HTTP service that proposes a day of tasks for
//! a user (`GET {base}/plan_tasks?user_id=`) and rewrites an existing day from a
//! free-text request (`POST {base}/edit_tasks`). Its response shape is not
//! versioned, so task lists are accepted from an `output` field, a `tasks`
//! field, or a bare array.

use async_trait::async_trait;
use common::{
    error::ApiError,
    models::{Task, TaskDraft},
};
use serde::Serialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::PlannerSettings, models::TaskResponse};

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("No task planner is configured")]
    NotConfigured,

    #[error("Task planner did not answer within {0} seconds")]
    Timeout(u64),

    #[error("Task planner request failed: {0}")]
    Request(String),

    #[error("Task planner answered with status {0}")]
    Status(u16),

    #[error("Task planner response is malformed: {0}")]
    Malformed(String),
}

impl From<PlannerError> for ApiError {
    fn from(error: PlannerError) -> Self {
        ApiError::Upstream(error.to_string())
    }
}

/// Produces and edits day plans
#[async_trait]
pub trait TaskPlanner: Send + Sync {
    /// Propose tasks for the user's current day
    async fn plan_tasks(&self, user_id: Uuid) -> Result<Vec<TaskDraft>, PlannerError>;

    /// Rewrite `tasks` according to a free-text request
    async fn edit_tasks(
        &self,
        user_id: Uuid,
        edit_request: &str,
        tasks: &[Task],
    ) -> Result<Vec<TaskDraft>, PlannerError>;
}

/// Planner used when no base URL is configured; every call fails
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredPlanner;

#[async_trait]
impl TaskPlanner for UnconfiguredPlanner {
    async fn plan_tasks(&self, _user_id: Uuid) -> Result<Vec<TaskDraft>, PlannerError> {
        Err(PlannerError::NotConfigured)
    }

    async fn edit_tasks(
        &self,
        _user_id: Uuid,
        _edit_request: &str,
        _tasks: &[Task],
    ) -> Result<Vec<TaskDraft>, PlannerError> {
        Err(PlannerError::NotConfigured)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EditPayload<'a> {
    #[serde(rename = "user_id")]
    user_id: Uuid,
    edit_request: &'a str,
    tasks: Vec<TaskResponse>,
}

/// HTTP planner client
pub struct HttpPlanner {
    base_url: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl HttpPlanner {
    pub fn new(base_url: &str, timeout_seconds: u64) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent("aura-api/1.0")
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_seconds,
            http_client,
        })
    }

    fn request_error(&self, error: reqwest::Error) -> PlannerError {
        if error.is_timeout() {
            PlannerError::Timeout(self.timeout_seconds)
        } else {
            PlannerError::Request(error.to_string())
        }
    }

    async fn read_tasks(&self, response: reqwest::Response) -> Result<Vec<TaskDraft>, PlannerError> {
        let status = response.status();
        if !status.is_success() {
            return Err(PlannerError::Status(status.as_u16()));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| self.request_error(e))?;
        extract_tasks(body)
    }
}

#[async_trait]
impl TaskPlanner for HttpPlanner {
    async fn plan_tasks(&self, user_id: Uuid) -> Result<Vec<TaskDraft>, PlannerError> {
        let url = format!("{}/plan_tasks", self.base_url);
        debug!(%user_id, url = %url, "Requesting day plan");

        let response = self
            .http_client
            .get(&url)
            .query(&[("user_id", user_id.to_string())])
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        self.read_tasks(response).await
    }

    async fn edit_tasks(
        &self,
        user_id: Uuid,
        edit_request: &str,
        tasks: &[Task],
    ) -> Result<Vec<TaskDraft>, PlannerError> {
        let url = format!("{}/edit_tasks", self.base_url);
        debug!(%user_id, url = %url, tasks = tasks.len(), "Requesting plan edit");

        let payload = EditPayload {
            user_id,
            edit_request,
            tasks: tasks.iter().cloned().map(TaskResponse::from).collect(),
        };
        let response = self
            .http_client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        self.read_tasks(response).await
    }
}

/// Build the planner the settings ask for
pub fn from_settings(settings: &PlannerSettings) -> anyhow::Result<Arc<dyn TaskPlanner>> {
    match settings.base_url.as_deref().map(str::trim) {
        Some(base_url) if !base_url.is_empty() => {
            Ok(Arc::new(HttpPlanner::new(base_url, settings.timeout_seconds)?))
        }
        _ => {
            warn!("No task planner configured, day plans will use the default template");
            Ok(Arc::new(UnconfiguredPlanner))
        }
    }
}

/// Pull the task list out of a planner response.
///
/// Drafts whose title is blank after trimming are dropped.
pub fn extract_tasks(body: Value) -> Result<Vec<TaskDraft>, PlannerError> {
    let list = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match (map.remove("output"), map.remove("tasks")) {
            (Some(Value::Array(items)), _) => items,
            (_, Some(Value::Array(items))) => items,
            _ => {
                return Err(PlannerError::Malformed(
                    "expected an array in 'output' or 'tasks'".to_string(),
                ));
            }
        },
        other => {
            return Err(PlannerError::Malformed(format!(
                "unexpected response of type {}",
                json_type(&other)
            )));
        }
    };

    let mut drafts = Vec::with_capacity(list.len());
    for item in list {
        let mut draft: TaskDraft =
            serde_json::from_value(item).map_err(|e| PlannerError::Malformed(e.to_string()))?;
        if draft.validate().is_ok() {
            drafts.push(draft);
        }
    }
    Ok(drafts)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_from_output_tasks_or_array() {
        let task = json!({"task": "Deep work", "time": "9:00 AM", "is_AI_generated": true});

        let drafts = extract_tasks(json!({"output": [task.clone()]})).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Deep work");
        assert!(drafts[0].is_ai_generated);

        let drafts = extract_tasks(json!({"tasks": [task.clone()], "output": "text"})).unwrap();
        assert_eq!(drafts.len(), 1);

        let drafts = extract_tasks(json!([task, {"task": "  "}])).unwrap();
        assert_eq!(drafts.len(), 1);
    }

    #[test]
    fn test_extract_rejects_unexpected_shapes() {
        assert!(matches!(
            extract_tasks(json!({"message": "ok"})),
            Err(PlannerError::Malformed(_))
        ));
        assert!(matches!(
            extract_tasks(json!("plain text")),
            Err(PlannerError::Malformed(_))
        ));
        assert!(matches!(
            extract_tasks(json!([{"priority": "High"}])),
            Err(PlannerError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_planner_fails() {
        let planner = from_settings(&PlannerSettings::default()).unwrap();
        assert!(matches!(
            planner.plan_tasks(Uuid::new_v4()).await,
            Err(PlannerError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_silent_planner_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let planner = HttpPlanner::new(&format!("http://{}", address), 1).unwrap();
        let result = planner.plan_tasks(Uuid::new_v4()).await;
        assert!(matches!(result, Err(PlannerError::Timeout(1))));

        server.abort();
    }

    #[test]
    fn test_planner_errors_map_to_bad_gateway() {
        let error: ApiError = PlannerError::Status(500).into();
        assert_eq!(error.status(), axum::http::StatusCode::BAD_GATEWAY);
    }
}
