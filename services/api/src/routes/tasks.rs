//! Task routes: CRUD, status toggling, the two reconciliation strategies,
//! weekly statistics and the planner flows

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::{NaiveDate, Utc};
use common::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    models::{SyncOutcome, TaskChanges, TaskDraft},
};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    AppState,
    models::{
        CreateTaskRequest, DateQuery, EditRequest, Envelope, PlanRequest, StatusRequest,
        SyncRequest, TaskResponse, parse_date, parse_id, task_responses,
    },
    seed::day_plan,
    statistics::load_weekly_statistics,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/statistics", get(get_statistics))
        .route("/tasks/date/:date", get(get_tasks_for_date))
        .route("/tasks/sync", post(sync_tasks))
        .route("/tasks/ai-sync", post(ai_sync_tasks))
        .route("/tasks/plan", post(plan_tasks))
        .route("/tasks/edit", post(edit_tasks))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/:id/status", patch(update_task_status))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

/// Mark planner output before it is stored
fn mark_generated(drafts: &mut [TaskDraft]) {
    for draft in drafts.iter_mut() {
        draft.is_ai_generated = true;
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<CreateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut draft = payload.draft;
    draft.validate().map_err(ApiError::BadRequest)?;
    let date = payload.date.unwrap_or_else(today);

    let task = state
        .repositories
        .tasks
        .insert_task(user.id, date, draft)
        .await?;

    Ok((
        StatusCode::CREATED,
        Envelope::with_message(TaskResponse::from(task), "Task created successfully"),
    ))
}

/// `GET /tasks?date=YYYY-MM-DD`
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateQuery>,
) -> ApiResult<impl IntoResponse> {
    let date = query.date.as_deref().map(parse_date).transpose()?;
    let tasks = state.repositories.tasks.list_tasks(user.id, date).await?;
    Ok(Envelope::data(task_responses(tasks)))
}

pub async fn get_tasks_for_date(
    State(state): State<AppState>,
    user: AuthUser,
    Path(date): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let date = parse_date(&date)?;
    let tasks = state
        .repositories
        .tasks
        .list_tasks(user.id, Some(date))
        .await?;
    Ok(Envelope::data(task_responses(tasks)))
}

pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let task = state
        .repositories
        .tasks
        .find_task(user.id, id)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(Envelope::data(TaskResponse::from(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(mut changes): ApiJson<TaskChanges>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    changes.validate().map_err(ApiError::BadRequest)?;

    let task = state
        .repositories
        .tasks
        .update_task(user.id, id, changes)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(Envelope::with_message(
        TaskResponse::from(task),
        "Task updated successfully",
    ))
}

pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    if !state.repositories.tasks.delete_task(user.id, id).await? {
        return Err(task_not_found());
    }
    Ok(Json(json!({
        "success": true,
        "message": "Task deleted successfully",
    })))
}

/// `PATCH /tasks/:id/status` with `{status}` or `{completed}`
pub async fn update_task_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<StatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let status = payload.resolve()?;

    let task = state
        .repositories
        .tasks
        .update_task(user.id, id, TaskChanges::status(status))
        .await?
        .ok_or_else(task_not_found)?;
    Ok(Envelope::with_message(
        TaskResponse::from(task),
        "Task status updated",
    ))
}

/// Full-sync: the date's tasks become exactly the submitted list
pub async fn sync_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<SyncRequest>,
) -> ApiResult<impl IntoResponse> {
    let (date, mut drafts) = payload.into_parts()?;
    mark_generated(&mut drafts);

    let tasks = state
        .repositories
        .tasks
        .replace_tasks_for_date(user.id, date, drafts)
        .await?;

    info!("Synced {} tasks for user {} on {}", tasks.len(), user.id, date);
    Ok(Envelope::with_message(
        task_responses(tasks),
        "Tasks synced successfully",
    ))
}

fn sync_response(outcome: SyncOutcome) -> (StatusCode, Json<serde_json::Value>) {
    let (status, already_planned, message) = match &outcome {
        SyncOutcome::Inserted(_) => (StatusCode::CREATED, false, "Tasks saved successfully"),
        SyncOutcome::Replaced(_) => (StatusCode::CREATED, false, "Tasks replaced successfully"),
        SyncOutcome::Unchanged(_) => (
            StatusCode::OK,
            true,
            "Tasks already exist for this date",
        ),
    };

    (
        status,
        Json(json!({
            "success": true,
            "message": message,
            "alreadyPlanned": already_planned,
            "data": task_responses(outcome.into_tasks()),
        })),
    )
}

/// Upsert-if-absent: keeps an existing day unless `replace` is set
pub async fn ai_sync_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<SyncRequest>,
) -> ApiResult<impl IntoResponse> {
    let replace = payload
        .replace
        .unwrap_or(state.sync_policy.replace_by_default);
    let (date, mut drafts) = payload.into_parts()?;
    mark_generated(&mut drafts);

    let outcome = state
        .repositories
        .tasks
        .insert_tasks_if_absent(user.id, date, drafts, replace)
        .await?;

    Ok(sync_response(outcome))
}

/// Seven days ending today, oldest first
pub async fn get_statistics(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let stats = load_weekly_statistics(state.repositories.tasks.as_ref(), user.id, today()).await?;
    Ok(Envelope::data(stats))
}

/// Tasks for a day, asking the planner when today has none yet.
///
/// Planner failures are not fatal: the standard day plan is stored instead
/// and the response says `source: "fallback"`.
pub async fn plan_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<PlanRequest>,
) -> ApiResult<impl IntoResponse> {
    let today = today();
    let date = payload.date.unwrap_or(today);
    let tasks = state.repositories.tasks;

    let existing = tasks.list_tasks(user.id, Some(date)).await?;
    if !existing.is_empty() {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "source": "existing",
                "alreadyPlanned": true,
                "data": task_responses(existing),
            })),
        ));
    }

    if date != today {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "source": "none",
                "alreadyPlanned": false,
                "data": [],
            })),
        ));
    }

    let (source, drafts) = match state.planner.plan_tasks(user.id).await {
        Ok(mut drafts) if !drafts.is_empty() => {
            mark_generated(&mut drafts);
            ("planner", drafts)
        }
        Ok(_) => {
            warn!("Planner returned no tasks for user {}, using default plan", user.id);
            ("fallback", day_plan(date))
        }
        Err(e) => {
            warn!("Planner unavailable for user {}: {}, using default plan", user.id, e);
            ("fallback", day_plan(date))
        }
    };

    let outcome = tasks
        .insert_tasks_if_absent(user.id, date, drafts, false)
        .await?;
    let (status, Json(mut body)) = sync_response(outcome);
    body["source"] = json!(source);
    Ok((status, Json(body)))
}

/// Rewrite a day through the planner from a free-text request
pub async fn edit_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<EditRequest>,
) -> ApiResult<impl IntoResponse> {
    let edit_request = payload.edit_request.trim();
    if edit_request.is_empty() {
        return Err(ApiError::BadRequest("Edit request is required".to_string()));
    }
    let date = payload.date.unwrap_or_else(today);

    let current = state
        .repositories
        .tasks
        .list_tasks(user.id, Some(date))
        .await?;
    let mut drafts = state
        .planner
        .edit_tasks(user.id, edit_request, &current)
        .await?;
    if drafts.is_empty() {
        return Err(ApiError::BadRequest(
            "No edited tasks received from planner".to_string(),
        ));
    }
    mark_generated(&mut drafts);

    let outcome = state
        .repositories
        .tasks
        .insert_tasks_if_absent(user.id, date, drafts, true)
        .await?;

    info!(
        "Edited plan for user {} on {}: {} tasks",
        user.id,
        date,
        outcome.tasks().len()
    );
    Ok(Envelope::with_message(
        task_responses(outcome.into_tasks()),
        "Tasks updated successfully",
    ))
}
