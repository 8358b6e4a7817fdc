//! Router-level tests for the API service over the in-memory store

use api::{
    AppState,
    config::AppSettings,
    notifier::{PushError, PushMessage, PushSender},
    planner::{PlannerError, TaskPlanner},
    routes::create_router,
};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use common::{
    jwt::{JwtConfig, JwtService},
    models::{FacetKind, Task, TaskDraft},
    store::Repositories,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    repositories: Repositories,
}

fn test_app_with(
    planner: Option<Arc<dyn TaskPlanner>>,
    push: Option<Arc<dyn PushSender>>,
) -> TestApp {
    let repositories = Repositories::in_memory();
    let jwt = JwtService::new(JwtConfig {
        secret: "test-secret".to_string(),
        expires_in: 3600,
    });
    let mut state = AppState::new(repositories.clone(), jwt, &AppSettings::default());
    if let Some(planner) = planner {
        state = state.with_planner(planner);
    }
    if let Some(push) = push {
        state = state.with_push(push);
    }
    TestApp {
        router: create_router(state),
        repositories,
    }
}

fn test_app() -> TestApp {
    test_app_with(None, None)
}

/// Planner answering with a fixed list
struct FixedPlanner(Vec<TaskDraft>);

#[async_trait]
impl TaskPlanner for FixedPlanner {
    async fn plan_tasks(&self, _user_id: Uuid) -> Result<Vec<TaskDraft>, PlannerError> {
        Ok(self.0.clone())
    }

    async fn edit_tasks(
        &self,
        _user_id: Uuid,
        _edit_request: &str,
        _tasks: &[Task],
    ) -> Result<Vec<TaskDraft>, PlannerError> {
        Ok(self.0.clone())
    }
}

/// Push sender that records messages, failing for tokens starting with `bad`
#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<PushMessage>>,
}

#[async_trait]
impl PushSender for RecordingSender {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        if message.token.starts_with("bad") {
            return Err(PushError::Status(410));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(
    app: &TestApp,
    method: &str,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    send(app, request(method, uri, Some(token), body)).await
}

/// Sign up a fresh user and return their token
async fn sign_up(app: &TestApp, email: &str) -> String {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/auth/signup",
            None,
            Some(json!({"name": "Ravi", "email": email, "password": "secret1"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

async fn user_id(app: &TestApp, token: &str) -> Uuid {
    let (_, body) = call(app, "GET", "/auth/me", token, None).await;
    body["user"]["id"].as_str().unwrap().parse().unwrap()
}

fn strip_server_fields(mut document: Value) -> Value {
    if let Some(map) = document.as_object_mut() {
        map.remove("userId");
        map.remove("createdAt");
        map.remove("updatedAt");
    }
    document
}

#[tokio::test]
async fn test_health_and_gate() {
    let app = test_app();
    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "api-service");

    let (status, body) = send(&app, request("GET", "/tasks", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access denied. No token provided.");

    let (status, body) = send(&app, request("GET", "/profile", Some("garbage"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token.");
}

#[tokio::test]
async fn test_signup_login_and_profile_round_trip() {
    let app = test_app();
    sign_up(&app, "ravi@example.com").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "ravi@example.com", "password": "secret1"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let profile = json!({
        "ageRange": "26-35",
        "biologicalSex": "Male",
        "occupationType": "Desk Job",
        "workingHours": {"start": "09:00", "end": "17:00"},
        "goals": ["Productivity"]
    });
    let (status, _) = call(&app, "PUT", "/profile", &token, Some(profile.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "GET", "/profile", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["createdAt"].is_string());
    assert!(body["data"]["updatedAt"].is_string());
    assert_eq!(strip_server_fields(body["data"].clone()), profile);
}

#[tokio::test]
async fn test_unwritten_facet_is_null() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;

    let (status, body) = call(&app, "GET", "/mobility", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["data"].is_null());

    let (status, body) = call(&app, "GET", "/profile/full", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    for key in ["profile", "sleep", "mobility", "tasks", "biological"] {
        assert!(body["data"][key].is_null(), "{} should be null", key);
    }
}

#[tokio::test]
async fn test_facet_upsert_is_idempotent() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;
    let routine = json!({"averageSleepHours": 7.5, "sleepConsistency": "Fixed"});

    let (_, first) = call(&app, "PUT", "/sleep-routine", &token, Some(routine.clone())).await;
    let (status, second) = call(&app, "PUT", "/sleep-routine", &token, Some(routine.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["createdAt"], second["data"]["createdAt"]);
    assert_eq!(
        strip_server_fields(first["data"].clone()),
        strip_server_fields(second["data"].clone())
    );

    // A later write only touches the fields it sends
    let (_, body) = call(
        &app,
        "PUT",
        "/sleep-routine",
        &token,
        Some(json!({"peakAlertTime": "Night"})),
    )
    .await;
    assert_eq!(body["data"]["averageSleepHours"], 7.5);
    assert_eq!(body["data"]["peakAlertTime"], "Night");

    let (status, _) = call(
        &app,
        "PUT",
        "/sleep-routine",
        &token,
        Some(json!({"averageSleepHours": 20})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_biological_facet_follows_profile_sex() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;
    let id = user_id(&app, &token).await;

    let (status, _) = call(
        &app,
        "PUT",
        "/biological",
        &token,
        Some(json!({"type": "male", "stressLevel": "High"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "PUT",
        "/biological",
        &token,
        Some(json!({"type": "female", "averageCycleLength": 30, "symptoms": ["Cramps"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["averageCycleLength"], 30);

    let male = app
        .repositories
        .profiles
        .find_facet(id, FacetKind::MaleEnergy)
        .await
        .unwrap();
    assert!(male.is_none());

    call(
        &app,
        "PUT",
        "/profile",
        &token,
        Some(json!({"ageRange": "18-25", "biologicalSex": "Female", "occupationType": "Student"})),
    )
    .await;
    let (_, body) = call(&app, "GET", "/biological", &token, None).await;
    assert_eq!(body["data"]["symptoms"], json!(["Cramps"]));

    let (status, _) = call(&app, "PUT", "/biological", &token, Some(json!({"stressLevel": "Low"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_task_crud_and_ordering() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;

    for (title, time) in [
        ("Afternoon", Some("2:00 PM")),
        ("Untimed", None),
        ("Morning", Some("09:00")),
    ] {
        let (status, _) = call(
            &app,
            "POST",
            "/tasks",
            &token,
            Some(json!({"task": title, "time": time, "date": "2025-03-03"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    call(
        &app,
        "POST",
        "/tasks",
        &token,
        Some(json!({"title": "Later day", "date": "2025-03-05"})),
    )
    .await;

    let (status, body) = call(&app, "GET", "/tasks/date/2025-03-03", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Morning", "Afternoon", "Untimed"]);

    let (_, body) = call(&app, "GET", "/tasks", &token, None).await;
    assert_eq!(body["data"][0]["title"], "Later day");
    assert_eq!(body["data"].as_array().unwrap().len(), 4);

    let id = body["data"][1]["id"].as_str().unwrap().to_string();
    let (status, body) = call(
        &app,
        "PUT",
        &format!("/tasks/{}", id),
        &token,
        Some(json!({"description": "Updated", "priority": "High"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "Updated");
    assert_eq!(body["data"]["priority"], "High");

    let (status, _) = call(&app, "DELETE", &format!("/tasks/{}", id), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "GET", &format!("/tasks/{}", id), &token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "GET", "/tasks/not-a-uuid", &token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "GET", "/tasks/date/2025-13-01", &token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "POST", "/tasks", &token, Some(json!({"task": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_toggle_round_trips() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;
    let (_, body) = call(&app, "POST", "/tasks", &token, Some(json!({"task": "Walk"}))).await;
    let uri = format!("/tasks/{}/status", body["data"]["id"].as_str().unwrap());
    assert_eq!(body["data"]["completed"], false);

    let (status, body) = call(&app, "PATCH", &uri, &token, Some(json!({"completed": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Completed");
    assert_eq!(body["data"]["completed"], true);

    let (_, body) = call(&app, "PATCH", &uri, &token, Some(json!({"completed": false}))).await;
    assert_eq!(body["data"]["status"], "Pending");

    let (_, body) = call(&app, "PATCH", &uri, &token, Some(json!({"status": "Skipped"}))).await;
    assert_eq!(body["data"]["status"], "Skipped");

    let (status, _) = call(&app, "PATCH", &uri, &token, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tasks_are_scoped_to_owner() {
    let app = test_app();
    let owner = sign_up(&app, "owner@example.com").await;
    let other = sign_up(&app, "other@example.com").await;

    let (_, body) = call(&app, "POST", "/tasks", &owner, Some(json!({"task": "Private"}))).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, "GET", &format!("/tasks/{}", id), &other, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(
        &app,
        "PATCH",
        &format!("/tasks/{}/status", id),
        &other,
        Some(json!({"completed": true})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "DELETE", &format!("/tasks/{}", id), &other, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, "GET", "/tasks", &other, None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_full_sync_replaces_the_day() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;

    for title in ["Old one", "Old two"] {
        call(
            &app,
            "POST",
            "/tasks",
            &token,
            Some(json!({"task": title, "date": "2025-03-03"})),
        )
        .await;
    }
    call(
        &app,
        "POST",
        "/tasks",
        &token,
        Some(json!({"task": "Other day", "date": "2025-03-04"})),
    )
    .await;

    let (status, body) = call(
        &app,
        "POST",
        "/tasks/sync",
        &token,
        Some(json!({
            "date": "2025-03-03",
            "tasks": [{"task": "A"}, {"task": "B"}, {"task": "C"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (_, body) = call(&app, "GET", "/tasks/date/2025-03-03", &token, None).await;
    let tasks = body["data"].as_array().unwrap();
    assert_eq!(tasks.len(), 3);
    assert!(tasks.iter().all(|t| t["isAiGenerated"] == true));
    assert!(tasks.iter().all(|t| !t["title"].as_str().unwrap().starts_with("Old")));

    let (_, body) = call(&app, "GET", "/tasks/date/2025-03-04", &token, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = call(&app, "POST", "/tasks/sync", &token, Some(json!({"date": "2025-03-03"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Date and tasks array required");
}

#[tokio::test]
async fn test_ai_sync_keeps_existing_day_unless_replacing() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;
    let first = json!({"date": "2025-03-03", "tasks": [{"task": "A"}, {"task": "B"}]});

    let (status, body) = call(&app, "POST", "/tasks/ai-sync", &token, Some(first)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["alreadyPlanned"], false);
    assert!(body["data"][0]["id"].is_string());

    let second = json!({"date": "2025-03-03", "tasks": [{"task": "X"}]});
    let (status, body) = call(&app, "POST", "/tasks/ai-sync", &token, Some(second)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alreadyPlanned"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let replace = json!({"date": "2025-03-03", "tasks": [{"task": "X"}], "replace": true});
    let (status, body) = call(&app, "POST", "/tasks/ai-sync", &token, Some(replace)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["title"], "X");
}

#[tokio::test]
async fn test_statistics_report_zero_days() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;
    let today = Utc::now().date_naive();

    call(
        &app,
        "POST",
        "/tasks",
        &token,
        Some(json!({"task": "Done", "completed": true, "date": today})),
    )
    .await;

    let (status, body) = call(&app, "GET", "/tasks/statistics", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let stats = body["data"].as_array().unwrap();
    assert_eq!(stats.len(), 7);
    assert_eq!(stats[0]["date"], json!(today - Duration::days(6)));
    assert_eq!(stats[0]["completed"], 0);
    assert_eq!(stats[0]["total"], 0);
    assert_eq!(stats[6]["completed"], 1);
    assert_eq!(stats[6]["total"], 1);
    assert!(stats[6]["dayName"].is_string());
}

#[tokio::test]
async fn test_plan_falls_back_when_planner_is_unavailable() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;

    let (status, body) = call(&app, "POST", "/tasks/plan", &token, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["source"], "fallback");
    let planned = body["data"].as_array().unwrap().len();
    assert!(planned >= 6);
    assert!(body["data"][0]["id"].is_string());

    let (_, body) = call(&app, "GET", "/tasks", &token, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), planned);

    // Second call sees the stored day
    let (status, body) = call(&app, "POST", "/tasks/plan", &token, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "existing");

    // Past days without tasks stay empty
    let (_, body) = call(
        &app,
        "POST",
        "/tasks/plan",
        &token,
        Some(json!({"date": "2020-01-01"})),
    )
    .await;
    assert_eq!(body["source"], "none");
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_plan_and_edit_through_planner() {
    let planner = FixedPlanner(vec![TaskDraft::new("Planned focus"), TaskDraft::new("Planned walk")]);
    let app = test_app_with(Some(Arc::new(planner)), None);
    let token = sign_up(&app, "ravi@example.com").await;

    let (status, body) = call(&app, "POST", "/tasks/plan", &token, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["source"], "planner");
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["isAiGenerated"], true);

    let (status, body) = call(
        &app,
        "POST",
        "/tasks/edit",
        &token,
        Some(json!({"editRequest": "Move my walk to the evening"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = call(&app, "POST", "/tasks/edit", &token, Some(json!({"editRequest": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_edit_without_planner_is_bad_gateway() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/tasks/edit",
        &token,
        Some(json!({"editRequest": "Add a nap"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_check_in_history_limit() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;

    for day in 1..=10 {
        let (status, _) = call(
            &app,
            "POST",
            "/tracking/daily-checkin",
            &token,
            Some(json!({
                "energyLevel": 3,
                "mood": "Calm",
                "sleepQuality": "Good",
                "date": format!("2025-03-{:02}T08:00:00Z", day)
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = call(&app, "GET", "/tracking/history?limit=3", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["date"], "2025-03-10T08:00:00Z");
    assert_eq!(history[2]["date"], "2025-03-08T08:00:00Z");

    let (_, body) = call(&app, "GET", "/tracking/history", &token, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 7);
    let (_, body) = call(&app, "GET", "/tracking/history?limit=abc", &token, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 7);

    let (status, _) = call(
        &app,
        "POST",
        "/tracking/daily-checkin",
        &token,
        Some(json!({"energyLevel": 6, "mood": "Calm", "sleepQuality": "Good"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(
        &app,
        "POST",
        "/tracking/daily-checkin",
        &token,
        Some(json!({"energyLevel": 3, "mood": "Elated", "sleepQuality": "Good"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wearable_samples() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/tracking/wearable-data",
        &token,
        Some(json!({
            "stepCount": 8042,
            "restingHeartRate": 61,
            "sleepStages": {"deep": 80.0, "rem": 95.5},
            "activityIntensity": "Moderate"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["stepCount"], 8042);

    let (_, body) = call(&app, "GET", "/tracking/wearables", &token, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        "POST",
        "/tracking/wearable-data",
        &token,
        Some(json!({"stepCount": -5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_seed_demo_data() {
    let app = test_app();
    let token = sign_up(&app, "ravi@example.com").await;
    call(&app, "POST", "/tasks", &token, Some(json!({"task": "Before seeding", "date": "2020-01-01"}))).await;

    let (status, body) = call(&app, "POST", "/seed/demo-data", &token, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["checkIns"]["total"], 11);
    let total = body["data"]["tasks"]["total"].as_u64().unwrap();
    assert!((78..=82).contains(&total));

    let (_, body) = call(&app, "GET", "/tasks", &token, None).await;
    let tasks = body["data"].as_array().unwrap();
    assert_eq!(tasks.len() as u64, total);
    assert!(tasks.iter().all(|t| t["title"] != "Before seeding"));
}

#[tokio::test]
async fn test_notification_flow() {
    let sender = Arc::new(RecordingSender::default());
    let app = test_app_with(None, Some(sender.clone()));
    let token = sign_up(&app, "ravi@example.com").await;

    let (status, _) = call(
        &app,
        "POST",
        "/notifications/send",
        &token,
        Some(json!({"title": "Hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for device in ["phone-1", "bad-tablet"] {
        let (status, _) = call(
            &app,
            "POST",
            "/notifications/devices",
            &token,
            Some(json!({"token": device, "platform": "web"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = call(
        &app,
        "POST",
        "/notifications/send",
        &token,
        Some(json!({"title": "Time to stretch", "body": "Two minutes"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["delivered"], 1);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(sender.sent.lock().unwrap()[0].title, "Time to stretch");

    let (status, _) = call(
        &app,
        "POST",
        "/notifications/send",
        &token,
        Some(json!({"token": "bad-only"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, _) = call(&app, "POST", "/notifications", &token, Some(json!({"body": "Inbox only"}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = call(&app, "GET", "/notifications", &token, None).await;
    let inbox = body["data"].as_array().unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0]["title"], "New Notification");
    assert_eq!(inbox[1]["title"], "Time to stretch");

    let id = inbox[1]["id"].as_str().unwrap().to_string();
    let (status, body) = call(&app, "PATCH", &format!("/notifications/{}/read", id), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["read"], true);

    let (status, _) = call(&app, "DELETE", &format!("/notifications/{}", id), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "DELETE", &format!("/notifications/{}", id), &token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, "DELETE", "/notifications", &token, None).await;
    assert_eq!(body["removed"], 1);

    let (status, _) = call(&app, "DELETE", "/notifications/devices/bad-tablet", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, "GET", "/notifications/devices", &token, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}
