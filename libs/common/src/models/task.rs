//! Task model and related functionality

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::str::FromStr;
use uuid::Uuid;

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[default]
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Priority::Low),
            "Medium" => Ok(Priority::Medium),
            "High" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// Task lifecycle status. Every change is caller-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Skipped => "Skipped",
        }
    }

    /// Map the boolean toggle onto the status enum
    pub fn from_completed(completed: bool) -> Self {
        if completed {
            TaskStatus::Completed
        } else {
            TaskStatus::Pending
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(TaskStatus::Pending),
            "InProgress" => Ok(TaskStatus::InProgress),
            "Completed" => Ok(TaskStatus::Completed),
            "Skipped" => Ok(TaskStatus::Skipped),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

/// Task entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub time: Option<String>,
    pub duration_minutes: Option<i32>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub reason: String,
    pub ai_suggestion: String,
    pub avoid: bool,
    pub is_ai_generated: bool,
    pub date: NaiveDate,
    /// Minutes after midnight parsed from `time`, used for ordering
    #[serde(skip)]
    pub start_minute: Option<i32>,
    /// Insertion sequence, breaks ties between equal creation timestamps
    #[serde(skip)]
    pub seq: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, changes: &TaskChanges) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        if let Some(time) = &changes.time {
            self.time = Some(time.clone());
            self.start_minute = parse_start_minute(time);
        }
        if let Some(duration) = changes.duration_minutes {
            self.duration_minutes = Some(duration);
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(reason) = &changes.reason {
            self.reason = reason.clone();
        }
        if let Some(suggestion) = &changes.ai_suggestion {
            self.ai_suggestion = suggestion.clone();
        }
        if let Some(avoid) = changes.avoid {
            self.avoid = avoid;
        }
        if let Some(date) = changes.date {
            self.date = date;
        }
    }
}

/// Task content as submitted by a caller or an external planner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    #[serde(alias = "task")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, alias = "duration")]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Boolean form used by planners and older clients
    #[serde(default, skip_serializing)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub ai_suggestion: String,
    #[serde(default)]
    pub avoid: bool,
    #[serde(default, alias = "is_AI_generated", alias = "is_ai_generated")]
    pub is_ai_generated: bool,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Trim the title and reject drafts without one
    pub fn validate(&mut self) -> Result<(), String> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err("Task title is required".to_string());
        }
        if let Some(duration) = self.duration_minutes {
            if duration < 0 {
                return Err("durationMinutes must not be negative".to_string());
            }
        }
        Ok(())
    }

    /// Status to persist: explicit status wins over the boolean form
    pub fn resolved_status(&self) -> TaskStatus {
        self.status
            .or(self.completed.map(TaskStatus::from_completed))
            .unwrap_or_default()
    }

    /// Build the persisted task
    pub fn into_task(self, user_id: Uuid, date: NaiveDate, seq: i64, now: DateTime<Utc>) -> Task {
        let status = self.resolved_status();
        let start_minute = self.time.as_deref().and_then(parse_start_minute);
        Task {
            id: Uuid::new_v4(),
            user_id,
            title: self.title,
            description: self.description,
            time: self.time,
            duration_minutes: self.duration_minutes,
            priority: self.priority,
            status,
            reason: self.reason,
            ai_suggestion: self.ai_suggestion,
            avoid: self.avoid,
            is_ai_generated: self.is_ai_generated,
            date,
            start_minute,
            seq,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial task update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    #[serde(default, alias = "task")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, alias = "duration")]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub ai_suggestion: Option<String>,
    #[serde(default)]
    pub avoid: Option<bool>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl TaskChanges {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn validate(&mut self) -> Result<(), String> {
        if let Some(title) = self.title.as_mut() {
            *title = title.trim().to_string();
            if title.is_empty() {
                return Err("Task title must not be empty".to_string());
            }
        }
        Ok(())
    }
}

/// Outcome of an upsert-if-absent reconciliation
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Nothing existed for the date; the list was inserted
    Inserted(Vec<Task>),
    /// Existing tasks were deleted and the list inserted
    Replaced(Vec<Task>),
    /// Tasks already existed and replacing was not requested
    Unchanged(Vec<Task>),
}

impl SyncOutcome {
    pub fn tasks(&self) -> &[Task] {
        match self {
            SyncOutcome::Inserted(tasks)
            | SyncOutcome::Replaced(tasks)
            | SyncOutcome::Unchanged(tasks) => tasks,
        }
    }

    pub fn into_tasks(self) -> Vec<Task> {
        match self {
            SyncOutcome::Inserted(tasks)
            | SyncOutcome::Replaced(tasks)
            | SyncOutcome::Unchanged(tasks) => tasks,
        }
    }

    pub fn wrote(&self) -> bool {
        !matches!(self, SyncOutcome::Unchanged(_))
    }
}

/// Completed/total task counts for one date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub completed: i64,
    pub total: i64,
}

/// Parse the start of a time slot into minutes after midnight.
///
/// Accepts `"14:30"`, `"9:00 AM"`, `"09:00 AM - 11:00 AM"` and `"7pm"`.
pub fn parse_start_minute(time: &str) -> Option<i32> {
    let start = time.split(" - ").next()?.split('-').next()?.trim();
    if start.is_empty() {
        return None;
    }

    let upper = start.to_ascii_uppercase();
    let (clock, meridiem) = if let Some(rest) = upper.strip_suffix("AM") {
        (rest.trim(), Some(false))
    } else if let Some(rest) = upper.strip_suffix("PM") {
        (rest.trim(), Some(true))
    } else {
        (upper.as_str(), None)
    };

    let (hours, minutes) = match clock.split_once(':') {
        Some((h, m)) => (h.trim().parse::<i32>().ok()?, m.trim().parse::<i32>().ok()?),
        None => (clock.parse::<i32>().ok()?, 0),
    };
    if !(0..60).contains(&minutes) {
        return None;
    }

    let hours = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hours) {
                return None;
            }
            match (hours, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            }
        }
        None => {
            if !(0..24).contains(&hours) {
                return None;
            }
            hours
        }
    };

    Some(hours * 60 + minutes)
}

/// Order a single day's tasks: timed tasks by start, untimed last, then creation order
pub fn sort_for_day(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| (t.start_minute.is_none(), t.start_minute, t.created_at, t.seq));
}

/// Order an undated listing: newest date first, then the day ordering
pub fn sort_for_listing(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| {
        (
            Reverse(t.date),
            t.start_minute.is_none(),
            t.start_minute,
            t.created_at,
            t.seq,
        )
    });
}
