//! Push device registrations and the notification inbox

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A device registered to receive push messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceToken {
    pub user_id: Uuid,
    pub token: String,
    pub platform: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Stored inbox entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub data: Value,
    pub read: bool,
    #[serde(skip)]
    pub seq: i64,
    pub created_at: DateTime<Utc>,
}

/// Inbox entry submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl NewNotification {
    /// Title, falling back to the generic label
    pub fn title_or_default(&self) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or("New Notification")
            .to_string()
    }

    /// Data payload, always a JSON object
    pub fn data_or_default(&self) -> Value {
        match &self.data {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            _ => Value::Object(serde_json::Map::new()),
        }
    }
}
