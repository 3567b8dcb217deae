// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
pub mod client_store;
pub mod efficiency;
pub mod query;
pub mod validation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use client_store::{ClientTaskStore, TaskFilters};
pub use efficiency::efficiency_score;
pub use query::{Pagination, SortField, SortOrder, TaskListParams, TaskQuery};
pub use validation::{
    Credentials, FieldError, Registration, TaskDraft, ValidationFailure, validate_login,
    validate_registration, validate_task,
};

/// Lifecycle state of a task.
///
/// Stored and transmitted in kebab-case (`"in-progress"`, `"on-hold"`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    OnHold,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::OnHold => "on-hold",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        }
    }
}

/// Returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

impl FromStr for TaskPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskPriority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "priority",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(clippy::doc_overindented_list_items)]
/// Represents a task within the system.
///
/// Derivation attributes (derive):
/// - `Serialize`, `Deserialize`: JSON on the wire, camelCase field names.
/// - `sqlx::FromRow`: built directly from a `tasks` row. `tags` lives in a
///    JSON text column.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    // Owner of the task. Never taken from a client payload.
    pub user_id: String,

    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub is_urgent: bool,
    pub estimated_hours: f64,
    pub actual_hours: f64,

    // Derived from the two hour fields on every write.
    pub efficiency_score: f64,

    pub due_date: Option<DateTime<Utc>>,

    #[sqlx(json)]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Structure used to receive task data from the API, for both create and update.
///
/// Every field is optional and loosely typed so that the validator can report
/// all problems at once instead of failing on the first bad field during
/// deserialization. `isUrgent` and the hour fields are raw JSON values: numeric
/// strings such as `"5"` count as numbers. Unknown fields (`id`, `userId`,
/// `efficiencyScore`, ...) are ignored.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub is_urgent: Option<serde_json::Value>,
    pub estimated_hours: Option<serde_json::Value>,
    pub actual_hours: Option<serde_json::Value>,
    pub due_date: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Per-status aggregate returned by the stats endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub status: TaskStatus,
    pub count: i64,
    pub total_estimated_hours: f64,
    pub total_actual_hours: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub by_status: Vec<StatusSummary>,
    pub total_tasks: i64,
    pub urgent_tasks: i64,
}

/// Body of a successful `GET /api/tasks`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskListResponse {
    pub success: bool,
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
}

/// Public view of a user account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RegisterPayload {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub password: Option<String>,
}
