// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::{LoginPayload, RegisterPayload, TaskPayload, TaskPriority, TaskStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;
pub const MAX_HOURS: f64 = 1000.0;

/// A single violated constraint, named by its wire field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Every problem found in a payload, in field order.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Validation failed")]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

impl ValidationFailure {
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// A payload that passed validation, with defaults applied and text trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub is_urgent: bool,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// Validates a task payload against the field rules.
///
/// `now` is the reference instant for the due-date check; it is only
/// evaluated here, at write time.
pub fn validate_task(
    payload: &TaskPayload,
    now: DateTime<Utc>,
) -> Result<TaskDraft, ValidationFailure> {
    let mut errors = Vec::new();

    let title = required_text(
        &mut errors,
        "title",
        "Title",
        payload.title.as_deref(),
        TITLE_MAX_CHARS,
    );
    let description = required_text(
        &mut errors,
        "description",
        "Description",
        payload.description.as_deref(),
        DESCRIPTION_MAX_CHARS,
    );

    let status = match payload.status.as_deref() {
        None => TaskStatus::default(),
        Some(raw) => raw.parse::<TaskStatus>().unwrap_or_else(|_| {
            errors.push(FieldError::new("status", "Invalid status value"));
            TaskStatus::default()
        }),
    };

    let priority = match payload.priority.as_deref() {
        None => TaskPriority::default(),
        Some(raw) => raw.parse::<TaskPriority>().unwrap_or_else(|_| {
            errors.push(FieldError::new("priority", "Invalid priority value"));
            TaskPriority::default()
        }),
    };

    let is_urgent = urgency(&mut errors, payload.is_urgent.as_ref());

    let estimated_hours = hours(
        &mut errors,
        "estimatedHours",
        "Estimated hours",
        payload.estimated_hours.as_ref(),
    );
    let actual_hours = hours(
        &mut errors,
        "actualHours",
        "Actual hours",
        payload.actual_hours.as_ref(),
    );

    let due_date = match payload.due_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match parse_due_date(raw) {
            None => {
                errors.push(FieldError::new("dueDate", "Due date must be a valid date"));
                None
            }
            Some(date) if date <= now => {
                errors.push(FieldError::new("dueDate", "Due date must be in the future"));
                None
            }
            Some(date) => Some(date),
        },
    };

    let tags = payload
        .tags
        .iter()
        .flatten()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();

    if !errors.is_empty() {
        return Err(ValidationFailure { errors });
    }

    Ok(TaskDraft {
        title,
        description,
        status,
        priority,
        is_urgent,
        estimated_hours,
        actual_hours,
        due_date,
        tags,
    })
}

fn required_text(
    errors: &mut Vec<FieldError>,
    field: &str,
    label: &str,
    value: Option<&str>,
    max_chars: usize,
) -> String {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, format!("{label} is required")));
    } else if trimmed.chars().count() > max_chars {
        errors.push(FieldError::new(
            field,
            format!("{label} cannot exceed {max_chars} characters"),
        ));
    }
    trimmed.to_string()
}

/// Absent or null means 0. Numbers and numeric strings are accepted.
fn hours(errors: &mut Vec<FieldError>, field: &str, label: &str, value: Option<&Value>) -> f64 {
    let parsed = match value {
        None | Some(Value::Null) => Some(0.0),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed.filter(|v| v.is_finite() && (0.0..=MAX_HOURS).contains(v)) {
        Some(hours) => hours,
        None => {
            errors.push(FieldError::new(
                field,
                format!("{label} must be between 0 and {MAX_HOURS}"),
            ));
            0.0
        }
    }
}

fn urgency(errors: &mut Vec<FieldError>, value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(raw)) if raw == "true" => true,
        Some(Value::String(raw)) if raw == "false" => false,
        Some(_) => {
            errors.push(FieldError::new("isUrgent", "isUrgent must be a boolean"));
            false
        }
    }
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(raw) {
        return Some(date_time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Registration data that passed validation. The email is normalised to lower case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login data that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 30;
pub const PASSWORD_MIN_CHARS: usize = 6;

pub fn validate_registration(payload: &RegisterPayload) -> Result<Registration, ValidationFailure> {
    let mut errors = Vec::new();

    let username = payload.username.as_deref().unwrap_or_default().trim();
    let length = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&length) {
        errors.push(FieldError::new(
            "username",
            format!(
                "Username must be between {USERNAME_MIN_CHARS} and {USERNAME_MAX_CHARS} characters"
            ),
        ));
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        errors.push(FieldError::new(
            "username",
            "Username can only contain letters, numbers and underscores",
        ));
    }

    let email = email(&mut errors, payload.email.as_deref());

    let password = payload.password.clone().unwrap_or_default();
    if password.chars().count() < PASSWORD_MIN_CHARS {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {PASSWORD_MIN_CHARS} characters long"),
        ));
    }

    if !errors.is_empty() {
        return Err(ValidationFailure { errors });
    }
    Ok(Registration {
        username: username.to_string(),
        email,
        password,
    })
}

pub fn validate_login(payload: &LoginPayload) -> Result<Credentials, ValidationFailure> {
    let mut errors = Vec::new();

    let email = email(&mut errors, payload.email.as_deref());
    let password = payload.password.clone().unwrap_or_default();
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }

    if !errors.is_empty() {
        return Err(ValidationFailure { errors });
    }
    Ok(Credentials { email, password })
}

fn email(errors: &mut Vec<FieldError>, value: Option<&str>) -> String {
    let email = value.unwrap_or_default().trim().to_lowercase();
    if !is_valid_email(&email) {
        errors.push(FieldError::new("email", "Please provide a valid email"));
    }
    email
}

/// A single `@` separating a non-empty local part from a dotted domain.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
