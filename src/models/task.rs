use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use super::patch::Patch;

pub const TITLE_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 1000;

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Task is yet to be started.
    #[default]
    Pending,
    /// Task is currently being worked on.
    InProgress,
    /// Task is done.
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];
}

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High];
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Identifier of the user who owns the task. Never changes after creation.
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub title: String,
    /// Empty when the task has no description.
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new `Task` owned by `user_id` from an already validated request.
    /// Unspecified fields take their defaults.
    pub fn new(input: CreateTaskRequest, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: input.title,
            description: input.description.unwrap_or_default(),
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            tags: normalize_tags(input.tags.unwrap_or_default()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input structure for creating a task.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Defaults to empty so a missing title is reported by the validator.
    #[serde(default)]
    #[validate(custom = "validate_title")]
    pub title: String,

    #[serde(default)]
    #[validate(length(
        max = 1000,
        message = "Description cannot be more than 1000 characters"
    ))]
    pub description: Option<String>,

    #[serde(default)]
    pub status: Option<TaskStatus>,

    #[serde(default)]
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "due_date::option")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl CreateTaskRequest {
    /// Trims free-text fields. Call before `validate`.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.map(|d| d.trim().to_string());
        self
    }
}

/// A partial update of a task.
///
/// Absent keys leave the stored value alone. `description`, `dueDate` and `tags` also
/// accept `null`, which clears them; the other fields reject `null` at deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub description: Patch<Option<String>>,
    #[serde(default)]
    pub status: Patch<TaskStatus>,
    #[serde(default)]
    pub priority: Patch<TaskPriority>,
    #[serde(default, deserialize_with = "due_date::patch")]
    pub due_date: Patch<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub tags: Patch<Option<Vec<String>>>,
}

impl TaskPatch {
    /// Trims free-text fields. Call before `validate`.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.map(|t| t.trim().to_string());
        self.description = self.description.map(|d| d.map(|d| d.trim().to_string()));
        self
    }

    /// Produces the updated task. Only `updated_at` changes when nothing is set;
    /// `id`, `user_id` and `created_at` never change.
    pub fn apply(self, existing: &Task, now: DateTime<Utc>) -> Task {
        let mut task = existing.clone();
        self.title.apply_to(&mut task.title);
        self.description
            .map(Option::unwrap_or_default)
            .apply_to(&mut task.description);
        self.status.apply_to(&mut task.status);
        self.priority.apply_to(&mut task.priority);
        self.due_date.apply_to(&mut task.due_date);
        self.tags
            .map(|tags| normalize_tags(tags.unwrap_or_default()))
            .apply_to(&mut task.tags);
        task.updated_at = now;
        task
    }
}

impl Validate for TaskPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = self.title.as_set() {
            if let Err(e) = validate_title(title) {
                errors.add("title", e);
            }
        }
        if let Some(Some(description)) = self.description.as_set() {
            if description.chars().count() > DESCRIPTION_MAX_LEN {
                errors.add(
                    "description",
                    error_with_message(
                        "length",
                        "Description cannot be more than 1000 characters",
                    ),
                );
            }
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.is_empty() {
        return Err(error_with_message("required", "Title is required"));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(error_with_message(
            "length",
            "Title cannot be more than 100 characters",
        ));
    }
    Ok(())
}

pub(crate) fn error_with_message(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Trims tags, drops empty ones and removes duplicates, keeping the first occurrence.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Lenient due date parsing: RFC 3339 timestamps, or a bare `YYYY-MM-DD` taken as
/// midnight UTC. `null` and the empty string both mean "no due date".
pub mod due_date {
    use super::Patch;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    pub fn option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse(value)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid dueDate `{}`", value))),
        }
    }

    pub fn patch<'de, D>(deserializer: D) -> Result<Patch<Option<DateTime<Utc>>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        option(deserializer).map(Patch::Set)
    }
}
