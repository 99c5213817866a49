//! Task model and the request bodies for task CRUD.
//!
//! Tasks are owned by the backend: identifiers are opaque server-assigned
//! strings and `created_at` is the backend's RFC 3339 timestamp, carried
//! verbatim. The client never mints either.

use serde::{Deserialize, Serialize};

/// Opaque, server-assigned task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps a server-assigned identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The `{id, username, fullname}` projection of a user embedded on each task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Numeric user id.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Display name.
    pub fullname: String,
}

/// A user-owned to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier, unique across the task collection.
    pub id: TaskId,
    /// Non-empty title text.
    pub title: String,
    /// Completion flag.
    pub done: bool,
    /// Creation timestamp as sent by the backend (RFC 3339).
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// The owning user, as embedded by the backend under the `user` key.
    #[serde(rename = "user")]
    pub owner: Owner,
}

/// Body of `POST /tasks`. The backend assigns the id and defaults
/// `done` to false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTask {
    /// Title for the new task.
    pub title: String,
}

/// Body of `PATCH /tasks/:id`. Absent fields are left untouched by
/// the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTask {
    /// New title, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New completion flag, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

impl UpdateTask {
    /// Update that changes only the title.
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            done: None,
        }
    }

    /// Update that carries the current title and a new completion flag.
    #[must_use]
    pub fn toggle(title: impl Into<String>, done: bool) -> Self {
        Self {
            title: Some(title.into()),
            done: Some(done),
        }
    }
}
