//! Task lifecycle events pushed over the live-update channel.
//!
//! Events arrive as JSON text frames tagged by event name. Created and
//! updated events carry the full task; deleted events carry only the id.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::{Task, TaskId};

/// Error type for live-event encode/decode operations.
#[derive(Debug, Error)]
pub enum EventError {
    /// Serialization or deserialization failed.
    #[error("event serialization error: {0}")]
    Serialization(String),
}

/// A task lifecycle notification from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum TaskEvent {
    /// A task was created, by this client or another.
    #[serde(rename = "task_created")]
    Created(Task),
    /// A task's title or completion flag changed.
    #[serde(rename = "task_updated")]
    Updated(Task),
    /// A task was deleted.
    #[serde(rename = "task_deleted")]
    Deleted {
        /// Identifier of the deleted task.
        id: TaskId,
    },
}

impl TaskEvent {
    /// Returns the id of the task this event concerns.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::Created(task) | Self::Updated(task) => &task.id,
            Self::Deleted { id } => id,
        }
    }
}

/// Encodes a [`TaskEvent`] as a JSON text frame.
///
/// # Errors
///
/// Returns [`EventError::Serialization`] if the event cannot be serialized.
pub fn encode(event: &TaskEvent) -> Result<String, EventError> {
    serde_json::to_string(event).map_err(|e| EventError::Serialization(e.to_string()))
}

/// Decodes a [`TaskEvent`] from a JSON text frame.
///
/// # Errors
///
/// Returns [`EventError::Serialization`] if the text is not a valid event.
pub fn decode(text: &str) -> Result<TaskEvent, EventError> {
    serde_json::from_str(text).map_err(|e| EventError::Serialization(e.to_string()))
}
