//! The task store: the authoritative local view of the task list.
//!
//! Maintains an insertion-ordered task collection plus derived loading and
//! error state, orchestrating confirmation-gated local mutation against the
//! REST client and reconciliation with events pushed over the live channel.
//!
//! The store is an explicit shared-state object (share it with `Arc`); all
//! mutation goes through its operations. Network I/O happens with the state
//! lock released, so operations may overlap — a fetch and a toggle can be
//! outstanding simultaneously, and the last response to resolve wins. There
//! is no compare-and-swap on completion and no cancellation: a mutation
//! that was sent runs to its response or failure.

use parking_lot::Mutex;
use thiserror::Error;

use taskdeck_api::event::TaskEvent;
use taskdeck_api::task::{CreateTask, Task, TaskId, UpdateTask};

use crate::api::ApiClient;

/// Coarse store-level errors surfaced to the presentation layer.
///
/// Static messages, deliberately independent of the underlying transport
/// cause — the caller-visible string does not vary by cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// `fetch_tasks` failed; the previous collection is untouched.
    #[error("failed to fetch tasks")]
    FetchFailed,
    /// `add_task` failed; nothing was inserted.
    #[error("failed to create task")]
    CreateFailed,
    /// `toggle_task` or `update_task` failed; the task is unchanged.
    #[error("failed to update task")]
    UpdateFailed,
    /// `delete_task` failed; the task remains present.
    #[error("failed to delete task")]
    DeleteFailed,
}

#[derive(Debug, Default)]
struct TaskListState {
    /// Insertion-ordered collection; exactly one task per id at all times.
    tasks: Vec<Task>,
    is_loading: bool,
    loading_task_id: Option<TaskId>,
    error: Option<StoreError>,
}

impl TaskListState {
    /// Replaces the task with `task.id` in place, appending when absent.
    ///
    /// Appending covers two cases: a remote update for an unseen id, and
    /// a local success handler landing after a remote delete.
    fn upsert(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task,
            None => self.tasks.push(task),
        }
    }

    fn remove(&mut self, id: &TaskId) {
        self.tasks.retain(|t| &t.id != id);
    }

    fn contains(&self, id: &TaskId) -> bool {
        self.tasks.iter().any(|t| &t.id == id)
    }
}

/// In-memory task collection with loading/error state and reconciliation.
#[derive(Debug, Default)]
pub struct TaskStore {
    state: Mutex<TaskListState>,
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Local operations (confirmation-gated) -----------------------------

    /// Replaces the whole collection with the server's list.
    ///
    /// This is the full reconciliation point — the remote list is
    /// authoritative. On failure the previous collection is left untouched
    /// (stale-but-available) and [`StoreError::FetchFailed`] is recorded.
    pub async fn fetch_tasks(&self, client: &ApiClient) {
        {
            let mut state = self.state.lock();
            state.is_loading = true;
            state.error = None;
        }
        match client.list_tasks().await {
            Ok(tasks) => {
                let mut state = self.state.lock();
                state.tasks = tasks;
                state.is_loading = false;
            }
            Err(e) => {
                tracing::warn!(err = %e, "task fetch failed");
                let mut state = self.state.lock();
                state.error = Some(StoreError::FetchFailed);
                state.is_loading = false;
            }
        }
    }

    /// Creates a task and appends the server-returned representation.
    ///
    /// The title must already be validated (non-empty after trimming) by
    /// the caller; the store does not re-validate. There is no optimistic
    /// insertion — the task is invisible until the server confirms, which
    /// avoids temporary-id reconciliation. If the confirmed id is already
    /// present (the echoed live event won the race), the append is skipped
    /// so the one-task-per-id invariant holds.
    pub async fn add_task(&self, client: &ApiClient, title: &str) {
        let body = CreateTask {
            title: title.to_string(),
        };
        match client.create_task(&body).await {
            Ok(task) => {
                let mut state = self.state.lock();
                if !state.contains(&task.id) {
                    state.tasks.push(task);
                }
            }
            Err(e) => {
                tracing::warn!(err = %e, "task create failed");
                self.state.lock().error = Some(StoreError::CreateFailed);
            }
        }
    }

    /// Flips the completion flag of the task with `id`.
    ///
    /// No-op when the id is unknown. While the request is outstanding the
    /// task is marked mutating via `loading_task_id`; concurrent toggles
    /// of the same id are not prevented here — callers should disable the
    /// control while `loading_task_id() == Some(id)`.
    pub async fn toggle_task(&self, client: &ApiClient, id: &TaskId) {
        let Some(current) = self.task(id) else {
            return;
        };
        {
            self.state.lock().loading_task_id = Some(id.clone());
        }
        let body = UpdateTask::toggle(current.title, !current.done);
        self.finish_update(client.update_task(id, &body).await);
    }

    /// Replaces the title of the task with `id`.
    ///
    /// Same pattern as [`toggle_task`](Self::toggle_task). Callers should
    /// skip the call when the trimmed title is unchanged; the store does
    /// not deduplicate no-op updates.
    pub async fn update_task(&self, client: &ApiClient, id: &TaskId, new_title: &str) {
        if !self.state.lock().contains(id) {
            return;
        }
        {
            self.state.lock().loading_task_id = Some(id.clone());
        }
        let body = UpdateTask::title(new_title);
        self.finish_update(client.update_task(id, &body).await);
    }

    /// Deletes the task with `id`.
    ///
    /// On success exactly that id is removed; on failure the task remains
    /// present and [`StoreError::DeleteFailed`] is recorded. Either way
    /// `loading_task_id` is cleared.
    pub async fn delete_task(&self, client: &ApiClient, id: &TaskId) {
        {
            self.state.lock().loading_task_id = Some(id.clone());
        }
        match client.delete_task(id).await {
            Ok(()) => {
                let mut state = self.state.lock();
                state.remove(id);
                state.loading_task_id = None;
            }
            Err(e) => {
                tracing::warn!(err = %e, id = %id, "task delete failed");
                let mut state = self.state.lock();
                state.error = Some(StoreError::DeleteFailed);
                state.loading_task_id = None;
            }
        }
    }

    // -- Remote reconciliation ---------------------------------------------

    /// Routes a live event to the matching reconciliation operation.
    pub fn apply_event(&self, event: TaskEvent) {
        match event {
            TaskEvent::Created(task) => self.add_task_from_event(task),
            TaskEvent::Updated(task) => self.update_task_from_event(task),
            TaskEvent::Deleted { id } => self.remove_task_from_event(&id),
        }
    }

    /// Inserts a remotely created task. Idempotent: a task whose id is
    /// already present (this client's own echoed create) is a no-op.
    pub fn add_task_from_event(&self, task: Task) {
        let mut state = self.state.lock();
        if state.contains(&task.id) {
            tracing::debug!(id = %task.id, "echoed create ignored");
            return;
        }
        state.tasks.push(task);
    }

    /// Applies a remotely updated task: unconditional last-write-wins
    /// replace by id, inserting when the id is unknown (upsert).
    ///
    /// Does not consult `loading_task_id`: a remote update arriving while
    /// a local mutation on the same id is outstanding overwrites local
    /// intent, and the local response then overwrites the remote value —
    /// ordering is whichever response resolves last.
    pub fn update_task_from_event(&self, task: Task) {
        self.state.lock().upsert(task);
    }

    /// Removes a remotely deleted task unconditionally, including while a
    /// local mutation on that id is outstanding (whose success handler may
    /// then re-insert it).
    pub fn remove_task_from_event(&self, id: &TaskId) {
        self.state.lock().remove(id);
    }

    // -- Read accessors ----------------------------------------------------

    /// Snapshot of the collection in insertion order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    /// The task with `id`, if present.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.state.lock().tasks.iter().find(|t| &t.id == id).cloned()
    }

    /// Whether a full fetch is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    /// The id currently marked as mutating, if any.
    #[must_use]
    pub fn loading_task_id(&self) -> Option<TaskId> {
        self.state.lock().loading_task_id.clone()
    }

    /// The last store-level error, if any.
    #[must_use]
    pub fn error(&self) -> Option<StoreError> {
        self.state.lock().error
    }

    /// Clears the error field, e.g. before a caller-driven retry.
    pub fn clear_error(&self) {
        self.state.lock().error = None;
    }

    // -- Internals ---------------------------------------------------------

    /// Shared completion path for toggle and title updates.
    fn finish_update(&self, result: Result<Task, crate::api::ApiError>) {
        match result {
            Ok(task) => {
                let mut state = self.state.lock();
                state.upsert(task);
                state.loading_task_id = None;
            }
            Err(e) => {
                tracing::warn!(err = %e, "task update failed");
                let mut state = self.state.lock();
                state.error = Some(StoreError::UpdateFailed);
                state.loading_task_id = None;
            }
        }
    }
}
