//! Task data model for the work queue.
//!
//! Tasks are the units of work handed to agents. Each task tracks its
//! status, scheduling order, the history of attempts ("iterations") made
//! against it, and free-form metadata.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::{Error, Result};

/// Task status in its lifecycle.
///
/// `Completed`, `Skipped` and `Failed` are terminal: the scheduler never
/// selects a task in one of those states. Nothing prevents a caller from
/// starting another iteration on a terminal task; that guard belongs to
/// whoever drives the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task created but not yet attempted.
    #[default]
    Pending,
    /// An iteration has been started and the task is being worked on.
    InProgress,
    /// Task finished successfully.
    Completed,
    /// Task was deliberately passed over.
    Skipped,
    /// Work was deferred; resuming starts a new iteration.
    Paused,
    /// Task gave up with an error.
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Skipped,
        TaskStatus::Paused,
        TaskStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Skipped => "skipped",
            TaskStatus::Paused => "paused",
            TaskStatus::Failed => "failed",
        }
    }

    /// Check if the status is terminal (Completed, Skipped or Failed).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Skipped | TaskStatus::Failed
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidTask(format!("unknown status '{}'", s)))
    }
}

/// One timed attempt at completing a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iteration {
    /// 1-indexed position in the task's iteration history.
    pub number: u32,
    pub started_at: DateTime<Utc>,
    /// `None` while the iteration is still open.
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Outcome tag reported by the agent, e.g. "DONE", "NEXT" or "ERROR".
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub agent_output: String,
    #[serde(default)]
    pub session_id: String,
}

impl Iteration {
    fn open(number: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            number,
            started_at,
            ended_at: None,
            result: String::new(),
            agent_output: String::new(),
            session_id: String::new(),
        }
    }

    /// An iteration is complete once its end time has been recorded.
    pub fn is_complete(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Elapsed time of the attempt, measured up to now for open iterations.
    pub fn duration(&self) -> Duration {
        self.ended_at.unwrap_or_else(Utc::now) - self.started_at
    }
}

/// A single unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within a store.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    /// Ascending order means earlier execution. Zero means "unset" and is
    /// replaced by the store on insertion.
    #[serde(default)]
    pub order: u32,
    /// Continuation token of the most recent agent invocation.
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub iterations: Vec<Iteration>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task with an empty iteration history.
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            status: TaskStatus::Pending,
            order: 0,
            session_id: String::new(),
            iterations: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Generate a short random identifier for tasks created without one.
    pub fn generate_id() -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        format!("task-{}", &uuid[..8])
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn set_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
        self.touch();
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Begin a new attempt.
    ///
    /// Sets the status to `InProgress` and appends an open iteration numbered
    /// after the existing history. A previously open iteration is left as is.
    pub fn start_iteration(&mut self) -> Iteration {
        let now = Utc::now();
        let iteration = Iteration::open(self.iterations.len() as u32 + 1, now);
        self.iterations.push(iteration.clone());
        self.status = TaskStatus::InProgress;
        self.updated_at = now;
        iteration
    }

    /// Close the most recent iteration with the agent's outcome.
    ///
    /// A non-empty `session_id` is also recorded on the task so the next
    /// attempt can continue the same agent session.
    ///
    /// # Errors
    /// `NoActiveIteration` when no iteration exists and
    /// `IterationAlreadyComplete` when the latest one is already closed.
    pub fn end_iteration(&mut self, result: &str, output: &str, session_id: &str) -> Result<()> {
        let Some(iteration) = self.iterations.last_mut() else {
            return Err(Error::NoActiveIteration(self.id.clone()));
        };
        if iteration.is_complete() {
            return Err(Error::IterationAlreadyComplete {
                task_id: self.id.clone(),
                number: iteration.number,
            });
        }

        let now = Utc::now();
        iteration.ended_at = Some(now);
        iteration.result = result.to_string();
        iteration.agent_output = output.to_string();
        iteration.session_id = session_id.to_string();

        if !session_id.is_empty() {
            self.session_id = session_id.to_string();
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_completed(&mut self) {
        self.finish(TaskStatus::Completed);
    }

    pub fn mark_failed(&mut self) {
        self.finish(TaskStatus::Failed);
    }

    pub fn mark_skipped(&mut self) {
        self.finish(TaskStatus::Skipped);
    }

    pub fn mark_paused(&mut self) {
        self.status = TaskStatus::Paused;
        self.touch();
    }

    /// Start a new iteration if, and only if, the task is paused.
    pub fn resume(&mut self) -> Option<Iteration> {
        if self.status != TaskStatus::Paused {
            return None;
        }
        Some(self.start_iteration())
    }

    /// The latest iteration, open or closed.
    pub fn current_iteration(&self) -> Option<&Iteration> {
        self.iterations.last()
    }

    pub fn iteration_count(&self) -> usize {
        self.iterations.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pending and paused tasks are both "not yet done".
    pub fn is_resumable(&self) -> bool {
        matches!(self.status, TaskStatus::Pending | TaskStatus::Paused)
    }

    /// Check identity fields.
    ///
    /// Unknown status values cannot be represented by [`TaskStatus`]; they are
    /// rejected when a stored task is deserialized.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidTask("task id is empty".to_string()));
        }
        if self.name.is_empty() {
            return Err(Error::InvalidTask(format!("task {} has an empty name", self.id)));
        }
        Ok(())
    }

    fn finish(&mut self, status: TaskStatus) {
        let now = Utc::now();
        self.status = status;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
