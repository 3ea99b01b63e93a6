use std::path::PathBuf;

use thiserror::Error;

use crate::core::TaskStatus;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task already exists: {0}")]
    DuplicateId(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Task {0} has no active iteration")]
    NoActiveIteration(String),

    #[error("Iteration {number} of task {task_id} is already complete")]
    IterationAlreadyComplete { task_id: String, number: u32 },

    #[error("Corrupt task store {}: {reason}", path.display())]
    CorruptStore { path: PathBuf, reason: String },

    #[error("Task {id} is not paused (status: {status})")]
    NotPaused { id: String, status: TaskStatus },

    #[error("Hook executed without a task context")]
    MissingContext,

    #[error("Hook prompt is empty")]
    EmptyPrompt,

    #[error("Invalid hook configuration: {0}")]
    InvalidHook(String),

    #[error("Agent not available: {0}")]
    AgentNotAvailable(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
