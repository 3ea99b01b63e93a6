//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Temporary stores and managers
//! - A scripted agent runner
//! - Predefined task sets

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use taskloop::agent::{AgentRun, AgentRunner, RunOptions};
use taskloop::{Manager, Result, Store, Task};

/// A store backed by a file inside a temporary directory.
pub struct TestProject {
    /// Kept alive so the directory outlives the store.
    pub temp_dir: TempDir,
    pub state_path: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let state_path = temp_dir.path().join(".taskloop").join("tasks.json");
        Self {
            temp_dir,
            state_path,
        }
    }

    pub fn dir(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    pub fn store(&self) -> Arc<Store> {
        Arc::new(Store::open(&self.state_path).expect("Failed to open store"))
    }

    /// A manager with autosave over a store seeded with `tasks`.
    pub fn manager_with(&self, tasks: Vec<Task>) -> Manager {
        let store = self.store();
        store.add_all(tasks).expect("Failed to seed tasks");
        store.save().expect("Failed to save seeded tasks");
        Manager::new(store).with_autosave(true)
    }
}

/// Tasks with explicit orders 1..=n and ids `task-1`..`task-n`.
pub fn numbered_tasks(n: u32) -> Vec<Task> {
    (1..=n)
        .map(|i| Task::new(&format!("task-{}", i), &format!("Task {}", i), "").with_order(i))
        .collect()
}

/// Agent runner that replays a fixed response and records every prompt.
pub struct ScriptedAgent {
    name: String,
    response: AgentRun,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    pub fn new(name: &str, response: AgentRun) -> Self {
        Self {
            name: name.to_string(),
            response,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(name: &str, output: &str) -> Self {
        Self::new(
            name,
            AgentRun {
                output: output.to_string(),
                status: "success".to_string(),
                ..Default::default()
            },
        )
    }

    pub fn failing(name: &str, error: &str) -> Self {
        Self::new(
            name,
            AgentRun {
                exit_code: 2,
                status: "error".to_string(),
                error: Some(error.to_string()),
                ..Default::default()
            },
        )
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentRunner for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn run(&self, prompt: &str, _options: &RunOptions) -> Result<AgentRun> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }
}
