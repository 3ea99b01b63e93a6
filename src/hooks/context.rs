//! Execution context handed to hooks and `${VAR}` expansion.

use regex::{Captures, Regex};
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::core::{Iteration, Task};

/// `${NAME}` with a shell-style variable name.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// When a hook runs relative to the agent's work on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    PreTask,
    PostTask,
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookPhase::PreTask => write!(f, "pre_task"),
            HookPhase::PostTask => write!(f, "post_task"),
        }
    }
}

/// The agent run a post-task hook reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgentOutcome {
    pub output: String,
    pub exit_code: i32,
    pub status: String,
}

impl AgentOutcome {
    /// Rebuild the outcome recorded on an iteration. Only the result tag is
    /// stored, so an `ERROR` tag maps to exit code 1 and anything else to 0.
    pub fn from_iteration(iteration: &Iteration) -> Self {
        let failed = iteration.result.eq_ignore_ascii_case("ERROR");
        Self {
            output: iteration.agent_output.clone(),
            exit_code: i32::from(failed),
            status: iteration.result.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HookContext {
    pub phase: HookPhase,
    pub task: Task,
    pub iteration: u32,
    pub project_dir: PathBuf,
    /// Only set for post-task hooks.
    pub agent: Option<AgentOutcome>,
}

impl HookContext {
    pub fn pre_task(task: Task, iteration: u32, project_dir: PathBuf) -> Self {
        Self {
            phase: HookPhase::PreTask,
            task,
            iteration,
            project_dir,
            agent: None,
        }
    }

    pub fn post_task(
        task: Task,
        iteration: u32,
        project_dir: PathBuf,
        agent: AgentOutcome,
    ) -> Self {
        Self {
            phase: HookPhase::PostTask,
            task,
            iteration,
            project_dir,
            agent: Some(agent),
        }
    }

    /// Variable names and values available to templates.
    pub fn variables(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            ("TASK_ID", self.task.id.clone()),
            ("TASK_NAME", self.task.name.clone()),
            ("TASK_DESCRIPTION", self.task.description.clone()),
            ("TASK_STATUS", self.task.status.to_string()),
            ("ITERATION", self.iteration.to_string()),
            ("PROJECT_DIR", self.project_dir.display().to_string()),
        ];
        if let Some(agent) = &self.agent {
            vars.push(("AGENT_OUTPUT", agent.output.clone()));
            vars.push(("AGENT_EXIT_CODE", agent.exit_code.to_string()));
            vars.push(("AGENT_STATUS", agent.status.clone()));
        }
        vars
    }

    /// Replace known `${NAME}` placeholders with their values.
    ///
    /// Substituted values are not expanded again. Unknown names and
    /// malformed placeholders are left as written.
    pub fn expand(&self, template: &str) -> String {
        let vars = self.variables();
        PLACEHOLDER_RE
            .replace_all(template, |caps: &Captures| {
                vars.iter()
                    .find(|(name, _)| *name == &caps[1])
                    .map(|(_, value)| value.clone())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
