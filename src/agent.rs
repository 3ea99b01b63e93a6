//! Agent invocation.
//!
//! An agent is any CLI that takes a prompt and does work in the project
//! directory. Claude Code is driven in headless mode (`-p`) with JSON output;
//! other tools are run with the prompt as the final argument and their
//! stdout taken verbatim.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use crate::{tlog_debug, tlog_warn, Error, Result};

/// Default timeout for one agent run (10 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Per-invocation options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub model: Option<String>,
    /// Session to continue, if the agent supports it.
    pub session_id: Option<String>,
    pub work_dir: Option<PathBuf>,
    /// Overrides the agent's own timeout.
    pub timeout: Option<Duration>,
}

/// Outcome of one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgentRun {
    pub output: String,
    pub exit_code: i32,
    /// Agent-reported status, e.g. "success" or "error".
    pub status: String,
    pub error: Option<String>,
    pub session_id: Option<String>,
}

impl AgentRun {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && self.error.is_none()
    }
}

/// Something that can run a prompt.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    async fn run(&self, prompt: &str, options: &RunOptions) -> Result<AgentRun>;
}

/// How a CLI agent is invoked and its output interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// `claude -p <prompt> --output-format json`
    #[default]
    Claude,
    /// `<command> <prompt>`, plain stdout.
    Command,
}

/// An agent backed by a local executable.
#[derive(Debug, Clone)]
pub struct CliAgent {
    name: String,
    kind: AgentKind,
    base_command: Vec<String>,
    timeout: Duration,
}

impl CliAgent {
    pub fn new(name: &str, kind: AgentKind, command: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            base_command: command.split_whitespace().map(String::from).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// The stock Claude Code agent.
    pub fn claude() -> Self {
        Self::new("claude", AgentKind::Claude, "claude")
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &str {
        self.base_command
            .first()
            .map(|s| s.as_str())
            .unwrap_or("claude")
    }

    /// Full argv for a prompt, binary first.
    pub fn command(&self, prompt: &str, options: &RunOptions) -> Vec<String> {
        let mut cmd = if self.base_command.is_empty() {
            vec![self.binary().to_string()]
        } else {
            self.base_command.clone()
        };

        match self.kind {
            AgentKind::Claude => {
                cmd.extend(["-p".to_string(), prompt.to_string()]);
                cmd.extend(["--output-format".to_string(), "json".to_string()]);
                if let Some(model) = &options.model {
                    cmd.extend(["--model".to_string(), model.clone()]);
                }
                if let Some(session) = &options.session_id {
                    cmd.extend(["--resume".to_string(), session.clone()]);
                }
            }
            AgentKind::Command => cmd.push(prompt.to_string()),
        }
        cmd
    }

    /// Parse Claude's `--output-format json` document.
    pub fn parse_json_response(json_str: &str) -> Result<AgentRun> {
        let raw: RawClaudeResponse = serde_json::from_str(json_str.trim())?;

        let is_error = raw.is_error.unwrap_or(false) || raw.subtype.as_deref() == Some("error");
        let status = raw
            .subtype
            .unwrap_or_else(|| if is_error { "error" } else { "success" }.to_string());

        if is_error {
            let message = raw
                .error
                .or(raw.result)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Ok(AgentRun {
                output: String::new(),
                exit_code: 1,
                status,
                error: Some(message),
                session_id: raw.session_id,
            });
        }

        Ok(AgentRun {
            output: raw.result.unwrap_or_default(),
            exit_code: 0,
            status,
            error: None,
            session_id: raw.session_id,
        })
    }
}

/// Internal struct for deserializing Claude JSON response.
#[derive(Debug, Deserialize)]
struct RawClaudeResponse {
    subtype: Option<String>,
    result: Option<String>,
    session_id: Option<String>,
    is_error: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl AgentRunner for CliAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        which::which(self.binary()).is_ok()
    }

    async fn run(&self, prompt: &str, options: &RunOptions) -> Result<AgentRun> {
        let argv = self.command(prompt, options);
        let timeout = options.timeout.unwrap_or(self.timeout);
        tlog_debug!(
            "CliAgent::run name={} binary={} args={}",
            self.name,
            self.binary(),
            argv.len()
        );

        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]).kill_on_drop(true);
        if let Some(dir) = &options.work_dir {
            command.current_dir(dir);
        }

        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| Error::Timeout(timeout))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);

        if self.kind == AgentKind::Claude {
            if let Ok(run) = Self::parse_json_response(&stdout) {
                return Ok(run);
            }
            tlog_warn!("Agent {} returned non-JSON output", self.name);
        }

        let error = if output.status.success() {
            None
        } else if stderr.trim().is_empty() {
            Some(format!("{} exited with code {}", self.name, exit_code))
        } else {
            Some(stderr.trim().to_string())
        };

        Ok(AgentRun {
            output: stdout.trim().to_string(),
            exit_code,
            status: if error.is_none() { "success" } else { "error" }.to_string(),
            error,
            session_id: None,
        })
    }
}

/// Named agents plus a fallback default.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Arc<dyn AgentRunner>>,
    default: Option<String>,
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.names())
            .field("default", &self.default)
            .finish()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under its own name. The first registered agent
    /// becomes the default until [`AgentRegistry::set_default`] picks another.
    pub fn register(&mut self, agent: Arc<dyn AgentRunner>) {
        let name = agent.name().to_string();
        if self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.agents.insert(name, agent);
    }

    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.agents.contains_key(name) {
            return Err(Error::AgentNotAvailable(name.to_string()));
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentRunner>> {
        self.agents.get(name).cloned()
    }

    pub fn default_agent(&self) -> Option<Arc<dyn AgentRunner>> {
        self.default.as_deref().and_then(|name| self.get(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Pick an agent: the hook's own agent, then the configured default,
    /// then the registry default. Names that are not registered fall through
    /// to the next candidate.
    pub fn select(
        &self,
        hook_agent: Option<&str>,
        configured_default: Option<&str>,
    ) -> Option<Arc<dyn AgentRunner>> {
        for name in [hook_agent, configured_default].into_iter().flatten() {
            if name.is_empty() {
                continue;
            }
            if let Some(agent) = self.get(name) {
                return Some(agent);
            }
            tlog_warn!("Agent '{}' is not registered, falling back", name);
        }
        self.default_agent()
    }
}
