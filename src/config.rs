use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::agent::{AgentKind, AgentRegistry, CliAgent};
use crate::{tlog_debug, tlog_warn, Result};

/// Per-project directory holding config and state.
pub const PROJECT_DIR_NAME: &str = ".taskloop";

fn default_state_file() -> String {
    format!("{}/tasks.json", PROJECT_DIR_NAME)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Task file, relative to the project directory unless absolute.
    #[serde(default = "default_state_file")]
    pub state_file: String,
    pub default_agent: Option<String>,
    /// Keyed and iterated by name.
    #[serde(default)]
    pub agents: BTreeMap<String, AgentConfig>,
    #[serde(default)]
    pub hooks: HooksConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            default_agent: None,
            agents: BTreeMap::new(),
            hooks: HooksConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub kind: AgentKind,
    /// Binary plus leading arguments; defaults to the agent's name.
    pub command: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HooksConfig {
    #[serde(default)]
    pub pre_task: Vec<HookConfig>,
    #[serde(default)]
    pub post_task: Vec<HookConfig>,
}

/// One `[[hooks.pre_task]]` / `[[hooks.post_task]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HookConfig {
    /// "shell" or "agent".
    #[serde(rename = "type")]
    pub kind: String,
    pub name: Option<String>,
    pub command: Option<String>,
    pub prompt: Option<String>,
    pub agent: Option<String>,
    pub model: Option<String>,
    /// abort_loop | skip_task | ask_agent | warn_continue (default)
    pub on_failure: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn project_dir(project: &Path) -> PathBuf {
        project.join(PROJECT_DIR_NAME)
    }

    pub fn config_path(project: &Path) -> PathBuf {
        Self::project_dir(project).join("config.toml")
    }

    pub fn load(project: &Path) -> Result<Self> {
        let path = Self::config_path(project);
        tlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            tlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        tlog_debug!(
            "Config loaded: state_file={}, default_agent={:?}, agents={}, hooks={}+{}",
            config.state_file,
            config.default_agent,
            config.agents.len(),
            config.hooks.pre_task.len(),
            config.hooks.post_task.len()
        );
        Ok(config)
    }

    pub fn save(&self, project: &Path) -> Result<()> {
        let dir = Self::project_dir(project);
        if !dir.exists() {
            tlog_debug!("Creating project directory: {}", dir.display());
            fs::create_dir_all(&dir)?;
        }
        let path = Self::config_path(project);
        fs::write(&path, toml::to_string_pretty(self)?)?;
        tlog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Absolute location of the task file for `project`.
    pub fn state_path(&self, project: &Path) -> PathBuf {
        let path = expand_tilde(&self.state_file);
        if path.is_absolute() {
            path
        } else {
            project.join(path)
        }
    }

    /// Build the agent registry from `[agents]`.
    ///
    /// With no agents configured the stock `claude` agent is registered.
    /// Agents are registered by name, not declaration order, so without
    /// `default_agent` the alphabetically first agent is the default.
    pub fn registry(&self) -> Arc<AgentRegistry> {
        let mut registry = AgentRegistry::new();
        if self.agents.is_empty() {
            registry.register(Arc::new(CliAgent::claude()));
        }
        for (name, agent) in &self.agents {
            let command = agent.command.as_deref().unwrap_or(name);
            let mut cli = CliAgent::new(name, agent.kind, command);
            if let Some(secs) = agent.timeout_secs {
                cli = cli.with_timeout(Duration::from_secs(secs));
            }
            registry.register(Arc::new(cli));
        }
        if let Some(name) = &self.default_agent {
            if registry.set_default(name).is_err() {
                tlog_warn!("Default agent '{}' is not configured", name);
            }
        }
        Arc::new(registry)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
