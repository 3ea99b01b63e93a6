//! AgentHook - runs an agent prompt built from the task context.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::{AgentRegistry, RunOptions};
use crate::hooks::{FailureMode, Hook, HookContext, HookResult};
use crate::{tlog_debug, tlog_trace, tlog_warn, Error, Result};

/// A hook whose action is an agent prompt, e.g. "review the change for
/// ${TASK_NAME}".
///
/// Agent selection: the hook's own agent, then the configured default, then
/// the registry default.
#[derive(Debug, Clone)]
pub struct AgentHook {
    name: String,
    prompt: String,
    agent: Option<String>,
    model: Option<String>,
    default_agent: Option<String>,
    failure_mode: FailureMode,
    timeout: Option<Duration>,
    registry: Arc<AgentRegistry>,
}

impl AgentHook {
    pub fn new(name: &str, prompt: &str, registry: Arc<AgentRegistry>) -> Self {
        Self {
            name: name.to_string(),
            prompt: prompt.to_string(),
            agent: None,
            model: None,
            default_agent: None,
            failure_mode: FailureMode::default(),
            timeout: None,
            registry,
        }
    }

    pub fn with_agent(mut self, agent: Option<String>) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_default_agent(mut self, default_agent: Option<String>) -> Self {
        self.default_agent = default_agent;
        self
    }

    pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    async fn try_execute(&self, ctx: Option<&HookContext>) -> Result<HookResult> {
        let ctx = ctx.ok_or(Error::MissingContext)?;
        if self.prompt.trim().is_empty() {
            return Err(Error::EmptyPrompt);
        }

        let prompt = ctx.expand(&self.prompt);
        let agent = self
            .registry
            .select(self.agent.as_deref(), self.default_agent.as_deref())
            .ok_or_else(|| {
                let wanted = self.agent.as_deref().or(self.default_agent.as_deref());
                Error::AgentNotAvailable(wanted.unwrap_or("no agent registered").to_string())
            })?;
        if !agent.is_available() {
            return Err(Error::AgentNotAvailable(agent.name().to_string()));
        }

        tlog_debug!(
            "AgentHook {} task={} agent={}",
            self.name,
            ctx.task.id,
            agent.name()
        );
        tlog_trace!("AgentHook {} prompt: {}", self.name, prompt);

        let options = RunOptions {
            model: self.model.clone(),
            session_id: None,
            work_dir: Some(ctx.project_dir.clone()),
            timeout: self.timeout,
        };
        let run = agent.run(&prompt, &options).await?;

        let success = run.is_success();
        Ok(HookResult {
            hook_name: self.name.clone(),
            success,
            exit_code: if !success && run.exit_code == 0 {
                1
            } else {
                run.exit_code
            },
            output: run.output,
            error: run.error.unwrap_or_default(),
            failure_mode: self.failure_mode,
        })
    }
}

#[async_trait]
impl Hook for AgentHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn failure_mode(&self) -> FailureMode {
        self.failure_mode
    }

    async fn execute(&self, ctx: Option<&HookContext>) -> HookResult {
        match self.try_execute(ctx).await {
            Ok(result) => result,
            Err(e) => {
                tlog_warn!("AgentHook {} failed: {}", self.name, e);
                HookResult::failure(&self.name, &e, self.failure_mode)
            }
        }
    }
}
