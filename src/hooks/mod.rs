//! Pre- and post-task hooks.
//!
//! A hook is a shell command or an agent prompt run around each task. Its
//! outcome is always a [`HookResult`]; the configured [`FailureMode`] turns a
//! failure into a [`HookDirective`] for the driving loop.

mod agent;
mod context;
mod result;
mod shell;

pub use agent::AgentHook;
pub use context::{AgentOutcome, HookContext, HookPhase};
pub use result::{FailureMode, HookDirective, HookResult};
pub use shell::{ShellHook, DEFAULT_SHELL_TIMEOUT_SECS};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::AgentRegistry;
use crate::config::{Config, HookConfig};
use crate::{tlog_debug, tlog_warn, Error, Result};

#[async_trait]
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    fn failure_mode(&self) -> FailureMode;

    /// Run the hook. Never fails: every problem is reported as an
    /// unsuccessful [`HookResult`].
    async fn execute(&self, ctx: Option<&HookContext>) -> HookResult;
}

/// Construct a hook from its configuration entry.
///
/// # Errors
/// `InvalidHook` for an unknown `type` or `on_failure` value.
pub fn build_hook(
    config: &HookConfig,
    index: usize,
    registry: &Arc<AgentRegistry>,
    default_agent: Option<&str>,
) -> Result<Box<dyn Hook>> {
    let failure_mode = FailureMode::parse(config.on_failure.as_deref().unwrap_or(""))?;
    let name = config
        .name
        .clone()
        .unwrap_or_else(|| format!("{}-{}", config.kind, index + 1));
    let timeout = config.timeout_secs.map(Duration::from_secs);

    match config.kind.as_str() {
        "shell" => {
            let mut hook = ShellHook::new(&name, config.command.as_deref().unwrap_or(""))
                .with_failure_mode(failure_mode);
            if let Some(timeout) = timeout {
                hook = hook.with_timeout(timeout);
            }
            Ok(Box::new(hook))
        }
        "agent" => {
            let prompt = config
                .prompt
                .as_deref()
                .or(config.command.as_deref())
                .unwrap_or("");
            let hook = AgentHook::new(&name, prompt, Arc::clone(registry))
                .with_agent(config.agent.clone())
                .with_model(config.model.clone())
                .with_default_agent(default_agent.map(String::from))
                .with_failure_mode(failure_mode)
                .with_timeout(timeout);
            Ok(Box::new(hook))
        }
        other => Err(Error::InvalidHook(format!("unknown hook type '{}'", other))),
    }
}

/// Results of running every hook of one phase.
#[derive(Debug, Clone)]
pub struct PhaseOutcome {
    pub results: Vec<HookResult>,
    /// `Proceed` unless a failing hook asked to abort, skip or ask the agent.
    pub directive: HookDirective,
}

impl PhaseOutcome {
    /// The result that stopped the phase, if any.
    pub fn blocking_result(&self) -> Option<&HookResult> {
        if self.directive == HookDirective::Proceed {
            return None;
        }
        self.results.last()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &HookResult> {
        self.results.iter().filter(|r| r.should_warn_and_continue())
    }
}

/// Ordered pre-task and post-task hooks.
#[derive(Default)]
pub struct HookRunner {
    pre_task: Vec<Box<dyn Hook>>,
    post_task: Vec<Box<dyn Hook>>,
}

impl HookRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config, registry: Arc<AgentRegistry>) -> Result<Self> {
        let default_agent = config.default_agent.as_deref();
        let mut runner = Self::new();
        for (index, hook) in config.hooks.pre_task.iter().enumerate() {
            runner.add(
                HookPhase::PreTask,
                build_hook(hook, index, &registry, default_agent)?,
            );
        }
        for (index, hook) in config.hooks.post_task.iter().enumerate() {
            runner.add(
                HookPhase::PostTask,
                build_hook(hook, index, &registry, default_agent)?,
            );
        }
        Ok(runner)
    }

    pub fn add(&mut self, phase: HookPhase, hook: Box<dyn Hook>) {
        match phase {
            HookPhase::PreTask => self.pre_task.push(hook),
            HookPhase::PostTask => self.post_task.push(hook),
        }
    }

    pub fn hooks(&self, phase: HookPhase) -> &[Box<dyn Hook>] {
        match phase {
            HookPhase::PreTask => &self.pre_task,
            HookPhase::PostTask => &self.post_task,
        }
    }

    /// Run the hooks for `ctx.phase` in order.
    ///
    /// Failures under `warn_continue` are logged and skipped over; the first
    /// other failure stops the phase.
    pub async fn run(&self, ctx: &HookContext) -> PhaseOutcome {
        let mut results = Vec::new();
        for hook in self.hooks(ctx.phase) {
            let result = hook.execute(Some(ctx)).await;
            let directive = result.directive();
            tlog_debug!(
                "Hook {} ({}) task={} -> {:?}",
                hook.name(),
                ctx.phase,
                ctx.task.id,
                directive
            );
            results.push(result);

            match directive {
                HookDirective::Proceed => {}
                HookDirective::WarnAndContinue => {
                    tlog_warn!("Hook {} failed, continuing", hook.name());
                }
                blocking => {
                    return PhaseOutcome {
                        results,
                        directive: blocking,
                    };
                }
            }
        }
        PhaseOutcome {
            results,
            directive: HookDirective::Proceed,
        }
    }
}
