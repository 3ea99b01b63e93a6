//! ShellHook - runs a shell command before or after a task.

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

use crate::hooks::{FailureMode, Hook, HookContext, HookResult};
use crate::{tlog_debug, tlog_warn, Error, Result};

/// Default timeout for a shell hook (5 minutes).
pub const DEFAULT_SHELL_TIMEOUT_SECS: u64 = 300;

/// A hook that runs `sh -c <command>`.
///
/// `${VAR}` placeholders are expanded in the command text and the same
/// variables are exported to the child's environment. The command runs in
/// the project directory when a context is given.
#[derive(Debug, Clone)]
pub struct ShellHook {
    name: String,
    command: String,
    failure_mode: FailureMode,
    timeout: Duration,
}

impl ShellHook {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
            failure_mode: FailureMode::default(),
            timeout: Duration::from_secs(DEFAULT_SHELL_TIMEOUT_SECS),
        }
    }

    pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    async fn try_execute(&self, ctx: Option<&HookContext>) -> Result<HookResult> {
        if self.command.trim().is_empty() {
            return Err(Error::EmptyPrompt);
        }

        let mut cmd = Command::new("sh");
        cmd.kill_on_drop(true);
        match ctx {
            Some(ctx) => {
                cmd.arg("-c").arg(ctx.expand(&self.command));
                cmd.envs(ctx.variables()).current_dir(&ctx.project_dir);
            }
            None => {
                cmd.arg("-c").arg(&self.command);
            }
        }
        tlog_debug!("ShellHook {} command={}", self.name, self.command);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;

        Ok(HookResult {
            hook_name: self.name.clone(),
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            output: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            error: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            failure_mode: self.failure_mode,
        })
    }
}

#[async_trait]
impl Hook for ShellHook {
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
                tlog_warn!("ShellHook {} failed: {}", self.name, e);
                HookResult::failure(&self.name, &e, self.failure_mode)
            }
        }
    }
}
