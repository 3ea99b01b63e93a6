//! Hook outcomes and the failure-mode decision table.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// What a failing hook does to the driving loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Stop the loop.
    AbortLoop,
    /// Give up on the current task and move on.
    SkipTask,
    /// Hand the failure to the agent to fix.
    AskAgent,
    /// Log a warning and carry on.
    #[default]
    WarnContinue,
}

impl FailureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureMode::AbortLoop => "abort_loop",
            FailureMode::SkipTask => "skip_task",
            FailureMode::AskAgent => "ask_agent",
            FailureMode::WarnContinue => "warn_continue",
        }
    }

    /// Parse a configured mode; an empty string means the default.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Ok(Self::default()),
            "abort_loop" => Ok(FailureMode::AbortLoop),
            "skip_task" => Ok(FailureMode::SkipTask),
            "ask_agent" => Ok(FailureMode::AskAgent),
            "warn_continue" => Ok(FailureMode::WarnContinue),
            other => Err(Error::InvalidHook(format!("unknown failure mode '{}'", other))),
        }
    }
}

impl std::fmt::Display for FailureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// The single loop-control decision derived from a hook result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDirective {
    /// The hook succeeded.
    Proceed,
    Abort,
    SkipTask,
    AskAgent,
    WarnAndContinue,
}

/// Outcome of one hook execution.
///
/// Hook failures are always reported through this type, never as an error,
/// so the loop can apply the configured failure mode uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HookResult {
    pub hook_name: String,
    pub success: bool,
    pub exit_code: i32,
    pub output: String,
    pub error: String,
    pub failure_mode: FailureMode,
}

impl HookResult {
    pub fn success(hook_name: &str, output: String, failure_mode: FailureMode) -> Self {
        Self {
            hook_name: hook_name.to_string(),
            success: true,
            exit_code: 0,
            output,
            error: String::new(),
            failure_mode,
        }
    }

    /// A failed result with exit code 1.
    pub fn failure(hook_name: &str, error: &Error, failure_mode: FailureMode) -> Self {
        Self {
            hook_name: hook_name.to_string(),
            success: false,
            exit_code: 1,
            output: String::new(),
            error: error.to_string(),
            failure_mode,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success && self.exit_code == 0
    }

    pub fn should_abort(&self) -> bool {
        !self.success && self.failure_mode == FailureMode::AbortLoop
    }

    pub fn should_skip_task(&self) -> bool {
        !self.success && self.failure_mode == FailureMode::SkipTask
    }

    pub fn should_ask_agent(&self) -> bool {
        !self.success && self.failure_mode == FailureMode::AskAgent
    }

    pub fn should_warn_and_continue(&self) -> bool {
        !self.success && self.failure_mode == FailureMode::WarnContinue
    }

    pub fn directive(&self) -> HookDirective {
        if self.success {
            return HookDirective::Proceed;
        }
        match self.failure_mode {
            FailureMode::AbortLoop => HookDirective::Abort,
            FailureMode::SkipTask => HookDirective::SkipTask,
            FailureMode::AskAgent => HookDirective::AskAgent,
            FailureMode::WarnContinue => HookDirective::WarnAndContinue,
        }
    }
}
