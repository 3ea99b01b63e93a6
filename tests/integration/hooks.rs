//! Hook runner against real tasks, shell commands and a scripted agent.

use std::sync::Arc;

use taskloop::agent::{AgentRegistry, AgentRunner};
use taskloop::config::Config;
use taskloop::hooks::{
    AgentHook, AgentOutcome, FailureMode, Hook, HookContext, HookDirective, HookPhase,
    HookRunner, ShellHook,
};
use taskloop::Task;

use crate::fixtures::{ScriptedAgent, TestProject};

fn registry_with(agents: Vec<Arc<ScriptedAgent>>) -> Arc<AgentRegistry> {
    let mut registry = AgentRegistry::new();
    for agent in agents {
        registry.register(agent as Arc<dyn AgentRunner>);
    }
    Arc::new(registry)
}

fn task() -> Task {
    Task::new("auth", "Add login", "Password login form")
}

#[tokio::test]
async fn test_pre_task_shell_hooks_see_task_variables() {
    let project = TestProject::new();
    let mut runner = HookRunner::new();
    runner.add(
        HookPhase::PreTask,
        Box::new(ShellHook::new("marker", "echo \"$TASK_ID\" > marker.txt")),
    );
    runner.add(
        HookPhase::PreTask,
        Box::new(ShellHook::new("echo", "echo \"${TASK_NAME} #${ITERATION}\"")),
    );

    let ctx = HookContext::pre_task(task(), 2, project.dir());
    let outcome = runner.run(&ctx).await;

    assert_eq!(outcome.directive, HookDirective::Proceed);
    assert_eq!(outcome.results[1].output, "Add login #2");
    let marker = std::fs::read_to_string(project.dir().join("marker.txt")).unwrap();
    assert_eq!(marker.trim(), "auth");
}

#[tokio::test]
async fn test_failing_gate_aborts_before_later_hooks() {
    let project = TestProject::new();
    let mut runner = HookRunner::new();
    runner.add(
        HookPhase::PreTask,
        Box::new(ShellHook::new("lint", "exit 1")),
    );
    runner.add(
        HookPhase::PreTask,
        Box::new(ShellHook::new("gate", "exit 4").with_failure_mode(FailureMode::AbortLoop)),
    );
    runner.add(
        HookPhase::PreTask,
        Box::new(ShellHook::new("never", "touch never.txt")),
    );

    let ctx = HookContext::pre_task(task(), 1, project.dir());
    let outcome = runner.run(&ctx).await;

    assert_eq!(outcome.directive, HookDirective::Abort);
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.warnings().count(), 1);
    let blocking = outcome.blocking_result().unwrap();
    assert_eq!(blocking.hook_name, "gate");
    assert_eq!(blocking.exit_code, 4);
    assert!(!project.dir().join("never.txt").exists());
}

#[tokio::test]
async fn test_post_task_agent_hook_gets_agent_output() {
    let project = TestProject::new();
    let reviewer = Arc::new(ScriptedAgent::succeeding("reviewer", "LGTM"));
    let registry = registry_with(vec![Arc::clone(&reviewer)]);

    let hook = AgentHook::new(
        "review",
        "Review ${TASK_NAME} (${AGENT_STATUS}): ${AGENT_OUTPUT}",
        registry,
    );
    let outcome = AgentOutcome {
        output: "added form".to_string(),
        exit_code: 0,
        status: "DONE".to_string(),
    };
    let ctx = HookContext::post_task(task(), 1, project.dir(), outcome);

    let result = hook.execute(Some(&ctx)).await;

    assert!(result.is_success());
    assert_eq!(result.output, "LGTM");
    assert_eq!(
        reviewer.prompts(),
        vec!["Review Add login (DONE): added form".to_string()]
    );
}

#[test]
fn test_agent_failure_asks_agent() {
    let project = TestProject::new();
    let registry = registry_with(vec![Arc::new(ScriptedAgent::failing(
        "reviewer",
        "tests broken",
    ))]);
    let hook = AgentHook::new("review", "Check ${TASK_ID}", registry)
        .with_failure_mode(FailureMode::AskAgent);
    let ctx = HookContext::pre_task(task(), 1, project.dir());

    let result = tokio_test::block_on(hook.execute(Some(&ctx)));

    assert!(!result.success);
    assert_eq!(result.exit_code, 2);
    assert_eq!(result.error, "tests broken");
    assert!(result.should_ask_agent());
    assert_eq!(result.directive(), HookDirective::AskAgent);
}

#[test]
fn test_runner_from_config_uses_configured_agent() {
    let project = TestProject::new();
    let config: Config = toml::from_str(
        r#"
default_agent = "fixer"

[[hooks.post_task]]
type = "agent"
name = "review"
prompt = "Review ${TASK_ID}"
on_failure = "skip_task"

[[hooks.post_task]]
type = "shell"
command = "true"
"#,
    )
    .unwrap();

    let primary = Arc::new(ScriptedAgent::succeeding("primary", "from primary"));
    let fixer = Arc::new(ScriptedAgent::failing("fixer", "cannot review"));
    let registry = registry_with(vec![Arc::clone(&primary), Arc::clone(&fixer)]);
    let runner = HookRunner::from_config(&config, registry).unwrap();

    assert!(runner.hooks(HookPhase::PreTask).is_empty());
    assert_eq!(runner.hooks(HookPhase::PostTask).len(), 2);
    assert_eq!(runner.hooks(HookPhase::PostTask)[1].name(), "shell-2");

    let ctx = HookContext::post_task(task(), 1, project.dir(), AgentOutcome::default());
    let outcome = tokio_test::block_on(runner.run(&ctx));

    // The configured default wins over the first registered agent.
    assert!(primary.prompts().is_empty());
    assert_eq!(fixer.prompts(), vec!["Review auth".to_string()]);
    assert_eq!(outcome.directive, HookDirective::SkipTask);
    assert_eq!(outcome.results.len(), 1);
}
