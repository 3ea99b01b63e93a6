use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use taskloop::config::Config;
use taskloop::hooks::{AgentOutcome, HookContext, HookDirective, HookRunner};
use taskloop::{tlog, tlog_error, Error, Manager, Result, Store, Task};

/// taskloop - drive agent-executed tasks to completion
#[derive(Parser, Debug)]
#[command(name = "taskloop")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    TASKLOOP_DEBUG=1     Enable debug logging (alternative to --debug)"
)]
pub struct Cli {
    /// Project directory holding .taskloop/
    #[arg(short = 'C', long, default_value = ".")]
    pub project: PathBuf,

    /// Enable debug logging (writes to ~/.taskloop/taskloop.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List all tasks in execution order
    List,

    /// Show the task that should run next
    Next,

    /// Show completed/total counts
    Progress,

    /// Add a pending task
    Add {
        /// Task name
        name: String,

        /// Task id (generated if omitted)
        #[arg(long)]
        id: Option<String>,

        #[arg(long, default_value = "")]
        description: String,

        /// Explicit order (defaults to after every existing task)
        #[arg(long)]
        order: Option<u32>,
    },

    /// Start a new iteration on a task
    Start { id: String },

    /// Close the current iteration of a task
    End {
        id: String,

        /// Outcome tag, e.g. DONE, NEXT or ERROR
        #[arg(long)]
        result: String,

        #[arg(long, default_value = "")]
        output: String,

        /// Agent session to continue next time
        #[arg(long, default_value = "")]
        session: String,
    },

    /// Mark a task completed
    Complete { id: String },

    /// Mark a task skipped
    Skip { id: String },

    /// Pause a task
    Pause { id: String },

    /// Mark a task failed
    Fail { id: String },

    /// Resume a paused task
    Resume { id: String },

    /// Remove a task
    Remove { id: String },

    /// Move the given tasks to the front, in this order
    Reorder {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Run the configured hooks of one phase against a task
    Hooks { phase: Phase, id: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Pre,
    Post,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    taskloop::log::init_with_debug(cli.debug);

    let result = run(cli);
    if let Err(e) = &result {
        tlog_error!("taskloop failed: {}", e);
    }
    result
}

fn run(cli: Cli) -> Result<()> {
    let project = cli.project.canonicalize()?;
    let config = Config::load(&project)?;
    let store = Store::open(config.state_path(&project))?;
    let manager = Manager::new(Arc::new(store)).with_autosave(true);
    tlog!(
        "taskloop {:?} project={}",
        cli.command,
        project.display()
    );

    match cli.command {
        Command::List => run_list(&manager),
        Command::Next => {
            match manager.get_next() {
                Some(task) => print_task(&task),
                None => println!("No remaining tasks."),
            }
            Ok(())
        }
        Command::Progress => {
            let (completed, total) = manager.progress();
            println!(
                "{}/{} completed, {} remaining",
                completed,
                total,
                manager.count_remaining()
            );
            Ok(())
        }
        Command::Add {
            name,
            id,
            description,
            order,
        } => {
            let id = id.unwrap_or_else(Task::generate_id);
            let task = Task::new(&id, &name, &description).with_order(order.unwrap_or(0));
            manager.store().add(task)?;
            manager.save()?;
            println!("Added {}", id);
            Ok(())
        }
        Command::Start { id } => {
            let iteration = manager.start_iteration(&id)?;
            println!("{}: iteration {} started", id, iteration.number);
            Ok(())
        }
        Command::End {
            id,
            result,
            output,
            session,
        } => manager.end_iteration(&id, &result, &output, &session),
        Command::Complete { id } => manager.mark_complete(&id),
        Command::Skip { id } => manager.mark_skip(&id),
        Command::Pause { id } => manager.mark_pause(&id),
        Command::Fail { id } => manager.mark_fail(&id),
        Command::Resume { id } => {
            let iteration = manager.resume(&id)?;
            println!("{}: iteration {} started", id, iteration.number);
            Ok(())
        }
        Command::Remove { id } => {
            manager.store().delete(&id)?;
            manager.save()
        }
        Command::Reorder { ids } => {
            manager.reorder(ids.as_slice())?;
            run_list(&manager)
        }
        Command::Hooks { phase, id } => run_hooks(&config, &manager, &project, phase, &id),
    }
}

fn run_list(manager: &Manager) -> Result<()> {
    let tasks = manager.all();
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    for task in &tasks {
        print_task(task);
    }
    let (completed, total) = manager.progress();
    println!("\n{}/{} completed", completed, total);
    Ok(())
}

fn print_task(task: &Task) {
    println!(
        "{:>4}  {:<14} {:<12} {} ({} iterations)",
        task.order,
        task.id,
        task.status,
        task.name,
        task.iteration_count()
    );
}

fn run_hooks(
    config: &Config,
    manager: &Manager,
    project: &Path,
    phase: Phase,
    id: &str,
) -> Result<()> {
    let task = manager
        .get(id)
        .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
    let iteration = task.iteration_count() as u32;

    let ctx = match phase {
        Phase::Pre => HookContext::pre_task(task, iteration, project.to_path_buf()),
        Phase::Post => {
            let outcome = task
                .current_iteration()
                .map(AgentOutcome::from_iteration)
                .unwrap_or_default();
            HookContext::post_task(task, iteration, project.to_path_buf(), outcome)
        }
    };

    let runner = HookRunner::from_config(config, config.registry())?;
    if runner.hooks(ctx.phase).is_empty() {
        println!("No {} hooks configured.", ctx.phase);
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(runner.run(&ctx));

    for result in &outcome.results {
        let state = if result.is_success() { "ok" } else { "FAILED" };
        println!(
            "{:<16} {:<6} exit={} mode={}",
            result.hook_name, state, result.exit_code, result.failure_mode
        );
        if !result.error.is_empty() {
            println!("    {}", result.error);
        }
    }

    let verdict = match outcome.directive {
        HookDirective::Proceed => "proceed",
        HookDirective::Abort => "abort loop",
        HookDirective::SkipTask => "skip task",
        HookDirective::AskAgent => "ask agent",
        HookDirective::WarnAndContinue => "continue with warnings",
    };
    println!("=> {}", verdict);
    Ok(())
}
