//! CLI entrypoint for stepwise
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod app;
mod commands;
mod progress;

use anyhow::{Context, Result, bail};
use app::Runtime;
use clap::Parser;
use commands::{Cli, Command};
use std::path::Path;
use std::sync::Arc;
use stepwise_application::{PlanningOrchestrator, ReviewOrchestrator, SubAgentRegistry};
use stepwise_domain::{ConfigIssue, FailurePolicy, TaskDescriptor};
use stepwise_infrastructure::{ConfigLoader, FileCheckpointStore, FileConfig, JsonFilePlanStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_dir.as_deref())?;

    let config = load_config(&cli)?;
    let issues = config.validate();

    match cli.command {
        Command::Config { show_sources } => {
            if show_sources {
                ConfigLoader::print_config_sources(cli.config.as_deref());
                println!();
            }
            println!("{}", toml::to_string_pretty(&config)?);
            print_issues(&issues);
            Ok(())
        }
        Command::Route { descriptor, tag } => route(&config, descriptor, tag),
        Command::Plan {
            goal,
            script,
            on_failure,
        } => {
            reject_fatal_issues(&issues)?;
            plan(&config, &goal, &script, on_failure.as_deref(), cli.quiet).await
        }
        Command::Review { task, script } => {
            reject_fatal_issues(&issues)?;
            review(&config, &task, &script, cli.quiet).await
        }
        Command::Resume {
            agent,
            checkpoint,
            script,
        } => {
            reject_fatal_issues(&issues)?;
            resume(&config, &agent, checkpoint.as_deref(), &script, cli.quiet).await
        }
    }
}

/// Console diagnostics filtered by `-v`; a copy goes to `<dir>/stepwise.log`
/// when `--log-dir` is given.
fn init_logging(verbose: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, "stepwise.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        return Ok(ConfigLoader::load_defaults());
    }
    if let Some(path) = &cli.config
        && !path.exists()
    {
        bail!("config file {} does not exist", path.display());
    }
    ConfigLoader::load(cli.config.as_deref()).context("loading configuration")
}

fn print_issues(issues: &[ConfigIssue]) {
    for issue in issues {
        eprintln!("{}", issue);
    }
}

fn reject_fatal_issues(issues: &[ConfigIssue]) -> Result<()> {
    for issue in issues.iter().filter(|i| !i.is_error()) {
        warn!("{}", issue.message);
    }
    let errors: Vec<String> = issues
        .iter()
        .filter(|i| i.is_error())
        .map(|i| i.message.clone())
        .collect();
    if !errors.is_empty() {
        bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }
    Ok(())
}

/// Cancel `token` on Ctrl-C. In-flight agent steps finish first.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, stopping after the current step...");
            token.cancel();
        }
    });
}

async fn plan(
    config: &FileConfig,
    goal: &str,
    script: &Path,
    on_failure: Option<&str>,
    quiet: bool,
) -> Result<()> {
    let mut params = config.to_params();
    if let Some(raw) = on_failure {
        let policy: FailurePolicy = raw.parse().map_err(anyhow::Error::msg)?;
        params.planning.failure_policy = policy;
    }
    info!(
        failure_policy = %params.planning.failure_policy,
        retry_budget = params.planning.retry_budget,
        verification = params.planning.verification.as_str(),
        "Starting plan run"
    );

    let token = CancellationToken::new();
    cancel_on_ctrl_c(token.clone());
    let runtime = Runtime::build(config, params, script, quiet, token)?;

    let registry = SubAgentRegistry::new(
        config.routing_table(),
        config.variants(),
        runtime.executor.clone(),
    )
    .map_err(|issue| anyhow::anyhow!("{}", issue))?;

    let orchestrator =
        PlanningOrchestrator::new(runtime.executor.clone(), runtime.params.planning.clone())
            .with_sub_agents(Arc::new(registry))
            .with_store(Arc::new(JsonFilePlanStore::new(config.paths.plans_dir())));

    let output = orchestrator.run(goal).await;
    runtime.report_cache();
    let output = output?;

    println!();
    println!("{}", output.summary.render());

    match output.abort {
        Some(abort) => bail!(
            "plan aborted after {}/{} steps: {}",
            abort.completed_steps,
            abort.total_steps,
            abort.cause
        ),
        None => Ok(()),
    }
}

async fn review(config: &FileConfig, task: &str, script: &Path, quiet: bool) -> Result<()> {
    let token = CancellationToken::new();
    cancel_on_ctrl_c(token.clone());
    let runtime = Runtime::build(config, config.to_params(), script, quiet, token)?;

    let orchestrator = ReviewOrchestrator::new(
        runtime.executor.clone(),
        runtime.executor.clone(),
        runtime.params.review.clone(),
    );
    let output = orchestrator.run(task, &config.checklist()).await;
    runtime.report_cache();
    let output = output?;

    println!();
    println!("{}", output.artifact);
    println!();
    println!(
        "Review: {} after {} cycle(s)",
        if output.passed { "PASS" } else { "FAIL" },
        output.iterations
    );
    if !output.passed {
        println!();
        println!("{}", output.final_critique);
        bail!("artifact did not pass review");
    }
    Ok(())
}

async fn resume(
    config: &FileConfig,
    agent: &str,
    checkpoint: Option<&str>,
    script: &Path,
    quiet: bool,
) -> Result<()> {
    let store = FileCheckpointStore::new(config.paths.checkpoints_dir());
    let snapshot = match checkpoint {
        Some(id) => store
            .load(id)
            .await
            .with_context(|| format!("loading checkpoint {}", id))?,
        None => match store.latest(agent).await? {
            Some(snapshot) => snapshot,
            None => bail!(
                "no checkpoint for agent '{}' in {}",
                agent,
                store.dir().display()
            ),
        },
    };
    if snapshot.agent != agent {
        bail!(
            "checkpoint belongs to agent '{}', not '{}'",
            snapshot.agent,
            agent
        );
    }

    let token = CancellationToken::new();
    cancel_on_ctrl_c(token.clone());
    let runtime = Runtime::build(config, config.to_params(), script, quiet, token)?;

    let output = runtime.executor.resume(snapshot).await;
    runtime.report_cache();
    let output = output?;

    println!();
    println!("{}", output.summary);
    if !output.final_text.is_empty() {
        println!();
        println!("{}", output.final_text);
    }
    Ok(())
}

fn route(config: &FileConfig, descriptor: String, tag: Option<String>) -> Result<()> {
    let table = config.routing_table();
    let mut task = TaskDescriptor::new(descriptor);
    if let Some(tag) = tag {
        task = task.with_executor_tag(tag);
    }

    let decision = table.route(&task);
    let variants = config.variants();
    let Some(variant) = variants.iter().find(|v| v.name == decision.variant) else {
        bail!("routed to undefined variant '{}'", decision.variant);
    };

    println!("variant:   {}", variant.name);
    match decision.matched_rule {
        Some(index) => println!("rule:      #{} ({:?})", index, table.rules()[index].rule),
        None => println!("rule:      none matched, default variant"),
    }
    println!(
        "max steps: {}",
        decision.max_steps.unwrap_or(variant.max_steps)
    );
    if let Some(capabilities) = &variant.capabilities {
        println!("tools:     {}", capabilities.join(", "));
    }
    Ok(())
}
