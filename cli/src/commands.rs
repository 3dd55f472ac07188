//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for stepwise
#[derive(Parser, Debug)]
#[command(name = "stepwise")]
#[command(author, version, about = "Plan, execute, verify and review goals with language-model agents")]
#[command(long_about = r#"
stepwise decomposes a goal into an ordered plan, drives every step through an
agent, verifies each result and retries with feedback before giving up.

Runs are offline: generation replays a JSON script of canned responses, one
entry per backend call.

Configuration files are loaded from (in priority order):
1. STEPWISE_* environment variables (e.g. STEPWISE_PLANNING__RETRY_BUDGET=5)
2. --config <path>        Explicit config file
3. ./stepwise.toml        Project-level config
4. ~/.config/stepwise/config.toml   Global config

Example:
  stepwise plan "Add a --json flag to the report command" --script responses.json
  stepwise review "Write a tokenizer for INI files" --script review.json
  stepwise route "add a regression test for the parser"
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Also write diagnostics to <DIR>/stepwise.log
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decompose a goal into steps and run them with verification
    Plan {
        /// The goal to accomplish
        goal: String,

        /// JSON script of backend responses
        #[arg(long, value_name = "FILE")]
        script: PathBuf,

        /// Failure policy override: "abort" or "skip"
        #[arg(long, value_name = "POLICY")]
        on_failure: Option<String>,
    },

    /// Produce an artifact and revise it until a reviewer passes it
    Review {
        /// What the artifact should accomplish
        task: String,

        /// JSON script of backend responses
        #[arg(long, value_name = "FILE")]
        script: PathBuf,
    },

    /// Continue an agent run from a saved checkpoint
    Resume {
        /// Agent whose latest checkpoint is resumed
        agent: String,

        /// Resume this checkpoint id instead of the latest one
        #[arg(long, value_name = "ID")]
        checkpoint: Option<String>,

        /// JSON script of backend responses
        #[arg(long, value_name = "FILE")]
        script: PathBuf,
    },

    /// Show which agent variant a task would be routed to
    Route {
        /// Task description
        descriptor: String,

        /// Executor tag attached to the task
        #[arg(long)]
        tag: Option<String>,
    },

    /// Print the effective configuration and any issues found in it
    Config {
        /// Show configuration file locations
        #[arg(long)]
        show_sources: bool,
    },
}
