// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{ClientKind, Proto};

/// Command-line arguments for `wesqueue`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "wesqueue",
    version,
    about = "Queue workflow runs, submit them to execution services and track them to completion.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the orchestrator config file (TOML).
    ///
    /// Default: `$WESQUEUE_CONFIG`, else `wesqueue.toml` in the current
    /// working directory. Created with defaults if missing.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Path to the submission store (JSON).
    #[arg(long, global = true, value_name = "PATH", default_value = "submission_queue.json")]
    pub store: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WESQUEUE_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Queue a new submission without running it.
    Submit {
        queue: String,

        /// Job parameters as inline JSON.
        #[arg(long, value_name = "JSON", default_value = "{}")]
        params: String,

        /// Bind the submission to this execution service.
        #[arg(long, value_name = "WES_ID")]
        wes: Option<String>,

        /// Run it right away instead of leaving it `RECEIVED`.
        #[arg(long)]
        now: bool,

        /// Extra attachment locators (repeatable). Only sent with `--now`;
        /// stored submissions run with the queue's attachments.
        #[arg(long = "attach", value_name = "URL", requires = "now")]
        attachments: Vec<String>,
    },

    /// Run one stored submission.
    Run {
        queue: String,
        submission: String,

        #[arg(long, value_name = "WES_ID")]
        wes: Option<String>,
    },

    /// Run every `RECEIVED` submission of a queue.
    RunQueue {
        queue: String,

        #[arg(long, value_name = "WES_ID")]
        wes: Option<String>,
    },

    /// Run every `RECEIVED` submission of every queue.
    RunAll,

    /// List submissions with their status.
    Status {
        /// Only this queue.
        queue: Option<String>,

        /// Include every status, not just the default set.
        #[arg(long)]
        all: bool,
    },

    /// Poll submitted runs until interrupted.
    Monitor {
        /// Seconds between passes.
        #[arg(long, value_name = "SECS", default_value_t = 4)]
        interval: u64,
    },

    /// Ask the execution service to cancel a submission's run.
    Cancel { queue: String, submission: String },

    /// Check which tool registries and execution services respond.
    Services,

    /// Run a queue's registered checker workflow on one execution service.
    Check {
        queue: String,

        #[arg(long, value_name = "WES_ID")]
        wes: String,
    },

    /// Run checker workflows for every registry-backed queue on each of its
    /// allowed execution services.
    CheckAll {
        /// Only these queues.
        queues: Vec<String>,
    },

    /// Inspect or edit the orchestrator config.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Print the current configuration.
    Show,

    /// Register a queue.
    AddQueue(AddQueueArgs),

    /// Register an execution service.
    AddService(EndpointArgs),

    /// Register a tool registry.
    AddRegistry(EndpointArgs),

    /// Allow an execution service on one or more queues.
    AddWesOpt {
        wes_id: String,

        #[arg(required = true)]
        queues: Vec<String>,

        /// Also make it the queue default.
        #[arg(long)]
        default: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct AddQueueArgs {
    pub queue: String,

    #[arg(long, default_value = "CWL")]
    pub workflow_type: String,

    #[arg(long, value_name = "URL")]
    pub workflow_url: Option<String>,

    #[arg(long, value_name = "TRS_ID")]
    pub trs_id: Option<String>,

    #[arg(long, value_name = "ID")]
    pub workflow_id: Option<String>,

    #[arg(long, value_name = "VERSION")]
    pub version_id: Option<String>,

    #[arg(long = "attach", value_name = "URL")]
    pub attachments: Vec<String>,

    #[arg(long, value_name = "WES_ID", default_value = "local")]
    pub wes_default: String,

    #[arg(long = "wes-opt", value_name = "WES_ID")]
    pub wes_opts: Vec<String>,

    #[arg(long, value_name = "QUEUE")]
    pub target_queue: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct EndpointArgs {
    pub id: String,

    /// `host[:port]`, no scheme.
    pub host: String,

    #[arg(long, value_enum, default_value = "https")]
    pub proto: ProtoArg,

    /// Sent verbatim as the `Authorization` header.
    #[arg(long, value_name = "TOKEN")]
    pub auth: Option<String>,

    /// Client strategy (execution services only).
    #[arg(long, value_enum, default_value = "contract")]
    pub client: ClientArg,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum ProtoArg {
    Http,
    Https,
}

impl From<ProtoArg> for Proto {
    fn from(arg: ProtoArg) -> Self {
        match arg {
            ProtoArg::Http => Proto::Http,
            ProtoArg::Https => Proto::Https,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum ClientArg {
    Contract,
    Library,
}

impl From<ClientArg> for ClientKind {
    fn from(arg: ClientArg) -> Self {
        match arg {
            ClientArg::Contract => ClientKind::Contract,
            ClientArg::Library => ClientKind::Library,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
