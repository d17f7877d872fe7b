// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod notify;
pub mod registry;
pub mod store;
pub mod types;
pub mod wes;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::cli::{AddQueueArgs, CliArgs, Command, ConfigCommand, EndpointArgs};
use crate::config::{ConfigStore, QueueConfig, ServiceEndpoint, default_config_path};
use crate::engine::{Orchestrator, OrchestratorLog, QueueLog, check_matrix, checker_queue_id};
use crate::fs::RealFileSystem;
use crate::notify::{DEFAULT_VERIFICATIONS_FILE, VerificationLog};
use crate::store::{StatusFilter, SubmissionStore};
use crate::wes::EndpointConnector;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the config document and the submission store on disk
/// - the orchestrator with real execution-service clients
/// - the verification log next to the store
/// - Ctrl-C handling for `monitor`
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args
        .config
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let store_path = PathBuf::from(&args.store);
    debug!(config = ?config_path, store = ?store_path, "resolved paths");

    let config = ConfigStore::new(RealFileSystem, &config_path);
    let store = SubmissionStore::new(RealFileSystem, &store_path);
    let notifier = VerificationLog::new(
        RealFileSystem,
        sibling_path(&store_path, DEFAULT_VERIFICATIONS_FILE),
    );
    let mut orchestrator = Orchestrator::new(config, store, EndpointConnector, notifier);

    match args.command {
        Command::Submit {
            queue,
            params,
            wes,
            now,
            attachments,
        } => {
            let data: Value = serde_json::from_str(&params)
                .with_context(|| format!("parsing --params as JSON: {params}"))?;
            if now {
                let run_log = orchestrator
                    .run_job(&queue, wes.as_deref(), data, &attachments, false)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&run_log)?);
            } else {
                let submission_id = orchestrator.create_submission(&queue, data, wes.as_deref())?;
                println!("{submission_id}");
            }
        }
        Command::Run {
            queue,
            submission,
            wes,
        } => {
            let run_log = orchestrator
                .run_submission(&queue, &submission, wes.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&run_log)?);
        }
        Command::RunQueue { queue, wes } => {
            let queue_log = orchestrator.run_queue(&queue, wes.as_deref()).await?;
            print_queue_log(&queue, &queue_log);
        }
        Command::RunAll => {
            let log = orchestrator.run_all().await?;
            print_orchestrator_log(&log);
        }
        Command::Status { queue, all } => {
            print_status(&orchestrator, queue.as_deref(), all)?;
        }
        Command::Monitor { interval } => {
            let (stop_tx, stop_rx) = watch::channel(false);

            // Ctrl-C → graceful shutdown.
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    eprintln!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                let _ = stop_tx.send(true);
            });

            let mut stdout = std::io::stdout();
            orchestrator
                .monitor(Duration::from_secs(interval), stop_rx, &mut stdout)
                .await?;
        }
        Command::Cancel { queue, submission } => {
            let ack = orchestrator.cancel_submission(&queue, &submission).await?;
            println!("{}", serde_json::to_string_pretty(&ack)?);
        }
        Command::Services => {
            let report = orchestrator.poll_services().await?;
            print_reachability("toolregistries", &report.toolregistries);
            print_reachability("workflowservices", &report.workflowservices);
        }
        Command::Check { queue, wes } => {
            let queue_log = orchestrator.check_workflow(&queue, &wes).await?;
            print_queue_log(&checker_queue_id(&queue), &queue_log);
        }
        Command::CheckAll { queues } => {
            let mut matrix = check_matrix(&orchestrator.config().load()?);
            if !queues.is_empty() {
                matrix.retain(|queue_id, _| queues.contains(queue_id));
            }
            let log = orchestrator.check_all(&matrix).await?;
            for (queue_id, by_service) in &log {
                for (wes_id, queue_log) in by_service {
                    print_queue_log(&format!("{queue_id} on {wes_id}"), queue_log);
                }
            }
        }
        Command::Config(command) => {
            run_config_command(orchestrator.config(), command)?;
        }
    }

    Ok(())
}

fn run_config_command(config: &ConfigStore<RealFileSystem>, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            print!("{}", config.show()?);
        }
        ConfigCommand::AddQueue(args) => {
            let queue_id = args.queue.clone();
            config.add_queue(&queue_id, queue_from_args(args))?;
            info!(queue = %queue_id, "queue added");
        }
        ConfigCommand::AddService(args) => {
            let wes_id = args.id.clone();
            config.add_workflow_service(&wes_id, endpoint_from_args(args))?;
        }
        ConfigCommand::AddRegistry(args) => {
            let trs_id = args.id.clone();
            config.add_tool_registry(&trs_id, endpoint_from_args(args))?;
        }
        ConfigCommand::AddWesOpt {
            wes_id,
            queues,
            default,
        } => {
            config.add_wes_opt(&queues, &wes_id, default)?;
        }
    }
    Ok(())
}

fn queue_from_args(args: AddQueueArgs) -> QueueConfig {
    QueueConfig {
        workflow_type: args.workflow_type,
        trs_id: args.trs_id,
        workflow_id: args.workflow_id,
        version_id: args.version_id,
        workflow_url: args.workflow_url,
        workflow_attachments: args.attachments,
        wes_default: args.wes_default,
        wes_opts: args.wes_opts,
        target_queue: args.target_queue,
    }
}

fn endpoint_from_args(args: EndpointArgs) -> ServiceEndpoint {
    let mut endpoint = ServiceEndpoint::new(args.host, args.proto.into());
    endpoint.auth = args.auth;
    endpoint.client = args.client.into();
    endpoint
}

/// Put `file_name` in the same directory as `path`.
fn sibling_path(path: &Path, file_name: &str) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file_name),
        _ => PathBuf::from(file_name),
    }
}

fn print_status(
    orchestrator: &Orchestrator<RealFileSystem>,
    queue: Option<&str>,
    all: bool,
) -> Result<()> {
    let filter = if all {
        StatusFilter::all()
    } else {
        StatusFilter::default()
    };
    let store = orchestrator.store();
    let queue_ids = match queue {
        Some(queue_id) => vec![queue_id.to_string()],
        None => store.queue_ids()?,
    };

    for queue_id in queue_ids {
        println!("{queue_id}:");
        for submission_id in store.list(&queue_id, &filter)? {
            let submission = store.get(&queue_id, &submission_id)?;
            let run_id = submission
                .run_log
                .as_ref()
                .map(|log| log.run_id.as_str())
                .unwrap_or("-");
            println!(
                "  {submission_id}  {:<14}  {:<10}  {run_id}",
                submission.status,
                submission.wes_id.as_deref().unwrap_or("-"),
            );
        }
    }
    Ok(())
}

fn print_reachability(section: &str, services: &IndexMap<String, bool>) {
    println!("{section}:");
    for (id, reachable) in services {
        let state = if *reachable { "ok" } else { "unreachable" };
        println!("  {id}: {state}");
    }
}

fn print_queue_log(queue_id: &str, queue_log: &QueueLog) {
    println!("{queue_id}:");
    for (submission_id, run_log) in queue_log {
        println!(
            "  {submission_id}  {}  {}  {}",
            run_log.wes_id.as_deref().unwrap_or("-"),
            run_log.run_id,
            run_log.state
        );
    }
}

fn print_orchestrator_log(log: &OrchestratorLog) {
    for (queue_id, queue_log) in log {
        print_queue_log(queue_id, queue_log);
    }
}
