//! Minimal task for checking that a host speaks the task protocol.

use clap::Parser;
use ivis_config::ConfigLoader;
use ivis_logging::init_logging;
use ivis_task::{block_on_task, exit_code, run_task};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ivis-task-probe", version, about = "Smoke-test task for an IVIS host")]
struct Cli {
    /// YAML configuration file; IVIS_* environment variables apply on top
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store the received parameters back as task state
    #[arg(long)]
    checkpoint: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ConfigLoader::new().load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ivis-task-probe: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("ivis-task-probe: failed to initialize logging: {}", e);
    }

    let checkpoint = cli.checkpoint;
    let task = run_task(&config, |session| async move {
        let resumed = session.prior_state().is_some();
        info!(resumed, "Probe task started");

        if checkpoint {
            let ack = session
                .store_state(&json!({
                    "probe": {"params": session.parameters(), "resumed": resumed}
                }))
                .await?;
            info!(%ack, "State stored");
        }

        Ok(())
    });

    match block_on_task(task) {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            error!(error = %e, "Probe task failed");
            ExitCode::from(exit_code(&e))
        }
        Err(e) => {
            error!(error = %e, "Failed to start async runtime");
            ExitCode::FAILURE
        }
    }
}
