use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use bizreport::config::default_config_path;
use bizreport::generator::{ContentGenerator, HttpGenerator};
use bizreport::pipeline::{Pipeline, PipelineConfig};
use bizreport::secrets::{expand_home, resolve_secret};
use bizreport::telemetry::{init_logging, LogFormat};
use bizreport::worker::{JobPoller, JobStateMachine, ShutdownSignal};
use bizreport::{load_config, ConfigError, Database, JobProgressBroadcaster};

#[derive(Parser)]
#[command(name = "bizreport-worker")]
#[command(about = "Turns queued assessment submissions into HTML reports")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.bizreport/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_format) {
        eprintln!("bizreport-worker: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Worker exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> bizreport::Result<()> {
    let config_path = cli
        .config
        .or_else(default_config_path)
        .ok_or_else(|| ConfigError::Validation {
            message: "No --config given and no home directory to look in".to_string(),
        })?;
    let config = load_config(&config_path)?;
    tracing::info!(
        config = %bizreport::sanitize::redact_path(&config_path),
        pipeline = %config.pipeline,
        "Configuration loaded"
    );

    let db = Database::open(Path::new(&expand_home(&config.database_path)))?;

    let api_key = resolve_secret(
        config.generator.api_key.as_deref(),
        config.generator.api_key_file.as_deref(),
        config.generator.api_key_env.as_deref(),
    )?;
    let generator: Arc<dyn ContentGenerator> =
        Arc::new(HttpGenerator::new(&config.generator, api_key)?);

    let shutdown = ShutdownSignal::new();
    shutdown.install_handler()?;

    let state = JobStateMachine::new(db.clone());
    let abandoned = state.fail_abandoned(Duration::from_secs(config.claim_timeout_secs))?;
    if !abandoned.is_empty() {
        tracing::warn!(
            count = abandoned.len(),
            jobs = ?abandoned,
            "Failed jobs left processing by a previous worker"
        );
    }

    let pipeline = Arc::new(Pipeline::from_config(
        Arc::new(PipelineConfig::from_config(&config)),
        db,
        generator,
        shutdown.clone(),
    ));

    let broadcaster = JobProgressBroadcaster::default();
    let mut progress_rx = broadcaster.subscribe();
    tokio::spawn(async move {
        loop {
            match progress_rx.recv().await {
                Ok(event) => tracing::info!(
                    job_id = %event.job_id,
                    status = %event.status,
                    progress = event.progress,
                    stage = event.current_stage.as_deref().unwrap_or("-"),
                    "Job progress"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Progress log fell behind")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let poller = JobPoller::new(
        state,
        pipeline,
        Duration::from_secs(config.poll_interval_secs),
        shutdown,
    )
    .with_broadcaster(broadcaster);

    if cli.once {
        let outcome = poller.poll_once().await?;
        tracing::info!(outcome = ?outcome, "Single poll cycle finished");
    } else {
        poller.run().await;
    }

    Ok(())
}
