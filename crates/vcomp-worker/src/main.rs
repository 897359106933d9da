//! Composition worker binary.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use schemars::schema_for;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vcomp_media::{check_ffmpeg, check_ffprobe};
use vcomp_models::RawRequest;
use vcomp_worker::{JobExecutor, RenderRecord, WorkerConfig, WorkerError};

#[derive(Debug, Parser)]
#[command(name = "vcomp-worker", version, about = "Plan and render video compositions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Plan a request and print the composition as JSON
    Plan {
        /// Request JSON file
        request: PathBuf,
        /// Include the ffmpeg argv for this output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Plan a request, render it and write `<output>.result.json`
    Render {
        /// Request JSON file
        request: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Check that ffmpeg and ffprobe are installed
    Check,
    /// Print the JSON Schemas of the request file and the result record
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Err(e) = run(cli.command, config).await {
        error!(kind = e.kind(), retryable = e.is_retryable(), "Job failed: {}", e);
        std::process::exit(e.exit_code());
    }
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vcomp=info".parse().context("invalid log directive")?);

    // Logs go to stderr so stdout stays valid JSON
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

async fn run(command: Command, config: WorkerConfig) -> Result<(), WorkerError> {
    match command {
        Command::Plan { request, output } => {
            let executor = JobExecutor::new(config)?;
            let report = executor.plan_file(&request, output.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Render { request, output } => {
            let executor = JobExecutor::new(config)?;
            let record = tokio::select! {
                result = executor.render_file(&request, &output) => result?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    executor.shutdown();
                    return Err(WorkerError::from(vcomp_media::MediaError::Cancelled));
                }
            };
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Check => {
            let ffmpeg = check_ffmpeg()?;
            let ffprobe = check_ffprobe()?;
            info!(ffmpeg = %ffmpeg.display(), ffprobe = %ffprobe.display(), "Engine binaries found");
        }
        Command::Schema => {
            let schemas = serde_json::json!({
                "request": schema_for!(RawRequest),
                "result": schema_for!(RenderRecord),
            });
            println!("{}", serde_json::to_string_pretty(&schemas)?);
        }
    }
    Ok(())
}
