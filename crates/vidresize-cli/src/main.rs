//! vidresize CLI: upload a video, have it resized remotely, download the result.
//!
//! Set VIDRESIZE_API_ID (or VIDRESIZE_API_URL), VIDRESIZE_INPUT_BUCKET and
//! VIDRESIZE_OUTPUT_BUCKET. A `.env` file in the working directory is honoured.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use vidresize_api_client::{ApiClient, ResizeApi};
use vidresize_cli::{
    init_tracing, BarSink, FormInput, LogSink, ProgressReporter, UploadWorkflow, WorkflowSettings,
};
use vidresize_core::ResizerConfig;

#[derive(Parser)]
#[command(name = "vidresize", about = "Resize videos through the resize API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a video, wait for the resize job and download the result
    Resize {
        /// Path to the video file
        file: Option<PathBuf>,
        /// Target width in pixels
        #[arg(long, allow_hyphen_values = true)]
        width: Option<String>,
        /// Target height in pixels
        #[arg(long, allow_hyphen_values = true)]
        height: Option<String>,
        /// Directory for the resized file (defaults to VIDRESIZE_OUTPUT_DIR or ".")
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Print progress as log lines instead of a progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Check the status of a submitted job once
    Status {
        /// Job ID returned when the job was submitted
        job_id: String,
    },
    /// Print the effective configuration
    Config,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let config = ResizerConfig::from_env().context(
        "Invalid configuration. Set VIDRESIZE_API_ID (or VIDRESIZE_API_URL), \
         VIDRESIZE_INPUT_BUCKET and VIDRESIZE_OUTPUT_BUCKET",
    )?;

    match cli.command {
        Commands::Resize {
            file,
            width,
            height,
            output_dir,
            no_progress,
        } => {
            let client = ApiClient::from_config(&config)?;

            let mut settings = WorkflowSettings::from_config(&config);
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }

            let progress = if no_progress || !std::io::stderr().is_terminal() {
                ProgressReporter::new(LogSink)
            } else {
                ProgressReporter::new(BarSink::new())
            };

            let mut workflow = UploadWorkflow::new(Arc::new(client), settings, progress);
            let result = workflow
                .submit(FormInput {
                    file,
                    width,
                    height,
                })
                .await;
            workflow.progress().finish();

            print_json(&result?)?;
        }
        Commands::Status { job_id } => {
            let client = ApiClient::from_config(&config)?;
            let status = client.job_status(&job_id).await?;
            print_json(&status)?;
        }
        Commands::Config => {
            print_json(&config)?;
        }
    }

    Ok(())
}
