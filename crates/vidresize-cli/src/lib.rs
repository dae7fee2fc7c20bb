//! vidresize command-line workflow: progress display, the upload/resize/download
//! state machine and result saving.

pub mod output;
pub mod progress;
pub mod workflow;

pub use progress::{BarSink, LogSink, MemorySink, ProgressReporter, ProgressSink, ProgressState};
pub use workflow::{FormInput, UploadWorkflow, WorkflowOutcome, WorkflowSettings, WorkflowStage};

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
