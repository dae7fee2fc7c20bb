//! Error types module
//!
//! Every failure a submission can hit is a `WorkflowError` variant. Remote
//! refusals carry the server-provided body text so it can be shown to the user.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for refusals reported by a remote endpoint
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Failed to get pre-signed URL: {0}")]
    Credential(String),

    #[error("Failed to upload file: {status} - {body}")]
    Upload { status: u16, body: String },

    #[error("Failed to process video: {0}")]
    Submission(String),

    #[error("Failed to check job status: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Video processing failed: {0}")]
    Processing(String),

    #[error("Timeout waiting for video processing after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("Failed to download result: {0}")]
    Download(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    /// Machine-readable error code (e.g., "CREDENTIAL_ERROR")
    pub fn error_code(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "VALIDATION_ERROR",
            WorkflowError::Credential(_) => "CREDENTIAL_ERROR",
            WorkflowError::Upload { .. } => "UPLOAD_ERROR",
            WorkflowError::Submission(_) => "SUBMISSION_ERROR",
            WorkflowError::Status { .. } => "STATUS_ERROR",
            WorkflowError::Processing(_) => "PROCESSING_ERROR",
            WorkflowError::Timeout { .. } => "TIMEOUT_ERROR",
            WorkflowError::Download(_) => "DOWNLOAD_ERROR",
            WorkflowError::Network(_) => "NETWORK_ERROR",
            WorkflowError::Config(_) => "CONFIG_ERROR",
            WorkflowError::Io(_) => "IO_ERROR",
        }
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        match self {
            WorkflowError::Validation(_) => LogLevel::Debug,
            WorkflowError::Credential(_)
            | WorkflowError::Upload { .. }
            | WorkflowError::Submission(_)
            | WorkflowError::Status { .. }
            | WorkflowError::Processing(_)
            | WorkflowError::Timeout { .. } => LogLevel::Warn,
            WorkflowError::Download(_)
            | WorkflowError::Network(_)
            | WorkflowError::Config(_)
            | WorkflowError::Io(_) => LogLevel::Error,
        }
    }

    /// True when the error was detected locally, before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(self, WorkflowError::Validation(_) | WorkflowError::Config(_))
    }
}
