//! vidresize core library
//!
//! Domain models, validation, error taxonomy and configuration shared by the
//! API client and the command-line workflow.

pub mod config;
pub mod error;
pub mod keys;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::ResizerConfig;
pub use error::{LogLevel, WorkflowError, WorkflowResult};
pub use keys::{output_key, OUTPUT_KEY_PREFIX};
pub use models::{
    JobHandle, JobState, JobStatus, PresignedUrlResponse, ResizeJobDescriptor, UploadRequest,
};
