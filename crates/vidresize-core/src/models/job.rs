use serde::{Deserialize, Serialize};

/// Handle for a submitted resize job. The id only means something to the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    #[serde(rename = "jobId")]
    pub job_id: String,
    /// Free-form confirmation text some deployments include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Job state as reported by the status endpoint.
///
/// The processor reports its own intermediate states (`SUBMITTED`, `PROGRESSING`, ...);
/// anything that is not terminal decodes as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Complete,
    Error,
    Canceled,
    #[serde(other)]
    Pending,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Pending)
    }
}

/// One decoded status poll. Discarded after it has been inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: JobState,
    #[serde(
        rename = "downloadUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub download_url: Option<String>,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
