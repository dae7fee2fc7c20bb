//! Domain methods for the resize API.
//!
//! Endpoint paths are relative to the configured base URL; the pre-signed upload
//! URL and the result download URL are absolute and used as given.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::RequestBuilder;
use vidresize_core::{
    JobHandle, JobStatus, PresignedUrlResponse, ResizeJobDescriptor, WorkflowError,
    WorkflowResult,
};

use crate::{describe, ensure_success, redact_url, transport, ApiClient};

pub const PRESIGNED_URL_PATH: &str = "/presigned-url";
pub const RESIZE_PATH: &str = "/resize";
pub const JOB_STATUS_PATH: &str = "/job-status";

/// The remote operations one submission needs.
#[async_trait]
pub trait ResizeApi: Send + Sync {
    /// Ask for a short-lived write URL for `file_name` in the input bucket.
    async fn request_upload_url(&self, file_name: &str) -> WorkflowResult<String>;

    /// PUT the raw file bytes to a pre-signed URL.
    async fn upload_bytes(&self, upload_url: &str, bytes: Bytes) -> WorkflowResult<()>;

    /// Submit a resize job and return its handle.
    async fn submit_job(&self, job: &ResizeJobDescriptor) -> WorkflowResult<JobHandle>;

    /// Fetch the current status of a job once.
    async fn job_status(&self, job_id: &str) -> WorkflowResult<JobStatus>;

    /// Fetch a finished result in full.
    async fn download(&self, url: &str) -> WorkflowResult<Bytes>;
}

impl ApiClient {
    /// Build the pre-signed PUT.
    ///
    /// The URL was signed without a content type, so the header is sent explicitly
    /// empty; any other value invalidates the signature.
    pub fn upload_request(&self, upload_url: &str, bytes: Bytes) -> RequestBuilder {
        self.client()
            .put(upload_url)
            .header(CONTENT_TYPE, "")
            .body(bytes)
    }
}

#[async_trait]
impl ResizeApi for ApiClient {
    async fn request_upload_url(&self, file_name: &str) -> WorkflowResult<String> {
        let response: PresignedUrlResponse = self
            .get(PRESIGNED_URL_PATH, &[("key", file_name)], |_, body| {
                WorkflowError::Credential(body)
            })
            .await?;

        tracing::debug!(
            file_name = %file_name,
            upload_url = %redact_url(&response.url),
            "Received pre-signed upload URL"
        );
        Ok(response.url)
    }

    async fn upload_bytes(&self, upload_url: &str, bytes: Bytes) -> WorkflowResult<()> {
        let size = bytes.len();
        let response = self
            .upload_request(upload_url, bytes)
            .send()
            .await
            .map_err(transport)?;

        ensure_success(response, |status, body| WorkflowError::Upload { status, body }).await?;

        tracing::info!(
            upload_url = %redact_url(upload_url),
            size_bytes = size,
            "Uploaded file to pre-signed URL"
        );
        Ok(())
    }

    async fn submit_job(&self, job: &ResizeJobDescriptor) -> WorkflowResult<JobHandle> {
        let handle: JobHandle = self
            .post_json(RESIZE_PATH, job, |_, body| WorkflowError::Submission(body))
            .await?;

        tracing::info!(
            job_id = %handle.job_id,
            source_key = %job.key,
            output_key = %job.output_key,
            width = job.width,
            height = job.height,
            "Resize job submitted"
        );
        Ok(handle)
    }

    async fn job_status(&self, job_id: &str) -> WorkflowResult<JobStatus> {
        self.get(JOB_STATUS_PATH, &[("jobId", job_id)], |status, body| {
            WorkflowError::Status { status, body }
        })
        .await
    }

    async fn download(&self, url: &str) -> WorkflowResult<Bytes> {
        let response = self
            .client()
            .get(url)
            .send()
            .await
            .map_err(|e| WorkflowError::Download(format!("Failed to send request: {}", describe(e))))?;

        let response = ensure_success(response, |status, body| {
            WorkflowError::Download(format!("{} - {}", status, body))
        })
        .await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WorkflowError::Download(format!("Failed to read body: {}", describe(e))))?;

        tracing::info!(
            download_url = %redact_url(url),
            size_bytes = bytes.len(),
            "Downloaded result"
        );
        Ok(bytes)
    }
}
