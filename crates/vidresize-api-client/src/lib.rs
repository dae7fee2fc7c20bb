//! HTTP client for the resize API.
//!
//! Provides a minimal client over the processing endpoints (pre-signed URL,
//! resize, job status), the raw pre-signed upload and result download, and a
//! bounded polling combinator. The CLI workflow drives everything through the
//! [`ResizeApi`] trait so it can be exercised without a network.

pub mod api;
pub mod poll;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use vidresize_core::{ResizerConfig, WorkflowError, WorkflowResult};

pub use api::ResizeApi;
pub use poll::{poll_until, wait_for_job, Clock, PollError, PollPolicy, Polled, TokioClock};

/// HTTP client for one API deployment.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ResizerConfig) -> Result<Self> {
        Self::new(config.api_base_url.clone(), config.http_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build an endpoint URL with percent-encoded query parameters.
    pub fn build_url_with_query(&self, path: &str, query: &[(&str, &str)]) -> String {
        let mut url = self.build_url(path);
        for (i, (key, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&urlencoding::encode(key));
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// GET an endpoint and deserialize its JSON response.
    ///
    /// `refused` turns a non-success status and its body text into the caller's error.
    pub async fn get<T, R>(&self, path: &str, query: &[(&str, &str)], refused: R) -> WorkflowResult<T>
    where
        T: DeserializeOwned,
        R: FnOnce(u16, String) -> WorkflowError,
    {
        let url = self.build_url_with_query(path, query);
        let response = self.client.get(&url).send().await.map_err(transport)?;
        read_json(response, refused).await
    }

    /// POST a JSON body and deserialize the JSON response.
    pub async fn post_json<T, B, R>(&self, path: &str, body: &B, refused: R) -> WorkflowResult<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
        R: FnOnce(u16, String) -> WorkflowError,
    {
        let url = self.build_url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        read_json(response, refused).await
    }

    /// Raw client for requests to absolute URLs (pre-signed upload, result download).
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Check the status, then decode the body as JSON.
async fn read_json<T, R>(response: Response, refused: R) -> WorkflowResult<T>
where
    T: DeserializeOwned,
    R: FnOnce(u16, String) -> WorkflowError,
{
    let response = ensure_success(response, refused).await?;
    response.json().await.map_err(|e| {
        WorkflowError::Network(format!("Failed to parse response as JSON: {}", describe(e)))
    })
}

pub(crate) async fn ensure_success<R>(response: Response, refused: R) -> WorkflowResult<Response>
where
    R: FnOnce(u16, String) -> WorkflowError,
{
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::warn!(
        status = status.as_u16(),
        body = %error_text,
        "API request failed"
    );
    Err(refused(status.as_u16(), error_text))
}

pub(crate) fn transport(err: reqwest::Error) -> WorkflowError {
    WorkflowError::Network(format!("Failed to send request: {}", describe(err)))
}

/// Render a reqwest error without the query string of the URL it carries.
///
/// reqwest embeds the full request URL in its message, and for pre-signed URLs
/// that includes the signature.
pub(crate) fn describe(err: reqwest::Error) -> String {
    match err.url().map(|url| redact_url(url.as_str())) {
        Some(url) => format!("{} ({})", err.without_url(), url),
        None => err.to_string(),
    }
}

/// Strip the query string (signature, credentials) from a URL before logging it.
pub fn redact_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}
