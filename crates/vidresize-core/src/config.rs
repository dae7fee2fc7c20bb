//! Configuration module
//!
//! Deployment settings (API host, bucket names, polling policy) are read once at
//! startup and validated before any submission runs.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const API_REGION: &str = "us-east-1";
const API_STAGE: &str = "production";
const POLL_INTERVAL_MS: u64 = 5000;
const POLL_MAX_ATTEMPTS: u32 = 30;
const FINISH_DELAY_MS: u64 = 2000;

/// Client configuration.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ResizerConfig {
    /// Base URL the endpoint paths are appended to, without trailing slash.
    pub api_base_url: String,
    pub input_bucket: String,
    pub output_bucket: String,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    /// Cosmetic pause before the final "all done" message.
    pub finish_delay_ms: u64,
    /// Per-request timeout. `None` leaves the HTTP client default in place.
    pub http_timeout_secs: Option<u64>,
    pub output_dir: PathBuf,
}

impl ResizerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (the process environment, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_base_url = match get("VIDRESIZE_API_URL") {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let api_id = get("VIDRESIZE_API_ID").ok_or_else(|| {
                    anyhow::anyhow!("VIDRESIZE_API_ID or VIDRESIZE_API_URL must be set")
                })?;
                let region = get("VIDRESIZE_API_REGION").unwrap_or_else(|| API_REGION.to_string());
                let stage = get("VIDRESIZE_API_STAGE").unwrap_or_else(|| API_STAGE.to_string());
                gateway_base_url(&api_id, &region, &stage)
            }
        };

        let input_bucket = get("VIDRESIZE_INPUT_BUCKET")
            .ok_or_else(|| anyhow::anyhow!("VIDRESIZE_INPUT_BUCKET must be set"))?;
        let output_bucket = get("VIDRESIZE_OUTPUT_BUCKET")
            .ok_or_else(|| anyhow::anyhow!("VIDRESIZE_OUTPUT_BUCKET must be set"))?;

        let poll_interval_ms = match get("VIDRESIZE_POLL_INTERVAL_MS") {
            Some(v) => v.parse().map_err(|_| {
                anyhow::anyhow!("VIDRESIZE_POLL_INTERVAL_MS must be a valid number")
            })?,
            None => POLL_INTERVAL_MS,
        };
        let poll_max_attempts = match get("VIDRESIZE_POLL_MAX_ATTEMPTS") {
            Some(v) => v.parse().map_err(|_| {
                anyhow::anyhow!("VIDRESIZE_POLL_MAX_ATTEMPTS must be a valid number")
            })?,
            None => POLL_MAX_ATTEMPTS,
        };
        let finish_delay_ms = match get("VIDRESIZE_FINISH_DELAY_MS") {
            Some(v) => v.parse().map_err(|_| {
                anyhow::anyhow!("VIDRESIZE_FINISH_DELAY_MS must be a valid number")
            })?,
            None => FINISH_DELAY_MS,
        };
        let http_timeout_secs = get("VIDRESIZE_HTTP_TIMEOUT_SECS")
            .map(|v| {
                v.parse().map_err(|_| {
                    anyhow::anyhow!("VIDRESIZE_HTTP_TIMEOUT_SECS must be a valid number")
                })
            })
            .transpose()?;

        let output_dir = get("VIDRESIZE_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let config = Self {
            api_base_url,
            input_bucket,
            output_bucket,
            poll_interval_ms,
            poll_max_attempts,
            finish_delay_ms,
            http_timeout_secs,
            output_dir,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.api_base_url.starts_with("https://") || self.api_base_url.starts_with("http://"))
        {
            return Err(anyhow::anyhow!(
                "API base URL must start with http:// or https:// (got '{}')",
                self.api_base_url
            ));
        }

        if self.input_bucket.trim().is_empty() || self.output_bucket.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "Input and output bucket names must not be empty"
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!(
                "VIDRESIZE_POLL_INTERVAL_MS must be greater than 0"
            ));
        }

        if self.poll_max_attempts == 0 {
            return Err(anyhow::anyhow!(
                "VIDRESIZE_POLL_MAX_ATTEMPTS must be greater than 0"
            ));
        }

        if self.http_timeout_secs == Some(0) {
            return Err(anyhow::anyhow!(
                "VIDRESIZE_HTTP_TIMEOUT_SECS must be greater than 0 when set"
            ));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn finish_delay(&self) -> Duration {
        Duration::from_millis(self.finish_delay_ms)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}

/// Base URL of an API Gateway stage.
pub fn gateway_base_url(api_id: &str, region: &str, stage: &str) -> String {
    format!(
        "https://{}.execute-api.{}.amazonaws.com/{}",
        api_id,
        region,
        stage.trim_matches('/')
    )
}
