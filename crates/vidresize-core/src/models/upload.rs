use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowResult;
use crate::keys::output_key;
use crate::validation::{parse_dimension, require_file};

/// A validated upload: a named, non-empty file plus the target dimensions.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    file_name: String,
    file_bytes: Bytes,
    width: u32,
    height: u32,
}

impl UploadRequest {
    /// Validate raw form input. Fails before anything is sent anywhere.
    pub fn from_form(
        file_name: Option<&str>,
        file_bytes: impl Into<Bytes>,
        width: Option<&str>,
        height: Option<&str>,
    ) -> WorkflowResult<Self> {
        let file_bytes = file_bytes.into();
        let file_name = require_file(file_name, &file_bytes)?.to_string();
        let width = parse_dimension("width", width)?;
        let height = parse_dimension("height", height)?;

        Ok(Self {
            file_name,
            file_bytes,
            width,
            height,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Cheap clone of the file content (reference counted).
    pub fn file_bytes(&self) -> Bytes {
        self.file_bytes.clone()
    }

    pub fn size(&self) -> usize {
        self.file_bytes.len()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Local file name for the downloaded result.
    pub fn result_file_name(&self) -> String {
        output_key(&self.file_name)
    }
}

/// Response of `GET /presigned-url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedUrlResponse {
    pub url: String,
}

/// Body of `POST /resize`. Field names are the processing endpoint's wire names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeJobDescriptor {
    pub bucket: String,
    pub key: String,
    pub output_bucket: String,
    pub output_key: String,
    pub width: u32,
    pub height: u32,
}

impl ResizeJobDescriptor {
    pub fn new(request: &UploadRequest, input_bucket: &str, output_bucket: &str) -> Self {
        Self {
            bucket: input_bucket.to_string(),
            key: request.file_name().to_string(),
            output_bucket: output_bucket.to_string(),
            output_key: output_key(request.file_name()),
            width: request.width(),
            height: request.height(),
        }
    }
}
