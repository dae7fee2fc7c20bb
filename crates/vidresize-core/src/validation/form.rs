//! Form input validation
//!
//! Checks run before any network call. Width and height arrive as raw text
//! (as typed by the user) and must parse to strictly positive integers.

use crate::error::{WorkflowError, WorkflowResult};

/// Largest accepted width or height in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// Parse a width/height field.
///
/// Missing, blank, non-numeric, zero, negative and oversized values are all rejected
/// with the same user-facing message.
pub fn parse_dimension(field: &str, raw: Option<&str>) -> WorkflowResult<u32> {
    let invalid = || {
        WorkflowError::Validation(format!(
            "Please enter valid width and height values ({} was {})",
            field,
            raw.map(|r| format!("'{}'", r))
                .unwrap_or_else(|| "missing".to_string())
        ))
    };

    let trimmed = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let value: i64 = trimmed.parse().map_err(|_| invalid())?;

    if value <= 0 || value > i64::from(MAX_DIMENSION) {
        return Err(invalid());
    }

    Ok(value as u32)
}

/// Require that a file was selected and has content.
pub fn require_file<'a>(file_name: Option<&'a str>, file_bytes: &[u8]) -> WorkflowResult<&'a str> {
    let name = file_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| WorkflowError::Validation("Please select a file".to_string()))?;

    if file_bytes.is_empty() {
        return Err(WorkflowError::Validation(format!(
            "Selected file is empty: {}",
            name
        )));
    }

    Ok(name)
}
