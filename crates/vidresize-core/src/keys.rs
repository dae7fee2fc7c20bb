//! Object key convention for resized output.
//!
//! Key format: `resized-{filename}`, written to the output bucket.

pub const OUTPUT_KEY_PREFIX: &str = "resized-";

/// Generate the destination key (and suggested local file name) for a source file.
pub fn output_key(file_name: &str) -> String {
    format!("{}{}", OUTPUT_KEY_PREFIX, file_name)
}
