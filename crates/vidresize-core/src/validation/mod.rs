//! Validation modules

pub mod form;

pub use form::{parse_dimension, require_file, MAX_DIMENSION};
