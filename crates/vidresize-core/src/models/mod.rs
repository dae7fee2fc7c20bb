//! Data models for a single submission
//!
//! Everything here is transient: built for one upload, dropped when it finishes.

mod job;
mod upload;

pub use job::*;
pub use upload::*;
