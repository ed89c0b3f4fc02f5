//! Working tree status inspection
//!
//! Compares the working directory against the staging area and the HEAD
//! commit's tree.
//!
//! ## Components
//!
//! - `file_change`: How an unstaged working file differs from what is tracked
//! - `status_info`: The full report, one sorted set per section

pub mod file_change;
pub mod status_info;
