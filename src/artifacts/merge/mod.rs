//! Three-way merge
//!
//! - `bca_finder`: merge-base (split point) search
//! - `file_merge`: per-path resolution against the split point
//! - `merge_engine`: preconditions, planning and commit of a branch merge

pub mod bca_finder;
pub mod file_merge;
pub mod merge_engine;
