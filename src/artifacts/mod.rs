//! Data structures and algorithms
//!
//! This module contains the core types and algorithms:
//!
//! - `branch`: Branch names and revision parsing
//! - `checkout`: Working-directory migration planning
//! - `index`: Staging area file format pieces
//! - `log`: Commit creation and history traversal
//! - `merge`: Merge-base search and three-way merge
//! - `objects`: Object types (blob, tree, commit)
//! - `status`: Working tree status inspection

pub mod branch;
pub mod checkout;
pub mod index;
pub mod log;
pub mod merge;
pub mod objects;
pub mod status;
