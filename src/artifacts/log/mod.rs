//! Commit history
//!
//! - `commit_graph`: commit creation and graph queries (history, search,
//!   ancestry, merge base)
//! - `rev_list`: lazy first-parent traversal used by `log`

pub mod commit_graph;
pub mod rev_list;
