//! Working-tree migration between snapshots
//!
//! Checkout, reset and merge all move the working directory from the tree of
//! one commit to another. The move is planned against the current tree, the
//! target tree and the files on disk before anything is written, so an
//! untracked file in the way aborts the operation with nothing changed.

pub mod migration;
