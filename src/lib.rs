//! A minimal local version-control engine
//!
//! Snapshots of a working directory are stored as an immutable,
//! content-addressed commit graph under `.gitlet/`, with branches, three-way
//! merging and checkout of any earlier snapshot.
//!
//! - `areas`: on-disk state (object database, staging index, refs, workspace)
//!   and the [`areas::repository::Repository`] context tying them together
//! - `artifacts`: objects and the algorithms over them (history, merge,
//!   checkout planning, status)
//! - `commands`: one `Repository` method per command-line operation
//! - `errors`: the recoverable error kinds

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;
