//! Command implementations
//!
//! Each command is an `impl Repository` block writing its human-readable
//! output to the repository writer, organized into two categories:
//!
//! - `plumbing`: Low-level commands for direct object access (hash-object, cat-file)
//! - `porcelain`: User-facing commands for version control workflows (add, commit, log, etc.)
//!
//! Plumbing commands provide building blocks, while porcelain commands compose
//! them into higher-level operations.

pub mod plumbing;
pub mod porcelain;
