//! Core repository components
//!
//! This module contains the on-disk building blocks of a repository:
//!
//! - `database`: Object database for storing blobs, trees, and commits
//! - `index`: Staging area recording pending additions and removals
//! - `refs`: Reference management (branches and HEAD)
//! - `repository`: The repository context every operation runs against
//! - `workspace`: Working directory file system operations

pub mod database;
pub mod index;
pub mod refs;
pub mod repository;
pub mod workspace;
