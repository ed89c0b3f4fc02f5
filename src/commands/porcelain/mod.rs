//! Porcelain commands (user-facing operations)
//!
//! Porcelain commands provide the high-level user interface for version control.
//! They compose the areas and artifacts into the workflows a user types.
//!
//! ## Commands
//!
//! - `init`: Initialize a new repository
//! - `add` / `rm`: Stage additions and removals
//! - `commit`: Create a new commit
//! - `status`: Show branches, staging and working tree state
//! - `log` / `global-log` / `find`: Show and search commit history
//! - `branch` / `rm-branch`: Create or delete branches
//! - `checkout` / `reset`: Switch branches, restore files or move HEAD
//! - `merge`: Merge another branch into the current one

pub mod add;
pub mod branch;
pub mod checkout;
pub mod commit;
pub mod init;
pub mod log;
pub mod merge;
pub mod rm;
pub mod status;
