//! Plumbing commands (low-level object access)
//!
//! Plumbing commands provide direct access to the object database. They're
//! primarily used for scripting and debugging.
//!
//! ## Commands
//!
//! - `hash-object`: Compute a blob ID and optionally store it in the database
//! - `cat-file`: Print the content of a stored object

pub mod cat_file;
pub mod hash_object;
