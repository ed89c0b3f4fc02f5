//! Stored object types and operations
//!
//! Every piece of history is stored as an immutable object identified by the
//! SHA-1 hash of its serialized form. There are three types:
//!
//! - **Blob**: File content (raw bytes)
//! - **Tree**: Flat snapshot mapping relative paths to blob ids
//! - **Commit**: Snapshot metadata (message, timestamp, parents, tree)
//!
//! All objects share the envelope `<type> <size>\0<payload>`.

pub mod blob;
pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;
