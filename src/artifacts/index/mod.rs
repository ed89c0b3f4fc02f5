//! Staging index file format
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "GLIX" (4 bytes)
//!   - Version: 1 (4 bytes, big-endian)
//!   - Entry count (4 bytes, big-endian)
//!
//! Entries (variable length, sorted by path):
//!   - Kind: b'A' (addition) or b'R' (removal)
//!   - Blob id: 20 bytes, additions only
//!   - Path: UTF-8, NUL-terminated
//!
//! Checksum (20 bytes):
//!   - SHA-1 hash of all preceding bytes
//! ```

pub mod checksum;
pub mod index_header;
pub mod staged_change;

/// Size of SHA-1 checksum in bytes
pub const CHECKSUM_SIZE: usize = 20;

/// Size of index header in bytes
pub const HEADER_SIZE: usize = 12;

/// Magic signature identifying index files
pub const SIGNATURE: &str = "GLIX";

/// Index file format version
pub const VERSION: u32 = 1;
