//! Branch names and revision expressions

pub mod branch_name;
pub mod revision;

/// Characters and sequences that may not appear in a branch name
pub const INVALID_BRANCH_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";
pub const PARENT_REGEX: &str = r"^(.+)\^$";
pub const ANCESTOR_REGEX: &str = r"^(.+)\~(\d+)$";

/// Branch HEAD points at in a fresh repository
pub const DEFAULT_BRANCH: &str = "main";

/// Alias resolving to whatever HEAD points at
pub const HEAD_ALIAS: &str = "HEAD";
