use crate::artifacts::objects::object_id::ObjectId;

pub const ADDITION_KIND: u8 = b'A';
pub const REMOVAL_KIND: u8 = b'R';

/// Pending change for one path
///
/// A path is either staged for addition with a blob, or staged for removal,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedChange {
    Addition(ObjectId),
    Removal,
}

impl StagedChange {
    pub fn kind(&self) -> u8 {
        match self {
            StagedChange::Addition(_) => ADDITION_KIND,
            StagedChange::Removal => REMOVAL_KIND,
        }
    }

    pub fn blob_oid(&self) -> Option<&ObjectId> {
        match self {
            StagedChange::Addition(oid) => Some(oid),
            StagedChange::Removal => None,
        }
    }
}

/// What `stage_removal` did with a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The path was only staged for addition; that entry was dropped
    Unstaged,
    /// The path is tracked by HEAD and is now staged for removal; the working
    /// copy should be deleted
    StagedForRemoval,
}
