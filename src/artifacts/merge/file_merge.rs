//! Per-file three-way resolution
//!
//! Each path is classified by comparing its blob id in the split point, in
//! ours and in theirs; a missing path is a state like any other. The rule
//! is:
//!
//! - ours and theirs agree: keep it (absent stays absent)
//! - only theirs moved away from the split: take theirs
//! - only ours moved away from the split: keep ours
//! - both moved, differently: conflict
//!
//! A conflict is written as one file holding both sides between fixed
//! markers, with empty content standing in for a deleted side.

use crate::artifacts::objects::object_id::ObjectId;
use bytes::Bytes;

pub const CONFLICT_START_MARKER: &str = "<<<<<<< HEAD\n";
pub const CONFLICT_SEPARATOR: &str = "=======\n";
pub const CONFLICT_END_MARKER: &str = ">>>>>>>\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileResolution {
    KeepOurs,
    TakeTheirs,
    Conflict,
}

impl FileResolution {
    pub fn classify(
        split: Option<&ObjectId>,
        ours: Option<&ObjectId>,
        theirs: Option<&ObjectId>,
    ) -> Self {
        if ours == theirs {
            FileResolution::KeepOurs
        } else if ours == split {
            FileResolution::TakeTheirs
        } else if theirs == split {
            FileResolution::KeepOurs
        } else {
            FileResolution::Conflict
        }
    }

    /// Blob the merged tree records, `None` meaning the path is dropped
    ///
    /// Conflicts have no blob yet; their content is built from both sides.
    pub fn resolved<'a>(
        &self,
        ours: Option<&'a ObjectId>,
        theirs: Option<&'a ObjectId>,
    ) -> Option<Option<&'a ObjectId>> {
        match self {
            FileResolution::KeepOurs => Some(ours),
            FileResolution::TakeTheirs => Some(theirs),
            FileResolution::Conflict => None,
        }
    }
}

/// Content of a conflicted file: both versions between markers
pub fn conflict_content(ours: &[u8], theirs: &[u8]) -> Bytes {
    let mut content = Vec::with_capacity(
        CONFLICT_START_MARKER.len()
            + ours.len()
            + CONFLICT_SEPARATOR.len()
            + theirs.len()
            + CONFLICT_END_MARKER.len(),
    );
    content.extend_from_slice(CONFLICT_START_MARKER.as_bytes());
    content.extend_from_slice(ours);
    content.extend_from_slice(CONFLICT_SEPARATOR.as_bytes());
    content.extend_from_slice(theirs);
    content.extend_from_slice(CONFLICT_END_MARKER.as_bytes());

    Bytes::from(content)
}
