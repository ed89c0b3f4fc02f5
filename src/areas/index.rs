//! Staging area
//!
//! The index records pending changes relative to the HEAD commit: paths
//! staged for addition (with the blob to commit) and paths staged for
//! removal. It only ever holds net changes: staging content identical to
//! what HEAD already tracks drops the entry instead.
//!
//! The index is session-scoped state persisted in `.gitlet/index`; it is
//! cleared by a successful commit and by checkouts that replace the working
//! tree.

use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::staged_change::{
    ADDITION_KIND, REMOVAL_KIND, RemovalOutcome, StagedChange,
};
use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use anyhow::{Context, anyhow};
use std::collections::BTreeMap;
use std::io::Read;
use std::ops::DerefMut;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Index {
    /// Path to the index file (typically `.gitlet/index`)
    path: Box<Path>,
    entries: BTreeMap<String, StagedChange>,
    header: IndexHeader,
    /// Set when entries changed since the last load or write
    changed: bool,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            header: IndexHeader::new(String::from(SIGNATURE), VERSION, 0),
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Stage `path` for addition with the given blob
    ///
    /// Overwrites any previous entry for the path. When `tracked` (the blob
    /// HEAD records for this path) equals `blob_oid`, the entry is dropped
    /// instead, since committing it would change nothing.
    pub fn stage_addition(&mut self, path: &str, blob_oid: ObjectId, tracked: Option<&ObjectId>) {
        if tracked == Some(&blob_oid) {
            debug!(path, "content matches HEAD, unstaging");
            self.entries.remove(path);
        } else {
            debug!(path, oid = %blob_oid, "staged for addition");
            self.entries
                .insert(path.to_string(), StagedChange::Addition(blob_oid));
        }

        self.changed = true;
    }

    /// Stage `path` for removal
    ///
    /// `tracked` tells whether HEAD tracks the path. A path that is neither
    /// tracked nor staged for addition cannot be removed.
    pub fn stage_removal(&mut self, path: &str, tracked: bool) -> anyhow::Result<RemovalOutcome> {
        let staged_for_addition = matches!(self.entries.get(path), Some(StagedChange::Addition(_)));

        if tracked {
            debug!(path, "staged for removal");
            self.entries.insert(path.to_string(), StagedChange::Removal);
            self.changed = true;

            Ok(RemovalOutcome::StagedForRemoval)
        } else if staged_for_addition {
            debug!(path, "addition unstaged");
            self.entries.remove(path);
            self.changed = true;

            Ok(RemovalOutcome::Unstaged)
        } else {
            Err(RepositoryError::UntrackedFile(path.to_string()).into())
        }
    }

    /// Drop the entry for `path`, whatever it is
    pub fn unstage(&mut self, path: &str) -> Option<StagedChange> {
        let removed = self.entries.remove(path);
        if removed.is_some() {
            self.changed = true;
        }

        removed
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.changed = true;
        }
        self.entries.clear();
        self.header = IndexHeader::empty();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry_by_path(&self, path: &str) -> Option<&StagedChange> {
        self.entries.get(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &StagedChange)> {
        self.entries.iter()
    }

    pub fn additions(&self) -> impl Iterator<Item = (&String, &ObjectId)> {
        self.entries
            .iter()
            .filter_map(|(path, change)| change.blob_oid().map(|oid| (path, oid)))
    }

    pub fn removals(&self) -> impl Iterator<Item = &String> {
        self.entries
            .iter()
            .filter(|(_, change)| **change == StagedChange::Removal)
            .map(|(path, _)| path)
    }

    /// Load the index from disk
    ///
    /// A missing or empty index file is an empty staging area. Acquires a
    /// shared lock on the file while reading.
    pub fn rehydrate(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        self.header = IndexHeader::empty();
        self.changed = false;

        if !self.path().exists() {
            return Ok(());
        }

        let mut index_file = std::fs::OpenOptions::new()
            .read(true)
            .open(self.path())
            .with_context(|| format!("failed to open index at {:?}", self.path))?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)?;

        if lock.deref_mut().metadata()?.len() == 0 {
            return Ok(());
        }

        let mut reader = Checksum::new(lock.deref_mut());
        let entries_count = Self::parse_header(&mut reader)?;
        let entries = Self::parse_entries(entries_count, &mut reader)?;
        reader.verify()?;

        self.header.entries_count = entries_count;
        self.entries = entries;

        Ok(())
    }

    fn parse_header<R: Read>(reader: &mut Checksum<R>) -> anyhow::Result<u32> {
        let header_bytes = reader.read(HEADER_SIZE)?;
        let header = IndexHeader::deserialize(&header_bytes)?;

        if header.marker != SIGNATURE {
            return Err(anyhow!("Invalid index file signature"));
        }

        if header.version != VERSION {
            return Err(anyhow!(
                "Unsupported index file version: {}",
                header.version
            ));
        }

        Ok(header.entries_count)
    }

    fn parse_entries<R: Read>(
        entries_count: u32,
        reader: &mut Checksum<R>,
    ) -> anyhow::Result<BTreeMap<String, StagedChange>> {
        let mut entries = BTreeMap::new();

        for _ in 0..entries_count {
            let kind = reader.read(1)?[0];
            let change = match kind {
                ADDITION_KIND => {
                    let oid_bytes = reader.read(20)?;
                    StagedChange::Addition(ObjectId::read_h40_from(&mut oid_bytes.as_ref())?)
                }
                REMOVAL_KIND => StagedChange::Removal,
                other => return Err(anyhow!("Invalid index entry kind: {other:#04x}")),
            };

            let path_bytes = reader.read_until_nul()?;
            let path = std::str::from_utf8(&path_bytes[..path_bytes.len() - 1])
                .context("Invalid index entry path")?;

            entries.insert(path.to_string(), change);
        }

        Ok(entries)
    }

    /// Persist the index under an exclusive lock
    pub fn write_updates(&mut self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut index_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.path())
            .with_context(|| format!("failed to open index at {:?}", self.path))?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Exclusive, 0, 1)?;

        let mut writer = Checksum::new(lock.deref_mut());

        self.header = IndexHeader {
            entries_count: self.entries.len() as u32,
            ..self.header.clone()
        };
        writer.write(&self.header.serialize()?)?;

        for (path, change) in &self.entries {
            let mut entry_bytes = vec![change.kind()];
            if let StagedChange::Addition(oid) = change {
                oid.write_h40_to(&mut entry_bytes)?;
            }
            entry_bytes.extend_from_slice(path.as_bytes());
            entry_bytes.push(0);

            writer.write(&entry_bytes)?;
        }

        writer.write_checksum()?;
        self.changed = false;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::find_repository_error;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn index_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp dir")
    }

    fn index(dir: &TempDir) -> Index {
        Index::new(dir.path().join("index").into_boxed_path())
    }

    fn oid(content: &str) -> ObjectId {
        ObjectId::digest(content.as_bytes())
    }

    #[rstest]
    fn addition_overwrites_removal(index_dir: TempDir) {
        let mut index = index(&index_dir);
        let head_blob = oid("old");

        index.stage_removal("a.txt", true).unwrap();
        index.stage_addition("a.txt", oid("new"), Some(&head_blob));

        assert_eq!(
            index.entry_by_path("a.txt"),
            Some(&StagedChange::Addition(oid("new")))
        );
        assert_eq!(index.removals().count(), 0);
    }

    #[rstest]
    fn staging_content_identical_to_head_drops_the_entry(index_dir: TempDir) {
        let mut index = index(&index_dir);
        let head_blob = oid("same");

        index.stage_addition("a.txt", oid("changed"), Some(&head_blob));
        index.stage_addition("a.txt", head_blob.clone(), Some(&head_blob));

        assert!(index.is_empty());
    }

    #[rstest]
    fn removing_an_unknown_path_fails(index_dir: TempDir) {
        let mut index = index(&index_dir);

        let error = index.stage_removal("ghost.txt", false).unwrap_err();

        assert_eq!(
            find_repository_error(&error),
            Some(&RepositoryError::UntrackedFile("ghost.txt".into()))
        );
    }

    #[rstest]
    fn removing_a_staged_untracked_path_only_unstages(index_dir: TempDir) {
        let mut index = index(&index_dir);
        index.stage_addition("new.txt", oid("fresh"), None);

        let outcome = index.stage_removal("new.txt", false).unwrap();

        assert_eq!(outcome, RemovalOutcome::Unstaged);
        assert!(index.is_empty());
    }

    #[rstest]
    fn entries_survive_a_write_and_reload(index_dir: TempDir) {
        let mut index = index(&index_dir);
        index.stage_addition("dir/b.txt", oid("b"), None);
        index.stage_removal("a.txt", true).unwrap();
        index.write_updates().unwrap();

        let mut reloaded = Index::new(index.path().into());
        reloaded.rehydrate().unwrap();

        assert_eq!(
            reloaded.entries().collect::<Vec<_>>(),
            index.entries().collect::<Vec<_>>()
        );
        assert!(!reloaded.is_changed());
    }

    #[rstest]
    fn corrupted_index_fails_checksum(index_dir: TempDir) {
        let mut index = index(&index_dir);
        index.stage_addition("a.txt", oid("a"), None);
        index.write_updates().unwrap();

        let mut bytes = std::fs::read(index.path()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(index.path(), bytes).unwrap();

        assert!(Index::new(index.path().into()).rehydrate().is_err());
    }

    #[rstest]
    fn written_bytes_parse_from_any_reader(index_dir: TempDir) {
        let mut index = index(&index_dir);
        index.stage_addition("a.txt", oid("a"), None);
        index.stage_removal("b.txt", true).unwrap();
        index.write_updates().unwrap();

        let bytes = std::fs::read(index.path()).unwrap();
        let mut reader = Checksum::new(std::io::Cursor::new(bytes));
        let entries_count = Index::parse_header(&mut reader).unwrap();
        let entries = Index::parse_entries(entries_count, &mut reader).unwrap();
        reader.verify().unwrap();

        assert_eq!(entries_count, 2);
        assert_eq!(
            entries.iter().collect::<Vec<_>>(),
            index.entries().collect::<Vec<_>>()
        );
    }

    #[rstest]
    fn clear_empties_the_staging_area(index_dir: TempDir) {
        let mut index = index(&index_dir);
        index.stage_addition("a.txt", oid("a"), None);
        index.stage_removal("b.txt", true).unwrap();

        index.clear();

        assert!(index.is_empty());
        assert!(index.is_changed());
    }
}
