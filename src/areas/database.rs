//! Content-addressed object store
//!
//! Objects live under `.gitlet/objects/<2-hex>/<38-hex>`, zlib-compressed.
//! The store is append-only: an object is written once under the hash of its
//! serialized bytes and never rewritten or deleted.

use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::{Commit, SlimCommit};
use crate::artifacts::objects::object::{Object, ObjectBox, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::errors::RepositoryError;
use anyhow::Context;
use bytes::Bytes;
use fake::rand;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{BufRead, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Store serialized object bytes under their digest
    ///
    /// Idempotent: when an object with the same digest already exists nothing
    /// is written and the existing id is returned.
    pub fn put(&self, object_content: Bytes) -> anyhow::Result<ObjectId> {
        let oid = ObjectId::digest(&object_content);
        let object_path = self.path.join(oid.to_path());

        if object_path.exists() {
            debug!(oid = %oid, "object already stored");
            return Ok(oid);
        }

        std::fs::create_dir_all(
            object_path
                .parent()
                .context(format!("Invalid object path {}", object_path.display()))?,
        )
        .context(format!(
            "Unable to create object directory {}",
            object_path.display()
        ))?;

        self.write_object(object_path, object_content)?;
        debug!(oid = %oid, "stored object");

        Ok(oid)
    }

    /// Read the serialized bytes of an object
    pub fn get(&self, object_id: &ObjectId) -> anyhow::Result<Bytes> {
        let object_path = self.path.join(object_id.to_path());
        if !object_path.exists() {
            anyhow::bail!(RepositoryError::ObjectNotFound(object_id.to_string()));
        }

        self.read_object(object_path)
    }

    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.path.join(object_id.to_path()).is_file()
    }

    pub fn store(&self, object: &impl Object) -> anyhow::Result<ObjectId> {
        self.put(object.serialize()?)
    }

    pub fn parse_object(&self, object_id: &ObjectId) -> anyhow::Result<ObjectBox> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Blob => Ok(ObjectBox::Blob(Box::new(Blob::deserialize(object_reader)?))),
            ObjectType::Tree => Ok(ObjectBox::Tree(Box::new(Tree::deserialize(object_reader)?))),
            ObjectType::Commit => Ok(ObjectBox::Commit(Box::new(Commit::deserialize(
                object_reader,
            )?))),
        }
    }

    pub fn parse_object_as_blob(&self, object_id: &ObjectId) -> anyhow::Result<Option<Blob>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Blob => Ok(Some(Blob::deserialize(object_reader)?)),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_tree(&self, object_id: &ObjectId) -> anyhow::Result<Option<Tree>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Tree => Ok(Some(Tree::deserialize(object_reader)?)),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_commit(&self, object_id: &ObjectId) -> anyhow::Result<Option<Commit>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Commit => Ok(Some(Commit::deserialize(object_reader)?)),
            _ => Ok(None),
        }
    }

    pub fn load_blob(&self, object_id: &ObjectId) -> anyhow::Result<Blob> {
        self.parse_object_as_blob(object_id)?
            .ok_or_else(|| anyhow::anyhow!("object {object_id} is not a blob"))
    }

    pub fn load_tree(&self, object_id: &ObjectId) -> anyhow::Result<Tree> {
        self.parse_object_as_tree(object_id)?
            .ok_or_else(|| anyhow::anyhow!("object {object_id} is not a tree"))
    }

    pub fn load_commit(&self, object_id: &ObjectId) -> anyhow::Result<Commit> {
        self.parse_object_as_commit(object_id)?
            .ok_or_else(|| anyhow::anyhow!("object {object_id} is not a commit"))
    }

    /// Tree snapshot of a commit; `None` stands for the empty tree
    pub fn load_commit_tree(&self, commit_id: Option<&ObjectId>) -> anyhow::Result<Tree> {
        match commit_id {
            Some(commit_id) => {
                let commit = self.load_commit(commit_id)?;
                self.load_tree(commit.tree_oid())
            }
            None => Ok(Tree::default()),
        }
    }

    fn parse_object_as_bytes(
        &self,
        object_id: &ObjectId,
    ) -> anyhow::Result<(ObjectType, impl BufRead)> {
        let object_content = self.get(object_id)?;
        let mut object_reader = Cursor::new(object_content);

        let object_type = ObjectType::parse_object_type(&mut object_reader)
            .with_context(|| format!("corrupt object {object_id}"))?;

        Ok((object_type, object_reader))
    }

    pub fn get_object_type(&self, object_id: &ObjectId) -> anyhow::Result<ObjectType> {
        let (object_type, _) = self.parse_object_as_bytes(object_id)?;
        Ok(object_type)
    }

    /// Every object id in the store, in path order
    pub fn list_objects(&self) -> anyhow::Result<Vec<ObjectId>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut oids = Vec::new();
        for entry in WalkDir::new(&self.path).min_depth(2).max_depth(2).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.path)?;
            let hex = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<String>();
            // temp files from interrupted writes do not parse as ids
            if let Ok(oid) = ObjectId::try_parse(hex) {
                oids.push(oid);
            }
        }

        Ok(oids)
    }

    /// Find all objects whose id starts with the given hex prefix
    ///
    /// Used to resolve abbreviated ids. More than one match means the prefix
    /// is ambiguous.
    pub fn find_objects_by_prefix(&self, prefix: &str) -> anyhow::Result<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();

        if prefix.len() >= 2 {
            let (dir_name, file_prefix) = prefix.split_at(2);
            let dir_path = self.path.join(dir_name);
            let mut matches = Vec::new();

            if dir_path.is_dir() {
                for entry in std::fs::read_dir(&dir_path)? {
                    let file_name = entry?.file_name();
                    let file_name = file_name.to_string_lossy();

                    if file_name.starts_with(file_prefix)
                        && let Ok(oid) = ObjectId::try_parse(format!("{dir_name}{file_name}"))
                    {
                        matches.push(oid);
                    }
                }
            }
            matches.sort();

            Ok(matches)
        } else {
            Ok(self
                .list_objects()?
                .into_iter()
                .filter(|oid| oid.as_ref().starts_with(&prefix))
                .collect())
        }
    }

    fn read_object(&self, object_path: PathBuf) -> anyhow::Result<Bytes> {
        let object_content = std::fs::read(&object_path).context(format!(
            "Unable to read object file {}",
            object_path.display()
        ))?;

        Self::decompress(object_content.into())
    }

    fn write_object(&self, object_path: PathBuf, object_content: Bytes) -> anyhow::Result<()> {
        let object_dir = object_path
            .parent()
            .context(format!("Invalid object path {}", object_path.display()))?;
        let temp_object_path = object_dir.join(Self::generate_temp_name());

        let object_content = Self::compress(object_content)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_object_path)
            .context(format!(
                "Unable to open object file {}",
                temp_object_path.display()
            ))?;

        file.write_all(&object_content).context(format!(
            "Unable to write object file {}",
            temp_object_path.display()
        ))?;

        // rename the temp file to the object file to make it atomic
        std::fs::rename(&temp_object_path, &object_path).context(format!(
            "Unable to rename object file to {}",
            object_path.display()
        ))?;

        Ok(())
    }

    fn compress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(&data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .map(|compressed_content| compressed_content.into())
            .context("Unable to finish compressing object content")
    }

    fn decompress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }
}

/// Memoizes slim commits while walking the graph
///
/// Graph algorithms revisit the same commits many times; parsing each one
/// once keeps traversal cost proportional to the number of commits.
#[derive(Debug, Default)]
pub struct CommitCache {
    commits: RefCell<HashMap<ObjectId, SlimCommit>>,
}

impl CommitCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load_slim_commit(
        &self,
        database: &Database,
        oid: &ObjectId,
    ) -> anyhow::Result<SlimCommit> {
        if let Some(commit) = self.commits.borrow().get(oid) {
            return Ok(commit.clone());
        }

        let slim = database.load_commit(oid)?.to_slim(oid.clone());
        self.commits.borrow_mut().insert(oid.clone(), slim.clone());

        Ok(slim)
    }
}
