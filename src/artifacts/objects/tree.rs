//! Tree object
//!
//! A tree is the full file-set snapshot of one commit: a flat mapping from
//! repository-relative path (always `/`-separated) to blob id.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<path>\0<20-byte-sha1>`
//!
//! Entries are kept in a `BTreeMap`, so serialization is ordered by path no
//! matter in which order entries were inserted. Two trees describing the same
//! files always share one id.

use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::BufRead;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, ObjectId>,
}

impl Tree {
    pub fn new(entries: BTreeMap<String, ObjectId>) -> Self {
        Tree { entries }
    }

    pub fn get(&self, path: &str) -> Option<&ObjectId> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn insert(&mut self, path: String, oid: ObjectId) -> Option<ObjectId> {
        self.entries.insert(path, oid)
    }

    pub fn remove(&mut self, path: &str) -> Option<ObjectId> {
        self.entries.remove(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &ObjectId)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> BTreeMap<String, ObjectId> {
        self.entries
    }
}

impl FromIterator<(String, ObjectId)> for Tree {
    fn from_iter<I: IntoIterator<Item = (String, ObjectId)>>(iter: I) -> Self {
        Tree::new(iter.into_iter().collect())
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content_bytes = Vec::new();

        for (path, oid) in &self.entries {
            if path.as_bytes().contains(&0) {
                anyhow::bail!("tree path contains a NUL byte: {path:?}");
            }

            content_bytes.extend_from_slice(path.as_bytes());
            content_bytes.push(0);
            oid.write_h40_to(&mut content_bytes)?;
        }

        Ok(frame(self.object_type(), &content_bytes))
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();
        let mut reader = reader;
        let mut path_bytes = Vec::new();

        loop {
            path_bytes.clear();
            let n = reader.read_until(b'\0', &mut path_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if path_bytes.pop() != Some(b'\0') {
                return Err(anyhow::anyhow!("unexpected EOF in tree path"));
            }
            let path = std::str::from_utf8(&path_bytes)?.to_owned();

            let oid =
                ObjectId::read_h40_from(&mut reader).context("unexpected EOF in object id")?;

            entries.insert(path, oid);
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.entries
            .iter()
            .map(|(path, oid)| format!("blob {oid}\t{path}"))
            .collect::<Vec<String>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::blob::Blob;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn blob_ids() -> Vec<ObjectId> {
        ["one", "two", "three"]
            .iter()
            .map(|content| Blob::from(content.as_bytes()).object_id().unwrap())
            .collect()
    }

    #[rstest]
    fn insertion_order_does_not_change_the_id(blob_ids: Vec<ObjectId>) {
        let paths = ["b.txt", "a/c.txt", "a.txt"];

        let mut forward = Tree::default();
        for (path, oid) in paths.iter().zip(&blob_ids) {
            forward.insert(path.to_string(), oid.clone());
        }

        let mut backward = Tree::default();
        for (path, oid) in paths.iter().zip(&blob_ids).rev() {
            backward.insert(path.to_string(), oid.clone());
        }

        assert_eq!(forward.object_id().unwrap(), backward.object_id().unwrap());
    }

    #[rstest]
    fn serialized_tree_reads_back(blob_ids: Vec<ObjectId>) {
        let tree = Tree::from_iter([
            ("src/main.rs".to_string(), blob_ids[0].clone()),
            ("README".to_string(), blob_ids[1].clone()),
        ]);

        let mut reader = std::io::Cursor::new(tree.serialize().unwrap());
        assert_eq!(
            ObjectType::parse_object_type(&mut reader).unwrap(),
            ObjectType::Tree
        );
        assert_eq!(Tree::deserialize(reader).unwrap(), tree);
    }

    #[test]
    fn empty_tree_has_a_stable_id() {
        assert_eq!(
            Tree::default().object_id().unwrap().as_ref(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }

    #[rstest]
    fn different_mappings_hash_differently(blob_ids: Vec<ObjectId>) {
        let first = Tree::from_iter([("a.txt".to_string(), blob_ids[0].clone())]);
        let second = Tree::from_iter([("a.txt".to_string(), blob_ids[1].clone())]);

        assert_ne!(first.object_id().unwrap(), second.object_id().unwrap());
    }
}
