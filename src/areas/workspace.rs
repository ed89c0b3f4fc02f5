//! Working directory access
//!
//! Paths handed to and returned from the workspace are repository-relative
//! strings with `/` separators, the same keys trees and the index use.

use crate::areas::database::Database;
use crate::areas::repository::METADATA_DIR;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::objects::blob::Blob;
use crate::errors::RepositoryError;
use anyhow::Context;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self, file_path: &str) -> bool {
        self.path.join(file_path).is_file()
    }

    pub fn is_dir(&self, file_path: &str) -> bool {
        self.path.join(file_path).is_dir()
    }

    pub fn parse_blob(&self, file_path: &str) -> anyhow::Result<Blob> {
        Ok(Blob::new(self.read_file(file_path)?))
    }

    pub fn read_file(&self, file_path: &str) -> anyhow::Result<Bytes> {
        let full_path = self.path.join(file_path);
        if !full_path.is_file() {
            anyhow::bail!(RepositoryError::FileNotFound(file_path.to_string()));
        }

        let content = std::fs::read(&full_path)
            .with_context(|| format!("Unable to read file {:?}", full_path))?;

        Ok(content.into())
    }

    pub fn write_file(&self, file_path: &str, content: &[u8]) -> anyhow::Result<()> {
        let full_path = self.path.join(file_path);

        if let Some(parent) = full_path.parent() {
            // a file may stand where a directory is needed
            if parent.is_file() {
                std::fs::remove_file(parent)?;
            }
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        if full_path.is_dir() {
            std::fs::remove_dir_all(&full_path)?;
        }

        std::fs::write(&full_path, content)
            .with_context(|| format!("Failed to write file {:?}", full_path))
    }

    /// Delete a working file, then any directories it leaves empty
    pub fn remove_file(&self, file_path: &str) -> anyhow::Result<()> {
        let full_path = self.path.join(file_path);
        if !full_path.is_file() {
            return Ok(());
        }

        std::fs::remove_file(&full_path)
            .with_context(|| format!("Failed to remove file {:?}", full_path))?;
        self.prune_empty_parent_dirs(&full_path)
    }

    /// Every file under the workspace root, sorted, skipping `.gitlet`
    pub fn list_files(&self) -> anyhow::Result<Vec<String>> {
        self.list_files_under(&self.path)
    }

    /// Expand a user-supplied path into the files it names
    ///
    /// A file yields itself and a directory yields every file below it.
    pub fn expand_path(&self, file_path: &str) -> anyhow::Result<Vec<String>> {
        let full_path = self.path.join(file_path);

        if full_path.is_dir() {
            self.list_files_under(&full_path)
        } else if full_path.is_file() {
            Ok(vec![self.relative_path(&full_path)?])
        } else {
            anyhow::bail!(RepositoryError::FileNotFound(file_path.to_string()))
        }
    }

    /// Bring the working files in line with a planned migration
    ///
    /// Deletions run before writes so a file can replace a directory that
    /// the migration empties.
    pub fn apply_migration(&self, migration: &Migration, database: &Database) -> anyhow::Result<()> {
        for file_path in migration.deletions() {
            debug!(path = %file_path, "removing working file");
            self.remove_file(file_path)?;
        }

        for (file_path, blob_oid) in migration.writes() {
            let blob = database.load_blob(blob_oid)?;
            debug!(path = %file_path, oid = %blob_oid, "writing working file");
            self.write_file(file_path, blob.content())?;
        }

        Ok(())
    }

    fn list_files_under(&self, root: &Path) -> anyhow::Result<Vec<String>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !Self::is_ignored(entry.path()));
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(self.relative_path(entry.path())?);
            }
        }
        files.sort();

        Ok(files)
    }

    fn is_ignored(path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name.to_string_lossy() == METADATA_DIR)
    }

    fn relative_path(&self, full_path: &Path) -> anyhow::Result<String> {
        let relative = full_path
            .strip_prefix(&self.path)
            .with_context(|| format!("{:?} is outside the workspace", full_path))?;

        Ok(relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"))
    }

    fn prune_empty_parent_dirs(&self, path: &Path) -> anyhow::Result<()> {
        let mut current: Option<PathBuf> = path.parent().map(Path::to_path_buf);

        while let Some(dir) = current {
            if dir.as_path() == self.path.as_ref() || dir.read_dir()?.next().is_some() {
                break;
            }

            std::fs::remove_dir(&dir)
                .with_context(|| format!("Failed to remove empty directory {:?}", dir))?;
            current = dir.parent().map(Path::to_path_buf);
        }

        Ok(())
    }
}
