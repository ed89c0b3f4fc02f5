use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::log::commit_graph::CommitGraph;
use crate::errors::RepositoryError;
use anyhow::Context;
use std::cell::{Ref, RefCell, RefMut};
use std::path::{Path, PathBuf};

/// Name of the metadata directory at the workspace root
pub const METADATA_DIR: &str = ".gitlet";

/// Explicit repository context
///
/// Everything a command touches hangs off this value; nothing is global, so
/// tests can drive several repositories side by side.
pub struct Repository {
    path: Box<Path>,
    writer: RefCell<Box<dyn std::io::Write>>,
    index: RefCell<Index>,
    database: Database,
    workspace: Workspace,
    refs: Refs,
}

impl Repository {
    /// Build the context for a workspace root without touching `.gitlet`
    ///
    /// Creates the root directory if needed. Use [`Repository::open`] for
    /// commands that need an initialized repository.
    pub fn new(path: &Path, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        if !path.exists() {
            std::fs::create_dir_all(path)
                .with_context(|| format!("failed to create {:?}", path))?;
        }
        let path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve {:?}", path))?;
        let metadata_path = path.join(METADATA_DIR);

        let index = Index::new(metadata_path.join("index").into_boxed_path());
        let database = Database::new(metadata_path.join("objects").into_boxed_path());
        let workspace = Workspace::new(path.clone().into_boxed_path());
        let refs = Refs::new(metadata_path.into_boxed_path());

        Ok(Repository {
            path: path.into_boxed_path(),
            writer: RefCell::new(writer),
            index: RefCell::new(index),
            database,
            workspace,
            refs,
        })
    }

    /// Open an initialized repository and load its staging area
    pub fn open(path: &Path, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        if !path.join(METADATA_DIR).is_dir() {
            anyhow::bail!(RepositoryError::NotARepository(
                path.display().to_string()
            ));
        }

        let repository = Self::new(path, writer)?;
        repository.index_mut().rehydrate()?;

        Ok(repository)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(METADATA_DIR)
    }

    pub fn is_initialized(&self) -> bool {
        self.metadata_path().is_dir()
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn index(&self) -> Ref<'_, Index> {
        self.index.borrow()
    }

    pub fn index_mut(&self) -> RefMut<'_, Index> {
        self.index.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn commit_graph(&self) -> CommitGraph<'_> {
        CommitGraph::new(&self.database, &self.refs)
    }
}
