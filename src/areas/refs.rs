//! Branches and HEAD
//!
//! References are the only mutable pointers into the commit graph besides
//! the staging area:
//! - Branches: `refs/heads/<name>`, each holding a commit id
//! - HEAD: either `ref: refs/heads/<name>` (attached) or a bare commit id
//!   (detached)
//!
//! A freshly initialized repository has HEAD attached to `main` while no
//! `refs/heads/main` file exists yet; the branch file appears with the root
//! commit.
//!
//! ## Locking
//!
//! Every ref write takes an exclusive `file-guard` lock on the file being
//! written. Locks are per file, so two processes running commands against
//! one repository are not serialized as a whole.

use crate::artifacts::branch::branch_name::{BranchName, SymRefName};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use anyhow::Context;
use derive_new::new;
use file_guard::Lock;
use std::io::Write;
use std::ops::DerefMut;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, new)]
pub struct Refs {
    /// Path to the metadata directory (typically `.gitlet`)
    path: Box<Path>,
}

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// What HEAD currently points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Branch(BranchName),
    Detached(ObjectId),
}

#[derive(Debug, Clone)]
enum SymRefOrOid {
    SymRef { sym_ref_name: SymRefName },
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ref file at {:?}", path))?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_match = regex::Regex::new(SYMREF_REGEX)?.captures(content);
        if let Some(symref_match) = symref_match {
            Ok(Some(SymRefOrOid::SymRef {
                sym_ref_name: SymRefName::new(symref_match[1].to_string()),
            }))
        } else {
            Ok(Some(SymRefOrOid::Oid(ObjectId::try_parse(
                content.to_string(),
            )?)))
        }
    }
}

impl Refs {
    /// Point HEAD at a branch that may not have any commits yet
    pub fn init_head(&self, branch_name: &BranchName) -> anyhow::Result<()> {
        std::fs::create_dir_all(self.heads_path())
            .with_context(|| format!("failed to create {:?}", self.heads_path()))?;

        self.write_symref(branch_name)
    }

    pub fn head(&self) -> anyhow::Result<Head> {
        match SymRefOrOid::read_symref_or_oid(&self.head_path())? {
            Some(SymRefOrOid::SymRef { sym_ref_name }) => Ok(Head::Branch(
                BranchName::try_parse_sym_ref_name(&sym_ref_name)?,
            )),
            Some(SymRefOrOid::Oid(oid)) => Ok(Head::Detached(oid)),
            None => Err(anyhow::anyhow!(
                "HEAD is missing or empty at {:?}",
                self.head_path()
            )),
        }
    }

    /// Name of the checked-out branch, `None` when HEAD is detached
    pub fn current_branch(&self) -> anyhow::Result<Option<BranchName>> {
        match self.head()? {
            Head::Branch(branch_name) => Ok(Some(branch_name)),
            Head::Detached(_) => Ok(None),
        }
    }

    pub fn is_current_branch(&self, branch_name: &BranchName) -> anyhow::Result<bool> {
        Ok(self.current_branch()?.as_ref() == Some(branch_name))
    }

    /// Commit HEAD resolves to, `None` before the root commit
    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        match self.head()? {
            Head::Branch(branch_name) => self.read_branch(&branch_name),
            Head::Detached(oid) => Ok(Some(oid)),
        }
    }

    pub fn resolve_head(&self) -> anyhow::Result<ObjectId> {
        self.read_head()?
            .ok_or_else(|| RepositoryError::NoCommitsYet.into())
    }

    /// Advance whatever HEAD points at to `oid`
    ///
    /// With an attached HEAD the branch file is written (and created for the
    /// root commit); a detached HEAD is rewritten in place.
    pub fn update_head(&self, oid: &ObjectId) -> anyhow::Result<()> {
        match self.head()? {
            Head::Branch(branch_name) => {
                debug!(branch = %branch_name, %oid, "advancing branch");
                self.update_ref_file(self.branch_path(&branch_name), oid.as_ref())
            }
            Head::Detached(_) => {
                debug!(%oid, "advancing detached HEAD");
                self.detach_head(oid)
            }
        }
    }

    pub fn detach_head(&self, oid: &ObjectId) -> anyhow::Result<()> {
        self.update_ref_file(self.head_path(), oid.as_ref())
    }

    /// Attach HEAD to an existing branch other than the current one
    pub fn checkout_branch(&self, branch_name: &BranchName) -> anyhow::Result<ObjectId> {
        let oid = self
            .read_branch(branch_name)?
            .ok_or_else(|| RepositoryError::BranchNotFound(branch_name.to_string()))?;

        if self.is_current_branch(branch_name)? {
            anyhow::bail!(RepositoryError::NoSuchBranchToCheckout(
                branch_name.to_string()
            ));
        }

        debug!(branch = %branch_name, "attaching HEAD");
        self.write_symref(branch_name)?;

        Ok(oid)
    }

    pub fn read_branch(&self, branch_name: &BranchName) -> anyhow::Result<Option<ObjectId>> {
        match SymRefOrOid::read_symref_or_oid(&self.branch_path(branch_name))? {
            Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)),
            Some(SymRefOrOid::SymRef { sym_ref_name }) => anyhow::bail!(
                "branch {} is a symbolic ref to {}",
                branch_name,
                sym_ref_name.as_ref_path()
            ),
            None => Ok(None),
        }
    }

    pub fn branch_exists(&self, branch_name: &BranchName) -> bool {
        self.branch_path(branch_name).is_file()
    }

    pub fn create_branch(&self, name: &BranchName, source_oid: &ObjectId) -> anyhow::Result<()> {
        // HEAD may name a branch whose file does not exist yet
        if self.branch_exists(name) || self.is_unborn_current_branch(name)? {
            anyhow::bail!(RepositoryError::BranchExists(name.to_string()));
        }

        debug!(branch = %name, oid = %source_oid, "creating branch");
        self.update_ref_file(self.branch_path(name), source_oid.as_ref())
    }

    pub fn move_branch(&self, name: &BranchName, oid: &ObjectId) -> anyhow::Result<()> {
        if !self.branch_exists(name) {
            anyhow::bail!(RepositoryError::BranchNotFound(name.to_string()));
        }

        debug!(branch = %name, %oid, "moving branch");
        self.update_ref_file(self.branch_path(name), oid.as_ref())
    }

    /// Delete a branch pointer; the commits it pointed at stay in the store
    pub fn delete_branch(&self, name: &BranchName) -> anyhow::Result<ObjectId> {
        let branch_path = self.branch_path(name);

        let oid = self
            .read_branch(name)?
            .ok_or_else(|| RepositoryError::BranchNotFound(name.to_string()))?;

        if self.is_current_branch(name)? {
            anyhow::bail!(RepositoryError::CannotDeleteCurrentBranch(
                name.to_string()
            ));
        }

        std::fs::remove_file(&branch_path)
            .with_context(|| format!("failed to delete branch file at {:?}", branch_path))?;
        self.prune_branch_empty_parent_dirs(&branch_path)?;
        debug!(branch = %name, %oid, "deleted branch");

        Ok(oid)
    }

    /// All branches with a commit, sorted by name
    pub fn list_branches(&self) -> anyhow::Result<Vec<BranchName>> {
        let heads_path = self.heads_path();
        if !heads_path.exists() {
            return Ok(Vec::new());
        }

        let mut branches = Vec::new();
        for entry in WalkDir::new(&heads_path) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative_path = entry.path().strip_prefix(&heads_path)?;
            let name = relative_path
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            branches.push(BranchName::try_parse(name)?);
        }
        branches.sort();

        Ok(branches)
    }

    fn is_unborn_current_branch(&self, name: &BranchName) -> anyhow::Result<bool> {
        Ok(self.is_current_branch(name)? && !self.branch_exists(name))
    }

    fn write_symref(&self, branch_name: &BranchName) -> anyhow::Result<()> {
        let sym_ref_name = SymRefName::for_branch(branch_name);
        self.update_ref_file(
            self.head_path(),
            &format!("ref: {}", sym_ref_name.as_ref_path()),
        )
    }

    fn update_ref_file(&self, path: Box<Path>, raw_ref: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(path.parent().with_context(|| {
            format!(
                "failed to create parent directories for ref file at {:?}",
                path
            )
        })?)?;

        let mut ref_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("failed to open ref file at {:?}", path))?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(raw_ref.as_bytes())?;
        lock.deref_mut().write_all(b"\n")?;

        Ok(())
    }

    fn prune_branch_empty_parent_dirs(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && parent != self.heads_path().as_ref()
            && parent.read_dir()?.next().is_none()
        {
            std::fs::remove_dir(parent).with_context(|| {
                format!("failed to remove empty branch directory at {:?}", parent)
            })?;
            self.prune_branch_empty_parent_dirs(parent)?;
        }

        Ok(())
    }

    fn branch_path(&self, branch_name: &BranchName) -> Box<Path> {
        self.path
            .join(SymRefName::for_branch(branch_name).as_ref_path())
            .into_boxed_path()
    }

    pub fn head_path(&self) -> Box<Path> {
        self.path.join("HEAD").into_boxed_path()
    }

    pub fn refs_path(&self) -> Box<Path> {
        self.path.join("refs").into_boxed_path()
    }

    pub fn heads_path(&self) -> Box<Path> {
        self.refs_path().join("heads").into_boxed_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::find_repository_error;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    struct RefsFixture {
        _dir: TempDir,
        refs: Refs,
    }

    #[fixture]
    fn refs() -> RefsFixture {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let refs = Refs::new(dir.path().into());
        refs.init_head(&BranchName::default_branch()).unwrap();

        RefsFixture { _dir: dir, refs }
    }

    fn branch(name: &str) -> BranchName {
        BranchName::try_parse(name.to_string()).unwrap()
    }

    fn oid(seed: &str) -> ObjectId {
        ObjectId::digest(seed.as_bytes())
    }

    fn error_kind(result: anyhow::Result<impl std::fmt::Debug>) -> RepositoryError {
        let error = result.unwrap_err();
        find_repository_error(&error).cloned().unwrap()
    }

    #[rstest]
    fn fresh_head_has_no_commits(refs: RefsFixture) {
        assert_eq!(refs.refs.read_head().unwrap(), None);
        assert_eq!(error_kind(refs.refs.resolve_head()), RepositoryError::NoCommitsYet);
        assert!(refs.refs.list_branches().unwrap().is_empty());
    }

    #[rstest]
    fn first_update_creates_the_current_branch(refs: RefsFixture) {
        refs.refs.update_head(&oid("root")).unwrap();

        assert_eq!(refs.refs.resolve_head().unwrap(), oid("root"));
        assert_eq!(refs.refs.list_branches().unwrap(), vec![branch("main")]);
    }

    #[rstest]
    fn creating_an_existing_branch_fails(refs: RefsFixture) {
        refs.refs.update_head(&oid("root")).unwrap();
        refs.refs.create_branch(&branch("dev"), &oid("root")).unwrap();

        assert_eq!(
            error_kind(refs.refs.create_branch(&branch("dev"), &oid("other"))),
            RepositoryError::BranchExists("dev".into())
        );
    }

    #[rstest]
    fn current_branch_cannot_be_deleted(refs: RefsFixture) {
        refs.refs.update_head(&oid("root")).unwrap();
        refs.refs.create_branch(&branch("dev"), &oid("root")).unwrap();
        refs.refs.checkout_branch(&branch("dev")).unwrap();

        assert_eq!(
            error_kind(refs.refs.delete_branch(&branch("dev"))),
            RepositoryError::CannotDeleteCurrentBranch("dev".into())
        );
        assert_eq!(refs.refs.delete_branch(&branch("main")).unwrap(), oid("root"));
    }

    #[rstest]
    fn deleting_a_nested_branch_prunes_empty_dirs(refs: RefsFixture) {
        refs.refs.update_head(&oid("root")).unwrap();
        refs.refs
            .create_branch(&branch("feature/login"), &oid("root"))
            .unwrap();

        refs.refs.delete_branch(&branch("feature/login")).unwrap();

        assert!(!refs.refs.heads_path().join("feature").exists());
        assert_eq!(
            error_kind(refs.refs.delete_branch(&branch("feature/login"))),
            RepositoryError::BranchNotFound("feature/login".into())
        );
    }

    #[rstest]
    fn checking_out_the_current_branch_fails(refs: RefsFixture) {
        refs.refs.update_head(&oid("root")).unwrap();

        assert_eq!(
            error_kind(refs.refs.checkout_branch(&branch("main"))),
            RepositoryError::NoSuchBranchToCheckout("main".into())
        );
        assert_eq!(
            error_kind(refs.refs.checkout_branch(&branch("nope"))),
            RepositoryError::BranchNotFound("nope".into())
        );
    }

    #[rstest]
    fn moving_a_missing_branch_fails(refs: RefsFixture) {
        assert_eq!(
            error_kind(refs.refs.move_branch(&branch("ghost"), &oid("x"))),
            RepositoryError::BranchNotFound("ghost".into())
        );
    }

    #[rstest]
    fn detached_head_advances_in_place(refs: RefsFixture) {
        refs.refs.update_head(&oid("root")).unwrap();
        refs.refs.detach_head(&oid("root")).unwrap();

        refs.refs.update_head(&oid("next")).unwrap();

        assert_eq!(refs.refs.head().unwrap(), Head::Detached(oid("next")));
        assert_eq!(refs.refs.read_branch(&branch("main")).unwrap(), Some(oid("root")));
        assert_eq!(refs.refs.current_branch().unwrap(), None);
    }
}
