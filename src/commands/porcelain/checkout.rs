use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{RepositoryError, find_repository_error};
use std::io::Write;
use tracing::info;

impl Repository {
    /// `checkout -- <file>`: restore a file from HEAD
    pub fn checkout_file(&self, path: &str) -> anyhow::Result<()> {
        let head = self.refs().resolve_head()?;

        self.restore_file(&head, path)
    }

    /// `checkout <commit> -- <file>`: restore a file from any commit
    pub fn checkout_commit_file(&self, revision: &str, path: &str) -> anyhow::Result<()> {
        let commit_oid = Revision::resolve_commit(revision, self)?;

        self.restore_file(&commit_oid, path)
    }

    /// `checkout <branch>` attaches HEAD, `checkout <commit>` detaches it
    pub fn checkout(&self, target: &str) -> anyhow::Result<()> {
        let branch_name = BranchName::try_parse(target.to_string()).ok();
        if let Some(branch_name) = &branch_name
            && self.refs().branch_exists(branch_name)
        {
            return self.checkout_branch(branch_name);
        }

        match Revision::resolve_commit(target, self) {
            Ok(target_oid) => self.checkout_detached(&target_oid),
            // a plain name that is neither a branch nor a commit
            Err(error)
                if branch_name.is_some()
                    && matches!(
                        find_repository_error(&error),
                        Some(RepositoryError::NoSuchCommit(_))
                    ) =>
            {
                Err(RepositoryError::BranchNotFound(target.to_string()).into())
            }
            Err(error) => Err(error),
        }
    }

    pub fn checkout_branch(&self, branch_name: &BranchName) -> anyhow::Result<()> {
        let target_oid = self
            .refs()
            .read_branch(branch_name)?
            .ok_or_else(|| RepositoryError::BranchNotFound(branch_name.to_string()))?;
        if self.refs().is_current_branch(branch_name)? {
            anyhow::bail!(RepositoryError::NoSuchBranchToCheckout(
                branch_name.to_string()
            ));
        }

        let migration = self.plan_migration(&self.load_tree_of(&target_oid)?)?;
        self.apply_migration(&migration)?;
        self.refs().checkout_branch(branch_name)?;

        info!(branch = %branch_name, "switched branch");
        writeln!(self.writer(), "Switched to branch '{branch_name}'")?;

        Ok(())
    }

    pub fn checkout_detached(&self, target_oid: &ObjectId) -> anyhow::Result<()> {
        let migration = self.plan_migration(&self.load_tree_of(target_oid)?)?;
        self.apply_migration(&migration)?;
        self.refs().detach_head(target_oid)?;

        info!(oid = %target_oid, "detached HEAD");
        self.print_head_position(target_oid)
    }

    /// Check out a commit's files and move the current branch to it
    pub fn reset(&self, revision: &str) -> anyhow::Result<()> {
        let target_oid = Revision::resolve_commit(revision, self)?;

        let migration = self.plan_migration(&self.load_tree_of(&target_oid)?)?;
        self.apply_migration(&migration)?;
        self.refs().update_head(&target_oid)?;

        info!(oid = %target_oid, "reset HEAD");
        self.print_head_position(&target_oid)
    }

    /// Plan moving the working directory from HEAD's tree to `target`
    ///
    /// Refuses when an untracked working file, or an uncommitted edit to a
    /// tracked one, would be clobbered. Nothing is written.
    pub(crate) fn plan_migration(&self, target: &Tree) -> anyhow::Result<Migration> {
        Migration::plan(&self.head_tree()?, target, self.workspace())
    }

    /// Fail with `UnstagedChanges` if any tracked file differs from HEAD
    pub(crate) fn ensure_no_unstaged_changes(&self) -> anyhow::Result<()> {
        let unstaged = Migration::unstaged_changes(&self.head_tree()?, self.workspace())?;
        if !unstaged.is_empty() {
            anyhow::bail!(RepositoryError::UnstagedChanges(unstaged));
        }

        Ok(())
    }

    /// Write the planned files and empty the staging area
    pub(crate) fn apply_migration(&self, migration: &Migration) -> anyhow::Result<()> {
        self.workspace()
            .apply_migration(migration, self.database())?;

        let mut index = self.index_mut();
        index.clear();
        index.write_updates()
    }

    fn restore_file(&self, commit_oid: &ObjectId, path: &str) -> anyhow::Result<()> {
        let tree = self.load_tree_of(commit_oid)?;
        let blob_oid = tree
            .get(path)
            .ok_or_else(|| RepositoryError::FileNotInCommit(path.to_string()))?;
        let blob = self.database().load_blob(blob_oid)?;

        self.workspace().write_file(path, blob.content())
    }

    fn head_tree(&self) -> anyhow::Result<Tree> {
        self.database()
            .load_commit_tree(self.refs().read_head()?.as_ref())
    }

    fn load_tree_of(&self, commit_oid: &ObjectId) -> anyhow::Result<Tree> {
        self.database().load_commit_tree(Some(commit_oid))
    }

    fn print_head_position(&self, oid: &ObjectId) -> anyhow::Result<()> {
        let commit = self.database().load_commit(oid)?;

        writeln!(
            self.writer(),
            "HEAD is now at {} {}",
            oid.to_short_oid(),
            commit.short_message()
        )?;

        Ok(())
    }
}
