use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::index::staged_change::StagedChange;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::status::file_change::WorkspaceChangeType;
use derive_new::new;
use std::collections::{BTreeMap, BTreeSet};

/// Snapshot of the repository state shown by `status`
///
/// Every section is sorted by path (or branch name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusInfo {
    pub(crate) branches: Vec<BranchName>,
    pub(crate) current_branch: Option<BranchName>,
    pub(crate) staged_files: BTreeSet<String>,
    pub(crate) removed_files: BTreeSet<String>,
    pub(crate) workspace_changeset: BTreeMap<String, WorkspaceChangeType>,
    pub(crate) untracked_files: BTreeSet<String>,
}

impl StatusInfo {
    pub fn branches(&self) -> &[BranchName] {
        &self.branches
    }

    pub fn current_branch(&self) -> Option<&BranchName> {
        self.current_branch.as_ref()
    }

    pub fn staged_files(&self) -> &BTreeSet<String> {
        &self.staged_files
    }

    pub fn removed_files(&self) -> &BTreeSet<String> {
        &self.removed_files
    }

    pub fn workspace_changeset(&self) -> &BTreeMap<String, WorkspaceChangeType> {
        &self.workspace_changeset
    }

    pub fn untracked_files(&self) -> &BTreeSet<String> {
        &self.untracked_files
    }
}

#[derive(new)]
pub struct Status<'r> {
    repository: &'r Repository,
}

impl<'r> Status<'r> {
    pub fn initialize(&self) -> anyhow::Result<StatusInfo> {
        let refs = self.repository.refs();
        let head_tree = self
            .repository
            .database()
            .load_commit_tree(refs.read_head()?.as_ref())?;
        let workspace_files = self.repository.workspace().list_files()?;

        let mut status = StatusInfo {
            branches: refs.list_branches()?,
            current_branch: refs.current_branch()?,
            ..StatusInfo::default()
        };

        let index = self.repository.index();
        for (path, change) in index.entries() {
            match change {
                StagedChange::Addition(_) => status.staged_files.insert(path.clone()),
                StagedChange::Removal => status.removed_files.insert(path.clone()),
            };
        }

        self.collect_workspace_changes(&head_tree, &workspace_files, &mut status)?;

        status.untracked_files = workspace_files
            .into_iter()
            .filter(|path| {
                match index.entry_by_path(path) {
                    Some(StagedChange::Addition(_)) => false,
                    // re-created after `rm`
                    Some(StagedChange::Removal) => true,
                    None => !head_tree.contains(path),
                }
            })
            .collect();

        Ok(status)
    }

    /// Tracked or staged files whose working copy disagrees with what the
    /// next commit would record
    fn collect_workspace_changes(
        &self,
        head_tree: &Tree,
        workspace_files: &[String],
        status: &mut StatusInfo,
    ) -> anyhow::Result<()> {
        let index = self.repository.index();
        let present = workspace_files.iter().collect::<BTreeSet<_>>();

        let mut expected = BTreeMap::<&String, &ObjectId>::new();
        for (path, oid) in head_tree.entries() {
            if index.entry_by_path(path).is_none() {
                expected.insert(path, oid);
            }
        }
        for (path, oid) in index.additions() {
            expected.insert(path, oid);
        }

        for (path, oid) in expected {
            if !present.contains(path) {
                status
                    .workspace_changeset
                    .insert(path.clone(), WorkspaceChangeType::Deleted);
            } else if self.repository.workspace().parse_blob(path)?.object_id()? != *oid {
                status
                    .workspace_changeset
                    .insert(path.clone(), WorkspaceChangeType::Modified);
            }
        }

        Ok(())
    }
}
