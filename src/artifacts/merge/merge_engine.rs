//! Branch merge
//!
//! Merging runs in two phases so callers can inspect the outcome before
//! anything is written:
//!
//! 1. [`MergeEngine::prepare`] checks the preconditions, finds the split
//!    point and computes the merged tree. It only reads.
//! 2. [`MergeEngine::execute`] stores conflict blobs, the tree and the merge
//!    commit, then advances the current branch.
//!
//! Preconditions are checked in order, each one terminal: merging a branch
//! with itself (`NothingToMerge`), pending staged changes
//! (`UncommittedChanges`), theirs already contained in ours (up to date,
//! a success), ours contained in theirs (fast-forward, no new commit).
//! Conflicts never abort a merge; they are committed marked up and reported.

use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::merge::file_merge::{FileResolution, conflict_content};
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Author;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::errors::RepositoryError;
use derive_new::new;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Label used for the current side when HEAD is detached
const DETACHED_HEAD_LABEL: &str = "HEAD";

/// What a merge would do, computed without writing anything
#[derive(Debug, Clone)]
pub enum MergePlan {
    AlreadyUpToDate,
    FastForward {
        from: ObjectId,
        to: ObjectId,
    },
    ThreeWay(ThreeWayMerge),
}

#[derive(Debug, Clone)]
pub struct ThreeWayMerge {
    ours: ObjectId,
    theirs: ObjectId,
    base: ObjectId,
    message: String,
    merged_tree: Tree,
    /// Marked-up blobs for conflicted paths, stored on execute
    conflict_blobs: Vec<(String, Blob)>,
}

impl ThreeWayMerge {
    pub fn base(&self) -> &ObjectId {
        &self.base
    }

    pub fn merged_tree(&self) -> &Tree {
        &self.merged_tree
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &String> {
        self.conflict_blobs.iter().map(|(path, _)| path)
    }
}

/// Result of an executed merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    AlreadyUpToDate,
    FastForward {
        from: ObjectId,
        to: ObjectId,
    },
    Merged {
        commit: ObjectId,
        base: ObjectId,
        conflicts: Vec<String>,
    },
}

impl MergeOutcome {
    pub fn has_conflicts(&self) -> bool {
        matches!(self, MergeOutcome::Merged { conflicts, .. } if !conflicts.is_empty())
    }
}

#[derive(new)]
pub struct MergeEngine<'r> {
    repository: &'r Repository,
}

impl<'r> MergeEngine<'r> {
    /// Check preconditions and plan the merge of `target` into HEAD
    pub fn prepare(&self, target: &BranchName) -> anyhow::Result<MergePlan> {
        let refs = self.repository.refs();

        let theirs = refs
            .read_branch(target)?
            .ok_or_else(|| RepositoryError::BranchNotFound(target.to_string()))?;
        let ours = refs.resolve_head()?;
        let current_branch = refs.current_branch()?;

        if current_branch.as_ref() == Some(target) || ours == theirs {
            anyhow::bail!(RepositoryError::NothingToMerge);
        }

        if !self.repository.index().is_empty() {
            anyhow::bail!(RepositoryError::UncommittedChanges);
        }

        let graph = self.repository.commit_graph();
        let base = graph.lowest_common_ancestor(&ours, &theirs)?;
        debug!(%ours, %theirs, %base, "found split point");

        if base == theirs {
            return Ok(MergePlan::AlreadyUpToDate);
        }

        if base == ours {
            return Ok(MergePlan::FastForward {
                from: ours,
                to: theirs,
            });
        }

        let current_label = current_branch
            .map(|branch| branch.to_string())
            .unwrap_or_else(|| DETACHED_HEAD_LABEL.to_string());
        let message = format!("Merged {target} into {current_label}.");

        self.plan_three_way(ours, theirs, base, message)
            .map(MergePlan::ThreeWay)
    }

    /// Tree the working directory should end up with, if it changes
    pub fn target_tree(&self, plan: &MergePlan) -> anyhow::Result<Option<Tree>> {
        match plan {
            MergePlan::AlreadyUpToDate => Ok(None),
            MergePlan::FastForward { to, .. } => Ok(Some(
                self.repository.database().load_commit_tree(Some(to))?,
            )),
            MergePlan::ThreeWay(merge) => Ok(Some(merge.merged_tree.clone())),
        }
    }

    /// Write the planned merge and advance the current branch
    ///
    /// `author` is only consulted when a merge commit is created.
    pub fn execute(
        &self,
        plan: MergePlan,
        author: impl FnOnce() -> anyhow::Result<Author>,
    ) -> anyhow::Result<MergeOutcome> {
        let database = self.repository.database();
        let refs = self.repository.refs();

        match plan {
            MergePlan::AlreadyUpToDate => Ok(MergeOutcome::AlreadyUpToDate),
            MergePlan::FastForward { from, to } => {
                refs.update_head(&to)?;
                info!(%from, %to, "fast-forwarded");

                Ok(MergeOutcome::FastForward { from, to })
            }
            MergePlan::ThreeWay(merge) => {
                for (path, blob) in &merge.conflict_blobs {
                    let oid = database.store(blob)?;
                    debug!(%path, %oid, "stored conflict blob");
                }
                let tree_oid = database.store(&merge.merged_tree)?;

                let commit = self.repository.commit_graph().write_commit(
                    vec![merge.ours.clone(), merge.theirs.clone()],
                    tree_oid,
                    author()?,
                    &merge.message,
                )?;
                refs.update_head(&commit)?;

                let conflicts = merge
                    .conflict_blobs
                    .into_iter()
                    .map(|(path, _)| path)
                    .collect::<Vec<_>>();
                info!(%commit, conflicts = conflicts.len(), "created merge commit");

                Ok(MergeOutcome::Merged {
                    commit,
                    base: merge.base,
                    conflicts,
                })
            }
        }
    }

    /// Prepare and execute in one go
    pub fn merge(
        &self,
        target: &BranchName,
        author: impl FnOnce() -> anyhow::Result<Author>,
    ) -> anyhow::Result<MergeOutcome> {
        let plan = self.prepare(target)?;
        self.execute(plan, author)
    }

    fn plan_three_way(
        &self,
        ours: ObjectId,
        theirs: ObjectId,
        base: ObjectId,
        message: String,
    ) -> anyhow::Result<ThreeWayMerge> {
        let database = self.repository.database();
        let base_tree = database.load_commit_tree(Some(&base))?;
        let ours_tree = database.load_commit_tree(Some(&ours))?;
        let theirs_tree = database.load_commit_tree(Some(&theirs))?;

        let paths = base_tree
            .paths()
            .chain(ours_tree.paths())
            .chain(theirs_tree.paths())
            .cloned()
            .collect::<BTreeSet<_>>();

        let mut merged_tree = Tree::default();
        let mut conflict_blobs = Vec::new();

        for path in paths {
            let split_oid = base_tree.get(&path);
            let ours_oid = ours_tree.get(&path);
            let theirs_oid = theirs_tree.get(&path);

            let resolution = FileResolution::classify(split_oid, ours_oid, theirs_oid);
            debug!(%path, ?resolution, "classified path");

            match resolution.resolved(ours_oid, theirs_oid) {
                Some(Some(oid)) => {
                    merged_tree.insert(path, oid.clone());
                }
                Some(None) => {}
                None => {
                    let blob = Blob::new(conflict_content(
                        &self.blob_content(ours_oid)?,
                        &self.blob_content(theirs_oid)?,
                    ));
                    merged_tree.insert(path.clone(), blob.object_id()?);
                    conflict_blobs.push((path, blob));
                }
            }
        }

        Ok(ThreeWayMerge {
            ours,
            theirs,
            base,
            message,
            merged_tree,
            conflict_blobs,
        })
    }

    fn blob_content(&self, oid: Option<&ObjectId>) -> anyhow::Result<bytes::Bytes> {
        match oid {
            Some(oid) => Ok(self.repository.database().load_blob(oid)?.into_content()),
            None => Ok(bytes::Bytes::new()),
        }
    }
}
