//! Commit creation and history queries
//!
//! The commit graph is not stored anywhere on its own: it is the set of
//! commit objects in the database, linked by their parent ids, with branches
//! and HEAD as entry points.

use crate::areas::database::{CommitCache, Database};
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::artifacts::index::staged_change::StagedChange;
use crate::artifacts::log::rev_list::RevList;
use crate::artifacts::merge::bca_finder::BCAFinder;
use crate::artifacts::objects::commit::{Author, Commit, SlimCommit};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::errors::RepositoryError;
use derive_new::new;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

#[derive(new)]
pub struct CommitGraph<'r> {
    database: &'r Database,
    refs: &'r Refs,
    #[new(default)]
    commit_cache: CommitCache,
}

impl<'r> CommitGraph<'r> {
    /// Record the staged changes as a new commit on top of HEAD
    ///
    /// The first commit of a repository may be empty and becomes the root;
    /// every later commit needs at least one staged change. On success the
    /// current branch (or detached HEAD) points at the new commit and the
    /// staging area is empty.
    pub fn commit(
        &self,
        message: &str,
        index: &mut Index,
        author: Author,
    ) -> anyhow::Result<ObjectId> {
        if message.trim().is_empty() {
            anyhow::bail!(RepositoryError::EmptyCommitMessage);
        }

        let parent = self.refs.read_head()?;
        if parent.is_some() && index.is_empty() {
            anyhow::bail!(RepositoryError::NothingToCommit);
        }

        let tree = self.build_tree(parent.as_ref(), index)?;
        let tree_oid = self.database.store(&tree)?;

        let parents = parent.into_iter().collect::<Vec<_>>();
        let commit_oid = self.write_commit(parents, tree_oid, author, message)?;
        self.refs.update_head(&commit_oid)?;

        index.clear();
        index.write_updates()?;

        info!(oid = %commit_oid, "created commit");
        Ok(commit_oid)
    }

    /// Apply staged additions and removals to the tree of `parent`
    pub fn build_tree(&self, parent: Option<&ObjectId>, index: &Index) -> anyhow::Result<Tree> {
        let mut tree = self.database.load_commit_tree(parent)?;

        for (path, change) in index.entries() {
            match change {
                StagedChange::Addition(blob_oid) => {
                    tree.insert(path.clone(), blob_oid.clone());
                }
                StagedChange::Removal => {
                    tree.remove(path);
                }
            }
        }

        Ok(tree)
    }

    /// Store a commit object without moving any ref
    pub fn write_commit(
        &self,
        parents: Vec<ObjectId>,
        tree_oid: ObjectId,
        author: Author,
        message: &str,
    ) -> anyhow::Result<ObjectId> {
        let commit = Commit::new(parents, tree_oid, author, message.to_string());
        let commit_oid = self.database.store(&commit)?;
        debug!(oid = %commit_oid, parents = commit.parents().len(), "stored commit");

        Ok(commit_oid)
    }

    /// First-parent history from `start_oid` back to the root
    pub fn log(&self, start_oid: ObjectId) -> RevList<'r> {
        RevList::new(self.database, start_oid)
    }

    /// Every commit in the store, in store enumeration order
    pub fn global_log(&self) -> anyhow::Result<Vec<(ObjectId, Commit)>> {
        let mut commits = Vec::new();

        for oid in self.database.list_objects()? {
            if let Some(commit) = self.database.parse_object_as_commit(&oid)? {
                commits.push((oid, commit));
            }
        }

        Ok(commits)
    }

    /// Ids of all commits whose message is exactly `message`
    pub fn find_by_message(&self, message: &str) -> anyhow::Result<BTreeSet<ObjectId>> {
        let matches = self
            .global_log()?
            .into_iter()
            .filter(|(_, commit)| commit.message() == message)
            .map(|(oid, _)| oid)
            .collect::<BTreeSet<_>>();

        if matches.is_empty() {
            anyhow::bail!(RepositoryError::NoCommitsFound);
        }

        Ok(matches)
    }

    /// All commits reachable from `commit_oid` through parent links,
    /// including itself
    pub fn ancestors_of(&self, commit_oid: &ObjectId) -> anyhow::Result<HashSet<ObjectId>> {
        Ok(self.bca_finder().ancestors_of(commit_oid)?.into_iter().collect())
    }

    pub fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> anyhow::Result<bool> {
        Ok(self.lowest_common_ancestor(ancestor, descendant)? == *ancestor)
    }

    /// The split point of two commits
    ///
    /// Deepest common ancestor, ties going to the earliest commit. Fails
    /// with `UnrelatedHistory` when the two share no commit.
    pub fn lowest_common_ancestor(&self, a: &ObjectId, b: &ObjectId) -> anyhow::Result<ObjectId> {
        self.bca_finder()
            .find_best_common_ancestor(a, b)?
            .ok_or_else(|| RepositoryError::UnrelatedHistory.into())
    }

    pub fn database(&self) -> &'r Database {
        self.database
    }

    fn bca_finder(&self) -> BCAFinder<impl Fn(&ObjectId) -> anyhow::Result<SlimCommit> + '_> {
        BCAFinder::new(|oid: &ObjectId| {
            self.commit_cache
                .get_or_load_slim_commit(self.database, oid)
        })
    }
}
