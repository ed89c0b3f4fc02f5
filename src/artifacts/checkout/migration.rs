use crate::areas::workspace::Workspace;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::errors::RepositoryError;
use std::collections::{BTreeMap, BTreeSet};

/// Planned working-directory changes from one tree to another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Migration {
    /// Files to (over)write with the given blob
    writes: BTreeMap<String, ObjectId>,
    /// Files tracked by the current tree and absent from the target
    deletions: BTreeSet<String>,
}

impl Migration {
    /// Plan the move from `current` to `target`
    ///
    /// Fails with `UntrackedFileInTheWay` when a working file that `current`
    /// does not track would be replaced or removed, and with
    /// `UnstagedChanges` when a tracked file the move touches carries edits
    /// that are not in `current`.
    pub fn plan(current: &Tree, target: &Tree, workspace: &Workspace) -> anyhow::Result<Self> {
        let mut migration = Self::between(current, target);

        // tracked files missing from disk are restored even when unchanged
        for (path, oid) in target.entries() {
            if !migration.writes.contains_key(path) && !workspace.exists(path) {
                migration.writes.insert(path.clone(), oid.clone());
            }
        }

        let in_the_way = migration.untracked_in_the_way(current, workspace)?;
        if !in_the_way.is_empty() {
            anyhow::bail!(RepositoryError::UntrackedFileInTheWay(in_the_way));
        }

        let unstaged = Self::unstaged_changes(current, workspace)?
            .into_iter()
            .filter(|path| migration.touches(path))
            .collect::<Vec<_>>();
        if !unstaged.is_empty() {
            anyhow::bail!(RepositoryError::UnstagedChanges(unstaged));
        }

        Ok(migration)
    }

    /// Plan without looking at the working directory
    ///
    /// Only paths whose blob differs between the two trees are written.
    pub fn between(current: &Tree, target: &Tree) -> Self {
        let writes = target
            .entries()
            .filter(|(path, oid)| current.get(path) != Some(*oid))
            .map(|(path, oid)| (path.clone(), oid.clone()))
            .collect();
        let deletions = current
            .paths()
            .filter(|path| !target.contains(path))
            .cloned()
            .collect();

        Migration { writes, deletions }
    }

    /// Tracked files whose working copy exists and differs from `current`
    pub fn unstaged_changes(current: &Tree, workspace: &Workspace) -> anyhow::Result<Vec<String>> {
        let mut unstaged = Vec::new();

        for (path, oid) in current.entries() {
            if workspace.exists(path) && workspace.parse_blob(path)?.object_id()? != *oid {
                unstaged.push(path.clone());
            }
        }

        Ok(unstaged)
    }

    pub fn writes(&self) -> impl Iterator<Item = (&String, &ObjectId)> {
        self.writes.iter()
    }

    pub fn deletions(&self) -> impl Iterator<Item = &String> {
        self.deletions.iter()
    }

    fn touches(&self, path: &str) -> bool {
        self.writes.contains_key(path) || self.deletions.contains(path)
    }

    /// Untracked working files a write would clobber
    ///
    /// A write replaces the file at its own path, any file standing where
    /// one of its parent directories goes, and any directory at its path.
    fn untracked_in_the_way(
        &self,
        current: &Tree,
        workspace: &Workspace,
    ) -> anyhow::Result<Vec<String>> {
        let mut in_the_way = BTreeSet::new();

        for (path, target_oid) in self.writes() {
            if !current.contains(path)
                && workspace.exists(path)
                && workspace.parse_blob(path)?.object_id()? != *target_oid
            {
                in_the_way.insert(path.clone());
            }

            for ancestor in ancestor_paths(path) {
                if workspace.exists(ancestor) && !current.contains(ancestor) {
                    in_the_way.insert(ancestor.to_string());
                }
            }

            if workspace.is_dir(path) {
                in_the_way.extend(
                    workspace
                        .expand_path(path)?
                        .into_iter()
                        .filter(|nested| !current.contains(nested)),
                );
            }
        }

        Ok(in_the_way.into_iter().collect())
    }
}

/// `a/b/c.txt` yields `a` and `a/b`
fn ancestor_paths(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(at, _)| &path[..at])
}
