use crate::areas::repository::Repository;
use crate::artifacts::index::staged_change::RemovalOutcome;
use tracing::debug;

impl Repository {
    /// Unstage a pending addition, or stage a tracked file for removal and
    /// delete its working copy
    pub fn rm(&self, path: &str) -> anyhow::Result<()> {
        let head_tree = self
            .database()
            .load_commit_tree(self.refs().read_head()?.as_ref())?;

        let mut index = self.index_mut();
        let outcome = index.stage_removal(path, head_tree.contains(path))?;

        if outcome == RemovalOutcome::StagedForRemoval {
            debug!(path, "deleting working copy");
            self.workspace().remove_file(path)?;
        }

        index.write_updates()?;

        Ok(())
    }
}
