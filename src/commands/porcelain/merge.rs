use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::merge::merge_engine::{MergeEngine, MergeOutcome};
use crate::artifacts::objects::commit::Author;
use std::io::Write;

impl Repository {
    /// Merge `branch_name` into the current branch and update the working
    /// directory to the result
    ///
    /// Untracked files and unstaged edits are checked before anything is
    /// written, so a refused merge leaves the repository untouched.
    pub fn merge(&self, branch_name: &str) -> anyhow::Result<MergeOutcome> {
        let target = BranchName::try_parse(branch_name.to_string())?;
        let engine = MergeEngine::new(self);

        let plan = engine.prepare(&target)?;
        let migration = match engine.target_tree(&plan)? {
            Some(tree) => {
                self.ensure_no_unstaged_changes()?;
                Some(self.plan_migration(&tree)?)
            }
            None => None,
        };

        let outcome = engine.execute(plan, Author::load_from_env)?;
        if let Some(migration) = &migration {
            self.apply_migration(migration)?;
        }

        let mut writer = self.writer();
        match &outcome {
            MergeOutcome::AlreadyUpToDate => {
                writeln!(writer, "Given branch is an ancestor of the current branch.")?;
            }
            MergeOutcome::FastForward { .. } => {
                writeln!(writer, "Current branch fast-forwarded.")?;
            }
            MergeOutcome::Merged { commit, .. } => {
                if outcome.has_conflicts() {
                    writeln!(writer, "Encountered a merge conflict.")?;
                }
                writeln!(writer, "Merge made by commit {}.", commit.to_short_oid())?;
            }
        }

        Ok(outcome)
    }
}
