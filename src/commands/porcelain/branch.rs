use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::objects::object_id::ObjectId;
use tracing::info;

impl Repository {
    /// Create a branch at the current HEAD commit; HEAD stays where it is
    pub fn branch(&self, branch_name: &str) -> anyhow::Result<ObjectId> {
        let branch_name = BranchName::try_parse(branch_name.to_string())?;
        let source_oid = self.refs().resolve_head()?;

        self.refs().create_branch(&branch_name, &source_oid)?;
        info!(branch = %branch_name, oid = %source_oid, "created branch");

        Ok(source_oid)
    }

    /// Delete a branch pointer, leaving its commits in the store
    pub fn rm_branch(&self, branch_name: &str) -> anyhow::Result<ObjectId> {
        let branch_name = BranchName::try_parse(branch_name.to_string())?;

        self.refs().delete_branch(&branch_name)
    }
}
