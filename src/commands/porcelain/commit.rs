use crate::areas::repository::Repository;
use crate::artifacts::branch::HEAD_ALIAS;
use crate::artifacts::objects::commit::Author;
use crate::artifacts::objects::object_id::ObjectId;
use std::io::Write;

impl Repository {
    pub fn commit(&self, message: &str) -> anyhow::Result<ObjectId> {
        let is_root = self.refs().read_head()?.is_none();
        let author = Author::load_from_env()?;

        let commit_oid = {
            let mut index = self.index_mut();
            self.commit_graph().commit(message, &mut index, author)?
        };
        let commit = self.database().load_commit(&commit_oid)?;

        let branch = match self.refs().current_branch()? {
            Some(branch_name) => branch_name.to_string(),
            None => HEAD_ALIAS.to_string(),
        };
        let root_marker = if is_root { " (root-commit)" } else { "" };

        writeln!(
            self.writer(),
            "[{}{} {}] {}",
            branch,
            root_marker,
            commit_oid.to_short_oid(),
            commit.short_message()
        )?;

        Ok(commit_oid)
    }
}
