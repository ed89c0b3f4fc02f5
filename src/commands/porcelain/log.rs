use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use colored::Colorize;
use std::io::Write;

const ENTRY_SEPARATOR: &str = "===";

impl Repository {
    /// First-parent history from HEAD back to the root
    pub fn log(&self) -> anyhow::Result<()> {
        let head = self.refs().resolve_head()?;

        for entry in self.commit_graph().log(head) {
            let (oid, commit) = entry?;
            self.display_commit(&oid, &commit)?;
        }

        Ok(())
    }

    /// Every commit ever made, in no particular order
    pub fn global_log(&self) -> anyhow::Result<()> {
        for (oid, commit) in self.commit_graph().global_log()? {
            self.display_commit(&oid, &commit)?;
        }

        Ok(())
    }

    pub fn find(&self, message: &str) -> anyhow::Result<()> {
        for oid in self.commit_graph().find_by_message(message)? {
            writeln!(self.writer(), "{oid}")?;
        }

        Ok(())
    }

    pub fn display_commit(&self, oid: &ObjectId, commit: &Commit) -> anyhow::Result<()> {
        let mut writer = self.writer();

        writeln!(writer, "{ENTRY_SEPARATOR}")?;
        writeln!(writer, "{}", format!("commit {oid}").yellow())?;
        if let [first, second] = commit.parents() {
            writeln!(
                writer,
                "Merge: {} {}",
                first.to_short_oid(),
                second.to_short_oid()
            )?;
        }
        writeln!(writer, "Date: {}", commit.author().readable_timestamp())?;
        writeln!(writer, "{}", commit.message())?;
        writeln!(writer)?;

        Ok(())
    }
}
