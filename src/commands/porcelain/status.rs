use crate::areas::repository::Repository;
use crate::artifacts::status::status_info::{Status, StatusInfo};
use colored::Colorize;
use std::io::Write;

impl Repository {
    pub fn status(&self) -> anyhow::Result<StatusInfo> {
        let status_info = Status::new(self).initialize()?;
        self.print_status(&status_info)?;

        Ok(status_info)
    }

    fn print_status(&self, status_info: &StatusInfo) -> anyhow::Result<()> {
        let mut writer = self.writer();

        writeln!(writer, "=== Branches ===")?;
        for branch in status_info.branches() {
            if status_info.current_branch() == Some(branch) {
                writeln!(writer, "*{}", branch.as_ref().green())?;
            } else {
                writeln!(writer, "{branch}")?;
            }
        }
        writeln!(writer)?;

        writeln!(writer, "=== Staged Files ===")?;
        for path in status_info.staged_files() {
            writeln!(writer, "{}", path.green())?;
        }
        writeln!(writer)?;

        writeln!(writer, "=== Removed Files ===")?;
        for path in status_info.removed_files() {
            writeln!(writer, "{}", path.green())?;
        }
        writeln!(writer)?;

        writeln!(writer, "=== Modifications Not Staged For Commit ===")?;
        for (path, change) in status_info.workspace_changeset() {
            writeln!(writer, "{} {change}", path.red())?;
        }
        writeln!(writer)?;

        writeln!(writer, "=== Untracked Files ===")?;
        for path in status_info.untracked_files() {
            writeln!(writer, "{}", path.red())?;
        }
        writeln!(writer)?;

        Ok(())
    }
}
