use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::errors::RepositoryError;
use anyhow::Context;
use std::fs;
use std::io::Write;
use tracing::info;

impl Repository {
    pub fn init(&self) -> anyhow::Result<()> {
        if self.is_initialized() {
            anyhow::bail!(RepositoryError::AlreadyInitialized(
                self.path().display().to_string()
            ));
        }

        fs::create_dir_all(self.database().objects_path())
            .context("Failed to create .gitlet/objects directory")?;

        self.refs()
            .init_head(&BranchName::default_branch())
            .context("Failed to create initial HEAD reference")?;

        self.index_mut()
            .write_updates()
            .context("Failed to create .gitlet/index file")?;

        info!(path = %self.path().display(), "initialized repository");
        writeln!(
            self.writer(),
            "Initialized empty gitlet repository in {}",
            self.metadata_path().display()
        )?;

        Ok(())
    }
}
