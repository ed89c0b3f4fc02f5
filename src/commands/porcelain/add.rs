use crate::areas::repository::Repository;
use std::collections::BTreeSet;

impl Repository {
    /// Stage the current content of each path, expanding directories
    pub fn add(&self, paths: &[String]) -> anyhow::Result<()> {
        let head_tree = self
            .database()
            .load_commit_tree(self.refs().read_head()?.as_ref())?;

        let files = paths
            .iter()
            .map(|path| self.workspace().expand_path(path))
            .collect::<anyhow::Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect::<BTreeSet<_>>();

        let mut index = self.index_mut();
        for file in files {
            let blob = self.workspace().parse_blob(&file)?;
            let blob_oid = self.database().store(&blob)?;

            index.stage_addition(&file, blob_oid, head_tree.get(&file));
        }

        index.write_updates()?;

        Ok(())
    }
}
