use crate::areas::repository::Repository;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use std::io::Write;

impl Repository {
    pub fn hash_object(&self, object_path: &str, write: bool) -> anyhow::Result<ObjectId> {
        let blob = self.workspace().parse_blob(object_path)?;

        let object_id = if write {
            self.database().store(&blob)?
        } else {
            blob.object_id()?
        };

        writeln!(self.writer(), "{object_id}")?;

        Ok(object_id)
    }
}
