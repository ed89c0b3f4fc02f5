//! Object identifier (SHA-1 hash)
//!
//! Object ids are 40-character hexadecimal strings. They identify blobs,
//! trees and commits alike, and double as the object's location on disk:
//! `.gitlet/objects/<first-2-chars>/<remaining-38-chars>`.

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object::sha1_hex;
use std::io;
use std::path::PathBuf;

/// Length of an abbreviated id as printed by `log` and `commit`
pub const SHORT_OBJECT_ID_LENGTH: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object id from a 40-character hex string
    pub fn try_parse(id: String) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(anyhow::anyhow!("Invalid object ID length: {}", id.len()));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow::anyhow!("Invalid object ID characters: {}", id));
        }
        Ok(Self(id.to_ascii_lowercase()))
    }

    /// Hash raw serialized content into its id
    pub fn digest(content: &[u8]) -> Self {
        Self(sha1_hex(content))
    }

    /// Write the id in binary format (20 bytes)
    pub fn write_h40_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        let hex40 = self.as_ref();

        for i in (0..OBJECT_ID_LENGTH).step_by(2) {
            let byte = u8::from_str_radix(&hex40[i..i + 2], 16)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Invalid hex digit"))?;
            writer.write_all(&[byte])?;
        }

        Ok(())
    }

    /// Read an id from binary format (20 bytes)
    pub fn read_h40_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut raw = [0u8; OBJECT_ID_LENGTH / 2];
        reader.read_exact(&mut raw)?;

        let hex40 = raw.iter().map(|byte| format!("{byte:02x}")).collect();
        Self::try_parse(hex40)
    }

    /// Split the hash as `XX/YYYYYY...` for object storage
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    pub fn to_short_oid(&self) -> String {
        self.0.split_at(SHORT_OBJECT_ID_LENGTH).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::proptest;

    proptest! {
        #[test]
        fn binary_form_preserves_the_hex_id(id in "[0-9a-f]{40}") {
            let oid = ObjectId::try_parse(id.clone()).unwrap();
            let mut raw = Vec::new();
            oid.write_h40_to(&mut raw).unwrap();

            assert_eq!(raw.len(), 20);
            let read = ObjectId::read_h40_from(&mut raw.as_slice()).unwrap();
            assert_eq!(read.as_ref(), id.as_str());
        }

        #[test]
        fn ids_of_wrong_length_are_rejected(id in "[0-9a-f]{1,39}") {
            assert!(ObjectId::try_parse(id).is_err());
        }
    }

    #[test]
    fn digest_matches_known_sha1() {
        // sha1("blob 0\0"), the empty blob
        let oid = ObjectId::digest(b"blob 0\0");
        assert_eq!(oid.as_ref(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
        assert_eq!(oid.to_short_oid(), "e69de29");
        assert_eq!(
            oid.to_path(),
            PathBuf::from("e6").join("9de29bb2d1d6434b8b29ae775ad8c2e48c5391")
        );
    }
}
