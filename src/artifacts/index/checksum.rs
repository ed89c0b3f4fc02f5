use crate::artifacts::index::CHECKSUM_SIZE;
use anyhow::anyhow;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};

/// Reader/writer that hashes every byte passing through it
///
/// The index ends with the SHA-1 of everything before it; this wrapper keeps
/// the running digest so the trailer can be written or verified.
#[derive(Debug)]
pub struct Checksum<F> {
    file: F,
    digest: Sha1,
}

impl<F> Checksum<F> {
    pub(crate) fn new(file: F) -> Self {
        Checksum {
            file,
            digest: Sha1::new(),
        }
    }
}

impl<F: Read> Checksum<F> {
    pub(crate) fn read(&mut self, size: usize) -> anyhow::Result<Bytes> {
        let mut buffer = vec![0; size];
        self.file
            .read_exact(&mut buffer)
            .map_err(|_| anyhow!("Unexpected end-of-file while reading index"))?;

        self.digest.update(&buffer);
        Ok(Bytes::from(buffer))
    }

    /// Read up to and including the next NUL byte
    pub(crate) fn read_until_nul(&mut self) -> anyhow::Result<Bytes> {
        let mut buffer = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            self.file
                .read_exact(&mut byte)
                .map_err(|_| anyhow!("Unexpected end-of-file while reading index path"))?;
            buffer.push(byte[0]);
            if byte[0] == 0 {
                break;
            }
        }

        self.digest.update(&buffer);
        Ok(Bytes::from(buffer))
    }

    pub(crate) fn verify(&mut self) -> anyhow::Result<()> {
        let mut expected_checksum = [0u8; CHECKSUM_SIZE];
        self.file.read_exact(&mut expected_checksum)?;

        let actual_checksum = self.digest.clone().finalize();

        if expected_checksum != actual_checksum.as_slice() {
            return Err(anyhow!("Checksum does not match value stored on disk"));
        }

        Ok(())
    }
}

impl<F: Write> Checksum<F> {
    pub(crate) fn write(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.file.write_all(data)?;
        self.digest.update(data);
        Ok(())
    }

    pub(crate) fn write_checksum(&mut self) -> anyhow::Result<()> {
        let checksum = self.digest.clone().finalize();
        self.file
            .write_all(checksum.as_slice())
            .map_err(|_| anyhow!("Failed to write checksum to index file"))?;

        Ok(())
    }
}
