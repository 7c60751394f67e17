//! Payload checksums.

use sha2::{Digest, Sha256};

/// CRC32 (IEEE) of `data` as eight lowercase hex digits.
pub fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32fast::hash(data))
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Incremental CRC32 over a payload read in chunks.
#[derive(Clone, Debug, Default)]
pub struct Crc32Writer {
    hasher: crc32fast::Hasher,
    len: u64,
}

impl Crc32Writer {
    /// Start an empty checksum.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.len += chunk.len() as u64;
    }

    /// Bytes consumed so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether no bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Final checksum as eight lowercase hex digits.
    pub fn finish_hex(self) -> String {
        format!("{:08x}", self.hasher.finalize())
    }
}
