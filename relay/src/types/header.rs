//! Bitcoin block headers as the relay stores them.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use super::digest::{hash256, Hash256Digest};
use super::serde_hex;
use crate::common::RelayError;
use crate::pow;

/// Length of a serialized block header
pub const HEADER_LENGTH: usize = 80;

/// A raw 80-byte header plus the metadata the host attaches to it.
///
/// `hash`, `prev_hash` and `merkle_root` are redundant with `raw`; call
/// [`BitcoinHeader::validate`] before trusting them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitcoinHeader {
    #[serde(with = "serde_hex::fixed")]
    pub raw: [u8; HEADER_LENGTH],
    pub hash: Hash256Digest,
    pub height: u32,
    pub prev_hash: Hash256Digest,
    pub merkle_root: Hash256Digest,
}

impl BitcoinHeader {
    /// Build a header from raw bytes, deriving every digest field
    pub fn from_raw(raw: [u8; HEADER_LENGTH], height: u32) -> Self {
        Self {
            hash: hash256(&raw),
            prev_hash: digest_at(&raw, 4),
            merkle_root: digest_at(&raw, 36),
            raw,
            height,
        }
    }

    /// Parse a hex-encoded raw header
    pub fn from_hex(s: &str, height: u32) -> Result<Self, RelayError> {
        let bytes = serde_hex::decode(s)?;
        let raw = <[u8; HEADER_LENGTH]>::try_from(bytes.as_slice())
            .map_err(|_| RelayError::BadHeaderLength(bytes.len()))?;
        Ok(Self::from_raw(raw, height))
    }

    /// Check the declared digest fields against the raw bytes
    pub fn validate(&self) -> Result<(), RelayError> {
        let computed = hash256(&self.raw);
        if computed != self.hash {
            return Err(RelayError::WrongDigest {
                claimed: self.hash,
                computed,
            });
        }
        if digest_at(&self.raw, 4) != self.prev_hash {
            return Err(RelayError::WrongPrevHash(self.hash));
        }
        if digest_at(&self.raw, 36) != self.merkle_root {
            return Err(RelayError::WrongMerkleRoot(self.hash));
        }
        Ok(())
    }

    pub fn version(&self) -> i32 {
        i32::from_le_bytes(word_at(&self.raw, 0))
    }

    pub fn timestamp(&self) -> u32 {
        u32::from_le_bytes(word_at(&self.raw, 68))
    }

    pub fn bits(&self) -> u32 {
        u32::from_le_bytes(word_at(&self.raw, 72))
    }

    pub fn nonce(&self) -> u32 {
        u32::from_le_bytes(word_at(&self.raw, 76))
    }

    /// Target decoded from the header's compact bits
    pub fn target(&self) -> U256 {
        pow::target_from_bits(self.bits())
    }

    /// Expected hashes represented by this header
    pub fn work(&self) -> U256 {
        pow::work_from_bits(self.bits())
    }

    /// True when the header hash meets its own target
    pub fn meets_target(&self) -> bool {
        pow::hash_meets_target(&hash256(&self.raw), self.bits())
    }
}

fn digest_at(raw: &[u8; HEADER_LENGTH], offset: usize) -> Hash256Digest {
    let mut out = [0u8; 32];
    out.copy_from_slice(&raw[offset..offset + 32]);
    Hash256Digest::new(out)
}

fn word_at(raw: &[u8; HEADER_LENGTH], offset: usize) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&raw[offset..offset + 4]);
    out
}
