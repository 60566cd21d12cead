//! Double-SHA256 digests.

use std::fmt;
use std::str::FromStr;

use primitive_types::U256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::serde_hex;
use crate::common::RelayError;

/// A 32-byte double-SHA256 digest in the chain's internal (little-endian)
/// byte order.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256Digest([u8; 32]);

impl Hash256Digest {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build a digest from a slice, rejecting any length other than 32
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RelayError> {
        <[u8; 32]>::try_from(bytes)
            .map(Self)
            .map_err(|_| RelayError::BadHash256Digest(bytes.len()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Interpret the digest as a little-endian unsigned integer
    pub fn to_u256(&self) -> U256 {
        U256::from_little_endian(&self.0)
    }
}

/// Double SHA256
pub fn hash256(data: &[u8]) -> Hash256Digest {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    Hash256Digest(out)
}

/// Double SHA256 of two concatenated digests (Merkle interior node)
pub fn hash256_pair(left: &Hash256Digest, right: &Hash256Digest) -> Hash256Digest {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(&left.0);
    combined[32..].copy_from_slice(&right.0);
    hash256(&combined)
}

impl From<[u8; 32]> for Hash256Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256Digest({})", self)
    }
}

impl FromStr for Hash256Digest {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&serde_hex::decode(s)?)
    }
}

impl Serialize for Hash256Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash256Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
