//! Hex helpers shared by the relay's wire types.
//!
//! Byte strings travel as `0x`-prefixed lowercase hex. Parsing accepts the
//! prefix as optional.

use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

use crate::common::RelayError;

/// Encode bytes as `0x`-prefixed hex
pub fn encode(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex with an optional `0x` prefix
pub fn decode(s: &str) -> Result<Vec<u8>, RelayError> {
    let trimmed = s.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(stripped).map_err(|e| RelayError::BadHex(format!("{}: {}", s, e)))
}

/// Decode hex into exactly `N` bytes
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], RelayError> {
    let bytes = decode(s)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| RelayError::BadHexLen {
        expected: N,
        actual: bytes.len(),
    })
}

/// `#[serde(with = "serde_hex::bytes")]` for variable-length byte strings
pub mod bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode(&s).map_err(D::Error::custom)
    }
}

/// `#[serde(with = "serde_hex::fixed")]` for fixed-size byte arrays
pub mod fixed {
    use super::*;

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        decode_fixed::<N>(&s).map_err(D::Error::custom)
    }
}
