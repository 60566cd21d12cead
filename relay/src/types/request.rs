//! Proof requests and their identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::digest::Hash256Digest;
use super::serde_hex;
use crate::common::RelayError;

/// Length of a serialized outpoint (txid + output index)
pub const OUTPOINT_LENGTH: usize = 36;

/// Longest destination script a request may name
pub const MAX_PAYS_LENGTH: usize = 50;

/// Longest opaque action payload a request may carry
pub const MAX_ACTION_LENGTH: usize = 500;

/// Sequential request identifier, persisted as 8 big-endian bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl RequestId {
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_be_slice(bytes: &[u8]) -> Result<Self, RelayError> {
        <[u8; 8]>::try_from(bytes)
            .map(|b| Self(u64::from_be_bytes(b)))
            .map_err(|_| RelayError::BadHexLen {
                expected: 8,
                actual: bytes.len(),
            })
    }

    /// `None` once the id space is used up
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts decimal or `0x`-prefixed big-endian hex
impl FromStr for RequestId {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("0x") || s.starts_with("0X") {
            return Self::from_be_slice(&serde_hex::decode(s)?);
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| RelayError::BadHex(format!("{}: {}", s, e)))
    }
}

/// Ledger the request originated from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local => write!(f, "local"),
            Origin::Remote => write!(f, "remote"),
        }
    }
}

/// A registered demand for a Bitcoin payment.
///
/// `spends` and `pays` hold the hash256 of the outpoint and of the output
/// script; `None` matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub spends: Option<Hash256Digest>,
    pub pays: Option<Hash256Digest>,
    pub pays_value: u64,
    pub active_state: bool,
    pub num_confs: u8,
    pub origin: Origin,
    #[serde(with = "serde_hex::bytes")]
    pub action: Vec<u8>,
}

/// A request closed by a proof, as it is stored after the fill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledRequest {
    pub id: RequestId,
    pub request: ProofRequest,
}

/// Registration input. Raw `spends` and `pays` are hashed on admission;
/// an empty value leaves that side unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequest {
    #[serde(with = "serde_hex::bytes", default)]
    pub spends: Vec<u8>,
    #[serde(with = "serde_hex::bytes", default)]
    pub pays: Vec<u8>,
    #[serde(default)]
    pub pays_value: u64,
    pub num_confs: u8,
    #[serde(default)]
    pub origin: Origin,
    #[serde(with = "serde_hex::bytes", default)]
    pub action: Vec<u8>,
}
