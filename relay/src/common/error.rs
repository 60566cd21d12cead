//! Error Types for the SPV Relay
//!
//! Every core operation either commits all of its writes or returns one of
//! these variants. Each variant maps to a stable wire code via
//! [`RelayError::code`] so the host can translate rejections without
//! matching on messages.

use thiserror::Error;

use crate::storage::StorageError;
use crate::types::{Hash256Digest, RequestId};

/// Root error type for relay operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    // ------------------------------------------------------------------
    // Structural
    // ------------------------------------------------------------------
    #[error("header must be exactly 80 bytes, got {0}")]
    BadHeaderLength(usize),

    #[error("digest must be exactly 32 bytes, got {0}")]
    BadHash256Digest(usize),

    #[error("bad hex string: {0}")]
    BadHex(String),

    #[error("expected {expected} bytes, got {actual}")]
    BadHexLen { expected: usize, actual: usize },

    #[error("header digest {claimed} does not match its raw bytes ({computed})")]
    WrongDigest {
        claimed: Hash256Digest,
        computed: Hash256Digest,
    },

    #[error("header {0} declares a parent that differs from its raw bytes")]
    WrongPrevHash(Hash256Digest),

    #[error("header {0} declares a merkle root that differs from its raw bytes")]
    WrongMerkleRoot(Hash256Digest),

    #[error("header chain is empty")]
    EmptyHeaderChain,

    #[error("header {0} does not extend the previous header")]
    InvalidChain(Hash256Digest),

    #[error("header {0} does not meet its target")]
    InsufficientWork(Hash256Digest),

    #[error("transaction id {0} does not match the supplied transaction")]
    WrongTxId(Hash256Digest),

    #[error("merkle proof does not reproduce the confirming header's root")]
    BadMerkleProof,

    #[error("relay has already set genesis state")]
    AlreadyInitialized,

    #[error("relay has no genesis state")]
    NotInitialized,

    // ------------------------------------------------------------------
    // Linkage
    // ------------------------------------------------------------------
    #[error("unknown block labeled {label} with digest {digest}")]
    UnknownBlock {
        label: &'static str,
        digest: Hash256Digest,
    },

    #[error("no parent link stored for {0}")]
    UnknownLink(Hash256Digest),

    #[error("invalid height: {0}")]
    BadHeight(String),

    // ------------------------------------------------------------------
    // Proof of work
    // ------------------------------------------------------------------
    #[error("target changed unexpectedly at block {0}")]
    UnexpectedRetarget(Hash256Digest),

    #[error("must provide the last header of the closing difficulty period")]
    WrongEnd,

    #[error("must provide exactly one difficulty period")]
    WrongStart,

    #[error("period header difficulties do not match")]
    PeriodMismatch,

    #[error("invalid retarget: expected bits {expected:#010x}, got {actual:#010x}")]
    BadRetarget { expected: u32, actual: u32 },

    // ------------------------------------------------------------------
    // Reorg
    // ------------------------------------------------------------------
    #[error("provided digest {provided} is not current best known, expecting {expected}")]
    NotBestKnown {
        provided: Hash256Digest,
        expected: Hash256Digest,
    },

    #[error("{0} is not the most recent common ancestor")]
    NotMostRecentAncestor(Hash256Digest),

    #[error("new best {0} is not heavier than the current best")]
    NotHeavier(Hash256Digest),

    // ------------------------------------------------------------------
    // Requests and proofs
    // ------------------------------------------------------------------
    #[error("request {0} not found")]
    UnknownRequest(RequestId),

    #[error("spends must be empty or 36 bytes, got {0}")]
    SpendsLength(usize),

    #[error("pays must be at most 50 bytes, got {0}")]
    PaysLength(usize),

    #[error("action must be at most 500 bytes, got {0}")]
    ActionLength(usize),

    #[error("vin is not a valid input vector")]
    InvalidVin,

    #[error("vout is not a valid output vector")]
    InvalidVout,

    #[error("request {0} is no longer active")]
    ClosedRequest(RequestId),

    #[error("output {output_index} does not pay request {id}")]
    RequestPays { id: RequestId, output_index: u32 },

    #[error("output {output_index} value {value} is below {required} for request {id}")]
    RequestValue {
        id: RequestId,
        output_index: u32,
        value: u64,
        required: u64,
    },

    #[error("input {input_index} does not spend the outpoint of request {id}")]
    RequestSpends { id: RequestId, input_index: u32 },

    #[error("confirming header {0} is not within the accepted history")]
    NotAncestor(Hash256Digest),

    #[error("request {id} needs {required} confirmations, proof has {actual}")]
    NotEnoughConfs {
        id: RequestId,
        required: u8,
        actual: u32,
    },

    #[error("proof must fill at least one request")]
    NoFilledRequests,

    #[error("request ids exhausted at {0}")]
    RequestIdsExhausted(RequestId),

    // ------------------------------------------------------------------
    // Storage
    // ------------------------------------------------------------------
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("store is corrupted: {0}")]
    Corrupted(String),
}

impl RelayError {
    /// Create an unknown block error
    pub fn unknown_block(label: &'static str, digest: Hash256Digest) -> Self {
        Self::UnknownBlock { label, digest }
    }

    /// Create a corruption error
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Corruption and backend failures indicate a bug in a previously
    /// accepted write rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RelayError::Corrupted(_) | RelayError::Storage(_))
    }

    /// Stable wire code for the host boundary
    pub fn code(&self) -> u32 {
        match self {
            RelayError::BadHeaderLength(_) => 101,
            RelayError::UnknownBlock { .. } | RelayError::UnknownLink(_) => 103,
            RelayError::BadHeight(_) => 104,
            RelayError::BadHash256Digest(_) => 105,
            RelayError::BadHex(_) => 106,
            RelayError::BadHexLen { .. } => 107,
            RelayError::WrongDigest { .. }
            | RelayError::WrongPrevHash(_)
            | RelayError::WrongMerkleRoot(_)
            | RelayError::EmptyHeaderChain
            | RelayError::InvalidChain(_)
            | RelayError::InsufficientWork(_)
            | RelayError::WrongTxId(_)
            | RelayError::BadMerkleProof => 108,
            RelayError::AlreadyInitialized => 109,
            RelayError::NotInitialized => 110,
            RelayError::UnexpectedRetarget(_) => 201,
            RelayError::WrongEnd => 301,
            RelayError::WrongStart => 302,
            RelayError::PeriodMismatch => 303,
            RelayError::BadRetarget { .. } => 304,
            RelayError::NotBestKnown { .. } => 403,
            RelayError::NotMostRecentAncestor(_) => 404,
            RelayError::NotHeavier(_) => 405,
            RelayError::UnknownRequest(_) => 601,
            RelayError::SpendsLength(_) => 602,
            RelayError::PaysLength(_) => 603,
            RelayError::InvalidVin => 604,
            RelayError::InvalidVout => 605,
            RelayError::ClosedRequest(_) => 606,
            RelayError::RequestPays { .. } => 607,
            RelayError::RequestValue { .. } => 608,
            RelayError::RequestSpends { .. } => 609,
            RelayError::NotAncestor(_) => 610,
            RelayError::NotEnoughConfs { .. } => 611,
            RelayError::ActionLength(_) => 612,
            RelayError::NoFilledRequests => 613,
            RelayError::RequestIdsExhausted(_) => 614,
            RelayError::Storage(_) => 701,
            RelayError::Corrupted(_) => 702,
        }
    }
}

/// Result type alias using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
