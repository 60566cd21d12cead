//! Shared Types Module
//!
//! Data types shared across the relay: digests, headers, requests, proofs
//! and events.

pub mod digest;
pub mod events;
pub mod header;
pub mod proof;
pub mod request;
pub mod serde_hex;

// Re-exports for convenience
pub use digest::{hash256, hash256_pair, Hash256Digest};
pub use events::{EventSink, RelayEvent};
pub use header::{BitcoinHeader, HEADER_LENGTH};
pub use proof::{FilledRequestInfo, FilledRequests, ProvenTransaction, SpvProof};
pub use request::{
    FilledRequest, NewRequest, Origin, ProofRequest, RequestId, MAX_ACTION_LENGTH, MAX_PAYS_LENGTH,
    OUTPOINT_LENGTH,
};
