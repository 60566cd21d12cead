//! SPV Relay - Bitcoin header relay with proof-of-payment verification
//!
//! The relay keeps a validated view of Bitcoin's header chain inside a host
//! ledger and answers whether a Bitcoin transaction paying a registered
//! request is buried deeply enough under the accepted history.
//!
//! ## Components
//!
//! 1. **Header Validator** - Linkage, PoW and retarget checks on ingest
//! 2. **Chain Selector** - Ancestry walks and heaviest-chain reorgs
//! 3. **Request Ledger** - Registered payment requests
//! 4. **Proof Verifier** - Merkle inclusion and request matching
//!
//! The [`host`] module adapts signed host messages and queries onto the
//! core; [`storage`] provides the key-value backends it runs against.

pub mod common;
pub mod host;
pub mod pow;
pub mod relay;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports: core
pub use relay::{GenesisState, Relay, RelayParams};

// Re-exports: host boundary
pub use host::{Host, Operation, Query, QueryResponse, SignedOperation};

// Re-exports: errors and config
pub use common::{RelayConfig, RelayError, Result};

// Re-exports: storage
pub use storage::{KvStore, MemoryStore, SqliteStore};

// Re-exports: types
pub use types::{
    BitcoinHeader, EventSink, FilledRequest, FilledRequestInfo, FilledRequests, Hash256Digest,
    NewRequest, Origin, ProofRequest, RelayEvent, RequestId, SpvProof,
};
