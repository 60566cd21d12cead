//! Relay Core
//!
//! Header validation, chain selection, the request ledger and the proof
//! verifier. Every operation takes the store (and, when it writes, an event
//! sink) explicitly, so independent relays can share nothing.
//!
//! Writing operations stage into a [`StagedStore`](crate::storage::StagedStore)
//! and commit once at the end; events are emitted only after that commit.

pub mod chain;
pub mod genesis;
pub mod headers;
pub mod proofs;
pub mod requests;
pub mod store;

use primitive_types::U256;

use crate::common::{Network, DEFAULT_PROOF_LOOKBACK};

pub use genesis::GenesisState;

/// Policy parameters of a relay instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayParams {
    /// Links a confirming header may sit behind the last reorg LCA
    pub proof_lookback: u32,
    /// Easiest target a retarget may produce
    pub pow_limit: U256,
}

impl RelayParams {
    pub fn for_network(network: Network) -> Self {
        Self {
            proof_lookback: DEFAULT_PROOF_LOOKBACK,
            pow_limit: network.pow_limit(),
        }
    }
}

impl Default for RelayParams {
    fn default() -> Self {
        Self::for_network(Network::default())
    }
}

/// The relay state machine
#[derive(Debug, Clone, Default)]
pub struct Relay {
    params: RelayParams,
}

impl Relay {
    pub fn new(params: RelayParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RelayParams {
        &self.params
    }
}
