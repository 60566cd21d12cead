//! Genesis bootstrap
//!
//! A relay starts from a trusted header rather than from Bitcoin's genesis
//! block. The header opening the trusted header's difficulty period is
//! stored alongside it so the first retarget can be checked.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::headers::validate_extension;
use super::{store, Relay};
use crate::common::{RelayError, Result};
use crate::pow::RETARGET_PERIOD;
use crate::storage::{KvStore, StagedStore};
use crate::types::{BitcoinHeader, EventSink, RelayEvent};

/// Initial state of a relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub relay_genesis: BitcoinHeader,
    pub period_start: BitcoinHeader,
    /// Optional headers extending `relay_genesis`
    #[serde(default)]
    pub headers: Vec<BitcoinHeader>,
}

impl Relay {
    /// Initialise an empty store from a genesis state
    pub fn bootstrap<S, E>(&self, store: &S, sink: &mut E, genesis: &GenesisState) -> Result<()>
    where
        S: KvStore + ?Sized,
        E: EventSink + ?Sized,
    {
        if store::is_initialized(store)? {
            return Err(RelayError::AlreadyInitialized);
        }

        let root = &genesis.relay_genesis;
        let start = &genesis.period_start;
        for header in [root, start] {
            header.validate()?;
            if !header.meets_target() {
                return Err(RelayError::InsufficientWork(header.hash));
            }
        }

        let expected_start = root.height - root.height % RETARGET_PERIOD;
        if start.height != expected_start {
            return Err(RelayError::BadHeight(format!(
                "period start at height {}, expected {}",
                start.height, expected_start
            )));
        }
        if start.bits() != root.bits() {
            return Err(RelayError::PeriodMismatch);
        }
        if start.height == root.height && start.hash != root.hash {
            return Err(RelayError::WrongStart);
        }

        if let Some(first) = genesis.headers.first() {
            if first.prev_hash != root.hash {
                return Err(RelayError::unknown_block("anchor", first.prev_hash));
            }
            for header in &genesis.headers {
                header.validate()?;
            }
            validate_extension(root, &genesis.headers, root.bits(), false)?;
        }

        let best = genesis.headers.last().unwrap_or(root);

        let staged = StagedStore::new(store);
        store::put_header(&staged, start)?;
        store::put_header(&staged, root)?;
        for header in &genesis.headers {
            store::put_header(&staged, header)?;
        }
        store::set_chain_digest(&staged, store::RELAY_GENESIS, &root.hash)?;
        store::set_chain_digest(&staged, store::LAST_REORG_LCA, &root.hash)?;
        store::set_chain_digest(&staged, store::BEST_KNOWN_DIGEST, &best.hash)?;
        staged.commit()?;

        info!(
            target: "relay::genesis",
            genesis = %root.hash,
            height = root.height,
            best = %best.hash,
            "relay initialised"
        );
        if let (Some(first), Some(last)) = (genesis.headers.first(), genesis.headers.last()) {
            sink.emit(RelayEvent::Extension {
                first_block: first.hash,
                last_block: last.hash,
            });
        }
        Ok(())
    }
}
