//! Host adapter
//!
//! Maps the hosting ledger's signed messages and read-only queries onto the
//! relay core. Signature checks happen before an operation reaches
//! [`Host::apply`]; the signer is only carried through to the logs.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::common::logging::{log_operation, log_relay_event, EventCategory};
use crate::common::Result;
use crate::relay::{store, GenesisState, Relay};
use crate::storage::KvStore;
use crate::types::serde_hex;
use crate::types::{
    BitcoinHeader, FilledRequest, FilledRequests, Hash256Digest, NewRequest, ProofRequest,
    RelayEvent, RequestId, SpvProof, HEADER_LENGTH,
};

// ============================================================================
// Messages
// ============================================================================

/// A state-changing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    IngestHeaderChain {
        headers: Vec<BitcoinHeader>,
    },
    IngestDifficultyChange {
        prev_epoch_start: Hash256Digest,
        headers: Vec<BitcoinHeader>,
    },
    MarkNewHeaviest {
        ancestor: Hash256Digest,
        #[serde(with = "serde_hex::fixed")]
        current_best: [u8; HEADER_LENGTH],
        #[serde(with = "serde_hex::fixed")]
        new_best: [u8; HEADER_LENGTH],
        limit: u32,
    },
    NewRequest(NewRequest),
    ProvideProof {
        filled_requests: FilledRequests,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::IngestHeaderChain { .. } => "ingest_header_chain",
            Operation::IngestDifficultyChange { .. } => "ingest_difficulty_change",
            Operation::MarkNewHeaviest { .. } => "mark_new_heaviest",
            Operation::NewRequest(_) => "new_request",
            Operation::ProvideProof { .. } => "provide_proof",
        }
    }

    pub fn category(&self) -> EventCategory {
        match self {
            Operation::IngestHeaderChain { .. } | Operation::IngestDifficultyChange { .. } => {
                EventCategory::Headers
            }
            Operation::MarkNewHeaviest { .. } => EventCategory::Reorg,
            Operation::NewRequest(_) => EventCategory::Request,
            Operation::ProvideProof { .. } => EventCategory::Proof,
        }
    }
}

/// An operation whose signer the host has already authenticated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOperation {
    pub signer: String,
    pub operation: Operation,
}

/// A read-only question about relay state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    RelayGenesis,
    BestKnownDigest,
    LastReorgLca,
    Header {
        digest: Hash256Digest,
    },
    FindAncestor {
        digest: Hash256Digest,
        offset: u32,
    },
    IsAncestor {
        digest: Hash256Digest,
        ancestor: Hash256Digest,
        limit: u32,
    },
    IsMostRecentCommonAncestor {
        ancestor: Hash256Digest,
        left: Hash256Digest,
        right: Hash256Digest,
        limit: u32,
    },
    HeaviestFromAncestor {
        ancestor: Hash256Digest,
        current_best: Hash256Digest,
        new_best: Hash256Digest,
        limit: u32,
    },
    Request {
        id: RequestId,
    },
    NextRequestId,
    CheckRequests {
        filled_requests: FilledRequests,
    },
    CheckProof {
        proof: SpvProof,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum QueryResponse {
    Digest(Hash256Digest),
    Header(BitcoinHeader),
    Bool(bool),
    Request(ProofRequest),
    RequestId(RequestId),
    Filled(Vec<FilledRequest>),
    Valid,
}

// ============================================================================
// Host
// ============================================================================

/// A relay bound to its store
pub struct Host<S> {
    relay: Relay,
    store: S,
}

impl<S: KvStore> Host<S> {
    pub fn new(relay: Relay, store: S) -> Self {
        Self { relay, store }
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_initialized(&self) -> Result<bool> {
        store::is_initialized(&self.store)
    }

    pub fn bootstrap(&self, genesis: &GenesisState) -> Result<Vec<RelayEvent>> {
        let mut events: Vec<RelayEvent> = Vec::new();
        self.relay.bootstrap(&self.store, &mut events, genesis)?;
        for event in &events {
            log_relay_event(event);
        }
        Ok(events)
    }

    /// Apply one operation and return the events it committed.
    ///
    /// A rejected operation leaves the store untouched and emits nothing.
    pub fn apply(&self, signed: &SignedOperation) -> Result<Vec<RelayEvent>> {
        let operation = &signed.operation;
        let started = Instant::now();
        let mut events: Vec<RelayEvent> = Vec::new();

        let outcome = self.dispatch(operation, &mut events);
        let duration_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

        match outcome {
            Ok(()) => {
                log_operation(
                    operation.name(),
                    operation.category(),
                    &signed.signer,
                    duration_us,
                    Ok(events.len()),
                );
                for event in &events {
                    log_relay_event(event);
                }
                Ok(events)
            }
            Err(err) => {
                log_operation(
                    operation.name(),
                    operation.category(),
                    &signed.signer,
                    duration_us,
                    Err(&err),
                );
                Err(err)
            }
        }
    }

    fn dispatch(&self, operation: &Operation, events: &mut Vec<RelayEvent>) -> Result<()> {
        let relay = &self.relay;
        let store = &self.store;
        match operation {
            Operation::IngestHeaderChain { headers } => {
                relay.ingest_header_chain(store, events, headers)
            }
            Operation::IngestDifficultyChange {
                prev_epoch_start,
                headers,
            } => relay.ingest_difficulty_change(store, events, prev_epoch_start, headers),
            Operation::MarkNewHeaviest {
                ancestor,
                current_best,
                new_best,
                limit,
            } => relay.mark_new_heaviest(store, events, ancestor, current_best, new_best, *limit),
            Operation::NewRequest(request) => {
                relay.register_request(store, events, request).map(|_| ())
            }
            Operation::ProvideProof { filled_requests } => relay
                .check_requests_filled(store, events, filled_requests)
                .map(|_| ()),
        }
    }

    /// Answer a query; never writes
    pub fn query(&self, query: &Query) -> Result<QueryResponse> {
        let relay = &self.relay;
        let store = &self.store;
        let response = match query {
            Query::RelayGenesis => QueryResponse::Digest(relay.relay_genesis(store)?),
            Query::BestKnownDigest => QueryResponse::Digest(relay.best_known_digest(store)?),
            Query::LastReorgLca => QueryResponse::Digest(relay.last_reorg_lca(store)?),
            Query::Header { digest } => QueryResponse::Header(relay.get_header(store, digest)?),
            Query::FindAncestor { digest, offset } => {
                QueryResponse::Digest(relay.find_ancestor(store, digest, *offset)?)
            }
            Query::IsAncestor {
                digest,
                ancestor,
                limit,
            } => QueryResponse::Bool(relay.is_ancestor(store, digest, ancestor, *limit)?),
            Query::IsMostRecentCommonAncestor {
                ancestor,
                left,
                right,
                limit,
            } => QueryResponse::Bool(
                relay.is_most_recent_common_ancestor(store, ancestor, left, right, *limit)?,
            ),
            Query::HeaviestFromAncestor {
                ancestor,
                current_best,
                new_best,
                limit,
            } => QueryResponse::Digest(
                relay.heaviest_from_ancestor(store, ancestor, current_best, new_best, *limit)?,
            ),
            Query::Request { id } => QueryResponse::Request(relay.get_request(store, *id)?),
            Query::NextRequestId => QueryResponse::RequestId(relay.next_request_id(store)?),
            Query::CheckRequests { filled_requests } => {
                QueryResponse::Filled(relay.check_requests(store, filled_requests)?)
            }
            Query::CheckProof { proof } => {
                relay.check_proof(proof)?;
                QueryResponse::Valid
            }
        };
        Ok(response)
    }
}
