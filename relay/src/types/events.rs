//! Events emitted by committed operations.

use serde::{Deserialize, Serialize};

use super::digest::Hash256Digest;
use super::request::{Origin, RequestId};
use super::serde_hex;

/// A typed event with stable string attributes for the host's indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// Headers were appended to the store
    Extension {
        first_block: Hash256Digest,
        last_block: Hash256Digest,
    },
    /// The best known tip moved
    Reorg {
        previous_best: Hash256Digest,
        new_best: Hash256Digest,
        latest_common_ancestor: Hash256Digest,
    },
    /// A request was registered
    ProofRequest {
        request_id: RequestId,
        #[serde(with = "serde_hex::bytes")]
        pays: Vec<u8>,
        #[serde(with = "serde_hex::bytes")]
        spends: Vec<u8>,
        value: u64,
        origin: Origin,
    },
    /// A proof filled one or more requests
    ProofProvided {
        txid: Hash256Digest,
        filled: Vec<RequestId>,
    },
}

impl RelayEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            RelayEvent::Extension { .. } => "extension",
            RelayEvent::Reorg { .. } => "reorg",
            RelayEvent::ProofRequest { .. } => "proof_request",
            RelayEvent::ProofProvided { .. } => "proof_provided",
        }
    }

    /// Ordered key/value attributes
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        match self {
            RelayEvent::Extension {
                first_block,
                last_block,
            } => vec![
                ("first_block", first_block.to_string()),
                ("last_block", last_block.to_string()),
            ],
            RelayEvent::Reorg {
                previous_best,
                new_best,
                latest_common_ancestor,
            } => vec![
                ("previous_best", previous_best.to_string()),
                ("new_best", new_best.to_string()),
                ("latest_common_ancestor", latest_common_ancestor.to_string()),
            ],
            RelayEvent::ProofRequest {
                request_id,
                pays,
                spends,
                value,
                origin,
            } => vec![
                ("request_id", request_id.to_string()),
                ("pays", serde_hex::encode(pays)),
                ("spends", serde_hex::encode(spends)),
                ("value", value.to_string()),
                ("origin", origin.to_string()),
            ],
            RelayEvent::ProofProvided { txid, filled } => {
                let ids: Vec<u64> = filled.iter().map(|id| id.0).collect();
                vec![
                    ("txid", txid.to_string()),
                    (
                        "filled",
                        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string()),
                    ),
                ]
            }
        }
    }
}

/// Append-only destination for committed events
pub trait EventSink {
    fn emit(&mut self, event: RelayEvent);
}

impl EventSink for Vec<RelayEvent> {
    fn emit(&mut self, event: RelayEvent) {
        self.push(event);
    }
}
