//! Proof Verifier
//!
//! A proof fills requests only when its confirming header is part of the
//! accepted history (at or behind the last reorg LCA) and the best tip is
//! far enough ahead of it.

use tracing::{debug, info};

use super::{store, Relay};
use crate::common::{RelayError, Result};
use crate::storage::{KvStore, StagedStore};
use crate::types::{
    EventSink, FilledRequest, FilledRequests, Hash256Digest, ProofRequest, ProvenTransaction,
    RelayEvent, RequestId, SpvProof,
};

impl Relay {
    /// Verify a proof against the requests it claims to fill and close them.
    /// Returns the closed requests in claim order.
    pub fn check_requests_filled<S, E>(
        &self,
        store: &S,
        sink: &mut E,
        filled: &FilledRequests,
    ) -> Result<Vec<FilledRequest>>
    where
        S: KvStore + ?Sized,
        E: EventSink + ?Sized,
    {
        let staged = StagedStore::new(store);
        let closed = self.stage_filled_requests(&staged, filled)?;
        staged.commit()?;

        info!(
            target: "relay::proofs",
            txid = %filled.proof.tx_id,
            count = closed.len(),
            "requests filled"
        );
        sink.emit(RelayEvent::ProofProvided {
            txid: filled.proof.tx_id,
            filled: closed.iter().map(|c| c.id).collect(),
        });
        Ok(closed)
    }

    /// Run every check of [`Relay::check_requests_filled`] without writing.
    /// Returns the requests as the fill would leave them.
    pub fn check_requests<S: KvStore + ?Sized>(
        &self,
        store: &S,
        filled: &FilledRequests,
    ) -> Result<Vec<FilledRequest>> {
        let staged = StagedStore::new(store);
        self.stage_filled_requests(&staged, filled)
    }

    /// Structural validation only; no chain state is consulted
    pub fn check_proof(&self, proof: &SpvProof) -> Result<()> {
        proof.validate().map(|_| ())
    }

    fn stage_filled_requests<S: KvStore + ?Sized>(
        &self,
        store: &S,
        filled: &FilledRequests,
    ) -> Result<Vec<FilledRequest>> {
        if filled.filled.is_empty() {
            return Err(RelayError::NoFilledRequests);
        }
        let tx = filled.proof.validate()?;
        let confs = self.confirmations(store, &filled.proof)?;

        let mut closed = Vec::with_capacity(filled.filled.len());
        for info in &filled.filled {
            let mut request = store::get_request(store, info.id)?
                .ok_or(RelayError::UnknownRequest(info.id))?;

            if !request.active_state {
                return Err(RelayError::ClosedRequest(info.id));
            }
            if confs < u32::from(request.num_confs) {
                return Err(RelayError::NotEnoughConfs {
                    id: info.id,
                    required: request.num_confs,
                    actual: confs,
                });
            }
            check_spends(&tx, info.id, info.input_index, &request.spends)?;
            check_pays(&tx, info.id, info.output_index, &request)?;

            request.active_state = false;
            store::put_request(store, info.id, &request)?;
            closed.push(FilledRequest {
                id: info.id,
                request,
            });
        }
        Ok(closed)
    }

    /// Depth of the confirming header under the best known tip
    fn confirmations<S: KvStore + ?Sized>(&self, store: &S, proof: &SpvProof) -> Result<u32> {
        let confirming =
            store::require_header(store, &proof.confirming_header.hash, "confirming header")?;
        let lca = self.last_reorg_lca(store)?;
        if !self.is_ancestor(store, &lca, &confirming.hash, self.params().proof_lookback)? {
            return Err(RelayError::NotAncestor(confirming.hash));
        }

        let best_digest = self.best_known_digest(store)?;
        let best = store::require_header(store, &best_digest, "best known")?;
        let confs = best.height.saturating_sub(confirming.height);
        debug!(
            target: "relay::proofs",
            confirming = %confirming.hash,
            confs,
            "confirming header accepted"
        );
        Ok(confs)
    }
}

fn check_spends(
    tx: &ProvenTransaction,
    id: RequestId,
    input_index: u32,
    spends: &Option<Hash256Digest>,
) -> Result<()> {
    let outpoint = tx
        .outpoint_digest(input_index)
        .ok_or(RelayError::RequestSpends { id, input_index })?;
    match spends {
        Some(expected) if *expected != outpoint => {
            Err(RelayError::RequestSpends { id, input_index })
        }
        _ => Ok(()),
    }
}

fn check_pays(
    tx: &ProvenTransaction,
    id: RequestId,
    output_index: u32,
    request: &ProofRequest,
) -> Result<()> {
    let (script, value) = tx
        .output_digest(output_index)
        .ok_or(RelayError::RequestPays { id, output_index })?;
    if let Some(expected) = request.pays {
        if expected != script {
            return Err(RelayError::RequestPays { id, output_index });
        }
    }
    if value < request.pays_value {
        return Err(RelayError::RequestValue {
            id,
            output_index,
            value,
            required: request.pays_value,
        });
    }
    Ok(())
}
