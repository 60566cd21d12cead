//! Request Ledger

use tracing::info;

use super::{store, Relay};
use crate::common::{RelayError, Result};
use crate::storage::{KvStore, StagedStore};
use crate::types::{
    hash256, EventSink, Hash256Digest, NewRequest, ProofRequest, RelayEvent, RequestId,
    MAX_ACTION_LENGTH, MAX_PAYS_LENGTH, OUTPOINT_LENGTH,
};

impl Relay {
    /// Register a proof request and return its id
    pub fn register_request<S, E>(
        &self,
        store: &S,
        sink: &mut E,
        request: &NewRequest,
    ) -> Result<RequestId>
    where
        S: KvStore + ?Sized,
        E: EventSink + ?Sized,
    {
        if !request.spends.is_empty() && request.spends.len() != OUTPOINT_LENGTH {
            return Err(RelayError::SpendsLength(request.spends.len()));
        }
        if request.pays.len() > MAX_PAYS_LENGTH {
            return Err(RelayError::PaysLength(request.pays.len()));
        }
        if request.action.len() > MAX_ACTION_LENGTH {
            return Err(RelayError::ActionLength(request.action.len()));
        }

        let record = ProofRequest {
            spends: digest_or_none(&request.spends),
            pays: digest_or_none(&request.pays),
            pays_value: request.pays_value,
            active_state: true,
            num_confs: request.num_confs,
            origin: request.origin,
            action: request.action.clone(),
        };

        let staged = StagedStore::new(store);
        let id = store::next_request_id(&staged)?;
        store::put_request(&staged, id, &record)?;
        let next = id.next().ok_or(RelayError::RequestIdsExhausted(id))?;
        store::set_next_request_id(&staged, next)?;
        staged.commit()?;

        info!(
            target: "relay::requests",
            id = id.0,
            num_confs = request.num_confs,
            origin = %request.origin,
            "request registered"
        );
        sink.emit(RelayEvent::ProofRequest {
            request_id: id,
            pays: request.pays.clone(),
            spends: request.spends.clone(),
            value: request.pays_value,
            origin: request.origin,
        });
        Ok(id)
    }

    pub fn get_request<S: KvStore + ?Sized>(
        &self,
        store: &S,
        id: RequestId,
    ) -> Result<ProofRequest> {
        store::get_request(store, id)?.ok_or(RelayError::UnknownRequest(id))
    }

    /// Id the next registration will receive
    pub fn next_request_id<S: KvStore + ?Sized>(&self, store: &S) -> Result<RequestId> {
        store::next_request_id(store)
    }
}

fn digest_or_none(bytes: &[u8]) -> Option<Hash256Digest> {
    if bytes.is_empty() {
        None
    } else {
        Some(hash256(bytes))
    }
}
