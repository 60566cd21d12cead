//! Typed accessors over the namespaced key-value store.
//!
//! Header records are JSON; links and chain tip singletons are raw 32-byte
//! digests; the request counter is 8 big-endian bytes. A value of the wrong
//! shape is reported as corruption, never as bad input.

use crate::common::{RelayError, Result};
use crate::storage::{KvStore, Namespace};
use crate::types::{BitcoinHeader, Hash256Digest, ProofRequest, RequestId};

pub const RELAY_GENESIS: &[u8] = b"RelayGenesis";
pub const BEST_KNOWN_DIGEST: &[u8] = b"BestKnownDigest";
pub const LAST_REORG_LCA: &[u8] = b"LastReorgLCA";
const REQUEST_COUNTER: &[u8] = b"id";

// ============================================================================
// Headers and links
// ============================================================================

pub fn get_header<S: KvStore + ?Sized>(
    store: &S,
    digest: &Hash256Digest,
) -> Result<Option<BitcoinHeader>> {
    let Some(bytes) = store.get(Namespace::Headers, digest.as_bytes())? else {
        return Ok(None);
    };

    let header: BitcoinHeader = serde_json::from_slice(&bytes)
        .map_err(|e| RelayError::corrupted(format!("header {}: {}", digest, e)))?;
    if header.hash != *digest {
        return Err(RelayError::corrupted(format!(
            "header stored under {} has digest {}",
            digest, header.hash
        )));
    }

    Ok(Some(header))
}

/// Load a header, failing with `UnknownBlock` when absent
pub fn require_header<S: KvStore + ?Sized>(
    store: &S,
    digest: &Hash256Digest,
    label: &'static str,
) -> Result<BitcoinHeader> {
    get_header(store, digest)?.ok_or_else(|| RelayError::unknown_block(label, *digest))
}

pub fn has_header<S: KvStore + ?Sized>(store: &S, digest: &Hash256Digest) -> Result<bool> {
    Ok(store.has(Namespace::Headers, digest.as_bytes())?)
}

/// Store a header together with its parent link
pub fn put_header<S: KvStore + ?Sized>(store: &S, header: &BitcoinHeader) -> Result<()> {
    let record = serde_json::to_vec(header)
        .map_err(|e| RelayError::corrupted(format!("encode header {}: {}", header.hash, e)))?;

    let mut batch = crate::storage::WriteBatch::new();
    batch.put(Namespace::Headers, header.hash.as_bytes(), record);
    batch.put(
        Namespace::Links,
        header.hash.as_bytes(),
        header.prev_hash.as_bytes().to_vec(),
    );
    store.write_batch(batch)?;
    Ok(())
}

pub fn get_link<S: KvStore + ?Sized>(
    store: &S,
    digest: &Hash256Digest,
) -> Result<Option<Hash256Digest>> {
    match store.get(Namespace::Links, digest.as_bytes())? {
        Some(bytes) => Hash256Digest::from_slice(&bytes)
            .map(Some)
            .map_err(|_| RelayError::corrupted(format!("link for {}", digest))),
        None => Ok(None),
    }
}

// ============================================================================
// Chain tip singletons
// ============================================================================

pub fn get_chain_digest<S: KvStore + ?Sized>(store: &S, key: &[u8]) -> Result<Hash256Digest> {
    let bytes = store
        .get(Namespace::Chain, key)?
        .ok_or(RelayError::NotInitialized)?;
    Hash256Digest::from_slice(&bytes).map_err(|_| {
        RelayError::corrupted(format!(
            "{} has {} bytes",
            String::from_utf8_lossy(key),
            bytes.len()
        ))
    })
}

pub fn set_chain_digest<S: KvStore + ?Sized>(
    store: &S,
    key: &[u8],
    digest: &Hash256Digest,
) -> Result<()> {
    store.set(Namespace::Chain, key, digest.as_bytes().to_vec())?;
    Ok(())
}

pub fn is_initialized<S: KvStore + ?Sized>(store: &S) -> Result<bool> {
    Ok(store.has(Namespace::Chain, RELAY_GENESIS)?)
}

// ============================================================================
// Requests
// ============================================================================

pub fn get_request<S: KvStore + ?Sized>(store: &S, id: RequestId) -> Result<Option<ProofRequest>> {
    let Some(bytes) = store.get(Namespace::Requests, &id.to_be_bytes())? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| RelayError::corrupted(format!("request {}: {}", id, e)))
}

pub fn put_request<S: KvStore + ?Sized>(
    store: &S,
    id: RequestId,
    request: &ProofRequest,
) -> Result<()> {
    let record = serde_json::to_vec(request)
        .map_err(|e| RelayError::corrupted(format!("encode request {}: {}", id, e)))?;
    store.set(Namespace::Requests, &id.to_be_bytes(), record)?;
    Ok(())
}

/// Next unissued request id; zero before the first registration
pub fn next_request_id<S: KvStore + ?Sized>(store: &S) -> Result<RequestId> {
    match store.get(Namespace::RequestCounter, REQUEST_COUNTER)? {
        Some(bytes) => RequestId::from_be_slice(&bytes)
            .map_err(|_| RelayError::corrupted(format!("request counter has {} bytes", bytes.len()))),
        None => Ok(RequestId(0)),
    }
}

pub fn set_next_request_id<S: KvStore + ?Sized>(store: &S, id: RequestId) -> Result<()> {
    store.set(
        Namespace::RequestCounter,
        REQUEST_COUNTER,
        id.to_be_bytes().to_vec(),
    )?;
    Ok(())
}
