//! Header mining and fixtures shared by the unit tests.
//!
//! Headers are mined at test time against an easy target, so a valid nonce
//! turns up within a few hundred attempts.

use bitcoin::consensus::encode;
use bitcoin::hashes::Hash;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, TxIn, TxOut, Txid, Witness};

use crate::pow::{self, RETARGET_PERIOD};
use crate::relay::{GenesisState, Relay};
use crate::storage::MemoryStore;
use crate::types::{
    hash256, hash256_pair, BitcoinHeader, Hash256Digest, RelayEvent, SpvProof, HEADER_LENGTH,
};

/// About one in 256 hashes meets this target
pub(crate) const EASY_BITS: u32 = 0x2000ffff;

pub(crate) const BASE_TIME: u32 = 1_600_000_000;

/// Sibling of every proven transaction in [`spv_proof`]
pub(crate) const SIBLING: Hash256Digest = Hash256Digest::new([0x11; 32]);

pub(crate) fn mine_with_root(
    prev: &Hash256Digest,
    merkle_root: &Hash256Digest,
    timestamp: u32,
    bits: u32,
    height: u32,
) -> BitcoinHeader {
    let mut raw = [0u8; HEADER_LENGTH];
    raw[0..4].copy_from_slice(&4i32.to_le_bytes());
    raw[4..36].copy_from_slice(prev.as_bytes());
    raw[36..68].copy_from_slice(merkle_root.as_bytes());
    raw[68..72].copy_from_slice(&timestamp.to_le_bytes());
    raw[72..76].copy_from_slice(&bits.to_le_bytes());

    for nonce in 0..=u32::MAX {
        raw[76..80].copy_from_slice(&nonce.to_le_bytes());
        let header = BitcoinHeader::from_raw(raw, height);
        if header.meets_target() {
            return header;
        }
    }
    panic!("no nonce meets bits {:#010x}", bits);
}

/// Mine a header whose merkle root is derived from `salt`
pub(crate) fn mine(
    prev: &Hash256Digest,
    salt: u8,
    timestamp: u32,
    bits: u32,
    height: u32,
) -> BitcoinHeader {
    mine_with_root(prev, &hash256(&[salt]), timestamp, bits, height)
}

/// `count` headers on top of `parent`, ten minutes apart
pub(crate) fn extend(parent: &BitcoinHeader, count: usize, salt: u8) -> Vec<BitcoinHeader> {
    let mut out: Vec<BitcoinHeader> = Vec::with_capacity(count);
    for _ in 0..count {
        let tip = out.last().unwrap_or(parent);
        let next = mine(
            &tip.hash,
            salt,
            tip.timestamp() + 600,
            tip.bits(),
            tip.height + 1,
        );
        out.push(next);
    }
    out
}

/// Genesis at `height` with its period start. The period so far ran at
/// twenty-minute blocks, so the next retarget eases the target.
pub(crate) fn genesis_state(height: u32) -> GenesisState {
    let start_height = height - height % RETARGET_PERIOD;
    let period_start = mine(
        &Hash256Digest::new([0xee; 32]),
        0xf0,
        BASE_TIME,
        EASY_BITS,
        start_height,
    );
    let relay_genesis = if start_height == height {
        period_start.clone()
    } else {
        mine(
            &Hash256Digest::new([0xdd; 32]),
            0xf1,
            BASE_TIME + (height - start_height) * 1200,
            EASY_BITS,
            height,
        )
    };

    GenesisState {
        relay_genesis,
        period_start,
        headers: Vec::new(),
    }
}

pub(crate) fn bootstrapped(height: u32) -> (Relay, MemoryStore, GenesisState) {
    let relay = Relay::default();
    let store = MemoryStore::new();
    let genesis = genesis_state(height);
    let mut events: Vec<RelayEvent> = Vec::new();
    relay.bootstrap(&store, &mut events, &genesis).unwrap();
    (relay, store, genesis)
}

/// Bits the header after `end` must carry
pub(crate) fn retarget_bits(relay: &Relay, start: &BitcoinHeader, end: &BitcoinHeader) -> u32 {
    pow::bits_from_target(pow::retarget_target(
        start.target(),
        start.timestamp(),
        end.timestamp(),
        relay.params().pow_limit,
    ))
}

/// Extend genesis to the end of its period, then ingest the retarget
/// header opening the next one. Returns the retarget header.
pub(crate) fn retarget_to_next_period(
    relay: &Relay,
    store: &MemoryStore,
    genesis: &GenesisState,
    salt: u8,
) -> BitcoinHeader {
    let mut events: Vec<RelayEvent> = Vec::new();
    let mut anchor = genesis.relay_genesis.clone();

    let remaining = RETARGET_PERIOD - 1 - anchor.height % RETARGET_PERIOD;
    if remaining > 0 {
        let run = extend(&anchor, remaining as usize, salt);
        relay.ingest_header_chain(store, &mut events, &run).unwrap();
        anchor = run[run.len() - 1].clone();
    }

    let bits = retarget_bits(relay, &genesis.period_start, &anchor);
    let next = mine(
        &anchor.hash,
        salt,
        anchor.timestamp() + 600,
        bits,
        anchor.height + 1,
    );
    relay
        .ingest_difficulty_change(store, &mut events, &genesis.period_start.hash, &[next.clone()])
        .unwrap();
    next
}

/// Move the best tip from `current` to `new`, recording `ancestor` as LCA
pub(crate) fn mark(
    relay: &Relay,
    store: &MemoryStore,
    ancestor: &BitcoinHeader,
    current: &BitcoinHeader,
    new: &BitcoinHeader,
) {
    let mut events: Vec<RelayEvent> = Vec::new();
    relay
        .mark_new_heaviest(
            store,
            &mut events,
            &ancestor.hash,
            &current.raw,
            &new.raw,
            RETARGET_PERIOD,
        )
        .unwrap();
}

/// 36-byte outpoint as it appears in a consensus-encoded input
pub(crate) fn outpoint_bytes(txid: [u8; 32], vout: u32) -> Vec<u8> {
    let mut out = txid.to_vec();
    out.extend_from_slice(&vout.to_le_bytes());
    out
}

/// Consensus-encoded vin and vout of a one-input one-output payment
pub(crate) fn payment(spent: ([u8; 32], u32), script: &[u8], value: u64) -> (Vec<u8>, Vec<u8>) {
    let input = TxIn {
        previous_output: OutPoint {
            txid: Txid::from_byte_array(spent.0),
            vout: spent.1,
        },
        script_sig: ScriptBuf::new(),
        sequence: Sequence::MAX,
        witness: Witness::new(),
    };
    let output = TxOut {
        value: Amount::from_sat(value),
        script_pubkey: ScriptBuf::from_bytes(script.to_vec()),
    };
    (
        encode::serialize(&vec![input]),
        encode::serialize(&vec![output]),
    )
}

/// Proof for a transaction at index 1 of a two-transaction block mined on
/// `parent`. The confirming header is not ingested.
pub(crate) fn spv_proof(vin: Vec<u8>, vout: Vec<u8>, parent: &BitcoinHeader) -> SpvProof {
    let mut proof = SpvProof {
        version: [2, 0, 0, 0],
        vin,
        vout,
        locktime: [0; 4],
        tx_id: Hash256Digest::default(),
        index: 1,
        confirming_header: parent.clone(),
        intermediate_nodes: SIBLING.to_bytes().to_vec(),
    };
    proof.tx_id = proof.compute_tx_id();

    let root = hash256_pair(&SIBLING, &proof.tx_id);
    proof.confirming_header = mine_with_root(
        &parent.hash,
        &root,
        parent.timestamp() + 600,
        parent.bits(),
        parent.height + 1,
    );
    proof
}
