//! SPV proofs and proof submissions.

use bitcoin::consensus::encode;
use bitcoin::{TxIn, TxOut};
use serde::{Deserialize, Serialize};

use super::digest::{hash256, hash256_pair, Hash256Digest};
use super::header::BitcoinHeader;
use super::request::RequestId;
use super::serde_hex;
use crate::common::RelayError;

/// Merkle inclusion proof for one transaction under a confirming header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpvProof {
    #[serde(with = "serde_hex::fixed")]
    pub version: [u8; 4],
    /// Consensus-encoded input vector, length prefix included
    #[serde(with = "serde_hex::bytes")]
    pub vin: Vec<u8>,
    /// Consensus-encoded output vector, length prefix included
    #[serde(with = "serde_hex::bytes")]
    pub vout: Vec<u8>,
    #[serde(with = "serde_hex::fixed")]
    pub locktime: [u8; 4],
    pub tx_id: Hash256Digest,
    /// Position of the transaction in the block
    pub index: u32,
    pub confirming_header: BitcoinHeader,
    /// Sibling hashes from leaf to root, 32 bytes each
    #[serde(with = "serde_hex::bytes")]
    pub intermediate_nodes: Vec<u8>,
}

/// Decoded inputs and outputs of a proven transaction
#[derive(Debug, Clone)]
pub struct ProvenTransaction {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

impl ProvenTransaction {
    /// hash256 of the 36-byte outpoint consumed by input `index`
    pub fn outpoint_digest(&self, index: u32) -> Option<Hash256Digest> {
        let input = self.inputs.get(index as usize)?;
        Some(hash256(&encode::serialize(&input.previous_output)))
    }

    /// hash256 of the script and the value paid by output `index`
    pub fn output_digest(&self, index: u32) -> Option<(Hash256Digest, u64)> {
        let output = self.outputs.get(index as usize)?;
        Some((
            hash256(output.script_pubkey.as_bytes()),
            output.value.to_sat(),
        ))
    }
}

impl SpvProof {
    /// Structural validation: decodes vin and vout, binds the txid to
    /// them and walks the Merkle path up to the confirming header's root.
    pub fn validate(&self) -> Result<ProvenTransaction, RelayError> {
        let inputs: Vec<TxIn> =
            encode::deserialize(&self.vin).map_err(|_| RelayError::InvalidVin)?;
        if inputs.is_empty() {
            return Err(RelayError::InvalidVin);
        }

        let outputs: Vec<TxOut> =
            encode::deserialize(&self.vout).map_err(|_| RelayError::InvalidVout)?;
        if outputs.is_empty() {
            return Err(RelayError::InvalidVout);
        }

        if self.compute_tx_id() != self.tx_id {
            return Err(RelayError::WrongTxId(self.tx_id));
        }

        self.confirming_header.validate()?;

        if !self.verify_merkle_path() {
            return Err(RelayError::BadMerkleProof);
        }

        Ok(ProvenTransaction { inputs, outputs })
    }

    /// hash256(version || vin || vout || locktime)
    pub fn compute_tx_id(&self) -> Hash256Digest {
        let mut preimage =
            Vec::with_capacity(8 + self.vin.len() + self.vout.len());
        preimage.extend_from_slice(&self.version);
        preimage.extend_from_slice(&self.vin);
        preimage.extend_from_slice(&self.vout);
        preimage.extend_from_slice(&self.locktime);
        hash256(&preimage)
    }

    fn verify_merkle_path(&self) -> bool {
        if self.intermediate_nodes.len() % 32 != 0 {
            return false;
        }

        let depth = self.intermediate_nodes.len() / 32;
        // index bits above the path would name a different leaf
        if depth < 32 && (self.index >> depth) != 0 {
            return false;
        }

        let mut current = self.tx_id;
        let mut index = self.index;
        for chunk in self.intermediate_nodes.chunks_exact(32) {
            let sibling = match Hash256Digest::from_slice(chunk) {
                Ok(sibling) => sibling,
                Err(_) => return false,
            };
            current = if index & 1 == 1 {
                hash256_pair(&sibling, &current)
            } else {
                hash256_pair(&current, &sibling)
            };
            index >>= 1;
        }

        current == self.confirming_header.merkle_root
    }
}

/// One claim that a proven transaction fills a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledRequestInfo {
    pub input_index: u32,
    pub output_index: u32,
    pub id: RequestId,
}

/// A proof together with the requests it claims to fill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledRequests {
    pub proof: SpvProof,
    pub filled: Vec<FilledRequestInfo>,
}
