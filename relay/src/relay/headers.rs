//! Header Validator
//!
//! Plain extensions must keep the anchor's difficulty and stay inside one
//! difficulty period. Retargets go through [`Relay::ingest_difficulty_change`],
//! which checks the closing period before ingesting the new one.

use tracing::debug;

use super::{store, Relay};
use crate::common::{RelayError, Result};
use crate::pow::{self, RETARGET_PERIOD};
use crate::storage::{KvStore, StagedStore};
use crate::types::{BitcoinHeader, EventSink, Hash256Digest, RelayEvent};

impl Relay {
    /// Validate and store a contiguous run of headers extending a stored anchor
    pub fn ingest_header_chain<S, E>(
        &self,
        store: &S,
        sink: &mut E,
        headers: &[BitcoinHeader],
    ) -> Result<()>
    where
        S: KvStore + ?Sized,
        E: EventSink + ?Sized,
    {
        let staged = StagedStore::new(store);
        let (first_block, last_block) = stage_header_chain(&staged, headers, false)?;
        staged.commit()?;

        debug!(
            target: "relay::headers",
            count = headers.len(),
            first = %first_block,
            last = %last_block,
            "ingested header chain"
        );
        sink.emit(RelayEvent::Extension {
            first_block,
            last_block,
        });
        Ok(())
    }

    /// Validate a retarget against the closing period, then ingest
    pub fn ingest_difficulty_change<S, E>(
        &self,
        store: &S,
        sink: &mut E,
        prev_epoch_start: &Hash256Digest,
        headers: &[BitcoinHeader],
    ) -> Result<()>
    where
        S: KvStore + ?Sized,
        E: EventSink + ?Sized,
    {
        let first = headers.first().ok_or(RelayError::EmptyHeaderChain)?;
        first.validate()?;

        let start = store::require_header(store, prev_epoch_start, "prev epoch start")?;
        let anchor = store::require_header(store, &first.prev_hash, "anchor")?;

        if anchor.height % RETARGET_PERIOD != RETARGET_PERIOD - 1 {
            return Err(RelayError::WrongEnd);
        }
        if start.height.checked_add(RETARGET_PERIOD - 1) != Some(anchor.height) {
            return Err(RelayError::WrongStart);
        }
        if start.bits() != anchor.bits() {
            return Err(RelayError::PeriodMismatch);
        }

        let expected = pow::retarget_target(
            start.target(),
            start.timestamp(),
            anchor.timestamp(),
            self.params().pow_limit,
        );
        if first.target() != pow::truncate_target(expected) {
            return Err(RelayError::BadRetarget {
                expected: pow::bits_from_target(expected),
                actual: first.bits(),
            });
        }
        debug!(
            target: "relay::headers",
            old_bits = start.bits(),
            new_bits = first.bits(),
            "retarget accepted"
        );

        let staged = StagedStore::new(store);
        let (first_block, last_block) = stage_header_chain(&staged, headers, true)?;
        staged.commit()?;

        sink.emit(RelayEvent::Extension {
            first_block,
            last_block,
        });
        Ok(())
    }
}

/// Validate `headers` against their stored anchor and stage them.
///
/// With `retarget` set the first header may change the difficulty and the
/// rest must match it.
pub(crate) fn stage_header_chain<S: KvStore + ?Sized>(
    store: &S,
    headers: &[BitcoinHeader],
    retarget: bool,
) -> Result<(Hash256Digest, Hash256Digest)> {
    let (first, last) = match (headers.first(), headers.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(RelayError::EmptyHeaderChain),
    };
    for header in headers {
        header.validate()?;
    }

    let anchor = store::require_header(store, &first.prev_hash, "anchor")?;
    let bits = if retarget { first.bits() } else { anchor.bits() };
    validate_extension(&anchor, headers, bits, retarget)?;

    for header in headers {
        store::put_header(store, header)?;
    }
    Ok((first.hash, last.hash))
}

/// Linkage, height, difficulty and PoW checks for a run extending `anchor`.
/// Digest fields must already be validated.
pub(crate) fn validate_extension(
    anchor: &BitcoinHeader,
    headers: &[BitcoinHeader],
    bits: u32,
    retarget: bool,
) -> Result<()> {
    let mut previous = anchor;
    for (i, header) in headers.iter().enumerate() {
        if header.prev_hash != previous.hash {
            return Err(RelayError::InvalidChain(header.hash));
        }

        if previous.height.checked_add(1) != Some(header.height) {
            return Err(RelayError::BadHeight(format!(
                "header {} at height {} follows height {}",
                header.hash, header.height, previous.height
            )));
        }

        let opens_period = header.height % RETARGET_PERIOD == 0;
        if header.bits() != bits || (opens_period && !(retarget && i == 0)) {
            return Err(RelayError::UnexpectedRetarget(header.hash));
        }

        if !pow::hash_meets_target(&header.hash, header.bits()) {
            return Err(RelayError::InsufficientWork(header.hash));
        }

        previous = header;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Namespace};
    use crate::test_support::{bootstrapped, extend, mine, retarget_bits, EASY_BITS};

    #[test]
    fn test_ingest_extends_genesis() {
        let (relay, store, genesis) = bootstrapped(100);
        let headers = extend(&genesis.relay_genesis, 3, 1);
        let mut events: Vec<RelayEvent> = Vec::new();

        relay.ingest_header_chain(&store, &mut events, &headers).unwrap();

        for header in &headers {
            assert!(store::has_header(&store, &header.hash).unwrap());
        }
        assert_eq!(
            events,
            vec![RelayEvent::Extension {
                first_block: headers[0].hash,
                last_block: headers[2].hash,
            }]
        );
    }

    #[test]
    fn test_empty_chain_rejected() {
        let (relay, store, _) = bootstrapped(100);
        let mut events: Vec<RelayEvent> = Vec::new();
        assert_eq!(
            relay.ingest_header_chain(&store, &mut events, &[]),
            Err(RelayError::EmptyHeaderChain)
        );
    }

    #[test]
    fn test_unknown_anchor_rejected() {
        let (relay, store, _) = bootstrapped(100);
        let orphan_parent = mine(&Hash256Digest::new([4; 32]), 9, 1_600_000_000, EASY_BITS, 100);
        let headers = extend(&orphan_parent, 2, 0);
        let before = MemoryStore::count(&store, Namespace::Headers).unwrap();

        let mut events: Vec<RelayEvent> = Vec::new();
        assert_eq!(
            relay.ingest_header_chain(&store, &mut events, &headers),
            Err(RelayError::unknown_block("anchor", orphan_parent.hash))
        );
        assert_eq!(MemoryStore::count(&store, Namespace::Headers).unwrap(), before);
        assert!(events.is_empty());
    }

    #[test]
    fn test_bad_height_rejected() {
        let (relay, store, genesis) = bootstrapped(100);
        let mut headers = extend(&genesis.relay_genesis, 2, 0);
        headers[1].height += 1;

        let mut events: Vec<RelayEvent> = Vec::new();
        assert!(matches!(
            relay.ingest_header_chain(&store, &mut events, &headers),
            Err(RelayError::BadHeight(_))
        ));
        assert!(!store::has_header(&store, &headers[0].hash).unwrap());
    }

    #[test]
    fn test_broken_linkage_rejected() {
        let (relay, store, genesis) = bootstrapped(100);
        let first = extend(&genesis.relay_genesis, 1, 0);
        let stray = extend(&genesis.relay_genesis, 1, 7);
        let headers = vec![first[0].clone(), extend(&stray[0], 1, 0)[0].clone()];

        let mut events: Vec<RelayEvent> = Vec::new();
        assert_eq!(
            relay.ingest_header_chain(&store, &mut events, &headers),
            Err(RelayError::InvalidChain(headers[1].hash))
        );
    }

    #[test]
    fn test_changed_bits_rejected() {
        let (relay, store, genesis) = bootstrapped(100);
        let parent = &genesis.relay_genesis;
        let header = mine(
            &parent.hash,
            1,
            parent.timestamp() + 600,
            0x2001fffe,
            parent.height + 1,
        );

        let mut events: Vec<RelayEvent> = Vec::new();
        assert_eq!(
            relay.ingest_header_chain(&store, &mut events, &[header.clone()]),
            Err(RelayError::UnexpectedRetarget(header.hash))
        );
    }

    #[test]
    fn test_period_boundary_needs_retarget() {
        let (relay, store, genesis) = bootstrapped(2014);
        let headers = extend(&genesis.relay_genesis, 2, 0);
        assert_eq!(headers[1].height, 2016);

        let mut events: Vec<RelayEvent> = Vec::new();
        assert_eq!(
            relay.ingest_header_chain(&store, &mut events, &headers),
            Err(RelayError::UnexpectedRetarget(headers[1].hash))
        );
        assert!(!store::has_header(&store, &headers[0].hash).unwrap());
    }

    #[test]
    fn test_validate_extension_rejects_weak_header() {
        let (_, _, genesis) = bootstrapped(100);
        let parent = &genesis.relay_genesis;

        // find a nonce that misses the target
        let mut raw = parent.raw;
        raw[4..36].copy_from_slice(parent.hash.as_bytes());
        let mut nonce = 0u32;
        let weak = loop {
            raw[76..80].copy_from_slice(&nonce.to_le_bytes());
            let candidate = BitcoinHeader::from_raw(raw, parent.height + 1);
            if !candidate.meets_target() {
                break candidate;
            }
            nonce += 1;
        };

        assert_eq!(
            validate_extension(parent, &[weak.clone()], EASY_BITS, false),
            Err(RelayError::InsufficientWork(weak.hash))
        );
    }

    #[test]
    fn test_reingest_is_idempotent() {
        let (relay, store, genesis) = bootstrapped(100);
        let headers = extend(&genesis.relay_genesis, 2, 0);
        let mut events: Vec<RelayEvent> = Vec::new();

        relay.ingest_header_chain(&store, &mut events, &headers).unwrap();
        let count = store.count(Namespace::Headers).unwrap();
        relay.ingest_header_chain(&store, &mut events, &headers).unwrap();

        assert_eq!(store.count(Namespace::Headers).unwrap(), count);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_retarget_needs_start_of_closing_period() {
        let (relay, store, genesis) = bootstrapped(2014);
        let anchor = extend(&genesis.relay_genesis, 1, 0).remove(0);
        let mut events: Vec<RelayEvent> = Vec::new();
        relay
            .ingest_header_chain(&store, &mut events, &[anchor.clone()])
            .unwrap();

        let bits = retarget_bits(&relay, &genesis.period_start, &anchor);
        let next = mine(&anchor.hash, 0, anchor.timestamp() + 600, bits, anchor.height + 1);

        // genesis sits 1 header before the anchor, not 2015
        assert_eq!(
            relay.ingest_difficulty_change(
                &store,
                &mut events,
                &genesis.relay_genesis.hash,
                &[next.clone()]
            ),
            Err(RelayError::WrongStart)
        );
        assert!(!store::has_header(&store, &next.hash).unwrap());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_retarget_needs_matching_period_bits() {
        let (relay, store, genesis) = bootstrapped(2014);
        let anchor = extend(&genesis.relay_genesis, 1, 0).remove(0);
        let mut events: Vec<RelayEvent> = Vec::new();
        relay
            .ingest_header_chain(&store, &mut events, &[anchor.clone()])
            .unwrap();

        // a height-0 header from another chain with different difficulty
        let foreign_start = mine(
            &Hash256Digest::new([0xab; 32]),
            5,
            genesis.period_start.timestamp(),
            0x2001fffe,
            0,
        );
        store::put_header(&store, &foreign_start).unwrap();

        let bits = retarget_bits(&relay, &foreign_start, &anchor);
        let next = mine(&anchor.hash, 0, anchor.timestamp() + 600, bits, anchor.height + 1);
        assert_eq!(
            relay.ingest_difficulty_change(&store, &mut events, &foreign_start.hash, &[next.clone()]),
            Err(RelayError::PeriodMismatch)
        );
        assert!(!store::has_header(&store, &next.hash).unwrap());
    }
}
