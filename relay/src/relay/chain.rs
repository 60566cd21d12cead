//! Chain Selector
//!
//! Ancestor walks over the link store, most-recent-common-ancestor checks,
//! heaviest-chain arbitration and the reorg transition.

use primitive_types::U256;
use tracing::{debug, info};

use super::{store, Relay};
use crate::common::{RelayError, Result};
use crate::pow::RETARGET_PERIOD;
use crate::storage::{KvStore, StagedStore};
use crate::types::{hash256, BitcoinHeader, EventSink, Hash256Digest, RelayEvent, HEADER_LENGTH};

impl Relay {
    pub fn relay_genesis<S: KvStore + ?Sized>(&self, store: &S) -> Result<Hash256Digest> {
        store::get_chain_digest(store, store::RELAY_GENESIS)
    }

    pub fn best_known_digest<S: KvStore + ?Sized>(&self, store: &S) -> Result<Hash256Digest> {
        store::get_chain_digest(store, store::BEST_KNOWN_DIGEST)
    }

    pub fn last_reorg_lca<S: KvStore + ?Sized>(&self, store: &S) -> Result<Hash256Digest> {
        store::get_chain_digest(store, store::LAST_REORG_LCA)
    }

    pub fn get_header<S: KvStore + ?Sized>(
        &self,
        store: &S,
        digest: &Hash256Digest,
    ) -> Result<BitcoinHeader> {
        store::require_header(store, digest, "requested")
    }

    /// Walk `offset` parent links back from `digest`
    pub fn find_ancestor<S: KvStore + ?Sized>(
        &self,
        store: &S,
        digest: &Hash256Digest,
        offset: u32,
    ) -> Result<Hash256Digest> {
        let mut current = *digest;
        for _ in 0..offset {
            current = store::get_link(store, &current)?.ok_or(RelayError::UnknownLink(current))?;
        }
        Ok(current)
    }

    /// True if `ancestor` is `digest` or is reached within `limit` links.
    /// A missing link ends the walk with `false`.
    pub fn is_ancestor<S: KvStore + ?Sized>(
        &self,
        store: &S,
        digest: &Hash256Digest,
        ancestor: &Hash256Digest,
        limit: u32,
    ) -> Result<bool> {
        let mut current = *digest;
        if current == *ancestor {
            return Ok(true);
        }
        for _ in 0..limit {
            current = match store::get_link(store, &current)? {
                Some(parent) => parent,
                None => return Ok(false),
            };
            if current == *ancestor {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True if `ancestor` is where the histories of `left` and `right` split.
    ///
    /// Both sides walk back in lockstep, each stopping once its predecessor
    /// is `ancestor`. The last headers visited before `ancestor` must differ,
    /// otherwise a closer common ancestor exists.
    pub fn is_most_recent_common_ancestor<S: KvStore + ?Sized>(
        &self,
        store: &S,
        ancestor: &Hash256Digest,
        left: &Hash256Digest,
        right: &Hash256Digest,
        limit: u32,
    ) -> Result<bool> {
        if ancestor == left && ancestor == right {
            return Ok(true);
        }

        let (mut left_current, mut left_prev) = (*left, *left);
        let (mut right_current, mut right_prev) = (*right, *right);

        for _ in 0..limit {
            if left_prev != *ancestor {
                left_current = left_prev;
                left_prev = match store::get_link(store, &left_prev)? {
                    Some(parent) => parent,
                    None => return Ok(false),
                };
            }
            if right_prev != *ancestor {
                right_current = right_prev;
                right_prev = match store::get_link(store, &right_prev)? {
                    Some(parent) => parent,
                    None => return Ok(false),
                };
            }
            if left_prev == *ancestor && right_prev == *ancestor {
                break;
            }
        }

        if left_prev != *ancestor || right_prev != *ancestor {
            return Ok(false);
        }
        Ok(left_current != right_current)
    }

    /// Pick the heavier of two descendants of `ancestor`.
    ///
    /// A candidate that has entered the period after the ancestor's beats
    /// one still inside it. Inside the period the taller one wins; past it,
    /// `work × (height mod 2016)` decides. Ties keep `current_best`.
    pub fn heaviest_from_ancestor<S: KvStore + ?Sized>(
        &self,
        store: &S,
        ancestor: &Hash256Digest,
        current_best: &Hash256Digest,
        new_best: &Hash256Digest,
        limit: u32,
    ) -> Result<Hash256Digest> {
        let ancestor_header = store::require_header(store, ancestor, "ancestor")?;
        let left = store::require_header(store, current_best, "current best")?;
        let right = store::require_header(store, new_best, "new best")?;

        if left.height < ancestor_header.height || right.height < ancestor_header.height {
            return Err(RelayError::BadHeight(format!(
                "descendant below ancestor at height {}",
                ancestor_header.height
            )));
        }
        if !self.is_ancestor(store, current_best, ancestor, limit)?
            || !self.is_ancestor(store, new_best, ancestor, limit)?
        {
            return Err(RelayError::NotMostRecentAncestor(*ancestor));
        }

        Ok(if prefers_new(&ancestor_header, &left, &right) {
            right.hash
        } else {
            left.hash
        })
    }

    /// Move the best known tip to `new_best` after checking that it is a
    /// strictly heavier descendant of `ancestor` than the current tip.
    pub fn mark_new_heaviest<S, E>(
        &self,
        store: &S,
        sink: &mut E,
        ancestor: &Hash256Digest,
        current_best: &[u8; HEADER_LENGTH],
        new_best: &[u8; HEADER_LENGTH],
        limit: u32,
    ) -> Result<()>
    where
        S: KvStore + ?Sized,
        E: EventSink + ?Sized,
    {
        let current_digest = hash256(current_best);
        let new_digest = hash256(new_best);

        let best_known = self.best_known_digest(store)?;
        if current_digest != best_known {
            return Err(RelayError::NotBestKnown {
                provided: current_digest,
                expected: best_known,
            });
        }
        if !store::has_header(store, &new_digest)? {
            return Err(RelayError::unknown_block("new best", new_digest));
        }
        if !store::has_header(store, ancestor)? {
            return Err(RelayError::unknown_block("ancestor", *ancestor));
        }

        if !self.is_most_recent_common_ancestor(store, ancestor, &best_known, &new_digest, limit)? {
            return Err(RelayError::NotMostRecentAncestor(*ancestor));
        }

        let heaviest = self.heaviest_from_ancestor(store, ancestor, &best_known, &new_digest, limit)?;
        if heaviest != new_digest {
            return Err(RelayError::NotHeavier(new_digest));
        }

        let staged = StagedStore::new(store);
        store::set_chain_digest(&staged, store::LAST_REORG_LCA, ancestor)?;
        store::set_chain_digest(&staged, store::BEST_KNOWN_DIGEST, &new_digest)?;
        staged.commit()?;

        info!(
            target: "relay::reorg",
            previous = %best_known,
            new = %new_digest,
            lca = %ancestor,
            "best known digest updated"
        );
        sink.emit(RelayEvent::Reorg {
            previous_best: best_known,
            new_best: new_digest,
            latest_common_ancestor: *ancestor,
        });
        Ok(())
    }
}

/// True when `right` outweighs `left`; ties go to `left`
fn prefers_new(ancestor: &BitcoinHeader, left: &BitcoinHeader, right: &BitcoinHeader) -> bool {
    // the last period of the height space ends past u32::MAX
    let period_end =
        u64::from(ancestor.height - ancestor.height % RETARGET_PERIOD) + u64::from(RETARGET_PERIOD);
    let left_in_period = u64::from(left.height) < period_end;
    let right_in_period = u64::from(right.height) < period_end;

    let decision = match (left_in_period, right_in_period) {
        (true, false) => true,
        (false, true) => false,
        (true, true) => right.height > left.height,
        (false, false) => period_work(right) > period_work(left),
    };
    debug!(
        target: "relay::reorg",
        left_height = left.height,
        right_height = right.height,
        period_end,
        decision,
        "heaviest from ancestor"
    );
    decision
}

/// Work accumulated inside the header's own period, approximated from its
/// offset and its per-block work
fn period_work(header: &BitcoinHeader) -> primitive_types::U512 {
    header
        .work()
        .full_mul(U256::from(header.height % RETARGET_PERIOD))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bootstrapped, extend, mark, retarget_to_next_period};

    #[test]
    fn test_find_ancestor() {
        let (relay, store, genesis) = bootstrapped(100);
        let headers = extend(&genesis.relay_genesis, 3, 0);
        let mut events: Vec<RelayEvent> = Vec::new();
        relay.ingest_header_chain(&store, &mut events, &headers).unwrap();

        let tip = headers[2].hash;
        assert_eq!(relay.find_ancestor(&store, &tip, 0).unwrap(), tip);
        assert_eq!(relay.find_ancestor(&store, &tip, 1).unwrap(), headers[1].hash);
        assert_eq!(
            relay.find_ancestor(&store, &tip, 3).unwrap(),
            genesis.relay_genesis.hash
        );

        // genesis links to its declared parent, which has no link of its own
        let parent = genesis.relay_genesis.prev_hash;
        assert_eq!(relay.find_ancestor(&store, &tip, 4).unwrap(), parent);
        assert_eq!(
            relay.find_ancestor(&store, &tip, 5),
            Err(RelayError::UnknownLink(parent))
        );
    }

    #[test]
    fn test_is_ancestor_limits() {
        let (relay, store, genesis) = bootstrapped(100);
        let headers = extend(&genesis.relay_genesis, 3, 0);
        let mut events: Vec<RelayEvent> = Vec::new();
        relay.ingest_header_chain(&store, &mut events, &headers).unwrap();

        let tip = headers[2].hash;
        let root = genesis.relay_genesis.hash;
        assert!(relay.is_ancestor(&store, &tip, &tip, 0).unwrap());
        assert!(relay.is_ancestor(&store, &tip, &root, 3).unwrap());
        assert!(!relay.is_ancestor(&store, &tip, &root, 2).unwrap());
        assert!(!relay.is_ancestor(&store, &root, &tip, 10).unwrap());
        assert!(!relay
            .is_ancestor(&store, &Hash256Digest::new([9; 32]), &root, 10)
            .unwrap());
    }

    #[test]
    fn test_most_recent_common_ancestor() {
        let (relay, store, genesis) = bootstrapped(100);
        let root = genesis.relay_genesis.clone();
        let trunk = extend(&root, 2, 0);
        let left = extend(&trunk[1], 2, 1);
        let right = extend(&trunk[1], 3, 2);
        let mut events: Vec<RelayEvent> = Vec::new();
        for run in [&trunk, &left, &right] {
            relay.ingest_header_chain(&store, &mut events, run).unwrap();
        }

        let fork = trunk[1].hash;
        let l = left[1].hash;
        let r = right[2].hash;

        assert!(relay.is_most_recent_common_ancestor(&store, &fork, &l, &r, 10).unwrap());
        assert!(relay.is_most_recent_common_ancestor(&store, &fork, &r, &l, 10).unwrap());
        // a more distant common ancestor is rejected
        assert!(!relay.is_most_recent_common_ancestor(&store, &trunk[0].hash, &l, &r, 10).unwrap());
        assert!(!relay.is_most_recent_common_ancestor(&store, &root.hash, &l, &r, 10).unwrap());
        // a header on one branch is not common
        assert!(!relay.is_most_recent_common_ancestor(&store, &left[0].hash, &l, &r, 10).unwrap());
        // limit too small to reach the fork
        assert!(!relay.is_most_recent_common_ancestor(&store, &fork, &l, &r, 2).unwrap());
        assert!(relay.is_most_recent_common_ancestor(&store, &fork, &l, &r, 3).unwrap());
        // trivially true when all three coincide
        assert!(relay.is_most_recent_common_ancestor(&store, &l, &l, &l, 0).unwrap());
        // one side may sit on the ancestor itself
        assert!(relay.is_most_recent_common_ancestor(&store, &fork, &fork, &r, 10).unwrap());
        // but not when the other side extends through a closer point
        assert!(!relay
            .is_most_recent_common_ancestor(&store, &trunk[0].hash, &fork, &r, 10)
            .unwrap());
    }

    #[test]
    fn test_heaviest_within_period() {
        let (relay, store, genesis) = bootstrapped(100);
        let root = genesis.relay_genesis.clone();
        let left = extend(&root, 2, 1);
        let right = extend(&root, 3, 2);
        let mut events: Vec<RelayEvent> = Vec::new();
        relay.ingest_header_chain(&store, &mut events, &left).unwrap();
        relay.ingest_header_chain(&store, &mut events, &right).unwrap();

        let (l, r) = (left[1].hash, right[2].hash);
        assert_eq!(relay.heaviest_from_ancestor(&store, &root.hash, &l, &r, 10).unwrap(), r);
        assert_eq!(relay.heaviest_from_ancestor(&store, &root.hash, &r, &l, 10).unwrap(), r);

        // equal heights keep the current best
        let r1 = right[1].hash;
        assert_eq!(relay.heaviest_from_ancestor(&store, &root.hash, &l, &r1, 10).unwrap(), l);
        assert_eq!(relay.heaviest_from_ancestor(&store, &root.hash, &r1, &l, 10).unwrap(), r1);
    }

    #[test]
    fn test_heaviest_rejects_bad_inputs() {
        let (relay, store, genesis) = bootstrapped(100);
        let root = genesis.relay_genesis.clone();
        let run = extend(&root, 2, 1);
        let mut events: Vec<RelayEvent> = Vec::new();
        relay.ingest_header_chain(&store, &mut events, &run).unwrap();

        let unknown = Hash256Digest::new([3; 32]);
        assert_eq!(
            relay.heaviest_from_ancestor(&store, &root.hash, &run[1].hash, &unknown, 10),
            Err(RelayError::unknown_block("new best", unknown))
        );
        assert!(matches!(
            relay.heaviest_from_ancestor(&store, &run[1].hash, &root.hash, &run[1].hash, 10),
            Err(RelayError::BadHeight(_))
        ));
        assert_eq!(
            relay.heaviest_from_ancestor(&store, &run[0].hash, &run[1].hash, &run[1].hash, 0),
            Err(RelayError::NotMostRecentAncestor(run[0].hash))
        );
    }

    #[test]
    fn test_heaviest_prefers_new_period() {
        // ancestor at 2014; left stays in the period, right crosses into the next
        let (relay, store, genesis) = bootstrapped(2014);
        let root = genesis.relay_genesis.clone();
        let left = extend(&root, 1, 1);
        let mut events: Vec<RelayEvent> = Vec::new();
        relay.ingest_header_chain(&store, &mut events, &left).unwrap();
        let right = retarget_to_next_period(&relay, &store, &genesis, 2);

        let (l, r) = (left[0].hash, right.hash);
        assert!(right.height >= 2016);
        assert_eq!(relay.heaviest_from_ancestor(&store, &root.hash, &l, &r, 10).unwrap(), r);
        assert_eq!(relay.heaviest_from_ancestor(&store, &root.hash, &r, &l, 10).unwrap(), r);
    }

    #[test]
    fn test_heaviest_past_period_compares_period_work() {
        let (relay, store, genesis) = bootstrapped(2014);
        let root = genesis.relay_genesis.clone();
        let opening = retarget_to_next_period(&relay, &store, &genesis, 2);
        let left = extend(&opening, 1, 3);
        let right = extend(&opening, 3, 4);
        let mut events: Vec<RelayEvent> = Vec::new();
        relay.ingest_header_chain(&store, &mut events, &left).unwrap();
        relay.ingest_header_chain(&store, &mut events, &right).unwrap();

        let (l, r) = (left[0].hash, right[2].hash);
        assert_eq!(relay.heaviest_from_ancestor(&store, &root.hash, &l, &r, 10).unwrap(), r);
        assert_eq!(relay.heaviest_from_ancestor(&store, &root.hash, &r, &l, 10).unwrap(), r);

        // the opening header has no work inside its own period yet
        let o = opening.hash;
        assert_eq!(relay.heaviest_from_ancestor(&store, &root.hash, &o, &l, 10).unwrap(), l);
        assert_eq!(relay.heaviest_from_ancestor(&store, &root.hash, &l, &o, 10).unwrap(), l);

        mark(&relay, &store, &root, &root, &right[2]);
        assert_eq!(
            relay.mark_new_heaviest(&store, &mut events, &o, &right[2].raw, &left[0].raw, 10),
            Err(RelayError::NotHeavier(l))
        );
        assert_eq!(relay.best_known_digest(&store).unwrap(), r);
    }

    #[test]
    fn test_heaviest_in_last_period_of_height_space() {
        let (relay, store, genesis) = bootstrapped(u32::MAX - 10);
        let root = genesis.relay_genesis.clone();
        let left = extend(&root, 2, 1);
        let right = extend(&root, 3, 2);
        let mut events: Vec<RelayEvent> = Vec::new();
        relay.ingest_header_chain(&store, &mut events, &left).unwrap();
        relay.ingest_header_chain(&store, &mut events, &right).unwrap();

        let (l, r) = (left[1].hash, right[2].hash);
        assert_eq!(relay.heaviest_from_ancestor(&store, &root.hash, &l, &r, 10).unwrap(), r);
        assert_eq!(relay.heaviest_from_ancestor(&store, &root.hash, &r, &l, 10).unwrap(), r);

        mark(&relay, &store, &root, &root, &right[2]);
        assert_eq!(relay.best_known_digest(&store).unwrap(), r);
    }

    #[test]
    fn test_period_work_scales_with_offset() {
        let (_, _, genesis) = bootstrapped(100);
        let a = extend(&genesis.relay_genesis, 2, 0);
        assert!(period_work(&a[1]) > period_work(&a[0]));
    }
}
