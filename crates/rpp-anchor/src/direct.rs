use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

use rpp_types::PmaRecord;

use crate::error::AnchorError;
use crate::store::{
    check_depth, check_key, digest_of, AnchorDigest, AnchorLookup, AnchorStore, LookupOutcome,
    StoreMode,
};

#[derive(Clone, Copy)]
struct Slot {
    /// Full 16-bit window key; the record only carries its low 12 bits.
    key: u16,
    record: PmaRecord,
    seq: u64,
}

/// Direct-mapped anchor table.
///
/// A window lives in slot `key mod depth`. Two windows that share a slot
/// clobber each other: the later write wins and the earlier window reads
/// back as [`LookupOutcome::Aliased`]. There is no chaining.
pub struct DirectMappedStore {
    slots: Box<[RwLock<Option<Slot>>]>,
    seq: AtomicU64,
}

impl DirectMappedStore {
    pub fn new(depth: usize) -> Result<Self, AnchorError> {
        check_depth(depth)?;
        Ok(Self {
            slots: (0..depth).map(|_| RwLock::new(None)).collect(),
            seq: AtomicU64::new(0),
        })
    }

    /// Slot index for a window key.
    pub fn slot_of(&self, key: u16) -> usize {
        key as usize % self.slots.len()
    }
}

impl AnchorStore for DirectMappedStore {
    fn depth(&self) -> usize {
        self.slots.len()
    }

    fn write(&self, key: u16, record: PmaRecord) -> Result<usize, AnchorError> {
        check_key(key, &record)?;
        let slot = self.slot_of(key);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);

        let mut guard = self.slots[slot].write();
        if let Some(prev) = guard.as_ref() {
            if prev.key != key {
                warn!(
                    slot,
                    evicted = prev.key,
                    incoming = key,
                    "PMA slot aliasing, evicting previous anchor"
                );
            }
        }
        *guard = Some(Slot { key, record, seq });
        debug!(slot, key, "Anchor written");
        Ok(slot)
    }

    fn lookup(&self, key: u16) -> AnchorLookup {
        let slot = self.slot_of(key);
        let outcome = match self.slots[slot].read().as_ref() {
            Some(s) if s.key == key => LookupOutcome::Hit(s.record),
            Some(s) => LookupOutcome::Aliased { occupant: s.key },
            None => LookupOutcome::Empty,
        };
        AnchorLookup { key, slot, outcome }
    }

    fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.read().is_some()).count()
    }

    fn recent(&self, n: usize) -> Vec<PmaRecord> {
        let mut held: Vec<Slot> = self.slots.iter().filter_map(|s| *s.read()).collect();
        held.sort_by_key(|s| Reverse(s.seq));
        held.into_iter().take(n).map(|s| s.record).collect()
    }

    fn clear(&self) {
        for slot in self.slots.iter() {
            *slot.write() = None;
        }
        debug!(depth = self.slots.len(), "Anchor store cleared");
    }

    fn digest(&self) -> AnchorDigest {
        let held: Vec<PmaRecord> = self
            .slots
            .iter()
            .filter_map(|s| (*s.read()).map(|slot| slot.record))
            .collect();
        digest_of(held.iter())
    }

    fn mode(&self) -> StoreMode {
        StoreMode::DirectMapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpp_types::{ConsentState, PayloadType, PmaTimestamp, RppAddress, WINDOW_ID_MASK};

    fn record(key: u16, coherence: u8) -> PmaRecord {
        PmaRecord::new(
            key & WINDOW_ID_MASK,
            PmaTimestamp::from_parts(1_700_000_000, 0),
            RppAddress::new(9, 3, 2, 150).unwrap(),
            ConsentState::Full,
            6,
            coherence,
            PayloadType::Human,
            false,
        )
        .unwrap()
    }

    fn put(store: &DirectMappedStore, key: u16, coherence: u8) -> usize {
        store.write(key, record(key, coherence)).unwrap()
    }

    #[test]
    fn write_then_lookup_hits() {
        let store = DirectMappedStore::new(64).unwrap();
        let slot = put(&store, 0x042, 40);
        assert_eq!(slot, 0x042 % 64);

        let found = store.lookup(0x042);
        assert!(found.is_hit());
        assert_eq!(found.slot, slot);
        assert_eq!(found.record().unwrap().coherence_score, 40);
    }

    #[test]
    fn alias_in_same_slot_misses() {
        let store = DirectMappedStore::new(64).unwrap();
        put(&store, 0x042, 40);

        let alias = 0x042 + 64;
        let found = store.lookup(alias);
        assert!(!found.is_hit());
        assert_eq!(found.outcome, LookupOutcome::Aliased { occupant: 0x042 });
    }

    #[test]
    fn keys_sharing_low_bits_do_not_alias() {
        let store = DirectMappedStore::new(64).unwrap();
        put(&store, 0x0042, 40);
        // Same 12-bit wire id and same slot, different key.
        let found = store.lookup(0x1042);
        assert!(!found.is_hit());
        assert_eq!(found.outcome, LookupOutcome::Aliased { occupant: 0x0042 });
    }

    #[test]
    fn key_with_zero_low_bits_is_stored() {
        let store = DirectMappedStore::new(64).unwrap();
        put(&store, 0x1000, 7);
        assert!(store.lookup(0x1000).is_hit());
        assert_eq!(store.lookup(0x1000).record().unwrap().window_id, 0);
        assert_eq!(store.occupied(), 1);
    }

    #[test]
    fn last_write_wins_per_slot() {
        let store = DirectMappedStore::new(64).unwrap();
        put(&store, 0x042, 40);
        put(&store, 0x042 + 64, 12);

        assert!(!store.lookup(0x042).is_hit());
        assert!(store.lookup(0x042 + 64).is_hit());
        assert_eq!(store.occupied(), 1);
    }

    #[test]
    fn empty_and_invalid_keys() {
        let store = DirectMappedStore::new(8).unwrap();
        assert_eq!(store.lookup(3).outcome, LookupOutcome::Empty);
        assert_eq!(
            store.write(0, record(0, 1)).unwrap_err(),
            AnchorError::InvalidWindowId(0)
        );
        assert!(matches!(
            store.write(5, record(6, 1)).unwrap_err(),
            AnchorError::KeyMismatch { key: 5, .. }
        ));
    }

    #[test]
    fn recent_is_newest_first() {
        let store = DirectMappedStore::new(16).unwrap();
        for id in 1..=5u16 {
            put(&store, id, id as u8);
        }
        let ids: Vec<u16> = store.recent(3).iter().map(|r| r.window_id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
        assert_eq!(store.recent(100).len(), 5);
    }

    #[test]
    fn digest_tracks_contents() {
        let store = DirectMappedStore::new(16).unwrap();
        let empty = store.digest();
        put(&store, 1, 10);
        let one = store.digest();
        assert_ne!(empty, one);
        assert_eq!(one.records, 1);

        store.clear();
        assert_eq!(store.occupied(), 0);
        assert_eq!(store.digest(), empty);
    }

    #[test]
    fn concurrent_writers_never_tear_records() {
        let store = DirectMappedStore::new(8).unwrap();
        std::thread::scope(|scope| {
            for t in 0..4u16 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..200u16 {
                        // Keys 8, 16, 24, 32 all share slot 0.
                        let key = 8 * (t + 1);
                        store.write(key, record(key, ((i + t) % 64) as u8)).unwrap();
                        let seen = store.lookup(key);
                        if let Some(rec) = seen.record() {
                            assert_eq!(rec.window_id, key);
                        }
                    }
                });
            }
        });
        assert_eq!(store.occupied(), 1);
    }
}
