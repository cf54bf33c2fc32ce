use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::debug;

use rpp_types::PmaRecord;

use crate::error::AnchorError;
use crate::store::{
    check_depth, check_key, digest_of, AnchorDigest, AnchorLookup, AnchorStore, LookupOutcome,
    StoreMode,
};

struct Inner {
    /// Keyed by the full 16-bit window key.
    records: HashMap<u16, PmaRecord>,
    /// Keys in write order, oldest at the front.
    order: VecDeque<u16>,
}

/// Tag-checked anchor table: keyed by the full window key, so distinct
/// windows never alias. When full, the least recently written window is
/// evicted.
pub struct AssociativeStore {
    depth: usize,
    inner: Mutex<Inner>,
}

impl AssociativeStore {
    pub fn new(depth: usize) -> Result<Self, AnchorError> {
        check_depth(depth)?;
        Ok(Self {
            depth,
            inner: Mutex::new(Inner {
                records: HashMap::with_capacity(depth),
                order: VecDeque::with_capacity(depth),
            }),
        })
    }
}

impl AnchorStore for AssociativeStore {
    fn depth(&self) -> usize {
        self.depth
    }

    /// Slot reported is the record's position in write order after the write.
    fn write(&self, key: u16, record: PmaRecord) -> Result<usize, AnchorError> {
        check_key(key, &record)?;
        let mut inner = self.inner.lock();

        if inner.records.contains_key(&key) {
            inner.order.retain(|id| *id != key);
        } else if inner.records.len() >= self.depth {
            if let Some(oldest) = inner.order.pop_front() {
                inner.records.remove(&oldest);
                debug!(evicted = oldest, "Associative anchor evicted");
            }
        }
        inner.records.insert(key, record);
        inner.order.push_back(key);
        Ok(inner.order.len() - 1)
    }

    fn lookup(&self, key: u16) -> AnchorLookup {
        let inner = self.inner.lock();
        let slot = inner
            .order
            .iter()
            .position(|id| *id == key)
            .unwrap_or(self.depth);
        let outcome = match inner.records.get(&key) {
            Some(record) => LookupOutcome::Hit(*record),
            None => LookupOutcome::Empty,
        };
        AnchorLookup { key, slot, outcome }
    }

    fn occupied(&self) -> usize {
        self.inner.lock().records.len()
    }

    fn recent(&self, n: usize) -> Vec<PmaRecord> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .rev()
            .take(n)
            .filter_map(|id| inner.records.get(id).copied())
            .collect()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.records.clear();
        inner.order.clear();
    }

    /// Hashes in write order, oldest first.
    fn digest(&self) -> AnchorDigest {
        let inner = self.inner.lock();
        digest_of(inner.order.iter().filter_map(|id| inner.records.get(id)))
    }

    fn mode(&self) -> StoreMode {
        StoreMode::Associative
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpp_types::{ConsentState, PayloadType, PmaTimestamp, RppAddress, WINDOW_ID_MASK};

    fn put(store: &AssociativeStore, key: u16) {
        let record = PmaRecord::new(
            key & WINDOW_ID_MASK,
            PmaTimestamp::from_parts(42, 0),
            RppAddress::default(),
            ConsentState::Full,
            0,
            10,
            PayloadType::Empty,
            false,
        )
        .unwrap();
        store.write(key, record).unwrap();
    }

    #[test]
    fn colliding_ids_coexist() {
        let store = AssociativeStore::new(8).unwrap();
        put(&store, 0x042);
        put(&store, 0x042 + 8);
        assert!(store.lookup(0x042).is_hit());
        assert!(store.lookup(0x042 + 8).is_hit());
        assert_eq!(store.occupied(), 2);
    }

    #[test]
    fn full_key_distinguishes_shared_wire_ids() {
        let store = AssociativeStore::new(8).unwrap();
        put(&store, 0x0042);
        assert!(!store.lookup(0x1042).is_hit());
        put(&store, 0x1042);
        assert!(store.lookup(0x0042).is_hit());
        assert!(store.lookup(0x1042).is_hit());
    }

    #[test]
    fn evicts_oldest_when_full() {
        let store = AssociativeStore::new(8).unwrap();
        for id in 1..=9u16 {
            put(&store, id);
        }
        assert_eq!(store.occupied(), 8);
        assert_eq!(store.lookup(1).outcome, LookupOutcome::Empty);
        assert!(store.lookup(9).is_hit());
    }

    #[test]
    fn rewrite_refreshes_position() {
        let store = AssociativeStore::new(8).unwrap();
        for id in 1..=8u16 {
            put(&store, id);
        }
        put(&store, 1);
        put(&store, 20);
        // 2 was the oldest after 1 was rewritten.
        assert!(store.lookup(1).is_hit());
        assert!(!store.lookup(2).is_hit());
        let ids: Vec<u16> = store.recent(2).iter().map(|r| r.window_id).collect();
        assert_eq!(ids, vec![20, 1]);
    }

    #[test]
    fn clear_and_digest() {
        let store = AssociativeStore::new(8).unwrap();
        let empty = store.digest();
        put(&store, 3);
        assert_eq!(store.digest().records, 1);
        store.clear();
        assert_eq!(store.digest(), empty);
    }
}
