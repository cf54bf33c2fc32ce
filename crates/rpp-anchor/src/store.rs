use serde::{Deserialize, Serialize};

use rpp_types::{PmaRecord, WINDOW_ID_MASK};

use crate::error::AnchorError;

pub const MIN_DEPTH: usize = 8;
pub const MAX_DEPTH: usize = 4096;

/// Outcome of a point lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The slot holds a record for exactly this window.
    Hit(PmaRecord),
    /// The slot is held by a different window key that maps to the same index.
    Aliased { occupant: u16 },
    /// Nothing anchored here.
    Empty,
}

/// Result of [`AnchorStore::lookup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorLookup {
    pub key: u16,
    pub slot: usize,
    pub outcome: LookupOutcome,
}

impl AnchorLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self.outcome, LookupOutcome::Hit(_))
    }

    pub fn record(&self) -> Option<&PmaRecord> {
        match &self.outcome {
            LookupOutcome::Hit(record) => Some(record),
            _ => None,
        }
    }
}

/// BLAKE3 checkpoint over the occupied records of a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorDigest {
    pub hash: [u8; 32],
    pub records: usize,
}

impl AnchorDigest {
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.hash).to_hex().to_string()
    }
}

/// Which store implementation backs the router.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    /// Slot = `key mod depth`, last write wins.
    #[default]
    DirectMapped,
    /// Exact-key table with oldest-first eviction. Never aliases.
    Associative,
}

/// A fixed-capacity table of anchor records keyed by window id.
///
/// Writes and reads are whole-record atomic: a reader never observes a
/// partially written record.
pub trait AnchorStore: Send + Sync {
    /// Number of record slots.
    fn depth(&self) -> usize;

    /// Store `record` under the full 16-bit window `key`, returning the slot
    /// used. The record's 12-bit wire `window_id` must equal the key's low
    /// bits; the key itself is the tag compared on lookup.
    fn write(&self, key: u16, record: PmaRecord) -> Result<usize, AnchorError>;

    /// Point lookup by window key.
    fn lookup(&self, key: u16) -> AnchorLookup;

    /// Count of occupied slots.
    fn occupied(&self) -> usize;

    /// Up to `n` records, most recently written first.
    fn recent(&self, n: usize) -> Vec<PmaRecord>;

    /// Drop every record.
    fn clear(&self);

    /// Hash of every occupied record's wire form, in slot order.
    fn digest(&self) -> AnchorDigest;

    fn mode(&self) -> StoreMode;
}

pub(crate) fn check_key(key: u16, record: &PmaRecord) -> Result<(), AnchorError> {
    if key == 0 {
        return Err(AnchorError::InvalidWindowId(key));
    }
    if record.window_id != key & WINDOW_ID_MASK {
        return Err(AnchorError::KeyMismatch {
            key,
            window_id: record.window_id,
        });
    }
    Ok(())
}

pub(crate) fn check_depth(depth: usize) -> Result<(), AnchorError> {
    if !(MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
        return Err(AnchorError::InvalidDepth(depth));
    }
    Ok(())
}

pub(crate) fn digest_of<'a>(records: impl Iterator<Item = &'a PmaRecord>) -> AnchorDigest {
    let mut hasher = blake3::Hasher::new();
    let mut count = 0;
    for record in records {
        hasher.update(&record.to_bytes());
        count += 1;
    }
    AnchorDigest {
        hash: *hasher.finalize().as_bytes(),
        records: count,
    }
}

/// Build the store selected by `mode`.
pub fn build_store(mode: StoreMode, depth: usize) -> Result<Box<dyn AnchorStore>, AnchorError> {
    let store: Box<dyn AnchorStore> = match mode {
        StoreMode::DirectMapped => Box::new(crate::direct::DirectMappedStore::new(depth)?),
        StoreMode::Associative => Box::new(crate::associative::AssociativeStore::new(depth)?),
    };
    Ok(store)
}
