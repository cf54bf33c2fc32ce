//! # rpp-anchor
//!
//! Phase Memory Anchor (PMA) store: a small fixed-depth table of
//! [`PmaRecord`](rpp_types::PmaRecord)s keyed by coherence window id.
//!
//! The router writes one record per successful decision on a linked window
//! and reads it back on the next packet for that window to measure
//! coherence drift.
//!
//! - [`DirectMappedStore`] is the default. Window `w` lives in slot
//!   `w mod depth`; windows sharing a slot clobber each other and a lookup
//!   only hits when the occupant's full 16-bit key matches.
//! - [`AssociativeStore`] is the opt-in tag-checked variant with oldest-first
//!   eviction.
//!
//! [`WindowAllocator`] hands out window ids for senders that do not pick
//! their own.

pub mod allocator;
pub mod associative;
pub mod direct;
pub mod error;
pub mod store;

pub use allocator::WindowAllocator;
pub use associative::AssociativeStore;
pub use direct::DirectMappedStore;
pub use error::AnchorError;
pub use store::{
    build_store, AnchorDigest, AnchorLookup, AnchorStore, LookupOutcome, StoreMode, MAX_DEPTH,
    MIN_DEPTH,
};
