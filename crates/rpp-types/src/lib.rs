//! # rpp-types
//!
//! Wire-level types for consent-gated packet routing.
//!
//! - [`ConsentPacketHeader`]: the 18-byte header attached to every packet,
//!   carrying the routing address, consent signals, entropy fields, the
//!   fallback vector and the coherence window link.
//! - [`RppAddress`]: 32-bit `theta/phi/omega/radius` routing address.
//! - [`PmaRecord`]: 18-byte Phase Memory Anchor record.
//! - [`ConsentState`] and [`RoutingDecision`]: 2-bit enumerations, modelled
//!   as enums internally and converted at the wire boundary only.
//!
//! Decoding a header never fails on content; integrity (`crc_valid`) and
//! address validity are reported and enforced by the router.

mod bits;

pub mod address;
pub mod consent;
pub mod crc;
pub mod decision;
pub mod error;
pub mod header;
pub mod payload;
pub mod pma;

pub use address::RppAddress;
pub use consent::{AncestralConsent, ConsentState};
pub use crc::crc8;
pub use decision::RoutingDecision;
pub use error::TypesError;
pub use header::{
    ConsentPacketHeader, ConsentPacketHeaderBuilder, DecodedHeader, FallbackVector,
    HeaderFinding, SpiralPacket, HEADER_LEN,
};
pub use payload::PayloadType;
pub use pma::{PmaRecord, PmaTimestamp, PMA_RECORD_LEN, WINDOW_ID_MASK, WINDOW_ID_MAX};
