use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::RppAddress;
use crate::bits::{BitReader, BitWriter};
use crate::consent::ConsentState;
use crate::crc::crc8;
use crate::error::{check_range, TypesError};
use crate::payload::PayloadType;

/// Record size on the wire; matches the header size.
pub const PMA_RECORD_LEN: usize = 18;
/// Window ids are 12 bits. 0 never names a window.
pub const WINDOW_ID_BITS: u32 = 12;
pub const WINDOW_ID_MASK: u16 = 0x0FFF;
pub const WINDOW_ID_INVALID: u16 = 0x000;
/// Highest id handed out by window allocation. 0xFFF is reserved.
pub const WINDOW_ID_MAX: u16 = 0xFFE;
pub const COMPLECOUNT_SCORE_MAX: u8 = 31;
pub const COHERENCE6_MAX: u8 = 63;

const SECONDS_MASK: u64 = 0x3_FFFF_FFFF;
const NANOS_MASK: u64 = 0x3FFF_FFFF;

/// 64-bit anchor timestamp: seconds in bits 63..30, nanoseconds in bits 29..0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PmaTimestamp(pub u64);

impl PmaTimestamp {
    pub fn from_parts(seconds: u64, nanos: u32) -> Self {
        let seconds = (seconds & SECONDS_MASK) << 30;
        Self(seconds | (nanos as u64 & NANOS_MASK))
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let seconds = at.timestamp().max(0) as u64;
        Self::from_parts(seconds, at.timestamp_subsec_nanos())
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn seconds(&self) -> u64 {
        (self.0 >> 30) & SECONDS_MASK
    }

    pub fn nanos(&self) -> u32 {
        (self.0 & NANOS_MASK) as u32
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds() as i64, self.nanos())
    }
}

/// Phase Memory Anchor record: the outcome of one routing decision for a
/// coherence window, kept so later packets can check for drift.
///
/// Wire layout (144 bits, MSB first):
/// `window_id:12 timestamp:64 phase_vector:32 consent:2 complecount:5
///  coherence:6 payload_type:4 fallback:1 reserved:10 crc:8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmaRecord {
    pub window_id: u16,
    pub timestamp: PmaTimestamp,
    pub phase_vector: RppAddress,
    pub consent_state: ConsentState,
    pub complecount_score: u8,
    /// 6-bit coherence, 0..=63.
    pub coherence_score: u8,
    pub payload_type: PayloadType,
    pub fallback_triggered: bool,
}

impl PmaRecord {
    /// Build a record, rejecting fields wider than their wire slots.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        window_id: u16,
        timestamp: PmaTimestamp,
        phase_vector: RppAddress,
        consent_state: ConsentState,
        complecount_score: u8,
        coherence_score: u8,
        payload_type: PayloadType,
        fallback_triggered: bool,
    ) -> Result<Self, TypesError> {
        check_range("window_id", window_id as u64, WINDOW_ID_MASK as u64)?;
        check_range(
            "complecount_score",
            complecount_score as u64,
            COMPLECOUNT_SCORE_MAX as u64,
        )?;
        check_range(
            "coherence_score",
            coherence_score as u64,
            COHERENCE6_MAX as u64,
        )?;
        Ok(Self {
            window_id,
            timestamp,
            phase_vector,
            consent_state,
            complecount_score,
            coherence_score,
            payload_type,
            fallback_triggered,
        })
    }

    /// A record names a window and carries a timestamp.
    pub fn is_valid(&self) -> bool {
        self.window_id != WINDOW_ID_INVALID && self.timestamp.0 != 0
    }

    pub fn to_bytes(&self) -> [u8; PMA_RECORD_LEN] {
        let mut buf = [0u8; PMA_RECORD_LEN];
        let mut w = BitWriter::new(&mut buf);
        w.put(self.window_id as u64, WINDOW_ID_BITS);
        w.put(self.timestamp.0, 64);
        w.put(self.phase_vector.to_raw() as u64, 32);
        w.put(self.consent_state.code() as u64, 2);
        w.put(self.complecount_score as u64, 5);
        w.put(self.coherence_score as u64, 6);
        w.put(self.payload_type.nibble() as u64, 4);
        w.put_bool(self.fallback_triggered);
        w.put(0, 10);
        debug_assert_eq!(w.position(), (PMA_RECORD_LEN - 1) * 8);
        buf[PMA_RECORD_LEN - 1] = crc8(&buf[..PMA_RECORD_LEN - 1]);
        buf
    }

    /// Decode and verify a record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        if bytes.len() != PMA_RECORD_LEN {
            return Err(TypesError::Truncated {
                expected: PMA_RECORD_LEN,
                actual: bytes.len(),
            });
        }
        let computed = crc8(&bytes[..PMA_RECORD_LEN - 1]);
        let stored = bytes[PMA_RECORD_LEN - 1];
        if computed != stored {
            return Err(TypesError::CrcMismatch { computed, stored });
        }

        let mut r = BitReader::new(bytes);
        Ok(Self {
            window_id: r.take(WINDOW_ID_BITS) as u16,
            timestamp: PmaTimestamp(r.take(64)),
            phase_vector: RppAddress::from_raw(r.take(32) as u32),
            consent_state: ConsentState::from_code(r.take_u8(2)),
            complecount_score: r.take_u8(5),
            coherence_score: r.take_u8(6),
            payload_type: PayloadType::from_nibble(r.take_u8(4)),
            fallback_triggered: r.take_bool(),
        })
    }
}

impl std::fmt::Display for PmaRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pma:{:#05x}(θ={} coherence={}/63 consent={})",
            self.window_id,
            self.phase_vector.theta(),
            self.coherence_score,
            self.consent_state
        )
    }
}
