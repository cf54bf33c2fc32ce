use serde::{Deserialize, Serialize};

use crate::address::RppAddress;
use crate::bits::{BitReader, BitWriter};
use crate::consent::AncestralConsent;
use crate::crc::crc8;
use crate::error::{check_range, TypesError};
use crate::payload::PayloadType;

/// Header size on the wire.
pub const HEADER_LEN: usize = 18;
/// Bytes covered by the header CRC.
pub const HEADER_CRC_SPAN: usize = HEADER_LEN - 1;
/// Entropy above this value requests the fallback address.
pub const FALLBACK_ENTROPY_THRESHOLD: u8 = 25;
/// Largest payload that keeps a framed packet within 64 KiB.
pub const MAX_PAYLOAD: usize = 65_535 - HEADER_LEN;

pub const SOMATIC_MAX: u8 = 15;
pub const ENTROPY_MAX: u8 = 31;
pub const COMPLECOUNT_MAX: u8 = 7;

/// Packed 8-bit fallback vector: `theta_offset(3) | phi_offset(3) | omega_offset(2)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FallbackVector(pub u8);

impl FallbackVector {
    pub fn from_offsets(theta_offset: u8, phi_offset: u8, omega_offset: u8) -> Self {
        let theta = (theta_offset & 0x07) << 5;
        let phi = (phi_offset & 0x07) << 2;
        Self(theta | phi | (omega_offset & 0x03))
    }

    pub fn theta_offset(&self) -> u8 {
        (self.0 >> 5) & 0x07
    }

    pub fn phi_offset(&self) -> u8 {
        (self.0 >> 2) & 0x07
    }

    pub fn omega_offset(&self) -> u8 {
        self.0 & 0x03
    }
}

/// Consent packet header (144 bits, big-endian).
///
/// ```text
/// bytes 0-3   address          theta:5 phi:3 omega:3 radius:8 reserved:13
/// bytes 4-7   packet_id
/// bytes 8-9   origin_ref
/// byte  10    verbal:1 somatic:4 ancestral:2 temporal_lock:1
/// byte  11    phase_entropy_index:5 complecount:3
/// byte  12    reserved:4 payload_type:4
/// byte  13    fallback_vector
/// bytes 14-15 coherence_window_id
/// byte  16    target_phase_ref
/// byte  17    CRC-8 over bytes 0-16
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPacketHeader {
    pub address: RppAddress,
    pub packet_id: u32,
    pub origin_ref: u16,
    pub verbal: bool,
    /// 0..=15
    pub somatic: u8,
    pub ancestral: AncestralConsent,
    pub temporal_lock: bool,
    /// 0..=31
    pub phase_entropy_index: u8,
    /// 0..=7
    pub complecount: u8,
    pub payload_type: PayloadType,
    pub fallback_vector: FallbackVector,
    /// 0 = stateless; anything else links to a Phase Memory Anchor.
    pub coherence_window_id: u16,
    pub target_phase_ref: u8,
}

/// Result of decoding a header. Decoding always succeeds; integrity is
/// reported here and enforced by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedHeader {
    pub header: ConsentPacketHeader,
    pub stored_crc: u8,
    pub computed_crc: u8,
}

impl DecodedHeader {
    pub fn crc_valid(&self) -> bool {
        self.stored_crc == self.computed_crc
    }

    pub fn address_valid(&self) -> bool {
        self.header.address.is_valid()
    }

    /// Convert into the header if the CRC matches.
    pub fn verified(self) -> Result<ConsentPacketHeader, TypesError> {
        if !self.crc_valid() {
            return Err(TypesError::CrcMismatch {
                computed: self.computed_crc,
                stored: self.stored_crc,
            });
        }
        Ok(self.header)
    }
}

/// Advisory findings from [`ConsentPacketHeader::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderFinding {
    InvalidAddress,
    /// Somatic below the diminished band must carry a nonzero complecount.
    LowSomaticWithoutComplecount,
    FieldOutOfRange(&'static str),
}

impl std::fmt::Display for HeaderFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderFinding::InvalidAddress => f.write_str("address is invalid"),
            HeaderFinding::LowSomaticWithoutComplecount => {
                f.write_str("somatic < 6 requires complecount > 0")
            }
            HeaderFinding::FieldOutOfRange(field) => write!(f, "{field} out of range"),
        }
    }
}

impl ConsentPacketHeader {
    pub fn builder(address: RppAddress) -> ConsentPacketHeaderBuilder {
        ConsentPacketHeaderBuilder::new(address)
    }

    /// `phase_entropy_index > 25`.
    pub fn needs_fallback(&self) -> bool {
        self.phase_entropy_index > FALLBACK_ENTROPY_THRESHOLD
    }

    /// `coherence_window_id != 0`.
    pub fn has_pma_link(&self) -> bool {
        self.coherence_window_id != 0
    }

    /// Encode to the 18-byte wire form, computing the CRC. Sub-fields wider
    /// than their slot are truncated to the slot width.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        let mut w = BitWriter::new(&mut buf);
        w.put(self.address.to_raw() as u64, 32);
        w.put(self.packet_id as u64, 32);
        w.put(self.origin_ref as u64, 16);
        w.put_bool(self.verbal);
        w.put(self.somatic as u64, 4);
        w.put(self.ancestral.code() as u64, 2);
        w.put_bool(self.temporal_lock);
        w.put(self.phase_entropy_index as u64, 5);
        w.put(self.complecount as u64, 3);
        w.put(0, 4);
        w.put(self.payload_type.nibble() as u64, 4);
        w.put(self.fallback_vector.0 as u64, 8);
        w.put(self.coherence_window_id as u64, 16);
        w.put(self.target_phase_ref as u64, 8);
        debug_assert_eq!(w.position(), HEADER_CRC_SPAN * 8);
        buf[HEADER_CRC_SPAN] = crc8(&buf[..HEADER_CRC_SPAN]);
        buf
    }

    /// Extract every field by fixed bit offset. Never fails.
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> DecodedHeader {
        let mut r = BitReader::new(bytes);
        let address = RppAddress::from_raw(r.take(32) as u32);
        let packet_id = r.take(32) as u32;
        let origin_ref = r.take(16) as u16;
        let verbal = r.take_bool();
        let somatic = r.take_u8(4);
        let ancestral = AncestralConsent::from_code(r.take_u8(2));
        let temporal_lock = r.take_bool();
        let phase_entropy_index = r.take_u8(5);
        let complecount = r.take_u8(3);
        r.skip(4);
        let payload_type = PayloadType::from_nibble(r.take_u8(4));
        let fallback_vector = FallbackVector(r.take_u8(8));
        let coherence_window_id = r.take(16) as u16;
        let target_phase_ref = r.take_u8(8);

        DecodedHeader {
            header: ConsentPacketHeader {
                address,
                packet_id,
                origin_ref,
                verbal,
                somatic,
                ancestral,
                temporal_lock,
                phase_entropy_index,
                complecount,
                payload_type,
                fallback_vector,
                coherence_window_id,
                target_phase_ref,
            },
            stored_crc: bytes[HEADER_CRC_SPAN],
            computed_crc: crc8(&bytes[..HEADER_CRC_SPAN]),
        }
    }

    /// Decode the leading 18 bytes of `bytes`. Fails only when too short.
    pub fn decode_prefix(bytes: &[u8]) -> Result<DecodedHeader, TypesError> {
        let head: &[u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|s| s.try_into().ok())
            .ok_or(TypesError::Truncated {
                expected: HEADER_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self::decode(head))
    }

    /// Strict parse: length and CRC must both check out.
    pub fn parse(bytes: &[u8]) -> Result<Self, TypesError> {
        Self::decode_prefix(bytes)?.verified()
    }

    /// Semantic findings. Advisory: none of these stop a decode.
    pub fn validate(&self) -> Vec<HeaderFinding> {
        let mut findings = Vec::new();
        if !self.address.is_valid() {
            findings.push(HeaderFinding::InvalidAddress);
        }
        if self.somatic > SOMATIC_MAX {
            findings.push(HeaderFinding::FieldOutOfRange("somatic"));
        }
        if self.phase_entropy_index > ENTROPY_MAX {
            findings.push(HeaderFinding::FieldOutOfRange("phase_entropy_index"));
        }
        if self.complecount > COMPLECOUNT_MAX {
            findings.push(HeaderFinding::FieldOutOfRange("complecount"));
        }
        if self.somatic < 6 && self.complecount == 0 {
            findings.push(HeaderFinding::LowSomaticWithoutComplecount);
        }
        findings
    }
}

/// Range-checked construction of a [`ConsentPacketHeader`].
#[derive(Clone, Debug)]
pub struct ConsentPacketHeaderBuilder {
    header: ConsentPacketHeader,
}

impl ConsentPacketHeaderBuilder {
    fn new(address: RppAddress) -> Self {
        Self {
            header: ConsentPacketHeader {
                address,
                somatic: SOMATIC_MAX,
                ..ConsentPacketHeader::default()
            },
        }
    }

    pub fn packet_id(mut self, id: u32) -> Self {
        self.header.packet_id = id;
        self
    }

    pub fn origin_ref(mut self, origin: u16) -> Self {
        self.header.origin_ref = origin;
        self
    }

    pub fn consent(mut self, somatic: u8, verbal: bool) -> Self {
        self.header.somatic = somatic;
        self.header.verbal = verbal;
        self
    }

    pub fn ancestral(mut self, ancestral: AncestralConsent) -> Self {
        self.header.ancestral = ancestral;
        self
    }

    pub fn temporal_lock(mut self, lock: bool) -> Self {
        self.header.temporal_lock = lock;
        self
    }

    pub fn entropy(mut self, phase_entropy_index: u8, complecount: u8) -> Self {
        self.header.phase_entropy_index = phase_entropy_index;
        self.header.complecount = complecount;
        self
    }

    pub fn payload_type(mut self, payload_type: PayloadType) -> Self {
        self.header.payload_type = payload_type;
        self
    }

    pub fn fallback_vector(mut self, vector: FallbackVector) -> Self {
        self.header.fallback_vector = vector;
        self
    }

    pub fn window_id(mut self, window_id: u16) -> Self {
        self.header.coherence_window_id = window_id;
        self
    }

    pub fn target_phase_ref(mut self, phase_ref: u8) -> Self {
        self.header.target_phase_ref = phase_ref;
        self
    }

    pub fn build(self) -> Result<ConsentPacketHeader, TypesError> {
        let h = &self.header;
        check_range("somatic", h.somatic as u64, SOMATIC_MAX as u64)?;
        check_range(
            "phase_entropy_index",
            h.phase_entropy_index as u64,
            ENTROPY_MAX as u64,
        )?;
        check_range("complecount", h.complecount as u64, COMPLECOUNT_MAX as u64)?;
        Ok(self.header)
    }
}

/// Header plus opaque payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpiralPacket {
    pub header: ConsentPacketHeader,
    payload: Vec<u8>,
}

impl SpiralPacket {
    pub fn new(header: ConsentPacketHeader, payload: Vec<u8>) -> Result<Self, TypesError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(TypesError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        Ok(Self { header, payload })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn total_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Split and verify a framed packet.
    pub fn parse(bytes: &[u8]) -> Result<Self, TypesError> {
        let header = ConsentPacketHeader::parse(bytes)?;
        Self::new(header, bytes[HEADER_LEN..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConsentPacketHeader {
        ConsentPacketHeader::builder(RppAddress::new(9, 3, 2, 150).unwrap())
            .packet_id(0xDEAD_BEEF)
            .origin_ref(0x0042)
            .consent(15, true)
            .ancestral(AncestralConsent::Delegated)
            .temporal_lock(true)
            .entropy(25, 6)
            .payload_type(PayloadType::Human)
            .fallback_vector(FallbackVector::from_offsets(5, 3, 1))
            .window_id(0x1A2B)
            .target_phase_ref(0x7F)
            .build()
            .unwrap()
    }

    #[test]
    fn byte_layout() {
        let bytes = sample().to_bytes();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(&bytes[8..10], &[0x00, 0x42]);
        // verbal=1, somatic=1111, ancestral=10, temporal=1
        assert_eq!(bytes[10], 0b1111_1101);
        // entropy=11001, complecount=110
        assert_eq!(bytes[11], 0b1100_1110);
        assert_eq!(bytes[12], 0x01);
        // theta_off=101, phi_off=011, omega_off=01
        assert_eq!(bytes[13], 0b1010_1101);
        assert_eq!(&bytes[14..16], &[0x1A, 0x2B]);
        assert_eq!(bytes[16], 0x7F);
        assert_eq!(bytes[17], crc8(&bytes[..17]));
    }

    #[test]
    fn decode_recovers_fields() {
        let header = sample();
        let decoded = ConsentPacketHeader::decode(&header.to_bytes());
        assert!(decoded.crc_valid());
        assert!(decoded.address_valid());
        assert_eq!(decoded.header, header);
    }

    #[test]
    fn crc_mismatch_is_reported_not_fatal() {
        let mut bytes = sample().to_bytes();
        bytes[5] ^= 0x10;
        let decoded = ConsentPacketHeader::decode(&bytes);
        assert!(!decoded.crc_valid());
        assert_eq!(decoded.header.packet_id, 0xDEAD_BEEF ^ 0x0010_0000);
        assert!(matches!(
            decoded.verified(),
            Err(TypesError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn truncated_input_rejected() {
        let bytes = sample().to_bytes();
        let err = ConsentPacketHeader::parse(&bytes[..17]).unwrap_err();
        assert_eq!(
            err,
            TypesError::Truncated {
                expected: 18,
                actual: 17
            }
        );
    }

    #[test]
    fn derived_flags() {
        let mut header = sample();
        assert!(!header.needs_fallback());
        assert!(header.has_pma_link());
        header.phase_entropy_index = 26;
        header.coherence_window_id = 0;
        assert!(header.needs_fallback());
        assert!(!header.has_pma_link());
    }

    #[test]
    fn fallback_vector_fields() {
        let v = FallbackVector(0b1010_1101);
        assert_eq!(v.theta_offset(), 5);
        assert_eq!(v.phi_offset(), 3);
        assert_eq!(v.omega_offset(), 1);
        assert_eq!(FallbackVector::from_offsets(5, 3, 1), v);
    }

    #[test]
    fn builder_range_checks() {
        let addr = RppAddress::new(1, 0, 0, 0).unwrap();
        let builder = || ConsentPacketHeader::builder(addr);
        assert!(builder().consent(16, false).build().is_err());
        assert!(builder().entropy(32, 0).build().is_err());
        assert!(builder().entropy(0, 8).build().is_err());
        assert!(builder().entropy(31, 7).build().is_ok());
    }

    #[test]
    fn validate_findings() {
        let header = ConsentPacketHeader {
            address: RppAddress::from_parts(0, 0, 0, 0),
            somatic: 3,
            complecount: 0,
            ..ConsentPacketHeader::default()
        };
        let findings = header.validate();
        assert!(findings.contains(&HeaderFinding::InvalidAddress));
        let low_somatic = HeaderFinding::LowSomaticWithoutComplecount;
        assert!(findings.contains(&low_somatic));
        assert!(sample().validate().is_empty());
    }

    #[test]
    fn framed_packet() {
        let packet = SpiralPacket::new(sample(), b"hello".to_vec()).unwrap();
        let bytes = packet.to_bytes();
        assert_eq!(bytes.len(), packet.total_len());
        let parsed = SpiralPacket::parse(&bytes).unwrap();
        assert_eq!(parsed, packet);
        assert_eq!(parsed.payload(), b"hello");

        let too_big = vec![0u8; MAX_PAYLOAD + 1];
        assert!(SpiralPacket::new(sample(), too_big).is_err());
    }
}
