use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Theta sectors are 1-based: 1..=27.
pub const THETA_MIN: u8 = 1;
pub const THETA_MAX: u8 = 27;
/// Phi bands: 0..=5.
pub const PHI_MAX: u8 = 5;
/// Omega tiers: 0..=4.
pub const OMEGA_MAX: u8 = 4;

const THETA_SHIFT: u32 = 27;
const PHI_SHIFT: u32 = 24;
const OMEGA_SHIFT: u32 = 21;
const RADIUS_SHIFT: u32 = 13;
const RESERVED_MASK: u32 = 0x1FFF;

/// 32-bit routing address: `theta(5) | phi(3) | omega(3) | radius(8) | reserved(13)`.
///
/// Any 32-bit word decodes into an `RppAddress`; whether the sub-fields lie in
/// their valid ranges is reported by [`RppAddress::is_valid`]. Invalid
/// addresses are rejected by the router, never routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RppAddress {
    theta: u8,
    phi: u8,
    omega: u8,
    radius: u8,
    reserved: u16,
}

impl RppAddress {
    /// Build a validated address.
    pub fn new(theta: u8, phi: u8, omega: u8, radius: u8) -> Result<Self, TypesError> {
        let addr = Self::from_parts(theta, phi, omega, radius);
        if addr.theta != theta || addr.phi != phi || addr.omega != omega || !addr.is_valid() {
            return Err(TypesError::InvalidAddress { theta, phi, omega });
        }
        Ok(addr)
    }

    /// Build an address without range validation. Sub-fields are masked to
    /// their bit widths, so the result always encodes losslessly.
    pub fn from_parts(theta: u8, phi: u8, omega: u8, radius: u8) -> Self {
        Self {
            theta: theta & 0x1F,
            phi: phi & 0x07,
            omega: omega & 0x07,
            radius,
            reserved: 0,
        }
    }

    /// Decode from the 32-bit wire word.
    pub fn from_raw(raw: u32) -> Self {
        Self {
            theta: ((raw >> THETA_SHIFT) & 0x1F) as u8,
            phi: ((raw >> PHI_SHIFT) & 0x07) as u8,
            omega: ((raw >> OMEGA_SHIFT) & 0x07) as u8,
            radius: ((raw >> RADIUS_SHIFT) & 0xFF) as u8,
            reserved: (raw & RESERVED_MASK) as u16,
        }
    }

    /// Encode to the 32-bit wire word.
    pub fn to_raw(&self) -> u32 {
        ((self.theta as u32) << THETA_SHIFT)
            | ((self.phi as u32) << PHI_SHIFT)
            | ((self.omega as u32) << OMEGA_SHIFT)
            | ((self.radius as u32) << RADIUS_SHIFT)
            | (self.reserved as u32 & RESERVED_MASK)
    }

    pub fn with_reserved(mut self, reserved: u16) -> Self {
        self.reserved = reserved & RESERVED_MASK as u16;
        self
    }

    pub fn theta(&self) -> u8 {
        self.theta
    }

    pub fn phi(&self) -> u8 {
        self.phi
    }

    pub fn omega(&self) -> u8 {
        self.omega
    }

    pub fn radius(&self) -> u8 {
        self.radius
    }

    pub fn reserved(&self) -> u16 {
        self.reserved
    }

    /// `theta ∈ [1,27] ∧ phi ∈ [0,5] ∧ omega ∈ [0,4]`.
    pub fn is_valid(&self) -> bool {
        (THETA_MIN..=THETA_MAX).contains(&self.theta)
            && self.phi <= PHI_MAX
            && self.omega <= OMEGA_MAX
    }

    /// Reject the address if any sub-field is out of range.
    pub fn ensure_valid(&self) -> Result<(), TypesError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(TypesError::InvalidAddress {
                theta: self.theta,
                phi: self.phi,
                omega: self.omega,
            })
        }
    }
}

/// Sector 1, origin band and tier, zero radius.
impl Default for RppAddress {
    fn default() -> Self {
        RppAddress::from_parts(THETA_MIN, 0, 0, 0)
    }
}

impl std::fmt::Display for RppAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rpp:{:#010x}(θ={} φ={} ω={} r={})",
            self.to_raw(),
            self.theta,
            self.phi,
            self.omega,
            self.radius
        )
    }
}
