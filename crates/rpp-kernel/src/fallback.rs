use rpp_types::address::{OMEGA_MAX, PHI_MAX, THETA_MAX};
use rpp_types::{ConsentPacketHeader, FallbackVector, RppAddress};
use serde::{Deserialize, Serialize};

const THETA_SECTORS: u8 = THETA_MAX;
const PHI_LEVELS: u8 = PHI_MAX + 1;
const OMEGA_TIERS: u8 = OMEGA_MAX + 1;

/// Result of the fallback stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackResolution {
    pub address: RppAddress,
    pub active: bool,
}

/// Alternate address for `primary` under `vector`.
///
/// XOR first, then wrap into range. `theta` is shifted to zero-based before
/// the XOR and back after the modulo. Radius and reserved bits carry over.
pub fn resolve_fallback(primary: RppAddress, vector: FallbackVector) -> RppAddress {
    let theta = ((primary.theta().wrapping_sub(1) ^ vector.theta_offset()) % THETA_SECTORS) + 1;
    let phi = (primary.phi() ^ vector.phi_offset()) % PHI_LEVELS;
    let omega = (primary.omega() ^ vector.omega_offset()) % OMEGA_TIERS;
    RppAddress::from_parts(theta, phi, omega, primary.radius()).with_reserved(primary.reserved())
}

/// Fallback stage: bypassed unless the header asks for it.
pub fn resolve(header: &ConsentPacketHeader) -> FallbackResolution {
    if header.needs_fallback() {
        FallbackResolution {
            address: resolve_fallback(header.address, header.fallback_vector),
            active: true,
        }
    } else {
        FallbackResolution {
            address: header.address,
            active: false,
        }
    }
}
