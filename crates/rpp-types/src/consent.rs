use serde::{Deserialize, Serialize};

/// Access-permission level, ordered from most to least permissive.
///
/// `Emergency` is never derived from header fields; it is reported while the
/// emergency freeze latch is held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConsentState {
    Full,
    Diminished,
    Suspended,
    Emergency,
}

impl ConsentState {
    /// 2-bit wire code.
    pub fn code(&self) -> u8 {
        match self {
            ConsentState::Full => 0b00,
            ConsentState::Diminished => 0b01,
            ConsentState::Suspended => 0b10,
            ConsentState::Emergency => 0b11,
        }
    }

    /// Decode a 2-bit code. Upper bits are ignored.
    pub fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0b00 => ConsentState::Full,
            0b01 => ConsentState::Diminished,
            0b10 => ConsentState::Suspended,
            _ => ConsentState::Emergency,
        }
    }

    /// Whether traffic may leave the node in this state at all.
    pub fn permits_routing(&self) -> bool {
        matches!(self, ConsentState::Full | ConsentState::Diminished)
    }
}

impl std::fmt::Display for ConsentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConsentState::Full => "FULL",
            ConsentState::Diminished => "DIMINISHED",
            ConsentState::Suspended => "SUSPENDED",
            ConsentState::Emergency => "EMERGENCY",
        };
        f.write_str(name)
    }
}

/// Ancestral consent inheritance level (2 bits). Carried, not interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AncestralConsent {
    #[default]
    None,
    Inherited,
    Delegated,
    Sovereign,
}

impl AncestralConsent {
    pub fn code(&self) -> u8 {
        match self {
            AncestralConsent::None => 0,
            AncestralConsent::Inherited => 1,
            AncestralConsent::Delegated => 2,
            AncestralConsent::Sovereign => 3,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0 => AncestralConsent::None,
            1 => AncestralConsent::Inherited,
            2 => AncestralConsent::Delegated,
            _ => AncestralConsent::Sovereign,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ConsentState::Full.code(), 0);
        assert_eq!(ConsentState::Diminished.code(), 1);
        assert_eq!(ConsentState::Suspended.code(), 2);
        assert_eq!(ConsentState::Emergency.code(), 3);
        for code in 0..4 {
            assert_eq!(ConsentState::from_code(code).code(), code);
            assert_eq!(AncestralConsent::from_code(code).code(), code);
        }
    }

    #[test]
    fn ordering_follows_permissiveness() {
        assert!(ConsentState::Full < ConsentState::Diminished);
        assert!(ConsentState::Diminished < ConsentState::Suspended);
        assert!(ConsentState::Suspended < ConsentState::Emergency);
    }

    #[test]
    fn routing_permission() {
        assert!(ConsentState::Full.permits_routing());
        assert!(ConsentState::Diminished.permits_routing());
        assert!(!ConsentState::Suspended.permits_routing());
        assert!(!ConsentState::Emergency.permits_routing());
    }

    #[test]
    fn display_names() {
        assert_eq!(ConsentState::Suspended.to_string(), "SUSPENDED");
    }
}
