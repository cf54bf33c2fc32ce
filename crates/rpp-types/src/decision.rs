use serde::{Deserialize, Serialize};

/// Routing outcome for one evaluation cycle. Wire code is 2 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutingDecision {
    /// Forward to the resolved address.
    Route,
    /// Hold for reconfirmation.
    Delay,
    /// Reroute to the alternate address.
    Fallback,
    /// Drop.
    Block,
}

impl RoutingDecision {
    pub fn code(&self) -> u8 {
        match self {
            RoutingDecision::Route => 0b00,
            RoutingDecision::Delay => 0b01,
            RoutingDecision::Fallback => 0b10,
            RoutingDecision::Block => 0b11,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0b00 => RoutingDecision::Route,
            0b01 => RoutingDecision::Delay,
            0b10 => RoutingDecision::Fallback,
            _ => RoutingDecision::Block,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, RoutingDecision::Block)
    }
}

impl std::fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RoutingDecision::Route => "ROUTE",
            RoutingDecision::Delay => "DELAY",
            RoutingDecision::Fallback => "FALLBACK",
            RoutingDecision::Block => "BLOCK",
        };
        f.write_str(name)
    }
}
