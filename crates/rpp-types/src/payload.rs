use serde::{Deserialize, Serialize};

/// Payload origin/type indicator (4 bits).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadType {
    #[default]
    Empty,
    Human,
    Ai,
    Scalar,
    Hybrid,
    Fragment,
    Command,
    Query,
    Response,
    Heartbeat,
    /// Requests an emergency freeze when the router honours payload pulses.
    Freeze,
    Dissolve,
    /// 0xC..=0xF are unassigned but must survive a decode/encode cycle.
    Reserved(u8),
}

impl PayloadType {
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0x0 => PayloadType::Empty,
            0x1 => PayloadType::Human,
            0x2 => PayloadType::Ai,
            0x3 => PayloadType::Scalar,
            0x4 => PayloadType::Hybrid,
            0x5 => PayloadType::Fragment,
            0x6 => PayloadType::Command,
            0x7 => PayloadType::Query,
            0x8 => PayloadType::Response,
            0x9 => PayloadType::Heartbeat,
            0xA => PayloadType::Freeze,
            0xB => PayloadType::Dissolve,
            other => PayloadType::Reserved(other),
        }
    }

    pub fn nibble(&self) -> u8 {
        match self {
            PayloadType::Empty => 0x0,
            PayloadType::Human => 0x1,
            PayloadType::Ai => 0x2,
            PayloadType::Scalar => 0x3,
            PayloadType::Hybrid => 0x4,
            PayloadType::Fragment => 0x5,
            PayloadType::Command => 0x6,
            PayloadType::Query => 0x7,
            PayloadType::Response => 0x8,
            PayloadType::Heartbeat => 0x9,
            PayloadType::Freeze => 0xA,
            PayloadType::Dissolve => 0xB,
            PayloadType::Reserved(n) => n & 0x0F,
        }
    }
}
