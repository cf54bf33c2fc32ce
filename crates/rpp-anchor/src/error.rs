use rpp_types::TypesError;
use thiserror::Error;

/// Errors from the Phase Memory Anchor store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    #[error("store depth {0} outside 8..=4096")]
    InvalidDepth(usize),

    #[error("window key {0:#06x} cannot be anchored")]
    InvalidWindowId(u16),

    #[error("record window id {window_id:#05x} does not match key {key:#06x}")]
    KeyMismatch { key: u16, window_id: u16 },

    #[error("anchor record corrupt: {0}")]
    RecordCorrupt(#[from] TypesError),
}
