use rpp_anchor::AnchorError;
use rpp_types::TypesError;
use thiserror::Error;

/// Errors from the routing kernel.
///
/// Consent, coherence and freeze conditions are not errors: they produce a
/// [`RoutingDecision`](rpp_types::RoutingDecision). Only packets that must
/// never be routed at all surface here.
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("structural rejection: {0}")]
    Structural(TypesError),

    #[error("address out of range: theta={theta} phi={phi} omega={omega}")]
    InvalidAddress { theta: u8, phi: u8, omega: u8 },

    #[error("anchor store error: {0}")]
    Anchor(#[from] AnchorError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TypesError> for KernelError {
    fn from(e: TypesError) -> Self {
        match e {
            TypesError::InvalidAddress { theta, phi, omega } => {
                KernelError::InvalidAddress { theta, phi, omega }
            }
            other => KernelError::Structural(other),
        }
    }
}

impl From<toml::de::Error> for KernelError {
    fn from(e: toml::de::Error) -> Self {
        KernelError::Config(e.to_string())
    }
}

impl KernelError {
    /// Rejections caused by the packet itself rather than the kernel.
    pub fn is_packet_rejection(&self) -> bool {
        matches!(
            self,
            KernelError::Structural(_) | KernelError::InvalidAddress { .. }
        )
    }
}
