//! # rpp-kernel
//!
//! Consent-gated routing kernel. Each call to
//! [`RoutingKernel::evaluate`] runs one packet through the pipeline:
//!
//! 1. **Header check**: length and CRC-8, then address range.
//! 2. **Coherence**: weighted entropy/complecount score against a threshold.
//! 3. **Consent**: somatic level and verbal override mapped to a state.
//! 4. **Fallback**: XOR-and-wrap alternate address for high-entropy packets.
//! 5. **Scalar trigger**: sustained-threshold detector.
//! 6. **Phase memory anchor**: per-window record lookup and drift check.
//! 7. **Emergency freeze**: latched hold with score-gated release.
//! 8. **Consent dwell** (opt-in): upgrades held for a dwell period, losses
//!    applied at once, and the settled state reflected back after a delay.
//! 9. **Arbiter**: strict-priority decision (ROUTE / DELAY / FALLBACK / BLOCK).
//!
//! Policy outcomes are decisions, never errors. Only packets that cannot be
//! routed at all (truncated, corrupt, invalid address) return a
//! [`KernelError`].

pub mod arbiter;
pub mod coherence;
pub mod config;
pub mod consent;
pub mod error;
pub mod fallback;
pub mod freeze;
pub mod kernel;
pub mod metrics;
pub mod transition;
pub mod trigger;

pub use arbiter::{arbitrate, ArbiterInputs, DecisionReason};
pub use coherence::{coherence_score, CoherenceEvaluator, CoherenceReport, CoherenceTier};
pub use config::{KernelConfig, ScalarSource};
pub use consent::derive_consent;
pub use error::KernelError;
pub use fallback::{resolve_fallback, FallbackResolution};
pub use freeze::{FreezeController, FreezeState, FreezeTransition};
pub use kernel::{CycleSignals, DriftReport, RoutingKernel, RoutingOutcome};
pub use metrics::KernelMetrics;
pub use transition::{ConsentReflector, DwellTimer, TransitionManager, TransitionStep};
pub use trigger::{ScalarTrigger, TriggerState};
