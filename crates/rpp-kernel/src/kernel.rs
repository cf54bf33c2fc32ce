use parking_lot::Mutex;
use rpp_anchor::{build_store, AnchorStore, WindowAllocator};
use rpp_types::{
    ConsentPacketHeader, ConsentState, PayloadType, PmaRecord, PmaTimestamp, RoutingDecision,
    RppAddress, WINDOW_ID_MASK,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::arbiter::{arbitrate, ArbiterInputs, DecisionReason};
use crate::coherence::{to_six_bit, CoherenceEvaluator};
use crate::config::{KernelConfig, ScalarSource};
use crate::consent::derive_consent;
use crate::error::KernelError;
use crate::fallback;
use crate::freeze::{FreezeController, FreezeState};
use crate::metrics::{KernelMetrics, MetricsRecorder};
use crate::transition::TransitionManager;
use crate::trigger::ScalarTrigger;

/// Per-cycle inputs that do not come from the packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSignals {
    /// External emergency freeze pulse.
    pub freeze_pulse: bool,
    /// Scalar trigger enable. Disabled forces `scalar_triggered` low.
    pub scalar_enable: bool,
}

impl Default for CycleSignals {
    fn default() -> Self {
        Self {
            freeze_pulse: false,
            scalar_enable: true,
        }
    }
}

impl CycleSignals {
    pub fn freeze() -> Self {
        Self {
            freeze_pulse: true,
            ..Self::default()
        }
    }
}

/// Coherence drift against the anchored record for this window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    pub anchored: u8,
    pub current: u8,
    pub delta: u8,
    pub detected: bool,
}

/// Everything the kernel reports for one evaluated packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingOutcome {
    pub packet_id: u32,
    pub resolved_address: RppAddress,
    pub consent_state: ConsentState,
    /// Last consent state mirrored back to the sender. `None` unless
    /// consent dwell is enabled and a reflection has fired.
    pub reflected_consent: Option<ConsentState>,
    pub coherence_score: u16,
    pub coherence_valid: bool,
    /// The decision names a destination (ROUTE, DELAY or FALLBACK).
    pub route_valid: bool,
    pub fallback_active: bool,
    pub scalar_triggered: bool,
    pub pma_hit: bool,
    pub drift: Option<DriftReport>,
    pub routing_decision: RoutingDecision,
    pub reason: DecisionReason,
    pub freeze_state: FreezeState,
}

/// Consent-gated routing pipeline.
///
/// One [`evaluate`](Self::evaluate) call is one cycle. The freeze latch, the
/// scalar trigger, the consent dwell state and the anchor store are shared
/// across calls and guarded internally, so a kernel can be shared between
/// worker threads by reference.
pub struct RoutingKernel {
    config: KernelConfig,
    coherence: CoherenceEvaluator,
    anchors: Box<dyn AnchorStore>,
    windows: WindowAllocator,
    trigger: Mutex<ScalarTrigger>,
    freeze: Mutex<FreezeController>,
    transitions: Option<Mutex<TransitionManager>>,
    metrics: MetricsRecorder,
}

impl RoutingKernel {
    pub fn new(config: KernelConfig) -> Result<Self, KernelError> {
        config.validate()?;
        let anchors = build_store(config.pma_mode, config.pma_depth)?;
        info!(
            threshold = config.coherence_threshold,
            pma_depth = config.pma_depth,
            pma_mode = ?config.pma_mode,
            consent_dwell = config.consent_dwell,
            "Routing kernel initialized"
        );
        let transitions = config
            .consent_dwell
            .then(|| Mutex::new(TransitionManager::new(config.reflection_delay)));
        Ok(Self {
            coherence: CoherenceEvaluator::new(config.coherence_threshold),
            trigger: Mutex::new(ScalarTrigger::new(
                config.scalar_activation_threshold,
                config.scalar_duration,
            )),
            freeze: Mutex::new(FreezeController::new()),
            metrics: MetricsRecorder::default(),
            windows: WindowAllocator::new(),
            transitions,
            anchors,
            config,
        })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn anchors(&self) -> &dyn AnchorStore {
        self.anchors.as_ref()
    }

    pub fn freeze_state(&self) -> FreezeState {
        self.freeze.lock().state()
    }

    pub fn metrics(&self) -> KernelMetrics {
        self.metrics.snapshot()
    }

    /// Issue a fresh coherence window id in `1..=0xFFE` for a sender to
    /// place in its headers.
    pub fn allocate_window(&self) -> u16 {
        self.windows.allocate()
    }

    /// Evaluate one packet. Bytes past the 18-byte header are payload and
    /// are not inspected.
    ///
    /// Errors only for packets that must never be routed: truncated, failing
    /// CRC, or carrying an out-of-range address.
    pub fn evaluate(
        &self,
        bytes: &[u8],
        signals: CycleSignals,
    ) -> Result<RoutingOutcome, KernelError> {
        self.metrics.packet();
        let decoded = ConsentPacketHeader::decode_prefix(bytes);
        let header = match decoded.and_then(|d| d.verified()) {
            Ok(header) => header,
            Err(e) => {
                warn!(len = bytes.len(), error = %e, "Rejected malformed header");
                self.metrics.structural_rejection();
                return Err(KernelError::Structural(e));
            }
        };
        if let Err(e) = header.address.ensure_valid() {
            warn!(
                packet_id = header.packet_id,
                address = %header.address,
                "Rejected invalid address"
            );
            self.metrics.address_rejection();
            return Err(e.into());
        }
        self.route(&header, signals)
    }

    /// Evaluate an already-decoded header. The address is still checked.
    pub fn evaluate_header(
        &self,
        header: &ConsentPacketHeader,
        signals: CycleSignals,
    ) -> Result<RoutingOutcome, KernelError> {
        self.evaluate(&header.to_bytes(), signals)
    }

    fn route(
        &self,
        header: &ConsentPacketHeader,
        signals: CycleSignals,
    ) -> Result<RoutingOutcome, KernelError> {
        let coherence = self
            .coherence
            .evaluate(header.phase_entropy_index, header.complecount);
        let consent = derive_consent(header.somatic, header.verbal);

        let resolution = fallback::resolve(header);
        if resolution.active {
            self.metrics.fallback_activation();
            debug!(
                packet_id = header.packet_id,
                primary = %header.address,
                alternate = %resolution.address,
                "Fallback address resolved"
            );
        }

        let scalar_value = match self.config.scalar_source {
            ScalarSource::Radius => header.address.radius() as u16,
            ScalarSource::CoherenceScore => coherence.score,
        };
        let scalar = self
            .trigger
            .lock()
            .clock_enabled(scalar_value, signals.scalar_enable);

        let window = anchor_window(header);
        let current6 = to_six_bit(coherence.score);
        let (pma_hit, drift) = match window {
            Some(window_id) => {
                let lookup = self.anchors.lookup(window_id);
                let drift = lookup.record().map(|record| {
                    let delta = current6.abs_diff(record.coherence_score);
                    DriftReport {
                        anchored: record.coherence_score,
                        current: current6,
                        delta,
                        detected: delta > self.config.drift_tolerance,
                    }
                });
                let detected = drift.is_some_and(|d| d.detected);
                self.metrics.pma_lookup(lookup.is_hit(), detected);
                if detected {
                    warn!(
                        packet_id = header.packet_id,
                        window_id,
                        "Coherence drift detected"
                    );
                }
                (lookup.is_hit(), drift)
            }
            None => (false, None),
        };

        let pulse = signals.freeze_pulse
            || (self.config.freeze_on_freeze_payload && header.payload_type == PayloadType::Freeze);
        let (transition, freeze_state) = {
            let mut freeze = self.freeze.lock();
            let transition = freeze.clock(pulse, coherence.score);
            (transition, freeze.state())
        };
        self.metrics.freeze(transition);

        let frozen = freeze_state.is_frozen();
        let (consent, reflected_consent) = match &self.transitions {
            Some(transitions) => {
                let detected = if frozen {
                    ConsentState::Emergency
                } else {
                    consent
                };
                let mut transitions = transitions.lock();
                let step = transitions.process(detected);
                if step.effective != detected {
                    debug!(
                        packet_id = header.packet_id,
                        detected = %detected,
                        held = %step.effective,
                        "Consent upgrade held for dwell"
                    );
                }
                (step.effective, transitions.reflected())
            }
            None => (consent, None),
        };
        let (decision, reason) = arbitrate(ArbiterInputs {
            frozen,
            consent,
            coherence_valid: coherence.valid,
        });
        self.metrics.decision(decision);
        let consent_state = if frozen {
            ConsentState::Emergency
        } else {
            consent
        };

        debug!(
            packet_id = header.packet_id,
            score = coherence.score,
            consent = %consent_state,
            decision = %decision,
            reason = reason.as_str(),
            "Packet evaluated"
        );

        if let Some(key) = window {
            if !decision.is_block() {
                let record = PmaRecord::new(
                    key & WINDOW_ID_MASK,
                    PmaTimestamp::now(),
                    resolution.address,
                    consent_state,
                    header.complecount,
                    current6,
                    header.payload_type,
                    resolution.active,
                )
                .map_err(KernelError::Structural)?;
                self.anchors.write(key, record)?;
                self.metrics.pma_write();
            }
        }

        Ok(RoutingOutcome {
            packet_id: header.packet_id,
            resolved_address: resolution.address,
            consent_state,
            reflected_consent,
            coherence_score: coherence.score,
            coherence_valid: coherence.valid,
            route_valid: !decision.is_block(),
            fallback_active: resolution.active,
            scalar_triggered: scalar.triggered,
            pma_hit,
            drift,
            routing_decision: decision,
            reason,
            freeze_state,
        })
    }
}

/// The anchor key for a header: its full 16-bit window id, if it links to a
/// window at all. Records carry only the low 12 bits on the wire.
fn anchor_window(header: &ConsentPacketHeader) -> Option<u16> {
    header.has_pma_link().then_some(header.coherence_window_id)
}

impl std::fmt::Debug for RoutingKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingKernel")
            .field("config", &self.config)
            .field("freeze", &self.freeze_state())
            .field("anchors_occupied", &self.anchors.occupied())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpp_types::{FallbackVector, TypesError};

    fn header(somatic: u8, verbal: bool, entropy: u8, complecount: u8) -> ConsentPacketHeader {
        ConsentPacketHeader::builder(RppAddress::new(9, 3, 2, 150).unwrap())
            .packet_id(7)
            .consent(somatic, verbal)
            .entropy(entropy, complecount)
            .build()
            .unwrap()
    }

    fn kernel() -> RoutingKernel {
        RoutingKernel::new(KernelConfig::default()).unwrap()
    }

    #[test]
    fn reference_packet_routes() {
        let out = kernel()
            .evaluate_header(&header(15, true, 25, 6), CycleSignals::default())
            .unwrap();
        assert_eq!(out.consent_state, ConsentState::Full);
        assert!(out.coherence_valid);
        assert_eq!(out.routing_decision, RoutingDecision::Route);
        assert!(out.route_valid);
        assert!(!out.fallback_active);
        assert_eq!(out.packet_id, 7);
    }

    #[test]
    fn anchor_window_keeps_all_sixteen_bits() {
        let mut h = header(15, false, 25, 6);
        h.coherence_window_id = 0x1042;
        assert_eq!(anchor_window(&h), Some(0x1042));
        h.coherence_window_id = 0x1000;
        assert_eq!(anchor_window(&h), Some(0x1000));
        h.coherence_window_id = 0;
        assert_eq!(anchor_window(&h), None);
    }

    #[test]
    fn windows_sharing_low_bits_stay_distinct() {
        let k = kernel();
        let mut h = header(15, true, 25, 6);
        h.coherence_window_id = 0x0042;
        let first = k.evaluate_header(&h, CycleSignals::default()).unwrap();
        assert!(!first.pma_hit);

        h.coherence_window_id = 0x1042;
        let second = k.evaluate_header(&h, CycleSignals::default()).unwrap();
        assert!(!second.pma_hit);
        assert_eq!(second.drift, None);
    }

    #[test]
    fn window_with_zero_low_bits_is_anchored() {
        let k = kernel();
        let mut h = header(15, true, 25, 6);
        h.coherence_window_id = 0x1000;
        k.evaluate_header(&h, CycleSignals::default()).unwrap();
        assert_eq!(k.anchors().occupied(), 1);

        let again = k.evaluate_header(&h, CycleSignals::default()).unwrap();
        assert!(again.pma_hit);
        let lookup = k.anchors().lookup(0x1000);
        assert_eq!(lookup.record().map(|r| r.window_id), Some(0));
    }

    #[test]
    fn allocated_windows_are_sequential() {
        let k = kernel();
        assert_eq!(k.allocate_window(), 1);
        assert_eq!(k.allocate_window(), 2);
    }

    #[test]
    fn consent_dwell_off_by_default() {
        let out = kernel()
            .evaluate_header(&header(3, false, 25, 6), CycleSignals::default())
            .unwrap();
        assert_eq!(out.reflected_consent, None);
        assert_eq!(out.consent_state, ConsentState::Suspended);
    }

    #[test]
    fn kernel_is_send_sync() {
        fn assert_shareable<T: Send + Sync>() {}
        assert_shareable::<RoutingKernel>();
    }

    #[test]
    fn trailing_payload_ignored() {
        let mut bytes = header(15, true, 25, 6).to_bytes().to_vec();
        bytes.extend_from_slice(b"payload");
        let out = kernel().evaluate(&bytes, CycleSignals::default()).unwrap();
        assert_eq!(out.routing_decision, RoutingDecision::Route);
    }

    #[test]
    fn fallback_active_reports_alternate() {
        let h = ConsentPacketHeader {
            fallback_vector: FallbackVector::from_offsets(5, 0, 0),
            ..header(15, false, 30, 6)
        };
        let out = kernel()
            .evaluate_header(&h, CycleSignals::default())
            .unwrap();
        assert!(out.fallback_active);
        assert_ne!(out.resolved_address, h.address);
        assert!(out.resolved_address.is_valid());
    }

    #[test]
    fn freeze_payload_pulses_when_enabled() {
        let h = ConsentPacketHeader {
            payload_type: PayloadType::Freeze,
            ..header(15, true, 31, 7)
        };
        let k = kernel();
        let out = k.evaluate_header(&h, CycleSignals::default()).unwrap();
        assert_eq!(out.routing_decision, RoutingDecision::Block);
        assert_eq!(out.consent_state, ConsentState::Emergency);

        let k = RoutingKernel::new(KernelConfig {
            freeze_on_freeze_payload: false,
            ..KernelConfig::default()
        })
        .unwrap();
        let out = k.evaluate_header(&h, CycleSignals::default()).unwrap();
        assert_eq!(out.routing_decision, RoutingDecision::Route);
    }

    #[test]
    fn invalid_config_refused() {
        let err = RoutingKernel::new(KernelConfig {
            pma_depth: 3,
            ..KernelConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, KernelError::Config(_)));
    }

    #[test]
    fn structural_error_keeps_cause() {
        let err = kernel()
            .evaluate(&[0u8; 5], CycleSignals::default())
            .unwrap_err();
        assert!(matches!(
            err,
            KernelError::Structural(TypesError::Truncated { actual: 5, .. })
        ));
    }
}
