use std::sync::atomic::{AtomicU64, Ordering};

use rpp_types::RoutingDecision;
use serde::{Deserialize, Serialize};

use crate::freeze::FreezeTransition;

/// Routing kernel counters, as a point-in-time snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelMetrics {
    pub packets_evaluated: u64,
    pub rejected_structural: u64,
    pub rejected_address: u64,
    pub routed: u64,
    pub delayed: u64,
    pub fallback_decisions: u64,
    pub blocked: u64,
    pub fallback_activations: u64,
    pub pma_hits: u64,
    pub pma_misses: u64,
    pub pma_writes: u64,
    pub drift_detections: u64,
    pub freeze_entries: u64,
    pub freeze_releases: u64,
}

impl KernelMetrics {
    pub fn rejected(&self) -> u64 {
        self.rejected_structural + self.rejected_address
    }

    pub fn decided(&self) -> u64 {
        self.routed + self.delayed + self.fallback_decisions + self.blocked
    }
}

#[derive(Debug, Default)]
pub(crate) struct MetricsRecorder {
    packets_evaluated: AtomicU64,
    rejected_structural: AtomicU64,
    rejected_address: AtomicU64,
    routed: AtomicU64,
    delayed: AtomicU64,
    fallback_decisions: AtomicU64,
    blocked: AtomicU64,
    fallback_activations: AtomicU64,
    pma_hits: AtomicU64,
    pma_misses: AtomicU64,
    pma_writes: AtomicU64,
    drift_detections: AtomicU64,
    freeze_entries: AtomicU64,
    freeze_releases: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl MetricsRecorder {
    pub(crate) fn packet(&self) {
        bump(&self.packets_evaluated);
    }

    pub(crate) fn structural_rejection(&self) {
        bump(&self.rejected_structural);
    }

    pub(crate) fn address_rejection(&self) {
        bump(&self.rejected_address);
    }

    pub(crate) fn decision(&self, decision: RoutingDecision) {
        bump(match decision {
            RoutingDecision::Route => &self.routed,
            RoutingDecision::Delay => &self.delayed,
            RoutingDecision::Fallback => &self.fallback_decisions,
            RoutingDecision::Block => &self.blocked,
        });
    }

    pub(crate) fn fallback_activation(&self) {
        bump(&self.fallback_activations);
    }

    pub(crate) fn pma_lookup(&self, hit: bool, drift_detected: bool) {
        bump(if hit { &self.pma_hits } else { &self.pma_misses });
        if drift_detected {
            bump(&self.drift_detections);
        }
    }

    pub(crate) fn pma_write(&self) {
        bump(&self.pma_writes);
    }

    pub(crate) fn freeze(&self, transition: FreezeTransition) {
        match transition {
            FreezeTransition::Entered => bump(&self.freeze_entries),
            FreezeTransition::Released => bump(&self.freeze_releases),
            FreezeTransition::Idle | FreezeTransition::Held => {}
        }
    }

    pub(crate) fn snapshot(&self) -> KernelMetrics {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        KernelMetrics {
            packets_evaluated: load(&self.packets_evaluated),
            rejected_structural: load(&self.rejected_structural),
            rejected_address: load(&self.rejected_address),
            routed: load(&self.routed),
            delayed: load(&self.delayed),
            fallback_decisions: load(&self.fallback_decisions),
            blocked: load(&self.blocked),
            fallback_activations: load(&self.fallback_activations),
            pma_hits: load(&self.pma_hits),
            pma_misses: load(&self.pma_misses),
            pma_writes: load(&self.pma_writes),
            drift_detections: load(&self.drift_detections),
            freeze_entries: load(&self.freeze_entries),
            freeze_releases: load(&self.freeze_releases),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_counted_by_kind() {
        let rec = MetricsRecorder::default();
        rec.decision(RoutingDecision::Route);
        rec.decision(RoutingDecision::Route);
        rec.decision(RoutingDecision::Block);
        rec.structural_rejection();
        let snap = rec.snapshot();
        assert_eq!(snap.routed, 2);
        assert_eq!(snap.blocked, 1);
        assert_eq!(snap.decided(), 3);
        assert_eq!(snap.rejected(), 1);
    }

    #[test]
    fn held_transitions_not_counted() {
        let rec = MetricsRecorder::default();
        rec.freeze(FreezeTransition::Entered);
        rec.freeze(FreezeTransition::Held);
        rec.freeze(FreezeTransition::Released);
        let snap = rec.snapshot();
        assert_eq!((snap.freeze_entries, snap.freeze_releases), (1, 1));
    }

    #[test]
    fn snapshot_serializes() {
        let rec = MetricsRecorder::default();
        rec.pma_lookup(true, true);
        let json = serde_json::to_string(&rec.snapshot()).unwrap();
        let back: KernelMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pma_hits, 1);
        assert_eq!(back.drift_detections, 1);
    }
}
