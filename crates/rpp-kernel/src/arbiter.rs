use rpp_types::{ConsentState, RoutingDecision};
use serde::{Deserialize, Serialize};

/// Signals the arbiter weighs for one packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArbiterInputs {
    pub frozen: bool,
    pub consent: ConsentState,
    pub coherence_valid: bool,
}

/// Which rule decided the outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionReason {
    EmergencyFreeze,
    ConsentSuspended,
    CoherenceBelowThreshold,
    ConsentDiminished,
    Clear,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::EmergencyFreeze => "emergency_freeze",
            DecisionReason::ConsentSuspended => "consent_suspended",
            DecisionReason::CoherenceBelowThreshold => "coherence_below_threshold",
            DecisionReason::ConsentDiminished => "consent_diminished",
            DecisionReason::Clear => "clear",
        }
    }
}

/// Strict priority, highest first: freeze, suspended consent, coherence,
/// diminished consent.
pub fn arbitrate(inputs: ArbiterInputs) -> (RoutingDecision, DecisionReason) {
    if inputs.frozen {
        return (RoutingDecision::Block, DecisionReason::EmergencyFreeze);
    }
    match inputs.consent {
        ConsentState::Suspended | ConsentState::Emergency => {
            return (RoutingDecision::Block, DecisionReason::ConsentSuspended);
        }
        ConsentState::Full | ConsentState::Diminished => {}
    }
    if !inputs.coherence_valid {
        return (
            RoutingDecision::Fallback,
            DecisionReason::CoherenceBelowThreshold,
        );
    }
    if inputs.consent == ConsentState::Diminished {
        return (RoutingDecision::Delay, DecisionReason::ConsentDiminished);
    }
    (RoutingDecision::Route, DecisionReason::Clear)
}
