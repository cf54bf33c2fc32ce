//! Consent transition dynamics
//!
//! Losing consent takes effect at once; regaining it has to be held for a
//! number of cycles first. The reflector mirrors a detected state back to
//! the sender only after it has been stable for a fixed delay.

use rpp_types::ConsentState;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cycles a DIMINISHED upgrade must be requested before it takes effect.
pub const DWELL_BASE: u8 = 3;
/// Cycles a FULL upgrade must be requested before it takes effect.
pub const DWELL_FULL: u8 = 19;
/// Default cycles between detection and reflection.
pub const REFLECTION_DELAY: u8 = 4;
/// Largest configurable reflection delay.
pub const REFLECTION_DELAY_MAX: u8 = 15;

/// Cycles an upgrade into `target` has to be held.
pub fn required_dwell(target: ConsentState) -> u8 {
    match target {
        ConsentState::Full => DWELL_FULL,
        ConsentState::Diminished => DWELL_BASE,
        ConsentState::Suspended | ConsentState::Emergency => 0,
    }
}

/// Asymmetric dwell gate over consent changes.
///
/// States are ordered most to least permissive, so a request for a state
/// that compares greater than the current one is a downgrade.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DwellTimer {
    current: Option<ConsentState>,
    cycles_in_state: u32,
    target: Option<ConsentState>,
    cycles_at_target: u32,
}

impl DwellTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ConsentState> {
        self.current
    }

    pub fn cycles_in_state(&self) -> u32 {
        self.cycles_in_state
    }

    /// The upgrade currently being held, if any.
    pub fn pending(&self) -> Option<ConsentState> {
        self.target
    }

    fn set_state(&mut self, state: ConsentState) {
        if self.current != Some(state) {
            self.current = Some(state);
            self.cycles_in_state = 0;
            self.target = None;
            self.cycles_at_target = 0;
        }
    }

    /// Ask to move to `target`. Returns whether the current state is now
    /// `target`.
    pub fn request(&mut self, target: ConsentState) -> bool {
        let Some(current) = self.current else {
            self.set_state(target);
            return true;
        };
        if target == current {
            self.target = None;
            self.cycles_at_target = 0;
            return true;
        }
        let required = required_dwell(target);
        if target > current || required == 0 {
            self.set_state(target);
            return true;
        }
        if self.target != Some(target) {
            self.target = Some(target);
            self.cycles_at_target = 0;
            return false;
        }
        if self.cycles_at_target >= u32::from(required) {
            debug!(from = %current, to = %target, "Consent upgraded");
            self.set_state(target);
            return true;
        }
        false
    }

    /// Advance one cycle.
    pub fn tick(&mut self) {
        self.cycles_in_state = self.cycles_in_state.saturating_add(1);
        if self.target.is_some() {
            self.cycles_at_target = self.cycles_at_target.saturating_add(1);
        }
    }
}

/// Detection/reflection split with a fixed delay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentReflector {
    delay: u8,
    detected: Option<ConsentState>,
    reflected: Option<ConsentState>,
    since_detection: u8,
    pending: bool,
}

impl Default for ConsentReflector {
    fn default() -> Self {
        Self::new(REFLECTION_DELAY)
    }
}

impl ConsentReflector {
    pub fn new(delay: u8) -> Self {
        Self {
            delay,
            detected: None,
            reflected: None,
            since_detection: 0,
            pending: false,
        }
    }

    pub fn delay(&self) -> u8 {
        self.delay
    }

    pub fn detected(&self) -> Option<ConsentState> {
        self.detected
    }

    pub fn reflected(&self) -> Option<ConsentState> {
        self.reflected
    }

    /// Record the state measured this cycle. A change restarts the delay.
    pub fn detect(&mut self, state: ConsentState) {
        if self.detected != Some(state) {
            self.detected = Some(state);
            self.since_detection = 0;
            self.pending = true;
        }
    }

    pub fn tick(&mut self) {
        if self.pending {
            self.since_detection = self.since_detection.saturating_add(1);
        }
    }

    /// Reflect the detected state once the delay has elapsed. Returns the
    /// newly reflected state, or `None` if nothing is due this cycle.
    pub fn reflect(&mut self) -> Option<ConsentState> {
        if self.pending && self.since_detection >= self.delay {
            self.reflected = self.detected;
            self.pending = false;
            return self.reflected;
        }
        None
    }

    /// Reflect immediately, bypassing the delay.
    pub fn force_reflect(&mut self) -> Option<ConsentState> {
        self.reflected = self.detected;
        self.pending = false;
        self.since_detection = 0;
        self.reflected
    }
}

/// One cycle of [`TransitionManager::process`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionStep {
    pub detected: ConsentState,
    /// Consent after the dwell gate.
    pub effective: ConsentState,
    pub transition_allowed: bool,
    /// Set only on the cycle a reflection fires.
    pub reflected: Option<ConsentState>,
    pub cycles_in_state: u32,
}

/// Dwell gate and reflector driven together, one call per cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionManager {
    dwell: DwellTimer,
    reflector: ConsentReflector,
    cycle: u64,
}

impl TransitionManager {
    pub fn new(reflection_delay: u8) -> Self {
        Self {
            dwell: DwellTimer::new(),
            reflector: ConsentReflector::new(reflection_delay),
            cycle: 0,
        }
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn current(&self) -> Option<ConsentState> {
        self.dwell.current()
    }

    pub fn reflected(&self) -> Option<ConsentState> {
        self.reflector.reflected()
    }

    pub fn process(&mut self, detected: ConsentState) -> TransitionStep {
        self.cycle += 1;
        self.reflector.detect(detected);
        let transition_allowed = self.dwell.request(detected);
        self.dwell.tick();
        self.reflector.tick();
        let reflected = self.reflector.reflect();
        TransitionStep {
            detected,
            effective: self.dwell.current().unwrap_or(detected),
            transition_allowed,
            reflected,
            cycles_in_state: self.dwell.cycles_in_state(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.reflector.delay());
    }
}
