use serde::{Deserialize, Serialize};

/// Counter saturation value (4-bit register).
pub const COUNTER_MAX: u8 = 15;

/// Sustained-threshold detector.
///
/// Asserts only after the input has held at or above the activation
/// threshold for `duration` consecutive cycles; one cycle below clears it.
#[derive(Clone, Debug)]
pub struct ScalarTrigger {
    activation_threshold: u16,
    duration: u8,
    counter: u8,
    triggered: bool,
}

/// Observable trigger state after a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerState {
    pub counter: u8,
    pub triggered: bool,
}

impl ScalarTrigger {
    /// `duration` is clamped to `1..=COUNTER_MAX`.
    pub fn new(activation_threshold: u16, duration: u8) -> Self {
        Self {
            activation_threshold,
            duration: duration.clamp(1, COUNTER_MAX),
            counter: 0,
            triggered: false,
        }
    }

    /// Advance one cycle with the trigger enabled.
    pub fn clock(&mut self, value: u16) -> TriggerState {
        self.clock_enabled(value, true)
    }

    /// Advance one cycle. A disabled cycle forces `triggered` low and
    /// leaves the counter untouched.
    ///
    /// The counter keeps counting to [`COUNTER_MAX`] while the input holds;
    /// `triggered` follows the counter value registered on the previous
    /// cycle.
    pub fn clock_enabled(&mut self, value: u16, enabled: bool) -> TriggerState {
        if !enabled {
            self.triggered = false;
        } else if value >= self.activation_threshold {
            if self.counter >= self.duration {
                self.triggered = true;
            }
            self.counter = (self.counter + 1).min(COUNTER_MAX);
        } else {
            self.counter = 0;
            self.triggered = false;
        }
        self.state()
    }

    pub fn state(&self) -> TriggerState {
        TriggerState {
            counter: self.counter,
            triggered: self.triggered,
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn reset(&mut self) {
        self.counter = 0;
        self.triggered = false;
    }
}
