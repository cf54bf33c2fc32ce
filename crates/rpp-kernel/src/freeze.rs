use serde::{Deserialize, Serialize};
use tracing::info;

/// Cycles held after entry before release is considered.
pub const FREEZE_HOLD_CYCLES: u8 = 9;
/// Coherence score required to release once the hold has elapsed.
pub const FREEZE_RELEASE_SCORE: u16 = 559;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreezeState {
    #[default]
    Idle,
    Frozen { countdown: u8 },
}

impl FreezeState {
    pub fn is_frozen(&self) -> bool {
        matches!(self, FreezeState::Frozen { .. })
    }
}

/// What a single clock did to the latch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreezeTransition {
    Idle,
    Entered,
    Held,
    Released,
}

/// Emergency freeze latch.
///
/// Edge-triggered entry; release needs both the hold countdown to have run
/// out and a coherence score of at least [`FREEZE_RELEASE_SCORE`]. A pulse
/// while frozen does not restart the countdown.
#[derive(Clone, Debug, Default)]
pub struct FreezeController {
    state: FreezeState,
}

impl FreezeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FreezeState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.state.is_frozen()
    }

    pub fn clock(&mut self, pulse: bool, coherence_score: u16) -> FreezeTransition {
        match self.state {
            FreezeState::Idle if pulse => {
                self.state = FreezeState::Frozen {
                    countdown: FREEZE_HOLD_CYCLES,
                };
                info!(hold = FREEZE_HOLD_CYCLES, "Emergency freeze engaged");
                FreezeTransition::Entered
            }
            FreezeState::Idle => FreezeTransition::Idle,
            FreezeState::Frozen { countdown } if countdown > 0 => {
                self.state = FreezeState::Frozen {
                    countdown: countdown - 1,
                };
                FreezeTransition::Held
            }
            FreezeState::Frozen { .. } => {
                if coherence_score >= FREEZE_RELEASE_SCORE {
                    self.state = FreezeState::Idle;
                    info!(score = coherence_score, "Emergency freeze released");
                    FreezeTransition::Released
                } else {
                    FreezeTransition::Held
                }
            }
        }
    }
}
