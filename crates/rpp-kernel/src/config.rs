//! Kernel configuration

use std::path::Path;

use rpp_anchor::{StoreMode, MAX_DEPTH, MIN_DEPTH};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coherence::MAX_THRESHOLD;
use crate::error::KernelError;
use crate::transition::{REFLECTION_DELAY, REFLECTION_DELAY_MAX};
use crate::trigger::COUNTER_MAX;

/// Value fed to the scalar trigger each cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarSource {
    /// The address radius, 0..=255.
    #[default]
    Radius,
    /// The packet's coherence score, 0..=674.
    CoherenceScore,
}

/// Routing kernel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Minimum coherence score (×100 scale) for a packet to route directly
    pub coherence_threshold: u16,

    /// Scalar trigger activation level
    pub scalar_activation_threshold: u16,

    /// Consecutive cycles at or above activation before the trigger asserts
    pub scalar_duration: u8,

    pub scalar_source: ScalarSource,

    /// Anchor store depth in records
    pub pma_depth: usize,

    pub pma_mode: StoreMode,

    /// Largest tolerated difference between current and anchored 6-bit coherence
    pub drift_tolerance: u8,

    /// Treat a FREEZE payload as a freeze pulse
    pub freeze_on_freeze_payload: bool,

    /// Hold consent upgrades for a dwell period instead of applying the
    /// derived state directly
    pub consent_dwell: bool,

    /// Cycles between detecting a consent change and reflecting it
    pub reflection_delay: u8,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            coherence_threshold: 420,
            scalar_activation_threshold: 100,
            scalar_duration: 3,
            scalar_source: ScalarSource::Radius,
            pma_depth: 64,
            pma_mode: StoreMode::DirectMapped,
            drift_tolerance: 8,
            freeze_on_freeze_payload: true,
            consent_dwell: false,
            reflection_delay: REFLECTION_DELAY,
        }
    }
}

impl KernelConfig {
    /// Load configuration from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KernelError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                path = %path.display(),
                "No kernel config file, using defaults"
            );
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, KernelError> {
        let config: KernelConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, KernelError> {
        toml::to_string_pretty(self).map_err(|e| KernelError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), KernelError> {
        if self.coherence_threshold > MAX_THRESHOLD {
            return Err(KernelError::Config(format!(
                "coherence_threshold {} exceeds {}",
                self.coherence_threshold, MAX_THRESHOLD
            )));
        }
        if !(1..=COUNTER_MAX).contains(&self.scalar_duration) {
            return Err(KernelError::Config(format!(
                "scalar_duration {} outside 1..={}",
                self.scalar_duration, COUNTER_MAX
            )));
        }
        if !(MIN_DEPTH..=MAX_DEPTH).contains(&self.pma_depth) {
            return Err(KernelError::Config(format!(
                "pma_depth {} outside {}..={}",
                self.pma_depth, MIN_DEPTH, MAX_DEPTH
            )));
        }
        if self.reflection_delay > REFLECTION_DELAY_MAX {
            return Err(KernelError::Config(format!(
                "reflection_delay {} exceeds {}",
                self.reflection_delay, REFLECTION_DELAY_MAX
            )));
        }
        Ok(())
    }
}
