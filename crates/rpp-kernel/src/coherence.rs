use serde::{Deserialize, Serialize};

/// Entropy weight, ×100 scale.
pub const ENTROPY_WEIGHT: u32 = 165;
/// Complecount weight, ×100 scale.
pub const COMPLECOUNT_WEIGHT: u32 = 509;
pub const ENTROPY_MAX: u8 = 31;
pub const COMPLECOUNT_MAX: u8 = 7;
/// `ENTROPY_WEIGHT + COMPLECOUNT_WEIGHT`.
pub const MAX_SCORE: u16 = 674;
/// Largest threshold the evaluator accepts (10-bit comparator).
pub const MAX_THRESHOLD: u16 = 1023;

const HIGH_TIER_MIN: u16 = 500;
const MEDIUM_TIER_MIN: u16 = 300;

/// Coarse classification of a score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoherenceTier {
    High,
    Medium,
    Low,
}

impl CoherenceTier {
    pub fn of(score: u16) -> Self {
        if score >= HIGH_TIER_MIN {
            CoherenceTier::High
        } else if score >= MEDIUM_TIER_MIN {
            CoherenceTier::Medium
        } else {
            CoherenceTier::Low
        }
    }
}

/// Per-packet coherence evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoherenceReport {
    pub score: u16,
    pub entropy_term: u16,
    pub complecount_term: u16,
    /// `score >= threshold`.
    pub valid: bool,
    /// Complecount saturated at 7, independent of threshold.
    pub completion: bool,
    pub tier: CoherenceTier,
}

/// Weighted terms, each floored before summing:
/// `floor(165·E/31) + floor(509·C/7)`.
///
/// Inputs above their field maxima are clamped.
pub fn coherence_terms(phase_entropy_index: u8, complecount: u8) -> (u16, u16) {
    let e = phase_entropy_index.min(ENTROPY_MAX) as u32;
    let c = complecount.min(COMPLECOUNT_MAX) as u32;
    let entropy_term = ENTROPY_WEIGHT * e / ENTROPY_MAX as u32;
    let complecount_term = COMPLECOUNT_WEIGHT * c / COMPLECOUNT_MAX as u32;
    (entropy_term as u16, complecount_term as u16)
}

/// Coherence score on the ×100 scale, 0..=674.
pub fn coherence_score(phase_entropy_index: u8, complecount: u8) -> u16 {
    let (e, c) = coherence_terms(phase_entropy_index, complecount);
    e + c
}

/// Map a ×100 score onto the 6-bit anchor scale, rounding to nearest.
pub fn to_six_bit(score: u16) -> u8 {
    let score = score.min(MAX_SCORE) as u32;
    ((score * 63 + MAX_SCORE as u32 / 2) / MAX_SCORE as u32) as u8
}

/// Scores packets against a fixed threshold.
#[derive(Clone, Copy, Debug)]
pub struct CoherenceEvaluator {
    threshold: u16,
}

impl CoherenceEvaluator {
    /// Thresholds above 1023 are clamped to the comparator width.
    pub fn new(threshold: u16) -> Self {
        Self {
            threshold: threshold.min(MAX_THRESHOLD),
        }
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    pub fn evaluate(&self, phase_entropy_index: u8, complecount: u8) -> CoherenceReport {
        let (entropy_term, complecount_term) = coherence_terms(phase_entropy_index, complecount);
        let score = entropy_term + complecount_term;
        CoherenceReport {
            score,
            entropy_term,
            complecount_term,
            valid: score >= self.threshold,
            completion: complecount >= COMPLECOUNT_MAX,
            tier: CoherenceTier::of(score),
        }
    }
}
