use rpp_types::ConsentState;

/// Somatic level at or above which consent is FULL.
pub const FULL_THRESHOLD: u8 = 10;
/// Somatic level at or above which consent is DIMINISHED.
pub const DIMINISHED_THRESHOLD: u8 = 6;

/// Map somatic level and verbal override to a consent state.
///
/// Never yields [`ConsentState::Emergency`]; that state is imposed by the
/// freeze controller.
pub fn derive_consent(somatic: u8, verbal_override: bool) -> ConsentState {
    if verbal_override || somatic >= FULL_THRESHOLD {
        ConsentState::Full
    } else if somatic >= DIMINISHED_THRESHOLD {
        ConsentState::Diminished
    } else {
        ConsentState::Suspended
    }
}
