use thiserror::Error;

/// Errors from encoding or decoding wire-level records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("truncated record: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("CRC mismatch: computed {computed:#04x}, stored {stored:#04x}")]
    CrcMismatch { computed: u8, stored: u8 },

    #[error("invalid address: theta={theta} phi={phi} omega={omega}")]
    InvalidAddress { theta: u8, phi: u8, omega: u8 },

    #[error("field {field} out of range: {value} > {max}")]
    FieldOutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("payload too large: {len} > {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },
}

impl TypesError {
    /// Structural errors reject a record before any semantic processing.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TypesError::Truncated { .. } | TypesError::CrcMismatch { .. }
        )
    }
}

/// Check that `value` fits in `max`, naming the field on failure.
pub(crate) fn check_range(field: &'static str, value: u64, max: u64) -> Result<(), TypesError> {
    if value > max {
        return Err(TypesError::FieldOutOfRange { field, value, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_classification() {
        assert!(TypesError::Truncated {
            expected: 18,
            actual: 3
        }
        .is_structural());
        assert!(TypesError::CrcMismatch {
            computed: 1,
            stored: 2
        }
        .is_structural());
        assert!(!TypesError::InvalidAddress {
            theta: 0,
            phi: 0,
            omega: 0
        }
        .is_structural());
    }

    #[test]
    fn error_display() {
        let err = TypesError::CrcMismatch {
            computed: 0x1f,
            stored: 0x20,
        };
        assert_eq!(err.to_string(), "CRC mismatch: computed 0x1f, stored 0x20");
    }

    #[test]
    fn range_check() {
        assert!(check_range("somatic", 15, 15).is_ok());
        let err = check_range("somatic", 16, 15).unwrap_err();
        assert!(err.to_string().contains("somatic"));
    }
}
