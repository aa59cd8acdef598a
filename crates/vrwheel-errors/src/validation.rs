//! Validation errors for config snapshots.
//!
//! Field names are the dotted JSON paths (`wheel.degrees`,
//! `shifter.z_end_margin`) so a message points straight at the offending key.

use core::fmt;

/// A config value that cannot be accepted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Value outside its inclusive range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted field path
        field: String,
        /// Rejected value, debug-formatted
        value: String,
        /// Inclusive lower bound
        min: String,
        /// Inclusive upper bound
        max: String,
    },

    /// A position or scalar carried NaN or infinity
    #[error("{field} must be finite")]
    NotFinite {
        /// Dotted field path
        field: String,
    },

    /// Two limits that must be strictly increasing are not
    #[error("{lower} ({lower_value}) must be below {upper} ({upper_value})")]
    Unordered {
        /// Field that must be the smaller one
        lower: String,
        /// Its value
        lower_value: String,
        /// Field that must be the larger one
        upper: String,
        /// Its value
        upper_value: String,
    },

    /// Any other cross-field rule
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl ValidationError {
    /// `field` holds `value`, outside `[min, max]`.
    pub fn out_of_range<T: fmt::Debug>(field: impl Into<String>, value: T, min: T, max: T) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            value: format!("{value:?}"),
            min: format!("{min:?}"),
            max: format!("{max:?}"),
        }
    }

    /// `field` is NaN or infinite.
    pub fn not_finite(field: impl Into<String>) -> Self {
        ValidationError::NotFinite {
            field: field.into(),
        }
    }

    /// `lower` must be strictly below `upper`.
    pub fn unordered<T: fmt::Debug>(
        lower: impl Into<String>,
        lower_value: T,
        upper: impl Into<String>,
        upper_value: T,
    ) -> Self {
        ValidationError::Unordered {
            lower: lower.into(),
            lower_value: format!("{lower_value:?}"),
            upper: upper.into(),
            upper_value: format!("{upper_value:?}"),
        }
    }

    /// Free-form rule violation.
    pub fn constraint(msg: impl Into<String>) -> Self {
        ValidationError::ConstraintViolation(msg.into())
    }

    /// Dotted path of the offending field, when there is exactly one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::OutOfRange { field, .. } | ValidationError::NotFinite { field } => {
                Some(field)
            }
            ValidationError::Unordered { .. } | ValidationError::ConstraintViolation(_) => None,
        }
    }
}
