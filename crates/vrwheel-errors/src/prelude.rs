//! Prelude module for convenient error handling imports.
//!
//! # Example
//!
//! ```
//! use vrwheel_errors::prelude::*;
//! use vrwheel_errors::validate_range;
//!
//! fn inertia(value: f64) -> Result<f64> {
//!     validate_range!("wheel.inertia", value, 0.0, 1.0);
//!     Ok(value)
//! }
//!
//! assert!(inertia(0.95).is_ok());
//! assert!(inertia(1.5).is_err());
//! ```

pub use crate::{
    ReportResult, Result,
    common::{ErrorCategory, ErrorSeverity, VrWheelError},
    report::ReportError,
    tick::TickFault,
    validation::ValidationError,
};

/// Return early with `$error` when `$condition` does not hold.
#[macro_export]
macro_rules! validate {
    ($condition:expr, $error:expr) => {
        if !$condition {
            return Err($error.into());
        }
    };
}

/// Return early with an out-of-range error when `$value` is outside `[$min, $max]`.
///
/// NaN never satisfies the range and is rejected too.
#[macro_export]
macro_rules! validate_range {
    ($field:expr, $value:expr, $min:expr, $max:expr) => {
        if !($value >= $min && $value <= $max) {
            return Err($crate::ValidationError::out_of_range($field, $value, $min, $max).into());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_macro() {
        fn check() -> Result<()> {
            validate!(false, ValidationError::not_finite("wheel.center"));
            Ok(())
        }
        assert!(check().is_err());
    }

    #[test]
    fn test_validate_range_macro_rejects_nan() {
        fn check(value: f64) -> Result<()> {
            validate_range!("wheel.pitch", value, -90.0, 90.0);
            Ok(())
        }
        assert!(check(10.0).is_ok());
        assert!(check(120.0).is_err());
        assert!(check(f64::NAN).is_err());
    }
}
