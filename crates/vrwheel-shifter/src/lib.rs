//! Virtual shifter for a tracked hand
//!
//! A hand snapped to the shifter drags the stick; its continuous deflection is
//! quantized onto an H-pattern gear grid (or a single up/down lane in
//! sequential mode) and the occupied cell is reported as a virtual button.
//! Splitter and range are latched toggles on their own buttons.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod engine;
pub mod geometry;
pub mod thresholds;
pub mod types;

pub use engine::*;
pub use geometry::*;
pub use thresholds::*;
pub use types::*;

use thiserror::Error;
use vrwheel_errors::ValidationError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShifterError {
    #[error("Invalid grid position: x={x}, z={z}")]
    InvalidGridPosition { x: i8, z: i8 },

    #[error("Invalid shifter configuration: {0}")]
    Validation(#[from] ValidationError),
}

pub type ShifterResult<T> = Result<T, ShifterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(BUTTON_SPLITTER, 49);
        assert_eq!(BUTTON_RANGE, 50);
        assert_eq!(BUTTON_REVERSE, 51);
    }

    #[test]
    fn test_error_display_invalid_position() {
        let err = ShifterError::InvalidGridPosition { x: 3, z: 0 };
        assert!(err.to_string().contains("x=3"));
    }

    #[test]
    fn test_error_from_validation() {
        let err: ShifterError = ValidationError::constraint("z_mid_margin >= z_end_margin").into();
        assert!(err.to_string().contains("z_mid_margin"));
    }
}
