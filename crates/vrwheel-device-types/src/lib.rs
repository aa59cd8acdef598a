//! Device types for the VR wheel engine
//!
//! This crate provides the plain data exchanged between the pose source, the
//! wheel and shifter engines, and the output collaborators: tracked controller
//! poses, button events, haptic envelopes, sound cues and the virtual HID
//! axis range.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod controller;
pub mod feedback;
pub mod vector;

pub use controller::*;
pub use feedback::*;
pub use vector::*;

/// Lowest legal value of the virtual wheel axis.
pub const AXIS_MIN: u16 = 0;

/// Highest legal value of the virtual wheel axis.
pub const AXIS_MAX: u16 = 0x8000;

/// Axis value of a centered wheel.
pub const AXIS_CENTER: u16 = 0x4000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_constants() {
        assert!(AXIS_MIN < AXIS_CENTER);
        assert!(AXIS_CENTER < AXIS_MAX);
        assert_eq!(AXIS_CENTER * 2, AXIS_MAX);
    }
}
