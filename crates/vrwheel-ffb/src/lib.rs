//! Force-feedback decoding for the virtual wheel
//!
//! Games talk to the virtual joystick through PID output reports. This crate
//! turns those reports into typed [`FfbPacket`]s, tracks the effects they
//! describe, and reduces everything to one smoothed centering magnitude per
//! tick plus a short history the haptic estimator reads.
//!
//! - [`packet`]: raw report parsing
//! - [`effects`]: per-block effect state and expiry
//! - [`decoder`]: the effect table and per-tick summation
//! - [`history`] / [`haptics`]: smoothed output history and vibration estimate
//! - [`shared`]: thread-safe handle for the report callback and the frame loop
//! - [`stats`]: packet counters for periodic logging

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod constants;
pub mod decoder;
pub mod effects;
pub mod haptics;
pub mod history;
pub mod packet;
pub mod shared;
pub mod stats;

pub use constants::*;
pub use decoder::*;
pub use effects::*;
pub use haptics::*;
pub use history::*;
pub use packet::*;
pub use shared::*;
pub use stats::*;

use serde::{Deserialize, Serialize};

/// Heading a Set Effect report attaches to an effect.
///
/// Centering ignores it; it is decoded so the effect table keeps what the game
/// sent and diagnostics can show it.
///
/// ```
/// use vrwheel_ffb::FfbDirection;
///
/// // 256 polar steps per turn, so 64 is a quarter turn
/// assert!((FfbDirection::from_polar_byte(64).degrees - 90.0).abs() < 1e-4);
/// assert!((FfbDirection::new(-30.0).degrees - 330.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FfbDirection {
    /// Heading in `[0, 360)` degrees.
    pub degrees: f32,
}

impl FfbDirection {
    /// Any heading in degrees, folded into one turn.
    pub fn new(degrees: f32) -> Self {
        let folded = degrees.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs
        Self {
            degrees: if folded >= 360.0 { 0.0 } else { folded },
        }
    }

    /// Decode the one-byte polar field.
    pub fn from_polar_byte(raw: u8) -> Self {
        Self::new(f32::from(raw) * 360.0 / 256.0)
    }

    pub fn radians(self) -> f32 {
        self.degrees.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_fold_into_one_turn() {
        for (input, expected) in [(450.0_f32, 90.0_f32), (-90.0, 270.0), (720.0, 0.0)] {
            let folded = FfbDirection::new(input).degrees;
            assert!((folded - expected).abs() < 1e-4, "{input} folded to {folded}");
        }
        assert!(FfbDirection::new(-1e-9).degrees < 360.0);
    }

    #[test]
    fn test_polar_byte_spans_one_turn() {
        assert!(FfbDirection::from_polar_byte(0).degrees.abs() < f32::EPSILON);
        let last = FfbDirection::from_polar_byte(u8::MAX).degrees;
        assert!(last > 358.0 && last < 360.0);
        let half = FfbDirection::from_polar_byte(128).radians();
        assert!((half - std::f32::consts::PI).abs() < 1e-4);
    }
}
