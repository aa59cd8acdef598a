//! Tunable margins of the gear resolver and toggle gestures
//!
//! The margins are calibration values, not constants of the pattern; they are
//! exposed in configuration so they can be fitted to a real shifter.

use core::time::Duration;

use serde::{Deserialize, Serialize};
use vrwheel_errors::{ValidationError, validate_range};

use crate::ShifterResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShifterThresholds {
    /// `|x|` at or below which the middle row snaps to the center column
    pub x_mid_margin: f64,
    /// `|z|` at or below which the stick counts as in the middle row
    pub z_mid_margin: f64,
    /// `|z|` above which a row engages
    pub z_end_margin: f64,
    /// Overshoot, in grid units, beyond which resistance haptics start
    pub restrain_margin: f64,
    /// Trigger reading at or above which reverse is unlocked
    pub reverse_unlock_trigger: f64,
    /// Trackpad deflection that sets (up) or clears (down) range
    pub range_trackpad: f64,
    /// Two snaps closer than this toggle the splitter
    pub double_tap_window: Duration,
    /// Minimum spacing between gear sounds
    pub gear_sound_interval: Duration,
    /// Minimum spacing between neutral sounds
    pub neutral_sound_interval: Duration,
}

impl Default for ShifterThresholds {
    fn default() -> Self {
        Self {
            x_mid_margin: 0.55,
            z_mid_margin: 0.7,
            z_end_margin: 0.85,
            restrain_margin: 1.5,
            reverse_unlock_trigger: 0.7,
            range_trackpad: 0.8,
            double_tap_window: Duration::from_millis(500),
            gear_sound_interval: Duration::from_millis(70),
            neutral_sound_interval: Duration::from_millis(160),
        }
    }
}

impl ShifterThresholds {
    /// # Errors
    ///
    /// Returns a validation error if a margin is outside `(0, 1)` or the rows
    /// overlap.
    pub fn validate(&self) -> ShifterResult<()> {
        validate_range!("shifter.x_mid_margin", self.x_mid_margin, 0.05, 0.95);
        validate_range!("shifter.z_mid_margin", self.z_mid_margin, 0.05, 0.95);
        validate_range!("shifter.z_end_margin", self.z_end_margin, 0.05, 0.99);
        if self.z_mid_margin >= self.z_end_margin {
            return Err(ValidationError::unordered(
                "shifter.z_mid_margin",
                self.z_mid_margin,
                "shifter.z_end_margin",
                self.z_end_margin,
            )
            .into());
        }
        validate_range!("shifter.restrain_margin", self.restrain_margin, 0.1, 4.0);
        validate_range!("shifter.reverse_unlock_trigger", self.reverse_unlock_trigger, 0.0, 1.0);
        validate_range!("shifter.range_trackpad", self.range_trackpad, 0.1, 1.0);
        Ok(())
    }
}
