//! Haptic envelopes and sound cues requested by the engine.
//!
//! The engine only decides when to give feedback and with what shape; the
//! delivery primitives live behind the sink traits of the engine crate.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Hand;

/// Shape of a waveform's intensity over its duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IntensityProfile {
    /// Fixed intensity for the whole duration
    Constant(f32),
    /// Linear ramp from `from` at the start to `to` at the end
    Ramp { from: f32, to: f32 },
    /// `pulses` equal on/off bursts at `intensity`
    Bursts { pulses: u8, intensity: f32 },
}

impl IntensityProfile {
    /// Intensity in `[0.0, 1.0]` at `elapsed` into a waveform lasting `duration`.
    pub fn intensity_at(&self, elapsed: Duration, duration: Duration) -> f32 {
        if duration.is_zero() || elapsed >= duration {
            return 0.0;
        }
        let t = (elapsed.as_secs_f64() / duration.as_secs_f64()) as f32;
        let value = match *self {
            IntensityProfile::Constant(level) => level,
            IntensityProfile::Ramp { from, to } => from + (to - from) * t,
            IntensityProfile::Bursts { pulses, intensity } => {
                let pulses = f32::from(pulses.max(1));
                let phase = (t * pulses).fract();
                if phase < 0.5 { intensity } else { 0.0 }
            }
        };
        sanitize_intensity(value)
    }
}

fn sanitize_intensity(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// What a haptic request should feel like.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vrwheel_device_types::{HapticEnvelope, IntensityProfile};
///
/// let tap = HapticEnvelope::pulse_us(3000);
/// assert_eq!(tap.duration(), Duration::from_micros(3000));
///
/// let buzz = HapticEnvelope::waveform(Duration::from_millis(100), IntensityProfile::Constant(0.4));
/// assert!((buzz.intensity_at(Duration::from_millis(50)) - 0.4).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HapticEnvelope {
    /// Single full-strength pulse lasting `duration_us` microseconds
    Pulse { duration_us: u16 },
    /// Intensity function of time
    Waveform {
        duration: Duration,
        profile: IntensityProfile,
    },
}

impl HapticEnvelope {
    pub fn pulse_us(duration_us: u16) -> Self {
        HapticEnvelope::Pulse { duration_us }
    }

    pub fn waveform(duration: Duration, profile: IntensityProfile) -> Self {
        HapticEnvelope::Waveform { duration, profile }
    }

    pub fn duration(&self) -> Duration {
        match *self {
            HapticEnvelope::Pulse { duration_us } => Duration::from_micros(u64::from(duration_us)),
            HapticEnvelope::Waveform { duration, .. } => duration,
        }
    }

    pub fn intensity_at(&self, elapsed: Duration) -> f32 {
        match *self {
            HapticEnvelope::Pulse { .. } => {
                if elapsed < self.duration() {
                    1.0
                } else {
                    0.0
                }
            }
            HapticEnvelope::Waveform { duration, profile } => profile.intensity_at(elapsed, duration),
        }
    }
}

/// A haptic envelope addressed to one hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HapticRequest {
    pub hand: Hand,
    /// Runtime device index of the controller on that hand
    pub controller_id: u32,
    pub envelope: HapticEnvelope,
}

/// Sound effects the shifter asks the audio collaborator to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Stick engaged a forward gear
    ShiftForward,
    /// Stick engaged the reverse lane
    ShiftReverse,
    /// Stick returned to neutral
    Neutral,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_shape() {
        let pulse = HapticEnvelope::pulse_us(300);
        assert!((pulse.intensity_at(Duration::from_micros(100)) - 1.0).abs() < f32::EPSILON);
        assert!(pulse.intensity_at(Duration::from_micros(300)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ramp_profile() {
        let ramp = IntensityProfile::Ramp { from: 1.0, to: 0.0 };
        let d = Duration::from_millis(100);
        assert!((ramp.intensity_at(Duration::ZERO, d) - 1.0).abs() < 1e-6);
        assert!((ramp.intensity_at(Duration::from_millis(50), d) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_bursts_alternate() {
        let bursts = IntensityProfile::Bursts {
            pulses: 2,
            intensity: 0.8,
        };
        let d = Duration::from_millis(200);
        assert!((bursts.intensity_at(Duration::from_millis(10), d) - 0.8).abs() < 1e-6);
        assert!(bursts.intensity_at(Duration::from_millis(60), d).abs() < 1e-6);
        assert!((bursts.intensity_at(Duration::from_millis(110), d) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_intensity_is_clamped() {
        let hot = IntensityProfile::Constant(4.0);
        let nan = IntensityProfile::Constant(f32::NAN);
        let d = Duration::from_millis(10);
        assert!((hot.intensity_at(Duration::ZERO, d) - 1.0).abs() < f32::EPSILON);
        assert!(nan.intensity_at(Duration::ZERO, d).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zero_duration_waveform_is_silent() {
        let w = HapticEnvelope::waveform(Duration::ZERO, IntensityProfile::Constant(1.0));
        assert!(w.intensity_at(Duration::ZERO).abs() < f32::EPSILON);
    }
}
