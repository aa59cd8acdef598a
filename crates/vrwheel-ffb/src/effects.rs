//! Per-block effect state
//!
//! An effect exists as soon as any packet names its block. It only contributes
//! force once an Effect Operation starts it.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::packet::{EffectDuration, EffectParameters};
use crate::FfbDirection;

/// Playback clock of a started effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playback {
    pub started_at: Instant,
    /// `0` loops forever
    pub loop_count: u8,
}

impl Playback {
    /// Total play time, or `None` when the effect never expires.
    pub fn total_duration(&self, duration: EffectDuration) -> Option<Duration> {
        match duration {
            EffectDuration::Infinite => None,
            _ if self.loop_count == 0 => None,
            EffectDuration::Finite(one_loop) => Some(one_loop.saturating_mul(u32::from(self.loop_count))),
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}

/// One effect block as the game last described it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FfbEffect {
    pub block_index: u8,
    /// Constant force magnitude, `-1.0..=1.0`
    pub magnitude: f32,
    /// Per-effect gain, `0.0..=1.0`
    pub gain: f32,
    pub duration: EffectDuration,
    pub direction: FfbDirection,
    pub effect_type: u8,
    /// `None` while the effect is only parameterized
    pub playback: Option<Playback>,
}

impl FfbEffect {
    pub fn new(block_index: u8) -> Self {
        Self {
            block_index,
            magnitude: 0.0,
            gain: 1.0,
            duration: EffectDuration::Infinite,
            direction: FfbDirection::default(),
            effect_type: 0,
            playback: None,
        }
    }

    pub fn apply_parameters(&mut self, parameters: EffectParameters) {
        self.effect_type = parameters.effect_type;
        self.duration = parameters.duration;
        self.gain = parameters.gain;
        self.direction = parameters.direction;
    }

    pub fn start(&mut self, now: Instant, loop_count: u8) {
        self.playback = Some(Playback {
            started_at: now,
            loop_count,
        });
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    /// True once a finite effect has played strictly longer than all its loops.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.playback.is_some_and(|playback| {
            playback
                .total_duration(self.duration)
                .is_some_and(|total| playback.elapsed(now) > total)
        })
    }

    /// Force this effect adds to the sum while playing.
    pub fn contribution(&self) -> f32 {
        if self.is_playing() {
            self.magnitude * self.gain
        } else {
            0.0
        }
    }

    /// Move the playback clock forward, excluding a paused interval.
    pub fn shift_clock(&mut self, by: Duration) {
        if let Some(playback) = self.playback.as_mut() {
            playback.started_at = playback.started_at.checked_add(by).unwrap_or(playback.started_at);
        }
    }

    pub fn summary(&self) -> EffectSummary {
        EffectSummary {
            block_index: self.block_index,
            magnitude: self.magnitude,
            gain: self.gain,
            playing: self.is_playing(),
        }
    }
}

/// Serializable snapshot of one effect, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSummary {
    pub block_index: u8,
    pub magnitude: f32,
    pub gain: f32,
    pub playing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dormant_effect_contributes_nothing() {
        let mut effect = FfbEffect::new(1);
        effect.magnitude = 0.8;
        assert!(effect.contribution().abs() < f32::EPSILON);
        assert!(!effect.is_expired(Instant::now()));
    }

    #[test]
    fn test_expiry_is_strict() {
        let t0 = Instant::now();
        let mut effect = FfbEffect::new(1);
        effect.duration = EffectDuration::Finite(Duration::from_millis(100));
        effect.start(t0, 1);
        assert!(!effect.is_expired(t0 + Duration::from_millis(100)));
        assert!(effect.is_expired(t0 + Duration::from_millis(101)));
    }

    #[test]
    fn test_zero_loops_never_expire() {
        let t0 = Instant::now();
        let mut effect = FfbEffect::new(1);
        effect.duration = EffectDuration::Finite(Duration::from_millis(10));
        effect.start(t0, 0);
        assert!(!effect.is_expired(t0 + Duration::from_secs(3600)));
    }

    #[test]
    fn test_shift_clock_delays_expiry() {
        let t0 = Instant::now();
        let mut effect = FfbEffect::new(1);
        effect.duration = EffectDuration::Finite(Duration::from_millis(100));
        effect.start(t0, 1);
        effect.shift_clock(Duration::from_millis(50));
        assert!(!effect.is_expired(t0 + Duration::from_millis(140)));
        assert!(effect.is_expired(t0 + Duration::from_millis(151)));
    }
}
