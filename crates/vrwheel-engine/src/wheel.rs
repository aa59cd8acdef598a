//! Steering wheel physics
//!
//! One tick takes the two hand samples and which of them are on the rim, and
//! produces the continuous wheel angle plus the HID axis value. Grabs never
//! make the wheel jump: every new grip records the offset between the stored
//! angle and the hand's raw angle and steers relative to it.

use core::f64::consts::{PI, TAU};
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use vrwheel_device_types::{AXIS_MAX, Hand, HapticEnvelope, HapticRequest, Vec3};
use vrwheel_errors::prelude::*;
use vrwheel_errors::{validate, validate_range};

use crate::geometry::WheelFrame;

/// Samples kept in the angle history.
pub const ANGLE_HISTORY_LEN: usize = 10;

/// Radius around the hub inside which a single steering hand is damped.
pub const CENTER_GUARD_RADIUS: f64 = 0.08;

/// Pulse sent to the steering hands while the limiter holds the wheel.
pub const END_STOP_PULSE_US: u16 = 3000;

/// Turn speed the limiter leaves behind, pointing back into range.
pub const LIMITER_REBOUND: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    /// Configured hub position in tracking space
    pub center: Vec3,
    /// Rim diameter (meters)
    pub size: f64,
    /// Lock-to-lock rotation
    pub degrees: f64,
    /// Centering strength multiplier
    pub centerforce: f64,
    /// Tilt about the X axis (degrees)
    pub pitch: f64,
    /// Per-tick decay of the free-spinning turn speed
    pub inertia: f64,
    /// Base centering step (radians per tick)
    pub center_speed: f64,
    /// Rim opacity (percent)
    pub alpha: f64,
    pub adaptive_center: bool,
    pub transparent_center: bool,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            center: Vec3::new(0.0, -0.4, -0.35),
            size: 0.55,
            degrees: 1440.0,
            centerforce: 3.0,
            pitch: 0.0,
            inertia: 0.95,
            center_speed: PI / 180.0,
            alpha: 100.0,
            adaptive_center: false,
            transparent_center: false,
        }
    }
}

impl WheelConfig {
    /// # Errors
    ///
    /// Returns the first field outside its legal range.
    pub fn validate(&self) -> Result<()> {
        validate!(
            self.center.is_finite(),
            ValidationError::not_finite("wheel.center")
        );
        validate_range!("wheel.size", self.size, 0.05, 2.0);
        validate_range!("wheel.degrees", self.degrees, 90.0, 3600.0);
        validate_range!("wheel.centerforce", self.centerforce, 0.0, 100.0);
        validate_range!("wheel.pitch", self.pitch, -90.0, 180.0);
        validate_range!("wheel.inertia", self.inertia, 0.0, 1.0);
        validate_range!("wheel.center_speed", self.center_speed, 0.0, PI);
        validate_range!("wheel.alpha", self.alpha, 0.0, 100.0);
        Ok(())
    }

    /// Angle at which the limiter stops the wheel, radians.
    pub fn limit(&self) -> f64 {
        self.degrees / 360.0 * PI
    }
}

/// `delta` folded into `[-π, π)`.
pub fn wrap_angle(delta: f64) -> f64 {
    (delta + PI).rem_euclid(TAU) - PI
}

/// Map an unwrapped wheel angle to the HID rotation axis.
///
/// Zero maps to the axis center, turning left (positive angle) lowers the
/// value. The result is clamped into `[0, AXIS_MAX]`.
///
/// # Examples
///
/// ```
/// use vrwheel_engine::angle_to_axis;
/// use vrwheel_device_types::{AXIS_CENTER, AXIS_MAX};
///
/// assert_eq!(angle_to_axis(0.0, 900.0), AXIS_CENTER);
/// assert_eq!(angle_to_axis(-100.0, 900.0), AXIS_MAX);
/// assert_eq!(angle_to_axis(f64::NAN, 900.0), AXIS_CENTER);
/// ```
pub fn angle_to_axis(angle: f64, degrees: f64) -> u16 {
    let max = f64::from(AXIS_MAX);
    let turns = angle / TAU;
    let value = ((-turns / (degrees / 360.0) + 0.5) * max).round();
    if !value.is_finite() {
        return AXIS_MAX / 2;
    }
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "clamped into [0, AXIS_MAX] first"
    )]
    let axis = value.clamp(0.0, max) as u16;
    axis
}

/// Recent unwrapped wheel angles, newest last.
///
/// Starts as `[0.0, 0.0]` and never holds fewer than two samples, so the
/// turn speed is always defined.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleHistory {
    samples: VecDeque<f64>,
}

impl Default for AngleHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl AngleHistory {
    pub fn new() -> Self {
        let mut samples = VecDeque::with_capacity(ANGLE_HISTORY_LEN);
        samples.push_back(0.0);
        samples.push_back(0.0);
        Self { samples }
    }

    /// Append a continuous sample.
    pub fn push(&mut self, angle: f64) {
        if self.samples.len() >= ANGLE_HISTORY_LEN {
            self.samples.pop_front();
        }
        self.samples.push_back(angle);
    }

    /// Append `angle` moved by whole turns to the closest value to the last sample.
    pub fn push_unwrapped(&mut self, angle: f64) -> f64 {
        let last = self.last();
        let unwrapped = last + wrap_angle(angle - last);
        self.push(unwrapped);
        unwrapped
    }

    pub fn last(&self) -> f64 {
        self.samples.back().copied().unwrap_or_default()
    }

    pub fn previous(&self) -> f64 {
        self.samples
            .iter()
            .rev()
            .nth(1)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_last(&mut self, angle: f64) {
        if let Some(last) = self.samples.back_mut() {
            *last = angle;
        }
    }

    pub fn turn_speed(&self) -> f64 {
        self.last() - self.previous()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabPoint {
    pub position: Vec3,
    pub controller_id: u32,
}

/// Who is steering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrabState {
    Free,
    OneHand { hand: Hand, grab: GrabPoint },
    TwoHand,
}

/// One hand as the wheel sees it this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandSample {
    pub position: Vec3,
    pub controller_id: u32,
    /// Attached to the wheel (manually or by proximity)
    pub on_wheel: bool,
}

impl HandSample {
    fn grab_point(&self) -> GrabPoint {
        GrabPoint {
            position: self.position,
            controller_id: self.controller_id,
        }
    }
}

/// Input of one [`WheelEngine::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelTick {
    pub left: HandSample,
    pub right: HandSample,
    /// Smoothed force-feedback magnitude, `None` when FFB centering is off
    pub ffb: Option<f32>,
}

impl WheelTick {
    fn hand(&self, hand: Hand) -> &HandSample {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }
}

/// Result of one [`WheelEngine::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelOutput {
    /// Unwrapped angle, radians
    pub angle: f64,
    pub axis: u16,
    /// The limiter clamped the angle this tick
    pub limited: bool,
    /// A raw angle was rejected and the previous angle held
    pub held_last_value: bool,
}

#[derive(Debug, Clone)]
pub struct WheelEngine {
    config: WheelConfig,
    frame: WheelFrame,
    history: AngleHistory,
    grab: GrabState,
    offset: f64,
    turn_speed: f64,
    /// Raw angle captured when the steering hand entered the hub guard
    pivot: Option<f64>,
}

impl WheelEngine {
    pub fn new(config: WheelConfig) -> Self {
        Self {
            config,
            frame: WheelFrame::new(config.center, config.size, config.pitch),
            history: AngleHistory::new(),
            grab: GrabState::Free,
            offset: 0.0,
            turn_speed: 0.0,
            pivot: None,
        }
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    /// Apply a new configuration; the angle and grab state carry over.
    pub fn reconfigure(&mut self, config: WheelConfig) {
        self.frame.reposition(config.center, config.size, config.pitch);
        if !config.adaptive_center {
            self.frame.reset_adaptive_offset();
        }
        self.config = config;
    }

    pub fn frame(&self) -> &WheelFrame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut WheelFrame {
        &mut self.frame
    }

    pub fn history(&self) -> &AngleHistory {
        &self.history
    }

    pub fn angle(&self) -> f64 {
        self.history.last()
    }

    pub fn axis(&self) -> u16 {
        angle_to_axis(self.history.last(), self.config.degrees)
    }

    pub fn grab_state(&self) -> GrabState {
        self.grab
    }

    pub fn grab_offset(&self) -> f64 {
        self.offset
    }

    pub fn turn_speed(&self) -> f64 {
        self.turn_speed
    }

    pub fn is_held(&self) -> bool {
        !matches!(self.grab, GrabState::Free)
    }

    /// Forget the two-hand grip; the next tick with both hands on the rim
    /// grips again from the current angle.
    pub fn unsnap_two_hand(&mut self) {
        if matches!(self.grab, GrabState::TwoHand) {
            debug!("Two-hand grip released");
            self.grab = GrabState::Free;
        }
    }

    /// Advance the wheel by one tick.
    ///
    /// Limiter end-stop pulses for the steering hands are appended to `haptics`.
    pub fn update(&mut self, tick: &WheelTick, haptics: &mut Vec<HapticRequest>) -> WheelOutput {
        let mut held_last_value = false;
        if let Some(angle) = self.steer(tick) {
            if angle.is_finite() {
                self.history.push_unwrapped(angle);
            } else {
                warn!(angle, "Rejected non-finite wheel angle, holding last value");
                held_last_value = true;
                self.history.push(self.history.last());
            }
        }

        self.apply_inertia();
        if !tick.left.on_wheel && !tick.right.on_wheel {
            self.apply_centering(tick.ffb);
        }
        let limited = self.apply_limiter(tick, haptics);

        WheelOutput {
            angle: self.history.last(),
            axis: self.axis(),
            limited,
            held_last_value,
        }
    }

    /// Target angle from the hands on the rim, or `None` when nobody steers.
    fn steer(&mut self, tick: &WheelTick) -> Option<f64> {
        let last = self.history.last();
        match (tick.left.on_wheel, tick.right.on_wheel) {
            (true, true) => {
                let raw = self
                    .frame
                    .double_raw_angle(tick.left.position, tick.right.position);
                if !raw.is_finite() {
                    return Some(raw);
                }
                if !matches!(self.grab, GrabState::TwoHand) {
                    debug!(angle = last, "Two-hand grip");
                    self.grab = GrabState::TwoHand;
                    self.offset = last - raw;
                    self.pivot = None;
                }
                Some(raw + self.offset)
            }
            (left, right) if left || right => {
                // The right hand steers when both could.
                let hand = if right { Hand::Right } else { Hand::Left };
                let sample = *tick.hand(hand);
                let raw = self.frame.raw_angle(sample.position);
                if !raw.is_finite() {
                    return Some(raw);
                }
                let continuing = matches!(
                    self.grab,
                    GrabState::OneHand { hand: h, grab } if h == hand && grab.controller_id == sample.controller_id
                );
                if !continuing {
                    debug!(%hand, angle = last, "One-hand grip");
                    self.grab = GrabState::OneHand {
                        hand,
                        grab: sample.grab_point(),
                    };
                    self.offset = last - raw;
                    self.pivot = None;
                }
                Some(self.guard_hub_crossing(sample.position, raw) + self.offset)
            }
            _ => {
                if self.is_held() {
                    debug!(turn_speed = self.turn_speed, "Wheel released");
                }
                self.grab = GrabState::Free;
                self.pivot = None;
                None
            }
        }
    }

    /// Damp the raw angle of a hand passing close to the hub, where a small
    /// movement would otherwise swing the angle by up to half a turn.
    fn guard_hub_crossing(&mut self, position: Vec3, raw: f64) -> f64 {
        let distance = self.frame.hub_distance(position);
        if distance >= CENTER_GUARD_RADIUS {
            self.pivot = None;
            return raw;
        }
        let pivot = *self.pivot.get_or_insert(raw);
        let falloff = (distance / CENTER_GUARD_RADIUS).powi(2);
        pivot + wrap_angle(raw - pivot) * falloff
    }

    fn apply_inertia(&mut self) {
        if self.is_held() {
            self.turn_speed = self.history.turn_speed();
        } else {
            self.history.push(self.history.last() + self.turn_speed);
            self.turn_speed *= self.config.inertia;
        }
    }

    fn apply_centering(&mut self, ffb: Option<f32>) {
        let step = self.config.center_speed * self.config.centerforce;
        let angle = self.history.last();
        match ffb {
            Some(magnitude) if magnitude.is_finite() => {
                self.history.set_last(angle + step * f64::from(magnitude));
            }
            Some(_) => {}
            None => {
                if angle.abs() < step {
                    self.history.set_last(0.0);
                } else {
                    self.history.set_last(angle - step * angle.signum());
                }
            }
        }
    }

    fn apply_limiter(&mut self, tick: &WheelTick, haptics: &mut Vec<HapticRequest>) -> bool {
        let limit = self.config.limit();
        let angle = self.history.last();
        if angle.abs() <= limit {
            return false;
        }
        let sign = angle.signum();
        let clamped = limit * sign;
        self.history.set_last(clamped);
        if self.is_held() {
            // Re-anchor the grip on the end stop so travel past it is discarded
            // instead of piling up until the unwrap folds it back by a turn.
            self.offset += clamped - angle;
        }
        self.turn_speed = -LIMITER_REBOUND * sign;
        trace!(angle, limit, "Rotation limiter engaged");

        for hand in Hand::ALL {
            let sample = tick.hand(hand);
            if sample.on_wheel {
                haptics.push(HapticRequest {
                    hand,
                    controller_id: sample.controller_id,
                    envelope: HapticEnvelope::pulse_us(END_STOP_PULSE_US),
                });
            }
        }
        true
    }
}
