//! Shifter state machine
//!
//! [`ShifterEngine::update`] runs once per tick. While a hand is snapped it
//! follows that hand, resolves the gear cell and pushes the resulting haptics,
//! sounds and toggle changes into the caller's event buffer.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use vrwheel_device_types::{
    Hand, HapticEnvelope, HapticRequest, IntensityProfile, SoundCue, Vec3,
};

use crate::geometry::ShifterGeometry;
use crate::thresholds::ShifterThresholds;
use crate::types::{
    BUTTON_RANGE, BUTTON_SPLITTER, GridPosition, ReverseSide, SHIFT_BUTTONS, StickXz,
};
use crate::ShifterResult;

/// Pulse on engaging a gear, microseconds.
pub const GEAR_CHANGE_PULSE_US: u16 = 3000;

/// Length of one resistance buzz while the hand overshoots the gate.
pub const RESTRAIN_BUZZ: Duration = Duration::from_millis(16);

/// Two pulses 110 ms apart confirm a splitter or range toggle.
pub const TOGGLE_DOUBLE_PULSE: Duration = Duration::from_millis(220);

/// Fade played in sequential mode when the stick returns to center.
pub const SEQUENTIAL_NEUTRAL_FADE: Duration = Duration::from_millis(60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShifterConfig {
    pub geometry: ShifterGeometry,
    pub thresholds: ShifterThresholds,
    pub reverse_side: ReverseSide,
    /// Collapse the pattern to a single up/down lane
    pub sequential: bool,
}

impl ShifterConfig {
    /// # Errors
    ///
    /// Returns the first geometry or threshold validation failure.
    pub fn validate(&self) -> ShifterResult<()> {
        self.geometry.validate()?;
        self.thresholds.validate()
    }
}

/// Something the shifter wants the outside world to do or know.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShifterEvent {
    Haptic(HapticRequest),
    Sound(SoundCue),
    GearChanged { from: GridPosition, to: GridPosition },
    SplitterToggled(bool),
    RangeToggled(bool),
}

/// Button levels the shifter asserts this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShifterButtons {
    pub gear: Option<u8>,
    pub splitter: bool,
    pub range: bool,
    /// All shift buttons are held released for this tick
    pub ghost_reset: bool,
}

impl ShifterButtons {
    pub fn is_pressed(&self, button: u8) -> bool {
        self.states()
            .any(|(id, pressed)| id == button && pressed)
    }

    /// Level of every button the shifter owns.
    pub fn states(&self) -> impl Iterator<Item = (u8, bool)> + '_ {
        SHIFT_BUTTONS
            .into_iter()
            .map(|id| (id, !self.ghost_reset && self.gear == Some(id)))
            .chain([(BUTTON_SPLITTER, self.splitter), (BUTTON_RANGE, self.range)])
    }
}

/// Resolve a clamped stick deflection into a grid cell and the rendered stick.
///
/// `previous` is last tick's cell. The column can only change while the stick
/// is in the middle row; outside it the column is held and only the row moves.
pub fn resolve_position(
    previous: GridPosition,
    xz: StickXz,
    side: ReverseSide,
    reverse_locked: bool,
    thresholds: &ShifterThresholds,
) -> (GridPosition, StickXz) {
    let rev_x = side.column();
    let rev_z = side.row();
    let toward_reverse_row = |z: f64| if rev_z > 0 { z.max(0.0) } else { z.min(0.0) };

    let mut column = previous.x();
    let row;
    let mut stick = xz;

    if xz.z.abs() <= thresholds.z_mid_margin {
        row = 0;
        let ax = xz.x.abs();
        if ax >= 1.0 {
            if xz.x * f64::from(rev_x) > 0.0 {
                let guard = side.guard_column();
                if reverse_locked && previous.x() != rev_x {
                    stick.x = f64::from(guard);
                    column = guard;
                } else if ax < 2.0 {
                    stick.z = 0.0;
                    column = guard;
                } else {
                    stick.z = toward_reverse_row(stick.z);
                    column = rev_x;
                }
            } else {
                let side_column: i8 = if xz.x < 0.0 { -1 } else { 1 };
                stick.x = f64::from(side_column);
                column = side_column;
            }
        } else if ax <= thresholds.x_mid_margin {
            if ax < xz.z.abs() {
                stick.x = 0.0;
            } else {
                stick.z = 0.0;
            }
            column = 0;
        } else {
            stick.z = 0.0;
        }
    } else {
        stick.x = f64::from(column);
        if column == rev_x {
            stick.z = toward_reverse_row(xz.z);
            row = if xz.z * f64::from(rev_z) > thresholds.z_end_margin {
                rev_z
            } else {
                0
            };
        } else {
            row = if xz.z < -thresholds.z_end_margin {
                -1
            } else if xz.z > thresholds.z_end_margin {
                1
            } else {
                0
            };
        }
    }

    (GridPosition::from_parts(column, row), stick)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Snap {
    hand: Hand,
    controller_id: u32,
    /// Hand position minus knob position at snap time
    offset: Vec3,
}

#[derive(Debug, Clone)]
pub struct ShifterEngine {
    config: ShifterConfig,
    position: GridPosition,
    stick: StickXz,
    snap: Option<Snap>,
    reverse_locked: bool,
    splitter: bool,
    range: bool,
    last_snap_at: Option<Instant>,
    last_gear_sound: Option<Instant>,
    last_neutral_sound: Option<Instant>,
    ghost_reset: bool,
}

impl ShifterEngine {
    pub fn new(config: ShifterConfig) -> Self {
        Self {
            config,
            position: GridPosition::NEUTRAL,
            stick: StickXz::CENTER,
            snap: None,
            reverse_locked: true,
            splitter: false,
            range: false,
            last_snap_at: None,
            last_gear_sound: None,
            last_neutral_sound: None,
            ghost_reset: false,
        }
    }

    pub fn config(&self) -> &ShifterConfig {
        &self.config
    }

    /// Swap in a new configuration. A change of reverse side recenters the stick.
    pub fn reconfigure(&mut self, config: ShifterConfig) {
        if config.reverse_side != self.config.reverse_side
            || (config.sequential && !self.config.sequential)
        {
            self.position = GridPosition::NEUTRAL;
            self.stick = StickXz::CENTER;
        }
        self.config = config;
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    pub fn stick(&self) -> StickXz {
        self.stick
    }

    pub fn knob(&self) -> Vec3 {
        self.config.geometry.knob(self.stick)
    }

    pub fn snapped_hand(&self) -> Option<Hand> {
        self.snap.map(|snap| snap.hand)
    }

    pub fn is_snapped(&self) -> bool {
        self.snap.is_some()
    }

    pub fn splitter(&self) -> bool {
        self.splitter
    }

    pub fn range(&self) -> bool {
        self.range
    }

    pub fn reverse_locked(&self) -> bool {
        self.reverse_locked
    }

    pub fn check_collision(&self, point: Vec3) -> bool {
        self.config.geometry.capsule_contains(self.stick, point)
    }

    /// Bind `hand` to the stick. A second snap within the double-tap window
    /// toggles the splitter.
    pub fn snap(
        &mut self,
        hand: Hand,
        controller_id: u32,
        position: Vec3,
        now: Instant,
        events: &mut Vec<ShifterEvent>,
    ) {
        self.snap = Some(Snap {
            hand,
            controller_id,
            offset: position - self.knob(),
        });

        let double_tap = self.last_snap_at.is_some_and(|previous| {
            now.saturating_duration_since(previous) < self.config.thresholds.double_tap_window
        });
        if double_tap {
            debug!(%hand, "Double tap on shifter");
            self.last_snap_at = None;
            self.toggle_splitter(events);
        } else {
            self.last_snap_at = Some(now);
        }
    }

    /// Release the stick. It stays in gear, or springs to center from a neutral lane.
    pub fn unsnap(&mut self) {
        self.snap = None;
        if self.position.button().is_none() {
            self.position = GridPosition::NEUTRAL;
        }
        self.stick = StickXz::from(self.position);
    }

    pub fn lock_reverse(&mut self) {
        self.reverse_locked = true;
    }

    pub fn unlock_reverse(&mut self) {
        self.reverse_locked = false;
    }

    /// Reverse stays locked out unless the trigger is pulled past the unlock threshold.
    pub fn apply_trigger(&mut self, trigger: f64) {
        self.reverse_locked = trigger < self.config.thresholds.reverse_unlock_trigger;
    }

    /// Trackpad up sets range, trackpad down clears it.
    pub fn apply_trackpad(&mut self, trackpad_y: f64, events: &mut Vec<ShifterEvent>) {
        let threshold = self.config.thresholds.range_trackpad;
        if trackpad_y >= threshold {
            self.set_range(true, events);
        } else if trackpad_y <= -threshold {
            self.set_range(false, events);
        }
    }

    pub fn toggle_splitter(&mut self, events: &mut Vec<ShifterEvent>) {
        self.splitter = !self.splitter;
        debug!(splitter = self.splitter, "Splitter toggled");
        events.push(ShifterEvent::SplitterToggled(self.splitter));
        self.confirm_toggle(events);
    }

    pub fn toggle_range(&mut self, events: &mut Vec<ShifterEvent>) {
        self.set_range(!self.range, events);
    }

    /// Latch range to `on`; no-op if it already is.
    pub fn set_range(&mut self, on: bool, events: &mut Vec<ShifterEvent>) {
        if self.range == on {
            return;
        }
        self.range = on;
        debug!(range = on, "Range toggled");
        events.push(ShifterEvent::RangeToggled(on));
        self.confirm_toggle(events);
    }

    fn confirm_toggle(&self, events: &mut Vec<ShifterEvent>) {
        self.haptic(
            HapticEnvelope::waveform(
                TOGGLE_DOUBLE_PULSE,
                IntensityProfile::Bursts {
                    pulses: 2,
                    intensity: 1.0,
                },
            ),
            events,
        );
    }

    fn haptic(&self, envelope: HapticEnvelope, events: &mut Vec<ShifterEvent>) {
        if let Some(snap) = self.snap {
            events.push(ShifterEvent::Haptic(HapticRequest {
                hand: snap.hand,
                controller_id: snap.controller_id,
                envelope,
            }));
        }
    }

    /// Follow the snapped hand for one tick.
    ///
    /// `hand_position` is the current position of the snapped hand; ticks
    /// without a snapped hand or a position only clear the ghost reset.
    pub fn update(
        &mut self,
        hand_position: Option<Vec3>,
        now: Instant,
        events: &mut Vec<ShifterEvent>,
    ) {
        self.ghost_reset = false;

        let (Some(snap), Some(hand_position)) = (self.snap, hand_position) else {
            return;
        };

        let config = self.config;
        let mut raw = config.geometry.normalize(hand_position - snap.offset);
        let mut previous = self.position;
        if config.sequential {
            raw.x = 0.0;
            previous = GridPosition::from_parts(0, previous.z());
        }
        let clamped = config.reverse_side.clamp(raw);

        let (next, stick) = resolve_position(
            previous,
            clamped,
            config.reverse_side,
            self.reverse_locked,
            &config.thresholds,
        );
        trace!(x = raw.x, z = raw.z, %next, "Shifter resolved");

        let overshoot = (raw.x - f64::from(next.x()))
            .abs()
            .max((raw.z - f64::from(next.z())).abs());
        if overshoot > config.thresholds.restrain_margin {
            let intensity = (overshoot / (2.0 * config.thresholds.restrain_margin)).min(1.0);
            self.haptic(
                HapticEnvelope::waveform(
                    RESTRAIN_BUZZ,
                    IntensityProfile::Constant(intensity as f32),
                ),
                events,
            );
        }

        let from = self.position;
        self.stick = stick;
        self.position = next;
        if next != from {
            self.on_position_change(from, next, now, events);
        }
    }

    fn on_position_change(
        &mut self,
        from: GridPosition,
        to: GridPosition,
        now: Instant,
        events: &mut Vec<ShifterEvent>,
    ) {
        if !to.is_neutral() {
            debug!(%from, %to, "Gear engaged");
            events.push(ShifterEvent::GearChanged { from, to });
            self.haptic(HapticEnvelope::pulse_us(GEAR_CHANGE_PULSE_US), events);
            if rate_ok(self.last_gear_sound, now, self.config.thresholds.gear_sound_interval) {
                let cue = if to.is_reverse() {
                    SoundCue::ShiftReverse
                } else {
                    SoundCue::ShiftForward
                };
                events.push(ShifterEvent::Sound(cue));
                self.last_gear_sound = Some(now);
            }
            self.ghost_reset = true;
            self.last_snap_at = None;
        } else if !from.is_neutral() {
            debug!(%from, "Back to neutral");
            events.push(ShifterEvent::GearChanged { from, to });
            if rate_ok(
                self.last_neutral_sound,
                now,
                self.config.thresholds.neutral_sound_interval,
            ) {
                events.push(ShifterEvent::Sound(SoundCue::Neutral));
                self.last_neutral_sound = Some(now);
            }
            if self.config.sequential {
                self.haptic(
                    HapticEnvelope::waveform(
                        SEQUENTIAL_NEUTRAL_FADE,
                        IntensityProfile::Ramp { from: 0.8, to: 0.0 },
                    ),
                    events,
                );
            }
        }
    }

    pub fn buttons(&self) -> ShifterButtons {
        ShifterButtons {
            gear: self.position.button(),
            splitter: self.splitter,
            range: self.range,
            ghost_reset: self.ghost_reset,
        }
    }
}

fn rate_ok(last: Option<Instant>, now: Instant, interval: Duration) -> bool {
    last.is_none_or(|last| now.saturating_duration_since(last) > interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(config: ShifterConfig) -> ShifterEngine {
        ShifterEngine::new(config)
    }

    /// Hand position that normalizes to `(x, z)` for a hand snapped at the centered knob.
    fn hand_at(engine: &ShifterEngine, x: f64, z: f64) -> Vec3 {
        let geometry = engine.config().geometry;
        let unit = geometry.knob_unit();
        let knob = geometry.knob(StickXz::CENTER);
        Vec3::new(geometry.origin.x + x * unit, knob.y, geometry.origin.z + z * unit)
    }

    fn snapped(config: ShifterConfig, now: Instant) -> (ShifterEngine, Vec<ShifterEvent>) {
        let mut engine = engine(config);
        let mut events = Vec::new();
        let knob = engine.knob();
        engine.snap(Hand::Right, 3, knob, now, &mut events);
        (engine, events)
    }

    fn step(engine: &mut ShifterEngine, x: f64, z: f64, now: Instant) -> Vec<ShifterEvent> {
        let mut events = Vec::new();
        let hand = hand_at(engine, x, z);
        engine.update(Some(hand), now, &mut events);
        events
    }

    #[test]
    fn test_first_gear_through_middle_row() {
        let t0 = Instant::now();
        let (mut engine, _) = snapped(ShifterConfig::default(), t0);
        step(&mut engine, -1.05, 0.0, t0);
        assert_eq!(engine.position(), GridPosition::from_parts(-1, 0));
        let events = step(&mut engine, -1.05, -0.9, t0);
        assert_eq!(engine.position().button(), Some(43));
        assert!(events.contains(&ShifterEvent::Sound(SoundCue::ShiftForward)));
        assert!(engine.buttons().ghost_reset);
        assert!(!engine.buttons().is_pressed(43));

        step(&mut engine, -1.05, -0.95, t0 + Duration::from_millis(16));
        assert!(engine.buttons().is_pressed(43));
    }

    #[test]
    fn test_column_held_outside_middle_row() {
        let t0 = Instant::now();
        let (mut engine, _) = snapped(ShifterConfig::default(), t0);
        step(&mut engine, 0.0, 0.95, t0);
        assert_eq!(engine.position().button(), Some(46));
        step(&mut engine, 1.05, 0.95, t0);
        assert_eq!(engine.position().button(), Some(46));
    }

    #[test]
    fn test_reverse_locked_out_until_trigger() {
        let t0 = Instant::now();
        let (mut engine, _) = snapped(ShifterConfig::default(), t0);
        step(&mut engine, -2.1, 0.0, t0);
        assert_eq!(engine.position().x(), -1);
        step(&mut engine, -2.1, 0.95, t0);
        assert_eq!(engine.position().button(), Some(44));

        step(&mut engine, -2.1, 0.0, t0);
        engine.apply_trigger(0.9);
        step(&mut engine, -2.1, 0.0, t0);
        assert_eq!(engine.position().x(), -2);
        let events = step(&mut engine, -2.1, 0.95, t0 + Duration::from_millis(200));
        assert!(engine.position().is_reverse());
        assert!(events.contains(&ShifterEvent::Sound(SoundCue::ShiftReverse)));
    }

    #[test]
    fn test_reverse_row_only_engages_toward_reverse() {
        let t0 = Instant::now();
        let (mut engine, _) = snapped(ShifterConfig::default(), t0);
        engine.apply_trigger(1.0);
        step(&mut engine, -2.1, 0.0, t0);
        step(&mut engine, -2.1, -0.95, t0);
        assert!(engine.position().is_neutral());
    }

    #[test]
    fn test_sequential_up_ignores_x() {
        let t0 = Instant::now();
        let config = ShifterConfig {
            sequential: true,
            ..ShifterConfig::default()
        };
        let (mut engine, _) = snapped(config, t0);
        step(&mut engine, 0.8, 0.9, t0);
        assert_eq!(engine.position(), GridPosition::SEQUENTIAL_UP);
    }

    #[test]
    fn test_sequential_neutral_has_haptic() {
        let t0 = Instant::now();
        let config = ShifterConfig {
            sequential: true,
            ..ShifterConfig::default()
        };
        let (mut engine, _) = snapped(config, t0);
        step(&mut engine, 0.0, -0.95, t0);
        let events = step(&mut engine, 0.0, 0.0, t0 + Duration::from_millis(300));
        assert!(events.contains(&ShifterEvent::Sound(SoundCue::Neutral)));
        assert!(events.iter().any(|e| matches!(
            e,
            ShifterEvent::Haptic(HapticRequest {
                envelope: HapticEnvelope::Waveform { .. },
                ..
            })
        )));
    }

    #[test]
    fn test_gear_sound_rate_limited() {
        let t0 = Instant::now();
        let (mut engine, _) = snapped(ShifterConfig::default(), t0);
        step(&mut engine, 0.0, -0.95, t0);
        step(&mut engine, 0.0, 0.0, t0 + Duration::from_millis(10));
        let events = step(&mut engine, 0.0, 0.95, t0 + Duration::from_millis(20));
        assert!(!events.iter().any(|e| matches!(e, ShifterEvent::Sound(SoundCue::ShiftForward))));
        assert!(events.iter().any(|e| matches!(e, ShifterEvent::GearChanged { .. })));
    }

    #[test]
    fn test_double_tap_window_is_strict() {
        let t0 = Instant::now();
        let (mut engine, _) = snapped(ShifterConfig::default(), t0);
        engine.unsnap();
        let mut events = Vec::new();
        let knob = engine.knob();
        engine.snap(Hand::Right, 3, knob, t0 + Duration::from_millis(500), &mut events);
        assert!(!engine.splitter());

        engine.unsnap();
        engine.snap(Hand::Right, 3, knob, t0 + Duration::from_millis(990), &mut events);
        assert!(engine.splitter());
        assert!(events.contains(&ShifterEvent::SplitterToggled(true)));
    }

    #[test]
    fn test_gear_change_resets_double_tap() {
        let t0 = Instant::now();
        let (mut engine, _) = snapped(ShifterConfig::default(), t0);
        step(&mut engine, 0.0, -0.95, t0 + Duration::from_millis(50));
        engine.unsnap();
        let mut events = Vec::new();
        let knob = engine.knob();
        engine.snap(Hand::Right, 3, knob, t0 + Duration::from_millis(100), &mut events);
        assert!(!engine.splitter());
    }

    #[test]
    fn test_unsnap_recenters_from_neutral_lane() {
        let t0 = Instant::now();
        let (mut engine, _) = snapped(ShifterConfig::default(), t0);
        step(&mut engine, 1.05, 0.0, t0);
        assert_eq!(engine.position().x(), 1);
        engine.unsnap();
        assert_eq!(engine.position(), GridPosition::NEUTRAL);
        assert_eq!(engine.stick(), StickXz::CENTER);
    }

    #[test]
    fn test_unsnap_stays_in_gear() {
        let t0 = Instant::now();
        let (mut engine, _) = snapped(ShifterConfig::default(), t0);
        step(&mut engine, 1.05, 0.0, t0);
        step(&mut engine, 1.05, 0.95, t0);
        engine.unsnap();
        assert_eq!(engine.position().button(), Some(48));
        assert_eq!(engine.stick(), StickXz::new(1.0, 1.0));
    }

    #[test]
    fn test_overshoot_buzzes() {
        let t0 = Instant::now();
        let (mut engine, _) = snapped(ShifterConfig::default(), t0);
        let events = step(&mut engine, 3.0, 0.0, t0);
        assert!(events.iter().any(|e| matches!(e, ShifterEvent::Haptic(_))));
    }

    #[test]
    fn test_range_from_trackpad_is_latched() {
        let mut engine = engine(ShifterConfig::default());
        let mut events = Vec::new();
        engine.apply_trackpad(0.9, &mut events);
        engine.apply_trackpad(0.95, &mut events);
        assert!(engine.range());
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, ShifterEvent::RangeToggled(_)))
                .count(),
            1
        );
        engine.apply_trackpad(-0.85, &mut events);
        assert!(!engine.range());
        assert!(engine.buttons().states().any(|(id, on)| id == BUTTON_RANGE && !on));
    }
}
