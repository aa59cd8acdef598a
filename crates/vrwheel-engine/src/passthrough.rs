//! Passthrough gating of controller inputs the shifter consumes
//!
//! While a hand holds the shifter its trigger, A button and trackpad drive
//! reverse lock, splitter and range, so the raw joystick passthrough must not
//! also report them. Releasing the shifter re-enables each line only once its
//! physical input is back at rest, otherwise a still-pulled trigger would
//! register as a fresh press.
//!
//! The grab path and the re-enable poller share one lock; a shifter grab
//! cancels pending pollers while holding it, so a poller can never re-enable
//! a line the grab has just disabled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use vrwheel_device_types::{ControllerButton, Hand, Pose};

use crate::error::{EngineError, EngineResult};

/// How often a poller re-checks the physical inputs.
pub const REENABLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Axis magnitude at or below which an analog line counts as released.
pub const RELEASE_AXIS_THRESHOLD: f64 = 0.1;

/// A controller input the passthrough collaborator may forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughLine {
    TriggerButton,
    AButton,
    /// Trackpad or thumbstick vertical axis
    TrackpadAxis,
    TriggerAxis,
}

impl PassthroughLine {
    pub const ALL: [PassthroughLine; 4] = [
        PassthroughLine::TriggerButton,
        PassthroughLine::AButton,
        PassthroughLine::TrackpadAxis,
        PassthroughLine::TriggerAxis,
    ];

    fn index(self) -> usize {
        match self {
            PassthroughLine::TriggerButton => 0,
            PassthroughLine::AButton => 1,
            PassthroughLine::TrackpadAxis => 2,
            PassthroughLine::TriggerAxis => 3,
        }
    }

    /// Whether the physical input behind this line is at rest in `pose`.
    pub fn is_released(self, pose: &Pose) -> bool {
        match self {
            PassthroughLine::TriggerButton => !pose.is_pressed(ControllerButton::Trigger),
            PassthroughLine::AButton => !pose.is_pressed(ControllerButton::A),
            PassthroughLine::TrackpadAxis => pose.trackpad_y.abs() <= RELEASE_AXIS_THRESHOLD,
            PassthroughLine::TriggerAxis => pose.trigger <= RELEASE_AXIS_THRESHOLD,
        }
    }
}

#[derive(Debug, Default)]
struct GateState {
    disabled: [[bool; 4]; 2],
    /// Latest controller reading per hand, refreshed every tick
    inputs: [Pose; 2],
}

impl GateState {
    fn set(&mut self, hand: Hand, line: PassthroughLine, disabled: bool) {
        if let Some(slot) = self
            .disabled
            .get_mut(hand.index())
            .and_then(|lines| lines.get_mut(line.index()))
        {
            *slot = disabled;
        }
    }

    fn is_disabled(&self, hand: Hand, line: PassthroughLine) -> bool {
        self.disabled
            .get(hand.index())
            .and_then(|lines| lines.get(line.index()))
            .copied()
            .unwrap_or(false)
    }

    fn input(&self, hand: Hand) -> Pose {
        self.inputs.get(hand.index()).copied().unwrap_or_default()
    }
}

/// Cloneable handle to the per-hand passthrough switches.
///
/// # Examples
///
/// ```
/// use vrwheel_device_types::Hand;
/// use vrwheel_engine::{PassthroughGate, PassthroughLine};
///
/// let gate = PassthroughGate::new();
/// assert!(gate.is_enabled(Hand::Left, PassthroughLine::AButton));
/// gate.disable_for_shifter(Hand::Left, []);
/// assert!(!gate.is_enabled(Hand::Left, PassthroughLine::AButton));
/// assert!(gate.is_enabled(Hand::Right, PassthroughLine::AButton));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PassthroughGate {
    state: Arc<Mutex<GateState>>,
}

impl PassthroughGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, hand: Hand, line: PassthroughLine) -> bool {
        !self.state.lock().is_disabled(hand, line)
    }

    pub fn disabled_lines(&self, hand: Hand) -> Vec<PassthroughLine> {
        let state = self.state.lock();
        PassthroughLine::ALL
            .into_iter()
            .filter(|line| state.is_disabled(hand, *line))
            .collect()
    }

    /// Store this tick's controller reading for `hand`.
    pub fn record_input(&self, hand: Hand, pose: &Pose) {
        if let Some(slot) = self.state.lock().inputs.get_mut(hand.index()) {
            *slot = *pose;
        }
    }

    /// Cancel `pollers` and disable every shifter line of `hand`, atomically
    /// with respect to any poller iteration.
    pub fn disable_for_shifter<'a>(
        &self,
        hand: Hand,
        pollers: impl IntoIterator<Item = &'a ReenablePoller>,
    ) {
        let mut state = self.state.lock();
        for poller in pollers {
            poller.cancel();
        }
        for line in PassthroughLine::ALL {
            state.set(hand, line, true);
        }
        debug!(%hand, "Shifter lines disabled");
    }

    /// Re-enable every line of `hand` right away.
    pub fn enable_all(&self, hand: Hand) {
        let mut state = self.state.lock();
        for line in PassthroughLine::ALL {
            state.set(hand, line, false);
        }
    }

    /// Re-enable the lines of `hand` whose inputs are at rest and report
    /// whether all of them are enabled now. `None` means `cancel` was set and
    /// nothing was touched.
    fn release_settled(&self, hand: Hand, cancel: &AtomicBool) -> Option<bool> {
        let mut state = self.state.lock();
        if cancel.load(Ordering::Acquire) {
            return None;
        }
        let input = state.input(hand);
        let mut all_enabled = true;
        for line in PassthroughLine::ALL {
            if !state.is_disabled(hand, line) {
                continue;
            }
            if line.is_released(&input) {
                state.set(hand, line, false);
                trace!(%hand, ?line, "Passthrough line re-enabled");
            } else {
                all_enabled = false;
            }
        }
        Some(all_enabled)
    }
}

/// Background task re-enabling one hand's lines after a shifter release.
#[derive(Debug)]
pub struct ReenablePoller {
    hand: Hand,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReenablePoller {
    /// Start polling `gate` for `hand` every `interval`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ThreadSpawn`] if the thread cannot be created.
    pub fn spawn(gate: PassthroughGate, hand: Hand, interval: Duration) -> EngineResult<Self> {
        let cancel = Arc::new(AtomicBool::new(false));
        let thread_cancel = Arc::clone(&cancel);
        let name = format!("passthrough-reenable-{hand}");
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || Self::run(&gate, hand, &thread_cancel, interval))
            .map_err(|source| EngineError::ThreadSpawn { name, source })?;
        Ok(Self {
            hand,
            cancel,
            handle: Some(handle),
        })
    }

    fn run(gate: &PassthroughGate, hand: Hand, cancel: &AtomicBool, interval: Duration) {
        debug!(%hand, "Re-enable poller started");
        loop {
            match gate.release_settled(hand, cancel) {
                None => {
                    debug!(%hand, "Re-enable poller cancelled");
                    return;
                }
                Some(true) => {
                    debug!(%hand, "Passthrough restored");
                    return;
                }
                Some(false) => thread::sleep(interval),
            }
        }
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    /// Ask the poller to stop at its next check.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancel and wait for the thread to exit.
    pub fn shutdown(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!(hand = %self.hand, "Re-enable poller panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use vrwheel_device_types::{ButtonMask, Vec3};

    use super::*;

    fn wait_until(limit: Duration, mut f: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < limit {
            if f() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        f()
    }

    fn pressed_pose() -> Pose {
        Pose::new(1, Vec3::ZERO)
            .with_trigger(0.9)
            .with_trackpad_y(-0.9)
            .with_buttons(
                ButtonMask::empty()
                    .with(ControllerButton::Trigger)
                    .with(ControllerButton::A),
            )
    }

    #[test]
    fn test_line_release_rules() {
        let rest = Pose::new(1, Vec3::ZERO).with_trackpad_y(0.05).with_trigger(0.1);
        let busy = pressed_pose();
        for line in PassthroughLine::ALL {
            assert!(line.is_released(&rest), "{line:?}");
            assert!(!line.is_released(&busy), "{line:?}");
        }
    }

    #[test]
    fn test_poller_waits_for_each_line() -> Result<(), Box<dyn std::error::Error>> {
        let gate = PassthroughGate::new();
        gate.record_input(Hand::Right, &pressed_pose());
        gate.disable_for_shifter(Hand::Right, []);

        let mut poller = ReenablePoller::spawn(gate.clone(), Hand::Right, Duration::from_millis(5))?;
        thread::sleep(Duration::from_millis(30));
        assert_eq!(gate.disabled_lines(Hand::Right).len(), 4);

        // Trigger let go, A and trackpad still held.
        let partial = pressed_pose()
            .with_trigger(0.0)
            .with_buttons(ButtonMask::empty().with(ControllerButton::A));
        gate.record_input(Hand::Right, &partial);
        assert!(wait_until(Duration::from_secs(2), || {
            gate.is_enabled(Hand::Right, PassthroughLine::TriggerAxis)
                && gate.is_enabled(Hand::Right, PassthroughLine::TriggerButton)
        }));
        assert!(!gate.is_enabled(Hand::Right, PassthroughLine::AButton));
        assert!(!gate.is_enabled(Hand::Right, PassthroughLine::TrackpadAxis));

        gate.record_input(Hand::Right, &Pose::new(1, Vec3::ZERO));
        assert!(wait_until(Duration::from_secs(2), || poller.is_finished()));
        assert!(gate.disabled_lines(Hand::Right).is_empty());
        poller.shutdown();
        Ok(())
    }

    #[test]
    fn test_new_grab_cancels_poller() -> Result<(), Box<dyn std::error::Error>> {
        let gate = PassthroughGate::new();
        gate.record_input(Hand::Left, &pressed_pose());
        gate.disable_for_shifter(Hand::Left, []);
        let poller = ReenablePoller::spawn(gate.clone(), Hand::Left, Duration::from_millis(5))?;

        gate.disable_for_shifter(Hand::Left, [&poller]);
        assert!(poller.is_cancelled());
        assert!(wait_until(REENABLE_POLL_INTERVAL * 5, || poller.is_finished()));

        // Inputs at rest now, but the cancelled poller must not touch the new grab.
        gate.record_input(Hand::Left, &Pose::new(1, Vec3::ZERO));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(gate.disabled_lines(Hand::Left).len(), 4);
        Ok(())
    }

    #[test]
    fn test_enable_all() {
        let gate = PassthroughGate::new();
        gate.disable_for_shifter(Hand::Left, []);
        gate.enable_all(Hand::Left);
        assert!(gate.disabled_lines(Hand::Left).is_empty());
    }
}
