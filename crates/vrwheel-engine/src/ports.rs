//! Port traits for the frame loop's collaborators
//!
//! The loop reads controller input through [`PoseSource`] and pushes every
//! result out through the sink traits. None of them may block for long: they
//! are called from the loop thread once per tick.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, trace};
use vrwheel_device_types::{ButtonEvent, HapticRequest, HeadPose, Pose, SoundCue, Vec3};
use vrwheel_shifter::ShifterButtons;

/// One tick's worth of controller input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputFrame {
    /// Left hand first
    pub poses: [Pose; 2],
    pub head: HeadPose,
    /// Button transitions since the previous frame, in order
    pub buttons: Vec<ButtonEvent>,
}

/// Values written to the virtual joystick each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFrame {
    /// Wheel axis in `AXIS_MIN..=AXIS_MAX`
    pub axis: u16,
    pub buttons: ShifterButtons,
}

/// What the overlay renderer needs to draw the wheel and the shifter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFrame {
    /// Unwrapped wheel angle, radians
    pub wheel_angle: f64,
    /// Hub in tracking space, including the adaptive offset
    pub wheel_hub: Vec3,
    pub wheel_pitch_degrees: f64,
    /// Rim opacity `0.0..=1.0`
    pub wheel_alpha: f64,
    pub knob: Vec3,
    /// Gear cell the stick is in, as its grid value
    pub shifter_position: f64,
}

/// Source of controller poses and button transitions.
pub trait PoseSource: Send {
    /// Latest input, or `None` if nothing new arrived since the last call.
    fn poll(&mut self, now: Instant) -> Option<InputFrame>;
}

impl std::fmt::Debug for dyn PoseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PoseSource")
    }
}

/// Virtual joystick the wheel axis and shifter buttons go to.
pub trait OutputSink: Send {
    fn emit(&mut self, frame: &OutputFrame);
}

/// Delivers haptic envelopes to controllers.
pub trait HapticSink: Send {
    fn play(&mut self, request: &HapticRequest);
}

pub trait AudioSink: Send {
    fn play(&mut self, cue: SoundCue);
}

pub trait RenderSink: Send {
    fn render(&mut self, frame: &RenderFrame);
}

/// Sink that drops everything. Handy when a collaborator is not wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&mut self, _frame: &OutputFrame) {}
}

impl HapticSink for NullSink {
    fn play(&mut self, _request: &HapticRequest) {}
}

impl AudioSink for NullSink {
    fn play(&mut self, _cue: SoundCue) {}
}

impl RenderSink for NullSink {
    fn render(&mut self, _frame: &RenderFrame) {}
}

/// Sink that writes everything to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink {
    last_output: Option<OutputFrame>,
}

impl OutputSink for LogSink {
    fn emit(&mut self, frame: &OutputFrame) {
        if self.last_output.as_ref() != Some(frame) {
            debug!(
                axis = frame.axis,
                gear = ?frame.buttons.gear,
                splitter = frame.buttons.splitter,
                range = frame.buttons.range,
                "Output"
            );
            self.last_output = Some(*frame);
        }
    }
}

impl HapticSink for LogSink {
    fn play(&mut self, request: &HapticRequest) {
        debug!(hand = %request.hand, envelope = ?request.envelope, "Haptic");
    }
}

impl AudioSink for LogSink {
    fn play(&mut self, cue: SoundCue) {
        debug!(?cue, "Sound");
    }
}

impl RenderSink for LogSink {
    fn render(&mut self, frame: &RenderFrame) {
        trace!(
            angle = frame.wheel_angle,
            alpha = frame.wheel_alpha,
            shifter = frame.shifter_position,
            "Render"
        );
    }
}

/// Everything the loop emitted, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    pub outputs: Vec<OutputFrame>,
    pub haptics: Vec<HapticRequest>,
    pub sounds: Vec<SoundCue>,
    pub renders: Vec<RenderFrame>,
}

/// Cloneable recorder implementing every sink; clones share one [`Recording`].
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Recording {
        self.inner.lock().clone()
    }

    pub fn last_output(&self) -> Option<OutputFrame> {
        self.inner.lock().outputs.last().copied()
    }

    pub fn clear(&self) {
        *self.inner.lock() = Recording::default();
    }
}

impl OutputSink for RecordingSink {
    fn emit(&mut self, frame: &OutputFrame) {
        self.inner.lock().outputs.push(*frame);
    }
}

impl HapticSink for RecordingSink {
    fn play(&mut self, request: &HapticRequest) {
        self.inner.lock().haptics.push(*request);
    }
}

impl AudioSink for RecordingSink {
    fn play(&mut self, cue: SoundCue) {
        self.inner.lock().sounds.push(cue);
    }
}

impl RenderSink for RecordingSink {
    fn render(&mut self, frame: &RenderFrame) {
        self.inner.lock().renders.push(*frame);
    }
}

/// Pose source replaying prepared frames, one per poll. Frames can be queued
/// from another thread through a clone.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPoses {
    frames: Arc<Mutex<VecDeque<Option<InputFrame>>>>,
}

impl ScriptedPoses {
    pub fn new(frames: impl IntoIterator<Item = InputFrame>) -> Self {
        Self {
            frames: Arc::new(Mutex::new(frames.into_iter().map(Some).collect())),
        }
    }

    pub fn push(&self, frame: InputFrame) {
        self.frames.lock().push_back(Some(frame));
    }

    /// Queue a tick on which no input arrives.
    pub fn push_stall(&self) {
        self.frames.lock().push_back(None);
    }

    pub fn remaining(&self) -> usize {
        self.frames.lock().len()
    }
}

impl PoseSource for ScriptedPoses {
    fn poll(&mut self, _now: Instant) -> Option<InputFrame> {
        self.frames.lock().pop_front().flatten()
    }
}
