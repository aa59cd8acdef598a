//! One tick of the engine
//!
//! [`FrameLoop::tick`] is the only writer of wheel, shifter and attachment
//! state. Everything else talks to it through the grab queue, the shared FFB
//! decoder, the shared config or the ports.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};
use vrwheel_device_types::{
    AXIS_CENTER, Hand, HapticEnvelope, HapticRequest, HeadPose, IntensityProfile, Pose,
};
use vrwheel_errors::TickFault;
use vrwheel_ffb::{FfbDecoder, FfbSample, HapticEstimator, SharedFfbDecoder};
use vrwheel_shifter::{ShifterButtons, ShifterEngine, ShifterEvent};

use crate::config::{Config, SharedConfig};
use crate::hands::{HandAttachment, HandEventSender, HandRouter, RouterContext};
use crate::passthrough::PassthroughGate;
use crate::ports::{
    AudioSink, HapticSink, InputFrame, LogSink, NullSink, OutputFrame, OutputSink, PoseSource,
    RecordingSink, RenderFrame, RenderSink,
};
use crate::wheel::{HandSample, WheelEngine, WheelOutput, WheelTick};

/// The four output collaborators.
pub struct Sinks {
    pub output: Box<dyn OutputSink>,
    pub haptics: Box<dyn HapticSink>,
    pub audio: Box<dyn AudioSink>,
    pub render: Box<dyn RenderSink>,
}

impl Sinks {
    pub fn new(
        output: impl OutputSink + 'static,
        haptics: impl HapticSink + 'static,
        audio: impl AudioSink + 'static,
        render: impl RenderSink + 'static,
    ) -> Self {
        Self {
            output: Box::new(output),
            haptics: Box::new(haptics),
            audio: Box::new(audio),
            render: Box::new(render),
        }
    }

    pub fn null() -> Self {
        Self::new(NullSink, NullSink, NullSink, NullSink)
    }

    pub fn logging() -> Self {
        Self::new(
            LogSink::default(),
            LogSink::default(),
            LogSink::default(),
            LogSink::default(),
        )
    }

    /// Every sink records into `recorder`.
    pub fn recording(recorder: &RecordingSink) -> Self {
        Self::new(
            recorder.clone(),
            recorder.clone(),
            recorder.clone(),
            recorder.clone(),
        )
    }
}

impl std::fmt::Debug for Sinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sinks").finish_non_exhaustive()
    }
}

/// Counts of the anomalies absorbed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultCounters {
    counts: HashMap<TickFault, u64>,
}

impl FaultCounters {
    pub fn record(&mut self, fault: TickFault) {
        let count = self.counts.entry(fault).or_insert(0);
        *count = count.saturating_add(1);
    }

    pub fn count(&self, fault: TickFault) -> u64 {
        self.counts.get(&fault).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().fold(0, |acc, n| acc.saturating_add(*n))
    }

    /// Non-zero counters in code order.
    pub fn iter(&self) -> impl Iterator<Item = (TickFault, u64)> + '_ {
        TickFault::ALL
            .into_iter()
            .map(|fault| (fault, self.count(fault)))
            .filter(|(_, n)| *n > 0)
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// `None` when the pose source had nothing and physics was skipped
    pub wheel: Option<WheelOutput>,
    pub output: OutputFrame,
    pub wheel_alpha: f64,
    pub attachments: [HandAttachment; 2],
}

impl TickReport {
    pub fn stalled(&self) -> bool {
        self.wheel.is_none()
    }
}

/// Engine state plus the collaborators it reads from and writes to.
#[derive(Debug)]
pub struct FrameLoop {
    config: SharedConfig,
    applied: Arc<Config>,
    wheel: WheelEngine,
    shifter: ShifterEngine,
    router: HandRouter,
    ffb: SharedFfbDecoder,
    source: Box<dyn PoseSource>,
    sinks: Sinks,
    poses: [Pose; 2],
    head: HeadPose,
    wheel_alpha: f64,
    last_output: OutputFrame,
    faults: FaultCounters,
    tick_count: u64,
    last_stats_log: Option<Instant>,
    haptics: Vec<HapticRequest>,
    shifter_events: Vec<ShifterEvent>,
}

impl FrameLoop {
    pub fn new(config: SharedConfig, source: impl PoseSource + 'static, sinks: Sinks) -> Self {
        let applied = config.snapshot();
        let ffb = SharedFfbDecoder::new(FfbDecoder::new(
            applied.ffb.smoothing_alpha,
            HapticEstimator::new(applied.ffb.haptics),
        ));
        Self {
            wheel: WheelEngine::new(applied.wheel),
            shifter: ShifterEngine::new(applied.shifter),
            router: HandRouter::new(applied.grab, PassthroughGate::new()),
            wheel_alpha: applied.wheel.alpha / 100.0,
            config,
            applied,
            ffb,
            source: Box::new(source),
            sinks,
            poses: [Pose::default(); 2],
            head: HeadPose::default(),
            last_output: OutputFrame {
                axis: AXIS_CENTER,
                buttons: ShifterButtons {
                    gear: None,
                    splitter: false,
                    range: false,
                    ghost_reset: false,
                },
            },
            faults: FaultCounters::default(),
            tick_count: 0,
            last_stats_log: None,
            haptics: Vec::with_capacity(8),
            shifter_events: Vec::with_capacity(8),
        }
    }

    /// Replace the router's re-enable poll interval, mostly for tests.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        let gate = self.router.gate().clone();
        let grab = self.applied.grab;
        self.router.shutdown();
        self.router = HandRouter::new(grab, gate).with_poll_interval(interval);
        self
    }

    /// Handle for the thread delivering force-feedback reports.
    pub fn ffb(&self) -> SharedFfbDecoder {
        self.ffb.clone()
    }

    /// Handle for threads reporting grab and release events.
    pub fn sender(&self) -> HandEventSender {
        self.router.sender()
    }

    /// Gate the joystick passthrough consults before forwarding an input.
    pub fn gate(&self) -> PassthroughGate {
        self.router.gate().clone()
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Config snapshot the engine currently runs with.
    pub fn applied_config(&self) -> &Config {
        &self.applied
    }

    pub fn wheel(&self) -> &WheelEngine {
        &self.wheel
    }

    pub fn shifter(&self) -> &ShifterEngine {
        &self.shifter
    }

    pub fn router(&self) -> &HandRouter {
        &self.router
    }

    pub fn faults(&self) -> &FaultCounters {
        &self.faults
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Count a fault noticed outside the tick, such as a missed deadline.
    pub fn record_fault(&mut self, fault: TickFault) {
        self.faults.record(fault);
    }

    /// Run one tick at `now`.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        self.tick_count = self.tick_count.saturating_add(1);
        self.refresh_config();
        let config = Arc::clone(&self.applied);

        let Some(input) = self.source.poll(now) else {
            trace!(tick = self.tick_count, "No input this tick");
            self.faults.record(TickFault::PoseStalled);
            self.sinks.output.emit(&self.last_output);
            return self.report(None);
        };
        self.accept_input(&input);

        self.router.settle_auto_grabs();
        let poses = self.poses;
        {
            let mut ctx = RouterContext {
                poses: &poses,
                wheel: &mut self.wheel,
                shifter: &mut self.shifter,
                now,
                haptics: &mut self.haptics,
                shifter_events: &mut self.shifter_events,
            };
            for event in &input.buttons {
                self.router.on_button(event, &mut ctx);
            }
            self.router.drain(&mut ctx);
        }
        self.router.detect_proximity(&poses, &mut self.wheel);

        let on_wheel = self.router.wheel_hands();
        let [left_on, right_on] = on_wheel;
        if config.wheel.adaptive_center && left_on != right_on {
            let hand = if left_on { Hand::Left } else { Hand::Right };
            if self.wheel.frame_mut().adapt_center(pose_of(&poses, hand).position) {
                trace!(%hand, "Hub moved away from hand");
            }
        }

        let sample = config.ffb.enabled.then(|| self.ffb.tick(now));
        let [left, right] = poses;
        let wheel = self.wheel.update(
            &WheelTick {
                left: hand_sample(&left, left_on),
                right: hand_sample(&right, right_on),
                ffb: sample.map(|s| s.smoothed),
            },
            &mut self.haptics,
        );
        if wheel.held_last_value {
            self.faults.record(TickFault::NonFiniteAngle);
        }

        if !left_on && !right_on {
            self.wheel.frame_mut().reset_adaptive_offset();
        }
        self.wheel_alpha = self.wheel.frame().transparency(
            &self.head,
            config.wheel.alpha / 100.0,
            config.wheel.transparent_center,
        );

        self.update_shifter(&poses, now);
        self.router
            .knob_haptics(&poses, &self.shifter, now, &mut self.haptics);
        if let Some(sample) = sample {
            self.ffb_haptics(&sample, on_wheel, config.tick_period());
            self.log_ffb_stats(now, config.ffb.stats_interval());
        }

        self.last_output = OutputFrame {
            axis: wheel.axis,
            buttons: self.shifter.buttons(),
        };
        self.flush();
        self.report(Some(wheel))
    }

    fn refresh_config(&mut self) {
        let snapshot = self.config.snapshot();
        if Arc::ptr_eq(&snapshot, &self.applied) || *snapshot == *self.applied {
            self.applied = snapshot;
            return;
        }
        self.wheel.reconfigure(snapshot.wheel);
        self.shifter.reconfigure(snapshot.shifter);
        self.router.reconfigure(snapshot.grab);
        if snapshot.ffb != self.applied.ffb {
            let ffb = snapshot.ffb;
            self.ffb.with(|decoder| {
                decoder.set_alpha(ffb.smoothing_alpha);
                decoder.set_estimator(HapticEstimator::new(ffb.haptics));
            });
        }
        info!(tick = self.tick_count, "Configuration applied");
        self.applied = snapshot;
    }

    fn accept_input(&mut self, input: &InputFrame) {
        for hand in Hand::ALL {
            let (Some(raw), Some(last)) = (
                input.poses.get(hand.index()),
                self.poses.get_mut(hand.index()),
            ) else {
                continue;
            };
            let sanitized = raw.sanitize(last);
            if sanitized.position_replaced {
                debug!(%hand, "Non-finite pose replaced by last good sample");
                self.faults.record(TickFault::NonFinitePose);
            }
            if sanitized.axes_clamped {
                self.faults.record(TickFault::AxisOutOfRange);
            }
            *last = sanitized.pose;
            self.router.gate().record_input(hand, &sanitized.pose);
        }

        if input.head.position.is_finite() && input.head.forward.is_finite() {
            self.head = input.head;
        } else {
            self.faults.record(TickFault::NonFinitePose);
        }
    }

    fn update_shifter(&mut self, poses: &[Pose; 2], now: Instant) {
        let held = self.router.shifter_hand().map(|hand| pose_of(poses, hand));
        if let Some(pose) = held {
            self.shifter.apply_trigger(pose.trigger);
            self.shifter
                .apply_trackpad(pose.trackpad_y, &mut self.shifter_events);
        }
        self.shifter
            .update(held.map(|pose| pose.position), now, &mut self.shifter_events);
    }

    /// Rumble the steering hands with the vibration read off the force history.
    fn ffb_haptics(&mut self, sample: &FfbSample, on_wheel: [bool; 2], period: Duration) {
        let Some(estimate) = sample.haptic else {
            return;
        };
        for hand in Hand::ALL {
            if !on_wheel.get(hand.index()).copied().unwrap_or(false) {
                continue;
            }
            self.haptics.push(HapticRequest {
                hand,
                controller_id: pose_of(&self.poses, hand).controller_id,
                envelope: HapticEnvelope::waveform(
                    period,
                    IntensityProfile::Constant(estimate.intensity),
                ),
            });
        }
    }

    fn log_ffb_stats(&mut self, now: Instant, interval: Option<Duration>) {
        let Some(interval) = interval else {
            return;
        };
        let Some(last) = self.last_stats_log else {
            self.last_stats_log = Some(now);
            return;
        };
        if now.saturating_duration_since(last) >= interval {
            self.last_stats_log = Some(now);
            info!(stats = %self.ffb.stats(), "Force-feedback packets");
        }
    }

    fn flush(&mut self) {
        for request in self.haptics.drain(..) {
            self.sinks.haptics.play(&request);
        }
        for event in self.shifter_events.drain(..) {
            match event {
                ShifterEvent::Haptic(request) => self.sinks.haptics.play(&request),
                ShifterEvent::Sound(cue) => self.sinks.audio.play(cue),
                ShifterEvent::GearChanged { from, to } => trace!(%from, %to, "Gear event"),
                ShifterEvent::SplitterToggled(on) => debug!(on, "Splitter toggled"),
                ShifterEvent::RangeToggled(on) => debug!(on, "Range toggled"),
            }
        }
        self.sinks.output.emit(&self.last_output);
        let frame = self.wheel.frame();
        self.sinks.render.render(&RenderFrame {
            wheel_angle: self.wheel.angle(),
            wheel_hub: frame.hub(),
            wheel_pitch_degrees: frame.pitch_degrees(),
            wheel_alpha: self.wheel_alpha,
            knob: self.shifter.knob(),
            shifter_position: self.shifter.position().value(),
        });
    }

    fn report(&self, wheel: Option<WheelOutput>) -> TickReport {
        TickReport {
            tick: self.tick_count,
            wheel,
            output: self.last_output,
            wheel_alpha: self.wheel_alpha,
            attachments: Hand::ALL.map(|hand| self.router.attachment(hand)),
        }
    }

    /// Stop background pollers. The loop can still tick afterwards.
    pub fn shutdown(&mut self) {
        self.router.shutdown();
    }
}

fn pose_of(poses: &[Pose; 2], hand: Hand) -> Pose {
    poses.get(hand.index()).copied().unwrap_or_default()
}

fn hand_sample(pose: &Pose, on_wheel: bool) -> HandSample {
    HandSample {
        position: pose.position,
        controller_id: pose.controller_id,
        on_wheel,
    }
}
