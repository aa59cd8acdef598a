//! Scripted drive through the real frame loop
//!
//! The script grabs the rim with the right hand, turns it, lets go so the
//! wheel re-centers, then takes the shifter with the left hand and pushes it
//! into a gear. Every collaborator is a recording sink so the run can be
//! summarized afterwards.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};
use vrwheel_device_types::{ButtonEvent, ControllerButton, Hand, Pose, Vec3};
use vrwheel_engine::{
    CONFIG_POLL_INTERVAL, Config, ConfigWatcher, FrameLoop, InputFrame, LoopRunner,
    RecordingSink, ScriptedPoses, SharedConfig, Sinks, WheelFrame,
};
use vrwheel_errors::TickFault;
use vrwheel_shifter::ShifterEngine;

use crate::commands::SimulateArgs;
use crate::commands::config::load;
use crate::error::CliError;
use crate::output;

const LEFT_ID: u32 = 1;
const RIGHT_ID: u32 = 2;

/// Where idle hands rest, well away from the rim and the shifter.
const REST: Vec3 = Vec3::new(-2.0, 1.0, 1.0);

/// Constant force block 1 at 40%, infinite duration, started once.
const FFB_SCRIPT: [&[u8]; 3] = [
    &[0x01, 1, 1, 0xFF, 0xFF, 0, 0, 0, 0, 255, 0, 0, 0],
    &[0x05, 1, 0xA0, 0x0F],
    &[0x0A, 1, 1, 1],
];

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub ticks: u64,
    pub stalled: u64,
    pub peak_angle_degrees: f64,
    pub final_angle_degrees: f64,
    pub final_axis: u16,
    pub final_gear: Option<u8>,
    pub haptics: usize,
    pub sounds: usize,
    pub faults: Vec<(String, u64)>,
}

pub fn execute(args: &SimulateArgs, json: bool) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load(path)?,
        None => Config::default(),
    };
    if args.ffb {
        config.ffb.enabled = true;
    }

    let frames = script(&config, args.steps, args.turn.to_radians());
    info!(frames = frames.len(), realtime = args.realtime, "Starting simulation");

    let recorder = RecordingSink::new();
    let shared = SharedConfig::new(config);
    let mut frame_loop = FrameLoop::new(
        shared.clone(),
        ScriptedPoses::new(frames.clone()),
        Sinks::recording(&recorder),
    );
    if args.ffb {
        inject_ffb(&frame_loop, Instant::now())?;
    }

    let frame_loop = if args.realtime {
        let watcher = match (&args.config, args.watch) {
            (Some(path), true) => Some(
                ConfigWatcher::spawn(path, shared, CONFIG_POLL_INTERVAL)
                    .map_err(CliError::from)?,
            ),
            _ => None,
        };
        let result = run_realtime(frame_loop, &config, frames.len());
        drop(watcher);
        result?
    } else {
        let period = config.tick_period();
        let mut now = Instant::now();
        for _ in 0..frames.len() {
            frame_loop.tick(now);
            now += period;
        }
        frame_loop.shutdown();
        frame_loop
    };

    let summary = summarize(&frame_loop, &recorder);
    output::print_simulation(&summary, json);
    Ok(())
}

fn run_realtime(frame_loop: FrameLoop, config: &Config, frames: usize) -> Result<FrameLoop> {
    let mut runner = LoopRunner::new();
    runner.start(frame_loop).map_err(CliError::from)?;

    let expected = u64::try_from(frames).unwrap_or(u64::MAX);
    let budget = config
        .tick_period()
        .saturating_mul(u32::try_from(frames).unwrap_or(u32::MAX))
        .saturating_mul(2)
        .max(Duration::from_secs(1));
    let started = Instant::now();
    while runner.ticks() < expected {
        if started.elapsed() > budget {
            warn!(ticks = runner.ticks(), expected, "Simulation fell behind, stopping early");
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }

    runner
        .stop_blocking()
        .map_err(CliError::from)?
        .context("Frame loop was not running")
}

fn inject_ffb(frame_loop: &FrameLoop, now: Instant) -> Result<()> {
    let ffb = frame_loop.ffb();
    for (index, raw) in FFB_SCRIPT.into_iter().enumerate() {
        ffb.ingest(raw, now)
            .map_err(|source| CliError::InvalidReport { index, source })?;
    }
    Ok(())
}

/// Build the scripted input, `steps` ticks per phase.
pub fn script(config: &Config, steps: u32, turn: f64) -> Vec<InputFrame> {
    let frame = WheelFrame::new(config.wheel.center, config.wheel.size, config.wheel.pitch);
    let radius = config.wheel.size / 2.0;
    let rim = |angle: f64| {
        frame.to_absolute_space(
            config.wheel.center + Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0),
        )
    };
    let knob = ShifterEngine::new(config.shifter).knob();
    let push = config.shifter.geometry.knob_unit() * 1.2;
    let rest = Pose::new(LEFT_ID, REST);
    let steps_f = f64::from(steps);

    let mut frames = Vec::new();
    let mut push_frame = |left: Pose, right: Pose, buttons: Vec<ButtonEvent>| {
        frames.push(InputFrame {
            poses: [left, right],
            buttons,
            ..InputFrame::default()
        });
    };

    push_frame(
        rest,
        Pose::new(RIGHT_ID, rim(0.0)),
        vec![ButtonEvent::press(Hand::Right, ControllerButton::Grip)],
    );
    for i in 1..=steps {
        let angle = turn * f64::from(i) / steps_f;
        push_frame(rest, Pose::new(RIGHT_ID, rim(angle)), vec![]);
    }

    push_frame(
        rest,
        Pose::new(RIGHT_ID, REST),
        vec![ButtonEvent::release(Hand::Right, ControllerButton::Grip)],
    );
    for _ in 0..steps {
        push_frame(rest, Pose::new(RIGHT_ID, REST), vec![]);
    }

    push_frame(
        Pose::new(LEFT_ID, knob),
        Pose::new(RIGHT_ID, REST),
        vec![ButtonEvent::press(Hand::Left, ControllerButton::Grip)],
    );
    for i in 1..=steps {
        let pushed = knob + Vec3::new(0.0, 0.0, -push * f64::from(i) / steps_f);
        push_frame(Pose::new(LEFT_ID, pushed), Pose::new(RIGHT_ID, REST), vec![]);
    }
    push_frame(
        Pose::new(LEFT_ID, REST),
        Pose::new(RIGHT_ID, REST),
        vec![ButtonEvent::release(Hand::Left, ControllerButton::Grip)],
    );

    frames
}

fn summarize(frame_loop: &FrameLoop, recorder: &RecordingSink) -> SimulationSummary {
    let recording = recorder.snapshot();
    let peak = recording
        .renders
        .iter()
        .map(|r| r.wheel_angle)
        .fold(0.0_f64, |peak, angle| if angle.abs() > peak.abs() { angle } else { peak });
    let last = recording.outputs.last();

    SimulationSummary {
        ticks: frame_loop.tick_count(),
        stalled: frame_loop.faults().count(TickFault::PoseStalled),
        peak_angle_degrees: peak.to_degrees(),
        final_angle_degrees: frame_loop.wheel().angle().to_degrees(),
        final_axis: last.map_or(vrwheel_device_types::AXIS_CENTER, |o| o.axis),
        final_gear: last.and_then(|o| o.buttons.gear),
        haptics: recording.haptics.len(),
        sounds: recording.sounds.len(),
        faults: frame_loop
            .faults()
            .iter()
            .map(|(fault, count)| (fault.to_string(), count))
            .collect(),
    }
}
