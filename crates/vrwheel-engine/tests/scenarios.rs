//! End-to-end behaviour of the engine through its public API.

use std::time::{Duration, Instant};

use vrwheel_device_types::{ButtonEvent, ControllerButton, Hand, Pose, Vec3};
use vrwheel_engine::{
    Config, FrameLoop, HandAttachment, HandSample, InputFrame, PassthroughLine, RecordingSink,
    ScriptedPoses, SharedConfig, Sinks, TickReport, WheelConfig, WheelEngine, WheelTick,
};
use vrwheel_shifter::{GridPosition, ShifterConfig, ShifterEngine};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const DT: Duration = Duration::from_millis(16);

fn near(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn far() -> Vec3 {
    Vec3::new(-2.0, 1.0, 1.0)
}

fn rim(config: &Config, angle: f64) -> Vec3 {
    let radius = config.wheel.size / 2.0;
    config.wheel.center + Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
}

struct Rig {
    engine: FrameLoop,
    poses: ScriptedPoses,
    recorder: RecordingSink,
    now: Instant,
}

impl Rig {
    fn new(config: Config) -> Self {
        let poses = ScriptedPoses::default();
        let recorder = RecordingSink::new();
        let engine = FrameLoop::new(
            SharedConfig::new(config),
            poses.clone(),
            Sinks::recording(&recorder),
        )
        .with_poll_interval(Duration::from_millis(5));
        Self {
            engine,
            poses,
            recorder,
            now: Instant::now(),
        }
    }

    fn step(&mut self, left: Pose, right: Pose, buttons: Vec<ButtonEvent>) -> TickReport {
        self.poses.push(InputFrame {
            poses: [left, right],
            buttons,
            ..InputFrame::default()
        });
        self.now += DT;
        self.engine.tick(self.now)
    }
}

#[test]
fn grab_at_zero_with_stored_angle_continues_from_it() -> TestResult {
    let config = Config::default();
    let mut rig = Rig::new(config);
    let idle = Pose::new(1, far());

    rig.step(
        idle,
        Pose::new(2, rim(&config, 0.0)),
        vec![ButtonEvent::press(Hand::Right, ControllerButton::Grip)],
    );
    let report = rig.step(idle, Pose::new(2, rim(&config, 1.2)), vec![]);
    assert!(report.wheel.is_some_and(|w| near(w.angle, 1.2)));

    // right lets go while left grabs at raw angle 0 on the same tick
    let report = rig.step(
        Pose::new(1, rim(&config, 0.0)),
        Pose::new(2, far()),
        vec![
            ButtonEvent::release(Hand::Right, ControllerButton::Grip),
            ButtonEvent::press(Hand::Left, ControllerButton::Grip),
        ],
    );
    assert_eq!(report.attachments, [HandAttachment::Wheel, HandAttachment::None]);
    assert!(near(rig.engine.wheel().grab_offset(), 1.2));
    assert!(report.wheel.is_some_and(|w| near(w.angle, 1.2)));

    let report = rig.step(Pose::new(1, rim(&config, 0.1)), Pose::new(2, far()), vec![]);
    assert!(report.wheel.is_some_and(|w| near(w.angle, 1.3)));
    Ok(())
}

#[test]
fn limiter_holds_exactly_at_the_boundary() -> TestResult {
    let config = WheelConfig {
        center: Vec3::ZERO,
        degrees: 180.0,
        ..WheelConfig::default()
    };
    let limit = config.limit();
    let mut wheel = WheelEngine::new(config);
    let mut haptics = Vec::new();
    let idle = HandSample {
        position: far(),
        controller_id: 1,
        on_wheel: false,
    };

    let mut angle = 0.0_f64;
    let mut hits = 0;
    for _ in 0..14 {
        angle += 0.2;
        let out = wheel.update(
            &WheelTick {
                left: idle,
                right: HandSample {
                    position: Vec3::new(0.27 * angle.cos(), 0.27 * angle.sin(), 0.0),
                    controller_id: 2,
                    on_wheel: true,
                },
                ffb: None,
            },
            &mut haptics,
        );
        assert!(out.angle.abs() <= limit + 1e-12);
        if out.limited {
            hits += 1;
            assert!(near(out.angle, limit));
        }
    }
    assert!(hits > 1);
    assert!(haptics.iter().all(|h| h.hand == Hand::Right));
    Ok(())
}

#[test]
fn sequential_push_resolves_to_shift_up() -> TestResult {
    let config = ShifterConfig {
        sequential: true,
        ..ShifterConfig::default()
    };
    let mut shifter = ShifterEngine::new(config);
    let mut events = Vec::new();
    let now = Instant::now();
    let knob = shifter.knob();
    shifter.snap(Hand::Right, 2, knob, now, &mut events);

    let unit = config.geometry.knob_unit();
    let pushed = knob + Vec3::new(1.7 * unit, 0.0, 0.9 * unit);
    shifter.update(Some(pushed), now + DT, &mut events);

    let up = GridPosition::new(0, 1)?;
    assert_eq!(shifter.position(), up);
    assert_eq!(shifter.buttons().gear, up.button());
    Ok(())
}

#[test]
fn double_tap_window_is_strict() -> TestResult {
    for (gap_ms, toggles) in [(490, true), (500, false)] {
        let mut shifter = ShifterEngine::new(ShifterConfig::default());
        let mut events = Vec::new();
        let t0 = Instant::now();
        let knob = shifter.knob();
        shifter.snap(Hand::Left, 1, knob, t0, &mut events);
        shifter.unsnap();
        shifter.snap(
            Hand::Left,
            1,
            knob,
            t0 + Duration::from_millis(gap_ms),
            &mut events,
        );
        assert_eq!(shifter.splitter(), toggles, "gap {gap_ms} ms");
    }
    Ok(())
}

#[test]
fn ffb_effect_expires_after_its_loops() -> TestResult {
    let mut config = Config::default();
    config.ffb.enabled = true;
    let rig = Rig::new(config);
    let ffb = rig.engine.ffb();
    let t0 = rig.now;

    // 500 ms constant force at half strength, played twice
    ffb.ingest(&[0x01, 1, 1, 0xF4, 0x01, 0, 0, 0, 0, 255, 0, 0, 0], t0)?;
    ffb.ingest(&[0x05, 1, 0x88, 0x13], t0)?;
    ffb.ingest(&[0x0A, 1, 1, 2], t0)?;

    ffb.tick(t0 + Duration::from_millis(999));
    assert!(ffb.with(|d| d.contains(1)));
    ffb.tick(t0 + Duration::from_millis(1001));
    assert!(!ffb.with(|d| d.contains(1)));
    Ok(())
}

#[test]
fn proximity_grab_settles_on_the_next_tick() -> TestResult {
    let mut config = Config::default();
    config.grab.by_grip = false;
    let mut rig = Rig::new(config);

    // detection queues the grab, the next tick applies it, the one after settles it
    let report = rig.step(Pose::new(1, far()), Pose::new(2, rim(&config, 0.0)), vec![]);
    assert_eq!(report.attachments, [HandAttachment::None, HandAttachment::None]);
    let report = rig.step(Pose::new(1, far()), Pose::new(2, rim(&config, 0.05)), vec![]);
    assert_eq!(report.attachments, [HandAttachment::None, HandAttachment::WheelAuto]);
    let report = rig.step(Pose::new(1, far()), Pose::new(2, rim(&config, 0.1)), vec![]);
    assert_eq!(report.attachments, [HandAttachment::None, HandAttachment::Wheel]);

    rig.step(Pose::new(1, far()), Pose::new(2, far()), vec![]);
    let report = rig.step(Pose::new(1, far()), Pose::new(2, far()), vec![]);
    assert_eq!(report.attachments, [HandAttachment::None, HandAttachment::None]);
    Ok(())
}

#[test]
fn shifter_release_reenables_passthrough_once_inputs_rest() -> TestResult {
    let config = Config::default();
    let mut rig = Rig::new(config);
    let gate = rig.engine.gate();
    let knob = rig.engine.shifter().knob();

    let report = rig.step(
        Pose::new(1, knob),
        Pose::new(2, far()),
        vec![ButtonEvent::press(Hand::Left, ControllerButton::Grip)],
    );
    assert_eq!(report.attachments, [HandAttachment::Shifter, HandAttachment::None]);
    assert!(!gate.is_enabled(Hand::Left, PassthroughLine::TriggerAxis));
    assert!(!rig.recorder.snapshot().haptics.is_empty());

    // trigger still held at release: the line stays disabled
    rig.step(
        Pose::new(1, knob).with_trigger(0.9),
        Pose::new(2, far()),
        vec![ButtonEvent::release(Hand::Left, ControllerButton::Grip)],
    );
    std::thread::sleep(Duration::from_millis(30));
    assert!(!gate.is_enabled(Hand::Left, PassthroughLine::TriggerAxis));

    rig.step(Pose::new(1, knob), Pose::new(2, far()), vec![]);
    let start = Instant::now();
    while !gate.disabled_lines(Hand::Left).is_empty() && start.elapsed() < Duration::from_secs(2) {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(gate.disabled_lines(Hand::Left).is_empty());
    rig.engine.shutdown();
    Ok(())
}
