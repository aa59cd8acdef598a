//! Arbitrary controller input never drives the outputs out of range.

use std::time::{Duration, Instant};

use proptest::prelude::*;
use vrwheel_device_types::{AXIS_MAX, ButtonEvent, ControllerButton, Hand, Pose};
use vrwheel_engine::{Config, FrameLoop, InputFrame, ScriptedPoses, SharedConfig, Sinks};

fn frame() -> impl Strategy<Value = InputFrame> {
    (
        any::<Pose>(),
        any::<Pose>(),
        prop::collection::vec((any::<Hand>(), any::<bool>()), 0..3),
    )
        .prop_map(|(left, right, grips)| InputFrame {
            poses: [left, right],
            buttons: grips
                .into_iter()
                .map(|(hand, pressed)| ButtonEvent {
                    hand,
                    button: ControllerButton::Grip,
                    pressed,
                })
                .collect(),
            ..InputFrame::default()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn axis_and_angle_stay_sane(frames in prop::collection::vec(frame(), 1..120), ffb in any::<bool>()) {
        let mut config = Config::default();
        config.ffb.enabled = ffb;
        let count = frames.len();
        let mut engine = FrameLoop::new(
            SharedConfig::new(config),
            ScriptedPoses::new(frames),
            Sinks::null(),
        );

        let mut now = Instant::now();
        for _ in 0..count {
            let report = engine.tick(now);
            prop_assert!(report.output.axis <= AXIS_MAX);
            prop_assert!(engine.wheel().angle().is_finite());
            now += Duration::from_millis(16);
        }
        engine.shutdown();
    }
}
