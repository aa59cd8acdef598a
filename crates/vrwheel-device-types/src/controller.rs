//! Tracked controller state: hands, buttons and per-tick poses.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Which physical hand a controller belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const ALL: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn other(self) -> Hand {
        match self {
            Hand::Left => Hand::Right,
            Hand::Right => Hand::Left,
        }
    }

    /// Stable slot index, `0` for left and `1` for right.
    pub fn index(self) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hand::Left => write!(f, "left"),
            Hand::Right => write!(f, "right"),
        }
    }
}

/// Controller buttons the engine reacts to, numbered as the tracking runtime numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControllerButton {
    System = 0,
    ApplicationMenu = 1,
    Grip = 2,
    A = 7,
    Touchpad = 32,
    Trigger = 33,
}

impl ControllerButton {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(ControllerButton::System),
            1 => Some(ControllerButton::ApplicationMenu),
            2 => Some(ControllerButton::Grip),
            7 => Some(ControllerButton::A),
            32 => Some(ControllerButton::Touchpad),
            33 => Some(ControllerButton::Trigger),
            _ => None,
        }
    }

    fn bit(self) -> u64 {
        1u64 << u32::from(self.id())
    }
}

/// Pressed-button bitset, one bit per runtime button id.
///
/// # Examples
///
/// ```
/// use vrwheel_device_types::{ButtonMask, ControllerButton};
///
/// let mask = ButtonMask::empty().with(ControllerButton::Trigger);
/// assert!(mask.contains(ControllerButton::Trigger));
/// assert!(!mask.contains(ControllerButton::A));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonMask(u64);

impl ButtonMask {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn with(self, button: ControllerButton) -> Self {
        Self(self.0 | button.bit())
    }

    pub fn without(self, button: ControllerButton) -> Self {
        Self(self.0 & !button.bit())
    }

    pub fn contains(self, button: ControllerButton) -> bool {
        self.0 & button.bit() != 0
    }
}

/// One hand controller sample, produced once per tick by the pose source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in seated tracking space (meters)
    pub position: Vec3,
    /// Tracking runtime device index
    pub controller_id: u32,
    /// Analog trigger, `0.0` released to `1.0` fully pulled
    pub trigger: f64,
    /// Trackpad or thumbstick vertical axis, `-1.0` down to `1.0` up
    pub trackpad_y: f64,
    /// Currently pressed buttons
    pub buttons: ButtonMask,
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(0, Vec3::ZERO)
    }
}

impl Pose {
    pub fn new(controller_id: u32, position: Vec3) -> Self {
        Self {
            position,
            controller_id,
            trigger: 0.0,
            trackpad_y: 0.0,
            buttons: ButtonMask::empty(),
        }
    }

    pub fn with_trigger(mut self, trigger: f64) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_trackpad_y(mut self, trackpad_y: f64) -> Self {
        self.trackpad_y = trackpad_y;
        self
    }

    pub fn with_buttons(mut self, buttons: ButtonMask) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn is_pressed(&self, button: ControllerButton) -> bool {
        self.buttons.contains(button)
    }

    /// Replace anything unusable with the last good sample and clamp axes.
    ///
    /// A non-finite position is replaced as a whole, since a partially valid
    /// point is still a wrong point. Non-finite axes fall back to the previous
    /// reading; finite ones are clamped into their legal range.
    pub fn sanitize(&self, last_good: &Pose) -> SanitizedPose {
        let position_replaced = !self.position.is_finite();
        let position = if position_replaced {
            last_good.position
        } else {
            self.position
        };

        let (trigger, trigger_clamped) = sanitize_axis(self.trigger, last_good.trigger, 0.0, 1.0);
        let (trackpad_y, trackpad_clamped) =
            sanitize_axis(self.trackpad_y, last_good.trackpad_y, -1.0, 1.0);

        SanitizedPose {
            pose: Pose {
                position,
                controller_id: self.controller_id,
                trigger,
                trackpad_y,
                buttons: self.buttons,
            },
            position_replaced,
            axes_clamped: trigger_clamped || trackpad_clamped,
        }
    }
}

fn sanitize_axis(value: f64, fallback: f64, min: f64, max: f64) -> (f64, bool) {
    if !value.is_finite() {
        let fallback = if fallback.is_finite() {
            fallback.clamp(min, max)
        } else {
            0.0_f64.clamp(min, max)
        };
        return (fallback, true);
    }
    (value.clamp(min, max), value < min || value > max)
}

/// Result of [`Pose::sanitize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanitizedPose {
    pub pose: Pose,
    /// The position was non-finite and the last good one was used
    pub position_replaced: bool,
    /// At least one axis was non-finite or outside its range
    pub axes_clamped: bool,
}

/// Headset position and viewing direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub position: Vec3,
    /// Unit forward vector
    pub forward: Vec3,
}

impl Default for HeadPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::new(0.0, 0.0, -1.0),
        }
    }
}

/// Button transition reported by the pose source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub hand: Hand,
    pub button: ControllerButton,
    pub pressed: bool,
}

impl ButtonEvent {
    pub fn press(hand: Hand, button: ControllerButton) -> Self {
        Self {
            hand,
            button,
            pressed: true,
        }
    }

    pub fn release(hand: Hand, button: ControllerButton) -> Self {
        Self {
            hand,
            button,
            pressed: false,
        }
    }
}

#[cfg(feature = "proptest")]
mod proptest_strategies {
    use super::*;
    use proptest::prelude::*;

    impl Arbitrary for Hand {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            prop_oneof![Just(Hand::Left), Just(Hand::Right)].boxed()
        }
    }

    impl Arbitrary for Pose {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            (
                -2.0f64..2.0,
                -2.0f64..2.0,
                -2.0f64..2.0,
                0u32..16,
                0.0f64..=1.0,
                -1.0f64..=1.0,
                any::<u64>(),
            )
                .prop_map(|(x, y, z, id, trigger, trackpad_y, bits)| Pose {
                    position: Vec3::new(x, y, z),
                    controller_id: id,
                    trigger,
                    trackpad_y,
                    buttons: ButtonMask::from_bits(bits),
                })
                .boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_other() {
        assert_eq!(Hand::Left.other(), Hand::Right);
        assert_eq!(Hand::Right.other(), Hand::Left);
        assert_ne!(Hand::Left.index(), Hand::Right.index());
    }

    #[test]
    fn test_button_ids_round_trip() {
        for button in [
            ControllerButton::System,
            ControllerButton::ApplicationMenu,
            ControllerButton::Grip,
            ControllerButton::A,
            ControllerButton::Touchpad,
            ControllerButton::Trigger,
        ] {
            assert_eq!(ControllerButton::from_id(button.id()), Some(button));
        }
        assert_eq!(ControllerButton::from_id(5), None);
    }

    #[test]
    fn test_button_mask_with_without() {
        let mask = ButtonMask::empty()
            .with(ControllerButton::Grip)
            .with(ControllerButton::A);
        assert!(mask.contains(ControllerButton::Grip));
        let mask = mask.without(ControllerButton::Grip);
        assert!(!mask.contains(ControllerButton::Grip));
        assert!(mask.contains(ControllerButton::A));
    }

    #[test]
    fn test_sanitize_keeps_good_pose() {
        let last = Pose::new(1, Vec3::new(0.1, 0.2, 0.3));
        let pose = Pose::new(1, Vec3::new(0.4, 0.5, 0.6)).with_trigger(0.5);
        let out = pose.sanitize(&last);
        assert_eq!(out.pose, pose);
        assert!(!out.position_replaced);
        assert!(!out.axes_clamped);
    }

    #[test]
    fn test_sanitize_replaces_nan_position() {
        let last = Pose::new(1, Vec3::new(0.1, 0.2, 0.3));
        let pose = Pose::new(1, Vec3::new(f64::NAN, 0.5, 0.6));
        let out = pose.sanitize(&last);
        assert_eq!(out.pose.position, last.position);
        assert!(out.position_replaced);
    }

    #[test]
    fn test_sanitize_clamps_axes() {
        let last = Pose::new(1, Vec3::ZERO).with_trigger(0.25);
        let pose = Pose::new(1, Vec3::ZERO)
            .with_trigger(f64::INFINITY)
            .with_trackpad_y(-3.0);
        let out = pose.sanitize(&last);
        assert!((out.pose.trigger - 0.25).abs() < f64::EPSILON);
        assert!((out.pose.trackpad_y + 1.0).abs() < f64::EPSILON);
        assert!(out.axes_clamped);
    }
}
