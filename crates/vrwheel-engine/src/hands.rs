//! Which hand drives what
//!
//! Grip presses, releases and proximity detection all turn into
//! [`HandEvent`]s on one queue. The frame loop drains it once per tick, so a
//! hand's attachment only ever changes on the loop thread.

use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use vrwheel_device_types::{
    ButtonEvent, ControllerButton, Hand, HapticEnvelope, HapticRequest, Pose,
};
use vrwheel_shifter::{ShifterEngine, ShifterEvent};

use crate::passthrough::{PassthroughGate, REENABLE_POLL_INTERVAL, ReenablePoller};
use crate::wheel::WheelEngine;

/// Pulse confirming a shifter grab.
pub const SHIFTER_GRAB_PULSE_US: u16 = 300;

/// Pulse while a free hand touches the knob.
pub const KNOB_TOUCH_PULSE_US: u16 = 100;

/// Minimum spacing of knob touch pulses.
pub const KNOB_TOUCH_INTERVAL: Duration = Duration::from_millis(120);

/// What a hand is attached to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandAttachment {
    #[default]
    None,
    Wheel,
    /// Grabbed by proximity this tick; settles to `Wheel` on the next one
    WheelAuto,
    Shifter,
}

impl HandAttachment {
    pub fn is_wheel(self) -> bool {
        matches!(self, HandAttachment::Wheel | HandAttachment::WheelAuto)
    }

    pub fn is_free(self) -> bool {
        matches!(self, HandAttachment::None)
    }
}

/// Where a grab request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrabOrigin {
    Grip,
    Proximity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandEvent {
    pub hand: Hand,
    pub grabbed: bool,
    pub origin: GrabOrigin,
}

impl HandEvent {
    pub fn grab(hand: Hand) -> Self {
        Self {
            hand,
            grabbed: true,
            origin: GrabOrigin::Grip,
        }
    }

    pub fn release(hand: Hand) -> Self {
        Self {
            hand,
            grabbed: false,
            origin: GrabOrigin::Grip,
        }
    }

    pub fn proximity_grab(hand: Hand) -> Self {
        Self {
            hand,
            grabbed: true,
            origin: GrabOrigin::Proximity,
        }
    }

    pub fn proximity_release(hand: Hand) -> Self {
        Self {
            hand,
            grabbed: false,
            origin: GrabOrigin::Proximity,
        }
    }
}

/// Producer side of the grab queue; clone it into whatever thread reports buttons.
#[derive(Debug, Clone)]
pub struct HandEventSender {
    tx: Sender<HandEvent>,
}

impl HandEventSender {
    /// Enqueue without blocking. Returns `false` once the router is gone.
    pub fn send(&self, event: HandEvent) -> bool {
        self.tx.try_send(event).is_ok()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GripMode {
    /// Holding grip holds the wheel, letting go releases it
    #[default]
    Hold,
    /// A press grabs when free and releases when attached
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    /// Grab with the grip button; otherwise hands grab the rim by proximity
    pub by_grip: bool,
    pub grip_mode: GripMode,
    /// A grip press anywhere outside the shifter grabs the wheel; when off
    /// the hand has to be inside the holding annulus
    pub grab_anywhere: bool,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            by_grip: true,
            grip_mode: GripMode::Hold,
            grab_anywhere: true,
        }
    }
}

/// Everything a router step may touch besides its own state.
#[derive(Debug)]
pub struct RouterContext<'a> {
    pub poses: &'a [Pose; 2],
    pub wheel: &'a mut WheelEngine,
    pub shifter: &'a mut ShifterEngine,
    pub now: Instant,
    pub haptics: &'a mut Vec<HapticRequest>,
    pub shifter_events: &'a mut Vec<ShifterEvent>,
}

impl RouterContext<'_> {
    fn pose(&self, hand: Hand) -> Pose {
        self.poses.get(hand.index()).copied().unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct HandRouter {
    config: GrabConfig,
    attachments: [HandAttachment; 2],
    /// Wheel attachment made by proximity and not yet confirmed by a grip
    proximity: [bool; 2],
    in_holding: [bool; 2],
    tx: Sender<HandEvent>,
    rx: Receiver<HandEvent>,
    gate: PassthroughGate,
    pollers: [Option<ReenablePoller>; 2],
    poll_interval: Duration,
    last_knob_pulse: Option<Instant>,
}

impl HandRouter {
    pub fn new(config: GrabConfig, gate: PassthroughGate) -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            config,
            attachments: [HandAttachment::None; 2],
            proximity: [false; 2],
            in_holding: [false; 2],
            tx,
            rx,
            gate,
            pollers: [None, None],
            poll_interval: REENABLE_POLL_INTERVAL,
            last_knob_pulse: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn config(&self) -> &GrabConfig {
        &self.config
    }

    pub fn reconfigure(&mut self, config: GrabConfig) {
        if config.by_grip != self.config.by_grip {
            self.in_holding = [false; 2];
        }
        self.config = config;
    }

    pub fn sender(&self) -> HandEventSender {
        HandEventSender {
            tx: self.tx.clone(),
        }
    }

    pub fn gate(&self) -> &PassthroughGate {
        &self.gate
    }

    pub fn attachment(&self, hand: Hand) -> HandAttachment {
        self.attachments
            .get(hand.index())
            .copied()
            .unwrap_or_default()
    }

    fn set_attachment(&mut self, hand: Hand, attachment: HandAttachment) {
        if let Some(slot) = self.attachments.get_mut(hand.index()) {
            *slot = attachment;
        }
    }

    fn is_proximity(&self, hand: Hand) -> bool {
        self.proximity.get(hand.index()).copied().unwrap_or(false)
    }

    fn set_proximity(&mut self, hand: Hand, value: bool) {
        if let Some(slot) = self.proximity.get_mut(hand.index()) {
            *slot = value;
        }
    }

    /// Per-hand "on the wheel" flags, left first.
    pub fn wheel_hands(&self) -> [bool; 2] {
        Hand::ALL.map(|hand| self.attachment(hand).is_wheel())
    }

    pub fn shifter_hand(&self) -> Option<Hand> {
        Hand::ALL
            .into_iter()
            .find(|hand| self.attachment(*hand) == HandAttachment::Shifter)
    }

    /// Attachments made by proximity last tick become settled wheel grips.
    pub fn settle_auto_grabs(&mut self) {
        for slot in &mut self.attachments {
            if *slot == HandAttachment::WheelAuto {
                *slot = HandAttachment::Wheel;
            }
        }
    }

    /// Translate a controller button transition into queue entries.
    ///
    /// The A button toggles the splitter directly while the hand holds the shifter.
    pub fn on_button(&mut self, event: &ButtonEvent, ctx: &mut RouterContext<'_>) {
        let attachment = self.attachment(event.hand);
        match (event.button, event.pressed) {
            (ControllerButton::A, true) if attachment == HandAttachment::Shifter => {
                ctx.shifter.toggle_splitter(ctx.shifter_events);
            }
            (ControllerButton::Grip, pressed) => {
                let queued = match (self.config.grip_mode, pressed) {
                    (GripMode::Hold, true) => Some(HandEvent::grab(event.hand)),
                    (GripMode::Hold, false) => Some(HandEvent::release(event.hand)),
                    (GripMode::Toggle, true) if attachment.is_free() => {
                        Some(HandEvent::grab(event.hand))
                    }
                    (GripMode::Toggle, true) => Some(HandEvent::release(event.hand)),
                    (GripMode::Toggle, false) => None,
                };
                if let Some(queued) = queued
                    && self.tx.try_send(queued).is_err()
                {
                    warn!(hand = %event.hand, "Grab queue closed, dropping grip event");
                }
            }
            _ => {}
        }
    }

    /// Apply every queued event without waiting for more.
    pub fn drain(&mut self, ctx: &mut RouterContext<'_>) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply(event, ctx),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Grab queue disconnected");
                    break;
                }
            }
        }
    }

    /// Apply one event.
    pub fn apply(&mut self, event: HandEvent, ctx: &mut RouterContext<'_>) {
        if event.grabbed {
            self.grab(event.hand, event.origin, ctx);
        } else {
            self.release(event.hand, ctx);
        }
    }

    fn release(&mut self, hand: Hand, ctx: &mut RouterContext<'_>) {
        let previous = self.attachment(hand);
        self.set_attachment(hand, HandAttachment::None);
        self.set_proximity(hand, false);
        match previous {
            HandAttachment::None => trace!(%hand, "Release of a free hand ignored"),
            HandAttachment::Wheel | HandAttachment::WheelAuto => {
                debug!(%hand, "Hand left the wheel");
                ctx.wheel.unsnap_two_hand();
            }
            HandAttachment::Shifter => {
                debug!(%hand, "Hand left the shifter");
                ctx.shifter.unsnap();
                self.spawn_reenable(hand);
            }
        }
    }

    fn spawn_reenable(&mut self, hand: Hand) {
        let Some(slot) = self.pollers.get_mut(hand.index()) else {
            return;
        };
        if let Some(old) = slot.as_ref() {
            old.cancel();
        }
        match ReenablePoller::spawn(self.gate.clone(), hand, self.poll_interval) {
            Ok(poller) => *slot = Some(poller),
            Err(e) => {
                warn!(%hand, error = %e, "Re-enable poller unavailable, restoring passthrough now");
                *slot = None;
                self.gate.enable_all(hand);
            }
        }
    }

    fn grab(&mut self, hand: Hand, origin: GrabOrigin, ctx: &mut RouterContext<'_>) {
        match self.attachment(hand) {
            HandAttachment::None => {}
            HandAttachment::Wheel | HandAttachment::WheelAuto
                if origin == GrabOrigin::Grip && self.is_proximity(hand) =>
            {
                debug!(%hand, "Proximity grip confirmed");
                self.set_attachment(hand, HandAttachment::Wheel);
                self.set_proximity(hand, false);
                return;
            }
            attached => {
                trace!(%hand, ?attached, "Grab of an attached hand ignored");
                return;
            }
        }

        let pose = ctx.pose(hand);
        let shifter_free = ctx.shifter.snapped_hand().is_none();
        if origin == GrabOrigin::Grip && shifter_free && ctx.shifter.check_collision(pose.position) {
            self.gate
                .disable_for_shifter(hand, self.pollers.iter().flatten());
            self.set_attachment(hand, HandAttachment::Shifter);
            ctx.shifter
                .snap(hand, pose.controller_id, pose.position, ctx.now, ctx.shifter_events);
            ctx.haptics.push(HapticRequest {
                hand,
                controller_id: pose.controller_id,
                envelope: HapticEnvelope::pulse_us(SHIFTER_GRAB_PULSE_US),
            });
            debug!(%hand, "Hand grabbed the shifter");
            return;
        }

        match origin {
            GrabOrigin::Proximity => {
                self.set_attachment(hand, HandAttachment::WheelAuto);
                self.set_proximity(hand, true);
                debug!(%hand, "Hand grabbed the wheel by proximity");
            }
            GrabOrigin::Grip
                if self.config.grab_anywhere
                    || ctx.wheel.frame().in_holding_bounds(pose.position) =>
            {
                self.set_attachment(hand, HandAttachment::Wheel);
                debug!(%hand, "Hand grabbed the wheel");
            }
            GrabOrigin::Grip => trace!(%hand, "Grip outside the rim ignored"),
        }
    }

    /// Queue proximity grabs and releases for hands crossing the rim's
    /// holding annulus, and drop two-hand mode for hands too far apart.
    ///
    /// Does nothing while grabbing is bound to the grip button.
    pub fn detect_proximity(&mut self, poses: &[Pose; 2], wheel: &mut WheelEngine) {
        if self.config.by_grip {
            return;
        }
        for hand in Hand::ALL {
            let position = poses.get(hand.index()).map(|p| p.position).unwrap_or_default();
            let inside = wheel.frame().in_holding_bounds(position);
            let Some(was_inside) = self.in_holding.get_mut(hand.index()) else {
                continue;
            };
            if *was_inside == inside {
                continue;
            }
            *was_inside = inside;
            let event = if inside {
                Some(HandEvent::proximity_grab(hand))
            } else if self.attachment(hand).is_wheel() && self.is_proximity(hand) {
                Some(HandEvent::proximity_release(hand))
            } else {
                None
            };
            if let Some(event) = event
                && self.tx.try_send(event).is_err()
            {
                warn!(%hand, "Grab queue closed, dropping proximity event");
            }
        }

        let [left, right] = poses;
        if wheel.frame().ready_to_unsnap(left.position, right.position) {
            wheel.unsnap_two_hand();
        }
    }

    /// Light pulse for a free hand touching the knob while nobody holds the shifter.
    pub fn knob_haptics(
        &mut self,
        poses: &[Pose; 2],
        shifter: &ShifterEngine,
        now: Instant,
        haptics: &mut Vec<HapticRequest>,
    ) {
        if self.shifter_hand().is_some() {
            return;
        }
        let due = self
            .last_knob_pulse
            .is_none_or(|last| now.saturating_duration_since(last) > KNOB_TOUCH_INTERVAL);
        if !due {
            return;
        }
        self.last_knob_pulse = Some(now);
        for hand in Hand::ALL {
            let Some(pose) = poses.get(hand.index()) else {
                continue;
            };
            if self.attachment(hand).is_free() && shifter.check_collision(pose.position) {
                haptics.push(HapticRequest {
                    hand,
                    controller_id: pose.controller_id,
                    envelope: HapticEnvelope::pulse_us(KNOB_TOUCH_PULSE_US),
                });
            }
        }
    }

    /// Cancel and join every re-enable poller.
    pub fn shutdown(&mut self) {
        for poller in self.pollers.iter_mut().flatten() {
            poller.shutdown();
        }
        self.pollers = [None, None];
    }
}

impl Drop for HandRouter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
