//! Effect table and per-tick centering magnitude
//!
//! The decoder is fed packets from the driver callback and ticked by the frame
//! loop. Every call takes the current [`Instant`] explicitly so expiry and
//! pause behaviour are deterministic under test.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, trace};
use vrwheel_errors::ReportResult;

use crate::constants::{DEFAULT_SMOOTHING_ALPHA, HISTORY_LEN};
use crate::effects::{EffectSummary, FfbEffect};
use crate::haptics::{HapticEstimate, HapticEstimator};
use crate::history::SmoothedHistory;
use crate::packet::{DeviceControl, EffectOperation, FfbPacket};
use crate::stats::PacketStats;

/// Decoder output for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FfbSample {
    /// Smoothed centering magnitude
    pub smoothed: f32,
    /// Vibration derived from recent history, if any
    pub haptic: Option<HapticEstimate>,
}

#[derive(Debug, Clone)]
pub struct FfbDecoder {
    effects: BTreeMap<u8, FfbEffect>,
    /// Block started with Start Solo, muting the others while it plays
    solo: Option<u8>,
    global_gain: f32,
    actuators_enabled: bool,
    paused_at: Option<Instant>,
    alpha: f32,
    smoothed: f32,
    history: SmoothedHistory,
    estimator: HapticEstimator,
    stats: PacketStats,
}

impl Default for FfbDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_ALPHA, HapticEstimator::default())
    }
}

impl FfbDecoder {
    /// Create a decoder with smoothing factor `alpha` (clamped into `(0, 1]`).
    pub fn new(alpha: f32, estimator: HapticEstimator) -> Self {
        let alpha = sanitize_alpha(alpha);
        Self {
            effects: BTreeMap::new(),
            solo: None,
            global_gain: 1.0,
            actuators_enabled: true,
            paused_at: None,
            alpha,
            smoothed: 0.0,
            history: SmoothedHistory::with_capacity(HISTORY_LEN),
            estimator,
            stats: PacketStats::default(),
        }
    }

    /// Parse and apply one raw report.
    ///
    /// # Errors
    ///
    /// Returns the parse error; decoder state is untouched in that case.
    pub fn ingest(&mut self, raw: &[u8], now: Instant) -> ReportResult<()> {
        match FfbPacket::parse(raw) {
            Ok(packet) => {
                self.apply(packet, now);
                Ok(())
            }
            Err(err) => {
                debug!(error = %err, "Dropping force-feedback report");
                self.stats.record_error(&err);
                Err(err)
            }
        }
    }

    pub fn apply(&mut self, packet: FfbPacket, now: Instant) {
        self.stats.record_handled(packet.kind());
        trace!(?packet, "Applying force-feedback packet");

        match packet {
            FfbPacket::Gain(gain) => self.global_gain = gain.clamp(0.0, 1.0),
            FfbPacket::EffectReport {
                block_index,
                parameters,
            } => self.effect_mut(block_index).apply_parameters(parameters),
            FfbPacket::ConstantForce {
                block_index,
                magnitude,
            } => self.effect_mut(block_index).magnitude = magnitude,
            FfbPacket::EffectOperation {
                block_index,
                operation,
                loop_count,
            } => self.operate(block_index, operation, loop_count, now),
            FfbPacket::DeviceControl(control) => self.control(control, now),
        }
    }

    fn effect_mut(&mut self, block_index: u8) -> &mut FfbEffect {
        self.effects
            .entry(block_index)
            .or_insert_with(|| FfbEffect::new(block_index))
    }

    fn operate(&mut self, block_index: u8, operation: EffectOperation, loop_count: u8, now: Instant) {
        // A start while paused counts from the pause so Continue shifts it like the rest.
        let start_at = self.paused_at.unwrap_or(now);
        match operation {
            EffectOperation::Start => {
                self.effect_mut(block_index).start(start_at, loop_count);
                if self.solo == Some(block_index) {
                    self.solo = None;
                }
            }
            EffectOperation::StartSolo => {
                self.effect_mut(block_index).start(start_at, loop_count);
                self.solo = Some(block_index);
            }
            EffectOperation::Stop => {
                if self.effects.remove(&block_index).is_none() {
                    debug!(block_index, "Stop for unknown effect ignored");
                }
                if self.solo == Some(block_index) {
                    self.solo = None;
                }
            }
        }
    }

    fn control(&mut self, control: DeviceControl, now: Instant) {
        match control {
            DeviceControl::EnableActuators => self.actuators_enabled = true,
            DeviceControl::DisableActuators => self.actuators_enabled = false,
            DeviceControl::StopAll => self.clear_effects(),
            DeviceControl::Reset => {
                self.clear_effects();
                self.global_gain = 1.0;
                self.actuators_enabled = true;
                self.paused_at = None;
            }
            DeviceControl::Pause => {
                if self.paused_at.is_none() {
                    self.paused_at = Some(now);
                }
            }
            DeviceControl::Continue => {
                if let Some(paused_at) = self.paused_at.take() {
                    let paused_for = now.saturating_duration_since(paused_at);
                    for effect in self.effects.values_mut() {
                        effect.shift_clock(paused_for);
                    }
                }
            }
        }
    }

    /// Drop every effect and the force they left behind.
    fn clear_effects(&mut self) {
        self.effects.clear();
        self.solo = None;
        self.smoothed = 0.0;
        self.history.clear();
    }

    /// Expire finished effects, sum the live ones and advance the smoother.
    pub fn tick(&mut self, now: Instant) -> FfbSample {
        let raw = if self.paused_at.is_some() {
            0.0
        } else {
            self.expire(now);
            self.raw_sum()
        };

        let next = self.alpha * raw + (1.0 - self.alpha) * self.smoothed;
        self.smoothed = if next.is_finite() { next } else { 0.0 };
        self.history.push(self.smoothed);

        FfbSample {
            smoothed: self.smoothed,
            haptic: self.estimator.estimate(&self.history),
        }
    }

    fn expire(&mut self, now: Instant) {
        let before = self.effects.len();
        self.effects.retain(|_, effect| !effect.is_expired(now));
        if self.effects.len() != before {
            trace!(expired = before - self.effects.len(), "Expired force-feedback effects");
            if self.solo.is_some_and(|block| !self.effects.contains_key(&block)) {
                self.solo = None;
            }
        }
    }

    fn raw_sum(&self) -> f32 {
        if !self.actuators_enabled {
            return 0.0;
        }
        let sum = match self.solo.and_then(|block| self.effects.get(&block)) {
            Some(solo) => solo.contribution(),
            None => self.effects.values().map(FfbEffect::contribution).sum(),
        };
        sum * self.global_gain
    }

    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    /// Change the smoothing factor; effects and history are kept.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = sanitize_alpha(alpha);
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_estimator(&mut self, estimator: HapticEstimator) {
        self.estimator = estimator;
    }

    pub fn history(&self) -> &SmoothedHistory {
        &self.history
    }

    pub fn contains(&self, block_index: u8) -> bool {
        self.effects.contains_key(&block_index)
    }

    pub fn effect(&self, block_index: u8) -> Option<&FfbEffect> {
        self.effects.get(&block_index)
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    pub fn playing_count(&self) -> usize {
        self.effects.values().filter(|e| e.is_playing()).count()
    }

    pub fn summaries(&self) -> Vec<EffectSummary> {
        self.effects.values().map(FfbEffect::summary).collect()
    }

    pub fn global_gain(&self) -> f32 {
        self.global_gain
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn actuators_enabled(&self) -> bool {
        self.actuators_enabled
    }

    pub fn stats(&self) -> &PacketStats {
        &self.stats
    }
}

fn sanitize_alpha(alpha: f32) -> f32 {
    if alpha.is_finite() {
        alpha.clamp(f32::EPSILON, 1.0)
    } else {
        DEFAULT_SMOOTHING_ALPHA
    }
}
