//! Typed force-feedback packets and raw report parsing
//!
//! Reports arrive from the virtual joystick driver as byte buffers whose first
//! byte is the report id. Multi-byte fields are little-endian. Layouts:
//!
//! | id     | bytes after the id                                                        |
//! |--------|---------------------------------------------------------------------------|
//! | `0x01` | block, type, duration(u16), trigger repeat(u16), sample period(u16), gain, trigger button, axes, direction |
//! | `0x05` | block, magnitude(i16)                                                     |
//! | `0x0A` | block, operation, loop count                                              |
//! | `0x0C` | control                                                                   |
//! | `0x0D` | gain                                                                      |

use core::time::Duration;

use serde::{Deserialize, Serialize};
use vrwheel_errors::{ReportError, ReportResult};

use crate::FfbDirection;
use crate::constants::*;

/// Effect playback operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectOperation {
    Start,
    /// Start and mute every other effect while this one plays
    StartSolo,
    Stop,
}

impl EffectOperation {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            OP_START => Some(EffectOperation::Start),
            OP_START_SOLO => Some(EffectOperation::StartSolo),
            OP_STOP => Some(EffectOperation::Stop),
            _ => None,
        }
    }
}

/// Device-wide control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceControl {
    EnableActuators,
    DisableActuators,
    StopAll,
    Reset,
    Pause,
    Continue,
}

impl DeviceControl {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            CTRL_ENABLE_ACTUATORS => Some(DeviceControl::EnableActuators),
            CTRL_DISABLE_ACTUATORS => Some(DeviceControl::DisableActuators),
            CTRL_STOP_ALL => Some(DeviceControl::StopAll),
            CTRL_DEVICE_RESET => Some(DeviceControl::Reset),
            CTRL_DEVICE_PAUSE => Some(DeviceControl::Pause),
            CTRL_DEVICE_CONTINUE => Some(DeviceControl::Continue),
            _ => None,
        }
    }
}

/// How long one loop of an effect plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectDuration {
    Finite(Duration),
    #[default]
    Infinite,
}

impl EffectDuration {
    /// Interpret a raw millisecond field, where `0xFFFF` means "until stopped".
    pub fn from_millis_field(raw: u16) -> Self {
        if raw == DURATION_INFINITE {
            EffectDuration::Infinite
        } else {
            EffectDuration::Finite(Duration::from_millis(u64::from(raw)))
        }
    }
}

/// Parameters carried by a Set Effect report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectParameters {
    /// Raw effect type byte; only constant force contributes to centering
    pub effect_type: u8,
    pub duration: EffectDuration,
    /// Per-effect gain, `0.0..=1.0`
    pub gain: f32,
    pub direction: FfbDirection,
}

/// One decoded force-feedback packet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FfbPacket {
    /// Global gain, `0.0..=1.0`
    Gain(f32),
    EffectOperation {
        block_index: u8,
        operation: EffectOperation,
        loop_count: u8,
    },
    EffectReport {
        block_index: u8,
        parameters: EffectParameters,
    },
    /// Constant force magnitude, normalized to `-1.0..=1.0`
    ConstantForce { block_index: u8, magnitude: f32 },
    DeviceControl(DeviceControl),
}

impl FfbPacket {
    /// Effect block the packet addresses, if any.
    pub fn block_index(&self) -> Option<u8> {
        match *self {
            FfbPacket::EffectOperation { block_index, .. }
            | FfbPacket::EffectReport { block_index, .. }
            | FfbPacket::ConstantForce { block_index, .. } => Some(block_index),
            FfbPacket::Gain(_) | FfbPacket::DeviceControl(_) => None,
        }
    }

    /// Short name used in logs and statistics.
    pub fn kind(&self) -> PacketKind {
        match self {
            FfbPacket::Gain(_) => PacketKind::Gain,
            FfbPacket::EffectOperation { .. } => PacketKind::EffectOperation,
            FfbPacket::EffectReport { .. } => PacketKind::EffectReport,
            FfbPacket::ConstantForce { .. } => PacketKind::ConstantForce,
            FfbPacket::DeviceControl(_) => PacketKind::DeviceControl,
        }
    }

    /// Decode one raw output report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] for empty, truncated, unknown or unsupported
    /// reports and for out-of-set operation or control codes.
    ///
    /// # Examples
    ///
    /// ```
    /// use vrwheel_ffb::{EffectOperation, FfbPacket};
    ///
    /// let packet = FfbPacket::parse(&[0x0A, 3, 1, 2])?;
    /// assert_eq!(
    ///     packet,
    ///     FfbPacket::EffectOperation { block_index: 3, operation: EffectOperation::Start, loop_count: 2 }
    /// );
    /// # Ok::<(), vrwheel_errors::ReportError>(())
    /// ```
    pub fn parse(raw: &[u8]) -> ReportResult<Self> {
        let Some(&report_id) = raw.first() else {
            return Err(ReportError::Empty);
        };

        match report_id {
            report_ids::DEVICE_GAIN => {
                let [_, gain] = fixed::<DEVICE_GAIN_LEN>(raw)?;
                Ok(FfbPacket::Gain(normalize_gain(gain)))
            }
            report_ids::DEVICE_CONTROL => {
                let [_, code] = fixed::<DEVICE_CONTROL_LEN>(raw)?;
                DeviceControl::from_code(code)
                    .map(FfbPacket::DeviceControl)
                    .ok_or(ReportError::InvalidField {
                        report_id,
                        field: "device control",
                        value: code,
                    })
            }
            report_ids::EFFECT_OPERATION => {
                let [_, block_index, code, loop_count] = fixed::<EFFECT_OPERATION_LEN>(raw)?;
                let operation =
                    EffectOperation::from_code(code).ok_or(ReportError::InvalidField {
                        report_id,
                        field: "effect operation",
                        value: code,
                    })?;
                Ok(FfbPacket::EffectOperation {
                    block_index,
                    operation,
                    loop_count,
                })
            }
            report_ids::SET_CONSTANT_FORCE => {
                let [_, block_index, lo, hi] = fixed::<SET_CONSTANT_FORCE_LEN>(raw)?;
                let magnitude =
                    (f32::from(i16::from_le_bytes([lo, hi])) / MAGNITUDE_FULL_SCALE).clamp(-1.0, 1.0);
                Ok(FfbPacket::ConstantForce {
                    block_index,
                    magnitude,
                })
            }
            report_ids::SET_EFFECT => {
                let [
                    _,
                    block_index,
                    effect_type,
                    dur_lo,
                    dur_hi,
                    _trigger_repeat_lo,
                    _trigger_repeat_hi,
                    _sample_period_lo,
                    _sample_period_hi,
                    gain,
                    _trigger_button,
                    _axes_enable,
                    direction,
                ] = fixed::<SET_EFFECT_LEN>(raw)?;
                Ok(FfbPacket::EffectReport {
                    block_index,
                    parameters: EffectParameters {
                        effect_type,
                        duration: EffectDuration::from_millis_field(u16::from_le_bytes([
                            dur_lo, dur_hi,
                        ])),
                        gain: normalize_gain(gain),
                        direction: FfbDirection::from_polar_byte(direction),
                    },
                })
            }
            id if report_ids::UNSUPPORTED.contains(&id) => Err(ReportError::UnsupportedReport(id)),
            id => Err(ReportError::UnknownReport(id)),
        }
    }
}

/// Packet kinds, for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PacketKind {
    Gain,
    EffectOperation,
    EffectReport,
    ConstantForce,
    DeviceControl,
}

impl PacketKind {
    pub const ALL: [PacketKind; 5] = [
        PacketKind::Gain,
        PacketKind::EffectOperation,
        PacketKind::EffectReport,
        PacketKind::ConstantForce,
        PacketKind::DeviceControl,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

fn normalize_gain(raw: u8) -> f32 {
    f32::from(raw) / GAIN_FULL_SCALE
}

fn fixed<const N: usize>(raw: &[u8]) -> ReportResult<[u8; N]> {
    raw.get(..N)
        .and_then(|head| <[u8; N]>::try_from(head).ok())
        .ok_or(ReportError::Truncated {
            report_id: raw.first().copied().unwrap_or_default(),
            expected: N,
            actual: raw.len(),
        })
}
