//! FFB report layout constants and decoder tuning

/// Output report ids, as numbered by the virtual joystick driver's PID packet types
pub mod report_ids {
    /// Set Effect: duration, gain, direction for one block
    pub const SET_EFFECT: u8 = 0x01;
    /// Set Envelope (not modelled)
    pub const SET_ENVELOPE: u8 = 0x02;
    /// Set Condition (not modelled)
    pub const SET_CONDITION: u8 = 0x03;
    /// Set Periodic (not modelled)
    pub const SET_PERIODIC: u8 = 0x04;
    /// Set Constant Force: signed magnitude for one block
    pub const SET_CONSTANT_FORCE: u8 = 0x05;
    /// Set Ramp Force (not modelled)
    pub const SET_RAMP_FORCE: u8 = 0x06;
    /// Set Custom Force Data (not modelled)
    pub const SET_CUSTOM_FORCE_DATA: u8 = 0x07;
    /// Download Force Sample (not modelled)
    pub const DOWNLOAD_FORCE_SAMPLE: u8 = 0x08;
    /// Effect Operation: start, solo or stop one block
    pub const EFFECT_OPERATION: u8 = 0x0A;
    /// Block Free (not modelled)
    pub const BLOCK_FREE: u8 = 0x0B;
    /// Device Control: stop all, reset, pause, continue, actuators
    pub const DEVICE_CONTROL: u8 = 0x0C;
    /// Device Gain: global gain
    pub const DEVICE_GAIN: u8 = 0x0D;
    /// Set Custom Force (not modelled)
    pub const SET_CUSTOM_FORCE: u8 = 0x0E;
    /// Create New Effect (feature report, not modelled)
    pub const CREATE_NEW_EFFECT: u8 = 0x11;
    /// Block Load (feature report, not modelled)
    pub const BLOCK_LOAD: u8 = 0x12;
    /// PID Pool (feature report, not modelled)
    pub const PID_POOL: u8 = 0x13;

    /// Ids that are valid PID reports but carry nothing the centering model uses
    pub const UNSUPPORTED: [u8; 11] = [
        SET_ENVELOPE,
        SET_CONDITION,
        SET_PERIODIC,
        SET_RAMP_FORCE,
        SET_CUSTOM_FORCE_DATA,
        DOWNLOAD_FORCE_SAMPLE,
        BLOCK_FREE,
        SET_CUSTOM_FORCE,
        CREATE_NEW_EFFECT,
        BLOCK_LOAD,
        PID_POOL,
    ];
}

/// Minimum report lengths, report id byte included
pub const SET_EFFECT_LEN: usize = 13;
pub const SET_CONSTANT_FORCE_LEN: usize = 4;
pub const EFFECT_OPERATION_LEN: usize = 4;
pub const DEVICE_CONTROL_LEN: usize = 2;
pub const DEVICE_GAIN_LEN: usize = 2;

/// Effect duration value meaning "play until stopped"
pub const DURATION_INFINITE: u16 = 0xFFFF;

/// Full-scale constant force magnitude
pub const MAGNITUDE_FULL_SCALE: f32 = 10_000.0;

/// Full-scale gain byte
pub const GAIN_FULL_SCALE: f32 = 255.0;

/// Effect operation codes
pub const OP_START: u8 = 1;
pub const OP_START_SOLO: u8 = 2;
pub const OP_STOP: u8 = 3;

/// Device control codes
pub const CTRL_ENABLE_ACTUATORS: u8 = 1;
pub const CTRL_DISABLE_ACTUATORS: u8 = 2;
pub const CTRL_STOP_ALL: u8 = 3;
pub const CTRL_DEVICE_RESET: u8 = 4;
pub const CTRL_DEVICE_PAUSE: u8 = 5;
pub const CTRL_DEVICE_CONTINUE: u8 = 6;

/// One-pole smoothing factor applied to the summed force each tick
pub const DEFAULT_SMOOTHING_ALPHA: f32 = 0.3;

/// Capacity of the smoothed magnitude history
pub const HISTORY_LEN: usize = 32;

/// Samples inspected by the haptic intensity estimator
pub const ESTIMATOR_WINDOW: usize = 30;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert!(ESTIMATOR_WINDOW <= HISTORY_LEN);
        assert!(DEFAULT_SMOOTHING_ALPHA > 0.0 && DEFAULT_SMOOTHING_ALPHA <= 1.0);
        assert!(MAGNITUDE_FULL_SCALE > 0.0);
    }

    #[test]
    fn test_unsupported_ids_exclude_modelled_reports() {
        for id in [
            report_ids::SET_EFFECT,
            report_ids::SET_CONSTANT_FORCE,
            report_ids::EFFECT_OPERATION,
            report_ids::DEVICE_CONTROL,
            report_ids::DEVICE_GAIN,
        ] {
            assert!(!report_ids::UNSUPPORTED.contains(&id));
        }
    }
}
