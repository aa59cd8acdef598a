//! Fault codes recorded from inside the frame loop.
//!
//! Nothing in the loop is fatal. A fault is counted, logged off the hot path,
//! and the affected state holds its previous value. The codes are `Copy` and
//! `#[repr(u8)]` so they can be recorded without allocating.

use core::fmt;

use crate::common::ErrorSeverity;

/// Non-fatal anomaly observed during a tick.
///
/// # Examples
///
/// ```
/// use vrwheel_errors::{ErrorSeverity, TickFault};
///
/// let fault = TickFault::NonFinitePose;
/// assert_eq!(fault.code(), 1);
/// assert_eq!(fault.severity(), ErrorSeverity::Warning);
/// assert_eq!(TickFault::from_code(fault.code()), Some(fault));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TickFault {
    /// A pose carried NaN or infinite coordinates and was replaced by the last good one
    NonFinitePose = 1,
    /// An axis reading was outside its legal range and was clamped
    AxisOutOfRange = 2,
    /// The pose source had nothing for this tick
    PoseStalled = 3,
    /// The tick started after its deadline
    DeadlineMissed = 4,
    /// The grab event producer went away
    EventQueueDisconnected = 5,
    /// A computed wheel angle was not finite and was dropped
    NonFiniteAngle = 6,
}

impl TickFault {
    /// All fault codes, in code order.
    pub const ALL: [TickFault; 6] = [
        TickFault::NonFinitePose,
        TickFault::AxisOutOfRange,
        TickFault::PoseStalled,
        TickFault::DeadlineMissed,
        TickFault::EventQueueDisconnected,
        TickFault::NonFiniteAngle,
    ];

    /// Get the numeric fault code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Get the fault severity.
    pub fn severity(self) -> ErrorSeverity {
        match self {
            TickFault::NonFinitePose | TickFault::NonFiniteAngle => ErrorSeverity::Warning,
            TickFault::AxisOutOfRange | TickFault::PoseStalled => ErrorSeverity::Info,
            TickFault::DeadlineMissed => ErrorSeverity::Warning,
            TickFault::EventQueueDisconnected => ErrorSeverity::Error,
        }
    }

    /// Create a fault from its code.
    ///
    /// Returns `None` if the code does not correspond to a known fault.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(TickFault::NonFinitePose),
            2 => Some(TickFault::AxisOutOfRange),
            3 => Some(TickFault::PoseStalled),
            4 => Some(TickFault::DeadlineMissed),
            5 => Some(TickFault::EventQueueDisconnected),
            6 => Some(TickFault::NonFiniteAngle),
            _ => None,
        }
    }
}

impl fmt::Display for TickFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickFault::NonFinitePose => write!(f, "Non-finite pose sample"),
            TickFault::AxisOutOfRange => write!(f, "Axis reading out of range"),
            TickFault::PoseStalled => write!(f, "Pose source stalled"),
            TickFault::DeadlineMissed => write!(f, "Tick deadline missed"),
            TickFault::EventQueueDisconnected => write!(f, "Grab event queue disconnected"),
            TickFault::NonFiniteAngle => write!(f, "Non-finite wheel angle"),
        }
    }
}

impl std::error::Error for TickFault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for fault in TickFault::ALL {
            assert_eq!(TickFault::from_code(fault.code()), Some(fault));
        }
        assert_eq!(TickFault::from_code(0), None);
        assert_eq!(TickFault::from_code(200), None);
    }

    #[test]
    fn test_no_fault_is_critical() {
        for fault in TickFault::ALL {
            assert!(fault.severity() < ErrorSeverity::Critical, "{fault} must not be critical");
        }
    }

    #[test]
    fn test_display_is_not_empty() {
        for fault in TickFault::ALL {
            assert!(!fault.to_string().is_empty());
        }
    }
}
