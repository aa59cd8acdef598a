//! Top-level error type and its classification.

use core::fmt;

use crate::{ReportError, TickFault, ValidationError};

/// Any error the engine reports outside the tick.
#[derive(Debug, thiserror::Error)]
pub enum VrWheelError {
    /// Fault raised from inside the frame loop
    #[error("Tick fault: {0}")]
    Tick(#[from] TickFault),

    /// Force-feedback report could not be decoded
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// A config value or input failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Config file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config document is malformed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VrWheelError {
    /// Create a configuration error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        VrWheelError::Config(msg.into())
    }

    /// Subsystem the error came from.
    pub fn category(&self) -> ErrorCategory {
        match self {
            VrWheelError::Tick(_) => ErrorCategory::Tick,
            VrWheelError::Report(_) => ErrorCategory::Ffb,
            VrWheelError::Validation(_) => ErrorCategory::Validation,
            VrWheelError::Io(_) => ErrorCategory::Io,
            VrWheelError::Config(_) => ErrorCategory::Config,
        }
    }

    /// How serious the error is.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            VrWheelError::Tick(fault) => fault.severity(),
            VrWheelError::Report(e) => e.severity(),
            VrWheelError::Validation(_) | VrWheelError::Io(_) | VrWheelError::Config(_) => {
                ErrorSeverity::Error
            }
        }
    }

    /// Whether the engine keeps running after this error.
    pub fn is_recoverable(&self) -> bool {
        self.severity() < ErrorSeverity::Critical
    }
}

/// Subsystem an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Frame loop faults
    Tick,
    /// Force-feedback report decoding
    Ffb,
    /// Malformed config documents
    Config,
    /// Config file access
    Io,
    /// Out-of-range or inconsistent values
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorCategory::Tick => "tick",
            ErrorCategory::Ffb => "ffb",
            ErrorCategory::Config => "config",
            ErrorCategory::Io => "io",
            ErrorCategory::Validation => "validation",
        })
    }
}

/// How bad an error is, ordered from harmless to fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Expected now and then, nothing to do
    Info,
    /// Degraded a single tick or report
    Warning,
    /// The requested operation failed
    Error,
    /// The engine cannot continue
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARN",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_follows_variant() {
        let err: VrWheelError = TickFault::NonFinitePose.into();
        assert_eq!(err.category(), ErrorCategory::Tick);

        let err = VrWheelError::config("trailing comma");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert_eq!(err.category().to_string(), "config");

        let err: VrWheelError = ReportError::Truncated {
            report_id: 0x05,
            expected: 4,
            actual: 2,
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Ffb);

        let err: VrWheelError = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert_eq!(err.category(), ErrorCategory::Io);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
        assert!(ErrorSeverity::Error > ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning > ErrorSeverity::Info);
    }

    #[test]
    fn test_tick_faults_are_recoverable() {
        for fault in TickFault::ALL {
            assert!(VrWheelError::from(fault).is_recoverable());
        }
    }

    #[test]
    fn test_validation_message_is_wrapped() {
        let err: VrWheelError = ValidationError::not_finite("wheel.center").into();
        assert_eq!(
            err.to_string(),
            "Validation error: wheel.center must be finite"
        );
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }
}
