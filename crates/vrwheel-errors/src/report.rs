//! Force-feedback report decoding errors.

use crate::common::ErrorSeverity;

/// Errors produced while decoding a raw force-feedback output report.
///
/// None of these are allowed to touch decoder state: the report is dropped and
/// counted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    /// Zero-length report
    #[error("Empty force-feedback report")]
    Empty,

    /// Report shorter than its fixed layout
    #[error("Report 0x{report_id:02X} truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Report id (first byte)
        report_id: u8,
        /// Minimum length of this report
        expected: usize,
        /// Length actually received
        actual: usize,
    },

    /// Known report kind that the decoder does not model
    #[error("Unsupported force-feedback report 0x{0:02X}")]
    UnsupportedReport(u8),

    /// Report id not defined by the PID usage table
    #[error("Unknown force-feedback report 0x{0:02X}")]
    UnknownReport(u8),

    /// Field value outside its defined set
    #[error("Invalid {field} value {value} in report 0x{report_id:02X}")]
    InvalidField {
        /// Report id (first byte)
        report_id: u8,
        /// Field name
        field: &'static str,
        /// Raw value
        value: u8,
    },
}

impl ReportError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReportError::UnsupportedReport(_) => ErrorSeverity::Info,
            ReportError::Empty
            | ReportError::Truncated { .. }
            | ReportError::UnknownReport(_)
            | ReportError::InvalidField { .. } => ErrorSeverity::Warning,
        }
    }

    /// Report id the error refers to, if one was read.
    pub fn report_id(&self) -> Option<u8> {
        match self {
            ReportError::Empty => None,
            ReportError::Truncated { report_id, .. } | ReportError::InvalidField { report_id, .. } => {
                Some(*report_id)
            }
            ReportError::UnsupportedReport(id) | ReportError::UnknownReport(id) => Some(*id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_display() {
        let err = ReportError::Truncated {
            report_id: 0x0A,
            expected: 4,
            actual: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x0A"));
        assert!(msg.contains('4'));
        assert!(msg.contains('2'));
    }

    #[test]
    fn test_report_id() {
        assert_eq!(ReportError::Empty.report_id(), None);
        assert_eq!(ReportError::UnsupportedReport(0x03).report_id(), Some(0x03));
        assert_eq!(
            ReportError::InvalidField {
                report_id: 0x0C,
                field: "control",
                value: 9
            }
            .report_id(),
            Some(0x0C)
        );
    }

    #[test]
    fn test_unsupported_is_informational() {
        assert_eq!(
            ReportError::UnsupportedReport(0x04).severity(),
            ErrorSeverity::Info
        );
        assert_eq!(ReportError::Empty.severity(), ErrorSeverity::Warning);
    }
}
