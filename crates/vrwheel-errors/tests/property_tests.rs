//! Property-based tests for fault codes and error classification.

use proptest::prelude::*;
use vrwheel_errors::{ErrorCategory, ErrorSeverity, ReportError, TickFault, ValidationError, VrWheelError};

proptest! {
    #[test]
    fn tick_fault_code_round_trip(code in any::<u8>()) {
        if let Some(fault) = TickFault::from_code(code) {
            prop_assert_eq!(fault.code(), code);
        }
    }

    #[test]
    fn out_of_range_message_names_field(field in "[a-z.]{1,24}", value in -1e6f64..1e6) {
        let err = ValidationError::out_of_range(&field, value, 0.0, 1.0);
        prop_assert!(err.to_string().contains(&field));
        prop_assert_eq!(err.field(), Some(field.as_str()));
    }

    #[test]
    fn unordered_message_keeps_both_fields(lower in "[a-z_]{1,12}", upper in "[a-z_]{1,12}") {
        let err = ValidationError::unordered(&lower, 0.9_f64, &upper, 0.8_f64);
        let msg = err.to_string();
        prop_assert!(msg.contains(&lower));
        prop_assert!(msg.contains(&upper));
    }

    #[test]
    fn report_errors_never_critical(report_id in any::<u8>()) {
        let errors = [
            ReportError::UnsupportedReport(report_id),
            ReportError::UnknownReport(report_id),
            ReportError::Truncated { report_id, expected: 4, actual: 1 },
        ];
        for err in errors {
            let wrapped: VrWheelError = err.into();
            prop_assert_eq!(wrapped.category(), ErrorCategory::Ffb);
            prop_assert!(wrapped.severity() < ErrorSeverity::Critical);
        }
    }
}
