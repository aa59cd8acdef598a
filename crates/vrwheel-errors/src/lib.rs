//! Centralized error types for the VR wheel engine
//!
//! The engine never aborts a tick: anomalies degrade to hold-last-value and are
//! recorded as [`TickFault`] codes. Everything that can fail outside the tick
//! (configuration, report parsing) reports through the types in this crate.
//!
//! - [`common`]: top-level [`VrWheelError`] with its category and severity
//! - [`tick`]: `Copy` fault codes recorded from inside the frame loop
//! - [`report`]: force-feedback report parsing errors
//! - [`validation`]: configuration and input validation errors
//!
//! # Example
//!
//! ```
//! use vrwheel_errors::prelude::*;
//!
//! fn wheel_degrees(value: f64) -> Result<f64> {
//!     if !(90.0..=3600.0).contains(&value) {
//!         return Err(ValidationError::out_of_range("wheel.degrees", value, 90.0, 3600.0).into());
//!     }
//!     Ok(value)
//! }
//!
//! assert!(wheel_degrees(1440.0).is_ok());
//! assert!(wheel_degrees(10.0).is_err());
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod common;
pub mod prelude;
pub mod report;
pub mod tick;
pub mod validation;

pub use common::{ErrorCategory, ErrorSeverity, VrWheelError};
pub use report::ReportError;
pub use tick::TickFault;
pub use validation::ValidationError;

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, VrWheelError>;

/// A specialized `Result` type for report parsing.
pub type ReportResult<T> = std::result::Result<T, ReportError>;
