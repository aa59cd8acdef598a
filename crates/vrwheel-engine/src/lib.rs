//! VR wheel engine
//!
//! Tracked hand poses go in, a virtual wheel axis and shifter buttons come
//! out. The pieces, bottom up:
//!
//! - [`geometry`]: the wheel's frame in tracking space
//! - [`wheel`]: grab state, unwrapping, inertia, centering and the limiter
//! - [`hands`]: which hand holds what, fed by a grab event queue
//! - [`passthrough`]: input lines the shifter hand keeps from the joystick passthrough
//! - [`config`]: the per-tick configuration snapshot and its file watcher
//! - [`ports`]: traits for the pose source and the output collaborators
//! - [`frame`]: one tick wiring all of the above together
//! - [`ticker`] and [`runner`]: fixed-rate pacing on a dedicated thread
//!
//! # Example
//!
//! ```
//! use std::time::Instant;
//! use vrwheel_engine::{Config, FrameLoop, InputFrame, ScriptedPoses, SharedConfig, Sinks};
//!
//! let poses = ScriptedPoses::new([InputFrame::default()]);
//! let mut engine = FrameLoop::new(SharedConfig::new(Config::default()), poses, Sinks::null());
//! let report = engine.tick(Instant::now());
//! assert_eq!(report.output.axis, vrwheel_device_types::AXIS_CENTER);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod hands;
pub mod passthrough;
pub mod ports;
pub mod runner;
pub mod ticker;
pub mod wheel;

pub use config::*;
pub use error::*;
pub use frame::*;
pub use geometry::*;
pub use hands::*;
pub use passthrough::*;
pub use ports::*;
pub use runner::*;
pub use ticker::*;
pub use wheel::*;
