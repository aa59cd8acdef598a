//! Thread-safe decoder handle
//!
//! The driver callback ingests reports on its own thread while the frame loop
//! ticks; both go through one short critical section.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use vrwheel_errors::ReportResult;

use crate::decoder::{FfbDecoder, FfbSample};
use crate::packet::FfbPacket;
use crate::stats::PacketStats;

/// Cloneable handle to one [`FfbDecoder`].
///
/// # Examples
///
/// ```
/// use std::time::Instant;
/// use vrwheel_ffb::{FfbDecoder, SharedFfbDecoder};
///
/// let shared = SharedFfbDecoder::new(FfbDecoder::default());
/// let callback = shared.clone();
/// let now = Instant::now();
/// callback.ingest(&[0x0D, 128], now)?;
/// let sample = shared.tick(now);
/// assert!(sample.smoothed.abs() < 1e-6);
/// # Ok::<(), vrwheel_errors::ReportError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedFfbDecoder {
    inner: Arc<Mutex<FfbDecoder>>,
}

impl SharedFfbDecoder {
    pub fn new(decoder: FfbDecoder) -> Self {
        Self {
            inner: Arc::new(Mutex::new(decoder)),
        }
    }

    /// Parse and apply one raw report.
    ///
    /// # Errors
    ///
    /// Returns the parse error; the decoder is unchanged in that case.
    pub fn ingest(&self, raw: &[u8], now: Instant) -> ReportResult<()> {
        self.inner.lock().ingest(raw, now)
    }

    pub fn apply(&self, packet: FfbPacket, now: Instant) {
        self.inner.lock().apply(packet, now);
    }

    pub fn tick(&self, now: Instant) -> FfbSample {
        self.inner.lock().tick(now)
    }

    pub fn smoothed(&self) -> f32 {
        self.inner.lock().smoothed()
    }

    pub fn stats(&self) -> PacketStats {
        self.inner.lock().stats().clone()
    }

    /// Run `f` with exclusive access to the decoder.
    pub fn with<R>(&self, f: impl FnOnce(&mut FfbDecoder) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
