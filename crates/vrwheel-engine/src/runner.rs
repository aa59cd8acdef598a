//! Owns the frame loop on its own thread

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use vrwheel_errors::TickFault;

use crate::error::{EngineError, EngineResult};
use crate::frame::FrameLoop;
use crate::ticker::FixedRateTicker;

const THREAD_NAME: &str = "vrwheel-frame";

/// Runs a [`FrameLoop`] at its configured tick rate until stopped.
///
/// The loop is handed back by [`LoopRunner::stop_blocking`] so its state can
/// be inspected or the loop restarted.
#[derive(Debug, Default)]
pub struct LoopRunner {
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    period_us: Arc<AtomicU64>,
    handle: Option<JoinHandle<FrameLoop>>,
}

impl LoopRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the loop thread.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyRunning`] if a loop is still running and
    /// [`EngineError::ThreadSpawn`] if the thread cannot be created.
    pub fn start(&mut self, frame_loop: FrameLoop) -> EngineResult<()> {
        if self.handle.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        info!(
            tick_rate_hz = frame_loop.applied_config().tick_rate_hz,
            "Starting frame loop"
        );

        self.running.store(true, Ordering::Release);
        self.ticks.store(0, Ordering::Release);
        let running = Arc::clone(&self.running);
        let ticks = Arc::clone(&self.ticks);
        let period_us = Arc::clone(&self.period_us);
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(frame_loop, &running, &ticks, &period_us));
        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(source) => {
                self.running.store(false, Ordering::Release);
                Err(EngineError::ThreadSpawn {
                    name: THREAD_NAME.to_string(),
                    source,
                })
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ticks completed since the last start.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Period the loop thread currently paces itself at.
    ///
    /// Follows `tick_rate_hz` of the config snapshot the loop last applied.
    pub fn period(&self) -> Duration {
        Duration::from_micros(self.period_us.load(Ordering::Acquire))
    }

    /// Signal the loop to stop, join it and hand the loop back.
    ///
    /// Returns `Ok(None)` if nothing was running.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ThreadPanicked`] if the loop thread panicked.
    pub fn stop_blocking(&mut self) -> EngineResult<Option<FrameLoop>> {
        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };
        info!("Stopping frame loop");
        self.running.store(false, Ordering::Release);
        match handle.join() {
            Ok(frame_loop) => {
                info!(ticks = frame_loop.tick_count(), "Frame loop stopped cleanly");
                Ok(Some(frame_loop))
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| THREAD_NAME.to_string());
                error!(%reason, "Frame loop thread panicked");
                Err(EngineError::ThreadPanicked(reason))
            }
        }
    }
}

impl Drop for LoopRunner {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("Loop runner dropped while still running - forcing stop");
            if let Err(e) = self.stop_blocking() {
                warn!(error = %e, "Frame loop did not stop cleanly");
            }
        }
    }
}

fn run(
    mut frame_loop: FrameLoop,
    running: &AtomicBool,
    ticks: &AtomicU64,
    period_us: &AtomicU64,
) -> FrameLoop {
    info!("Frame loop started");
    let mut ticker = FixedRateTicker::new(frame_loop.applied_config().tick_period());
    period_us.store(micros(ticker.period()), Ordering::Release);
    while running.load(Ordering::Acquire) {
        let timing = ticker.wait();
        if timing.missed {
            frame_loop.record_fault(TickFault::DeadlineMissed);
        }
        frame_loop.tick(Instant::now());
        ticks.fetch_add(1, Ordering::AcqRel);

        let period = frame_loop.applied_config().tick_period();
        if period != ticker.period() {
            info!(period_us = period.as_micros(), "Tick period changed");
            ticker.set_period(period);
            period_us.store(micros(ticker.period()), Ordering::Release);
        }
    }
    frame_loop.shutdown();
    info!(
        ticks = ticker.tick_count(),
        missed = ticker.missed_count(),
        "Frame loop stopping"
    );
    frame_loop
}

fn micros(period: Duration) -> u64 {
    u64::try_from(period.as_micros()).unwrap_or(u64::MAX)
}
