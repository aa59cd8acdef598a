//! Fixed-rate tick pacing
//!
//! Deadlines are absolute: each one is the previous deadline plus the period,
//! so sleep overshoot never accumulates into drift. A tick that starts after
//! its deadline counts as missed; falling more than one whole period behind
//! drops the backlog instead of bursting to catch up.

use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;

/// Missed deadlines between two overrun warnings.
const OVERRUN_LOG_EVERY: u64 = 60;

/// Where a tick started relative to its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTiming {
    /// Sequence number, starting at 1
    pub tick: u64,
    /// How long to sleep before doing the tick's work
    pub sleep: Duration,
    /// The deadline had already passed
    pub missed: bool,
}

#[derive(Debug, Clone)]
pub struct FixedRateTicker {
    period: Duration,
    next_deadline: Option<Instant>,
    tick_count: u64,
    missed_count: u64,
}

impl FixedRateTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_micros(1)),
            next_deadline: None,
            tick_count: 0,
            missed_count: 0,
        }
    }

    pub fn from_rate_hz(rate_hz: u32) -> Self {
        Self::new(Duration::from_secs(1) / rate_hz.max(1))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Change the period from the next deadline on.
    pub fn set_period(&mut self, period: Duration) {
        self.period = period.max(Duration::from_micros(1));
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn missed_count(&self) -> u64 {
        self.missed_count
    }

    /// Schedule the next tick as seen from `now` without sleeping.
    ///
    /// The first call starts the schedule at `now`.
    pub fn schedule(&mut self, now: Instant) -> TickTiming {
        let deadline = self.next_deadline.unwrap_or(now);
        let missed = self.next_deadline.is_some() && now > deadline;
        let sleep = deadline.saturating_duration_since(now);

        let lateness = now.saturating_duration_since(deadline);
        let next = if lateness > self.period {
            now + self.period
        } else {
            deadline + self.period
        };
        self.next_deadline = Some(next);
        self.tick_count = self.tick_count.saturating_add(1);
        if missed {
            self.missed_count = self.missed_count.saturating_add(1);
            if self.missed_count % OVERRUN_LOG_EVERY == 1 {
                warn!(
                    missed = self.missed_count,
                    late_us = lateness.as_micros(),
                    "Tick deadline missed"
                );
            }
        }

        TickTiming {
            tick: self.tick_count,
            sleep,
            missed,
        }
    }

    /// Sleep until the next deadline.
    pub fn wait(&mut self) -> TickTiming {
        let timing = self.schedule(Instant::now());
        if !timing.sleep.is_zero() {
            thread::sleep(timing.sleep);
        }
        timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(10);

    #[test]
    fn test_first_tick_runs_immediately() {
        let mut ticker = FixedRateTicker::new(PERIOD);
        let timing = ticker.schedule(Instant::now());
        assert_eq!(timing.tick, 1);
        assert!(timing.sleep.is_zero());
        assert!(!timing.missed);
    }

    #[test]
    fn test_deadlines_do_not_drift() {
        let mut ticker = FixedRateTicker::new(PERIOD);
        let start = Instant::now();
        ticker.schedule(start);
        // work woke 3 ms late; the next sleep shrinks to compensate
        let timing = ticker.schedule(start + Duration::from_millis(3));
        assert_eq!(timing.sleep, Duration::from_millis(7));
        let timing = ticker.schedule(start + PERIOD + Duration::from_millis(1));
        assert_eq!(timing.sleep, Duration::from_millis(9));
        assert_eq!(ticker.missed_count(), 0);
    }

    #[test]
    fn test_late_tick_is_counted() {
        let mut ticker = FixedRateTicker::new(PERIOD);
        let start = Instant::now();
        ticker.schedule(start);
        let timing = ticker.schedule(start + Duration::from_millis(12));
        assert!(timing.missed);
        assert!(timing.sleep.is_zero());
        assert_eq!(ticker.missed_count(), 1);

        // 2 ms late is within one period: the schedule keeps its phase
        let timing = ticker.schedule(start + Duration::from_millis(15));
        assert_eq!(timing.sleep, Duration::from_millis(5));
    }

    #[test]
    fn test_long_stall_drops_backlog() {
        let mut ticker = FixedRateTicker::new(PERIOD);
        let start = Instant::now();
        ticker.schedule(start);
        let resumed = start + Duration::from_millis(100);
        assert!(ticker.schedule(resumed).missed);
        let timing = ticker.schedule(resumed + Duration::from_millis(1));
        assert!(!timing.missed);
        assert_eq!(timing.sleep, Duration::from_millis(9));
    }

    #[test]
    fn test_rate_conversion() {
        assert_eq!(FixedRateTicker::from_rate_hz(100).period(), PERIOD);
        assert_eq!(FixedRateTicker::from_rate_hz(0).period(), Duration::from_secs(1));
    }
}
