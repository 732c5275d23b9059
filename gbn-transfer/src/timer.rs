//! Retransmission timer.
//!
//! Go-Back-N runs a single timer per window rather than one per segment.
//! [`RetransmitTimer`] is a single-shot, restartable countdown measured
//! against `tokio::time::Instant`, so tests that pause the tokio clock drive
//! it deterministically.
//!
//! ```text
//!            start()                   stop() / expiry handled
//!  STOPPED ──────────▶ RUNNING ──────────────────────────────▶ STOPPED
//!                       │  ▲
//!                       └──┘ start() while running: no-op
//! ```

use std::time::Duration;

use tokio::time::Instant;

/// A single cumulative retransmission timer.
#[derive(Debug, Clone)]
pub struct RetransmitTimer {
    duration: Duration,
    started_at: Option<Instant>,
}

impl RetransmitTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started_at: None,
        }
    }

    /// Start the countdown.
    ///
    /// Does nothing if the timer is already running; the first deadline
    /// is kept.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Stop the countdown, whether or not it was running.
    pub fn stop(&mut self) {
        self.started_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// `true` once the timer is running and `duration` has elapsed since
    /// [`start`](Self::start).  A stopped timer never reports expiry.
    pub fn is_expired(&self) -> bool {
        self.started_at
            .is_some_and(|t| t.elapsed() >= self.duration)
    }

    /// Instant at which the running timer expires.
    pub fn deadline(&self) -> Option<Instant> {
        self.started_at.map(|t| t + self.duration)
    }
}
