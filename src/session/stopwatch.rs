//! Per-step timing instrument.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Wall-clock start time plus a monotonic elapsed measurement.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Stopwatch {
    /// Starts measuring now.
    pub fn start_new() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Resets the start to now, so the next measurement covers only what
    /// happens from here on.
    pub fn restart(&mut self) {
        self.started_at = Utc::now();
        self.started = Instant::now();
    }

    /// When the current measurement started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
