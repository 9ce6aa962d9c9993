//! Engine clock — monotonic millisecond offsets for result timing, anchored
//! to a wall-clock origin for human-facing timestamps.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct EngineClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
}

impl Default for EngineClock {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            wall_origin: Utc::now(),
        }
    }

    /// Milliseconds elapsed since the clock was created.
    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// Wall-clock time corresponding to an offset produced by [`now_ms`].
    ///
    /// [`now_ms`]: EngineClock::now_ms
    pub fn wall_time(&self, offset_ms: u64) -> DateTime<Utc> {
        self.wall_origin + chrono::Duration::milliseconds(offset_ms as i64)
    }

    pub fn wall_origin(&self) -> DateTime<Utc> {
        self.wall_origin
    }
}

/// Suspend the current task. Zero-length waits return immediately.
pub async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
