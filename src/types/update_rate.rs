//! Delivery rate for live sample subscriptions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate at which a subscriber wants samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every sample the capture loop builds.
    Native,

    /// At most this many samples per second. Rates at or above the game's
    /// send rate collapse to [`UpdateRate::Native`].
    Max(u32),
}

impl UpdateRate {
    /// Resolve against the source rate in Hz.
    pub fn normalize(self, source_hz: u32) -> Self {
        match self {
            UpdateRate::Max(hz) if hz == 0 || hz >= source_hz => UpdateRate::Native,
            other => other,
        }
    }

    pub fn throttle_interval(self, source_hz: u32) -> Option<Duration> {
        match self.normalize(source_hz) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}
