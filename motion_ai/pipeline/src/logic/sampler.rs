//! Frame sampling: forward every Nth frame to bound processing cost
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::ConfigError;
use std::num::NonZeroU32;

/// Pure sampling rule: forward iff `counter mod interval == 0`.
pub fn should_forward(counter: u64, interval: NonZeroU32) -> bool {
    counter % u64::from(interval.get()) == 0
}

/// Counts frames seen from the source and decides which ones to forward.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval: NonZeroU32,
    counter: u64,
}

impl FrameSampler {
    pub fn new(interval: NonZeroU32) -> Self {
        Self {
            interval,
            counter: 0,
        }
    }

    /// Build from an unchecked interval. Fails before any frame is read.
    pub fn from_interval(interval: i64) -> Result<Self, ConfigError> {
        u32::try_from(interval)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self::new)
            .ok_or(ConfigError::NonPositiveInterval(interval))
    }

    /// Frames counted so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Count one more frame and report whether it should be processed.
    pub fn advance(&mut self) -> bool {
        self.counter += 1;
        should_forward(self.counter, self.interval)
    }

    /// Start counting afresh, e.g. after the stream is reopened.
    pub fn reset(&mut self) {
        self.counter = 0;
    }
}
