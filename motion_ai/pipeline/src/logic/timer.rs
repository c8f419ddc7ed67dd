//! Rearmable countdown used by the cooldown state machine
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use std::time::{Duration, Instant};

/// Abstract interface for timer behavior (start, cancel, poll). Time is passed in
/// so callers decide what "now" means.
pub trait Timer: Send + Sync {
    // Starts (or restarts) a countdown ending at now + duration.
    fn start(&mut self, now: Instant, duration: Duration);

    // Cancels any active countdown.
    fn cancel(&mut self);

    fn deadline(&self) -> Option<Instant>;

    /// Time left before the deadline, None when no countdown is running.
    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// True once `now` has reached the deadline.
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.deadline(), Some(deadline) if now >= deadline)
    }
}

/// Default timer implementation that manages a single countdown deadline.
#[derive(Debug, Default, Clone)]
pub struct TimerManager {
    pub(crate) deadline: Option<Instant>,
}

impl TimerManager {
    /// Creates a new timer instance with no deadline set.
    pub fn new() -> Self {
        TimerManager { deadline: None }
    }
}

impl Timer for TimerManager {
    fn start(&mut self, now: Instant, duration: Duration) {
        self.deadline = Some(now + duration);
    }

    fn cancel(&mut self) {
        self.deadline = None;
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
