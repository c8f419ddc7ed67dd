//! Cooldown states and their handlers
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::logic::fsm::{StateHandler, TransitionDecision};
use crate::logic::timer::{Timer, TimerManager};
use chrono::Local;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Hash, Eq, PartialEq, Clone, Debug, Copy, Serialize, Deserialize)]
/// Whether downstream object detection is currently switched on
pub enum CooldownPhase {
    Inactive,
    Active,
}

impl fmt::Display for CooldownPhase {
    /// Human-readable name used in logs/telemetry
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl CooldownPhase {
    /// Static string form (no allocation) for hot paths
    pub fn as_str(&self) -> &'static str {
        match self {
            CooldownPhase::Inactive => "Inactive",
            CooldownPhase::Active => "Active",
        }
    }
}

/// The per-frame input to the machine.
#[derive(Debug, Clone, Copy)]
pub struct CooldownEvent {
    pub motion: bool,
    pub now: Instant,
}

/// State shared by both handlers.
pub struct CooldownContext {
    pub(crate) timer: TimerManager,
    pub(crate) period: Duration,
}

fn wall_clock() -> String {
    Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
}

pub struct InactiveState;

impl StateHandler<CooldownPhase, CooldownContext, CooldownEvent> for InactiveState {
    /// Motion -> Active (+ arm the cooldown timer), otherwise stay
    fn on_event(
        &mut self,
        ctx: &mut CooldownContext,
        event: &CooldownEvent,
    ) -> TransitionDecision<CooldownPhase> {
        if !event.motion {
            return TransitionDecision::Stay;
        }
        ctx.timer.start(event.now, ctx.period);
        info!("Motion detected: activating object detection");
        info!("Cooldown started at {}", wall_clock());
        TransitionDecision::Transition {
            to: CooldownPhase::Active,
            reason: "Motion".into(),
        }
    }
}

pub struct ActiveState;

impl StateHandler<CooldownPhase, CooldownContext, CooldownEvent> for ActiveState {
    /// Motion -> rearm and stay; quiet past the deadline -> Inactive; otherwise stay
    fn on_event(
        &mut self,
        ctx: &mut CooldownContext,
        event: &CooldownEvent,
    ) -> TransitionDecision<CooldownPhase> {
        if event.motion {
            // Full rearm from now, not an extension of what is left.
            ctx.timer.start(event.now, ctx.period);
            info!(
                "Motion detected again. Resetting cooldown timer at {}",
                wall_clock()
            );
            return TransitionDecision::Stay;
        }

        if ctx.timer.is_expired(event.now) {
            ctx.timer.cancel();
            info!(
                "Cooldown period elapsed at {}: deactivating object detection",
                wall_clock()
            );
            return TransitionDecision::Transition {
                to: CooldownPhase::Inactive,
                reason: "Cooldown elapsed".into(),
            };
        }

        if let Some(remaining) = ctx.timer.remaining(event.now) {
            debug!(
                "Cooldown active. Time remaining: {:.2} seconds",
                remaining.as_secs_f64()
            );
        }
        TransitionDecision::Stay
    }
}
