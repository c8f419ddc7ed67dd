//! Debounces the per-frame motion signal into an active/inactive detection state
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::logic::cooldown_states::{
    ActiveState, CooldownContext, CooldownEvent, CooldownPhase, InactiveState,
};
use crate::logic::fsm::{FsmRegistry, Transition};
use crate::logic::timer::{Timer, TimerManager};
use std::time::{Duration, Instant};

/// Snapshot of the machine: `{ active, cooldown_deadline }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownState {
    pub active: bool,
    pub cooldown_deadline: Option<Instant>,
}

/// What one update did.
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownUpdate {
    pub phase: CooldownPhase,
    pub remaining: Option<Duration>,
    pub transition: Option<Transition<CooldownPhase>>,
}

/// Two-state machine: Inactive -> Active on motion, Active rearms on every further
/// motion and falls back to Inactive once a quiet frame arrives at or after the deadline.
///
/// One instance per stream; it is never shared.
pub struct CooldownMachine {
    registry: FsmRegistry<CooldownPhase, CooldownContext, CooldownEvent>,
    ctx: CooldownContext,
    phase: CooldownPhase,
    activations: u64,
}

impl CooldownMachine {
    pub fn new(period: Duration) -> Self {
        let mut registry = FsmRegistry::default();

        // Nothing is happening; waiting for motion.
        registry.register(CooldownPhase::Inactive, Box::new(InactiveState));

        // Motion seen recently; stays on until the cooldown runs out.
        registry.register(CooldownPhase::Active, Box::new(ActiveState));

        Self {
            registry,
            ctx: CooldownContext {
                timer: TimerManager::new(),
                period,
            },
            phase: CooldownPhase::Inactive,
            activations: 0,
        }
    }

    pub fn phase(&self) -> CooldownPhase {
        self.phase
    }

    pub fn state(&self) -> CooldownState {
        CooldownState {
            active: self.phase == CooldownPhase::Active,
            cooldown_deadline: self.ctx.timer.deadline(),
        }
    }

    /// Number of Inactive -> Active transitions so far.
    pub fn activations(&self) -> u64 {
        self.activations
    }

    /// Feed one motion signal observed at `now`.
    pub fn update(&mut self, motion: bool, now: Instant) -> CooldownUpdate {
        let event = CooldownEvent { motion, now };
        let (next, transition) = self.registry.handle(&self.phase, &mut self.ctx, &event);
        if next == CooldownPhase::Active && self.phase == CooldownPhase::Inactive {
            self.activations += 1;
        }
        self.phase = next;

        CooldownUpdate {
            phase: next,
            remaining: self.ctx.timer.remaining(now),
            transition,
        }
    }
}
