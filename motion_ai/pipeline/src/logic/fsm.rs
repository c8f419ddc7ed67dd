//! Generic FSM runtime: keyed states and pluggable handlers
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

/// Trait bound for enum-like state keys used by the FSM.
/// Must be hashable, cloneable and printable for logs/telemetry
pub trait StateKeyLike: Eq + Hash + Clone + Display + Send + Sync + 'static {}
impl<T> StateKeyLike for T where T: Eq + Hash + Clone + Display + Send + Sync + 'static {}

/// Decision returned by a state handler.
/// Stay keeps current state
/// Transition switches to the `to` state
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionDecision<K> {
    Stay,
    Transition { to: K, reason: String },
}

/// A state change that actually happened.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<K> {
    pub from: K,
    pub to: K,
    pub reason: String,
}

/// Per-state event handler: receives the shared context and the event and returns a decision
pub trait StateHandler<K: StateKeyLike, C, E>: Send + Sync {
    fn on_event(&mut self, ctx: &mut C, event: &E) -> TransitionDecision<K>;
}

/// Registry mapping a state key to its handler implementation.
pub struct FsmRegistry<K: StateKeyLike, C, E> {
    handlers: HashMap<K, Box<dyn StateHandler<K, C, E>>>,
}

impl<K: StateKeyLike, C, E> Default for FsmRegistry<K, C, E> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<K: StateKeyLike, C, E> FsmRegistry<K, C, E> {
    /// Register a handler for a given state key
    pub fn register(&mut self, state: K, handler: Box<dyn StateHandler<K, C, E>>) {
        self.handlers.insert(state, handler);
    }

    /// Route an event to the current state's handler and return the next state,
    /// plus the transition record if the state changed.
    /// Caller is responsible for persisting the next state.
    pub fn handle(&mut self, current: &K, ctx: &mut C, event: &E) -> (K, Option<Transition<K>>) {
        let Some(handler) = self.handlers.get_mut(current) else {
            // No handler registered: remain in place
            return (current.clone(), None);
        };
        match handler.on_event(ctx, event) {
            TransitionDecision::Stay => (current.clone(), None),
            TransitionDecision::Transition { to, reason } => {
                let transition = Transition {
                    from: current.clone(),
                    to: to.clone(),
                    reason,
                };
                (to, Some(transition))
            }
        }
    }
}
