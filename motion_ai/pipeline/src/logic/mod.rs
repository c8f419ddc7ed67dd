//! SPDX-License-Identifier: GPL-3.0-or-later

pub mod context;
pub mod cooldown;
pub mod cooldown_states;
pub mod fsm;
pub mod pipeline;
pub mod sampler;
pub mod telemetry;
pub mod timer;
