//! SPDX-License-Identifier: GPL-3.0-or-later

pub mod config;
pub mod error;
pub mod frame;
pub mod logic;
pub mod motion;
pub mod shutdown;
pub mod traits;

#[cfg(test)]
mod tests;
