//! Per-frame motion detection
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

pub mod background;
pub mod detector;
pub mod preprocessing;
