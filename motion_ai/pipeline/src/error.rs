//! Error types shared by the motion pipeline and its collaborators
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Duration;
use thiserror::Error;

/// Rejected configuration. Raised once at startup, before the frame loop.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("process_interval must be positive (got {0})")]
    NonPositiveInterval(i64),
    #[error("cooldown_period must be a positive number of seconds (got {0})")]
    NonPositiveCooldown(f64),
    #[error("{axis} must be within (0, 1] (got {value})")]
    ScaleOutOfRange { axis: &'static str, value: f32 },
    #[error("blur kernel size must be odd and at least 1 (got {0})")]
    InvalidBlurKernel(u32),
    #[error("background history must be at least one frame")]
    ZeroHistory,
    #[error("var_threshold must be positive (got {0})")]
    NonPositiveVarThreshold(f32),
    #[error("fps_display_interval must be a positive number of seconds (got {0})")]
    NonPositiveFpsInterval(f64),
    #[error("print_interval must be at least one frame")]
    ZeroPrintInterval,
    #[error("display_every must be at least one frame")]
    ZeroDisplayEvery,
    #[error("read_timeout_secs must be positive (got {0})")]
    NonPositiveReadTimeout(f64),
    #[error("no stream source configured")]
    EmptySource,
}

/// Failures inside a single pipeline invocation.
#[derive(Debug, Error, PartialEq)]
pub enum MotionError {
    #[error(
        "frame of {width}x{height} scaled by ({scale_x}, {scale_y}) has zero area"
    )]
    InvalidFrameDimensions {
        width: u32,
        height: u32,
        scale_x: f32,
        scale_y: f32,
    },
    #[error("background model is {expected:?} but frame is {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("resize failed: {0}")]
    Resize(String),
    #[error("pixel buffer does not match image geometry: {0}")]
    Buffer(String),
}

/// Failures reported by a frame source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unable to open video stream {0}")]
    Unavailable(String),
    #[error("frame read failed: {0}")]
    Read(String),
    #[error("frame could not be decoded: {0}")]
    Decode(String),
    #[error("no frame arrived within {0:?}")]
    Timeout(Duration),
}

/// Fatal outcome of one frame, either from the source or the pipeline.
#[derive(Debug, Error)]
pub enum FrameFault {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Motion(#[from] MotionError),
}
