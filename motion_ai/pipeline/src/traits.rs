//! Seams between the motion pipeline and the outside world
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::SourceError;
use crate::frame::Frame;
use crate::logic::telemetry::FrameReport;
use image::{GrayImage, RgbImage};

/// Stream properties known once a source is open. Any of them may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceProperties {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub nominal_fps: Option<f32>,
}

/// Yields frames in stream order. `Ok(None)` marks the end of the stream.
pub trait FrameSource {
    fn properties(&self) -> SourceProperties;
    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn properties(&self) -> SourceProperties {
        (**self).properties()
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).read_frame()
    }
}

/// Somewhere to show the resized colour frame and the foreground mask.
pub trait FrameSink {
    fn show(&mut self, frame: &RgbImage, foreground: &GrayImage) -> Result<(), anyhow::Error>;
}

/// Receives one report per processed frame plus lifecycle notifications.
pub trait TelemetrySink {
    fn record(&mut self, report: &FrameReport) -> Result<(), anyhow::Error>;

    fn stream_ended(&mut self, _frames_seen: u64, _reason: &str) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
