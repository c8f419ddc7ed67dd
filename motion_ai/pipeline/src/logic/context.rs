//! Per-stream session state: everything that lives as long as the stream does
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::MotionSettings;
use crate::error::MotionError;
use crate::frame::Frame;
use crate::logic::cooldown::CooldownMachine;
use crate::logic::sampler::FrameSampler;
use crate::logic::telemetry::{FpsCounter, FrameReport};
use crate::motion::detector::{MotionDetection, MotionResult};
use std::time::Instant;

/// Rolling counters for the current session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub motion_frames: u64,
}

/// A processed frame: the report plus the images behind it.
pub struct ProcessedFrame {
    pub report: FrameReport,
    pub result: MotionResult,
}

/// Owns the background model, the cooldown machine, the sampler and the FPS
/// window of exactly one stream. Independent streams need independent sessions.
pub struct MotionSession {
    detection: MotionDetection,
    cooldown: Option<CooldownMachine>,
    sampler: FrameSampler,
    fps: FpsCounter,
    stats: SessionStats,
}

impl MotionSession {
    pub fn new(settings: &MotionSettings) -> Self {
        Self {
            detection: MotionDetection::new(settings),
            cooldown: settings.cooldown_period.map(CooldownMachine::new),
            sampler: FrameSampler::new(settings.process_interval),
            fps: FpsCounter::new(settings.fps_display_interval),
            stats: SessionStats::default(),
        }
    }

    /// Count a frame from the source; true when it should be processed.
    pub fn sample(&mut self) -> bool {
        self.sampler.advance()
    }

    pub fn frame_counter(&self) -> u64 {
        self.sampler.counter()
    }

    pub fn detection(&self) -> &MotionDetection {
        &self.detection
    }

    /// `None` when the cooldown is disabled.
    pub fn cooldown(&self) -> Option<&CooldownMachine> {
        self.cooldown.as_ref()
    }

    /// Inactive -> Active transitions so far, zero without a cooldown.
    pub fn activations(&self) -> u64 {
        self.cooldown.as_ref().map_or(0, CooldownMachine::activations)
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Run the full per-frame chain on a forwarded frame observed at `now`.
    pub fn process(&mut self, frame: &Frame, now: Instant) -> Result<ProcessedFrame, MotionError> {
        let start = Instant::now();
        let result = self.detection.detect(frame)?;
        let update = self
            .cooldown
            .as_mut()
            .map(|machine| machine.update(result.motion, now));
        let latency = start.elapsed();
        let fps = self.fps.tick(now);

        self.stats.frames_processed += 1;
        if result.motion {
            self.stats.motion_frames += 1;
        }

        Ok(ProcessedFrame {
            report: FrameReport {
                frame_counter: self.sampler.counter(),
                sequence: frame.sequence,
                motion: result.motion,
                motion_pixels: result.motion_pixels,
                phase: update.as_ref().map(|u| u.phase),
                cooldown_remaining: update.as_ref().and_then(|u| u.remaining),
                transition: update.and_then(|u| u.transition),
                latency,
                fps,
            },
            result,
        })
    }
}
