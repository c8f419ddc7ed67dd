//! Frame loop driver: source -> sampler -> motion pipeline -> cooldown -> sinks
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::MotionSettings;
use crate::error::{FrameFault, MotionError};
use crate::logic::context::{MotionSession, ProcessedFrame};
use crate::logic::telemetry::FrameReport;
use crate::shutdown::Shutdown;
use crate::traits::{FrameSink, FrameSource, TelemetrySink};
use log::{debug, error, info, warn};
use std::num::NonZeroU32;

/// What happened to one frame pulled from the source.
#[derive(Debug)]
pub enum FrameOutcome {
    /// The frame went through the pipeline.
    Forward(FrameReport),
    /// The sampler dropped the frame.
    Skip,
    EndOfStream,
    Fatal(FrameFault),
}

/// Why the frame loop stopped.
#[derive(Debug)]
pub enum RunEnd {
    EndOfStream,
    ShutdownRequested,
    Failed(FrameFault),
}

impl RunEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunEnd::EndOfStream => "end_of_stream",
            RunEnd::ShutdownRequested => "shutdown",
            RunEnd::Failed(_) => "failed",
        }
    }

    /// Zero for a clean stop, one when the stream failed.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunEnd::Failed(_) => 1,
            _ => 0,
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub frames_seen: u64,
    pub frames_processed: u64,
    pub motion_frames: u64,
    pub activations: u64,
    pub end: RunEnd,
}

/// Drives one stream. Owns the source, the session state and the sinks.
pub struct Monitor<S: FrameSource> {
    source: S,
    session: MotionSession,
    shutdown: Shutdown,
    frame_sinks: Vec<Box<dyn FrameSink>>,
    telemetry_sinks: Vec<Box<dyn TelemetrySink>>,
    display_every: NonZeroU32,
}

impl<S: FrameSource> Monitor<S> {
    /// Rejects geometry that would preprocess to zero area when the source
    /// already knows its frame size. Otherwise the first frame decides.
    pub fn new(source: S, settings: &MotionSettings, shutdown: Shutdown) -> Result<Self, MotionError> {
        let props = source.properties();
        info!(
            "Video stream properties - FPS: {}, width: {}, height: {}",
            props.nominal_fps.map_or("unknown".to_string(), |f| f.to_string()),
            props.width.map_or("unknown".to_string(), |w| w.to_string()),
            props.height.map_or("unknown".to_string(), |h| h.to_string()),
        );

        let session = MotionSession::new(settings);
        if let (Some(w), Some(h)) = (props.width, props.height) {
            let (tw, th) = session.detection().preprocessor().output_dimensions(w, h)?;
            debug!("Frames of {w}x{h} will be processed at {tw}x{th}");
        }

        Ok(Self {
            source,
            session,
            shutdown,
            frame_sinks: Vec::new(),
            telemetry_sinks: Vec::new(),
            display_every: settings.display_every,
        })
    }

    pub fn with_frame_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.frame_sinks.push(sink);
        self
    }

    pub fn with_telemetry(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.telemetry_sinks.push(sink);
        self
    }

    pub fn session(&self) -> &MotionSession {
        &self.session
    }

    /// Pull one frame from the source and run it through the pipeline if the
    /// sampler forwards it. Sinks are fed from here; their errors are logged only.
    pub fn step(&mut self) -> FrameOutcome {
        let frame = match self.source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return FrameOutcome::EndOfStream,
            Err(e) => return FrameOutcome::Fatal(e.into()),
        };

        if !self.session.sample() {
            return FrameOutcome::Skip;
        }

        match self.session.process(&frame, frame.captured_at) {
            Ok(processed) => {
                self.publish(&processed);
                FrameOutcome::Forward(processed.report)
            }
            Err(e) => FrameOutcome::Fatal(e.into()),
        }
    }

    fn publish(&mut self, processed: &ProcessedFrame) {
        for sink in self.telemetry_sinks.iter_mut() {
            if let Err(e) = sink.record(&processed.report) {
                warn!("Telemetry sink failed: {e:#}");
            }
        }

        let processed_count = self.session.stats().frames_processed;
        if processed_count % u64::from(self.display_every.get()) != 0 {
            return;
        }
        for sink in self.frame_sinks.iter_mut() {
            if let Err(e) = sink.show(&processed.result.resized, &processed.result.foreground) {
                warn!("Display sink failed: {e:#}");
            }
        }
    }

    /// Run until the stream ends, a frame fails or shutdown is requested.
    /// Shutdown is only observed between frames.
    pub fn run(mut self) -> RunSummary {
        let end = loop {
            if self.shutdown.is_requested() {
                info!("Shutdown requested, stopping the frame loop");
                break RunEnd::ShutdownRequested;
            }

            match self.step() {
                FrameOutcome::Forward(_) | FrameOutcome::Skip => {}
                FrameOutcome::EndOfStream => {
                    info!("Failed to read frame from stream. Exiting...");
                    break RunEnd::EndOfStream;
                }
                FrameOutcome::Fatal(fault) => {
                    error!("Stopping on fatal frame error: {fault}");
                    break RunEnd::Failed(fault);
                }
            }
        };

        let frames_seen = self.session.frame_counter();
        for sink in self.telemetry_sinks.iter_mut() {
            if let Err(e) = sink.stream_ended(frames_seen, end.as_str()) {
                warn!("Telemetry sink failed at stream end: {e:#}");
            }
        }

        let stats = self.session.stats();
        RunSummary {
            frames_seen,
            frames_processed: stats.frames_processed,
            motion_frames: stats.motion_frames,
            activations: self.session.activations(),
            end,
        }
    }
}
