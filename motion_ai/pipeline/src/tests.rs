//! End-to-end tests for the motion pipeline and the frame loop driver
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::{MonitorConfig, MotionSettings};
use crate::error::{FrameFault, MotionError, SourceError};
use crate::frame::Frame;
use crate::logic::context::MotionSession;
use crate::logic::cooldown_states::CooldownPhase;
use crate::logic::pipeline::{FrameOutcome, Monitor, RunEnd};
use crate::logic::telemetry::FrameReport;
use crate::motion::background::{BackgroundParams, BackgroundSubtractor};
use crate::shutdown::Shutdown;
use crate::traits::{FrameSink, FrameSource, SourceProperties, TelemetrySink};
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

type Script = Box<dyn FnMut(u64) -> Option<Result<RgbImage, SourceError>>>;

/// Source driven by a closure over the 1-based frame number.
struct ScriptedSource {
    script: Script,
    props: SourceProperties,
    next: u64,
    start: Instant,
}

impl ScriptedSource {
    fn new(script: impl FnMut(u64) -> Option<Result<RgbImage, SourceError>> + 'static) -> Self {
        Self {
            script: Box::new(script),
            props: SourceProperties::default(),
            next: 1,
            start: Instant::now(),
        }
    }

    fn frames(count: u64, w: u32, h: u32) -> Self {
        Self::new(move |n| (n <= count).then(|| Ok(blank(w, h))))
    }

    fn with_properties(mut self, props: SourceProperties) -> Self {
        self.props = props;
        self
    }
}

impl FrameSource for ScriptedSource {
    fn properties(&self) -> SourceProperties {
        self.props
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let seq = self.next;
        match (self.script)(seq) {
            None => Ok(None),
            Some(Err(e)) => Err(e),
            Some(Ok(image)) => {
                self.next += 1;
                // One frame every 100ms of stream time.
                let mut frame = Frame::new(seq, image);
                frame.captured_at = self.start + Duration::from_millis(100 * seq);
                Ok(Some(frame))
            }
        }
    }
}

fn blank(w: u32, h: u32) -> RgbImage {
    RgbImage::new(w, h)
}

fn with_square(w: u32, h: u32, side: u32) -> RgbImage {
    let (x0, y0) = ((w - side) / 2, (h - side) / 2);
    RgbImage::from_fn(w, h, |x, y| {
        if (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y) {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
}

fn settings(config: MonitorConfig) -> MotionSettings {
    config.validate().unwrap()
}

fn every_frame() -> MotionSettings {
    settings(MonitorConfig {
        process_interval: 1,
        ..Default::default()
    })
}

struct CountingFrameSink(Arc<AtomicUsize>);

impl FrameSink for CountingFrameSink {
    fn show(&mut self, _frame: &RgbImage, _foreground: &GrayImage) -> Result<(), anyhow::Error> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingFrameSink;

impl FrameSink for FailingFrameSink {
    fn show(&mut self, _frame: &RgbImage, _foreground: &GrayImage) -> Result<(), anyhow::Error> {
        anyhow::bail!("display went away")
    }
}

struct FailingTelemetry;

impl TelemetrySink for FailingTelemetry {
    fn record(&mut self, _report: &FrameReport) -> Result<(), anyhow::Error> {
        anyhow::bail!("disk full")
    }

    fn stream_ended(&mut self, _frames_seen: u64, _reason: &str) -> Result<(), anyhow::Error> {
        anyhow::bail!("disk full")
    }
}

/// Requests shutdown once it has seen `after` reports.
struct StopAfter {
    after: usize,
    seen: usize,
    shutdown: Shutdown,
}

impl TelemetrySink for StopAfter {
    fn record(&mut self, _report: &FrameReport) -> Result<(), anyhow::Error> {
        self.seen += 1;
        if self.seen == self.after {
            self.shutdown.request();
        }
        Ok(())
    }
}

#[test]
fn square_after_quiet_scene_is_motion() {
    let source = ScriptedSource::new(|n| match n {
        1..=310 => Some(Ok(blank(200, 200))),
        311 => Some(Ok(with_square(200, 200, 80))),
        _ => None,
    });
    let mut monitor = Monitor::new(source, &every_frame(), Shutdown::new()).unwrap();

    let mut reports = Vec::new();
    loop {
        match monitor.step() {
            FrameOutcome::Forward(report) => reports.push(report),
            FrameOutcome::EndOfStream => break,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(reports.len(), 311);
    assert!(reports[..310].iter().all(|r| !r.motion));
    let last = &reports[310];
    assert!(last.motion);
    assert!(last.motion_pixels > 1000);
    assert_eq!(last.phase, Some(CooldownPhase::Active));
    assert_eq!(last.cooldown_remaining, Some(Duration::from_secs(5)));
    assert_eq!(monitor.session().activations(), 1);
}

#[test]
fn identical_input_gives_identical_masks() {
    let params = BackgroundParams {
        history: 50,
        var_threshold: 100.0,
        detect_shadows: true,
    };
    let frame = |i: u32| GrayImage::from_fn(24, 16, |x, y| Luma([((x * 7 + y * 13 + i * 31) % 256) as u8]));

    let mut a = BackgroundSubtractor::new(params, 24, 16);
    let mut b = BackgroundSubtractor::new(params, 24, 16);
    for i in 0..40 {
        let f = frame(i % 5);
        assert_eq!(a.apply(&f).unwrap(), b.apply(&f).unwrap());
    }
}

#[test]
fn frame_order_matters() {
    let params = BackgroundParams {
        history: 300,
        var_threshold: 100.0,
        detect_shadows: true,
    };
    let a = GrayImage::from_pixel(12, 12, Luma([30]));
    let mut b = a.clone();
    for y in 4..8 {
        for x in 4..8 {
            b.put_pixel(x, y, Luma([240]));
        }
    }

    let mut forward = BackgroundSubtractor::new(params, 12, 12);
    forward.apply(&a).unwrap();
    let b_after_a = forward.apply(&b).unwrap();

    let mut backward = BackgroundSubtractor::new(params, 12, 12);
    let b_first = backward.apply(&b).unwrap();
    backward.apply(&a).unwrap();

    assert_ne!(b_after_a, b_first);
}

#[test]
fn sampler_forwards_every_third_frame() {
    let source = ScriptedSource::frames(7, 40, 40);
    let config = settings(MonitorConfig {
        process_interval: 3,
        ..Default::default()
    });
    let mut monitor = Monitor::new(source, &config, Shutdown::new()).unwrap();

    let pattern: Vec<&str> = (0..8)
        .map(|_| match monitor.step() {
            FrameOutcome::Forward(_) => "forward",
            FrameOutcome::Skip => "skip",
            FrameOutcome::EndOfStream => "end",
            FrameOutcome::Fatal(_) => "fatal",
        })
        .collect();
    assert_eq!(
        pattern,
        ["skip", "skip", "forward", "skip", "skip", "forward", "skip", "end"]
    );
}

#[test]
fn run_reports_end_of_stream() {
    let monitor = Monitor::new(ScriptedSource::frames(10, 40, 40), &every_frame(), Shutdown::new()).unwrap();
    let summary = monitor.run();
    assert!(matches!(summary.end, RunEnd::EndOfStream));
    assert_eq!(summary.end.exit_code(), 0);
    assert_eq!(summary.frames_seen, 10);
    assert_eq!(summary.frames_processed, 10);
    assert_eq!(summary.motion_frames, 0);
    assert_eq!(summary.activations, 0);
}

#[test]
fn shutdown_is_honoured_between_frames() {
    let shutdown = Shutdown::new();
    shutdown.request();
    let monitor = Monitor::new(ScriptedSource::frames(10, 40, 40), &every_frame(), shutdown).unwrap();
    let summary = monitor.run();
    assert!(matches!(summary.end, RunEnd::ShutdownRequested));
    assert_eq!(summary.frames_seen, 0);

    let shutdown = Shutdown::new();
    let monitor = Monitor::new(ScriptedSource::frames(10, 40, 40), &every_frame(), shutdown.clone())
        .unwrap()
        .with_telemetry(Box::new(StopAfter {
            after: 4,
            seen: 0,
            shutdown,
        }));
    let summary = monitor.run();
    assert!(matches!(summary.end, RunEnd::ShutdownRequested));
    assert_eq!(summary.frames_processed, 4);
    assert_eq!(summary.end.exit_code(), 0);
}

#[test]
fn read_failure_ends_the_run() {
    let source = ScriptedSource::new(|n| match n {
        1..=3 => Some(Ok(blank(40, 40))),
        _ => Some(Err(SourceError::Read("connection reset".into()))),
    });
    let summary = Monitor::new(source, &every_frame(), Shutdown::new()).unwrap().run();
    assert!(matches!(
        summary.end,
        RunEnd::Failed(FrameFault::Source(SourceError::Read(_)))
    ));
    assert_eq!(summary.end.exit_code(), 1);
    assert_eq!(summary.frames_processed, 3);
}

#[test]
fn sink_errors_do_not_stop_the_pipeline() {
    let summary = Monitor::new(ScriptedSource::frames(6, 40, 40), &every_frame(), Shutdown::new())
        .unwrap()
        .with_frame_sink(Box::new(FailingFrameSink))
        .with_telemetry(Box::new(FailingTelemetry))
        .run();
    assert!(matches!(summary.end, RunEnd::EndOfStream));
    assert_eq!(summary.frames_processed, 6);
}

#[test]
fn display_sink_respects_display_every() {
    let shown = Arc::new(AtomicUsize::new(0));
    let config = settings(MonitorConfig {
        process_interval: 1,
        display_every: 2,
        ..Default::default()
    });
    Monitor::new(ScriptedSource::frames(5, 40, 40), &config, Shutdown::new())
        .unwrap()
        .with_frame_sink(Box::new(CountingFrameSink(shown.clone())))
        .run();
    assert_eq!(shown.load(Ordering::SeqCst), 2);
}

#[test]
fn degenerate_geometry_is_rejected_up_front() {
    let config = settings(MonitorConfig {
        scale_x: 0.1,
        scale_y: 0.1,
        ..Default::default()
    });
    let source = ScriptedSource::frames(3, 4, 100).with_properties(SourceProperties {
        width: Some(4),
        height: Some(100),
        nominal_fps: Some(15.0),
    });
    let err = Monitor::new(source, &config, Shutdown::new()).err();
    assert!(matches!(
        err,
        Some(MotionError::InvalidFrameDimensions { width: 4, height: 100, .. })
    ));

    // Unknown size: the first frame fails instead.
    let summary = Monitor::new(ScriptedSource::frames(3, 4, 100), &config, Shutdown::new())
        .unwrap()
        .run();
    assert!(matches!(
        summary.end,
        RunEnd::Failed(FrameFault::Motion(MotionError::InvalidFrameDimensions { .. }))
    ));
}

#[test]
fn frame_size_change_is_fatal() {
    let source = ScriptedSource::new(|n| match n {
        1..=2 => Some(Ok(blank(40, 40))),
        3 => Some(Ok(blank(60, 40))),
        _ => None,
    });
    let summary = Monitor::new(source, &every_frame(), Shutdown::new()).unwrap().run();
    assert!(matches!(
        summary.end,
        RunEnd::Failed(FrameFault::Motion(MotionError::DimensionMismatch {
            expected: (20, 20),
            actual: (30, 20)
        }))
    ));
}

#[test]
fn independent_sessions_do_not_share_state() {
    let settings = every_frame();
    let mut busy = MotionSession::new(&settings);
    let mut quiet = MotionSession::new(&settings);
    let t0 = Instant::now();

    for seq in 1..=20 {
        let image = if seq % 2 == 0 { with_square(100, 100, 90) } else { blank(100, 100) };
        busy.sample();
        busy.process(&Frame::new(seq, image), t0).unwrap();
        quiet.sample();
        quiet.process(&Frame::new(seq, blank(100, 100)), t0).unwrap();
    }

    assert!(busy.stats().motion_frames > 0);
    assert_eq!(quiet.stats().motion_frames, 0);
    assert_eq!(
        quiet.cooldown().map(|c| c.phase()),
        Some(CooldownPhase::Inactive)
    );
}

#[test]
fn disabled_cooldown_reports_plain_motion() {
    // Quiet and busy frames alternate, so motion comes and goes.
    let source = ScriptedSource::new(|n| match n {
        1..=5 => Some(Ok(blank(100, 100))),
        6..=20 if n % 2 == 0 => Some(Ok(with_square(100, 100, 90))),
        6..=20 => Some(Ok(blank(100, 100))),
        _ => None,
    });
    let config = settings(MonitorConfig {
        process_interval: 1,
        cooldown_enabled: false,
        ..Default::default()
    });
    let mut monitor = Monitor::new(source, &config, Shutdown::new()).unwrap();
    assert!(monitor.session().cooldown().is_none());

    let mut reports = Vec::new();
    while let FrameOutcome::Forward(report) = monitor.step() {
        reports.push(report);
    }

    assert_eq!(reports.len(), 20);
    assert!(reports.iter().any(|r| r.motion));
    for report in &reports {
        assert_eq!(report.phase, None);
        assert_eq!(report.cooldown_remaining, None);
        assert!(report.transition.is_none());
    }
    assert_eq!(monitor.session().activations(), 0);
}
