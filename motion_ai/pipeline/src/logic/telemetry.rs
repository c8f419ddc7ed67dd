//! Per-frame reports, FPS estimation and the JSON-lines telemetry log
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::logic::cooldown_states::CooldownPhase;
use crate::logic::fsm::Transition;
use crate::traits::TelemetrySink;
use serde::Serialize;
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

/// What the pipeline produced for one processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Frames read from the source so far, processed or not.
    pub frame_counter: u64,
    pub sequence: u64,
    pub motion: bool,
    pub motion_pixels: usize,
    /// `None` when the cooldown is disabled.
    pub phase: Option<CooldownPhase>,
    pub cooldown_remaining: Option<Duration>,
    pub transition: Option<Transition<CooldownPhase>>,
    /// Time spent in preprocessing, background subtraction, decision and cooldown.
    pub latency: Duration,
    pub fps: f64,
}

/// Windowed frames-per-second estimate over processed frames.
/// The first window opens at the first tick.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    interval: Duration,
    window_start: Option<Instant>,
    frames: u64,
}

impl FpsCounter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            window_start: None,
            frames: 0,
        }
    }

    /// Count a frame finished at `now` and return the current estimate.
    /// The window restarts once it is longer than the configured interval.
    pub fn tick(&mut self, now: Instant) -> f64 {
        self.frames += 1;
        let start = *self.window_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(start).as_secs_f64();

        let fps = if elapsed > 0.0 {
            self.frames as f64 / elapsed
        } else {
            0.0
        };
        if elapsed > self.interval.as_secs_f64() {
            self.frames = 0;
            self.window_start = Some(now);
        }
        fps
    }
}

/// Represents a structured telemetry message logged during a monitoring session.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryPacket<'a> {
    // Outcome of one processed frame
    FrameProcessed {
        ts: u128,
        run_id: &'a str,
        frame: u64,
        motion: bool,
        motion_pixels: usize,
        phase: Option<&'static str>,
        cooldown_remaining_ms: Option<u128>,
        latency_us: u128,
        fps: f64,
    },
    // Cooldown FSM state change
    CooldownTransition {
        ts: u128,
        run_id: &'a str,
        frame: u64,
        from: &'static str,
        to: &'static str,
        reason: &'a str,
    },
    // The frame loop stopped
    StreamEnded {
        ts: u128,
        run_id: &'a str,
        frames_seen: u64,
        reason: &'a str,
    },
}

/// Represents a telemetry logging session for a single monitoring run.
/// Manages writing structured logs to a file in the run directory.
pub struct TelemetryRun {
    pub run_id: String,
    pub log: Option<File>,
    dir: Option<PathBuf>,
}

impl TelemetryRun {
    /// Initializes a new telemetry run under `output/runs/<timestamp>`.
    /// `activated` says whether we actually write logs or not.
    pub fn new(activated: bool) -> Result<Self, anyhow::Error> {
        Self::in_dir(activated, Path::new("output"))
    }

    pub fn in_dir(activated: bool, output: &Path) -> Result<Self, anyhow::Error> {
        let run_id = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();

        if !activated {
            return Ok(Self {
                run_id,
                log: None,
                dir: None,
            });
        }

        let base = output.join("runs").join(&run_id);
        std::fs::create_dir_all(&base)?;
        let log = OpenOptions::new()
            .append(true)
            .create(true)
            .open(base.join("telemetry.log"))?;

        Ok(Self {
            run_id,
            log: Some(log),
            dir: Some(base),
        })
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Serializes and writes a telemetry packet as a line to the log file.
    pub fn write(&mut self, pkt: &TelemetryPacket) -> Result<(), anyhow::Error> {
        if let Some(log) = &mut self.log {
            let line = serde_json::to_string(pkt)?;
            writeln!(log, "{line}")?;
        }
        Ok(())
    }
}

impl TelemetrySink for TelemetryRun {
    fn record(&mut self, report: &FrameReport) -> Result<(), anyhow::Error> {
        let ts = epoch_millis()?;
        if let Some(transition) = &report.transition {
            let run_id = self.run_id.clone();
            self.write(&TelemetryPacket::CooldownTransition {
                ts,
                run_id: &run_id,
                frame: report.frame_counter,
                from: transition.from.as_str(),
                to: transition.to.as_str(),
                reason: &transition.reason,
            })?;
        }

        let run_id = self.run_id.clone();
        self.write(&TelemetryPacket::FrameProcessed {
            ts,
            run_id: &run_id,
            frame: report.frame_counter,
            motion: report.motion,
            motion_pixels: report.motion_pixels,
            phase: report.phase.map(|p| p.as_str()),
            cooldown_remaining_ms: report.cooldown_remaining.map(|d| d.as_millis()),
            latency_us: report.latency.as_micros(),
            fps: report.fps,
        })
    }

    fn stream_ended(&mut self, frames_seen: u64, reason: &str) -> Result<(), anyhow::Error> {
        let run_id = self.run_id.clone();
        self.write(&TelemetryPacket::StreamEnded {
            ts: epoch_millis()?,
            run_id: &run_id,
            frames_seen,
            reason,
        })
    }
}

fn epoch_millis() -> Result<u128, anyhow::Error> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_window_resets_after_interval() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::new(Duration::from_secs(1));

        assert_eq!(fps.tick(t0), 0.0);
        assert!((fps.tick(t0 + Duration::from_millis(500)) - 4.0).abs() < 1e-9);
        // Third frame lands past the interval: 3 frames over 1.5s, then a fresh window.
        assert!((fps.tick(t0 + Duration::from_millis(1500)) - 2.0).abs() < 1e-9);
        assert!((fps.tick(t0 + Duration::from_millis(2000)) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn first_window_opens_at_the_first_frame() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::new(Duration::from_secs(1));

        // A long gap before the first frame must not dilute the estimate.
        let first = t0 + Duration::from_secs(10);
        assert_eq!(fps.tick(first), 0.0);
        assert!((fps.tick(first + Duration::from_millis(500)) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn packets_are_tagged_json() {
        let line = serde_json::to_string(&TelemetryPacket::StreamEnded {
            ts: 1,
            run_id: "run",
            frames_seen: 12,
            reason: "end_of_stream",
        })
        .unwrap();
        assert_eq!(
            line,
            r#"{"kind":"stream_ended","ts":1,"run_id":"run","frames_seen":12,"reason":"end_of_stream"}"#
        );
    }

    #[test]
    fn inactive_run_writes_nothing() {
        let mut run = TelemetryRun::new(false).unwrap();
        assert!(run.log.is_none());
        assert!(run.dir().is_none());
        run.stream_ended(3, "shutdown").unwrap();
    }

    #[test]
    fn active_run_appends_lines() {
        let base = std::env::temp_dir().join(format!("motionwatch-telemetry-{}", std::process::id()));
        let mut run = TelemetryRun::in_dir(true, &base).unwrap();
        let report = FrameReport {
            frame_counter: 3,
            sequence: 3,
            motion: true,
            motion_pixels: 1500,
            phase: Some(CooldownPhase::Active),
            cooldown_remaining: Some(Duration::from_secs(5)),
            transition: Some(Transition {
                from: CooldownPhase::Inactive,
                to: CooldownPhase::Active,
                reason: "Motion".into(),
            }),
            latency: Duration::from_micros(800),
            fps: 9.5,
        };
        run.record(&report).unwrap();

        let path = run.dir().unwrap().join("telemetry.log");
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""kind":"cooldown_transition""#));
        assert!(lines[1].contains(r#""motion_pixels":1500"#));
        std::fs::remove_dir_all(&base).ok();
    }
}
