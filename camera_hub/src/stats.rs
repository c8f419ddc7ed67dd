//! Console reporter for motion status, latency, FPS and host load
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use motionwatch_motion_ai::logic::telemetry::FrameReport;
use motionwatch_motion_ai::traits::TelemetrySink;
use std::num::NonZeroU64;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

/// Captures current CPU load and memory usage snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuAndMemoryUsage {
    pub cpu_pct: f32,
    pub used_kib: u64,
    pub total_kib: u64,
}

impl CpuAndMemoryUsage {
    pub fn memory_pct(&self) -> f32 {
        if self.total_kib == 0 {
            return 0.0;
        }
        (self.used_kib as f32 / self.total_kib as f32) * 100.0
    }
}

/// Status line logged for every processed frame when the cooldown is off.
pub fn motion_status(motion: bool) -> &'static str {
    if motion {
        "Motion Detected"
    } else {
        "Motion Not Detected"
    }
}

/// Prints a performance line every `print_interval` source frames.
/// In plain mode (no cooldown) it also logs the motion status of every frame.
pub struct ConsoleReporter {
    sys: System,
    print_interval: NonZeroU64,
    plain: bool,
}

impl ConsoleReporter {
    pub fn new(print_interval: NonZeroU64, plain: bool) -> Self {
        let kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::default().with_ram());
        Self {
            sys: System::new_with_specifics(kind),
            print_interval,
            plain,
        }
    }

    /// Returns current CPU usage percentage and memory usage.
    pub fn read_cpu_and_memory(&mut self) -> CpuAndMemoryUsage {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        CpuAndMemoryUsage {
            cpu_pct: self.sys.global_cpu_usage(),
            used_kib: self.sys.used_memory(),
            total_kib: self.sys.total_memory(),
        }
    }

    fn due(&self, frame_counter: u64) -> bool {
        frame_counter % self.print_interval.get() == 0
    }
}

impl TelemetrySink for ConsoleReporter {
    fn record(&mut self, report: &FrameReport) -> Result<(), anyhow::Error> {
        if self.plain {
            info!("{}", motion_status(report.motion));
        } else if report.motion {
            debug!(
                "Motion in frame {} ({} pixels)",
                report.frame_counter, report.motion_pixels
            );
        }

        if !self.due(report.frame_counter) {
            return Ok(());
        }

        let usage = self.read_cpu_and_memory();
        info!(
            "Motion Detection Latency: {:.6} seconds, FPS: {:.2}, CPU Usage: {:.2}%, Memory Usage: {:.2}%",
            report.latency.as_secs_f64(),
            report.fps,
            usage.cpu_pct,
            usage.memory_pct()
        );
        Ok(())
    }

    fn stream_ended(&mut self, frames_seen: u64, reason: &str) -> Result<(), anyhow::Error> {
        info!("Stream ended after {frames_seen} frames ({reason})");
        Ok(())
    }
}
