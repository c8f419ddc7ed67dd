//! Monitor configuration: raw values as loaded from disk and their validated form
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::ConfigError;
use crate::motion::background::BackgroundParams;
use crate::motion::preprocessing::PreprocessParams;
use serde::{Deserialize, Serialize};
use std::num::{NonZeroU32, NonZeroU64};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STREAM_SOURCE: &str = "http://127.0.0.1:8080/video";
pub const DEFAULT_HISTORY: u32 = 300;
pub const DEFAULT_VAR_THRESHOLD: f32 = 100.0;
pub const DEFAULT_PROCESS_INTERVAL: i64 = 3; // Process every nth frame
pub const DEFAULT_MOTION_PIXEL_THRESHOLD: usize = 1000;
pub const DEFAULT_MOTION_CUTOFF: u8 = 244; // Above the shadow label (127), just under full foreground (255)
pub const DEFAULT_SCALE: f32 = 0.5;
pub const DEFAULT_BLUR_KERNEL: u32 = 5;
pub const DEFAULT_COOLDOWN_SECS: f64 = 5.0;
pub const DEFAULT_FPS_DISPLAY_INTERVAL_SECS: f64 = 1.0;
pub const DEFAULT_PRINT_INTERVAL: u64 = 25;
pub const DEFAULT_READ_TIMEOUT_SECS: f64 = 5.0;

/// Everything the monitor can be told, as it appears in `monitor.yaml`.
/// Missing keys fall back to the defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub stream_source: String,
    pub history: u32,
    pub var_threshold: f32,
    pub detect_shadows: bool,
    pub process_interval: i64,
    pub motion_pixel_threshold: usize,
    pub motion_cutoff: u8,
    pub scale_x: f32,
    pub scale_y: f32,
    pub blur_kernel_size: u32,
    /// When false, motion is reported frame by frame with no cooldown.
    pub cooldown_enabled: bool,
    pub cooldown_period: f64,
    pub fps_display_interval: f64,
    pub print_interval: u64,
    pub read_timeout_secs: f64,
    pub display_dir: Option<PathBuf>,
    pub display_every: u32,
    pub telemetry_log: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stream_source: DEFAULT_STREAM_SOURCE.to_string(),
            history: DEFAULT_HISTORY,
            var_threshold: DEFAULT_VAR_THRESHOLD,
            detect_shadows: true,
            process_interval: DEFAULT_PROCESS_INTERVAL,
            motion_pixel_threshold: DEFAULT_MOTION_PIXEL_THRESHOLD,
            motion_cutoff: DEFAULT_MOTION_CUTOFF,
            scale_x: DEFAULT_SCALE,
            scale_y: DEFAULT_SCALE,
            blur_kernel_size: DEFAULT_BLUR_KERNEL,
            cooldown_enabled: true,
            cooldown_period: DEFAULT_COOLDOWN_SECS,
            fps_display_interval: DEFAULT_FPS_DISPLAY_INTERVAL_SECS,
            print_interval: DEFAULT_PRINT_INTERVAL,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            display_dir: None,
            display_every: 1,
            telemetry_log: false,
        }
    }
}

/// Configuration after validation. Only this form reaches component constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSettings {
    pub background: BackgroundParams,
    pub preprocess: PreprocessParams,
    pub process_interval: NonZeroU32,
    pub motion_pixel_threshold: usize,
    pub motion_cutoff: u8,
    /// `None` when the cooldown is disabled.
    pub cooldown_period: Option<Duration>,
    pub fps_display_interval: Duration,
    pub print_interval: NonZeroU64,
    pub read_timeout: Duration,
    pub display_every: NonZeroU32,
}

impl MonitorConfig {
    /// Checks every field and converts to typed settings. Called once, before the stream is opened.
    pub fn validate(&self) -> Result<MotionSettings, ConfigError> {
        if self.stream_source.trim().is_empty() {
            return Err(ConfigError::EmptySource);
        }

        let process_interval = u32::try_from(self.process_interval)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(ConfigError::NonPositiveInterval(self.process_interval))?;

        check_scale("scale_x", self.scale_x)?;
        check_scale("scale_y", self.scale_y)?;

        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(ConfigError::InvalidBlurKernel(self.blur_kernel_size));
        }
        if self.history == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        if !(self.var_threshold > 0.0 && self.var_threshold.is_finite()) {
            return Err(ConfigError::NonPositiveVarThreshold(self.var_threshold));
        }

        let cooldown_period = positive_secs(self.cooldown_period)
            .ok_or(ConfigError::NonPositiveCooldown(self.cooldown_period))?;
        let fps_display_interval = positive_secs(self.fps_display_interval)
            .ok_or(ConfigError::NonPositiveFpsInterval(self.fps_display_interval))?;
        let read_timeout = positive_secs(self.read_timeout_secs)
            .ok_or(ConfigError::NonPositiveReadTimeout(self.read_timeout_secs))?;
        let print_interval =
            NonZeroU64::new(self.print_interval).ok_or(ConfigError::ZeroPrintInterval)?;
        let display_every =
            NonZeroU32::new(self.display_every).ok_or(ConfigError::ZeroDisplayEvery)?;

        Ok(MotionSettings {
            background: BackgroundParams {
                history: self.history,
                var_threshold: self.var_threshold,
                detect_shadows: self.detect_shadows,
            },
            preprocess: PreprocessParams {
                scale_x: self.scale_x,
                scale_y: self.scale_y,
                blur_kernel_size: self.blur_kernel_size,
            },
            process_interval,
            motion_pixel_threshold: self.motion_pixel_threshold,
            motion_cutoff: self.motion_cutoff,
            cooldown_period: self.cooldown_enabled.then_some(cooldown_period),
            fps_display_interval,
            print_interval,
            read_timeout,
            display_every,
        })
    }
}

fn check_scale(axis: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::ScaleOutOfRange { axis, value })
    }
}

fn positive_secs(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

impl Default for MotionSettings {
    fn default() -> Self {
        // The defaults are known-good, so validation cannot fail here.
        match MonitorConfig::default().validate() {
            Ok(settings) => settings,
            Err(e) => unreachable!("default configuration rejected: {e}"),
        }
    }
}
