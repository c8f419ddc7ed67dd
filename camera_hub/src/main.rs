//! Motionwatch camera hub.
//!
//! Watches a live camera stream, reports motion and debounces it with a cooldown.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

#[macro_use]
extern crate log;

use anyhow::Context;
use docopt::Docopt;
use motionwatch_motion_ai::config::{MonitorConfig, MotionSettings};
use motionwatch_motion_ai::logic::pipeline::Monitor;
use motionwatch_motion_ai::logic::telemetry::TelemetryRun;
use motionwatch_motion_ai::shutdown::Shutdown;
use motionwatch_motion_ai::traits::FrameSource;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::process::exit;

mod display;
use crate::display::SnapshotDisplay;
mod image_dir;
use crate::image_dir::ImageDirSource;
mod mjpeg;
use crate::mjpeg::MjpegSource;
mod signals;
mod stats;
use crate::stats::ConsoleReporter;

const DEFAULT_CONFIG_FILE: &str = "monitor.yaml";

const USAGE: &str = "
Motionwatch camera hub: reads an MJPEG camera stream (or a directory of images) and reports motion.

Usage:
  motionwatch-camera-hub [--config=<path>] [--source=<url>] [--telemetry] [--no-cooldown]
  motionwatch-camera-hub (--version | -v)
  motionwatch-camera-hub (--help | -h)

Options:
    --config=<path>     Monitor configuration file [default: monitor.yaml]
    --source=<url>      Stream URL or image directory, overrides stream_source
    --telemetry         Write a JSON-lines telemetry log under output/runs
    --no-cooldown       Report motion frame by frame without the cooldown
    --version, -v       Show version
    --help, -h          Show help

Type q and press enter, or press Ctrl-C, to stop.
";

#[derive(Debug, Clone, Deserialize)]
struct Args {
    flag_config: String,
    flag_source: Option<String>,
    flag_telemetry: bool,
    flag_no_cooldown: bool,
}

fn main() {
    let version = env!("CARGO_PKG_NAME").to_string() + ", version: " + env!("CARGO_PKG_VERSION");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = Docopt::new(USAGE)
        .map(|d| d.help(true))
        .map(|d| d.version(Some(version)))
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            1
        }
    };
    exit(code);
}

fn run(args: Args) -> anyhow::Result<i32> {
    let mut config = load_config(Path::new(&args.flag_config))?;
    if let Some(source) = args.flag_source {
        config.stream_source = source;
    }
    config.telemetry_log |= args.flag_telemetry;
    if args.flag_no_cooldown {
        config.cooldown_enabled = false;
    }

    let settings = config.validate().context("Invalid configuration")?;

    let shutdown = Shutdown::new();
    signals::install_ctrl_c(shutdown.clone()).context("Failed to install Ctrl-C handler")?;
    signals::install_quit_key(shutdown.clone()).context("Failed to watch stdin")?;

    let source = open_source(&config.stream_source, &settings)?;
    let mut monitor = Monitor::new(source, &settings, shutdown)
        .context("Stream geometry cannot be processed with the configured scale")?
        .with_telemetry(Box::new(ConsoleReporter::new(
            settings.print_interval,
            settings.cooldown_period.is_none(),
        )));

    let telemetry = TelemetryRun::new(config.telemetry_log)?;
    if let Some(dir) = telemetry.dir() {
        info!("Writing telemetry to {}", dir.display());
    }
    monitor = monitor.with_telemetry(Box::new(telemetry));

    if let Some(dir) = &config.display_dir {
        let display = SnapshotDisplay::new(dir)?;
        info!("Writing display snapshots to {}", dir.display());
        monitor = monitor.with_frame_sink(Box::new(display));
    }

    let summary = monitor.run();
    info!(
        "Frames seen: {}, processed: {}, with motion: {}, activations: {}",
        summary.frames_seen, summary.frames_processed, summary.motion_frames, summary.activations
    );
    Ok(summary.end.exit_code())
}

/// Reads the YAML config. The default file may be absent, in which case all defaults apply.
fn load_config(path: &Path) -> anyhow::Result<MonitorConfig> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_FILE) {
        info!(
            "No {} found, using defaults (see example_monitor.yaml)",
            DEFAULT_CONFIG_FILE
        );
        return Ok(MonitorConfig::default());
    }

    let file = File::open(path)
        .with_context(|| format!("Error retrieving {}", path.display()))?;
    serde_yml::from_reader(file).with_context(|| format!("Error parsing {}", path.display()))
}

fn open_source(source: &str, settings: &MotionSettings) -> anyhow::Result<Box<dyn FrameSource>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!("Opening MJPEG stream {}", redact(source));
        let mjpeg = MjpegSource::open(source, settings.read_timeout)
            .context("Error: Could not open video stream")?;
        return Ok(Box::new(mjpeg));
    }

    let dir = Path::new(source);
    if dir.is_dir() {
        return Ok(Box::new(ImageDirSource::open(dir)?));
    }

    anyhow::bail!("Error: Could not open video stream {source} (expected an http(s) URL or a directory)")
}

/// Hides credentials embedded in a stream URL before logging it.
fn redact(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) if !parsed.username().is_empty() => {
            let _ = parsed.set_username("***");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
