//! Display sink that keeps the latest frame and foreground mask on disk
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Context;
use image::{GrayImage, RgbImage};
use motionwatch_motion_ai::traits::FrameSink;
use std::fs;
use std::path::{Path, PathBuf};

pub const VIDEO_STREAM_FILE: &str = "video_stream.png";
pub const FOREGROUND_MASK_FILE: &str = "foreground_mask.png";

/// Overwrites `video_stream.png` and `foreground_mask.png` in its directory
/// on every call. Point an image viewer with auto-reload at them.
pub struct SnapshotDisplay {
    dir: PathBuf,
}

impl SnapshotDisplay {
    pub fn new(dir: &Path) -> Result<Self, anyhow::Error> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create display directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }
}

impl FrameSink for SnapshotDisplay {
    fn show(&mut self, frame: &RgbImage, foreground: &GrayImage) -> Result<(), anyhow::Error> {
        frame
            .save(self.dir.join(VIDEO_STREAM_FILE))
            .context("Failed to write video stream snapshot")?;
        foreground
            .save(self.dir.join(FOREGROUND_MASK_FILE))
            .context("Failed to write foreground mask snapshot")?;
        Ok(())
    }
}
