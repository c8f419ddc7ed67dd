//! Replays a directory of still images as a video stream
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use motionwatch_motion_ai::error::SourceError;
use motionwatch_motion_ai::frame::Frame;
use motionwatch_motion_ai::traits::{FrameSource, SourceProperties};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

const EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// One frame per image file, in file name order. The last file ends the stream.
pub struct ImageDirSource {
    files: VecDeque<PathBuf>,
    properties: SourceProperties,
    next_sequence: u64,
}

impl ImageDirSource {
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        let entries = fs::read_dir(dir)
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", dir.display())))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        files.sort();

        let first = files.first().ok_or_else(|| {
            SourceError::Unavailable(format!("{}: no images found", dir.display()))
        })?;
        let (width, height) = image::image_dimensions(first)
            .map_err(|e| SourceError::Decode(format!("{}: {e}", first.display())))?;

        info!("Replaying {} images from {}", files.len(), dir.display());
        Ok(Self {
            files: files.into(),
            properties: SourceProperties {
                width: Some(width),
                height: Some(height),
                nominal_fps: None,
            },
            next_sequence: 1,
        })
    }

    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

impl FrameSource for ImageDirSource {
    fn properties(&self) -> SourceProperties {
        self.properties
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(path) = self.files.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .map_err(|e| SourceError::Decode(format!("{}: {e}", path.display())))?
            .to_rgb8();

        let frame = Frame::new(self.next_sequence, image);
        self.next_sequence += 1;
        Ok(Some(frame))
    }
}
