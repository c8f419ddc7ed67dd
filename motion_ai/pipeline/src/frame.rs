//! Frames as handed over by a frame source
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use image::RgbImage;
use std::time::Instant;

/// One decoded frame from the stream. Read-only once produced.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Position in the stream, starting at 1 for the first frame read.
    pub sequence: u64,
    pub captured_at: Instant,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(sequence: u64, image: RgbImage) -> Self {
        Self {
            sequence,
            captured_at: Instant::now(),
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
