//! Motion decision: foreground mask -> binary mask -> motion boolean
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::MotionSettings;
use crate::error::MotionError;
use crate::frame::Frame;
use crate::motion::background::{BackgroundParams, BackgroundSubtractor};
use crate::motion::preprocessing::{PreprocessParams, Preprocessor};
use image::{GrayImage, RgbImage};
use log::debug;
use rayon::prelude::*;
use std::time::Instant;

/// Pixel-wise binary threshold: 255 where `mask > cutoff`, 0 elsewhere.
pub fn threshold(mask: &GrayImage, cutoff: u8) -> GrayImage {
    let mut binary = mask.clone();
    let pixels: &mut [u8] = &mut binary;
    pixels
        .par_iter_mut()
        .for_each(|p| *p = if *p > cutoff { 255 } else { 0 });
    binary
}

pub fn count_motion_pixels(binary: &GrayImage) -> usize {
    binary.as_raw().par_iter().filter(|&&p| p != 0).count()
}

/// True iff strictly more than `pixel_threshold` pixels are set.
pub fn decide(binary: &GrayImage, pixel_threshold: usize) -> bool {
    count_motion_pixels(binary) > pixel_threshold
}

/// Everything one processed frame produced.
pub struct MotionResult {
    pub resized: RgbImage,
    pub foreground: GrayImage,
    pub binary: GrayImage,
    pub motion_pixels: usize,
    pub motion: bool,
}

/// Owns the preprocessor and the background model for one stream.
pub struct MotionDetection {
    preprocessor: Preprocessor,
    background_params: BackgroundParams,
    motion: Option<BackgroundSubtractor>,
    motion_cutoff: u8,
    pixel_threshold: usize,
}

impl MotionDetection {
    pub fn new(settings: &MotionSettings) -> Self {
        Self::with_params(
            settings.preprocess,
            settings.background,
            settings.motion_cutoff,
            settings.motion_pixel_threshold,
        )
    }

    pub fn with_params(
        preprocess: PreprocessParams,
        background: BackgroundParams,
        motion_cutoff: u8,
        pixel_threshold: usize,
    ) -> Self {
        MotionDetection {
            preprocessor: Preprocessor::new(preprocess),
            background_params: background,
            motion: None,
            motion_cutoff,
            pixel_threshold,
        }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Run one frame through preprocessing, background subtraction and the decision.
    pub fn detect(&mut self, frame: &Frame) -> Result<MotionResult, MotionError> {
        let pre = self.preprocessor.process(frame)?;

        // The model takes its geometry from the first preprocessed frame.
        let (w, h) = pre.gray.dimensions();
        let background_params = self.background_params;
        let bgs = self
            .motion
            .get_or_insert_with(|| BackgroundSubtractor::new(background_params, w, h));

        let bg_subtract = Instant::now();
        let foreground = bgs.apply(&pre.gray)?;
        let binary = threshold(&foreground, self.motion_cutoff);
        let motion_pixels = count_motion_pixels(&binary);
        let motion = motion_pixels > self.pixel_threshold;

        debug!(
            "Frame {}: {} motion pixels (threshold {}), background step took {}us",
            frame.sequence,
            motion_pixels,
            self.pixel_threshold,
            bg_subtract.elapsed().as_micros()
        );

        Ok(MotionResult {
            resized: pre.resized,
            foreground,
            binary,
            motion_pixels,
            motion,
        })
    }
}
