//! Adaptive per-pixel Gaussian-mixture background model
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::MotionError;
use image::GrayImage;
use ndarray::{Array2, Array3, ArrayView2, ArrayViewMut1, Axis, Zip};

pub const BACKGROUND_LABEL: u8 = 0;
pub const SHADOW_LABEL: u8 = 127;
pub const FOREGROUND_LABEL: u8 = 255;

const MAX_MODES: usize = 5;
const BACKGROUND_RATIO: f32 = 0.9; // Share of total weight that counts as background
const VAR_THRESHOLD_GEN: f32 = 9.0; // Squared distance at which a sample updates an existing mode
const VAR_INIT: f32 = 15.0;
const VAR_MIN: f32 = 4.0;
const VAR_MAX: f32 = 75.0;
const COMPLEXITY_REDUCTION: f32 = 0.05; // Prior that prunes modes nobody supports any more
const SHADOW_TAU: f32 = 0.5; // A shadow may darken a pixel to at most half its background intensity

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundParams {
    /// Frames of memory; the learning rate settles at 1 / history.
    pub history: u32,
    /// Squared Mahalanobis distance beyond which a pixel is foreground.
    pub var_threshold: f32,
    pub detect_shadows: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Gaussian {
    weight: f32,
    mean: f32,
    variance: f32,
}

/// Per-pixel mixture of up to five Gaussians over luminance.
///
/// Each call to [`apply`](Self::apply) both classifies and learns from the frame,
/// so frames must arrive exactly once and in stream order. The first frame seeds
/// the model and is reported as all background; the masks of the following
/// `history` or so frames are still settling.
#[derive(Clone)]
pub struct BackgroundSubtractor {
    params: BackgroundParams,
    mixtures: Array3<Gaussian>,
    modes_used: Array2<u8>,
    frames_seen: u64,
    width: u32,
    height: u32,
}

impl BackgroundSubtractor {
    pub fn new(params: BackgroundParams, width: u32, height: u32) -> Self {
        let (h, w) = (height as usize, width as usize);
        BackgroundSubtractor {
            params,
            mixtures: Array3::from_elem((h, w, MAX_MODES), Gaussian::default()),
            modes_used: Array2::zeros((h, w)),
            frames_seen: 0,
            width,
            height,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Learning rate for the frame about to be applied. Starts fast so the model
    /// converges quickly, then settles at 1 / history.
    fn learning_rate(&self) -> f32 {
        let horizon = (2 * self.frames_seen).min(self.params.history as u64).max(1);
        1.0 / horizon as f32
    }

    /// Classify every pixel of `frame` as background (0), shadow (127) or foreground (255),
    /// then fold the frame into the model.
    pub fn apply(&mut self, frame: &GrayImage) -> Result<GrayImage, MotionError> {
        if frame.dimensions() != self.dimensions() {
            return Err(MotionError::DimensionMismatch {
                expected: self.dimensions(),
                actual: frame.dimensions(),
            });
        }

        let shape = (self.height as usize, self.width as usize);
        let pixels = ArrayView2::from_shape(shape, frame.as_raw().as_slice())
            .map_err(|e| MotionError::Buffer(e.to_string()))?;
        let mut mask = Array2::<u8>::zeros(shape);

        self.frames_seen += 1;

        if self.frames_seen == 1 {
            // Seed one mode per pixel from the first frame.
            Zip::from(self.mixtures.lanes_mut(Axis(2)))
                .and(&mut self.modes_used)
                .and(&pixels)
                .par_for_each(|mut modes, used, &px| {
                    modes[0] = Gaussian {
                        weight: 1.0,
                        mean: px as f32,
                        variance: VAR_INIT,
                    };
                    *used = 1;
                });
        } else {
            let alpha = self.learning_rate();
            let params = self.params;
            Zip::from(&mut mask)
                .and(self.mixtures.lanes_mut(Axis(2)))
                .and(&mut self.modes_used)
                .and(&pixels)
                .par_for_each(|label, modes, used, &px| {
                    *label = update_pixel(modes, used, px as f32, alpha, &params);
                });
        }

        let (out_vec, _offset) = mask.into_raw_vec_and_offset();
        GrayImage::from_raw(self.width, self.height, out_vec)
            .ok_or_else(|| MotionError::Buffer("mask does not match frame geometry".into()))
    }
}

/// Classify one pixel against its mixture and update the mixture with the sample.
fn update_pixel(
    mut lane: ArrayViewMut1<Gaussian>,
    used: &mut u8,
    x: f32,
    alpha: f32,
    params: &BackgroundParams,
) -> u8 {
    let mut modes = [Gaussian::default(); MAX_MODES];
    let mut n = *used as usize;
    for (slot, g) in modes.iter_mut().zip(lane.iter()).take(n) {
        *slot = *g;
    }

    let prune = alpha * COMPLEXITY_REDUCTION;
    let mut background = false;
    let mut fits = false;
    let mut cumulative = 0.0f32;

    // Modes are kept sorted by weight, so the heaviest ones are tried first.
    for g in modes.iter_mut().take(n) {
        let mut weight = (1.0 - alpha) * g.weight - prune;

        if !fits {
            let dist2 = (g.mean - x) * (g.mean - x);
            if cumulative < BACKGROUND_RATIO && dist2 < params.var_threshold * g.variance {
                background = true;
            }
            if dist2 < VAR_THRESHOLD_GEN * g.variance {
                fits = true;
                weight += alpha;
                let k = alpha / weight;
                g.mean -= k * (g.mean - x);
                g.variance = (g.variance + k * (dist2 - g.variance)).clamp(VAR_MIN, VAR_MAX);
            }
        }

        g.weight = weight;
        cumulative += weight.max(0.0);
    }

    sort_by_weight(&mut modes[..n]);
    while n > 0 && modes[n - 1].weight < prune {
        n -= 1;
    }

    let total: f32 = modes[..n].iter().map(|g| g.weight).sum();
    if total > 0.0 {
        for g in modes.iter_mut().take(n) {
            g.weight /= total;
        }
    }

    if !fits {
        // Nothing explains the sample: start a new mode, evicting the weakest if full.
        let slot = if n == MAX_MODES { MAX_MODES - 1 } else { n };
        if slot == n {
            n += 1;
        }
        let weight = if n == 1 {
            1.0
        } else {
            for g in modes.iter_mut().take(n - 1) {
                g.weight *= 1.0 - alpha;
            }
            alpha
        };
        modes[slot] = Gaussian {
            weight,
            mean: x,
            variance: VAR_INIT,
        };
        sort_by_weight(&mut modes[..n]);
    }

    for (i, g) in lane.iter_mut().enumerate() {
        *g = if i < n { modes[i] } else { Gaussian::default() };
    }
    *used = n as u8;

    if background {
        BACKGROUND_LABEL
    } else if params.detect_shadows && is_shadow(&modes[..n], x, params) {
        SHADOW_LABEL
    } else {
        FOREGROUND_LABEL
    }
}

/// A shadow is a uniformly darker version of a background mode.
fn is_shadow(modes: &[Gaussian], x: f32, params: &BackgroundParams) -> bool {
    let mut cumulative = 0.0f32;
    for g in modes {
        let denominator = g.mean * g.mean;
        if denominator == 0.0 {
            return false;
        }
        let numerator = x * g.mean;
        if numerator <= denominator && numerator >= SHADOW_TAU * denominator {
            let a = numerator / denominator;
            let dist2a = (a * g.mean - x) * (a * g.mean - x);
            if dist2a < params.var_threshold * g.variance * a * a {
                return true;
            }
        }
        cumulative += g.weight;
        if cumulative > BACKGROUND_RATIO {
            return false;
        }
    }
    false
}

fn sort_by_weight(modes: &mut [Gaussian]) {
    modes.sort_by(|a, b| b.weight.total_cmp(&a.weight));
}
