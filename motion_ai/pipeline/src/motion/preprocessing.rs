//! Frame preprocessing: downscale, grayscale and blur ahead of background subtraction
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::MotionError;
use crate::frame::Frame;
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{imageops, GrayImage, RgbImage};
use log::debug;
use std::time::Instant;

/// Scale factors in (0, 1] and an odd blur kernel size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessParams {
    pub scale_x: f32,
    pub scale_y: f32,
    pub blur_kernel_size: u32,
}

/// Output of one preprocessing pass. `resized` is kept for display only.
pub struct Preprocessed {
    pub resized: RgbImage,
    pub gray: GrayImage,
}

pub struct Preprocessor {
    params: PreprocessParams,
    resizer: Resizer,
}

impl Preprocessor {
    pub fn new(params: PreprocessParams) -> Self {
        Self {
            params,
            resizer: Resizer::new(),
        }
    }

    /// Size of the preprocessed frame for a source of `width` x `height`.
    /// Rounds like a `fx`/`fy` resize does and rejects zero-area results.
    pub fn output_dimensions(&self, width: u32, height: u32) -> Result<(u32, u32), MotionError> {
        let w = (width as f64 * self.params.scale_x as f64).round() as u32;
        let h = (height as f64 * self.params.scale_y as f64).round() as u32;
        if w == 0 || h == 0 {
            return Err(MotionError::InvalidFrameDimensions {
                width,
                height,
                scale_x: self.params.scale_x,
                scale_y: self.params.scale_y,
            });
        }
        Ok((w, h))
    }

    /// Resize, convert to luminance and smooth one frame.
    pub fn process(&mut self, frame: &Frame) -> Result<Preprocessed, MotionError> {
        let (target_w, target_h) = self.output_dimensions(frame.width(), frame.height())?;

        let t0 = Instant::now();
        let resized = if (target_w, target_h) == frame.dimensions() {
            frame.image.clone()
        } else {
            downscale_with_fast_image_resize(&mut self.resizer, &frame.image, target_w, target_h)?
        };
        let gray = imageops::grayscale(&resized);
        let gray = gaussian_blur(&gray, self.params.blur_kernel_size);

        debug!(
            "Preprocessed frame {} to {}x{} in {}us",
            frame.sequence,
            target_w,
            target_h,
            t0.elapsed().as_micros()
        );

        Ok(Preprocessed { resized, gray })
    }
}

/// Bilinear RGB resize. fast_image_resize is considerably faster than `imageops::resize`.
pub fn downscale_with_fast_image_resize(
    resizer: &mut Resizer,
    src: &RgbImage,
    target_width: u32,
    target_height: u32,
) -> Result<RgbImage, MotionError> {
    let src_image = Image::from_vec_u8(src.width(), src.height(), src.to_vec(), PixelType::U8x3)
        .map_err(|e| MotionError::Resize(e.to_string()))?;
    let mut dst_image = Image::new(target_width, target_height, PixelType::U8x3);

    resizer
        .resize(
            &src_image,
            &mut dst_image,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )
        .map_err(|e| MotionError::Resize(e.to_string()))?;

    RgbImage::from_raw(target_width, target_height, dst_image.buffer().to_vec()).ok_or_else(|| {
        MotionError::Buffer(format!(
            "resized buffer does not fill {target_width}x{target_height}"
        ))
    })
}

/// Gaussian blur for a square kernel of `kernel_size`. A kernel of 1 is the identity.
pub fn gaussian_blur(gray: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return gray.clone();
    }
    imageproc::filter::gaussian_blur_f32(gray, sigma_for_kernel(kernel_size))
}

/// Sigma implied by a kernel size when none is given explicitly.
pub(crate) fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}
