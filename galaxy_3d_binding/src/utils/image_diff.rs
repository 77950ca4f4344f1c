//! Per-pixel comparison of two 8-bit images
//!
//! Used by tests that compare a rendered frame against a reference capture.

use crate::error::{Error, Result};

/// Input of [`compute_image_difference`]
///
/// Strides are in bytes. Only the first `min(num_channels1, num_channels2)`
/// channels of each pixel are compared.
pub struct ImageDiffAttribs<'a> {
    pub width: u32,
    pub height: u32,

    pub image1: &'a [u8],
    pub stride1: usize,
    pub num_channels1: u32,

    pub image2: &'a [u8],
    pub stride2: usize,
    pub num_channels2: u32,

    /// Pixels whose difference is greater than this are counted separately
    pub threshold: u32,

    /// Optional output image receiving the scaled per-channel difference
    pub diff_image: Option<&'a mut [u8]>,
    pub diff_stride: usize,
    pub diff_channels: u32,
    pub scale: f32,
}

impl<'a> ImageDiffAttribs<'a> {
    /// Tightly packed images with the same channel count, no diff output
    pub fn packed(width: u32, height: u32, num_channels: u32, image1: &'a [u8], image2: &'a [u8]) -> Self {
        let stride = width as usize * num_channels as usize;
        Self {
            width,
            height,
            image1,
            stride1: stride,
            num_channels1: num_channels,
            image2,
            stride2: stride,
            num_channels2: num_channels,
            threshold: 0,
            diff_image: None,
            diff_stride: 0,
            diff_channels: 0,
            scale: 1.0,
        }
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_diff_image(mut self, diff_image: &'a mut [u8], diff_stride: usize, diff_channels: u32, scale: f32) -> Self {
        self.diff_image = Some(diff_image);
        self.diff_stride = diff_stride;
        self.diff_channels = diff_channels;
        self.scale = scale;
        self
    }
}

/// Result of an image comparison
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImageDiffInfo {
    pub num_diff_pixels: u32,
    pub num_diff_above_threshold: u32,
    pub max_diff: u32,
    /// Average difference of the pixels that differ
    pub avg_diff: f32,
    /// Root mean square difference of the pixels that differ
    pub rms_diff: f32,
}

fn invalid(msg: String) -> Error {
    crate::engine_error!("galaxy3d::ImageDiff", "{}", msg);
    Error::InvalidResource(msg)
}

fn check_image(label: &str, data: &[u8], width: u32, height: u32, stride: usize, channels: u32) -> Result<()> {
    if channels == 0 {
        return Err(invalid(format!("{} has no channels", label)));
    }
    let row = width as usize * channels as usize;
    if stride < row {
        return Err(invalid(format!("{} stride {} is smaller than a row of {} bytes", label, stride, row)));
    }
    if height > 0 {
        let required = stride * (height as usize - 1) + row;
        if data.len() < required {
            return Err(invalid(format!(
                "{} holds {} bytes, {}x{} pixels need {}",
                label,
                data.len(),
                width,
                height,
                required
            )));
        }
    }
    Ok(())
}

/// Compare two images pixel by pixel
///
/// The difference of a pixel is the largest absolute difference of its channels.
pub fn compute_image_difference(attribs: ImageDiffAttribs<'_>) -> Result<ImageDiffInfo> {
    let ImageDiffAttribs {
        width,
        height,
        image1,
        stride1,
        num_channels1,
        image2,
        stride2,
        num_channels2,
        threshold,
        mut diff_image,
        diff_stride,
        diff_channels,
        scale,
    } = attribs;

    if width == 0 || height == 0 {
        return Err(invalid(format!("Invalid image size {}x{}", width, height)));
    }
    check_image("Image 1", image1, width, height, stride1, num_channels1)?;
    check_image("Image 2", image2, width, height, stride2, num_channels2)?;
    if let Some(diff) = diff_image.as_deref() {
        check_image("Difference image", diff, width, height, diff_stride, diff_channels)?;
    }

    let channels = num_channels1.min(num_channels2) as usize;
    let mut info = ImageDiffInfo::default();
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;

    for y in 0..height as usize {
        let row1 = &image1[y * stride1..];
        let row2 = &image2[y * stride2..];
        for x in 0..width as usize {
            let p1 = &row1[x * num_channels1 as usize..][..channels];
            let p2 = &row2[x * num_channels2 as usize..][..channels];

            let mut pixel_diff = 0u32;
            for (c, (a, b)) in p1.iter().zip(p2).enumerate() {
                let channel_diff = a.abs_diff(*b) as u32;
                pixel_diff = pixel_diff.max(channel_diff);

                if let Some(diff) = diff_image.as_deref_mut() {
                    if c < diff_channels as usize {
                        let scaled = (channel_diff as f32 * scale).min(255.0);
                        diff[y * diff_stride + x * diff_channels as usize + c] = scaled as u8;
                    }
                }
            }

            if pixel_diff > 0 {
                info.num_diff_pixels += 1;
                sum += pixel_diff as f64;
                sum_sq += (pixel_diff as f64) * (pixel_diff as f64);
            }
            if pixel_diff > threshold {
                info.num_diff_above_threshold += 1;
            }
            info.max_diff = info.max_diff.max(pixel_diff);
        }
    }

    if info.num_diff_pixels > 0 {
        let n = info.num_diff_pixels as f64;
        info.avg_diff = (sum / n) as f32;
        info.rms_diff = (sum_sq / n).sqrt() as f32;
    }
    Ok(info)
}

/// [`compute_image_difference`] on two tightly packed images
pub fn get_image_difference(
    width: u32,
    height: u32,
    num_channels: u32,
    image1: &[u8],
    image2: &[u8],
    threshold: u32,
) -> Result<ImageDiffInfo> {
    compute_image_difference(ImageDiffAttribs::packed(width, height, num_channels, image1, image2).with_threshold(threshold))
}

#[cfg(test)]
#[path = "image_diff_tests.rs"]
mod tests;
