//! RGB frame representation and conversions.
//!
//! A [`Frame`] is a `(height, width, 3)` array of 8-bit RGB samples. Frames are
//! transient: a source produces one, the engine reads it, and it is dropped.

use image::{Rgb, RgbImage};
use ndarray::{Array2, Array3};

use crate::image_size::ImageSize;

/// Raw camera frame, shape `(height, width, 3)`, RGB channel order.
pub type Frame = Array3<u8>;

/// Number of colour channels every frame must carry.
pub const FRAME_CHANNELS: usize = 3;

/// Shape violations for frames handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Frame must have 3 channels, got {0}")]
    ChannelCount(usize),
    #[error("Frame has a zero dimension ({width}x{height})")]
    Empty { width: usize, height: usize },
}

/// Check that a frame is a non-empty 3-channel image and return its size.
pub fn validate_frame(frame: &Frame) -> Result<ImageSize, FrameError> {
    let (height, width, channels) = frame.dim();
    if channels != FRAME_CHANNELS {
        return Err(FrameError::ChannelCount(channels));
    }
    if width == 0 || height == 0 {
        return Err(FrameError::Empty { width, height });
    }
    Ok(ImageSize::from_width_height(width, height))
}

/// Converts a frame array to an `image::RgbImage`.
///
/// Array indices `[y, x, c]` map to pixel `(x, y)` channel `c`. Array
/// dimensions are (height, width) while image dimensions are (width, height).
/// Samples are copied in logical row-major order, so sliced or reversed
/// views convert correctly. A frame without exactly three channels yields a
/// black image of the same size; run [`validate_frame`] first.
pub fn frame_to_rgb_image(frame: &Frame) -> RgbImage {
    let (height, width, _) = frame.dim();
    let (width, height) = (width as u32, height as u32);
    let samples: Vec<u8> = frame.iter().copied().collect();

    RgbImage::from_raw(width, height, samples).unwrap_or_else(|| RgbImage::new(width, height))
}

/// Converts an `image::RgbImage` back into a frame array.
pub fn rgb_image_to_frame(img: &RgbImage) -> Frame {
    let (width, height) = img.dimensions();
    let shape = (height as usize, width as usize, FRAME_CHANNELS);
    let samples: Vec<u8> = img.pixels().flat_map(|p| p.0).collect();

    Array3::from_shape_vec(shape, samples).unwrap_or_else(|_| Array3::zeros(shape))
}

/// Single-channel luminance of a frame.
///
/// Uses the BT.601 weights `0.299 R + 0.587 G + 0.114 B`, rounded to nearest.
pub fn to_luma(frame: &Frame) -> Array2<u8> {
    let (height, width, _) = frame.dim();
    Array2::from_shape_fn((height, width), |(y, x)| {
        let r = frame[[y, x, 0]] as f32;
        let g = frame[[y, x, 1]] as f32;
        let b = frame[[y, x, 2]] as f32;
        (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8
    })
}
