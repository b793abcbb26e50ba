//! Image processing module for motion detection
//!
//! This module provides the pixel-level building blocks used by the motion
//! detector: Gaussian smoothing, binary dilation, thresholding, connected
//! component extraction and frame annotation.

pub mod convolve;
pub mod morphology;
pub mod overlay;
pub mod thresholding;

use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayView2};

// Re-export key functionality for easier access
pub use convolve::{gaussian_blur, gaussian_kernel, sigma_for_kernel_size};
pub use morphology::dilate;
pub use overlay::{annotate_regions, draw_region, draw_text, BOX_COLOR};
pub use thresholding::{
    abs_diff, apply_threshold, components_to_regions, connected_components, Component, Region,
};

/// Errors raised by image processing primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageProcError {
    #[error("Kernel size must be an odd integer >= 1, got {0}")]
    InvalidKernelSize(usize),
    #[error("Shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
}

/// Render a foreground mask as a binary image, 255 marking foreground.
pub(crate) fn mask_to_gray(mask: ArrayView2<bool>) -> GrayImage {
    let (rows, cols) = mask.dim();
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        Luma([if mask[[y as usize, x as usize]] { 255 } else { 0 }])
    })
}

/// Read a binary image back into a mask; any non-zero pixel is foreground.
pub(crate) fn gray_to_mask(image: &GrayImage) -> Array2<bool> {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        image.get_pixel(x as u32, y as u32)[0] > 0
    })
}
