//! Separable Gaussian smoothing for 8-bit intensity planes.
//!
//! The kernel width fixes the smoothing strength: sigma is derived from the
//! kernel size as `0.3 * ((k - 1) * 0.5 - 1) + 0.8`, so the same kernel size
//! always produces the same output. Edges use reflect-101 padding
//! (`dcb|abcd|cba`).

use image::{ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;
use ndarray::{Array1, Array2, ArrayView2};

use super::ImageProcError;

/// Sigma implied by an odd kernel size.
pub fn sigma_for_kernel_size(size: usize) -> f64 {
    0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1D Gaussian kernel of the given odd size.
///
/// # Arguments
/// * `size` - Kernel width in pixels, odd and >= 1
///
/// # Returns
/// Kernel weights summing to 1.0, symmetric around the centre tap
pub fn gaussian_kernel(size: usize) -> Result<Array1<f64>, ImageProcError> {
    if size == 0 || size % 2 == 0 {
        return Err(ImageProcError::InvalidKernelSize(size));
    }

    let sigma = sigma_for_kernel_size(size);
    let half = (size / 2) as f64;
    let mut kernel = Array1::from_shape_fn(size, |i| {
        let d = i as f64 - half;
        (-(d * d) / (2.0 * sigma * sigma)).exp()
    });

    let sum = kernel.sum();
    kernel.mapv_inplace(|w| w / sum);
    Ok(kernel)
}

/// Map an out-of-range index back into `0..len` with reflect-101 padding.
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let len = len as isize;
    let period = 2 * (len - 1);
    let mut i = index.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as usize
}

/// Smooth an 8-bit plane with a square Gaussian kernel.
///
/// The plane is padded with reflect-101 borders, filtered along rows and
/// then columns, cropped back to its original size and rounded to the
/// nearest integer.
pub fn gaussian_blur(
    image: ArrayView2<u8>,
    kernel_size: usize,
) -> Result<Array2<u8>, ImageProcError> {
    let kernel = gaussian_kernel(kernel_size)?;
    let (rows, cols) = image.dim();
    if kernel_size == 1 || rows == 0 || cols == 0 {
        return Ok(image.to_owned());
    }

    let weights: Vec<f32> = kernel.iter().map(|&w| w as f32).collect();
    let half = kernel_size / 2;

    let padded: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_fn(
        (cols + 2 * half) as u32,
        (rows + 2 * half) as u32,
        |x, y| {
            let sy = reflect_101(y as isize - half as isize, rows);
            let sx = reflect_101(x as isize - half as isize, cols);
            Luma([image[[sy, sx]] as f32])
        },
    );

    let filtered = separable_filter_equal(&padded, &weights);

    Ok(Array2::from_shape_fn((rows, cols), |(y, x)| {
        let v = filtered.get_pixel((x + half) as u32, (y + half) as u32)[0];
        v.round().clamp(0.0, 255.0) as u8
    }))
}
