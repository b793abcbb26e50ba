//! Binary morphology on foreground masks.

use imageproc::distance_transform::Norm;
use ndarray::{Array2, ArrayView2};

use super::{gray_to_mask, mask_to_gray};

/// Dilate a binary mask with a 3x3 square structuring element.
///
/// Each iteration grows every foreground blob by one pixel in all eight
/// directions, closing small gaps so that fragments of the same moving
/// object merge into one component. Pixels outside the image never count
/// as foreground.
///
/// `n` iterations of the 3x3 square equal a single dilation with a
/// `(2n + 1)` square, i.e. everything within chessboard distance `n`.
///
/// # Arguments
/// * `mask` - Foreground mask, `true` marks a changed pixel
/// * `iterations` - Number of growth passes (0 returns a copy)
pub fn dilate(mask: ArrayView2<bool>, iterations: usize) -> Array2<bool> {
    // The distance transform treats an image with no foreground as infinitely
    // far away, which large radii would turn white.
    if iterations == 0 || !mask.iter().any(|&v| v) {
        return mask.to_owned();
    }

    let radius = u8::try_from(iterations).unwrap_or(u8::MAX);
    let grown = imageproc::morphology::dilate(&mask_to_gray(mask), Norm::LInf, radius);
    gray_to_mask(&grown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_single_pixel_grows_to_square() {
        let mut mask = Array2::from_elem((7, 7), false);
        mask[[3, 3]] = true;

        let once = dilate(mask.view(), 1);
        assert_eq!(once.iter().filter(|&&v| v).count(), 9);
        assert!(once[[2, 2]] && once[[4, 4]]);
        assert!(!once[[1, 3]]);

        let twice = dilate(mask.view(), 2);
        assert_eq!(twice.iter().filter(|&&v| v).count(), 25);
    }

    #[test]
    fn test_zero_iterations_is_copy() {
        let mask = arr2(&[[false, true], [true, false]]);
        assert_eq!(dilate(mask.view(), 0), mask);
    }

    #[test]
    fn test_empty_mask_stays_empty() {
        let mask = Array2::from_elem((4, 5), false);
        assert_eq!(dilate(mask.view(), 300), mask);
    }

    #[test]
    fn test_dilation_clips_at_border() {
        let mut mask = Array2::from_elem((3, 3), false);
        mask[[0, 0]] = true;
        let grown = dilate(mask.view(), 1);
        assert_eq!(
            grown,
            arr2(&[
                [true, true, false],
                [true, true, false],
                [false, false, false],
            ])
        );
    }

    #[test]
    fn test_dilation_merges_nearby_fragments() {
        let mut mask = Array2::from_elem((1, 7), false);
        mask[[0, 1]] = true;
        mask[[0, 3]] = true;
        let grown = dilate(mask.view(), 1);
        assert!((0..=4).all(|x| grown[[0, x]]));
        assert!(!grown[[0, 5]]);
    }

    #[test]
    fn test_non_square_mask_keeps_shape() {
        let mut mask = Array2::from_elem((3, 8), false);
        mask[[1, 6]] = true;
        let grown = dilate(mask.view(), 1);
        assert_eq!(grown.dim(), (3, 8));
        assert!(grown[[0, 7]] && grown[[2, 5]]);
        assert!(!grown[[1, 4]]);
    }
}
