//! Frame differencing, thresholding and connected component extraction
//!
//! Turns a pair of intensity planes into a foreground mask and the mask into
//! axis-aligned regions. A region's area is the area enclosed by its outer
//! outline, so holes inside a blob count towards it.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{self, Connectivity};
use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use super::{mask_to_gray, ImageProcError};

/// Axis-aligned region in frame pixel coordinates
///
/// Serializes as `{"x": .., "y": .., "width": .., "height": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Left column
    pub x: usize,

    /// Top row
    pub y: usize,

    /// Width in pixels
    pub width: usize,

    /// Height in pixels
    pub height: usize,
}

impl Region {
    /// Create a new region
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One connected foreground blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// Enclosing bounding box
    pub region: Region,
    /// Pixels enclosed by the blob's outer outline, holes included
    pub area: usize,
}

/// Per-pixel absolute difference of two planes of equal shape
pub fn abs_diff(a: ArrayView2<u8>, b: ArrayView2<u8>) -> Result<Array2<u8>, ImageProcError> {
    if a.dim() != b.dim() {
        return Err(ImageProcError::ShapeMismatch {
            left: a.dim(),
            right: b.dim(),
        });
    }

    Ok(Zip::from(&a).and(&b).map_collect(|&p, &q| p.abs_diff(q)))
}

/// Apply thresholding to an image and return a binary mask
///
/// # Arguments
///
/// * `image` - Input intensity plane
/// * `threshold` - Threshold value
///
/// # Returns
///
/// A binary mask where true indicates a pixel strictly above threshold
pub fn apply_threshold(image: ArrayView2<u8>, threshold: u8) -> Array2<bool> {
    image.mapv(|v| v > threshold)
}

/// Find connected components in a binary mask
///
/// Foreground pixels touching horizontally, vertically or diagonally share a
/// label.
///
/// # Arguments
///
/// * `mask` - Binary mask
///
/// # Returns
///
/// A labeled image where each connected component has a unique label
/// (`1..=n`, background 0), and the number of labels assigned
pub fn connected_components(mask: ArrayView2<bool>) -> (Array2<u32>, u32) {
    let labelled = region_labelling::connected_components(
        &mask_to_gray(mask),
        Connectivity::Eight,
        Luma([0u8]),
    );

    let labels = Array2::from_shape_fn(mask.dim(), |(y, x)| {
        labelled.get_pixel(x as u32, y as u32)[0]
    });
    let num_labels = labels.iter().copied().max().unwrap_or(0);

    (labels, num_labels)
}

/// Convert connected components to regions with their enclosed areas
///
/// Components are returned in label order, which is the raster order of
/// each component's first pixel.
///
/// # Arguments
///
/// * `labels` - Labeled image from connected_components
/// * `num_labels` - Number of unique labels
pub fn components_to_regions(labels: ArrayView2<u32>, num_labels: u32) -> Vec<Component> {
    struct Extent {
        x_min: usize,
        y_min: usize,
        x_max: usize,
        y_max: usize,
    }

    let mut extents: Vec<Option<Extent>> = (0..num_labels).map(|_| None).collect();

    for ((y, x), &label) in labels.indexed_iter() {
        if label == 0 || label > num_labels {
            continue;
        }
        let e = extents[(label - 1) as usize].get_or_insert_with(|| Extent {
            x_min: x,
            y_min: y,
            x_max: x,
            y_max: y,
        });
        e.x_min = e.x_min.min(x);
        e.y_min = e.y_min.min(y);
        e.x_max = e.x_max.max(x);
        e.y_max = e.y_max.max(y);
    }

    extents
        .into_iter()
        .enumerate()
        .filter_map(|(index, extent)| extent.map(|e| (index as u32 + 1, e)))
        .map(|(label, e)| {
            let region =
                Region::new(e.x_min, e.y_min, e.x_max - e.x_min + 1, e.y_max - e.y_min + 1);
            Component {
                region,
                area: filled_area(labels, label, &region),
            }
        })
        .collect()
}

/// Area enclosed by the outer outline of one labelled component.
///
/// The component's bounding box is copied into an image with a one pixel
/// background border. Background reachable from that border lies outside
/// the outline; everything else is inside it.
fn filled_area(labels: ArrayView2<u32>, label: u32, region: &Region) -> usize {
    let width = region.width + 2;
    let height = region.height + 2;

    let patch = GrayImage::from_fn(width as u32, height as u32, |px, py| {
        let (px, py) = (px as usize, py as usize);
        let inside = px >= 1 && py >= 1 && px <= region.width && py <= region.height;
        let member = inside && labels[[region.y + py - 1, region.x + px - 1]] == label;
        Luma([if member { 255 } else { 0 }])
    });

    // Outside background is one 4-connected region, so diagonal gaps in an
    // 8-connected outline do not leak into the interior.
    let background = region_labelling::connected_components(
        &patch,
        Connectivity::Four,
        Luma([255u8]),
    );
    let outside_label = background.get_pixel(0, 0)[0];
    let outside = background.pixels().filter(|p| p[0] == outside_label).count();

    width * height - outside
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_abs_diff() {
        let a = arr2(&[[10u8, 200], [0, 255]]);
        let b = arr2(&[[30u8, 100], [0, 0]]);
        let diff = abs_diff(a.view(), b.view()).unwrap();
        assert_eq!(diff, arr2(&[[20u8, 100], [0, 255]]));
    }

    #[test]
    fn test_abs_diff_shape_mismatch() {
        let a = Array2::<u8>::zeros((2, 3));
        let b = Array2::<u8>::zeros((3, 2));
        assert!(matches!(
            abs_diff(a.view(), b.view()),
            Err(ImageProcError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_apply_threshold_is_strict() {
        let image = arr2(&[[29u8, 30], [31, 255]]);

        let mask = apply_threshold(image.view(), 30);

        assert!(!mask[[0, 0]]);
        assert!(!mask[[0, 1]]);
        assert!(mask[[1, 0]]);
        assert!(mask[[1, 1]]);
    }

    #[test]
    fn test_connected_components() {
        let mask = arr2(&[
            [false, true, true, false],
            [false, true, false, false],
            [false, false, false, true],
            [false, false, true, true],
        ]);

        let (labels, num_labels) = connected_components(mask.view());

        // Diagonal contact at (1,1)-(2,2) is absent, so two components remain
        assert_eq!(num_labels, 2);

        let label1 = labels[[0, 1]];
        let label2 = labels[[2, 3]];

        assert!(label1 > 0);
        assert!(label2 > 0);
        assert_ne!(label1, label2);

        assert_eq!(labels[[0, 1]], labels[[0, 2]]);
        assert_eq!(labels[[0, 1]], labels[[1, 1]]);

        assert_eq!(labels[[2, 3]], labels[[3, 3]]);
        assert_eq!(labels[[2, 3]], labels[[3, 2]]);
    }

    #[test]
    fn test_diagonal_pixels_join() {
        let mask = arr2(&[[true, false], [false, true]]);
        let (_, num_labels) = connected_components(mask.view());
        assert_eq!(num_labels, 1);
    }

    #[test]
    fn test_components_to_regions() {
        let labels = arr2(&[
            [1, 1, 0, 0],
            [1, 1, 0, 0],
            [0, 0, 0, 2],
            [0, 0, 2, 2],
        ]);

        let components = components_to_regions(labels.view(), 2);

        assert_eq!(components.len(), 2);
        assert_eq!(components[0].region, Region::new(0, 0, 2, 2));
        assert_eq!(components[0].area, 4);
        assert_eq!(components[1].region, Region::new(2, 2, 2, 2));
        // The L-shaped blob's outline encloses only its own three pixels
        assert_eq!(components[1].area, 3);
    }

    #[test]
    fn test_ring_reports_single_outer_region() {
        // A hollow square: the hole is not a separate component and counts
        // towards the enclosed area
        let mut mask = Array2::from_elem((6, 6), false);
        for i in 1..5 {
            mask[[1, i]] = true;
            mask[[4, i]] = true;
            mask[[i, 1]] = true;
            mask[[i, 4]] = true;
        }
        let (labels, n) = connected_components(mask.view());
        let components = components_to_regions(labels.view(), n);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].region, Region::new(1, 1, 4, 4));
        assert_eq!(components[0].area, 16);
    }

    #[test]
    fn test_diagonal_outline_encloses_interior() {
        // A diamond joined only through corners still closes its interior
        let mask = arr2(&[
            [false, false, true, false, false],
            [false, true, false, true, false],
            [true, false, false, false, true],
            [false, true, false, true, false],
            [false, false, true, false, false],
        ]);
        let (labels, n) = connected_components(mask.view());
        assert_eq!(n, 1);
        let components = components_to_regions(labels.view(), n);
        assert_eq!(components[0].region, Region::new(0, 0, 5, 5));
        assert_eq!(components[0].area, 13);
    }

    #[test]
    fn test_open_outline_has_no_interior() {
        // A "U" shape: the gap at the top lets outside background in
        let mut mask = Array2::from_elem((5, 5), false);
        for i in 0..5 {
            mask[[i, 0]] = true;
            mask[[i, 4]] = true;
            mask[[4, i]] = true;
        }
        let (labels, n) = connected_components(mask.view());
        let components = components_to_regions(labels.view(), n);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].area, 13);
    }

    #[test]
    fn test_neighbouring_blob_does_not_fill_hole() {
        // A separate blob sitting inside a ring's hole is outside the ring's
        // own pixels but still inside its outline
        let mut mask = Array2::from_elem((7, 7), false);
        for i in 0..7 {
            mask[[0, i]] = true;
            mask[[6, i]] = true;
            mask[[i, 0]] = true;
            mask[[i, 6]] = true;
        }
        mask[[3, 3]] = true;
        let (labels, n) = connected_components(mask.view());
        assert_eq!(n, 2);
        let components = components_to_regions(labels.view(), n);
        assert_eq!(components[0].area, 49);
        assert_eq!(components[1].region, Region::new(3, 3, 1, 1));
        assert_eq!(components[1].area, 1);
    }

    #[test]
    fn test_empty_mask_has_no_components() {
        let mask = Array2::from_elem((3, 4), false);
        let (labels, n) = connected_components(mask.view());
        assert_eq!(n, 0);
        assert!(labels.iter().all(|&l| l == 0));
        assert!(components_to_regions(labels.view(), n).is_empty());
    }
}
