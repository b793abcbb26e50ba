//! Replays still images from a directory as a camera feed.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use log::debug;

use super::{CameraError, CameraResult, FrameSource};
use crate::frame::{rgb_image_to_frame, Frame};
use crate::image_size::ImageSize;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Frame source backed by the image files of one directory.
///
/// Files are played in lexicographic order. Images whose size differs from
/// the target resolution are resized so every frame has the same shape.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    size: ImageSize,
}

impl ImageSequenceSource {
    /// Scan `dir` for images to replay at the given resolution
    pub fn open(dir: &Path, size: ImageSize) -> CameraResult<Self> {
        if size.is_empty() {
            return Err(CameraError::Open(format!("invalid target resolution {size}")));
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(CameraError::Open(format!(
                "no images found in {}",
                dir.display()
            )));
        }

        debug!("Replaying {} images from {}", paths.len(), dir.display());
        Ok(Self {
            paths,
            next: 0,
            size,
        })
    }

    /// Number of images that have not been served yet
    pub fn remaining(&self) -> usize {
        self.paths.len() - self.next
    }
}

impl FrameSource for ImageSequenceSource {
    fn capture(&mut self) -> CameraResult<Frame> {
        let path = self.paths.get(self.next).ok_or(CameraError::EndOfStream)?;
        self.next += 1;

        let mut img = image::open(path)?.to_rgb8();
        let (w, h) = (self.size.width as u32, self.size.height as u32);
        if img.dimensions() != (w, h) {
            img = imageops::resize(&img, w, h, FilterType::Triangle);
        }

        Ok(rgb_image_to_frame(&img))
    }

    fn size(&self) -> ImageSize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_replays_in_order_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(8, 6, Rgb([10, 10, 10]))
            .save(dir.path().join("b.png"))
            .unwrap();
        RgbImage::from_pixel(8, 6, Rgb([200, 200, 200]))
            .save(dir.path().join("a.png"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source =
            ImageSequenceSource::open(dir.path(), ImageSize::from_width_height(8, 6)).unwrap();
        assert_eq!(source.remaining(), 2);

        let first = source.capture().unwrap();
        assert_eq!(first.dim(), (6, 8, 3));
        assert_eq!(first[[0, 0, 0]], 200);
        assert_eq!(source.capture().unwrap()[[0, 0, 0]], 10);
        assert!(matches!(source.capture(), Err(CameraError::EndOfStream)));
    }

    #[test]
    fn test_resizes_to_target() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(16, 16, Rgb([50, 60, 70]))
            .save(dir.path().join("frame.png"))
            .unwrap();

        let mut source =
            ImageSequenceSource::open(dir.path(), ImageSize::from_width_height(4, 3)).unwrap();
        let frame = source.capture().unwrap();
        assert_eq!(frame.dim(), (3, 4, 3));
        assert_eq!(frame[[1, 1, 2]], 70);
    }

    #[test]
    fn test_empty_directory_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageSequenceSource::open(dir.path(), ImageSize::from_width_height(4, 4));
        assert!(matches!(result, Err(CameraError::Open(_))));
    }
}
