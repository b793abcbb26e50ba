//! Frame annotation: region boxes and bitmap text.
//!
//! Text uses a built-in 5x7 bitmap font so overlays do not depend on any
//! font being installed on the host. The glyph set covers digits, upper-case
//! letters (lower-case input is drawn upper-case) and `: - . / _` plus space.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use super::thresholding::Region;
use crate::frame::{frame_to_rgb_image, rgb_image_to_frame, Frame};

/// Colour used for detection boxes and overlay text.
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Line thickness of detection boxes, in pixels.
pub const BOX_THICKNESS: u32 = 2;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Row bitmaps for one glyph, bit 4 is the left-most column.
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c.to_ascii_uppercase() {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        ' ' => [0x00; 7],
        _ => return None,
    };
    Some(rows)
}

/// Draw a region outline onto an image.
///
/// The outline covers columns `x..=x+width` and rows `y..=y+height` and grows
/// inward for thicknesses above one. Parts outside the image are clipped.
pub fn draw_region(img: &mut RgbImage, region: &Region, color: Rgb<u8>, thickness: u32) {
    let outer_w = region.width as u32 + 1;
    let outer_h = region.height as u32 + 1;

    for inset in 0..thickness {
        let (Some(w), Some(h)) = (
            outer_w.checked_sub(2 * inset),
            outer_h.checked_sub(2 * inset),
        ) else {
            break;
        };
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at(
            region.x as i32 + inset as i32,
            region.y as i32 + inset as i32,
        )
        .of_size(w, h);
        draw_hollow_rect_mut(img, rect, color);
    }
}

/// Draw text with the built-in bitmap font.
///
/// # Arguments
/// * `img` - Target image
/// * `text` - Text to render; unsupported characters leave a blank cell
/// * `x`, `y` - Top-left corner of the first glyph
/// * `scale` - Integer magnification of the 5x7 glyph cell
/// * `color` - Text colour
pub fn draw_text(img: &mut RgbImage, text: &str, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1);
    let (width, height) = img.dimensions();

    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let origin_x = x + i as u32 * GLYPH_ADVANCE * scale;

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let px = origin_x + col * scale;
                let py = y + row as u32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let (tx, ty) = (px + dx, py + dy);
                        if tx < width && ty < height {
                            img.put_pixel(tx, ty, color);
                        }
                    }
                }
            }
        }
    }
}

/// Pixel height of text drawn at the given scale.
pub fn text_height(scale: u32) -> u32 {
    GLYPH_HEIGHT * scale.max(1)
}

/// Copy of `frame` with every region outlined in [`BOX_COLOR`].
pub fn annotate_regions(frame: &Frame, regions: &[Region]) -> Frame {
    let mut img = frame_to_rgb_image(frame);
    for region in regions {
        draw_region(&mut img, region, BOX_COLOR, BOX_THICKNESS);
    }
    rgb_image_to_frame(&img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_region_outline() {
        let mut img = RgbImage::new(20, 20);
        draw_region(&mut img, &Region::new(2, 3, 10, 8), BOX_COLOR, 2);

        // Outer corners
        assert_eq!(*img.get_pixel(2, 3), BOX_COLOR);
        assert_eq!(*img.get_pixel(12, 11), BOX_COLOR);
        // Second line of the thick border
        assert_eq!(*img.get_pixel(3, 4), BOX_COLOR);
        // Interior untouched
        assert_eq!(*img.get_pixel(7, 7), Rgb([0, 0, 0]));
        // Outside untouched
        assert_eq!(*img.get_pixel(13, 11), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_region_clips_at_edges() {
        let mut img = RgbImage::new(10, 10);
        draw_region(&mut img, &Region::new(5, 5, 20, 20), BOX_COLOR, 2);
        assert_eq!(*img.get_pixel(5, 9), BOX_COLOR);
        assert_eq!(*img.get_pixel(9, 5), BOX_COLOR);
    }

    #[test]
    fn test_draw_text_marks_pixels() {
        let mut img = RgbImage::new(40, 10);
        draw_text(&mut img, "1", 0, 0, 1, BOX_COLOR);
        // Stem of the '1' glyph sits in column 2
        assert_eq!(*img.get_pixel(2, 3), BOX_COLOR);
        assert_eq!(*img.get_pixel(0, 3), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_text_scale_and_clipping() {
        let mut img = RgbImage::new(8, 8);
        draw_text(&mut img, "2026-10-18 12:00:00", 0, 0, 2, BOX_COLOR);
        let lit = img.pixels().filter(|p| **p == BOX_COLOR).count();
        assert!(lit > 0);
        assert_eq!(text_height(2), 14);
    }

    #[test]
    fn test_lowercase_uses_uppercase_glyphs() {
        assert_eq!(glyph('a'), glyph('A'));
        assert!(glyph('~').is_none());
    }

    #[test]
    fn test_annotate_regions_leaves_input_untouched() {
        let frame = Frame::zeros((16, 16, 3));
        let annotated = annotate_regions(&frame, &[Region::new(1, 1, 5, 5)]);
        assert!(frame.iter().all(|&v| v == 0));
        assert_eq!(annotated[[1, 1, 1]], 255);
        assert_eq!(annotated[[1, 1, 0]], 0);
    }
}
