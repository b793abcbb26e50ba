//! Conversions from raw camera buffer layouts to RGB frames.

use ndarray::Array3;

use super::{CameraError, CameraResult};
use crate::frame::Frame;

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Convert a packed YUYV (YUV 4:2:2) buffer into an RGB frame.
///
/// Uses the BT.601 studio-swing integer transform. `width` must be even, as
/// each 4-byte group `Y0 U Y1 V` encodes two horizontally adjacent pixels.
pub fn yuyv_to_frame(buf: &[u8], width: usize, height: usize) -> CameraResult<Frame> {
    let expected = width * height * 2;
    if width % 2 != 0 || buf.len() < expected {
        return Err(CameraError::Capture(format!(
            "YUYV buffer of {} bytes does not hold a {width}x{height} frame",
            buf.len()
        )));
    }

    let mut frame = Array3::<u8>::zeros((height, width, 3));
    for y in 0..height {
        for pair in 0..width / 2 {
            let offset = (y * width + pair * 2) * 2;
            let y0 = buf[offset] as i32;
            let u = buf[offset + 1] as i32 - 128;
            let y1 = buf[offset + 2] as i32;
            let v = buf[offset + 3] as i32 - 128;

            for (dx, luma) in [(0, y0), (1, y1)] {
                let c = 298 * (luma - 16);
                let x = pair * 2 + dx;
                frame[[y, x, 0]] = clamp_u8((c + 409 * v + 128) >> 8);
                frame[[y, x, 1]] = clamp_u8((c - 100 * u - 208 * v + 128) >> 8);
                frame[[y, x, 2]] = clamp_u8((c + 516 * u + 128) >> 8);
            }
        }
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_chroma_gives_gray() {
        // Y=16 is black, Y=235 is white in studio swing
        let buf = [16u8, 128, 235, 128];
        let frame = yuyv_to_frame(&buf, 2, 1).unwrap();
        assert_eq!(
            [frame[[0, 0, 0]], frame[[0, 0, 1]], frame[[0, 0, 2]]],
            [0, 0, 0]
        );
        assert_eq!(
            [frame[[0, 1, 0]], frame[[0, 1, 1]], frame[[0, 1, 2]]],
            [255, 255, 255]
        );
    }

    #[test]
    fn test_rejects_short_buffer() {
        let buf = [0u8; 6];
        assert!(matches!(
            yuyv_to_frame(&buf, 2, 2),
            Err(CameraError::Capture(_))
        ));
    }
}
