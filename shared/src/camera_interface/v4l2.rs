//! V4L2 webcam source (Linux, `v4l2` feature).
//!
//! Opens `/dev/video<index>`, asks for YUYV at the requested resolution and
//! converts each buffer to RGB. Drivers that insist on MJPG are decoded with
//! the `image` crate instead. The driver may settle on a different
//! resolution; [`FrameSource::size`] reports what was actually negotiated.

use log::{info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use super::pixel_format::yuyv_to_frame;
use super::{CameraError, CameraResult, FrameSource};
use crate::frame::{rgb_image_to_frame, Frame};
use crate::image_size::ImageSize;

const BUFFER_COUNT: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Yuyv,
    Mjpg,
}

/// Camera backed by a V4L2 capture device
pub struct V4l2Camera {
    // Keeps the device handle open for the lifetime of the stream
    _device: Device,
    stream: MmapStream<'static>,
    size: ImageSize,
    encoding: Encoding,
}

impl V4l2Camera {
    /// Open camera `index` and negotiate the requested resolution
    pub fn open(index: usize, requested: ImageSize) -> CameraResult<Self> {
        let device = Device::new(index)
            .map_err(|e| CameraError::Open(format!("/dev/video{index}: {e}")))?;

        let mut format = device
            .format()
            .map_err(|e| CameraError::Open(format!("failed to query format: {e}")))?;
        format.width = requested.width as u32;
        format.height = requested.height as u32;
        format.fourcc = FourCC::new(b"YUYV");

        let actual = device
            .set_format(&format)
            .map_err(|e| CameraError::Open(format!("failed to set format: {e}")))?;

        let encoding = match &actual.fourcc.repr {
            b"YUYV" => Encoding::Yuyv,
            b"MJPG" => Encoding::Mjpg,
            other => {
                return Err(CameraError::Open(format!(
                    "unsupported pixel format {}",
                    String::from_utf8_lossy(other)
                )))
            }
        };

        let size = ImageSize::from_width_height(actual.width as usize, actual.height as usize);
        if size != requested {
            warn!("Camera {index} negotiated {size} instead of {requested}");
        }

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| CameraError::Open(format!("failed to start stream: {e}")))?;

        info!("Camera {index} opened at {size} ({encoding:?})");
        Ok(Self {
            _device: device,
            stream,
            size,
            encoding,
        })
    }
}

impl FrameSource for V4l2Camera {
    fn capture(&mut self) -> CameraResult<Frame> {
        let (buf, _meta) = self
            .stream
            .next()
            .map_err(|e| CameraError::Capture(e.to_string()))?;

        match self.encoding {
            Encoding::Yuyv => yuyv_to_frame(buf, self.size.width, self.size.height),
            Encoding::Mjpg => {
                let img = image::load_from_memory(buf)?.to_rgb8();
                Ok(rgb_image_to_frame(&img))
            }
        }
    }

    fn size(&self) -> ImageSize {
        self.size
    }
}
