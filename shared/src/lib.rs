//! Shared components for the watchpost monitoring service.
//!
//! Holds the pieces that do not depend on detection policy or storage
//! layout: the frame representation, pixel-level image processing, frame
//! annotation and the camera interface that feeds frames into the engine.

pub mod camera_interface;
pub mod frame;
pub mod image_proc;
pub mod image_size;

pub use frame::Frame;
pub use image_size::ImageSize;
