//! Image cropping for detected objects.
//!
//! This crate provides:
//! - Normalized polygon to pixel rectangle conversion
//! - Cropping and JPEG re-encoding of uploaded images
//! - An async entry point that keeps decode/encode off the runtime workers

pub mod crop;
pub mod error;

pub use crop::{
    crop_decoded, crop_image, crop_image_blocking_task, CropRect, CroppedImage,
    CROP_CONTENT_TYPE, CROP_JPEG_QUALITY,
};
pub use error::{MediaError, MediaResult};
