//! Cropping detected objects out of uploaded images.

use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, GenericImageView};
use lookalike_models::BoundingPoly;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// JPEG quality used when re-encoding crops.
pub const CROP_JPEG_QUALITY: u8 = 90;

/// Content type of every crop produced here.
pub const CROP_CONTENT_TYPE: &str = "image/jpeg";

/// Pixel-space rectangle inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Convert a normalized polygon into pixel coordinates.
    ///
    /// Left and top come from vertex 0, width from vertex 1, height from
    /// vertex 2; every value is floored. Nothing is clamped: regions that are
    /// empty or leave the image are errors.
    pub fn from_polygon(poly: &BoundingPoly, image_width: u32, image_height: u32) -> MediaResult<Self> {
        let v = &poly.normalized_vertices;
        if v.len() != 4 {
            return Err(MediaError::InvalidPolygon(v.len()));
        }

        let w = f64::from(image_width);
        let h = f64::from(image_height);

        let left = (v[0].x * w).floor() as i64;
        let top = (v[0].y * h).floor() as i64;
        let width = ((v[1].x - v[0].x) * w).floor() as i64;
        let height = ((v[2].y - v[1].y) * h).floor() as i64;

        if width <= 0 || height <= 0 {
            return Err(MediaError::DegenerateRegion { width, height });
        }

        if left < 0
            || top < 0
            || left + width > i64::from(image_width)
            || top + height > i64::from(image_height)
        {
            return Err(MediaError::OutOfBounds {
                left,
                top,
                width,
                height,
                image_width,
                image_height,
            });
        }

        // All four values are now within 0..=u32::MAX
        Ok(Self {
            left: left as u32,
            top: top as u32,
            width: width as u32,
            height: height as u32,
        })
    }
}

/// An encoded crop.
#[derive(Debug, Clone)]
pub struct CroppedImage {
    /// JPEG bytes
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode `image_bytes`, extract the polygon's region and encode it as JPEG.
pub fn crop_image(image_bytes: &[u8], poly: &BoundingPoly) -> MediaResult<CroppedImage> {
    let img = image::load_from_memory(image_bytes).map_err(|e| MediaError::decode(e.to_string()))?;
    crop_decoded(&img, poly)
}

/// Crop an already decoded image.
pub fn crop_decoded(img: &DynamicImage, poly: &BoundingPoly) -> MediaResult<CroppedImage> {
    let (image_width, image_height) = img.dimensions();
    if image_width == 0 || image_height == 0 {
        return Err(MediaError::decode("image has zero width or height"));
    }

    let rect = CropRect::from_polygon(poly, image_width, image_height)?;
    debug!(
        left = rect.left,
        top = rect.top,
        width = rect.width,
        height = rect.height,
        "Cropping {}x{} image",
        image_width,
        image_height
    );

    let rgb = img
        .crop_imm(rect.left, rect.top, rect.width, rect.height)
        .to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, CROP_JPEG_QUALITY)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| MediaError::encode(e.to_string()))?;

    Ok(CroppedImage {
        bytes,
        width: rect.width,
        height: rect.height,
    })
}

/// Run [`crop_image`] on the blocking thread pool.
///
/// The source buffer is shared, so many crops can run off one upload
/// without copying it.
pub async fn crop_image_blocking_task(image_bytes: Arc<[u8]>, poly: BoundingPoly) -> MediaResult<CroppedImage> {
    tokio::task::spawn_blocking(move || crop_image(&image_bytes, &poly))
        .await
        .map_err(|e| MediaError::internal(format!("Blocking task join error: {}", e)))?
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageBuffer, ImageOutputFormat, Rgb, RgbImage};

    use super::*;

    fn encode(img: RgbImage, format: ImageOutputFormat) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut cursor, format).unwrap();
        cursor.into_inner()
    }

    fn solid_jpeg(width: u32, height: u32) -> Vec<u8> {
        encode(
            ImageBuffer::from_pixel(width, height, Rgb([180, 40, 40])),
            ImageOutputFormat::Jpeg(90),
        )
    }

    #[test]
    fn test_rect_for_shirt_polygon() {
        let poly = BoundingPoly::from_corners(0.1, 0.1, 0.5, 0.6);
        let rect = CropRect::from_polygon(&poly, 1000, 1000).unwrap();
        assert_eq!(
            rect,
            CropRect {
                left: 100,
                top: 100,
                width: 400,
                height: 500
            }
        );
    }

    #[test]
    fn test_rect_floors_every_value() {
        // (0.7 - 0.2) * 200 evaluates just below 100 in f64
        let poly = BoundingPoly::from_corners(0.2, 0.3, 0.7, 0.9);
        let rect = CropRect::from_polygon(&poly, 200, 480).unwrap();
        assert_eq!(rect.left, 40);
        assert_eq!(rect.top, 144);
        assert_eq!(rect.width, 99);
        assert_eq!(rect.height, 288);
    }

    #[test]
    fn test_rect_uses_vertex_one_and_two_for_size() {
        // Bottom-left vertex is ignored by the size computation
        let mut poly = BoundingPoly::from_corners(0.25, 0.25, 0.75, 0.75);
        poly.normalized_vertices[3].x = 0.9;
        let rect = CropRect::from_polygon(&poly, 640, 480).unwrap();
        assert_eq!((rect.left, rect.top, rect.width, rect.height), (160, 120, 320, 240));
    }

    #[test]
    fn test_degenerate_region_is_rejected() {
        let poly = BoundingPoly::from_corners(0.5, 0.1, 0.5, 0.6);
        let err = CropRect::from_polygon(&poly, 1000, 1000).unwrap_err();
        assert!(matches!(err, MediaError::DegenerateRegion { width: 0, .. }));

        let inverted = BoundingPoly::from_corners(0.1, 0.6, 0.5, 0.1);
        let err = CropRect::from_polygon(&inverted, 1000, 1000).unwrap_err();
        assert!(matches!(err, MediaError::DegenerateRegion { .. }));
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let poly = BoundingPoly::from_corners(0.6, 0.1, 1.2, 0.5);
        let err = CropRect::from_polygon(&poly, 100, 100).unwrap_err();
        assert!(matches!(err, MediaError::OutOfBounds { .. }));

        let negative = BoundingPoly::from_corners(-0.1, 0.1, 0.3, 0.5);
        let err = CropRect::from_polygon(&negative, 100, 100).unwrap_err();
        assert!(matches!(err, MediaError::OutOfBounds { .. }));
    }

    #[test]
    fn test_wrong_vertex_count_is_rejected() {
        let mut poly = BoundingPoly::from_corners(0.1, 0.1, 0.5, 0.5);
        poly.normalized_vertices.pop();
        let err = CropRect::from_polygon(&poly, 100, 100).unwrap_err();
        assert!(matches!(err, MediaError::InvalidPolygon(3)));
    }

    #[test]
    fn test_crop_output_dimensions() {
        let source = solid_jpeg(1000, 1000);
        let cropped = crop_image(&source, &BoundingPoly::from_corners(0.1, 0.1, 0.5, 0.6)).unwrap();

        assert_eq!((cropped.width, cropped.height), (400, 500));
        let decoded = image::load_from_memory(&cropped.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (400, 500));
        assert_eq!(
            image::guess_format(&cropped.bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_crop_extracts_the_right_pixels() {
        // Left half red, right half blue; PNG input avoids compression noise
        let img = ImageBuffer::from_fn(100, 100, |x, _| {
            if x < 50 {
                Rgb([255u8, 0, 0])
            } else {
                Rgb([0u8, 0, 255])
            }
        });
        let source = encode(img, ImageOutputFormat::Png);

        let cropped = crop_image(&source, &BoundingPoly::from_corners(0.6, 0.2, 0.9, 0.8)).unwrap();
        let decoded = image::load_from_memory(&cropped.bytes).unwrap().to_rgb8();
        let center = decoded.get_pixel(decoded.width() / 2, decoded.height() / 2);

        assert!(center[2] > 200, "expected blue, got {:?}", center);
        assert!(center[0] < 60, "expected blue, got {:?}", center);
    }

    #[test]
    fn test_undecodable_input() {
        let err = crop_image(b"not an image", &BoundingPoly::from_corners(0.1, 0.1, 0.5, 0.5)).unwrap_err();
        assert!(matches!(err, MediaError::Decode(_)));
    }

    #[tokio::test]
    async fn test_blocking_task_shares_source() {
        let source: Arc<[u8]> = solid_jpeg(200, 100).into();

        let left = crop_image_blocking_task(source.clone(), BoundingPoly::from_corners(0.0, 0.0, 0.5, 1.0));
        let right = crop_image_blocking_task(source.clone(), BoundingPoly::from_corners(0.5, 0.0, 1.0, 0.5));
        let (left, right) = tokio::join!(left, right);

        assert_eq!((left.unwrap().width, right.as_ref().unwrap().height), (100, 50));
        assert_eq!(Arc::strong_count(&source), 1);
    }
}
