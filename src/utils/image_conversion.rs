//! Conversions between [`Frame`], `image` buffers and `OpenCV` Mats, plus still encoding.

use crate::frame::Frame;
use crate::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, RgbImage};
use std::path::Path;

/// Convert a [`Frame`] into an `image::RgbImage`
///
/// # Errors
/// * Returns error if the buffer does not match the frame dimensions
pub fn frame_to_rgb_image(frame: &Frame) -> Result<RgbImage> {
    RgbImage::from_raw(frame.width(), frame.height(), frame.as_bytes().to_vec()).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Frame buffer does not match {}x{}",
            frame.width(),
            frame.height()
        ))
    })
}

/// Convert an `image::RgbImage` into a [`Frame`] without copying
///
/// # Errors
/// * Returns error if the image buffer is inconsistent with its dimensions
pub fn rgb_image_to_frame(image: RgbImage) -> Result<Frame> {
    let (width, height) = image.dimensions();
    Frame::new(width, height, image.into_raw())
}

/// Decode a still image from disk into a [`Frame`]
///
/// # Errors
/// * Returns error if the file cannot be read or decoded
pub fn load_frame<P: AsRef<Path>>(path: P) -> Result<Frame> {
    let image = image::open(path)?.to_rgb8();
    rgb_image_to_frame(image)
}

/// Flip a frame left to right
///
/// # Errors
/// * Returns error if the frame buffer is inconsistent
pub fn mirror_horizontal(frame: &Frame) -> Result<Frame> {
    let image = frame_to_rgb_image(frame)?;
    rgb_image_to_frame(imageops::flip_horizontal(&image))
}

/// Encode a frame as JPEG with the given quality (1-100)
///
/// # Errors
/// * Returns `CaptureError` for an empty frame
/// * Returns `Image` if encoding fails
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>> {
    if frame.is_empty() {
        return Err(Error::CaptureError("Cannot encode an empty frame".to_string()));
    }
    let image = frame_to_rgb_image(frame)?;
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder.encode_image(&image)?;
    Ok(bytes)
}

/// Convert a BGR `OpenCV` Mat (as delivered by `VideoCapture`) into an RGB [`Frame`]
///
/// # Errors
/// * Returns error if the Mat is empty, not 3-channel, or colour conversion fails
#[cfg(feature = "opencv")]
pub fn mat_bgr_to_frame(mat: &opencv::core::Mat) -> Result<Frame> {
    use crate::utils::safe_cast::i32_to_u32;
    use opencv::{imgproc, prelude::*};

    if mat.empty() {
        return Err(Error::CaptureError("Empty frame from camera".to_string()));
    }
    if mat.channels() != 3 {
        return Err(Error::InvalidInput(format!(
            "Expected a 3-channel Mat, got {} channels",
            mat.channels()
        )));
    }

    let mut rgb = opencv::core::Mat::default();
    imgproc::cvt_color(mat, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
    let rgb = if rgb.is_continuous() { rgb } else { rgb.try_clone()? };

    let width = i32_to_u32(rgb.cols())?;
    let height = i32_to_u32(rgb.rows())?;
    Frame::new(width, height, rgb.data_bytes()?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame() -> Frame {
        let mut frame = Frame::filled(4, 2, [0, 0, 0]).unwrap();
        for x in 0..4 {
            frame.set_pixel(x, 0, [x as u8 * 10, 0, 0]);
        }
        frame
    }

    #[test]
    fn test_rgb_image_round_trip_keeps_pixels() {
        let frame = gradient_frame();
        let image = frame_to_rgb_image(&frame).unwrap();
        assert_eq!(image.get_pixel(3, 0).0, [30, 0, 0]);
        assert_eq!(rgb_image_to_frame(image).unwrap(), frame);
    }

    #[test]
    fn test_mirror_horizontal() {
        let mirrored = mirror_horizontal(&gradient_frame()).unwrap();
        assert_eq!(mirrored.pixel(0, 0), Some([30, 0, 0]));
        assert_eq!(mirrored.pixel(3, 0), Some([0, 0, 0]));
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_magic() {
        let frame = Frame::filled(16, 16, [200, 150, 120]).unwrap();
        let bytes = encode_jpeg(&frame, 90).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encode_empty_frame_fails() {
        let result = encode_jpeg(&Frame::empty(), 90);
        assert!(matches!(result, Err(Error::CaptureError(_))));
    }
}
