//! Checked conversions between pixel coordinate and buffer size types

use crate::{Error, Result};

/// Byte length of an RGB8 buffer with the given dimensions
///
/// # Errors
///
/// Returns an error if the length overflows `usize`
pub fn rgb_buffer_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .ok_or_else(|| Error::InvalidInput(format!("Frame {width}x{height} is too large")))
}

/// Convert an `OpenCV` style `i32` dimension to `u32`
///
/// # Errors
///
/// Returns an error if the value is negative
pub fn i32_to_u32(value: i32) -> Result<u32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Negative dimension {value}")))
}

/// Clamp and convert an `f32` to a pixel coordinate in `[0, max]`
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_precision_loss)]
pub fn f32_to_u32_clamp(value: f32, max: u32) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    let clamped = value.clamp(0.0, max as f32);
    (clamped as u32).min(max)
}
