//! Utility functions for image conversion and geometry.

pub mod image_conversion;
pub mod safe_cast;

/// Midpoint and extent of the interval `[min, max]`
#[must_use]
pub fn span(min: f64, max: f64) -> (f64, f64) {
    ((min + max) / 2.0, max - min)
}

/// Intersection over union of two `(x1, y1, x2, y2)` boxes
#[must_use]
pub fn iou(a: [f32; 4], b: [f32; 4]) -> f32 {
    let area = |r: [f32; 4]| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);

    let w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = w * h;
    if inter == 0.0 {
        return 0.0;
    }
    inter / (area(a) + area(b) - inter)
}
