//! Rectangle math for mapping between original-image and display space
//!
//! Persisted regions are always in original-image pixel coordinates.
//! Display coordinates exist only transiently, for whatever surface is
//! rendering the image at a given scale.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Compute the shrink-to-fit scale for an image inside a container.
///
/// Images are only ever scaled down, never magnified: the result is
/// capped at 1.0. Returns 1.0 when any dimension is unknown (zero),
/// which makes the transforms below identities.
pub fn fit_scale(container_width: u32, container_height: u32, image_width: u32, image_height: u32) -> f64 {
    if image_width == 0 || image_height == 0 || container_width == 0 || container_height == 0 {
        return 1.0;
    }

    let sx = container_width as f64 / image_width as f64;
    let sy = container_height as f64 / image_height as f64;
    sx.min(sy).min(1.0)
}

/// Map an original-space rectangle to display space.
///
/// Each component is rounded to the nearest integer pixel. A scale of
/// zero or below returns the input unchanged.
pub fn to_display(rect: Rect, scale: f64) -> Rect {
    if scale <= 0.0 {
        return rect;
    }

    Rect {
        left: (rect.left as f64 * scale).round() as i64,
        top: (rect.top as f64 * scale).round() as i64,
        width: (rect.width as f64 * scale).round() as i64,
        height: (rect.height as f64 * scale).round() as i64,
    }
}

/// Map a display-space rectangle back to original space.
///
/// Exact inverse of [`to_display`] up to rounding; a round trip is
/// accurate to within one pixel per component.
pub fn to_original(rect: Rect, scale: f64) -> Rect {
    if scale <= 0.0 {
        return rect;
    }

    Rect {
        left: (rect.left as f64 / scale).round() as i64,
        top: (rect.top as f64 / scale).round() as i64,
        width: (rect.width as f64 / scale).round() as i64,
        height: (rect.height as f64 / scale).round() as i64,
    }
}
