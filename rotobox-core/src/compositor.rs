// ============================================================================
// rotobox-core/src/compositor.rs
// ============================================================================
//
// COMPOSITOR: Rotated rectangle fill and alpha blending
//
// Draws a filled rectangle of fixed size, centered at a point and rotated by
// an angle, onto an RGB frame with a uniform opacity:
//
//     result = opacity * fill + (1 - opacity) * original
//
// Coordinates are image coordinates (y grows downward), so a positive angle
// rotates the rectangle clockwise on screen.

use image::{Rgb, RgbImage};
use kurbo::{Affine, Point, Vec2};

/// Fill color, opacity and size of the overlay rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleStyle {
    pub width: u32,
    pub height: u32,
    pub opacity: f64,
    pub color: [u8; 3],
}

impl RectangleStyle {
    pub fn from_config(config: &crate::config::OverlayConfig) -> Self {
        Self {
            width: config.rect_width,
            height: config.rect_height,
            opacity: config.opacity,
            color: config.color,
        }
    }
}

/// Corners of the rotated rectangle in drawing order.
pub fn rectangle_corners(
    center_x: f64,
    center_y: f64,
    angle_degrees: f64,
    width: u32,
    height: u32,
) -> [Point; 4] {
    let hw = f64::from(width) / 2.0;
    let hh = f64::from(height) / 2.0;
    let transform =
        Affine::translate(Vec2::new(center_x, center_y)) * Affine::rotate(angle_degrees.to_radians());

    [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)].map(|(dx, dy)| transform * Point::new(dx, dy))
}

/// Draws the rectangle onto `frame` in place.
///
/// Only pixels inside the polygon can change: outside it the fill layer equals
/// the original, so the blend reproduces the original exactly. The fill layer
/// is therefore never materialized beyond the pixel being blended.
pub fn draw_rotated_rectangle(
    frame: &mut RgbImage,
    center_x: f64,
    center_y: f64,
    angle_degrees: f64,
    style: &RectangleStyle,
) {
    if style.opacity <= 0.0 || frame.width() == 0 || frame.height() == 0 {
        return;
    }

    let corners = rectangle_corners(center_x, center_y, angle_degrees, style.width, style.height);
    let Some((x0, y0, x1, y1)) = clipped_bounds(&corners, frame.width(), frame.height()) else {
        return;
    };

    let opacity = style.opacity.min(1.0);
    for y in y0..=y1 {
        for x in x0..=x1 {
            if !contains(&corners, Point::new(f64::from(x), f64::from(y))) {
                continue;
            }
            let pixel = frame.get_pixel_mut(x, y);
            *pixel = blend(*pixel, style.color, opacity);
        }
    }
}

/// Per-channel `opacity * fill + (1 - opacity) * base`, rounded.
fn blend(base: Rgb<u8>, fill: [u8; 3], opacity: f64) -> Rgb<u8> {
    let mut out = [0u8; 3];
    for (channel, (&b, &f)) in out.iter_mut().zip(base.0.iter().zip(fill.iter())) {
        let value = opacity * f64::from(f) + (1.0 - opacity) * f64::from(b);
        *channel = value.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Whole-pixel bounding box of the polygon clipped to the frame, inclusive.
fn clipped_bounds(corners: &[Point; 4], width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let fold = |f: fn(&Point) -> f64| {
        corners
            .iter()
            .map(f)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
    };
    let (min_x, max_x) = fold(|p| p.x);
    let (min_y, max_y) = fold(|p| p.y);
    if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
        return None;
    }

    let x0 = (min_x.floor() as i64).max(0);
    let x1 = (max_x.ceil() as i64).min(i64::from(width) - 1);
    let y0 = (min_y.floor() as i64).max(0);
    let y1 = (max_y.ceil() as i64).min(i64::from(height) - 1);

    if x0 > x1 || y0 > y1 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

/// Tolerance for points on an edge, in squared-pixel units of the cross product.
const EDGE_EPSILON: f64 = 1e-9;

/// Point-in-convex-polygon test, boundary included.
fn contains(corners: &[Point; 4], p: Point) -> bool {
    let mut has_pos = false;
    let mut has_neg = false;
    for i in 0..corners.len() {
        let a = corners[i];
        let b = corners[(i + 1) % corners.len()];
        let cross = (b - a).cross(p - a);
        has_pos |= cross > EDGE_EPSILON;
        has_neg |= cross < -EDGE_EPSILON;
        if has_pos && has_neg {
            return false;
        }
    }
    true
}
