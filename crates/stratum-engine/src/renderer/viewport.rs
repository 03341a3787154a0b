//! Canvas to surface viewport mapping.

use crate::host::ViewportRect;
use crate::render::PixelRect;

/// Padding around a stretched viewport, absorbing rounding at the edges.
const STRETCH_PADDING: i64 = 1;

/// Intersects a possibly negative rectangle with `target`.
fn clip(x: i64, y: i64, width: i64, height: i64, target: (u32, u32)) -> Option<PixelRect> {
    let left = x.max(0);
    let top = y.max(0);
    let right = (x + width).min(target.0 as i64);
    let bottom = (y + height).min(target.1 as i64);
    (right > left && bottom > top).then(|| PixelRect {
        x: left as u32,
        y: top as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    })
}

/// Where the scene lands on the surface.
///
/// `viewport` is in canvas pixels. When the canvas is stretched, sizes are
/// scaled up and rounded out so the scene never leaves a gap against the
/// stretched interface; the result is then scaled by the display's
/// `scale_factor` and clipped to `target`.
pub fn scene_viewport(
    viewport: ViewportRect,
    canvas: (u32, u32),
    stretched: Option<(u32, u32)>,
    scale_factor: f64,
    target: (u32, u32),
) -> Option<PixelRect> {
    let (mut x, mut y) = (viewport.x as i64, viewport.y as i64);
    let (mut width, mut height) = (viewport.width as i64, viewport.height as i64);

    if let Some((stretched_w, stretched_h)) = stretched {
        let scale_x = stretched_w as f64 / canvas.0.max(1) as f64;
        let scale_y = stretched_h as f64 / canvas.1.max(1) as f64;
        width = (scale_x * width as f64).ceil() as i64 + STRETCH_PADDING * 2;
        height = (scale_y * height as f64).ceil() as i64 + STRETCH_PADDING * 2;
        x = (scale_x * x as f64).floor() as i64 - STRETCH_PADDING;
        y = (scale_y * y as f64).floor() as i64 - STRETCH_PADDING;
    }

    let dpi = |v: i64| (v as f64 * scale_factor).round() as i64;
    clip(dpi(x), dpi(y), dpi(width), dpi(height), target)
}

/// Where the interface layer lands: the whole canvas, stretched when
/// stretching is on.
pub fn interface_viewport(canvas: (u32, u32), stretched: Option<(u32, u32)>, scale_factor: f64, target: (u32, u32)) -> Option<PixelRect> {
    let (width, height) = stretched.unwrap_or(canvas);
    let dpi = |v: u32| (v as f64 * scale_factor).round() as i64;
    clip(0, 0, dpi(width), dpi(height), target)
}
