//! Engine angle units, fixed-point trig tables, and the bounding cylinder
//! visibility test.
//!
//! Angles are in 2048ths of a full turn. Sines and cosines are 16.16 fixed
//! point. All arithmetic matches the host engine's 32-bit integer math
//! (wrapping multiply, arithmetic shift, truncating divide) so that culling
//! agrees with the engine's own hit testing.

use std::sync::LazyLock;

/// Angle steps per full turn.
pub const ANGLE_STEPS: usize = 2048;

/// Radians per angle step.
pub const UNIT: f64 = std::f64::consts::PI / 1024.0;

/// World units per tile edge.
pub const LOCAL_TILE_SIZE: i32 = 128;

/// Depth at or below which an entity is considered behind the near plane.
pub const NEAR_PLANE: i32 = 50;

struct TrigTables {
    sine: [i32; ANGLE_STEPS],
    cosine: [i32; ANGLE_STEPS],
}

static TABLES: LazyLock<TrigTables> = LazyLock::new(|| {
    let mut sine = [0; ANGLE_STEPS];
    let mut cosine = [0; ANGLE_STEPS];
    for i in 0..ANGLE_STEPS {
        let a = i as f64 * UNIT;
        sine[i] = (65536.0 * a.sin()) as i32;
        cosine[i] = (65536.0 * a.cos()) as i32;
    }
    TrigTables { sine, cosine }
});

#[inline]
pub fn sine(angle: i32) -> i32 {
    TABLES.sine[(angle & 0x7ff) as usize]
}

#[inline]
pub fn cosine(angle: i32) -> i32 {
    TABLES.cosine[(angle & 0x7ff) as usize]
}

/// `(sin, cos)` pairs for every angle step, in table order.
pub fn sin_cos_table() -> impl Iterator<Item = (i32, i32)> {
    TABLES.sine.iter().copied().zip(TABLES.cosine.iter().copied())
}

/// Rotates `(x, z)` about the Y axis by `orientation`.
#[inline]
pub fn rotate_y(x: i32, z: i32, orientation: i32) -> (i32, i32) {
    if orientation == 0 {
        return (x, z);
    }
    let s = sine(orientation);
    let c = cosine(orientation);
    let rx = z.wrapping_mul(s).wrapping_add(x.wrapping_mul(c)) >> 16;
    let rz = z.wrapping_mul(c).wrapping_sub(x.wrapping_mul(s)) >> 16;
    (rx, rz)
}

/// Camera pitch/yaw as fixed-point sines and cosines.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ViewRotation {
    pub pitch_sin: i32,
    pub pitch_cos: i32,
    pub yaw_sin: i32,
    pub yaw_cos: i32,
}

impl ViewRotation {
    pub fn from_angles(pitch: i32, yaw: i32) -> Self {
        Self {
            pitch_sin: sine(pitch),
            pitch_cos: cosine(pitch),
            yaw_sin: sine(yaw),
            yaw_cos: cosine(yaw),
        }
    }
}

/// Rasterizer clip edges relative to the screen center.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ClipBounds {
    pub mid_x2: i32,
    pub negative_mid_x: i32,
    pub negative_mid_y: i32,
    pub mid_y2: i32,
}

impl ClipBounds {
    /// Symmetric clip bounds for a viewport of `width × height`.
    pub fn centered(width: i32, height: i32) -> Self {
        let mid_x = width / 2;
        let mid_y = height / 2;
        Self {
            mid_x2: width - mid_x,
            negative_mid_x: -mid_x,
            negative_mid_y: -mid_y,
            mid_y2: height - mid_y,
        }
    }
}

/// Where an entity is drawn this frame: camera-relative position, its own
/// orientation, and the camera rotation it is seen through.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Placement {
    pub orientation: i32,
    pub rotation: ViewRotation,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Bounding cylinder of a model: horizontal extent and height.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Bounds {
    pub xyz_mag: i32,
    pub model_height: i32,
}

/// Projects a bounding cylinder and tests it against the four clip edges.
///
/// Returns `false` when the cylinder is at or behind the near plane.
pub fn is_visible(bounds: Bounds, placement: &Placement, clip: &ClipBounds, zoom: i32) -> bool {
    let Placement { x, y, z, rotation, .. } = *placement;
    let ViewRotation {
        pitch_sin,
        pitch_cos,
        yaw_sin,
        yaw_cos,
    } = rotation;
    let mag = bounds.xyz_mag;

    let depth_z = yaw_cos.wrapping_mul(z).wrapping_sub(yaw_sin.wrapping_mul(x)) >> 16;
    let depth_y = pitch_sin.wrapping_mul(y).wrapping_add(pitch_cos.wrapping_mul(depth_z)) >> 16;
    let depth_mag = pitch_cos.wrapping_mul(mag) >> 16;
    let depth = depth_y.wrapping_add(depth_mag);
    if depth <= NEAR_PLANE {
        return false;
    }

    let screen_x = z.wrapping_mul(yaw_sin).wrapping_add(yaw_cos.wrapping_mul(x)) >> 16;
    let left = screen_x.wrapping_sub(mag).wrapping_mul(zoom);
    if left.wrapping_div(depth) >= clip.mid_x2 {
        return false;
    }
    let right = screen_x.wrapping_add(mag).wrapping_mul(zoom);
    if right.wrapping_div(depth) <= clip.negative_mid_x {
        return false;
    }

    let screen_y = pitch_cos.wrapping_mul(y).wrapping_sub(depth_z.wrapping_mul(pitch_sin)) >> 16;
    let lift = pitch_sin.wrapping_mul(mag) >> 16;
    let bottom = screen_y.wrapping_add(lift).wrapping_mul(zoom);
    if bottom.wrapping_div(depth) <= clip.negative_mid_y {
        return false;
    }

    let height = (pitch_cos.wrapping_mul(bounds.model_height) >> 16).wrapping_add(lift);
    let top = screen_y.wrapping_sub(height).wrapping_mul(zoom);
    top.wrapping_div(depth) < clip.mid_y2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip() -> ClipBounds {
        ClipBounds::centered(512, 334)
    }

    fn at(x: i32, y: i32, z: i32, pitch: i32, yaw: i32) -> Placement {
        Placement {
            orientation: 0,
            rotation: ViewRotation::from_angles(pitch, yaw),
            x,
            y,
            z,
        }
    }

    const BOUNDS: Bounds = Bounds {
        xyz_mag: 64,
        model_height: 128,
    };

    #[test]
    fn table_anchors() {
        assert_eq!(sine(0), 0);
        assert_eq!(cosine(0), 65536);
        assert_eq!(sine(512), 65536);
        assert_eq!(cosine(1024), -65536);
        assert_eq!(sin_cos_table().count(), ANGLE_STEPS);
    }

    #[test]
    fn straight_ahead_is_visible() {
        assert!(is_visible(BOUNDS, &at(0, 0, 1000, 0, 0), &clip(), 512));
    }

    #[test]
    fn behind_camera_is_rejected() {
        assert!(!is_visible(BOUNDS, &at(0, 0, -1000, 0, 0), &clip(), 512));
    }

    #[test]
    fn near_plane_threshold_is_exclusive() {
        // depth = z + mag with pitch 0 and yaw 0.
        assert!(!is_visible(BOUNDS, &at(0, 0, 50 - 64, 0, 0), &clip(), 512));
        assert!(is_visible(BOUNDS, &at(0, 0, 51 - 64, 0, 0), &clip(), 512));
    }

    #[test]
    fn far_off_to_the_side_is_rejected() {
        assert!(!is_visible(BOUNDS, &at(20_000, 0, 1000, 0, 0), &clip(), 512));
        assert!(!is_visible(BOUNDS, &at(-20_000, 0, 1000, 0, 0), &clip(), 512));
    }

    #[test]
    fn full_turn_is_periodic() {
        let positions = [(0, 0, 1000), (300, -200, 800), (-900, 50, 400), (0, 0, -500)];
        for &(x, y, z) in &positions {
            for pitch in (0..2048).step_by(97) {
                for yaw in (0..2048).step_by(131) {
                    let base = is_visible(BOUNDS, &at(x, y, z, pitch, yaw), &clip(), 512);
                    let turned = is_visible(
                        BOUNDS,
                        &at(x, y, z, pitch + 2048, yaw + 2048),
                        &clip(),
                        512,
                    );
                    assert_eq!(base, turned, "pitch {pitch} yaw {yaw} at {x},{y},{z}");
                }
            }
        }
    }

    #[test]
    fn rotate_quarter_turn() {
        // orientation 512 = 90 degrees: x' = z, z' = -x
        assert_eq!(rotate_y(100, 0, 512), (0, -100));
        assert_eq!(rotate_y(0, 100, 512), (100, 0));
        assert_eq!(rotate_y(7, 9, 0), (7, 9));
    }
}
