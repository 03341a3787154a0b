//! Read-only geometry sources: models, tile paints, tile meshes.
//!
//! Coordinates are engine world units with `y` pointing down. Colours are
//! packed 16-bit HSL (`hue << 10 | saturation << 7 | lightness`).

use crate::perspective::Bounds;

/// Colour marking a tile paint or tile face that must not be drawn.
pub const HIDDEN_TILE_COLOR: i32 = 12_345_678;

/// `colors[2]` value for a flat-shaded model face.
pub const FLAT_SHADED: i32 = -1;

/// `colors[2]` value for a model face that must not be drawn.
pub const HIDDEN_FACE: i32 = -2;

/// Location of encoded geometry inside the static scene cache.
///
/// Offsets and length are in vertices.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct CacheSlot {
    pub scene_id: u32,
    pub vertex_offset: i32,
    pub uv_offset: i32,
    pub len: i32,
}

impl CacheSlot {
    /// Cached in scene `scene_id` with at least one encoded vertex.
    #[inline]
    pub fn is_resident(&self, scene_id: u32) -> bool {
        self.scene_id == scene_id && self.len > 0
    }
}

/// Scene tile coordinates (plane, x, y).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct TileCoord {
    pub plane: i32,
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub fn new(plane: i32, x: i32, y: i32) -> Self {
        Self { plane, x, y }
    }
}

/// A flat ground quad covering one tile.
///
/// Corner order for `heights` and `colors` is south-west, south-east,
/// north-east, north-west.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TilePaint {
    pub heights: [i32; 4],
    pub colors: [i32; 4],
    pub texture: Option<u16>,
    pub slot: Option<CacheSlot>,
}

impl TilePaint {
    /// An untextured level quad of a single colour.
    pub fn flat(height: i32, color: i32) -> Self {
        Self {
            heights: [height; 4],
            colors: [color; 4],
            texture: None,
            slot: None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.colors[3] == HIDDEN_TILE_COLOR
    }
}

/// One triangle of a [`TileModel`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileFace {
    pub indices: [u32; 3],
    pub colors: [i32; 3],
    pub texture: Option<u16>,
    pub uvs: [[f32; 2]; 3],
}

/// A shaped tile (slopes, walls blended into the ground), in tile-local
/// coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileModel {
    pub vertices: Vec<[i32; 3]>,
    pub faces: Vec<TileFace>,
    pub slot: Option<CacheSlot>,
}

/// One triangle of a [`Model`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Face {
    pub indices: [u32; 3],
    /// Per-vertex colours. `colors[2]` doubles as the shading marker
    /// ([`FLAT_SHADED`], [`HIDDEN_FACE`]).
    pub colors: [i32; 3],
    pub transparency: u8,
    pub priority: u8,
    pub texture: Option<u16>,
    pub uvs: [[f32; 2]; 3],
}

/// An arbitrary triangle mesh: scenery, characters, projectiles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub vertices: Vec<[i32; 3]>,
    pub faces: Vec<Face>,
    pub radius: i32,
    pub bounds: Bounds,
    pub slot: Option<CacheSlot>,
}

impl Model {
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// A model with any textured face writes UVs for every face.
    pub fn is_textured(&self) -> bool {
        self.faces.iter().any(|f| f.texture.is_some())
    }

    /// Recomputes `radius` and `bounds` from the vertex data.
    pub fn calculate_bounds(&mut self) {
        let mut max_height = 0i32;
        let mut max_sq = 0i64;
        for &[x, y, z] in &self.vertices {
            max_height = max_height.max(y.saturating_neg());
            max_sq = max_sq.max(x as i64 * x as i64 + z as i64 * z as i64);
        }
        let radius = (max_sq as f64).sqrt().ceil() as i32;
        self.radius = radius;
        self.bounds = Bounds {
            xyz_mag: radius,
            model_height: max_height,
        };
    }

    /// Resident slot for `scene_id`, if this model was uploaded with that scene.
    pub fn resident_slot(&self, scene_id: Option<u32>) -> Option<CacheSlot> {
        let id = scene_id?;
        self.slot.filter(|s| s.scene_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_from_vertices() {
        let mut m = Model {
            vertices: vec![[3, -10, 4], [-6, 0, 8], [0, -2, 0]],
            ..Default::default()
        };
        m.calculate_bounds();
        assert_eq!(m.radius, 10);
        assert_eq!(m.bounds.xyz_mag, 10);
        assert_eq!(m.bounds.model_height, 10);
    }

    #[test]
    fn extreme_heights_saturate() {
        let mut m = Model {
            vertices: vec![[0, i32::MIN, 0], [1, 0, 1]],
            ..Default::default()
        };
        m.calculate_bounds();
        assert_eq!(m.bounds.model_height, i32::MAX);
        assert_eq!(m.radius, 2);
    }

    #[test]
    fn slot_residency_requires_matching_scene_and_length() {
        let slot = CacheSlot {
            scene_id: 3,
            vertex_offset: 0,
            uv_offset: 0,
            len: 6,
        };
        assert!(slot.is_resident(3));
        assert!(!slot.is_resident(4));
        assert!(!CacheSlot { len: 0, ..slot }.is_resident(3));
    }

    #[test]
    fn resident_slot_without_scene() {
        let m = Model {
            slot: Some(CacheSlot {
                scene_id: 1,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(m.resident_slot(None).is_none());
        assert!(m.resident_slot(Some(2)).is_none());
        assert!(m.resident_slot(Some(1)).is_some());
    }
}
