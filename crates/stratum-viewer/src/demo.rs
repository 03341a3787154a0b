//! Procedural scene: rolling terrain with a few pillars.

use stratum_engine::host::{SceneEntry, SceneSource, TextureArrayData, TextureArrayProvider, TextureId};
use stratum_geometry::model::{Face, Model, TileCoord, TilePaint, FLAT_SHADED};
use stratum_geometry::perspective::{cosine, sine, LOCAL_TILE_SIZE};

/// Tiles per side.
pub const GRID: i32 = 48;

/// Packs a 16-bit engine colour.
pub fn hsl(hue: i32, saturation: i32, lightness: i32) -> i32 {
    (hue & 63) << 10 | (saturation & 7) << 7 | (lightness & 127)
}

/// Ground height at a tile corner. Negative is up.
fn height(x: i32, y: i32) -> i32 {
    -((sine(x * 80) >> 10) + (cosine(y * 56) >> 10) + 64)
}

fn ground_color(h: i32) -> i32 {
    hsl(14, 4, (40 - h / 4).clamp(10, 110))
}

/// An axis-aligned box standing on its origin.
pub fn cuboid(half: i32, tall: i32, color: i32, texture: Option<u16>) -> Model {
    let vertices = vec![
        [-half, 0, -half],
        [half, 0, -half],
        [half, 0, half],
        [-half, 0, half],
        [-half, -tall, -half],
        [half, -tall, -half],
        [half, -tall, half],
        [-half, -tall, half],
    ];
    let face = |indices: [u32; 3], shade: i32| Face {
        indices,
        colors: [color + shade, FLAT_SHADED, FLAT_SHADED],
        transparency: 0,
        priority: 0,
        texture,
        uvs: [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
    };

    let mut faces = vec![face([6, 7, 5], 8), face([4, 5, 7], 8)];
    for side in 0..4u32 {
        let (a, b) = (side, (side + 1) % 4);
        let shade = -(side as i32) * 3;
        faces.push(face([a, b, b + 4], shade));
        faces.push(face([a, b + 4, a + 4], shade));
    }

    let mut model = Model {
        vertices,
        faces,
        ..Default::default()
    };
    model.calculate_bounds();
    model
}

pub struct DemoScene {
    pub tiles: Vec<(TileCoord, TilePaint)>,
    pub pillars: Vec<([i32; 3], Model)>,
}

impl DemoScene {
    pub fn generate() -> Self {
        let mut tiles = Vec::with_capacity((GRID * GRID) as usize);
        for y in 0..GRID {
            for x in 0..GRID {
                let heights = [height(x, y), height(x + 1, y), height(x + 1, y + 1), height(x, y + 1)];
                let paint = TilePaint {
                    heights,
                    colors: heights.map(ground_color),
                    texture: ((x * 7 + y * 3) % 11 == 0).then_some(0),
                    slot: None,
                };
                tiles.push((TileCoord::new(0, x, y), paint));
            }
        }

        let pillars = (0..6)
            .map(|i| {
                let (tx, ty) = (8 + i * 6, 10 + (i * 13) % 28);
                let world = [
                    tx * LOCAL_TILE_SIZE + LOCAL_TILE_SIZE / 2,
                    height(tx, ty),
                    ty * LOCAL_TILE_SIZE + LOCAL_TILE_SIZE / 2,
                ];
                (world, cuboid(40, 200 + i * 40, hsl(i * 9, 5, 64), (i % 2 == 0).then_some(1)))
            })
            .collect();

        Self { tiles, pillars }
    }

    /// World position of the scene's centre, at ground level.
    pub fn center(&self) -> [i32; 3] {
        let mid = GRID * LOCAL_TILE_SIZE / 2;
        [mid, height(GRID / 2, GRID / 2), mid]
    }
}

impl SceneSource for DemoScene {
    fn for_each_static(&mut self, visit: &mut dyn FnMut(SceneEntry<'_>)) {
        for (_, paint) in &mut self.tiles {
            visit(SceneEntry::Paint(paint));
        }
        for (_, model) in &mut self.pillars {
            visit(SceneEntry::Model(model));
        }
    }
}

/// Two checkerboard layers; the second scrolls.
#[derive(Default)]
pub struct DemoTextures {
    scroll: f32,
}

const TEXTURE_SIZE: u32 = 32;

fn checker(a: [u8; 4], b: [u8; 4]) -> Vec<u8> {
    (0..TEXTURE_SIZE * TEXTURE_SIZE)
        .flat_map(|i| {
            let (x, y) = (i % TEXTURE_SIZE, i / TEXTURE_SIZE);
            if (x / 8 + y / 8) % 2 == 0 { a } else { b }
        })
        .collect()
}

impl TextureArrayProvider for DemoTextures {
    fn init_texture_array(&mut self) -> Option<TextureArrayData> {
        Some(TextureArrayData {
            size: TEXTURE_SIZE,
            layers: vec![
                checker([120, 110, 90, 255], [90, 80, 60, 255]),
                checker([200, 200, 210, 255], [60, 70, 120, 255]),
            ],
        })
    }

    fn animate(&mut self, texture: TextureId, diff: i32) {
        if texture == 1 {
            self.scroll = (self.scroll + diff as f32 / 128.0).fract();
        }
    }

    fn uv_offset(&mut self, id: usize) -> Option<[f32; 2]> {
        match id {
            0 => Some([0.0, 0.0]),
            1 => Some([0.0, self.scroll]),
            _ => None,
        }
    }

    fn brightness(&self) -> f64 {
        0.8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_source_visits_every_static_entry() {
        let mut scene = DemoScene::generate();
        let mut visited = 0;
        scene.for_each_static(&mut |_| visited += 1);
        assert_eq!(visited, (GRID * GRID) as usize + scene.pillars.len());
    }

    #[test]
    fn cuboid_has_bounds() {
        let model = cuboid(40, 200, hsl(1, 2, 3), None);
        assert_eq!(model.triangle_count(), 10);
        assert_eq!(model.bounds.model_height, 200);
        assert!(model.radius >= 56);
    }
}
