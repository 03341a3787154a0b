use stratum_geometry::buffer::{BufferView, BufferWriter};
use stratum_geometry::command::MAX_TRIANGLES;
use stratum_geometry::encode::{encode_model, encode_tile_model, encode_tile_paint};
use stratum_geometry::model::CacheSlot;

use crate::host::{SceneEntry, SceneSource};

/// Encoded static geometry for one loaded scene.
#[derive(Debug)]
pub struct SceneUpload {
    pub scene_id: u32,
    pub vertices: BufferView<i32>,
    pub uvs: BufferView<f32>,
}

impl SceneUpload {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 4
    }
}

/// Tracks which scene the static buffers currently hold.
///
/// Each rebuild stamps a fresh id into every [`CacheSlot`] it writes, so
/// slots from an earlier scene stop matching as soon as the new upload lands.
#[derive(Debug, Default)]
pub struct SceneCache {
    scene_id: Option<u32>,
    next_id: u32,
}

impl SceneCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the scene currently resident on the GPU.
    pub fn scene_id(&self) -> Option<u32> {
        self.scene_id
    }

    /// Forgets the resident scene. Every slot becomes stale.
    pub fn invalidate(&mut self) {
        self.scene_id = None;
    }

    /// Encodes every static entry of `source` in local space and writes
    /// each entry's slot back. UVs are always padded so vertex and UV
    /// offsets coincide.
    pub fn rebuild(&mut self, source: &mut dyn SceneSource) -> SceneUpload {
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let scene_id = self.next_id;

        let mut vertices = BufferWriter::<i32>::new();
        let mut uvs = BufferWriter::<f32>::new();
        let mut offset = 0i32;
        let mut entries = 0usize;

        source.for_each_static(&mut |entry| {
            let start = offset;
            let len = match &entry {
                SceneEntry::Paint(paint) => encode_tile_paint(paint, [0; 3], &mut vertices, &mut uvs, true),
                SceneEntry::TileModel(model) => {
                    encode_tile_model(model, [0; 3], &mut vertices, &mut uvs, true)
                }
                SceneEntry::Model(model) => {
                    encode_model(model, MAX_TRIANGLES as usize, &mut vertices, &mut uvs, true)
                }
            } as i32;
            offset += len;
            entries += 1;

            let slot = Some(CacheSlot {
                scene_id,
                vertex_offset: start,
                uv_offset: start,
                len,
            });
            match entry {
                SceneEntry::Paint(paint) => paint.slot = slot,
                SceneEntry::TileModel(model) => model.slot = slot,
                SceneEntry::Model(model) => model.slot = slot,
            }
        });

        log::debug!("scene {scene_id}: {entries} static entries, {offset} vertices");

        self.scene_id = Some(scene_id);
        SceneUpload {
            scene_id,
            vertices: vertices.finish(),
            uvs: uvs.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use stratum_geometry::model::{Face, Model, TileCoord, TileFace, TileModel, TilePaint, HIDDEN_TILE_COLOR};
    use stratum_geometry::perspective::{Bounds, ClipBounds, Placement, ViewRotation};

    use super::*;
    use crate::config::RenderMode;
    use crate::host::{Camera, SceneView};
    use crate::scene::{BatchBuilder, DispatchCounts, DrawCallbacks};

    #[derive(Default)]
    struct Scene {
        paints: Vec<TilePaint>,
        tiles: Vec<TileModel>,
        models: Vec<Model>,
    }

    impl SceneSource for Scene {
        fn for_each_static(&mut self, visit: &mut dyn FnMut(SceneEntry<'_>)) {
            self.paints.iter_mut().for_each(|p| visit(SceneEntry::Paint(p)));
            self.tiles.iter_mut().for_each(|t| visit(SceneEntry::TileModel(t)));
            self.models.iter_mut().for_each(|m| visit(SceneEntry::Model(m)));
        }
    }

    fn triangle_model() -> Model {
        Model {
            vertices: vec![[0, 0, 0], [10, 0, 0], [0, 0, 10]],
            faces: vec![Face {
                indices: [0, 1, 2],
                colors: [7, 7, 7],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn slots_are_written_back_in_order() {
        let mut scene = Scene {
            paints: vec![TilePaint::flat(0, 1), TilePaint::flat(0, 2)],
            models: vec![triangle_model()],
            ..Default::default()
        };
        let mut cache = SceneCache::new();
        let upload = cache.rebuild(&mut scene);

        assert_eq!(upload.scene_id, 1);
        assert_eq!(cache.scene_id(), Some(1));
        assert_eq!(upload.vertex_count(), 15);
        assert_eq!(upload.uvs.len(), upload.vertices.len());

        let second = scene.paints[1].slot.unwrap();
        assert_eq!((second.vertex_offset, second.uv_offset, second.len), (6, 6, 6));
        let model = scene.models[0].slot.unwrap();
        assert_eq!((model.vertex_offset, model.len), (12, 3));
        assert!(model.is_resident(1));
    }

    #[test]
    fn hidden_paint_gets_an_empty_slot() {
        let mut hidden = TilePaint::flat(0, 1);
        hidden.colors[3] = HIDDEN_TILE_COLOR;
        let mut scene = Scene {
            paints: vec![hidden],
            ..Default::default()
        };
        let mut cache = SceneCache::new();
        cache.rebuild(&mut scene);
        let slot = scene.paints[0].slot.unwrap();
        assert_eq!(slot.len, 0);
        assert!(!slot.is_resident(1));
    }

    #[test]
    fn rebuild_invalidates_previous_slots() {
        let mut first = Scene {
            models: vec![triangle_model()],
            ..Default::default()
        };
        let mut cache = SceneCache::new();
        cache.rebuild(&mut first);
        let mut second = Scene::default();
        let upload = cache.rebuild(&mut second);

        assert_eq!(upload.scene_id, 2);
        assert!(upload.vertices.is_empty());
        assert!(first.models[0].resident_slot(cache.scene_id()).is_none());
    }

    #[test]
    fn invalidate_forgets_the_scene() {
        let mut cache = SceneCache::new();
        cache.rebuild(&mut Scene::default());
        cache.invalidate();
        assert_eq!(cache.scene_id(), None);
    }

    fn mesh(triangles: usize) -> Model {
        let mut m = triangle_model();
        m.faces = vec![m.faces[0].clone(); triangles];
        m.radius = 64;
        m.bounds = Bounds {
            xyz_mag: 64,
            model_height: 64,
        };
        m
    }

    #[test]
    fn cached_frame_output_matches_cached_geometry() {
        let face = TileFace {
            indices: [0, 1, 2],
            colors: [5, 5, 5],
            ..Default::default()
        };
        let mut scene = Scene {
            paints: (1..=4).map(|c| TilePaint::flat(0, c)).collect(),
            tiles: vec![TileModel {
                vertices: vec![[0, 0, 0], [128, 0, 0], [0, 0, 128]],
                faces: vec![face; 3],
                slot: None,
            }],
            models: vec![mesh(700), mesh(10)],
        };
        let mut cache = SceneCache::new();
        let upload = cache.rebuild(&mut scene);
        assert_eq!(upload.vertex_count(), 4 * 6 + 3 * 3 + 700 * 3 + 10 * 3);

        let mut batch = BatchBuilder::new(RenderMode::Compute);
        batch.set_scene_id(Some(upload.scene_id));
        batch.draw_scene(&SceneView {
            camera: Camera {
                zoom: 512,
                ..Default::default()
            },
            clip: ClipBounds::centered(512, 334),
        });

        for (x, paint) in scene.paints.iter().enumerate() {
            batch.draw_scene_paint(paint, TileCoord::new(0, x as i32, 0));
        }
        batch.draw_scene_model(&scene.tiles[0], TileCoord::new(0, 0, 1));
        let placement = Placement {
            rotation: ViewRotation::from_angles(0, 0),
            z: 1000,
            ..Default::default()
        };
        for (hash, model) in scene.models.iter_mut().enumerate() {
            batch.draw(model, placement, hash as u64, &mut ());
        }

        let frame = batch.finish();
        assert!(frame.vertices.is_empty());
        assert_eq!(frame.output_vertices as usize, upload.vertex_count());
        assert_eq!(
            frame.dispatch_counts(),
            DispatchCounts {
                unordered: 5,
                small: 1,
                large: 1
            }
        );
    }
}
