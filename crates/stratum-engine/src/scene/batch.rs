//! Per-frame batch builder.
//!
//! Collects everything the host draws in a frame into staging buffers and
//! three command lists, one per compute pass. The frame orchestrator flips
//! the builder into a [`FrameBatch`] for upload and hands it back afterwards.

use std::mem;

use stratum_geometry::buffer::{BufferView, BufferWriter};
use stratum_geometry::command::{
    clamp_triangles, pack_flags, Bucket, DrawCommand, FLAG_SCENE_BUFFER, MAX_TRIANGLES, NO_UV,
};
use stratum_geometry::encode::{encode_face, encode_model, encode_tile_model, encode_tile_paint};
use stratum_geometry::model::{Model, TileCoord, TileModel, TilePaint};
use stratum_geometry::perspective::{is_visible, Placement, LOCAL_TILE_SIZE};

use crate::config::RenderMode;
use crate::host::{ClickboxTest, SceneView, TextureId};

use super::callbacks::{DrawCallbacks, Renderable};

/// Bytes per output vertex (four 32-bit components).
pub const VERTEX_STRIDE: u64 = 16;

/// Translation and orientation of the model currently drawn face by face.
#[derive(Debug, Copy, Clone)]
struct FaceTarget {
    offset: [i32; 3],
    orientation: i32,
}

/// Workgroups each compute pass needs this frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DispatchCounts {
    pub unordered: u32,
    pub small: u32,
    pub large: u32,
}

/// A finished frame, ready for upload.
#[derive(Debug)]
pub struct FrameBatch {
    pub vertices: BufferView<i32>,
    pub uvs: BufferView<f32>,
    pub unordered: BufferView<DrawCommand>,
    pub small: BufferView<DrawCommand>,
    pub large: BufferView<DrawCommand>,
    /// Vertices the draw covers: compute output in compute mode, staging
    /// vertices otherwise.
    pub output_vertices: u32,
}

impl FrameBatch {
    pub fn dispatch_counts(&self) -> DispatchCounts {
        DispatchCounts {
            unordered: self.unordered.len() as u32,
            small: self.small.len() as u32,
            large: self.large.len() as u32,
        }
    }

    pub fn commands(&self, bucket: Bucket) -> &BufferView<DrawCommand> {
        match bucket {
            Bucket::Unordered => &self.unordered,
            Bucket::Small => &self.small,
            Bucket::Large => &self.large,
        }
    }

    /// Size of each compute output buffer.
    pub fn output_bytes(&self) -> u64 {
        self.output_vertices as u64 * VERTEX_STRIDE
    }
}

pub struct BatchBuilder {
    mode: RenderMode,
    draw_distance: i32,
    scene_id: Option<u32>,
    view: SceneView,

    vertices: BufferWriter<i32>,
    uvs: BufferWriter<f32>,
    unordered: BufferWriter<DrawCommand>,
    small: BufferWriter<DrawCommand>,
    large: BufferWriter<DrawCommand>,

    temp_offset: i32,
    temp_uv_offset: i32,
    output_offset: i32,

    drawing: Option<FaceTarget>,
    animations: Vec<(TextureId, i32)>,
}

impl BatchBuilder {
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            draw_distance: mode.max_draw_distance(),
            scene_id: None,
            view: SceneView::default(),
            vertices: BufferWriter::new(),
            uvs: BufferWriter::new(),
            unordered: BufferWriter::with_capacity(1024),
            small: BufferWriter::with_capacity(1024),
            large: BufferWriter::with_capacity(256),
            temp_offset: 0,
            temp_uv_offset: 0,
            output_offset: 0,
            drawing: None,
            animations: Vec::new(),
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Clamps and stores the configured draw distance for this frame.
    pub fn set_draw_distance(&mut self, configured: i32) {
        self.draw_distance = self.mode.clamp_draw_distance(configured);
    }

    /// Scene id of the currently uploaded static cache.
    pub fn set_scene_id(&mut self, scene_id: Option<u32>) {
        self.scene_id = scene_id;
    }

    pub fn view(&self) -> &SceneView {
        &self.view
    }

    /// Texture animations queued since the last call.
    pub fn take_animations(&mut self) -> Vec<(TextureId, i32)> {
        mem::take(&mut self.animations)
    }

    /// Flips the staging buffers into a read-only batch.
    pub fn finish(&mut self) -> FrameBatch {
        FrameBatch {
            vertices: mem::replace(&mut self.vertices, BufferWriter::empty()).finish(),
            uvs: mem::replace(&mut self.uvs, BufferWriter::empty()).finish(),
            unordered: mem::replace(&mut self.unordered, BufferWriter::empty()).finish(),
            small: mem::replace(&mut self.small, BufferWriter::empty()).finish(),
            large: mem::replace(&mut self.large, BufferWriter::empty()).finish(),
            output_vertices: self.output_offset.max(0) as u32,
        }
    }

    /// Takes a consumed batch back and rewinds every cursor and offset.
    pub fn recycle(&mut self, batch: FrameBatch) {
        self.vertices = batch.vertices.reset();
        self.uvs = batch.uvs.reset();
        self.unordered = batch.unordered.reset();
        self.small = batch.small.reset();
        self.large = batch.large.reset();
        self.reset_offsets();
    }

    /// Drops everything drawn since the last frame without uploading it.
    pub fn discard(&mut self) {
        self.vertices.clear();
        self.uvs.clear();
        self.unordered.clear();
        self.small.clear();
        self.large.clear();
        self.reset_offsets();
    }

    fn reset_offsets(&mut self) {
        self.temp_offset = 0;
        self.temp_uv_offset = 0;
        self.output_offset = 0;
        self.drawing = None;
    }

    fn visible(&self, model: &Model, placement: &Placement) -> bool {
        is_visible(model.bounds, placement, &self.view.clip, self.view.camera.zoom)
    }

    fn world_position(&self, placement: &Placement) -> [i32; 3] {
        let camera = &self.view.camera;
        [
            placement.x.wrapping_add(camera.x),
            placement.y.wrapping_add(camera.y),
            placement.z.wrapping_add(camera.z),
        ]
    }

    fn commands_mut(&mut self, bucket: Bucket) -> &mut BufferWriter<DrawCommand> {
        match bucket {
            Bucket::Unordered => &mut self.unordered,
            Bucket::Small => &mut self.small,
            Bucket::Large => &mut self.large,
        }
    }

    fn draw_legacy(
        &mut self,
        renderable: &mut dyn Renderable,
        placement: Placement,
        hash: u64,
        clickbox: &mut dyn ClickboxTest,
    ) {
        let faces = {
            let Some(model) = renderable.model() else { return };
            if !self.visible(model, &placement) {
                return;
            }
            clickbox.check_clickbox(model, &placement, hash);
            model.triangle_count()
        };

        self.vertices.ensure_capacity(12 * faces);
        self.uvs.ensure_capacity(12 * faces);

        self.drawing = Some(FaceTarget {
            offset: self.world_position(&placement),
            orientation: placement.orientation,
        });
        renderable.render_faces(self);
        self.drawing = None;
    }

    fn draw_compute(
        &mut self,
        model: &Model,
        placement: Placement,
        hash: u64,
        clickbox: &mut dyn ClickboxTest,
    ) {
        if !self.visible(model, &placement) {
            return;
        }
        clickbox.check_clickbox(model, &placement, hash);

        let [tx, ty, tz] = self.world_position(&placement);

        if let Some(slot) = model.resident_slot(self.scene_id) {
            let triangles = clamp_triangles(slot.len / 3);
            if triangles == 0 {
                return;
            }
            let command = DrawCommand {
                vertex_offset: slot.vertex_offset,
                uv_offset: slot.uv_offset,
                triangle_count: triangles,
                output_offset: self.output_offset,
                flags: FLAG_SCENE_BUFFER | pack_flags(model.radius, placement.orientation),
                translate_x: tx,
                translate_y: ty,
                translate_z: tz,
            };
            self.commands_mut(Bucket::for_triangles(triangles)).put(command);
            self.output_offset += triangles * 3;
            return;
        }

        let faces = model.triangle_count().min(MAX_TRIANGLES as usize);
        let textured = model.is_textured();
        let len = encode_model(model, faces, &mut self.vertices, &mut self.uvs, false) as i32;

        let command = DrawCommand {
            vertex_offset: self.temp_offset,
            uv_offset: if textured { self.temp_uv_offset } else { NO_UV },
            triangle_count: len / 3,
            output_offset: self.output_offset,
            flags: pack_flags(model.radius, placement.orientation),
            translate_x: tx,
            translate_y: ty,
            translate_z: tz,
        };
        self.commands_mut(Bucket::for_triangles(faces as i32)).put(command);

        self.temp_offset += len;
        if textured {
            self.temp_uv_offset += len;
        }
        self.output_offset += len;
    }

    fn push_unordered(&mut self, vertex_offset: i32, uv_offset: i32, triangles: i32, tile: TileCoord) {
        self.unordered.put(DrawCommand {
            vertex_offset,
            uv_offset,
            triangle_count: triangles,
            output_offset: self.output_offset,
            flags: FLAG_SCENE_BUFFER,
            translate_x: tile.x * LOCAL_TILE_SIZE,
            translate_y: 0,
            translate_z: tile.y * LOCAL_TILE_SIZE,
        });
        self.output_offset += triangles * 3;
    }
}

fn tile_origin(tile: TileCoord) -> [i32; 3] {
    [tile.x * LOCAL_TILE_SIZE, 0, tile.y * LOCAL_TILE_SIZE]
}

impl DrawCallbacks for BatchBuilder {
    fn draw_scene(&mut self, view: &SceneView) {
        self.view = *view;
    }

    fn draw_scene_paint(&mut self, paint: &TilePaint, tile: TileCoord) {
        match self.mode {
            RenderMode::Legacy => {
                let len =
                    encode_tile_paint(paint, tile_origin(tile), &mut self.vertices, &mut self.uvs, true);
                self.output_offset += len as i32;
            }
            RenderMode::Compute => {
                let Some(slot) = paint.slot.filter(|s| self.scene_id.is_some_and(|id| s.is_resident(id)))
                else {
                    return;
                };
                self.push_unordered(slot.vertex_offset, slot.uv_offset, 2, tile);
            }
        }
    }

    fn draw_scene_model(&mut self, model: &TileModel, tile: TileCoord) {
        match self.mode {
            RenderMode::Legacy => {
                let len =
                    encode_tile_model(model, tile_origin(tile), &mut self.vertices, &mut self.uvs, true);
                self.output_offset += len as i32;
            }
            RenderMode::Compute => {
                let Some(slot) = model.slot.filter(|s| self.scene_id.is_some_and(|id| s.is_resident(id)))
                else {
                    return;
                };
                self.push_unordered(slot.vertex_offset, slot.uv_offset, slot.len / 3, tile);
            }
        }
    }

    fn draw(
        &mut self,
        renderable: &mut dyn Renderable,
        placement: Placement,
        hash: u64,
        clickbox: &mut dyn ClickboxTest,
    ) {
        match self.mode {
            RenderMode::Legacy => self.draw_legacy(renderable, placement, hash, clickbox),
            RenderMode::Compute => {
                if let Some(model) = renderable.model() {
                    self.draw_compute(model, placement, hash, clickbox);
                }
            }
        }
    }

    fn draw_face(&mut self, model: &Model, face: usize) -> bool {
        let Some(target) = self.drawing else {
            return false;
        };
        let len = encode_face(
            model,
            face,
            target.offset,
            target.orientation,
            &mut self.vertices,
            &mut self.uvs,
            true,
        );
        self.output_offset += len as i32;
        true
    }

    fn animate(&mut self, texture: TextureId, diff: i32) {
        self.animations.push((texture, diff));
    }

    fn draw_distance(&self) -> i32 {
        self.draw_distance
    }
}
