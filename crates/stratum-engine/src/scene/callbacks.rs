use stratum_geometry::model::{Model, TileCoord, TileModel, TilePaint};
use stratum_geometry::perspective::Placement;

use crate::host::{ClickboxTest, SceneView, TextureId};

/// Draw entry points the host calls while traversing its scene.
///
/// Call order per frame: `draw_scene` once, then any mix of the entity
/// callbacks. `draw_face` is only accepted while `draw` is rendering a model
/// on the CPU-ordered path.
pub trait DrawCallbacks {
    fn draw_scene(&mut self, view: &SceneView);

    fn draw_scene_paint(&mut self, paint: &TilePaint, tile: TileCoord);

    fn draw_scene_model(&mut self, model: &TileModel, tile: TileCoord);

    fn draw(
        &mut self,
        renderable: &mut dyn Renderable,
        placement: Placement,
        hash: u64,
        clickbox: &mut dyn ClickboxTest,
    );

    /// Returns `false` when called outside a model draw.
    fn draw_face(&mut self, model: &Model, face: usize) -> bool;

    fn animate(&mut self, texture: TextureId, diff: i32);

    /// Draw distance in tiles the host should traverse this frame.
    fn draw_distance(&self) -> i32;
}

/// Anything the host can draw at a placement.
pub trait Renderable {
    fn model(&self) -> Option<&Model>;

    /// Emits faces in paint order through `draw_face`.
    fn render_faces(&mut self, callbacks: &mut dyn DrawCallbacks) {
        if let Some(model) = self.model() {
            for face in 0..model.triangle_count() {
                callbacks.draw_face(model, face);
            }
        }
    }
}

impl Renderable for Model {
    fn model(&self) -> Option<&Model> {
        Some(self)
    }
}
