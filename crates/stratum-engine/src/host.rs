//! Contracts between the renderer and the host engine.
//!
//! The host owns the canvas, the scene graph, the UI layer and the texture
//! catalogue. The renderer only reads them through these traits.

use std::sync::Arc;

use image::RgbaImage;
use winit::window::{Window, WindowId};

use stratum_geometry::model::{Model, TileModel, TilePaint};
use stratum_geometry::perspective::{ClipBounds, Placement};

use crate::render::Screenshot;

/// Host lifecycle as far as rendering cares.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GameState {
    Starting,
    LoginScreen,
    Loading,
    LoggedIn,
    ConnectionLost,
    Hopping,
}

impl GameState {
    /// Scene data is being swapped; frames are skipped.
    pub fn is_transitioning(self) -> bool {
        matches!(self, GameState::Loading | GameState::Hopping)
    }
}

/// Camera state for one frame. Angles are engine units; position is world
/// units.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Camera {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub pitch: i32,
    pub yaw: i32,
    /// 3D zoom (projection scale).
    pub zoom: i32,
    pub center_x: i32,
    pub center_y: i32,
}

/// Passed to [`crate::scene::DrawCallbacks::draw_scene`] before any entity.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SceneView {
    pub camera: Camera,
    pub clip: ClipBounds,
}

/// Game viewport inside the canvas, in canvas pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ViewportRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// The 2D UI layer: one `0xAARRGGBB` value per pixel, premultiplied.
#[derive(Debug, Copy, Clone)]
pub struct InterfacePixels<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u32],
}

pub type TextureId = u16;

/// Number of texture slots the scene shader can animate.
pub const MAX_TEXTURES: usize = 128;

/// Square RGBA8 layers for the scene texture array.
#[derive(Debug, Clone)]
pub struct TextureArrayData {
    pub size: u32,
    pub layers: Vec<Vec<u8>>,
}

/// Texture catalogue owned by the host.
pub trait TextureArrayProvider {
    /// Texture pixels once every texture is loaded; `None` until then.
    fn init_texture_array(&mut self) -> Option<TextureArrayData>;

    /// Advances a texture's animation by `diff` ticks.
    fn animate(&mut self, texture: TextureId, diff: i32);

    /// Current UV scroll of texture `id`, marking it as in use so it keeps
    /// animating. `None` for empty slots.
    fn uv_offset(&mut self, id: usize) -> Option<[f32; 2]>;

    fn brightness(&self) -> f64;
}

/// One piece of static scene geometry offered to the scene cache.
///
/// The cache writes the resulting [`stratum_geometry::CacheSlot`] back.
/// Geometry is cached in its local space; tiles and models are positioned
/// by the draw commands that reference it.
pub enum SceneEntry<'a> {
    Paint(&'a mut TilePaint),
    TileModel(&'a mut TileModel),
    Model(&'a mut Model),
}

/// Static geometry of the loaded scene.
pub trait SceneSource {
    fn for_each_static(&mut self, visit: &mut dyn FnMut(SceneEntry<'_>));
}

/// Hit testing for drawn entities.
pub trait ClickboxTest {
    fn check_clickbox(&mut self, model: &Model, placement: &Placement, hash: u64);
}

impl ClickboxTest for () {
    fn check_clickbox(&mut self, _: &Model, _: &Placement, _: u64) {}
}

/// Receives composited frames for a secondary display. Called from a
/// background thread.
pub trait MirrorSink: Send + Sync {
    fn present(&self, frame: RgbaImage);
}

/// Mouse input routed through the renderer.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct MouseEvent {
    pub x: i32,
    pub y: i32,
}

/// Mouse listener chain. Events not consumed are passed through unchanged.
pub trait MouseListener {
    fn mouse_moved(&mut self, event: MouseEvent) -> MouseEvent {
        event
    }
    fn mouse_dragged(&mut self, event: MouseEvent) -> MouseEvent {
        event
    }
    fn mouse_pressed(&mut self, event: MouseEvent) -> MouseEvent {
        event
    }
    fn mouse_released(&mut self, event: MouseEvent) -> MouseEvent {
        event
    }
    fn mouse_clicked(&mut self, event: MouseEvent) -> MouseEvent {
        event
    }
    fn mouse_entered(&mut self, event: MouseEvent) -> MouseEvent {
        event
    }
    fn mouse_exited(&mut self, event: MouseEvent) -> MouseEvent {
        event
    }
}

/// Everything the renderer reads from the host each frame.
pub trait HostClient {
    /// The canvas to render into; `None` while it is not displayable.
    fn canvas(&self) -> Option<Arc<Window>>;

    /// Identity of the canvas the host currently renders through.
    fn canvas_id(&self) -> Option<WindowId> {
        self.canvas().map(|w| w.id())
    }

    fn game_state(&self) -> GameState;

    /// Canvas size in logical pixels.
    fn canvas_size(&self) -> (u32, u32);

    fn viewport(&self) -> ViewportRect;

    /// Size the canvas is stretched to, when UI stretching is active.
    fn stretched_size(&self) -> Option<(u32, u32)> {
        None
    }

    /// Physical pixels per logical pixel.
    fn scale_factor(&self) -> f64 {
        self.canvas().map_or(1.0, |w| w.scale_factor())
    }

    /// Sky colour as `0xRRGGBB`.
    fn sky_color(&self) -> u32;

    fn interface(&self) -> InterfacePixels<'_>;

    fn textures(&mut self) -> &mut dyn TextureArrayProvider;

    fn scene(&mut self) -> &mut dyn SceneSource;

    /// Secondary display for mirrored frames, when mirroring is on.
    fn mirror(&self) -> Option<Arc<dyn MirrorSink>> {
        None
    }

    /// Ask for a frame readback with the next `draw_complete`.
    fn wants_screenshot(&self) -> bool {
        false
    }

    /// Called after every presented frame. The screenshot is read back only
    /// if the host asks for it.
    fn draw_complete(&mut self, screenshot: &mut Screenshot<'_>) {
        let _ = screenshot;
    }
}
