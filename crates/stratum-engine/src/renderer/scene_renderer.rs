use anyhow::{Context, Result};

use crate::config::{RenderMode, RendererConfig};
use crate::device::{Gpu, GpuInit};
use crate::host::{GameState, HostClient, MouseEvent, MouseListener};
use crate::scene::{BatchBuilder, DrawCallbacks};

use super::frame::{FrameInputs, FrameOutcome, ReadyState};
use super::mirror::MirrorTask;
use super::mouse::MouseTracker;

enum RendererState {
    Uninitialized,
    Ready(Box<ReadyState>),
    Disabled,
}

/// The renderer as the host sees it.
///
/// ```text
/// Uninitialized --start_up--> Ready | Disabled
/// Ready --shut_down--> Uninitialized
/// ```
///
/// The host draws through [`SceneRenderer::callbacks`] between frames and
/// calls [`SceneRenderer::draw_frame`] once per frame.
pub struct SceneRenderer {
    config: RendererConfig,
    gpu_init: GpuInit,
    state: RendererState,
    batch: BatchBuilder,
    mouse: MouseTracker,
    mirror: MirrorTask,
}

impl SceneRenderer {
    pub fn new(config: RendererConfig, gpu_init: GpuInit) -> Self {
        let mode = RenderMode::resolve(config.use_compute, true);
        Self {
            batch: BatchBuilder::new(mode),
            config,
            gpu_init,
            state: RendererState::Uninitialized,
            mouse: MouseTracker::default(),
            mirror: MirrorTask::default(),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Options are read every frame. `use_compute` only takes effect at the
    /// next startup.
    pub fn config_mut(&mut self) -> &mut RendererConfig {
        &mut self.config
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RendererState::Ready(_))
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.state, RendererState::Disabled)
    }

    /// Mode latched at startup; `None` while not running.
    pub fn mode(&self) -> Option<RenderMode> {
        match &self.state {
            RendererState::Ready(ready) => Some(ready.mode()),
            _ => None,
        }
    }

    /// Where the host sends its draw calls.
    pub fn callbacks(&mut self) -> &mut dyn DrawCallbacks {
        &mut self.batch
    }

    /// Acquires the device for the host's canvas and builds every pipeline
    /// and persistent buffer. Any failure releases what was built, leaves
    /// the renderer disabled and is returned to the host.
    pub fn start_up(&mut self, host: &mut dyn HostClient) -> Result<()> {
        self.shut_down();

        match self.try_start_up(host) {
            Ok(ready) => {
                log::info!("renderer started in {:?} mode", ready.mode());
                self.state = RendererState::Ready(ready);
                Ok(())
            }
            Err(err) => {
                log::error!("renderer startup failed: {err:#}");
                self.state = RendererState::Disabled;
                Err(err)
            }
        }
    }

    fn try_start_up(&mut self, host: &mut dyn HostClient) -> Result<Box<ReadyState>> {
        let canvas = host.canvas().context("canvas is not displayable")?;
        let gpu = pollster::block_on(Gpu::new(canvas, self.gpu_init.clone())).context("GPU initialization failed")?;

        let mode = RenderMode::resolve(self.config.use_compute, gpu.supports_compute());
        if self.config.use_compute && mode == RenderMode::Legacy {
            log::warn!("adapter has no compute support; using CPU-ordered rendering");
        }

        let mut ready = Box::new(ReadyState::new(gpu, mode, &self.config)?);
        self.batch = BatchBuilder::new(mode);
        self.batch.set_draw_distance(self.config.draw_distance);
        if host.game_state() == GameState::LoggedIn {
            ready.upload_scene(host, &mut self.batch);
        }
        Ok(ready)
    }

    /// Releases every GPU object and returns to `Uninitialized`. Safe to
    /// call in any state, any number of times.
    pub fn shut_down(&mut self) {
        if let RendererState::Ready(mut ready) = std::mem::replace(&mut self.state, RendererState::Uninitialized) {
            ready.release();
            log::info!("renderer shut down");
        }
        self.state = RendererState::Uninitialized;
        self.batch.discard();
        self.batch.set_scene_id(None);
    }

    /// Rebuilds the static scene cache when the host finishes loading a
    /// scene.
    pub fn on_game_state_changed(&mut self, state: GameState, host: &mut dyn HostClient) {
        if let (GameState::LoggedIn, RendererState::Ready(ready)) = (state, &mut self.state) {
            ready.upload_scene(host, &mut self.batch);
        }
    }

    /// Renders and presents one frame from everything drawn since the last
    /// call.
    pub fn draw_frame(&mut self, host: &mut dyn HostClient) -> FrameOutcome {
        let canvas_id = host.canvas_id();
        let RendererState::Ready(ready) = &mut self.state else {
            self.batch.discard();
            return FrameOutcome::Inactive;
        };

        if canvas_id != Some(ready.canvas_id()) {
            log::warn!("canvas changed; restarting renderer");
            // start_up logs and records its own failure.
            let _ = self.start_up(host);
            return FrameOutcome::Restarted;
        }

        let inputs = FrameInputs {
            config: &self.config,
            batch: &mut self.batch,
            mirror: &mut self.mirror,
            cursor: self.mouse.position(),
        };
        match ready.render(host, inputs) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("renderer disabled: {err:#}");
                self.shut_down();
                self.state = RendererState::Disabled;
                FrameOutcome::Inactive
            }
        }
    }
}

impl Drop for SceneRenderer {
    fn drop(&mut self) {
        self.shut_down();
    }
}

impl MouseListener for SceneRenderer {
    fn mouse_moved(&mut self, event: MouseEvent) -> MouseEvent {
        self.mouse.mouse_moved(event)
    }

    fn mouse_dragged(&mut self, event: MouseEvent) -> MouseEvent {
        self.mouse.mouse_dragged(event)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stratum_geometry::model::{TileCoord, TilePaint};
    use winit::window::Window;

    use crate::host::{
        InterfacePixels, SceneSource, TextureArrayData, TextureArrayProvider, TextureId, ViewportRect,
    };

    use super::*;

    struct NoTextures;

    impl TextureArrayProvider for NoTextures {
        fn init_texture_array(&mut self) -> Option<TextureArrayData> {
            None
        }
        fn animate(&mut self, _: TextureId, _: i32) {}
        fn uv_offset(&mut self, _: usize) -> Option<[f32; 2]> {
            None
        }
        fn brightness(&self) -> f64 {
            0.8
        }
    }

    struct EmptyScene;

    impl SceneSource for EmptyScene {
        fn for_each_static(&mut self, _: &mut dyn FnMut(crate::host::SceneEntry<'_>)) {}
    }

    /// A host whose canvas is never displayable.
    struct HeadlessHost {
        textures: NoTextures,
        scene: EmptyScene,
    }

    impl HostClient for HeadlessHost {
        fn canvas(&self) -> Option<Arc<Window>> {
            None
        }
        fn game_state(&self) -> GameState {
            GameState::LoggedIn
        }
        fn canvas_size(&self) -> (u32, u32) {
            (765, 503)
        }
        fn viewport(&self) -> ViewportRect {
            ViewportRect::default()
        }
        fn sky_color(&self) -> u32 {
            0
        }
        fn interface(&self) -> InterfacePixels<'_> {
            InterfacePixels {
                width: 0,
                height: 0,
                pixels: &[],
            }
        }
        fn textures(&mut self) -> &mut dyn TextureArrayProvider {
            &mut self.textures
        }
        fn scene(&mut self) -> &mut dyn SceneSource {
            &mut self.scene
        }
    }

    fn host() -> HeadlessHost {
        HeadlessHost {
            textures: NoTextures,
            scene: EmptyScene,
        }
    }

    #[test]
    fn startup_without_canvas_disables() {
        let mut renderer = SceneRenderer::new(RendererConfig::default(), GpuInit::default());
        let err = renderer.start_up(&mut host()).unwrap_err();
        assert!(format!("{err:#}").contains("canvas"));
        assert!(renderer.is_disabled());
        assert_eq!(renderer.mode(), None);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut renderer = SceneRenderer::new(RendererConfig::default(), GpuInit::default());
        renderer.shut_down();
        renderer.shut_down();
        assert!(!renderer.is_ready());
        assert!(!renderer.is_disabled());

        let _ = renderer.start_up(&mut host());
        renderer.shut_down();
        renderer.shut_down();
        assert!(!renderer.is_disabled());
    }

    #[test]
    fn frames_while_inactive_drop_the_batch() {
        let config = RendererConfig {
            use_compute: false,
            ..Default::default()
        };
        let mut renderer = SceneRenderer::new(config, GpuInit::default());
        let paint = TilePaint::flat(0, 100);
        renderer.callbacks().draw_scene_paint(&paint, TileCoord::new(0, 1, 1));
        let drawn = renderer.batch.finish();
        assert_eq!(drawn.output_vertices, 6);
        renderer.batch.recycle(drawn);
        renderer.callbacks().draw_scene_paint(&paint, TileCoord::new(0, 1, 1));

        assert_eq!(renderer.draw_frame(&mut host()), FrameOutcome::Inactive);
        let batch = renderer.batch.finish();
        assert_eq!(batch.output_vertices, 0);
        assert!(batch.vertices.is_empty());
    }

    #[test]
    fn mouse_events_pass_through() {
        let mut renderer = SceneRenderer::new(RendererConfig::default(), GpuInit::default());
        let ev = MouseEvent { x: 5, y: 6 };
        assert_eq!(renderer.mouse_moved(ev), ev);
        assert_eq!(renderer.mouse.position(), (5, 6));
    }

    #[test]
    fn draw_distance_follows_the_config_mode() {
        let config = RendererConfig {
            use_compute: false,
            draw_distance: 60,
            ..Default::default()
        };
        let mut renderer = SceneRenderer::new(config, GpuInit::default());
        renderer.batch.set_draw_distance(renderer.config().draw_distance);
        assert_eq!(renderer.callbacks().draw_distance(), 25);
    }
}
