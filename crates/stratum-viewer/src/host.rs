use std::sync::Arc;

use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};
use winit::window::Window;

use stratum_engine::host::{
    Camera, GameState, HostClient, InterfacePixels, SceneSource, SceneView, TextureArrayProvider, ViewportRect,
};
use stratum_engine::window::{AppControl, HostApp};
use stratum_engine::SceneRenderer;
use stratum_geometry::model::Model;
use stratum_geometry::perspective::{cosine, sine, ClipBounds, Placement, ViewRotation};

use crate::demo::{cuboid, hsl, DemoScene, DemoTextures};

const ORBIT_DISTANCE: i32 = 2600;
const EYE_HEIGHT: i32 = 1100;
const PITCH: i32 = 200;
const SKY: u32 = 0x87_a5_c8;

/// Premultiplied `0xAARRGGBB`.
const PANEL: u32 = 0xb0_0e_0e_14;
const PANEL_HEIGHT: u32 = 48;

/// Orbits the demo scene and composites a status panel over it.
pub struct Viewer {
    window: Option<Arc<Window>>,
    tick: u32,
    scene: DemoScene,
    textures: DemoTextures,
    spinner: Model,
    interface: Vec<u32>,
    interface_size: (u32, u32),
}

impl Viewer {
    pub fn new() -> Self {
        Self {
            window: None,
            tick: 0,
            scene: DemoScene::generate(),
            textures: DemoTextures::default(),
            spinner: cuboid(64, 128, hsl(40, 6, 70), Some(1)),
            interface: Vec::new(),
            interface_size: (0, 0),
        }
    }

    fn yaw(&self) -> i32 {
        (self.tick as i32 * 2) & 2047
    }

    fn resize_interface(&mut self) {
        let size = self.canvas_size();
        if size == self.interface_size {
            return;
        }
        let (width, height) = size;
        self.interface = (0..height)
            .flat_map(|y| (0..width).map(move |_| if y + PANEL_HEIGHT >= height { PANEL } else { 0 }))
            .collect();
        self.interface_size = size;
    }

    /// Orbit position for the current tick.
    fn camera(&self) -> Camera {
        let viewport = self.viewport();
        let [cx, cy, cz] = self.scene.center();
        let yaw = self.yaw();
        Camera {
            x: cx + (ORBIT_DISTANCE * sine(yaw) >> 16),
            y: cy - EYE_HEIGHT,
            z: cz - (ORBIT_DISTANCE * cosine(yaw) >> 16),
            pitch: PITCH,
            yaw,
            zoom: 512,
            center_x: viewport.width as i32 / 2,
            center_y: viewport.height as i32 / 2,
        }
    }

    fn placement(camera: &Camera, world: [i32; 3], orientation: i32) -> Placement {
        Placement {
            orientation,
            rotation: ViewRotation::from_angles(camera.pitch, camera.yaw),
            x: world[0] - camera.x,
            y: world[1] - camera.y,
            z: world[2] - camera.z,
        }
    }
}

impl HostClient for Viewer {
    fn canvas(&self) -> Option<Arc<Window>> {
        self.window.clone()
    }

    fn game_state(&self) -> GameState {
        if self.tick == 0 {
            GameState::Starting
        } else {
            GameState::LoggedIn
        }
    }

    fn canvas_size(&self) -> (u32, u32) {
        self.window.as_ref().map_or((0, 0), |w| {
            let logical = w.inner_size().to_logical::<u32>(w.scale_factor());
            (logical.width, logical.height)
        })
    }

    fn viewport(&self) -> ViewportRect {
        let (width, height) = self.canvas_size();
        ViewportRect {
            x: 0,
            y: 0,
            width,
            height: height.saturating_sub(PANEL_HEIGHT),
        }
    }

    fn sky_color(&self) -> u32 {
        SKY
    }

    fn interface(&self) -> InterfacePixels<'_> {
        InterfacePixels {
            width: self.interface_size.0,
            height: self.interface_size.1,
            pixels: &self.interface,
        }
    }

    fn textures(&mut self) -> &mut dyn TextureArrayProvider {
        &mut self.textures
    }

    fn scene(&mut self) -> &mut dyn SceneSource {
        &mut self.scene
    }
}

impl HostApp for Viewer {
    fn attach(&mut self, window: Arc<Window>) {
        self.window = Some(window);
        self.resize_interface();
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn update(&mut self, renderer: &mut SceneRenderer) -> AppControl {
        self.tick = self.tick.wrapping_add(1).max(1);
        self.resize_interface();

        let camera = self.camera();
        let viewport = self.viewport();
        let callbacks = renderer.callbacks();
        callbacks.draw_scene(&SceneView {
            camera,
            clip: ClipBounds::centered(viewport.width as i32, viewport.height as i32),
        });
        callbacks.animate(1, 1);

        for (tile, paint) in &self.scene.tiles {
            callbacks.draw_scene_paint(paint, *tile);
        }

        for (i, (world, model)) in self.scene.pillars.iter_mut().enumerate() {
            let placement = Self::placement(&camera, *world, 0);
            callbacks.draw(model, placement, i as u64 + 1, &mut ());
        }

        let [cx, cy, cz] = self.scene.center();
        let spin = (self.tick as i32 * 8) & 2047;
        let placement = Self::placement(&camera, [cx, cy - 64, cz], spin);
        callbacks.draw(&mut self.spinner, placement, 0, &mut ());

        AppControl::Continue
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use stratum_engine::device::GpuInit;
    use stratum_engine::RendererConfig;

    use super::*;

    #[test]
    fn first_update_logs_in() {
        let mut viewer = Viewer::new();
        assert_eq!(viewer.game_state(), GameState::Starting);

        let mut renderer = SceneRenderer::new(RendererConfig::default(), GpuInit::default());
        assert_eq!(viewer.update(&mut renderer), AppControl::Continue);
        assert_eq!(viewer.game_state(), GameState::LoggedIn);
    }

    #[test]
    fn camera_orbits_the_centre() {
        let viewer = Viewer::new();
        let camera = viewer.camera();
        let [cx, _, cz] = viewer.scene.center();
        let (dx, dz) = ((camera.x - cx) as f64, (camera.z - cz) as f64);
        let distance = (dx * dx + dz * dz).sqrt();
        assert!((distance - ORBIT_DISTANCE as f64).abs() < 2.0);
    }
}
