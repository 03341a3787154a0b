use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::RendererConfig;
use crate::device::GpuInit;
use crate::host::{GameState, HostClient, MouseEvent, MouseListener};
use crate::renderer::{FrameOutcome, SceneRenderer};

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "stratum".to_string(),
            initial_size: LogicalSize::new(765.0, 503.0),
        }
    }
}

/// Control directive returned by host callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// A host driven by the runtime: it owns the canvas once created and draws
/// its scene each frame through the renderer's callbacks.
pub trait HostApp: HostClient {
    /// The canvas window was created.
    fn attach(&mut self, window: Arc<Window>);

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Advances the host and issues this frame's draw calls.
    fn update(&mut self, renderer: &mut SceneRenderer) -> AppControl;
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(initial: RuntimeConfig, config: RendererConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: HostApp + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState {
            initial,
            renderer: SceneRenderer::new(config, gpu_init),
            app,
            window: None,
            game_state: None,
            dragging: false,
            exit_requested: false,
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

struct AppState<A: HostApp> {
    initial: RuntimeConfig,
    renderer: SceneRenderer,
    app: A,

    window: Option<Arc<Window>>,
    game_state: Option<GameState>,
    dragging: bool,
    exit_requested: bool,
}

impl<A: HostApp> AppState<A> {
    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        self.renderer.shut_down();
        event_loop.exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.initial.title.clone())
            .with_inner_size(self.initial.initial_size);

        let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);
        self.app.attach(window.clone());
        self.window = Some(window);

        self.renderer.start_up(&mut self.app)
    }

    fn pointer_event(&mut self, position: PhysicalPosition<f64>) -> MouseEvent {
        let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
        let logical = position.to_logical::<f64>(scale);
        MouseEvent {
            x: logical.x as i32,
            y: logical.y as i32,
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.update(&mut self.renderer) == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        let state = self.app.game_state();
        if self.game_state != Some(state) {
            log::debug!("game state {:?} -> {state:?}", self.game_state);
            self.game_state = Some(state);
            self.renderer.on_game_state_changed(state, &mut self.app);
        }

        if self.renderer.draw_frame(&mut self.app) == FrameOutcome::Inactive && self.renderer.is_disabled() {
            log::error!("renderer is disabled; exiting");
            self.request_exit(event_loop);
        }
    }
}

impl<A: HostApp> ApplicationHandler for AppState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            log::error!("failed to start: {e:#}");
            self.request_exit(event_loop);
            return;
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exit_requested || self.window.as_ref().map(|w| w.id()) != Some(window_id) {
            return;
        }

        if self.app.on_window_event(&event) == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.request_exit(event_loop),

            WindowEvent::CursorMoved { position, .. } => {
                let ev = self.pointer_event(position);
                if self.dragging {
                    self.renderer.mouse_dragged(ev);
                } else {
                    self.renderer.mouse_moved(ev);
                }
            }

            WindowEvent::MouseInput { state, .. } => {
                self.dragging = state == ElementState::Pressed;
            }

            // The renderer picks up the new size at the next frame.
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}
