//! Stratum engine crate.
//!
//! Turns a game engine's immediate-mode draw calls into batched GPU work.
//! The host draws through [`scene::DrawCallbacks`]; the frame orchestrator
//! in [`renderer`] uploads the batch, orders faces with compute passes and
//! presents the result with the host's interface layer on top.

pub mod config;
pub mod device;
pub mod host;
pub mod logging;
pub mod render;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod window;

pub use config::{AntiAliasingMode, RenderMode, RendererConfig, UiScalingMode};
pub use renderer::{FrameOutcome, SceneRenderer};
