//! Frame orchestration.
//!
//! [`SceneRenderer`] owns the lifecycle state machine and runs the frame
//! sequence: surface tracking, batch upload, compute dispatch, scene draw,
//! interface composite, present, then capture and mirror hand-off.

mod frame;
mod mirror;
mod mouse;
mod scene_renderer;
mod tracker;
mod viewport;

pub use frame::FrameOutcome;
pub use mirror::{draw_cursor, MirrorTask};
pub use mouse::MouseTracker;
pub use scene_renderer::SceneRenderer;
pub use tracker::{SurfaceChanges, SurfaceTracker};
pub use viewport::{interface_viewport, scene_viewport};
