//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the canvas window, and drives a
//! [`HostApp`] and the renderer from it.

mod runtime;

pub use runtime::{AppControl, HostApp, Runtime, RuntimeConfig};
