//! GPU device and surface management.
//!
//! Creates the wgpu Instance/Adapter/Device/Queue for a host canvas,
//! configures the swapchain, and hands out per-frame encoders.

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use init::GpuInit;
