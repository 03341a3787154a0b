//! Per-frame batching and the static scene cache.

mod batch;
mod cache;
mod callbacks;

pub use batch::{BatchBuilder, DispatchCounts, FrameBatch};
pub use cache::{SceneCache, SceneUpload};
pub use callbacks::{DrawCallbacks, Renderable};
