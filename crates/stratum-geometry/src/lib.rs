//! Geometry encoding and batching primitives for the **Stratum** renderer.
//!
//! This crate has no GPU dependencies. It turns scene geometry (tile paints,
//! tile meshes, model faces) into the flat vertex/UV streams and fixed-width
//! draw command records that the engine uploads and the compute passes consume.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`buffer`] | `BufferWriter` / `BufferView` two-phase staging buffers |
//! | [`command`] | `DrawCommand`, `Bucket`, triangle limits and flags |
//! | [`encode`] | tile paint, tile model, and model face encoders |
//! | [`model`] | `Model`, `TilePaint`, `TileModel`, `CacheSlot` |
//! | [`perspective`] | trig tables, `Placement`, `ClipBounds`, `is_visible` |
//!
//! # Quick start
//!
//! ```rust
//! use stratum_geometry::buffer::BufferWriter;
//! use stratum_geometry::encode::encode_tile_paint;
//! use stratum_geometry::model::TilePaint;
//!
//! let paint = TilePaint::flat(0, 0x2a5f);
//! let mut vertices = BufferWriter::<i32>::with_capacity(64);
//! let mut uvs = BufferWriter::<f32>::with_capacity(64);
//!
//! let len = encode_tile_paint(&paint, [0, 0, 0], &mut vertices, &mut uvs, true);
//! assert_eq!(len, 6);
//! assert_eq!(vertices.len(), 6 * 4);
//! ```

pub mod buffer;
pub mod command;
pub mod encode;
pub mod model;
pub mod perspective;

pub use buffer::{BufferView, BufferWriter};
pub use command::{Bucket, DrawCommand};
pub use model::{CacheSlot, Face, Model, TileCoord, TileFace, TileModel, TilePaint};
pub use perspective::{ClipBounds, Placement, ViewRotation};
