//! GPU passes.
//!
//! Each pass type owns its pipeline and knows its bind group layout; the
//! buffers and textures it reads live in [`crate::resources`].
//!
//! Convention:
//! - viewports are physical pixels of the surface, top-left origin.
//! - the shared uniform buffer holds one block per pass, see `common`.

mod aa;
mod capture;
mod common;
mod compute;
mod ctx;
mod scene;
mod shader;
mod texture;
mod ui;

pub use aa::{plan as plan_aa, AaKey, AaTarget, AaTransition};
pub use capture::{strip_alpha, unpack_rows, FrameCapture, Screenshot};
pub use common::{rgb_to_color, PixelRect, UNIFORM_BUFFER_SIZE};
pub use compute::{trig_table, workgroup_grid, ComputeHeader, ComputeInputs, ComputePipelines, COMPUTE_UNIFORM_SIZE};
pub use ctx::RenderTarget;
pub use scene::{projection, SceneGeometry, SceneParams, ScenePipeline, SceneUniform};
pub use shader::validate_wgsl;
pub use texture::{anisotropy_settings, SceneSampler, TextureArray};
pub use ui::{quad_bytes, InterfaceTexture, UiPipeline, UiSampler, UiUniform};

pub(crate) use common::{COMPUTE_BLOCK_OFFSET, SCENE_BLOCK_OFFSET, UI_BLOCK_OFFSET};
