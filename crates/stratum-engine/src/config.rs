//! Renderer options.
//!
//! Read once per frame from the host; only `use_compute` is latched at
//! startup.

/// Draw distance limit (tiles) when compute sorting is available.
pub const MAX_DISTANCE: i32 = 90;

/// Draw distance limit (tiles) for the CPU-ordered fallback path.
pub const LEGACY_MAX_DISTANCE: i32 = 25;

/// Fog depth limit (percent of the draw distance).
pub const MAX_FOG_DEPTH: i32 = 100;

/// Tiles from the scene center to its edge.
pub const SCENE_HALF_SIZE: i32 = 52;

/// How the frame's triangles get ordered.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RenderMode {
    /// Compute passes sort faces into the output buffers.
    Compute,
    /// The host emits faces in paint order; the draw reads the staging
    /// buffers directly.
    Legacy,
}

impl RenderMode {
    /// Compute mode when both requested and supported.
    pub fn resolve(requested_compute: bool, adapter_supports_compute: bool) -> Self {
        if requested_compute && adapter_supports_compute {
            RenderMode::Compute
        } else {
            RenderMode::Legacy
        }
    }

    pub fn max_draw_distance(self) -> i32 {
        match self {
            RenderMode::Compute => MAX_DISTANCE,
            RenderMode::Legacy => LEGACY_MAX_DISTANCE,
        }
    }

    /// Configured draw distance clamped to what this mode can cover.
    pub fn clamp_draw_distance(self, configured: i32) -> i32 {
        configured.clamp(0, self.max_draw_distance())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum AntiAliasingMode {
    #[default]
    Disabled,
    Msaa2,
    Msaa4,
    Msaa8,
    Msaa16,
}

impl AntiAliasingMode {
    /// Requested sample count; `1` when disabled.
    pub fn samples(self) -> u32 {
        match self {
            AntiAliasingMode::Disabled => 1,
            AntiAliasingMode::Msaa2 => 2,
            AntiAliasingMode::Msaa4 => 4,
            AntiAliasingMode::Msaa8 => 8,
            AntiAliasingMode::Msaa16 => 16,
        }
    }

    pub fn is_enabled(self) -> bool {
        self != AntiAliasingMode::Disabled
    }
}

/// Filter applied to the UI layer when it is stretched to the window.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum UiScalingMode {
    Nearest,
    #[default]
    Linear,
    Mitchell,
    CatmullRom,
    Xbr,
}

impl UiScalingMode {
    /// Mode index understood by the interface shader.
    pub fn shader_mode(self) -> i32 {
        match self {
            UiScalingMode::Nearest => 0,
            UiScalingMode::Linear => 1,
            UiScalingMode::Mitchell => 2,
            UiScalingMode::CatmullRom => 3,
            UiScalingMode::Xbr => 4,
        }
    }

    /// Sampler filter for the interface texture. Only plain linear scaling
    /// uses hardware filtering; the other modes filter in the shader.
    pub fn filter(self, stretched: bool) -> wgpu::FilterMode {
        if stretched && self == UiScalingMode::Linear {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        }
    }
}

#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Request compute-sorted rendering. Takes effect at the next startup.
    pub use_compute: bool,
    /// Draw distance in tiles.
    pub draw_distance: i32,
    /// Fog depth as a percentage of the draw distance; `0` disables fog.
    pub fog_depth: i32,
    /// Fog corner rounding as a percentage of the draw distance.
    pub fog_corner_radius: i32,
    /// Fog density in tenths.
    pub fog_density: i32,
    pub smooth_banding: bool,
    pub anti_aliasing: AntiAliasingMode,
    /// Anisotropic filtering level for scene textures; `0` disables it.
    pub anisotropic_filtering: u16,
    pub ui_scaling: UiScalingMode,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            use_compute: true,
            draw_distance: 25,
            fog_depth: 0,
            fog_corner_radius: 0,
            fog_density: 0,
            smooth_banding: false,
            anti_aliasing: AntiAliasingMode::Disabled,
            anisotropic_filtering: 0,
            ui_scaling: UiScalingMode::Linear,
        }
    }
}

impl RendererConfig {
    pub fn fog_depth(&self) -> i32 {
        self.fog_depth.clamp(0, MAX_FOG_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_requires_adapter_support() {
        assert_eq!(RenderMode::resolve(true, true), RenderMode::Compute);
        assert_eq!(RenderMode::resolve(true, false), RenderMode::Legacy);
        assert_eq!(RenderMode::resolve(false, true), RenderMode::Legacy);
    }

    #[test]
    fn draw_distance_clamps_per_mode() {
        assert_eq!(RenderMode::Compute.clamp_draw_distance(120), 90);
        assert_eq!(RenderMode::Compute.clamp_draw_distance(50), 50);
        assert_eq!(RenderMode::Legacy.clamp_draw_distance(50), 25);
        assert_eq!(RenderMode::Legacy.clamp_draw_distance(-3), 0);
    }

    #[test]
    fn ui_filter_is_linear_only_when_stretched() {
        assert_eq!(UiScalingMode::Linear.filter(false), wgpu::FilterMode::Nearest);
        assert_eq!(UiScalingMode::Linear.filter(true), wgpu::FilterMode::Linear);
        assert_eq!(UiScalingMode::Xbr.filter(true), wgpu::FilterMode::Nearest);
    }
}
