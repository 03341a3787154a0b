//! GPU types and helpers shared by the scene, compute and interface passes.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};

// ── blend ─────────────────────────────────────────────────────────────────

/// Straight alpha for scene faces.
pub(super) fn alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// Premultiplied alpha for the interface layer.
pub(super) fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── shared uniform block ──────────────────────────────────────────────────
//
// One uniform buffer holds three blocks: the compute header and trig table,
// the scene block, the interface block. Offsets are multiples of 256, the
// largest `min_uniform_buffer_offset_alignment` wgpu allows.

const fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

pub(super) const UNIFORM_ALIGN: u64 = 256;

pub(crate) const COMPUTE_BLOCK_OFFSET: u64 = 0;
pub(crate) const SCENE_BLOCK_OFFSET: u64 =
    align_up(COMPUTE_BLOCK_OFFSET + super::compute::COMPUTE_UNIFORM_SIZE, UNIFORM_ALIGN);
pub(crate) const UI_BLOCK_OFFSET: u64 = align_up(
    SCENE_BLOCK_OFFSET + std::mem::size_of::<super::scene::SceneUniform>() as u64,
    UNIFORM_ALIGN,
);
pub const UNIFORM_BUFFER_SIZE: u64 = align_up(
    UI_BLOCK_OFFSET + std::mem::size_of::<super::ui::UiUniform>() as u64,
    UNIFORM_ALIGN,
);

/// Binding over `size` bytes of the shared uniform buffer at `offset`.
pub(super) fn uniform_block(buffer: &wgpu::Buffer, offset: u64, size: u64) -> wgpu::BindingResource<'_> {
    wgpu::BindingResource::Buffer(wgpu::BufferBinding {
        buffer,
        offset,
        size: NonZeroU64::new(size),
    })
}

pub(super) fn uniform_layout_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    size: u64,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size),
        },
        count: None,
    }
}

// ── quad vertex ───────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct QuadVertex {
    pub pos: [f32; 2], // 0..1, top-left origin
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Two triangles covering the unit square.
pub(super) const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex { pos: [0.0, 0.0] },
    QuadVertex { pos: [1.0, 0.0] },
    QuadVertex { pos: [1.0, 1.0] },
    QuadVertex { pos: [0.0, 0.0] },
    QuadVertex { pos: [1.0, 1.0] },
    QuadVertex { pos: [0.0, 1.0] },
];

// ── viewport ──────────────────────────────────────────────────────────────

/// A rectangle in target pixels, top-left origin.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// The whole of a `width × height` target.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Intersection with a `width × height` target; `None` if empty.
    pub fn clamp_to(self, width: u32, height: u32) -> Option<Self> {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let right = self.x.saturating_add(self.width).min(width);
        let bottom = self.y.saturating_add(self.height).min(height);
        let rect = Self {
            x,
            y,
            width: right - x,
            height: bottom - y,
        };
        (rect.width > 0 && rect.height > 0).then_some(rect)
    }
}

// ── colour ────────────────────────────────────────────────────────────────

/// `0xRRGGBB` as an opaque clear colour.
pub fn rgb_to_color(rgb: u32) -> wgpu::Color {
    let channel = |shift: u32| ((rgb >> shift) & 0xff) as f64 / 255.0;
    wgpu::Color {
        r: channel(16),
        g: channel(8),
        b: channel(0),
        a: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_blocks_are_aligned_and_disjoint() {
        assert_eq!(SCENE_BLOCK_OFFSET % UNIFORM_ALIGN, 0);
        assert_eq!(UI_BLOCK_OFFSET % UNIFORM_ALIGN, 0);
        assert!(SCENE_BLOCK_OFFSET >= super::super::compute::COMPUTE_UNIFORM_SIZE);
        assert!(UI_BLOCK_OFFSET > SCENE_BLOCK_OFFSET);
        assert!(UNIFORM_BUFFER_SIZE > UI_BLOCK_OFFSET);
    }

    #[test]
    fn pixel_rect_clamps_to_target() {
        let rect = PixelRect {
            x: 10,
            y: 20,
            width: 100,
            height: 100,
        };
        assert_eq!(
            rect.clamp_to(50, 200),
            Some(PixelRect {
                x: 10,
                y: 20,
                width: 40,
                height: 100
            })
        );
        assert_eq!(rect.clamp_to(10, 200), None);
        assert_eq!(PixelRect::full(8, 8).clamp_to(8, 8), Some(PixelRect::full(8, 8)));
    }

    #[test]
    fn sky_colour_channels() {
        let c = rgb_to_color(0xff8000);
        assert_eq!(c.r, 1.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-9);
        assert_eq!(c.b, 0.0);
        assert_eq!(c.a, 1.0);
    }
}
