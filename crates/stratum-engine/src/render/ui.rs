//! Interface layer composite: the host's UI pixels drawn as one quad over
//! the finished scene.

use anyhow::Result;
use bytemuck::{Pod, Zeroable};

use crate::config::UiScalingMode;
use crate::host::InterfacePixels;

use super::common::{
    premul_alpha_blend, uniform_block, uniform_layout_entry, PixelRect, QuadVertex, QUAD_VERTICES,
    UI_BLOCK_OFFSET,
};
use super::{shader, RenderTarget};

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct UiUniform {
    /// Source width/height, target width/height.
    pub sizes: [f32; 4],
    /// Sampling mode.
    pub params: [i32; 4],
}

impl UiUniform {
    pub fn new(mode: UiScalingMode, source: (u32, u32), target: (u32, u32)) -> Self {
        Self {
            sizes: [source.0 as f32, source.1 as f32, target.0 as f32, target.1 as f32],
            params: [mode.shader_mode(), 0, 0, 0],
        }
    }
}

const UI_UNIFORM_SIZE: u64 = std::mem::size_of::<UiUniform>() as u64;

/// Bytes of the interface quad vertex buffer.
pub fn quad_bytes() -> &'static [u8] {
    bytemuck::cast_slice(&QUAD_VERTICES)
}

/// BGRA8 texture the interface pixels are uploaded into.
pub struct InterfaceTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl InterfaceTexture {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stratum interface texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            // 0xAARRGGBB little-endian is B, G, R, A in memory.
            format: wgpu::TextureFormat::Bgra8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!("interface texture allocated at {width}x{height}");
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Writes the pixels if they match the texture size.
    pub fn upload(&self, queue: &wgpu::Queue, pixels: &InterfacePixels<'_>) -> bool {
        let expected = self.width as usize * self.height as usize;
        if (pixels.width, pixels.height) != (self.width, self.height) || pixels.pixels.len() < expected {
            log::debug!(
                "interface pixels {}x{} do not match texture {}x{}",
                pixels.width,
                pixels.height,
                self.width,
                self.height
            );
            return false;
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&pixels.pixels[..expected]),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        true
    }
}

pub struct UiSampler {
    sampler: wgpu::Sampler,
    filter: wgpu::FilterMode,
}

impl UiSampler {
    pub fn new(device: &wgpu::Device, filter: wgpu::FilterMode) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("stratum interface sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });
        Self { sampler, filter }
    }

    pub fn filter(&self) -> wgpu::FilterMode {
        self.filter
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

pub struct UiPipeline {
    format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl UiPipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Result<Self> {
        let shader = shader::create_module(device, "stratum interface shader", shader::UI)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stratum interface bgl"),
            entries: &[
                uniform_layout_entry(0, wgpu::ShaderStages::FRAGMENT, UI_UNIFORM_SIZE),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("stratum interface pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("stratum interface pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Ok(Self {
            format,
            pipeline,
            bind_group_layout,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        uniform: &wgpu::Buffer,
        texture: &InterfaceTexture,
        sampler: &UiSampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stratum interface bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_block(uniform, UI_BLOCK_OFFSET, UI_UNIFORM_SIZE),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(texture.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler.sampler()),
                },
            ],
        })
    }

    /// Blends the interface quad over `target` inside `viewport`.
    pub fn draw(
        &self,
        target: &mut RenderTarget<'_>,
        bind_group: &wgpu::BindGroup,
        quad: &wgpu::Buffer,
        viewport: PixelRect,
    ) {
        let attachment = target.color_attachment(wgpu::LoadOp::Load);
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("stratum interface pass"),
            color_attachments: &[Some(attachment)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, quad.slice(..));
        rpass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_carries_mode_and_sizes() {
        let u = UiUniform::new(UiScalingMode::Mitchell, (765, 503), (1530, 1006));
        assert_eq!(u.sizes, [765.0, 503.0, 1530.0, 1006.0]);
        assert_eq!(u.params[0], 2);
        assert_eq!(UI_UNIFORM_SIZE, 32);
    }

    #[test]
    fn quad_is_six_vertices() {
        assert_eq!(quad_bytes().len(), 6 * 8);
    }
}
