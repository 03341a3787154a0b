//! The scene draw: one non-indexed draw over the ordered face stream.

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use stratum_geometry::perspective::{LOCAL_TILE_SIZE, NEAR_PLANE, UNIT};

use crate::config::{RendererConfig, SCENE_HALF_SIZE};
use crate::host::{Camera, MAX_TEXTURES};

use super::common::{alpha_blend, uniform_block, uniform_layout_entry, PixelRect, SCENE_BLOCK_OFFSET};
use super::{shader, RenderTarget};

const TEXTURE_OFFSET_ENTRIES: usize = MAX_TEXTURES / 2;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SceneUniform {
    pub projection: [[f32; 4]; 4],
    pub fog_color: [f32; 4],
    /// Camera position, draw distance in world units.
    pub camera: [f32; 4],
    /// Use fog, depth, corner radius, density.
    pub fog: [f32; 4],
    /// Brightness, smooth banding.
    pub shading: [f32; 4],
    pub texture_offsets: [[f32; 4]; TEXTURE_OFFSET_ENTRIES],
}

/// Per-frame inputs of the scene uniform block.
#[derive(Debug, Clone)]
pub struct SceneParams<'a> {
    pub camera: Camera,
    /// Game viewport in canvas pixels.
    pub viewport_size: (u32, u32),
    pub sky_color: u32,
    /// Draw distance in tiles, already clamped to the render mode.
    pub draw_distance: i32,
    pub brightness: f64,
    pub config: &'a RendererConfig,
    pub texture_offsets: &'a [[f32; 2]; MAX_TEXTURES],
}

/// `scale(zoom) × perspective × pitch × yaw × translate(-camera)`, with clip
/// depth in wgpu's `[0, w]` range.
pub fn projection(camera: &Camera, viewport_size: (u32, u32)) -> Mat4 {
    let (width, height) = (viewport_size.0.max(1) as f32, viewport_size.1.max(1) as f32);
    let near = NEAR_PLANE as f32;
    let perspective = Mat4::from_cols(
        Vec4::new(2.0 / width, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 / height, 0.0, 0.0),
        Vec4::new(0.0, 0.0, -1.0, -1.0),
        Vec4::new(0.0, 0.0, -near, 0.0),
    );
    let zoom = camera.zoom as f32;
    let unit = UNIT as f32;

    Mat4::from_scale(Vec3::new(zoom, zoom, 1.0))
        * perspective
        * Mat4::from_axis_angle(Vec3::NEG_X, std::f32::consts::PI - camera.pitch as f32 * unit)
        * Mat4::from_axis_angle(Vec3::Y, camera.yaw as f32 * unit)
        * Mat4::from_translation(-Vec3::new(camera.x as f32, camera.y as f32, camera.z as f32))
}

/// `[use fog, depth, corner radius, density]` in world units.
pub fn fog_params(config: &RendererConfig, draw_distance: i32) -> [f32; 4] {
    let fog_depth = config.fog_depth();
    let effective = (LOCAL_TILE_SIZE * (draw_distance.min(SCENE_HALF_SIZE) + 1)) as f32;
    [
        if fog_depth > 0 { 1.0 } else { 0.0 },
        fog_depth as f32 * 0.01 * effective,
        config.fog_corner_radius.max(0) as f32 * 0.01 * effective,
        config.fog_density.max(0) as f32 * 0.1,
    ]
}

impl SceneUniform {
    pub fn new(params: &SceneParams<'_>) -> Self {
        let camera = &params.camera;
        let sky = super::common::rgb_to_color(params.sky_color);

        let mut texture_offsets = [[0.0; 4]; TEXTURE_OFFSET_ENTRIES];
        for (entry, pair) in texture_offsets.iter_mut().zip(params.texture_offsets.chunks_exact(2)) {
            *entry = [pair[0][0], pair[0][1], pair[1][0], pair[1][1]];
        }

        Self {
            projection: projection(camera, params.viewport_size).to_cols_array_2d(),
            fog_color: [sky.r as f32, sky.g as f32, sky.b as f32, 1.0],
            camera: [
                camera.x as f32,
                camera.y as f32,
                camera.z as f32,
                (params.draw_distance * LOCAL_TILE_SIZE) as f32,
            ],
            fog: fog_params(params.config, params.draw_distance),
            shading: [
                params.brightness as f32,
                if params.config.smooth_banding { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
            texture_offsets,
        }
    }
}

pub(crate) const SCENE_UNIFORM_SIZE: u64 = std::mem::size_of::<SceneUniform>() as u64;

/// Vertex source for the draw: compute output or the staging buffers.
pub struct SceneGeometry<'a> {
    pub vertices: &'a wgpu::Buffer,
    pub uvs: &'a wgpu::Buffer,
    pub vertex_count: u32,
}

pub struct ScenePipeline {
    format: wgpu::TextureFormat,
    samples: u32,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl ScenePipeline {
    // x, y, z, packed colour
    const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Sint32x4];
    // texture + 1, u, v, 0
    const UV_ATTRS: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x4,
        offset: 0,
        shader_location: 1,
    }];

    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, samples: u32) -> Result<Self> {
        let shader = shader::create_module(device, "stratum scene shader", shader::SCENE)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stratum scene bgl"),
            entries: &[
                uniform_layout_entry(
                    0,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    SCENE_UNIFORM_SIZE,
                ),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
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
            label: Some("stratum scene pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let stride = 16;
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("stratum scene pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: stride,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &Self::POSITION_ATTRS,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: stride,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &Self::UV_ATTRS,
                    },
                ],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            // Faces arrive sorted; no depth buffer.
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: samples,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },

            multiview_mask: None,
            cache: None,
        });

        Ok(Self {
            format,
            samples,
            pipeline,
            bind_group_layout,
        })
    }

    /// Built for this target format and sample count.
    pub fn matches(&self, format: wgpu::TextureFormat, samples: u32) -> bool {
        self.format == format && self.samples == samples
    }

    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        uniform: &wgpu::Buffer,
        textures: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stratum scene bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_block(uniform, SCENE_BLOCK_OFFSET, SCENE_UNIFORM_SIZE),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(textures),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    /// Clears the target to `clear` and draws the face stream inside
    /// `viewport`.
    pub fn render(
        &self,
        target: &mut RenderTarget<'_>,
        bind_group: &wgpu::BindGroup,
        geometry: Option<SceneGeometry<'_>>,
        viewport: Option<PixelRect>,
        clear: wgpu::Color,
    ) {
        let attachment = target.color_attachment(wgpu::LoadOp::Clear(clear));
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("stratum scene pass"),
            color_attachments: &[Some(attachment)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let (Some(geometry), Some(viewport)) = (geometry, viewport) else {
            return;
        };
        if geometry.vertex_count == 0 {
            return;
        }

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
        rpass.set_vertex_buffer(0, geometry.vertices.slice(..));
        rpass.set_vertex_buffer(1, geometry.uvs.slice(..));
        rpass.draw(0..geometry.vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera {
            x: 1000,
            y: -500,
            z: 2000,
            pitch: 256,
            yaw: 0,
            zoom: 512,
            ..Default::default()
        }
    }

    #[test]
    fn uniform_matches_shader_layout() {
        assert_eq!(SCENE_UNIFORM_SIZE, 64 + 4 * 16 + 64 * 16);
    }

    #[test]
    fn camera_position_projects_behind_the_near_plane() {
        let m = projection(&camera(), (512, 334));
        let clip = m * Vec4::new(1000.0, -500.0, 2000.0, 1.0);
        // w == 0 at the eye, z < 0: clipped
        assert!(clip.w.abs() < 1e-3);
        assert!(clip.z < 0.0);
    }

    #[test]
    fn point_ahead_is_inside_the_depth_range() {
        let cam = Camera { pitch: 0, ..camera() };
        let m = projection(&cam, (512, 334));
        // Yaw 0 looks along +z in engine space.
        let clip = m * Vec4::new(1000.0, -500.0, 3000.0, 1.0);
        assert!(clip.w > 0.0);
        let depth = clip.z / clip.w;
        assert!((0.0..=1.0).contains(&depth), "depth {depth}");
        assert!((clip.x / clip.w).abs() < 1e-4);
        assert!((clip.y / clip.w).abs() < 1e-4);
    }

    #[test]
    fn fog_scales_with_effective_draw_distance() {
        let config = RendererConfig {
            fog_depth: 50,
            fog_corner_radius: 20,
            fog_density: 3,
            ..Default::default()
        };
        let close = |a: f32, b: f32| (a - b).abs() < 1e-2;
        let [use_fog, depth, radius, density] = fog_params(&config, 25);
        assert_eq!(use_fog, 1.0);
        assert!(close(depth, 1664.0));
        assert!(close(radius, 665.6));
        assert!(close(density, 0.3));

        // draw distance past the scene edge is capped
        let [_, far_depth, _, _] = fog_params(&config, 90);
        assert!(close(far_depth, 3392.0));

        let [use_fog, ..] = fog_params(&RendererConfig::default(), 25);
        assert_eq!(use_fog, 0.0);
    }

    #[test]
    fn texture_offsets_pack_two_per_entry() {
        let mut offsets = [[0.0; 2]; MAX_TEXTURES];
        offsets[3] = [0.25, 0.5];
        let config = RendererConfig::default();
        let uniform = SceneUniform::new(&SceneParams {
            camera: camera(),
            viewport_size: (512, 334),
            sky_color: 0,
            draw_distance: 25,
            brightness: 0.8,
            config: &config,
            texture_offsets: &offsets,
        });
        assert_eq!(uniform.texture_offsets[1], [0.0, 0.0, 0.25, 0.5]);
        assert_eq!(uniform.camera[3], 25.0 * 128.0);
        assert!((uniform.shading[0] - 0.8).abs() < 1e-6);
    }
}
