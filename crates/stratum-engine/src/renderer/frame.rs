//! Everything that exists only while the renderer is running, and the
//! per-frame sequence over it.

use anyhow::{anyhow, Context, Result};
use wgpu::util::DeviceExt;

use stratum_geometry::command::Bucket;

use crate::config::{RenderMode, RendererConfig};
use crate::device::{Gpu, SurfaceErrorAction};
use crate::host::{HostClient, MAX_TEXTURES};
use crate::render::{
    quad_bytes, rgb_to_color, trig_table, AaTarget, AaTransition, ComputeHeader, ComputeInputs, ComputePipelines,
    FrameCapture, InterfaceTexture, RenderTarget, SceneGeometry, SceneParams, ScenePipeline, SceneSampler,
    SceneUniform, Screenshot, TextureArray, UiPipeline, UiSampler, UiUniform, COMPUTE_BLOCK_OFFSET,
    SCENE_BLOCK_OFFSET, UI_BLOCK_OFFSET, UNIFORM_BUFFER_SIZE,
};
use crate::resources::RenderDeviceState;
use crate::scene::{BatchBuilder, DrawCallbacks, FrameBatch, SceneCache};

use super::mirror::{draw_cursor, MirrorTask};
use super::tracker::SurfaceTracker;
use super::viewport::{interface_viewport, scene_viewport};

/// How a call to `draw_frame` ended.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Presented,
    /// Nothing was drawn; the batch was discarded or recycled.
    Skipped,
    /// The canvas changed; the renderer was torn down and started again.
    Restarted,
    /// The renderer is not running.
    Inactive,
}

/// Per-frame inputs owned outside the running state.
pub(super) struct FrameInputs<'a> {
    pub config: &'a RendererConfig,
    pub batch: &'a mut BatchBuilder,
    pub mirror: &'a mut MirrorTask,
    pub cursor: (i32, i32),
}

pub(super) struct ReadyState {
    // Dropped before the device.
    resources: RenderDeviceState,
    cache: SceneCache,
    tracker: SurfaceTracker,
    mode: RenderMode,
    texture_offsets: [[f32; 2]; MAX_TEXTURES],
    gpu: Gpu,
}

impl ReadyState {
    /// Creates pipelines and persistent buffers. On error every object
    /// created so far is released before returning.
    pub fn new(gpu: Gpu, mode: RenderMode, config: &RendererConfig) -> Result<Self> {
        let mut resources = RenderDeviceState::default();
        if let Err(err) = init_resources(&gpu, mode, config, &mut resources) {
            resources.release_all();
            return Err(err);
        }

        Ok(Self {
            resources,
            cache: SceneCache::new(),
            tracker: SurfaceTracker::default(),
            mode,
            texture_offsets: [[0.0; 2]; MAX_TEXTURES],
            gpu,
        })
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn canvas_id(&self) -> winit::window::WindowId {
        self.gpu.canvas_id()
    }

    /// Releases every GPU object. Safe to call more than once.
    pub fn release(&mut self) {
        self.cache.invalidate();
        self.tracker.reset();
        self.resources.release_all();
    }

    /// Encodes and uploads the host's static geometry. Commands recorded
    /// against an older scene stop matching once the new id is set.
    pub fn upload_scene(&mut self, host: &mut dyn HostClient, batch: &mut BatchBuilder) {
        if self.mode != RenderMode::Compute {
            return;
        }
        let upload = self.cache.rebuild(host.scene());
        let (device, queue) = (self.gpu.device(), self.gpu.queue());
        self.resources.scene_vertices.upload(device, queue, upload.vertices.as_bytes());
        self.resources.scene_uvs.upload(device, queue, upload.uvs.as_bytes());
        batch.set_scene_id(Some(upload.scene_id));
        log::info!(
            "scene {} uploaded: {} vertices",
            upload.scene_id,
            upload.vertex_count()
        );
    }

    /// One frame. `Err` means the device is unusable.
    pub fn render(&mut self, host: &mut dyn HostClient, inputs: FrameInputs<'_>) -> Result<FrameOutcome> {
        let FrameInputs {
            config,
            batch,
            mirror,
            cursor,
        } = inputs;
        batch.set_draw_distance(config.draw_distance);

        if host.game_state().is_transitioning() {
            batch.discard();
            return Ok(FrameOutcome::Skipped);
        }

        self.update_surface(host, config)?;

        let frame = batch.finish();
        self.upload_batch(&frame);
        self.write_uniforms(host, config, batch);

        let mut gpu_frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::debug!("surface acquisition failed: {err}");
                batch.recycle(frame);
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => Err(anyhow!("surface out of memory")),
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(FrameOutcome::Skipped),
                };
            }
        };

        self.dispatch(&mut gpu_frame.encoder, &frame);
        self.draw_scene(host, &mut gpu_frame.encoder, &gpu_frame.view, &frame)?;
        batch.recycle(frame);
        self.draw_interface(host, config, &mut gpu_frame.encoder, &gpu_frame.view)?;

        let device = self.gpu.device();
        let mirror_sink = host.mirror().filter(|_| mirror.is_idle());
        let capture = if (host.wants_screenshot() || mirror_sink.is_some()) && self.gpu.supports_readback() {
            FrameCapture::record(
                device,
                &mut gpu_frame.encoder,
                &gpu_frame.surface_texture.texture,
                self.gpu.surface_format(),
            )
        } else {
            None
        };

        self.gpu.submit(gpu_frame);

        let mut screenshot = match &capture {
            Some(capture) => Screenshot::new(device, capture),
            None => Screenshot::unavailable(),
        };
        host.draw_complete(&mut screenshot);

        if let Some(sink) = mirror_sink {
            if let Some(mut image) = screenshot.take() {
                let (x, y) = cursor;
                let scale = self.gpu.window().scale_factor();
                mirror.try_start(move || {
                    draw_cursor(&mut image, (x as f64 * scale) as i32, (y as f64 * scale) as i32);
                    sink.present(image);
                });
            }
        }

        Ok(FrameOutcome::Presented)
    }

    // ── steps ─────────────────────────────────────────────────────────────

    /// Surface size, interface texture and multisample target.
    fn update_surface(&mut self, host: &dyn HostClient, config: &RendererConfig) -> Result<()> {
        let window_size = self.gpu.window().inner_size();
        if window_size != self.gpu.size() {
            self.gpu.resize(window_size);
        }
        let surface = (self.gpu.size().width, self.gpu.size().height);
        let changes = self.tracker.update(host.canvas_size(), surface, config.anti_aliasing);
        let device = self.gpu.device();

        if let Some((width, height)) = changes.canvas_resized {
            self.resources
                .interface_texture
                .set(InterfaceTexture::new(device, width, height));
            self.resources.ui_bindings.release();
        }

        match changes.aa {
            AaTransition::Keep => {}
            AaTransition::Release => {
                if self.resources.aa.release() {
                    log::info!("msaa target released");
                }
            }
            AaTransition::Rebuild(key) => {
                let samples = self.gpu.clamp_sample_count(key.mode.samples());
                if samples > 1 {
                    self.resources
                        .aa
                        .set(AaTarget::new(device, self.gpu.surface_format(), key, samples));
                } else {
                    log::warn!("{:?} is not supported for this surface; drawing without msaa", key.mode);
                    self.resources.aa.release();
                }
            }
        }

        let samples = self.resources.aa.get().map_or(1, AaTarget::samples);
        let format = self.gpu.surface_format();
        if !self
            .resources
            .scene_pipeline
            .get()
            .is_some_and(|p| p.matches(format, samples))
        {
            self.resources.scene_bindings.release();
            self.resources.scene_pipeline.set(
                ScenePipeline::new(device, format, samples).context("failed to rebuild the scene pipeline")?,
            );
        }
        Ok(())
    }

    fn upload_batch(&mut self, frame: &FrameBatch) {
        let (device, queue) = (self.gpu.device(), self.gpu.queue());
        let resources = &mut self.resources;

        resources.temp_vertices.upload(device, queue, frame.vertices.as_bytes());
        resources.temp_uvs.upload(device, queue, frame.uvs.as_bytes());

        if self.mode != RenderMode::Compute {
            return;
        }
        for (buffer, bucket) in resources.commands.iter_mut().zip(Bucket::ALL) {
            buffer.upload(device, queue, bytemuck::cast_slice(frame.commands(bucket).as_slice()));
        }
        resources.out_vertices.reallocate_exact(device, frame.output_bytes());
        resources.out_uvs.reallocate_exact(device, frame.output_bytes());
    }

    /// Compute header, texture state and the scene and interface blocks.
    fn write_uniforms(&mut self, host: &mut dyn HostClient, config: &RendererConfig, batch: &mut BatchBuilder) {
        let (device, queue) = (self.gpu.device(), self.gpu.queue());
        let view = *batch.view();

        if let Some(uniform) = self.resources.uniform.get() {
            let header = ComputeHeader::from_camera(&view.camera);
            queue.write_buffer(uniform, COMPUTE_BLOCK_OFFSET, bytemuck::bytes_of(&header));
        }

        let provider = host.textures();
        if self.resources.texture_array.get().is_none_or(TextureArray::is_placeholder) {
            if let Some(data) = provider.init_texture_array() {
                match TextureArray::upload(device, queue, &data) {
                    Ok(textures) => {
                        self.resources.texture_array.set(textures);
                        self.resources.scene_bindings.release();
                    }
                    Err(err) => log::error!("texture array upload failed: {err:#}"),
                }
            }
        }

        if self.resources.scene_sampler.get().map(SceneSampler::level) != Some(config.anisotropic_filtering) {
            self.resources
                .scene_sampler
                .set(SceneSampler::new(device, config.anisotropic_filtering));
            self.resources.scene_bindings.release();
        }

        for (texture, diff) in batch.take_animations() {
            provider.animate(texture, diff);
        }
        for (id, offset) in self.texture_offsets.iter_mut().enumerate() {
            *offset = provider.uv_offset(id).unwrap_or_default();
        }
        let brightness = provider.brightness();

        let viewport = host.viewport();
        let scene = SceneUniform::new(&SceneParams {
            camera: view.camera,
            viewport_size: (viewport.width, viewport.height),
            sky_color: host.sky_color(),
            draw_distance: batch.draw_distance(),
            brightness,
            config,
            texture_offsets: &self.texture_offsets,
        });

        let stretched = host.stretched_size();
        let canvas = host.canvas_size();
        let ui = UiUniform::new(config.ui_scaling, canvas, stretched.unwrap_or(canvas));

        if let Some(uniform) = self.resources.uniform.get() {
            queue.write_buffer(uniform, SCENE_BLOCK_OFFSET, bytemuck::bytes_of(&scene));
            queue.write_buffer(uniform, UI_BLOCK_OFFSET, bytemuck::bytes_of(&ui));
        }
    }

    fn dispatch(&self, encoder: &mut wgpu::CommandEncoder, frame: &FrameBatch) {
        let resources = &self.resources;
        let (Some(compute), Some(uniform)) = (resources.compute.get(), resources.uniform.get()) else {
            return;
        };
        let counts = frame.dispatch_counts();
        let [unordered, small, large] = &resources.commands;

        let inputs = ComputeInputs {
            commands: [
                (unordered, counts.unordered),
                (small, counts.small),
                (large, counts.large),
            ],
            scene_vertices: &resources.scene_vertices,
            scene_uvs: &resources.scene_uvs,
            temp_vertices: &resources.temp_vertices,
            temp_uvs: &resources.temp_uvs,
            out_vertices: &resources.out_vertices,
            out_uvs: &resources.out_uvs,
            uniform,
        };
        let passes = compute.dispatch(self.gpu.device(), encoder, &inputs);
        log::trace!("{passes} compute passes for {counts:?}");
    }

    fn draw_scene(
        &mut self,
        host: &dyn HostClient,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        frame: &FrameBatch,
    ) -> Result<()> {
        let device = self.gpu.device();
        let resources = &mut self.resources;
        let (Some(pipeline), Some(uniform), Some(textures), Some(sampler)) = (
            resources.scene_pipeline.get(),
            resources.uniform.get(),
            resources.texture_array.get(),
            resources.scene_sampler.get(),
        ) else {
            return Err(anyhow!("scene resources are not allocated"));
        };
        let bindings = resources
            .scene_bindings
            .get_or_insert_with(|| pipeline.bind_group(device, uniform, textures.view_ref(), sampler.sampler()));

        let (vertices, uvs) = match self.mode {
            RenderMode::Compute => (&resources.out_vertices, &resources.out_uvs),
            RenderMode::Legacy => (&resources.temp_vertices, &resources.temp_uvs),
        };
        let geometry = match (vertices.buffer(), uvs.buffer()) {
            (Some(vertices), Some(uvs)) => Some(SceneGeometry {
                vertices,
                uvs,
                vertex_count: frame.output_vertices,
            }),
            _ => None,
        };

        let size = self.gpu.size();
        let viewport = scene_viewport(
            host.viewport(),
            host.canvas_size(),
            host.stretched_size(),
            host.scale_factor(),
            (size.width, size.height),
        );

        let mut target = match resources.aa.get() {
            Some(aa) => RenderTarget::multisampled(encoder, aa.view(), surface_view),
            None => RenderTarget::new(encoder, surface_view),
        };
        pipeline.render(&mut target, bindings, geometry, viewport, rgb_to_color(host.sky_color()));
        Ok(())
    }

    fn draw_interface(
        &mut self,
        host: &dyn HostClient,
        config: &RendererConfig,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
    ) -> Result<()> {
        let (device, queue) = (self.gpu.device(), self.gpu.queue());
        let stretched = host.stretched_size();
        let resources = &mut self.resources;

        let filter = config.ui_scaling.filter(stretched.is_some());
        if resources.ui_sampler.get().map(UiSampler::filter) != Some(filter) {
            resources.ui_sampler.set(UiSampler::new(device, filter));
            resources.ui_bindings.release();
        }

        let (Some(pipeline), Some(uniform), Some(texture), Some(sampler), Some(quad)) = (
            resources.ui_pipeline.get(),
            resources.uniform.get(),
            resources.interface_texture.get(),
            resources.ui_sampler.get(),
            resources.interface_quad.get(),
        ) else {
            return Err(anyhow!("interface resources are not allocated"));
        };

        if !texture.upload(queue, &host.interface()) {
            return Ok(());
        }
        let bindings = resources
            .ui_bindings
            .get_or_insert_with(|| pipeline.bind_group(device, uniform, texture, sampler));

        let size = self.gpu.size();
        let Some(viewport) = interface_viewport(
            host.canvas_size(),
            stretched,
            host.scale_factor(),
            (size.width, size.height),
        ) else {
            return Ok(());
        };

        let mut target = RenderTarget::new(encoder, surface_view);
        pipeline.draw(&mut target, bindings, quad, viewport);
        Ok(())
    }
}

fn init_resources(
    gpu: &Gpu,
    mode: RenderMode,
    config: &RendererConfig,
    resources: &mut RenderDeviceState,
) -> Result<()> {
    let (device, queue) = (gpu.device(), gpu.queue());
    let format = gpu.surface_format();

    let uniform = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("stratum uniforms"),
        size: UNIFORM_BUFFER_SIZE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    // The trig table never changes; only the header is rewritten per frame.
    let header_size = std::mem::size_of::<ComputeHeader>() as u64;
    queue.write_buffer(
        &uniform,
        COMPUTE_BLOCK_OFFSET + header_size,
        bytemuck::cast_slice(&trig_table()),
    );
    resources.uniform.set(uniform);
    resources.reserve_buffers(device);

    resources
        .interface_quad
        .set(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("stratum interface quad"),
            contents: quad_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        }));

    resources
        .scene_pipeline
        .set(ScenePipeline::new(device, format, 1).context("failed to create the scene pipeline")?);
    resources
        .ui_pipeline
        .set(UiPipeline::new(device, format).context("failed to create the interface pipeline")?);
    if mode == RenderMode::Compute {
        resources
            .compute
            .set(ComputePipelines::new(device).context("failed to create the compute pipelines")?);
    }

    resources.texture_array.set(TextureArray::placeholder(device, queue));
    resources
        .scene_sampler
        .set(SceneSampler::new(device, config.anisotropic_filtering));

    Ok(())
}
