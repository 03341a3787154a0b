use crate::render::{
    AaTarget, ComputePipelines, InterfaceTexture, ScenePipeline, SceneSampler, TextureArray, UiPipeline,
    UiSampler,
};

use super::{DeviceBuffer, Slot, MIN_BUFFER_SIZE};

/// Command buffer index per bucket: unordered, small, large.
pub const COMMAND_BUFFERS: usize = 3;

/// Every GPU object the renderer owns.
///
/// All fields start unallocated. [`RenderDeviceState::release_all`] puts
/// them back, whatever subset startup got through.
pub struct RenderDeviceState {
    pub scene_pipeline: Slot<ScenePipeline>,
    pub ui_pipeline: Slot<UiPipeline>,
    pub compute: Slot<ComputePipelines>,

    pub scene_vertices: DeviceBuffer,
    pub scene_uvs: DeviceBuffer,
    pub temp_vertices: DeviceBuffer,
    pub temp_uvs: DeviceBuffer,
    pub commands: [DeviceBuffer; COMMAND_BUFFERS],
    pub out_vertices: DeviceBuffer,
    pub out_uvs: DeviceBuffer,
    pub uniform: Slot<wgpu::Buffer>,
    pub interface_quad: Slot<wgpu::Buffer>,

    pub texture_array: Slot<TextureArray>,
    pub scene_sampler: Slot<SceneSampler>,
    pub interface_texture: Slot<InterfaceTexture>,
    pub ui_sampler: Slot<UiSampler>,

    pub scene_bindings: Slot<wgpu::BindGroup>,
    pub ui_bindings: Slot<wgpu::BindGroup>,

    pub aa: Slot<AaTarget>,
}

impl Default for RenderDeviceState {
    fn default() -> Self {
        use wgpu::BufferUsages as U;

        Self {
            scene_pipeline: Slot::Unallocated,
            ui_pipeline: Slot::Unallocated,
            compute: Slot::Unallocated,
            scene_vertices: DeviceBuffer::new("stratum scene vertices", U::STORAGE),
            scene_uvs: DeviceBuffer::new("stratum scene uvs", U::STORAGE),
            // The legacy path draws straight from the staging buffers.
            temp_vertices: DeviceBuffer::new("stratum temp vertices", U::STORAGE | U::VERTEX),
            temp_uvs: DeviceBuffer::new("stratum temp uvs", U::STORAGE | U::VERTEX),
            commands: [
                DeviceBuffer::new("stratum unordered commands", U::STORAGE),
                DeviceBuffer::new("stratum small commands", U::STORAGE),
                DeviceBuffer::new("stratum large commands", U::STORAGE),
            ],
            out_vertices: DeviceBuffer::new("stratum out vertices", U::STORAGE | U::VERTEX),
            out_uvs: DeviceBuffer::new("stratum out uvs", U::STORAGE | U::VERTEX),
            uniform: Slot::Unallocated,
            interface_quad: Slot::Unallocated,
            texture_array: Slot::Unallocated,
            scene_sampler: Slot::Unallocated,
            interface_texture: Slot::Unallocated,
            ui_sampler: Slot::Unallocated,
            scene_bindings: Slot::Unallocated,
            ui_bindings: Slot::Unallocated,
            aa: Slot::Unallocated,
        }
    }
}

impl RenderDeviceState {
    fn buffers(&self) -> impl Iterator<Item = &DeviceBuffer> {
        [
            &self.scene_vertices,
            &self.scene_uvs,
            &self.temp_vertices,
            &self.temp_uvs,
            &self.out_vertices,
            &self.out_uvs,
        ]
        .into_iter()
        .chain(&self.commands)
    }

    fn buffers_mut(&mut self) -> impl Iterator<Item = &mut DeviceBuffer> {
        [
            &mut self.scene_vertices,
            &mut self.scene_uvs,
            &mut self.temp_vertices,
            &mut self.temp_uvs,
            &mut self.out_vertices,
            &mut self.out_uvs,
        ]
        .into_iter()
        .chain(self.commands.iter_mut())
    }

    /// Gives every device buffer its minimum allocation, so compute
    /// bindings exist before the first scene or frame upload.
    pub fn reserve_buffers(&mut self, device: &wgpu::Device) {
        for buffer in self.buffers_mut() {
            buffer.reserve(device, MIN_BUFFER_SIZE);
        }
    }

    /// Labels of device buffers that are not allocated.
    pub fn unallocated_buffers(&self) -> Vec<&'static str> {
        self.buffers()
            .filter(|b| !b.is_allocated())
            .map(DeviceBuffer::label)
            .collect()
    }

    /// Releases everything. Returns how many objects were live.
    pub fn release_all(&mut self) -> usize {
        // Bind groups first; they reference the rest.
        let mut released = [
            self.scene_bindings.release(),
            self.ui_bindings.release(),
            self.aa.release(),
            self.scene_pipeline.release(),
            self.ui_pipeline.release(),
            self.compute.release(),
            self.uniform.release(),
            self.interface_quad.release(),
            self.texture_array.release(),
            self.scene_sampler.release(),
            self.interface_texture.release(),
            self.ui_sampler.release(),
        ]
        .into_iter()
        .filter(|&r| r)
        .count();

        released += self.buffers_mut().map(DeviceBuffer::release).filter(|&r| r).count();
        if released > 0 {
            log::debug!("released {released} gpu objects");
        }
        released
    }

    pub fn is_empty(&self) -> bool {
        self.buffers().all(|b| !b.is_allocated())
            && !self.scene_pipeline.is_allocated()
            && !self.ui_pipeline.is_allocated()
            && !self.compute.is_allocated()
            && !self.uniform.is_allocated()
            && !self.interface_quad.is_allocated()
            && !self.texture_array.is_allocated()
            && !self.scene_sampler.is_allocated()
            && !self.interface_texture.is_allocated()
            && !self.ui_sampler.is_allocated()
            && !self.scene_bindings.is_allocated()
            && !self.ui_bindings.is_allocated()
            && !self.aa.is_allocated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_empty_and_release_is_idempotent() {
        let mut state = RenderDeviceState::default();
        assert!(state.is_empty());
        assert_eq!(state.release_all(), 0);
        assert_eq!(state.release_all(), 0);
        assert!(state.is_empty());
    }

    #[test]
    fn reserved_buffers_bind_before_any_upload() {
        let (device, _queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
        let mut state = RenderDeviceState::default();
        assert_eq!(state.unallocated_buffers().len(), 6 + COMMAND_BUFFERS);

        state.reserve_buffers(&device);
        assert!(state.unallocated_buffers().is_empty());
        assert!(state.scene_vertices.binding(None).is_some());
        assert!(state.scene_uvs.binding(None).is_some());
        assert_eq!(state.scene_vertices.capacity(), MIN_BUFFER_SIZE);
        assert!(state.scene_vertices.is_empty());

        assert_eq!(state.release_all(), 6 + COMMAND_BUFFERS);
        assert!(state.is_empty());
    }
}
