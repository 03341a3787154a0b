//! The three face compute passes.
//!
//! Every pass reads one command list and writes ordered triangles into the
//! shared output buffers. One workgroup handles one command.

use anyhow::Result;
use bytemuck::{Pod, Zeroable};

use stratum_geometry::command::{Bucket, COMMAND_STRIDE, MAX_TRIANGLES, SMALL_TRIANGLE_COUNT};
use stratum_geometry::perspective::sin_cos_table;

use crate::host::Camera;
use crate::resources::DeviceBuffer;

use super::common::{uniform_block, uniform_layout_entry, COMPUTE_BLOCK_OFFSET};
use super::shader;

/// Largest workgroup count per dispatch dimension.
pub const MAX_WORKGROUPS_PER_DIMENSION: u32 = 65_535;

/// The eight integers rewritten every frame.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct ComputeHeader {
    pub yaw: i32,
    pub pitch: i32,
    pub center_x: i32,
    pub center_y: i32,
    pub zoom: i32,
    pub camera_x: i32,
    pub camera_y: i32,
    pub camera_z: i32,
}

impl ComputeHeader {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            yaw: camera.yaw,
            pitch: camera.pitch,
            center_x: camera.center_x,
            center_y: camera.center_y,
            zoom: camera.zoom,
            camera_x: camera.x,
            camera_y: camera.y,
            camera_z: camera.z,
        }
    }
}

const HEADER_SIZE: u64 = std::mem::size_of::<ComputeHeader>() as u64;

/// Header plus the packed trig table.
pub const COMPUTE_UNIFORM_SIZE: u64 = HEADER_SIZE + 1024 * 16;

/// The trig table as laid out after the header: `(sin a, cos a, sin a+1,
/// cos a+1)` for every even angle.
pub fn trig_table() -> Vec<i32> {
    sin_cos_table().flat_map(|(sin, cos)| [sin, cos]).collect()
}

/// Workgroup grid for `commands` workgroups, folded into a second
/// dimension past the per-dimension limit.
pub fn workgroup_grid(commands: u32) -> (u32, u32) {
    if commands <= MAX_WORKGROUPS_PER_DIMENSION {
        (commands, 1)
    } else {
        (
            MAX_WORKGROUPS_PER_DIMENSION,
            commands.div_ceil(MAX_WORKGROUPS_PER_DIMENSION),
        )
    }
}

/// Buffers the passes read and write this frame.
pub struct ComputeInputs<'a> {
    pub commands: [(&'a DeviceBuffer, u32); 3],
    pub scene_vertices: &'a DeviceBuffer,
    pub scene_uvs: &'a DeviceBuffer,
    pub temp_vertices: &'a DeviceBuffer,
    pub temp_uvs: &'a DeviceBuffer,
    pub out_vertices: &'a DeviceBuffer,
    pub out_uvs: &'a DeviceBuffer,
    pub uniform: &'a wgpu::Buffer,
}

impl ComputeInputs<'_> {
    fn commands(&self, bucket: Bucket) -> (&DeviceBuffer, u32) {
        let index = match bucket {
            Bucket::Unordered => 0,
            Bucket::Small => 1,
            Bucket::Large => 2,
        };
        self.commands[index]
    }
}

pub struct ComputePipelines {
    data_layout: wgpu::BindGroupLayout,
    uniform_layout: wgpu::BindGroupLayout,
    unordered: wgpu::ComputePipeline,
    small: wgpu::ComputePipeline,
    large: wgpu::ComputePipeline,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl ComputePipelines {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let data_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stratum compute data bgl"),
            entries: &[
                storage_entry(0, true),  // commands
                storage_entry(1, true),  // scene vertices
                storage_entry(2, true),  // temp vertices
                storage_entry(3, false), // out vertices
                storage_entry(4, false), // out uvs
                storage_entry(5, true),  // scene uvs
                storage_entry(6, true),  // temp uvs
            ],
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stratum compute uniform bgl"),
            entries: &[uniform_layout_entry(
                0,
                wgpu::ShaderStages::COMPUTE,
                COMPUTE_UNIFORM_SIZE,
            )],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("stratum compute pipeline layout"),
            bind_group_layouts: &[&data_layout, &uniform_layout],
            immediate_size: 0,
        });

        let build = |label: &str, source: &str| -> Result<wgpu::ComputePipeline> {
            let module = shader::create_module(device, label, source)?;
            Ok(device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            }))
        };

        Ok(Self {
            unordered: build("stratum unordered", &shader::unordered_source())?,
            small: build("stratum sort small", &shader::sort_source(SMALL_TRIANGLE_COUNT as u32))?,
            large: build("stratum sort large", &shader::sort_source(MAX_TRIANGLES as u32))?,
            data_layout,
            uniform_layout,
        })
    }

    fn pipeline(&self, bucket: Bucket) -> &wgpu::ComputePipeline {
        match bucket {
            Bucket::Unordered => &self.unordered,
            Bucket::Small => &self.small,
            Bucket::Large => &self.large,
        }
    }

    /// Records all non-empty passes into one compute pass. Returns the
    /// number of dispatches issued.
    pub fn dispatch(&self, device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder, inputs: &ComputeInputs<'_>) -> usize {
        let uniform_bind_group = self.uniform_bind_group(device, inputs.uniform);

        let mut dispatched = 0;
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("stratum face compute"),
            timestamp_writes: None,
        });

        for bucket in Bucket::ALL {
            let (commands, count) = inputs.commands(bucket);
            if count == 0 {
                continue;
            }
            let Some(bind_group) = self.data_bind_group(device, inputs, commands, count, bucket) else {
                log::warn!("{} pass skipped: buffers not allocated", bucket.label());
                continue;
            };

            let (x, y) = workgroup_grid(count);
            cpass.set_pipeline(self.pipeline(bucket));
            cpass.set_bind_group(0, &bind_group, &[]);
            cpass.set_bind_group(1, &uniform_bind_group, &[]);
            cpass.dispatch_workgroups(x, y, 1);
            dispatched += 1;
        }

        dispatched
    }

    fn uniform_bind_group(&self, device: &wgpu::Device, uniform: &wgpu::Buffer) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stratum compute uniform bind group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_block(uniform, COMPUTE_BLOCK_OFFSET, COMPUTE_UNIFORM_SIZE),
            }],
        })
    }

    fn data_bind_group(
        &self,
        device: &wgpu::Device,
        inputs: &ComputeInputs<'_>,
        commands: &DeviceBuffer,
        count: u32,
        bucket: Bucket,
    ) -> Option<wgpu::BindGroup> {
        // The shaders take the command count from the binding size.
        let entries = [
            commands.binding(Some(count as u64 * COMMAND_STRIDE))?,
            inputs.scene_vertices.binding(None)?,
            inputs.temp_vertices.binding(None)?,
            inputs.out_vertices.binding(None)?,
            inputs.out_uvs.binding(None)?,
            inputs.scene_uvs.binding(None)?,
            inputs.temp_uvs.binding(None)?,
        ];
        let entries: Vec<wgpu::BindGroupEntry<'_>> = entries
            .into_iter()
            .enumerate()
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource,
            })
            .collect();

        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(bucket.label()),
            layout: &self.data_layout,
            entries: &entries,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_eight_ints() {
        assert_eq!(HEADER_SIZE, 32);
        let camera = Camera {
            yaw: 3,
            pitch: 4,
            x: 7,
            ..Default::default()
        };
        let header = ComputeHeader::from_camera(&camera);
        assert_eq!(bytemuck::cast::<_, [i32; 8]>(header), [3, 4, 0, 0, 0, 7, 0, 0]);
    }

    #[test]
    fn trig_table_fills_the_uniform() {
        let table = trig_table();
        assert_eq!(table.len() as u64 * 4, COMPUTE_UNIFORM_SIZE - HEADER_SIZE);
        assert_eq!(&table[..2], &[0, 65536]);
        // angle 512 sits in entry 256, first half
        assert_eq!(&table[1024..1026], &[65536, 0]);
    }

    #[test]
    fn dispatch_grid_folds_past_limit() {
        assert_eq!(workgroup_grid(0), (0, 1));
        assert_eq!(workgroup_grid(600), (600, 1));
        assert_eq!(workgroup_grid(65_535), (65_535, 1));
        assert_eq!(workgroup_grid(65_536), (65_535, 2));
        assert_eq!(workgroup_grid(200_000), (65_535, 4));
    }
}
