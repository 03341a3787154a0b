//! WGSL sources and module creation.
//!
//! Every module is parsed and validated with naga before it reaches the
//! device.

use anyhow::{anyhow, Result};

const COMPUTE_COMMON: &str = include_str!("shaders/compute_common.wgsl");
const UNORDERED: &str = include_str!("shaders/unordered.wgsl");
const PRIORITY_SORT: &str = include_str!("shaders/priority_sort.wgsl");
pub(super) const SCENE: &str = include_str!("shaders/scene.wgsl");
pub(super) const UI: &str = include_str!("shaders/ui.wgsl");

/// Threads per sort workgroup; fixed in the sort shader.
pub(super) const SORT_THREADS: u32 = 256;

pub(super) fn unordered_source() -> String {
    format!("{COMPUTE_COMMON}\n{UNORDERED}")
}

/// Sort shader specialised for up to `max_faces` faces per command.
pub(super) fn sort_source(max_faces: u32) -> String {
    let faces_per_thread = max_faces.div_ceil(SORT_THREADS);
    format!(
        "const MAX_FACES: u32 = {}u;\nconst FACES_PER_THREAD: u32 = {faces_per_thread}u;\n{COMPUTE_COMMON}\n{PRIORITY_SORT}",
        faces_per_thread * SORT_THREADS,
    )
}

/// Parses and validates `source`.
pub fn validate_wgsl(label: &str, source: &str) -> Result<()> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| anyhow!("{label}: {}", e.emit_to_string(source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("{label}: {}", e.into_inner()))?;

    Ok(())
}

/// Validates `source` and creates the shader module.
pub(super) fn create_module(device: &wgpu::Device, label: &str, source: &str) -> Result<wgpu::ShaderModule> {
    validate_wgsl(label, source)?;
    log::debug!("compiled shader {label}");
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }))
}

#[cfg(test)]
mod tests {
    use stratum_geometry::command::{MAX_TRIANGLES, SMALL_TRIANGLE_COUNT};

    use super::*;

    #[test]
    fn compute_shaders_validate() {
        validate_wgsl("unordered", &unordered_source()).unwrap();
        validate_wgsl("sort small", &sort_source(SMALL_TRIANGLE_COUNT as u32)).unwrap();
        validate_wgsl("sort large", &sort_source(MAX_TRIANGLES as u32)).unwrap();
    }

    #[test]
    fn render_shaders_validate() {
        validate_wgsl("scene", SCENE).unwrap();
        validate_wgsl("ui", UI).unwrap();
    }

    #[test]
    fn sort_prefix_covers_whole_workgroup() {
        let src = sort_source(512);
        assert!(src.starts_with("const MAX_FACES: u32 = 512u;\nconst FACES_PER_THREAD: u32 = 2u;"));
        let src = sort_source(4096);
        assert!(src.contains("FACES_PER_THREAD: u32 = 16u;"));
    }

    #[test]
    fn broken_source_reports_label() {
        let err = validate_wgsl("broken", "fn main( {").unwrap_err();
        assert!(err.to_string().starts_with("broken:"));
    }
}
