mod demo;
mod host;

use anyhow::Result;
use stratum_engine::device::GpuInit;
use stratum_engine::logging::{init_logging, LoggingConfig};
use stratum_engine::window::{Runtime, RuntimeConfig};
use stratum_engine::{AntiAliasingMode, RendererConfig};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    log::info!("stratum viewer {}", env!("CARGO_PKG_VERSION"));

    let config = RendererConfig {
        draw_distance: 40,
        fog_depth: 40,
        fog_corner_radius: 30,
        fog_density: 5,
        anti_aliasing: AntiAliasingMode::Msaa4,
        anisotropic_filtering: 4,
        ..Default::default()
    };

    Runtime::run(
        RuntimeConfig {
            title: "stratum viewer".to_string(),
            ..Default::default()
        },
        config,
        GpuInit::default(),
        host::Viewer::new(),
    )
}
