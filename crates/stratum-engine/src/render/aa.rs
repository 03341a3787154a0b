//! Multisample target management.

use crate::config::AntiAliasingMode;

/// What the multisample target was built for.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AaKey {
    pub mode: AntiAliasingMode,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AaTransition {
    Keep,
    Rebuild(AaKey),
    Release,
}

/// Decides what happens to the multisample target for a frame drawn at
/// `size` with `mode`, given the key it was last built for.
pub fn plan(mode: AntiAliasingMode, size: (u32, u32), current: Option<AaKey>) -> AaTransition {
    if !mode.is_enabled() {
        return match current {
            Some(_) => AaTransition::Release,
            None => AaTransition::Keep,
        };
    }

    let key = AaKey {
        mode,
        width: size.0,
        height: size.1,
    };
    if current == Some(key) {
        AaTransition::Keep
    } else {
        AaTransition::Rebuild(key)
    }
}

/// Multisampled colour texture the scene renders into before resolving to
/// the surface.
pub struct AaTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    samples: u32,
}

impl AaTarget {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, key: AaKey, samples: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stratum msaa target"),
            size: wgpu::Extent3d {
                width: key.width.max(1),
                height: key.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::info!(
            "msaa target rebuilt: {samples}x at {}x{} ({:?} requested)",
            key.width,
            key.height,
            key.mode
        );
        Self {
            _texture: texture,
            view,
            samples,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_releases_only_when_built() {
        assert_eq!(plan(AntiAliasingMode::Disabled, (800, 600), None), AaTransition::Keep);
        let key = AaKey {
            mode: AntiAliasingMode::Msaa4,
            width: 800,
            height: 600,
        };
        assert_eq!(plan(AntiAliasingMode::Disabled, (800, 600), Some(key)), AaTransition::Release);
    }

    #[test]
    fn rebuilds_on_mode_or_size_change() {
        let key = AaKey {
            mode: AntiAliasingMode::Msaa4,
            width: 800,
            height: 600,
        };
        assert_eq!(plan(AntiAliasingMode::Msaa4, (800, 600), None), AaTransition::Rebuild(key));
        assert_eq!(plan(AntiAliasingMode::Msaa4, (800, 600), Some(key)), AaTransition::Keep);
        assert!(matches!(
            plan(AntiAliasingMode::Msaa8, (800, 600), Some(key)),
            AaTransition::Rebuild(AaKey {
                mode: AntiAliasingMode::Msaa8,
                ..
            })
        ));
        assert!(matches!(
            plan(AntiAliasingMode::Msaa4, (1024, 600), Some(key)),
            AaTransition::Rebuild(AaKey { width: 1024, .. })
        ));
    }
}
