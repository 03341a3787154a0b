use anyhow::{ensure, Result};

use crate::host::TextureArrayData;

/// The scene's texture array, or a single white layer until the host's
/// textures are loaded.
pub struct TextureArray {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    layers: u32,
    placeholder: bool,
}

impl TextureArray {
    fn create(device: &wgpu::Device, size: u32, layers: u32, label: &str) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        })
    }

    fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, size: u32, layer: u32, pixels: &[u8]) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
    }

    fn view(texture: &wgpu::Texture) -> wgpu::TextureView {
        texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("stratum texture array view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        })
    }

    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let texture = Self::create(device, 1, 1, "stratum placeholder texture");
        Self::write_layer(queue, &texture, 1, 0, &[0xff; 4]);
        Self {
            view: Self::view(&texture),
            _texture: texture,
            layers: 1,
            placeholder: true,
        }
    }

    /// Uploads the host's textures. Fails if the data does not fit the
    /// device or a layer has the wrong size.
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, data: &TextureArrayData) -> Result<Self> {
        let layers = data.layers.len() as u32;
        let limits = device.limits();
        ensure!(layers > 0, "texture array has no layers");
        ensure!(
            layers <= limits.max_texture_array_layers,
            "{layers} texture layers exceed the device limit of {}",
            limits.max_texture_array_layers
        );
        ensure!(
            data.size > 0 && data.size <= limits.max_texture_dimension_2d,
            "unsupported texture size {}",
            data.size
        );
        let expected = data.size as usize * data.size as usize * 4;
        for (i, layer) in data.layers.iter().enumerate() {
            ensure!(
                layer.len() == expected,
                "texture layer {i} has {} bytes, expected {expected}",
                layer.len()
            );
        }

        let texture = Self::create(device, data.size, layers, "stratum texture array");
        for (i, layer) in data.layers.iter().enumerate() {
            Self::write_layer(queue, &texture, data.size, i as u32, layer);
        }

        log::info!("texture array loaded: {layers} layers of {0}x{0}", data.size);
        Ok(Self {
            view: Self::view(&texture),
            _texture: texture,
            layers,
            placeholder: false,
        })
    }

    pub fn view_ref(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn layers(&self) -> u32 {
        self.layers
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

/// Filtering for a requested anisotropic level: nearest below 2, linear
/// with the level clamped to `1..=16` otherwise.
pub fn anisotropy_settings(level: u16) -> (wgpu::FilterMode, u16) {
    if level > 1 {
        (wgpu::FilterMode::Linear, level.clamp(1, 16))
    } else {
        (wgpu::FilterMode::Nearest, 1)
    }
}

/// Scene texture sampler for one anisotropic level.
pub struct SceneSampler {
    sampler: wgpu::Sampler,
    level: u16,
}

impl SceneSampler {
    pub fn new(device: &wgpu::Device, level: u16) -> Self {
        let (filter, anisotropy_clamp) = anisotropy_settings(level);
        let mipmap_filter = match filter {
            wgpu::FilterMode::Linear => wgpu::MipmapFilterMode::Linear,
            wgpu::FilterMode::Nearest => wgpu::MipmapFilterMode::Nearest,
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("stratum scene sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter,
            anisotropy_clamp,
            ..Default::default()
        });
        Self { sampler, level }
    }

    pub fn level(&self) -> u16 {
        self.level
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anisotropy_levels() {
        assert_eq!(anisotropy_settings(0), (wgpu::FilterMode::Nearest, 1));
        assert_eq!(anisotropy_settings(1), (wgpu::FilterMode::Nearest, 1));
        assert_eq!(anisotropy_settings(8), (wgpu::FilterMode::Linear, 8));
        assert_eq!(anisotropy_settings(64), (wgpu::FilterMode::Linear, 16));
    }
}
