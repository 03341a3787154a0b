//! Frame readback for screenshots and the mirror.
//!
//! The copy is recorded into the frame's encoder before submission; the
//! buffer is only mapped when someone asks for the pixels.

use std::sync::mpsc;

use image::{RgbImage, RgbaImage};

/// Converts a mapped readback into tightly packed RGBA rows.
///
/// `padded_row` is the source stride in bytes. `bgra` swaps red and blue.
/// `flip` reverses the row order for bottom-up sources.
pub fn unpack_rows(data: &[u8], width: usize, height: usize, padded_row: usize, bgra: bool, flip: bool) -> Vec<u8> {
    let row_bytes = width * 4;
    let mut rgba = vec![0u8; row_bytes * height];
    for y in 0..height {
        let src = &data[y * padded_row..y * padded_row + row_bytes];
        let dst_y = if flip { height - 1 - y } else { y };
        let dst = &mut rgba[dst_y * row_bytes..(dst_y + 1) * row_bytes];
        if bgra {
            for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                d.copy_from_slice(&[s[2], s[1], s[0], s[3]]);
            }
        } else {
            dst.copy_from_slice(src);
        }
    }
    rgba
}

/// Drops the alpha channel.
pub fn strip_alpha(image: &RgbaImage) -> RgbImage {
    let rgb = image.pixels().flat_map(|p| [p[0], p[1], p[2]]).collect();
    // Buffer length is width × height × 3 by construction.
    RgbImage::from_raw(image.width(), image.height(), rgb).unwrap_or_default()
}

/// A surface copy recorded into a frame's command encoder.
pub struct FrameCapture {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row: u32,
    bgra: bool,
}

impl FrameCapture {
    /// Records a copy of `texture` into a new readback buffer. `None` for
    /// formats that are not 8-bit RGBA/BGRA.
    pub fn record(
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        texture: &wgpu::Texture,
        format: wgpu::TextureFormat,
    ) -> Option<Self> {
        let bgra = match format {
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => true,
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => false,
            other => {
                log::warn!("frame capture unsupported for surface format {other:?}");
                return None;
            }
        };

        let width = texture.width().max(1);
        let height = texture.height().max(1);
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = (4 * width).div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stratum frame readback"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        Some(Self {
            buffer,
            width,
            height,
            padded_row,
            bgra,
        })
    }

    /// Blocks until the copy has landed and returns the frame. Call after
    /// the recording encoder was submitted.
    pub fn read(&self, device: &wgpu::Device) -> Option<RgbaImage> {
        let slice = self.buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        if let Err(err) = device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        }) {
            log::warn!("frame readback poll failed: {err}");
        }

        if !rx.recv().is_ok_and(|res| res.is_ok()) {
            log::warn!("frame readback failed: buffer could not be mapped");
            return None;
        }

        let rgba = {
            let data = slice.get_mapped_range();
            // wgpu copies rows top-down.
            unpack_rows(
                &data,
                self.width as usize,
                self.height as usize,
                self.padded_row as usize,
                self.bgra,
                false,
            )
        };
        self.buffer.unmap();
        RgbaImage::from_raw(self.width, self.height, rgba)
    }
}

/// The frame handed to `draw_complete`. Pixels are read back on first
/// access only.
pub struct Screenshot<'a> {
    source: Option<(&'a wgpu::Device, &'a FrameCapture)>,
    rgba: Option<Option<RgbaImage>>,
}

impl<'a> Screenshot<'a> {
    /// A screenshot with no pixels behind it.
    pub fn unavailable() -> Self {
        Self {
            source: None,
            rgba: Some(None),
        }
    }

    pub fn new(device: &'a wgpu::Device, capture: &'a FrameCapture) -> Self {
        Self {
            source: Some((device, capture)),
            rgba: None,
        }
    }

    /// The frame as RGBA, read back at most once.
    pub fn rgba(&mut self) -> Option<&RgbaImage> {
        let source = self.source;
        self.rgba
            .get_or_insert_with(|| source.and_then(|(device, capture)| capture.read(device)))
            .as_ref()
    }

    /// The frame without its alpha channel.
    pub fn image(&mut self) -> Option<RgbImage> {
        self.rgba().map(strip_alpha)
    }

    /// Takes the RGBA frame out, reading it back if needed.
    pub fn take(mut self) -> Option<RgbaImage> {
        self.rgba();
        self.rgba.flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_rows_are_dropped() {
        // 1 pixel wide, stride 8
        let data = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8, 0, 0, 0, 0];
        assert_eq!(unpack_rows(&data, 1, 2, 8, false, false), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn bgra_is_swizzled() {
        let data = [10, 20, 30, 255];
        assert_eq!(unpack_rows(&data, 1, 1, 4, true, false), vec![30, 20, 10, 255]);
    }

    #[test]
    fn bottom_up_rows_are_flipped() {
        let data = [1, 1, 1, 1, 2, 2, 2, 2];
        assert_eq!(unpack_rows(&data, 1, 2, 4, false, true), vec![2, 2, 2, 2, 1, 1, 1, 1]);
    }

    #[test]
    fn alpha_is_stripped() {
        let rgba = RgbaImage::from_raw(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let rgb = strip_alpha(&rgba);
        assert_eq!(rgb.dimensions(), (2, 1));
        assert_eq!(rgb.into_raw(), vec![1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn unavailable_screenshot_is_empty() {
        let mut shot = Screenshot::unavailable();
        assert!(shot.rgba().is_none());
        assert!(shot.image().is_none());
        assert!(shot.take().is_none());
    }
}
