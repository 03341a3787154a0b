/// Where a pass draws: the encoder, the colour view, and the view a
/// multisampled colour view resolves into.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub resolve_view: Option<&'a wgpu::TextureView>,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self {
            encoder,
            color_view,
            resolve_view: None,
        }
    }

    /// Draws into `msaa_view` and resolves into `resolve_view` at the end of
    /// the pass.
    #[inline]
    pub fn multisampled(
        encoder: &'a mut wgpu::CommandEncoder,
        msaa_view: &'a wgpu::TextureView,
        resolve_view: &'a wgpu::TextureView,
    ) -> Self {
        Self {
            encoder,
            color_view: msaa_view,
            resolve_view: Some(resolve_view),
        }
    }

    pub(super) fn color_attachment(&self, load: wgpu::LoadOp<wgpu::Color>) -> wgpu::RenderPassColorAttachment<'a> {
        wgpu::RenderPassColorAttachment {
            view: self.color_view,
            resolve_target: self.resolve_view,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        }
    }
}
