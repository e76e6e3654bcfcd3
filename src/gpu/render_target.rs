//! Off-screen framebuffers: one or more color attachments plus an optional
//! depth attachment, all the same size.

use super::fullscreen::{ColorSource, FsqOutput, FsqRenderer, OutputLayout};
use super::render_context::RenderContext;
use super::shader_program::ShaderProgram;
use crate::error::PostFxError;

/// Format of every depth attachment.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Attachment list for a [`RenderTarget`], consumed by
/// [`init`](Self::init).
#[derive(Debug, Clone)]
pub struct RenderTargetDesc {
    label: String,
    colors: Vec<wgpu::TextureFormat>,
    depth: bool,
}

impl RenderTargetDesc {
    /// Start an empty attachment list.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            colors: Vec::new(),
            depth: false,
        }
    }

    /// Append a color attachment of `format`.
    #[must_use]
    pub fn add_color_target(mut self, format: wgpu::TextureFormat) -> Self {
        self.colors.push(format);
        self
    }

    /// Give the target a depth attachment.
    #[must_use]
    pub fn add_depth_target(mut self) -> Self {
        self.depth = true;
        self
    }

    /// Allocate the attachments at `width` x `height` (each clamped to 1).
    ///
    /// A list with no color attachments gets one in the context's format.
    pub fn init(
        self,
        context: &RenderContext,
        width: u32,
        height: u32,
    ) -> RenderTarget {
        let width = width.max(1);
        let height = height.max(1);
        let mut formats = self.colors;
        if formats.is_empty() {
            formats.push(context.format());
        }

        let colors = formats
            .iter()
            .enumerate()
            .map(|(i, &format)| {
                let texture = create_texture(
                    &context.device,
                    &format!("{} Color {i}", self.label),
                    width,
                    height,
                    format,
                    wgpu::TextureUsages::RENDER_ATTACHMENT
                        | wgpu::TextureUsages::TEXTURE_BINDING
                        | wgpu::TextureUsages::COPY_SRC
                        | wgpu::TextureUsages::COPY_DST,
                );
                let view =
                    texture.create_view(&wgpu::TextureViewDescriptor::default());
                Attachment { texture, view }
            })
            .collect();

        let depth = self.depth.then(|| {
            let texture = create_texture(
                &context.device,
                &format!("{} Depth", self.label),
                width,
                height,
                DEPTH_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            );
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            Attachment { texture, view }
        });

        log::debug!(
            "render target '{}' {width}x{height}, {} color",
            self.label,
            formats.len()
        );
        RenderTarget {
            label: self.label,
            width,
            height,
            layout: OutputLayout {
                colors: formats,
                depth: self.depth.then_some(DEPTH_FORMAT),
            },
            colors,
            depth,
        }
    }
}

fn create_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

struct Attachment {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// An allocated off-screen framebuffer.
pub struct RenderTarget {
    label: String,
    width: u32,
    height: u32,
    layout: OutputLayout,
    colors: Vec<Attachment>,
    depth: Option<Attachment>,
}

impl RenderTarget {
    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Attachment formats, used to key pipelines.
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Number of color attachments.
    pub fn color_count(&self) -> usize {
        self.colors.len()
    }

    /// Texture of color attachment `index`, clamped to the last attachment.
    pub fn color_texture(&self, index: usize) -> &wgpu::Texture {
        &self.color(index).texture
    }

    /// View of color attachment `index`, clamped to the last attachment.
    pub fn color_view(&self, index: usize) -> &wgpu::TextureView {
        &self.color(index).view
    }

    /// Depth attachment view, if any.
    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.depth.as_ref().map(|d| &d.view)
    }

    fn color(&self, index: usize) -> &Attachment {
        let last = self.colors.len().saturating_sub(1);
        &self.colors[index.min(last)]
    }

    /// Draw a full-screen quad with `program` into every attachment,
    /// keeping existing contents under the quad.
    ///
    /// # Errors
    ///
    /// See [`FsqRenderer::draw`].
    pub fn render_to_fsq(
        &self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        fsq: &FsqRenderer,
        program: &mut ShaderProgram,
    ) -> Result<(), PostFxError> {
        fsq.draw(
            context,
            encoder,
            program,
            &FsqOutput {
                colors: self.colors.iter().map(|c| &c.view).collect(),
                depth: self.depth_view(),
                layout: self.layout.clone(),
                clear: None,
            },
        )
    }

    /// Clear every color attachment to `color` and depth to 1.0.
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder, color: wgpu::Color) {
        let _pass =
            self.begin(encoder, wgpu::LoadOp::Clear(color), wgpu::LoadOp::Clear(1.0));
    }

    fn begin<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        color_load: wgpu::LoadOp<wgpu::Color>,
        depth_load: wgpu::LoadOp<f32>,
    ) -> wgpu::RenderPass<'e> {
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> =
            self.colors
                .iter()
                .map(|c| {
                    Some(wgpu::RenderPassColorAttachment {
                        view: &c.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: color_load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })
                })
                .collect();
        encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(&self.label),
                color_attachments: &color_attachments,
                depth_stencil_attachment: self.depth_view().map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            })
    }

    /// Upload tightly packed pixel data into color attachment `index`.
    ///
    /// # Errors
    ///
    /// [`PostFxError::Readback`] if `data` does not cover the attachment.
    pub fn write_color(
        &self,
        context: &RenderContext,
        index: usize,
        data: &[u8],
    ) -> Result<(), PostFxError> {
        let texture = self.color_texture(index);
        let bpp = texture.format().block_copy_size(None).unwrap_or(4);
        let bytes_per_row = self.width * bpp;
        let expected = bytes_per_row as usize * self.height as usize;
        if data.len() != expected {
            return Err(PostFxError::Readback(format!(
                "expected {expected} bytes for '{}', got {}",
                self.label,
                data.len()
            )));
        }
        context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(self.height),
            },
            texture.size(),
        );
        Ok(())
    }
}

impl ColorSource for RenderTarget {
    fn color_attachment(&self, index: usize) -> Option<&wgpu::TextureView> {
        Some(self.color_view(index))
    }
}
