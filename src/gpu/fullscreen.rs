//! Full-screen-quad renderer and the texture-unit table it samples from.

use wgpu::util::DeviceExt;

use super::pipeline_helpers;
use super::render_context::RenderContext;
use super::shader_program::ShaderProgram;
use crate::error::PostFxError;

/// Number of texture units a program can sample.
pub const MAX_TEXTURE_UNITS: u32 = 4;

/// Attachment formats a pipeline must be built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputLayout {
    /// One format per color attachment, in attachment order.
    pub colors: Vec<wgpu::TextureFormat>,
    /// Depth attachment format, if the target has one.
    pub depth: Option<wgpu::TextureFormat>,
}

impl OutputLayout {
    /// A single color attachment with no depth.
    pub fn color(format: wgpu::TextureFormat) -> Self {
        Self {
            colors: vec![format],
            depth: None,
        }
    }
}

/// Where a full-screen draw writes.
pub struct FsqOutput<'a> {
    /// Color attachment views, matching `layout.colors`.
    pub colors: Vec<&'a wgpu::TextureView>,
    /// Depth attachment view, matching `layout.depth`.
    pub depth: Option<&'a wgpu::TextureView>,
    /// Formats of the attachments above.
    pub layout: OutputLayout,
    /// Clear color applied before drawing; `None` keeps existing contents.
    pub clear: Option<wgpu::Color>,
}

/// Draws a six-vertex full-screen quad with the bound program, sampling the
/// textures currently assigned to each unit.
pub struct FsqRenderer {
    sampler: wgpu::Sampler,
    units: [Option<wgpu::TextureView>; MAX_TEXTURE_UNITS as usize],
}

impl FsqRenderer {
    /// Create the shared linear clamp sampler and an empty unit table.
    pub fn new(context: &RenderContext) -> Self {
        Self {
            sampler: pipeline_helpers::linear_sampler(
                &context.device,
                "FSQ Sampler",
            ),
            units: Default::default(),
        }
    }

    /// Assign `view` to texture `unit`. Out-of-range units are ignored.
    pub fn bind_texture(&mut self, unit: u32, view: &wgpu::TextureView) {
        match self.units.get_mut(unit as usize) {
            Some(slot) => *slot = Some(view.clone()),
            None => log::warn!("texture unit {unit} out of range"),
        }
    }

    /// Clear texture `unit`.
    pub fn unbind_texture(&mut self, unit: u32) {
        if let Some(slot) = self.units.get_mut(unit as usize) {
            *slot = None;
        }
    }

    /// Clear every texture unit.
    pub fn unbind_all(&mut self) {
        self.units = Default::default();
    }

    /// The view currently assigned to `unit`.
    pub fn bound_texture(&self, unit: u32) -> Option<&wgpu::TextureView> {
        self.units.get(unit as usize).and_then(Option::as_ref)
    }

    /// Record one full-screen-quad draw of `program` into `output`.
    ///
    /// The uniform values staged on `program` at this moment are uploaded
    /// into a buffer owned by this draw, so later `set_uniform` calls do not
    /// affect it.
    ///
    /// # Errors
    ///
    /// [`PostFxError::ProgramNotBound`] if `program` is not bound,
    /// [`PostFxError::UnboundTexture`] if it samples an empty unit, or
    /// [`PostFxError::ShaderLink`] if it was never linked.
    pub fn draw(
        &self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        program: &mut ShaderProgram,
        output: &FsqOutput<'_>,
    ) -> Result<(), PostFxError> {
        if !program.is_bound() {
            return Err(PostFxError::ProgramNotBound(program.label().to_owned()));
        }
        let bind_group = self.bind_group(context, program)?;
        let label = program.label().to_owned();
        let pipeline = program.pipeline_for(&context.device, &output.layout)?;

        let load = match output.clear {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> =
            output
                .colors
                .iter()
                .map(|&view| {
                    Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })
                })
                .collect();

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&label),
            color_attachments: &color_attachments,
            depth_stencil_attachment: output.depth.map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..6, 0..1);
        Ok(())
    }

    fn bind_group(
        &self,
        context: &RenderContext,
        program: &ShaderProgram,
    ) -> Result<wgpu::BindGroup, PostFxError> {
        let layout =
            program
                .bind_group_layout()
                .ok_or_else(|| PostFxError::ShaderLink {
                    label: program.label().to_owned(),
                    message: "program drawn before link".to_owned(),
                })?;
        let bindings = program.reflected().cloned().unwrap_or_default();

        let uniform_buffer = bindings.uniform.as_ref().map(|_| {
            context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("FSQ Uniforms"),
                    contents: program.staged_uniforms(),
                    usage: wgpu::BufferUsages::UNIFORM,
                })
        });

        let mut entries = Vec::new();
        for slot in &bindings.textures {
            let view = self.bound_texture(slot.unit).ok_or_else(|| {
                PostFxError::UnboundTexture {
                    program: program.label().to_owned(),
                    unit: slot.unit,
                }
            })?;
            entries.push(wgpu::BindGroupEntry {
                binding: slot.unit * 2,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        for &binding in &bindings.samplers {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            });
        }
        if let (Some(block), Some(buffer)) = (&bindings.uniform, &uniform_buffer) {
            entries.push(wgpu::BindGroupEntry {
                binding: block.binding(),
                resource: buffer.as_entire_binding(),
            });
        }

        Ok(context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Bind Group", program.label())),
            layout,
            entries: &entries,
        }))
    }
}

/// Anything whose color attachments can be sampled by a full-screen draw.
pub trait ColorSource {
    /// View of color attachment `index`, or `None` when the source has no
    /// color attachments yet.
    ///
    /// Implementations clamp `index` to their last attachment.
    fn color_attachment(&self, index: usize) -> Option<&wgpu::TextureView>;

    /// Assign color attachment `attachment` to texture `unit` of `fsq`.
    ///
    /// A source without attachments leaves `unit` untouched; a draw sampling
    /// it then fails with [`PostFxError::UnboundTexture`].
    fn bind_color_as_texture(
        &self,
        fsq: &mut FsqRenderer,
        attachment: usize,
        unit: u32,
    ) {
        match self.color_attachment(attachment) {
            Some(view) => fsq.bind_texture(unit, view),
            None => log::warn!(
                "no color attachment {attachment} to bind to unit {unit}"
            ),
        }
    }

    /// Clear texture `unit` of `fsq`.
    fn unbind_texture(&self, fsq: &mut FsqRenderer, unit: u32) {
        fsq.unbind_texture(unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::render_context::tests::test_context;

    fn view(ctx: &RenderContext) -> wgpu::TextureView {
        ctx.device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("unit test"),
                size: wgpu::Extent3d {
                    width: 4,
                    height: 4,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    #[test]
    fn output_layout_equality_keys_pipelines() {
        let a = OutputLayout::color(wgpu::TextureFormat::Rgba8Unorm);
        let b = OutputLayout {
            colors: vec![wgpu::TextureFormat::Rgba8Unorm],
            depth: Some(wgpu::TextureFormat::Depth32Float),
        };
        assert_ne!(a, b);
        assert_eq!(a, OutputLayout::color(wgpu::TextureFormat::Rgba8Unorm));
    }

    #[test]
    fn unit_table_binds_and_clears() {
        let Some(ctx) = test_context() else { return };
        let mut fsq = FsqRenderer::new(&ctx);
        let v = view(&ctx);

        fsq.bind_texture(0, &v);
        fsq.bind_texture(3, &v);
        fsq.bind_texture(MAX_TEXTURE_UNITS, &v);
        assert!(fsq.bound_texture(0).is_some());
        assert!(fsq.bound_texture(3).is_some());
        assert!(fsq.bound_texture(MAX_TEXTURE_UNITS).is_none());

        fsq.unbind_texture(0);
        assert!(fsq.bound_texture(0).is_none());
        fsq.unbind_all();
        assert!(fsq.bound_texture(3).is_none());
    }
}
