//! Color grading through a 3D lookup table sampled on texture unit 1.

use super::{FsqDraw, Lut3d, PassInput, PostEffect, PostProcess};
use crate::error::PostFxError;
use crate::gpu::fullscreen::ColorSource;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;

const FRAGMENT: &str = "post/color_correction_frag.wgsl";
const LUT_UNIT: u32 = 1;

/// Edge length of the identity table used when no LUT is configured.
pub const DEFAULT_LUT_SIZE: u32 = 16;

struct LutTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

fn upload(context: &RenderContext, lut: &Lut3d) -> LutTexture {
    let n = lut.size();
    let size = wgpu::Extent3d {
        width: n,
        height: n,
        depth_or_array_layers: n,
    };
    let texture = context.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Color LUT"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D3,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    context.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &lut.to_rgba8(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * n),
            rows_per_image: Some(n),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    LutTexture {
        _texture: texture,
        view,
    }
}

/// Maps every source pixel through a [`Lut3d`].
pub struct ColorCorrectEffect {
    base: PostEffect,
    lut: Lut3d,
    texture: Option<LutTexture>,
}

impl Default for ColorCorrectEffect {
    fn default() -> Self {
        Self::with_lut(Lut3d::identity(DEFAULT_LUT_SIZE))
    }
}

impl ColorCorrectEffect {
    /// Grade through `lut`. The table is uploaded at `init`.
    pub fn with_lut(lut: Lut3d) -> Self {
        Self {
            base: PostEffect::new("Color Correct"),
            lut,
            texture: None,
        }
    }

    /// The active table.
    pub fn lut(&self) -> &Lut3d {
        &self.lut
    }

    /// Swap the table, uploading it immediately if the effect is
    /// initialized.
    pub fn set_lut(&mut self, context: &RenderContext, lut: Lut3d) {
        if self.base.is_initialized() {
            self.texture = Some(upload(context, &lut));
        }
        self.lut = lut;
    }
}

impl PostProcess for ColorCorrectEffect {
    fn base(&self) -> &PostEffect {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PostEffect {
        &mut self.base
    }

    fn init(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        width: u32,
        height: u32,
    ) -> Result<(), PostFxError> {
        self.texture = None;
        self.base
            .init_single_pass(context, composer, width, height, FRAGMENT)?;
        self.texture = Some(upload(context, &self.lut));
        Ok(())
    }

    fn apply_effect(
        &mut self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        source: &dyn ColorSource,
    ) -> Result<(), PostFxError> {
        let texture = self
            .texture
            .as_ref()
            .ok_or_else(|| PostFxError::NotInitialized(self.base.label().to_owned()))?;
        if let Some(fsq) = self.base.fsq_mut() {
            fsq.bind_texture(LUT_UNIT, &texture.view);
        }
        let draw = FsqDraw {
            program: 0,
            uniforms: vec![("u_lut_size", (self.lut.size() as f32).into())],
            inputs: vec![(0, PassInput::Source)],
            output: 0,
        };
        let result = self.base.execute(context, encoder, source, &[draw]);
        if let Some(fsq) = self.base.fsq_mut() {
            fsq.unbind_texture(LUT_UNIT);
        }
        result
    }
}

impl ColorSource for ColorCorrectEffect {
    fn color_attachment(&self, index: usize) -> Option<&wgpu::TextureView> {
        self.base.color_attachment(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::tests::solid_source;
    use crate::gpu::readback::read_rgba8;
    use crate::gpu::render_context::tests::test_context;

    fn close(p: &[u8], expected: [u8; 4]) -> bool {
        p.iter().zip(expected).all(|(&a, b)| a.abs_diff(b) <= 1)
    }

    fn graded(effect: &mut ColorCorrectEffect, ctx: &RenderContext, pixel: [u8; 4]) -> Vec<u8> {
        let source = solid_source(ctx, 4, 4, pixel);
        let mut encoder = ctx.create_encoder();
        effect.apply_effect(ctx, &mut encoder, &source).unwrap();
        ctx.submit(encoder);
        read_rgba8(ctx, effect.base().target(0).unwrap().color_texture(0)).unwrap()
    }

    #[test]
    fn identity_lut_preserves_colors() {
        let Some(ctx) = test_context() else { return };
        let mut composer = ShaderComposer::new().unwrap();
        let mut effect = ColorCorrectEffect::default();
        effect.init(&ctx, &mut composer, 4, 4).unwrap();

        let out = graded(&mut effect, &ctx, [255, 0, 255, 255]);
        assert!(out.chunks(4).all(|p| close(p, [255, 0, 255, 255])));
    }

    #[test]
    fn inverting_lut_swaps_extremes() {
        let Some(ctx) = test_context() else { return };
        let mut composer = ShaderComposer::new().unwrap();
        let mut effect = ColorCorrectEffect::default();
        effect.init(&ctx, &mut composer, 4, 4).unwrap();

        let mut rows = String::from("LUT_3D_SIZE 2\n");
        for b in [1, 0] {
            for g in [1, 0] {
                for r in [1, 0] {
                    rows.push_str(&format!("{r} {g} {b}\n"));
                }
            }
        }
        effect.set_lut(&ctx, Lut3d::parse(&rows).unwrap());
        assert_eq!(effect.lut().size(), 2);

        let out = graded(&mut effect, &ctx, [255, 0, 255, 255]);
        assert!(out.chunks(4).all(|p| close(p, [0, 255, 0, 255])));
    }

    #[test]
    fn apply_before_init_fails() {
        let Some(ctx) = test_context() else { return };
        let mut effect = ColorCorrectEffect::default();
        let source = solid_source(&ctx, 4, 4, [0, 0, 0, 255]);
        let mut encoder = ctx.create_encoder();
        assert!(matches!(
            effect.apply_effect(&ctx, &mut encoder, &source),
            Err(PostFxError::NotInitialized(_))
        ));
    }
}
