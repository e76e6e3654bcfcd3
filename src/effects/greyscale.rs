use super::{FsqDraw, PassInput, PostEffect, PostProcess};
use crate::error::PostFxError;
use crate::gpu::fullscreen::ColorSource;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;

const FRAGMENT: &str = "post/greyscale_frag.wgsl";

/// Rec. 709 luminance greyscale blended over the source by `intensity`.
pub struct GreyscaleEffect {
    base: PostEffect,
    intensity: f32,
}

impl Default for GreyscaleEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl GreyscaleEffect {
    /// Fully desaturated, no resources yet.
    pub fn new() -> Self {
        Self {
            base: PostEffect::new("Greyscale"),
            intensity: 1.0,
        }
    }

    /// Blend factor between the source (0) and greyscale (1).
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Set the blend factor.
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }
}

impl PostProcess for GreyscaleEffect {
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
        self.base
            .init_single_pass(context, composer, width, height, FRAGMENT)
    }

    fn apply_effect(
        &mut self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        source: &dyn ColorSource,
    ) -> Result<(), PostFxError> {
        let draw = FsqDraw {
            program: 0,
            uniforms: vec![("u_intensity", self.intensity.into())],
            inputs: vec![(0, PassInput::Source)],
            output: 0,
        };
        self.base.execute(context, encoder, source, &[draw])
    }
}

impl ColorSource for GreyscaleEffect {
    fn color_attachment(&self, index: usize) -> Option<&wgpu::TextureView> {
        self.base.color_attachment(index)
    }
}
