//! Bloom: extracts bright pixels, blurs them at reduced resolution and adds
//! the glow back onto the scene.
//!
//! Pass order per frame: copy the source into the scene copy, bright-pass
//! into the accumulator, `passthrough` rounds of horizontal then vertical
//! Gaussian blur bouncing between the accumulator and a scratch target, and
//! finally an additive composite of source and accumulator into the scene
//! copy.

use glam::Vec2;

use super::{
    FsqDraw, PassInput, PostEffect, PostProcess, COLOR_FORMAT, PASSTHROUGH_FRAG,
};
use crate::error::PostFxError;
use crate::gpu::fullscreen::ColorSource;
use crate::gpu::render_context::RenderContext;
use crate::gpu::render_target::{RenderTarget, RenderTargetDesc};
use crate::gpu::shader_composer::ShaderComposer;

/// Uniform read by the bright-pass stage.
pub const THRESHOLD_UNIFORM: &str = "u_threshold";
/// Uniform read by both blur stages: tap spacing in UV units.
pub const DIRECTION_UNIFORM: &str = "u_direction";

/// Role of each bloom render target, in allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BloomTarget {
    /// Full resolution, color + depth. Holds the copy, then the composite.
    SceneCopy,
    /// Downscaled. Bright-pass output and blur accumulator.
    BrightPass,
    /// Downscaled. Horizontal blur output.
    BlurScratch,
    /// Full resolution. Allocated but not drawn by the pass sequence.
    Spare,
}

impl BloomTarget {
    /// Every role, in allocation order.
    pub const ALL: [Self; 4] =
        [Self::SceneCopy, Self::BrightPass, Self::BlurScratch, Self::Spare];

    /// Index into the effect's target list.
    pub fn index(self) -> usize {
        self as usize
    }

    fn downscaled(self) -> bool {
        matches!(self, Self::BrightPass | Self::BlurScratch)
    }
}

/// Program of each bloom pass, in allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BloomStage {
    /// Copy of the source.
    Passthrough,
    /// Luminance threshold.
    Threshold,
    /// Gaussian blur along x.
    BlurHorizontal,
    /// Gaussian blur along y.
    BlurVertical,
    /// Additive composite.
    Composite,
}

impl BloomStage {
    /// Every stage, in allocation order.
    pub const ALL: [Self; 5] = [
        Self::Passthrough,
        Self::Threshold,
        Self::BlurHorizontal,
        Self::BlurVertical,
        Self::Composite,
    ];

    /// Index into the effect's program list.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Fragment stage file, relative to the shader root.
    pub fn fragment(self) -> &'static str {
        match self {
            Self::Passthrough => PASSTHROUGH_FRAG,
            Self::Threshold => "post/bloom_frag.wgsl",
            Self::BlurHorizontal => "post/blur_horizontal_frag.wgsl",
            Self::BlurVertical => "post/blur_vertical_frag.wgsl",
            Self::Composite => "post/bloom_composite_frag.wgsl",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Passthrough => "Bloom Copy",
            Self::Threshold => "Bloom Threshold",
            Self::BlurHorizontal => "Bloom Blur H",
            Self::BlurVertical => "Bloom Blur V",
            Self::Composite => "Bloom Composite",
        }
    }
}

/// Size of the blur targets for a `width` x `height` output.
///
/// Factors below 1 (and NaN) are treated as 1; each side is at least 1.
pub fn downscaled_size(width: u32, height: u32, downscale: f32) -> (u32, u32) {
    let d = if downscale >= 1.0 { downscale } else { 1.0 };
    let side = |n: u32| ((n as f32 / d) as u32).max(1);
    (side(width), side(height))
}

/// Multi-pass bloom with live-tunable threshold, blur count and downscale.
pub struct BloomEffect {
    base: PostEffect,
    downscale: f32,
    threshold: f32,
    passthrough: u32,
    texel_offset: Vec2,
}

impl Default for BloomEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl BloomEffect {
    /// Default downscale factor of the blur targets.
    pub const DEFAULT_DOWNSCALE: f32 = 5.0;
    /// Default bright-pass luminance threshold.
    pub const DEFAULT_THRESHOLD: f32 = 0.05;
    /// Default number of horizontal + vertical blur rounds.
    pub const DEFAULT_PASSTHROUGH: u32 = 10;

    /// A bloom effect with default parameters and no resources.
    pub fn new() -> Self {
        Self {
            base: PostEffect::new("Bloom"),
            downscale: Self::DEFAULT_DOWNSCALE,
            threshold: Self::DEFAULT_THRESHOLD,
            passthrough: Self::DEFAULT_PASSTHROUGH,
            texel_offset: Vec2::ZERO,
        }
    }

    /// Blur target downscale factor.
    pub fn downscale(&self) -> f32 {
        self.downscale
    }

    /// Set the downscale factor. Takes effect at the next `init`.
    pub fn set_downscale(&mut self, downscale: f32) {
        self.downscale = downscale;
    }

    /// Bright-pass luminance threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Set the threshold, used from the next `apply_effect`.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// Number of blur rounds.
    pub fn passthrough(&self) -> u32 {
        self.passthrough
    }

    /// Set the number of blur rounds, used from the next `apply_effect`.
    pub fn set_passthrough(&mut self, passthrough: u32) {
        self.passthrough = passthrough;
    }

    /// `(1 / width, 1 / height)` of the last `init`.
    pub fn texel_offset(&self) -> Vec2 {
        self.texel_offset
    }

    /// The target playing `role`, once initialized.
    pub fn target(&self, role: BloomTarget) -> Option<&RenderTarget> {
        self.base.target(role.index())
    }

    /// The draws one `apply_effect` records, in order.
    pub fn schedule(&self) -> Vec<FsqDraw> {
        let scene = BloomTarget::SceneCopy.index();
        let accumulator = BloomTarget::BrightPass.index();
        let scratch = BloomTarget::BlurScratch.index();

        let mut draws = Vec::with_capacity(3 + 2 * self.passthrough as usize);
        draws.push(FsqDraw {
            program: BloomStage::Passthrough.index(),
            uniforms: Vec::new(),
            inputs: vec![(0, PassInput::Source)],
            output: scene,
        });
        draws.push(FsqDraw {
            program: BloomStage::Threshold.index(),
            uniforms: vec![(THRESHOLD_UNIFORM, self.threshold.into())],
            inputs: vec![(0, PassInput::Target(scene))],
            output: accumulator,
        });
        for _ in 0..self.passthrough {
            draws.push(FsqDraw {
                program: BloomStage::BlurHorizontal.index(),
                uniforms: vec![(DIRECTION_UNIFORM, self.texel_offset.x.into())],
                inputs: vec![(0, PassInput::Target(accumulator))],
                output: scratch,
            });
            draws.push(FsqDraw {
                program: BloomStage::BlurVertical.index(),
                uniforms: vec![(DIRECTION_UNIFORM, self.texel_offset.y.into())],
                inputs: vec![(0, PassInput::Target(scratch))],
                output: accumulator,
            });
        }
        draws.push(FsqDraw {
            program: BloomStage::Composite.index(),
            uniforms: Vec::new(),
            inputs: vec![
                (0, PassInput::Source),
                (1, PassInput::Target(accumulator)),
            ],
            output: scene,
        });
        draws
    }
}

impl PostProcess for BloomEffect {
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
        let result = self.allocate(context, composer, width, height);
        self.base.settle(result)
    }

    fn apply_effect(
        &mut self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        source: &dyn ColorSource,
    ) -> Result<(), PostFxError> {
        let draws = self.schedule();
        self.base.execute(context, encoder, source, &draws)
    }
}

impl BloomEffect {
    fn allocate(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        width: u32,
        height: u32,
    ) -> Result<(), PostFxError> {
        self.base.reset(context, composer, width, height)?;
        let (width, height) = self.base.size();
        let (small_w, small_h) = downscaled_size(width, height, self.downscale);

        for role in BloomTarget::ALL {
            let mut desc = RenderTargetDesc::new(format!("Bloom {role:?}"))
                .add_color_target(COLOR_FORMAT);
            if role == BloomTarget::SceneCopy {
                desc = desc.add_depth_target();
            }
            let target = if role.downscaled() {
                desc.init(context, small_w, small_h)
            } else {
                desc.init(context, width, height)
            };
            let _ = self.base.add_target(target);
        }
        for stage in BloomStage::ALL {
            let _ = self.base.add_program(
                context,
                composer,
                stage.label(),
                stage.fragment(),
            )?;
        }

        self.texel_offset = Vec2::new(1.0 / width as f32, 1.0 / height as f32);
        log::debug!(
            "bloom init {width}x{height}, blur {small_w}x{small_h}, texel {:?}",
            self.texel_offset
        );
        Ok(())
    }
}

impl ColorSource for BloomEffect {
    fn color_attachment(&self, index: usize) -> Option<&wgpu::TextureView> {
        self.base.color_attachment(index)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::effects::tests::solid_source;
    use crate::effects::PASSTHROUGH_VERT;
    use crate::gpu::readback::read_rgba8;
    use crate::gpu::render_context::tests::test_context;
    use crate::gpu::shader_program::UniformValue;
    use crate::options::DEFAULT_SHADER_ROOT;

    fn program_order(draws: &[FsqDraw]) -> Vec<usize> {
        draws.iter().map(|d| d.program).collect()
    }

    #[test]
    fn defaults() {
        let bloom = BloomEffect::new();
        assert_eq!(bloom.downscale(), 5.0);
        assert_eq!(bloom.threshold(), 0.05);
        assert_eq!(bloom.passthrough(), 10);
        assert!(bloom.target(BloomTarget::SceneCopy).is_none());
    }

    #[test]
    fn schedule_runs_copy_threshold_blur_composite() {
        let mut bloom = BloomEffect::new();
        bloom.set_passthrough(2);
        let draws = bloom.schedule();
        assert_eq!(program_order(&draws), vec![0, 1, 2, 3, 2, 3, 4]);
        assert_eq!(draws.len(), 2 + 2 * 2 + 1);

        assert_eq!(draws[0].inputs, vec![(0, PassInput::Source)]);
        assert_eq!(draws[0].output, 0);
        assert_eq!(draws[1].inputs, vec![(0, PassInput::Target(0))]);
        assert_eq!(draws[1].output, 1);
        assert_eq!(
            draws[6].inputs,
            vec![(0, PassInput::Source), (1, PassInput::Target(1))]
        );
        assert_eq!(draws[6].output, 0);
    }

    #[test]
    fn blur_rounds_ping_pong_between_accumulator_and_scratch() {
        let bloom = BloomEffect::new();
        let draws = bloom.schedule();
        assert_eq!(draws.len(), 2 + 2 * 10 + 1);
        for pair in draws[2..draws.len() - 1].chunks(2) {
            assert_eq!(pair[0].inputs, vec![(0, PassInput::Target(1))]);
            assert_eq!(pair[0].output, 2);
            assert_eq!(pair[1].inputs, vec![(0, PassInput::Target(2))]);
            assert_eq!(pair[1].output, 1);
        }
        // No pass ever touches the spare target.
        assert!(draws.iter().all(|d| d.output != BloomTarget::Spare.index()));
    }

    #[test]
    fn zero_passthrough_skips_blur() {
        let mut bloom = BloomEffect::new();
        bloom.set_passthrough(0);
        assert_eq!(program_order(&bloom.schedule()), vec![0, 1, 4]);
    }

    #[test]
    fn schedule_carries_live_parameters() {
        let mut bloom = BloomEffect::new();
        bloom.set_threshold(0.3);
        bloom.texel_offset = Vec2::new(0.25, 0.5);
        bloom.set_passthrough(1);
        let draws = bloom.schedule();
        assert_eq!(
            draws[1].uniforms,
            vec![(THRESHOLD_UNIFORM, UniformValue::F32(0.3))]
        );
        assert_eq!(
            draws[2].uniforms,
            vec![(DIRECTION_UNIFORM, UniformValue::F32(0.25))]
        );
        assert_eq!(
            draws[3].uniforms,
            vec![(DIRECTION_UNIFORM, UniformValue::F32(0.5))]
        );
    }

    #[test]
    fn downscaled_size_floors_and_clamps() {
        assert_eq!(downscaled_size(1920, 1080, 5.0), (384, 216));
        assert_eq!(downscaled_size(1001, 7, 5.0), (200, 1));
        assert_eq!(downscaled_size(3, 3, 10.0), (1, 1));
        assert_eq!(downscaled_size(64, 32, 0.0), (64, 32));
        assert_eq!(downscaled_size(64, 32, f32::NAN), (64, 32));
    }

    fn initialized(width: u32, height: u32, downscale: f32) -> Option<(RenderContext, BloomEffect)> {
        let ctx = test_context()?;
        let mut composer = ShaderComposer::new().unwrap();
        let mut bloom = BloomEffect::new();
        bloom.set_downscale(downscale);
        bloom.init(&ctx, &mut composer, width, height).unwrap();
        Some((ctx, bloom))
    }

    fn run(ctx: &RenderContext, bloom: &mut BloomEffect, source: &RenderTarget) {
        let mut encoder = ctx.create_encoder();
        bloom.clear(&mut encoder);
        bloom.apply_effect(ctx, &mut encoder, source).unwrap();
        ctx.submit(encoder);
    }

    fn read(ctx: &RenderContext, bloom: &BloomEffect, role: BloomTarget) -> Vec<u8> {
        read_rgba8(ctx, bloom.target(role).unwrap().color_texture(0)).unwrap()
    }

    #[test]
    fn full_hd_allocates_expected_targets() {
        let Some((ctx, mut bloom)) = initialized(1920, 1080, 5.0) else {
            return;
        };
        assert_eq!(bloom.base().target_count(), 4);
        assert_eq!(bloom.base().program_count(), 5);
        assert_eq!(bloom.target(BloomTarget::SceneCopy).unwrap().size(), (1920, 1080));
        assert_eq!(bloom.target(BloomTarget::BrightPass).unwrap().size(), (384, 216));
        assert_eq!(bloom.target(BloomTarget::BlurScratch).unwrap().size(), (384, 216));
        assert_eq!(bloom.target(BloomTarget::Spare).unwrap().size(), (1920, 1080));
        assert!(bloom
            .target(BloomTarget::SceneCopy)
            .unwrap()
            .depth_view()
            .is_some());
        assert_eq!(
            bloom.texel_offset(),
            Vec2::new(1.0 / 1920.0, 1.0 / 1080.0)
        );

        let source = solid_source(&ctx, 1920, 1080, [40, 40, 40, 255]);
        run(&ctx, &mut bloom, &source);
    }

    #[test]
    fn reinit_recomputes_texel_offset_and_sizes() {
        let Some((ctx, mut bloom)) = initialized(100, 50, 5.0) else {
            return;
        };
        let mut composer = ShaderComposer::new().unwrap();
        bloom.init(&ctx, &mut composer, 40, 20).unwrap();
        assert_eq!(bloom.base().target_count(), 4);
        assert_eq!(bloom.texel_offset(), Vec2::new(1.0 / 40.0, 1.0 / 20.0));
        assert_eq!(bloom.target(BloomTarget::BrightPass).unwrap().size(), (8, 4));
    }

    #[test]
    fn repeated_application_is_bit_identical() {
        let Some((ctx, mut bloom)) = initialized(64, 64, 2.0) else {
            return;
        };
        let source = solid_source(&ctx, 64, 64, [200, 120, 60, 255]);
        run(&ctx, &mut bloom, &source);
        let first = read(&ctx, &bloom, BloomTarget::SceneCopy);
        run(&ctx, &mut bloom, &source);
        let second = read(&ctx, &bloom, BloomTarget::SceneCopy);
        assert_eq!(first, second);
    }

    #[test]
    fn threshold_one_rejects_everything_below_white() {
        let Some((ctx, mut bloom)) = initialized(32, 32, 1.0) else {
            return;
        };
        bloom.set_threshold(1.0);
        bloom.set_passthrough(0);
        let source = solid_source(&ctx, 32, 32, [250, 250, 250, 255]);
        run(&ctx, &mut bloom, &source);
        let bright = read(&ctx, &bloom, BloomTarget::BrightPass);
        assert!(bright.iter().all(|&b| b == 0));
    }

    #[test]
    fn threshold_zero_keeps_every_lit_pixel() {
        let Some((ctx, mut bloom)) = initialized(32, 32, 1.0) else {
            return;
        };
        bloom.set_threshold(0.0);
        bloom.set_passthrough(0);
        let source = solid_source(&ctx, 32, 32, [128, 128, 128, 255]);
        run(&ctx, &mut bloom, &source);
        let bright = read(&ctx, &bloom, BloomTarget::BrightPass);
        assert!(bright.chunks(4).all(|p| p == [128, 128, 128, 255]));

        // Composite of a mid grey with itself saturates upward.
        let composite = read(&ctx, &bloom, BloomTarget::SceneCopy);
        assert!(composite.chunks(4).all(|p| p[0] == 255 && p[3] == 255));
    }

    /// Intensity-weighted mean squared distance from the image centre.
    fn second_moment(pixels: &[u8], width: usize) -> f64 {
        let height = pixels.len() / 4 / width;
        let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
        let mut mass = 0.0;
        let mut moment = 0.0;
        for (i, p) in pixels.chunks(4).enumerate() {
            let v = f64::from(p[0]);
            let x = (i % width) as f64 + 0.5 - cx;
            let y = (i / width) as f64 + 0.5 - cy;
            mass += v;
            moment += v * (x * x + y * y);
        }
        moment / mass
    }

    #[test]
    fn more_blur_rounds_spread_a_bright_block() {
        let Some((ctx, mut bloom)) = initialized(64, 64, 1.0) else {
            return;
        };
        let source = RenderTargetDesc::new("block")
            .add_color_target(COLOR_FORMAT)
            .init(&ctx, 64, 64);
        let mut data = vec![0u8; 64 * 64 * 4];
        for y in 28..36 {
            for x in 28..36 {
                let i = (y * 64 + x) * 4;
                data[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
            }
        }
        source.write_color(&ctx, 0, &data).unwrap();

        bloom.set_passthrough(1);
        run(&ctx, &mut bloom, &source);
        let narrow = second_moment(&read(&ctx, &bloom, BloomTarget::BrightPass), 64);

        bloom.set_passthrough(3);
        run(&ctx, &mut bloom, &source);
        let wide = second_moment(&read(&ctx, &bloom, BloomTarget::BrightPass), 64);

        assert!(wide > narrow, "{wide} <= {narrow}");
    }

    #[test]
    fn failed_init_leaves_nothing_half_built() {
        let Some(ctx) = test_context() else { return };
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("post")).unwrap();
        let shipped = Path::new(DEFAULT_SHADER_ROOT);
        for file in [PASSTHROUGH_VERT, PASSTHROUGH_FRAG]
            .into_iter()
            .chain(BloomStage::ALL.map(BloomStage::fragment))
            .filter(|&f| f != BloomStage::BlurVertical.fragment())
        {
            let _ = std::fs::copy(shipped.join(file), root.path().join(file))
                .unwrap();
        }

        let mut composer = ShaderComposer::new().unwrap();
        let mut bloom = BloomEffect::new();
        bloom.base_mut().set_shader_root(root.path());
        let err = bloom.init(&ctx, &mut composer, 32, 32).unwrap_err();
        assert!(matches!(err, PostFxError::ShaderIo { .. }));
        assert!(!bloom.base().is_initialized());
        assert_eq!(bloom.base().target_count(), 0);
        assert_eq!(bloom.base().program_count(), 0);
        assert!(bloom.color_attachment(0).is_none());

        let source = solid_source(&ctx, 32, 32, [200, 200, 200, 255]);
        let mut encoder = ctx.create_encoder();
        assert!(matches!(
            bloom.apply_effect(&ctx, &mut encoder, &source),
            Err(PostFxError::NotInitialized(_))
        ));

        // A later init with every stage present recovers.
        bloom.base_mut().set_shader_root(shipped);
        bloom.init(&ctx, &mut composer, 32, 32).unwrap();
        bloom.apply_effect(&ctx, &mut encoder, &source).unwrap();
        ctx.submit(encoder);
    }
}
