//! Post-processing effects.
//!
//! Every effect is built on [`PostEffect`], which owns the effect's render
//! targets and shader programs and knows how to run a list of full-screen
//! draws ([`FsqDraw`]). Concrete effects differ only in which targets and
//! programs they allocate in `init` and which draws they record in
//! `apply_effect`.
//!
//! The set of effects is closed: [`Effect`] is the tagged union the frame
//! driver holds, selected at construction from an [`EffectKind`].

mod bloom;
mod color_correct;
mod greyscale;
mod lut;
mod sepia;

use std::path::{Path, PathBuf};

pub use bloom::{
    downscaled_size, BloomEffect, BloomStage, BloomTarget, DIRECTION_UNIFORM,
    THRESHOLD_UNIFORM,
};
pub use color_correct::{ColorCorrectEffect, DEFAULT_LUT_SIZE};
pub use greyscale::GreyscaleEffect;
pub use lut::{Lut3d, SIZE_RANGE as LUT_SIZE_RANGE};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use sepia::SepiaEffect;

use crate::error::PostFxError;
use crate::gpu::fullscreen::{ColorSource, FsqOutput, FsqRenderer, OutputLayout};
use crate::gpu::render_context::RenderContext;
use crate::gpu::render_target::{RenderTarget, RenderTargetDesc};
use crate::gpu::shader_composer::ShaderComposer;
use crate::gpu::shader_program::{build_program, ShaderProgram, UniformValue};
use crate::options::Options;

/// Color format of every target an effect allocates.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Vertex stage shared by every full-screen program.
pub const PASSTHROUGH_VERT: &str = "passthrough_vert.wgsl";
/// Fragment stage that copies unit 0 unchanged.
pub const PASSTHROUGH_FRAG: &str = "passthrough_frag.wgsl";

/// Where a full-screen draw reads a texture unit from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassInput {
    /// Color attachment 0 of the buffer handed to `apply_effect`.
    Source,
    /// Color attachment 0 of one of the effect's own targets.
    Target(usize),
}

/// One full-screen-quad draw: program, uniforms, inputs and destination.
#[derive(Debug, Clone, PartialEq)]
pub struct FsqDraw {
    /// Index of the program in the effect's program list.
    pub program: usize,
    /// Uniforms set on the program before drawing.
    pub uniforms: Vec<(&'static str, UniformValue)>,
    /// Texture unit assignments, unbound again after the draw.
    pub inputs: Vec<(u32, PassInput)>,
    /// Index of the target drawn into.
    pub output: usize,
}

/// Shared state of every effect: owned render targets, owned shader
/// programs, and the passthrough program used to present target 0.
pub struct PostEffect {
    label: String,
    shader_root: PathBuf,
    targets: Vec<RenderTarget>,
    programs: Vec<ShaderProgram>,
    present: Option<ShaderProgram>,
    fsq: Option<FsqRenderer>,
    bound: Option<usize>,
    width: u32,
    height: u32,
}

impl PostEffect {
    /// An effect with no resources; shader files resolve under
    /// `assets/shaders` until [`set_shader_root`](Self::set_shader_root).
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            shader_root: PathBuf::from(crate::options::DEFAULT_SHADER_ROOT),
            targets: Vec::new(),
            programs: Vec::new(),
            present: None,
            fsq: None,
            bound: None,
            width: 0,
            height: 0,
        }
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Directory shader file names are resolved against.
    pub fn shader_root(&self) -> &Path {
        &self.shader_root
    }

    /// Change the shader directory. Takes effect at the next `init`.
    pub fn set_shader_root(&mut self, root: impl Into<PathBuf>) {
        self.shader_root = root.into();
    }

    /// Drop every target and program and create the shared quad renderer and
    /// present program for a `width` x `height` output.
    ///
    /// On failure the effect is left uninitialized.
    ///
    /// # Errors
    ///
    /// Propagates failures building the present program.
    pub fn reset(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        width: u32,
        height: u32,
    ) -> Result<(), PostFxError> {
        self.release();
        self.width = width.max(1);
        self.height = height.max(1);
        let present = self.build(
            context,
            composer,
            &format!("{} Present", self.label),
            PASSTHROUGH_FRAG,
        )?;
        self.present = Some(present);
        self.fsq = Some(FsqRenderer::new(context));
        log::debug!(
            "effect '{}' reset at {}x{}",
            self.label,
            self.width,
            self.height
        );
        Ok(())
    }

    /// Drop every resource; `is_initialized` is false afterwards.
    fn release(&mut self) {
        self.targets.clear();
        self.programs.clear();
        self.present = None;
        self.fsq = None;
        self.bound = None;
    }

    /// Pass `result` through, releasing everything if it is an error so a
    /// half-built effect is never drawn.
    fn settle<T>(
        &mut self,
        result: Result<T, PostFxError>,
    ) -> Result<T, PostFxError> {
        if let Err(e) = &result {
            log::warn!("effect '{}' init failed: {e}", self.label);
            self.release();
        }
        result
    }

    fn build(
        &self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        label: &str,
        fragment: &str,
    ) -> Result<ShaderProgram, PostFxError> {
        build_program(
            context,
            composer,
            label,
            &self.shader_root.join(PASSTHROUGH_VERT),
            &self.shader_root.join(fragment),
        )
    }

    /// Take ownership of `target`; returns its index.
    pub fn add_target(&mut self, target: RenderTarget) -> usize {
        self.targets.push(target);
        self.targets.len() - 1
    }

    /// Build a program from the passthrough vertex stage and `fragment`
    /// (relative to the shader root); returns its index.
    ///
    /// # Errors
    ///
    /// Propagates compile and link failures.
    pub fn add_program(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        label: &str,
        fragment: &str,
    ) -> Result<usize, PostFxError> {
        let program = self.build(context, composer, label, fragment)?;
        self.programs.push(program);
        Ok(self.programs.len() - 1)
    }

    /// Allocate one full-size color + depth target and one program drawing
    /// `fragment`, the layout shared by every single-pass effect.
    ///
    /// On failure the effect is left uninitialized.
    ///
    /// # Errors
    ///
    /// Propagates shader failures.
    pub fn init_single_pass(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        width: u32,
        height: u32,
        fragment: &str,
    ) -> Result<(), PostFxError> {
        let result = self.allocate_single_pass(
            context, composer, width, height, fragment,
        );
        self.settle(result)
    }

    fn allocate_single_pass(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        width: u32,
        height: u32,
        fragment: &str,
    ) -> Result<(), PostFxError> {
        self.reset(context, composer, width, height)?;
        let target = RenderTargetDesc::new(format!("{} Target", self.label))
            .add_color_target(COLOR_FORMAT)
            .add_depth_target()
            .init(context, self.width, self.height);
        let _ = self.add_target(target);
        let label = self.label.clone();
        let _ = self.add_program(context, composer, &label, fragment)?;
        Ok(())
    }

    /// Basic effect: a full-size color + depth buffer and a passthrough copy.
    ///
    /// # Errors
    ///
    /// Propagates shader failures.
    pub fn init(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        width: u32,
        height: u32,
    ) -> Result<(), PostFxError> {
        self.init_single_pass(context, composer, width, height, PASSTHROUGH_FRAG)
    }

    /// Whether `init` has run.
    pub fn is_initialized(&self) -> bool {
        self.fsq.is_some()
    }

    /// `(width, height)` of the last `init`.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Owned target `index`.
    pub fn target(&self, index: usize) -> Option<&RenderTarget> {
        self.targets.get(index)
    }

    /// Number of owned targets.
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Owned program `index`.
    pub fn program(&self, index: usize) -> Option<&ShaderProgram> {
        self.programs.get(index)
    }

    /// Number of owned programs.
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Mutable access to the quad renderer's texture units, once initialized.
    pub fn fsq_mut(&mut self) -> Option<&mut FsqRenderer> {
        self.fsq.as_mut()
    }

    /// Clear every owned target to opaque black.
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        for target in &self.targets {
            target.clear(encoder, wgpu::Color::BLACK);
        }
    }

    /// Select which owned target receives scene draws.
    pub fn bind_buffer(&mut self, index: usize) {
        if index < self.targets.len() {
            self.bound = Some(index);
        } else {
            log::warn!(
                "effect '{}' has no target {index} to bind",
                self.label
            );
        }
    }

    /// Deselect the scene target.
    pub fn unbind_buffer(&mut self) {
        self.bound = None;
    }

    /// The target selected by [`bind_buffer`](Self::bind_buffer).
    pub fn bound_target(&self) -> Option<&RenderTarget> {
        self.bound.and_then(|i| self.targets.get(i))
    }

    /// Record `draws` in order. Each draw binds its inputs, sets its
    /// uniforms on the bound program, renders into its output target, and
    /// then unbinds the program and its inputs.
    ///
    /// # Errors
    ///
    /// [`PostFxError::NotInitialized`] before `init` or when a draw names a
    /// target or program the effect does not own, otherwise the first draw
    /// failure.
    pub fn execute(
        &mut self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        source: &dyn ColorSource,
        draws: &[FsqDraw],
    ) -> Result<(), PostFxError> {
        let missing = || PostFxError::NotInitialized(self.label.clone());
        let fsq = self.fsq.as_mut().ok_or_else(missing)?;
        for draw in draws {
            let inputs_owned = draw.inputs.iter().all(|&(_, input)| match input {
                PassInput::Source => true,
                PassInput::Target(i) => i < self.targets.len(),
            });
            let (Some(output), Some(program), true) = (
                self.targets.get(draw.output),
                self.programs.get_mut(draw.program),
                inputs_owned,
            ) else {
                return Err(missing());
            };

            for &(unit, input) in &draw.inputs {
                match input {
                    PassInput::Source => {
                        source.bind_color_as_texture(fsq, 0, unit);
                    }
                    PassInput::Target(i) => {
                        if let Some(target) = self.targets.get(i) {
                            target.bind_color_as_texture(fsq, 0, unit);
                        }
                    }
                }
            }

            program.bind();
            for &(name, value) in &draw.uniforms {
                program.set_uniform(name, value);
            }
            let result = output.render_to_fsq(context, encoder, fsq, program);
            program.unbind();
            for &(unit, _) in draw.inputs.iter().rev() {
                fsq.unbind_texture(unit);
            }
            result?;
        }
        Ok(())
    }

    /// Basic effect: copy `source` into target 0.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn apply_effect(
        &mut self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        source: &dyn ColorSource,
    ) -> Result<(), PostFxError> {
        let copy = FsqDraw {
            program: 0,
            uniforms: Vec::new(),
            inputs: vec![(0, PassInput::Source)],
            output: 0,
        };
        self.execute(context, encoder, source, &[copy])
    }

    /// Clear `view` to black and draw target 0 into it.
    ///
    /// # Errors
    ///
    /// [`PostFxError::NotInitialized`] before `init`, otherwise the draw
    /// failure.
    pub fn draw_to_screen(
        &mut self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
    ) -> Result<(), PostFxError> {
        let not_initialized = || PostFxError::NotInitialized(self.label.clone());
        let (Some(fsq), Some(present), Some(target)) =
            (self.fsq.as_mut(), self.present.as_mut(), self.targets.first())
        else {
            return Err(not_initialized());
        };
        target.bind_color_as_texture(fsq, 0, 0);
        present.bind();
        let result = fsq.draw(
            context,
            encoder,
            present,
            &FsqOutput {
                colors: vec![view],
                depth: None,
                layout: OutputLayout::color(format),
                clear: Some(wgpu::Color::BLACK),
            },
        );
        present.unbind();
        target.unbind_texture(fsq, 0);
        result
    }
}

impl ColorSource for PostEffect {
    fn color_attachment(&self, index: usize) -> Option<&wgpu::TextureView> {
        self.targets.first().map(|target| target.color_view(index))
    }
}

/// The capability every effect exposes to the frame driver.
pub trait PostProcess {
    /// Shared targets and programs.
    fn base(&self) -> &PostEffect;

    /// Mutable shared targets and programs.
    fn base_mut(&mut self) -> &mut PostEffect;

    /// (Re)allocate every target and program for a `width` x `height`
    /// output. Also the way to resize.
    ///
    /// # Errors
    ///
    /// Shader compile and link failures.
    fn init(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        width: u32,
        height: u32,
    ) -> Result<(), PostFxError>;

    /// Record this effect's passes, reading `source` and writing target 0.
    ///
    /// # Errors
    ///
    /// Draw failures, or use before `init`.
    fn apply_effect(
        &mut self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        source: &dyn ColorSource,
    ) -> Result<(), PostFxError>;

    /// Clear every owned target.
    fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        self.base().clear(encoder);
    }

    /// Present target 0 into `view`.
    ///
    /// # Errors
    ///
    /// Draw failures, or use before `init`.
    fn draw_to_screen(
        &mut self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
    ) -> Result<(), PostFxError> {
        self.base_mut().draw_to_screen(context, encoder, view, format)
    }
}

impl PostProcess for PostEffect {
    fn base(&self) -> &PostEffect {
        self
    }

    fn base_mut(&mut self) -> &mut PostEffect {
        self
    }

    fn init(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        width: u32,
        height: u32,
    ) -> Result<(), PostFxError> {
        Self::init(self, context, composer, width, height)
    }

    fn apply_effect(
        &mut self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        source: &dyn ColorSource,
    ) -> Result<(), PostFxError> {
        Self::apply_effect(self, context, encoder, source)
    }
}

/// Serializable tag selecting one of the [`Effect`] variants.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Threshold, blur and additive composite.
    #[default]
    Bloom,
    /// Sepia tone.
    Sepia,
    /// Luminance greyscale.
    Greyscale,
    /// 3D LUT color grading.
    ColorCorrect,
}

impl EffectKind {
    /// Every kind, in cycling order.
    pub const ALL: [Self; 4] =
        [Self::Bloom, Self::Sepia, Self::Greyscale, Self::ColorCorrect];

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bloom => "bloom",
            Self::Sepia => "sepia",
            Self::Greyscale => "greyscale",
            Self::ColorCorrect => "color correct",
        }
    }

    /// The kind after this one, wrapping around.
    #[must_use]
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

/// The closed set of post effects.
pub enum Effect {
    /// See [`BloomEffect`].
    Bloom(BloomEffect),
    /// See [`SepiaEffect`].
    Sepia(SepiaEffect),
    /// See [`GreyscaleEffect`].
    Greyscale(GreyscaleEffect),
    /// See [`ColorCorrectEffect`].
    ColorCorrect(ColorCorrectEffect),
}

impl Effect {
    /// Construct the effect `kind` with parameters from `options`.
    /// Resources are allocated by [`PostProcess::init`].
    ///
    /// # Errors
    ///
    /// Propagates failures loading the configured LUT file.
    pub fn from_options(
        kind: EffectKind,
        options: &Options,
    ) -> Result<Self, PostFxError> {
        let mut effect = match kind {
            EffectKind::Bloom => {
                let o = &options.bloom;
                let mut bloom = BloomEffect::new();
                bloom.set_downscale(o.downscale);
                bloom.set_threshold(o.threshold);
                bloom.set_passthrough(o.passthrough);
                Self::Bloom(bloom)
            }
            EffectKind::Sepia => {
                let mut sepia = SepiaEffect::new();
                sepia.set_intensity(options.sepia.intensity);
                Self::Sepia(sepia)
            }
            EffectKind::Greyscale => {
                let mut grey = GreyscaleEffect::new();
                grey.set_intensity(options.greyscale.intensity);
                Self::Greyscale(grey)
            }
            EffectKind::ColorCorrect => {
                let lut = match &options.color_correct.lut_path {
                    Some(path) => Lut3d::load(path)?,
                    None => Lut3d::identity(options.color_correct.identity_size),
                };
                Self::ColorCorrect(ColorCorrectEffect::with_lut(lut))
            }
        };
        effect
            .base_mut()
            .set_shader_root(options.shaders.root.clone());
        Ok(effect)
    }

    /// Which variant this is.
    pub fn kind(&self) -> EffectKind {
        match self {
            Self::Bloom(_) => EffectKind::Bloom,
            Self::Sepia(_) => EffectKind::Sepia,
            Self::Greyscale(_) => EffectKind::Greyscale,
            Self::ColorCorrect(_) => EffectKind::ColorCorrect,
        }
    }

    fn inner(&self) -> &dyn PostProcess {
        match self {
            Self::Bloom(e) => e,
            Self::Sepia(e) => e,
            Self::Greyscale(e) => e,
            Self::ColorCorrect(e) => e,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn PostProcess {
        match self {
            Self::Bloom(e) => e,
            Self::Sepia(e) => e,
            Self::Greyscale(e) => e,
            Self::ColorCorrect(e) => e,
        }
    }
}

impl PostProcess for Effect {
    fn base(&self) -> &PostEffect {
        self.inner().base()
    }

    fn base_mut(&mut self) -> &mut PostEffect {
        self.inner_mut().base_mut()
    }

    fn init(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        width: u32,
        height: u32,
    ) -> Result<(), PostFxError> {
        self.inner_mut().init(context, composer, width, height)
    }

    fn apply_effect(
        &mut self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        source: &dyn ColorSource,
    ) -> Result<(), PostFxError> {
        self.inner_mut().apply_effect(context, encoder, source)
    }
}

impl ColorSource for Effect {
    fn color_attachment(&self, index: usize) -> Option<&wgpu::TextureView> {
        self.base().color_attachment(index)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gpu::readback::read_rgba8;
    use crate::gpu::render_context::tests::test_context;

    /// A `width` x `height` RGBA8 source filled with `pixel`.
    pub(crate) fn solid_source(
        ctx: &RenderContext,
        width: u32,
        height: u32,
        pixel: [u8; 4],
    ) -> RenderTarget {
        let target = RenderTargetDesc::new("test source")
            .add_color_target(COLOR_FORMAT)
            .init(ctx, width, height);
        let data: Vec<u8> = pixel
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        target.write_color(ctx, 0, &data).unwrap();
        target
    }

    #[test]
    fn effect_kind_cycles_through_all() {
        let mut kind = EffectKind::Bloom;
        for _ in 0..EffectKind::ALL.len() {
            kind = kind.next();
        }
        assert_eq!(kind, EffectKind::Bloom);
        assert_eq!(EffectKind::Sepia.next(), EffectKind::Greyscale);
    }

    #[test]
    fn effect_kind_serializes_snake_case() {
        let json = serde_json::to_string(&EffectKind::ColorCorrect).unwrap();
        assert_eq!(json, "\"color_correct\"");
    }

    #[test]
    fn from_options_carries_parameters() {
        let mut options = Options::default();
        options.bloom.threshold = 0.4;
        options.bloom.passthrough = 3;
        options.shaders.root = PathBuf::from("custom/shaders");

        let effect = Effect::from_options(EffectKind::Bloom, &options).unwrap();
        assert_eq!(effect.kind(), EffectKind::Bloom);
        assert_eq!(effect.base().shader_root(), Path::new("custom/shaders"));
        let Effect::Bloom(bloom) = effect else {
            unreachable!()
        };
        assert_eq!(bloom.threshold(), 0.4);
        assert_eq!(bloom.passthrough(), 3);
    }

    #[test]
    fn uninitialized_effect_refuses_to_draw() {
        let Some(ctx) = test_context() else { return };
        let source = solid_source(&ctx, 4, 4, [0, 0, 0, 255]);
        let mut effect = PostEffect::new("uninit");
        let mut encoder = ctx.create_encoder();
        let err = effect.apply_effect(&ctx, &mut encoder, &source).unwrap_err();
        assert!(matches!(err, PostFxError::NotInitialized(_)));
    }

    #[test]
    fn basic_effect_copies_and_presents() {
        let Some(ctx) = test_context() else { return };
        let mut composer = ShaderComposer::new().unwrap();
        let source = solid_source(&ctx, 16, 8, [10, 200, 30, 255]);

        let mut effect = PostEffect::new("basic");
        effect.init(&ctx, &mut composer, 16, 8).unwrap();
        assert_eq!(effect.target_count(), 1);
        assert!(effect.target(0).unwrap().depth_view().is_some());

        let screen = RenderTargetDesc::new("screen")
            .add_color_target(COLOR_FORMAT)
            .init(&ctx, 16, 8);
        let mut encoder = ctx.create_encoder();
        effect.clear(&mut encoder);
        effect.apply_effect(&ctx, &mut encoder, &source).unwrap();
        effect
            .draw_to_screen(&ctx, &mut encoder, screen.color_view(0), COLOR_FORMAT)
            .unwrap();
        ctx.submit(encoder);

        let copied = read_rgba8(&ctx, effect.target(0).unwrap().color_texture(0)).unwrap();
        let shown = read_rgba8(&ctx, screen.color_texture(0)).unwrap();
        assert!(copied.chunks(4).all(|p| p == [10, 200, 30, 255]));
        assert_eq!(copied, shown);
    }

    #[test]
    fn bind_buffer_selects_owned_targets_only() {
        let Some(ctx) = test_context() else { return };
        let mut composer = ShaderComposer::new().unwrap();
        let mut effect = PostEffect::new("scene");
        effect.init(&ctx, &mut composer, 8, 8).unwrap();

        effect.bind_buffer(3);
        assert!(effect.bound_target().is_none());
        effect.bind_buffer(0);
        assert_eq!(effect.bound_target().unwrap().size(), (8, 8));
        effect.unbind_buffer();
        assert!(effect.bound_target().is_none());
    }

    #[test]
    fn draw_naming_unowned_resources_is_not_initialized() {
        let Some(ctx) = test_context() else { return };
        let mut composer = ShaderComposer::new().unwrap();
        let source = solid_source(&ctx, 8, 8, [0, 0, 0, 255]);
        let mut effect = PostEffect::new("one target");
        effect.init(&ctx, &mut composer, 8, 8).unwrap();

        let mut encoder = ctx.create_encoder();
        for draw in [
            FsqDraw {
                program: 3,
                uniforms: Vec::new(),
                inputs: vec![(0, PassInput::Source)],
                output: 0,
            },
            FsqDraw {
                program: 0,
                uniforms: Vec::new(),
                inputs: vec![(0, PassInput::Target(2))],
                output: 0,
            },
            FsqDraw {
                program: 0,
                uniforms: Vec::new(),
                inputs: vec![(0, PassInput::Source)],
                output: 1,
            },
        ] {
            let err = effect
                .execute(&ctx, &mut encoder, &source, &[draw])
                .unwrap_err();
            assert!(matches!(err, PostFxError::NotInitialized(_)));
        }
        assert!(effect.fsq_mut().unwrap().bound_texture(0).is_none());
    }

    #[test]
    fn uninitialized_effect_has_no_color_to_sample() {
        assert!(PostEffect::new("empty").color_attachment(0).is_none());
        assert!(Effect::Bloom(BloomEffect::new()).color_attachment(0).is_none());

        let Some(ctx) = test_context() else { return };
        let mut composer = ShaderComposer::new().unwrap();
        let mut effect = PostEffect::new("reader");
        effect.init(&ctx, &mut composer, 8, 8).unwrap();

        let empty = SepiaEffect::new();
        let mut encoder = ctx.create_encoder();
        let err = effect.apply_effect(&ctx, &mut encoder, &empty).unwrap_err();
        assert!(matches!(err, PostFxError::UnboundTexture { unit: 0, .. }));
    }
}
