//! Standalone demo window backed by winit.
//!
//! Draws a procedural backdrop into a scene buffer every frame, runs the
//! selected effect over it and presents the result. Parameters are tuned
//! live from the keyboard (see [`KeyAction`]).
//!
//! ```no_run
//! # use bloomfx::Viewer;
//! Viewer::builder()
//!     .with_options_path("assets/presets/soft.toml")
//!     .build()
//!     .run()
//!     .unwrap();
//! ```

use std::{path::PathBuf, sync::Arc};

use web_time::Instant;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use crate::{
    effects::{Effect, EffectKind, PostEffect, PostProcess, PASSTHROUGH_VERT},
    error::PostFxError,
    gpu::{
        fullscreen::FsqRenderer,
        render_context::RenderContext,
        shader_composer::ShaderComposer,
        shader_program::{build_program, ShaderProgram},
    },
    options::{KeyAction, Options},
};

const BACKDROP_FRAG: &str = "scene/backdrop_frag.wgsl";

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    options: Option<Options>,
    options_path: Option<PathBuf>,
    title: String,
}

impl ViewerBuilder {
    fn new() -> Self {
        Self {
            options: None,
            options_path: None,
            title: "bloomfx".into(),
        }
    }

    /// Load options from (and reload them from) a TOML file.
    #[must_use]
    pub fn with_options_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options_path = Some(path.into());
        self
    }

    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the window title prefix.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            options: self.options,
            options_path: self.options_path,
            title: self.title,
        }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// A window showing the effects over an animated backdrop.
///
/// Construct via [`Viewer::builder`], then call [`run`](Self::run).
pub struct Viewer {
    options: Option<Options>,
    options_path: Option<PathBuf>,
    title: String,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed.
    ///
    /// # Errors
    ///
    /// [`PostFxError::Viewer`] if the event loop cannot start, or the
    /// options file fails to load.
    pub fn run(self) -> Result<(), PostFxError> {
        let options = match (self.options, &self.options_path) {
            (Some(options), _) => options,
            (None, Some(path)) => Options::load(path)?,
            (None, None) => Options::default(),
        };

        let event_loop =
            EventLoop::new().map_err(|e| PostFxError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = ViewerApp {
            window: None,
            frame: None,
            options,
            options_path: self.options_path,
            title: self.title,
            start: Instant::now(),
        };
        event_loop
            .run_app(&mut app)
            .map_err(|e| PostFxError::Viewer(e.to_string()))
    }
}

// ── GPU state ────────────────────────────────────────────────────────────

/// Everything created once a window exists.
struct FrameState {
    context: RenderContext,
    composer: ShaderComposer,
    scene: PostEffect,
    backdrop: ShaderProgram,
    backdrop_fsq: FsqRenderer,
    effect: Effect,
}

impl FrameState {
    fn new(
        context: RenderContext,
        options: &Options,
    ) -> Result<Self, PostFxError> {
        let mut composer = ShaderComposer::new()
            .map_err(|e| PostFxError::Viewer(e.to_string()))?;
        let (width, height) = (context.width(), context.height());

        let mut scene = PostEffect::new("Scene");
        scene.set_shader_root(options.shaders.root.clone());
        scene.init(&context, &mut composer, width, height)?;

        let root = &options.shaders.root;
        let backdrop = build_program(
            &context,
            &mut composer,
            "Backdrop",
            &root.join(PASSTHROUGH_VERT),
            &root.join(BACKDROP_FRAG),
        )?;
        let backdrop_fsq = FsqRenderer::new(&context);

        let mut effect = Effect::from_options(options.viewer.effect, options)?;
        effect.init(&context, &mut composer, width, height)?;

        Ok(Self {
            context,
            composer,
            scene,
            backdrop,
            backdrop_fsq,
            effect,
        })
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), PostFxError> {
        self.context.resize(width, height);
        let (width, height) = (self.context.width(), self.context.height());
        self.scene.init(&self.context, &mut self.composer, width, height)?;
        self.effect
            .init(&self.context, &mut self.composer, width, height)
    }

    fn reinit_effect(&mut self) -> Result<(), PostFxError> {
        let (width, height) = (self.context.width(), self.context.height());
        self.effect
            .init(&self.context, &mut self.composer, width, height)
    }

    fn replace_effect(&mut self, options: &Options) -> Result<(), PostFxError> {
        let mut effect = Effect::from_options(options.viewer.effect, options)?;
        let (width, height) = (self.context.width(), self.context.height());
        effect.init(&self.context, &mut self.composer, width, height)?;
        self.effect = effect;
        Ok(())
    }

    /// Record and submit one frame into `view`.
    fn encode(
        &mut self,
        view: &wgpu::TextureView,
        time: f32,
        bypass: bool,
    ) -> Result<(), PostFxError> {
        let ctx = &self.context;
        let mut encoder = ctx.create_encoder();

        self.scene.clear(&mut encoder);
        self.scene.bind_buffer(0);
        self.backdrop.bind();
        self.backdrop.set_uniform("u_time", time);
        self.backdrop.set_uniform(
            "u_resolution",
            [ctx.width() as f32, ctx.height() as f32],
        );
        let drawn = match self.scene.bound_target() {
            Some(target) => target.render_to_fsq(
                ctx,
                &mut encoder,
                &self.backdrop_fsq,
                &mut self.backdrop,
            ),
            None => Ok(()),
        };
        self.backdrop.unbind();
        self.scene.unbind_buffer();
        drawn?;

        if bypass {
            self.scene
                .draw_to_screen(ctx, &mut encoder, view, ctx.format())?;
        } else {
            self.effect.clear(&mut encoder);
            self.effect.apply_effect(ctx, &mut encoder, &self.scene)?;
            self.effect
                .draw_to_screen(ctx, &mut encoder, view, ctx.format())?;
        }
        ctx.submit(encoder);
        Ok(())
    }
}

// ── Winit app ────────────────────────────────────────────────────────────

struct ViewerApp {
    window: Option<Arc<Window>>,
    frame: Option<FrameState>,
    options: Options,
    options_path: Option<PathBuf>,
    title: String,
    start: Instant,
}

impl ViewerApp {
    fn update_title(&self) {
        let (Some(window), Some(frame)) = (&self.window, &self.frame) else {
            return;
        };
        let detail = if self.options.viewer.bypass {
            "bypass".to_owned()
        } else {
            match &frame.effect {
                Effect::Bloom(b) => format!(
                    "bloom  threshold {:.2}  passes {}  downscale {:.1}",
                    b.threshold(),
                    b.passthrough(),
                    b.downscale()
                ),
                other => other.kind().name().to_owned(),
            }
        };
        window.set_title(&format!("{} - {detail}", self.title));
    }

    fn select(&mut self, kind: EffectKind) {
        self.options.viewer.effect = kind;
        self.options.viewer.bypass = false;
        if let Some(frame) = &mut self.frame {
            if let Err(e) = frame.replace_effect(&self.options) {
                log::error!("cannot switch to {}: {e}", kind.name());
            }
        }
    }

    /// Apply the bloom options to the live effect; `reinit` when the target
    /// sizes change.
    fn push_bloom(&mut self, reinit: bool) {
        let Some(frame) = &mut self.frame else {
            return;
        };
        let Effect::Bloom(bloom) = &mut frame.effect else {
            return;
        };
        let o = &self.options.bloom;
        bloom.set_threshold(o.threshold);
        bloom.set_passthrough(o.passthrough);
        bloom.set_downscale(o.downscale);
        if reinit {
            if let Err(e) = frame.reinit_effect() {
                log::error!("bloom re-init failed: {e}");
            }
        }
    }

    fn handle_action(&mut self, action: KeyAction, event_loop: &ActiveEventLoop) {
        let step = self.options.viewer.threshold_step;
        let scale_step = self.options.viewer.downscale_step;
        match action {
            KeyAction::SelectBloom => self.select(EffectKind::Bloom),
            KeyAction::SelectSepia => self.select(EffectKind::Sepia),
            KeyAction::SelectGreyscale => self.select(EffectKind::Greyscale),
            KeyAction::SelectColorCorrect => {
                self.select(EffectKind::ColorCorrect);
            }
            KeyAction::NextEffect => {
                self.select(self.options.viewer.effect.next());
            }
            KeyAction::ToggleBypass => {
                self.options.viewer.bypass = !self.options.viewer.bypass;
            }
            KeyAction::ThresholdUp => {
                let bloom = &mut self.options.bloom;
                bloom.threshold = (bloom.threshold + step).min(1.0);
                self.push_bloom(false);
            }
            KeyAction::ThresholdDown => {
                let bloom = &mut self.options.bloom;
                bloom.threshold = (bloom.threshold - step).max(0.0);
                self.push_bloom(false);
            }
            KeyAction::BlurMore => {
                let bloom = &mut self.options.bloom;
                bloom.passthrough = bloom.passthrough.saturating_add(1);
                self.push_bloom(false);
            }
            KeyAction::BlurLess => {
                let bloom = &mut self.options.bloom;
                bloom.passthrough = bloom.passthrough.saturating_sub(1);
                self.push_bloom(false);
            }
            KeyAction::DownscaleUp => {
                self.options.bloom.downscale += scale_step;
                self.push_bloom(true);
            }
            KeyAction::DownscaleDown => {
                let bloom = &mut self.options.bloom;
                bloom.downscale = (bloom.downscale - scale_step).max(1.0);
                self.push_bloom(true);
            }
            KeyAction::ReloadOptions => self.reload_options(),
            KeyAction::SavePreset => self.save_preset(),
            KeyAction::Quit => event_loop.exit(),
        }
        self.update_title();
    }

    fn reload_options(&mut self) {
        let Some(path) = &self.options_path else {
            log::info!("no options file to reload");
            return;
        };
        match Options::load(path) {
            Ok(options) => {
                log::info!("reloaded options from {}", path.display());
                self.options = options;
                self.select(self.options.viewer.effect);
            }
            Err(e) => log::error!("reload failed: {e}"),
        }
    }

    fn save_preset(&self) {
        let path = self.options_path.clone().unwrap_or_else(|| {
            self.options.viewer.presets_dir.join("last.toml")
        });
        match self.options.save(&path) {
            Ok(()) => log::info!(
                "saved {} (presets: {:?})",
                path.display(),
                Options::list_presets(&self.options.viewer.presets_dir)
            ),
            Err(e) => log::error!("save failed: {e}"),
        }
    }

    fn redraw(&mut self) {
        let Some(frame) = &mut self.frame else {
            return;
        };
        let surface = match frame.context.get_next_frame() {
            Ok(surface) => surface,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                let (w, h) = (frame.context.width(), frame.context.height());
                if let Err(e) = frame.resize(w, h) {
                    log::error!("resize failed: {e}");
                }
                return;
            }
            Err(e) => {
                log::error!("surface error: {e:?}");
                return;
            }
        };
        let view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let time = self.start.elapsed().as_secs_f32();
        match frame.encode(&view, time, self.options.viewer.bypass) {
            Ok(()) => surface.present(),
            Err(e) => log::error!("frame failed: {e}"),
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let inner = window.inner_size();
        let size = (inner.width.max(1), inner.height.max(1));
        let frame = pollster::block_on(RenderContext::new(window.clone(), size))
            .map_err(PostFxError::from)
            .and_then(|context| FrameState::new(context, &self.options));
        match frame {
            Ok(frame) => self.frame = Some(frame),
            Err(e) => {
                log::error!("Failed to initialize: {e}");
                event_loop.exit();
                return;
            }
        }

        log::info!("{}x{} ready", size.0, size.1);
        window.request_redraw();
        self.window = Some(window);
        self.update_title();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(frame) = &mut self.frame {
                    if let Err(e) = frame.resize(size.width, size.height) {
                        log::error!("resize failed: {e}");
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                self.redraw();
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let key_str = format!("{code:?}");
                if let Some(action) = self.options.keybindings.lookup(&key_str) {
                    self.handle_action(action, event_loop);
                }
            }

            _ => (),
        }
    }
}
