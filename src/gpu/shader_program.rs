//! Linked vertex + fragment programs with name-addressed uniforms.
//!
//! Stages are composed with [`ShaderComposer`] and reflected with naga, so
//! the program knows which texture units its fragment stage samples and
//! where each named uniform lives inside the uniform block.
//!
//! Binding convention, all in `@group(0)`: texture unit `u` is
//! `@binding(2u)` with its sampler at `@binding(2u + 1)`; the uniform block
//! is a `var<uniform>` struct at any other binding whose member names are
//! the uniform names.

use std::{borrow::Cow, path::Path};

use rustc_hash::FxHashMap;

use super::fullscreen::{OutputLayout, MAX_TEXTURE_UNITS};
use super::pipeline_helpers::{self, ProgramStages};
use super::render_context::RenderContext;
use super::shader_composer::ShaderComposer;
use crate::error::PostFxError;

/// Which half of a program a source file provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex stage (`@vertex` entry point).
    Vertex,
    /// Fragment stage (`@fragment` entry point).
    Fragment,
}

impl ShaderStage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            Self::Vertex => naga::ShaderStage::Vertex,
            Self::Fragment => naga::ShaderStage::Fragment,
        }
    }

    fn attribute(self) -> &'static str {
        match self {
            Self::Vertex => "@vertex",
            Self::Fragment => "@fragment",
        }
    }
}

/// Shape of a uniform block member that can be set by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    /// `f32`
    F32,
    /// `u32`
    U32,
    /// `i32`
    I32,
    /// `vec2<f32>`
    Vec2,
    /// `vec3<f32>`
    Vec3,
    /// `vec4<f32>`
    Vec4,
}

/// A value staged for a named uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `f32`
    F32(f32),
    /// `u32`
    U32(u32),
    /// `i32`
    I32(i32),
    /// `vec2<f32>`
    Vec2([f32; 2]),
    /// `vec3<f32>`
    Vec3([f32; 3]),
    /// `vec4<f32>`
    Vec4([f32; 4]),
}

impl UniformValue {
    /// The member shape this value can be written into.
    #[must_use]
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::F32(_) => UniformKind::F32,
            Self::U32(_) => UniformKind::U32,
            Self::I32(_) => UniformKind::I32,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Vec4(_) => UniformKind::Vec4,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Self::F32(v) => bytemuck::bytes_of(v),
            Self::U32(v) => bytemuck::bytes_of(v),
            Self::I32(v) => bytemuck::bytes_of(v),
            Self::Vec2(v) => bytemuck::bytes_of(v),
            Self::Vec3(v) => bytemuck::bytes_of(v),
            Self::Vec4(v) => bytemuck::bytes_of(v),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        Self::Vec2(v)
    }
}

impl From<glam::Vec2> for UniformValue {
    fn from(v: glam::Vec2) -> Self {
        Self::Vec2(v.to_array())
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        Self::Vec3(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        Self::Vec4(v)
    }
}

#[derive(Debug, Clone, Copy)]
struct UniformField {
    offset: u32,
    kind: UniformKind,
}

/// Reflected uniform block of a fragment stage.
#[derive(Debug, Clone, Default)]
pub struct UniformBlock {
    binding: u32,
    size: u64,
    fields: FxHashMap<String, UniformField>,
}

impl UniformBlock {
    /// Binding index of the block inside `@group(0)`.
    pub fn binding(&self) -> u32 {
        self.binding
    }

    /// Host-side buffer size in bytes (rounded up to 16).
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Shape of the member called `name`, if the block declares it.
    pub fn field_kind(&self, name: &str) -> Option<UniformKind> {
        self.fields.get(name).map(|f| f.kind)
    }
}

/// A texture the fragment stage samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSlot {
    /// Texture unit (binding / 2).
    pub unit: u32,
    /// Expected view dimension.
    pub dimension: wgpu::TextureViewDimension,
}

/// Everything a fragment stage binds, as discovered by reflection.
#[derive(Debug, Clone, Default)]
pub struct StageBindings {
    /// Sampled textures, in declaration order.
    pub textures: Vec<TextureSlot>,
    /// Sampler binding indices.
    pub samplers: Vec<u32>,
    /// The uniform block, if any.
    pub uniform: Option<UniformBlock>,
}

impl StageBindings {
    fn is_empty(&self) -> bool {
        self.textures.is_empty()
            && self.samplers.is_empty()
            && self.uniform.is_none()
    }
}

fn uniform_kind(inner: &naga::TypeInner) -> Option<UniformKind> {
    use naga::{Scalar, ScalarKind, TypeInner, VectorSize};

    match *inner {
        TypeInner::Scalar(Scalar {
            kind: ScalarKind::Float,
            width: 4,
        }) => Some(UniformKind::F32),
        TypeInner::Scalar(Scalar {
            kind: ScalarKind::Uint,
            width: 4,
        }) => Some(UniformKind::U32),
        TypeInner::Scalar(Scalar {
            kind: ScalarKind::Sint,
            width: 4,
        }) => Some(UniformKind::I32),
        TypeInner::Vector {
            size,
            scalar:
                Scalar {
                    kind: ScalarKind::Float,
                    width: 4,
                },
        } => Some(match size {
            VectorSize::Bi => UniformKind::Vec2,
            VectorSize::Tri => UniformKind::Vec3,
            VectorSize::Quad => UniformKind::Vec4,
        }),
        _ => None,
    }
}

/// Discover the textures, samplers and uniform members a module binds.
pub(crate) fn reflect(module: &naga::Module) -> Result<StageBindings, String> {
    use naga::{ImageClass, ImageDimension, ScalarKind, TypeInner};

    let mut out = StageBindings::default();
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        let name = var.name.as_deref().unwrap_or("<unnamed>");
        if binding.group != 0 {
            return Err(format!(
                "'{name}' uses @group({}); only @group(0) is supported",
                binding.group
            ));
        }
        let slot = binding.binding;
        match &module.types[var.ty].inner {
            TypeInner::Image {
                dim,
                arrayed,
                class,
            } => {
                if slot % 2 != 0 || slot / 2 >= MAX_TEXTURE_UNITS {
                    return Err(format!(
                        "texture '{name}' at @binding({slot}) is not an even binding below {}",
                        MAX_TEXTURE_UNITS * 2
                    ));
                }
                let sampled_float = matches!(
                    class,
                    ImageClass::Sampled {
                        kind: ScalarKind::Float,
                        multi: false,
                    }
                );
                let dimension = match (dim, arrayed) {
                    (ImageDimension::D2, false) if sampled_float => {
                        wgpu::TextureViewDimension::D2
                    }
                    (ImageDimension::D3, false) if sampled_float => {
                        wgpu::TextureViewDimension::D3
                    }
                    _ => {
                        return Err(format!(
                            "texture '{name}' must be texture_2d<f32> or texture_3d<f32>"
                        ))
                    }
                };
                out.textures.push(TextureSlot {
                    unit: slot / 2,
                    dimension,
                });
            }
            TypeInner::Sampler { comparison: false } => {
                if slot % 2 != 1 || slot / 2 >= MAX_TEXTURE_UNITS {
                    return Err(format!(
                        "sampler '{name}' at @binding({slot}) must follow its texture"
                    ));
                }
                out.samplers.push(slot);
            }
            TypeInner::Struct { members, span }
                if var.space == naga::AddressSpace::Uniform =>
            {
                if out.uniform.is_some() {
                    return Err(format!(
                        "'{name}' is a second uniform block; only one is supported"
                    ));
                }
                let mut fields = FxHashMap::default();
                for member in members {
                    let Some(member_name) = &member.name else {
                        continue;
                    };
                    match uniform_kind(&module.types[member.ty].inner) {
                        Some(kind) => {
                            let _ = fields.insert(
                                member_name.clone(),
                                UniformField {
                                    offset: member.offset,
                                    kind,
                                },
                            );
                        }
                        None => log::debug!(
                            "uniform member '{member_name}' has no settable type; skipped"
                        ),
                    }
                }
                out.uniform = Some(UniformBlock {
                    binding: slot,
                    size: u64::from(*span).next_multiple_of(16).max(16),
                    fields,
                });
            }
            _ => {
                return Err(format!("binding '{name}' has an unsupported type"));
            }
        }
    }
    Ok(out)
}

struct CompiledStage {
    module: naga::Module,
    entry_point: String,
    bindings: StageBindings,
}

enum StageSlot {
    Empty,
    Compiled(Box<CompiledStage>),
    Failed(String),
}

impl StageSlot {
    fn compiled(&self, stage: ShaderStage) -> Result<&CompiledStage, String> {
        match self {
            Self::Compiled(c) => Ok(c),
            Self::Empty => Err(format!("no {} stage loaded", stage.attribute())),
            Self::Failed(msg) => {
                Err(format!("{} stage failed to compile: {msg}", stage.attribute()))
            }
        }
    }
}

fn compile_error(path: &Path, message: impl Into<String>) -> PostFxError {
    PostFxError::ShaderCompile {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn compile_stage(
    composer: &mut ShaderComposer,
    path: &Path,
    stage: ShaderStage,
) -> Result<CompiledStage, PostFxError> {
    let source = std::fs::read_to_string(path).map_err(|source| {
        PostFxError::ShaderIo {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let module = composer
        .compose_naga(&source, &path.to_string_lossy())
        .map_err(|message| compile_error(path, message))?;

    let _info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|e| compile_error(path, e.to_string()))?;

    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage.naga())
        .map(|ep| ep.name.clone())
        .ok_or_else(|| {
            compile_error(path, format!("no {} entry point", stage.attribute()))
        })?;

    let bindings =
        reflect(&module).map_err(|message| compile_error(path, message))?;

    Ok(CompiledStage {
        module,
        entry_point,
        bindings,
    })
}

struct Linked {
    vertex: wgpu::ShaderModule,
    vertex_entry: String,
    fragment: wgpu::ShaderModule,
    fragment_entry: String,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: FxHashMap<OutputLayout, wgpu::RenderPipeline>,
}

/// A vertex + fragment stage pair usable for full-screen-quad draws.
pub struct ShaderProgram {
    label: String,
    vertex: StageSlot,
    fragment: StageSlot,
    linked: Option<Linked>,
    bound: bool,
    staged: Vec<u8>,
    last_values: FxHashMap<String, UniformValue>,
}

impl ShaderProgram {
    /// Create an empty program. Stages are added with
    /// [`load_shader_part_from_file`](Self::load_shader_part_from_file).
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            vertex: StageSlot::Empty,
            fragment: StageSlot::Empty,
            linked: None,
            bound: false,
            staged: Vec::new(),
            last_values: FxHashMap::default(),
        }
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Read, compose and validate one stage from a WGSL file.
    ///
    /// A failure is also remembered, so a later [`link`](Self::link) fails
    /// even if the caller ignored this result.
    ///
    /// # Errors
    ///
    /// [`PostFxError::ShaderIo`] if the file cannot be read,
    /// [`PostFxError::ShaderCompile`] if it does not compile, lacks an entry
    /// point for `stage`, or binds resources outside the supported layout.
    pub fn load_shader_part_from_file(
        &mut self,
        composer: &mut ShaderComposer,
        path: impl AsRef<Path>,
        stage: ShaderStage,
    ) -> Result<(), PostFxError> {
        let path = path.as_ref();
        let (slot, result) = match compile_stage(composer, path, stage) {
            Ok(compiled) => (StageSlot::Compiled(Box::new(compiled)), Ok(())),
            Err(e) => (StageSlot::Failed(e.to_string()), Err(e)),
        };
        match stage {
            ShaderStage::Vertex => self.vertex = slot,
            ShaderStage::Fragment => self.fragment = slot,
        }
        self.linked = None;
        result
    }

    /// Combine the loaded stages into GPU shader modules and layouts.
    ///
    /// # Errors
    ///
    /// [`PostFxError::ShaderLink`] if a stage is missing or failed to
    /// compile, or the vertex stage binds resources.
    pub fn link(&mut self, context: &RenderContext) -> Result<(), PostFxError> {
        self.linked = None;
        let link_error = |message: String| PostFxError::ShaderLink {
            label: self.label.clone(),
            message,
        };
        let vertex = self
            .vertex
            .compiled(ShaderStage::Vertex)
            .map_err(link_error)?;
        let fragment = self
            .fragment
            .compiled(ShaderStage::Fragment)
            .map_err(link_error)?;
        if !vertex.bindings.is_empty() {
            return Err(link_error(
                "vertex stage must not bind resources".to_owned(),
            ));
        }

        let device = &context.device;
        let vertex_module =
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{} Vertex", self.label)),
                source: wgpu::ShaderSource::Naga(Cow::Owned(
                    vertex.module.clone(),
                )),
            });
        let fragment_module =
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{} Fragment", self.label)),
                source: wgpu::ShaderSource::Naga(Cow::Owned(
                    fragment.module.clone(),
                )),
            });

        let bindings = &fragment.bindings;
        let mut entries = Vec::new();
        for slot in &bindings.textures {
            entries.push(pipeline_helpers::texture(slot.unit * 2, slot.dimension));
        }
        for &binding in &bindings.samplers {
            entries.push(pipeline_helpers::filtering_sampler(binding));
        }
        if let Some(block) = &bindings.uniform {
            entries.push(pipeline_helpers::uniform_buffer(block.binding));
        }

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{} Layout", self.label)),
                entries: &entries,
            });
        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{} Pipeline Layout", self.label)),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        self.staged = vec![
            0;
            bindings.uniform.as_ref().map_or(0, |b| b.size as usize)
        ];
        self.last_values.clear();
        self.linked = Some(Linked {
            vertex: vertex_module,
            vertex_entry: vertex.entry_point.clone(),
            fragment: fragment_module,
            fragment_entry: fragment.entry_point.clone(),
            bind_group_layout,
            pipeline_layout,
            pipelines: FxHashMap::default(),
        });
        log::debug!("linked program '{}'", self.label);
        Ok(())
    }

    /// Whether [`link`](Self::link) has succeeded since the last stage load.
    pub fn is_linked(&self) -> bool {
        self.linked.is_some()
    }

    /// Make this program current for subsequent draws.
    pub fn bind(&mut self) {
        self.bound = true;
    }

    /// Make this program not current.
    pub fn unbind(&mut self) {
        self.bound = false;
    }

    /// Whether the program is currently bound.
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Stage `value` for the uniform `name` for the next draw.
    ///
    /// Has no effect while the program is unbound or unlinked, or when the
    /// fragment stage declares no such uniform.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        let value = value.into();
        if !self.bound {
            log::trace!(
                "'{}': set_uniform('{name}') ignored, program not bound",
                self.label
            );
            return;
        }
        if self.linked.is_none() {
            log::trace!(
                "'{}': set_uniform('{name}') ignored, program not linked",
                self.label
            );
            return;
        }
        let Some(field) = self.reflected().and_then(|b| {
            b.uniform.as_ref().and_then(|u| u.fields.get(name).copied())
        }) else {
            log::trace!("'{}': no uniform named '{name}'", self.label);
            return;
        };
        if field.kind != value.kind() {
            log::warn!(
                "'{}': uniform '{name}' is {:?}, got {:?}",
                self.label,
                field.kind,
                value.kind()
            );
            return;
        }
        let start = field.offset as usize;
        let bytes = value.bytes();
        let Some(dst) = self.staged.get_mut(start..start + bytes.len()) else {
            log::warn!(
                "'{}': uniform '{name}' lies outside the staged block",
                self.label
            );
            return;
        };
        dst.copy_from_slice(bytes);
        let _ = self.last_values.insert(name.to_owned(), value);
    }

    /// The last value set for `name` (diagnostics only).
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.last_values.get(name).copied()
    }

    /// Reflected fragment-stage bindings, once that stage has compiled.
    pub fn reflected(&self) -> Option<&StageBindings> {
        match &self.fragment {
            StageSlot::Compiled(c) => Some(&c.bindings),
            _ => None,
        }
    }

    pub(crate) fn staged_uniforms(&self) -> &[u8] {
        &self.staged
    }

    pub(crate) fn bind_group_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.linked.as_ref().map(|l| &l.bind_group_layout)
    }

    /// Fetch or build the pipeline for drawing into `layout`.
    pub(crate) fn pipeline_for(
        &mut self,
        device: &wgpu::Device,
        layout: &OutputLayout,
    ) -> Result<&wgpu::RenderPipeline, PostFxError> {
        let label = &self.label;
        let linked = self.linked.as_mut().ok_or_else(|| PostFxError::ShaderLink {
            label: label.clone(),
            message: "program drawn before link".to_owned(),
        })?;
        if !linked.pipelines.contains_key(layout) {
            log::debug!("'{label}': building pipeline for {layout:?}");
            let stages = ProgramStages {
                vertex: &linked.vertex,
                vertex_entry: &linked.vertex_entry,
                fragment: &linked.fragment,
                fragment_entry: &linked.fragment_entry,
            };
            let pipeline = pipeline_helpers::create_fullscreen_pipeline(
                device,
                label,
                &stages,
                &linked.pipeline_layout,
                &layout.colors,
                layout.depth,
            );
            let _ = linked.pipelines.insert(layout.clone(), pipeline);
        }
        Ok(&linked.pipelines[layout])
    }
}

/// Load `vertex` and `fragment` into a new program and link it.
///
/// # Errors
///
/// Propagates the first compile or link failure.
pub fn build_program(
    context: &RenderContext,
    composer: &mut ShaderComposer,
    label: &str,
    vertex: &Path,
    fragment: &Path,
) -> Result<ShaderProgram, PostFxError> {
    let mut program = ShaderProgram::new(label);
    program.load_shader_part_from_file(composer, vertex, ShaderStage::Vertex)?;
    program.load_shader_part_from_file(
        composer,
        fragment,
        ShaderStage::Fragment,
    )?;
    program.link(context)?;
    Ok(program)
}

#[cfg(test)]
mod tests {
    use std::{io::Write, path::PathBuf};

    use super::*;
    use crate::gpu::render_context::tests::test_context;

    fn compose(source: &str) -> naga::Module {
        ShaderComposer::new()
            .unwrap()
            .compose_naga(source, "test.wgsl")
            .unwrap()
    }

    fn write_shader(dir: &Path, name: &str, source: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(source.as_bytes()).unwrap();
        path
    }

    const VERTEX: &str = include_str!("../../assets/shaders/passthrough_vert.wgsl");

    #[test]
    fn reflects_units_samplers_and_uniform_members() {
        let module = compose(include_str!(
            "../../assets/shaders/post/color_correction_frag.wgsl"
        ));
        let bindings = reflect(&module).unwrap();
        assert_eq!(
            bindings.textures,
            vec![
                TextureSlot {
                    unit: 0,
                    dimension: wgpu::TextureViewDimension::D2
                },
                TextureSlot {
                    unit: 1,
                    dimension: wgpu::TextureViewDimension::D3
                },
            ]
        );
        assert_eq!(bindings.samplers, vec![1, 3]);
        let block = bindings.uniform.unwrap();
        assert_eq!(block.binding(), 8);
        assert_eq!(block.size(), 16);
        assert_eq!(block.field_kind("u_lut_size"), Some(UniformKind::F32));
        assert_eq!(block.field_kind("u_threshold"), None);
    }

    #[test]
    fn reflects_vec2_member_offsets() {
        let module = compose(include_str!(
            "../../assets/shaders/scene/backdrop_frag.wgsl"
        ));
        let block = reflect(&module).unwrap().uniform.unwrap();
        assert_eq!(block.field_kind("u_time"), Some(UniformKind::F32));
        assert_eq!(block.field_kind("u_resolution"), Some(UniformKind::Vec2));
        assert_eq!(block.fields["u_resolution"].offset, 8);
    }

    #[test]
    fn rejects_odd_texture_binding() {
        let module = compose(
            r"
@group(0) @binding(1) var t: texture_2d<f32>;
@group(0) @binding(2) var s: sampler;
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return textureSample(t, s, vec2<f32>(0.5));
}
",
        );
        assert!(reflect(&module).is_err());
    }

    #[test]
    fn rejects_non_zero_group() {
        let module = compose(
            r"
@group(1) @binding(0) var t: texture_2d<f32>;
@group(1) @binding(1) var s: sampler;
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return textureSample(t, s, vec2<f32>(0.5));
}
",
        );
        assert!(reflect(&module).unwrap_err().contains("@group(1)"));
    }

    #[test]
    fn missing_file_is_an_io_error_and_poisons_link() {
        let mut composer = ShaderComposer::new().unwrap();
        let mut program = ShaderProgram::new("missing");
        let err = program
            .load_shader_part_from_file(
                &mut composer,
                "does/not/exist.wgsl",
                ShaderStage::Fragment,
            )
            .unwrap_err();
        assert!(matches!(err, PostFxError::ShaderIo { .. }));
        assert!(matches!(
            program.fragment.compiled(ShaderStage::Fragment),
            Err(msg) if msg.contains("failed to compile")
        ));
    }

    #[test]
    fn stage_without_matching_entry_point_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_shader(dir.path(), "vert.wgsl", VERTEX);
        let mut composer = ShaderComposer::new().unwrap();
        let mut program = ShaderProgram::new("swapped");
        let err = program
            .load_shader_part_from_file(&mut composer, &path, ShaderStage::Fragment)
            .unwrap_err();
        assert!(err.to_string().contains("@fragment"));
    }

    #[test]
    fn syntax_error_is_a_compile_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_shader(dir.path(), "bad.wgsl", "fn fs_main( {");
        let mut composer = ShaderComposer::new().unwrap();
        let mut program = ShaderProgram::new("bad");
        let err = program
            .load_shader_part_from_file(&mut composer, &path, ShaderStage::Fragment)
            .unwrap_err();
        assert!(matches!(err, PostFxError::ShaderCompile { .. }));
    }

    #[test]
    fn uniforms_only_stick_while_bound() {
        let mut program = ShaderProgram::new("unbound");
        program.set_uniform("u_threshold", 0.5);
        assert_eq!(program.uniform("u_threshold"), None);
    }

    #[test]
    fn link_requires_vertex_stage() {
        let Some(ctx) = test_context() else { return };
        let mut composer = ShaderComposer::new().unwrap();
        let mut program = ShaderProgram::new("fragment only");
        program
            .load_shader_part_from_file(
                &mut composer,
                "assets/shaders/passthrough_frag.wgsl",
                ShaderStage::Fragment,
            )
            .unwrap();
        let err = program.link(&ctx).unwrap_err();
        assert!(matches!(err, PostFxError::ShaderLink { .. }));
        assert!(!program.is_linked());
    }

    #[test]
    fn linked_program_stages_declared_uniforms() {
        let Some(ctx) = test_context() else { return };
        let mut composer = ShaderComposer::new().unwrap();
        let mut program = build_program(
            &ctx,
            &mut composer,
            "threshold",
            Path::new("assets/shaders/passthrough_vert.wgsl"),
            Path::new("assets/shaders/post/bloom_frag.wgsl"),
        )
        .unwrap();

        program.bind();
        program.set_uniform("u_threshold", 0.25f32);
        program.set_uniform("u_not_declared", 1.0f32);
        program.set_uniform("u_threshold", 3u32);
        program.unbind();
        program.set_uniform("u_threshold", 0.75f32);

        assert_eq!(program.uniform("u_threshold"), Some(UniformValue::F32(0.25)));
        assert_eq!(program.uniform("u_not_declared"), None);
        assert_eq!(&program.staged_uniforms()[..4], bytemuck::bytes_of(&0.25f32));
    }

    #[test]
    fn bound_but_unlinked_program_ignores_uniforms() {
        let mut composer = ShaderComposer::new().unwrap();
        let mut program = ShaderProgram::new("threshold, fragment only");
        program
            .load_shader_part_from_file(
                &mut composer,
                "assets/shaders/post/bloom_frag.wgsl",
                ShaderStage::Fragment,
            )
            .unwrap();
        assert!(program.reflected().is_some());

        program.bind();
        program.set_uniform("u_threshold", 0.5f32);
        assert_eq!(program.uniform("u_threshold"), None);
        assert!(program.staged_uniforms().is_empty());
    }

    #[test]
    fn reloading_a_stage_after_link_ignores_uniforms_until_relinked() {
        let Some(ctx) = test_context() else { return };
        let mut composer = ShaderComposer::new().unwrap();
        let mut program = build_program(
            &ctx,
            &mut composer,
            "reload",
            Path::new("assets/shaders/passthrough_vert.wgsl"),
            Path::new("assets/shaders/post/color_correction_frag.wgsl"),
        )
        .unwrap();

        // Different block layout than the one staged at link.
        program
            .load_shader_part_from_file(
                &mut composer,
                "assets/shaders/scene/backdrop_frag.wgsl",
                ShaderStage::Fragment,
            )
            .unwrap();
        program.bind();
        program.set_uniform("u_resolution", [640.0f32, 480.0]);
        assert_eq!(program.uniform("u_resolution"), None);

        program.link(&ctx).unwrap();
        program.set_uniform("u_resolution", [640.0f32, 480.0]);
        assert_eq!(
            program.uniform("u_resolution"),
            Some(UniformValue::Vec2([640.0, 480.0]))
        );
    }
}
