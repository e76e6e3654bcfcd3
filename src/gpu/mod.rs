//! GPU resource management.
//!
//! Provides wgpu device/surface initialization, shader composition and
//! reflection, off-screen render targets, and the full-screen-quad renderer
//! every post effect draws through.

/// Full-screen-quad renderer, texture units and output layouts.
pub mod fullscreen;
/// Shared wgpu boilerplate helpers for full-screen-quad pipelines.
pub mod pipeline_helpers;
/// Blocking texture-to-CPU copies.
pub mod readback;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// Off-screen framebuffers with color and depth attachments.
pub mod render_target;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Vertex + fragment programs with reflected, name-addressed uniforms.
pub mod shader_program;
