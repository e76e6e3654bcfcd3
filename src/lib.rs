// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Multi-pass post-processing effects on wgpu.
//!
//! Effects read a rendered scene through [`gpu::fullscreen::ColorSource`],
//! draw a fixed schedule of fullscreen passes into owned render targets and
//! present the result. The bloom effect copies the scene, extracts bright
//! texels above a threshold, blurs them in alternating horizontal and
//! vertical passes at reduced resolution and adds them back.
//!
//! # Key entry points
//!
//! - [`effects::Effect`] - the closed set of effects behind
//!   [`effects::PostProcess`]
//! - [`effects::BloomEffect`] - the bloom pipeline
//! - [`gpu::shader_program::ShaderProgram`] - WGSL programs with reflected
//!   uniforms and texture units
//! - [`gpu::render_target::RenderTarget`] - offscreen color/depth targets
//! - [`options::Options`] - effect parameters and TOML presets

pub mod effects;
pub mod error;
pub mod gpu;
pub mod options;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use effects::{Effect, EffectKind, PostProcess};
pub use error::PostFxError;
pub use options::Options;
#[cfg(feature = "viewer")]
pub use viewer::{Viewer, ViewerBuilder};
