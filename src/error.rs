//! Crate-level error types.

use std::{fmt, path::PathBuf};

use crate::gpu::render_context::RenderContextError;

/// Errors produced by the bloomfx crate.
#[derive(Debug)]
pub enum PostFxError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// A shader stage source file could not be read.
    ShaderIo {
        /// Path of the stage source.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// A shader stage failed to parse, compose or validate.
    ShaderCompile {
        /// Path of the stage source.
        path: PathBuf,
        /// Compiler diagnostic.
        message: String,
    },
    /// Stages could not be combined into a usable program.
    ShaderLink {
        /// Program label.
        label: String,
        /// Reason the link failed.
        message: String,
    },
    /// A full-screen draw was issued without a bound program.
    ProgramNotBound(String),
    /// The bound program samples a texture unit that has nothing bound.
    UnboundTexture {
        /// Program label.
        program: String,
        /// Texture unit the fragment stage expects.
        unit: u32,
    },
    /// An effect was used before `init` allocated its resources.
    NotInitialized(String),
    /// Malformed `.cube` LUT data.
    Lut {
        /// 1-based line number (0 when the error is not tied to a line).
        line: usize,
        /// What was wrong.
        message: String,
    },
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Texture readback failure.
    Readback(String),
    /// Viewer event-loop failure.
    Viewer(String),
}

impl fmt::Display for PostFxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::ShaderIo { path, source } => {
                write!(f, "cannot read shader '{}': {source}", path.display())
            }
            Self::ShaderCompile { path, message } => {
                write!(f, "shader '{}' failed to compile: {message}", path.display())
            }
            Self::ShaderLink { label, message } => {
                write!(f, "program '{label}' failed to link: {message}")
            }
            Self::ProgramNotBound(label) => {
                write!(f, "program '{label}' drawn while not bound")
            }
            Self::UnboundTexture { program, unit } => {
                write!(f, "program '{program}' samples texture unit {unit} but nothing is bound")
            }
            Self::NotInitialized(label) => {
                write!(f, "effect '{label}' used before init")
            }
            Self::Lut { line, message } => {
                write!(f, "LUT parse error at line {line}: {message}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Readback(msg) => write!(f, "readback error: {msg}"),
            Self::Viewer(msg) => write!(f, "viewer error: {msg}"),
        }
    }
}

impl std::error::Error for PostFxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::ShaderIo { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for PostFxError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for PostFxError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
