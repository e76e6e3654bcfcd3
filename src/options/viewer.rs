use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::effects::EffectKind;

/// Where shader sources are read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShaderOptions {
    /// Directory every shader file name is resolved against.
    pub root: PathBuf,
}

impl Default for ShaderOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from(super::DEFAULT_SHADER_ROOT),
        }
    }
}

/// Demo viewer state and tuning step sizes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Viewer", inline)]
#[serde(default)]
pub struct ViewerOptions {
    /// Effect shown at startup.
    #[schemars(title = "Effect")]
    pub effect: EffectKind,
    /// Show the scene without any effect.
    #[schemars(title = "Bypass")]
    pub bypass: bool,
    /// Threshold change per key press.
    #[schemars(skip)]
    pub threshold_step: f32,
    /// Downscale change per key press.
    #[schemars(skip)]
    pub downscale_step: f32,
    /// Directory `save_preset` writes to and presets are listed from.
    #[schemars(skip)]
    pub presets_dir: PathBuf,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            effect: EffectKind::Bloom,
            bypass: false,
            threshold_step: 0.01,
            downscale_step: 0.5,
            presets_dir: PathBuf::from("assets/presets"),
        }
    }
}
