use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::effects::BloomEffect;

/// Bloom parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Bloom", inline)]
#[serde(default)]
pub struct BloomOptions {
    /// Blur target size divisor. Applied at the next init.
    #[schemars(title = "Downscale", range(min = 1.0, max = 16.0), extend("step" = 0.5))]
    pub downscale: f32,
    /// Minimum luminance that blooms.
    #[schemars(title = "Threshold", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub threshold: f32,
    /// Horizontal + vertical blur rounds.
    #[schemars(title = "Blur Passes", range(min = 0, max = 10))]
    pub passthrough: u32,
}

impl Default for BloomOptions {
    fn default() -> Self {
        Self {
            downscale: BloomEffect::DEFAULT_DOWNSCALE,
            threshold: BloomEffect::DEFAULT_THRESHOLD,
            passthrough: BloomEffect::DEFAULT_PASSTHROUGH,
        }
    }
}
