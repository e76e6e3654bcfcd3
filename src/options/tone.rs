use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sepia parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Sepia", inline)]
#[serde(default)]
pub struct SepiaOptions {
    /// 0 leaves the source untouched, 1 is full sepia.
    #[schemars(title = "Intensity", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub intensity: f32,
}

impl Default for SepiaOptions {
    fn default() -> Self {
        Self { intensity: 1.0 }
    }
}

/// Greyscale parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Greyscale", inline)]
#[serde(default)]
pub struct GreyscaleOptions {
    /// 0 leaves the source untouched, 1 is fully desaturated.
    #[schemars(title = "Intensity", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub intensity: f32,
}

impl Default for GreyscaleOptions {
    fn default() -> Self {
        Self { intensity: 1.0 }
    }
}
