use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::effects::DEFAULT_LUT_SIZE;

/// LUT color-grading parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Color Correction", inline)]
#[serde(default)]
pub struct ColorCorrectOptions {
    /// `.cube` file to grade with. `None` uses an identity table.
    #[schemars(skip)]
    pub lut_path: Option<PathBuf>,
    /// Edge length of the identity table.
    #[schemars(skip)]
    pub identity_size: u32,
}

impl Default for ColorCorrectOptions {
    fn default() -> Self {
        Self {
            lut_path: None,
            identity_size: DEFAULT_LUT_SIZE,
        }
    }
}
