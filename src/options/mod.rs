//! Runtime options with TOML preset support.
//!
//! Effect parameters, shader location, viewer state and keybindings are
//! consolidated here. Options serialize to/from TOML for presets stored in
//! `assets/presets/`.

mod bloom;
mod color_correct;
mod keybindings;
mod tone;
mod viewer;

use std::path::Path;

pub use bloom::BloomOptions;
pub use color_correct::ColorCorrectOptions;
pub use keybindings::{KeyAction, KeybindingOptions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use tone::{GreyscaleOptions, SepiaOptions};
pub use viewer::{ShaderOptions, ViewerOptions};

use crate::error::PostFxError;

/// Default directory shader file names are resolved against.
pub const DEFAULT_SHADER_ROOT: &str = "assets/shaders";

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[bloom]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Bloom parameters.
    pub bloom: BloomOptions,
    /// Sepia parameters.
    pub sepia: SepiaOptions,
    /// Greyscale parameters.
    pub greyscale: GreyscaleOptions,
    /// LUT color-grading parameters.
    #[schemars(skip)]
    pub color_correct: ColorCorrectOptions,
    /// Shader source location.
    #[schemars(skip)]
    pub shaders: ShaderOptions,
    /// Viewer state.
    pub viewer: ViewerOptions,
    /// Keyboard binding options.
    #[schemars(skip)]
    pub keybindings: KeybindingOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Parse options from TOML text. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`PostFxError::OptionsParse`] on malformed TOML.
    pub fn from_toml(content: &str) -> Result<Self, PostFxError> {
        let mut options: Self = toml::from_str(content)
            .map_err(|e| PostFxError::OptionsParse(e.to_string()))?;
        options.keybindings.rebuild_reverse_map();
        Ok(options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`PostFxError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml`](Self::from_toml).
    pub fn load(path: &Path) -> Result<Self, PostFxError> {
        let content = std::fs::read_to_string(path).map_err(PostFxError::Io)?;
        Self::from_toml(&content)
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// [`PostFxError::OptionsParse`] if serialization fails, or
    /// [`PostFxError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), PostFxError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PostFxError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(PostFxError::Io)?;
        }
        std::fs::write(path, content).map_err(PostFxError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectKind;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed = Options::from_toml(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[bloom]
threshold = 0.3

[viewer]
effect = "greyscale"
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.bloom.threshold, 0.3);
        // Everything else should be default
        assert_eq!(opts.bloom.downscale, 5.0);
        assert_eq!(opts.bloom.passthrough, 10);
        assert_eq!(opts.viewer.effect, EffectKind::Greyscale);
        assert_eq!(opts.shaders.root, Path::new("assets/shaders"));
        assert_eq!(opts.color_correct.lut_path, None);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Options::from_toml("[bloom\nthreshold = ").unwrap_err();
        assert!(matches!(err, PostFxError::OptionsParse(_)));
    }

    #[test]
    fn keybinding_lookup() {
        let opts = Options::default();
        assert_eq!(opts.keybindings.lookup("Digit1"), Some(KeyAction::SelectBloom));
        assert_eq!(opts.keybindings.lookup("ArrowUp"), Some(KeyAction::ThresholdUp));
        assert_eq!(opts.keybindings.lookup("KeyZ"), None);
    }

    #[test]
    fn custom_keybinding_survives_load() {
        let toml_str = r#"
[keybindings.bindings]
quit = "KeyQ"
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.keybindings.lookup("KeyQ"), Some(KeyAction::Quit));
        assert_eq!(opts.keybindings.lookup("Escape"), None);
    }

    #[test]
    fn save_load_and_list_presets() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = Options::default();
        opts.bloom.passthrough = 4;
        opts.viewer.effect = EffectKind::Sepia;

        opts.save(&dir.path().join("soft.toml")).unwrap();
        Options::default()
            .save(&dir.path().join("nested/plain.toml"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loaded = Options::load(&dir.path().join("soft.toml")).unwrap();
        assert_eq!(loaded, opts);
        assert_eq!(Options::list_presets(dir.path()), vec!["soft".to_owned()]);
        assert!(matches!(
            Options::load(&dir.path().join("missing.toml")),
            Err(PostFxError::Io(_))
        ));
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();

        // UI-exposed sections should be present
        assert!(props.contains_key("bloom"));
        assert!(props.contains_key("sepia"));
        assert!(props.contains_key("greyscale"));
        assert!(props.contains_key("viewer"));

        // Skipped sections should be absent
        assert!(!props.contains_key("color_correct"));
        assert!(!props.contains_key("shaders"));
        assert!(!props.contains_key("keybindings"));

        let bloom = &props["bloom"]["properties"];
        assert!(bloom.get("threshold").is_some());
        assert!(bloom.get("passthrough").is_some());
        assert_eq!(bloom["threshold"]["maximum"], 1.0);

        let viewer = &props["viewer"]["properties"];
        assert!(viewer.get("effect").is_some());
        assert!(viewer.get("threshold_step").is_none());
    }
}
