use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Viewer actions that can be bound to keys.
///
/// Serde serializes as `snake_case` strings so TOML presets stay readable:
/// ```toml
/// [keybindings.bindings]
/// next_effect = "Tab"
/// threshold_up = "ArrowUp"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    /// Show the bloom effect.
    SelectBloom,
    /// Show the sepia effect.
    SelectSepia,
    /// Show the greyscale effect.
    SelectGreyscale,
    /// Show LUT color correction.
    SelectColorCorrect,
    /// Cycle to the next effect.
    NextEffect,
    /// Toggle showing the scene without an effect.
    ToggleBypass,
    /// Raise the bloom threshold.
    ThresholdUp,
    /// Lower the bloom threshold.
    ThresholdDown,
    /// One more blur round.
    BlurMore,
    /// One fewer blur round.
    BlurLess,
    /// Larger downscale factor (smaller blur targets).
    DownscaleUp,
    /// Smaller downscale factor.
    DownscaleDown,
    /// Re-read the options file.
    ReloadOptions,
    /// Write the current options as a preset.
    SavePreset,
    /// Close the viewer.
    Quit,
}

/// Configurable keyboard bindings mapping actions to key codes.
///
/// Key strings use the `winit::keyboard::KeyCode` debug format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeybindingOptions {
    /// Maps action → key string (e.g. `NextEffect` → `"Tab"`).
    pub bindings: HashMap<KeyAction, String>,
    /// Reverse lookup cache (key string → action). Rebuilt on load.
    #[serde(skip)]
    key_to_action: HashMap<String, KeyAction>,
}

impl Default for KeybindingOptions {
    fn default() -> Self {
        let bindings = HashMap::from([
            (KeyAction::SelectBloom, "Digit1".into()),
            (KeyAction::SelectSepia, "Digit2".into()),
            (KeyAction::SelectGreyscale, "Digit3".into()),
            (KeyAction::SelectColorCorrect, "Digit4".into()),
            (KeyAction::NextEffect, "Tab".into()),
            (KeyAction::ToggleBypass, "Digit0".into()),
            (KeyAction::ThresholdUp, "ArrowUp".into()),
            (KeyAction::ThresholdDown, "ArrowDown".into()),
            (KeyAction::BlurMore, "ArrowRight".into()),
            (KeyAction::BlurLess, "ArrowLeft".into()),
            (KeyAction::DownscaleUp, "BracketRight".into()),
            (KeyAction::DownscaleDown, "BracketLeft".into()),
            (KeyAction::ReloadOptions, "KeyR".into()),
            (KeyAction::SavePreset, "KeyS".into()),
            (KeyAction::Quit, "Escape".into()),
        ]);

        let mut opts = Self {
            bindings,
            key_to_action: HashMap::new(),
        };
        opts.rebuild_reverse_map();
        opts
    }
}

impl KeybindingOptions {
    /// Rebuild the reverse lookup map (key string → action).
    pub fn rebuild_reverse_map(&mut self) {
        self.key_to_action.clear();
        for (action, key) in &self.bindings {
            let _ = self.key_to_action.insert(key.clone(), *action);
        }
    }

    /// Look up the action for a key string.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<KeyAction> {
        self.key_to_action.get(key).copied()
    }
}
