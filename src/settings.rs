//! Application settings storage
//!
//! Stores the API key and pipeline defaults in a JSON file in the platform
//! config directory. Instance-based: callers load a `Settings`, pass it
//! where needed, and save it back; the pipeline holds no global state.
//! The environment variable always wins over the stored key.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::provider::DEFAULT_MODEL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// External renderer binary invoked by the render gateway
    #[serde(default = "default_renderer")]
    pub renderer_command: String,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_renderer() -> String {
    "rendercv".to_string()
}

fn default_theme() -> String {
    "classic".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            model: default_model(),
            renderer_command: default_renderer(),
            theme: default_theme(),
        }
    }
}

/// Default settings file location under the platform config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tailorcv").join("settings.json"))
}

impl Settings {
    /// Load settings from disk or create default
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
                Err(_) => Settings::default(),
            }
        } else {
            Settings::default()
        }
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))?;
        Ok(())
    }

    /// Get the API key (env var takes precedence over the stored setting)
    pub fn api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if !key.is_empty() {
                return Some(key);
            }
        }
        self.anthropic_api_key.clone()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().map(|k| !k.is_empty()).unwrap_or(false)
    }

    /// Store (or clear, with an empty string) the API key
    pub fn set_api_key(&mut self, key: String) {
        self.anthropic_api_key = if key.is_empty() { None } else { Some(key) };
    }

    /// Masked API key for display (shows first/last 4 chars)
    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key().map(|key| mask_key(&key))
    }
}

fn mask_key(key: &str) -> String {
    // Counted in chars so a multibyte key never splits mid-character
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "*".repeat(chars.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");

        let mut settings = Settings::default();
        settings.set_api_key("sk-ant-test-key-123456".to_string());
        settings.theme = "modern".to_string();
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path);
        assert_eq!(
            loaded.anthropic_api_key.as_deref(),
            Some("sk-ant-test-key-123456")
        );
        assert_eq!(loaded.theme, "modern");
        assert_eq!(loaded.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings::load(&tmp.path().join("nope.json"));
        assert!(settings.anthropic_api_key.is_none());
        assert_eq!(settings.renderer_command, "rendercv");
    }

    #[test]
    fn test_corrupt_file_loads_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let settings = Settings::load(&path);
        assert_eq!(settings.theme, "classic");
    }

    #[test]
    fn test_empty_key_clears_setting() {
        let mut settings = Settings::default();
        settings.set_api_key("abc".to_string());
        settings.set_api_key(String::new());
        assert!(settings.anthropic_api_key.is_none());
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-ant-api-key-9999"), "sk-ant-a...9999");
        assert_eq!(mask_key("short"), "*****");
    }

    #[test]
    fn test_mask_key_multibyte() {
        // byte 8 of this key falls inside a 2-byte character
        assert_eq!(mask_key("aééééééééééééé"), "aééééééé...éééé");
        assert_eq!(mask_key("clé"), "***");
    }
}
