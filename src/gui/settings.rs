use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Choices remembered between GUI sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuiSettings {
    pub format: String,
    pub override_quality: bool,
    pub quality: u8,
    pub resize_enabled: bool,
    pub resize_width: String,
    pub resize_height: String,
    pub last_input_dir: Option<PathBuf>,
    pub last_output_dir: Option<PathBuf>,
}

impl Default for GuiSettings {
    fn default() -> Self {
        Self {
            format: ".jpg".to_string(),
            override_quality: false,
            quality: 90,
            resize_enabled: false,
            resize_width: "1920".to_string(),
            resize_height: "1080".to_string(),
            last_input_dir: None,
            last_output_dir: None,
        }
    }
}

impl GuiSettings {
    /// `<config dir>/photo-converter/gui-settings.json`
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("photo-converter").join("gui-settings.json"))
    }

    /// Saved settings, or defaults when none exist or they can't be read
    pub fn load() -> Self {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("Ignoring GUI settings: {:#}", e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {:?}", path))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path().context("No configuration directory on this system")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write settings file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_survive_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("gui-settings.json");
        let settings = GuiSettings {
            format: ".webp".to_string(),
            override_quality: true,
            quality: 70,
            last_input_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        settings.save_to(&path).unwrap();
        assert_eq!(GuiSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gui-settings.json");
        fs::write(&path, r#"{ "format": ".png" }"#).unwrap();

        let settings = GuiSettings::load_from(&path).unwrap();
        assert_eq!(settings.format, ".png");
        assert_eq!(settings.quality, 90);
        assert!(!settings.resize_enabled);
    }
}
