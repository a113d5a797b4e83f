use crate::cli::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Defaults file passed with `--config`
///
/// ```json
/// { "output": "converted", "format": "webp", "quality": 85, "resize": "1920x1080" }
/// ```
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub quality: Option<u32>,
    pub resize: Option<String>,
    pub verbose: Option<bool>,
    pub batch: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

impl Args {
    /// Load the `--config` file, if any, and merge it in.
    /// Command-line arguments take precedence over config file values.
    pub fn load_and_merge_config(&mut self) -> Result<()> {
        if let Some(config_path) = self.config_file.clone() {
            let config = ConfigFile::load(&config_path)?;
            self.merge_from_config(config);
            tracing::debug!("Loaded configuration from: {:?}", config_path);
        }
        Ok(())
    }

    fn merge_from_config(&mut self, config: ConfigFile) {
        if self.output_dir.is_none() {
            self.output_dir = config.output;
        }
        if self.format.is_none() {
            self.format = config.format;
        }
        if self.quality.is_none() {
            self.quality = config.quality;
        }
        if self.resize.is_none() {
            self.resize = config.resize;
        }

        // Flags - only apply if currently false (default)
        if !self.verbose {
            self.verbose = config.verbose.unwrap_or(false);
        }
        if !self.batch {
            self.batch = config.batch.unwrap_or(false);
        }
    }
}
