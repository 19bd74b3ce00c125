use crate::models::{DirEntry, DirLayout, PresetsConfig};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;

/// Configuration manager for loading and saving the JSON settings files.
///
/// Manages the two documents consumed at startup:
/// - Directory layout (`dirLayout.json`): category names to source
///   directories, plus the reserved `output` key naming the output root
/// - Presets (`presetSettings.json`): preset name to requirements and
///   per-category output paths
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    dir_layout_path: Utf8PathBuf,
    presets_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified settings directory.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            dir_layout_path: config_dir.join("dirLayout.json"),
            presets_path: config_dir.join("presetSettings.json"),
            config_dir,
        })
    }

    /// Load the directory-layout document.
    ///
    /// A missing or malformed document is an error: without it there is no
    /// input tree to build.
    pub fn load_dir_layout(&self) -> Result<DirLayout> {
        let file_contents = fs::read_to_string(&self.dir_layout_path)
            .with_context(|| format!("Failed to read dir layout: {}", self.dir_layout_path))?;

        let entries: IndexMap<String, DirEntry> = serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse dir layout: {}", self.dir_layout_path))?;

        let layout = DirLayout::from_document(entries);
        tracing::info!(
            "Loaded dir layout from {} ({} categories)",
            self.dir_layout_path,
            layout.categories.len()
        );
        Ok(layout)
    }

    /// Save the directory-layout document.
    pub fn save_dir_layout(&self, layout: &DirLayout) -> Result<()> {
        let json_string = serde_json::to_string_pretty(&layout.to_document())
            .context("Failed to serialize dir layout to JSON")?;

        fs::write(&self.dir_layout_path, json_string)
            .with_context(|| format!("Failed to write dir layout: {}", self.dir_layout_path))?;

        tracing::info!("Saved dir layout to {}", self.dir_layout_path);
        Ok(())
    }

    /// Load the presets document.
    pub fn load_presets(&self) -> Result<PresetsConfig> {
        let file_contents = fs::read_to_string(&self.presets_path)
            .with_context(|| format!("Failed to read presets: {}", self.presets_path))?;

        let config: PresetsConfig = serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse presets: {}", self.presets_path))?;

        tracing::info!(
            "Loaded presets from {} ({} presets)",
            self.presets_path,
            config.presets.len()
        );
        Ok(config)
    }

    /// Save the presets document.
    pub fn save_presets(&self, config: &PresetsConfig) -> Result<()> {
        let json_string = serde_json::to_string_pretty(config)
            .context("Failed to serialize presets to JSON")?;

        fs::write(&self.presets_path, json_string)
            .with_context(|| format!("Failed to write presets: {}", self.presets_path))?;

        tracing::info!("Saved presets to {}", self.presets_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
