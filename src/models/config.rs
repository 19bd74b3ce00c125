use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default output root when the layout document has no `output` key.
pub const DEFAULT_OUTPUT_DIR: &str = "./tmp/";

/// Default per-category export path when a preset has no override.
pub const DEFAULT_EXPORT_DIR: &str = "./default/";

/// One entry of the directory-layout document: either a plain source path or
/// one level of named subdirectories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirEntry {
    Path(String),
    Subdirs(IndexMap<String, String>),
}

/// Parsed directory-layout document (`dirLayout.json`).
///
/// Maps category names to source directory paths, with one reserved `output`
/// key naming the output root. Category order follows the document.
#[derive(Debug, Clone)]
pub struct DirLayout {
    pub output_dir: Utf8PathBuf,
    pub categories: IndexMap<String, DirEntry>,
}

impl DirLayout {
    /// Build a layout from the raw document map, extracting the reserved
    /// `output` key (defaulting to [`DEFAULT_OUTPUT_DIR`]).
    pub fn from_document(mut entries: IndexMap<String, DirEntry>) -> Self {
        let output_dir = match entries.shift_remove("output") {
            Some(DirEntry::Path(path)) => Utf8PathBuf::from(path),
            _ => Utf8PathBuf::from(DEFAULT_OUTPUT_DIR),
        };
        Self {
            output_dir,
            categories: entries,
        }
    }

    /// Re-assemble the raw document map, output key first.
    pub fn to_document(&self) -> IndexMap<String, DirEntry> {
        let mut entries = IndexMap::with_capacity(self.categories.len() + 1);
        entries.insert(
            "output".to_string(),
            DirEntry::Path(self.output_dir.to_string()),
        );
        entries.extend(self.categories.clone());
        entries
    }
}

/// One named preset from the presets document.
///
/// `requirements` maps `<category>_format` to an extension list and
/// `<category>_suffix` to a suffix list; `outputs` maps category names to
/// relative export paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetDefinition {
    #[serde(rename = "req", default)]
    pub requirements: IndexMap<String, Vec<String>>,

    #[serde(rename = "output", default)]
    pub outputs: IndexMap<String, String>,
}

impl PresetDefinition {
    /// Required extension set for a top-level category, if configured.
    pub fn required_exts(&self, category: &str) -> Option<HashSet<String>> {
        self.requirements
            .get(&format!("{category}_format"))
            .map(|exts| exts.iter().cloned().collect())
    }

    /// Required suffix list for a top-level category, if configured.
    pub fn required_suffixes(&self, category: &str) -> Option<Vec<String>> {
        self.requirements
            .get(&format!("{category}_suffix"))
            .cloned()
    }

    /// Relative export path for a top-level category.
    pub fn export_dir(&self, category: &str) -> Utf8PathBuf {
        self.outputs
            .get(category)
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_EXPORT_DIR))
    }
}

/// Parsed presets document (`presetSettings.json`): preset name to
/// definition, in document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetsConfig {
    #[serde(flatten)]
    pub presets: IndexMap<String, PresetDefinition>,
}

impl PresetsConfig {
    pub fn get(&self, preset: &str) -> Option<&PresetDefinition> {
        self.presets.get(preset)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_layout_extracts_output_key() {
        let doc: IndexMap<String, DirEntry> = serde_json::from_str(
            r#"{
                "output": "./exports/",
                "textures": "./input/textures/",
                "models": { "high": "./input/models/high/", "low": "./input/models/low/" }
            }"#,
        )
        .unwrap();

        let layout = DirLayout::from_document(doc);
        assert_eq!(layout.output_dir, Utf8PathBuf::from("./exports/"));
        assert_eq!(
            layout.categories.keys().collect::<Vec<_>>(),
            ["textures", "models"]
        );
        assert!(matches!(
            layout.categories.get("models"),
            Some(DirEntry::Subdirs(subs)) if subs.len() == 2
        ));
    }

    #[test]
    fn test_dir_layout_default_output() {
        let layout = DirLayout::from_document(IndexMap::new());
        assert_eq!(layout.output_dir, Utf8PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn test_preset_definition_lookups() {
        let config: PresetsConfig = serde_json::from_str(
            r#"{
                "game": {
                    "req": {
                        "textures_format": [".png"],
                        "textures_suffix": ["_Color", "_Normal"]
                    },
                    "output": { "textures": "./tex/" }
                }
            }"#,
        )
        .unwrap();

        let preset = config.get("game").unwrap();
        assert_eq!(
            preset.required_exts("textures"),
            Some([".png".to_string()].into_iter().collect())
        );
        assert_eq!(
            preset.required_suffixes("textures"),
            Some(vec!["_Color".to_string(), "_Normal".to_string()])
        );
        assert!(preset.required_exts("models").is_none());
        assert_eq!(preset.export_dir("textures"), Utf8PathBuf::from("./tex/"));
        assert_eq!(
            preset.export_dir("models"),
            Utf8PathBuf::from(DEFAULT_EXPORT_DIR)
        );
    }

    #[test]
    fn test_presets_config_preserves_order() {
        let config: PresetsConfig =
            serde_json::from_str(r#"{ "b": {}, "a": {}, "c": {} }"#).unwrap();
        assert_eq!(config.names().collect::<Vec<_>>(), ["b", "a", "c"]);
    }
}
