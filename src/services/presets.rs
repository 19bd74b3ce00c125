use crate::models::{FileCategory, FileEntity, PresetCollection, PresetsConfig};
use camino::Utf8Path;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while resolving preset trees.
#[derive(Error, Debug)]
pub enum PresetError {
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
}

/// Builds and caches per-preset requirement trees.
///
/// A preset tree mirrors the input tree structurally, replacing every
/// collection leaf with preset nodes that reference the original collection.
/// Trees are generated lazily per preset name and memoized; the cache must
/// be [`invalidate`](Self::invalidate)d after a disk reload so review data
/// cannot go stale.
pub struct PresetResolver {
    presets: PresetsConfig,
    cache: IndexMap<String, FileCategory>,
}

impl PresetResolver {
    pub fn new(presets: PresetsConfig) -> Self {
        Self {
            presets,
            cache: IndexMap::new(),
        }
    }

    /// The configured preset names, in document order.
    pub fn preset_names(&self) -> impl Iterator<Item = &str> {
        self.presets.names()
    }

    /// The cached tree for `preset`, generating it on first request.
    pub fn preset_tree(
        &mut self,
        preset: &str,
        input_tree: &FileCategory,
    ) -> Result<&FileCategory, PresetError> {
        if self.cache.contains_key(preset) {
            return Ok(&self.cache[preset]);
        }
        self.generate_preset_tree(preset, input_tree)
    }

    /// Forcibly rebuild and cache the tree for `preset`.
    ///
    /// Requirements (output path override, extension set, suffix list) are
    /// read once per top-level category of the input tree and threaded down
    /// every nesting level.
    pub fn generate_preset_tree(
        &mut self,
        preset: &str,
        input_tree: &FileCategory,
    ) -> Result<&FileCategory, PresetError> {
        let definition = self
            .presets
            .get(preset)
            .ok_or_else(|| PresetError::UnknownPreset(preset.to_string()))?;

        let mut tree = FileCategory::new(preset);
        for child in input_tree.children() {
            let category = child.name();
            let export_dir = definition.export_dir(&category);
            let required_exts = definition.required_exts(&category);
            let required_suffixes = definition.required_suffixes(&category);

            build_branch(
                &mut tree,
                child,
                &export_dir,
                required_exts.as_ref(),
                required_suffixes.as_deref(),
            );
        }

        tracing::debug!(preset, "generated preset tree");
        self.cache.insert(preset.to_string(), tree);
        Ok(&self.cache[preset])
    }

    /// Drop all cached preset trees. Call after reloading input files.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }
}

/// Mirror one input entity under `parent` with the preset requirements
/// applied.
///
/// A collection leaf becomes one preset node per required suffix (each
/// carrying the full suffix sequence plus its own designated suffix), or a
/// single un-suffixed node when the preset requires none.
fn build_branch(
    parent: &mut FileCategory,
    entity: &FileEntity,
    export_dir: &Utf8Path,
    required_exts: Option<&HashSet<String>>,
    required_suffixes: Option<&[String]>,
) {
    match entity {
        FileEntity::Collection(collection) => {
            let name = collection.read().unwrap().name.clone();
            match required_suffixes {
                None => parent.add(FileEntity::Preset(PresetCollection::new(
                    name,
                    Arc::clone(collection),
                    export_dir,
                    required_exts.cloned(),
                    None,
                    None,
                ))),
                Some(suffixes) => {
                    for suffix in suffixes {
                        parent.add(FileEntity::Preset(PresetCollection::new(
                            name.clone(),
                            Arc::clone(collection),
                            export_dir,
                            required_exts.cloned(),
                            Some(suffixes.to_vec()),
                            Some(suffix.clone()),
                        )));
                    }
                }
            }
        }
        FileEntity::Category(category) => {
            let mut mirrored = FileCategory::new(&category.name);
            for child in category.children() {
                build_branch(
                    &mut mirrored,
                    child,
                    export_dir,
                    required_exts,
                    required_suffixes,
                );
            }
            parent.add(FileEntity::Category(mirrored));
        }
        // Input trees never contain preset nodes.
        FileEntity::Preset(_) => {}
    }
}
