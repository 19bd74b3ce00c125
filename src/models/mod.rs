//! Data models for the asset exporter.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`FileEntity`] / [`FileCategory`] / [`FileCollection`] / [`PresetCollection`]:
//!   the recursive file entity model and its per-preset annotation nodes
//! - [`DirLayout`]: the directory-layout document (`dirLayout.json`)
//! - [`PresetsConfig`]: the presets document (`presetSettings.json`)
//!
//! Collections are shared between the input tree and any generated preset
//! trees through `Arc<RwLock<_>>` handles ([`SharedCollection`]); the input
//! tree is the only writer.

pub mod config;
pub mod entity;

pub use config::{
    DEFAULT_EXPORT_DIR, DEFAULT_OUTPUT_DIR, DirEntry, DirLayout, PresetDefinition, PresetsConfig,
};
pub use entity::{
    EntityError, FileCategory, FileCollection, FileEntity, PresetCollection, SharedCollection,
    split_extension,
};
