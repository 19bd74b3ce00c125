// asset-exporter - preset-driven asset export with external copy backends
//
// This is the library crate containing the core engine: the recursive file
// entity model, preset resolution, copy job tracking, and the OBJ statistics
// scanner. The binary crate (main.rs) provides a headless entry point.

pub mod config;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{DirLayout, FileCategory, FileCollection, FileEntity, PresetCollection, PresetsConfig};
pub use services::{FileLibrary, FileQuery, JobTracker, MeshScanner, PresetResolver};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
