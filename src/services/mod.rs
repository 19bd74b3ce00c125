//! Services module - the core engine behind the export workflow.
//!
//! The services are framework-agnostic: no UI code, only business logic
//! operating on the models, which keeps them testable in isolation.
//!
//! # Components
//!
//! - [`FileLibrary`]: owns the input file tree, builds it from the
//!   directory-layout document and repopulates it from disk on reload
//! - [`PresetResolver`]: generates and memoizes per-preset requirement
//!   trees over the input tree
//! - [`JobTracker`]: spawns one external copy process per preset leaf and
//!   tracks them through a caller-driven, non-blocking poll loop
//! - [`MeshScanner`]: background OBJ statistics scanner with a blocking
//!   await-completion hand-off
//!
//! A typical export drives them in that order: reload the library,
//! resolve the preset tree, export it through the tracker, poll until no
//! jobs remain, then read the succeeded/failed histories.

pub mod library;
pub mod mesh;
pub mod presets;
pub mod transfer;

pub use library::{FileLibrary, FileQuery};
pub use mesh::{MeshError, MeshScanner, MeshStats, render_report, scan_file};
pub use presets::{PresetError, PresetResolver};
pub use transfer::{
    ActiveJob, FinishedJob, JobState, JobTracker, Platform, TransferError, copy_invocation,
};
