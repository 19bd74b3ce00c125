//! asset-exporter - preset-driven asset export with external copy backends
//!
//! Headless entry point. It loads the two JSON settings documents, builds
//! the input file tree, exports the requested presets through the external
//! copy backend (robocopy on Windows, cp elsewhere), drives the job poll
//! loop to completion, and finally writes an OBJ statistics report when an
//! OBJ file is present among the inputs.
//!
//! # Execution Flow
//!
//! 1. Initialize logging → logs/asset-exporter.<date>
//! 2. Create the tokio runtime (background scan tasks, poll-loop timing)
//! 3. Load dirLayout.json and presetSettings.json from the settings dir
//! 4. Build the input tree and populate it from disk
//! 5. Resolve and export each selected preset (one copy job per leaf)
//! 6. Poll every 500 ms until no jobs remain, then log the outcome
//! 7. Scan the first `.obj` input into `<output>/obj_stats.txt`
//!
//! Individual copy jobs that fail are reported, not fatal: the run exits
//! successfully as long as orchestration itself worked.

use anyhow::{Context, Result};
use asset_exporter::services::{FileLibrary, FileQuery, JobTracker, MeshScanner, PresetResolver};
use asset_exporter::{APP_NAME, ConfigManager, VERSION};
use camino::Utf8PathBuf;
use clap::Parser;
use std::time::Duration;

/// Copy preset-matching input files into per-preset output directories.
#[derive(Parser, Debug)]
#[command(name = "asset-exporter", version, about)]
struct Args {
    /// Base directory the configured input directories are resolved against
    #[arg(long, value_name = "PATH", default_value = ".")]
    base_path: Utf8PathBuf,

    /// Directory containing dirLayout.json and presetSettings.json
    #[arg(long, value_name = "PATH", default_value = "settings")]
    config_dir: Utf8PathBuf,

    /// Override the output root from the layout document
    #[arg(long, value_name = "PATH")]
    output_dir: Option<Utf8PathBuf>,

    /// Print the resolved base and output paths, then exit
    #[arg(long)]
    print_paths: bool,

    /// Skip the OBJ statistics report
    #[arg(long)]
    no_mesh_report: bool,

    /// Log at debug level instead of info
    #[arg(long)]
    debug: bool,

    /// Presets to export; all configured presets when omitted
    presets: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _guard = asset_exporter::logging::setup_logging("logs", APP_NAME, args.debug, true)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("export-worker")
        .build()?;

    let config_manager = ConfigManager::new(&args.config_dir)?;
    let layout = config_manager.load_dir_layout()?;
    let presets_config = config_manager.load_presets()?;
    let output_root = match &args.output_dir {
        Some(dir) => args.base_path.join(dir),
        None => args.base_path.join(&layout.output_dir),
    };

    if args.print_paths {
        println!("base path: {}", args.base_path);
        println!("output path: {}", output_root);
        return Ok(());
    }

    let library = FileLibrary::from_layout(&layout, &args.base_path)
        .context("failed to build the input file tree")?;

    let mut resolver = PresetResolver::new(presets_config);
    let selected: Vec<String> = if args.presets.is_empty() {
        resolver.preset_names().map(str::to_string).collect()
    } else {
        args.presets.clone()
    };

    let mut tracker = JobTracker::new(&output_root)?;
    for preset in &selected {
        let tree = resolver
            .preset_tree(preset, library.input_tree())
            .with_context(|| format!("failed to resolve preset '{preset}'"))?;
        tracker.export_preset(preset, tree)?;
    }

    // Caller-driven poll loop: the tracker never blocks or schedules
    // itself.
    runtime.block_on(async {
        loop {
            let active = tracker.poll_finished_jobs();
            if active == 0 {
                break;
            }
            tracing::debug!(active, "copy jobs still running");
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    });

    tracing::info!(
        succeeded = tracker.succeeded().len(),
        failed = tracker.failed().len(),
        "export finished"
    );
    for job in tracker.failed() {
        tracing::warn!(command = %job.command, exit_code = job.exit_code, "copy job failed");
    }

    if !args.no_mesh_report {
        let query = FileQuery {
            ends_with: Some(".obj".to_string()),
            ..Default::default()
        };
        match library.find_file(&query)? {
            Some(obj_path) => {
                let report_path = output_root.join("obj_stats.txt");
                let mut scanner = MeshScanner::new(
                    runtime.handle().clone(),
                    Some(obj_path),
                    Some(report_path.clone()),
                );
                scanner.run(None, None)?;
                let stats = scanner.await_completion()?;
                tracing::info!(
                    vertices = stats.vert_count,
                    faces = stats.face_count,
                    report = %report_path,
                    "mesh report written"
                );
            }
            None => tracing::info!("no .obj file among the inputs, skipping mesh report"),
        }
    }

    runtime.shutdown_timeout(Duration::from_secs(5));
    Ok(())
}
