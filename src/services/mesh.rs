use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{BufRead, BufReader};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

const OBJECT_MARKER: &str = "o ";
const VERTEX_MARKER: &str = "v ";
const FACE_MARKER: &str = "f ";

/// Errors raised by the mesh scanner.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("a scan task is already in flight")]
    TaskInFlight,

    #[error("no scan task in flight")]
    NoTaskInFlight,

    #[error("no input path available")]
    MissingInputPath,

    #[error("no output path available")]
    MissingOutputPath,

    #[error("scan task was cancelled or panicked: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Accumulated counts from one pass over an OBJ file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub vert_count: usize,
    pub face_count: usize,
    pub tri_count: usize,
    pub quad_count: usize,
    pub ngon_count: usize,
    pub object_names: Vec<String>,
}

/// Single-pass streaming scan of an OBJ file.
///
/// Face lines are classified by their raw space count, not by parsing the
/// vertex indices: 3 spaces is a tri, 4 a quad, anything else an n-gon.
pub fn scan_file(path: &Utf8Path) -> Result<MeshStats, MeshError> {
    let reader = BufReader::new(File::open(path)?);
    let mut stats = MeshStats::default();

    for line in reader.lines() {
        let line = line?;
        if line.starts_with(VERTEX_MARKER) {
            stats.vert_count += 1;
        } else if line.starts_with(FACE_MARKER) {
            stats.face_count += 1;
            match line.bytes().filter(|b| *b == b' ').count() {
                3 => stats.tri_count += 1,
                4 => stats.quad_count += 1,
                _ => stats.ngon_count += 1,
            }
        } else if line.starts_with(OBJECT_MARKER) {
            stats
                .object_names
                .push(line[OBJECT_MARKER.len()..].trim_end_matches('\r').to_string());
        }
    }

    Ok(stats)
}

/// Render the human-readable report for a finished scan.
pub fn render_report(stats: &MeshStats) -> String {
    let mut report = String::new();

    if stats.object_names.is_empty() {
        report.push_str("No objects found\n\n");
    } else {
        report.push_str("Objects:\n  ");
        report.push_str(&stats.object_names.join("\n  "));
        report.push_str("\n\n");
    }

    report.push_str(&format!("Vertex count: {}\n", stats.vert_count));
    report.push_str(&format!("Face count: {}\n", stats.face_count));
    report.push('\n');
    report.push_str(&format!("Tri count: {}\n", stats.tri_count));
    report.push_str(&format!("Quad count: {}\n", stats.quad_count));
    report.push_str(&format!("Ngon count: {}\n", stats.ngon_count));
    report.push('\n');

    report
}

/// Background OBJ statistics scanner.
///
/// Each of [`scan`](Self::scan), [`write_report`](Self::write_report) and
/// [`run`](Self::run) executes on one background task; only one may be in
/// flight at a time, and the counters must not be read until
/// [`await_completion`](Self::await_completion) has returned them. Default
/// input/output paths can be overridden per call.
pub struct MeshScanner {
    input_path: Option<Utf8PathBuf>,
    output_path: Option<Utf8PathBuf>,
    stats: MeshStats,
    runtime: Handle,
    task: Option<JoinHandle<Result<MeshStats, MeshError>>>,
}

impl MeshScanner {
    pub fn new(
        runtime: Handle,
        input_path: Option<Utf8PathBuf>,
        output_path: Option<Utf8PathBuf>,
    ) -> Self {
        Self {
            input_path,
            output_path,
            stats: MeshStats::default(),
            runtime,
            task: None,
        }
    }

    /// Set the default paths. `None` means no change.
    pub fn set_paths(
        &mut self,
        input_path: Option<Utf8PathBuf>,
        output_path: Option<Utf8PathBuf>,
    ) {
        if let Some(input_path) = input_path {
            self.input_path = Some(input_path);
        }
        if let Some(output_path) = output_path {
            self.output_path = Some(output_path);
        }
    }

    fn ensure_idle(&self) -> Result<(), MeshError> {
        if self.task.is_some() {
            return Err(MeshError::TaskInFlight);
        }
        Ok(())
    }

    fn resolve_input(&self, overridden: Option<Utf8PathBuf>) -> Result<Utf8PathBuf, MeshError> {
        overridden
            .or_else(|| self.input_path.clone())
            .ok_or(MeshError::MissingInputPath)
    }

    fn resolve_output(&self, overridden: Option<Utf8PathBuf>) -> Result<Utf8PathBuf, MeshError> {
        overridden
            .or_else(|| self.output_path.clone())
            .ok_or(MeshError::MissingOutputPath)
    }

    /// Scan the input and write the report, back to back, on a background
    /// task.
    pub fn run(
        &mut self,
        input_override: Option<Utf8PathBuf>,
        output_override: Option<Utf8PathBuf>,
    ) -> Result<(), MeshError> {
        let input = self.resolve_input(input_override)?;
        let output = self.resolve_output(output_override)?;
        self.ensure_idle()?;

        self.stats = MeshStats::default();
        self.task = Some(self.runtime.spawn_blocking(move || {
            let stats = scan_file(&input)?;
            std::fs::write(&output, render_report(&stats))?;
            tracing::debug!(%input, %output, "mesh report written");
            Ok(stats)
        }));
        Ok(())
    }

    /// Scan only, populating the counters without writing a report.
    pub fn scan(&mut self, input_override: Option<Utf8PathBuf>) -> Result<(), MeshError> {
        let input = self.resolve_input(input_override)?;
        self.ensure_idle()?;

        self.stats = MeshStats::default();
        self.task = Some(
            self.runtime
                .spawn_blocking(move || scan_file(&input)),
        );
        Ok(())
    }

    /// Write a report from the current counters, without rescanning.
    pub fn write_report(&mut self, output_override: Option<Utf8PathBuf>) -> Result<(), MeshError> {
        let output = self.resolve_output(output_override)?;
        self.ensure_idle()?;

        let stats = self.stats.clone();
        self.task = Some(self.runtime.spawn_blocking(move || {
            std::fs::write(&output, render_report(&stats))?;
            Ok(stats)
        }));
        Ok(())
    }

    /// Block until the in-flight task finishes, store its counters, and
    /// clear the task slot so a new run can start.
    ///
    /// Must be called from outside the runtime's worker threads (the owner's
    /// thread), since it performs a blocking join.
    pub fn await_completion(&mut self) -> Result<&MeshStats, MeshError> {
        let task = self.task.take().ok_or(MeshError::NoTaskInFlight)?;
        self.stats = self.runtime.block_on(task)??;
        Ok(&self.stats)
    }

    /// Counters from the last completed task.
    pub fn stats(&self) -> &MeshStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}
