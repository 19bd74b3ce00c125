use crate::models::{FileCategory, FileEntity};
use camino::{Utf8Path, Utf8PathBuf};
use std::process::{Child, Command, Stdio};
use thiserror::Error;

/// Errors raised while launching copy jobs.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(&'static str),

    #[error("failed to create destination directory {path}: {source}")]
    CreateDestination {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("failed to spawn copy process: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Copy backend family, selected once from the compile target.
///
/// Windows uses robocopy, whose exit codes below 8 are informational
/// partial-success codes; everything Unix-like uses plain `cp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// Detect the backend for the running host.
    ///
    /// # Errors
    /// [`TransferError::UnsupportedPlatform`] when the host is neither
    /// family.
    pub fn detect() -> Result<Self, TransferError> {
        if cfg!(target_os = "windows") {
            Ok(Platform::Windows)
        } else if cfg!(any(target_os = "linux", target_os = "macos")) {
            Ok(Platform::Unix)
        } else {
            Err(TransferError::UnsupportedPlatform(std::env::consts::OS))
        }
    }

    /// Whether an exit code counts as success for this backend.
    pub fn is_success(&self, exit_code: i32) -> bool {
        match self {
            Platform::Windows => exit_code <= 7,
            Platform::Unix => exit_code == 0,
        }
    }
}

/// Build the copy command line for one job.
///
/// Returns the argv and the working directory to spawn it in. robocopy takes
/// explicit directory arguments plus a retry wait; `cp` takes the file list
/// and destination, run from the source directory.
pub fn copy_invocation(
    platform: Platform,
    source_dir: &Utf8Path,
    dest_dir: &Utf8Path,
    files: &[String],
) -> (Vec<String>, Utf8PathBuf) {
    match platform {
        Platform::Windows => {
            let mut argv = vec![
                "robocopy".to_string(),
                source_dir.to_string(),
                dest_dir.to_string(),
            ];
            argv.extend(files.iter().cloned());
            argv.push("/copy:DA".to_string());
            argv.push("/w:5".to_string());
            (argv, source_dir.to_path_buf())
        }
        Platform::Unix => {
            let mut argv = vec!["cp".to_string()];
            argv.extend(files.iter().cloned());
            argv.push(dest_dir.to_string());
            (argv, source_dir.to_path_buf())
        }
    }
}

/// Terminal classification of a copy job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Succeeded,
    Failed,
}

/// One spawned copy process that has not terminated yet.
#[derive(Debug)]
pub struct ActiveJob {
    command: String,
    working_dir: Utf8PathBuf,
    child: Child,
}

impl ActiveJob {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn state(&self) -> JobState {
        JobState::Running
    }
}

/// A classified copy job, retained in the tracker history.
#[derive(Debug, Clone)]
pub struct FinishedJob {
    pub command: String,
    pub working_dir: Utf8PathBuf,
    pub state: JobState,
    pub exit_code: i32,
    pub output: String,
}

/// Launches external copy processes and tracks them to completion.
///
/// The tracker never blocks and never schedules itself: the owner calls
/// [`poll_finished_jobs`](Self::poll_finished_jobs) repeatedly (e.g. on a
/// 500 ms timer) until it returns zero. A job that exits with a failure code
/// is recorded in the failed history with its captured output; it is data,
/// not an error, and the export as a whole still succeeds.
pub struct JobTracker {
    platform: Platform,
    output_root: Utf8PathBuf,
    active: Vec<ActiveJob>,
    succeeded: Vec<FinishedJob>,
    failed: Vec<FinishedJob>,
}

impl JobTracker {
    pub fn new(output_root: impl Into<Utf8PathBuf>) -> Result<Self, TransferError> {
        Ok(Self {
            platform: Platform::detect()?,
            output_root: output_root.into(),
            active: Vec::new(),
            succeeded: Vec::new(),
            failed: Vec::new(),
        })
    }

    /// Spawn one copy job per preset leaf with a non-empty filtered file
    /// list, copying into `output_root/<preset_name>/<export_dir>`.
    ///
    /// Leaves with no matching files spawn nothing. Returns the number of
    /// jobs spawned.
    pub fn export_preset(
        &mut self,
        preset_name: &str,
        preset_tree: &FileCategory,
    ) -> Result<usize, TransferError> {
        let mut requests: Vec<(Utf8PathBuf, Utf8PathBuf, Vec<String>)> = Vec::new();
        preset_tree.for_each_recursive(
            |entity| -> Option<()> {
                if let FileEntity::Preset(preset) = entity {
                    let files = preset.filtered_files(None);
                    if files.is_empty() {
                        tracing::debug!(
                            preset = preset_name,
                            collection = %preset.name,
                            "no matching files, skipping leaf"
                        );
                        return None;
                    }
                    let source_dir = preset.source().read().unwrap().dir_path().to_path_buf();
                    let dest_dir = self
                        .output_root
                        .join(preset_name)
                        .join(preset.export_dir());
                    requests.push((source_dir, dest_dir, files));
                }
                None
            },
            false,
        );

        let spawned = requests.len();
        for (source_dir, dest_dir, files) in requests {
            self.spawn_copy(&source_dir, &dest_dir, files)?;
        }

        tracing::info!(preset = preset_name, jobs = spawned, "export started");
        Ok(spawned)
    }

    fn spawn_copy(
        &mut self,
        source_dir: &Utf8Path,
        dest_dir: &Utf8Path,
        files: Vec<String>,
    ) -> Result<(), TransferError> {
        // cp does not create missing destination directories; robocopy
        // would, but creating them here keeps both backends uniform.
        std::fs::create_dir_all(dest_dir).map_err(|source| TransferError::CreateDestination {
            path: dest_dir.to_path_buf(),
            source,
        })?;

        let (argv, working_dir) = copy_invocation(self.platform, source_dir, dest_dir, &files);
        let command = argv.join(" ");

        // Output is only drained after try_wait reports termination, so
        // the job must keep its combined output under the OS pipe buffer
        // or it will never finish. Copy-tool output is a short file list.
        let child = Command::new(&argv[0])
            .args(&argv[1..])
            .current_dir(&working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        tracing::info!(%command, files = files.len(), "spawned copy job");
        self.active.push(ActiveJob {
            command,
            working_dir,
            child,
        });
        Ok(())
    }

    /// Sweep the active jobs once, without blocking.
    ///
    /// Terminated jobs are classified through the platform's success
    /// predicate, moved into the succeeded/failed history exactly once, and
    /// their captured output is logged. Returns the number of jobs still
    /// active after the sweep.
    pub fn poll_finished_jobs(&mut self) -> usize {
        let mut still_active = Vec::with_capacity(self.active.len());

        for mut job in self.active.drain(..) {
            match job.child.try_wait() {
                Ok(None) => still_active.push(job),
                Ok(Some(status)) => {
                    let exit_code = status.code().unwrap_or(-1);
                    let output = match job.child.wait_with_output() {
                        Ok(output) => {
                            let mut text =
                                String::from_utf8_lossy(&output.stdout).into_owned();
                            text.push_str(&String::from_utf8_lossy(&output.stderr));
                            text
                        }
                        Err(error) => format!("failed to capture output: {error}"),
                    };

                    let state = if self.platform.is_success(exit_code) {
                        JobState::Succeeded
                    } else {
                        JobState::Failed
                    };
                    let finished = FinishedJob {
                        command: job.command,
                        working_dir: job.working_dir,
                        state,
                        exit_code,
                        output,
                    };

                    match state {
                        JobState::Succeeded => {
                            tracing::info!(
                                command = %finished.command,
                                exit_code,
                                "copy job succeeded: {}",
                                finished.output.trim_end()
                            );
                            self.succeeded.push(finished);
                        }
                        _ => {
                            tracing::warn!(
                                command = %finished.command,
                                exit_code,
                                "copy job failed: {}",
                                finished.output.trim_end()
                            );
                            self.failed.push(finished);
                        }
                    }
                }
                Err(error) => {
                    tracing::error!(command = %job.command, "poll failed: {error}");
                    self.failed.push(FinishedJob {
                        command: job.command,
                        working_dir: job.working_dir,
                        state: JobState::Failed,
                        exit_code: -1,
                        output: format!("poll failed: {error}"),
                    });
                }
            }
        }

        self.active = still_active;
        self.active.len()
    }

    pub fn active_job_count(&self) -> usize {
        self.active.len()
    }

    pub fn succeeded(&self) -> &[FinishedJob] {
        &self.succeeded
    }

    pub fn failed(&self) -> &[FinishedJob] {
        &self.failed
    }

    /// Clear both history lists. Active jobs are unaffected.
    pub fn clear_history(&mut self) {
        self.succeeded.clear();
        self.failed.clear();
    }

    pub fn output_root(&self) -> &Utf8Path {
        &self.output_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileCollection, PresetCollection};
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_success_predicates() {
        assert!(Platform::Windows.is_success(0));
        assert!(Platform::Windows.is_success(7));
        assert!(!Platform::Windows.is_success(8));
        assert!(Platform::Unix.is_success(0));
        assert!(!Platform::Unix.is_success(1));
    }

    #[test]
    fn test_robocopy_invocation_shape() {
        let files = vec!["a.png".to_string(), "b.png".to_string()];
        let (argv, cwd) = copy_invocation(
            Platform::Windows,
            Utf8Path::new("in"),
            Utf8Path::new("out"),
            &files,
        );
        assert_eq!(
            argv,
            ["robocopy", "in", "out", "a.png", "b.png", "/copy:DA", "/w:5"]
        );
        assert_eq!(cwd, Utf8PathBuf::from("in"));
    }

    #[test]
    fn test_cp_invocation_shape() {
        let files = vec!["a.png".to_string()];
        let (argv, cwd) = copy_invocation(
            Platform::Unix,
            Utf8Path::new("in"),
            Utf8Path::new("out"),
            &files,
        );
        assert_eq!(argv, ["cp", "a.png", "out"]);
        assert_eq!(cwd, Utf8PathBuf::from("in"));
    }

    fn preset_tree_with_files(source: &TempDir, files: &[&str]) -> FileCategory {
        let dir = camino::Utf8PathBuf::try_from(source.path().to_path_buf()).unwrap();
        for file in files {
            std::fs::write(source.path().join(file), b"data").unwrap();
        }
        let collection = FileCollection::shared(
            "textures",
            dir,
            files.iter().map(|f| f.to_string()).collect(),
        )
        .unwrap();

        let mut tree = FileCategory::new("preset");
        tree.add(FileEntity::Preset(PresetCollection::new(
            "textures",
            collection,
            "tex",
            Some(HashSet::from([".png".to_string()])),
            None,
            None,
        )));
        tree
    }

    #[test]
    fn test_export_with_no_matching_files_spawns_nothing() {
        let source = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let tree = preset_tree_with_files(&source, &["readme.txt"]);

        let mut tracker =
            JobTracker::new(camino::Utf8PathBuf::try_from(output.path().to_path_buf()).unwrap())
                .unwrap();
        let spawned = tracker.export_preset("game", &tree).unwrap();

        assert_eq!(spawned, 0);
        assert_eq!(tracker.active_job_count(), 0);
        assert_eq!(tracker.poll_finished_jobs(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_export_poll_and_classify() {
        let source = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let output_root =
            camino::Utf8PathBuf::try_from(output.path().to_path_buf()).unwrap();
        let tree = preset_tree_with_files(&source, &["a.png", "b.png", "skip.txt"]);

        let mut tracker = JobTracker::new(output_root.clone()).unwrap();
        let spawned = tracker.export_preset("game", &tree).unwrap();
        assert_eq!(spawned, 1);
        assert_eq!(tracker.active_job_count(), 1);

        // Drive the poll loop to completion.
        let mut remaining = tracker.poll_finished_jobs();
        while remaining > 0 {
            std::thread::sleep(std::time::Duration::from_millis(20));
            remaining = tracker.poll_finished_jobs();
        }

        assert_eq!(tracker.succeeded().len(), 1);
        assert!(tracker.failed().is_empty());
        assert_eq!(tracker.succeeded()[0].state, JobState::Succeeded);
        assert!(output_root.join("game/tex/a.png").is_file());
        assert!(output_root.join("game/tex/b.png").is_file());
        assert!(!output_root.join("game/tex/skip.txt").exists());

        // A later sweep must not re-classify anything.
        assert_eq!(tracker.poll_finished_jobs(), 0);
        assert_eq!(tracker.succeeded().len(), 1);

        tracker.clear_history();
        assert!(tracker.succeeded().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_job_is_data_not_an_error() {
        let source = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        // The collection lists a file that is not on disk, so cp exits
        // nonzero. The export call itself must still succeed.
        let dir = camino::Utf8PathBuf::try_from(source.path().to_path_buf()).unwrap();
        let collection =
            FileCollection::shared("textures", dir, vec!["ghost.png".to_string()]).unwrap();
        let mut tree = FileCategory::new("preset");
        tree.add(FileEntity::Preset(PresetCollection::new(
            "textures",
            collection,
            "tex",
            Some(HashSet::from([".png".to_string()])),
            None,
            None,
        )));

        let mut tracker =
            JobTracker::new(camino::Utf8PathBuf::try_from(output.path().to_path_buf()).unwrap())
                .unwrap();
        assert_eq!(tracker.export_preset("game", &tree).unwrap(), 1);

        let mut remaining = tracker.poll_finished_jobs();
        while remaining > 0 {
            std::thread::sleep(std::time::Duration::from_millis(20));
            remaining = tracker.poll_finished_jobs();
        }

        assert!(tracker.succeeded().is_empty());
        assert_eq!(tracker.failed().len(), 1);
        let failed = &tracker.failed()[0];
        assert_eq!(failed.state, JobState::Failed);
        assert_ne!(failed.exit_code, 0);
        assert!(failed.output.contains("ghost.png"));
    }
}
