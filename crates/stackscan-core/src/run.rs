//! Sequential run coordination
//!
//! Drives the target list strictly in order, hands each transcript to the
//! artifact writer and accumulates the run summary.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{error, info, instrument};

use stackscan_exec::{LineSink, TargetRunner, TargetSpec};

use crate::artifact::{sanitize_name, save_report};
use crate::error::PersistError;
use crate::summary::{Outcome, RunStatus, RunSummary};

/// Width of the banner rule lines
const BANNER_WIDTH: usize = 60;

/// Coordinates one run over an ordered target list
///
/// Targets are processed one at a time; concurrent sessions would interleave
/// their output on the shared live stream.
pub struct RunCoordinator {
    run_dir: PathBuf,
    timestamp: String,
}

impl RunCoordinator {
    /// Create the timestamped run directory under `output_base`
    ///
    /// Single-target runs carry the target name in the directory name, so
    /// repeated runs against one host stay easy to tell apart.
    ///
    /// # Errors
    /// Returns `PersistError::CreateDir` when the directory cannot be
    /// created; without it the run has nowhere to record anything.
    pub fn create(output_base: &Path, targets: &[TargetSpec]) -> Result<Self, PersistError> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let dir_name = if let [only] = targets {
            format!("run_{}_{}", timestamp, sanitize_name(&only.name))
        } else {
            format!("run_{timestamp}")
        };
        let run_dir = output_base.join(dir_name);
        std::fs::create_dir_all(&run_dir).map_err(|source| PersistError::CreateDir {
            path: run_dir.clone(),
            source,
        })?;

        info!(run_dir = %run_dir.display(), "run directory created");

        Ok(Self { run_dir, timestamp })
    }

    /// Directory artifacts are written into
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Timestamp identifying this run
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Run every target in order and return the finished summary
    ///
    /// One target's failure never aborts the rest of the run; the summary is
    /// the only state carried across targets.
    pub async fn run_all(
        &self,
        targets: &[TargetSpec],
        payload: &[u8],
        runner: &dyn TargetRunner,
        sink: &mut dyn LineSink,
    ) -> RunSummary {
        let mut summary = RunSummary::new(self.timestamp.clone());
        for target in targets {
            let outcome = self.run_target(target, payload, runner, sink).await;
            summary.push(outcome);
        }
        summary
    }

    /// Execute one target, classify the result and persist the transcript
    #[instrument(skip(self, payload, runner, sink), fields(target = %target.name))]
    async fn run_target(
        &self,
        target: &TargetSpec,
        payload: &[u8],
        runner: &dyn TargetRunner,
        sink: &mut dyn LineSink,
    ) -> Outcome {
        let rule = "=".repeat(BANNER_WIDTH);
        sink.emit(&format!(
            "{rule}\n  📡 {} ({})\n{rule}",
            target.name,
            target.endpoint()
        ));

        let report = runner.run(target, payload, sink).await;
        let status = if report.succeeded() {
            RunStatus::Ok
        } else {
            RunStatus::Failed
        };

        let artifact = match save_report(&self.run_dir, &target.name, &report.captured) {
            Ok(path) => {
                sink.emit(&format!("\n💾 Saved → {}\n", path.display()));
                Some(path)
            }
            Err(e) => {
                // The transcript already reached the live stream; losing the
                // file costs the index link, not the run
                error!(target = %target.name, error = %e, "failed to save report");
                None
            }
        };

        Outcome {
            target: target.name.clone(),
            status,
            captured: report.captured,
            artifact,
        }
    }
}
