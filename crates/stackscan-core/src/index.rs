//! Run index rendering

use std::path::{Path, PathBuf};

use crate::error::PersistError;
use crate::summary::{RunStatus, RunSummary};

/// File name of the run-level index artifact
pub const INDEX_FILE: &str = "_index.md";

/// Render the Markdown index for `summary`
///
/// One table row per target in processing order, numbered from 1. Rows for
/// completed targets link to their report file; failed targets get a
/// placeholder so the table shape stays stable.
#[must_use]
pub fn render_index(summary: &RunSummary) -> String {
    let mut lines = vec![
        format!("# Collection Run — {}", summary.timestamp),
        String::new(),
        format!("**Targets:** {}  ", summary.outcomes.len()),
        format!("**Success:** {}  ", summary.ok_count()),
        format!("**Failed:** {}", summary.failed_count()),
        String::new(),
        "| # | Server | Status | Report |".to_string(),
        "| --- | --- | --- | --- |".to_string(),
    ];

    for (i, outcome) in summary.outcomes.iter().enumerate() {
        let report = match (outcome.status, &outcome.artifact) {
            (RunStatus::Ok, Some(path)) => file_link(path),
            _ => "—".to_string(),
        };
        lines.push(format!(
            "| {} | {} | {} {} | {} |",
            i + 1,
            outcome.target,
            outcome.status.icon(),
            outcome.status,
            report
        ));
    }

    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(format!(
        "_Generated by stackscan v{}_",
        env!("CARGO_PKG_VERSION")
    ));
    lines.push(String::new());
    lines.join("\n")
}

fn file_link(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("[{file}](./{file})")
}

/// Write the index into the run directory
///
/// # Errors
/// Returns `PersistError::WriteIndex` when the file cannot be written; the
/// caller treats that as fatal because the index is the only run-wide
/// record.
pub fn write_index(run_dir: &Path, summary: &RunSummary) -> Result<PathBuf, PersistError> {
    let path = run_dir.join(INDEX_FILE);
    std::fs::write(&path, render_index(summary)).map_err(|source| PersistError::WriteIndex {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::Outcome;

    fn summary() -> RunSummary {
        let mut summary = RunSummary::new("20260214_093000");
        summary.push(Outcome {
            target: "web1".to_string(),
            status: RunStatus::Ok,
            captured: "# Report".to_string(),
            artifact: Some(PathBuf::from("/runs/run_x/web1.md")),
        });
        summary.push(Outcome {
            target: "db1".to_string(),
            status: RunStatus::Failed,
            captured: "  ❌ connection failed: no route".to_string(),
            artifact: Some(PathBuf::from("/runs/run_x/db1.md")),
        });
        summary.push(Outcome {
            target: "cache1".to_string(),
            status: RunStatus::Ok,
            captured: "# Report".to_string(),
            artifact: None,
        });
        summary
    }

    #[test]
    fn header_reports_the_totals() {
        let index = render_index(&summary());
        assert!(index.starts_with("# Collection Run — 20260214_093000\n"));
        assert!(index.contains("**Targets:** 3"));
        assert!(index.contains("**Success:** 2"));
        assert!(index.contains("**Failed:** 1"));
    }

    #[test]
    fn rows_are_numbered_in_processing_order() {
        let index = render_index(&summary());
        let web = index.find("| 1 | web1 |").expect("web1 row");
        let db = index.find("| 2 | db1 |").expect("db1 row");
        let cache = index.find("| 3 | cache1 |").expect("cache1 row");
        assert!(web < db && db < cache);
    }

    #[test]
    fn only_completed_targets_with_artifacts_are_linked() {
        let index = render_index(&summary());
        assert!(index.contains("| 1 | web1 | ✅ ok | [web1.md](./web1.md) |"));
        // Failed target keeps the placeholder even though a file exists
        assert!(index.contains("| 2 | db1 | ❌ failed | — |"));
        // Completed target without a saved file also gets the placeholder
        assert!(index.contains("| 3 | cache1 | ✅ ok | — |"));
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(render_index(&summary()), render_index(&summary()));
    }

    #[test]
    fn empty_run_still_renders_a_complete_document() {
        let index = render_index(&RunSummary::new("20260214_093000"));
        assert!(index.contains("**Targets:** 0"));
        assert!(index.contains("| # | Server | Status | Report |"));
        let footer = format!("_Generated by stackscan v{}_\n", env!("CARGO_PKG_VERSION"));
        assert!(index.ends_with(&footer));
    }
}
