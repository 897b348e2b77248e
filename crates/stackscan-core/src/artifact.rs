//! Per-target artifact persistence

use std::path::{Path, PathBuf};

use crate::error::PersistError;

/// Make `name` safe for use as a filename
///
/// Every character outside `[A-Za-z0-9-_.]` becomes `_`. The mapping is
/// deterministic, so the same target always lands in the same file.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write one target's captured transcript into the run directory
///
/// The file is named after the sanitized target name with a `.md` extension.
///
/// # Errors
/// Returns `PersistError::WriteReport` when the file cannot be written.
pub fn save_report(run_dir: &Path, name: &str, content: &str) -> Result<PathBuf, PersistError> {
    let path = run_dir.join(format!("{}.md", sanitize_name(name)));
    std::fs::write(&path, content).map_err(|source| PersistError::WriteReport {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
