//! stackscan-core: run orchestration, artifacts and the run index
//!
//! Sequences targets through the execution engine, persists per-target
//! reports and renders the run-level index.

pub mod artifact;
pub mod config;
pub mod error;
pub mod index;
pub mod run;
pub mod summary;

pub use artifact::{sanitize_name, save_report};
pub use config::load_targets;
pub use error::{ConfigError, PersistError};
pub use index::{INDEX_FILE, render_index, write_index};
pub use run::RunCoordinator;
pub use summary::{Outcome, RunStatus, RunSummary};
