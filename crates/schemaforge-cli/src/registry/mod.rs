//! Per-invocation run directories.
//!
//! `<run_dir>/<timestamp>__run_<uuid>/` holds `config.json` (redacted
//! connection and effective options), `logs.ndjson`, `schema.json` and the
//! command's report (`generation_report.json` or `export_report.json`).

mod logging;
mod run;

pub use logging::init_run_logging;
pub use run::{RunContext, RunOptions, RunPaths, start_run, write_report, write_schema};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("run directory io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("run artifact serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging setup failed: {0}")]
    Logging(String),
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
