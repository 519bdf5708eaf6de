use std::path::PathBuf;

use thiserror::Error;

/// Fatal export errors. Per-table and per-batch failures are recorded in the report instead.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("output path {path} could not be prepared: {source}")]
    OutputPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("row source error: {0}")]
    Source(#[from] schemaforge_core::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
