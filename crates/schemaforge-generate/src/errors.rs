use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors emitted by the generation engine.
///
/// Per-table failures are not errors; they are recorded in the report.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("introspection failed: {0}")]
    Introspection(#[from] schemaforge_core::Error),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("output path {path} could not be prepared: {source}")]
    OutputPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("entity directory {0} does not exist")]
    EntityDirectory(PathBuf),
    #[error("wiring failed: {0}")]
    Wiring(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
