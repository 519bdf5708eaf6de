use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use schemaforge_core::Dialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Complete,
    /// Some batch files could not be written.
    Partial,
    Failed,
}

impl ExportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportStatus::Complete => "complete",
            ExportStatus::Partial => "partial",
            ExportStatus::Failed => "failed",
        }
    }
}

/// Outcome for one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableExport {
    pub table: String,
    pub rows: u64,
    pub batches: usize,
    pub files: Vec<PathBuf>,
    pub status: ExportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableExport {
    pub fn failed(table: &str, error: String) -> Self {
        Self {
            table: table.to_string(),
            rows: 0,
            batches: 0,
            files: Vec::new(),
            status: ExportStatus::Failed,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub run_id: String,
    pub dialect: Dialect,
    /// Tables that produced at least their header file.
    pub table_count: usize,
    pub total_rows: u64,
    /// Files written, the summary included.
    pub file_count: usize,
    pub output_paths: Vec<PathBuf>,
    pub summary_path: PathBuf,
    pub tables: Vec<TableExport>,
    pub duration_ms: u64,
}
