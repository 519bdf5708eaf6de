use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use schemaforge_core::Dialect;

/// Kind of file produced by a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Entity,
    CreateDto,
    UpdateDto,
    QueryDto,
    Repository,
    Service,
    Controller,
    Module,
    ServiceTest,
    ControllerTest,
    SqlDdl,
    AppModule,
    EntityIndex,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Entity => "entity",
            ArtifactKind::CreateDto => "create_dto",
            ArtifactKind::UpdateDto => "update_dto",
            ArtifactKind::QueryDto => "query_dto",
            ArtifactKind::Repository => "repository",
            ArtifactKind::Service => "service",
            ArtifactKind::Controller => "controller",
            ArtifactKind::Module => "module",
            ArtifactKind::ServiceTest => "service_test",
            ArtifactKind::ControllerTest => "controller_test",
            ArtifactKind::SqlDdl => "sql_ddl",
            ArtifactKind::AppModule => "app_module",
            ArtifactKind::EntityIndex => "entity_index",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file produced (or reused) for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactResult {
    pub table_name: String,
    pub kind: ArtifactKind,
    pub output_path: PathBuf,
    /// True when an existing file was referenced instead of written.
    #[serde(default)]
    pub reused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Generated,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableManifest {
    pub schema: String,
    pub table: String,
    pub status: TableStatus,
    pub artifacts: Vec<ArtifactResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Structured generation issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl GenerationIssue {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: "warning".to_string(),
            code: code.to_string(),
            message: message.into(),
            path: None,
            schema: None,
            table: None,
            column: None,
        }
    }

    pub fn on_table(mut self, schema: &str, table: &str) -> Self {
        self.schema = Some(schema.to_string());
        self.table = Some(table.to_string());
        self
    }

    pub fn on_column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub dialect: Dialect,
    pub tables_processed: u64,
    pub tables_failed: u64,
    pub files_generated: u64,
    pub output_paths: Vec<PathBuf>,
    pub per_table: Vec<TableManifest>,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub warnings: Vec<GenerationIssue>,
}

impl GenerationReport {
    pub fn new(run_id: String, dialect: Dialect) -> Self {
        Self {
            run_id,
            dialect,
            tables_processed: 0,
            tables_failed: 0,
            files_generated: 0,
            output_paths: Vec::new(),
            per_table: Vec::new(),
            warnings_by_code: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_warning(&mut self, issue: GenerationIssue) {
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.warnings.push(issue);
    }

    /// Count written files; reused artifacts are referenced, not produced.
    pub fn record_artifact(&mut self, artifact: &ArtifactResult) {
        if artifact.reused {
            return;
        }
        self.files_generated += 1;
        self.output_paths.push(artifact.output_path.clone());
    }

    pub fn record_table(&mut self, manifest: TableManifest) {
        match manifest.status {
            TableStatus::Generated => self.tables_processed += 1,
            TableStatus::Failed => self.tables_failed += 1,
        }
        self.per_table.push(manifest);
    }

    pub fn manifest(&self, table: &str) -> Option<&TableManifest> {
        self.per_table.iter().find(|entry| entry.table == table)
    }
}
