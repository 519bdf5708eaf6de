use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use schemaforge_core::naming::to_file_stem;
use schemaforge_core::{DatabaseSchema, Dialect, ExportSettings, TableInfo, TypeResolver};

use crate::errors::ExportError;
use crate::format::{Cell, align_rows, render_cell};
use crate::masking::Masker;
use crate::model::{ExportReport, ExportStatus, TableExport};
use crate::source::{Row, RowQuery, RowSource};

pub const SUMMARY_FILE: &str = "export_summary.md";
pub const NO_DATA_MARKER: &str = "-- no data";

/// Writes batched `INSERT` scripts for table contents.
#[derive(Debug, Clone)]
pub struct ExportEngine {
    settings: ExportSettings,
    output_dir: PathBuf,
}

/// Header fields shared by every file of one table.
struct FileHeader<'a> {
    table: &'a str,
    total_rows: u64,
    part: usize,
    parts: usize,
    generated_at: &'a DateTime<Utc>,
    dialect: Dialect,
}

impl ExportEngine {
    pub fn new(settings: ExportSettings, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            output_dir: output_dir.into(),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export `names` (every schema table when empty). Per-table failures land in
    /// the report; only an unusable output directory or summary aborts the run.
    pub async fn export_tables(
        &self,
        source: &dyn RowSource,
        schema: &DatabaseSchema,
        names: &[String],
    ) -> Result<ExportReport, ExportError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let dialect = source.dialect();
        let generated_at = Utc::now();

        std::fs::create_dir_all(&self.output_dir).map_err(|source| ExportError::OutputPath {
            path: self.output_dir.clone(),
            source,
        })?;

        let names: Vec<String> = if names.is_empty() {
            schema.tables.iter().map(|table| table.name.clone()).collect()
        } else {
            names.to_vec()
        };
        info!(
            run_id = %run_id,
            dialect = %dialect,
            tables = names.len(),
            batch_size = self.batch_size(),
            masking = self.settings.enable_masking,
            "export started"
        );

        let mut tables = Vec::with_capacity(names.len());
        for name in &names {
            let table_start = Instant::now();
            let Some(table) = schema.find_table_by_name(name) else {
                warn!(table = %name, "table not found in schema");
                tables.push(TableExport::failed(name, "table not found in schema".to_string()));
                continue;
            };
            let outcome = self.export_table(source, table, dialect, &generated_at).await;
            match outcome.status {
                ExportStatus::Complete => info!(
                    table = %name,
                    rows = outcome.rows,
                    batches = outcome.batches,
                    duration_ms = table_start.elapsed().as_millis() as u64,
                    "table exported"
                ),
                status => warn!(
                    table = %name,
                    status = status.as_str(),
                    error = outcome.error.as_deref().unwrap_or(""),
                    "table export incomplete"
                ),
            }
            tables.push(outcome);
        }

        let summary_path = self.output_dir.join(SUMMARY_FILE);
        let mut output_paths: Vec<PathBuf> =
            tables.iter().flat_map(|table| table.files.clone()).collect();
        std::fs::write(&summary_path, render_summary(&tables, dialect, &generated_at))?;
        output_paths.push(summary_path.clone());

        let report = ExportReport {
            run_id,
            dialect,
            table_count: tables
                .iter()
                .filter(|table| table.status != ExportStatus::Failed)
                .count(),
            total_rows: tables.iter().map(|table| table.rows).sum(),
            file_count: output_paths.len(),
            output_paths,
            summary_path,
            tables,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            run_id = %report.run_id,
            tables = report.table_count,
            rows = report.total_rows,
            files = report.file_count,
            duration_ms = report.duration_ms,
            "export finished"
        );
        Ok(report)
    }

    fn batch_size(&self) -> usize {
        self.settings.batch_size.max(1)
    }

    fn query_for(&self, table: &TableInfo) -> RowQuery {
        let mut columns: Vec<_> = table.columns.iter().collect();
        columns.sort_by_key(|column| column.ordinal_position);
        RowQuery {
            schema: table.schema_name.clone(),
            table: table.name.clone(),
            columns: columns.iter().map(|column| column.name.clone()).collect(),
            where_clause: self.settings.where_conditions.get(&table.name).cloned(),
            order_by: self.settings.order_by.get(&table.name).cloned(),
            limit: self.settings.max_rows,
        }
    }

    async fn export_table(
        &self,
        source: &dyn RowSource,
        table: &TableInfo,
        dialect: Dialect,
        generated_at: &DateTime<Utc>,
    ) -> TableExport {
        let query = self.query_for(table);
        debug!(table = %table.name, sql = %query.to_sql(dialect), "fetching rows");
        let rows = match source.fetch_rows(&query).await {
            Ok(rows) => rows,
            Err(err) => return TableExport::failed(&table.name, err.to_string()),
        };

        let rendered = self.render_rows(table, &query.columns, rows, dialect);
        let total_rows = rendered.len() as u64;
        let stem = to_file_stem(&table.name);
        let mut export = TableExport {
            table: table.name.clone(),
            rows: total_rows,
            batches: 0,
            files: Vec::new(),
            status: ExportStatus::Complete,
            error: None,
        };

        if rendered.is_empty() {
            let header = FileHeader {
                table: &table.name,
                total_rows: 0,
                part: 1,
                parts: 1,
                generated_at,
                dialect,
            };
            let mut body = self.render_file_header(&header);
            body.push_str(&format!("{NO_DATA_MARKER} for table {}\n", table.name));
            body.push_str(&session_footer(dialect));
            let path = self.output_dir.join(format!("insert_{stem}.sql"));
            self.write_file(&mut export, path, &body);
            return export;
        }

        let batches: Vec<Vec<Vec<String>>> = rendered
            .chunks(self.batch_size())
            .map(|chunk| chunk.to_vec())
            .collect();
        let parts = batches.len();
        let target = insert_target(table, dialect);
        let column_list = query
            .columns
            .iter()
            .map(|column| dialect.quote_ident(column))
            .collect::<Vec<_>>()
            .join(", ");

        for (idx, mut batch) in batches.into_iter().enumerate() {
            if self.settings.align_values {
                align_rows(&mut batch);
            }
            let header = FileHeader {
                table: &table.name,
                total_rows,
                part: idx + 1,
                parts,
                generated_at,
                dialect,
            };
            let mut body = self.render_file_header(&header);
            if self.settings.include_headers {
                body.push_str(&format!(
                    "-- Batch {} of {} ({} rows)\n",
                    idx + 1,
                    parts,
                    batch.len()
                ));
            }
            body.push_str(&render_insert(&target, &column_list, &batch));
            body.push('\n');
            body.push_str(&session_footer(dialect));

            let file_name = if parts == 1 {
                format!("insert_{stem}.sql")
            } else {
                format!("insert_{stem}_part{}.sql", idx + 1)
            };
            if self.write_file(&mut export, self.output_dir.join(file_name), &body) {
                export.batches += 1;
            }
        }
        export
    }

    /// Typed, masked and rendered values per row, in column order.
    fn render_rows(
        &self,
        table: &TableInfo,
        columns: &[String],
        rows: Vec<Row>,
        dialect: Dialect,
    ) -> Vec<Vec<String>> {
        let mappings: Vec<_> = columns
            .iter()
            .map(|name| {
                table
                    .column(name)
                    .map(|column| TypeResolver::resolve_column(column, dialect))
                    .unwrap_or_else(|| TypeResolver::resolve("text", dialect, true))
            })
            .collect();
        let mut masker = Masker::new(&self.settings);

        rows.into_iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(&mappings)
                    .map(|(column, mapping)| {
                        let raw = row.get(column).unwrap_or(&serde_json::Value::Null);
                        let cell = masker.apply(column, Cell::from_json(raw, mapping));
                        render_cell(&cell, dialect, self.settings.null_handling)
                    })
                    .collect()
            })
            .collect()
    }

    fn render_file_header(&self, header: &FileHeader<'_>) -> String {
        let mut out = String::new();
        out.push_str("-- Generated INSERT statements\n");
        let _ = writeln!(out, "-- Table: {}", header.table);
        let _ = writeln!(out, "-- Total rows: {}", header.total_rows);
        let _ = writeln!(out, "-- Part {} of {}", header.part, header.parts);
        let _ = writeln!(out, "-- Generated at: {}", header.generated_at.to_rfc3339());
        let _ = writeln!(out, "-- Dialect: {}", header.dialect);
        let _ = writeln!(out, "-- Batch size: {}", self.batch_size());
        let _ = writeln!(
            out,
            "-- Masking: {}",
            if self.settings.enable_masking { "enabled" } else { "disabled" }
        );
        out.push('\n');
        out.push_str(&session_header(header.dialect));
        out.push('\n');
        out
    }

    /// Write one file; on failure mark the table partial and keep going.
    fn write_file(&self, export: &mut TableExport, path: PathBuf, body: &str) -> bool {
        match std::fs::write(&path, body) {
            Ok(()) => {
                debug!(path = %path.display(), "wrote export file");
                export.files.push(path);
                true
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "export file write failed");
                export.status = ExportStatus::Partial;
                let message = format!("{}: {err}", path.display());
                export.error = Some(match export.error.take() {
                    Some(previous) => format!("{previous}; {message}"),
                    None => message,
                });
                false
            }
        }
    }
}

fn insert_target(table: &TableInfo, dialect: Dialect) -> String {
    match dialect {
        Dialect::MySql => dialect.quote_ident(&table.name),
        _ => dialect.qualified_table(&table.schema_name, &table.name),
    }
}

fn session_header(dialect: Dialect) -> String {
    match dialect {
        Dialect::MySql => {
            "SET FOREIGN_KEY_CHECKS = 0;\nSET AUTOCOMMIT = 0;\nSTART TRANSACTION;\n".to_string()
        }
        Dialect::Postgres => "SET session_replication_role = replica;\n".to_string(),
        Dialect::Mssql => String::new(),
    }
}

fn session_footer(dialect: Dialect) -> String {
    match dialect {
        Dialect::MySql => "\nCOMMIT;\nSET FOREIGN_KEY_CHECKS = 1;\n".to_string(),
        Dialect::Postgres => "\nSET session_replication_role = DEFAULT;\n".to_string(),
        Dialect::Mssql => String::new(),
    }
}

/// One multi-row `INSERT` statement.
pub fn render_insert(target: &str, column_list: &str, rows: &[Vec<String>]) -> String {
    let mut out = format!("INSERT INTO {target} ({column_list})\nVALUES\n");
    for (idx, row) in rows.iter().enumerate() {
        let terminator = if idx + 1 == rows.len() { ";" } else { "," };
        let _ = writeln!(out, "  ({}){terminator}", row.join(", "));
    }
    out
}

fn render_summary(tables: &[TableExport], dialect: Dialect, generated_at: &DateTime<Utc>) -> String {
    let mut out = String::from("# Data Export Summary\n\n");
    let _ = writeln!(out, "- Generated at: {}", generated_at.to_rfc3339());
    let _ = writeln!(out, "- Dialect: {dialect}");
    let _ = writeln!(out, "- Tables: {}", tables.len());
    let _ = writeln!(
        out,
        "- Total rows: {}",
        tables.iter().map(|table| table.rows).sum::<u64>()
    );
    out.push_str("\n| Table | Rows | Batches | Status | Error |\n");
    out.push_str("|-------|------|---------|--------|-------|\n");
    for table in tables {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            table.table,
            table.rows,
            table.batches,
            table.status.as_str(),
            table.error.as_deref().unwrap_or("").replace('|', "\\|")
        );
    }
    out.push_str("\n## Files\n\n");
    for path in tables.iter().flat_map(|table| &table.files) {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let _ = writeln!(out, "- {name}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_statement_shape() {
        let rows = vec![
            vec!["1".to_string(), "'a'".to_string()],
            vec!["2".to_string(), "NULL".to_string()],
        ];
        assert_eq!(
            render_insert("\"public\".\"t\"", "\"id\", \"name\"", &rows),
            "INSERT INTO \"public\".\"t\" (\"id\", \"name\")\nVALUES\n  (1, 'a'),\n  (2, NULL);\n"
        );
    }

    #[test]
    fn summary_lists_status_and_errors() {
        let tables = vec![
            TableExport {
                table: "users".to_string(),
                rows: 0,
                batches: 0,
                files: vec![PathBuf::from("/tmp/x/insert_users.sql")],
                status: ExportStatus::Complete,
                error: None,
            },
            TableExport::failed("orders", "boom".to_string()),
        ];
        let summary = render_summary(&tables, Dialect::Postgres, &Utc::now());
        assert!(summary.contains("| users | 0 | 0 | complete |  |"));
        assert!(summary.contains("| orders | 0 | 0 | failed | boom |"));
        assert!(summary.contains("- insert_users.sql"));
    }
}
