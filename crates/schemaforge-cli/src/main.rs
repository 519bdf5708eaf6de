mod registry;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use schemaforge_core::{
    ConnectionDescriptor, DatabaseSchema, Error as CoreError, GenerationConfig, SCHEMA_VERSION,
    filter_tables,
};
use schemaforge_export::{ExportEngine, ExportError, ExportReport, MySqlRowSource, PgRowSource, RowSource};
use schemaforge_generate::entity_parser::schema_from_entities;
use schemaforge_generate::{GenerationEngine, GenerationError};
use schemaforge_introspect::{DatabaseHandle, IntrospectOptions, connect};
use registry::{RunContext, RunOptions, RunPaths, init_run_logging, start_run, write_report, write_schema};
use settings::{
    ConnectionOverrides, FileConfig, PASSWORD_ENV, apply_connection_overrides, apply_selection,
    ensure_connection, load_config,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "schemaforge", version, about = "Schema-driven code, DDL and data export generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read the database catalog and write schema.json.
    Introspect(IntrospectArgs),
    /// Generate entities, CRUD layers and SQL DDL.
    Generate(GenerateArgs),
    /// Export table contents as batched INSERT scripts.
    Export(ExportArgs),
    /// Test the database connection.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Configuration file (defaults to ./schemaforge.toml when present).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Database connection URL.
    #[arg(long, value_name = "CONNECTION_STRING")]
    conn: Option<String>,
    /// Dialect when no URL is given (postgres, mysql).
    #[arg(long)]
    dialect: Option<String>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    database: Option<String>,
    /// Schema to read; `public` on Postgres, the database on MySQL.
    #[arg(long)]
    schema: Option<String>,
    /// Tables to include (repeatable).
    #[arg(long, value_name = "TABLE")]
    include: Vec<String>,
    /// Tables to exclude (repeatable).
    #[arg(long, value_name = "TABLE")]
    exclude: Vec<String>,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
}

#[derive(Args, Debug)]
struct IntrospectArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Optional output path for schema.json.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Generate from a schema.json snapshot instead of a live connection.
    #[arg(long, value_name = "FILE")]
    schema_file: Option<PathBuf>,
    /// Write SQL DDL for an existing entity directory; no database is read.
    #[arg(long, value_name = "DIR", conflicts_with = "schema_file")]
    from_entities: Option<PathBuf>,
    /// Root that relative output paths are resolved against.
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    no_entities: bool,
    #[arg(long, default_value_t = false)]
    no_crud: bool,
    #[arg(long, default_value_t = false)]
    no_sql: bool,
    /// Also export table data (needs a live connection).
    #[arg(long, default_value_t = false)]
    with_data: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Output directory for INSERT scripts (defaults to the configured data path).
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    max_rows: Option<u64>,
    /// Mask sensitive columns.
    #[arg(long, default_value_t = false)]
    mask: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    common: CommonArgs,
}

/// Configuration resolved from file and flags.
struct Resolved {
    config_file: Option<PathBuf>,
    connection: ConnectionDescriptor,
    generation: GenerationConfig,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Introspect(args) => run_introspect(args).await,
        Command::Generate(args) => run_generate(args).await,
        Command::Export(args) => run_export(args).await,
        Command::Check(args) => run_check(args).await,
    }
}

fn resolve(common: &CommonArgs) -> Result<Resolved, CliError> {
    let (file, config_file): (FileConfig, _) = load_config(common.config.as_deref())?;
    let FileConfig {
        mut connection,
        mut generation,
    } = file;
    let overrides = ConnectionOverrides {
        url: common.conn.clone(),
        dialect: common.dialect.clone(),
        host: common.host.clone(),
        port: common.port,
        user: common.user.clone(),
        database: common.database.clone(),
        schema: common.schema.clone(),
    };
    apply_connection_overrides(&mut connection, &overrides, std::env::var(PASSWORD_ENV).ok())?;
    apply_selection(&mut generation, &common.include, &common.exclude);
    Ok(Resolved {
        config_file,
        connection,
        generation,
    })
}

fn begin_run(
    command: &str,
    common: &CommonArgs,
    resolved: &Resolved,
    schema_file: Option<PathBuf>,
) -> Result<RunPaths, CliError> {
    let run_id = Uuid::new_v4().to_string();
    let live = schema_file.is_none();
    let ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        command: command.to_string(),
        dialect: resolved.connection.dialect.to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        run_dir: common.run_dir.clone(),
        options: RunOptions {
            config_file: resolved.config_file.clone(),
            schema_file,
            include: resolved.generation.tables.include.clone(),
            exclude: resolved.generation.tables.exclude.clone(),
            generation: resolved.generation.clone(),
        },
        connection: live.then(|| resolved.connection.redacted()),
    };
    let paths = start_run(&ctx)?;
    init_run_logging(&paths.logs_path)?;
    tracing::info!(event = "run_started", run_id = %run_id, command, dialect = %ctx.dialect);
    Ok(paths)
}

async fn open(connection: &ConnectionDescriptor) -> Result<DatabaseHandle, CliError> {
    ensure_connection(connection)?;
    let handle = connect(connection).await?;
    tracing::info!(event = "connected", connection = %connection.redacted().redacted);
    Ok(handle)
}

async fn introspect(
    handle: &DatabaseHandle,
    connection: &ConnectionDescriptor,
) -> Result<DatabaseSchema, CliError> {
    tracing::info!(event = "introspection_started");
    let introspector = handle.introspector(connection, IntrospectOptions::default());
    let schema = introspector.database_schema().await?;
    tracing::info!(event = "introspection_finished", tables = schema.tables.len());
    Ok(schema)
}

fn row_source(handle: &DatabaseHandle) -> Box<dyn RowSource> {
    match handle {
        DatabaseHandle::Postgres(pool) => Box::new(PgRowSource::new(pool.clone())),
        DatabaseHandle::MySql(pool) => Box::new(MySqlRowSource::new(pool.clone())),
    }
}

fn selected_names(schema: &DatabaseSchema, config: &GenerationConfig) -> Vec<String> {
    filter_tables(&schema.tables, &config.tables.include, &config.tables.exclude)
        .into_iter()
        .map(|table| table.name.clone())
        .collect()
}

fn read_snapshot(path: &Path) -> Result<DatabaseSchema, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| CliError::InvalidConfig(format!("{}: {err}", path.display())))?;
    serde_json::from_str(&text).map_err(|err| CliError::Core(CoreError::Json(err)))
}

async fn run_introspect(args: IntrospectArgs) -> Result<(), CliError> {
    let resolved = resolve(&args.common)?;
    let paths = begin_run("introspect", &args.common, &resolved, None)?;
    let timer = Instant::now();

    let handle = open(&resolved.connection).await?;
    let mut schema = introspect(&handle, &resolved.connection).await?;
    handle.close().await;

    let names = selected_names(&schema, &resolved.generation);
    schema.tables.retain(|table| names.contains(&table.name));
    write_schema(&paths, &schema, args.out.as_deref())?;
    tracing::info!(event = "schema_written", path = %paths.schema_path.display(), tables = schema.tables.len());

    tracing::info!(
        event = "run_finished",
        status = "success",
        duration_ms = timer.elapsed().as_millis() as u64
    );
    Ok(())
}

async fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let mut resolved = resolve(&args.common)?;
    let config = &mut resolved.generation;
    if args.no_entities {
        config.features.entities = false;
    }
    if args.no_crud {
        config.features.crud = false;
    }
    if args.no_sql {
        config.features.sql = false;
    }
    if args.with_data {
        config.features.data_export = true;
    }
    if args.from_entities.is_some() {
        config.features.entities = false;
        config.features.crud = false;
        config.features.data_export = false;
        config.features.sql = true;
    }
    if let Some(root) = &args.out {
        config.paths = config.paths.rooted_at(root);
    }

    let offline_source = args.schema_file.clone().or_else(|| args.from_entities.clone());
    let paths = begin_run("generate", &args.common, &resolved, offline_source)?;
    let timer = Instant::now();

    let (schema, handle) = match (&args.schema_file, &args.from_entities) {
        (Some(path), _) => (read_snapshot(path)?, None),
        (None, Some(dir)) => {
            let schema = schema_from_entities(dir, resolved.connection.dialect)?;
            tracing::info!(
                event = "entities_parsed",
                dir = %dir.display(),
                tables = schema.tables.len()
            );
            (schema, None)
        }
        (None, None) => {
            let handle = open(&resolved.connection).await?;
            let schema = introspect(&handle, &resolved.connection).await?;
            (schema, Some(handle))
        }
    };
    write_schema(&paths, &schema, None)?;

    let engine = GenerationEngine::new(resolved.generation.clone());
    let report = engine.run(&schema)?;
    let report_path = write_report(&paths, "generation_report", &report)?;
    tracing::info!(
        event = "generation_report_written",
        path = %report_path.display(),
        tables_processed = report.tables_processed,
        tables_failed = report.tables_failed,
        files = report.files_generated
    );

    if resolved.generation.features.data_export {
        match &handle {
            Some(handle) => {
                let names = selected_names(&schema, &resolved.generation);
                let out = resolved.generation.paths.data_export.clone();
                let export =
                    export_with(handle, &schema, &names, &resolved.generation, out).await?;
                write_report(&paths, "export_report", &export)?;
            }
            None => tracing::warn!(
                event = "export_skipped",
                "data export needs a live connection; a schema snapshot was given"
            ),
        }
    }
    if let Some(handle) = handle {
        handle.close().await;
    }

    tracing::info!(
        event = "run_finished",
        status = if report.tables_failed == 0 { "success" } else { "partial" },
        duration_ms = timer.elapsed().as_millis() as u64
    );
    Ok(())
}

async fn run_export(args: ExportArgs) -> Result<(), CliError> {
    let mut resolved = resolve(&args.common)?;
    let export = &mut resolved.generation.export;
    if let Some(batch_size) = args.batch_size {
        if batch_size == 0 {
            return Err(CliError::InvalidConfig("--batch-size must be positive".to_string()));
        }
        export.batch_size = batch_size;
    }
    if args.max_rows.is_some() {
        export.max_rows = args.max_rows;
    }
    if args.mask {
        export.enable_masking = true;
    }

    let paths = begin_run("export", &args.common, &resolved, None)?;
    let timer = Instant::now();

    let handle = open(&resolved.connection).await?;
    let schema = introspect(&handle, &resolved.connection).await?;
    write_schema(&paths, &schema, None)?;

    let names = selected_names(&schema, &resolved.generation);
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| resolved.generation.paths.data_export.clone());
    let report = export_with(&handle, &schema, &names, &resolved.generation, out).await;
    handle.close().await;
    let report = report?;
    let report_path = write_report(&paths, "export_report", &report)?;

    tracing::info!(
        event = "run_finished",
        status = "success",
        report = %report_path.display(),
        duration_ms = timer.elapsed().as_millis() as u64
    );
    Ok(())
}

async fn export_with(
    handle: &DatabaseHandle,
    schema: &DatabaseSchema,
    names: &[String],
    config: &GenerationConfig,
    out: PathBuf,
) -> Result<ExportReport, CliError> {
    if names.is_empty() {
        tracing::warn!(event = "export_empty", "no tables selected for export");
    }
    let source = row_source(handle);
    let engine = ExportEngine::new(config.export.clone(), out);
    let report = engine.export_tables(source.as_ref(), schema, names).await?;
    tracing::info!(
        event = "export_finished",
        tables = report.table_count,
        rows = report.total_rows,
        files = report.file_count,
        summary = %report.summary_path.display()
    );
    Ok(report)
}

async fn run_check(args: CheckArgs) -> Result<(), CliError> {
    let resolved = resolve(&args.common)?;
    begin_run("check", &args.common, &resolved, None)?;

    let handle = open(&resolved.connection).await?;
    let outcome = handle.ping().await;
    handle.close().await;
    outcome?;

    tracing::info!(
        event = "connection_ok",
        dialect = %resolved.connection.dialect,
        connection = %resolved.connection.redacted().redacted
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_with_snapshot_and_selection() {
        let cli = Cli::try_parse_from([
            "schemaforge",
            "generate",
            "--schema-file",
            "schema.json",
            "--include",
            "users",
            "--include",
            "orders",
            "--exclude",
            "audit",
            "--no-sql",
        ])
        .expect("parse");
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.schema_file.as_deref(), Some(Path::new("schema.json")));
        assert_eq!(args.common.include, vec!["users".to_string(), "orders".to_string()]);
        assert_eq!(args.common.exclude, vec!["audit".to_string()]);
        assert!(args.no_sql && !args.no_crud);
        assert_eq!(args.common.run_dir, PathBuf::from("runs"));
    }

    #[test]
    fn parses_export_connection_flags() {
        let cli = Cli::try_parse_from([
            "schemaforge",
            "export",
            "--dialect",
            "mysql",
            "--host",
            "db",
            "--port",
            "3307",
            "--database",
            "shop",
            "--batch-size",
            "500",
            "--mask",
        ])
        .expect("parse");
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.batch_size, Some(500));
        assert!(args.mask);

        let resolved = resolve(&CommonArgs {
            config: None,
            ..args.common
        })
        .expect("resolve");
        assert_eq!(resolved.connection.dialect.as_str(), "mysql");
        assert_eq!(resolved.connection.effective_port(), 3307);
        assert_eq!(resolved.connection.database, "shop");
    }

    #[test]
    fn snapshot_round_trips_through_the_reader() {
        let path = std::env::temp_dir().join(format!("schemaforge-snapshot-{}.json", Uuid::new_v4()));
        let schema = DatabaseSchema {
            schema_version: SCHEMA_VERSION.to_string(),
            dialect: schemaforge_core::Dialect::Postgres,
            database: Some("shop".to_string()),
            tables: Vec::new(),
        };
        std::fs::write(&path, serde_json::to_string(&schema).expect("json")).expect("write");
        let read = read_snapshot(&path).expect("read");
        assert_eq!(read.database.as_deref(), Some("shop"));
        assert!(read_snapshot(Path::new("/nonexistent/schema.json")).is_err());
        std::fs::remove_file(&path).ok();
    }
}
