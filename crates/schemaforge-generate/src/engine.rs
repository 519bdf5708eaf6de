use std::any::Any;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use schemaforge_core::{
    DatabaseSchema, Dialect, GenerationConfig, SchemaIssue, TableInfo, filter_tables,
    validate_schema,
};
use schemaforge_introspect::SchemaIntrospector;

use crate::errors::GenerationError;
use crate::generators::controller::{plan_controller, render_controller};
use crate::generators::crud::CrudShape;
use crate::generators::dto::{plan_dtos, render_create_dto, render_query_dto, render_update_dto};
use crate::generators::entity::{EntityStyle, plan_entity, render_entity};
use crate::generators::module::{ModuleRegistration, render_module};
use crate::generators::repository::{plan_repository, render_repository};
use crate::generators::service::render_service;
use crate::generators::sql::{TableDdl, plan_table_ddl, render_script};
use crate::generators::test_suites::{render_controller_spec, render_service_spec};
use crate::generators::{RunTables, TableContext};
use crate::index::write_entity_index;
use crate::model::{
    ArtifactKind, ArtifactResult, GenerationIssue, GenerationReport, TableManifest, TableStatus,
};
use crate::paths::{TableLayout, shared_entity_path, write_text};
use crate::wiring::write_app_module;

/// Linear run stages; a run never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Idle,
    SchemaLoaded,
    Filtered,
    PerTableGeneration,
    Wiring,
    Done,
}

impl GenerationStage {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStage::Idle => "idle",
            GenerationStage::SchemaLoaded => "schema_loaded",
            GenerationStage::Filtered => "filtered",
            GenerationStage::PerTableGeneration => "per_table_generation",
            GenerationStage::Wiring => "wiring",
            GenerationStage::Done => "done",
        }
    }
}

/// Entry point for turning a schema snapshot into source artifacts.
#[derive(Debug, Clone)]
pub struct GenerationEngine {
    config: GenerationConfig,
}

/// Everything one table contributed, applied to the report only on success.
#[derive(Debug, Default)]
struct TableOutput {
    artifacts: Vec<ArtifactResult>,
    warnings: Vec<GenerationIssue>,
    registration: Option<ModuleRegistration>,
    ddl: Option<TableDdl>,
}

impl TableOutput {
    fn written(&mut self, table: &TableInfo, kind: ArtifactKind, path: PathBuf) {
        self.artifacts.push(ArtifactResult {
            table_name: table.name.clone(),
            kind,
            output_path: path,
            reused: false,
        });
    }
}

impl GenerationEngine {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Introspect through `introspector`, then [`run`](Self::run).
    pub async fn generate_from(
        &self,
        introspector: &dyn SchemaIntrospector,
    ) -> Result<GenerationReport, GenerationError> {
        let schema = introspector.database_schema().await?;
        self.run(&schema)
    }

    pub fn run(&self, schema: &DatabaseSchema) -> Result<GenerationReport, GenerationError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut report = GenerationReport::new(run_id.clone(), schema.dialect);
        let mut stage = GenerationStage::Idle;

        info!(
            run_id = %run_id,
            dialect = %schema.dialect,
            tables = schema.tables.len(),
            "generation started"
        );

        enter(&mut stage, GenerationStage::SchemaLoaded);
        let issues = validate_schema(schema).map_err(|err| match err {
            schemaforge_core::Error::InvalidSchema(message) => GenerationError::InvalidSchema(message),
            other => GenerationError::Introspection(other),
        })?;
        for issue in issues {
            record_issue(&mut report, schema_issue(issue));
        }

        enter(&mut stage, GenerationStage::Filtered);
        let selected = filter_tables(
            &schema.tables,
            &self.config.tables.include,
            &self.config.tables.exclude,
        );
        info!(
            selected = selected.len(),
            skipped = schema.tables.len() - selected.len(),
            "tables filtered"
        );
        self.prepare_output_roots()?;

        enter(&mut stage, GenerationStage::PerTableGeneration);
        let run = RunTables::new(&selected, &self.config);
        let mut registrations = Vec::new();
        let mut ddl = Vec::new();

        for table in selected.iter().copied() {
            let table_start = Instant::now();
            info!(schema = %table.schema_name, table = %table.name, "generating table");

            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                self.generate_table(table, schema.dialect, &run)
            }));
            let failure = match outcome {
                Ok(Ok(output)) => {
                    let mut manifest = manifest(table, TableStatus::Generated, None);
                    for artifact in &output.artifacts {
                        report.record_artifact(artifact);
                    }
                    manifest.artifacts = output.artifacts;
                    for issue in output.warnings {
                        record_issue(&mut report, issue);
                    }
                    registrations.extend(output.registration);
                    ddl.extend(output.ddl);
                    info!(
                        schema = %table.schema_name,
                        table = %table.name,
                        artifacts = manifest.artifacts.len(),
                        duration_ms = table_start.elapsed().as_millis() as u64,
                        "table generated"
                    );
                    report.record_table(manifest);
                    None
                }
                Ok(Err(err)) => Some(err.to_string()),
                Err(panic) => Some(panic_message(panic)),
            };
            if let Some(error) = failure {
                warn!(
                    schema = %table.schema_name,
                    table = %table.name,
                    error = %error,
                    "table generation failed"
                );
                report.record_table(manifest(table, TableStatus::Failed, Some(error)));
            }
        }

        if self.config.features.sql && !ddl.is_empty() {
            let path = self
                .config
                .paths
                .sql
                .join(format!("create_tables_{}.sql", schema.dialect.as_str()));
            let generated_at = chrono::Utc::now().to_rfc3339();
            write_text(
                &path,
                &render_script(&ddl, schema.dialect, &self.config.sql, &generated_at),
            )?;
            debug!(path = %path.display(), tables = ddl.len(), "wrote sql script");
            report.record_artifact(&run_artifact(ArtifactKind::SqlDdl, path, false));
        }

        enter(&mut stage, GenerationStage::Wiring);
        if self.config.features.crud {
            if let Some(outcome) = write_app_module(&self.config.paths.base_output, &registrations)? {
                report.record_artifact(&run_artifact(
                    ArtifactKind::AppModule,
                    outcome.path,
                    !outcome.changed,
                ));
            }
        }
        if self.config.features.entities
            && self.config.features.generate_index
            && report.tables_processed > 0
        {
            let (path, count) = write_entity_index(&self.config.paths.entities)?;
            info!(path = %path.display(), entities = count, "entity index written");
            report.record_artifact(&run_artifact(ArtifactKind::EntityIndex, path, false));
        }

        enter(&mut stage, GenerationStage::Done);
        info!(
            run_id = %run_id,
            tables_processed = report.tables_processed,
            tables_failed = report.tables_failed,
            files_generated = report.files_generated,
            warnings = report.warnings.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "generation completed"
        );
        Ok(report)
    }

    fn prepare_output_roots(&self) -> Result<(), GenerationError> {
        let features = &self.config.features;
        let paths = &self.config.paths;
        let mut roots: Vec<&Path> = Vec::new();
        if features.entities {
            roots.push(&paths.entities);
        }
        if features.crud {
            roots.push(&paths.crud);
            roots.push(&paths.base_output);
        }
        if features.sql {
            roots.push(&paths.sql);
        }
        for root in roots {
            std::fs::create_dir_all(root).map_err(|source| GenerationError::OutputPath {
                path: root.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    fn generate_table(
        &self,
        table: &TableInfo,
        dialect: Dialect,
        run: &RunTables<'_>,
    ) -> Result<TableOutput, GenerationError> {
        let config = &self.config;
        let mut ctx = TableContext::new(table, dialect, config);
        let mut output = TableOutput::default();

        for field in ctx.fields.iter().filter(|field| field.mapping.is_fallback) {
            let column = table
                .column(&field.column)
                .map(|column| column.native_type.as_str())
                .unwrap_or_default();
            output.warnings.push(
                GenerationIssue::warning(
                    "type_fallback",
                    format!("unmapped type '{column}' generated as '{}'", field.host_type),
                )
                .on_table(&table.schema_name, &table.name)
                .on_column(&field.column),
            );
        }

        if config.features.entities {
            let path = shared_entity_path(&config.paths, &ctx.layout.stem);
            let plan = plan_entity(&ctx, run, &path, EntityStyle::shared(config));
            omitted_relation_warnings(table, &plan.omitted_relations, &mut output);
            write_text(&path, &render_entity(&plan))?;
            output.written(table, ArtifactKind::Entity, path);
            // CRUD artifacts must see the file that was just written.
            ctx.layout = TableLayout::resolve(table, &config.paths);
        }

        if config.features.crud {
            self.generate_crud(&ctx, run, &mut output)?;
        }

        if config.features.sql {
            output.ddl = Some(plan_table_ddl(table, dialect, &config.sql));
        }
        Ok(output)
    }

    fn generate_crud(
        &self,
        ctx: &TableContext<'_>,
        run: &RunTables<'_>,
        output: &mut TableOutput,
    ) -> Result<(), GenerationError> {
        let config = &self.config;
        let table = ctx.table;
        let layout = &ctx.layout;

        if ctx.id_field().is_none() {
            output.warnings.push(
                GenerationIssue::warning(
                    "no_single_primary_key",
                    format!(
                        "table has {} primary key columns; routes use '{}'",
                        table.primary_keys.len(),
                        ctx.id_property()
                    ),
                )
                .on_table(&table.schema_name, &table.name),
            );
        }

        if layout.shared_entity {
            if !config.features.entities {
                debug!(table = %table.name, path = %layout.entity_path.display(), "reusing shared entity");
                output.artifacts.push(ArtifactResult {
                    table_name: table.name.clone(),
                    kind: ArtifactKind::Entity,
                    output_path: layout.entity_path.clone(),
                    reused: true,
                });
            }
        } else {
            let plan = plan_entity(ctx, run, &layout.entity_path, EntityStyle::local(config));
            omitted_relation_warnings(table, &plan.omitted_relations, output);
            write_text(&layout.entity_path, &render_entity(&plan))?;
            output.written(table, ArtifactKind::Entity, layout.entity_path.clone());
        }

        let dto = config.crud.use_dto.then(|| plan_dtos(ctx));
        if let Some(plan) = &dto {
            let path = layout.dto_file("create");
            write_text(&path, &render_create_dto(plan))?;
            output.written(table, ArtifactKind::CreateDto, path);

            let path = layout.dto_file("update");
            write_text(&path, &render_update_dto(plan))?;
            output.written(table, ArtifactKind::UpdateDto, path);

            if let Some(query) = &plan.query {
                let path = layout.dto_file("query");
                write_text(&path, &render_query_dto(plan, query))?;
                output.written(table, ArtifactKind::QueryDto, path);
            }
        }

        let shape = CrudShape::new(ctx, dto.as_ref());

        let path = layout.file("repository");
        write_text(&path, &render_repository(&plan_repository(&shape)))?;
        output.written(table, ArtifactKind::Repository, path);

        let path = layout.file("service");
        write_text(&path, &render_service(&shape))?;
        output.written(table, ArtifactKind::Service, path);

        let path = layout.file("controller");
        write_text(&path, &render_controller(&plan_controller(&shape, &config.crud)))?;
        output.written(table, ArtifactKind::Controller, path);

        let path = layout.file("module");
        write_text(&path, &render_module(&shape))?;
        output.registration = Some(ModuleRegistration::new(
            &shape.module_class,
            &config.paths.base_output,
            &path,
        ));
        output.written(table, ArtifactKind::Module, path);

        if config.crud.generate_tests {
            let path = layout.file("service.spec");
            write_text(&path, &render_service_spec(&shape))?;
            output.written(table, ArtifactKind::ServiceTest, path);

            let path = layout.file("controller.spec");
            write_text(&path, &render_controller_spec(&shape))?;
            output.written(table, ArtifactKind::ControllerTest, path);
        }
        Ok(())
    }
}

fn enter(stage: &mut GenerationStage, next: GenerationStage) {
    debug!(from = stage.as_str(), to = next.as_str(), "generation stage");
    *stage = next;
}

fn manifest(table: &TableInfo, status: TableStatus, error: Option<String>) -> TableManifest {
    TableManifest {
        schema: table.schema_name.clone(),
        table: table.name.clone(),
        status,
        artifacts: Vec::new(),
        error,
    }
}

/// Artifact spanning every table of the run.
fn run_artifact(kind: ArtifactKind, path: PathBuf, reused: bool) -> ArtifactResult {
    ArtifactResult {
        table_name: "*".to_string(),
        kind,
        output_path: path,
        reused,
    }
}

fn omitted_relation_warnings(table: &TableInfo, columns: &[String], output: &mut TableOutput) {
    for column in columns {
        let issue = GenerationIssue::warning(
            "relation_omitted",
            "foreign key target has no entity in this run; kept as a scalar column",
        )
        .on_table(&table.schema_name, &table.name)
        .on_column(column);
        if !output
            .warnings
            .iter()
            .any(|existing| existing.code == issue.code && existing.column == issue.column)
        {
            output.warnings.push(issue);
        }
    }
}

fn schema_issue(issue: SchemaIssue) -> GenerationIssue {
    let mut converted = GenerationIssue::warning(&issue.code, issue.message);
    converted.table = Some(issue.table);
    converted.column = issue.column;
    converted
}

fn record_issue(report: &mut GenerationReport, issue: GenerationIssue) {
    log_issue(&issue);
    report.record_warning(issue);
}

fn log_issue(issue: &GenerationIssue) {
    warn!(
        code = %issue.code,
        schema = issue.schema.as_deref().unwrap_or(""),
        table = issue.table.as_deref().unwrap_or(""),
        column = issue.column.as_deref().unwrap_or(""),
        message = %issue.message
    );
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during table generation".to_string()
    }
}
