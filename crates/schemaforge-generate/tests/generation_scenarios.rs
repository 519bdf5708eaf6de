use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use schemaforge_core::{
    ColumnInfo, DatabaseSchema, Dialect, ForeignKeyInfo, GenerationConfig, OutputPaths, TableInfo,
};
use schemaforge_generate::entity_parser::schema_from_entities;
use schemaforge_generate::generators::dto::plan_dtos;
use schemaforge_generate::generators::entity::{EntityStyle, plan_entity};
use schemaforge_generate::generators::{RunTables, TableContext};
use schemaforge_generate::{ArtifactKind, GenerationEngine, TableStatus};
use schemaforge_introspect::{SchemaIntrospector, TableRef};

fn temp_out_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("schemaforge-{label}-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn config_in(dir: &Path) -> GenerationConfig {
    let mut config = GenerationConfig::default();
    config.paths = OutputPaths {
        base_output: dir.join("src"),
        entities: dir.join("src").join("entities"),
        crud: dir.join("src"),
        sql: dir.join("sql"),
        data_export: dir.join("data"),
    };
    config
}

fn not_null(name: &str, native: &str, ordinal: i32) -> ColumnInfo {
    let mut column = ColumnInfo::new(name, native, ordinal);
    column.nullable = false;
    column
}

fn serial_id() -> ColumnInfo {
    let mut id = not_null("id", "integer", 1);
    id.is_primary_key = true;
    id.is_auto_increment = true;
    id.default_value = Some("nextval('id_seq'::regclass)".to_string());
    id
}

fn varchar(name: &str, length: i64, ordinal: i32) -> ColumnInfo {
    let mut column = not_null(name, "character varying", ordinal);
    column.max_length = Some(length);
    column
}

fn customers() -> TableInfo {
    TableInfo {
        name: "customers".to_string(),
        schema_name: "public".to_string(),
        comment: None,
        columns: vec![
            serial_id(),
            varchar("name", 255, 2),
            varchar("email", 255, 3),
            varchar("status", 50, 4),
        ],
        primary_keys: vec!["id".to_string()],
        foreign_keys: Vec::new(),
        indexes: Vec::new(),
    }
}

fn orders() -> TableInfo {
    TableInfo {
        name: "orders".to_string(),
        schema_name: "public".to_string(),
        comment: None,
        columns: vec![serial_id(), not_null("customer_id", "integer", 2)],
        primary_keys: vec!["id".to_string()],
        foreign_keys: vec![ForeignKeyInfo {
            constraint_name: "orders_customer_id_fkey".to_string(),
            column_name: "customer_id".to_string(),
            target_schema: "public".to_string(),
            target_table: "customers".to_string(),
            target_column: "id".to_string(),
            on_delete: Some("CASCADE".to_string()),
            on_update: None,
        }],
        indexes: Vec::new(),
    }
}

fn users() -> TableInfo {
    TableInfo {
        name: "users".to_string(),
        schema_name: "public".to_string(),
        comment: None,
        columns: vec![serial_id(), varchar("email", 255, 2)],
        primary_keys: vec!["id".to_string()],
        foreign_keys: Vec::new(),
        indexes: Vec::new(),
    }
}

fn schema(tables: Vec<TableInfo>) -> DatabaseSchema {
    DatabaseSchema {
        schema_version: schemaforge_core::SCHEMA_VERSION.to_string(),
        dialect: Dialect::Postgres,
        database: Some("shop".to_string()),
        tables,
    }
}

#[test]
fn customers_entity_and_create_input_fields() {
    let dir = temp_out_dir("scenario1-plan");
    let config = config_in(&dir);
    let table = customers();
    let selected = vec![&table];
    let run = RunTables::new(&selected, &config);
    let ctx = TableContext::new(&table, Dialect::Postgres, &config);

    let entity_path = config.paths.entities.join("customers.entity.ts");
    let entity = plan_entity(&ctx, &run, &entity_path, EntityStyle::shared(&config));
    let fields: Vec<(&str, &str)> = entity
        .fields
        .iter()
        .map(|field| (field.property.as_str(), field.host_type.as_str()))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("id", "number"),
            ("name", "string"),
            ("email", "string"),
            ("status", "string"),
        ]
    );
    assert!(entity.related_imports.is_empty());
    assert!(entity.relations.is_empty());

    let dto = plan_dtos(&ctx);
    let inputs: Vec<&str> = dto
        .create_fields
        .iter()
        .map(|field| field.property.as_str())
        .collect();
    assert_eq!(inputs, vec!["name", "email", "status"]);
    assert!(dto.create_fields.iter().all(|field| !field.optional));
    assert!(dto.update_fields.iter().all(|field| field.optional));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn customers_run_writes_the_full_artifact_set() {
    let dir = temp_out_dir("scenario1-run");
    let config = config_in(&dir);
    let report = GenerationEngine::new(config)
        .run(&schema(vec![customers()]))
        .expect("run generation");

    assert_eq!(report.tables_processed, 1);
    assert_eq!(report.tables_failed, 0);

    let src = dir.join("src");
    let entity = fs::read_to_string(src.join("entities/customers.entity.ts")).expect("entity");
    assert!(entity.contains("@Entity('customers')"));
    assert!(entity.contains("export class Customers {"));
    assert!(!entity.contains("ManyToOne"));

    for file in [
        "customers/dto/create-customers.dto.ts",
        "customers/dto/update-customers.dto.ts",
        "customers/dto/query-customers.dto.ts",
        "customers/customers.repository.ts",
        "customers/customers.service.ts",
        "customers/customers.controller.ts",
        "customers/customers.module.ts",
        "app.module.ts",
        "entities/index.ts",
    ] {
        assert!(src.join(file).is_file(), "missing {file}");
    }
    assert!(!src.join("customers/entities/customers.entity.ts").exists());
    assert!(dir.join("sql/create_tables_postgres.sql").is_file());

    let repository =
        fs::read_to_string(src.join("customers/customers.repository.ts")).expect("repository");
    assert!(repository.contains("import { Customers } from '../entities/customers.entity';"));

    let controller =
        fs::read_to_string(src.join("customers/customers.controller.ts")).expect("controller");
    assert!(controller.contains("@Controller('customers')"));
    assert!(controller.contains("@Param('id', ParseIntPipe) id: number"));

    let manifest = report.manifest("customers").expect("manifest");
    assert_eq!(manifest.status, TableStatus::Generated);
    assert!(manifest.artifacts.iter().any(|a| a.kind == ArtifactKind::Controller));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn one_blocked_table_does_not_stop_the_run() {
    let dir = temp_out_dir("partial-run");
    let config = config_in(&dir);
    fs::create_dir_all(dir.join("src")).expect("src dir");
    fs::write(dir.join("src/users"), "not a directory").expect("blocking file");

    let report = GenerationEngine::new(config)
        .run(&schema(vec![customers(), users()]))
        .expect("run completes despite one failure");

    assert_eq!(report.tables_processed, 1);
    assert_eq!(report.tables_failed, 1);

    let customers = report.manifest("customers").expect("customers manifest");
    assert_eq!(customers.status, TableStatus::Generated);
    assert!(!customers.artifacts.is_empty());

    let users = report.manifest("users").expect("users manifest");
    assert_eq!(users.status, TableStatus::Failed);
    let error = users.error.as_deref().expect("failure carries its error");
    assert!(error.contains("io error"), "{error}");

    let json = serde_json::to_string(&report).expect("serialize report");
    assert!(json.contains("\"status\":\"failed\""), "{json}");
    assert!(json.contains(error));

    let script = fs::read_to_string(dir.join("sql/create_tables_postgres.sql")).expect("sql");
    assert!(script.contains("customers"));
    let app_module = fs::read_to_string(dir.join("src/app.module.ts")).expect("app module");
    assert!(app_module.contains("CustomersModule"));
    assert!(!app_module.contains("UsersModule"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn ddl_from_a_generated_entity_directory() {
    let dir = temp_out_dir("from-entities");
    let mut config = config_in(&dir);
    config.features.crud = false;
    config.features.sql = false;
    GenerationEngine::new(config)
        .run(&schema(vec![customers(), orders()]))
        .expect("write entities");

    let parsed = schema_from_entities(&dir.join("src/entities"), Dialect::Postgres)
        .expect("parse entity directory");
    let names: Vec<&str> = parsed.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["customers", "orders"]);

    let mut config = config_in(&dir);
    config.features.entities = false;
    config.features.crud = false;
    let report = GenerationEngine::new(config).run(&parsed).expect("ddl run");
    assert_eq!(report.tables_processed, 2);
    assert_eq!(report.tables_failed, 0);

    let script = fs::read_to_string(dir.join("sql/create_tables_postgres.sql")).expect("sql");
    assert!(script.contains("CREATE TABLE IF NOT EXISTS \"public\".\"customers\" ("));
    assert!(script.contains("  \"id\" SERIAL"));
    assert!(script.contains("  \"email\" VARCHAR(255) NOT NULL"));
    assert!(script.contains(
        "FOREIGN KEY (\"customer_id\") REFERENCES \"public\".\"customers\" (\"id\") ON DELETE CASCADE;"
    ));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn include_and_exclude_of_the_same_table_processes_nothing() {
    let dir = temp_out_dir("scenario3");
    let mut config = config_in(&dir);
    config.tables.include = vec!["users".to_string()];
    config.tables.exclude = vec!["users".to_string()];

    let report = GenerationEngine::new(config)
        .run(&schema(vec![users(), customers()]))
        .expect("run generation");

    assert_eq!(report.tables_processed, 0);
    assert_eq!(report.tables_failed, 0);
    assert!(report.per_table.is_empty());
    assert!(!dir.join("src/app.module.ts").exists());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn existing_shared_entity_is_reused_by_crud() {
    let dir = temp_out_dir("scenario4");
    let mut config = config_in(&dir);
    config.features.entities = false;

    let shared = dir.join("src/entities/orders.entity.ts");
    fs::create_dir_all(shared.parent().expect("parent")).expect("entities dir");
    let original = "import { Entity } from 'typeorm';\n\n@Entity('orders')\nexport class Orders {}\n";
    fs::write(&shared, original).expect("seed entity");

    let report = GenerationEngine::new(config)
        .run(&schema(vec![orders()]))
        .expect("run generation");

    assert_eq!(report.tables_processed, 1);
    assert!(!dir.join("src/orders/entities/orders.entity.ts").exists());
    assert_eq!(fs::read_to_string(&shared).expect("shared entity"), original);

    let repository =
        fs::read_to_string(dir.join("src/orders/orders.repository.ts")).expect("repository");
    assert!(repository.contains("import { Orders } from '../entities/orders.entity';"));

    let manifest = report.manifest("orders").expect("manifest");
    let entity = manifest
        .artifacts
        .iter()
        .find(|artifact| artifact.kind == ArtifactKind::Entity)
        .expect("entity artifact");
    assert!(entity.reused);
    assert_eq!(entity.output_path, shared);
    assert!(!report.output_paths.contains(&shared));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn relations_resolve_between_tables_in_the_run() {
    let dir = temp_out_dir("relations");
    let config = config_in(&dir);
    let report = GenerationEngine::new(config)
        .run(&schema(vec![customers(), orders()]))
        .expect("run generation");
    assert_eq!(report.tables_processed, 2);

    let orders = fs::read_to_string(dir.join("src/entities/orders.entity.ts")).expect("orders");
    assert!(orders.contains("import { Customers } from './customers.entity';"));
    assert!(orders.contains("@ManyToOne(() => Customers, { onDelete: 'CASCADE' })"));
    assert!(orders.contains("@JoinColumn({ name: 'customer_id' })"));

    let customers =
        fs::read_to_string(dir.join("src/entities/customers.entity.ts")).expect("customers");
    assert!(customers.contains("@OneToMany(() => Orders"));

    let sql = fs::read_to_string(dir.join("sql/create_tables_postgres.sql")).expect("sql");
    assert!(sql.contains("-- Total tables: 2"));
    assert!(sql.contains("ADD CONSTRAINT \"fk_orders_customer_id\""));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn dangling_foreign_keys_are_reported_and_kept_scalar() {
    let dir = temp_out_dir("dangling");
    let config = config_in(&dir);
    let report = GenerationEngine::new(config)
        .run(&schema(vec![orders()]))
        .expect("run generation");

    assert_eq!(report.warnings_by_code.get("dangling_foreign_key"), Some(&1));
    assert!(report.warnings_by_code.contains_key("relation_omitted"));
    let entity = fs::read_to_string(dir.join("src/entities/orders.entity.ts")).expect("entity");
    assert!(!entity.contains("ManyToOne"));
    assert!(entity.contains("customerId: number;"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn wiring_merge_is_idempotent_across_runs() {
    let dir = temp_out_dir("wiring");
    let config = config_in(&dir);
    let engine = GenerationEngine::new(config);
    let schema = schema(vec![customers(), users()]);

    engine.run(&schema).expect("first run");
    let app_module = dir.join("src/app.module.ts");
    let first = fs::read_to_string(&app_module).expect("app module");
    assert_eq!(first.matches("import { CustomersModule }").count(), 1);
    assert_eq!(first.matches("    UsersModule,").count(), 1);

    let report = engine.run(&schema).expect("second run");
    let second = fs::read_to_string(&app_module).expect("app module");
    assert_eq!(first, second);
    assert!(!report.output_paths.contains(&app_module));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn wiring_keeps_hand_written_content() {
    let dir = temp_out_dir("wiring-existing");
    let config = config_in(&dir);
    let app_module = dir.join("src/app.module.ts");
    fs::create_dir_all(app_module.parent().expect("parent")).expect("src dir");
    let existing = "import { Module } from '@nestjs/common';\nimport { HealthModule } from './health/health.module';\n\n@Module({\n  imports: [\n    HealthModule,\n  ],\n  providers: [],\n})\nexport class AppModule {}\n";
    fs::write(&app_module, existing).expect("seed app module");

    GenerationEngine::new(config)
        .run(&schema(vec![users()]))
        .expect("run generation");

    let merged = fs::read_to_string(&app_module).expect("app module");
    assert!(merged.contains(
        "import { HealthModule } from './health/health.module';\nimport { UsersModule } from './users/users.module';"
    ));
    assert!(merged.contains("    HealthModule,\n    UsersModule,\n  ],\n  providers: [],"));

    fs::remove_dir_all(&dir).ok();
}

struct FakeIntrospector {
    listing_fails: bool,
}

#[async_trait]
impl SchemaIntrospector for FakeIntrospector {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn list_tables(&self) -> schemaforge_core::Result<Vec<TableRef>> {
        if self.listing_fails {
            return Err(schemaforge_core::Error::Db("connection reset".to_string()));
        }
        Ok(vec![TableRef {
            schema: "public".to_string(),
            name: "customers".to_string(),
            comment: None,
        }])
    }

    async fn table_info(&self, _name: &str, _schema: &str) -> schemaforge_core::Result<TableInfo> {
        Ok(customers())
    }
}

#[tokio::test]
async fn generate_from_introspector() {
    let dir = temp_out_dir("introspector");
    let engine = GenerationEngine::new(config_in(&dir));

    let report = engine
        .generate_from(&FakeIntrospector { listing_fails: false })
        .await
        .expect("generate");
    assert_eq!(report.tables_processed, 1);

    let err = engine
        .generate_from(&FakeIntrospector { listing_fails: true })
        .await
        .expect_err("listing failure is fatal");
    assert!(err.to_string().contains("table listing failed"));

    fs::remove_dir_all(&dir).ok();
}
