use std::fs;
use std::path::PathBuf;

use regex::Regex;
use serde_json::json;

use schemaforge_core::{
    ColumnInfo, DatabaseSchema, Dialect, ExportSettings, NullHandling, SCHEMA_VERSION, TableInfo,
};
use schemaforge_export::{
    ExportEngine, ExportStatus, MemoryRowSource, NO_DATA_MARKER, Row, SUMMARY_FILE,
};

fn temp_out_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("schemaforge-{label}-{}", uuid::Uuid::new_v4()))
}

fn users_table(dialect: Dialect) -> TableInfo {
    let (text, timestamp) = match dialect {
        Dialect::MySql => ("varchar", "datetime"),
        _ => ("character varying", "timestamp with time zone"),
    };
    let mut id = ColumnInfo::new("id", "integer", 1);
    id.nullable = false;
    id.is_primary_key = true;
    TableInfo {
        name: "users".to_string(),
        schema_name: "public".to_string(),
        comment: None,
        columns: vec![
            id,
            ColumnInfo::new("email", text, 2),
            ColumnInfo::new("nickname", "text", 3),
            ColumnInfo::new("active", "boolean", 4),
            ColumnInfo::new("created_at", timestamp, 5),
        ],
        primary_keys: vec!["id".to_string()],
        foreign_keys: Vec::new(),
        indexes: Vec::new(),
    }
}

fn schema_for(dialect: Dialect) -> DatabaseSchema {
    DatabaseSchema {
        schema_version: SCHEMA_VERSION.to_string(),
        dialect,
        database: Some("shop".to_string()),
        tables: vec![users_table(dialect)],
    }
}

fn schema() -> DatabaseSchema {
    schema_for(Dialect::Postgres)
}

fn user_row(id: u64) -> Row {
    let value = json!({
        "id": id,
        "email": format!("person{id}@corp.test"),
        "nickname": null,
        "active": id % 2 == 0,
        "created_at": "2024-01-02T03:04:05+00:00",
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn settings(batch_size: usize) -> ExportSettings {
    ExportSettings {
        batch_size,
        ..ExportSettings::default()
    }
}

#[tokio::test]
async fn empty_table_writes_header_file_and_summary() {
    let dir = temp_out_dir("export-empty");
    let source = MemoryRowSource::new(Dialect::Postgres).with_rows("users", Vec::new());
    let engine = ExportEngine::new(settings(1000), &dir);

    let report = engine
        .export_tables(&source, &schema(), &["users".to_string()])
        .await
        .expect("export");

    let users = &report.tables[0];
    assert_eq!(users.rows, 0);
    assert_eq!(users.batches, 0);
    assert_eq!(users.status, ExportStatus::Complete);
    let body = fs::read_to_string(dir.join("insert_users.sql")).expect("file");
    assert!(body.starts_with("-- Generated INSERT statements\n"));
    assert!(body.contains(NO_DATA_MARKER));
    assert!(!body.contains("INSERT INTO"));

    let summary = fs::read_to_string(dir.join(SUMMARY_FILE)).expect("summary");
    assert!(summary.contains("| users | 0 | 0 | complete |"));
    assert_eq!(report.file_count, 2);
    assert_eq!(report.output_paths.last(), Some(&report.summary_path));

    fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn rows_split_into_numbered_batches() {
    let dir = temp_out_dir("export-batches");
    let rows: Vec<Row> = (1..=5).map(user_row).collect();
    let source = MemoryRowSource::new(Dialect::Postgres).with_rows("users", rows);
    let engine = ExportEngine::new(settings(2), &dir);

    let report = engine.export_tables(&source, &schema(), &[]).await.expect("export");

    let users = &report.tables[0];
    assert_eq!(users.rows, 5);
    assert_eq!(users.batches, 3);
    assert_eq!(report.total_rows, 5);

    let mut counted = 0;
    for part in 1..=3 {
        let body = fs::read_to_string(dir.join(format!("insert_users_part{part}.sql")))
            .expect("batch file");
        assert!(body.contains(&format!("-- Part {part} of 3")));
        assert!(body.contains("SET session_replication_role = replica;"));
        assert!(body.contains(
            "INSERT INTO \"public\".\"users\" (\"id\", \"email\", \"nickname\", \"active\", \"created_at\")\nVALUES\n"
        ));
        counted += body.lines().filter(|line| line.starts_with("  (")).count();
    }
    assert_eq!(counted, 5);
    assert!(!dir.join("insert_users.sql").exists());

    let first = fs::read_to_string(dir.join("insert_users_part1.sql")).expect("part1");
    assert!(first.contains("  (1, 'person1@corp.test', NULL, false, '2024-01-02T03:04:05.000Z'),"));
    assert!(first.contains("  (2, 'person2@corp.test', NULL, true, '2024-01-02T03:04:05.000Z');"));

    fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn masked_emails_never_leak() {
    let dir = temp_out_dir("export-mask");
    let mut rows: Vec<Row> = (1..=3).map(user_row).collect();
    rows[1].insert("email".to_string(), json!("user1@example.com"));
    let source = MemoryRowSource::new(Dialect::Postgres).with_rows("users", rows);
    let engine = ExportEngine::new(
        ExportSettings {
            enable_masking: true,
            ..ExportSettings::default()
        },
        &dir,
    );

    engine.export_tables(&source, &schema(), &[]).await.expect("export");

    let body = fs::read_to_string(dir.join("insert_users.sql")).expect("file");
    assert!(body.contains("-- Masking: enabled"));
    assert!(!body.contains("corp.test"));
    let pattern = Regex::new(r"'(user\d+@example\.com)'").expect("regex");
    let emails: Vec<_> = pattern
        .captures_iter(&body)
        .map(|captures| captures[1].to_string())
        .collect();
    assert_eq!(emails.len(), 3);
    assert_ne!(emails[1], "user1@example.com");

    fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn mysql_output_uses_default_nulls_and_alignment() {
    let dir = temp_out_dir("export-mysql");
    let mut rows: Vec<Row> = vec![user_row(1), user_row(100)];
    for row in &mut rows {
        row.insert("created_at".to_string(), json!("2024-01-02 03:04:05"));
    }
    let source = MemoryRowSource::new(Dialect::MySql).with_rows("users", rows);
    let engine = ExportEngine::new(
        ExportSettings {
            null_handling: NullHandling::Default,
            align_values: true,
            ..ExportSettings::default()
        },
        &dir,
    );

    engine
        .export_tables(&source, &schema_for(Dialect::MySql), &[])
        .await
        .expect("export");

    let body = fs::read_to_string(dir.join("insert_users.sql")).expect("file");
    assert!(body.contains("SET FOREIGN_KEY_CHECKS = 0;\nSET AUTOCOMMIT = 0;\nSTART TRANSACTION;"));
    assert!(body.contains("INSERT INTO `users` (`id`, `email`, `nickname`, `active`, `created_at`)"));
    assert!(body.contains("  (1  , 'person1@corp.test'  , DEFAULT, 0, '2024-01-02T03:04:05.000Z'),"));
    assert!(body.contains("  (100, 'person100@corp.test', DEFAULT, 1, '2024-01-02T03:04:05.000Z');"));
    assert!(body.contains("COMMIT;\nSET FOREIGN_KEY_CHECKS = 1;"));

    fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn failures_are_recorded_per_table() {
    let dir = temp_out_dir("export-failures");
    let source = MemoryRowSource::new(Dialect::Postgres).failing("users");
    let engine = ExportEngine::new(settings(10), &dir);

    let report = engine
        .export_tables(&source, &schema(), &["users".to_string(), "ghosts".to_string()])
        .await
        .expect("export");

    assert_eq!(report.table_count, 0);
    assert!(report.tables.iter().all(|table| table.status == ExportStatus::Failed));
    assert_eq!(report.tables[1].error.as_deref(), Some("table not found in schema"));
    let summary = fs::read_to_string(&report.summary_path).expect("summary");
    assert!(summary.contains("| ghosts | 0 | 0 | failed | table not found in schema |"));

    fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn unwritable_batch_marks_table_partial() {
    let dir = temp_out_dir("export-partial");
    fs::create_dir_all(dir.join("insert_users_part2.sql")).expect("blocking dir");
    let rows: Vec<Row> = (1..=4).map(user_row).collect();
    let source = MemoryRowSource::new(Dialect::Postgres).with_rows("users", rows);
    let engine = ExportEngine::new(settings(2), &dir);

    let report = engine.export_tables(&source, &schema(), &[]).await.expect("export");

    let users = &report.tables[0];
    assert_eq!(users.status, ExportStatus::Partial);
    assert_eq!(users.batches, 1);
    assert_eq!(users.files.len(), 1);
    assert!(users.error.as_deref().is_some_and(|error| error.contains("insert_users_part2.sql")));
    assert!(report.summary_path.is_file());

    fs::remove_dir_all(&dir).ok();
}
