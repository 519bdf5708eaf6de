//! `CREATE TABLE` scripts for the selected tables.
//!
//! Each table is planned independently into a [`TableDdl`]; the engine
//! collects the plans and [`render_script`] joins them into one file with the
//! foreign keys added last, so creation order never matters.

use std::collections::BTreeSet;

use schemaforge_core::{ColumnInfo, Dialect, SqlOptions, TableInfo, TypeResolver};

use crate::generators::single_column_foreign_keys;

const SEPARATOR: &str = "-- ===================================";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDdl {
    pub name: String,
    pub ddl_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    /// Modifier appended after the type (`AUTO_INCREMENT`, `IDENTITY(1,1)`).
    pub identity: Option<&'static str>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDdl {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDdl {
    pub name: String,
    pub column: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDdl {
    pub schema: String,
    pub name: String,
    pub comment: Option<String>,
    pub columns: Vec<ColumnDdl>,
    pub primary_key: Vec<String>,
    pub unique_columns: Vec<String>,
    pub indexes: Vec<IndexDdl>,
    pub foreign_keys: Vec<ForeignKeyDdl>,
}

pub fn plan_table_ddl(table: &TableInfo, dialect: Dialect, options: &SqlOptions) -> TableDdl {
    let columns = table
        .columns
        .iter()
        .map(|column| plan_column(column, dialect))
        .collect();

    let unique_columns = table
        .columns
        .iter()
        .filter(|column| column.is_unique && !column.is_primary_key)
        .map(|column| column.name.clone())
        .collect();

    let foreign_keys: Vec<ForeignKeyDdl> = single_column_foreign_keys(table)
        .map(|fk| ForeignKeyDdl {
            name: format!("fk_{}_{}", table.name, fk.column_name),
            column: fk.column_name.clone(),
            target_schema: fk.target_schema.clone(),
            target_table: fk.target_table.clone(),
            target_column: fk.target_column.clone(),
            on_delete: fk.on_delete.clone(),
            on_update: fk.on_update.clone(),
        })
        .collect();

    let indexes = if options.include_indexes {
        plan_indexes(table, &foreign_keys)
    } else {
        Vec::new()
    };

    TableDdl {
        schema: table.schema_name.clone(),
        name: table.name.clone(),
        comment: table.comment.clone(),
        columns,
        primary_key: table.primary_keys.clone(),
        unique_columns,
        indexes,
        foreign_keys,
    }
}

fn plan_column(column: &ColumnInfo, dialect: Dialect) -> ColumnDdl {
    ColumnDdl {
        name: column.name.clone(),
        ddl_type: column_type(column, dialect),
        not_null: !column.nullable && !column.is_primary_key,
        default: column
            .default_value
            .as_deref()
            .and_then(|raw| format_sql_default(raw, column, dialect)),
        identity: match dialect {
            _ if !column.is_auto_increment => None,
            Dialect::Postgres => None,
            Dialect::MySql => Some("AUTO_INCREMENT"),
            Dialect::Mssql => Some("IDENTITY(1,1)"),
        },
        comment: column.comment.clone(),
    }
}

/// Declared secondary indexes plus one per foreign-key column not already covered.
fn plan_indexes(table: &TableInfo, foreign_keys: &[ForeignKeyDdl]) -> Vec<IndexDdl> {
    let mut indexes = Vec::new();
    let mut covered = BTreeSet::new();

    for index in &table.indexes {
        if index.is_primary || index.columns.is_empty() {
            continue;
        }
        if let Some(first) = index.columns.first() {
            covered.insert(first.clone());
        }
        // Single-column unique indexes are emitted as table constraints.
        let single_unique = index.is_unique
            && index.columns.len() == 1
            && table
                .column(&index.columns[0])
                .is_some_and(|column| column.is_unique);
        if single_unique {
            continue;
        }
        indexes.push(IndexDdl {
            name: index.name.clone(),
            columns: index.columns.clone(),
            unique: index.is_unique,
        });
    }

    for fk in foreign_keys {
        let is_pk = table.primary_keys.iter().any(|pk| *pk == fk.column);
        if is_pk || covered.contains(&fk.column) {
            continue;
        }
        covered.insert(fk.column.clone());
        indexes.push(IndexDdl {
            name: format!("idx_{}_{}", table.name, fk.column),
            columns: vec![fk.column.clone()],
            unique: false,
        });
    }
    indexes
}

/// DDL type token including length, precision and enum members.
pub fn column_type(column: &ColumnInfo, dialect: Dialect) -> String {
    let mapping = TypeResolver::resolve_column(column, dialect);
    let base = mapping.sql_ddl_type.clone();

    if column.is_auto_increment && dialect == Dialect::Postgres && mapping.is_numeric() {
        return if matches!(base.as_str(), "BIGINT") {
            "BIGSERIAL".to_string()
        } else {
            "SERIAL".to_string()
        };
    }

    if mapping.is_enum() && dialect == Dialect::MySql {
        let values = column.enum_values.clone().unwrap_or_else(|| {
            schemaforge_core::naming::parse_enum_values(&column.native_type)
        });
        if !values.is_empty() {
            let members: Vec<String> = values.iter().map(|value| sql_string(value)).collect();
            return format!("ENUM({})", members.join(", "));
        }
    }

    match base.as_str() {
        "VARCHAR" | "CHAR" => match column.max_length {
            Some(length) if length > 0 => format!("{base}({length})"),
            // Postgres accepts unbounded VARCHAR; the others need a length.
            _ if dialect == Dialect::Postgres || base == "CHAR" => base,
            _ => format!("{base}(255)"),
        },
        "DECIMAL" => match (column.numeric_precision, column.numeric_scale) {
            (Some(precision), Some(scale)) => format!("{base}({precision}, {scale})"),
            (Some(precision), None) => format!("{base}({precision})"),
            _ => base,
        },
        _ => base,
    }
}

/// Default clause value, or `None` when the default is implied by the type.
pub fn format_sql_default(raw: &str, column: &ColumnInfo, dialect: Dialect) -> Option<String> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    if trimmed.is_empty() || lower.starts_with("nextval(") {
        return None;
    }
    if lower == "null" {
        return Some("NULL".to_string());
    }
    if lower.contains("current_timestamp") || lower.starts_with("now(") {
        return Some("CURRENT_TIMESTAMP".to_string());
    }
    if lower == "current_date" {
        return Some("CURRENT_DATE".to_string());
    }

    let mapping = TypeResolver::resolve_column(column, dialect);
    let literal = strip_cast(trimmed);

    if mapping.host_type == "boolean" {
        let truthy = matches!(
            unquote(literal).to_ascii_lowercase().as_str(),
            "true" | "1" | "t" | "b'1'"
        );
        return Some(match (dialect, truthy) {
            (Dialect::Postgres, true) => "true".to_string(),
            (Dialect::Postgres, false) => "false".to_string(),
            (_, true) => "1".to_string(),
            (_, false) => "0".to_string(),
        });
    }
    if mapping.is_numeric() && unquote(literal).parse::<f64>().is_ok() {
        return Some(unquote(literal).to_string());
    }
    if literal.ends_with(')') && !literal.starts_with('\'') {
        // Database function call such as gen_random_uuid().
        return Some(literal.to_string());
    }
    Some(sql_string(unquote(literal)))
}

fn strip_cast(raw: &str) -> &str {
    match raw.find("::") {
        Some(position) => raw[..position].trim(),
        None => raw,
    }
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
        .unwrap_or(raw)
}

fn sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Complete script for `tables` in the given order.
pub fn render_script(
    tables: &[TableDdl],
    dialect: Dialect,
    options: &SqlOptions,
    generated_at: &str,
) -> String {
    let mut lines: Vec<String> = vec![
        "-- Generated CREATE TABLE scripts".to_string(),
        format!("-- Dialect: {}", dialect.as_str().to_uppercase()),
        format!("-- Generated at: {generated_at}"),
        format!("-- Total tables: {}", tables.len()),
        String::new(),
    ];

    match dialect {
        Dialect::MySql => {
            lines.push("-- MySQL specific settings".to_string());
            lines.push("SET FOREIGN_KEY_CHECKS = 0;".to_string());
            lines.push("SET SQL_MODE = \"NO_AUTO_VALUE_ON_ZERO\";".to_string());
            lines.push("SET AUTOCOMMIT = 0;".to_string());
            lines.push("START TRANSACTION;".to_string());
            lines.push("SET time_zone = \"+00:00\";".to_string());
            lines.push(String::new());
        }
        Dialect::Postgres => {
            let schemas: BTreeSet<&str> = tables
                .iter()
                .map(|table| table.schema.as_str())
                .filter(|schema| !schema.is_empty() && *schema != "public")
                .collect();
            if !schemas.is_empty() {
                lines.push("-- PostgreSQL specific settings".to_string());
                for schema in schemas {
                    lines.push(format!(
                        "CREATE SCHEMA IF NOT EXISTS {};",
                        dialect.quote_ident(schema)
                    ));
                }
                lines.push(String::new());
            }
        }
        Dialect::Mssql => {}
    }

    for (position, table) in tables.iter().enumerate() {
        render_table(&mut lines, table, dialect, options);
        if position + 1 < tables.len() {
            lines.push(String::new());
            lines.push(SEPARATOR.to_string());
            lines.push(String::new());
        }
    }

    let foreign_keys: Vec<(&TableDdl, &ForeignKeyDdl)> = tables
        .iter()
        .flat_map(|table| table.foreign_keys.iter().map(move |fk| (table, fk)))
        .collect();
    if !foreign_keys.is_empty() {
        lines.push(String::new());
        lines.push(SEPARATOR.to_string());
        lines.push("-- FOREIGN KEY CONSTRAINTS".to_string());
        lines.push(SEPARATOR.to_string());
        lines.push(String::new());
        for (table, fk) in foreign_keys {
            render_foreign_key(&mut lines, table, fk, dialect);
        }
    }

    if dialect == Dialect::MySql {
        lines.push(String::new());
        lines.push("SET FOREIGN_KEY_CHECKS = 1;".to_string());
        lines.push("COMMIT;".to_string());
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn table_name(table: &TableDdl, dialect: Dialect) -> String {
    match dialect {
        Dialect::MySql => dialect.quote_ident(&table.name),
        _ => dialect.qualified_table(&table.schema, &table.name),
    }
}

fn render_table(lines: &mut Vec<String>, table: &TableDdl, dialect: Dialect, options: &SqlOptions) {
    let name = table_name(table, dialect);

    if options.include_comments {
        lines.push(format!("-- Table: {name}"));
        if let Some(comment) = &table.comment {
            lines.push(format!("-- {comment}"));
        }
        lines.push(String::new());
    }
    if options.include_drop_if_exists {
        lines.push(format!("DROP TABLE IF EXISTS {name};"));
        lines.push(String::new());
    }

    let create = if options.include_create_if_not_exists && dialect != Dialect::Mssql {
        "CREATE TABLE IF NOT EXISTS"
    } else {
        "CREATE TABLE"
    };
    lines.push(format!("{create} {name} ("));

    let mut definitions: Vec<String> = table
        .columns
        .iter()
        .map(|column| column_definition(column, dialect, options))
        .collect();
    if !table.primary_key.is_empty() {
        let columns: Vec<String> = table
            .primary_key
            .iter()
            .map(|column| dialect.quote_ident(column))
            .collect();
        definitions.push(format!(
            "  CONSTRAINT {} PRIMARY KEY ({})",
            dialect.quote_ident(&format!("pk_{}", table.name)),
            columns.join(", ")
        ));
    }
    for column in &table.unique_columns {
        definitions.push(format!(
            "  CONSTRAINT {} UNIQUE ({})",
            dialect.quote_ident(&format!("uk_{}_{column}", table.name)),
            dialect.quote_ident(column)
        ));
    }
    lines.push(definitions.join(",\n"));

    if dialect == Dialect::MySql {
        let mut table_options = format!(
            ") ENGINE={} DEFAULT CHARSET={} COLLATE={}",
            options.mysql_engine, options.mysql_charset, options.mysql_collation
        );
        if options.include_comments {
            if let Some(comment) = &table.comment {
                table_options.push_str(&format!(" COMMENT={}", sql_string(comment)));
            }
        }
        lines.push(format!("{table_options};"));
    } else {
        lines.push(");".to_string());
    }

    if options.include_comments && dialect == Dialect::Postgres {
        let mut comments = Vec::new();
        if let Some(comment) = &table.comment {
            comments.push(format!("COMMENT ON TABLE {name} IS {};", sql_string(comment)));
        }
        for column in &table.columns {
            if let Some(comment) = &column.comment {
                comments.push(format!(
                    "COMMENT ON COLUMN {name}.{} IS {};",
                    dialect.quote_ident(&column.name),
                    sql_string(comment)
                ));
            }
        }
        if !comments.is_empty() {
            lines.push(String::new());
            lines.extend(comments);
        }
    }

    for index in &table.indexes {
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|column| dialect.quote_ident(column))
            .collect();
        lines.push(String::new());
        lines.push(format!(
            "CREATE {}INDEX {} ON {name} ({});",
            if index.unique { "UNIQUE " } else { "" },
            dialect.quote_ident(&index.name),
            columns.join(", ")
        ));
    }
}

fn column_definition(column: &ColumnDdl, dialect: Dialect, options: &SqlOptions) -> String {
    let mut parts = vec![
        format!("  {}", dialect.quote_ident(&column.name)),
        column.ddl_type.clone(),
    ];
    if column.not_null {
        parts.push("NOT NULL".to_string());
    }
    if let Some(default) = &column.default {
        parts.push(format!("DEFAULT {default}"));
    }
    if let Some(identity) = column.identity {
        parts.push(identity.to_string());
    }
    if dialect == Dialect::MySql && options.include_comments {
        if let Some(comment) = &column.comment {
            parts.push(format!("COMMENT {}", sql_string(comment)));
        }
    }
    parts.join(" ")
}

fn render_foreign_key(lines: &mut Vec<String>, table: &TableDdl, fk: &ForeignKeyDdl, dialect: Dialect) {
    let target = match dialect {
        Dialect::MySql => dialect.quote_ident(&fk.target_table),
        _ => dialect.qualified_table(&fk.target_schema, &fk.target_table),
    };
    lines.push(format!(
        "-- Foreign key: {}.{} -> {}.{}",
        table.name, fk.column, fk.target_table, fk.target_column
    ));
    let mut statement = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {target} ({})",
        table_name(table, dialect),
        dialect.quote_ident(&fk.name),
        dialect.quote_ident(&fk.column),
        dialect.quote_ident(&fk.target_column)
    );
    if let Some(action) = &fk.on_delete {
        statement.push_str(&format!(" ON DELETE {}", action.to_uppercase()));
    }
    if let Some(action) = &fk.on_update {
        statement.push_str(&format!(" ON UPDATE {}", action.to_uppercase()));
    }
    statement.push(';');
    lines.push(statement);
    lines.push(String::new());
}
