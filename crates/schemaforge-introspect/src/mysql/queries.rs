use sqlx::MySqlPool;

use schemaforge_core::{Error, Result};

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

const SYSTEM_SCHEMAS: &str = "'information_schema', 'mysql', 'performance_schema', 'sys'";

pub async fn fetch_database_name(pool: &MySqlPool) -> Result<Option<String>> {
    sqlx::query_scalar::<_, Option<String>>("SELECT CAST(DATABASE() AS CHAR)")
        .fetch_one(pool)
        .await
        .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawTable {
    pub schema_name: String,
    pub table_name: String,
    pub comment: Option<String>,
}

pub async fn list_tables(
    pool: &MySqlPool,
    schemas: Option<&[String]>,
    include_system_schemas: bool,
) -> Result<Vec<RawTable>> {
    let schema_filter = match schemas {
        Some(list) if !list.is_empty() => {
            let placeholders = vec!["?"; list.len()].join(", ");
            format!("TABLE_SCHEMA IN ({placeholders})")
        }
        _ => "TABLE_SCHEMA = DATABASE()".to_string(),
    };
    let system_filter = if include_system_schemas {
        String::new()
    } else {
        format!("AND TABLE_SCHEMA NOT IN ({SYSTEM_SCHEMAS})")
    };
    let sql = format!(
        r#"
        SELECT
          CAST(TABLE_SCHEMA AS CHAR) AS schema_name,
          CAST(TABLE_NAME AS CHAR) AS table_name,
          CAST(NULLIF(TABLE_COMMENT, '') AS CHAR) AS comment
        FROM information_schema.TABLES
        WHERE TABLE_TYPE = 'BASE TABLE'
          AND {schema_filter}
          {system_filter}
        ORDER BY TABLE_SCHEMA, TABLE_NAME
        "#
    );

    let mut query = sqlx::query_as::<_, RawTable>(&sql);
    if let Some(list) = schemas {
        for schema in list {
            query = query.bind(schema);
        }
    }
    query.fetch_all(pool).await.map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawColumn {
    pub name: String,
    pub data_type: String,
    pub column_type: String,
    pub is_nullable: i64,
    pub default_value: Option<String>,
    pub max_length: Option<i64>,
    pub numeric_precision: Option<i64>,
    pub numeric_scale: Option<i64>,
    pub comment: Option<String>,
    pub extra: Option<String>,
    pub ordinal_position: i64,
}

pub async fn list_columns(
    pool: &MySqlPool,
    schema: &str,
    table: &str,
) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(
        r#"
        SELECT
          CAST(COLUMN_NAME AS CHAR) AS name,
          CAST(DATA_TYPE AS CHAR) AS data_type,
          CAST(COLUMN_TYPE AS CHAR) AS column_type,
          CAST(IS_NULLABLE = 'YES' AS SIGNED) AS is_nullable,
          CAST(COLUMN_DEFAULT AS CHAR) AS default_value,
          CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS max_length,
          CAST(NUMERIC_PRECISION AS SIGNED) AS numeric_precision,
          CAST(NUMERIC_SCALE AS SIGNED) AS numeric_scale,
          CAST(NULLIF(COLUMN_COMMENT, '') AS CHAR) AS comment,
          CAST(EXTRA AS CHAR) AS extra,
          CAST(ORDINAL_POSITION AS SIGNED) AS ordinal_position
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = ?
          AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

pub async fn list_primary_key(
    pool: &MySqlPool,
    schema: &str,
    table: &str,
) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT CAST(COLUMN_NAME AS CHAR)
        FROM information_schema.KEY_COLUMN_USAGE
        WHERE TABLE_SCHEMA = ?
          AND TABLE_NAME = ?
          AND CONSTRAINT_NAME = 'PRIMARY'
        ORDER BY ORDINAL_POSITION
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawForeignKey {
    pub constraint_name: String,
    pub column_name: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

pub async fn list_foreign_keys(
    pool: &MySqlPool,
    schema: &str,
    table: &str,
) -> Result<Vec<RawForeignKey>> {
    sqlx::query_as::<_, RawForeignKey>(
        r#"
        SELECT
          CAST(k.CONSTRAINT_NAME AS CHAR) AS constraint_name,
          CAST(k.COLUMN_NAME AS CHAR) AS column_name,
          CAST(k.REFERENCED_TABLE_SCHEMA AS CHAR) AS target_schema,
          CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS target_table,
          CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS target_column,
          CAST(r.DELETE_RULE AS CHAR) AS on_delete,
          CAST(r.UPDATE_RULE AS CHAR) AS on_update
        FROM information_schema.KEY_COLUMN_USAGE k
        JOIN information_schema.REFERENTIAL_CONSTRAINTS r
          ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
         AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
         AND r.TABLE_NAME = k.TABLE_NAME
        WHERE k.TABLE_SCHEMA = ?
          AND k.TABLE_NAME = ?
          AND k.REFERENCED_TABLE_NAME IS NOT NULL
        ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawIndexColumn {
    pub index_name: String,
    pub column_name: Option<String>,
    pub non_unique: i64,
    pub seq_in_index: i64,
}

pub async fn list_index_columns(
    pool: &MySqlPool,
    schema: &str,
    table: &str,
) -> Result<Vec<RawIndexColumn>> {
    sqlx::query_as::<_, RawIndexColumn>(
        r#"
        SELECT
          CAST(INDEX_NAME AS CHAR) AS index_name,
          CAST(COLUMN_NAME AS CHAR) AS column_name,
          CAST(NON_UNIQUE AS SIGNED) AS non_unique,
          CAST(SEQ_IN_INDEX AS SIGNED) AS seq_in_index
        FROM information_schema.STATISTICS
        WHERE TABLE_SCHEMA = ?
          AND TABLE_NAME = ?
        ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}
