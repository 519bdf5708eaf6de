use sqlx::PgPool;

use schemaforge_core::{Error, Result};

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

pub async fn fetch_database_name(pool: &PgPool) -> Result<String> {
    sqlx::query_scalar::<_, String>("select current_database()::text")
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
    pool: &PgPool,
    schemas: Option<&[String]>,
    include_system_schemas: bool,
) -> Result<Vec<RawTable>> {
    sqlx::query_as::<_, RawTable>(
        r#"
        select
          n.nspname::text as schema_name,
          c.relname::text as table_name,
          pg_catalog.obj_description(c.oid, 'pg_class') as comment
        from pg_class c
        join pg_namespace n on n.oid = c.relnamespace
        where c.relkind in ('r', 'p')
          and not c.relispartition
          and ($1::text[] is null or n.nspname = any($1))
          and (
            $2
            or (n.nspname not in ('information_schema', 'pg_catalog', 'pg_toast')
                and n.nspname not like 'pg\_temp%'
                and n.nspname not like 'pg\_toast%')
          )
        order by n.nspname, c.relname
        "#,
    )
    .bind(schemas.map(|list| list.to_vec()))
    .bind(include_system_schemas)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawColumn {
    pub ordinal_position: i32,
    pub name: String,
    pub native_type: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    pub is_identity: bool,
    pub max_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
    pub comment: Option<String>,
    pub enum_values: Vec<String>,
}

pub async fn list_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(
        r#"
        select
          a.attnum::int4 as ordinal_position,
          a.attname::text as name,
          case
            when t.typcategory = 'A' then pg_catalog.format_type(t.typelem, null) || '[]'
            when t.typtype = 'e' then t.typname::text
            else pg_catalog.format_type(a.atttypid, null)
          end as native_type,
          (not a.attnotnull) as is_nullable,
          pg_catalog.pg_get_expr(ad.adbin, ad.adrelid) as default_value,
          (a.attidentity <> '') as is_identity,
          case
            when t.typname in ('varchar', 'bpchar') and a.atttypmod > 4
              then a.atttypmod - 4
            else null
          end::int4 as max_length,
          case
            when t.typname = 'numeric' and a.atttypmod > 4
              then ((a.atttypmod - 4) >> 16) & 65535
            else null
          end::int4 as numeric_precision,
          case
            when t.typname = 'numeric' and a.atttypmod > 4
              then (a.atttypmod - 4) & 65535
            else null
          end::int4 as numeric_scale,
          pg_catalog.col_description(a.attrelid, a.attnum) as comment,
          array(
            select e.enumlabel::text
            from pg_enum e
            where e.enumtypid = t.oid
            order by e.enumsortorder
          ) as enum_values
        from pg_attribute a
        join pg_class c on c.oid = a.attrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_type t on t.oid = a.atttypid
        left join pg_attrdef ad on ad.adrelid = a.attrelid and ad.adnum = a.attnum
        where n.nspname = $1
          and c.relname = $2
          and a.attnum > 0
          and not a.attisdropped
        order by a.attnum
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

pub async fn list_primary_key(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select a.attname::text
        from pg_index i
        join pg_class c on c.oid = i.indrelid
        join pg_namespace n on n.oid = c.relnamespace
        join lateral unnest(i.indkey) with ordinality as k(attnum, ord) on true
        join pg_attribute a on a.attrelid = c.oid and a.attnum = k.attnum
        where i.indisprimary
          and n.nspname = $1
          and c.relname = $2
        order by k.ord
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
    pub delete_code: String,
    pub update_code: String,
}

pub async fn list_foreign_keys(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<RawForeignKey>> {
    sqlx::query_as::<_, RawForeignKey>(
        r#"
        select
          con.conname::text as constraint_name,
          src.attname::text as column_name,
          tn.nspname::text as target_schema,
          tc.relname::text as target_table,
          tgt.attname::text as target_column,
          con.confdeltype::text as delete_code,
          con.confupdtype::text as update_code
        from pg_constraint con
        join pg_class c on c.oid = con.conrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_class tc on tc.oid = con.confrelid
        join pg_namespace tn on tn.oid = tc.relnamespace
        join lateral unnest(con.conkey, con.confkey) as k(src_attnum, tgt_attnum) on true
        join pg_attribute src on src.attrelid = con.conrelid and src.attnum = k.src_attnum
        join pg_attribute tgt on tgt.attrelid = con.confrelid and tgt.attnum = k.tgt_attnum
        where con.contype = 'f'
          and n.nspname = $1
          and c.relname = $2
        order by con.conname, src.attname
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawIndex {
    pub index_name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

pub async fn list_indexes(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawIndex>> {
    sqlx::query_as::<_, RawIndex>(
        r#"
        select
          ic.relname::text as index_name,
          array(
            select a.attname::text
            from unnest(i.indkey) with ordinality as k(attnum, ord)
            join pg_attribute a on a.attrelid = i.indrelid and a.attnum = k.attnum
            order by k.ord
          ) as columns,
          i.indisunique as is_unique,
          i.indisprimary as is_primary
        from pg_index i
        join pg_class c on c.oid = i.indrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_class ic on ic.oid = i.indexrelid
        where n.nspname = $1
          and c.relname = $2
        order by ic.relname
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}
