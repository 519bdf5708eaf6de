use async_trait::async_trait;
use sqlx::MySqlPool;

use schemaforge_core::{Dialect, Result, TableInfo};

use crate::assemble::{TableParts, assemble_table};
use crate::introspector::{SchemaIntrospector, TableRef};
use crate::options::IntrospectOptions;

mod mapper;
mod queries;

/// Introspector for MySQL and MariaDB catalogs.
#[derive(Debug, Clone)]
pub struct MySqlIntrospector {
    pool: MySqlPool,
    options: IntrospectOptions,
}

impl MySqlIntrospector {
    pub fn new(pool: MySqlPool, options: IntrospectOptions) -> Self {
        Self { pool, options }
    }
}

#[async_trait]
impl SchemaIntrospector for MySqlIntrospector {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn list_tables(&self) -> Result<Vec<TableRef>> {
        let raw = queries::list_tables(
            &self.pool,
            self.options.schemas.as_deref(),
            self.options.include_system_schemas,
        )
        .await?;
        Ok(mapper::map_tables(raw, &self.options))
    }

    async fn table_info(&self, name: &str, schema: &str) -> Result<TableInfo> {
        let columns = mapper::map_columns(
            queries::list_columns(&self.pool, schema, name).await?,
            &self.options,
        );
        let primary_keys = queries::list_primary_key(&self.pool, schema, name).await?;
        let foreign_keys =
            mapper::map_foreign_keys(queries::list_foreign_keys(&self.pool, schema, name).await?);
        let indexes = if self.options.include_indexes {
            mapper::map_indexes(queries::list_index_columns(&self.pool, schema, name).await?)
        } else {
            Vec::new()
        };

        let table_ref = TableRef {
            schema: schema.to_string(),
            name: name.to_string(),
            comment: None,
        };
        let parts = TableParts {
            columns,
            primary_keys,
            foreign_keys,
            indexes,
        };
        Ok(assemble_table(&table_ref, parts, Dialect::MySql))
    }

    async fn database_name(&self) -> Option<String> {
        queries::fetch_database_name(&self.pool).await.ok().flatten()
    }
}
