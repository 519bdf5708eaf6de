use async_trait::async_trait;
use tracing::{info, warn};

use schemaforge_core::{DatabaseSchema, Dialect, Error, Result, SCHEMA_VERSION, TableInfo};

use crate::assemble::sort_tables;

/// A base table found by the listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
    pub comment: Option<String>,
}

/// Trait implemented by dialect adapters that can read a catalog.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Run the table-listing catalog query.
    async fn list_tables(&self) -> Result<Vec<TableRef>>;

    /// Read columns, keys and indexes for one table.
    async fn table_info(&self, name: &str, schema: &str) -> Result<TableInfo>;

    async fn database_name(&self) -> Option<String> {
        None
    }

    /// Introspect every listed table.
    ///
    /// A failed listing is fatal. A table whose own queries fail is logged
    /// and left out, so the result may have gaps.
    async fn all_tables(&self) -> Result<Vec<TableInfo>> {
        let listed = self.list_tables().await.map_err(|err| match err {
            Error::Listing(_) => err,
            other => Error::Listing(other.to_string()),
        })?;

        let mut tables = Vec::with_capacity(listed.len());
        for table_ref in &listed {
            match self.table_info(&table_ref.name, &table_ref.schema).await {
                Ok(mut table) => {
                    if table.comment.is_none() {
                        table.comment = table_ref.comment.clone();
                    }
                    tables.push(table);
                }
                Err(err) => {
                    warn!(
                        schema = %table_ref.schema,
                        table = %table_ref.name,
                        error = %err,
                        "skipping table after catalog query failure"
                    );
                }
            }
        }

        sort_tables(&mut tables);
        Ok(tables)
    }

    async fn database_schema(&self) -> Result<DatabaseSchema> {
        let tables = self.all_tables().await?;
        info!(
            dialect = %self.dialect(),
            tables = tables.len(),
            "introspection finished"
        );
        Ok(DatabaseSchema {
            schema_version: SCHEMA_VERSION.to_string(),
            dialect: self.dialect(),
            database: self.database_name().await,
            tables,
        })
    }
}
