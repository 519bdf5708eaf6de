use async_trait::async_trait;

use schemaforge_core::{ColumnInfo, Dialect, Error, Result, TableInfo};
use schemaforge_introspect::{SchemaIntrospector, TableRef};

/// In-memory catalog; tables named in `broken` fail their per-table queries.
struct FakeIntrospector {
    tables: Vec<(&'static str, &'static str)>,
    broken: Vec<&'static str>,
    listing_fails: bool,
}

#[async_trait]
impl SchemaIntrospector for FakeIntrospector {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn list_tables(&self) -> Result<Vec<TableRef>> {
        if self.listing_fails {
            return Err(Error::Db("permission denied for pg_class".to_string()));
        }
        Ok(self
            .tables
            .iter()
            .map(|(schema, name)| TableRef {
                schema: schema.to_string(),
                name: name.to_string(),
                comment: Some(format!("{name} table")),
            })
            .collect())
    }

    async fn table_info(&self, name: &str, schema: &str) -> Result<TableInfo> {
        if self.broken.contains(&name) {
            return Err(Error::Db(format!("relation {name} does not exist")));
        }
        Ok(TableInfo {
            name: name.to_string(),
            schema_name: schema.to_string(),
            comment: None,
            columns: vec![
                ColumnInfo::new("id", "integer", 1),
                ColumnInfo::new("label", "text", 2),
            ],
            primary_keys: vec!["id".to_string()],
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        })
    }
}

#[tokio::test]
async fn failing_table_is_dropped_from_result() {
    let introspector = FakeIntrospector {
        tables: vec![("public", "users"), ("public", "ghost"), ("public", "orders")],
        broken: vec!["ghost"],
        listing_fails: false,
    };

    let tables = introspector.all_tables().await.expect("listing succeeds");
    let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["orders", "users"]);
    assert_eq!(tables[0].comment.as_deref(), Some("orders table"));
}

#[tokio::test]
async fn failing_listing_is_fatal() {
    let introspector = FakeIntrospector {
        tables: vec![("public", "users")],
        broken: Vec::new(),
        listing_fails: true,
    };

    let err = introspector
        .database_schema()
        .await
        .expect_err("listing failure must surface");
    assert!(matches!(err, Error::Listing(_)));
}

#[tokio::test]
async fn schema_is_sorted_by_schema_then_name() {
    let introspector = FakeIntrospector {
        tables: vec![("sales", "invoices"), ("public", "users"), ("public", "accounts")],
        broken: Vec::new(),
        listing_fails: false,
    };

    let schema = introspector.database_schema().await.expect("introspect");
    let keys: Vec<_> = schema.tables.iter().map(|t| t.qualified_name()).collect();
    assert_eq!(keys, vec!["public.accounts", "public.users", "sales.invoices"]);
    assert_eq!(schema.dialect, Dialect::Postgres);
    assert!(schema.database.is_none());
}
