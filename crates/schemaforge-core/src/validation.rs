use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::DatabaseSchema;
use crate::types::TypeResolver;

/// Non-fatal finding about a schema snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIssue {
    pub code: String,
    pub message: String,
    pub table: String,
    pub column: Option<String>,
}

/// Validate internal consistency of a schema snapshot.
///
/// Structural problems inside a table (duplicate names, ordinals, key columns
/// that do not exist) are errors. Foreign keys pointing outside the snapshot
/// are only reported, since generators degrade to the scalar column.
pub fn validate_schema(schema: &DatabaseSchema) -> Result<Vec<SchemaIssue>> {
    let mut catalog: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();

    for table in &schema.tables {
        let key = (table.schema_name.as_str(), table.name.as_str());
        if catalog.contains_key(&key) {
            return Err(Error::InvalidSchema(format!(
                "duplicate table name: {}",
                table.qualified_name()
            )));
        }

        let mut columns = BTreeSet::new();
        let mut ordinals = BTreeSet::new();
        for column in &table.columns {
            if !columns.insert(column.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name: {}.{}",
                    table.qualified_name(),
                    column.name
                )));
            }
            if !ordinals.insert(column.ordinal_position) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate ordinal position {} in {}",
                    column.ordinal_position,
                    table.qualified_name()
                )));
            }
        }

        for pk in &table.primary_keys {
            if !columns.contains(pk.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "primary key column not found: {}.{}",
                    table.qualified_name(),
                    pk
                )));
            }
        }
        for fk in &table.foreign_keys {
            if !columns.contains(fk.column_name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "foreign key column not found: {}.{}",
                    table.qualified_name(),
                    fk.column_name
                )));
            }
        }

        catalog.insert(key, columns);
    }

    let mut issues = Vec::new();
    for table in &schema.tables {
        for fk in &table.foreign_keys {
            let target = catalog.get(&(fk.target_schema.as_str(), fk.target_table.as_str()));
            let message = match target {
                None => Some(format!(
                    "foreign key {} references {}.{} which is not in the snapshot",
                    fk.constraint_name, fk.target_schema, fk.target_table
                )),
                Some(columns) if !columns.contains(fk.target_column.as_str()) => Some(format!(
                    "foreign key {} references missing column {}.{}.{}",
                    fk.constraint_name, fk.target_schema, fk.target_table, fk.target_column
                )),
                Some(_) => None,
            };
            if let Some(message) = message {
                issues.push(SchemaIssue {
                    code: "dangling_foreign_key".to_string(),
                    message,
                    table: table.qualified_name(),
                    column: Some(fk.column_name.clone()),
                });
            }
        }

        for column in &table.columns {
            if column.is_auto_increment
                && !TypeResolver::resolve(&column.native_type, schema.dialect, false).is_numeric()
            {
                issues.push(SchemaIssue {
                    code: "non_numeric_auto_increment".to_string(),
                    message: format!(
                        "auto-increment column has non-numeric type {}",
                        column.native_type
                    ),
                    table: table.qualified_name(),
                    column: Some(column.name.clone()),
                });
            }
        }
    }

    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::schema::{ColumnInfo, ForeignKeyInfo, TableInfo};

    fn table(name: &str, columns: Vec<ColumnInfo>) -> TableInfo {
        TableInfo {
            name: name.to_string(),
            schema_name: "public".to_string(),
            comment: None,
            columns,
            primary_keys: vec!["id".to_string()],
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    fn schema(tables: Vec<TableInfo>) -> DatabaseSchema {
        DatabaseSchema {
            schema_version: crate::SCHEMA_VERSION.to_string(),
            dialect: Dialect::Postgres,
            database: None,
            tables,
        }
    }

    #[test]
    fn rejects_duplicate_columns() {
        let snapshot = schema(vec![table(
            "users",
            vec![ColumnInfo::new("id", "integer", 1), ColumnInfo::new("id", "text", 2)],
        )]);
        assert!(matches!(
            validate_schema(&snapshot),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn rejects_missing_primary_key_column() {
        let snapshot = schema(vec![table("users", vec![ColumnInfo::new("email", "text", 1)])]);
        assert!(validate_schema(&snapshot).is_err());
    }

    #[test]
    fn dangling_foreign_key_is_a_warning() {
        let mut orders = table(
            "orders",
            vec![
                ColumnInfo::new("id", "integer", 1),
                ColumnInfo::new("customer_id", "integer", 2),
            ],
        );
        orders.foreign_keys.push(ForeignKeyInfo {
            constraint_name: "orders_customer_id_fkey".to_string(),
            column_name: "customer_id".to_string(),
            target_schema: "public".to_string(),
            target_table: "customers".to_string(),
            target_column: "id".to_string(),
            on_delete: None,
            on_update: None,
        });
        let issues = validate_schema(&schema(vec![orders])).expect("valid structure");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "dangling_foreign_key");
        assert_eq!(issues[0].column.as_deref(), Some("customer_id"));
    }
}
