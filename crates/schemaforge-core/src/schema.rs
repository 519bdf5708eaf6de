use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;

/// Top-level schema snapshot for a database.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseSchema {
    /// Contract version for this snapshot format.
    pub schema_version: String,
    pub dialect: Dialect,
    /// Database name when available.
    pub database: Option<String>,
    /// Tables sorted by `(schema_name, name)`.
    pub tables: Vec<TableInfo>,
}

impl DatabaseSchema {
    pub fn find_table(&self, schema: &str, name: &str) -> Option<&TableInfo> {
        self.tables
            .iter()
            .find(|table| table.schema_name == schema && table.name == name)
    }

    /// Look up a table by bare name, ignoring the schema.
    pub fn find_table_by_name(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|table| table.name == name)
    }
}

/// A base table and everything the generators need to know about it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableInfo {
    pub name: String,
    pub schema_name: String,
    pub comment: Option<String>,
    pub columns: Vec<ColumnInfo>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub indexes: Vec<IndexInfo>,
}

impl TableInfo {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Columns belonging to the primary key, in key order.
    pub fn primary_key_columns(&self) -> Vec<&ColumnInfo> {
        self.primary_keys
            .iter()
            .filter_map(|name| self.column(name))
            .collect()
    }

    pub fn qualified_name(&self) -> String {
        if self.schema_name.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema_name, self.name)
        }
    }
}

/// Column metadata for a table.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnInfo {
    pub name: String,
    /// Native type name as reported by the catalog (e.g. `character varying`).
    pub native_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub max_length: Option<i64>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
    pub comment: Option<String>,
    pub is_auto_increment: bool,
    pub ordinal_position: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_target: Option<ForeignKeyTarget>,
}

impl ColumnInfo {
    /// A nullable column with no constraints, used as a starting point by adapters.
    pub fn new(name: impl Into<String>, native_type: impl Into<String>, ordinal: i32) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
            nullable: true,
            default_value: None,
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            comment: None,
            is_auto_increment: false,
            ordinal_position: ordinal,
            enum_values: None,
            is_primary_key: false,
            is_unique: false,
            foreign_key_target: None,
        }
    }
}

/// Per-column view of a foreign key reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKeyTarget {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

/// Many-to-one reference from a column to another table's column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKeyInfo {
    pub constraint_name: String,
    pub column_name: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}
