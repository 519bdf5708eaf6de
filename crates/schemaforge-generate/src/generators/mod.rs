//! Artifact planners and renderers.
//!
//! Each artifact has a `plan_*` function computing the decisions (fields,
//! imports, registrations) as plain values and a `render_*` function turning
//! the plan into text. Planners never touch the database; the only file-system
//! read is the shared-entity existence check done by [`TableLayout`].

pub mod controller;
pub mod crud;
pub mod dto;
pub mod entity;
pub mod fields;
pub mod module;
pub mod repository;
pub mod service;
pub mod sql;
pub mod test_suites;
pub mod writer;

use std::path::PathBuf;

use schemaforge_core::naming::{to_property_name, to_relationship_name, to_snake, to_upper_camel};
use schemaforge_core::{Dialect, ForeignKeyInfo, GenerationConfig, TableInfo};

use crate::paths::{TableLayout, entity_file_name, shared_entity_path};

pub use fields::{EnumPlan, FieldPlan, FieldRole, plan_fields};

/// Everything a per-table generator reads.
#[derive(Debug, Clone)]
pub struct TableContext<'a> {
    pub table: &'a TableInfo,
    pub dialect: Dialect,
    pub config: &'a GenerationConfig,
    pub layout: TableLayout,
    pub fields: Vec<FieldPlan>,
}

impl<'a> TableContext<'a> {
    pub fn new(table: &'a TableInfo, dialect: Dialect, config: &'a GenerationConfig) -> Self {
        let generate_enums = config.entities.generate_enums;
        Self {
            table,
            dialect,
            config,
            layout: TableLayout::resolve(table, &config.paths),
            fields: plan_fields(table, dialect, generate_enums),
        }
    }

    pub fn input_fields(&self) -> impl Iterator<Item = &FieldPlan> {
        self.fields.iter().filter(|field| field.is_input())
    }

    /// The single-column primary key, if the table has one.
    pub fn id_field(&self) -> Option<&FieldPlan> {
        if self.table.primary_keys.len() != 1 {
            return None;
        }
        self.fields.iter().find(|field| field.is_primary_key)
    }

    /// Host type used for route and service identifiers.
    pub fn id_type(&self) -> &str {
        match self.id_field() {
            Some(field) if field.mapping.is_numeric() => "number",
            _ => "string",
        }
    }

    pub fn id_property(&self) -> String {
        self.id_field()
            .map(|field| field.property.clone())
            .unwrap_or_else(|| "id".to_string())
    }
}

/// Tables taking part in the run, used to resolve relation targets.
#[derive(Debug, Clone, Copy)]
pub struct RunTables<'a> {
    tables: &'a [&'a TableInfo],
    config: &'a GenerationConfig,
}

impl<'a> RunTables<'a> {
    pub fn new(tables: &'a [&'a TableInfo], config: &'a GenerationConfig) -> Self {
        Self { tables, config }
    }

    pub fn find(&self, schema: &str, name: &str) -> Option<&'a TableInfo> {
        self.tables
            .iter()
            .copied()
            .find(|table| table.schema_name == schema && table.name == name)
    }

    /// Where the entity for `table` is (or will be) written, if anywhere.
    ///
    /// Tables outside the run only resolve through an existing shared file.
    pub fn entity_location(&self, schema: &str, table: &str) -> Option<PathBuf> {
        let stem = schemaforge_core::naming::to_file_stem(table);
        let shared = shared_entity_path(&self.config.paths, &stem);
        let in_run = self.find(schema, table).is_some();
        if shared.is_file() || (in_run && self.config.features.entities) {
            return Some(shared);
        }
        if in_run && self.config.features.crud {
            let module = schemaforge_core::naming::to_module_name(table);
            return Some(
                self.config
                    .paths
                    .crud
                    .join(module)
                    .join("entities")
                    .join(entity_file_name(&stem)),
            );
        }
        None
    }

    /// Single-column foreign keys in the run that point at `target`.
    pub fn referencing(&self, target: &TableInfo) -> Vec<(&'a TableInfo, &'a ForeignKeyInfo)> {
        let mut out = Vec::new();
        for table in self.tables.iter().copied() {
            for fk in single_column_foreign_keys(table) {
                if fk.target_schema == target.schema_name && fk.target_table == target.name {
                    out.push((table, fk));
                }
            }
        }
        out
    }
}

/// Foreign keys whose constraint spans exactly one column.
pub fn single_column_foreign_keys(table: &TableInfo) -> impl Iterator<Item = &ForeignKeyInfo> {
    table.foreign_keys.iter().filter(move |fk| {
        table
            .foreign_keys
            .iter()
            .filter(|other| other.constraint_name == fk.constraint_name)
            .count()
            == 1
    })
}

/// Property holding the many-to-one side of `fk`: `customer_id` -> `customer`.
pub fn many_to_one_property(table: &TableInfo, fk: &ForeignKeyInfo) -> String {
    let snake = to_snake(&fk.column_name);
    let base = match snake.strip_suffix("_id") {
        Some(stem) if !stem.is_empty() => to_property_name(stem),
        _ => to_relationship_name(&fk.target_table, false),
    };
    avoid_field_clash(table, base)
}

/// Property holding the one-to-many side on the target of `fk`.
pub fn one_to_many_property(source: &TableInfo, fk: &ForeignKeyInfo, target: &TableInfo) -> String {
    let lower = schemaforge_core::naming::to_lower_camel(&source.name);
    let base = if lower.ends_with('s') {
        to_relationship_name(&source.name, false)
    } else {
        to_relationship_name(&source.name, true)
    };
    let siblings = single_column_foreign_keys(source)
        .filter(|other| {
            other.target_schema == fk.target_schema && other.target_table == fk.target_table
        })
        .count();
    let name = if siblings > 1 {
        format!(
            "{base}By{}",
            to_upper_camel(&many_to_one_property(source, fk))
        )
    } else {
        base
    };
    avoid_field_clash(target, name)
}

fn avoid_field_clash(table: &TableInfo, name: String) -> String {
    let clashes = table
        .columns
        .iter()
        .any(|column| to_property_name(&column.name) == name);
    if clashes { format!("{name}Relation") } else { name }
}

/// Class-validator decorator for a host type.
pub(crate) fn validator_for(host_type: &str) -> Option<&'static str> {
    match host_type {
        "string" => Some("IsString"),
        "number" => Some("IsNumber"),
        "boolean" => Some("IsBoolean"),
        "Date" => Some("IsDate"),
        _ => None,
    }
}

/// `T` or `T | null` for a nullable field.
pub(crate) fn property_type(field: &FieldPlan) -> String {
    if field.nullable {
        format!("{} | null", field.host_type)
    } else {
        field.host_type.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaforge_core::ColumnInfo;

    fn fk(column: &str, target: &str) -> ForeignKeyInfo {
        ForeignKeyInfo {
            constraint_name: format!("fk_{column}"),
            column_name: column.to_string(),
            target_schema: "public".to_string(),
            target_table: target.to_string(),
            target_column: "id".to_string(),
            on_delete: None,
            on_update: None,
        }
    }

    fn table(name: &str, columns: &[&str], fks: Vec<ForeignKeyInfo>) -> TableInfo {
        TableInfo {
            name: name.to_string(),
            schema_name: "public".to_string(),
            comment: None,
            columns: columns
                .iter()
                .enumerate()
                .map(|(idx, column)| ColumnInfo::new(*column, "integer", idx as i32 + 1))
                .collect(),
            primary_keys: vec!["id".to_string()],
            foreign_keys: fks,
            indexes: Vec::new(),
        }
    }

    #[test]
    fn relation_names_follow_the_key_column() {
        let orders = table(
            "orders",
            &["id", "customer_id", "reviewer_id"],
            vec![fk("customer_id", "users"), fk("reviewer_id", "users")],
        );
        let users = table("users", &["id"], Vec::new());
        assert_eq!(many_to_one_property(&orders, &orders.foreign_keys[0]), "customer");
        assert_eq!(
            one_to_many_property(&orders, &orders.foreign_keys[1], &users),
            "ordersByReviewer"
        );
    }

    #[test]
    fn relation_names_avoid_existing_properties() {
        let items = table("items", &["id", "owner", "owner_id"], vec![fk("owner_id", "owners")]);
        assert_eq!(many_to_one_property(&items, &items.foreign_keys[0]), "ownerRelation");
    }

    #[test]
    fn composite_foreign_keys_are_skipped() {
        let mut first = fk("a_id", "pairs");
        let mut second = fk("b_id", "pairs");
        first.constraint_name = "fk_pair".to_string();
        second.constraint_name = "fk_pair".to_string();
        let links = table("links", &["id", "a_id", "b_id"], vec![first, second]);
        assert_eq!(single_column_foreign_keys(&links).count(), 0);
    }
}
