//! Dialect-neutral assembly of catalog rows into [`TableInfo`].

use std::collections::BTreeMap;

use tracing::warn;

use schemaforge_core::{
    ColumnInfo, Dialect, ForeignKeyInfo, ForeignKeyTarget, IndexInfo, TableInfo, TypeResolver,
};

use crate::introspector::TableRef;

/// Catalog rows for one table, already mapped to model types.
#[derive(Debug, Default)]
pub struct TableParts {
    pub columns: Vec<ColumnInfo>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub indexes: Vec<IndexInfo>,
}

/// Build a table, annotating columns with key membership and sorting every
/// collection into its stable order.
pub fn assemble_table(table_ref: &TableRef, parts: TableParts, dialect: Dialect) -> TableInfo {
    let TableParts {
        mut columns,
        primary_keys,
        mut foreign_keys,
        mut indexes,
    } = parts;

    columns.sort_by_key(|column| column.ordinal_position);
    foreign_keys.sort_by(|left, right| {
        left.constraint_name
            .cmp(&right.constraint_name)
            .then_with(|| left.column_name.cmp(&right.column_name))
    });
    indexes.sort_by(|left, right| left.name.cmp(&right.name));

    for column in &mut columns {
        column.is_primary_key = primary_keys.contains(&column.name);
        column.is_unique = !column.is_primary_key
            && indexes.iter().any(|index| {
                index.is_unique
                    && !index.is_primary
                    && index.columns.len() == 1
                    && index.columns[0] == column.name
            });
        column.foreign_key_target = foreign_keys
            .iter()
            .find(|fk| fk.column_name == column.name)
            .map(|fk| ForeignKeyTarget {
                schema: fk.target_schema.clone(),
                table: fk.target_table.clone(),
                column: fk.target_column.clone(),
                on_delete: fk.on_delete.clone(),
                on_update: fk.on_update.clone(),
            });

        if column.is_auto_increment
            && !TypeResolver::resolve(&column.native_type, dialect, false).is_numeric()
        {
            warn!(
                table = %table_ref.name,
                column = %column.name,
                native_type = %column.native_type,
                "ignoring auto-increment flag on non-numeric column"
            );
            column.is_auto_increment = false;
        }
    }

    TableInfo {
        name: table_ref.name.clone(),
        schema_name: table_ref.schema.clone(),
        comment: table_ref.comment.clone(),
        columns,
        primary_keys,
        foreign_keys,
        indexes,
    }
}

pub fn sort_tables(tables: &mut [TableInfo]) {
    tables.sort_by(|left, right| {
        left.schema_name
            .cmp(&right.schema_name)
            .then_with(|| left.name.cmp(&right.name))
    });
}

/// One `(index, column)` row as returned by catalogs that do not aggregate.
#[derive(Debug, Clone)]
pub struct IndexColumnRow {
    pub index_name: String,
    pub column_name: String,
    pub is_unique: bool,
    pub seq_in_index: i64,
}

/// Group per-column index rows into indexes; `PRIMARY` marks the primary key.
pub fn group_index_rows(rows: Vec<IndexColumnRow>) -> Vec<IndexInfo> {
    let mut grouped: BTreeMap<String, (bool, Vec<(i64, String)>)> = BTreeMap::new();
    for row in rows {
        let entry = grouped
            .entry(row.index_name)
            .or_insert_with(|| (row.is_unique, Vec::new()));
        entry.1.push((row.seq_in_index, row.column_name));
    }

    grouped
        .into_iter()
        .map(|(name, (is_unique, mut columns))| {
            columns.sort_by_key(|(seq, _)| *seq);
            IndexInfo {
                is_primary: name == "PRIMARY",
                name,
                columns: columns.into_iter().map(|(_, column)| column).collect(),
                is_unique,
            }
        })
        .collect()
}
