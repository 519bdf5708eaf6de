use schemaforge_core::naming::parse_enum_values;
use schemaforge_core::{ColumnInfo, ForeignKeyInfo, IndexInfo};

use crate::assemble::{IndexColumnRow, group_index_rows};
use crate::introspector::TableRef;
use crate::options::IntrospectOptions;

use super::queries::{RawColumn, RawForeignKey, RawIndexColumn, RawTable};

pub fn map_tables(raw: Vec<RawTable>, opts: &IntrospectOptions) -> Vec<TableRef> {
    raw.into_iter()
        .map(|table| TableRef {
            schema: table.schema_name,
            name: table.table_name,
            comment: table.comment.filter(|_| opts.include_comments),
        })
        .collect()
}

pub fn map_columns(raw: Vec<RawColumn>, opts: &IntrospectOptions) -> Vec<ColumnInfo> {
    raw.into_iter()
        .map(|col| {
            let is_auto_increment = col
                .extra
                .as_deref()
                .is_some_and(|extra| extra.to_lowercase().contains("auto_increment"));
            let enum_values = if col.data_type.eq_ignore_ascii_case("enum") {
                Some(parse_enum_values(&col.column_type)).filter(|values| !values.is_empty())
            } else {
                None
            };
            ColumnInfo {
                name: col.name,
                native_type: col.data_type,
                nullable: col.is_nullable != 0,
                default_value: col.default_value,
                max_length: col.max_length,
                numeric_precision: col.numeric_precision.and_then(|v| i32::try_from(v).ok()),
                numeric_scale: col.numeric_scale.and_then(|v| i32::try_from(v).ok()),
                comment: col.comment.filter(|_| opts.include_comments),
                is_auto_increment,
                ordinal_position: i32::try_from(col.ordinal_position).unwrap_or(i32::MAX),
                enum_values,
                is_primary_key: false,
                is_unique: false,
                foreign_key_target: None,
            }
        })
        .collect()
}

pub fn map_foreign_keys(raw: Vec<RawForeignKey>) -> Vec<ForeignKeyInfo> {
    raw.into_iter()
        .map(|fk| ForeignKeyInfo {
            constraint_name: fk.constraint_name,
            column_name: fk.column_name,
            target_schema: fk.target_schema,
            target_table: fk.target_table,
            target_column: fk.target_column,
            on_delete: fk.on_delete,
            on_update: fk.on_update,
        })
        .collect()
}

pub fn map_indexes(raw: Vec<RawIndexColumn>) -> Vec<IndexInfo> {
    let rows = raw
        .into_iter()
        // Functional key parts report no column name.
        .filter_map(|row| {
            row.column_name.map(|column_name| IndexColumnRow {
                index_name: row.index_name,
                column_name,
                is_unique: row.non_unique == 0,
                seq_in_index: row.seq_in_index,
            })
        })
        .collect();
    group_index_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_column(name: &str, data_type: &str, column_type: &str, extra: &str) -> RawColumn {
        RawColumn {
            name: name.to_string(),
            data_type: data_type.to_string(),
            column_type: column_type.to_string(),
            is_nullable: 1,
            default_value: None,
            max_length: None,
            numeric_precision: Some(10),
            numeric_scale: Some(0),
            comment: None,
            extra: Some(extra.to_string()),
            ordinal_position: 2,
        }
    }

    #[test]
    fn detects_auto_increment_from_extra() {
        let columns = map_columns(
            vec![raw_column("id", "int", "int unsigned", "auto_increment")],
            &IntrospectOptions::default(),
        );
        assert!(columns[0].is_auto_increment);
        assert!(columns[0].nullable);
        assert_eq!(columns[0].ordinal_position, 2);
        assert_eq!(columns[0].numeric_precision, Some(10));
    }

    #[test]
    fn parses_enum_values_from_column_type() {
        let columns = map_columns(
            vec![raw_column("status", "enum", "enum('new','paid')", "")],
            &IntrospectOptions::default(),
        );
        assert_eq!(
            columns[0].enum_values.as_deref(),
            Some(&["new".to_string(), "paid".to_string()][..])
        );
        assert!(!columns[0].is_auto_increment);
    }

    #[test]
    fn groups_statistics_rows() {
        let indexes = map_indexes(vec![
            RawIndexColumn {
                index_name: "PRIMARY".to_string(),
                column_name: Some("id".to_string()),
                non_unique: 0,
                seq_in_index: 1,
            },
            RawIndexColumn {
                index_name: "idx_expr".to_string(),
                column_name: None,
                non_unique: 1,
                seq_in_index: 1,
            },
        ]);
        assert_eq!(indexes.len(), 1);
        assert!(indexes[0].is_primary && indexes[0].is_unique);
    }
}
