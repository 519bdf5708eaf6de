use schemaforge_core::{ColumnInfo, ForeignKeyInfo, IndexInfo};

use crate::introspector::TableRef;
use crate::options::IntrospectOptions;

use super::queries::{RawColumn, RawForeignKey, RawIndex, RawTable};

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
            let is_sequence_default = col
                .default_value
                .as_deref()
                .is_some_and(|default| default.starts_with("nextval("));
            ColumnInfo {
                name: col.name,
                native_type: col.native_type,
                nullable: col.is_nullable,
                default_value: col.default_value,
                max_length: col.max_length.map(i64::from),
                numeric_precision: col.numeric_precision,
                numeric_scale: col.numeric_scale,
                comment: col.comment.filter(|_| opts.include_comments),
                is_auto_increment: col.is_identity || is_sequence_default,
                ordinal_position: col.ordinal_position,
                enum_values: (!col.enum_values.is_empty()).then_some(col.enum_values),
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
            on_delete: fk_action_from_code(&fk.delete_code),
            on_update: fk_action_from_code(&fk.update_code),
        })
        .collect()
}

pub fn map_indexes(raw: Vec<RawIndex>) -> Vec<IndexInfo> {
    raw.into_iter()
        // Expression indexes have no plain columns.
        .filter(|index| !index.columns.is_empty())
        .map(|index| IndexInfo {
            name: index.index_name,
            columns: index.columns,
            is_unique: index.is_unique,
            is_primary: index.is_primary,
        })
        .collect()
}

/// Translate `pg_constraint.confdeltype`/`confupdtype` codes.
pub fn fk_action_from_code(code: &str) -> Option<String> {
    let action = match code {
        "a" => "NO ACTION",
        "r" => "RESTRICT",
        "c" => "CASCADE",
        "n" => "SET NULL",
        "d" => "SET DEFAULT",
        _ => return None,
    };
    Some(action.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_column(name: &str, native: &str, default: Option<&str>) -> RawColumn {
        RawColumn {
            ordinal_position: 1,
            name: name.to_string(),
            native_type: native.to_string(),
            is_nullable: false,
            default_value: default.map(str::to_string),
            is_identity: false,
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            comment: Some("primary id".to_string()),
            enum_values: Vec::new(),
        }
    }

    #[test]
    fn sequence_default_marks_auto_increment() {
        let columns = map_columns(
            vec![raw_column("id", "integer", Some("nextval('users_id_seq'::regclass)"))],
            &IntrospectOptions::default(),
        );
        assert!(columns[0].is_auto_increment);
        assert!(columns[0].enum_values.is_none());
    }

    #[test]
    fn comments_are_dropped_when_disabled() {
        let opts = IntrospectOptions {
            include_comments: false,
            ..IntrospectOptions::default()
        };
        let columns = map_columns(vec![raw_column("id", "integer", None)], &opts);
        assert!(columns[0].comment.is_none());
        assert!(!columns[0].is_auto_increment);
    }

    #[test]
    fn maps_referential_action_codes() {
        assert_eq!(fk_action_from_code("c").as_deref(), Some("CASCADE"));
        assert_eq!(fk_action_from_code("n").as_deref(), Some("SET NULL"));
        assert_eq!(fk_action_from_code("?"), None);
    }
}
