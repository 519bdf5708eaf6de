use schemaforge_core::{ColumnInfo, DatabaseSchema, Dialect, SCHEMA_VERSION, TableInfo};

fn sample_schema() -> DatabaseSchema {
    let mut id = ColumnInfo::new("id", "integer", 1);
    id.nullable = false;
    id.is_auto_increment = true;
    id.is_primary_key = true;

    DatabaseSchema {
        schema_version: SCHEMA_VERSION.to_string(),
        dialect: Dialect::MySql,
        database: Some("shop".to_string()),
        tables: vec![TableInfo {
            name: "customers".to_string(),
            schema_name: "shop".to_string(),
            comment: None,
            columns: vec![id],
            primary_keys: vec!["id".to_string()],
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }],
    }
}

#[test]
fn serializes_schema_deterministically() {
    let first = serde_json::to_string_pretty(&sample_schema()).expect("serialize schema");
    let second = serde_json::to_string_pretty(&sample_schema()).expect("serialize schema");
    assert_eq!(first, second);

    let value: serde_json::Value = serde_json::from_str(&first).expect("parse json");
    assert_eq!(value["dialect"], "mysql");
    assert_eq!(value["tables"][0]["columns"][0]["native_type"], "integer");
    assert!(value["tables"][0]["columns"][0].get("enum_values").is_none());
}

#[test]
fn snapshot_round_trips_through_json() {
    let json = serde_json::to_string(&sample_schema()).expect("serialize schema");
    let parsed: DatabaseSchema = serde_json::from_str(&json).expect("parse schema");
    let table = parsed.find_table("shop", "customers").expect("table present");
    assert_eq!(table.primary_key_columns().len(), 1);
    assert!(table.columns[0].is_auto_increment);
}

#[test]
fn older_snapshots_without_annotations_still_parse() {
    let json = r#"{
      "schema_version": "0.1",
      "dialect": "postgres",
      "database": null,
      "tables": [{
        "name": "tags",
        "schema_name": "public",
        "comment": null,
        "columns": [{
          "name": "label",
          "native_type": "text",
          "nullable": true,
          "default_value": null,
          "max_length": null,
          "numeric_precision": null,
          "numeric_scale": null,
          "comment": null,
          "is_auto_increment": false,
          "ordinal_position": 1
        }],
        "primary_keys": [],
        "foreign_keys": [],
        "indexes": []
      }]
    }"#;
    let parsed: DatabaseSchema = serde_json::from_str(json).expect("parse schema");
    assert!(!parsed.tables[0].columns[0].is_primary_key);
    assert!(parsed.tables[0].columns[0].foreign_key_target.is_none());
}
