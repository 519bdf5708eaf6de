use schemaforge_core::DatabaseSchema;
use schemars::schema_for;

#[test]
fn json_schema_describes_snapshot_contract() {
    let generated = schema_for!(DatabaseSchema);
    let json = serde_json::to_value(&generated).expect("serialize generated schema");

    let properties = json["properties"].as_object().expect("top-level properties");
    for key in ["schema_version", "dialect", "database", "tables"] {
        assert!(properties.contains_key(key), "missing property {key}");
    }

    let definitions = json["definitions"].as_object().expect("definitions");
    for name in ["TableInfo", "ColumnInfo", "ForeignKeyInfo", "IndexInfo", "Dialect"] {
        assert!(definitions.contains_key(name), "missing definition {name}");
    }
}
