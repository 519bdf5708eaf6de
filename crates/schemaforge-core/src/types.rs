//! Native column type resolution.
//!
//! Every native type resolves to three parallel representations: the host
//! language type used in generated code, the persistence-layer column type,
//! and the literal SQL DDL token. Resolution never fails; unknown types take
//! a dynamic fallback that is flagged so callers can warn about it.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::schema::ColumnInfo;

/// `(native type, host type, persistence type)`
type TypeEntry = (&'static str, &'static str, &'static str);

const POSTGRES_TYPES: &[TypeEntry] = &[
    ("character varying", "string", "varchar"),
    ("varchar", "string", "varchar"),
    ("char", "string", "char"),
    ("character", "string", "char"),
    ("bpchar", "string", "char"),
    ("text", "string", "text"),
    ("citext", "string", "text"),
    ("name", "string", "varchar"),
    ("integer", "number", "int"),
    ("int", "number", "int"),
    ("int4", "number", "int"),
    ("bigint", "number", "bigint"),
    ("int8", "number", "bigint"),
    ("smallint", "number", "smallint"),
    ("int2", "number", "smallint"),
    ("decimal", "number", "decimal"),
    ("numeric", "number", "decimal"),
    ("real", "number", "real"),
    ("float4", "number", "real"),
    ("double precision", "number", "double"),
    ("float8", "number", "double"),
    ("money", "number", "decimal"),
    ("serial", "number", "int"),
    ("serial4", "number", "int"),
    ("bigserial", "number", "bigint"),
    ("serial8", "number", "bigint"),
    ("smallserial", "number", "smallint"),
    ("boolean", "boolean", "boolean"),
    ("bool", "boolean", "boolean"),
    ("timestamp", "Date", "timestamp"),
    ("timestamp without time zone", "Date", "timestamp"),
    ("timestamp with time zone", "Date", "timestamptz"),
    ("timestamptz", "Date", "timestamptz"),
    ("date", "Date", "date"),
    ("time", "string", "time"),
    ("time without time zone", "string", "time"),
    ("time with time zone", "string", "timetz"),
    ("timetz", "string", "timetz"),
    ("interval", "string", "interval"),
    ("json", "any", "json"),
    ("jsonb", "any", "jsonb"),
    ("array", "any[]", "simple-array"),
    ("uuid", "string", "uuid"),
    ("bytea", "Buffer", "bytea"),
    ("point", "string", "point"),
    ("line", "string", "line"),
    ("lseg", "string", "lseg"),
    ("box", "string", "box"),
    ("path", "string", "path"),
    ("polygon", "string", "polygon"),
    ("circle", "string", "circle"),
    ("cidr", "string", "cidr"),
    ("inet", "string", "inet"),
    ("macaddr", "string", "macaddr"),
    ("bit", "string", "bit"),
    ("bit varying", "string", "varbit"),
    ("varbit", "string", "varbit"),
    ("tsvector", "string", "tsvector"),
    ("tsquery", "string", "tsquery"),
    ("xml", "string", "xml"),
];

const MYSQL_TYPES: &[TypeEntry] = &[
    ("varchar", "string", "varchar"),
    ("char", "string", "char"),
    ("text", "string", "text"),
    ("tinytext", "string", "tinytext"),
    ("mediumtext", "string", "mediumtext"),
    ("longtext", "string", "longtext"),
    ("int", "number", "int"),
    ("integer", "number", "int"),
    ("tinyint", "number", "tinyint"),
    ("smallint", "number", "smallint"),
    ("mediumint", "number", "mediumint"),
    ("bigint", "number", "bigint"),
    ("decimal", "number", "decimal"),
    ("numeric", "number", "decimal"),
    ("float", "number", "float"),
    ("double", "number", "double"),
    ("real", "number", "real"),
    ("boolean", "boolean", "boolean"),
    ("bool", "boolean", "boolean"),
    ("datetime", "Date", "datetime"),
    ("timestamp", "Date", "timestamp"),
    ("date", "Date", "date"),
    ("time", "string", "time"),
    ("year", "number", "year"),
    ("json", "any", "json"),
    ("binary", "Buffer", "binary"),
    ("varbinary", "Buffer", "varbinary"),
    ("tinyblob", "Buffer", "tinyblob"),
    ("blob", "Buffer", "blob"),
    ("mediumblob", "Buffer", "mediumblob"),
    ("longblob", "Buffer", "longblob"),
    ("bit", "number", "bit"),
    ("geometry", "string", "geometry"),
    ("point", "string", "point"),
    ("linestring", "string", "linestring"),
    ("polygon", "string", "polygon"),
    ("multipoint", "string", "multipoint"),
    ("multilinestring", "string", "multilinestring"),
    ("multipolygon", "string", "multipolygon"),
    ("geometrycollection", "string", "geometrycollection"),
];

const MSSQL_TYPES: &[TypeEntry] = &[
    ("varchar", "string", "varchar"),
    ("nvarchar", "string", "nvarchar"),
    ("char", "string", "char"),
    ("nchar", "string", "nchar"),
    ("text", "string", "text"),
    ("ntext", "string", "ntext"),
    ("int", "number", "int"),
    ("bigint", "number", "bigint"),
    ("smallint", "number", "smallint"),
    ("tinyint", "number", "tinyint"),
    ("decimal", "number", "decimal"),
    ("numeric", "number", "decimal"),
    ("money", "number", "money"),
    ("smallmoney", "number", "smallmoney"),
    ("float", "number", "float"),
    ("real", "number", "real"),
    ("bit", "boolean", "bit"),
    ("datetime", "Date", "datetime"),
    ("datetime2", "Date", "datetime2"),
    ("smalldatetime", "Date", "smalldatetime"),
    ("date", "Date", "date"),
    ("time", "string", "time"),
    ("datetimeoffset", "Date", "datetimeoffset"),
    // rowversion, not a point in time
    ("timestamp", "Buffer", "rowversion"),
    ("rowversion", "Buffer", "rowversion"),
    ("binary", "Buffer", "binary"),
    ("varbinary", "Buffer", "varbinary"),
    ("image", "Buffer", "image"),
    ("uniqueidentifier", "string", "uniqueidentifier"),
    ("xml", "string", "xml"),
    ("geography", "string", "geography"),
    ("geometry", "string", "geometry"),
];

/// Resolved representations of one native column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapping {
    pub host_type: String,
    pub persistence_type: String,
    pub sql_ddl_type: String,
    pub is_optional: bool,
    /// Set when no table entry or structural rule matched.
    pub is_fallback: bool,
}

impl TypeMapping {
    pub fn is_numeric(&self) -> bool {
        self.host_type == "number"
    }

    pub fn is_temporal(&self) -> bool {
        self.host_type == "Date"
    }

    pub fn is_enum(&self) -> bool {
        self.persistence_type == "enum"
    }

    pub fn is_array(&self) -> bool {
        self.host_type.ends_with("[]")
    }
}

/// Stateless resolver over the per-dialect type tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeResolver;

impl TypeResolver {
    /// Resolve a native type. Never fails.
    pub fn resolve(native_type: &str, dialect: Dialect, nullable: bool) -> TypeMapping {
        let normalized = native_type.trim().to_lowercase();
        let (host, persistence, is_fallback) = resolve_parts(&normalized, dialect);
        TypeMapping {
            sql_ddl_type: Self::to_ddl_type(&persistence, dialect),
            host_type: host,
            persistence_type: persistence,
            is_optional: nullable,
            is_fallback,
        }
    }

    /// Resolve a column, treating introspected enum values as an enumeration
    /// when the native name itself is unknown (user-defined enum types).
    pub fn resolve_column(column: &ColumnInfo, dialect: Dialect) -> TypeMapping {
        let mapping = Self::resolve(&column.native_type, dialect, column.nullable);
        let has_enum_values = column
            .enum_values
            .as_ref()
            .is_some_and(|values| !values.is_empty());
        if mapping.is_fallback && has_enum_values {
            return TypeMapping {
                host_type: "string".to_string(),
                persistence_type: "enum".to_string(),
                sql_ddl_type: Self::to_ddl_type("enum", dialect),
                is_optional: mapping.is_optional,
                is_fallback: false,
            };
        }
        mapping
    }

    /// Map a persistence type to the DDL token used in `CREATE TABLE`.
    pub fn to_ddl_type(persistence_type: &str, dialect: Dialect) -> String {
        let postgres = dialect == Dialect::Postgres;
        let mssql = dialect == Dialect::Mssql;
        let token = match persistence_type.to_lowercase().as_str() {
            "varchar" => "VARCHAR",
            "char" => "CHAR",
            "text" if mssql => "NVARCHAR(MAX)",
            "text" => "TEXT",
            "int" if postgres => "INTEGER",
            "int" => "INT",
            "bigint" => "BIGINT",
            "smallint" => "SMALLINT",
            "decimal" | "numeric" => "DECIMAL",
            "real" => "REAL",
            "double" if postgres => "DOUBLE PRECISION",
            "double" if mssql => "FLOAT",
            "double" => "DOUBLE",
            "float" => "FLOAT",
            "boolean" if mssql => "BIT",
            "boolean" => "BOOLEAN",
            "date" => "DATE",
            "time" => "TIME",
            "datetime" if postgres => "TIMESTAMP",
            "datetime" => "DATETIME",
            "timestamp" if mssql => "DATETIME2",
            "timestamp" => "TIMESTAMP",
            "timestamptz" if postgres => "TIMESTAMP WITH TIME ZONE",
            "timestamptz" if mssql => "DATETIMEOFFSET",
            "timestamptz" => "TIMESTAMP",
            "json" if mssql => "NVARCHAR(MAX)",
            "json" => "JSON",
            "jsonb" if postgres => "JSONB",
            "jsonb" if mssql => "NVARCHAR(MAX)",
            "jsonb" => "JSON",
            "uuid" if postgres => "UUID",
            "uuid" if mssql => "UNIQUEIDENTIFIER",
            "uuid" => "CHAR(36)",
            "bytea" if postgres => "BYTEA",
            "bytea" if mssql => "VARBINARY(MAX)",
            "bytea" => "BLOB",
            "enum" if dialect == Dialect::MySql => "ENUM",
            "enum" => "VARCHAR",
            "simple-array" if mssql => "NVARCHAR(MAX)",
            "simple-array" => "TEXT",
            other => return other.to_uppercase(),
        };
        token.to_string()
    }

    /// Native type names with a fixed table entry for `dialect`.
    pub fn known_native_types(dialect: Dialect) -> Vec<&'static str> {
        table_for(dialect).iter().map(|(native, _, _)| *native).collect()
    }
}

fn table_for(dialect: Dialect) -> &'static [TypeEntry] {
    match dialect {
        Dialect::Postgres => POSTGRES_TYPES,
        Dialect::MySql => MYSQL_TYPES,
        Dialect::Mssql => MSSQL_TYPES,
    }
}

fn lookup(normalized: &str, dialect: Dialect) -> Option<(String, String)> {
    table_for(dialect)
        .iter()
        .find(|(native, _, _)| *native == normalized)
        .map(|(_, host, persistence)| (host.to_string(), persistence.to_string()))
}

/// Returns `(host, persistence, is_fallback)`.
fn resolve_parts(normalized: &str, dialect: Dialect) -> (String, String, bool) {
    if let Some((host, persistence)) = lookup(normalized, dialect) {
        return (host, persistence, false);
    }

    let is_inline_enum = normalized.starts_with("enum(");
    if !is_inline_enum {
        let stripped = strip_modifiers(normalized);
        if stripped != normalized {
            if let Some((host, persistence)) = lookup(&stripped, dialect) {
                return (host, persistence, false);
            }
        }
    }

    if let Some(base) = normalized.strip_suffix("[]") {
        let (host, _, is_fallback) = resolve_parts(base.trim(), dialect);
        return (format!("{host}[]"), "simple-array".to_string(), is_fallback);
    }

    if is_inline_enum || normalized.contains("enum") {
        return ("string".to_string(), "enum".to_string(), false);
    }

    ("any".to_string(), "text".to_string(), true)
}

/// Drop length/precision modifiers and MySQL sign attributes:
/// `timestamp(6) without time zone` -> `timestamp without time zone`.
fn strip_modifiers(normalized: &str) -> String {
    let mut out = String::with_capacity(normalized.len());
    let mut depth = 0usize;
    for ch in normalized.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace()
        .filter(|word| !matches!(*word, "unsigned" | "signed" | "zerofill"))
        .collect::<Vec<_>>()
        .join(" ")
}
