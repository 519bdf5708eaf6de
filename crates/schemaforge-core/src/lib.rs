//! Core contracts and helpers for schemaforge.
//!
//! This crate defines the dialect-neutral schema model, the naming and type
//! resolution rules shared by every generator, and the run configuration.

pub mod config;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod naming;
pub mod redaction;
pub mod schema;
pub mod types;
pub mod validation;

pub use config::{
    ConnectionDescriptor, CrudOptions, EntityOptions, ExportSettings, FeatureToggles,
    GenerationConfig, MaskKind, MaskingRule, NullHandling, OutputPaths, SqlOptions,
    TableSelection,
};
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use filter::filter_tables;
pub use redaction::{RedactedConnection, redact_connection_string};
pub use schema::{
    ColumnInfo, DatabaseSchema, ForeignKeyInfo, ForeignKeyTarget, IndexInfo, TableInfo,
};
pub use types::{TypeMapping, TypeResolver};
pub use validation::{SchemaIssue, validate_schema};

/// Current contract version for `schema.json` snapshots.
pub const SCHEMA_VERSION: &str = "0.1";
