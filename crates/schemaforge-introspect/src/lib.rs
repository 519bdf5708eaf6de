//! Database catalog introspection.
//!
//! Each supported dialect implements [`SchemaIntrospector`]; [`connect`]
//! picks the adapter from a connection descriptor.

pub mod assemble;
pub mod factory;
pub mod introspector;
pub mod mysql;
pub mod options;
pub mod postgres;

pub use factory::{DatabaseHandle, connect};
pub use introspector::{SchemaIntrospector, TableRef};
pub use mysql::MySqlIntrospector;
pub use options::IntrospectOptions;
pub use postgres::PostgresIntrospector;

pub use schemaforge_core::DatabaseSchema;
