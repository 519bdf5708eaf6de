//! Source artifact generation for schemaforge.
//!
//! This crate turns a `DatabaseSchema` plus a `GenerationConfig` into data
//! model classes, transfer objects, CRUD layers, SQL DDL and the wiring that
//! ties them together. It can also read an entity directory back into a
//! schema so DDL can be produced without a database.

pub mod engine;
pub mod entity_parser;
pub mod errors;
pub mod generators;
pub mod index;
pub mod model;
pub mod paths;
pub mod wiring;

pub use engine::{GenerationEngine, GenerationStage};
pub use errors::GenerationError;
pub use model::{
    ArtifactKind, ArtifactResult, GenerationIssue, GenerationReport, TableManifest, TableStatus,
};
