//! Batched, optionally masked `INSERT` script export.
//!
//! Rows are read through a [`RowSource`], typed with the shared type
//! resolver, masked per column and written in fixed-size batches, one file
//! per batch, followed by a Markdown summary of the run.

pub mod engine;
pub mod errors;
pub mod format;
pub mod masking;
pub mod model;
pub mod source;

pub use engine::{ExportEngine, NO_DATA_MARKER, SUMMARY_FILE};
pub use errors::ExportError;
pub use masking::Masker;
pub use model::{ExportReport, ExportStatus, TableExport};
pub use source::{MemoryRowSource, MySqlRowSource, PgRowSource, Row, RowQuery, RowSource};
