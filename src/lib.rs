//! `data-preview` loads structured data files of many formats as one normalized shape
//! (rows of scalar [`types::Value`]s, plus a [`types::Schema`] for typed formats) and saves
//! edited rows back into several of those formats.
//!
//! The primary entrypoint is [`ingestion::IngestionCoordinator`], which resolves a source to
//! its [`providers::DataProvider`] by file extension (or well-known file name), falls back
//! to the config provider for anything unknown, and caches dataset names and schema per
//! source.
//!
//! ## What you can load
//!
//! **File formats (detected by extension):**
//!
//! - **Delimited text**: `.csv`, `.tsv`, `.tab`, `.txt`
//! - **Config/markup**: `.json`, `.jsonl`, `.ndjson`, `.json5`, `.hjson`, `.yaml`, `.yml`,
//!   `.edn`, `.toml`, `.properties`, `.ini`, `.env`, `.config`, plus files such as `Cargo.lock`
//! - **Spreadsheets** (Cargo feature `excel`, on by default): `.xlsx`, `.xlsm`, `.xlsb`,
//!   `.xls`, `.ods`
//! - **Columnar**: Parquet (`.parquet`, `.parq`, `.pq`) and Arrow IPC (`.arrow`, `.arr`,
//!   `.feather`)
//! - **Avro** (Cargo feature `avro`, on by default): `.avro`
//! - **Markdown tables**: `.md`, `.markdown`
//!
//! Nested values (config objects, Parquet groups, Arrow structs, Avro records) are flattened
//! into dotted column names such as `user.name`; see [`flatten::FlattenPolicy`].
//!
//! ## Quick example: load, inspect, convert
//!
//! ```no_run
//! use data_preview::ingestion::{IngestionCoordinator, IngestionOptions};
//!
//! # fn main() -> Result<(), data_preview::IngestionError> {
//! let coordinator = IngestionCoordinator::with_builtin_providers(IngestionOptions::default())?;
//!
//! let rows = coordinator.load("metrics.parquet", "")?;
//! println!("rows={}", rows.len());
//! println!("schema={:?}", coordinator.describe_schema("metrics.parquet"));
//!
//! // The target token picks the writer.
//! coordinator.save("metrics.md", &rows, "")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Markdown tables
//!
//! [`table_text`] converts between Markdown pipe tables and CSV text without any I/O:
//!
//! ```rust
//! use data_preview::table_text::decode;
//!
//! let doc = "# Fruit\n| name | qty |\n|---|---|\n| apple | 3 |\n";
//! let decoded = decode(doc, "");
//! assert_eq!(decoded.csv, "name,qty\napple,3\n");
//! assert!(decoded.dataset_names.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: coordinator, registry, cache, I/O capabilities and observers
//! - [`providers`]: one provider per format family
//! - [`table_text`]: Markdown table <-> CSV codec
//! - [`formats`]: static format descriptors and token derivation
//! - [`types`]: rows, values and schemas
//! - [`flatten`]: nested-value flattening
//! - [`error`]: error types

pub mod error;
pub mod flatten;
pub mod formats;
pub mod ingestion;
pub mod providers;
pub mod table_text;
mod temporal;
pub mod types;

pub use error::{FormatError, FormatResult, IngestionError, IngestionResult};
