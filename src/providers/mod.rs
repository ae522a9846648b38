//! Format providers.
//!
//! Each [`DataProvider`] owns one [`FormatFamily`] and the tokens the family claims in
//! [`crate::formats::FORMAT_DESCRIPTORS`]. Providers are pure byte-in/byte-out: reading and
//! writing files is left to the [`crate::ingestion::IngestionCoordinator`].
//!
//! - [`delimited`]: CSV/TSV/plain text
//! - [`config`]: JSON, JSON5, HJSON, YAML, TOML, properties/INI (the fallback provider)
//! - [`spreadsheet`]: workbooks (feature `excel`)
//! - [`columnar`]: Parquet and Arrow IPC
//! - [`avro`]: Avro object container files (feature `avro`)
//! - [`markdown`]: Markdown tables via [`crate::table_text`]

use std::fmt;
use std::sync::Arc;

use crate::error::{FormatError, FormatResult};
use crate::flatten::FlattenPolicy;
use crate::formats::{self, FormatFamily, FormatToken};
use crate::table_text::TableTextOptions;
use crate::types::{Row, Schema, Value};

pub mod avro;
pub mod columnar;
pub mod config;
pub mod delimited;
pub mod markdown;
pub mod spreadsheet;

pub use avro::AvroProvider;
pub use columnar::ColumnarProvider;
pub use config::HierarchicalConfigProvider;
pub use delimited::DelimitedTextProvider;
pub use markdown::MarkdownTableProvider;
pub use spreadsheet::SpreadsheetProvider;

/// Per-call inputs for [`DataProvider::parse`].
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub token: &'a FormatToken,
    /// Requested dataset (sheet or table) name. Empty selects the default dataset.
    pub dataset: &'a str,
    pub flatten: FlattenPolicy,
}

/// Per-call inputs for [`DataProvider::serialize`].
#[derive(Debug, Clone, Copy)]
pub struct SerializeContext<'a> {
    /// Token of the target, which may differ from the token the rows were loaded from.
    pub token: &'a FormatToken,
    pub dataset: &'a str,
    pub table_text: &'a TableTextOptions,
}

/// Parsed content in the shape its provider produces it.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw delimited text with a header row; split into rows by [`Payload::into_rows`].
    Delimited { text: String, delimiter: u8 },
    /// Already-normalized rows.
    Rows(Vec<Row>),
}

impl Payload {
    /// Normalize into rows. Delimited text is split with its header row as keys; empty
    /// cells become [`Value::Null`].
    pub fn into_rows(self) -> FormatResult<Vec<Row>> {
        match self {
            Self::Rows(rows) => Ok(rows),
            Self::Delimited { text, delimiter } => split_delimited(&text, delimiter),
        }
    }

    /// Number of data rows (the header row of delimited text is not counted).
    pub fn row_count(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::Delimited { text, delimiter } => csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .delimiter(*delimiter)
                .from_reader(text.as_bytes())
                .records()
                .count(),
        }
    }
}

fn split_delimited(text: &str, delimiter: u8) -> FormatResult<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let headers = header_columns(reader.headers()?.iter());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = Row::new();
        for (idx, cell) in record.iter().enumerate() {
            let name = headers
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("column_{}", idx + 1));
            let value = if cell.is_empty() {
                Value::Null
            } else {
                Value::Utf8(cell.to_string())
            };
            row.insert(name, value);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Column names for a header row: blank headers become `column_<n>` and repeated ones get
/// a `_2`, `_3`, ... suffix.
pub(crate) fn header_columns<'a>(headers: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (idx, header) in headers.into_iter().enumerate() {
        let base = match header.trim() {
            "" => format!("column_{}", idx + 1),
            name => name.to_string(),
        };
        let mut name = base.clone();
        let mut n = 1;
        while names.contains(&name) {
            n += 1;
            name = format!("{base}_{n}");
        }
        names.push(name);
    }
    names
}

/// Result of a successful [`DataProvider::parse`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSource {
    pub payload: Payload,
    /// All datasets the source holds. Empty for single-dataset sources.
    pub dataset_names: Vec<String>,
    /// Field types for formats that carry explicit typing.
    pub schema: Option<Schema>,
}

impl ParsedSource {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            dataset_names: Vec::new(),
            schema: None,
        }
    }

    pub fn rows(rows: Vec<Row>) -> Self {
        Self::new(Payload::Rows(rows))
    }

    pub fn with_dataset_names(mut self, names: Vec<String>) -> Self {
        self.dataset_names = names;
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// A format family's parse/serialize implementation.
///
/// Implementations must be stateless (or internally synchronized): one provider instance
/// serves every source with one of its tokens, possibly from several threads.
pub trait DataProvider: Send + Sync {
    fn family(&self) -> FormatFamily;

    /// Tokens (extensions or well-known file names) this provider claims.
    fn tokens(&self) -> Vec<String> {
        formats::tokens_for(self.family())
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Parse source bytes. The requested dataset may be ignored by single-dataset formats.
    fn parse(&self, ctx: &ParseContext<'_>, bytes: &[u8]) -> FormatResult<ParsedSource>;

    /// Render rows into the target format.
    fn serialize(&self, ctx: &SerializeContext<'_>, _rows: &[Row]) -> FormatResult<Vec<u8>> {
        Err(FormatError::unsupported(format!(
            "the {} provider cannot write '{}' files",
            self.family(),
            ctx.token
        )))
    }
}

impl fmt::Debug for dyn DataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProvider")
            .field("family", &self.family())
            .finish()
    }
}

/// One instance of every built-in provider, in registration order.
pub fn builtin_providers() -> Vec<Arc<dyn DataProvider>> {
    vec![
        Arc::new(DelimitedTextProvider),
        Arc::new(HierarchicalConfigProvider),
        Arc::new(SpreadsheetProvider),
        Arc::new(ColumnarProvider),
        Arc::new(AvroProvider),
        Arc::new(MarkdownTableProvider),
    ]
}

/// Source bytes as text, without a UTF-8 byte-order mark.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
