//! Markdown tables, backed by [`crate::table_text`].

use crate::error::FormatResult;
use crate::formats::FormatFamily;
use crate::table_text;
use crate::types::Row;

use super::delimited::write_delimited;
use super::{decode_text, DataProvider, ParseContext, ParsedSource, Payload, SerializeContext};

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownTableProvider;

impl DataProvider for MarkdownTableProvider {
    fn family(&self) -> FormatFamily {
        FormatFamily::LightweightTextTable
    }

    /// The selected table is returned as CSV text; every table name is listed when the
    /// document holds more than one.
    fn parse(&self, ctx: &ParseContext<'_>, bytes: &[u8]) -> FormatResult<ParsedSource> {
        let decoded = table_text::decode(&decode_text(bytes), ctx.dataset);
        Ok(ParsedSource::new(Payload::Delimited {
            text: decoded.csv,
            delimiter: b',',
        })
        .with_dataset_names(decoded.dataset_names))
    }

    /// Rows are written as delimited text with the configured delimiter, then pretty-printed.
    fn serialize(&self, ctx: &SerializeContext<'_>, rows: &[Row]) -> FormatResult<Vec<u8>> {
        let delimiter = u8::try_from(ctx.table_text.delimiter).unwrap_or(b',');
        let csv = write_delimited(rows, delimiter)?;
        let text = String::from_utf8_lossy(&csv);
        Ok(table_text::encode(&text, ctx.table_text)?.into_bytes())
    }
}
