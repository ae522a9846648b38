//! Delimited text (CSV/TSV/plain text).

use crate::error::{FormatError, FormatResult};
use crate::formats::FormatFamily;
use crate::types::{column_union, Row};

use super::{decode_text, DataProvider, ParseContext, ParsedSource, Payload, SerializeContext};

#[derive(Debug, Default, Clone, Copy)]
pub struct DelimitedTextProvider;

impl DataProvider for DelimitedTextProvider {
    fn family(&self) -> FormatFamily {
        FormatFamily::DelimitedText
    }

    /// Returns the text unsplit; see [`Payload::into_rows`].
    fn parse(&self, ctx: &ParseContext<'_>, bytes: &[u8]) -> FormatResult<ParsedSource> {
        let text = decode_text(bytes);
        let delimiter = match ctx.token.as_str() {
            "tsv" | "tab" => b'\t',
            "txt" => sniff_delimiter(&text),
            _ => b',',
        };
        Ok(ParsedSource::new(Payload::Delimited { text, delimiter }))
    }

    fn serialize(&self, ctx: &SerializeContext<'_>, rows: &[Row]) -> FormatResult<Vec<u8>> {
        let delimiter = match ctx.token.as_str() {
            "csv" => b',',
            "tsv" | "tab" => b'\t',
            other => {
                return Err(FormatError::unsupported(format!(
                    "delimited text cannot be written as '{other}'"
                )));
            }
        };
        write_delimited(rows, delimiter)
    }
}

/// Tab when the first line contains one, comma otherwise.
fn sniff_delimiter(text: &str) -> u8 {
    match text.lines().next() {
        Some(first) if first.contains('\t') => b'\t',
        _ => b',',
    }
}

/// Write rows with a header of their column union. Missing cells are written empty.
pub(crate) fn write_delimited(rows: &[Row], delimiter: u8) -> FormatResult<Vec<u8>> {
    let columns = column_union(rows);
    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(&columns)?;
    for row in rows {
        writer.write_record(
            columns
                .iter()
                .map(|c| row.get(c).map(|v| v.to_text()).unwrap_or_default()),
        )?;
    }
    writer
        .into_inner()
        .map_err(|e| FormatError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::FlattenPolicy;
    use crate::formats::FormatToken;
    use crate::types::Value;

    #[test]
    fn txt_sniffs_tab_from_first_line() {
        let token = FormatToken::from_source("notes.txt");
        let ctx = ParseContext {
            token: &token,
            dataset: "",
            flatten: FlattenPolicy::default(),
        };
        let parsed = DelimitedTextProvider.parse(&ctx, b"a\tb\n1\t2\n").unwrap();
        assert!(matches!(parsed.payload, Payload::Delimited { delimiter: b'\t', .. }));
    }

    #[test]
    fn write_fills_missing_cells() {
        let rows = vec![
            Row::new().with("a", 1i64),
            Row::new().with("b", "x,y").with("a", Value::Null),
        ];
        let out = write_delimited(&rows, b',').unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b\n1,\n,\"x,y\"\n");
    }
}
