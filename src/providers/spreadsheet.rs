//! Spreadsheet workbooks (`.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`).
//!
//! Reading requires the `excel` feature (calamine); `.xlsx` saving uses rust_xlsxwriter.
//! Without the feature the provider stays registered and reports every call as
//! unsupported, so workbooks never fall through to the config provider.
//!
//! Behavior:
//! - Picks the requested sheet when it exists; otherwise the first sheet in the workbook
//! - Detects the first non-empty row as the header row; blank headers become `column_<n>`
//!   and repeated headers get a `_2`, `_3`, ... suffix
//! - Skips fully empty rows and omits empty cells from their row
//! - Lists every sheet name when the workbook has more than one sheet

use crate::error::FormatResult;
use crate::formats::FormatFamily;
use crate::types::Row;

use super::{DataProvider, ParseContext, ParsedSource, SerializeContext};

#[derive(Debug, Default, Clone, Copy)]
pub struct SpreadsheetProvider;

impl DataProvider for SpreadsheetProvider {
    fn family(&self) -> FormatFamily {
        FormatFamily::SpreadsheetLike
    }

    fn parse(&self, ctx: &ParseContext<'_>, bytes: &[u8]) -> FormatResult<ParsedSource> {
        #[cfg(feature = "excel")]
        {
            excel::parse_workbook(ctx.dataset, bytes)
        }

        #[cfg(not(feature = "excel"))]
        {
            let _ = (ctx, bytes);
            Err(disabled())
        }
    }

    fn serialize(&self, ctx: &SerializeContext<'_>, rows: &[Row]) -> FormatResult<Vec<u8>> {
        #[cfg(feature = "excel")]
        {
            match ctx.token.as_str() {
                "xlsx" => excel::write_xlsx(ctx.dataset, rows),
                other => Err(crate::error::FormatError::unsupported(format!(
                    "workbooks can only be written as 'xlsx', not '{other}'"
                ))),
            }
        }

        #[cfg(not(feature = "excel"))]
        {
            let _ = (ctx, rows);
            Err(disabled())
        }
    }
}

#[cfg(not(feature = "excel"))]
fn disabled() -> crate::error::FormatError {
    crate::error::FormatError::unsupported(
        "spreadsheet support not enabled (enable cargo feature 'excel')",
    )
}

#[cfg(feature = "excel")]
mod excel {
    use std::io::Cursor;

    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use rust_xlsxwriter::Workbook;

    use crate::error::{FormatError, FormatResult};
    use crate::providers::{header_columns, ParsedSource};
    use crate::temporal;
    use crate::types::{column_union, Row, Value};

    pub(super) fn parse_workbook(dataset: &str, bytes: &[u8]) -> FormatResult<ParsedSource> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        let sheets = workbook.sheet_names();
        let Some(sheet) = sheets
            .iter()
            .find(|s| !dataset.is_empty() && s.as_str() == dataset)
            .or_else(|| sheets.first())
            .cloned()
        else {
            return Ok(ParsedSource::rows(Vec::new()));
        };

        let range = workbook.worksheet_range(&sheet)?;
        let rows = sheet_rows(&range);
        tracing::debug!(sheet = %sheet, rows = rows.len(), "read worksheet");

        let dataset_names = if sheets.len() > 1 { sheets } else { Vec::new() };
        Ok(ParsedSource::rows(rows).with_dataset_names(dataset_names))
    }

    fn sheet_rows(range: &calamine::Range<Data>) -> Vec<Row> {
        let mut iter = range
            .rows()
            .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)));

        let Some(header_row) = iter.next() else {
            return Vec::new();
        };
        let header_text: Vec<String> = header_row.iter().map(Data::to_string).collect();
        let headers = header_columns(header_text.iter().map(String::as_str));

        iter.map(|cells| {
            let mut row = Row::new();
            for (idx, cell) in cells.iter().enumerate() {
                if matches!(cell, Data::Empty) {
                    continue;
                }
                let name = headers
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format!("column_{}", idx + 1));
                row.insert(name, cell_value(cell));
            }
            row
        })
        .collect()
    }

    fn cell_value(cell: &Data) -> Value {
        match cell {
            Data::Empty => Value::Null,
            Data::Int(v) => Value::Int64(*v),
            Data::Float(v) => Value::Float64(*v),
            Data::Bool(v) => Value::Bool(*v),
            Data::String(s) => Value::Utf8(s.clone()),
            Data::DateTime(dt) if dt.is_duration() => match dt.as_duration() {
                Some(delta) => Value::Utf8(temporal::format_duration(delta)),
                None => Value::Float64(dt.as_f64()),
            },
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(datetime) => Value::Utf8(temporal::format_datetime(datetime)),
                None => Value::Float64(dt.as_f64()),
            },
            other => Value::Utf8(other.to_string()),
        }
    }

    pub(super) fn write_xlsx(dataset: &str, rows: &[Row]) -> FormatResult<Vec<u8>> {
        let columns = column_union(rows);
        let mut workbook = Workbook::new();
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name(if dataset.is_empty() { "Sheet1" } else { dataset })?;

            for (idx, name) in columns.iter().enumerate() {
                sheet.write_string(0, column_index(idx)?, name.as_str())?;
            }
            for (r, row) in rows.iter().enumerate() {
                let r = u32::try_from(r + 1)
                    .map_err(|_| FormatError::invalid("too many rows for a worksheet"))?;
                for (idx, name) in columns.iter().enumerate() {
                    let c = column_index(idx)?;
                    match row.get(name) {
                        Some(Value::Int64(v)) => {
                            sheet.write_number(r, c, *v as f64)?;
                        }
                        Some(Value::Float64(v)) => {
                            sheet.write_number(r, c, *v)?;
                        }
                        Some(Value::Bool(v)) => {
                            sheet.write_boolean(r, c, *v)?;
                        }
                        Some(Value::Utf8(s)) => {
                            sheet.write_string(r, c, s.as_str())?;
                        }
                        Some(Value::Null) | None => {}
                    }
                }
            }
        }
        Ok(workbook.save_to_buffer()?)
    }

    fn column_index(idx: usize) -> FormatResult<u16> {
        u16::try_from(idx).map_err(|_| FormatError::invalid("too many columns for a worksheet"))
    }
}
