//! Markdown table <-> CSV codec.
//!
//! [`decode`] discovers every pipe table in a Markdown document, names them after their
//! enclosing `#` section, and renders one of them as CSV text. [`encode`] goes the other
//! way and pretty-prints CSV as a column-aligned Markdown table.
//!
//! The pair round-trips: `decode(encode(csv))` yields the same cells in the same order as
//! `csv`, including cells that contain commas or quotes. Alignment padding added by
//! [`encode`] is trimmed by [`decode`].
//!
//! The codec is pure and never fails on malformed Markdown: documents without tables decode
//! to empty CSV with no dataset names.
//!
//! ```rust
//! use data_preview::table_text::{decode, encode, TableTextOptions};
//!
//! let md = encode("name,qty\napple,3\n", &TableTextOptions::default()).unwrap();
//! let decoded = decode(&md, "");
//! assert_eq!(decoded.csv, "name,qty\napple,3\n");
//! assert!(decoded.dataset_names.is_empty());
//! ```

use std::borrow::Cow;

use serde::Deserialize;

use crate::error::{FormatError, FormatResult};

/// Options for [`encode`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableTextOptions {
    /// Cell delimiter of the CSV input. Must be ASCII.
    pub delimiter: char,
    /// Whether the first CSV row is the table header row.
    pub has_header_row: bool,
}

impl Default for TableTextOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header_row: true,
        }
    }
}

/// One pipe table found in a Markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTable {
    /// `<section title>`, or `<section title>-table-<n>` when the section has several
    /// tables. Untitled tables are numbered across the document as `table-<n>`.
    pub name: String,
    /// Data rows (header row included, separator row dropped), still `|`-delimited with
    /// the outer pipes stripped.
    pub rows: Vec<String>,
}

/// Result of [`decode`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedTables {
    /// CSV rendering of the selected table, one `\n`-terminated line per row.
    pub csv: String,
    /// Every discovered table name in document order. Empty when the document holds
    /// fewer than two tables.
    pub dataset_names: Vec<String>,
    /// Name of the table rendered into [`DecodedTables::csv`], if any.
    pub selected: Option<String>,
}

/// Decode a Markdown document into CSV text for one of its tables.
///
/// `dataset` picks a table by name; an empty or unknown name selects the first table in
/// document order. Tables above the first heading or under an empty heading are numbered
/// across the document as `table-1`, `table-2` and so on.
pub fn decode(markdown: &str, dataset: &str) -> DecodedTables {
    let tables = discover_tables(markdown);

    let selected = tables
        .iter()
        .find(|t| !dataset.is_empty() && t.name == dataset)
        .or_else(|| tables.first());

    let csv = selected.map(|t| rows_to_csv(&t.rows)).unwrap_or_default();
    let selected = selected.map(|t| t.name.clone());

    let mut dataset_names: Vec<String> = tables.into_iter().map(|t| t.name).collect();
    if dataset_names.len() == 1 {
        // Single-table documents do not expose a dataset picker.
        dataset_names.clear();
    }

    DecodedTables {
        csv,
        dataset_names,
        selected,
    }
}

/// Find every table in `markdown`, in document order.
pub fn discover_tables(markdown: &str) -> Vec<TextTable> {
    let mut out = Vec::new();
    let mut untitled = 0;
    for (title, lines) in split_sections(markdown) {
        let section_tables: Vec<Vec<String>> = split_blocks(&lines)
            .iter()
            .flat_map(|block| table_runs(block))
            .map(|run| table_rows(&run))
            .filter(|rows| !rows.is_empty())
            .collect();

        let many = section_tables.len() > 1;
        for (idx, rows) in section_tables.into_iter().enumerate() {
            let name = if title.is_empty() {
                untitled += 1;
                format!("table-{untitled}")
            } else if many {
                format!("{title}-table-{}", idx + 1)
            } else {
                title.clone()
            };
            tracing::trace!(table = %name, rows = rows.len(), "discovered markdown table");
            out.push(TextTable { name, rows });
        }
    }
    out
}

/// Sections start at lines beginning with `#`. Text before the first heading forms an
/// untitled section.
fn split_sections(markdown: &str) -> Vec<(String, Vec<&str>)> {
    let mut sections: Vec<(String, Vec<&str>)> = vec![(String::new(), Vec::new())];
    for line in markdown.lines() {
        if line.starts_with('#') {
            let title = line.trim_start_matches('#').trim().to_string();
            sections.push((title, Vec::new()));
        } else if let Some((_, lines)) = sections.last_mut() {
            lines.push(line);
        }
    }
    sections
}

fn split_blocks<'a>(lines: &[&'a str]) -> Vec<Vec<&'a str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Maximal runs of consecutive lines containing a `|`.
fn table_runs<'a>(block: &[&'a str]) -> Vec<Vec<&'a str>> {
    let mut runs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in block {
        if line.contains('|') {
            current.push(line);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn table_rows(run: &[&str]) -> Vec<String> {
    let mut rows = Vec::new();
    for (idx, line) in run.iter().enumerate() {
        if is_header_separator(line) {
            continue;
        }
        let row = strip_outer_pipes(line.trim());
        // A blank line right above the separator is a table without a header row.
        let blank_header = idx == 0 && run.get(1).is_some_and(|next| is_header_separator(next));
        if blank_header && row.trim().is_empty() {
            continue;
        }
        rows.push(row.to_string());
    }
    rows
}

/// `|---|:--:|` style lines: dashes, and nothing else once pipes, colons and spaces are removed.
fn is_header_separator(line: &str) -> bool {
    line.contains('-')
        && line
            .chars()
            .all(|c| matches!(c, '|' | ':' | '-') || c.is_whitespace())
}

fn strip_outer_pipes(row: &str) -> &str {
    let row = row.strip_prefix('|').unwrap_or(row);
    row.strip_suffix('|').unwrap_or(row)
}

fn rows_to_csv(rows: &[String]) -> String {
    let mut csv = String::new();
    for row in rows {
        let cells: Vec<String> = row.split(" | ").map(csv_cell).collect();
        match cells.as_slice() {
            // CSV readers skip blank lines, so a lone empty cell is quoted.
            [only] if only.is_empty() => csv.push_str("\"\""),
            _ => csv.push_str(&cells.join(",")),
        }
        csv.push('\n');
    }
    csv
}

fn csv_cell(cell: &str) -> String {
    let cell = cell.trim();
    if cell.contains('"') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else if cell.contains(',') {
        format!("\"{cell}\"")
    } else {
        cell.to_string()
    }
}

/// Encode CSV text as a column-aligned Markdown table.
///
/// Cells are padded to the widest cell of their column. Rows with missing cells are
/// padded with empty cells. Without a header row the header line is left blank and the
/// separator line is still emitted.
pub fn encode(csv_text: &str, options: &TableTextOptions) -> FormatResult<String> {
    let delimiter = u8::try_from(options.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            FormatError::invalid(format!(
                "table delimiter must be an ASCII character, got {:?}",
                options.delimiter
            ))
        })?;

    // Tabs would misalign the padded columns.
    let text: Cow<'_, str> = if delimiter != b'\t' {
        Cow::Owned(csv_text.replace('\t', "    "))
    } else {
        Cow::Borrowed(csv_text)
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut table: Vec<Vec<String>> = Vec::new();
    let mut widths: Vec<usize> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        for (idx, cell) in cells.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(idx) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
        table.push(cells);
    }

    if table.is_empty() {
        return Ok(String::new());
    }

    let mut rows = table.iter();
    let header = if options.has_header_row {
        rows.next().map(|cells| table_line(cells, &widths)).unwrap_or_default()
    } else {
        let mut line: String = widths
            .iter()
            .map(|w| format!("|{}", " ".repeat(w + 2)))
            .collect();
        line.push_str("| \n");
        line
    };

    let mut separator: String = widths
        .iter()
        .map(|w| format!("|{}", "-".repeat(w + 2)))
        .collect();
    separator.push_str("| \n");

    let mut out = header;
    out.push_str(&separator);
    for cells in rows {
        out.push_str(&table_line(cells, &widths));
    }
    Ok(out)
}

fn table_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, width) in widths.iter().enumerate() {
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        let pad = width.saturating_sub(cell.chars().count());
        line.push_str("| ");
        line.push_str(cell);
        line.push_str(&" ".repeat(pad));
        line.push(' ');
    }
    line.push_str("| \n");
    line
}
