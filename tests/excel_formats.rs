#![cfg(feature = "excel")]

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use data_preview::ingestion::{IngestionCoordinator, IngestionOptions};
use data_preview::types::{Row, Value};
use data_preview::IngestionError;

fn coordinator() -> IngestionCoordinator {
    IngestionCoordinator::with_builtin_providers(IngestionOptions::default()).unwrap()
}

fn text(v: &str) -> Value {
    Value::Utf8(v.to_string())
}

/// Sheets `Summary`, `Sparse` and `Dates`.
fn write_report_xlsx(path: &Path) {
    let mut wb = Workbook::new();

    let ws = wb.add_worksheet();
    ws.set_name("Summary").unwrap();
    ws.write_string(0, 0, "region").unwrap();
    ws.write_string(0, 1, "total").unwrap();
    ws.write_string(1, 0, "north").unwrap();
    ws.write_number(1, 1, 12.5).unwrap();
    ws.write_string(2, 0, "south").unwrap();
    ws.write_number(2, 1, 7.25).unwrap();

    // Blank header in column B, an empty row 2 and a sparse row 3.
    let ws = wb.add_worksheet();
    ws.set_name("Sparse").unwrap();
    ws.write_string(0, 0, "name").unwrap();
    ws.write_string(0, 2, "qty").unwrap();
    ws.write_string(1, 0, "bolt").unwrap();
    ws.write_string(1, 1, "zinc").unwrap();
    ws.write_number(1, 2, 40).unwrap();
    ws.write_string(3, 0, "nut").unwrap();

    let ws = wb.add_worksheet();
    ws.set_name("Dates").unwrap();
    let date = Format::new().set_num_format("yyyy-mm-dd");
    ws.write_string(0, 0, "when").unwrap();
    ws.write_boolean(0, 1, true).unwrap();
    ws.write_number_with_format(1, 0, 45_000, &date).unwrap();
    ws.write_boolean(1, 1, false).unwrap();

    wb.save(path).unwrap();
}

#[test]
fn first_sheet_is_default_and_all_sheets_are_listed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.xlsx");
    write_report_xlsx(&path);
    let source = path.to_str().unwrap();

    let c = coordinator();
    let rows = c.load(source, "").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("region"), Some(&text("north")));
    assert_eq!(rows[1].get("total"), Some(&Value::Float64(7.25)));
    assert_eq!(c.list_datasets(source), vec!["Summary", "Sparse", "Dates"]);
}

#[test]
fn named_sheet_is_selected_and_unknown_sheet_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.xlsx");
    write_report_xlsx(&path);
    let source = path.to_str().unwrap();

    let c = coordinator();
    let dates = c.load(source, "Dates").unwrap();
    assert_eq!(dates.len(), 1);
    assert_eq!(dates[0].get("when"), Some(&text("2023-03-15")));
    // Non-text header cells are rendered as text.
    assert_eq!(dates[0].get("true"), Some(&Value::Bool(false)));

    let fallback = c.load(source, "Missing").unwrap();
    assert_eq!(fallback[0].get("region"), Some(&text("north")));
}

#[test]
fn early_serials_and_durations_render_as_excel_shows_them() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("times.xlsx");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    let date = Format::new().set_num_format("yyyy-mm-dd");
    let elapsed = Format::new().set_num_format("[h]:mm:ss");
    ws.write_string(0, 0, "when").unwrap();
    ws.write_string(0, 1, "took").unwrap();
    ws.write_number_with_format(1, 0, 59, &date).unwrap();
    ws.write_number_with_format(1, 1, 1.5, &elapsed).unwrap();
    ws.write_number_with_format(2, 0, 61, &date).unwrap();
    ws.write_number_with_format(2, 1, 0.25, &elapsed).unwrap();
    wb.save(&path).unwrap();

    let rows = coordinator().load(path.to_str().unwrap(), "").unwrap();
    assert_eq!(rows[0].get("when"), Some(&text("1900-02-28")));
    assert_eq!(rows[0].get("took"), Some(&text("36:00:00")));
    assert_eq!(rows[1].get("when"), Some(&text("1900-03-01")));
    assert_eq!(rows[1].get("took"), Some(&text("6:00:00")));
}

#[test]
fn blank_headers_empty_rows_and_sparse_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.xlsx");
    write_report_xlsx(&path);

    let rows = coordinator().load(path.to_str().unwrap(), "Sparse").unwrap();
    assert_eq!(rows.len(), 2);

    let cols: Vec<&str> = rows[0].columns().collect();
    assert_eq!(cols, vec!["name", "column_2", "qty"]);
    assert_eq!(rows[0].get("column_2"), Some(&text("zinc")));

    assert_eq!(rows[1], Row::new().with("name", "nut"));
}

#[test]
fn repeated_header_cells_keep_every_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("totals.xlsx");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "Total").unwrap();
    ws.write_string(0, 1, "Total").unwrap();
    ws.write_number(1, 0, 1).unwrap();
    ws.write_number(1, 1, 2).unwrap();
    wb.save(&path).unwrap();

    let rows = coordinator().load(path.to_str().unwrap(), "").unwrap();
    let cols: Vec<&str> = rows[0].columns().collect();
    assert_eq!(cols, vec!["Total", "Total_2"]);
    assert_eq!(rows[0].get("Total_2"), Some(&Value::Float64(2.0)));
}

#[test]
fn single_sheet_workbook_lists_no_datasets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.xlsx");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "only").unwrap();
    ws.write_string(1, 0, "row").unwrap();
    wb.save(&path).unwrap();
    let source = path.to_str().unwrap();

    let c = coordinator();
    assert_eq!(c.load(source, "").unwrap().len(), 1);
    assert!(c.list_datasets(source).is_empty());
}

#[test]
fn save_names_the_sheet_after_the_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.xlsx");
    let source = path.to_str().unwrap();
    let rows = vec![
        Row::new().with("item", "bolt").with("price", 0.5).with("stocked", true),
        Row::new().with("item", "nut").with("price", 0.25),
    ];

    let c = coordinator();
    c.save(source, &rows, "Inventory").unwrap();

    let reloaded = c.load(source, "Inventory").unwrap();
    assert_eq!(reloaded, rows);
    // One sheet, so no names are listed; the sheet still answers to its name.
    assert!(c.list_datasets(source).is_empty());

    let default_sheet = dir.path().join("default.xlsx");
    c.save(default_sheet.to_str().unwrap(), &rows, "").unwrap();
    assert_eq!(c.load(default_sheet.to_str().unwrap(), "Sheet1").unwrap(), rows);
}

#[test]
fn only_xlsx_can_be_saved() {
    let dir = tempfile::tempdir().unwrap();
    let rows = vec![Row::new().with("a", "b")];

    for name in ["out.ods", "out.xls"] {
        let target = dir.path().join(name);
        let err = coordinator()
            .save(target.to_str().unwrap(), &rows, "")
            .unwrap_err();
        assert!(matches!(err, IngestionError::SerializeFailure { .. }), "{name}");
        assert!(!target.exists());
    }
}

#[test]
fn corrupt_workbook_is_a_parse_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, b"PK\x03\x04 not really a zip").unwrap();

    let err = coordinator().load(path.to_str().unwrap(), "").unwrap_err();
    assert!(matches!(err, IngestionError::ParseFailure { .. }));
}
