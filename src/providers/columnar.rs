//! Columnar binary formats: Apache Parquet and Arrow IPC (file or stream).
//!
//! Parquet rows come from the parquet record API. Arrow IPC batches are rendered through
//! the arrow JSON writer and flattened along the Arrow schema. Both report a [`Schema`] whose field names follow
//! the same [`join_key`] policy as the rows.
//!
//! Saving infers an Arrow schema from the rows and writes one record batch.

use std::io::Cursor;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use arrow::datatypes::{DataType, Fields, Schema as ArrowSchema};
use arrow::error::ArrowError;
use arrow::ipc::reader::{FileReader as IpcFileReader, StreamReader as IpcStreamReader};
use arrow::json::reader::infer_json_schema_from_iterator;
use parquet::arrow::ArrowWriter;
use parquet::basic::{ConvertedType, Repetition, Type as PhysicalType};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field as ParquetField;
use parquet::schema::types::Type as ParquetType;

use crate::error::{FormatError, FormatResult};
use crate::flatten::{join_key, FlattenPolicy};
use crate::formats::FormatFamily;
use crate::temporal;
use crate::types::{Field, LogicalType, Row, Schema, Value};

use super::{DataProvider, ParseContext, ParsedSource, SerializeContext};

#[derive(Debug, Default, Clone, Copy)]
pub struct ColumnarProvider;

impl DataProvider for ColumnarProvider {
    fn family(&self) -> FormatFamily {
        FormatFamily::ColumnarBinary
    }

    fn parse(&self, ctx: &ParseContext<'_>, bytes: &[u8]) -> FormatResult<ParsedSource> {
        match ctx.token.as_str() {
            "arrow" | "arr" | "feather" => parse_arrow_ipc(bytes, ctx.flatten),
            _ => parse_parquet(bytes, ctx.flatten),
        }
    }

    fn serialize(&self, ctx: &SerializeContext<'_>, rows: &[Row]) -> FormatResult<Vec<u8>> {
        let batch = rows_to_batch(rows)?;
        match ctx.token.as_str() {
            "arrow" | "arr" | "feather" => write_arrow_ipc(&batch),
            _ => write_parquet(&batch),
        }
    }
}

// ---------------------------------------------------------------------------------------
// Parquet

fn parse_parquet(bytes: &[u8], policy: FlattenPolicy) -> FormatResult<ParsedSource> {
    let reader = SerializedFileReader::new(bytes::Bytes::copy_from_slice(bytes))?;

    let root = reader.metadata().file_metadata().schema();
    let mut schema = Schema::default();
    for field in root.get_fields() {
        parquet_schema_field(&mut schema, "", field, policy);
    }

    let mut rows = Vec::new();
    for row in reader.get_row_iter(None)? {
        let row = row?;
        let mut out = Row::new();
        push_parquet_group(&mut out, "", root.get_fields(), &row, policy);
        rows.push(out);
    }

    Ok(ParsedSource::rows(rows).with_schema(schema))
}

fn parquet_schema_field(schema: &mut Schema, prefix: &str, field: &ParquetType, policy: FlattenPolicy) {
    let name = join_key(prefix, field.name(), policy);
    let info = field.get_basic_info();

    if is_struct_group(field) {
        for child in field.get_fields() {
            parquet_schema_field(schema, &name, child, policy);
        }
        return;
    }
    if field.is_group() {
        schema.push(Field::new(name, LogicalType::String));
        return;
    }

    let logical_type = match (info.converted_type(), field.get_physical_type()) {
        (ConvertedType::DATE, _) => LogicalType::Date,
        (ConvertedType::TIMESTAMP_MILLIS | ConvertedType::TIMESTAMP_MICROS, _)
        | (_, PhysicalType::INT96) => LogicalType::DateTime,
        (ConvertedType::DECIMAL, _) => LogicalType::Float,
        (ConvertedType::UTF8 | ConvertedType::ENUM | ConvertedType::JSON, _) => LogicalType::String,
        (_, PhysicalType::BOOLEAN) => LogicalType::Boolean,
        (_, PhysicalType::INT32 | PhysicalType::INT64) => LogicalType::Integer,
        (_, PhysicalType::FLOAT | PhysicalType::DOUBLE) => LogicalType::Float,
        _ => LogicalType::String,
    };
    schema.push(Field::new(name, logical_type));
}

/// Groups other than lists, maps and repeated groups flatten into their children.
fn is_struct_group(field: &ParquetType) -> bool {
    let info = field.get_basic_info();
    field.is_group()
        && !(info.has_repetition() && info.repetition() == Repetition::REPEATED)
        && !matches!(
            info.converted_type(),
            ConvertedType::LIST | ConvertedType::MAP | ConvertedType::MAP_KEY_VALUE
        )
}

fn push_parquet_group(
    row: &mut Row,
    prefix: &str,
    fields: &[Arc<ParquetType>],
    group: &parquet::record::Row,
    policy: FlattenPolicy,
) {
    for field in fields {
        let value = group
            .get_column_iter()
            .find(|(name, _)| name.as_str() == field.name())
            .map(|(_, value)| value);
        push_parquet_field(row, prefix, field, value, policy);
    }
}

fn push_parquet_field(
    row: &mut Row,
    prefix: &str,
    field: &ParquetType,
    value: Option<&ParquetField>,
    policy: FlattenPolicy,
) {
    let name = join_key(prefix, field.name(), policy);
    if !is_struct_group(field) {
        row.insert(name, value.map_or(Value::Null, parquet_value));
        return;
    }
    match value {
        Some(ParquetField::Group(group)) => {
            push_parquet_group(row, &name, field.get_fields(), group, policy);
        }
        // A null group still reports each leaf column.
        _ => {
            for child in field.get_fields() {
                push_parquet_field(row, &name, child, None, policy);
            }
        }
    }
}

fn parquet_value(field: &ParquetField) -> Value {
    match field {
        ParquetField::Null => Value::Null,
        ParquetField::Bool(b) => Value::Bool(*b),
        ParquetField::Byte(v) => Value::Int64(i64::from(*v)),
        ParquetField::Short(v) => Value::Int64(i64::from(*v)),
        ParquetField::Int(v) => Value::Int64(i64::from(*v)),
        ParquetField::Long(v) => Value::Int64(*v),
        ParquetField::UByte(v) => Value::Int64(i64::from(*v)),
        ParquetField::UShort(v) => Value::Int64(i64::from(*v)),
        ParquetField::UInt(v) => Value::Int64(i64::from(*v)),
        ParquetField::ULong(v) => match i64::try_from(*v) {
            Ok(i) => Value::Int64(i),
            Err(_) => Value::Utf8(v.to_string()),
        },
        ParquetField::Float(v) => Value::Float64(f64::from(*v)),
        ParquetField::Double(v) => Value::Float64(*v),
        ParquetField::Str(s) => Value::Utf8(s.clone()),
        ParquetField::Date(days) => Value::Utf8(temporal::format_date(*days)),
        ParquetField::TimestampMillis(ms) => Value::Utf8(temporal::format_timestamp_millis(*ms)),
        ParquetField::TimestampMicros(us) => Value::Utf8(temporal::format_timestamp_micros(*us)),
        // Decimals, bytes, lists and maps keep the record API's text rendering.
        other => Value::Utf8(other.to_string()),
    }
}

// ---------------------------------------------------------------------------------------
// Arrow IPC

fn parse_arrow_ipc(bytes: &[u8], policy: FlattenPolicy) -> FormatResult<ParsedSource> {
    let (arrow_schema, batches) = match IpcFileReader::try_new(Cursor::new(bytes), None) {
        Ok(reader) => {
            let schema = reader.schema();
            let batches = reader.collect::<Result<Vec<_>, ArrowError>>()?;
            (schema, batches)
        }
        Err(file_err) => match IpcStreamReader::try_new(Cursor::new(bytes), None) {
            Ok(reader) => {
                let schema = reader.schema();
                let batches = reader.collect::<Result<Vec<_>, ArrowError>>()?;
                (schema, batches)
            }
            Err(_) => return Err(file_err.into()),
        },
    };

    let mut schema = Schema::default();
    arrow_schema_fields(&mut schema, "", arrow_schema.fields(), policy);

    let rows = batches_to_rows(&batches, arrow_schema.fields(), policy)?;
    Ok(ParsedSource::rows(rows).with_schema(schema))
}

fn batches_to_rows(batches: &[RecordBatch], fields: &Fields, policy: FlattenPolicy) -> FormatResult<Vec<Row>> {
    let mut writer = arrow::json::ArrayWriter::new(Vec::new());
    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer.write_batches(&refs)?;
    writer.finish()?;
    let buf = writer.into_inner();
    if buf.is_empty() {
        return Ok(Vec::new());
    }

    let values: Vec<serde_json::Value> = serde_json::from_slice(&buf)?;
    Ok(values
        .iter()
        .filter_map(serde_json::Value::as_object)
        .map(|obj| {
            let mut row = Row::new();
            push_arrow_object(&mut row, "", fields, obj, policy);
            row
        })
        .collect())
}

/// Only struct columns flatten; lists and maps stay one text cell. The JSON writer leaves
/// nulls out, and so does the row.
fn push_arrow_object(
    row: &mut Row,
    prefix: &str,
    fields: &Fields,
    object: &serde_json::Map<String, serde_json::Value>,
    policy: FlattenPolicy,
) {
    for field in fields {
        let Some(value) = object.get(field.name()) else {
            continue;
        };
        let name = join_key(prefix, field.name(), policy);
        match (field.data_type(), value) {
            (DataType::Struct(children), serde_json::Value::Object(child)) => {
                push_arrow_object(row, &name, children, child, policy);
            }
            (DataType::Struct(_), _) => {}
            (_, value) => row.insert(name, Value::from_json(value)),
        }
    }
}

fn arrow_schema_fields(schema: &mut Schema, prefix: &str, fields: &Fields, policy: FlattenPolicy) {
    for field in fields {
        let name = join_key(prefix, field.name(), policy);
        match field.data_type() {
            DataType::Struct(children) => arrow_schema_fields(schema, &name, children, policy),
            dt => {
                schema.push(Field::new(name, arrow_logical_type(dt)));
            }
        }
    }
}

fn arrow_logical_type(data_type: &DataType) -> LogicalType {
    match data_type {
        DataType::Boolean => LogicalType::Boolean,
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => LogicalType::Integer,
        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => LogicalType::Float,
        DataType::Date32 | DataType::Date64 => LogicalType::Date,
        DataType::Timestamp(_, _) => LogicalType::DateTime,
        _ => LogicalType::String,
    }
}

// ---------------------------------------------------------------------------------------
// Writing

fn rows_to_batch(rows: &[Row]) -> FormatResult<RecordBatch> {
    let values: Vec<serde_json::Value> = rows.iter().map(Row::to_json).collect();
    let schema = infer_json_schema_from_iterator(values.iter().map(Ok::<_, ArrowError>))?;
    if schema.fields().is_empty() {
        return Err(FormatError::invalid(
            "columnar files need at least one column",
        ));
    }

    // Inference widens mixed columns to Utf8; coercion lets the numbers in them through.
    let schema = Arc::new(schema);
    let mut decoder = arrow::json::ReaderBuilder::new(schema.clone())
        .with_batch_size(values.len().max(1))
        .with_coerce_primitive(true)
        .build_decoder()?;
    decoder.serialize(&values)?;
    match decoder.flush()? {
        Some(batch) => Ok(batch),
        None => Ok(RecordBatch::new_empty(schema)),
    }
}

fn write_parquet(batch: &RecordBatch) -> FormatResult<Vec<u8>> {
    let mut writer = ArrowWriter::try_new(Vec::new(), batch.schema(), None)?;
    writer.write(batch)?;
    Ok(writer.into_inner()?)
}

fn write_arrow_ipc(batch: &RecordBatch) -> FormatResult<Vec<u8>> {
    let schema: Arc<ArrowSchema> = batch.schema();
    let mut writer = arrow::ipc::writer::FileWriter::try_new(Vec::new(), &schema)?;
    writer.write(batch)?;
    writer.finish()?;
    Ok(writer.into_inner()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FormatToken;
    use crate::table_text::TableTextOptions;

    fn roundtrip(target: &str, rows: &[Row]) -> ParsedSource {
        let token = FormatToken::from_source(target);
        let opts = TableTextOptions::default();
        let sctx = SerializeContext {
            token: &token,
            dataset: "",
            table_text: &opts,
        };
        let bytes = ColumnarProvider.serialize(&sctx, rows).unwrap();
        let pctx = ParseContext {
            token: &token,
            dataset: "",
            flatten: FlattenPolicy::default(),
        };
        ColumnarProvider.parse(&pctx, &bytes).unwrap()
    }

    fn sample_rows() -> Vec<Row> {
        vec![
            Row::new().with("id", 1i64).with("name", "Ada").with("score", 98.5),
            Row::new().with("id", 2i64).with("name", "Grace").with("score", 87.25),
        ]
    }

    #[test]
    fn parquet_written_rows_read_back_with_schema() {
        let parsed = roundtrip("out.parquet", &sample_rows());
        let schema = parsed.schema.unwrap();
        assert_eq!(schema.type_of("id"), Some(LogicalType::Integer));
        assert_eq!(schema.type_of("score"), Some(LogicalType::Float));
        assert_eq!(schema.type_of("name"), Some(LogicalType::String));

        let rows = parsed.payload.into_rows().unwrap();
        assert_eq!(rows[1].get("name"), Some(&Value::Utf8("Grace".into())));
    }

    #[test]
    fn arrow_ipc_written_rows_read_back() {
        let parsed = roundtrip("out.arrow", &sample_rows());
        let rows = parsed.payload.into_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), Some(&Value::Int64(1)));
    }

    #[test]
    fn empty_rows_are_rejected() {
        let token = FormatToken::from_source("out.parquet");
        let opts = TableTextOptions::default();
        let sctx = SerializeContext {
            token: &token,
            dataset: "",
            table_text: &opts,
        };
        assert!(ColumnarProvider.serialize(&sctx, &[]).is_err());
    }
}
