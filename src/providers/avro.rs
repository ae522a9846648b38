//! Avro object container files (feature `avro`).
//!
//! Records are decoded with their embedded writer schema. Nested records flatten with the
//! configured [`crate::flatten::FlattenPolicy`]; optional unions are unwrapped to their value
//! and a null record becomes a null in each of its leaf columns.

use crate::error::FormatResult;
use crate::formats::FormatFamily;

use super::{DataProvider, ParseContext, ParsedSource};

#[derive(Debug, Default, Clone, Copy)]
pub struct AvroProvider;

impl DataProvider for AvroProvider {
    fn family(&self) -> FormatFamily {
        FormatFamily::RowOrientedBinary
    }

    fn parse(&self, ctx: &ParseContext<'_>, bytes: &[u8]) -> FormatResult<ParsedSource> {
        #[cfg(feature = "avro")]
        {
            container::parse_container(bytes, ctx.flatten)
        }

        #[cfg(not(feature = "avro"))]
        {
            let _ = (ctx, bytes);
            Err(crate::error::FormatError::unsupported(
                "avro support not enabled (enable cargo feature 'avro')",
            ))
        }
    }
}

#[cfg(feature = "avro")]
mod container {
    use apache_avro::types::Value as AvroValue;
    use apache_avro::{Reader, Schema as AvroSchema};

    use crate::error::FormatResult;
    use crate::flatten::{join_key, FlattenPolicy};
    use crate::providers::ParsedSource;
    use crate::temporal;
    use crate::types::{Field, LogicalType, Row, Schema, Value};

    pub(super) fn parse_container(bytes: &[u8], policy: FlattenPolicy) -> FormatResult<ParsedSource> {
        let reader = Reader::new(bytes)?;
        let writer_schema = reader.writer_schema().clone();
        // A top-level record contributes its fields directly; anything else is one column.
        let root = match &writer_schema {
            AvroSchema::Record { .. } => "",
            _ => "value",
        };

        let mut rows = Vec::new();
        for value in reader {
            let value = value?;
            let mut row = Row::new();
            push_value(&mut row, root, &value, &writer_schema, policy);
            rows.push(row);
        }

        let mut schema = Schema::default();
        schema_field(&mut schema, root, &writer_schema, policy);

        Ok(ParsedSource::rows(rows).with_schema(schema))
    }

    /// The one non-null branch of an optional union. Wider unions are kept as one column.
    fn optional_branch(schema: &AvroSchema) -> Option<&AvroSchema> {
        let AvroSchema::Union(union) = schema else {
            return None;
        };
        let mut branches = union.variants().iter().filter(|v| !matches!(v, AvroSchema::Null));
        match (branches.next(), branches.next()) {
            (Some(inner), None) => Some(inner),
            _ => None,
        }
    }

    /// Walks the value alongside its schema so rows only carry columns the schema lists.
    fn push_value(row: &mut Row, path: &str, value: &AvroValue, schema: &AvroSchema, policy: FlattenPolicy) {
        let value = match value {
            AvroValue::Union(_, inner) => inner.as_ref(),
            other => other,
        };
        if let Some(inner) = optional_branch(schema) {
            return push_value(row, path, value, inner, policy);
        }

        match (schema, value) {
            (AvroSchema::Record { fields, .. }, AvroValue::Record(values)) => {
                for field in fields {
                    let key = join_key(path, &field.name, policy);
                    match values.iter().find(|(name, _)| *name == field.name) {
                        Some((_, child)) => push_value(row, &key, child, &field.schema, policy),
                        None => push_nulls(row, &key, &field.schema, policy),
                    }
                }
            }
            (AvroSchema::Record { .. }, _) => push_nulls(row, path, schema, policy),
            (_, other) => row.insert(path, scalar(other)),
        }
    }

    /// A missing record still reports every leaf column, as null.
    fn push_nulls(row: &mut Row, path: &str, schema: &AvroSchema, policy: FlattenPolicy) {
        if let Some(inner) = optional_branch(schema) {
            return push_nulls(row, path, inner, policy);
        }
        match schema {
            AvroSchema::Record { fields, .. } => {
                for field in fields {
                    push_nulls(row, &join_key(path, &field.name, policy), &field.schema, policy);
                }
            }
            _ => row.insert(path, Value::Null),
        }
    }

    fn scalar(value: &AvroValue) -> Value {
        match value {
            AvroValue::Null => Value::Null,
            AvroValue::Boolean(b) => Value::Bool(*b),
            AvroValue::Int(v) => Value::Int64(i64::from(*v)),
            AvroValue::Long(v) => Value::Int64(*v),
            AvroValue::Float(v) => Value::Float64(f64::from(*v)),
            AvroValue::Double(v) => Value::Float64(*v),
            AvroValue::String(s) => Value::Utf8(s.clone()),
            AvroValue::Enum(_, symbol) => Value::Utf8(symbol.clone()),
            AvroValue::Date(days) => Value::Utf8(temporal::format_date(*days)),
            AvroValue::TimestampMillis(ms) => Value::Utf8(temporal::format_timestamp_millis(*ms)),
            AvroValue::TimestampMicros(us) => Value::Utf8(temporal::format_timestamp_micros(*us)),
            other => match serde_json::Value::try_from(other.clone()) {
                Ok(json) => Value::Utf8(json.to_string()),
                Err(_) => Value::Utf8(format!("{other:?}")),
            },
        }
    }

    fn schema_field(schema: &mut Schema, name: &str, field: &AvroSchema, policy: FlattenPolicy) {
        if let Some(inner) = optional_branch(field) {
            return schema_field(schema, name, inner, policy);
        }
        let logical_type = match field {
            AvroSchema::Record { fields, .. } => {
                for child in fields {
                    schema_field(schema, &join_key(name, &child.name, policy), &child.schema, policy);
                }
                return;
            }
            AvroSchema::Boolean => LogicalType::Boolean,
            AvroSchema::Int | AvroSchema::Long => LogicalType::Integer,
            AvroSchema::Float | AvroSchema::Double | AvroSchema::Decimal { .. } => LogicalType::Float,
            AvroSchema::Date => LogicalType::Date,
            AvroSchema::TimestampMillis | AvroSchema::TimestampMicros => LogicalType::DateTime,
            _ => LogicalType::String,
        };
        schema.push(Field::new(name, logical_type));
    }
}
