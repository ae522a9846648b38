#![cfg(feature = "avro")]

use std::fs;
use std::path::Path;

use apache_avro::types::{Record, Value as AvroValue};
use apache_avro::{Schema as AvroSchema, Writer};

use data_preview::flatten::FlattenPolicy;
use data_preview::ingestion::{IngestionCoordinator, IngestionOptions};
use data_preview::types::{LogicalType, Row, Value};
use data_preview::IngestionError;

const PERSON_SCHEMA: &str = r#"
{
  "type": "record",
  "name": "person",
  "fields": [
    {"name": "id", "type": "long"},
    {"name": "name", "type": "string"},
    {"name": "address", "type": {
      "type": "record",
      "name": "address",
      "fields": [{"name": "city", "type": "string"}]
    }},
    {"name": "nickname", "type": ["null", "string"], "default": null},
    {"name": "born", "type": {"type": "int", "logicalType": "date"}}
  ]
}
"#;

fn address(city: &str) -> AvroValue {
    AvroValue::Record(vec![("city".to_string(), AvroValue::String(city.to_string()))])
}

fn write_people_avro(path: &Path) {
    let schema = AvroSchema::parse_str(PERSON_SCHEMA).unwrap();
    let mut writer = Writer::new(&schema, Vec::new());

    let mut ada = Record::new(writer.schema()).unwrap();
    ada.put("id", 1_i64);
    ada.put("name", "Ada");
    ada.put("address", address("London"));
    ada.put(
        "nickname",
        AvroValue::Union(1, Box::new(AvroValue::String("countess".to_string()))),
    );
    ada.put("born", AvroValue::Date(19_416));
    writer.append(ada).unwrap();

    let mut grace = Record::new(writer.schema()).unwrap();
    grace.put("id", 2_i64);
    grace.put("name", "Grace");
    grace.put("address", address("Arlington"));
    grace.put("nickname", AvroValue::Union(0, Box::new(AvroValue::Null)));
    grace.put("born", AvroValue::Date(0));
    writer.append(grace).unwrap();

    fs::write(path, writer.into_inner().unwrap()).unwrap();
}

const CONTACT_SCHEMA: &str = r#"
{
  "type": "record",
  "name": "contact",
  "fields": [
    {"name": "id", "type": "long"},
    {"name": "addr", "type": ["null", {
      "type": "record",
      "name": "addr",
      "fields": [
        {"name": "city", "type": "string"},
        {"name": "zip", "type": ["null", "string"], "default": null}
      ]
    }], "default": null}
  ]
}
"#;

fn write_contacts_avro(path: &Path) {
    let schema = AvroSchema::parse_str(CONTACT_SCHEMA).unwrap();
    let mut writer = Writer::new(&schema, Vec::new());

    let mut with_addr = Record::new(writer.schema()).unwrap();
    with_addr.put("id", 1_i64);
    with_addr.put(
        "addr",
        AvroValue::Union(
            1,
            Box::new(AvroValue::Record(vec![
                ("city".to_string(), AvroValue::String("Lyon".to_string())),
                ("zip".to_string(), AvroValue::Union(0, Box::new(AvroValue::Null))),
            ])),
        ),
    );
    writer.append(with_addr).unwrap();

    let mut without = Record::new(writer.schema()).unwrap();
    without.put("id", 2_i64);
    without.put("addr", AvroValue::Union(0, Box::new(AvroValue::Null)));
    writer.append(without).unwrap();

    fs::write(path, writer.into_inner().unwrap()).unwrap();
}

fn coordinator_with(flatten: FlattenPolicy) -> IngestionCoordinator {
    IngestionCoordinator::with_builtin_providers(IngestionOptions {
        flatten,
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn records_flatten_and_unions_unwrap() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.avro");
    write_people_avro(&path);
    let source = path.to_str().unwrap();

    let c = coordinator_with(FlattenPolicy::PathPreserving);
    let rows = c.load(source, "").unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0],
        Row::new()
            .with("id", 1_i64)
            .with("name", "Ada")
            .with("address.city", "London")
            .with("nickname", "countess")
            .with("born", "2023-02-28")
    );
    assert_eq!(rows[1].get("nickname"), Some(&Value::Null));
    assert_eq!(rows[1].get("born"), Some(&Value::Utf8("1970-01-01".into())));
    assert!(c.list_datasets(source).is_empty());
}

#[test]
fn schema_comes_from_the_writer_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.avro");
    write_people_avro(&path);
    let source = path.to_str().unwrap();

    let c = coordinator_with(FlattenPolicy::PathPreserving);
    c.load(source, "").unwrap();
    let schema = c.describe_schema(source).unwrap();

    let names: Vec<&str> = schema.field_names().collect();
    assert_eq!(names, vec!["id", "name", "address.city", "nickname", "born"]);
    assert_eq!(schema.type_of("id"), Some(LogicalType::Integer));
    assert_eq!(schema.type_of("nickname"), Some(LogicalType::String));
    assert_eq!(schema.type_of("born"), Some(LogicalType::Date));
}

#[test]
fn null_optional_record_yields_null_leaf_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contacts.avro");
    write_contacts_avro(&path);
    let source = path.to_str().unwrap();

    let c = coordinator_with(FlattenPolicy::PathPreserving);
    let rows = c.load(source, "").unwrap();
    let schema = c.describe_schema(source).unwrap();

    let names: Vec<&str> = schema.field_names().collect();
    assert_eq!(names, vec!["id", "addr.city", "addr.zip"]);
    assert_eq!(
        rows[0],
        Row::new().with("id", 1_i64).with("addr.city", "Lyon").with("addr.zip", Value::Null)
    );
    assert_eq!(
        rows[1],
        Row::new().with("id", 2_i64).with("addr.city", Value::Null).with("addr.zip", Value::Null)
    );
    for row in &rows {
        for col in row.columns() {
            assert!(schema.index_of(col).is_some(), "column {col} missing from schema");
        }
    }
}

#[test]
fn innermost_key_policy_applies_to_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.avro");
    write_people_avro(&path);
    let source = path.to_str().unwrap();

    let c = coordinator_with(FlattenPolicy::InnermostKey);
    let rows = c.load(source, "").unwrap();
    assert_eq!(rows[1].get("city"), Some(&Value::Utf8("Arlington".into())));
    assert_eq!(
        c.describe_schema(source).unwrap().type_of("city"),
        Some(LogicalType::String)
    );
}

#[test]
fn avro_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.avro");

    let err = coordinator_with(FlattenPolicy::PathPreserving)
        .save(target.to_str().unwrap(), &[Row::new().with("a", 1_i64)], "")
        .unwrap_err();
    assert!(matches!(err, IngestionError::SerializeFailure { .. }));
    assert!(!target.exists());
}

#[test]
fn garbage_bytes_are_a_parse_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.avro");
    fs::write(&path, b"not an object container").unwrap();

    let err = coordinator_with(FlattenPolicy::PathPreserving)
        .load(path.to_str().unwrap(), "")
        .unwrap_err();
    assert!(matches!(err, IngestionError::ParseFailure { .. }));
}
