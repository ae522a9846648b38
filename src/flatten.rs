//! Nested-value flattening into single-level [`Row`]s.
//!
//! One [`FlattenPolicy`] is applied to every family that produces nested values, and
//! typed providers name their schema fields with the same [`join_key`] so rows and
//! schemas agree.

use serde::Deserialize;

use crate::types::{Row, Value};

/// How nested keys are named once flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlattenPolicy {
    /// Join parent and child keys with `.` (`user.name`).
    #[default]
    PathPreserving,
    /// Keep only the innermost key (`name`). Colliding keys overwrite earlier ones.
    InnermostKey,
}

/// Column name for `key` nested under `prefix`.
pub fn join_key(prefix: &str, key: &str, policy: FlattenPolicy) -> String {
    match policy {
        _ if prefix.is_empty() => key.to_string(),
        FlattenPolicy::PathPreserving => format!("{prefix}.{key}"),
        FlattenPolicy::InnermostKey => key.to_string(),
    }
}

/// Flatten a JSON object into one row. Array indexes become keys (`tags.0`, `tags.1`).
pub fn flatten_object(object: &serde_json::Map<String, serde_json::Value>, policy: FlattenPolicy) -> Row {
    let mut row = Row::new();
    for (key, value) in object {
        flatten_into(&mut row, key, value, policy);
    }
    row
}

fn flatten_into(row: &mut Row, path: &str, value: &serde_json::Value, policy: FlattenPolicy) {
    match value {
        serde_json::Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(row, &join_key(path, key, policy), child, policy);
            }
        }
        serde_json::Value::Array(items) if !items.is_empty() => {
            for (idx, child) in items.iter().enumerate() {
                flatten_into(row, &join_key(path, &idx.to_string(), policy), child, policy);
            }
        }
        other => row.insert(path, Value::from_json(other)),
    }
}

/// Normalize a parsed config document into rows.
///
/// - arrays yield one row per element (objects flattened, scalars as `{"value": x}`)
/// - objects yield a single flattened row
/// - scalars yield a single `{"value": x}` row
pub fn json_to_rows(document: &serde_json::Value, policy: FlattenPolicy) -> Vec<Row> {
    match document {
        serde_json::Value::Array(items) => items.iter().map(|item| element_row(item, policy)).collect(),
        serde_json::Value::Null => Vec::new(),
        other => vec![element_row(other, policy)],
    }
}

fn element_row(value: &serde_json::Value, policy: FlattenPolicy) -> Row {
    match value {
        serde_json::Value::Object(map) => flatten_object(map, policy),
        other => {
            let mut row = Row::new();
            flatten_into(&mut row, "value", other, policy);
            row
        }
    }
}
