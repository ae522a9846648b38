//! Hierarchical config and markup (JSON family, YAML, TOML, EDN, properties/INI).
//!
//! Every dialect is parsed into a [`serde_json::Value`] document and then normalized into
//! rows with [`json_to_rows`]. This provider is also the registry's fallback, so sources
//! with an unknown token are sniffed: JSON, then YAML, then one row per line.

use std::str::FromStr;

use edn_rs::Edn;

use crate::error::{FormatError, FormatResult};
use crate::flatten::{json_to_rows, FlattenPolicy};
use crate::formats::{self, FormatFamily, FormatToken};
use crate::types::{Row, Value};

use super::{decode_text, DataProvider, ParseContext, ParsedSource, SerializeContext};

#[derive(Debug, Default, Clone, Copy)]
pub struct HierarchicalConfigProvider;

impl DataProvider for HierarchicalConfigProvider {
    fn family(&self) -> FormatFamily {
        FormatFamily::HierarchicalConfig
    }

    fn parse(&self, ctx: &ParseContext<'_>, bytes: &[u8]) -> FormatResult<ParsedSource> {
        let text = decode_text(bytes);
        let policy = ctx.flatten;

        let rows = match dialect(ctx.token) {
            "json" | "config" | "composer.lock" => parse_json(&text, policy)?,
            "jsonl" | "ndjson" => parse_json_lines(&text, policy)?,
            "json5" | ".babelrc" | ".prettierrc" => {
                json_to_rows(&json5::from_str::<serde_json::Value>(&text)?, policy)
            }
            "hjson" => json_to_rows(&deser_hjson::from_str::<serde_json::Value>(&text)?, policy),
            "yaml" | "yml" => {
                let doc: serde_yaml::Value = serde_yaml::from_str(&text)?;
                json_to_rows(&yaml_to_json(&doc), policy)
            }
            "toml" | "cargo.lock" | "pipfile" => {
                let table: toml::Table = toml::from_str(&text)?;
                json_to_rows(&toml_to_json(toml::Value::Table(table)), policy)
            }
            "edn" => parse_edn(&text, policy)?,
            "properties" | "ini" | "env" => parse_ini(&text, policy)?,
            _ => sniff_rows(&text, policy),
        };

        Ok(ParsedSource::rows(rows))
    }

    fn serialize(&self, ctx: &SerializeContext<'_>, rows: &[Row]) -> FormatResult<Vec<u8>> {
        match ctx.token.as_str() {
            "json" | "config" | "json5" => Ok(serde_json::to_vec_pretty(rows)?),
            "jsonl" | "ndjson" => {
                let mut out = Vec::new();
                for row in rows {
                    serde_json::to_writer(&mut out, row)?;
                    out.push(b'\n');
                }
                Ok(out)
            }
            "yaml" | "yml" => Ok(serde_yaml::to_string(rows)?.into_bytes()),
            "edn" => write_edn(rows),
            other => Err(FormatError::unsupported(format!(
                "config rows cannot be written as '{other}'"
            ))),
        }
    }
}

/// Well-known file names take precedence over their suffix (`cargo.lock` is TOML).
fn dialect(token: &FormatToken) -> &str {
    match formats::descriptor(token.file_name()) {
        Some(d) if d.family == FormatFamily::HierarchicalConfig => d.token,
        _ => token.as_str(),
    }
}

/// Strict JSON, then JSON5 (comments and trailing commas), then NDJSON.
fn parse_json(text: &str, policy: FlattenPolicy) -> FormatResult<Vec<Row>> {
    let strict = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(doc) => return Ok(json_to_rows(&doc, policy)),
        Err(e) => e,
    };
    if let Ok(doc) = json5::from_str::<serde_json::Value>(text) {
        return Ok(json_to_rows(&doc, policy));
    }
    parse_json_lines(text, policy).map_err(|_| FormatError::Json(strict))
}

fn parse_json_lines(text: &str, policy: FlattenPolicy) -> FormatResult<Vec<Row>> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line)?;
        rows.extend(json_to_rows(&value, policy));
    }
    Ok(rows)
}

/// Keys outside any section stay top-level; sectioned keys nest under the section name.
fn parse_ini(text: &str, policy: FlattenPolicy) -> FormatResult<Vec<Row>> {
    let ini = ini::Ini::load_from_str(text)?;
    let mut root = serde_json::Map::new();
    for (section, props) in ini.iter() {
        let mut entries = serde_json::Map::new();
        for (key, value) in props.iter() {
            entries.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        }
        match section {
            Some(name) => {
                root.insert(name.to_string(), serde_json::Value::Object(entries));
            }
            None => root.extend(entries),
        }
    }
    if root.is_empty() {
        return Ok(Vec::new());
    }
    Ok(json_to_rows(&serde_json::Value::Object(root), policy))
}

fn sniff_rows(text: &str, policy: FlattenPolicy) -> Vec<Row> {
    if let Ok(doc) = serde_json::from_str::<serde_json::Value>(text) {
        return json_to_rows(&doc, policy);
    }
    if let Ok(doc @ (serde_yaml::Value::Mapping(_) | serde_yaml::Value::Sequence(_))) =
        serde_yaml::from_str::<serde_yaml::Value>(text)
    {
        return json_to_rows(&yaml_to_json(&doc), policy);
    }

    tracing::debug!("content is neither JSON nor YAML, showing it line by line");
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            Row::new()
                .with("line", (idx + 1) as i64)
                .with("text", line)
        })
        .collect()
}

fn parse_edn(text: &str, policy: FlattenPolicy) -> FormatResult<Vec<Row>> {
    let doc = Edn::from_str(text).map_err(|e| FormatError::invalid(format!("invalid EDN: {e:?}")))?;
    Ok(json_to_rows(&edn_to_json(&doc), policy))
}

/// Keywords and string keys both become plain column names (`:city` and `"city"` are `city`).
fn edn_to_json(edn: &Edn) -> serde_json::Value {
    match edn {
        Edn::Nil => serde_json::Value::Null,
        Edn::Bool(b) => serde_json::Value::Bool(*b),
        Edn::Int(i) => serde_json::Value::from(*i),
        Edn::Double(_) => edn
            .to_float()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Edn::Str(s) => serde_json::Value::String(s.clone()),
        Edn::Key(k) => serde_json::Value::String(edn_name(k)),
        Edn::Map(_) => serde_json::Value::Object(
            edn.map_iter()
                .into_iter()
                .flatten()
                .map(|(k, v)| (edn_name(k), edn_to_json(v)))
                .collect(),
        ),
        Edn::Vector(_) | Edn::List(_) => {
            serde_json::Value::Array(edn.iter_some().into_iter().flatten().map(edn_to_json).collect())
        }
        // Unsigned ints fit in `to_int`; sets, symbols and tagged literals keep their EDN text.
        other => other
            .to_int()
            .map_or_else(|| serde_json::Value::String(other.to_string()), serde_json::Value::from),
    }
}

fn edn_name(key: &str) -> String {
    let key = key.strip_prefix(':').unwrap_or(key);
    key.strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .unwrap_or(key)
        .to_string()
}

/// A vector of maps, one per row in column order. Column names that are valid keywords are
/// written as keywords, others as strings.
fn write_edn(rows: &[Row]) -> FormatResult<Vec<u8>> {
    let mut out = String::from("[");
    for (idx, row) in rows.iter().enumerate() {
        if idx > 0 {
            out.push_str("\n ");
        }
        out.push('{');
        for (n, (column, value)) in row.iter().enumerate() {
            if n > 0 {
                out.push_str(", ");
            }
            if is_keyword_name(column) {
                out.push(':');
                out.push_str(column);
            } else {
                out.push_str(&serde_json::to_string(column)?);
            }
            out.push(' ');
            match value {
                Value::Null => out.push_str("nil"),
                Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
                Value::Int64(v) => out.push_str(&v.to_string()),
                Value::Float64(v) if v.is_finite() => out.push_str(&format!("{v:?}")),
                Value::Float64(_) => out.push_str("nil"),
                Value::Utf8(s) => out.push_str(&serde_json::to_string(s)?),
            }
        }
        out.push('}');
    }
    out.push_str("]\n");
    Ok(out.into_bytes())
}

fn is_keyword_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || "*+!-_?<>=".contains(c))
        && chars.all(|c| c.is_ascii_alphanumeric() || "*+!-_?<>=.".contains(c))
}

fn yaml_to_json(value: &serde_yaml::Value) -> serde_json::Value {
    use serde_yaml::Value as Yaml;
    match value {
        Yaml::Null => serde_json::Value::Null,
        Yaml::Bool(b) => serde_json::Value::Bool(*b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::from(i)
            } else if let Some(u) = n.as_u64() {
                serde_json::Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        Yaml::String(s) => serde_json::Value::String(s.clone()),
        Yaml::Sequence(items) => serde_json::Value::Array(items.iter().map(yaml_to_json).collect()),
        Yaml::Mapping(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        Yaml::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

fn yaml_key(key: &serde_yaml::Value) -> String {
    match yaml_to_json(key) {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
