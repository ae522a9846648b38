//! Static format descriptor table and format-token derivation.
//!
//! A [`FormatToken`] is the lowercase extension of a source's final path segment, or the
//! whole segment when it has no extension. [`FORMAT_DESCRIPTORS`] maps tokens (and a few
//! well-known file names) to the [`FormatFamily`] that owns them and the capabilities the
//! family exposes for that token.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Provider family. Each family is implemented by one [`crate::providers::DataProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatFamily {
    /// CSV/TSV/plain text.
    DelimitedText,
    /// JSON/JSON5/HJSON/YAML/TOML/properties/INI family. Also the fallback provider.
    HierarchicalConfig,
    /// Multi-sheet workbooks.
    SpreadsheetLike,
    /// Parquet and Arrow IPC.
    ColumnarBinary,
    /// Avro object container files.
    RowOrientedBinary,
    /// Markdown tables.
    LightweightTextTable,
}

impl FormatFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DelimitedText => "delimited-text",
            Self::HierarchicalConfig => "hierarchical-config",
            Self::SpreadsheetLike => "spreadsheet",
            Self::ColumnarBinary => "columnar-binary",
            Self::RowOrientedBinary => "row-oriented-binary",
            Self::LightweightTextTable => "text-table",
        }
    }

    /// Families whose sources are binary and benefit from a JSON text sidecar.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            Self::SpreadsheetLike | Self::ColumnarBinary | Self::RowOrientedBinary
        )
    }
}

impl fmt::Display for FormatFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a family can do for one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub parse: bool,
    pub serialize: bool,
    pub datasets: bool,
    pub schema: bool,
}

impl Capabilities {
    const READ: Self = Self {
        parse: true,
        serialize: false,
        datasets: false,
        schema: false,
    };
    const READ_WRITE: Self = Self {
        parse: true,
        serialize: true,
        datasets: false,
        schema: false,
    };
    const SHEETS: Self = Self {
        parse: true,
        serialize: false,
        datasets: true,
        schema: false,
    };
    const SHEETS_WRITE: Self = Self {
        parse: true,
        serialize: true,
        datasets: true,
        schema: false,
    };
    const TYPED_WRITE: Self = Self {
        parse: true,
        serialize: true,
        datasets: false,
        schema: true,
    };
    const TYPED: Self = Self {
        parse: true,
        serialize: false,
        datasets: false,
        schema: true,
    };
}

/// One row of the static descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Lowercase extension (without the dot) or well-known file name.
    pub token: &'static str,
    pub family: FormatFamily,
    pub capabilities: Capabilities,
}

const fn desc(token: &'static str, family: FormatFamily, capabilities: Capabilities) -> FormatDescriptor {
    FormatDescriptor {
        token,
        family,
        capabilities,
    }
}

use FormatFamily::{
    ColumnarBinary, DelimitedText, HierarchicalConfig, LightweightTextTable, RowOrientedBinary,
    SpreadsheetLike,
};

/// Every token the built-in providers claim.
pub static FORMAT_DESCRIPTORS: &[FormatDescriptor] = &[
    desc("csv", DelimitedText, Capabilities::READ_WRITE),
    desc("tsv", DelimitedText, Capabilities::READ_WRITE),
    desc("tab", DelimitedText, Capabilities::READ_WRITE),
    desc("txt", DelimitedText, Capabilities::READ),
    desc("json", HierarchicalConfig, Capabilities::READ_WRITE),
    desc("config", HierarchicalConfig, Capabilities::READ_WRITE),
    desc("jsonl", HierarchicalConfig, Capabilities::READ_WRITE),
    desc("ndjson", HierarchicalConfig, Capabilities::READ_WRITE),
    desc("json5", HierarchicalConfig, Capabilities::READ_WRITE),
    desc("hjson", HierarchicalConfig, Capabilities::READ),
    desc("yaml", HierarchicalConfig, Capabilities::READ_WRITE),
    desc("yml", HierarchicalConfig, Capabilities::READ_WRITE),
    desc("edn", HierarchicalConfig, Capabilities::READ_WRITE),
    desc("toml", HierarchicalConfig, Capabilities::READ),
    desc("properties", HierarchicalConfig, Capabilities::READ),
    desc("ini", HierarchicalConfig, Capabilities::READ),
    desc("env", HierarchicalConfig, Capabilities::READ),
    desc("composer.lock", HierarchicalConfig, Capabilities::READ),
    desc("cargo.lock", HierarchicalConfig, Capabilities::READ),
    desc("pipfile", HierarchicalConfig, Capabilities::READ),
    desc(".babelrc", HierarchicalConfig, Capabilities::READ),
    desc(".prettierrc", HierarchicalConfig, Capabilities::READ),
    desc("xlsx", SpreadsheetLike, Capabilities::SHEETS_WRITE),
    desc("xlsm", SpreadsheetLike, Capabilities::SHEETS),
    desc("xlsb", SpreadsheetLike, Capabilities::SHEETS),
    desc("xls", SpreadsheetLike, Capabilities::SHEETS),
    desc("ods", SpreadsheetLike, Capabilities::SHEETS),
    desc("parquet", ColumnarBinary, Capabilities::TYPED_WRITE),
    desc("parq", ColumnarBinary, Capabilities::TYPED_WRITE),
    desc("pq", ColumnarBinary, Capabilities::TYPED_WRITE),
    desc("arrow", ColumnarBinary, Capabilities::TYPED_WRITE),
    desc("arr", ColumnarBinary, Capabilities::TYPED_WRITE),
    desc("feather", ColumnarBinary, Capabilities::TYPED_WRITE),
    desc("avro", RowOrientedBinary, Capabilities::TYPED),
    desc("md", LightweightTextTable, Capabilities::SHEETS_WRITE),
    desc("markdown", LightweightTextTable, Capabilities::SHEETS_WRITE),
];

/// Tokens owned by `family` in [`FORMAT_DESCRIPTORS`].
pub fn tokens_for(family: FormatFamily) -> Vec<&'static str> {
    FORMAT_DESCRIPTORS
        .iter()
        .filter(|d| d.family == family)
        .map(|d| d.token)
        .collect()
}

/// Look up the descriptor for a token (or well-known file name).
pub fn descriptor(token: &str) -> Option<&'static FormatDescriptor> {
    let token = token.to_ascii_lowercase();
    FORMAT_DESCRIPTORS.iter().find(|d| d.token == token)
}

/// File-type discriminator derived from a source identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatToken {
    token: String,
    file_name: String,
}

impl FormatToken {
    /// Derive the token from a local path or URL.
    ///
    /// The final path segment (ignoring any URL query or fragment) is split on its last
    /// `.`; the suffix is the token. Without a suffix the whole segment is the token.
    /// Tokens and file names are lowercased.
    pub fn from_source(source_id: &str) -> Self {
        let without_query = source_id
            .split(['?', '#'])
            .next()
            .unwrap_or(source_id);
        let file_name = without_query
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(without_query)
            .to_ascii_lowercase();
        let token = match file_name.rfind('.') {
            Some(idx) if idx + 1 < file_name.len() => file_name[idx + 1..].to_string(),
            _ => file_name.clone(),
        };
        Self { token, file_name }
    }

    /// The lowercase extension, or the whole file name when there is none.
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// The lowercase final path segment.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl fmt::Display for FormatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn token_is_extension_after_last_dot() {
        let t = FormatToken::from_source("/data/archive.tar.CSV");
        assert_eq!(t.as_str(), "csv");
        assert_eq!(t.file_name(), "archive.tar.csv");
    }

    #[test]
    fn token_is_whole_name_without_extension() {
        let t = FormatToken::from_source("C:\\repo\\Dockerfile");
        assert_eq!(t.as_str(), "dockerfile");
    }

    #[test]
    fn token_ignores_url_query() {
        let t = FormatToken::from_source("https://example.com/files/sales.parquet?raw=1#top");
        assert_eq!(t.as_str(), "parquet");
    }

    #[test]
    fn dot_file_token_is_suffix() {
        assert_eq!(FormatToken::from_source("project/.env").as_str(), "env");
        assert_eq!(FormatToken::from_source("project/.babelrc").file_name(), ".babelrc");
    }

    #[test]
    fn descriptor_tokens_are_unique() {
        let mut seen = HashSet::new();
        for d in FORMAT_DESCRIPTORS {
            assert!(seen.insert(d.token), "duplicate descriptor token {}", d.token);
        }
    }
}
