use thiserror::Error;

use crate::formats::FormatFamily;

/// Convenience result type for coordinator operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Convenience result type for provider and codec operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Error type returned by the [`crate::ingestion::IngestionCoordinator`] and the
/// [`crate::ingestion::FormatRegistry`].
///
/// Every per-call variant carries the source (or target) it happened on, so callers can
/// report failures without threading their own context through.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The source bytes could not be read (missing file, unsupported remote source, ...).
    #[error("unable to read source '{source_id}': {source}")]
    UnresolvedSource {
        source_id: String,
        #[source]
        source: std::io::Error,
    },

    /// The source content is malformed for the format its provider claims.
    #[error("failed to parse '{source_id}' (dataset '{dataset}'): {source}")]
    ParseFailure {
        source_id: String,
        dataset: String,
        #[source]
        source: FormatError,
    },

    /// Rows could not be rendered into the target format. The target is left untouched.
    #[error("failed to serialize '{target}' (dataset '{dataset}'): {source}")]
    SerializeFailure {
        target: String,
        dataset: String,
        #[source]
        source: FormatError,
    },

    /// Serialized bytes could not be written to the target.
    #[error("unable to write '{target}': {source}")]
    WriteFailure {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Two providers claimed the same format token while building a registry.
    #[error("format token '{token}' is already registered to the {existing} provider (rejected {incoming})")]
    Configuration {
        token: String,
        existing: FormatFamily,
        incoming: FormatFamily,
    },
}

/// Provider-level failure cause.
///
/// One enum shared by every format family; library errors convert via `?`.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Underlying I/O error while building an in-memory buffer.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV/TSV reading or writing error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("json5 error: {0}")]
    Json5(#[from] json5::Error),

    #[error("hjson error: {0}")]
    Hjson(#[from] deser_hjson::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Properties / INI / env parse error.
    #[error("ini error: {0}")]
    Ini(#[from] ini::ParseError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[cfg(feature = "excel")]
    /// Spreadsheet reading error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet writing error (feature-gated behind `excel`).
    #[error("xlsx write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[cfg(feature = "avro")]
    /// Avro decoding error (feature-gated behind `avro`).
    #[error("avro error: {0}")]
    Avro(#[from] apache_avro::Error),

    /// The provider does not support the requested operation for this token.
    #[error("unsupported: {message}")]
    Unsupported { message: String },

    /// Content or options that are structurally invalid for the format.
    #[error("invalid content: {message}")]
    Invalid { message: String },
}

impl FormatError {
    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
