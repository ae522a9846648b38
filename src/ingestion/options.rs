//! Coordinator options and host settings.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::flatten::FlattenPolicy;
use crate::table_text::TableTextOptions;

use super::observability::{IngestionObserver, IngestionSeverity};

/// Optional JSON files written next to binary sources after a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SidecarOptions {
    /// Write the loaded rows as `<stem>.json`.
    pub create_json_files: bool,
    /// Write the reported schema as `<stem>.schema.json`.
    pub create_json_schema: bool,
}

impl SidecarOptions {
    pub fn is_enabled(&self) -> bool {
        self.create_json_files || self.create_json_schema
    }
}

/// Options controlling coordinator behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
    /// Naming of nested keys once flattened.
    pub flatten: FlattenPolicy,
    /// Markdown table output options.
    pub table_text: TableTextOptions,
    pub sidecar: SidecarOptions,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .field("flatten", &self.flatten)
            .field("table_text", &self.table_text)
            .field("sidecar", &self.sidecar)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
            flatten: FlattenPolicy::default(),
            table_text: TableTextOptions::default(),
            sidecar: SidecarOptions::default(),
        }
    }
}

/// Host-supplied settings (camelCase keys, all optional).
///
/// ```rust
/// use data_preview::ingestion::{IngestionOptions, IngestionSettings};
///
/// let settings: IngestionSettings = serde_json::from_str(
///     r#"{ "createJsonFiles": true, "tableText": { "delimiter": ";" } }"#,
/// ).unwrap();
/// let options = IngestionOptions::from(settings);
/// assert!(options.sidecar.create_json_files);
/// assert_eq!(options.table_text.delimiter, ';');
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IngestionSettings {
    pub flatten: FlattenPolicy,
    pub table_text: TableTextOptions,
    pub create_json_files: bool,
    pub create_json_schema: bool,
    pub alert_at_or_above: Option<IngestionSeverity>,
}

impl From<IngestionSettings> for IngestionOptions {
    fn from(settings: IngestionSettings) -> Self {
        Self {
            observer: None,
            alert_at_or_above: settings
                .alert_at_or_above
                .unwrap_or(IngestionSeverity::Critical),
            flatten: settings.flatten,
            table_text: settings.table_text,
            sidecar: SidecarOptions {
                create_json_files: settings.create_json_files,
                create_json_schema: settings.create_json_schema,
            },
        }
    }
}
