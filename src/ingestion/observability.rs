use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use crate::error::IngestionError;
use crate::formats::FormatFamily;

/// How bad a failed operation was; compared against `alert_at_or_above`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionSeverity {
    Info,
    Warning,
    /// The operation failed on its content.
    Error,
    /// Critical error (reading or writing bytes failed).
    Critical,
}

/// Which coordinator operation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionOperation {
    Load,
    Save,
}

impl fmt::Display for IngestionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Save => "save",
        })
    }
}

/// Context about a load or save attempt.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Source identifier (load) or target path (save).
    pub source_id: String,
    /// Family of the provider that handled the call.
    pub family: FormatFamily,
    /// Requested dataset name, empty when none was requested.
    pub dataset: String,
    pub operation: IngestionOperation,
}

/// Minimal stats reported on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Number of rows loaded or saved.
    pub rows: usize,
    /// Number of datasets the source reported (0 for single-dataset sources).
    pub datasets: usize,
}

/// Receives the outcome of every coordinator load and save.
///
/// `on_success` and `on_failure` default to no-ops; `on_alert` forwards to `on_failure`.
pub trait IngestionObserver: Send + Sync {
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called after `on_failure` when the severity meets the alert threshold.
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Severity assigned to a coordinator error.
///
/// Failures to read or write bytes are `Critical`; malformed content and registry
/// configuration mistakes are `Error`.
pub fn severity_for_error(e: &IngestionError) -> IngestionSeverity {
    match e {
        IngestionError::UnresolvedSource { .. } | IngestionError::WriteFailure { .. } => {
            IngestionSeverity::Critical
        }
        IngestionError::ParseFailure { .. }
        | IngestionError::SerializeFailure { .. }
        | IngestionError::Configuration { .. } => IngestionSeverity::Error,
    }
}

/// Fans every callback out to its observers, in insertion order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }

    /// Builder-style append.
    pub fn with(mut self, observer: Arc<dyn IngestionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.observers.iter().for_each(|o| o.on_success(ctx, stats));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.observers
            .iter()
            .for_each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.observers
            .iter()
            .for_each(|o| o.on_alert(ctx, severity, error));
    }
}

/// Forwards outcomes to `tracing` events under the `data_preview::ingest` target.
///
/// The crate never installs a subscriber; events go wherever the host routes them.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        tracing::info!(
            target: "data_preview::ingest",
            operation = %ctx.operation,
            family = %ctx.family,
            source = %ctx.source_id,
            dataset = %ctx.dataset,
            rows = stats.rows,
            datasets = stats.datasets,
            "ok"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::warn!(
            target: "data_preview::ingest",
            operation = %ctx.operation,
            family = %ctx.family,
            source = %ctx.source_id,
            dataset = %ctx.dataset,
            severity = ?severity,
            error = %error,
            "failed"
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::error!(
            target: "data_preview::ingest",
            operation = %ctx.operation,
            family = %ctx.family,
            source = %ctx.source_id,
            dataset = %ctx.dataset,
            severity = ?severity,
            error = %error,
            "alert"
        );
    }
}

/// Appends one line per event to a local log file.
///
/// Lines look like `<unix secs> ok op=load family=columnar-binary source=a.parquet rows=3 datasets=0`.
/// Logging is best-effort: open and write errors are dropped.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_event(&self, kind: &str, ctx: &IngestionContext, detail: fmt::Arguments<'_>) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) else {
            return;
        };
        let _ = writeln!(
            file,
            "{} {kind} op={} family={} source={} {detail}",
            unix_secs(),
            ctx.operation,
            ctx.family,
            ctx.source_id,
        );
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.write_event(
            "ok",
            ctx,
            format_args!("rows={} datasets={}", stats.rows, stats.datasets),
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.write_event(&format!("fail severity={severity:?}"), ctx, format_args!("err={error}"));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.write_event(&format!("ALERT severity={severity:?}"), ctx, format_args!("err={error}"));
    }
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
