//! Coordinator entrypoint.
//!
//! Most callers construct one [`IngestionCoordinator`] per session and call
//! [`IngestionCoordinator::load`] / [`IngestionCoordinator::save`]:
//!
//! - the provider is resolved from the source (or target) token by the [`FormatRegistry`]
//! - each successful load records dataset names and schema in the [`DataSourceCache`]
//! - if an [`crate::ingestion::IngestionObserver`] is configured, success/failure/alerts are reported to it

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{FormatError, IngestionError, IngestionResult};
use crate::formats::FormatToken;
use crate::providers::{DataProvider, ParseContext, ParsedSource, SerializeContext};
use crate::types::{Row, Schema};

use super::cache::{CacheEntry, DataSourceCache};
use super::io::{LocalFileSystem, SinkWriter, SourceReader};
use super::observability::{severity_for_error, IngestionContext, IngestionOperation, IngestionStats};
use super::options::IngestionOptions;
use super::registry::FormatRegistry;
use super::sidecar::{write_sidecars, SidecarRequest};

/// Single entry point for loading and saving sources.
///
/// The coordinator is `Send + Sync`; loads of different sources may run concurrently.
/// Overlapping calls for the same source are not ordered, and the last cache write wins.
pub struct IngestionCoordinator {
    registry: Arc<FormatRegistry>,
    cache: Arc<DataSourceCache>,
    reader: Arc<dyn SourceReader>,
    writer: Arc<dyn SinkWriter>,
    options: IngestionOptions,
}

impl std::fmt::Debug for IngestionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionCoordinator")
            .field("registry", &self.registry)
            .field("cached_sources", &self.cache.len())
            .field("options", &self.options)
            .finish()
    }
}

impl IngestionCoordinator {
    /// A coordinator reading and writing the local file system.
    pub fn new(registry: Arc<FormatRegistry>, cache: Arc<DataSourceCache>, options: IngestionOptions) -> Self {
        Self::with_io(
            registry,
            cache,
            Arc::new(LocalFileSystem),
            Arc::new(LocalFileSystem),
            options,
        )
    }

    /// A coordinator over host-provided read/write capabilities.
    pub fn with_io(
        registry: Arc<FormatRegistry>,
        cache: Arc<DataSourceCache>,
        reader: Arc<dyn SourceReader>,
        writer: Arc<dyn SinkWriter>,
        options: IngestionOptions,
    ) -> Self {
        Self {
            registry,
            cache,
            reader,
            writer,
            options,
        }
    }

    /// Built-in providers, a fresh cache and the local file system.
    pub fn with_builtin_providers(options: IngestionOptions) -> IngestionResult<Self> {
        let registry = FormatRegistry::with_builtin_providers()?;
        Ok(Self::new(
            Arc::new(registry),
            Arc::new(DataSourceCache::new()),
            options,
        ))
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<DataSourceCache> {
        &self.cache
    }

    pub fn options(&self) -> &IngestionOptions {
        &self.options
    }

    /// Load `source_id` as rows.
    ///
    /// `dataset` selects a sheet or table; empty selects the default one. On success the
    /// source's dataset names and schema replace any cached entry. On failure the cache
    /// is left as it was.
    ///
    /// When an observer is configured, this function reports:
    ///
    /// - `on_success` on success, with row and dataset counts
    /// - `on_failure` on failure, with a computed severity
    /// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use data_preview::ingestion::{IngestionCoordinator, IngestionOptions};
    ///
    /// # fn main() -> Result<(), data_preview::IngestionError> {
    /// let coordinator = IngestionCoordinator::with_builtin_providers(IngestionOptions::default())?;
    ///
    /// let rows = coordinator.load("reports/q3.xlsx", "Summary")?;
    /// println!("rows={}", rows.len());
    /// println!("sheets={:?}", coordinator.list_datasets("reports/q3.xlsx"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn load(&self, source_id: &str, dataset: &str) -> IngestionResult<Vec<Row>> {
        let provider = self.registry.resolve(source_id);
        let ctx = context(source_id, provider.as_ref(), dataset, IngestionOperation::Load);

        let result = self
            .read_and_parse(provider.as_ref(), source_id, dataset)
            .and_then(|parsed| {
                let ParsedSource {
                    payload,
                    dataset_names,
                    schema,
                } = parsed;
                let rows = payload
                    .into_rows()
                    .map_err(|source| parse_failure(source_id, dataset, source))?;
                let entry = CacheEntry {
                    dataset_names,
                    schema,
                };

                write_sidecars(
                    self.writer.as_ref(),
                    &self.options.sidecar,
                    &SidecarRequest {
                        source_id,
                        family: provider.family(),
                        dataset,
                        rows: &rows,
                        entry: &entry,
                    },
                );

                let datasets = entry.dataset_names.len();
                self.cache.put(source_id, entry);
                Ok((rows, datasets))
            });

        self.report(
            &ctx,
            result.as_ref().map(|(rows, datasets)| IngestionStats {
                rows: rows.len(),
                datasets: *datasets,
            }),
        );
        result.map(|(rows, _)| rows)
    }

    /// Like [`Self::load`], but returns the provider's payload unsplit (delimited text
    /// stays text). The cache is updated the same way. Sidecars are not written.
    pub fn load_payload(&self, source_id: &str, dataset: &str) -> IngestionResult<ParsedSource> {
        let provider = self.registry.resolve(source_id);
        let ctx = context(source_id, provider.as_ref(), dataset, IngestionOperation::Load);

        let result = self
            .read_and_parse(provider.as_ref(), source_id, dataset)
            .inspect(|parsed| {
                self.cache.put(
                    source_id,
                    CacheEntry {
                        dataset_names: parsed.dataset_names.clone(),
                        schema: parsed.schema.clone(),
                    },
                );
            });

        self.report(
            &ctx,
            result.as_ref().map(|parsed| IngestionStats {
                rows: parsed.payload.row_count(),
                datasets: parsed.dataset_names.len(),
            }),
        );
        result
    }

    /// Run independent loads in parallel. Results are in request order.
    pub fn load_many(&self, requests: &[LoadRequest]) -> Vec<IngestionResult<Vec<Row>>> {
        requests.par_iter().map(|req| req.run(self)).collect()
    }

    /// Serialize `rows` with the provider owning `target` and write them there.
    ///
    /// The target token may differ from the source the rows came from, which converts
    /// between formats. Nothing is written when serialization fails.
    ///
    /// ```no_run
    /// use data_preview::ingestion::{IngestionCoordinator, IngestionOptions};
    ///
    /// # fn main() -> Result<(), data_preview::IngestionError> {
    /// let coordinator = IngestionCoordinator::with_builtin_providers(IngestionOptions::default())?;
    /// let rows = coordinator.load("people.csv", "")?;
    /// coordinator.save("people.parquet", &rows, "")?;
    /// coordinator.save("people.md", &rows, "")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn save(&self, target: &str, rows: &[Row], dataset: &str) -> IngestionResult<()> {
        let provider = self.registry.resolve(target);
        let ctx = context(target, provider.as_ref(), dataset, IngestionOperation::Save);

        let result = self.serialize_and_write(provider.as_ref(), target, rows, dataset);

        self.report(
            &ctx,
            result.as_ref().map(|()| IngestionStats {
                rows: rows.len(),
                datasets: 0,
            }),
        );
        result
    }

    /// Dataset names recorded by the last successful load of `source_id`.
    ///
    /// Empty for single-dataset sources and for sources that were never loaded.
    pub fn list_datasets(&self, source_id: &str) -> Vec<String> {
        self.cache
            .get(source_id)
            .map(|entry| entry.dataset_names)
            .unwrap_or_default()
    }

    /// Schema recorded by the last successful load of `source_id`, for typed formats.
    pub fn describe_schema(&self, source_id: &str) -> Option<Schema> {
        self.cache.get(source_id).and_then(|entry| entry.schema)
    }

    fn read_and_parse(
        &self,
        provider: &dyn DataProvider,
        source_id: &str,
        dataset: &str,
    ) -> IngestionResult<ParsedSource> {
        let bytes = self
            .reader
            .read_bytes(source_id)
            .map_err(|source| IngestionError::UnresolvedSource {
                source_id: source_id.to_string(),
                source,
            })?;

        let token = FormatToken::from_source(source_id);
        let ctx = ParseContext {
            token: &token,
            dataset,
            flatten: self.options.flatten,
        };
        provider
            .parse(&ctx, &bytes)
            .map_err(|source| parse_failure(source_id, dataset, source))
    }

    fn serialize_and_write(
        &self,
        provider: &dyn DataProvider,
        target: &str,
        rows: &[Row],
        dataset: &str,
    ) -> IngestionResult<()> {
        let serialize_failure = |source: FormatError| IngestionError::SerializeFailure {
            target: target.to_string(),
            dataset: dataset.to_string(),
            source,
        };

        let token = FormatToken::from_source(target);
        if let Some(desc) = self
            .registry
            .describe(target)
            .filter(|d| d.family == provider.family())
        {
            if !desc.capabilities.serialize {
                return Err(serialize_failure(FormatError::unsupported(format!(
                    "'{}' files are read-only",
                    desc.token
                ))));
            }
        }

        let ctx = SerializeContext {
            token: &token,
            dataset,
            table_text: &self.options.table_text,
        };
        let bytes = provider.serialize(&ctx, rows).map_err(serialize_failure)?;

        self.writer
            .write_bytes(Path::new(target), &bytes)
            .map_err(|source| IngestionError::WriteFailure {
                target: target.to_string(),
                source,
            })
    }

    fn report(&self, ctx: &IngestionContext, outcome: Result<IngestionStats, &IngestionError>) {
        let Some(obs) = self.options.observer.as_ref() else {
            return;
        };
        match outcome {
            Ok(stats) => obs.on_success(ctx, stats),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(ctx, sev, e);
                if sev >= self.options.alert_at_or_above {
                    obs.on_alert(ctx, sev, e);
                }
            }
        }
    }
}

fn context(
    source_id: &str,
    provider: &dyn DataProvider,
    dataset: &str,
    operation: IngestionOperation,
) -> IngestionContext {
    IngestionContext {
        source_id: source_id.to_string(),
        family: provider.family(),
        dataset: dataset.to_string(),
        operation,
    }
}

fn parse_failure(source_id: &str, dataset: &str, source: FormatError) -> IngestionError {
    IngestionError::ParseFailure {
        source_id: source_id.to_string(),
        dataset: dataset.to_string(),
        source,
    }
}

/// Owned load request, for callers that queue work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadRequest {
    pub source_id: String,
    /// Requested dataset name; empty selects the default dataset.
    pub dataset: String,
}

impl LoadRequest {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            dataset: String::new(),
        }
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    /// Execute the request by calling [`IngestionCoordinator::load`].
    pub fn run(&self, coordinator: &IngestionCoordinator) -> IngestionResult<Vec<Row>> {
        coordinator.load(&self.source_id, &self.dataset)
    }
}

