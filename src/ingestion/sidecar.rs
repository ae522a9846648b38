//! JSON sidecar files for binary sources.
//!
//! Sidecars are written next to the source and never overwrite an existing file. They are
//! a convenience: failures are logged and do not affect the load.

use std::path::{Path, PathBuf};

use crate::formats::FormatFamily;
use crate::types::Row;

use super::cache::CacheEntry;
use super::io::{is_remote, SinkWriter};
use super::options::SidecarOptions;

pub(crate) struct SidecarRequest<'a> {
    pub source_id: &'a str,
    pub family: FormatFamily,
    pub dataset: &'a str,
    pub rows: &'a [Row],
    pub entry: &'a CacheEntry,
}

pub(crate) fn write_sidecars(writer: &dyn SinkWriter, options: &SidecarOptions, req: &SidecarRequest<'_>) {
    if !options.is_enabled() || !req.family.is_binary() || is_remote(req.source_id) {
        return;
    }

    if options.create_json_files {
        let path = rows_path(req);
        match serde_json::to_vec_pretty(req.rows) {
            Ok(bytes) => write_new(writer, &path, &bytes),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to render rows sidecar"),
        }
    }

    if options.create_json_schema {
        if let Some(schema) = &req.entry.schema {
            let path = schema_path(req.source_id);
            match serde_json::to_vec_pretty(schema) {
                Ok(bytes) => write_new(writer, &path, &bytes),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to render schema sidecar"),
            }
        }
    }
}

/// `<stem>-<dataset>.json` when a dataset of a multi-dataset source was requested.
fn rows_path(req: &SidecarRequest<'_>) -> PathBuf {
    let stem = file_stem(req.source_id);
    let name = if !req.dataset.is_empty() && req.entry.dataset_names.len() > 1 {
        format!("{stem}-{}.json", sanitize(req.dataset))
    } else {
        format!("{stem}.json")
    };
    Path::new(req.source_id).with_file_name(name)
}

fn schema_path(source_id: &str) -> PathBuf {
    Path::new(source_id).with_file_name(format!("{}.schema.json", file_stem(source_id)))
}

fn file_stem(source_id: &str) -> String {
    Path::new(source_id)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Dataset names become part of a file name.
fn sanitize(dataset: &str) -> String {
    dataset
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
        .collect()
}

fn write_new(writer: &dyn SinkWriter, path: &Path, bytes: &[u8]) {
    if writer.exists(path) {
        tracing::trace!(path = %path.display(), "sidecar exists, leaving it");
        return;
    }
    match writer.write_bytes(path, bytes) {
        Ok(()) => tracing::debug!(path = %path.display(), "wrote sidecar"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to write sidecar"),
    }
}
