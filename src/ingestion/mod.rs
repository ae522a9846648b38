//! Registry, cache and coordinator.
//!
//! Most callers should use [`IngestionCoordinator`] which:
//!
//! - resolves a source to its provider through the [`FormatRegistry`] (falling back to the
//!   config provider for unknown tokens)
//! - records dataset names and schema per source in the [`DataSourceCache`]
//! - optionally reports success/failure/alerts to an [`IngestionObserver`]
//!
//! Reading and writing bytes goes through the [`SourceReader`] / [`SinkWriter`] capabilities,
//! implemented for local paths by [`LocalFileSystem`].

pub mod cache;
pub mod coordinator;
pub mod io;
pub mod observability;
pub mod options;
pub mod registry;
mod sidecar;

pub use cache::{CacheEntry, DataSourceCache};
pub use coordinator::{IngestionCoordinator, LoadRequest};
pub use io::{is_remote, LocalFileSystem, SinkWriter, SourceReader};
pub use observability::{
    severity_for_error, CompositeObserver, FileObserver, IngestionContext, IngestionObserver,
    IngestionOperation, IngestionSeverity, IngestionStats, TracingObserver,
};
pub use options::{IngestionOptions, IngestionSettings, SidecarOptions};
pub use registry::FormatRegistry;
