//! Byte-level read/write capabilities used by the coordinator.
//!
//! Hosts that resolve remote sources (or keep unsaved buffers) inject their own
//! [`SourceReader`]; [`LocalFileSystem`] covers plain local paths.

use std::fs;
use std::io;
use std::path::Path;

/// Reads the raw bytes of a source.
pub trait SourceReader: Send + Sync {
    fn read_bytes(&self, source_id: &str) -> io::Result<Vec<u8>>;
}

/// Writes serialized bytes to a target path.
pub trait SinkWriter: Send + Sync {
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// `http://` and `https://` sources.
pub fn is_remote(source_id: &str) -> bool {
    let lower = source_id.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Local file system access. Remote sources are rejected with [`io::ErrorKind::Unsupported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl SourceReader for LocalFileSystem {
    fn read_bytes(&self, source_id: &str) -> io::Result<Vec<u8>> {
        if is_remote(source_id) {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("remote source '{source_id}' needs a host-provided reader"),
            ));
        }
        fs::read(source_id)
    }
}

impl SinkWriter for LocalFileSystem {
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        fs::write(path, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
