//! Per-request working directory.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory owned by one request.
///
/// The directory and everything in it is deleted when the guard is dropped,
/// whether the request succeeded, failed or was abandoned mid-stream. A
/// failed deletion is logged and otherwise ignored.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    /// Creates a fresh directory under `parent`, or the system temp dir.
    pub fn create(parent: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("qiitadl-");

        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };

        tracing::debug!(path = %dir.path().display(), "created workspace");
        Ok(Self { path: dir.path().to_path_buf(), dir: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => tracing::debug!(path = %self.path.display(), "removed workspace"),
                Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "failed to remove workspace"),
            }
        }
    }
}
