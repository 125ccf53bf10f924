//! Temporary file allocation for segments and merged takes

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::CaptureError;

/// Application-private directory holding segment files and merged takes.
#[derive(Debug, Clone)]
pub struct SegmentStore {
    dir: PathBuf,
    extension: String,
}

impl SegmentStore {
    /// Use `dir` for all files, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Result<Self, CaptureError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            extension: extension.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A fresh path for the next recorded segment.
    pub fn allocate_segment(&self) -> PathBuf {
        self.unique_path("segment")
    }

    /// A fresh path for a merged take.
    pub fn allocate_take(&self) -> PathBuf {
        self.unique_path("take")
    }

    fn unique_path(&self, prefix: &str) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");
        let id = uuid::Uuid::new_v4().simple();
        self.dir
            .join(format!("{prefix}_{stamp}_{id}.{}", self.extension))
    }

    /// Best-effort delete; a file that is already gone is not an error.
    pub fn remove(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => log::debug!("Removed {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove {:?}: {}", path, e),
        }
    }
}
