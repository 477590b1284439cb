use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A downloaded yearly file on disk. The file is removed when this is dropped,
/// whether or not it was processed successfully.
#[derive(Debug)]
pub struct RawYearFile {
    year: i32,
    path: PathBuf,
}

impl RawYearFile {
    /// Takes ownership of an existing file at `path`.
    pub fn adopt(year: i32, path: PathBuf) -> Self {
        Self { year, path }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RawYearFile {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(year = self.year, path = %self.path.display(), "Raw file removed"),
            Err(e) => {
                warn!(year = self.year, path = %self.path.display(), error = %e, "Failed to remove raw file")
            }
        }
    }
}
