use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;

use crate::error::WorkerError;

/// Lists the RAW files of one source collection.
pub struct RawScanner {
    directory: PathBuf,
    extensions: Vec<String>,
}

impl RawScanner {
    pub fn new<P: AsRef<Path>>(directory: P, extensions: &[String]) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn is_raw(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// RAW files directly inside the directory, sorted by file name.
    pub fn scan(&self) -> Result<Vec<PathBuf>, WorkerError> {
        if !self.directory.is_dir() {
            return Err(WorkerError::MissingCollection(self.directory.clone()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.directory)
            .min_depth(1)
            .max_depth(1) // Only the top level
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| WorkerError::ScanFailed {
                path: self.directory.clone(),
                source: e,
            })?;
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }

            if self.is_raw(path) {
                debug!("Found RAW file: {}", path.display());
                files.push(path.to_path_buf());
            }
        }

        info!(
            "Scanned {} RAW files in {}",
            files.len(),
            self.directory.display()
        );
        Ok(files)
    }
}
