//! Document store backed by a local directory tree
//!
//! Each location is a folder below the store root and each dataset is a
//! file in that folder. Encoding and decoding run on the blocking pool so
//! large workbooks do not stall the async runtime.

use super::DocumentStore;
use crate::error::{CpwError, Result};
use crate::workbook::{self, SheetOptions};
use polars::prelude::DataFrame;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::task;
use tracing::{debug, info};

/// Folder-per-location document store
#[derive(Debug, Clone)]
pub struct LocalFolderStore {
    root: PathBuf,
}

impl LocalFolderStore {
    /// Create a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute folder for a location
    pub fn location_path(&self, location: &str) -> PathBuf {
        self.root.join(location)
    }

    fn dataset_path(&self, location: &str, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(CpwError::format(name, "dataset names cannot contain paths"));
        }
        Ok(self.location_path(location).join(name))
    }
}

impl DocumentStore for LocalFolderStore {
    async fn list_available_names(&self, location: &str) -> Result<Vec<String>> {
        let folder = self.location_path(location);
        let mut dir = match fs::read_dir(&folder).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CpwError::not_found(location, "location does not exist"));
            }
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        debug!("Found {} datasets in {}", names.len(), folder.display());
        Ok(names)
    }

    async fn fetch_sheet(
        &self,
        location: &str,
        name: &str,
        options: &SheetOptions,
    ) -> Result<DataFrame> {
        let path = self.dataset_path(location, name)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CpwError::not_found(
                    location,
                    format!("dataset '{}' does not exist", name),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Read {} bytes from {}", bytes.len(), path.display());

        let name_owned = name.to_string();
        let options = options.clone();
        task::spawn_blocking(move || workbook::decode(&name_owned, bytes, &options))
            .await
            .map_err(|e| CpwError::format(name, format!("decoder task failed: {}", e)))?
    }

    async fn store_table(&self, location: &str, name: &str, table: &DataFrame) -> Result<()> {
        let path = self.dataset_path(location, name)?;
        let store_error = |reason: String| CpwError::Store {
            location: location.to_string(),
            name: name.to_string(),
            reason,
        };

        let name_owned = name.to_string();
        let table = table.clone();
        let bytes = task::spawn_blocking(move || workbook::encode(&name_owned, &table))
            .await
            .map_err(|e| store_error(format!("encoder task failed: {}", e)))??;

        let folder = self.location_path(location);
        fs::create_dir_all(&folder)
            .await
            .map_err(|e| store_error(e.to_string()))?;

        // Write next to the target and rename so readers never see a partial file
        let partial = folder.join(format!(".{}.partial", name));
        fs::write(&partial, &bytes)
            .await
            .map_err(|e| store_error(e.to_string()))?;
        fs::rename(&partial, &path)
            .await
            .map_err(|e| store_error(e.to_string()))?;

        info!("Stored {} ({} bytes) in {}", name, bytes.len(), folder.display());
        Ok(())
    }
}
