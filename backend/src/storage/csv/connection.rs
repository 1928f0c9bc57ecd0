use anyhow::Result;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// CsvConnection owns the data directory that holds one CSV file per table
#[derive(Clone, Debug)]
pub struct CsvConnection {
    base_directory: PathBuf,
}

impl CsvConnection {
    /// Create a new CSV connection, creating the directory if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Path of the CSV file backing `table`
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.base_directory.join(format!("{}.csv", table))
    }
}
