use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Error, Result};
use crate::utils;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortConfig {
    /// In-memory budget per chunk, measured with the record size estimate.
    pub max_chunk_bytes: usize,
    pub io_buffer_size_kb: usize,
    pub temp_directory: PathBuf,
    pub verbose: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: DEFAULT_CHUNK_SIZE_MB * BYTES_PER_MB,
            io_buffer_size_kb: DEFAULT_IO_BUFFER_SIZE_KB,
            temp_directory: utils::default_temp_dir(),
            verbose: false,
        }
    }
}

impl SortConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|err| Error::InvalidArgument(format!("bad config file: {}", err)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|err| Error::InvalidArgument(format!("unserializable config: {}", err)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_bytes == 0 {
            return Err(Error::InvalidArgument(
                "chunk size must be at least one byte".to_string(),
            ));
        }

        if self.io_buffer_size_kb == 0 {
            return Err(Error::InvalidArgument(
                "I/O buffer size must be at least 1 KB".to_string(),
            ));
        }

        Ok(())
    }

    pub fn io_buffer_size_bytes(&self) -> usize {
        self.io_buffer_size_kb * BYTES_PER_KB
    }
}
