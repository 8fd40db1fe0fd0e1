use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub target_bytes: u64,
    pub lines_per_batch: usize,
    pub channel_capacity: usize,
    pub producer_count: usize,
    pub io_buffer_size_kb: usize,
    pub max_text_length: usize,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            target_bytes: DEFAULT_TARGET_BYTES,
            lines_per_batch: DEFAULT_LINES_PER_BATCH,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            producer_count: default_producer_count(),
            io_buffer_size_kb: DEFAULT_IO_BUFFER_SIZE_KB,
            max_text_length: MAX_TEXT_LENGTH,
        }
    }
}

impl GenerateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_bytes == 0 {
            return Err(Error::InvalidArgument(
                "target size must be positive".to_string(),
            ));
        }

        if self.lines_per_batch == 0 {
            return Err(Error::InvalidArgument(
                "batch size must be at least one line".to_string(),
            ));
        }

        if self.channel_capacity == 0 {
            return Err(Error::InvalidArgument(
                "channel capacity must be at least one batch".to_string(),
            ));
        }

        if self.producer_count == 0 {
            return Err(Error::InvalidArgument(
                "at least one producer is required".to_string(),
            ));
        }

        if self.max_text_length < MIN_TEXT_LENGTH {
            return Err(Error::InvalidArgument(format!(
                "text length must be at least {}",
                MIN_TEXT_LENGTH
            )));
        }

        Ok(())
    }

    pub fn io_buffer_size_bytes(&self) -> usize {
        self.io_buffer_size_kb * BYTES_PER_KB
    }
}

/// One producer per available hardware thread.
pub fn default_producer_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_PRODUCER_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GenerateConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_target_rejected() {
        let config = GenerateConfig {
            target_bytes: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_batch_rejected() {
        let config = GenerateConfig {
            lines_per_batch: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
