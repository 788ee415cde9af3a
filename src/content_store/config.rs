//! Configuration for the content store.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TesseraError};

/// Default number of characters per compressed block.
pub const DEFAULT_BLOCK_SIZE_CHARS: usize = 4096;

/// Default data file size hint (64 MiB).
pub const DEFAULT_DATA_FILE_SIZE_HINT: u64 = 64 * 1024 * 1024;

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Configuration for a [`super::ContentStore`].
///
/// `block_size_chars` and `data_file_size_hint` are fixed once the first
/// document is written; reopening a store with different values keeps the
/// persisted ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentStoreConfig {
    /// Maximum number of characters per block (last block may be shorter).
    pub block_size_chars: usize,

    /// Approximate maximum size of a data file in bytes. A file may exceed it
    /// by up to one block.
    pub data_file_size_hint: u64,

    /// Zstd compression level for new blocks.
    pub compression_level: i32,

    /// Sync data files to disk after every stored document.
    pub sync_on_store: bool,
}

impl Default for ContentStoreConfig {
    fn default() -> Self {
        ContentStoreConfig {
            block_size_chars: DEFAULT_BLOCK_SIZE_CHARS,
            data_file_size_hint: DEFAULT_DATA_FILE_SIZE_HINT,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            sync_on_store: false,
        }
    }
}

impl ContentStoreConfig {
    pub fn with_block_size_chars(mut self, block_size_chars: usize) -> Self {
        self.block_size_chars = block_size_chars;
        self
    }

    pub fn with_data_file_size_hint(mut self, data_file_size_hint: u64) -> Self {
        self.data_file_size_hint = data_file_size_hint;
        self
    }

    pub fn with_compression_level(mut self, compression_level: i32) -> Self {
        self.compression_level = compression_level;
        self
    }

    pub fn with_sync_on_store(mut self, sync_on_store: bool) -> Self {
        self.sync_on_store = sync_on_store;
        self
    }

    /// Check that the configuration can be used to create a store.
    pub fn validate(&self) -> Result<()> {
        if self.block_size_chars == 0 {
            return Err(TesseraError::invalid_argument(
                "block_size_chars must be greater than zero",
            ));
        }
        if self.block_size_chars > u32::MAX as usize {
            return Err(TesseraError::invalid_argument(
                "block_size_chars must fit in 32 bits",
            ));
        }
        if self.data_file_size_hint == 0 {
            return Err(TesseraError::invalid_argument(
                "data_file_size_hint must be greater than zero",
            ));
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(TesseraError::invalid_argument(format!(
                "compression_level {} out of range 1..=22",
                self.compression_level
            )));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file. Missing keys take defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: ContentStoreConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ContentStoreConfig::default();
        assert_eq!(config.block_size_chars, 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let config = ContentStoreConfig::default().with_block_size_chars(0);
        assert!(matches!(
            config.validate(),
            Err(TesseraError::InvalidArgument(_))
        ));

        let config = ContentStoreConfig::default().with_data_file_size_hint(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ContentStoreConfig =
            serde_json::from_str(r#"{"block_size_chars": 15}"#).unwrap();
        assert_eq!(config.block_size_chars, 15);
        assert_eq!(config.data_file_size_hint, DEFAULT_DATA_FILE_SIZE_HINT);
        assert!(!config.sync_on_store);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{"data_file_size_hint": 1024, "compression_level": 9}"#)
            .unwrap();

        let config = ContentStoreConfig::from_file(&path).unwrap();
        assert_eq!(config.data_file_size_hint, 1024);
        assert_eq!(config.compression_level, 9);
    }
}
