//! Adapter configuration.
//!
//! A single recognised option, `buffer_size`: the number of bytes requested
//! from the source per read. Deserialisable so it can be embedded in larger
//! application configs:
//!
//! ```toml
//! buffer_size = 65536
//! ```

use serde::Deserialize;

use crate::{Result, SluiceError};

/// Default transport buffer size (256 KiB, the default GridFS chunk size).
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Configuration for a [`BinaryPublisher`](crate::BinaryPublisher).
///
/// ```rust
/// # use sluicegate::AdapterConfig;
/// let config = AdapterConfig::new().buffer_size(8 * 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdapterConfig {
    /// Bytes requested per read iteration. Must be positive. Default: 256 KiB.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl AdapterConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of bytes requested per read.
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(SluiceError::Configuration(
                "buffer_size must be positive".into(),
            ));
        }
        Ok(())
    }
}
