//! Codec configuration

use crate::{ArithError, Result};
use serde::{Deserialize, Serialize};

/// Default block size (1 MiB)
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 20;

/// Parallel pipeline settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Bytes per independently compressed block
    pub block_size: usize,
    /// Background worker override. `None` uses hardware parallelism minus
    /// one; the calling thread always works as well.
    pub workers: Option<usize>,
}

impl CodecConfig {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            workers: None,
        }
    }

    /// Builder: fix the number of background workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Reject a zero block size
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(ArithError::InvalidBlockSize(self.block_size));
        }
        Ok(())
    }

    /// Number of background workers to spawn
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(default_worker_count)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

/// `available_parallelism - 1`, leaving a core for the calling thread
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
}
