//! # ALICE-Arith
//!
//! Adaptive binary arithmetic coding with parallel block compression.
//!
//! Every input bit is coded against a 16-bit interval whose split point comes
//! from an order-16 context model: the previous 16 bits select one adaptive
//! probability, which is nudged toward each observed bit.
//!
//! ## Pipeline
//!
//! ```text
//! Input bytes
//!     ↓  split into blocks
//! Block 0 | Block 1 | ... | Block n      (one worker each, fresh model each)
//!     ↓  ProbabilityModel → ArithmeticEncoder → BitSink
//! [count][sizes...][block 0][block 1]...[block n]
//! ```
//!
//! ## Example
//!
//! ```rust
//! use alice_arith::{ArithCodec, CodecConfig};
//!
//! let mut codec = ArithCodec::new(CodecConfig::new(64 * 1024)).unwrap();
//!
//! let data = b"Hello Man".repeat(1000);
//! let compressed = codec.compress(&data).unwrap();
//! assert!(compressed.len() < data.len());
//!
//! let decompressed = codec.decompress(&compressed).unwrap();
//! assert_eq!(data, decompressed);
//! ```

// --- Global Allocator: mimalloc (Microsoft's high-performance allocator) ---
#[cfg(not(target_env = "msvc"))]
use mimalloc::MiMalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod arithmetic_coder;
pub mod bit_io;
pub mod block_codec;
pub mod config;
pub mod model;
pub mod parallel;

pub use arithmetic_coder::{ArithmeticDecoder, ArithmeticEncoder, CODE_BITS};
pub use bit_io::{BitSink, BitSource};
pub use block_codec::{decode_block, decode_stream, encode_block, encode_stream, BlockHeader};
pub use config::{CodecConfig, DEFAULT_BLOCK_SIZE};
pub use model::{ProbabilityModel, ORDER, SCALE, SCALE_BITS};
pub use parallel::{
    decode_block_at, decode_parallel, decode_with_pool, encode_parallel, encode_with_pool,
    ContainerIndex, WorkerPool,
};

use serde::Serialize;
use std::io::{Read, Write};
use thiserror::Error;

/// ALICE-Arith fingerprint
pub const ALICE_ARITH_FINGERPRINT: &str = "ALICE-ARITH-v1.0";

/// Error types for ALICE-Arith operations
#[derive(Error, Debug)]
pub enum ArithError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Out of data: stream exhausted after {bits_consumed} bits")]
    OutOfData { bits_consumed: u64 },

    #[error("Truncated header: need {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    #[error("Length {0} does not fit in memory on this target")]
    LengthOverflow(u64),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ArithError>;

/// Compression statistics
#[derive(Debug, Clone, Serialize)]
pub struct CompressionStats {
    pub original_size: usize,
    pub compressed_size: usize,
    pub block_count: usize,
    pub block_size: usize,
}

impl CompressionStats {
    /// Compression ratio (lower is better)
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        self.compressed_size as f64 / self.original_size as f64
    }

    /// Space savings percentage
    pub fn space_savings(&self) -> f64 {
        1.0 - self.compression_ratio()
    }

    /// Output bits per input byte
    pub fn bits_per_byte(&self) -> f64 {
        self.compression_ratio() * 8.0
    }
}

/// Main ALICE-Arith codec: block-parallel container format on a reusable pool
pub struct ArithCodec {
    config: CodecConfig,
    pool: WorkerPool,
    last_stats: Option<CompressionStats>,
}

impl ArithCodec {
    /// Create a codec; fails on a zero block size or if the pool cannot start
    pub fn new(config: CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool: WorkerPool::from_config(&config)?,
            config,
            last_stats: None,
        })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Compress bytes into the container format
    pub fn compress(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let compressed = encode_with_pool(data, self.config.block_size, &self.pool)?;
        self.last_stats = Some(self.stats_for(data.len(), compressed.len()));
        Ok(compressed)
    }

    /// Decompress a container
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        decode_with_pool(data, &self.pool)
    }

    /// Compress bytes and write to writer
    pub fn compress_to<W: Write>(
        &mut self,
        data: &[u8],
        writer: &mut W,
    ) -> Result<CompressionStats> {
        let compressed = self.compress(data)?;
        writer.write_all(&compressed)?;
        Ok(self.stats_for(data.len(), compressed.len()))
    }

    /// Decompress from reader
    pub fn decompress_from<R: Read>(&self, reader: &mut R) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.decompress(&data)
    }

    fn stats_for(&self, original_size: usize, compressed_size: usize) -> CompressionStats {
        CompressionStats {
            original_size,
            compressed_size,
            block_count: original_size.div_ceil(self.config.block_size),
            block_size: self.config.block_size,
        }
    }

    /// Get last compression statistics
    pub fn last_stats(&self) -> Option<&CompressionStats> {
        self.last_stats.as_ref()
    }
}

/// Encode one block: `u64` length header followed by the bitstream
pub fn encode(data: &[u8]) -> Vec<u8> {
    encode_block(data)
}

/// Decode one block produced by [`encode`]
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    decode_block(data)
}

/// Convenience function to compress with the default configuration
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    ArithCodec::new(CodecConfig::default())?.compress(data)
}

/// Convenience function to decompress a container
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    decode_parallel(data)
}
