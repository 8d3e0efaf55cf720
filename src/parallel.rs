//! Parallel block pipeline
//!
//! Input is cut into `ceil(len / block_size)` contiguous blocks which are
//! compressed independently and concatenated behind a size table:
//!
//! ```text
//! offset 0:               u64 block_count
//! offset 8:               u64 block_byte_size[0..block_count]
//! offset 8 + 8 * count:   framed blocks, in order
//! ```
//!
//! Workers claim block indices from a shared atomic counter; results land in
//! per-index slots, so output order never depends on scheduling.

use crate::block_codec::{decode_block, encode_block, BlockHeader};
use crate::config::CodecConfig;
use crate::{ArithError, Result};
use log::{debug, trace, warn};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Size of one container table entry
const ENTRY_SIZE: usize = 8;

/// Background workers plus the calling thread, draining one job list
pub struct WorkerPool {
    pool: Option<rayon::ThreadPool>,
    workers: usize,
}

impl WorkerPool {
    /// Create a pool with `workers` background threads (0 = caller only)
    pub fn new(workers: usize) -> Result<Self> {
        let pool = if workers == 0 {
            None
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("alice-arith-{}", i))
                .build()
                .map_err(|e| ArithError::WorkerPool(e.to_string()))?;
            Some(pool)
        };
        Ok(Self { pool, workers })
    }

    /// Create a pool sized by `config`
    pub fn from_config(config: &CodecConfig) -> Result<Self> {
        Self::new(config.worker_count())
    }

    /// Number of background threads
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `f` over every job and return the results in job order.
    ///
    /// Returns `None` only if a job slot was left unfilled.
    pub fn run<J, T, F>(&self, jobs: &[J], f: F) -> Option<Vec<T>>
    where
        J: Sync,
        T: Send + Sync,
        F: Fn(usize, &J) -> T + Sync,
    {
        let slots: Vec<OnceLock<T>> = (0..jobs.len()).map(|_| OnceLock::new()).collect();
        let next = AtomicUsize::new(0);

        let drain = || loop {
            let index = next.fetch_add(1, Ordering::Relaxed);
            let Some(job) = jobs.get(index) else {
                break;
            };
            // Each index is claimed exactly once, so the slot is always empty
            let _ = slots[index].set(f(index, job));
        };

        match &self.pool {
            Some(pool) if jobs.len() > 1 => {
                let helpers = self.workers.min(jobs.len() - 1);
                let drain = &drain;
                // The scope returns only after every spawned drain finishes
                pool.in_place_scope(|scope| {
                    for _ in 0..helpers {
                        scope.spawn(move |_| drain());
                    }
                    drain();
                });
            }
            _ => drain(),
        }

        slots.into_iter().map(OnceLock::into_inner).collect()
    }
}

/// Validated view of a container's block table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerIndex {
    ranges: Vec<Range<usize>>,
}

impl ContainerIndex {
    /// Parse the header and check that the size table covers exactly the
    /// rest of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let count_bytes: [u8; ENTRY_SIZE] = data
            .get(..ENTRY_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(ArithError::TruncatedHeader {
                expected: ENTRY_SIZE,
                actual: data.len(),
            })?;
        let block_count = u64::from_le_bytes(count_bytes);

        let table_end = usize::try_from(block_count)
            .ok()
            .and_then(|count| count.checked_mul(ENTRY_SIZE))
            .and_then(|len| len.checked_add(ENTRY_SIZE))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                malformed(format!(
                    "block table for {} blocks exceeds {} byte buffer",
                    block_count,
                    data.len()
                ))
            })?;

        let mut ranges = Vec::with_capacity(block_count as usize);
        let mut offset = table_end;
        for entry in data[ENTRY_SIZE..table_end].chunks_exact(ENTRY_SIZE) {
            let mut size_bytes = [0u8; ENTRY_SIZE];
            size_bytes.copy_from_slice(entry);
            let size = u64::from_le_bytes(size_bytes);

            let index = ranges.len();
            if size < BlockHeader::SIZE as u64 {
                return Err(malformed(format!(
                    "block {} is {} bytes, smaller than its header",
                    index, size
                )));
            }
            let end = usize::try_from(size)
                .ok()
                .and_then(|size| offset.checked_add(size))
                .filter(|&end| end <= data.len())
                .ok_or_else(|| {
                    malformed(format!("block {} runs past the end of the buffer", index))
                })?;
            ranges.push(offset..end);
            offset = end;
        }

        if offset != data.len() {
            return Err(malformed(format!(
                "block sizes cover {} of {} bytes",
                offset,
                data.len()
            )));
        }

        Ok(Self { ranges })
    }

    pub fn block_count(&self) -> usize {
        self.ranges.len()
    }

    /// Byte range of block `index` inside the container
    pub fn block_range(&self, index: usize) -> Option<Range<usize>> {
        self.ranges.get(index).cloned()
    }

    /// Framed bytes of block `index`
    pub fn block<'a>(&self, data: &'a [u8], index: usize) -> Option<&'a [u8]> {
        self.block_range(index).map(|range| &data[range])
    }

    /// Compressed size of every block, header included
    pub fn block_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.ranges.iter().map(|r| r.len())
    }

    /// Decoded length of block `index`, read from its own header
    pub fn original_len(&self, data: &[u8], index: usize) -> Result<u64> {
        let block = self
            .block(data, index)
            .ok_or_else(|| malformed(format!("no block {}", index)))?;
        Ok(BlockHeader::from_bytes(block)?.encoded_byte_count)
    }

    /// Sum of all blocks' decoded lengths
    pub fn original_size(&self, data: &[u8]) -> Result<u64> {
        let mut total = 0u64;
        for index in 0..self.block_count() {
            total = total
                .checked_add(self.original_len(data, index)?)
                .ok_or_else(|| malformed("total decoded size overflows u64".to_string()))?;
        }
        Ok(total)
    }
}

fn malformed(reason: String) -> ArithError {
    warn!("rejecting container: {}", reason);
    ArithError::MalformedContainer(reason)
}

/// Compress `data` in blocks of `block_size` bytes on a default-sized pool
pub fn encode_parallel(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
    let config = CodecConfig::new(block_size);
    config.validate()?;
    encode_with_pool(data, block_size, &WorkerPool::from_config(&config)?)
}

/// Decompress a container on a default-sized pool
pub fn decode_parallel(container: &[u8]) -> Result<Vec<u8>> {
    decode_with_pool(container, &WorkerPool::from_config(&CodecConfig::default())?)
}

/// Compress `data` in blocks of `block_size` bytes on `pool`
pub fn encode_with_pool(data: &[u8], block_size: usize, pool: &WorkerPool) -> Result<Vec<u8>> {
    if block_size == 0 {
        return Err(ArithError::InvalidBlockSize(block_size));
    }

    let blocks: Vec<&[u8]> = data.chunks(block_size).collect();
    debug!(
        "encoding {} bytes as {} blocks ({} workers + caller)",
        data.len(),
        blocks.len(),
        pool.workers()
    );

    let encoded = pool
        .run(&blocks, |index, block| {
            let framed = encode_block(block);
            trace!("block {}: {} -> {} bytes", index, block.len(), framed.len());
            framed
        })
        .ok_or_else(|| ArithError::WorkerPool("a block was never encoded".to_string()))?;

    let table_len = ENTRY_SIZE * (blocks.len() + 1);
    let payload_len: usize = encoded.iter().map(Vec::len).sum();
    let mut output = Vec::with_capacity(table_len + payload_len);

    output.extend_from_slice(&(encoded.len() as u64).to_le_bytes());
    for block in &encoded {
        output.extend_from_slice(&(block.len() as u64).to_le_bytes());
    }
    for block in &encoded {
        output.extend_from_slice(block);
    }

    debug!("encoded {} -> {} bytes", data.len(), output.len());
    Ok(output)
}

/// Decompress a container on `pool`
pub fn decode_with_pool(container: &[u8], pool: &WorkerPool) -> Result<Vec<u8>> {
    let table = ContainerIndex::parse(container)?;
    let blocks: Vec<&[u8]> = (0..table.block_count())
        .filter_map(|i| table.block(container, i))
        .collect();
    debug!(
        "decoding {} blocks from {} bytes ({} workers + caller)",
        blocks.len(),
        container.len(),
        pool.workers()
    );

    let decoded = pool
        .run(&blocks, |index, block| {
            let result = decode_block(block);
            if let Ok(bytes) = &result {
                trace!("block {}: {} -> {} bytes", index, block.len(), bytes.len());
            }
            result
        })
        .ok_or_else(|| ArithError::WorkerPool("a block was never decoded".to_string()))?;

    let mut parts = Vec::with_capacity(decoded.len());
    for result in decoded {
        parts.push(result?);
    }
    Ok(parts.concat())
}

/// Decompress only block `index` of a container
pub fn decode_block_at(container: &[u8], index: usize) -> Result<Vec<u8>> {
    let table = ContainerIndex::parse(container)?;
    let block = table.block(container, index).ok_or_else(|| {
        ArithError::MalformedContainer(format!(
            "block {} requested, container has {}",
            index,
            table.block_count()
        ))
    })?;
    decode_block(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| b"the rain in spain falls mainly on the plain. "[i % 45])
            .collect()
    }

    #[test]
    fn test_roundtrip_various_block_sizes() {
        let data = sample(3000);
        for block_size in [1, 7, 64, 1000, 2999, 3000, 3001, 1 << 20] {
            let container = encode_parallel(&data, block_size).unwrap();
            assert_eq!(decode_parallel(&container).unwrap(), data, "block_size={}", block_size);
        }
    }

    #[test]
    fn test_block_count_and_table() {
        let data = sample(1000);
        let container = encode_parallel(&data, 300).unwrap();
        let index = ContainerIndex::parse(&container).unwrap();
        assert_eq!(index.block_count(), 4);
        assert_eq!(u64::from_le_bytes(container[..8].try_into().unwrap()), 4);

        let expected = [300u64, 300, 300, 100];
        for (i, &len) in expected.iter().enumerate() {
            assert_eq!(index.original_len(&container, i).unwrap(), len);
        }
        assert_eq!(index.original_size(&container).unwrap(), 1000);
        assert_eq!(index.block_range(0).unwrap().start, 8 + 8 * 4);
    }

    #[test]
    fn test_empty_input() {
        let container = encode_parallel(&[], 16).unwrap();
        assert_eq!(container, 0u64.to_le_bytes().to_vec());
        assert!(decode_parallel(&container).unwrap().is_empty());
    }

    #[test]
    fn test_zero_block_size_rejected() {
        assert!(matches!(
            encode_parallel(b"abc", 0),
            Err(ArithError::InvalidBlockSize(0))
        ));
    }

    #[test]
    fn test_single_block_matches_block_codec() {
        let data = sample(500);
        let container = encode_parallel(&data, 500).unwrap();
        assert_eq!(&container[16..], encode_block(&data).as_slice());
    }

    #[test]
    fn test_deterministic_across_pool_sizes() {
        let data = sample(20_000);
        let reference = encode_with_pool(&data, 1024, &WorkerPool::new(0).unwrap()).unwrap();
        for workers in [1, 2, 4, 8] {
            let pool = WorkerPool::new(workers).unwrap();
            assert_eq!(encode_with_pool(&data, 1024, &pool).unwrap(), reference);
            assert_eq!(decode_with_pool(&reference, &pool).unwrap(), data);
        }
    }

    #[test]
    fn test_pool_preserves_job_order() {
        let pool = WorkerPool::new(3).unwrap();
        let jobs: Vec<usize> = (0..100).collect();
        let out = pool.run(&jobs, |i, &j| (i, j * 2)).unwrap();
        for (i, &(index, doubled)) in out.iter().enumerate() {
            assert_eq!(index, i);
            assert_eq!(doubled, i * 2);
        }
    }

    #[test]
    fn test_pool_empty_jobs() {
        let pool = WorkerPool::new(2).unwrap();
        let jobs: Vec<u8> = Vec::new();
        assert!(pool.run(&jobs, |_, &j| j).unwrap().is_empty());
    }

    #[test]
    fn test_random_block_access() {
        let data = sample(4096);
        let container = encode_parallel(&data, 1000).unwrap();
        assert_eq!(decode_block_at(&container, 2).unwrap(), data[2000..3000].to_vec());
        assert_eq!(decode_block_at(&container, 4).unwrap(), data[4000..].to_vec());
        assert!(matches!(
            decode_block_at(&container, 5),
            Err(ArithError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_malformed_containers() {
        let data = sample(256);
        let container = encode_parallel(&data, 100).unwrap();

        // Too short for the count
        assert!(matches!(
            decode_parallel(&container[..4]),
            Err(ArithError::TruncatedHeader { .. })
        ));

        // Trailing garbage
        let mut extended = container.clone();
        extended.push(0);
        assert!(matches!(
            decode_parallel(&extended),
            Err(ArithError::MalformedContainer(_))
        ));

        // Truncated payload
        assert!(matches!(
            decode_parallel(&container[..container.len() - 1]),
            Err(ArithError::MalformedContainer(_))
        ));

        // Absurd block count
        let mut huge = container.clone();
        huge[..8].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            decode_parallel(&huge),
            Err(ArithError::MalformedContainer(_))
        ));

        // Block entry smaller than a block header
        let mut tiny = 1u64.to_le_bytes().to_vec();
        tiny.extend_from_slice(&4u64.to_le_bytes());
        tiny.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(
            decode_parallel(&tiny),
            Err(ArithError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_corrupted_block_reports_out_of_data() {
        // A block whose header claims far more bytes than its stream holds
        let mut block = encode_block(b"short");
        block[..8].copy_from_slice(&1_000_000u64.to_le_bytes());
        let mut container = 1u64.to_le_bytes().to_vec();
        container.extend_from_slice(&(block.len() as u64).to_le_bytes());
        container.extend_from_slice(&block);
        assert!(matches!(
            decode_parallel(&container),
            Err(ArithError::OutOfData { .. })
        ));
    }
}
