//! Single-block framing
//!
//! ```text
//! offset 0:  u64 encoded_byte_count (LE)
//! offset 8:  arithmetic bitstream, zero padded in the final byte
//! ```
//!
//! Every call starts from a fresh model and interval; nothing survives
//! between blocks.

use crate::arithmetic_coder::{ArithmeticDecoder, ArithmeticEncoder};
use crate::bit_io::BitSink;
use crate::model::ProbabilityModel;
use crate::{ArithError, Result};

/// Header of one compressed block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Number of original bytes the block decodes to
    pub encoded_byte_count: u64,
}

impl BlockHeader {
    /// Header size in bytes (fixed)
    pub const SIZE: usize = 8;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        self.encoded_byte_count.to_le_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: [u8; Self::SIZE] = bytes
            .get(..Self::SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(ArithError::TruncatedHeader {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?;

        Ok(Self {
            encoded_byte_count: u64::from_le_bytes(header),
        })
    }

    /// Original length as `usize`
    pub fn original_len(&self) -> Result<usize> {
        usize::try_from(self.encoded_byte_count)
            .map_err(|_| ArithError::LengthOverflow(self.encoded_byte_count))
    }
}

/// Encode `data` as a headerless bitstream
pub fn encode_stream(data: &[u8]) -> Vec<u8> {
    let mut model = ProbabilityModel::new();
    let mut encoder = ArithmeticEncoder::new();
    encoder.encode(data, &mut model);
    encoder.finish()
}

/// Decode exactly `length` bytes from a headerless bitstream
pub fn decode_stream(stream: &[u8], length: usize) -> Result<Vec<u8>> {
    let mut model = ProbabilityModel::new();
    let mut decoder = ArithmeticDecoder::new(stream)?;
    decoder.decode(&mut model, length)
}

/// Compress one block: header followed by the bitstream
pub fn encode_block(data: &[u8]) -> Vec<u8> {
    let header = BlockHeader {
        encoded_byte_count: data.len() as u64,
    };

    // Reserve for 2:1; the sink grows on incompressible input
    let mut prefix = Vec::with_capacity(BlockHeader::SIZE + data.len() / 2 + 4);
    prefix.extend_from_slice(&header.to_bytes());

    let mut model = ProbabilityModel::new();
    let mut encoder = ArithmeticEncoder::with_sink(BitSink::with_prefix(prefix));
    encoder.encode(data, &mut model);
    encoder.finish()
}

/// Decompress one framed block
pub fn decode_block(framed: &[u8]) -> Result<Vec<u8>> {
    let header = BlockHeader::from_bytes(framed)?;
    decode_stream(&framed[BlockHeader::SIZE..], header.original_len()?)
}
