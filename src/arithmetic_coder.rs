//! Binary arithmetic coding module for ALICE-Arith
//!
//! Codes one bit at a time against a 16-bit interval `[low, high]`, split in
//! proportion to the probability supplied by a [`ProbabilityModel`].
//!
//! ```text
//! narrow:  bit 0 -> [low, mid]      bit 1 -> [mid + 1, high]
//! E1/E2:   both bounds on one side of HALF  -> emit that bit, shift
//! E3:      bounds straddle HALF inside the middle half -> defer a bit, shift
//! ```
//!
//! The decoder replays the exact same narrowing and model updates, so the two
//! sides must agree on every bit or decoding desynchronizes for good.

use crate::bit_io::{BitSink, BitSource};
use crate::model::{ProbabilityModel, SCALE_BITS};
use crate::Result;

/// Precision bits for the interval registers
pub const CODE_BITS: u32 = 16;
const CODE_MASK: u32 = (1 << CODE_BITS) - 1;
pub const HALF: u32 = 1 << (CODE_BITS - 1);
pub const QUARTER: u32 = 1 << (CODE_BITS - 2);
pub const THREE_QUARTERS: u32 = 3 * QUARTER;

/// Zero bits appended after termination so the decoder's `CODE_BITS`-wide
/// lookahead stays inside the stream.
const TAIL_BITS: u32 = CODE_BITS - 2;

/// Split point of `[low, high]` for a probability of zero `p0`.
///
/// Returns the last value belonging to the zero sub-interval.
#[inline(always)]
fn split(low: u32, high: u32, p0: u32) -> u32 {
    assert!(
        low < high,
        "interval invariant violated before narrowing: low={:#06x} high={:#06x}",
        low,
        high
    );
    let range = high - low + 1;
    // range <= 2^16 and p0 < 2^14, so the product fits in u32
    low + ((range * p0) >> SCALE_BITS) - 1
}

/// Arithmetic encoder
pub struct ArithmeticEncoder {
    /// Low bound
    low: u32,
    /// High bound
    high: u32,
    /// Deferred E3 bits waiting for their polarity
    pending_bits: u32,
    /// Output bits
    sink: BitSink,
}

impl ArithmeticEncoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self::with_sink(BitSink::new())
    }

    /// Create an encoder writing after whatever `sink` already holds
    pub fn with_sink(sink: BitSink) -> Self {
        Self {
            low: 0,
            high: CODE_MASK,
            pending_bits: 0,
            sink,
        }
    }

    /// Current `(low, high)` interval
    pub fn interval(&self) -> (u32, u32) {
        (self.low, self.high)
    }

    /// Encode one bit and update the model
    #[inline(always)]
    pub fn encode_bit(&mut self, bit: u32, model: &mut ProbabilityModel) {
        let mid = split(self.low, self.high, model.p0());

        if bit == 0 {
            self.high = mid;
        } else {
            self.low = mid + 1;
        }
        assert!(
            self.low <= self.high,
            "interval invariant violated after narrowing: low={:#06x} high={:#06x}",
            self.low,
            self.high
        );

        model.update(bit);
        self.normalize();
    }

    /// Encode bytes, most significant bit first
    pub fn encode(&mut self, data: &[u8], model: &mut ProbabilityModel) {
        for &byte in data {
            for shift in (0..8).rev() {
                self.encode_bit(((byte >> shift) & 1) as u32, model);
            }
        }
    }

    /// Normalize and output bits
    #[inline(always)]
    fn normalize(&mut self) {
        loop {
            if self.high < HALF || self.low >= HALF {
                // Top bit settled: output it and pending opposites
                let bit = self.high >> (CODE_BITS - 1);
                self.sink.output_bit(bit);
                self.sink.output_run(bit ^ 1, self.pending_bits);
                self.pending_bits = 0;
            } else if self.low >= QUARTER && self.high < THREE_QUARTERS {
                self.pending_bits += 1;
                self.low -= QUARTER;
                self.high -= QUARTER;
            } else {
                break;
            }

            // Scale up
            self.low = (self.low << 1) & CODE_MASK;
            self.high = ((self.high << 1) | 1) & CODE_MASK;
        }
    }

    /// Number of bits emitted so far (pending bits excluded)
    pub fn bits_written(&self) -> u64 {
        self.sink.bits_written()
    }

    /// Finish encoding and get output
    pub fn finish(mut self) -> Vec<u8> {
        // Output final bits to distinguish the interval
        self.pending_bits += 1;
        if self.low < QUARTER {
            self.sink.output_bit(0);
            self.sink.output_run(1, self.pending_bits);
        } else {
            self.sink.output_bit(1);
            self.sink.output_run(0, self.pending_bits);
        }
        self.sink.output_run(0, TAIL_BITS);

        self.sink.into_bytes()
    }
}

impl Default for ArithmeticEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Arithmetic decoder
pub struct ArithmeticDecoder<'a> {
    /// Low bound
    low: u32,
    /// High bound
    high: u32,
    /// Current code value
    value: u32,
    source: BitSource<'a>,
}

impl<'a> ArithmeticDecoder<'a> {
    /// Create a decoder and pre-fill the code value from `data`
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let mut source = BitSource::new(data);
        let mut value = 0;
        for _ in 0..CODE_BITS {
            value = (value << 1) | source.input_bit()?;
        }

        Ok(Self {
            low: 0,
            high: CODE_MASK,
            value,
            source,
        })
    }

    /// Current `(low, high)` interval
    pub fn interval(&self) -> (u32, u32) {
        (self.low, self.high)
    }

    /// Decode one bit and update the model
    #[inline(always)]
    pub fn decode_bit(&mut self, model: &mut ProbabilityModel) -> Result<u32> {
        let mid = split(self.low, self.high, model.p0());

        let bit = if self.value <= mid {
            self.high = mid;
            0
        } else {
            self.low = mid + 1;
            1
        };

        model.update(bit);
        self.normalize()?;
        Ok(bit)
    }

    /// Decode one byte, most significant bit first
    #[inline(always)]
    pub fn decode_byte(&mut self, model: &mut ProbabilityModel) -> Result<u8> {
        let mut byte = 0u32;
        for _ in 0..8 {
            byte = (byte << 1) | self.decode_bit(model)?;
        }
        Ok(byte as u8)
    }

    /// Decode exactly `count` bytes
    pub fn decode(&mut self, model: &mut ProbabilityModel, count: usize) -> Result<Vec<u8>> {
        // Cap the up-front reservation; a hostile length must not allocate eagerly
        let mut result = Vec::with_capacity(count.min(1 << 20));
        for _ in 0..count {
            result.push(self.decode_byte(model)?);
        }
        Ok(result)
    }

    /// Normalize decoder state
    #[inline(always)]
    fn normalize(&mut self) -> Result<()> {
        loop {
            if self.high < HALF || self.low >= HALF {
                // Settled top bit is dropped by the mask below
            } else if self.low >= QUARTER && self.high < THREE_QUARTERS {
                self.value -= QUARTER;
                self.low -= QUARTER;
                self.high -= QUARTER;
            } else {
                break;
            }

            // Scale up
            self.low = (self.low << 1) & CODE_MASK;
            self.high = ((self.high << 1) | 1) & CODE_MASK;
            self.value = ((self.value << 1) | self.source.input_bit()?) & CODE_MASK;
        }
        Ok(())
    }

    /// Bits pulled from the stream so far, including the initial fill
    pub fn bits_consumed(&self) -> u64 {
        self.source.bits_consumed()
    }
}
