//! Bit-level writer and reader backing the arithmetic coder.
//!
//! Bits are packed most-significant first.

use crate::{ArithError, Result};

/// Accumulates single bits into an owned byte buffer
#[derive(Debug, Default)]
pub struct BitSink {
    /// Completed bytes
    output: Vec<u8>,
    /// Partially filled byte
    current_byte: u8,
    /// Bits written to current byte
    bits_in_byte: u8,
}

impl BitSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            output: Vec::with_capacity(capacity),
            current_byte: 0,
            bits_in_byte: 0,
        }
    }

    /// Create a sink that appends after `prefix` (e.g. an already written header)
    pub fn with_prefix(prefix: Vec<u8>) -> Self {
        Self {
            output: prefix,
            current_byte: 0,
            bits_in_byte: 0,
        }
    }

    /// Output a single bit
    #[inline(always)]
    pub fn output_bit(&mut self, bit: u32) {
        self.current_byte = (self.current_byte << 1) | (bit & 1) as u8;
        self.bits_in_byte += 1;

        if self.bits_in_byte == 8 {
            self.output.push(self.current_byte);
            self.current_byte = 0;
            self.bits_in_byte = 0;
        }
    }

    /// Output `count` copies of `bit`
    #[inline(always)]
    pub fn output_run(&mut self, bit: u32, count: u32) {
        for _ in 0..count {
            self.output_bit(bit);
        }
    }

    /// Pad a partial trailing byte with zero bits
    pub fn flush(&mut self) {
        if self.bits_in_byte > 0 {
            self.current_byte <<= 8 - self.bits_in_byte;
            self.output.push(self.current_byte);
            self.current_byte = 0;
            self.bits_in_byte = 0;
        }
    }

    /// Number of bits written so far, including the staging byte
    pub fn bits_written(&self) -> u64 {
        self.output.len() as u64 * 8 + self.bits_in_byte as u64
    }

    /// Flush and take the buffer
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.output
    }
}

/// Reads single bits from a borrowed buffer
#[derive(Debug)]
pub struct BitSource<'a> {
    input: &'a [u8],
    /// Current byte position in input
    byte_pos: usize,
    /// Current bit position in byte (0-7)
    bit_pos: u8,
}

impl<'a> BitSource<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Read a single bit, failing once the buffer is exhausted
    #[inline(always)]
    pub fn input_bit(&mut self) -> Result<u32> {
        let byte = match self.input.get(self.byte_pos) {
            Some(&byte) => byte,
            None => {
                return Err(ArithError::OutOfData {
                    bits_consumed: self.bits_consumed(),
                })
            }
        };

        let bit = (byte >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;

        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(bit as u32)
    }

    pub fn bits_consumed(&self) -> u64 {
        self.byte_pos as u64 * 8 + self.bit_pos as u64
    }

    /// Bits left before `OutOfData`
    pub fn bits_remaining(&self) -> u64 {
        self.input.len() as u64 * 8 - self.bits_consumed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_packs_msb_first() {
        let mut sink = BitSink::new();
        for bit in [1, 0, 1, 1, 0, 0, 0, 1] {
            sink.output_bit(bit);
        }
        assert_eq!(sink.bits_written(), 8);
        assert_eq!(sink.into_bytes(), vec![0b1011_0001]);
    }

    #[test]
    fn test_sink_flush_pads_with_zeros() {
        let mut sink = BitSink::new();
        sink.output_bit(1);
        sink.output_bit(1);
        sink.output_bit(1);
        sink.flush();
        // Second flush is a no-op
        sink.flush();
        assert_eq!(sink.into_bytes(), vec![0b1110_0000]);
    }

    #[test]
    fn test_sink_empty() {
        let sink = BitSink::new();
        assert_eq!(sink.bits_written(), 0);
        assert!(sink.into_bytes().is_empty());
    }

    #[test]
    fn test_sink_with_prefix_appends() {
        let mut sink = BitSink::with_prefix(vec![0xAA]);
        sink.output_run(1, 8);
        assert_eq!(sink.into_bytes(), vec![0xAA, 0xFF]);
    }

    #[test]
    fn test_sink_grows_past_capacity() {
        let mut sink = BitSink::with_capacity(1);
        sink.output_run(0, 8 * 100);
        assert_eq!(sink.into_bytes().len(), 100);
    }

    #[test]
    fn test_source_reads_back_sink_output() {
        let pattern: Vec<u32> = (0..37).map(|i| (i * 7 % 5 % 2) as u32).collect();
        let mut sink = BitSink::new();
        for &bit in &pattern {
            sink.output_bit(bit);
        }
        let bytes = sink.into_bytes();

        let mut source = BitSource::new(&bytes);
        for &bit in &pattern {
            assert_eq!(source.input_bit().unwrap(), bit);
        }
        assert_eq!(source.bits_consumed(), 37);
        assert_eq!(source.bits_remaining(), 3);
    }

    #[test]
    fn test_source_out_of_data() {
        let data = [0xFFu8];
        let mut source = BitSource::new(&data);
        for _ in 0..8 {
            assert_eq!(source.input_bit().unwrap(), 1);
        }
        match source.input_bit() {
            Err(ArithError::OutOfData { bits_consumed }) => assert_eq!(bits_consumed, 8),
            other => panic!("expected OutOfData, got {:?}", other),
        }
    }

    #[test]
    fn test_source_empty_input() {
        let mut source = BitSource::new(&[]);
        assert!(source.input_bit().is_err());
    }
}
