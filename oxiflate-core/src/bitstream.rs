//! Bit-level I/O for DEFLATE streams.
//!
//! This module provides [`BitReader`] and [`BitWriter`] for reading and
//! writing data at sub-byte granularity.
//!
//! # Bit Ordering
//!
//! DEFLATE packs bits LSB-first: the first bit of a field lands in the least
//! significant free bit of the current byte. Huffman codes are the one
//! exception; the encoder stores them pre-reversed so that they too can be
//! written with [`BitWriter::write_bits`].
//!
//! # Feeding the reader
//!
//! The reader does not own a source. Callers push bytes into it with
//! [`BitReader::refill`] and then pull fields out. A field that is not fully
//! buffered yet reads as `None`, which is flow control rather than an error:
//! the caller refills and tries again. Because the reader is `Copy`, a
//! multi-field step can snapshot it first and roll back if it runs dry.
//!
//! # Example
//!
//! ```
//! use oxiflate_core::bitstream::{BitReader, BitWriter};
//!
//! let mut output = Vec::new();
//! let mut writer = BitWriter::new(&mut output);
//! writer.write_bits(0b101, 3).unwrap();
//! writer.write_bits(0b1100, 4).unwrap();
//! writer.flush().unwrap();
//!
//! let mut reader = BitReader::new();
//! assert_eq!(reader.refill(&output), 1);
//! assert_eq!(reader.read_bits(3), Some(0b101));
//! assert_eq!(reader.read_bits(4), Some(0b1100));
//! assert_eq!(reader.read_bits(8), None);
//! ```

use crate::error::{OxiFlateError, Result};
use std::io::Write;

/// A bit-level reader fed from caller-supplied byte slices.
///
/// Bits above `bits_in_buffer` are always zero, which makes
/// [`peek_padded`](Self::peek_padded) free.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitReader {
    /// Bit buffer (LSB-first).
    buffer: u64,
    /// Number of valid bits in buffer.
    bits_in_buffer: u8,
    /// Total bits consumed (for error reporting).
    total_bits_read: u64,
}

impl BitReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all buffered bits and reset the position.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move as many whole bytes from `input` into the bit buffer as fit.
    ///
    /// Returns the number of bytes taken.
    #[inline]
    pub fn refill(&mut self, input: &[u8]) -> usize {
        let mut taken = 0;
        while self.bits_in_buffer <= 56 && taken < input.len() {
            self.buffer |= (input[taken] as u64) << self.bits_in_buffer;
            self.bits_in_buffer += 8;
            taken += 1;
        }
        taken
    }

    /// Number of bits currently buffered.
    #[inline]
    pub fn available_bits(&self) -> u32 {
        self.bits_in_buffer as u32
    }

    /// Number of whole buffered bytes that have not been touched at all.
    pub fn unused_bytes(&self) -> usize {
        (self.bits_in_buffer / 8) as usize
    }

    /// Drop up to `max` untouched bytes from the end of the buffer.
    ///
    /// These are the most recently refilled bytes; the caller owns them
    /// again and must supply them on the next refill. Returns the number
    /// of bytes dropped.
    pub fn unrefill(&mut self, max: usize) -> usize {
        let count = self.unused_bytes().min(max);
        if count > 0 {
            self.bits_in_buffer -= (count * 8) as u8;
            self.buffer &= (1u64 << self.bits_in_buffer) - 1;
        }
        count
    }

    /// Current bit position in the stream (for error reporting).
    pub fn bit_position(&self) -> u64 {
        self.total_bits_read
    }

    /// Peek at up to 32 bits without consuming them.
    ///
    /// Returns `None` if fewer than `count` bits are buffered.
    #[inline]
    pub fn peek_bits(&self, count: u8) -> Option<u32> {
        debug_assert!(count <= 32, "Cannot peek more than 32 bits at once");
        if self.bits_in_buffer < count {
            return None;
        }
        Some(self.peek_padded(count))
    }

    /// Peek at up to 32 bits, treating missing bits as zero.
    #[inline]
    pub fn peek_padded(&self, count: u8) -> u32 {
        let mask = (1u64 << count).wrapping_sub(1);
        (self.buffer & mask) as u32
    }

    /// Drop `count` already buffered bits.
    #[inline]
    pub fn consume(&mut self, count: u8) {
        debug_assert!(count <= self.bits_in_buffer, "Consuming unbuffered bits");
        self.buffer >>= count;
        self.bits_in_buffer -= count;
        self.total_bits_read += count as u64;
    }

    /// Read up to 32 bits, first bit in the LSB position.
    #[inline]
    pub fn read_bits(&mut self, count: u8) -> Option<u32> {
        let value = self.peek_bits(count)?;
        self.consume(count);
        Some(value)
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> Option<bool> {
        self.read_bits(1).map(|bit| bit != 0)
    }

    /// Read eight bits as a byte.
    pub fn read_byte(&mut self) -> Option<u8> {
        self.read_bits(8).map(|byte| byte as u8)
    }

    /// Read a little-endian `u16`.
    pub fn read_u16_le(&mut self) -> Option<u16> {
        self.read_bits(16).map(|value| value as u16)
    }

    /// Align to the next byte boundary by discarding partial bits.
    pub fn align_to_byte(&mut self) {
        let skip = (self.total_bits_read % 8) as u8;
        if skip > 0 {
            let skip = (8 - skip).min(self.bits_in_buffer);
            self.consume(skip);
        }
    }

    /// Whether the next bit starts a byte.
    pub fn is_aligned(&self) -> bool {
        self.total_bits_read % 8 == 0
    }
}

/// A bit-level writer that wraps any `Write` implementation.
///
/// `BitWriter` accumulates bits in an internal buffer and passes complete
/// bytes to the underlying writer. Call [`flush`](Self::flush) when done to
/// write any remaining partial byte.
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    /// Underlying writer.
    writer: W,
    /// Bit buffer (LSB-first).
    buffer: u64,
    /// Number of bits in buffer.
    bits_in_buffer: u8,
    /// Total bits written.
    total_bits_written: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a new `BitWriter` wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: 0,
            bits_in_buffer: 0,
            total_bits_written: 0,
        }
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get a mutable reference to the underlying writer.
    ///
    /// Bits still sitting in the bit buffer are not visible there.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Flush remaining bits and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.writer)
    }

    /// Get the total number of bits written so far.
    pub fn bits_written(&self) -> u64 {
        self.total_bits_written
    }

    /// Number of bits waiting for a byte to complete.
    pub fn pending_bits(&self) -> u8 {
        self.bits_in_buffer
    }

    #[inline]
    fn flush_bytes(&mut self) -> Result<()> {
        if self.bits_in_buffer >= 32 {
            let bytes = (self.buffer as u32).to_le_bytes();
            self.writer.write_all(&bytes)?;
            self.buffer >>= 32;
            self.bits_in_buffer -= 32;
        }

        while self.bits_in_buffer >= 8 {
            self.writer.write_all(&[self.buffer as u8])?;
            self.buffer >>= 8;
            self.bits_in_buffer -= 8;
        }
        Ok(())
    }

    /// Write up to 32 bits, LSB-first.
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u8) -> Result<()> {
        debug_assert!(count <= 32, "Cannot write more than 32 bits at once");

        if count == 0 {
            return Ok(());
        }

        let mask = (1u64 << count).wrapping_sub(1);
        self.buffer |= (value as u64 & mask) << self.bits_in_buffer;
        self.bits_in_buffer += count;
        self.total_bits_written += count as u64;

        self.flush_bytes()
    }

    /// Write a single bit.
    #[inline(always)]
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.write_bits(bit as u32, 1)
    }

    /// Pad to byte boundary with zeros.
    pub fn align_to_byte(&mut self) -> Result<()> {
        if self.bits_in_buffer % 8 != 0 {
            let padding = 8 - (self.bits_in_buffer % 8);
            self.write_bits(0, padding)?;
        }
        Ok(())
    }

    /// Pad the final byte with zeros and flush the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.align_to_byte()?;
        self.flush_bytes()?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write bytes directly to the stream.
    ///
    /// The writer must be byte aligned.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        if self.bits_in_buffer != 0 {
            return Err(OxiFlateError::usage("write_bytes on unaligned bit writer"));
        }
        self.writer.write_all(buf)?;
        self.total_bits_written += buf.len() as u64 * 8;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_over(data: &[u8]) -> BitReader {
        let mut reader = BitReader::new();
        assert_eq!(reader.refill(data), data.len());
        reader
    }

    #[test]
    fn test_bitreader_basic() {
        // 0b10110101 = 0xB5
        let mut reader = reader_over(&[0xB5]);

        assert_eq!(reader.read_bits(1), Some(1)); // LSB first
        assert_eq!(reader.read_bits(1), Some(0));
        assert_eq!(reader.read_bits(1), Some(1));
        assert_eq!(reader.read_bits(1), Some(0));
        assert_eq!(reader.read_bits(1), Some(1));
        assert_eq!(reader.read_bits(1), Some(1));
        assert_eq!(reader.read_bits(1), Some(0));
        assert_eq!(reader.read_bits(1), Some(1));
        assert_eq!(reader.read_bits(1), None);
    }

    #[test]
    fn test_bitreader_multi_byte() {
        let mut reader = reader_over(&[0xFF, 0x00]);

        assert_eq!(reader.read_bits(4), Some(0xF));
        assert_eq!(reader.read_bits(8), Some(0x0F)); // Crosses byte boundary
        assert_eq!(reader.read_bits(4), Some(0x0));
    }

    #[test]
    fn test_bitreader_peek() {
        let mut reader = reader_over(&[0xAB]);

        assert_eq!(reader.peek_bits(4), Some(0xB));
        assert_eq!(reader.peek_bits(4), Some(0xB));
        assert_eq!(reader.read_bits(4), Some(0xB));
        assert_eq!(reader.peek_bits(4), Some(0xA));
        assert_eq!(reader.peek_bits(5), None);
        assert_eq!(reader.peek_padded(9), 0xA);
    }

    #[test]
    fn test_refill_is_bounded() {
        let data = [0x11u8; 16];
        let mut reader = BitReader::new();
        assert_eq!(reader.refill(&data), 8);
        assert_eq!(reader.available_bits(), 64);
        assert_eq!(reader.refill(&data), 0);

        reader.read_bits(12);
        assert_eq!(reader.refill(&data), 1);
        assert_eq!(reader.available_bits(), 60);
    }

    #[test]
    fn test_unrefill() {
        let mut reader = reader_over(&[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(reader.read_bits(4), Some(0x2));
        assert_eq!(reader.unused_bytes(), 3);

        assert_eq!(reader.unrefill(2), 2);
        assert_eq!(reader.available_bits(), 12);
        assert_eq!(reader.read_bits(4), Some(0x1));
        assert_eq!(reader.read_bits(8), Some(0x34));
        assert_eq!(reader.read_bits(1), None);

        // The dropped bytes come back through a normal refill.
        assert_eq!(reader.refill(&[0x56]), 1);
        assert_eq!(reader.read_byte(), Some(0x56));
        assert_eq!(reader.unrefill(5), 0);

        let mut full = reader_over(&[0xFF; 8]);
        assert_eq!(full.unrefill(usize::MAX), 8);
        assert_eq!(full.available_bits(), 0);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut reader = reader_over(&[0x5A]);
        let snapshot = reader;
        assert_eq!(reader.read_bits(3), Some(0b010));
        assert_eq!(reader.read_bits(8), None);
        reader = snapshot;
        assert_eq!(reader.bit_position(), 0);
        assert_eq!(reader.read_byte(), Some(0x5A));
    }

    #[test]
    fn test_align_to_byte() {
        let mut reader = reader_over(&[0xFF, 0xAA]);

        reader.read_bits(3);
        assert!(!reader.is_aligned());
        reader.align_to_byte();
        assert!(reader.is_aligned());
        assert_eq!(reader.read_bits(8), Some(0xAA));
    }

    #[test]
    fn test_read_u16_le() {
        let mut reader = reader_over(&[0x34, 0x12, 0xCB, 0xED]);
        assert_eq!(reader.read_u16_le(), Some(0x1234));
        assert_eq!(reader.read_u16_le(), Some(0xEDCB));
        assert_eq!(reader.bit_position(), 32);
    }

    #[test]
    fn test_bitwriter_basic() {
        let mut output = Vec::new();
        {
            let mut writer = BitWriter::new(&mut output);
            // Write 0b10110101 bit by bit
            for bit in [true, false, true, false, true, true, false, true] {
                writer.write_bit(bit).unwrap();
            }
            writer.flush().unwrap();
        }
        assert_eq!(output, vec![0xB5]);
    }

    #[test]
    fn test_bitwriter_multi_bits() {
        let mut output = Vec::new();
        {
            let mut writer = BitWriter::new(&mut output);
            writer.write_bits(0b101, 3).unwrap();
            writer.write_bits(0b11001, 5).unwrap();
            writer.flush().unwrap();
        }
        // 3 bits: 101, 5 bits: 11001 -> 11001_101 = 0xCD
        assert_eq!(output, vec![0xCD]);
    }

    #[test]
    fn test_bitwriter_masks_high_bits() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0xFFFF_FFF1, 2).unwrap();
        writer.write_bits(0, 6).unwrap();
        assert_eq!(writer.into_inner().unwrap(), vec![0x01]);
    }

    #[test]
    fn test_write_bytes_requires_alignment() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(1, 1).unwrap();
        assert!(writer.write_bytes(&[1, 2]).is_err());
        writer.align_to_byte().unwrap();
        writer.write_bytes(&[1, 2]).unwrap();
        assert_eq!(writer.bits_written(), 24);
        assert_eq!(writer.get_ref(), &vec![0x01, 0x01, 0x02]);
    }

    #[test]
    fn test_roundtrip() {
        let mut output = Vec::new();
        {
            let mut writer = BitWriter::new(&mut output);
            writer.write_bits(0b101, 3).unwrap();
            writer.write_bits(0b1111, 4).unwrap();
            writer.write_bits(0b10, 2).unwrap();
            writer.write_bits(0b110011, 6).unwrap();
            writer.write_bits(0xDEADBEEF, 32).unwrap();
            writer.flush().unwrap();
        }

        let mut reader = BitReader::new();
        let mut fed = reader.refill(&output);
        assert_eq!(reader.read_bits(3), Some(0b101));
        assert_eq!(reader.read_bits(4), Some(0b1111));
        assert_eq!(reader.read_bits(2), Some(0b10));
        assert_eq!(reader.read_bits(6), Some(0b110011));
        fed += reader.refill(&output[fed..]);
        assert_eq!(fed, output.len());
        assert_eq!(reader.read_bits(32), Some(0xDEADBEEF));
    }
}
