//! Canonical Huffman coding for DEFLATE.
//!
//! DEFLATE uses canonical Huffman codes: a code is fully determined by the
//! bit length of each symbol, and codes of the same length are assigned
//! consecutive values in symbol order (RFC 1951 Section 3.2.2).
//!
//! This module covers both directions:
//!
//! - [`HuffmanBuilder`] turns symbol frequencies into length-limited code
//!   lengths.
//! - [`CodeTable`] maps symbols to bit-reversed codes for the encoder.
//! - [`HuffmanTree`] is a dense lookup table for the decoder.
//! - [`encode_code_lengths`] run-length encodes a length vector with the
//!   code-length alphabet (symbols 16, 17 and 18).
//!
//! # Alphabets
//!
//! - **Literal/Length**: 0-285 (0-255 literals, 256 EOB, 257-285 lengths)
//! - **Distance**: 0-29 (back-reference distances)
//! - **Code Length**: 0-18 (for transmitting dynamic trees)

use oxiflate_core::{BitReader, BitWriter};
use oxiflate_core::error::{DecodeStage, OxiFlateError, Result};
use std::io::Write;

/// Maximum code length for literal/length and distance codes.
pub const MAX_CODE_LENGTH: u8 = 15;

/// Maximum code length for the code-length alphabet.
pub const MAX_CODE_LENGTH_BITS: u8 = 7;

/// Reverse the low `length` bits of `code`.
#[inline]
pub fn reverse_bits(code: u16, length: u8) -> u16 {
    if length == 0 {
        return 0;
    }
    code.reverse_bits() >> (16 - length as u32)
}

/// Count how many symbols use each code length.
fn count_lengths(lengths: &[u8]) -> [u16; MAX_CODE_LENGTH as usize + 1] {
    let mut bl_count = [0u16; MAX_CODE_LENGTH as usize + 1];
    for &len in lengths {
        bl_count[len as usize] += 1;
    }
    bl_count[0] = 0;
    bl_count
}

/// Assign canonical codes to a length vector (RFC 1951 Section 3.2.2).
///
/// Codes are returned MSB-first; unused symbols get code 0.
pub fn canonical_codes(lengths: &[u8]) -> Vec<u16> {
    let bl_count = count_lengths(lengths);

    let mut next_code = [0u16; MAX_CODE_LENGTH as usize + 1];
    let mut code = 0u16;
    for bits in 1..=MAX_CODE_LENGTH as usize {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }

    lengths
        .iter()
        .map(|&len| {
            if len == 0 {
                return 0;
            }
            let code = next_code[len as usize];
            next_code[len as usize] += 1;
            code
        })
        .collect()
}

/// A Huffman decoding table.
///
/// The table has `2^max_length` entries indexed by the next `max_length`
/// stream bits (LSB-first, so codes appear bit-reversed). Each entry packs
/// `symbol << 4 | code_length`; a code length of 0 marks a bit pattern that
/// no code matches.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    table: Vec<u16>,
    max_length: u8,
}

impl HuffmanTree {
    /// Build a decoding table from transmitted code lengths.
    ///
    /// Over-subscribed length sets are rejected. Incomplete sets are
    /// rejected too, except for a single code of length 1. An all-zero
    /// vector yields an empty tree on which every decode fails.
    pub fn from_code_lengths(lengths: &[u8], stage: DecodeStage) -> Result<Self> {
        if let Some(&len) = lengths.iter().find(|&&len| len > MAX_CODE_LENGTH) {
            return Err(OxiFlateError::invalid_code_lengths(
                stage,
                format!("code length {} exceeds maximum {}", len, MAX_CODE_LENGTH),
            ));
        }

        let bl_count = count_lengths(lengths);
        let used: u32 = bl_count.iter().map(|&c| c as u32).sum();

        let mut left = 1i32;
        for &count in &bl_count[1..] {
            left = (left << 1) - count as i32;
            if left < 0 {
                return Err(OxiFlateError::invalid_code_lengths(
                    stage,
                    "over-subscribed code",
                ));
            }
        }
        if left > 0 && used > 0 && !(used == 1 && bl_count[1] == 1) {
            return Err(OxiFlateError::invalid_code_lengths(
                stage,
                "incomplete code",
            ));
        }

        Ok(Self::from_valid_lengths(lengths))
    }

    /// Build a decoding table without validating the lengths.
    ///
    /// Used for the fixed codes, which are known to be well formed.
    pub(crate) fn from_valid_lengths(lengths: &[u8]) -> Self {
        let max_length = lengths.iter().copied().max().unwrap_or(0);
        let mut table = vec![0u16; 1 << max_length];
        let codes = canonical_codes(lengths);

        for (symbol, (&len, &code)) in lengths.iter().zip(&codes).enumerate() {
            if len == 0 {
                continue;
            }
            let entry = ((symbol as u16) << 4) | len as u16;
            let start = reverse_bits(code, len) as usize;
            for index in (start..table.len()).step_by(1 << len) {
                table[index] = entry;
            }
        }

        Self { table, max_length }
    }

    /// Longest code length in this tree (0 for an empty tree).
    pub fn max_length(&self) -> u8 {
        self.max_length
    }

    /// Returns true if no symbol has a code.
    pub fn is_empty(&self) -> bool {
        self.max_length == 0
    }

    /// Decode one symbol.
    ///
    /// Returns `Ok(None)` without consuming anything if the reader does not
    /// hold enough bits yet.
    #[inline]
    pub fn decode(&self, reader: &mut BitReader, stage: DecodeStage) -> Result<Option<u16>> {
        let bits = reader.peek_padded(self.max_length) as usize;
        let entry = self.table[bits];
        let len = (entry & 0xF) as u8;
        let available = reader.available_bits();

        if len == 0 {
            if available >= self.max_length as u32 {
                return Err(OxiFlateError::invalid_huffman(stage, reader.bit_position()));
            }
            return Ok(None);
        }
        if len as u32 > available {
            return Ok(None);
        }

        reader.consume(len);
        Ok(Some(entry >> 4))
    }
}

/// A Huffman encoding table: one bit-reversed code and length per symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    codes: Vec<u16>,
    lengths: Vec<u8>,
}

impl CodeTable {
    /// Build the encoding table for a length vector.
    pub fn from_lengths(lengths: &[u8]) -> Self {
        let codes = canonical_codes(lengths)
            .into_iter()
            .zip(lengths)
            .map(|(code, &len)| reverse_bits(code, len))
            .collect();
        Self {
            codes,
            lengths: lengths.to_vec(),
        }
    }

    /// Bit-reversed code for `symbol`.
    #[inline]
    pub fn code(&self, symbol: usize) -> u16 {
        self.codes[symbol]
    }

    /// Code length for `symbol` (0 if unused).
    #[inline]
    pub fn length(&self, symbol: usize) -> u8 {
        self.lengths[symbol]
    }

    /// All code lengths.
    pub fn lengths(&self) -> &[u8] {
        &self.lengths
    }

    /// Write the code for `symbol`.
    #[inline]
    pub fn write_symbol<W: Write>(
        &self,
        writer: &mut BitWriter<W>,
        symbol: usize,
    ) -> Result<()> {
        debug_assert!(self.lengths[symbol] > 0, "Symbol {} has no code", symbol);
        writer.write_bits(self.codes[symbol] as u32, self.lengths[symbol])
    }

    /// Total bits needed to send the given symbol frequencies.
    pub fn cost(&self, frequencies: &[u32]) -> u64 {
        frequencies
            .iter()
            .zip(&self.lengths)
            .map(|(&freq, &len)| freq as u64 * len as u64)
            .sum()
    }
}

/// Builder for creating length-limited code lengths from frequencies.
///
/// Symbols are sorted by descending frequency and the sorted list is split
/// recursively where the cumulative weight is closest to half, each split
/// adding one bit. Symbols still sharing a subtree at the length limit all
/// get the limit, which over-subscribes the code; a repair pass then moves
/// leaves down one level at a time until the Kraft sum is exactly one, and
/// the final lengths are handed out by frequency rank.
#[derive(Debug, Clone)]
pub struct HuffmanBuilder {
    frequencies: Vec<u32>,
    max_length: u8,
}

impl HuffmanBuilder {
    /// Create a new Huffman builder.
    pub fn new(alphabet_size: usize, max_length: u8) -> Self {
        debug_assert!((1..=MAX_CODE_LENGTH).contains(&max_length));
        Self {
            frequencies: vec![0; alphabet_size],
            max_length,
        }
    }

    /// Add a symbol occurrence.
    #[inline]
    pub fn add(&mut self, symbol: u16) {
        self.frequencies[symbol as usize] += 1;
    }

    /// Add multiple occurrences of a symbol.
    pub fn add_count(&mut self, symbol: u16, count: u32) {
        self.frequencies[symbol as usize] += count;
    }

    /// Symbol frequencies collected so far.
    pub fn frequencies(&self) -> &[u32] {
        &self.frequencies
    }

    /// Number of symbols with a non-zero frequency.
    pub fn used_symbols(&self) -> usize {
        self.frequencies.iter().filter(|&&f| f > 0).count()
    }

    /// Forget all frequencies.
    pub fn clear(&mut self) {
        self.frequencies.fill(0);
    }

    /// Build code lengths from frequencies.
    ///
    /// Returns an array where `result[i]` is the code length for symbol `i`.
    /// No used symbols gives all zeros; one used symbol gives it length 1.
    pub fn build_lengths(&self) -> Vec<u8> {
        let mut lengths = vec![0u8; self.frequencies.len()];

        let mut symbols: Vec<(u32, usize)> = self
            .frequencies
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f > 0)
            .map(|(i, &f)| (f, i))
            .collect();

        match symbols.len() {
            0 => return lengths,
            1 => {
                lengths[symbols[0].1] = 1;
                return lengths;
            }
            _ => {}
        }

        symbols.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut prefix = Vec::with_capacity(symbols.len() + 1);
        prefix.push(0u64);
        for &(freq, _) in &symbols {
            prefix.push(prefix[prefix.len() - 1] + freq as u64);
        }

        let mut depths = vec![0u8; symbols.len()];
        Self::split(&prefix, 0, symbols.len(), 0, self.max_length, &mut depths);

        let mut bl_count = [0u32; MAX_CODE_LENGTH as usize + 1];
        for &depth in &depths {
            bl_count[depth as usize] += 1;
        }
        Self::repair_overflow(&mut bl_count, self.max_length);

        // Shortest codes go to the most frequent symbols.
        let mut ranked = symbols.iter();
        for bits in 1..=self.max_length as usize {
            for _ in 0..bl_count[bits] {
                if let Some(&(_, symbol)) = ranked.next() {
                    lengths[symbol] = bits as u8;
                }
            }
        }

        lengths
    }

    /// Assign depths to `symbols[lo..hi]`, which share a subtree at `depth`.
    fn split(prefix: &[u64], lo: usize, hi: usize, depth: u8, max: u8, depths: &mut [u8]) {
        if hi - lo == 1 {
            depths[lo] = depth;
            return;
        }
        if depth >= max {
            depths[lo..hi].fill(max);
            return;
        }

        let total = prefix[hi] - prefix[lo];
        let mut best = lo + 1;
        let mut best_diff = u64::MAX;
        for k in lo + 1..hi {
            let left = prefix[k] - prefix[lo];
            let diff = (2 * left).abs_diff(total);
            if diff < best_diff {
                best = k;
                best_diff = diff;
            }
        }

        Self::split(prefix, lo, best, depth + 1, max, depths);
        Self::split(prefix, best, hi, depth + 1, max, depths);
    }

    /// Bring an over-subscribed length histogram back to a complete code.
    ///
    /// Each step turns a leaf at some depth below `max` into an internal
    /// node with two leaves one level deeper, one of them taken from depth
    /// `max`. That lowers the Kraft sum by exactly `2^-max`.
    fn repair_overflow(bl_count: &mut [u32], max: u8) {
        let max = max as usize;
        let capacity = 1u64 << max;
        let kraft = |bl_count: &[u32]| -> u64 {
            (1..=max)
                .map(|bits| (bl_count[bits] as u64) << (max - bits))
                .sum()
        };

        let mut sum = kraft(bl_count);
        while sum > capacity {
            let Some(bits) = (1..max).rev().find(|&bits| bl_count[bits] > 0) else {
                break;
            };
            bl_count[bits] -= 1;
            bl_count[bits + 1] += 2;
            bl_count[max] -= 1;
            sum -= 1;
        }
    }
}

/// One symbol of the code-length alphabet with its extra-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLengthToken {
    /// Symbol 0-18.
    pub symbol: u8,
    /// Value of the extra bits (repeat count offset) for 16, 17 and 18.
    pub extra: u8,
}

impl CodeLengthToken {
    /// Number of extra bits that follow this symbol.
    pub fn extra_bits(&self) -> u8 {
        match self.symbol {
            16 => 2,
            17 => 3,
            18 => 7,
            _ => 0,
        }
    }
}

/// Run-length encode a code length vector.
///
/// Runs of zeros use 17 (3-10) and 18 (11-138); runs of a non-zero length
/// send the length once and then 16 (3-6 copies of the previous length).
pub fn encode_code_lengths(lengths: &[u8]) -> Vec<CodeLengthToken> {
    let mut tokens = Vec::new();
    let token = |symbol: u8, extra: u8| CodeLengthToken { symbol, extra };

    let mut i = 0;
    while i < lengths.len() {
        let len = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == len).count();
        i += run;

        if len == 0 {
            let mut remaining = run;
            while remaining >= 11 {
                let count = remaining.min(138);
                tokens.push(token(18, (count - 11) as u8));
                remaining -= count;
            }
            if remaining >= 3 {
                tokens.push(token(17, (remaining - 3) as u8));
                remaining = 0;
            }
            tokens.extend(std::iter::repeat_n(token(0, 0), remaining));
        } else {
            tokens.push(token(len, 0));
            let mut remaining = run - 1;
            while remaining >= 3 {
                let count = remaining.min(6);
                tokens.push(token(16, (count - 3) as u8));
                remaining -= count;
            }
            tokens.extend(std::iter::repeat_n(token(len, 0), remaining));
        }
    }

    tokens
}
