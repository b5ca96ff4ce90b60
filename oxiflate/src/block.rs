//! DEFLATE block encoding.
//!
//! [`BlockEncoder`] collects LZ77 tokens for one block together with their
//! symbol frequencies. When the block is full (or the stream is flushed) it
//! computes the exact size of the block in each of the three encodings and
//! writes the cheapest one, unless a [`BlockMode`] forces a particular type.
//!
//! A block never covers more than [`MAX_BLOCK_BYTES`] input bytes, so the
//! stored fallback always fits in a single stored block.

use crate::config::BlockMode;
use crate::huffman::{
    CodeLengthToken, CodeTable, HuffmanBuilder, MAX_CODE_LENGTH, MAX_CODE_LENGTH_BITS,
    encode_code_lengths,
};
use crate::lz77::Lz77Token;
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, END_OF_BLOCK, LENGTH_EXTRA_BITS, MAX_MATCH,
    NUM_CODE_LENGTH_SYMBOLS, NUM_DISTANCE_SYMBOLS, NUM_LITLEN_SYMBOLS, distance_to_code,
    fixed_distance_codes, fixed_litlen_codes, length_to_code,
};
use oxiflate_core::BitWriter;
use oxiflate_core::SlidingWindow;
use oxiflate_core::error::Result;
use std::io::Write;

/// Most tokens one block may hold.
pub const MAX_BLOCK_TOKENS: usize = 16384;

/// Most input bytes one block may cover.
pub const MAX_BLOCK_BYTES: usize = 16384;

/// Block type field (BTYPE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// 00: raw bytes.
    Stored,
    /// 01: fixed Huffman codes.
    Fixed,
    /// 10: Huffman codes sent in the block header.
    Dynamic,
}

impl BlockType {
    /// Parse the 2-bit BTYPE field. Returns `None` for the reserved value 3.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Self::Stored),
            1 => Some(Self::Fixed),
            2 => Some(Self::Dynamic),
            _ => None,
        }
    }

    /// The 2-bit BTYPE value.
    pub fn bits(self) -> u32 {
        match self {
            Self::Stored => 0,
            Self::Fixed => 1,
            Self::Dynamic => 2,
        }
    }
}

/// Exact sizes in bits of the pending block in each encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCosts {
    /// Stored, including alignment padding.
    pub stored: u64,
    /// Fixed Huffman.
    pub fixed: u64,
    /// Dynamic Huffman, including the code description.
    pub dynamic: u64,
}

/// Code description for a dynamic block.
#[derive(Debug, Clone)]
struct DynamicHeader {
    litlen: CodeTable,
    distance: CodeTable,
    codelen: CodeTable,
    rle: Vec<CodeLengthToken>,
    hlit: usize,
    hdist: usize,
    hclen: usize,
}

impl DynamicHeader {
    fn build(litlen_freq: &[u32], distance_freq: &[u32]) -> Self {
        let litlen_lengths = lengths_for(litlen_freq, MAX_CODE_LENGTH);
        let distance_lengths = lengths_for(distance_freq, MAX_CODE_LENGTH);

        let hlit = last_used(&litlen_lengths).max(257);
        let hdist = last_used(&distance_lengths).max(1);

        let mut combined = Vec::with_capacity(hlit + hdist);
        combined.extend_from_slice(&litlen_lengths[..hlit]);
        combined.extend_from_slice(&distance_lengths[..hdist]);
        let rle = encode_code_lengths(&combined);

        let mut codelen_freq = [0u32; NUM_CODE_LENGTH_SYMBOLS];
        for token in &rle {
            codelen_freq[token.symbol as usize] += 1;
        }
        let codelen_lengths = lengths_for(&codelen_freq, MAX_CODE_LENGTH_BITS);

        let hclen = CODE_LENGTH_ORDER
            .iter()
            .rposition(|&symbol| codelen_lengths[symbol] != 0)
            .map_or(0, |i| i + 1)
            .max(4);

        Self {
            litlen: CodeTable::from_lengths(&litlen_lengths),
            distance: CodeTable::from_lengths(&distance_lengths),
            codelen: CodeTable::from_lengths(&codelen_lengths),
            rle,
            hlit,
            hdist,
            hclen,
        }
    }

    /// Bits of the code description (after the 3-bit block header).
    fn cost(&self) -> u64 {
        let rle: u64 = self
            .rle
            .iter()
            .map(|t| self.codelen.length(t.symbol as usize) as u64 + t.extra_bits() as u64)
            .sum();
        5 + 5 + 4 + 3 * self.hclen as u64 + rle
    }

    fn write<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        writer.write_bits((self.hlit - 257) as u32, 5)?;
        writer.write_bits((self.hdist - 1) as u32, 5)?;
        writer.write_bits((self.hclen - 4) as u32, 4)?;

        for &symbol in &CODE_LENGTH_ORDER[..self.hclen] {
            writer.write_bits(self.codelen.length(symbol) as u32, 3)?;
        }
        for token in &self.rle {
            self.codelen.write_symbol(writer, token.symbol as usize)?;
            writer.write_bits(token.extra as u32, token.extra_bits())?;
        }
        Ok(())
    }
}

/// Code lengths for a dynamic tree with at least two codes.
///
/// Some decoders reject trees with fewer than two codes, so unused
/// symbols are given a code to make up the count.
fn lengths_for(frequencies: &[u32], max_length: u8) -> Vec<u8> {
    let mut builder = HuffmanBuilder::new(frequencies.len(), max_length);
    for (symbol, &freq) in frequencies.iter().enumerate() {
        builder.add_count(symbol as u16, freq);
    }
    let mut filler = 0;
    while builder.used_symbols() < 2 {
        if builder.frequencies()[filler] == 0 {
            builder.add(filler as u16);
        }
        filler += 1;
    }
    builder.build_lengths()
}

/// One past the last symbol with a code.
fn last_used(lengths: &[u8]) -> usize {
    lengths.iter().rposition(|&len| len != 0).map_or(0, |i| i + 1)
}

/// Write an empty non-final stored block, leaving the output byte aligned.
pub fn write_sync_marker<W: Write>(writer: &mut BitWriter<W>) -> Result<()> {
    writer.write_bits(0, 3)?;
    writer.align_to_byte()?;
    writer.write_bytes(&[0x00, 0x00, 0xFF, 0xFF])
}

/// Accumulates tokens for one block and serializes it.
#[derive(Debug, Clone)]
pub struct BlockEncoder {
    tokens: Vec<Lz77Token>,
    litlen: HuffmanBuilder,
    distance: HuffmanBuilder,
    /// Absolute window position of the first byte in this block.
    start: u64,
    /// Input bytes covered by the tokens.
    bytes: usize,
    mode: BlockMode,
    /// Scratch buffer for stored data.
    stored: Vec<u8>,
}

impl BlockEncoder {
    /// Create an encoder restricted to `mode`.
    pub fn new(mode: BlockMode) -> Self {
        let mut litlen = HuffmanBuilder::new(NUM_LITLEN_SYMBOLS, MAX_CODE_LENGTH);
        litlen.add(END_OF_BLOCK);
        Self {
            tokens: Vec::with_capacity(MAX_BLOCK_TOKENS),
            litlen,
            distance: HuffmanBuilder::new(NUM_DISTANCE_SYMBOLS, MAX_CODE_LENGTH),
            start: 0,
            bytes: 0,
            mode,
            stored: Vec::new(),
        }
    }

    /// Drop pending tokens and start the next block at `start`.
    pub fn reset(&mut self, start: u64) {
        self.tokens.clear();
        self.litlen.clear();
        self.litlen.add(END_OF_BLOCK);
        self.distance.clear();
        self.start = start;
        self.bytes = 0;
    }

    /// Restrict the following blocks to `mode`.
    pub fn set_mode(&mut self, mode: BlockMode) {
        self.mode = mode;
    }

    /// Absolute position of the first byte in the pending block.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Input bytes covered by the pending block.
    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    /// Number of pending tokens.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if no token is pending.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns true if another token might not fit.
    pub fn is_full(&self) -> bool {
        self.tokens.len() >= MAX_BLOCK_TOKENS || self.bytes > MAX_BLOCK_BYTES - MAX_MATCH
    }

    /// Add a token to the pending block.
    pub fn push(&mut self, token: Lz77Token) {
        match token {
            Lz77Token::Literal(byte) => self.litlen.add(byte as u16),
            Lz77Token::Match { length, distance } => {
                self.litlen.add(length_to_code(length).0);
                self.distance.add(distance_to_code(distance).0);
            }
        }
        self.bytes += token.covered_bytes();
        self.tokens.push(token);
    }

    /// Extra bits carried by lengths and distances, the same in both
    /// Huffman encodings.
    fn extra_bits(&self) -> u64 {
        let lengths: u64 = self.litlen.frequencies()[257..]
            .iter()
            .zip(LENGTH_EXTRA_BITS)
            .map(|(&freq, bits)| freq as u64 * bits as u64)
            .sum();
        let distances: u64 = self
            .distance
            .frequencies()
            .iter()
            .zip(DISTANCE_EXTRA_BITS)
            .map(|(&freq, bits)| freq as u64 * bits as u64)
            .sum();
        lengths + distances
    }

    fn stored_cost(&self, bit_position: u64) -> u64 {
        let padding = (8 - (bit_position + 3) % 8) % 8;
        3 + padding + 32 + 8 * self.bytes as u64
    }

    fn fixed_cost(&self, extra: u64) -> u64 {
        3 + fixed_litlen_codes().cost(self.litlen.frequencies())
            + fixed_distance_codes().cost(self.distance.frequencies())
            + extra
    }

    fn dynamic_cost(&self, header: &DynamicHeader, extra: u64) -> u64 {
        3 + header.cost()
            + header.litlen.cost(self.litlen.frequencies())
            + header.distance.cost(self.distance.frequencies())
            + extra
    }

    /// Sizes of the pending block if written at `bit_position`.
    pub fn costs(&self, bit_position: u64) -> BlockCosts {
        let extra = self.extra_bits();
        let header = DynamicHeader::build(self.litlen.frequencies(), self.distance.frequencies());
        BlockCosts {
            stored: self.stored_cost(bit_position),
            fixed: self.fixed_cost(extra),
            dynamic: self.dynamic_cost(&header, extra),
        }
    }

    /// Write the pending block and start a new one right after it.
    ///
    /// `window` must still hold the block's input bytes for the stored case.
    pub fn flush_block<W: Write>(
        &mut self,
        writer: &mut BitWriter<W>,
        window: &SlidingWindow,
        is_final: bool,
    ) -> Result<BlockType> {
        let stored = self.stored_cost(writer.bits_written());
        let (block_type, header) = match self.mode {
            BlockMode::Stored => (BlockType::Stored, None),
            BlockMode::Fixed => (BlockType::Fixed, None),
            BlockMode::Dynamic => {
                let header =
                    DynamicHeader::build(self.litlen.frequencies(), self.distance.frequencies());
                (BlockType::Dynamic, Some(header))
            }
            BlockMode::Auto => {
                let extra = self.extra_bits();
                let fixed = self.fixed_cost(extra);
                let header =
                    DynamicHeader::build(self.litlen.frequencies(), self.distance.frequencies());
                let dynamic = self.dynamic_cost(&header, extra);
                log::trace!(
                    "block at {}: {} tokens, {} bytes, stored={} fixed={} dynamic={} bits",
                    self.start,
                    self.tokens.len(),
                    self.bytes,
                    stored,
                    fixed,
                    dynamic
                );

                if stored < fixed.min(dynamic) {
                    (BlockType::Stored, None)
                } else if fixed <= dynamic {
                    (BlockType::Fixed, None)
                } else {
                    (BlockType::Dynamic, Some(header))
                }
            }
        };

        writer.write_bit(is_final)?;
        writer.write_bits(block_type.bits(), 2)?;

        match (block_type, header) {
            (BlockType::Dynamic, Some(header)) => {
                header.write(writer)?;
                self.write_tokens(writer, &header.litlen, &header.distance)?;
            }
            (BlockType::Stored, _) => self.write_stored(writer, window)?,
            _ => self.write_tokens(writer, fixed_litlen_codes(), fixed_distance_codes())?,
        }

        log::trace!(
            "wrote {:?} block ({} bytes in, final={})",
            block_type,
            self.bytes,
            is_final
        );
        let next = self.start + self.bytes as u64;
        self.reset(next);
        Ok(block_type)
    }

    fn write_stored<W: Write>(
        &mut self,
        writer: &mut BitWriter<W>,
        window: &SlidingWindow,
    ) -> Result<()> {
        writer.align_to_byte()?;
        let len = self.bytes as u16;
        writer.write_bits(len as u32, 16)?;
        writer.write_bits(!len as u32, 16)?;

        self.stored.resize(self.bytes, 0);
        window.copy_range(self.start, &mut self.stored);
        writer.write_bytes(&self.stored)
    }

    fn write_tokens<W: Write>(
        &self,
        writer: &mut BitWriter<W>,
        litlen: &CodeTable,
        distance: &CodeTable,
    ) -> Result<()> {
        for token in &self.tokens {
            match *token {
                Lz77Token::Literal(byte) => litlen.write_symbol(writer, byte as usize)?,
                Lz77Token::Match {
                    length,
                    distance: dist,
                } => {
                    let (code, extra_bits, extra) = length_to_code(length);
                    litlen.write_symbol(writer, code as usize)?;
                    writer.write_bits(extra as u32, extra_bits)?;

                    let (code, extra_bits, extra) = distance_to_code(dist);
                    distance.write_symbol(writer, code as usize)?;
                    writer.write_bits(extra as u32, extra_bits)?;
                }
            }
        }
        litlen.write_symbol(writer, END_OF_BLOCK as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(tokens: &[Lz77Token], window: &SlidingWindow, mode: BlockMode) -> (Vec<u8>, BlockType) {
        let mut encoder = BlockEncoder::new(mode);
        for &token in tokens {
            encoder.push(token);
        }
        let mut writer = BitWriter::new(Vec::new());
        let block_type = encoder.flush_block(&mut writer, window, true).unwrap();
        (writer.into_inner().unwrap(), block_type)
    }

    fn literals(data: &[u8]) -> (Vec<Lz77Token>, SlidingWindow) {
        let mut window = SlidingWindow::new(1 << 16);
        window.write_bytes(data);
        (data.iter().map(|&b| Lz77Token::Literal(b)).collect(), window)
    }

    #[test]
    fn test_block_type_bits() {
        for block_type in [BlockType::Stored, BlockType::Fixed, BlockType::Dynamic] {
            assert_eq!(BlockType::from_bits(block_type.bits()), Some(block_type));
        }
        assert_eq!(BlockType::from_bits(3), None);
    }

    #[test]
    fn test_empty_final_block_is_fixed() {
        let window = SlidingWindow::new(1 << 16);
        let (bytes, block_type) = encode(&[], &window, BlockMode::Auto);
        assert_eq!(block_type, BlockType::Fixed);
        assert_eq!(bytes, vec![0x03, 0x00]);
    }

    #[test]
    fn test_stored_block_layout() {
        let (tokens, window) = literals(b"abc");
        let (bytes, block_type) = encode(&tokens, &window, BlockMode::Stored);
        assert_eq!(block_type, BlockType::Stored);
        assert_eq!(bytes, vec![0x01, 0x03, 0x00, 0xFC, 0xFF, b'a', b'b', b'c']);
    }

    #[test]
    fn test_fixed_literal_encoding() {
        // 'A' at the start of a final fixed block: 1, 01, then 0x71 MSB-first.
        let (tokens, window) = literals(b"A");
        let (bytes, block_type) = encode(&tokens, &window, BlockMode::Fixed);
        assert_eq!(block_type, BlockType::Fixed);
        assert_eq!(bytes, vec![0x73, 0x04, 0x00]);
    }

    #[test]
    fn test_costs_match_output() {
        let mut data = Vec::new();
        for i in 0..2000u32 {
            data.push(b"etaoin shrdlu"[(i * 7 % 13) as usize]);
        }
        let (tokens, window) = literals(&data);

        for mode in [BlockMode::Stored, BlockMode::Fixed, BlockMode::Dynamic] {
            let mut encoder = BlockEncoder::new(mode);
            for &token in &tokens {
                encoder.push(token);
            }
            let costs = encoder.costs(0);
            let mut writer = BitWriter::new(Vec::new());
            encoder.flush_block(&mut writer, &window, true).unwrap();

            let expected = match mode {
                BlockMode::Stored => costs.stored,
                BlockMode::Fixed => costs.fixed,
                _ => costs.dynamic,
            };
            assert_eq!(writer.bits_written(), expected, "{:?}", mode);
        }
    }

    #[test]
    fn test_auto_picks_cheapest() {
        let mut state = 12345u32;
        let noise: Vec<u8> = (0..4000)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                (state >> 16) as u8
            })
            .collect();
        let (tokens, window) = literals(&noise);
        let (_, block_type) = encode(&tokens, &window, BlockMode::Auto);
        assert_eq!(block_type, BlockType::Stored);

        let text = b"aaaaaaaabbbbcc".repeat(100);
        let (tokens, window) = literals(&text);
        let (_, block_type) = encode(&tokens, &window, BlockMode::Auto);
        assert_eq!(block_type, BlockType::Dynamic);
    }

    #[test]
    fn test_dynamic_trees_have_two_codes() {
        let lengths = lengths_for(&[0, 0, 5, 0], MAX_CODE_LENGTH);
        assert_eq!(lengths.iter().filter(|&&l| l > 0).count(), 2);
        assert_eq!(lengths[2], 1);

        let lengths = lengths_for(&[0; 30], MAX_CODE_LENGTH);
        assert_eq!(lengths[..2], [1, 1]);
    }

    #[test]
    fn test_block_fills_up() {
        let mut encoder = BlockEncoder::new(BlockMode::Auto);
        let mut count = 0;
        while !encoder.is_full() {
            encoder.push(Lz77Token::Match {
                length: 258,
                distance: 1,
            });
            count += 1;
        }
        assert!(encoder.byte_len() <= MAX_BLOCK_BYTES);
        assert_eq!(count, encoder.token_count());

        encoder.reset(100);
        assert!(encoder.is_empty());
        assert_eq!(encoder.start(), 100);
    }

    #[test]
    fn test_set_mode() {
        let (tokens, window) = literals(b"abc");
        let mut encoder = BlockEncoder::new(BlockMode::Fixed);
        encoder.set_mode(BlockMode::Stored);
        for &token in &tokens {
            encoder.push(token);
        }
        let mut writer = BitWriter::new(Vec::new());
        let block_type = encoder.flush_block(&mut writer, &window, true).unwrap();
        assert_eq!(block_type, BlockType::Stored);
    }

    #[test]
    fn test_sync_marker() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b101, 3).unwrap();
        write_sync_marker(&mut writer).unwrap();
        assert_eq!(writer.pending_bits(), 0);
        assert_eq!(writer.get_ref(), &vec![0x05, 0x00, 0x00, 0xFF, 0xFF]);
    }
}
