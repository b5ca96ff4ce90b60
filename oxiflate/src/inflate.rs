//! DEFLATE decompression (inflate).
//!
//! [`Inflater`] is a resumable state machine. Every call to
//! [`decompress`](Decompressor::decompress) runs until the input is used up,
//! the output is full, or the stream ends. All decoding state lives in the
//! struct, so input may be split at any byte and output drained in pieces
//! of any size.
//!
//! Decoded bytes go into a 32 KB [`SlidingWindow`] that doubles as the
//! back-reference history; they are copied out to the caller from there.
//! A literal/length symbol together with its distance is decoded
//! atomically: if the input ends halfway, the bit reader is rolled back to
//! the start of the symbol.
//!
//! [`Inflater::sync`] skips ahead to the next `00 00 FF FF` flush marker,
//! so decoding can resume after damaged data when the sender used
//! [`FlushMode::Full`](oxiflate_core::traits::FlushMode::Full).

use crate::block::BlockType;
use crate::config::Format;
use crate::huffman::HuffmanTree;
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, END_OF_BLOCK, LENGTH_EXTRA_BITS, MAX_MATCH,
    NUM_CODE_LENGTH_SYMBOLS, NUM_DISTANCE_SYMBOLS, NUM_LITLEN_SYMBOLS, decode_distance,
    decode_length, fixed_distance_tree, fixed_litlen_tree,
};
use crate::zlib::ZlibHeader;
use oxiflate_core::adler::Adler32;
use oxiflate_core::bitstream::BitReader;
use oxiflate_core::error::{DecodeStage, ErrorKind, OxiFlateError, Result};
use oxiflate_core::traits::{DecompressStatus, Decompressor};
use oxiflate_core::window::SlidingWindow;

/// Decode tables for the current compressed block.
#[derive(Debug)]
enum Tables {
    Fixed,
    Dynamic(Box<DynamicTables>),
}

#[derive(Debug)]
struct DynamicTables {
    litlen: HuffmanTree,
    distance: HuffmanTree,
}

impl Tables {
    fn trees(&self) -> (&HuffmanTree, &HuffmanTree) {
        match self {
            Self::Fixed => (fixed_litlen_tree(), fixed_distance_tree()),
            Self::Dynamic(tables) => (&tables.litlen, &tables.distance),
        }
    }
}

/// Code lengths of a dynamic block, read one symbol at a time.
#[derive(Debug)]
struct CodeLengthReader {
    hlit: usize,
    hdist: usize,
    tree: HuffmanTree,
    lengths: Vec<u8>,
}

impl CodeLengthReader {
    /// Read code lengths until all are known (`true`) or input runs out
    /// (`false`).
    fn read(&mut self, reader: &mut BitReader) -> Result<bool> {
        let total = self.hlit + self.hdist;
        while self.lengths.len() < total {
            let snapshot = *reader;
            let Some(symbol) = self.tree.decode(reader, DecodeStage::DynamicHeader)? else {
                return Ok(false);
            };

            let (value, extra_bits, base) = match symbol {
                0..=15 => {
                    self.lengths.push(symbol as u8);
                    continue;
                }
                16 => {
                    let Some(&previous) = self.lengths.last() else {
                        return Err(OxiFlateError::invalid_code_lengths(
                            DecodeStage::DynamicHeader,
                            "repeat with no previous length",
                        ));
                    };
                    (previous, 2, 3)
                }
                17 => (0, 3, 3),
                _ => (0, 7, 11),
            };

            let Some(extra) = reader.read_bits(extra_bits) else {
                *reader = snapshot;
                return Ok(false);
            };
            let repeat = base + extra as usize;
            if self.lengths.len() + repeat > total {
                return Err(OxiFlateError::invalid_code_lengths(
                    DecodeStage::DynamicHeader,
                    "too many code lengths",
                ));
            }
            self.lengths.resize(self.lengths.len() + repeat, value);
        }
        Ok(true)
    }

    fn build(&self) -> Result<DynamicTables> {
        let (litlen, distance) = self.lengths.split_at(self.hlit);
        if litlen[END_OF_BLOCK as usize] == 0 {
            return Err(OxiFlateError::invalid_code_lengths(
                DecodeStage::LiteralLength,
                "missing end-of-block code",
            ));
        }
        Ok(DynamicTables {
            litlen: HuffmanTree::from_code_lengths(litlen, DecodeStage::LiteralLength)?,
            distance: HuffmanTree::from_code_lengths(distance, DecodeStage::Distance)?,
        })
    }
}

/// Decoder position within the stream.
#[derive(Debug)]
enum Phase {
    ZlibHeader,
    DictionaryId,
    AwaitDictionary {
        id: u32,
    },
    BlockHeader,
    StoredLength,
    StoredCopy {
        remaining: usize,
    },
    DynamicCounts,
    CodeLengthCodes {
        hlit: usize,
        hdist: usize,
        hclen: usize,
        lengths: [u8; NUM_CODE_LENGTH_SYMBOLS],
        read: usize,
    },
    CodeLengths(Box<CodeLengthReader>),
    Symbols {
        tables: Tables,
    },
    Trailer,
    Done,
    Failed(DecodeStage),
    /// Searching for a flush marker; `matched` bytes of it seen so far.
    Resync {
        matched: usize,
    },
}

/// Byte pattern that ends an empty stored block.
const SYNC_MARKER: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// Marker bytes matched after seeing `byte` with `matched` already seen.
fn next_marker_state(matched: usize, byte: u8) -> usize {
    if byte == SYNC_MARKER[matched] {
        matched + 1
    } else if byte != 0 {
        0
    } else {
        // The zeros just seen may start the next marker.
        4 - matched
    }
}

/// What happens to the four bytes after the last block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrailerCheck {
    /// Raw stream; nothing follows.
    Absent,
    /// zlib trailer, read but not verified.
    Skip,
    /// zlib trailer, verified against the output.
    Verify,
}

/// Outcome of one step of the state machine.
enum Flow {
    /// Progress was made; keep going.
    Continue,
    /// More input is needed.
    Blocked,
    /// The window must be drained before decoding can continue.
    Full,
    /// The stream is complete.
    Finished,
}

/// How a run of literal/length symbols ended.
enum BlockProgress {
    Blocked,
    Full,
    EndOfBlock,
}

/// Decode symbols until the block ends, input runs out, or the window
/// cannot take a maximum-length match.
fn decode_symbols(
    litlen: &HuffmanTree,
    distance: &HuffmanTree,
    reader: &mut BitReader,
    window: &mut SlidingWindow,
    input: &[u8],
    consumed: &mut usize,
) -> Result<BlockProgress> {
    loop {
        *consumed += reader.refill(&input[*consumed..]);
        if window.free_space() < MAX_MATCH {
            return Ok(BlockProgress::Full);
        }

        let snapshot = *reader;
        let Some(symbol) = litlen.decode(reader, DecodeStage::LiteralLength)? else {
            return Ok(BlockProgress::Blocked);
        };

        match symbol {
            0..=255 => window.write_byte(symbol as u8),
            END_OF_BLOCK => return Ok(BlockProgress::EndOfBlock),
            257..=285 => {
                let Some(extra) = reader.read_bits(LENGTH_EXTRA_BITS[(symbol - 257) as usize])
                else {
                    *reader = snapshot;
                    return Ok(BlockProgress::Blocked);
                };
                let length = decode_length(symbol, extra as u16);

                let Some(code) = distance.decode(reader, DecodeStage::Distance)? else {
                    *reader = snapshot;
                    return Ok(BlockProgress::Blocked);
                };
                if code as usize >= NUM_DISTANCE_SYMBOLS {
                    return Err(OxiFlateError::invalid_huffman(
                        DecodeStage::Distance,
                        reader.bit_position(),
                    ));
                }
                let Some(extra) = reader.read_bits(DISTANCE_EXTRA_BITS[code as usize]) else {
                    *reader = snapshot;
                    return Ok(BlockProgress::Blocked);
                };
                let dist = decode_distance(code, extra as u16);

                window.copy_from_offset(dist as usize, length as usize)?;
            }
            _ => {
                return Err(OxiFlateError::invalid_huffman(
                    DecodeStage::LiteralLength,
                    snapshot.bit_position(),
                ));
            }
        }
    }
}

/// Streaming DEFLATE decompressor.
///
/// # Example
///
/// ```
/// use oxiflate::deflate::deflate;
/// use oxiflate::inflate::Inflater;
/// use oxiflate_core::{DecompressStatus, Decompressor};
///
/// let compressed = deflate(b"hello hello hello", 6).unwrap();
/// let mut inflater = Inflater::new();
/// let mut out = [0u8; 64];
/// let (_, n, status) = inflater.decompress(&compressed, &mut out).unwrap();
/// assert_eq!(&out[..n], b"hello hello hello");
/// assert_eq!(status, DecompressStatus::Done);
/// ```
#[derive(Debug)]
pub struct Inflater {
    format: Format,
    phase: Phase,
    reader: BitReader,
    window: SlidingWindow,
    adler: Adler32,
    trailer: TrailerCheck,
    /// The block being decoded has BFINAL set.
    final_block: bool,
    /// Adler-32 of the dictionary loaded into the window, if any.
    dictionary_id: Option<u32>,
    total_in: u64,
    total_out: u64,
}

impl Inflater {
    /// Create a decompressor for raw DEFLATE data.
    pub fn new() -> Self {
        Self::with_format(Format::Raw)
    }

    /// Create a decompressor for zlib-wrapped data.
    pub fn zlib() -> Self {
        Self::with_format(Format::Zlib)
    }

    /// Create a decompressor for the given container format.
    pub fn with_format(format: Format) -> Self {
        Self {
            format,
            phase: Self::initial_phase(format),
            reader: BitReader::new(),
            window: SlidingWindow::inflate(),
            adler: Adler32::new(),
            trailer: Self::initial_trailer(format),
            final_block: false,
            dictionary_id: None,
            total_in: 0,
            total_out: 0,
        }
    }

    /// Create a raw decompressor whose history starts with `dictionary`.
    pub fn with_dictionary(dictionary: &[u8]) -> Self {
        let mut inflater = Self::new();
        inflater.load_dictionary(dictionary);
        inflater
    }

    fn initial_phase(format: Format) -> Phase {
        match format {
            Format::Raw => Phase::BlockHeader,
            Format::Zlib => Phase::ZlibHeader,
        }
    }

    fn initial_trailer(format: Format) -> TrailerCheck {
        match format {
            Format::Raw => TrailerCheck::Absent,
            Format::Zlib => TrailerCheck::Verify,
        }
    }

    /// Container format this decompressor expects.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Total input bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total output bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Dictionary identifier the stream is waiting for, if any.
    pub fn needs_dictionary(&self) -> Option<u32> {
        match self.phase {
            Phase::AwaitDictionary { id } => Some(id),
            _ => None,
        }
    }

    /// Supply a preset dictionary.
    ///
    /// Accepted before any input has been decoded, or when a zlib stream
    /// has reported [`OxiFlateError::NeedDictionary`]. In the latter case
    /// the dictionary's Adler-32 must equal the requested identifier.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        let id = Adler32::checksum(dictionary);
        match self.phase {
            Phase::AwaitDictionary { id: expected } => {
                if id != expected {
                    return Err(OxiFlateError::dictionary_mismatch(expected, id));
                }
                self.load_dictionary(dictionary);
                self.phase = Phase::BlockHeader;
                Ok(id)
            }
            Phase::ZlibHeader | Phase::BlockHeader
                if self.total_in == 0 && self.window.written() == 0 =>
            {
                Ok(self.load_dictionary(dictionary))
            }
            _ => Err(OxiFlateError::usage(
                "dictionary can only be set before decoding or when requested",
            )),
        }
    }

    fn load_dictionary(&mut self, dictionary: &[u8]) -> u32 {
        self.window.preload_dictionary(dictionary);
        let id = Adler32::checksum(dictionary);
        self.dictionary_id = Some(id);
        log::debug!(
            "inflate dictionary loaded: {} bytes, id {:08x}",
            dictionary.len(),
            id
        );
        id
    }

    /// Reset for a new stream of the same format.
    pub fn reset(&mut self) {
        self.phase = Self::initial_phase(self.format);
        self.reader.reset();
        self.window.reset();
        self.adler = Adler32::new();
        self.trailer = Self::initial_trailer(self.format);
        self.final_block = false;
        self.dictionary_id = None;
        self.total_in = 0;
        self.total_out = 0;
    }

    /// Skip input up to and including the next full flush marker.
    ///
    /// Works from any state short of a finished stream, including after a
    /// data error. Returns `Some(consumed)` once the marker has been found;
    /// decoding then resumes at the next block header with no history, and
    /// a zlib checksum is no longer verified. Returns `None` when `input`
    /// ran out first; all of it was consumed and the search continues on
    /// the next call, which must be another `sync`.
    pub fn sync(&mut self, input: &[u8]) -> Result<Option<usize>> {
        let mut matched = match self.phase {
            Phase::Done => {
                return Err(OxiFlateError::usage("sync called after the stream ended"));
            }
            Phase::Resync { matched } => matched,
            _ => {
                self.trailer = match (self.stage(), self.trailer) {
                    (DecodeStage::ZlibHeader, _) | (_, TrailerCheck::Absent) => {
                        TrailerCheck::Absent
                    }
                    _ => TrailerCheck::Skip,
                };
                // Bytes already in the bit reader come first.
                self.reader.align_to_byte();
                let mut matched = 0;
                while let Some(byte) = self.reader.read_byte() {
                    matched = next_marker_state(matched, byte);
                    if matched == SYNC_MARKER.len() {
                        self.resume_after_marker();
                        return Ok(Some(0));
                    }
                }
                self.reader.reset();
                matched
            }
        };

        for (i, &byte) in input.iter().enumerate() {
            matched = next_marker_state(matched, byte);
            if matched == SYNC_MARKER.len() {
                self.total_in += (i + 1) as u64;
                self.resume_after_marker();
                return Ok(Some(i + 1));
            }
        }
        self.total_in += input.len() as u64;
        self.phase = Phase::Resync { matched };
        Ok(None)
    }

    fn resume_after_marker(&mut self) {
        self.window.forget_history();
        self.final_block = false;
        self.phase = Phase::BlockHeader;
        log::debug!("flush marker found at input byte {}", self.total_in);
    }

    /// Bytes the current phase may pull into the bit reader.
    ///
    /// Header and trailer fields take exactly what they need so that the
    /// reader never holds bytes that follow the stream or precede a
    /// dictionary request.
    fn input_wanted(&self) -> usize {
        let exact = |bytes: usize| bytes.saturating_sub(self.reader.unused_bytes());
        match self.phase {
            Phase::ZlibHeader => exact(2),
            Phase::DictionaryId => exact(4),
            Phase::Trailer if self.trailer != TrailerCheck::Absent => exact(4),
            Phase::Trailer
            | Phase::AwaitDictionary { .. }
            | Phase::Done
            | Phase::Failed(_)
            | Phase::Resync { .. } => 0,
            _ => usize::MAX,
        }
    }

    /// Move decoded bytes to `out`, keeping the checksum current.
    fn flush_output(&mut self, out: &mut [u8]) -> usize {
        let count = self.window.flush_into(out);
        if self.trailer == TrailerCheck::Verify {
            self.adler.update(&out[..count]);
        }
        count
    }

    fn end_of_block(&mut self) {
        if self.final_block {
            self.reader.align_to_byte();
            self.phase = Phase::Trailer;
        } else {
            self.phase = Phase::BlockHeader;
        }
    }

    fn step(&mut self, input: &[u8], consumed: &mut usize) -> Result<Flow> {
        match &mut self.phase {
            Phase::ZlibHeader => {
                let Some(bits) = self.reader.read_bits(16) else {
                    return Ok(Flow::Blocked);
                };
                let header = ZlibHeader::parse(bits as u8, (bits >> 8) as u8)?;
                log::debug!(
                    "zlib header: window {} bytes, level {:?}, dictionary {}",
                    header.window_size(),
                    header.level,
                    header.has_dictionary
                );
                self.phase = if header.has_dictionary {
                    Phase::DictionaryId
                } else {
                    Phase::BlockHeader
                };
            }
            Phase::DictionaryId => {
                let Some(bits) = self.reader.read_bits(32) else {
                    return Ok(Flow::Blocked);
                };
                let id = bits.swap_bytes();
                match self.dictionary_id {
                    Some(loaded) if loaded == id => self.phase = Phase::BlockHeader,
                    Some(loaded) => return Err(OxiFlateError::dictionary_mismatch(id, loaded)),
                    None => {
                        log::debug!("stream requests dictionary {:08x}", id);
                        self.phase = Phase::AwaitDictionary { id };
                        return Err(OxiFlateError::need_dictionary(id));
                    }
                }
            }
            Phase::AwaitDictionary { id } => {
                return Err(OxiFlateError::need_dictionary(*id));
            }
            Phase::BlockHeader => {
                let Some(bits) = self.reader.peek_bits(3) else {
                    return Ok(Flow::Blocked);
                };
                let position = self.reader.bit_position();
                self.final_block = bits & 1 != 0;
                let Some(block_type) = BlockType::from_bits(bits >> 1) else {
                    return Err(OxiFlateError::invalid_block_type((bits >> 1) as u8, position));
                };
                self.phase = match block_type {
                    BlockType::Stored => Phase::StoredLength,
                    BlockType::Fixed => Phase::Symbols {
                        tables: Tables::Fixed,
                    },
                    BlockType::Dynamic => Phase::DynamicCounts,
                };
                self.reader.consume(3);
                log::trace!(
                    "{:?} block at bit {} (final={})",
                    block_type,
                    position,
                    self.final_block
                );
            }
            Phase::StoredLength => {
                self.reader.align_to_byte();
                let Some(bits) = self.reader.peek_bits(32) else {
                    return Ok(Flow::Blocked);
                };
                let len = bits as u16;
                let nlen = (bits >> 16) as u16;
                if len != !nlen {
                    return Err(OxiFlateError::stored_length_mismatch(len, nlen));
                }
                self.reader.consume(32);
                if len == 0 {
                    self.end_of_block();
                } else {
                    self.phase = Phase::StoredCopy {
                        remaining: len as usize,
                    };
                }
            }
            Phase::StoredCopy { remaining } => {
                while *remaining > 0 && self.window.free_space() > 0 {
                    let Some(byte) = self.reader.read_byte() else {
                        break;
                    };
                    self.window.write_byte(byte);
                    *remaining -= 1;
                }
                if *remaining > 0 && self.reader.available_bits() == 0 {
                    let count = (*remaining)
                        .min(self.window.free_space())
                        .min(input.len() - *consumed);
                    self.window
                        .write_bytes(&input[*consumed..*consumed + count]);
                    *consumed += count;
                    *remaining -= count;
                }

                if *remaining == 0 {
                    self.end_of_block();
                } else if self.window.free_space() == 0 {
                    return Ok(Flow::Full);
                } else {
                    return Ok(Flow::Blocked);
                }
            }
            Phase::DynamicCounts => {
                let Some(bits) = self.reader.peek_bits(14) else {
                    return Ok(Flow::Blocked);
                };
                let hlit = (bits & 0x1F) as usize + 257;
                let hdist = ((bits >> 5) & 0x1F) as usize + 1;
                let hclen = (bits >> 10) as usize + 4;
                if hlit > NUM_LITLEN_SYMBOLS || hdist > NUM_DISTANCE_SYMBOLS {
                    return Err(OxiFlateError::invalid_code_lengths(
                        DecodeStage::DynamicHeader,
                        format!("too many symbols: HLIT={} HDIST={}", hlit, hdist),
                    ));
                }
                self.reader.consume(14);
                self.phase = Phase::CodeLengthCodes {
                    hlit,
                    hdist,
                    hclen,
                    lengths: [0; NUM_CODE_LENGTH_SYMBOLS],
                    read: 0,
                };
            }
            Phase::CodeLengthCodes {
                hlit,
                hdist,
                hclen,
                lengths,
                read,
            } => {
                while *read < *hclen {
                    let Some(len) = self.reader.read_bits(3) else {
                        return Ok(Flow::Blocked);
                    };
                    lengths[CODE_LENGTH_ORDER[*read]] = len as u8;
                    *read += 1;
                }
                let tree = HuffmanTree::from_code_lengths(&lengths[..], DecodeStage::DynamicHeader)?;
                let (hlit, hdist) = (*hlit, *hdist);
                let total = hlit + hdist;
                self.phase = Phase::CodeLengths(Box::new(CodeLengthReader {
                    hlit,
                    hdist,
                    tree,
                    lengths: Vec::with_capacity(total),
                }));
            }
            Phase::CodeLengths(state) => {
                if !state.read(&mut self.reader)? {
                    return Ok(Flow::Blocked);
                }
                let tables = state.build()?;
                self.phase = Phase::Symbols {
                    tables: Tables::Dynamic(Box::new(tables)),
                };
            }
            Phase::Symbols { tables } => {
                let (litlen, distance) = tables.trees();
                match decode_symbols(
                    litlen,
                    distance,
                    &mut self.reader,
                    &mut self.window,
                    input,
                    consumed,
                )? {
                    BlockProgress::Blocked => return Ok(Flow::Blocked),
                    BlockProgress::Full => return Ok(Flow::Full),
                    BlockProgress::EndOfBlock => self.end_of_block(),
                }
            }
            Phase::Trailer => {
                if self.window.pending() > 0 {
                    return Ok(Flow::Full);
                }
                if self.trailer != TrailerCheck::Absent {
                    let Some(bits) = self.reader.read_bits(32) else {
                        return Ok(Flow::Blocked);
                    };
                    let expected = bits.swap_bytes();
                    let computed = self.adler.finish();
                    if self.trailer == TrailerCheck::Verify && expected != computed {
                        return Err(OxiFlateError::checksum_mismatch(expected, computed));
                    }
                }
                self.phase = Phase::Done;
                return Ok(Flow::Finished);
            }
            Phase::Done | Phase::Failed(_) => {
                return Err(OxiFlateError::usage("stream already ended"));
            }
            Phase::Resync { .. } => {
                return Err(OxiFlateError::usage("flush marker not found yet"));
            }
        }
        Ok(Flow::Continue)
    }

    fn run(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        consumed: &mut usize,
        produced: &mut usize,
    ) -> Result<DecompressStatus> {
        loop {
            *produced += self.flush_output(&mut output[*produced..]);

            let limit = consumed.saturating_add(self.input_wanted()).min(input.len());
            *consumed += self.reader.refill(&input[*consumed..limit]);

            match self.step(input, consumed)? {
                Flow::Continue => {}
                Flow::Blocked => {
                    *produced += self.flush_output(&mut output[*produced..]);
                    return Ok(if self.window.pending() > 0 {
                        DecompressStatus::NeedsOutput
                    } else {
                        DecompressStatus::NeedsInput
                    });
                }
                Flow::Full => {
                    let count = self.flush_output(&mut output[*produced..]);
                    *produced += count;
                    if count == 0 {
                        // Prefetched bytes are not needed yet; the caller
                        // passes them again on the next call.
                        *consumed -= self.reader.unrefill(*consumed);
                        return Ok(DecompressStatus::NeedsOutput);
                    }
                }
                Flow::Finished => {
                    // Whole bytes the reader fetched past the end belong to the caller.
                    *consumed -= self.reader.unrefill(*consumed);
                    self.reader.reset();
                    return Ok(DecompressStatus::Done);
                }
            }
        }
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for Inflater {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        match self.phase {
            Phase::Done => {
                return Err(OxiFlateError::usage("decompress called after the stream ended"));
            }
            Phase::Failed(stage) => {
                return Err(OxiFlateError::usage(format!(
                    "decompress called after a data error in {}",
                    stage
                )));
            }
            Phase::Resync { .. } => {
                return Err(OxiFlateError::usage(
                    "decompress called before sync found a flush marker",
                ));
            }
            _ => {}
        }

        let mut consumed = 0;
        let mut produced = 0;
        let result = self.run(input, output, &mut consumed, &mut produced);
        self.total_in += consumed as u64;
        self.total_out += produced as u64;

        match result {
            Ok(DecompressStatus::Done) => {
                log::debug!(
                    "inflate finished: {} bytes in, {} bytes out",
                    self.total_in,
                    self.total_out
                );
                Ok((consumed, produced, DecompressStatus::Done))
            }
            Ok(status) => Ok((consumed, produced, status)),
            Err(err) => {
                if err.kind() == ErrorKind::DataFormat {
                    let stage = self.stage();
                    log::warn!("inflate failed in {}: {}", stage, err);
                    self.phase = Phase::Failed(stage);
                }
                Err(err)
            }
        }
    }

    fn reset(&mut self) {
        Inflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    fn stage(&self) -> DecodeStage {
        match &self.phase {
            Phase::ZlibHeader => DecodeStage::ZlibHeader,
            Phase::DictionaryId | Phase::AwaitDictionary { .. } => DecodeStage::Dictionary,
            Phase::BlockHeader | Phase::Resync { .. } => DecodeStage::BlockHeader,
            Phase::StoredLength | Phase::StoredCopy { .. } => DecodeStage::StoredBlock,
            Phase::DynamicCounts | Phase::CodeLengthCodes { .. } | Phase::CodeLengths(_) => {
                DecodeStage::DynamicHeader
            }
            Phase::Symbols { .. } => DecodeStage::LiteralLength,
            Phase::Trailer | Phase::Done => DecodeStage::Trailer,
            Phase::Failed(stage) => *stage,
        }
    }
}

/// Decompress raw DEFLATE data.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::new().decompress_all(data)
}
