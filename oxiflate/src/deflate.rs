//! DEFLATE compression.
//!
//! [`Deflater`] is a streaming compressor. Input is copied into the match
//! finder's window, tokenized, and collected into blocks; every finished
//! block is serialized into a pending output buffer that is drained into
//! the caller's output slice. While pending output remains, no new input is
//! accepted.
//!
//! Flushing follows zlib:
//!
//! - [`FlushMode::Sync`] writes the pending block and an empty stored block,
//!   so everything consumed so far can be decoded.
//! - [`FlushMode::Full`] does the same and then drops the match history.
//! - [`FlushMode::Finish`] writes the last block with BFINAL set, followed
//!   by the zlib trailer when the format asks for one.
//!
//! [`Deflater::set_params`] changes the level or strategy mid-stream. Input
//! taken so far is closed off in a block of its own first, so each block is
//! encoded with a single set of parameters.

use crate::block::{BlockEncoder, write_sync_marker};
use crate::config::{DeflateConfig, Format, MatchStrategy};
use crate::lz77::Lz77Matcher;
use crate::zlib::ZlibHeader;
use oxiflate_core::adler::Adler32;
use oxiflate_core::bitstream::BitWriter;
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{CompressStatus, Compressor, FlushMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Nothing written yet; a dictionary may still be set.
    Start,
    /// Accepting input.
    Active,
    /// The final block is written; draining the rest.
    Finishing,
    /// Everything has been handed out.
    Done,
}

/// DEFLATE compressor.
#[derive(Debug)]
pub struct Deflater {
    config: DeflateConfig,
    matcher: Lz77Matcher,
    block: BlockEncoder,
    /// Serialized output not yet handed to the caller.
    writer: BitWriter<Vec<u8>>,
    /// Bytes at the front of the pending buffer already handed out.
    drained: usize,
    adler: Adler32,
    dictionary_id: Option<u32>,
    stage: Stage,
    /// A sync marker was written and no input arrived since.
    synced: bool,
    total_in: u64,
    total_out: u64,
}

impl Deflater {
    /// Create a raw DEFLATE compressor with the specified level (0-9).
    pub fn new(level: u8) -> Self {
        Self::from_valid_config(DeflateConfig::raw(level.min(9)))
    }

    /// Create a compressor from a configuration.
    pub fn with_config(config: DeflateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    /// Create a raw compressor that primes its window with `dictionary`.
    pub fn with_dictionary(level: u8, dictionary: &[u8]) -> Self {
        let mut deflater = Self::new(level);
        deflater.load_dictionary(dictionary);
        deflater
    }

    pub(crate) fn from_valid_config(config: DeflateConfig) -> Self {
        Self {
            matcher: Lz77Matcher::new(config.match_params(), config.window_size()),
            block: BlockEncoder::new(config.effective_block_mode()),
            writer: BitWriter::new(Vec::new()),
            drained: 0,
            adler: Adler32::new(),
            dictionary_id: None,
            stage: Stage::Start,
            synced: false,
            total_in: 0,
            total_out: 0,
            config,
        }
    }

    /// The configuration this compressor was built with.
    pub fn config(&self) -> &DeflateConfig {
        &self.config
    }

    /// Total input bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total output bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Set a preset dictionary. Must be called before any input.
    ///
    /// Returns the dictionary's Adler-32, which a zlib stream records in
    /// its header.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        if self.stage != Stage::Start || self.dictionary_id.is_some() {
            return Err(OxiFlateError::usage(
                "dictionary must be set once, before any input",
            ));
        }
        Ok(self.load_dictionary(dictionary))
    }

    fn load_dictionary(&mut self, dictionary: &[u8]) -> u32 {
        self.matcher.set_dictionary(dictionary);
        self.block.reset(self.matcher.position());
        let id = Adler32::checksum(dictionary);
        self.dictionary_id = Some(id);
        log::debug!(
            "preset dictionary loaded: {} bytes, id {:08x}",
            dictionary.len(),
            id
        );
        id
    }

    /// Change the compression level and strategy override.
    ///
    /// Everything consumed so far is parsed with the old parameters and
    /// written out as a non-final block, which stays pending until the next
    /// call to `compress`. Unchanged parameters are a no-op.
    pub fn set_params(&mut self, level: u8, strategy: Option<MatchStrategy>) -> Result<()> {
        if matches!(self.stage, Stage::Finishing | Stage::Done) {
            return Err(OxiFlateError::usage(
                "parameters changed after the stream finished",
            ));
        }
        let config = self.config.level(level).match_strategy(strategy);
        config.validate()?;
        if config == self.config {
            return Ok(());
        }

        if self.stage == Stage::Active {
            self.finish_block()?;
        }
        self.matcher.set_params(config.match_params());
        self.block.set_mode(config.effective_block_mode());
        log::debug!(
            "deflate parameters changed: level {} -> {}, strategy {:?}",
            self.config.compression_level(),
            level,
            strategy
        );
        self.config = config;
        Ok(())
    }

    /// Parse all buffered input and write the pending block, not final.
    fn finish_block(&mut self) -> Result<()> {
        while let Some(token) = self.matcher.next_token(true) {
            self.block.push(token);
            if self.block.is_full() {
                self.block
                    .flush_block(&mut self.writer, self.matcher.window(), false)?;
            }
        }
        if !self.block.is_empty() {
            self.block
                .flush_block(&mut self.writer, self.matcher.window(), false)?;
        }
        self.matcher.release_before(self.block.start());
        Ok(())
    }

    /// Reset the compressor, keeping its configuration.
    pub fn reset(&mut self) {
        *self = Self::from_valid_config(self.config);
    }

    /// Compress a whole buffer into a new vector.
    pub fn compress_to_vec(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.compress_all(data)
    }

    fn write_header(&mut self) -> Result<()> {
        if self.config.output_format() != Format::Zlib {
            return Ok(());
        }
        let mut header = ZlibHeader::new(
            self.config.window_log(),
            self.config.compression_level(),
        );
        header.has_dictionary = self.dictionary_id.is_some();
        self.writer.write_bytes(&header.to_bytes())?;
        if let Some(id) = self.dictionary_id {
            self.writer.write_bytes(&id.to_be_bytes())?;
        }
        Ok(())
    }

    fn has_pending(&self) -> bool {
        self.drained < self.writer.get_ref().len()
    }

    /// Move pending output into `output`.
    fn drain(&mut self, output: &mut [u8]) -> usize {
        let pending = &self.writer.get_ref()[self.drained..];
        let count = pending.len().min(output.len());
        output[..count].copy_from_slice(&pending[..count]);
        self.drained += count;
        if self.drained == self.writer.get_ref().len() {
            self.writer.get_mut().clear();
            self.drained = 0;
        }
        count
    }

    fn status(&self) -> CompressStatus {
        if self.has_pending() {
            CompressStatus::NeedsOutput
        } else {
            CompressStatus::NeedsInput
        }
    }

    fn run(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
        consumed: &mut usize,
        produced: &mut usize,
    ) -> Result<CompressStatus> {
        match self.stage {
            Stage::Done => {
                return Err(OxiFlateError::usage(
                    "compress called after the stream finished",
                ));
            }
            Stage::Finishing if !input.is_empty() => {
                return Err(OxiFlateError::usage("new input after finish"));
            }
            Stage::Start => {
                self.write_header()?;
                self.stage = Stage::Active;
            }
            _ => {}
        }

        *produced += self.drain(output);
        if self.stage == Stage::Finishing {
            if self.has_pending() {
                return Ok(CompressStatus::NeedsOutput);
            }
            self.stage = Stage::Done;
            return Ok(CompressStatus::Done);
        }
        if self.has_pending() {
            return Ok(CompressStatus::NeedsOutput);
        }

        loop {
            let taken = self.matcher.fill(&input[*consumed..]);
            if taken > 0 {
                self.adler.update(&input[*consumed..*consumed + taken]);
                self.synced = false;
            }
            *consumed += taken;

            let input_done = *consumed == input.len();
            let flushing = input_done && flush != FlushMode::None;

            while let Some(token) = self.matcher.next_token(flushing) {
                self.block.push(token);
                if self.block.is_full() {
                    self.block
                        .flush_block(&mut self.writer, self.matcher.window(), false)?;
                    *produced += self.drain(&mut output[*produced..]);
                    if self.has_pending() {
                        self.matcher.release_before(self.block.start());
                        return Ok(CompressStatus::NeedsOutput);
                    }
                }
            }
            self.matcher.release_before(self.block.start());

            if !input_done {
                continue;
            }
            if !flushing {
                return Ok(CompressStatus::NeedsInput);
            }
            break;
        }

        match flush {
            FlushMode::Finish => {
                self.block
                    .flush_block(&mut self.writer, self.matcher.window(), true)?;
                self.writer.align_to_byte()?;
                if self.config.output_format() == Format::Zlib {
                    self.writer.write_bytes(&self.adler.finish().to_be_bytes())?;
                }
                self.stage = Stage::Finishing;
                log::debug!(
                    "deflate stream finished: {} bytes in",
                    self.total_in + *consumed as u64
                );

                *produced += self.drain(&mut output[*produced..]);
                if self.has_pending() {
                    return Ok(CompressStatus::NeedsOutput);
                }
                self.stage = Stage::Done;
                Ok(CompressStatus::Done)
            }
            FlushMode::Sync | FlushMode::Full => {
                if !self.synced {
                    if !self.block.is_empty() {
                        self.block
                            .flush_block(&mut self.writer, self.matcher.window(), false)?;
                    }
                    write_sync_marker(&mut self.writer)?;
                    if flush == FlushMode::Full {
                        self.matcher.reset_history();
                    }
                    self.synced = true;
                    log::trace!("{:?} flush at input position {}", flush, self.matcher.position());
                }
                *produced += self.drain(&mut output[*produced..]);
                Ok(self.status())
            }
            FlushMode::None => Ok(self.status()),
        }
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Compressor for Deflater {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        let mut consumed = 0;
        let mut produced = 0;
        let status = self.run(input, output, flush, &mut consumed, &mut produced)?;
        self.total_in += consumed as u64;
        self.total_out += produced as u64;
        Ok((consumed, produced, status))
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.stage == Stage::Done
    }
}

/// Compress data using raw DEFLATE.
pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    Deflater::new(level).compress_to_vec(data)
}
