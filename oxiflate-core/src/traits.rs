//! Core traits for streaming compression.
//!
//! Both directions are driven the same way: the caller hands over an input
//! slice and an output slice, the codec reports how much of each it used and
//! why it stopped. Running out of input or output space is reported through
//! the status, never as an error.

use crate::error::{DecodeStage, OxiFlateError, Result};

/// Status of a streaming decompression operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressStatus {
    /// More input is needed to continue decompression.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// Decompression is complete.
    Done,
}

/// Status of a streaming compression operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// More input data can be accepted.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// Compression is complete.
    Done,
}

/// Flush mode for compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// No flush - buffer data for best compression.
    #[default]
    None,
    /// Sync flush - emit all pending output and align to a byte boundary.
    Sync,
    /// Full flush - sync, then forget history.
    Full,
    /// Finish - complete the stream.
    Finish,
}

/// A streaming decompressor (decoder).
pub trait Decompressor {
    /// Decompress data from input to output.
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, status)
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)>;

    /// Reset the decompressor to its initial state.
    fn reset(&mut self);

    /// Check if the decompressor has finished.
    fn is_finished(&self) -> bool;

    /// The part of the stream the decompressor is currently waiting in.
    fn stage(&self) -> DecodeStage;

    /// Decompress a complete stream held in memory.
    ///
    /// Input that ends before the stream does is an error here, unlike in
    /// [`decompress`](Self::decompress).
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, status) = self.decompress(&input[input_pos..], &mut buffer)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match status {
                DecompressStatus::Done => break,
                DecompressStatus::NeedsInput if input_pos >= input.len() => {
                    return Err(OxiFlateError::unexpected_eof(self.stage()));
                }
                DecompressStatus::NeedsInput | DecompressStatus::NeedsOutput => continue,
            }
        }

        Ok(output)
    }
}

/// A streaming compressor (encoder).
pub trait Compressor {
    /// Compress data from input to output.
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, status)
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)>;

    /// Reset the compressor to its initial state.
    fn reset(&mut self);

    /// Check if the compressor has finished.
    fn is_finished(&self) -> bool;

    /// Compress all data at once (convenience method).
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, status) =
                self.compress(&input[input_pos..], &mut buffer, FlushMode::Finish)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            if status == CompressStatus::Done {
                break;
            }
            if consumed == 0 && produced == 0 {
                return Err(OxiFlateError::usage("compressor made no progress"));
            }
        }

        Ok(output)
    }
}

/// Compression level for algorithms that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// No compression (store only).
    pub const NONE: Self = Self(0);
    /// Fastest compression.
    pub const FAST: Self = Self(1);
    /// Default compression (balanced).
    pub const DEFAULT: Self = Self(6);
    /// Best compression (slowest).
    pub const BEST: Self = Self(9);

    /// Create a custom compression level (0-9).
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for CompressionLevel {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}
