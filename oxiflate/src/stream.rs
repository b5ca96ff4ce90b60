//! `std::io` adapters.
//!
//! [`DeflateWriter`] compresses everything written to it into an inner
//! writer; [`InflateReader`] decompresses an inner reader. Both work for
//! raw DEFLATE and zlib streams.

use crate::config::{DeflateConfig, Format};
use crate::deflate::Deflater;
use crate::inflate::Inflater;
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{
    CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode,
};
use std::io::{self, Read, Write};

const BUFFER_SIZE: usize = 32 * 1024;

/// A writer that compresses data before passing it on.
///
/// Call [`finish`](Self::finish) to write the end of the stream and get the
/// inner writer back. Dropping an unfinished writer finishes the stream on a
/// best-effort basis, ignoring errors.
///
/// ```
/// use oxiflate::stream::DeflateWriter;
/// use oxiflate::zlib::zlib_decompress;
/// use std::io::Write;
///
/// let mut writer = DeflateWriter::zlib(Vec::new(), 6);
/// writer.write_all(b"streamed through a writer").unwrap();
/// let compressed = writer.finish().unwrap();
/// assert_eq!(zlib_decompress(&compressed).unwrap(), b"streamed through a writer");
/// ```
#[derive(Debug)]
pub struct DeflateWriter<W: Write> {
    inner: Option<W>,
    deflater: Deflater,
    buffer: Vec<u8>,
}

impl<W: Write> DeflateWriter<W> {
    /// Compress raw DEFLATE into `writer`.
    pub fn new(writer: W, level: u8) -> Self {
        Self::from_deflater(writer, Deflater::new(level))
    }

    /// Compress a zlib stream into `writer`.
    pub fn zlib(writer: W, level: u8) -> Self {
        Self::from_deflater(
            writer,
            Deflater::from_valid_config(DeflateConfig::zlib(level.min(9))),
        )
    }

    /// Compress into `writer` with a full configuration.
    pub fn with_config(writer: W, config: DeflateConfig) -> Result<Self> {
        Ok(Self::from_deflater(writer, Deflater::with_config(config)?))
    }

    fn from_deflater(writer: W, deflater: Deflater) -> Self {
        Self {
            inner: Some(writer),
            deflater,
            buffer: vec![0; BUFFER_SIZE],
        }
    }

    /// Reference to the inner writer.
    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    /// Mutable reference to the inner writer.
    ///
    /// Writing to it directly corrupts the compressed stream.
    pub fn get_mut(&mut self) -> Option<&mut W> {
        self.inner.as_mut()
    }

    /// Total uncompressed bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.deflater.total_in()
    }

    /// Total compressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.deflater.total_out()
    }

    /// Feed `input` through the compressor until it is all consumed and, for
    /// a flush, until no more output is pending.
    fn pump(&mut self, mut input: &[u8], flush: FlushMode) -> io::Result<()> {
        let Some(writer) = self.inner.as_mut() else {
            return Err(OxiFlateError::usage("writer already finished").into());
        };
        loop {
            let (consumed, produced, status) =
                self.deflater.compress(input, &mut self.buffer, flush)?;
            writer.write_all(&self.buffer[..produced])?;
            input = &input[consumed..];

            match status {
                CompressStatus::Done => return Ok(()),
                CompressStatus::NeedsOutput => continue,
                CompressStatus::NeedsInput if input.is_empty() => return Ok(()),
                CompressStatus::NeedsInput => continue,
            }
        }
    }

    /// Write the end of the stream and return the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.pump(&[], FlushMode::Finish)?;
        let mut writer = self
            .inner
            .take()
            .ok_or_else(|| io::Error::from(OxiFlateError::usage("writer already finished")))?;
        writer.flush()?;
        Ok(writer)
    }
}

impl<W: Write> Write for DeflateWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pump(buf, FlushMode::None)?;
        Ok(buf.len())
    }

    /// Sync-flush the compressor, then flush the inner writer.
    fn flush(&mut self) -> io::Result<()> {
        self.pump(&[], FlushMode::Sync)?;
        match self.inner.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for DeflateWriter<W> {
    fn drop(&mut self) {
        if self.inner.is_some() && !self.deflater.is_finished() {
            let _ = self.pump(&[], FlushMode::Finish);
        }
    }
}

/// A reader that decompresses data from an inner reader.
///
/// Input is read in blocks, so bytes after the end of the compressed stream
/// may be pulled from the inner reader and dropped.
///
/// ```
/// use oxiflate::deflate::deflate;
/// use oxiflate::stream::InflateReader;
/// use std::io::Read;
///
/// let compressed = deflate(b"read it back", 6).unwrap();
/// let mut reader = InflateReader::new(&compressed[..]);
/// let mut text = String::new();
/// reader.read_to_string(&mut text).unwrap();
/// assert_eq!(text, "read it back");
/// ```
#[derive(Debug)]
pub struct InflateReader<R: Read> {
    inner: R,
    inflater: Inflater,
    buffer: Vec<u8>,
    pos: usize,
    end: usize,
    eof: bool,
}

impl<R: Read> InflateReader<R> {
    /// Decompress raw DEFLATE from `reader`.
    pub fn new(reader: R) -> Self {
        Self::with_inflater(reader, Inflater::new())
    }

    /// Decompress a zlib stream from `reader`.
    pub fn zlib(reader: R) -> Self {
        Self::with_inflater(reader, Inflater::with_format(Format::Zlib))
    }

    /// Decompress from `reader` with a prepared [`Inflater`], for example
    /// one holding a preset dictionary.
    pub fn with_inflater(reader: R, inflater: Inflater) -> Self {
        Self {
            inner: reader,
            inflater,
            buffer: vec![0; BUFFER_SIZE],
            pos: 0,
            end: 0,
            eof: false,
        }
    }

    /// Reference to the inner reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// The decompressor, e.g. to inspect totals or supply a dictionary.
    pub fn inflater_mut(&mut self) -> &mut Inflater {
        &mut self.inflater
    }

    /// Return the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for InflateReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.inflater.is_finished() {
            return Ok(0);
        }

        loop {
            if self.pos == self.end && !self.eof {
                self.end = self.inner.read(&mut self.buffer)?;
                self.pos = 0;
                self.eof = self.end == 0;
            }

            let (consumed, produced, status) = self
                .inflater
                .decompress(&self.buffer[self.pos..self.end], buf)?;
            self.pos += consumed;

            match status {
                DecompressStatus::Done => return Ok(produced),
                _ if produced > 0 => return Ok(produced),
                DecompressStatus::NeedsInput if self.eof && self.pos == self.end => {
                    let stage = self.inflater.stage();
                    return Err(OxiFlateError::unexpected_eof(stage).into());
                }
                _ => {}
            }
        }
    }
}
