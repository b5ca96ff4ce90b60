//! Sliding window for LZ77 history and output staging.
//!
//! [`SlidingWindow`] is a circular buffer addressed by *absolute* stream
//! positions. It keeps two cursors:
//!
//! - `written`: total bytes ever written (preset dictionary included).
//! - `flushed`: bytes before this position have been released. For the
//!   decompressor that means handed to the caller; for the compressor it
//!   means no longer needed as match history.
//!
//! Bytes between `flushed` and `written` are never overwritten, so the free
//! space is `capacity - (written - flushed)`. Everything that deals with wrap
//! around lives here.
//!
//! # Sizes
//!
//! - Decompression: 32 KB, the largest DEFLATE distance.
//! - Compression: 64 KB, so up to 32 KB of lookahead sits next to 32 KB of
//!   history.

use crate::error::{OxiFlateError, Result};

/// Common window sizes.
pub mod sizes {
    /// Largest back-reference distance allowed by DEFLATE (32 KB).
    pub const MAX_DISTANCE: usize = 32768;
    /// Window used by the decompressor.
    pub const INFLATE: usize = MAX_DISTANCE;
    /// Window used by the compressor (history plus lookahead).
    pub const DEFLATE: usize = 2 * MAX_DISTANCE;
}

/// A circular byte buffer with absolute read and write cursors.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    /// The underlying buffer.
    buffer: Vec<u8>,
    /// Mask for efficient modulo (capacity - 1).
    mask: usize,
    /// Absolute number of bytes written.
    written: u64,
    /// Absolute position of the first unreleased byte.
    flushed: u64,
    /// Back-references may not reach before this position.
    history_start: u64,
    /// Largest distance a back-reference may use.
    max_distance: usize,
}

impl SlidingWindow {
    /// Create a window whose back-references may reach the whole buffer.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of 2.
    pub fn new(capacity: usize) -> Self {
        Self::with_max_distance(capacity, capacity)
    }

    /// Create a window with a back-reference limit below its capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of 2 or `max_distance` exceeds it.
    pub fn with_max_distance(capacity: usize, max_distance: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "Capacity must be a power of 2, got {}",
            capacity
        );
        assert!(max_distance <= capacity, "Distance limit exceeds capacity");

        Self {
            buffer: vec![0; capacity],
            mask: capacity - 1,
            written: 0,
            flushed: 0,
            history_start: 0,
            max_distance,
        }
    }

    /// Window for DEFLATE decompression (32 KB).
    pub fn inflate() -> Self {
        Self::new(sizes::INFLATE)
    }

    /// Get the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Absolute write position.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Absolute position of the first unreleased byte.
    pub fn flushed(&self) -> u64 {
        self.flushed
    }

    /// Bytes written but not yet released.
    pub fn pending(&self) -> usize {
        (self.written - self.flushed) as usize
    }

    /// Bytes that can be written without overwriting unreleased data.
    pub fn free_space(&self) -> usize {
        self.capacity() - self.pending()
    }

    /// Number of bytes a back-reference can currently reach.
    pub fn history_len(&self) -> usize {
        (self.written - self.history_start).min(self.max_distance as u64) as usize
    }

    /// Forget all data.
    pub fn reset(&mut self) {
        self.written = 0;
        self.flushed = 0;
        self.history_start = 0;
    }

    /// Stop back-references from reaching anything written so far.
    ///
    /// Pending bytes stay available to [`flush_into`](Self::flush_into).
    pub fn forget_history(&mut self) {
        self.history_start = self.written;
    }

    /// Write a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        debug_assert!(self.free_space() > 0, "Window overflow");
        self.buffer[self.written as usize & self.mask] = byte;
        self.written += 1;
    }

    /// Write as much of `data` as fits. Returns the number of bytes taken.
    pub fn write_bytes(&mut self, data: &[u8]) -> usize {
        let count = data.len().min(self.free_space());
        let start = self.written as usize & self.mask;
        let first = count.min(self.capacity() - start);
        self.buffer[start..start + first].copy_from_slice(&data[..first]);
        self.buffer[..count - first].copy_from_slice(&data[first..count]);
        self.written += count as u64;
        count
    }

    /// Append `length` bytes copied from `distance` bytes back.
    ///
    /// The source may overlap the destination: distance 1 repeats the last
    /// byte `length` times.
    pub fn copy_from_offset(&mut self, distance: usize, length: usize) -> Result<()> {
        let history = self.history_len();
        if distance == 0 || distance > history {
            return Err(OxiFlateError::invalid_distance(distance, history));
        }
        debug_assert!(length <= self.free_space(), "Window overflow");

        let src = (self.written - distance as u64) as usize & self.mask;
        let dst = self.written as usize & self.mask;
        let capacity = self.capacity();

        if distance >= length && src + length <= capacity && dst + length <= capacity {
            self.buffer.copy_within(src..src + length, dst);
        } else {
            for i in 0..length {
                self.buffer[(dst + i) & self.mask] = self.buffer[(src + i) & self.mask];
            }
        }
        self.written += length as u64;
        Ok(())
    }

    /// Move pending bytes into `out`. Returns the number of bytes moved.
    pub fn flush_into(&mut self, out: &mut [u8]) -> usize {
        let count = self.pending().min(out.len());
        self.copy_range(self.flushed, &mut out[..count]);
        self.flushed += count as u64;
        count
    }

    /// Mark everything before `pos` as released.
    pub fn advance_read(&mut self, pos: u64) {
        debug_assert!(pos <= self.written, "Releasing unwritten bytes");
        if pos > self.flushed {
            self.flushed = pos;
        }
    }

    /// Load a preset dictionary as already released history.
    ///
    /// Only the last `max_distance` bytes can ever be referenced, so only
    /// those are kept.
    pub fn preload_dictionary(&mut self, dictionary: &[u8]) {
        let keep = dictionary.len().min(self.max_distance);
        let dictionary = &dictionary[dictionary.len() - keep..];
        self.flushed = self.written;
        self.write_bytes(dictionary);
        self.flushed = self.written;
    }

    /// Byte at absolute position `pos`.
    #[inline]
    pub fn byte_at(&self, pos: u64) -> u8 {
        self.buffer[pos as usize & self.mask]
    }

    /// Length of the common prefix of the data at `earlier` and `current`,
    /// capped at `max`.
    #[inline]
    pub fn match_length(&self, earlier: u64, current: u64, max: usize) -> usize {
        let a = earlier as usize & self.mask;
        let b = current as usize & self.mask;
        let capacity = self.capacity();

        if a + max <= capacity && b + max <= capacity {
            return self.buffer[a..a + max]
                .iter()
                .zip(&self.buffer[b..b + max])
                .take_while(|(x, y)| x == y)
                .count();
        }

        (0..max)
            .take_while(|&i| self.buffer[(a + i) & self.mask] == self.buffer[(b + i) & self.mask])
            .count()
    }

    /// Copy `out.len()` bytes starting at absolute position `start`.
    pub fn copy_range(&self, start: u64, out: &mut [u8]) {
        let begin = start as usize & self.mask;
        let first = out.len().min(self.capacity() - begin);
        out[..first].copy_from_slice(&self.buffer[begin..begin + first]);
        let rest = out.len() - first;
        out[first..].copy_from_slice(&self.buffer[..rest]);
    }
}
