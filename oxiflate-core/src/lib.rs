//! # OxiFlate Core
//!
//! Core components for the OxiFlate DEFLATE/zlib codec.
//!
//! This crate provides the building blocks the codec is assembled from:
//!
//! - [`bitstream`]: LSB-first bit I/O for Huffman codes and header fields
//! - [`window`]: Sliding window shared by the match finder and the decoder
//! - [`adler`]: Adler-32 checksum for the zlib trailer
//! - [`traits`]: Streaming compressor/decompressor traits and status codes
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Wrapper                                             │
//! │     zlib header, preset dictionary, Adler-32 trailer   │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     LZ77 matcher, Huffman coder, block encoder/decoder │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Primitives (this crate)                             │
//! │     BitReader/BitWriter, SlidingWindow, Adler-32       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::adler::Adler32;
//! use oxiflate_core::window::SlidingWindow;
//!
//! let mut window = SlidingWindow::new(64);
//! window.write_bytes(b"ab");
//! window.copy_from_offset(2, 4).unwrap();
//!
//! let mut out = [0u8; 6];
//! assert_eq!(window.flush_into(&mut out), 6);
//! assert_eq!(&out, b"ababab");
//! assert_eq!(Adler32::checksum(b"abc"), 0x024D0127);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adler;
pub mod bitstream;
pub mod error;
pub mod traits;
pub mod window;

// Re-exports for convenience
pub use adler::Adler32;
pub use bitstream::{BitReader, BitWriter};
pub use error::{DecodeStage, ErrorKind, OxiFlateError, Result};
pub use traits::{
    CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
};
pub use window::SlidingWindow;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adler::Adler32;
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::error::{OxiFlateError, Result};
    pub use crate::traits::{CompressionLevel, Compressor, Decompressor, FlushMode};
    pub use crate::window::SlidingWindow;
}
