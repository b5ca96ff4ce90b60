//! # OxiFlate
//!
//! Pure Rust streaming implementation of DEFLATE (RFC 1951) and the zlib
//! wrapper (RFC 1950).
//!
//! ## Features
//!
//! - **Decompression**: all DEFLATE block types, resumable at any byte
//!   boundary of input and output
//!   - Stored (uncompressed) blocks
//!   - Fixed Huffman codes
//!   - Dynamic Huffman codes
//! - **Compression**: LZ77 hash chains + Huffman coding
//!   - Levels 0-9 with zlib-style greedy and lazy matching
//!   - Per-block choice of stored, fixed or dynamic encoding
//!   - Sync and full flushes
//! - **zlib**: header, Adler-32 trailer and preset dictionaries
//! - **I/O**: [`DeflateWriter`] and [`InflateReader`] adapters
//!
//! ## Example
//!
//! ```rust
//! use oxiflate::{deflate, inflate, zlib_compress, zlib_decompress};
//!
//! let original = b"Hello, World! Hello, World!";
//!
//! let compressed = deflate(original, 6).unwrap();
//! assert_eq!(inflate(&compressed).unwrap(), original);
//!
//! let wrapped = zlib_compress(original, 9).unwrap();
//! assert_eq!(zlib_decompress(&wrapped).unwrap(), original);
//! ```
//!
//! ## Streaming
//!
//! ```rust
//! use oxiflate::Inflater;
//! use oxiflate_core::{DecompressStatus, Decompressor};
//!
//! let compressed = oxiflate::deflate(&[b'x'; 10_000], 6).unwrap();
//! let mut inflater = Inflater::new();
//! let mut total = 0;
//! let mut out = [0u8; 1024];
//! let mut input = &compressed[..];
//! loop {
//!     let (used, produced, status) = inflater.decompress(input, &mut out).unwrap();
//!     input = &input[used..];
//!     total += produced;
//!     if status == DecompressStatus::Done {
//!         break;
//!     }
//! }
//! assert_eq!(total, 10_000);
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: No compression (stored blocks)
//! - Level 1-3: Greedy matching
//! - Level 4-9: Lazy matching (default is 6)
//!
//! [`MatchStrategy`] overrides the level's parsing, e.g. `Filtered` for data
//! where short matches do not pay off. [`Deflater::set_params`] changes level
//! and strategy mid-stream, and [`Inflater::sync`] resumes decoding at the
//! next full flush point.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod config;
pub mod deflate;
pub mod huffman;
pub mod inflate;
pub mod lz77;
pub mod stream;
pub mod tables;
pub mod zlib;

// Re-exports
pub use config::{BlockMode, DeflateConfig, Format, MatchStrategy};
pub use deflate::{Deflater, deflate};
pub use huffman::{HuffmanBuilder, HuffmanTree};
pub use inflate::{Inflater, inflate};
pub use lz77::{Lz77Matcher, Lz77Token};
pub use oxiflate_core::{
    Adler32, CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode,
    OxiFlateError, Result,
};
pub use stream::{DeflateWriter, InflateReader};
pub use zlib::{
    ZlibDecoder, ZlibEncoder, zlib_compress, zlib_compress_with_dict, zlib_decompress,
    zlib_decompress_with_dict, zlib_requires_dictionary,
};
