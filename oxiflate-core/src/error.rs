//! Error types for OxiFlate operations.
//!
//! Every failure a compressor or decompressor can report is a variant of
//! [`OxiFlateError`]. Running out of input or output space is *not* an error:
//! that is signalled through [`DecompressStatus`](crate::DecompressStatus)
//! and [`CompressStatus`](crate::CompressStatus).
//!
//! Errors fall into four broad classes, see [`ErrorKind`]:
//!
//! - **data format**: the compressed stream is malformed. Fatal for the stream.
//! - **need dictionary**: a zlib stream asks for a preset dictionary.
//!   Recoverable by supplying one.
//! - **usage**: the API was driven incorrectly (call after finish, bad config).
//! - **I/O**: an underlying reader or writer failed.

use std::fmt;
use std::io;
use thiserror::Error;

/// Where in the stream a data-format error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// The two-byte zlib header.
    ZlibHeader,
    /// The preset dictionary identifier or the dictionary itself.
    Dictionary,
    /// The three-bit block header.
    BlockHeader,
    /// LEN/NLEN of a stored block.
    StoredBlock,
    /// HLIT/HDIST/HCLEN and the transmitted code lengths.
    DynamicHeader,
    /// A literal/length symbol or its extra bits.
    LiteralLength,
    /// A distance symbol, its extra bits, or the resulting back-reference.
    Distance,
    /// The Adler-32 trailer.
    Trailer,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ZlibHeader => "zlib header",
            Self::Dictionary => "dictionary",
            Self::BlockHeader => "block header",
            Self::StoredBlock => "stored block",
            Self::DynamicHeader => "dynamic header",
            Self::LiteralLength => "literal/length",
            Self::Distance => "distance",
            Self::Trailer => "trailer",
        };
        f.write_str(name)
    }
}

/// Broad classification of an [`OxiFlateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The compressed data is malformed.
    DataFormat,
    /// A preset dictionary is required to continue.
    NeedDictionary,
    /// The API was used incorrectly.
    Usage,
    /// An underlying I/O operation failed.
    Io,
}

/// The main error type for OxiFlate operations.
#[derive(Debug, Error)]
pub enum OxiFlateError {
    /// I/O error from underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid zlib header.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Block header with the reserved block type 3.
    #[error("Invalid block type {block_type} at bit position {bit_position}")]
    InvalidBlockType {
        /// The block type found.
        block_type: u8,
        /// Bit position of the block header.
        bit_position: u64,
    },

    /// Stored block whose NLEN is not the complement of LEN.
    #[error("Stored block length mismatch: LEN={len:#06x}, NLEN={nlen:#06x}")]
    StoredLengthMismatch {
        /// LEN field.
        len: u16,
        /// NLEN field.
        nlen: u16,
    },

    /// Bit pattern that does not map to any symbol, or a symbol that is not
    /// allowed at this point.
    #[error("Invalid Huffman code in {stage} at bit position {bit_position}")]
    InvalidHuffmanCode {
        /// Stage in which the code was read.
        stage: DecodeStage,
        /// Bit position where the invalid code was found.
        bit_position: u64,
    },

    /// A set of code lengths that cannot form a usable prefix code.
    #[error("Invalid code lengths in {stage}: {message}")]
    InvalidCodeLengths {
        /// Stage in which the lengths were read.
        stage: DecodeStage,
        /// Description of the problem.
        message: String,
    },

    /// Back-reference pointing before the start of the history.
    #[error("Invalid back-reference distance: {distance} exceeds history size {history_size}")]
    InvalidDistance {
        /// The invalid distance value.
        distance: usize,
        /// Number of bytes available to reference.
        history_size: usize,
    },

    /// Adler-32 checksum mismatch.
    #[error("Checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the stream.
        expected: u32,
        /// Checksum computed over the decoded data.
        computed: u32,
    },

    /// The stream requires a preset dictionary.
    #[error("Preset dictionary required (DICTID {dict_id:#010x})")]
    NeedDictionary {
        /// Adler-32 of the required dictionary.
        dict_id: u32,
    },

    /// The supplied dictionary does not match the one the stream was made with.
    #[error("Dictionary mismatch: stream wants {expected:#010x}, got {actual:#010x}")]
    DictionaryMismatch {
        /// DICTID from the stream header.
        expected: u32,
        /// Adler-32 of the supplied dictionary.
        actual: u32,
    },

    /// The input ended before the stream was complete.
    #[error("Unexpected end of stream in {stage}")]
    UnexpectedEof {
        /// Stage that was waiting for more input.
        stage: DecodeStage,
    },

    /// The API was used incorrectly.
    #[error("Invalid usage: {message}")]
    Usage {
        /// Description of the misuse.
        message: String,
    },
}

/// Result type alias for OxiFlate operations.
pub type Result<T> = std::result::Result<T, OxiFlateError>;

impl OxiFlateError {
    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create an invalid block type error.
    pub fn invalid_block_type(block_type: u8, bit_position: u64) -> Self {
        Self::InvalidBlockType {
            block_type,
            bit_position,
        }
    }

    /// Create a stored block length mismatch error.
    pub fn stored_length_mismatch(len: u16, nlen: u16) -> Self {
        Self::StoredLengthMismatch { len, nlen }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(stage: DecodeStage, bit_position: u64) -> Self {
        Self::InvalidHuffmanCode {
            stage,
            bit_position,
        }
    }

    /// Create an invalid code lengths error.
    pub fn invalid_code_lengths(stage: DecodeStage, message: impl Into<String>) -> Self {
        Self::InvalidCodeLengths {
            stage,
            message: message.into(),
        }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            history_size,
        }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch { expected, computed }
    }

    /// Create a need dictionary error.
    pub fn need_dictionary(dict_id: u32) -> Self {
        Self::NeedDictionary { dict_id }
    }

    /// Create a dictionary mismatch error.
    pub fn dictionary_mismatch(expected: u32, actual: u32) -> Self {
        Self::DictionaryMismatch { expected, actual }
    }

    /// Create an unexpected end of stream error.
    pub fn unexpected_eof(stage: DecodeStage) -> Self {
        Self::UnexpectedEof { stage }
    }

    /// Create a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::NeedDictionary { .. } => ErrorKind::NeedDictionary,
            Self::Usage { .. } => ErrorKind::Usage,
            _ => ErrorKind::DataFormat,
        }
    }

    /// Returns true if the compressed data itself is malformed.
    pub fn is_data_error(&self) -> bool {
        self.kind() == ErrorKind::DataFormat
    }

    /// The stage at which a data-format error was detected, if known.
    pub fn stage(&self) -> Option<DecodeStage> {
        match self {
            Self::InvalidHeader { .. } => Some(DecodeStage::ZlibHeader),
            Self::InvalidBlockType { .. } => Some(DecodeStage::BlockHeader),
            Self::StoredLengthMismatch { .. } => Some(DecodeStage::StoredBlock),
            Self::InvalidHuffmanCode { stage, .. }
            | Self::InvalidCodeLengths { stage, .. }
            | Self::UnexpectedEof { stage } => Some(*stage),
            Self::InvalidDistance { .. } => Some(DecodeStage::Distance),
            Self::ChecksumMismatch { .. } => Some(DecodeStage::Trailer),
            Self::NeedDictionary { .. } | Self::DictionaryMismatch { .. } => {
                Some(DecodeStage::Dictionary)
            }
            Self::Io(_) | Self::Usage { .. } => None,
        }
    }
}

impl From<OxiFlateError> for io::Error {
    fn from(err: OxiFlateError) -> Self {
        match err {
            OxiFlateError::Io(e) => e,
            usage @ OxiFlateError::Usage { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, usage)
            }
            eof @ OxiFlateError::UnexpectedEof { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, eof)
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OxiFlateError::checksum_mismatch(0x12345678, 0xDEADBEEF);
        assert!(err.to_string().contains("Checksum mismatch"));
        assert!(err.to_string().contains("0x12345678"));

        let err = OxiFlateError::invalid_huffman(DecodeStage::Distance, 77);
        assert_eq!(
            err.to_string(),
            "Invalid Huffman code in distance at bit position 77"
        );

        let err = OxiFlateError::invalid_block_type(3, 0);
        assert!(err.to_string().contains("block type 3"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: OxiFlateError = io_err.into();
        assert!(matches!(err, OxiFlateError::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            OxiFlateError::stored_length_mismatch(1, 1).kind(),
            ErrorKind::DataFormat
        );
        assert_eq!(
            OxiFlateError::need_dictionary(1).kind(),
            ErrorKind::NeedDictionary
        );
        assert_eq!(OxiFlateError::usage("done").kind(), ErrorKind::Usage);
        assert!(OxiFlateError::invalid_distance(10, 5).is_data_error());
        assert!(!OxiFlateError::usage("x").is_data_error());
    }

    #[test]
    fn test_error_stage() {
        let err = OxiFlateError::unexpected_eof(DecodeStage::Trailer);
        assert_eq!(err.stage(), Some(DecodeStage::Trailer));
        assert_eq!(
            OxiFlateError::invalid_distance(9, 1).stage(),
            Some(DecodeStage::Distance)
        );
        assert_eq!(OxiFlateError::usage("x").stage(), None);
    }

    #[test]
    fn test_into_io_error() {
        let err: io::Error = OxiFlateError::checksum_mismatch(1, 2).into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err: io::Error = OxiFlateError::unexpected_eof(DecodeStage::BlockHeader).into();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
