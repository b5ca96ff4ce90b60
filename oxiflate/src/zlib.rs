//! Zlib format wrapper for DEFLATE compression.
//!
//! The zlib format (RFC 1950) wraps raw DEFLATE data with a header and
//! an Adler-32 checksum.
//!
//! # Format
//!
//! ```text
//! +---+---+=========+============+---+---+---+---+
//! |CMF|FLG| [DICTID]| compressed |    ADLER32    |
//! +---+---+=========+============+---+---+---+---+
//! ```
//!
//! - CMF: Compression Method and Flags
//!   - Bits 0-3: CM (Compression Method) - must be 8 for DEFLATE
//!   - Bits 4-7: CINFO (Compression Info) - log2(window size) - 8
//! - FLG: Flags
//!   - Bits 0-4: FCHECK - check bits so (CMF*256 + FLG) mod 31 == 0
//!   - Bit 5: FDICT - preset dictionary present
//!   - Bits 6-7: FLEVEL - compression level (0-3)
//! - DICTID: Adler-32 of the preset dictionary (big-endian), if FDICT is set
//! - ADLER32: Adler-32 checksum of uncompressed data (big-endian)
//!
//! The header, dictionary and trailer handling itself lives in the
//! [`Deflater`] and [`Inflater`] state machines; [`ZlibEncoder`] and
//! [`ZlibDecoder`] are those machines preconfigured for this format.

use crate::config::{DeflateConfig, Format, MatchStrategy};
use crate::deflate::Deflater;
use crate::inflate::Inflater;
use oxiflate_core::error::{DecodeStage, OxiFlateError, Result};
use oxiflate_core::traits::{CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode};

/// Compression method 8: DEFLATE.
const CM_DEFLATE: u8 = 8;

/// Zlib compression level indicator in header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ZlibLevel {
    /// Fastest compression.
    Fastest = 0,
    /// Fast compression.
    Fast = 1,
    /// Default compression.
    Default = 2,
    /// Maximum compression.
    Maximum = 3,
}

impl ZlibLevel {
    /// Convert from compression level (0-9) to zlib level indicator.
    pub fn from_level(level: u8) -> Self {
        match level {
            0..=1 => Self::Fastest,
            2..=5 => Self::Fast,
            6 => Self::Default,
            _ => Self::Maximum,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Self::Fastest,
            1 => Self::Fast,
            2 => Self::Default,
            _ => Self::Maximum,
        }
    }
}

/// The two-byte zlib stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibHeader {
    /// Window size as a power of two (8-15).
    pub window_bits: u8,
    /// Compression level hint.
    pub level: ZlibLevel,
    /// Whether a preset dictionary identifier follows.
    pub has_dictionary: bool,
}

impl ZlibHeader {
    /// Header for a stream compressed with `window_bits` at `level`.
    pub fn new(window_bits: u8, level: u8) -> Self {
        Self {
            window_bits,
            level: ZlibLevel::from_level(level),
            has_dictionary: false,
        }
    }

    /// Window size in bytes.
    pub fn window_size(&self) -> usize {
        1 << self.window_bits
    }

    /// Encode CMF and FLG.
    pub fn to_bytes(&self) -> [u8; 2] {
        let cmf = ((self.window_bits - 8) << 4) | CM_DEFLATE;
        let flg = ((self.level as u8) << 6) | ((self.has_dictionary as u8) << 5);
        let remainder = (cmf as u16 * 256 + flg as u16) % 31;
        let fcheck = if remainder == 0 { 0 } else { 31 - remainder as u8 };
        [cmf, flg | fcheck]
    }

    /// Parse and validate CMF and FLG.
    pub fn parse(cmf: u8, flg: u8) -> Result<Self> {
        if (cmf as u16 * 256 + flg as u16) % 31 != 0 {
            return Err(OxiFlateError::invalid_header("zlib header check failed"));
        }
        let cm = cmf & 0x0F;
        if cm != CM_DEFLATE {
            return Err(OxiFlateError::invalid_header(format!(
                "unsupported compression method {}",
                cm
            )));
        }
        let cinfo = cmf >> 4;
        if cinfo > 7 {
            return Err(OxiFlateError::invalid_header(format!(
                "window size 2^{} exceeds 32 KB",
                cinfo + 8
            )));
        }
        Ok(Self {
            window_bits: cinfo + 8,
            level: ZlibLevel::from_bits(flg >> 6),
            has_dictionary: flg & 0x20 != 0,
        })
    }
}

/// Streaming zlib compressor.
///
/// A [`Deflater`] configured for [`Format::Zlib`].
#[derive(Debug)]
pub struct ZlibEncoder {
    inner: Deflater,
}

impl ZlibEncoder {
    /// Create a new zlib compressor (level clamped to 9).
    pub fn new(level: u8) -> Self {
        Self {
            inner: Deflater::from_valid_config(DeflateConfig::zlib(level.min(9))),
        }
    }

    /// Create a compressor from a configuration; the format is forced to zlib.
    pub fn with_config(config: DeflateConfig) -> Result<Self> {
        Ok(Self {
            inner: Deflater::with_config(config.format(Format::Zlib))?,
        })
    }

    /// Create a compressor that primes its window with `dictionary`.
    pub fn with_dictionary(level: u8, dictionary: &[u8]) -> Result<Self> {
        let mut encoder = Self::new(level);
        encoder.set_dictionary(dictionary)?;
        Ok(encoder)
    }

    /// Set a preset dictionary. Must be called before any input.
    ///
    /// Returns the dictionary identifier written to the header.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        self.inner.set_dictionary(dictionary)
    }

    /// Change the level and strategy override mid-stream.
    ///
    /// See [`Deflater::set_params`].
    pub fn set_params(&mut self, level: u8, strategy: Option<MatchStrategy>) -> Result<()> {
        self.inner.set_params(level, strategy)
    }

    /// Total input bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.inner.total_in()
    }

    /// Total output bytes produced.
    pub fn total_out(&self) -> u64 {
        self.inner.total_out()
    }
}

impl Compressor for ZlibEncoder {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        self.inner.compress(input, output, flush)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

/// Streaming zlib decompressor.
///
/// An [`Inflater`] configured for [`Format::Zlib`].
#[derive(Debug)]
pub struct ZlibDecoder {
    inner: Inflater,
}

impl ZlibDecoder {
    /// Create a new zlib decompressor.
    pub fn new() -> Self {
        Self {
            inner: Inflater::with_format(Format::Zlib),
        }
    }

    /// Supply the preset dictionary, either up front or after
    /// [`OxiFlateError::NeedDictionary`] was returned.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        self.inner.set_dictionary(dictionary)
    }

    /// Dictionary identifier the stream is waiting for, if any.
    pub fn needs_dictionary(&self) -> Option<u32> {
        self.inner.needs_dictionary()
    }

    /// Skip to the next full flush point; see [`Inflater::sync`].
    pub fn sync(&mut self, input: &[u8]) -> Result<Option<usize>> {
        self.inner.sync(input)
    }

    /// Total input bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.inner.total_in()
    }

    /// Total output bytes produced.
    pub fn total_out(&self) -> u64 {
        self.inner.total_out()
    }
}

impl Default for ZlibDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for ZlibDecoder {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        self.inner.decompress(input, output)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    fn stage(&self) -> DecodeStage {
        self.inner.stage()
    }
}

/// Compress data using zlib format.
///
/// # Example
///
/// ```
/// use oxiflate::zlib::{zlib_compress, zlib_decompress};
///
/// let data = b"Hello, World! Hello, World!";
/// let compressed = zlib_compress(data, 6).unwrap();
/// assert_eq!(&compressed[..2], &[0x78, 0x9C]);
/// let decompressed = zlib_decompress(&compressed).unwrap();
/// assert_eq!(decompressed, data);
/// ```
pub fn zlib_compress(input: &[u8], level: u8) -> Result<Vec<u8>> {
    ZlibEncoder::new(level).compress_all(input)
}

/// Compress data using zlib format with a preset dictionary.
///
/// The dictionary checksum is stored in the header (FDICT=1) so the
/// decompressor knows which dictionary to use.
///
/// # Example
///
/// ```
/// use oxiflate::zlib::{zlib_compress_with_dict, zlib_decompress_with_dict};
///
/// let dict = b"common patterns and shared content";
/// let data = b"This text has common patterns that match the dictionary";
/// let compressed = zlib_compress_with_dict(data, 6, dict).unwrap();
/// let decompressed = zlib_decompress_with_dict(&compressed, dict).unwrap();
/// assert_eq!(decompressed, data);
/// ```
pub fn zlib_compress_with_dict(input: &[u8], level: u8, dictionary: &[u8]) -> Result<Vec<u8>> {
    ZlibEncoder::with_dictionary(level, dictionary)?.compress_all(input)
}

/// Decompress zlib format data.
///
/// Streams that need a preset dictionary fail with
/// [`OxiFlateError::NeedDictionary`].
pub fn zlib_decompress(input: &[u8]) -> Result<Vec<u8>> {
    ZlibDecoder::new().decompress_all(input)
}

/// Decompress zlib format data with a preset dictionary.
///
/// The dictionary identifier in the header must match `dictionary`.
pub fn zlib_decompress_with_dict(input: &[u8], dictionary: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new();
    decoder.set_dictionary(dictionary)?;
    decoder.decompress_all(input)
}

/// Check if zlib data requires a preset dictionary.
///
/// Returns the Adler-32 of the expected dictionary, or `None` if the header
/// is invalid or does not ask for one.
///
/// # Example
///
/// ```
/// use oxiflate::zlib::{zlib_compress_with_dict, zlib_requires_dictionary};
/// use oxiflate_core::Adler32;
///
/// let dict = b"test dictionary";
/// let compressed = zlib_compress_with_dict(b"test data", 6, dict).unwrap();
/// assert_eq!(zlib_requires_dictionary(&compressed), Some(Adler32::checksum(dict)));
/// ```
pub fn zlib_requires_dictionary(input: &[u8]) -> Option<u32> {
    if input.len() < 6 {
        return None;
    }
    let header = ZlibHeader::parse(input[0], input[1]).ok()?;
    header
        .has_dictionary
        .then(|| u32::from_be_bytes([input[2], input[3], input[4], input[5]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiflate_core::Adler32;
    use oxiflate_core::error::ErrorKind;

    #[test]
    fn test_zlib_header() {
        assert_eq!(ZlibHeader::new(15, 6).to_bytes(), [0x78, 0x9C]);
        assert_eq!(ZlibHeader::new(15, 1).to_bytes(), [0x78, 0x01]);
        assert_eq!(ZlibHeader::new(15, 9).to_bytes(), [0x78, 0xDA]);

        for window_bits in 9..=15 {
            for level in 0..=9 {
                let mut header = ZlibHeader::new(window_bits, level);
                header.has_dictionary = level % 2 == 0;
                let [cmf, flg] = header.to_bytes();
                assert_eq!((cmf as u16 * 256 + flg as u16) % 31, 0);
                assert_eq!(ZlibHeader::parse(cmf, flg).unwrap(), header);
            }
        }
    }

    #[test]
    fn test_zlib_level_mapping() {
        let levels: Vec<ZlibLevel> = (0..=9).map(ZlibLevel::from_level).collect();
        assert_eq!(levels[0], ZlibLevel::Fastest);
        assert_eq!(levels[1], ZlibLevel::Fastest);
        assert_eq!(levels[2], ZlibLevel::Fast);
        assert_eq!(levels[5], ZlibLevel::Fast);
        assert_eq!(levels[6], ZlibLevel::Default);
        assert_eq!(levels[7], ZlibLevel::Maximum);
        assert_eq!(levels[9], ZlibLevel::Maximum);
    }

    #[test]
    fn test_zlib_header_rejects() {
        // Check bits wrong.
        assert!(ZlibHeader::parse(0x78, 0x9D).is_err());
        // CM = 7, check bits valid.
        assert!(ZlibHeader::parse(0x77, 0x09).is_err());
        // CINFO = 8, check bits valid.
        assert!(ZlibHeader::parse(0x88, 0x1C).is_err());
    }

    #[test]
    fn test_zlib_roundtrip_simple() {
        let data = b"Hello, World!";
        let compressed = zlib_compress(data, 6).expect("compress failed");
        let decompressed = zlib_decompress(&compressed).expect("decompress failed");
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_zlib_single_byte() {
        let compressed = zlib_compress(b"A", 6).unwrap();
        assert_eq!(
            compressed,
            [0x78, 0x9C, 0x73, 0x04, 0x00, 0x00, 0x42, 0x00, 0x42]
        );
        assert_eq!(zlib_decompress(&compressed).unwrap(), b"A");
    }

    #[test]
    fn test_zlib_roundtrip_empty() {
        let compressed = zlib_compress(b"", 6).expect("compress failed");
        assert_eq!(compressed, [0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
        let decompressed = zlib_decompress(&compressed).expect("decompress failed");
        assert!(decompressed.is_empty());
    }

    #[test]
    fn test_zlib_levels() {
        let data = b"Hello, World! Hello, World! Hello, World!";

        for level in 0..=9 {
            let compressed = zlib_compress(data, level)
                .unwrap_or_else(|_| panic!("level {} compress failed", level));
            assert_eq!(compressed[1] >> 6, ZlibLevel::from_level(level) as u8);
            let decompressed = zlib_decompress(&compressed)
                .unwrap_or_else(|_| panic!("level {} decompress failed", level));
            assert_eq!(&decompressed[..], &data[..]);
        }
    }

    #[test]
    fn test_zlib_trailer_is_adler() {
        let data = b"Wikipedia";
        let compressed = zlib_compress(data, 6).unwrap();
        let trailer = &compressed[compressed.len() - 4..];
        assert_eq!(trailer, &0x11E6_0398u32.to_be_bytes());
    }

    #[test]
    fn test_zlib_checksum_verification() {
        let data = b"Test data for checksum";
        let mut compressed = zlib_compress(data, 6).expect("compress failed");

        let len = compressed.len();
        compressed[len - 1] ^= 0xFF;

        let err = zlib_decompress(&compressed).unwrap_err();
        assert!(matches!(err, OxiFlateError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_zlib_too_short() {
        let err = zlib_decompress(&[0x78, 0x9C]).unwrap_err();
        assert_eq!(err.stage(), Some(DecodeStage::BlockHeader));
    }

    #[test]
    fn test_zlib_dictionary_header() {
        let dictionary = b"test dictionary";
        let compressed = zlib_compress_with_dict(b"test data", 6, dictionary).unwrap();

        assert_eq!(compressed[0], 0x78);
        assert_eq!((compressed[1] >> 5) & 1, 1, "FDICT flag should be set");
        let dict_id = u32::from_be_bytes([compressed[2], compressed[3], compressed[4], compressed[5]]);
        assert_eq!(dict_id, Adler32::checksum(dictionary));
    }

    #[test]
    fn test_zlib_dictionary_roundtrip() {
        let dictionary = b"Hello World common patterns repeating text";
        let data = b"Hello World Hello World repeating text patterns";

        for level in 0..=9 {
            let compressed = zlib_compress_with_dict(data, level, dictionary).unwrap();
            let decompressed = zlib_decompress_with_dict(&compressed, dictionary)
                .unwrap_or_else(|e| panic!("level {} failed: {}", level, e));
            assert_eq!(&decompressed[..], &data[..]);
        }
    }

    #[test]
    fn test_zlib_dictionary_shrinks_output() {
        let dictionary = b"The quick brown fox jumps over the lazy dog";
        let data = b"the lazy dog jumps over the quick brown fox";

        let plain = zlib_compress(data, 9).unwrap();
        let primed = zlib_compress_with_dict(data, 9, dictionary).unwrap();
        assert!(primed.len() < plain.len());
    }

    #[test]
    fn test_zlib_requires_dictionary() {
        let compressed = zlib_compress(b"test data", 6).unwrap();
        assert_eq!(zlib_requires_dictionary(&compressed), None);

        let dictionary = b"test dictionary";
        let compressed = zlib_compress_with_dict(b"test data", 6, dictionary).unwrap();
        assert_eq!(
            zlib_requires_dictionary(&compressed),
            Some(Adler32::checksum(dictionary))
        );

        assert_eq!(zlib_requires_dictionary(&[0x78]), None);
    }

    #[test]
    fn test_zlib_dictionary_errors() {
        let dictionary = b"correct dictionary";
        let compressed = zlib_compress_with_dict(b"test data", 6, dictionary).unwrap();

        let err = zlib_decompress(&compressed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NeedDictionary);

        let err = zlib_decompress_with_dict(&compressed, b"wrong dictionary").unwrap_err();
        assert!(matches!(err, OxiFlateError::DictionaryMismatch { .. }));
    }

    #[test]
    fn test_decoder_supplies_dictionary_on_demand() {
        let dictionary = b"shared vocabulary for every message";
        let data = b"every message uses the shared vocabulary";
        let compressed = zlib_compress_with_dict(data, 6, dictionary).unwrap();

        let mut decoder = ZlibDecoder::new();
        let mut output = vec![0u8; 256];
        let err = decoder.decompress(&compressed, &mut output).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NeedDictionary);
        assert_eq!(decoder.needs_dictionary(), Some(Adler32::checksum(dictionary)));
        assert_eq!(decoder.total_in(), 6);

        decoder.set_dictionary(dictionary).unwrap();
        let (consumed, produced, status) = decoder.decompress(&compressed[6..], &mut output).unwrap();
        assert_eq!(status, DecompressStatus::Done);
        assert_eq!(consumed, compressed.len() - 6);
        assert_eq!(&output[..produced], data);
    }

    #[test]
    fn test_encoder_streaming() {
        let mut encoder = ZlibEncoder::new(6);
        let mut output = vec![0u8; 256];
        let (consumed, first, _) = encoder
            .compress(b"Hello, ", &mut output, FlushMode::None)
            .unwrap();
        assert_eq!(consumed, 7);
        let (_, second, status) = encoder
            .compress(b"World!", &mut output[first..], FlushMode::Finish)
            .unwrap();
        assert_eq!(status, CompressStatus::Done);
        assert!(encoder.is_finished());

        let decompressed = zlib_decompress(&output[..first + second]).unwrap();
        assert_eq!(decompressed, b"Hello, World!");
        assert_eq!(encoder.total_in(), 13);
    }

    #[test]
    fn test_small_window_header() {
        let config = DeflateConfig::new().window_bits(10);
        let mut encoder = ZlibEncoder::with_config(config).unwrap();
        let compressed = encoder.compress_all(&b"window ".repeat(300)).unwrap();
        let header = ZlibHeader::parse(compressed[0], compressed[1]).unwrap();
        assert_eq!(header.window_size(), 1024);
        assert_eq!(zlib_decompress(&compressed).unwrap(), b"window ".repeat(300));
    }
}
