//! Compressor configuration.
//!
//! [`DeflateConfig`] collects everything that shapes the compressed output:
//! level, window size, output format, and optional overrides for the block
//! type and match strategy. Level parameters come from a static table with
//! the same shape as zlib's.

use oxiflate_core::CompressionLevel;
use oxiflate_core::error::{OxiFlateError, Result};

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Bare DEFLATE blocks (RFC 1951).
    Raw,
    /// DEFLATE wrapped in a zlib header and Adler-32 trailer (RFC 1950).
    #[default]
    Zlib,
}

/// Which block type the encoder may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockMode {
    /// Pick the cheapest of stored, fixed and dynamic for every block.
    #[default]
    Auto,
    /// Only stored blocks.
    Stored,
    /// Only fixed-Huffman blocks.
    Fixed,
    /// Only dynamic-Huffman blocks.
    Dynamic,
}

/// How the LZ77 stage turns input into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Emit every byte as a literal.
    LiteralsOnly,
    /// Take the longest match at each position.
    Greedy,
    /// Defer a match by one byte when the next position matches longer.
    Lazy,
    /// Lazy parsing that drops matches of five bytes or fewer, for data
    /// such as filtered images where short matches are mostly noise.
    Filtered,
}

/// Match finder tuning for one compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchParams {
    /// Once the previous match is this long, search only a quarter of the chain.
    pub good_length: u16,
    /// Greedy: only insert hashes for matches up to this long.
    /// Lazy: do not look for a better match once this long.
    pub max_lazy: u16,
    /// Stop searching as soon as a match is this long.
    pub nice_length: u16,
    /// Maximum number of chain entries to examine.
    pub max_chain: u16,
    /// Parsing strategy.
    pub strategy: MatchStrategy,
}

const fn params(
    good_length: u16,
    max_lazy: u16,
    nice_length: u16,
    max_chain: u16,
    strategy: MatchStrategy,
) -> MatchParams {
    MatchParams {
        good_length,
        max_lazy,
        nice_length,
        max_chain,
        strategy,
    }
}

/// Parameters for levels 0 through 9.
const LEVEL_TABLE: [MatchParams; 10] = [
    params(0, 0, 0, 0, MatchStrategy::LiteralsOnly), // 0: store only
    params(4, 4, 8, 4, MatchStrategy::Greedy),       // 1: max speed
    params(4, 5, 16, 8, MatchStrategy::Greedy),
    params(4, 6, 32, 32, MatchStrategy::Greedy),
    params(4, 4, 16, 16, MatchStrategy::Lazy), // 4: lazy matches
    params(8, 16, 32, 32, MatchStrategy::Lazy),
    params(8, 16, 128, 128, MatchStrategy::Lazy), // 6: default
    params(8, 32, 128, 256, MatchStrategy::Lazy),
    params(32, 128, 258, 1024, MatchStrategy::Lazy),
    params(32, 258, 258, 4096, MatchStrategy::Lazy), // 9: max compression
];

impl MatchParams {
    /// Parameters for a compression level (clamped to 9).
    pub fn for_level(level: u8) -> Self {
        LEVEL_TABLE[level.min(9) as usize]
    }
}

/// Smallest supported window, as a power of two.
pub const MIN_WINDOW_BITS: u8 = 9;

/// Largest supported window (32 KB).
pub const MAX_WINDOW_BITS: u8 = 15;

/// Compressor configuration.
///
/// ```
/// use oxiflate::config::{BlockMode, DeflateConfig, Format};
///
/// let config = DeflateConfig::new()
///     .level(9)
///     .format(Format::Raw)
///     .block_mode(BlockMode::Dynamic);
/// assert!(config.validate().is_ok());
/// assert!(DeflateConfig::new().window_bits(16).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateConfig {
    level: u8,
    window_bits: u8,
    format: Format,
    block_mode: BlockMode,
    strategy: Option<MatchStrategy>,
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            level: CompressionLevel::DEFAULT.level(),
            window_bits: MAX_WINDOW_BITS,
            format: Format::Zlib,
            block_mode: BlockMode::Auto,
            strategy: None,
        }
    }
}

impl DeflateConfig {
    /// Default configuration: zlib format, level 6, 32 KB window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for raw DEFLATE output at `level`.
    pub fn raw(level: u8) -> Self {
        Self::new().level(level).format(Format::Raw)
    }

    /// Configuration for zlib output at `level`.
    pub fn zlib(level: u8) -> Self {
        Self::new().level(level).format(Format::Zlib)
    }

    /// Set the compression level (0-9).
    pub fn level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    /// Set the window size as a power of two (9-15).
    pub fn window_bits(mut self, window_bits: u8) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Set the output format.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Restrict the block types the encoder may emit.
    pub fn block_mode(mut self, block_mode: BlockMode) -> Self {
        self.block_mode = block_mode;
        self
    }

    /// Override the level's parsing strategy.
    pub fn strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Set or clear the strategy override.
    pub fn match_strategy(mut self, strategy: Option<MatchStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// The strategy override, if any.
    pub fn strategy_override(&self) -> Option<MatchStrategy> {
        self.strategy
    }

    /// Check that every setting is in range.
    pub fn validate(&self) -> Result<()> {
        if self.level > 9 {
            return Err(OxiFlateError::usage(format!(
                "compression level {} out of range 0-9",
                self.level
            )));
        }
        if !(MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&self.window_bits) {
            return Err(OxiFlateError::usage(format!(
                "window bits {} out of range {}-{}",
                self.window_bits, MIN_WINDOW_BITS, MAX_WINDOW_BITS
            )));
        }
        Ok(())
    }

    /// Configured compression level.
    pub fn compression_level(&self) -> u8 {
        self.level
    }

    /// Configured window size as a power of two.
    pub fn window_log(&self) -> u8 {
        self.window_bits
    }

    /// Window size in bytes.
    pub fn window_size(&self) -> usize {
        1 << self.window_bits
    }

    /// Configured output format.
    pub fn output_format(&self) -> Format {
        self.format
    }

    /// Block mode after applying the level: level 0 always stores.
    pub fn effective_block_mode(&self) -> BlockMode {
        match (self.level, self.block_mode) {
            (0, BlockMode::Auto) => BlockMode::Stored,
            (_, mode) => mode,
        }
    }

    /// Match parameters for the level, with the strategy override applied.
    pub fn match_params(&self) -> MatchParams {
        let mut params = MatchParams::for_level(self.level);
        if let Some(strategy) = self.strategy {
            params.strategy = strategy;
            if strategy != MatchStrategy::LiteralsOnly && params.max_chain == 0 {
                params = MatchParams {
                    strategy,
                    ..MatchParams::for_level(1)
                };
            }
        }
        params
    }
}

impl From<CompressionLevel> for DeflateConfig {
    fn from(level: CompressionLevel) -> Self {
        Self::new().level(level.level())
    }
}
