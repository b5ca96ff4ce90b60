//! Constant tables for DEFLATE (RFC 1951).
//!
//! Symbol alphabet sizes, length/distance base and extra-bit tables, the
//! order in which code-length code lengths are sent, and the fixed Huffman
//! codes. The fixed codes are built once per process and shared.

use crate::huffman::{CodeTable, HuffmanTree};
use std::sync::OnceLock;

/// End-of-block symbol in the literal/length alphabet.
pub const END_OF_BLOCK: u16 = 256;

/// Literal/length symbols a stream may actually use (0-285).
pub const NUM_LITLEN_SYMBOLS: usize = 286;

/// Size of the fixed literal/length code (286 and 287 are reserved).
pub const NUM_FIXED_LITLEN_SYMBOLS: usize = 288;

/// Distance symbols a stream may actually use (0-29).
pub const NUM_DISTANCE_SYMBOLS: usize = 30;

/// Size of the fixed distance code (30 and 31 are reserved).
pub const NUM_FIXED_DISTANCE_SYMBOLS: usize = 32;

/// Symbols in the code-length alphabet.
pub const NUM_CODE_LENGTH_SYMBOLS: usize = 19;

/// Shortest match DEFLATE can encode.
pub const MIN_MATCH: usize = 3;

/// Longest match DEFLATE can encode.
pub const MAX_MATCH: usize = 258;

/// Fixed literal/length code lengths (RFC 1951 Section 3.2.6).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
pub const FIXED_LITLEN_LENGTHS: [u8; NUM_FIXED_LITLEN_SYMBOLS] = {
    let mut lengths = [8u8; NUM_FIXED_LITLEN_SYMBOLS];
    let mut i = 144;
    while i < 256 {
        lengths[i] = 9;
        i += 1;
    }
    while i < 280 {
        lengths[i] = 7;
        i += 1;
    }
    lengths
};

/// Fixed distance code lengths: all 5 bits.
pub const FIXED_DISTANCE_LENGTHS: [u8; NUM_FIXED_DISTANCE_SYMBOLS] =
    [5u8; NUM_FIXED_DISTANCE_SYMBOLS];

/// Decode table for the fixed literal/length code.
pub fn fixed_litlen_tree() -> &'static HuffmanTree {
    static TREE: OnceLock<HuffmanTree> = OnceLock::new();
    TREE.get_or_init(|| HuffmanTree::from_valid_lengths(&FIXED_LITLEN_LENGTHS))
}

/// Decode table for the fixed distance code.
pub fn fixed_distance_tree() -> &'static HuffmanTree {
    static TREE: OnceLock<HuffmanTree> = OnceLock::new();
    TREE.get_or_init(|| HuffmanTree::from_valid_lengths(&FIXED_DISTANCE_LENGTHS))
}

/// Encode table for the fixed literal/length code.
pub fn fixed_litlen_codes() -> &'static CodeTable {
    static CODES: OnceLock<CodeTable> = OnceLock::new();
    CODES.get_or_init(|| CodeTable::from_lengths(&FIXED_LITLEN_LENGTHS))
}

/// Encode table for the fixed distance code.
pub fn fixed_distance_codes() -> &'static CodeTable {
    static CODES: OnceLock<CodeTable> = OnceLock::new();
    CODES.get_or_init(|| CodeTable::from_lengths(&FIXED_DISTANCE_LENGTHS))
}

/// Length code base values (RFC 1951 Section 3.2.5).
///
/// For length codes 257-285, this gives the base length value.
/// Extra bits are added to get the final length.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264: 0 extra bits
    11, 13, 15, 17, // 265-268: 1 extra bit
    19, 23, 27, 31, // 269-272: 2 extra bits
    35, 43, 51, 59, // 273-276: 3 extra bits
    67, 83, 99, 115, // 277-280: 4 extra bits
    131, 163, 195, 227, // 281-284: 5 extra bits
    258, // 285: 0 extra bits (special case)
];

/// Number of extra bits for length codes 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, // 257-264
    1, 1, 1, 1, // 265-268
    2, 2, 2, 2, // 269-272
    3, 3, 3, 3, // 273-276
    4, 4, 4, 4, // 277-280
    5, 5, 5, 5, // 281-284
    0, // 285
];

/// Distance code base values (RFC 1951 Section 3.2.5).
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, // 0-3: 0 extra bits
    5, 7, // 4-5: 1 extra bit
    9, 13, // 6-7: 2 extra bits
    17, 25, // 8-9: 3 extra bits
    33, 49, // 10-11: 4 extra bits
    65, 97, // 12-13: 5 extra bits
    129, 193, // 14-15: 6 extra bits
    257, 385, // 16-17: 7 extra bits
    513, 769, // 18-19: 8 extra bits
    1025, 1537, // 20-21: 9 extra bits
    2049, 3073, // 22-23: 10 extra bits
    4097, 6145, // 24-25: 11 extra bits
    8193, 12289, // 26-27: 12 extra bits
    16385, 24577, // 28-29: 13 extra bits
];

/// Number of extra bits for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Order of code length codes in dynamic block header.
///
/// Code length codes are transmitted in this order (RFC 1951 Section 3.2.7).
pub const CODE_LENGTH_ORDER: [usize; NUM_CODE_LENGTH_SYMBOLS] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// `length - 3` to `code - 257`.
const LENGTH_CODE: [u8; 256] = {
    let mut lut = [0u8; 256];
    let mut code = 0;
    while code < 29 {
        let base = LENGTH_BASE[code] as usize;
        let mut i = 0;
        while i < (1 << LENGTH_EXTRA_BITS[code]) {
            lut[base + i - MIN_MATCH] = code as u8;
            i += 1;
        }
        code += 1;
    }
    lut
};

/// `distance - 1` to code for the first 256 entries; `256 + ((distance - 1) >> 7)`
/// for longer distances.
const DISTANCE_CODE: [u8; 512] = {
    let mut lut = [0u8; 512];
    let mut code = 0;
    while code < 30 {
        let base = DISTANCE_BASE[code] as usize;
        let mut i = 0;
        while i < (1 << DISTANCE_EXTRA_BITS[code]) {
            let d = base + i - 1;
            if d < 256 {
                lut[d] = code as u8;
            } else {
                lut[256 + (d >> 7)] = code as u8;
            }
            i += 1;
        }
        code += 1;
    }
    lut
};

/// Convert a length value (3-258) to `(code, extra_bits, extra_value)`.
#[inline]
pub fn length_to_code(length: u16) -> (u16, u8, u16) {
    debug_assert!(
        (3..=258).contains(&length),
        "Length out of range: {}",
        length
    );
    let index = LENGTH_CODE[length as usize - MIN_MATCH] as usize;
    (
        index as u16 + 257,
        LENGTH_EXTRA_BITS[index],
        length - LENGTH_BASE[index],
    )
}

/// Convert a distance value (1-32768) to `(code, extra_bits, extra_value)`.
#[inline]
pub fn distance_to_code(distance: u16) -> (u16, u8, u16) {
    debug_assert!(
        (1..=32768).contains(&distance),
        "Distance out of range: {}",
        distance
    );
    let d = distance as usize - 1;
    let code = if d < 256 {
        DISTANCE_CODE[d] as usize
    } else {
        DISTANCE_CODE[256 + (d >> 7)] as usize
    };
    (
        code as u16,
        DISTANCE_EXTRA_BITS[code],
        distance - DISTANCE_BASE[code],
    )
}

/// Decode a length from a length code and extra bits.
pub fn decode_length(code: u16, extra: u16) -> u16 {
    debug_assert!((257..=285).contains(&code), "Invalid length code: {}", code);
    LENGTH_BASE[(code - 257) as usize] + extra
}

/// Decode a distance from a distance code and extra bits.
pub fn decode_distance(code: u16, extra: u16) -> u16 {
    debug_assert!(code < 30, "Invalid distance code: {}", code);
    DISTANCE_BASE[code as usize] + extra
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_litlen_lengths() {
        let lengths = FIXED_LITLEN_LENGTHS;

        assert_eq!(lengths[0], 8);
        assert_eq!(lengths[143], 8);
        assert_eq!(lengths[144], 9);
        assert_eq!(lengths[255], 9);
        assert_eq!(lengths[256], 7); // End of block
        assert_eq!(lengths[279], 7);
        assert_eq!(lengths[280], 8);
        assert_eq!(lengths[287], 8);
    }

    #[test]
    fn test_fixed_codes() {
        let codes = fixed_litlen_codes();
        // End of block is seven zero bits.
        assert_eq!(codes.length(256), 7);
        assert_eq!(codes.code(256), 0);
        // 'A' (65) is 0x30 + 65 = 0x71 over 8 bits, sent bit-reversed.
        assert_eq!(codes.length(65), 8);
        assert_eq!(codes.code(65), 0b1000_1110);

        assert_eq!(fixed_distance_codes().length(29), 5);
        assert_eq!(fixed_litlen_tree().max_length(), 9);
        assert_eq!(fixed_distance_tree().max_length(), 5);
    }

    #[test]
    fn test_length_to_code_roundtrip() {
        for length in 3..=258 {
            let (code, extra_bits, extra_value) = length_to_code(length);
            assert!(u32::from(extra_value) < (1u32 << extra_bits));
            assert_eq!(
                decode_length(code, extra_value),
                length,
                "Roundtrip failed for length {}: code={}, extra_bits={}, extra_value={}",
                length,
                code,
                extra_bits,
                extra_value
            );
        }
    }

    #[test]
    fn test_distance_to_code_roundtrip() {
        for distance in 1..=32768u16 {
            let (code, extra_bits, extra_value) = distance_to_code(distance);
            assert!(u32::from(extra_value) < (1u32 << extra_bits));
            assert_eq!(
                decode_distance(code, extra_value),
                distance,
                "Roundtrip failed for distance {}: code={}",
                distance,
                code
            );
        }
    }

    #[test]
    fn test_specific_lengths() {
        assert_eq!(length_to_code(3), (257, 0, 0));
        assert_eq!(length_to_code(10), (264, 0, 0));
        assert_eq!(length_to_code(11), (265, 1, 0));
        assert_eq!(length_to_code(12), (265, 1, 1));
        assert_eq!(length_to_code(257), (284, 5, 30));
        assert_eq!(length_to_code(258), (285, 0, 0));
    }

    #[test]
    fn test_specific_distances() {
        assert_eq!(distance_to_code(1), (0, 0, 0));
        assert_eq!(distance_to_code(4), (3, 0, 0));
        assert_eq!(distance_to_code(5), (4, 1, 0));
        assert_eq!(distance_to_code(6), (4, 1, 1));
        assert_eq!(distance_to_code(256), (15, 6, 63));
        assert_eq!(distance_to_code(257), (16, 7, 0));
        assert_eq!(distance_to_code(32768), (29, 13, 8191));
    }
}
