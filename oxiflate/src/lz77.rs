//! LZ77 match finding for DEFLATE.
//!
//! [`Lz77Matcher`] keeps the input in a [`SlidingWindow`] and indexes every
//! position by a hash of its next three bytes. `head` maps a hash to the most
//! recent position with that hash and `prev` links each position to the one
//! before it, forming a chain that the match search walks newest first.
//! Stale chain entries are never pruned; a candidate is only used while it
//! lies within the window distance and the chain keeps moving backwards.
//!
//! # Parsing
//!
//! - [`MatchStrategy::LiteralsOnly`]: every byte is a literal.
//! - [`MatchStrategy::Greedy`]: take the longest match at each position.
//! - [`MatchStrategy::Lazy`]: before committing to a match, look one byte
//!   ahead and emit a literal instead if the next position matches longer.
//! - [`MatchStrategy::Filtered`]: lazy, but matches of five bytes or fewer
//!   are not used at all.

use crate::config::{MatchParams, MatchStrategy};
use crate::tables::{MAX_MATCH, MIN_MATCH};
use oxiflate_core::window::{SlidingWindow, sizes};

/// Size of the hash table (power of 2).
const HASH_SIZE: usize = 1 << 15;

/// Hash mask.
const HASH_MASK: usize = HASH_SIZE - 1;

/// Mask for chain links; one slot per position of the largest window.
const CHAIN_MASK: usize = sizes::MAX_DISTANCE - 1;

/// Lookahead needed to be sure a maximal match fits before the data ends.
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Three-byte matches further away than this cost more than three literals.
const TOO_FAR: usize = 4096;

/// Longest match the filtered strategy still rejects.
const FILTERED_MAX_REJECT: usize = 5;

/// A token produced by LZ77 parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lz77Token {
    /// A literal byte.
    Literal(u8),
    /// A back-reference to previously seen data.
    Match {
        /// Number of bytes to copy (3-258).
        length: u16,
        /// Distance back into the window (1-32768).
        distance: u16,
    },
}

impl Lz77Token {
    /// Number of input bytes this token covers.
    #[inline]
    pub fn covered_bytes(&self) -> usize {
        match self {
            Self::Literal(_) => 1,
            Self::Match { length, .. } => *length as usize,
        }
    }
}

/// Hash-chain LZ77 match finder with a streaming window.
#[derive(Debug, Clone)]
pub struct Lz77Matcher {
    /// History plus lookahead.
    window: SlidingWindow,
    /// Hash -> most recent position + 1 (0 = none).
    head: Vec<u64>,
    /// Position -> previous position with the same hash, + 1.
    prev: Vec<u64>,
    /// Level tuning.
    params: MatchParams,
    /// Largest distance a match may use.
    window_size: usize,
    /// Next position to parse.
    pos: u64,
    /// Lazy parsing: match found at `pos - 1`, waiting for the next position.
    pending: Option<(usize, usize)>,
    /// Lazy parsing: the byte at `pos - 1` has not been emitted yet.
    literal_pending: bool,
}

impl Lz77Matcher {
    /// Create a matcher for the given parameters and window size.
    pub fn new(params: MatchParams, window_size: usize) -> Self {
        let window_size = window_size.min(sizes::MAX_DISTANCE);
        Self {
            window: SlidingWindow::with_max_distance(sizes::DEFLATE, window_size),
            head: vec![0; HASH_SIZE],
            prev: vec![0; sizes::MAX_DISTANCE],
            params,
            window_size,
            pos: 0,
            pending: None,
            literal_pending: false,
        }
    }

    /// Create a matcher for a compression level with a 32 KB window.
    pub fn with_level(level: u8) -> Self {
        Self::new(MatchParams::for_level(level), sizes::MAX_DISTANCE)
    }

    /// Forget all input and history.
    pub fn reset(&mut self) {
        self.window.reset();
        self.head.fill(0);
        self.pos = 0;
        self.pending = None;
        self.literal_pending = false;
    }

    /// Switch to new tuning or strategy.
    ///
    /// Must only be called once every buffered byte has been parsed.
    pub fn set_params(&mut self, params: MatchParams) {
        debug_assert!(
            self.lookahead() == 0 && !self.literal_pending,
            "Unparsed input while changing parameters"
        );
        self.params = params;
    }

    /// Forget history so later matches cannot reach data before this point.
    ///
    /// Must only be called once every parsed byte has been emitted.
    pub fn reset_history(&mut self) {
        debug_assert!(!self.literal_pending, "Lazy literal still pending");
        self.head.fill(0);
    }

    /// The underlying window.
    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    /// Absolute position of the next unparsed byte.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Bytes buffered but not yet parsed.
    pub fn lookahead(&self) -> usize {
        (self.window.written() - self.pos) as usize
    }

    /// Room for more input.
    pub fn free_space(&self) -> usize {
        self.window.free_space()
    }

    /// Copy as much of `input` into the window as fits.
    pub fn fill(&mut self, input: &[u8]) -> usize {
        self.window.write_bytes(input)
    }

    /// Let the window reuse space before `keep_from`, but never history that
    /// a match at the current position could still reach.
    pub fn release_before(&mut self, keep_from: u64) {
        let history_start = self.pos.saturating_sub(self.window_size as u64 + 1);
        self.window.advance_read(keep_from.min(history_start));
    }

    /// Preload a preset dictionary as history. Must be called before any input.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) {
        let keep = dictionary.len().min(self.window_size);
        self.window.write_bytes(&dictionary[dictionary.len() - keep..]);
        let start = self.pos;
        self.pos = self.window.written();
        let mut p = start;
        while p + MIN_MATCH as u64 <= self.pos {
            self.insert(p);
            p += 1;
        }
    }

    #[inline(always)]
    fn hash(b0: u8, b1: u8, b2: u8) -> usize {
        (((b0 as usize) << 10) ^ ((b1 as usize) << 5) ^ (b2 as usize)) & HASH_MASK
    }

    /// Index position `p` and return the previous head of its chain.
    #[inline]
    fn insert(&mut self, p: u64) -> Option<u64> {
        let h = Self::hash(
            self.window.byte_at(p),
            self.window.byte_at(p + 1),
            self.window.byte_at(p + 2),
        );
        let previous = self.head[h];
        self.prev[p as usize & CHAIN_MASK] = previous;
        self.head[h] = p + 1;
        previous.checked_sub(1)
    }

    /// Index every position in `from..to` that has three bytes available.
    fn insert_range(&mut self, from: u64, to: u64) {
        let limit = self.window.written().saturating_sub(MIN_MATCH as u64 - 1);
        for p in from..to.min(limit) {
            self.insert(p);
        }
    }

    /// Longest match for position `p` starting from chain entry `candidate`.
    ///
    /// Only matches longer than `prev_length` are reported. Returns
    /// `(length, distance)`.
    fn longest_match(
        &self,
        p: u64,
        mut candidate: u64,
        prev_length: usize,
        max_len: usize,
    ) -> Option<(usize, usize)> {
        let mut chain = self.params.max_chain as usize;
        if prev_length >= self.params.good_length as usize {
            chain >>= 2;
        }
        let nice = (self.params.nice_length as usize).min(max_len);
        let limit = p.saturating_sub(self.window_size as u64);

        let mut best_len = prev_length;
        let mut best_dist = 0;

        while chain > 0 && candidate >= limit && candidate < p {
            let quick_reject = best_len > 0
                && best_len < max_len
                && self.window.byte_at(candidate + best_len as u64)
                    != self.window.byte_at(p + best_len as u64);

            if !quick_reject {
                let len = self.window.match_length(candidate, p, max_len);
                if len > best_len {
                    best_len = len;
                    best_dist = (p - candidate) as usize;
                    if len >= nice {
                        break;
                    }
                }
            }

            chain -= 1;
            match self.prev[candidate as usize & CHAIN_MASK].checked_sub(1) {
                Some(next) if next < candidate => candidate = next,
                _ => break,
            }
        }

        if best_dist == 0
            || best_len < MIN_MATCH
            || (best_len == MIN_MATCH && best_dist > TOO_FAR)
            || (self.params.strategy == MatchStrategy::Filtered
                && best_len <= FILTERED_MAX_REJECT)
        {
            return None;
        }
        Some((best_len, best_dist))
    }

    /// Find a match at `pos` after indexing it.
    fn search(&mut self, prev_length: usize, lookahead: usize) -> Option<(usize, usize)> {
        if lookahead < MIN_MATCH {
            return None;
        }
        let candidate = self.insert(self.pos)?;
        self.longest_match(self.pos, candidate, prev_length, lookahead.min(MAX_MATCH))
    }

    /// Produce the next token.
    ///
    /// Returns `None` when more input is needed: while fewer than
    /// [`MIN_LOOKAHEAD`] bytes are buffered, unless `flush` says no more
    /// input is coming for now, in which case all buffered bytes are parsed.
    pub fn next_token(&mut self, flush: bool) -> Option<Lz77Token> {
        loop {
            let lookahead = self.lookahead();
            if lookahead < MIN_LOOKAHEAD && !flush {
                return None;
            }
            if lookahead == 0 {
                if self.literal_pending {
                    self.literal_pending = false;
                    self.pending = None;
                    return Some(Lz77Token::Literal(self.window.byte_at(self.pos - 1)));
                }
                return None;
            }

            match self.params.strategy {
                MatchStrategy::LiteralsOnly => {
                    let byte = self.window.byte_at(self.pos);
                    self.pos += 1;
                    return Some(Lz77Token::Literal(byte));
                }
                MatchStrategy::Greedy => return Some(self.greedy_step(lookahead)),
                MatchStrategy::Lazy | MatchStrategy::Filtered => {
                    if let Some(token) = self.lazy_step(lookahead) {
                        return Some(token);
                    }
                }
            }
        }
    }

    fn greedy_step(&mut self, lookahead: usize) -> Lz77Token {
        let start = self.pos;
        match self.search(MIN_MATCH - 1, lookahead) {
            Some((length, distance)) => {
                if length <= self.params.max_lazy as usize {
                    self.insert_range(start + 1, start + length as u64);
                }
                self.pos += length as u64;
                Lz77Token::Match {
                    length: length as u16,
                    distance: distance as u16,
                }
            }
            None => {
                self.pos += 1;
                Lz77Token::Literal(self.window.byte_at(start))
            }
        }
    }

    fn lazy_step(&mut self, lookahead: usize) -> Option<Lz77Token> {
        let prev = self.pending.take();
        let prev_length = prev.map_or(MIN_MATCH - 1, |(length, _)| length);

        let current = if prev_length < self.params.max_lazy as usize {
            self.search(prev_length, lookahead)
        } else {
            if lookahead >= MIN_MATCH {
                self.insert(self.pos);
            }
            None
        };

        if let Some((length, distance)) = prev {
            // `current` is only reported when strictly longer than `prev`.
            if current.is_none() {
                // The previous match starts at pos - 1 and wins.
                let match_start = self.pos - 1;
                self.insert_range(self.pos + 1, match_start + length as u64);
                self.pos = match_start + length as u64;
                self.literal_pending = false;
                return Some(Lz77Token::Match {
                    length: length as u16,
                    distance: distance as u16,
                });
            }
        }

        self.pending = current;
        let token = if self.literal_pending {
            Some(Lz77Token::Literal(self.window.byte_at(self.pos - 1)))
        } else {
            None
        };
        self.literal_pending = true;
        self.pos += 1;
        token
    }

    /// Tokenize a whole buffer (convenience method).
    pub fn compress_all(input: &[u8], level: u8) -> Vec<Lz77Token> {
        let mut matcher = Self::with_level(level);
        let mut tokens = Vec::with_capacity(input.len() / 2);
        let mut offset = 0;

        loop {
            offset += matcher.fill(&input[offset..]);
            let finished = offset == input.len();
            while let Some(token) = matcher.next_token(finished) {
                tokens.push(token);
            }
            if finished {
                break;
            }
            matcher.release_before(matcher.position());
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(tokens: &[Lz77Token]) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        for token in tokens {
            match *token {
                Lz77Token::Literal(b) => output.push(b),
                Lz77Token::Match { length, distance } => {
                    for _ in 0..length {
                        let pos = output.len() - distance as usize;
                        output.push(output[pos]);
                    }
                }
            }
        }
        output
    }

    fn lcg_bytes(size: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..size)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                (state >> 16) as u8
            })
            .collect()
    }

    #[test]
    fn test_literals_only() {
        let input = b"abcdefgh";
        let tokens = Lz77Matcher::compress_all(input, 6);

        assert!(tokens.iter().all(|t| matches!(t, Lz77Token::Literal(_))));
        assert_eq!(tokens.len(), 8);
    }

    #[test]
    fn test_simple_match() {
        let input = b"abcabcabc";
        for level in [1, 6] {
            let tokens = Lz77Matcher::compress_all(input, level);
            assert_eq!(
                tokens,
                vec![
                    Lz77Token::Literal(b'a'),
                    Lz77Token::Literal(b'b'),
                    Lz77Token::Literal(b'c'),
                    Lz77Token::Match {
                        length: 6,
                        distance: 3
                    },
                ]
            );
        }
    }

    #[test]
    fn test_repeated_char() {
        let input = b"aaaaaaaaaa";
        let tokens = Lz77Matcher::compress_all(input, 6);

        assert_eq!(
            tokens,
            vec![
                Lz77Token::Literal(b'a'),
                Lz77Token::Match {
                    length: 9,
                    distance: 1
                },
            ]
        );
    }

    #[test]
    fn test_decode_matches() {
        let input = b"Hello, Hello, Hello!";
        let tokens = Lz77Matcher::compress_all(input, 6);
        assert_eq!(expand(&tokens), input);
        assert!(tokens.len() < input.len());
    }

    #[test]
    fn test_lazy_prefers_longer_next_match() {
        // At "abcd" the only candidate is "abcX" (3 bytes), but one byte later
        // "bcdefgh" matches 7 bytes.
        let input = b"abcXbcdefgh_abcdefgh";
        let lazy = Lz77Matcher::compress_all(input, 6);
        let greedy = Lz77Matcher::compress_all(input, 1);

        assert_eq!(expand(&lazy), input);
        assert_eq!(expand(&greedy), input);
        assert!(lazy.contains(&Lz77Token::Match {
            length: 7,
            distance: 9
        }));
    }

    #[test]
    fn test_level_0_literals() {
        let input = b"test data test data";
        let tokens = Lz77Matcher::compress_all(input, 0);

        assert!(tokens.iter().all(|t| matches!(t, Lz77Token::Literal(_))));
        assert_eq!(tokens.len(), input.len());
    }

    #[test]
    fn test_all_levels_roundtrip() {
        let mut input = lcg_bytes(5000, 7);
        input.extend_from_slice(&input.clone()[1000..3000]);
        input.extend(b"the quick brown fox ".repeat(50));

        for level in 0..=9 {
            let tokens = Lz77Matcher::compress_all(&input, level);
            assert_eq!(expand(&tokens), input, "level {}", level);
        }
    }

    #[test]
    fn test_streams_past_window() {
        // Longer than the 64 KB window buffer, forcing slides.
        let mut input = Vec::new();
        for i in 0..40_000u32 {
            input.extend_from_slice(&(i % 1000).to_le_bytes()[..3]);
        }
        let tokens = Lz77Matcher::compress_all(&input, 6);
        assert_eq!(expand(&tokens), input);
        assert!(tokens.iter().all(|t| match t {
            Lz77Token::Match { distance, .. } => (*distance as usize) <= sizes::MAX_DISTANCE,
            Lz77Token::Literal(_) => true,
        }));
    }

    #[test]
    fn test_small_window_limits_distance() {
        let chunk = lcg_bytes(600, 3);
        let input = [chunk.as_slice(), chunk.as_slice()].concat();

        let mut matcher = Lz77Matcher::new(MatchParams::for_level(9), 512);
        matcher.fill(&input);
        let mut tokens = Vec::new();
        while let Some(token) = matcher.next_token(true) {
            tokens.push(token);
        }
        assert_eq!(expand(&tokens), input);
        assert!(tokens.iter().all(|t| match t {
            Lz77Token::Match { distance, .. } => *distance <= 512,
            Lz77Token::Literal(_) => true,
        }));
    }

    #[test]
    fn test_dictionary_matches() {
        let dictionary = b"common prefix shared by every message";
        let mut matcher = Lz77Matcher::with_level(6);
        matcher.set_dictionary(dictionary);
        matcher.fill(b"shared by every message");

        let mut tokens = Vec::new();
        while let Some(token) = matcher.next_token(true) {
            tokens.push(token);
        }
        assert_eq!(
            tokens,
            vec![Lz77Token::Match {
                length: 23,
                distance: 23
            }]
        );
    }

    #[test]
    fn test_waits_for_lookahead() {
        let mut matcher = Lz77Matcher::with_level(6);
        matcher.fill(b"abcabcabc");
        assert_eq!(matcher.next_token(false), None);
        assert!(matcher.next_token(true).is_some());
    }

    #[test]
    fn test_reset_history_blocks_old_matches() {
        let mut matcher = Lz77Matcher::with_level(6);
        matcher.fill(b"abcdefgh");
        while matcher.next_token(true).is_some() {}
        matcher.reset_history();
        matcher.fill(b"abcdefgh");

        let mut tokens = Vec::new();
        while let Some(token) = matcher.next_token(true) {
            tokens.push(token);
        }
        assert!(tokens.iter().all(|t| matches!(t, Lz77Token::Literal(_))));
    }

    #[test]
    fn test_filtered_drops_short_matches() {
        let mut input = b"abcd1abcd2abcd3abcd4".to_vec();
        input.extend_from_slice(b"a long phrase that repeats; a long phrase that repeats;");

        let lazy = Lz77Matcher::compress_all(&input, 6);
        assert!(lazy.iter().any(|t| matches!(t, Lz77Token::Match { length, .. } if *length <= 5)));

        let params = MatchParams {
            strategy: MatchStrategy::Filtered,
            ..MatchParams::for_level(6)
        };
        let mut matcher = Lz77Matcher::new(params, sizes::MAX_DISTANCE);
        matcher.fill(&input);
        let mut filtered = Vec::new();
        while let Some(token) = matcher.next_token(true) {
            filtered.push(token);
        }

        assert_eq!(expand(&filtered), input);
        assert!(filtered.iter().any(|t| matches!(t, Lz77Token::Match { .. })));
        assert!(filtered.iter().all(|t| match t {
            Lz77Token::Match { length, .. } => *length > 5,
            Lz77Token::Literal(_) => true,
        }));
    }

    #[test]
    fn test_set_params_between_inputs() {
        let mut matcher = Lz77Matcher::with_level(6);
        matcher.fill(b"abcabcabcabc");
        let mut tokens = Vec::new();
        while let Some(token) = matcher.next_token(true) {
            tokens.push(token);
        }
        assert!(tokens.iter().any(|t| matches!(t, Lz77Token::Match { .. })));

        matcher.set_params(MatchParams::for_level(0));
        matcher.fill(b"abcabcabcabc");
        let mut tail = Vec::new();
        while let Some(token) = matcher.next_token(true) {
            tail.push(token);
        }
        assert_eq!(tail.len(), 12);
        assert!(tail.iter().all(|t| matches!(t, Lz77Token::Literal(_))));

        tokens.extend(tail);
        assert_eq!(expand(&tokens), b"abcabcabcabc".repeat(2));
    }

    #[test]
    fn test_hash() {
        let h1 = Lz77Matcher::hash(b'a', b'b', b'c');
        let h2 = Lz77Matcher::hash(b'a', b'b', b'c');
        assert_eq!(h1, h2);
        assert!(h1 < HASH_SIZE);
        assert_ne!(h1, Lz77Matcher::hash(b'a', b'c', b'b'));
    }
}
