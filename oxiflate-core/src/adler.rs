//! Adler-32 checksum (RFC 1950).
//!
//! Two running sums modulo 65521: `a` is one plus the sum of all bytes and
//! `b` is the sum of every intermediate `a`. The checksum is `b << 16 | a`.
//! Reduction is deferred for [`NMAX`] bytes, the longest run for which `b`
//! cannot overflow a `u32`.

/// Largest prime smaller than 65536.
const ADLER_MOD: u32 = 65521;

/// Number of bytes to process before reducing.
const NMAX: usize = 5552;

/// Incremental Adler-32 calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// Create a new Adler-32 calculator.
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Update the checksum with more data.
    pub fn update(&mut self, data: &[u8]) {
        let mut a = self.a;
        let mut b = self.b;

        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                a += byte as u32;
                b += a;
            }
            a %= ADLER_MOD;
            b %= ADLER_MOD;
        }

        self.a = a;
        self.b = b;
    }

    /// Return the checksum of everything seen so far.
    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Compute Adler-32 checksum of data in one shot.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.finish()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}
