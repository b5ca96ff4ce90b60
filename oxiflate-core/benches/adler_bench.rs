//! Performance benchmarks for the core primitives
//!
//! This benchmark suite evaluates:
//! - Adler-32 throughput across data sizes and patterns
//! - Incremental vs single-shot Adler-32
//! - Sliding window back-reference copies (short, long, overlapping)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use oxiflate_core::adler::Adler32;
use oxiflate_core::window::SlidingWindow;
use std::hint::black_box;

/// Type alias for pattern generator functions
type PatternGenerator = fn(usize) -> Vec<u8>;

/// Generate test data patterns for benchmarking
mod test_data {
    /// Random data - varied byte values
    pub fn random(size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(size);
        let mut seed: u64 = 0x123456789ABCDEF0;
        for _ in 0..size {
            // Linear congruential generator
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push((seed >> 32) as u8);
        }
        data
    }

    /// Zero data - all zeros
    pub fn zeros(size: usize) -> Vec<u8> {
        vec![0; size]
    }

    /// Text-like data
    pub fn text_like(size: usize) -> Vec<u8> {
        let text = b"The quick brown fox jumps over the lazy dog. ";
        text.iter().copied().cycle().take(size).collect()
    }
}

/// Standard data sizes for benchmarking
mod data_sizes {
    pub const SMALL: usize = 256; // 256 B
    pub const MEDIUM: usize = 4 * 1024; // 4 KB
    pub const LARGE: usize = 64 * 1024; // 64 KB
    pub const XLARGE: usize = 1024 * 1024; // 1 MB
}

/// Benchmark Adler-32 across different data sizes
fn bench_adler32_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("adler32_sizes");

    let sizes = [
        ("256B", data_sizes::SMALL),
        ("4KB", data_sizes::MEDIUM),
        ("64KB", data_sizes::LARGE),
        ("1MB", data_sizes::XLARGE),
    ];

    for (size_name, size) in sizes {
        let data = test_data::text_like(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size_name), &data, |b, data| {
            b.iter(|| black_box(Adler32::checksum(black_box(data))));
        });
    }

    group.finish();
}

/// Benchmark Adler-32 with different data patterns
fn bench_adler32_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("adler32_patterns");

    let patterns: [(&str, PatternGenerator); 3] = [
        ("random", test_data::random as PatternGenerator),
        ("zeros", test_data::zeros as PatternGenerator),
        ("text", test_data::text_like as PatternGenerator),
    ];

    let size = data_sizes::LARGE;

    for (pattern_name, generator) in patterns {
        let data = generator(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(pattern_name),
            &data,
            |b, data| {
                b.iter(|| black_box(Adler32::checksum(black_box(data))));
            },
        );
    }

    group.finish();
}

/// Benchmark incremental Adler-32 calculation
fn bench_adler32_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("adler32_incremental");

    let size = data_sizes::LARGE;
    let data = test_data::text_like(size);

    group.throughput(Throughput::Bytes(size as u64));
    group.bench_with_input(
        BenchmarkId::from_parameter("single_shot"),
        &data,
        |b, data| {
            b.iter(|| black_box(Adler32::checksum(black_box(data))));
        },
    );

    group.bench_with_input(
        BenchmarkId::from_parameter("chunks_1KB"),
        &data,
        |b, data| {
            b.iter(|| {
                let mut adler = Adler32::new();
                for chunk in data.chunks(1024) {
                    adler.update(black_box(chunk));
                }
                black_box(adler.finish())
            });
        },
    );

    group.finish();
}

/// Benchmark back-reference copies through the sliding window
fn bench_window_copy(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_copy");

    let cases = [
        ("run_d1_l258", 1usize, 258usize),
        ("overlap_d3_l258", 3, 258),
        ("far_d4096_l258", 4096, 258),
        ("short_d100_l8", 100, 8),
    ];
    let seed = test_data::random(8192);

    for (name, distance, length) in cases {
        group.throughput(Throughput::Bytes(length as u64 * 64));
        group.bench_function(name, |b| {
            let mut window = SlidingWindow::inflate();
            let mut sink = vec![0u8; seed.len().max(length * 64)];
            window.write_bytes(&seed);
            window.flush_into(&mut sink);
            b.iter(|| {
                for _ in 0..64 {
                    window
                        .copy_from_offset(black_box(distance), black_box(length))
                        .unwrap();
                }
                black_box(window.flush_into(&mut sink));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_adler32_sizes,
    bench_adler32_patterns,
    bench_adler32_incremental,
    bench_window_copy,
);
criterion_main!(benches);
