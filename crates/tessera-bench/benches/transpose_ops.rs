//! Criterion micro-benchmarks for patch transposition.

use criterion::{criterion_group, criterion_main, Criterion};
use tessera_bench::{cube_profile, multi_var_profile, scatter_transpose};
use tessera_patch::{transpose_bytes, PatchConfig};

/// Benchmark: Transpose each axis pair of a 64³ f64 patch, serially.
fn bench_transpose_pairs_64(c: &mut Criterion) {
    for (a, b) in [(0, 1), (0, 2), (1, 2)] {
        let mut patch = cube_profile(64, 42, PatchConfig::serial());
        c.bench_function(&format!("transpose_64_axes_{a}{b}"), |bench| {
            bench.iter(|| {
                patch.transpose(a, b).unwrap();
                std::hint::black_box(patch.extent());
            });
        });
    }
}

/// Benchmark: Transpose a 128³ f64 patch (16 MiB) on one thread vs all cores.
fn bench_transpose_parallel_128(c: &mut Criterion) {
    let mut serial = cube_profile(128, 7, PatchConfig::serial());
    c.bench_function("transpose_128_serial", |b| {
        b.iter(|| serial.transpose(0, 2).unwrap());
    });

    let mut parallel = cube_profile(128, 7, PatchConfig::new());
    c.bench_function("transpose_128_parallel", |b| {
        b.iter(|| parallel.transpose(0, 2).unwrap());
    });
}

/// Benchmark: Gather-load (library) vs scatter-store order on raw bytes.
fn bench_gather_vs_scatter(c: &mut Criterion) {
    let dims = [96u32, 96, 96];
    let len = 96 * 96 * 96 * 8;
    let src: Vec<u8> = (0..len).map(|i| i as u8).collect();
    let mut dst = vec![0u8; len];

    c.bench_function("transpose_bytes_gather_96", |b| {
        b.iter(|| {
            transpose_bytes(&src, &mut dst, 8, &dims, 0, 2, 1);
            std::hint::black_box(&dst);
        });
    });
    c.bench_function("transpose_bytes_scatter_96", |b| {
        b.iter(|| {
            scatter_transpose(&src, &mut dst, 8, &dims, 0, 2);
            std::hint::black_box(&dst);
        });
    });
}

/// Benchmark: Transpose 8 variables of which 4 are allocated.
fn bench_transpose_multi_var(c: &mut Criterion) {
    let mut patch = multi_var_profile(48, 8, 3);
    c.bench_function("transpose_48_eight_vars", |b| {
        b.iter(|| patch.transpose(1, 2).unwrap());
    });
}

criterion_group!(
    benches,
    bench_transpose_pairs_64,
    bench_transpose_parallel_128,
    bench_gather_vs_scatter,
    bench_transpose_multi_var
);
criterion_main!(benches);
