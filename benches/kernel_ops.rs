//! Benchmarks for the zone kernels across backends
//!
//! # Benchmark Methodology
//!
//! - Sample counts: 1K, 16K, 256K (multiples of every lane count)
//! - Each detected backend is benchmarked explicitly
//! - Throughput is reported in samples/second
//!
//! Buffers are built once per backend at the zone's element width; the timed
//! loop only re-runs the kernel.

use std::ptr;

use boostkern::bins::{BinBuffer, BinLayout};
use boostkern::pack::PackedIndices;
use boostkern::{
    available_backends, ApplyUpdateBridge, BinSumsBoostingBridge, Compute, Config,
    ITEMS_PER_BIT_PACK_NONE,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const SIZES: [usize; 3] = [1024, 16 * 1024, 256 * 1024];
const ITEMS_PER_PACK: usize = 4;
const TENSOR_BINS: usize = 64;

/// Raw bytes of `values` narrowed to the zone's float width
fn floats(values: impl Iterator<Item = f64>, float_bytes: usize) -> Vec<u8> {
    if float_bytes == 4 {
        let narrowed: Vec<f32> = values.map(|v| v as f32).collect();
        bytemuck::cast_slice(&narrowed).to_vec()
    } else {
        let wide: Vec<f64> = values.collect();
        bytemuck::cast_slice(&wide).to_vec()
    }
}

fn uints(values: impl Iterator<Item = u64>, uint_bytes: usize) -> Vec<u8> {
    if uint_bytes == 4 {
        let narrowed: Vec<u32> = values.map(|v| v as u32).collect();
        bytemuck::cast_slice(&narrowed).to_vec()
    } else {
        let wide: Vec<u64> = values.collect();
        bytemuck::cast_slice(&wide).to_vec()
    }
}

fn indexes(size: usize, bound: usize) -> Vec<usize> {
    (0..size).map(|i| (i * 7 + i / 3) % bound).collect()
}

/// Benchmark score update plus gradients and metric
fn bench_apply_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_update");

    for (name, config) in [("rmse", Config::regression()), ("log_loss", Config::classification(2))] {
        for backend in available_backends() {
            let compute = Compute::with_backend(backend, &config, name).unwrap();
            let (fb, ub) = (compute.float_bytes(), compute.uint_bytes());

            for size in SIZES {
                group.throughput(Throughput::Elements(size as u64));
                let id = BenchmarkId::new(format!("{name}/{backend:?}"), size);
                group.bench_with_input(id, &size, |bencher, &size| {
                    let tensor = floats((0..TENSOR_BINS).map(|i| i as f64 * 1e-3), fb);
                    let packed =
                        PackedIndices::pack(&indexes(size, TENSOR_BINS), ITEMS_PER_PACK, compute.lanes(), ub)
                            .unwrap();
                    let targets = if compute.is_rmse() {
                        floats((0..size).map(|i| (i % 13) as f64), fb)
                    } else {
                        uints((0..size).map(|i| (i % 2) as u64), ub)
                    };
                    let mut scores = floats((0..size).map(|i| (i % 11) as f64 * 0.1), fb);
                    let mut gradients = vec![0u8; size * 2 * fb];

                    bencher.iter(|| {
                        let mut data = ApplyUpdateBridge {
                            c_pack: ITEMS_PER_PACK as isize,
                            hessian_needed: compute.has_hessian(),
                            calc_metric: true,
                            update_tensor_scores: tensor.as_ptr().cast(),
                            c_samples: size,
                            packed: packed.as_ptr(),
                            targets: targets.as_ptr().cast(),
                            sample_scores: scores.as_mut_ptr().cast(),
                            gradients_and_hessians: gradients.as_mut_ptr().cast(),
                            ..Default::default()
                        };
                        unsafe { compute.apply_update(&mut data).unwrap() };
                        black_box(data.metric_out);
                    });
                });
            }
        }
    }

    group.finish();
}

/// Benchmark histogram accumulation for one feature
fn bench_bin_sums(c: &mut Criterion) {
    let mut group = c.benchmark_group("bin_sums_boosting");
    const BINS: usize = 256;

    for backend in available_backends() {
        let compute = Compute::with_backend(backend, &Config::classification(2), "log_loss").unwrap();
        let (fb, ub) = (compute.float_bytes(), compute.uint_bytes());

        for size in SIZES {
            group.throughput(Throughput::Elements(size as u64));
            group.bench_with_input(BenchmarkId::new(format!("{backend:?}"), size), &size, |bencher, &size| {
                let packed =
                    PackedIndices::pack(&indexes(size, BINS), ITEMS_PER_PACK, compute.lanes(), ub).unwrap();
                let gradients = floats((0..size * 2).map(|i| (i % 17) as f64 * 0.01), fb);
                let mut bins = BinBuffer::new(BinLayout::new(1, true, fb).unwrap(), BINS);

                bencher.iter(|| {
                    bins.clear();
                    let mut params = BinSumsBoostingBridge {
                        hessian: true,
                        c_pack: ITEMS_PER_PACK as isize,
                        c_samples: size,
                        gradients_and_hessians: gradients.as_ptr().cast(),
                        weights: ptr::null(),
                        packed: packed.as_ptr(),
                        bins: bins.as_mut_ptr(),
                        debug_bins_end: bins.end_ptr(),
                        ..Default::default()
                    };
                    unsafe { compute.bin_sums_boosting(&mut params).unwrap() };
                    black_box(&bins);
                });
            });
        }
    }

    group.finish();
}

/// Benchmark the unpacked path (every sample updated by tensor entry 0)
fn bench_apply_update_unpacked(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_update_unpacked");

    for backend in available_backends() {
        let compute = Compute::with_backend(backend, &Config::regression(), "rmse").unwrap();
        let fb = compute.float_bytes();

        for size in SIZES {
            group.throughput(Throughput::Elements(size as u64));
            group.bench_with_input(BenchmarkId::new(format!("{backend:?}"), size), &size, |bencher, &size| {
                let tensor = floats(std::iter::once(0.25), fb);
                let mut scores = floats((0..size).map(|i| i as f64), fb);

                bencher.iter(|| {
                    let mut data = ApplyUpdateBridge {
                        c_pack: ITEMS_PER_BIT_PACK_NONE,
                        update_tensor_scores: tensor.as_ptr().cast(),
                        c_samples: size,
                        sample_scores: scores.as_mut_ptr().cast(),
                        ..Default::default()
                    };
                    unsafe { compute.apply_update(&mut data).unwrap() };
                    black_box(&scores);
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_apply_update, bench_bin_sums, bench_apply_update_unpacked);
criterion_main!(benches);
