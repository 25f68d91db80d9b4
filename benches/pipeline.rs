//! Benchmarks for the image operator pipeline.

use ambara_matrix::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn test_image(util: &ImageUtil, size: usize) -> Image {
    let data: Vec<f32> = (0..size * size).map(|i| ((i * 31) % 255) as f32 / 255.0).collect();
    util.new_image(&data, size, size).unwrap()
}

fn bench_convolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("convolve_gaussian_5x5");
    let util = ImageUtil::new(0);
    let kernel = util
        .generate_gaussian_normalized(Shape::new(5, 5).unwrap(), 5.0, 5.0)
        .unwrap();

    for size in [64, 256, 1024].iter() {
        let img = test_image(&util, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| util.convolve(black_box(&img), black_box(&kernel)).unwrap());
        });
    }

    group.finish();
}

fn bench_gradients(c: &mut Criterion) {
    let mut group = c.benchmark_group("gradients");
    let util = ImageUtil::new(0);

    for size in [64, 256, 1024].iter() {
        let img = test_image(&util, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| util.gradients(black_box(&img)).unwrap());
        });
    }

    group.finish();
}

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample_half");
    let util = ImageUtil::new(0);

    for size in [256, 1024].iter() {
        let img = test_image(&util, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| util.resample(black_box(&img), size / 2, size / 2).unwrap());
        });
    }

    group.finish();
}

fn bench_rank_maxima(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_maxima_top10");
    let util = ImageUtil::new(0);

    for size in [32, 128].iter() {
        let img = test_image(&util, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| util.rank_maxima(black_box(&img), 10).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_convolve,
    bench_gradients,
    bench_resample,
    bench_rank_maxima
);
criterion_main!(benches);
