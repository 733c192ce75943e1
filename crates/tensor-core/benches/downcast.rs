// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the clamped f32 -> f16 downcast.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tensor_core::{downcast_to_f16, ClampRange, Shape, Tensor};

fn sample(n: usize) -> Vec<f32> {
    // Spread across the clamp thresholds so every branch is hit.
    (0..n)
        .map(|i| {
            let x = (i as f32 * 0.618_034).fract() * 2.0 - 1.0;
            x * 10f32.powi((i % 14) as i32 - 9)
        })
        .collect()
}

fn bench_downcast_slice(c: &mut Criterion) {
    let range = ClampRange::default();
    let mut group = c.benchmark_group("downcast_to_f16");
    for n in [1_024usize, 65_536, 1_048_576] {
        let values = sample(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, v| {
            b.iter(|| downcast_to_f16(black_box(v), &range))
        });
    }
    group.finish();
}

fn bench_downcast_tensor(c: &mut Criterion) {
    let range = ClampRange::default();
    let tensor = Tensor::from_f32(Shape::matrix(768, 768), &sample(768 * 768)).unwrap();
    c.bench_function("tensor_downcast_768x768", |b| {
        b.iter(|| black_box(&tensor).downcast_to_f16(&range).unwrap())
    });
}

criterion_group!(benches, bench_downcast_slice, bench_downcast_tensor);
criterion_main!(benches);
