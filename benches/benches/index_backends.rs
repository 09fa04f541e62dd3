// Copyright 2025 the Cartouche Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat scan against uniform grid for label-sized boxes on a padded viewport.

use cartouche_index::{Aabb2D, Index};
use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};

/// Padded 1024 x 768 viewport.
const GRID_W: f64 = 1224.0;
const GRID_H: f64 = 968.0;
const CELL: f64 = 25.0;

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

/// Text-like boxes, wider than tall.
fn gen_label_boxes(count: usize) -> Vec<Aabb2D<f64>> {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    (0..count)
        .map(|_| {
            let w = 20.0 + rng.next_f64() * 100.0;
            let h = 12.0 + rng.next_f64() * 8.0;
            let x0 = rng.next_f64() * (GRID_W - w);
            let y0 = rng.next_f64() * (GRID_H - h);
            Aabb2D::<f64>::from_xywh(x0, y0, w, h)
        })
        .collect()
}

/// Dense clusters, as around a city center.
fn gen_clustered_boxes(n_clusters: usize, per_cluster: usize, spread: f64) -> Vec<Aabb2D<f64>> {
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    for _ in 0..n_clusters {
        let (cx, cy) = (
            spread + rng.next_f64() * (GRID_W - 2.0 * spread),
            spread + rng.next_f64() * (GRID_H - 2.0 * spread),
        );
        for _ in 0..per_cluster {
            let dx = (rng.next_f64() - 0.5) * spread;
            let dy = (rng.next_f64() - 0.5) * spread;
            out.push(Aabb2D::<f64>::from_xywh(cx + dx, cy + dy, 40.0, 14.0));
        }
    }
    out
}

/// Insert only what does not hit anything yet, the way a placement pass fills the index.
fn bench_greedy_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("greedy_fill");
    for &n in &[256usize, 1024, 4096] {
        let boxes = gen_label_boxes(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("flatvec_n{n}"), |b| {
            b.iter_batched(
                Index::<f64, u32>::new,
                |mut idx| {
                    for (i, r) in boxes.iter().copied().enumerate() {
                        if !idx.hit_test(r, |_, _| true) {
                            let _ = idx.insert(r, i as u32);
                        }
                    }
                    black_box(idx.len());
                },
                BatchSize::SmallInput,
            );
        });
        group.bench_function(format!("grid_n{n}"), |b| {
            b.iter_batched(
                || Index::<f64, u32>::with_uniform_grid(GRID_W, GRID_H, CELL),
                |mut idx| {
                    for (i, r) in boxes.iter().copied().enumerate() {
                        if !idx.hit_test(r, |_, _| true) {
                            let _ = idx.insert(r, i as u32);
                        }
                    }
                    black_box(idx.len());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_clustered_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustered_queries");
    let boxes = gen_clustered_boxes(16, 128, 160.0);
    let mut flat = Index::<f64, u32>::new();
    let mut grid = Index::<f64, u32>::with_uniform_grid(GRID_W, GRID_H, CELL);
    for (i, r) in boxes.iter().copied().enumerate() {
        let _ = flat.insert(r, i as u32);
        let _ = grid.insert(r, i as u32);
    }
    let queries = gen_label_boxes(256);
    group.throughput(Throughput::Elements(queries.len() as u64));
    group.bench_function("flatvec", |b| {
        b.iter(|| {
            let total: usize = queries.iter().map(|q| flat.query_rect(*q).count()).sum();
            black_box(total)
        });
    });
    group.bench_function("grid", |b| {
        b.iter(|| {
            let total: usize = queries.iter().map(|q| grid.query_rect(*q).count()).sum();
            black_box(total)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_greedy_fill, bench_clustered_queries);
criterion_main!(benches);
