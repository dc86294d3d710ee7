// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};
use understory_scene_index::{IndexMethod, SpatialIndex};

fn gen_grid_rects(n: usize, cell: f64) -> Vec<Rect> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            out.push(Rect::new(x0, y0, x0 + cell, y0 + cell));
        }
    }
    out
}

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

fn gen_random_rects(count: usize, extent: f64, size: f64) -> Vec<Rect> {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    (0..count)
        .map(|_| {
            let x0 = rng.next_f64() * (extent - size);
            let y0 = rng.next_f64() * (extent - size);
            Rect::new(x0, y0, x0 + size, y0 + size)
        })
        .collect()
}

const METHODS: [(&str, IndexMethod); 3] = [
    ("linear", IndexMethod::Linear),
    ("grid64", IndexMethod::Grid { cell_size: 64.0 }),
    ("grid256", IndexMethod::Grid { cell_size: 256.0 }),
];

fn build(method: IndexMethod, rects: &[Rect]) -> Box<dyn SpatialIndex<u32>> {
    let mut idx = method.build::<u32>();
    for (i, r) in rects.iter().copied().enumerate() {
        idx.add_item(i as u32, r);
    }
    idx.commit();
    idx
}

fn bench_insert_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_commit");
    for &n in &[32usize, 64, 128] {
        let rects = gen_grid_rects(n, 10.0);
        group.throughput(Throughput::Elements((n * n) as u64));
        for (name, method) in METHODS {
            group.bench_function(format!("{name}_n{n}"), |b| {
                b.iter_batched(
                    || method.build::<u32>(),
                    |mut idx| {
                        for (i, r) in rects.iter().copied().enumerate() {
                            idx.add_item(i as u32, r);
                        }
                        black_box(idx.commit());
                    },
                    BatchSize::SmallInput,
                );
            });
        }
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let rects = gen_random_rects(10_000, 4000.0, 20.0);
    let query = Rect::new(1000.0, 1000.0, 1400.0, 1400.0);
    for (name, method) in METHODS {
        let idx = build(method, &rects);
        group.bench_function(format!("{name}_rect"), |b| {
            let mut out = Vec::new();
            b.iter(|| {
                out.clear();
                idx.estimate_items(black_box(query), &mut out);
                black_box(out.len())
            });
        });
        group.bench_function(format!("{name}_point"), |b| {
            let mut out = Vec::new();
            b.iter(|| {
                out.clear();
                idx.estimate_items_at(black_box(Point::new(1200.0, 1200.0)), &mut out);
                black_box(out.len())
            });
        });
    }
    group.finish();
}

fn bench_update_heavy(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_heavy");
    let rects = gen_random_rects(5_000, 4000.0, 20.0);
    for (name, method) in METHODS {
        group.bench_function(name, |b| {
            b.iter_batched(
                || build(method, &rects),
                |mut idx| {
                    // Move every tenth item, then query once, the way a frame does.
                    for (i, r) in rects.iter().enumerate().step_by(10) {
                        let key = i as u32;
                        idx.prepare_bounding_rect_change(key);
                        idx.update_item(key, *r + kurbo::Vec2::new(15.0, 5.0));
                    }
                    idx.commit();
                    let mut out = Vec::new();
                    idx.estimate_items(Rect::new(0.0, 0.0, 800.0, 600.0), &mut out);
                    black_box(out.len());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert_commit, bench_queries, bench_update_heavy);
criterion_main!(benches);
