// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect, Size, Vec2};
use peniko::Color;
use understory_scene::{
    Content, IndexMethod, Item, ItemFlags, ItemId, MouseButtons, RecordingPainter, Scene,
    SceneOptions, ShapeStyle, UpdateMode, ViewId, ViewMouseEvent, ViewOptions,
};

fn populated(n: usize, method: IndexMethod, mode: UpdateMode) -> (Scene, ViewId, Vec<ItemId>) {
    let mut scene = Scene::with_options(SceneOptions {
        index_method: method,
        ..SceneOptions::default()
    });
    let mut ids = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let item = Item::new(Content::rect(
                Rect::new(0.0, 0.0, 8.0, 8.0),
                ShapeStyle::filled(Color::BLACK),
            ))
            .with_pos((x as f64 * 10.0, y as f64 * 10.0))
            .with_flags(ItemFlags::SELECTABLE | ItemFlags::MOVABLE);
            ids.push(scene.add_item(item));
        }
    }
    let view = scene.add_view(
        ViewOptions {
            update_mode: mode,
            ..ViewOptions::default()
        },
        Size::new(800.0, 600.0),
    );
    let mut painter = RecordingPainter::new();
    if let Some(mut v) = scene.view_mut(view) {
        v.paint(&mut painter, None);
    }
    (scene, view, ids)
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    for mode in [UpdateMode::Minimal, UpdateMode::Smart, UpdateMode::BoundingRect] {
        let n = 64;
        group.throughput(Throughput::Elements((n * n / 8) as u64));
        group.bench_function(format!("move_flush_paint_{mode:?}"), |b| {
            b.iter_batched(
                || populated(n, IndexMethod::default(), mode),
                |(mut scene, view, ids)| {
                    for id in ids.iter().step_by(8) {
                        scene.move_by(*id, Vec2::new(3.0, 0.0));
                    }
                    let mut painter = RecordingPainter::new();
                    if let Some(mut v) = scene.view_mut(view) {
                        if v.take_pending_update().is_some() {
                            v.paint(&mut painter, None);
                        }
                    }
                    black_box(painter.fill_count());
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_hit_testing(c: &mut Criterion) {
    let mut group = c.benchmark_group("hit_test");
    for (name, method) in [
        ("linear", IndexMethod::Linear),
        ("grid", IndexMethod::default()),
    ] {
        let (mut scene, view, _) = populated(100, method, UpdateMode::Smart);
        scene.run_pending_tasks();
        group.bench_function(format!("items_at_{name}"), |b| {
            b.iter(|| black_box(scene.items_at(black_box(Point::new(455.0, 455.0))).len()));
        });
        group.bench_function(format!("hover_{name}"), |b| {
            let mut x = 0.0;
            b.iter(|| {
                x = (x + 7.0) % 790.0;
                if let Some(mut v) = scene.view_mut(view) {
                    black_box(v.mouse_event(&ViewMouseEvent::moved(
                        Point::new(x, 300.0),
                        MouseButtons::empty(),
                    )));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_frame, bench_hit_testing);
criterion_main!(benches);
