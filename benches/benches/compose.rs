// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Point, Size};
use understory_gesture::compose::{TouchFrame, keep_touches_relative};
use understory_gesture::{ComposeOptions, GestureKind, Pose};

/// `n` contacts on a circle around `center`, rotated by `turn` radians and
/// pushed out to `radius`.
fn ring(n: usize, center: Point, radius: f64, turn: f64) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let angle = turn + i as f64 * std::f64::consts::TAU / n as f64;
            center + radius * kurbo::Vec2::new(angle.cos(), angle.sin())
        })
        .collect()
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("keep_touches_relative");
    let initial = Pose::new(Point::new(100.0, 100.0), Size::new(200.0, 120.0));
    let center = initial.center();

    for (name, options) in [
        ("drag", ComposeOptions::default()),
        ("rotate", ComposeOptions::rotate_only()),
        (
            "scale",
            ComposeOptions::default().with_priority([GestureKind::Scale]),
        ),
    ] {
        let start = [Point::new(150.0, 130.0)];
        let current = [Point::new(170.0, 165.0)];
        group.bench_function(BenchmarkId::new("single", name), |b| {
            b.iter(|| {
                let frame = TouchFrame::new(initial, &start, &current);
                black_box(keep_touches_relative(black_box(&frame), &options))
            });
        });
    }

    let options = ComposeOptions::default();
    for &n in &[2_usize, 5, 10] {
        let start = ring(n, center, 40.0, 0.0);
        let current = ring(n, center + kurbo::Vec2::new(12.0, -7.0), 55.0, 0.3);
        group.bench_function(BenchmarkId::new("multi", n), |b| {
            b.iter(|| {
                let frame = TouchFrame::new(initial, &start, &current);
                black_box(keep_touches_relative(black_box(&frame), &options))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compose);
criterion_main!(benches);
