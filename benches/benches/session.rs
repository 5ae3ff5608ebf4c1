// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::rc::Rc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Point, Size};
use understory_gesture::codec::StyledElement;
use understory_gesture::composite::Composite;
use understory_gesture::frame::ManualFrameClock;
use understory_gesture::recognizer::{Recognizer, Transform};
use understory_gesture::{
    ComposeOptions, GestureHost, GestureKind, InputSource, PointerEvent, SessionOptions,
};

const MOVES: usize = 64;

struct Rig {
    input: InputSource,
    clock: Rc<ManualFrameClock>,
    host: GestureHost,
    element: Rc<RefCell<StyledElement>>,
}

fn rig() -> Rig {
    let input = InputSource::new();
    let clock = Rc::new(ManualFrameClock::new());
    let host = GestureHost::new(input.clone(), clock.clone());
    let element = Rc::new(RefCell::new(StyledElement::new(
        0.0,
        0.0,
        Size::new(200.0, 200.0),
    )));
    Rig {
        input,
        clock,
        host,
        element,
    }
}

/// Two contacts pinching apart while twisting, then lifting.
fn pinch(rig: &Rig, press: impl Fn(&PointerEvent) -> bool) {
    press(&PointerEvent::touch(1, Point::new(80.0, 100.0), 0.0));
    press(&PointerEvent::touch(2, Point::new(120.0, 100.0), 0.0));
    for step in 1..=MOVES {
        let t = step as f64;
        rig.clock.set_now(t * 8.0);
        let spread = 20.0 + t;
        let (sin, cos) = ((t * 0.02).sin(), (t * 0.02).cos());
        let offset = kurbo::Vec2::new(cos * spread, sin * spread);
        let center = Point::new(100.0, 100.0);
        rig.input
            .pointer_move(&PointerEvent::touch(1, center - offset, t * 8.0));
        rig.input
            .pointer_move(&PointerEvent::touch(2, center + offset, t * 8.0));
    }
    let end = MOVES as f64 * 8.0 + 8.0;
    rig.input
        .pointer_up(&PointerEvent::touch(1, Point::ZERO, end));
    rig.input
        .pointer_up(&PointerEvent::touch(2, Point::ZERO, end));
}

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");

    group.bench_function(format!("transform_pinch(moves={MOVES})"), |b| {
        b.iter_batched(
            || {
                let rig = rig();
                let transform = Transform::attach(
                    rig.element.clone(),
                    &rig.host,
                    SessionOptions::default(),
                    ComposeOptions::default(),
                );
                (rig, transform)
            },
            |(rig, transform)| {
                pinch(&rig, |event| transform.session().handle_press(event));
                black_box(rig.element.borrow().left);
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function(format!("composite_pinch(moves={MOVES})"), |b| {
        b.iter_batched(
            || {
                let rig = rig();
                let composite = Composite::attach(
                    rig.element.clone(),
                    &rig.host,
                    SessionOptions::default(),
                    &[GestureKind::Drag, GestureKind::Rotate, GestureKind::Scale],
                );
                (rig, composite)
            },
            |(rig, composite)| {
                pinch(&rig, |event| composite.handle_press(event));
                black_box(rig.element.borrow().left);
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("transform_inertia_to_idle", |b| {
        b.iter_batched(
            || {
                let rig = rig();
                let transform = Transform::attach(
                    rig.element.clone(),
                    &rig.host,
                    SessionOptions::default().with_inertial(true),
                    ComposeOptions::default(),
                );
                (rig, transform)
            },
            |(rig, transform)| {
                pinch(&rig, |event| transform.session().handle_press(event));
                black_box(rig.clock.run_until_idle(16.0, 10_000));
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_session);
criterion_main!(benches);
