// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blur views inside the content they blur.

use std::cell::RefCell;

use shape_blur::color::palette;
use shape_blur::kurbo::{Point, Rect, Vec2};
use shape_blur::{
    BlurConfig, BlurView, Canvas, DrawError, DrawGate, DrawPermit, PreDrawObserver,
    RenderingState, ReentrancyViolation, SnapshotSource,
};

use crate::util::{premul, view, Scene};

fn config() -> BlurConfig {
    BlurConfig {
        radius: 2.0,
        down_sample_factor: 2.0,
        ..BlurConfig::default()
    }
}

#[test]
fn own_view_stops_the_snapshot() {
    let state = RenderingState::new();
    let scene = Scene::new(palette::css::RED);
    let view = view(config(), &state);
    view.borrow_mut().set_layout(Point::ZERO, 40, 40);
    scene.add_blur(&view, Vec2::ZERO);
    scene.add_rect(Rect::new(0.0, 0.0, 40.0, 40.0), palette::css::LIME);
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&view, &mut observer, scene.clone(), false);

    assert!(observer.dispatch_pre_draw());

    let view = view.borrow();
    let red = premul(palette::css::RED);
    let blurred = view.pipeline().blurred().unwrap().pixmap;
    assert!(blurred.data().iter().all(|p| *p == red));
    assert_eq!(state.count(), 0);
    assert!(!view.pipeline().guard().is_snapshotting());
    assert_eq!(view.draw_gate().check(), Ok(DrawPermit::Draw));
}

#[test]
fn other_views_are_skipped() {
    let state = RenderingState::new();
    let scene = Scene::new(palette::css::RED);
    let a = view(config(), &state);
    let b = view(config(), &state);
    for v in [&a, &b] {
        v.borrow_mut().set_layout(Point::ZERO, 40, 40);
        scene.add_blur(v, Vec2::ZERO);
    }
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&a, &mut observer, scene.clone(), false);
    BlurView::attach(&b, &mut observer, scene.clone(), false);

    observer.dispatch_pre_draw();

    // While `b` snapshots, `a` comes first in the scene and skips itself.
    assert_eq!(scene.skipped.get(), 1);
    assert_eq!(state.count(), 0);
    for v in [&a, &b] {
        assert_eq!(v.borrow().draw_gate().check(), Ok(DrawPermit::Draw));
        assert!(v.borrow().pipeline().blurred().is_some());
    }
}

/// An ancestor that reports what the gate said while it was drawn.
struct GateCheck {
    gate: RefCell<Option<DrawGate>>,
    seen: RefCell<Vec<Result<DrawPermit, DrawError>>>,
}

impl SnapshotSource for GateCheck {
    fn origin_on_screen(&self) -> Point {
        Point::ZERO
    }

    fn draw(&self, _canvas: &mut dyn Canvas) -> Result<(), DrawError> {
        if let Some(gate) = self.gate.borrow().as_ref() {
            let permit = gate.check().map_err(DrawError::from);
            self.seen.borrow_mut().push(permit.clone());
            permit?;
        }
        Ok(())
    }
}

#[test]
fn reentrant_draw_is_an_error() {
    let state = RenderingState::new();
    let source = std::rc::Rc::new(GateCheck {
        gate: RefCell::new(None),
        seen: RefCell::new(Vec::new()),
    });
    let view = view(config(), &state);
    view.borrow_mut().set_layout(Point::ZERO, 10, 10);
    *source.gate.borrow_mut() = Some(view.borrow().draw_gate());
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&view, &mut observer, source.clone(), false);

    observer.dispatch_pre_draw();
    observer.dispatch_pre_draw();
    assert_eq!(
        *source.seen.borrow(),
        vec![
            Err(DrawError::Reentrancy(ReentrancyViolation)),
            Err(DrawError::Reentrancy(ReentrancyViolation)),
        ]
    );
    assert_eq!(state.count(), 0);
}
