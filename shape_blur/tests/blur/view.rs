// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use shape_blur::color::palette;
use shape_blur::kurbo::{Point, Rect, Vec2};
use shape_blur::{
    BlurAttributes, BlurConfig, BlurShape, BlurView, CornerRadii, CpuBlur, PixmapCanvas,
    PixmapExt, PreDrawObserver, RenderingState, ShapeKind, StateColors, ViewState,
};

use crate::util::{assert_close, options, premul, render, view, Scene};

fn rounded(radius: f64) -> BlurConfig {
    BlurConfig {
        radius: 10.0,
        down_sample_factor: 4.0,
        shape: BlurShape::Rectangle(CornerRadii::uniform(radius)),
        ..BlurConfig::default()
    }
}

#[test]
fn steady_frames_do_not_reallocate() {
    let state = RenderingState::new();
    let scene = Scene::new(palette::css::RED);
    let view = view(rounded(20.0), &state);
    view.borrow_mut().set_layout(Point::ZERO, 400, 400);
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&view, &mut observer, scene.clone(), false);

    assert!(observer.dispatch_pre_draw());
    {
        let view = view.borrow();
        let pipeline = view.pipeline();
        assert_eq!(pipeline.buffer_size(), Some((100, 100)));
        assert_eq!(pipeline.backend().prepares, vec![((100, 100), 2.5)]);
        assert_eq!(pipeline.effective_params().map(|p| p.radius), Some(2.5));
    }
    assert!(view.borrow_mut().take_invalidation());

    for _ in 0..3 {
        assert!(observer.dispatch_pre_draw());
    }
    let mut view = view.borrow_mut();
    assert!(!view.take_invalidation());
    assert_eq!(view.pipeline().buffers().allocations(), 1);
    assert_eq!(view.pipeline().backend().prepares.len(), 1);
    assert_eq!(view.pipeline().backend().blurs, 4);
    assert_eq!(scene.invalidations.get(), 0);

    let mut canvas = PixmapCanvas::new(400, 400);
    view.draw(&mut canvas).unwrap();
    let red = premul(palette::css::RED);
    assert_close(canvas.pixmap().pixel(200, 200), red);
    assert_close(canvas.pixmap().pixel(399, 200), red);
    // Outside of the rounded corner.
    assert_eq!(canvas.pixmap().pixel(0, 0).a, 0);
    assert_eq!(canvas.pixmap().pixel(399, 399).a, 0);
}

#[test]
fn snapshot_follows_the_view_offset() {
    let state = RenderingState::new();
    let scene = Scene::new(palette::css::BLACK);
    scene.add_rect(Rect::new(0.0, 0.0, 100.0, 100.0), palette::css::LIME);
    scene.origin.set(Point::new(10.0, 20.0));
    let view = view(
        BlurConfig {
            radius: 1.0,
            down_sample_factor: 1.0,
            ..BlurConfig::default()
        },
        &state,
    );
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&view, &mut observer, scene.clone(), false);

    // Screen position (110, 20) is scene position (100, 0): right of the green square.
    view.borrow_mut().set_layout(Point::new(110.0, 20.0), 100, 100);
    observer.dispatch_pre_draw();
    let black = premul(palette::css::BLACK);
    {
        let view = view.borrow();
        let blurred = view.pipeline().blurred().unwrap();
        assert!(blurred.pixmap.data().iter().all(|p| *p == black));
    }

    view.borrow_mut().set_layout(Point::new(60.0, 20.0), 100, 100);
    observer.dispatch_pre_draw();
    let view = view.borrow();
    let blurred = view.pipeline().blurred().unwrap().pixmap;
    let lime = premul(palette::css::LIME);
    assert_eq!(blurred.pixel(0, 50), lime);
    assert_eq!(blurred.pixel(49, 99), lime);
    assert_eq!(blurred.pixel(50, 0), black);
}

#[test]
fn different_root_invalidates() {
    let state = RenderingState::new();
    let scene = Scene::new(palette::css::RED);
    let view = view(rounded(0.0), &state);
    view.borrow_mut().set_layout(Point::ZERO, 40, 40);
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&view, &mut observer, scene.clone(), true);
    assert_eq!(scene.invalidations.get(), 1);

    for _ in 0..3 {
        observer.dispatch_pre_draw();
        assert!(view.borrow_mut().take_invalidation());
    }
}

#[test]
fn detach_releases_everything() {
    let state = RenderingState::new();
    let scene = Scene::new(palette::css::RED);
    let view = view(rounded(0.0), &state);
    view.borrow_mut().set_layout(Point::ZERO, 40, 40);
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&view, &mut observer, scene.clone(), false);
    observer.dispatch_pre_draw();
    assert!(view.borrow().pipeline().buffer_size().is_some());

    BlurView::detach(&view, &mut observer);
    assert!(observer.is_empty());
    let mut view = view.borrow_mut();
    assert!(!view.is_attached());
    assert_eq!(view.pipeline().buffer_size(), None);
    assert!(view.pipeline().backend().releases >= 1);

    // Nothing to draw once detached.
    let mut canvas = PixmapCanvas::new(40, 40);
    view.draw(&mut canvas).unwrap();
    assert!(canvas.pixmap().data().iter().all(|p| p.a == 0));
}

#[test]
fn hidden_view_does_not_snapshot() {
    let state = RenderingState::new();
    let scene = Scene::new(palette::css::RED);
    let view = view(rounded(0.0), &state);
    view.borrow_mut().set_layout(Point::ZERO, 40, 40);
    view.borrow_mut().set_shown(false);
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&view, &mut observer, scene, false);
    assert!(observer.dispatch_pre_draw());
    assert_eq!(view.borrow().pipeline().buffer_size(), None);
    assert_eq!(view.borrow().pipeline().backend().blurs, 0);
}

#[test]
fn zero_radius_draws_nothing() {
    let state = RenderingState::new();
    let scene = Scene::new(palette::css::RED);
    let view = view(rounded(0.0), &state);
    view.borrow_mut().set_layout(Point::ZERO, 40, 40);
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&view, &mut observer, scene, false);
    observer.dispatch_pre_draw();
    view.borrow_mut().set_blur_radius(0.0).unwrap();
    observer.dispatch_pre_draw();

    let mut canvas = PixmapCanvas::new(40, 40);
    view.borrow_mut().draw(&mut canvas).unwrap();
    assert!(canvas.pixmap().data().iter().all(|p| p.a == 0));
}

#[test]
fn circle_with_overlay_from_attributes() {
    let attributes = BlurAttributes {
        overlay_color: Some(0x8000_0000),
        shape: Some(ShapeKind::Circle),
        ..BlurAttributes::default()
    };
    let state = RenderingState::new();
    let scene = Scene::new(palette::css::RED);
    let view = view(attributes.resolve().unwrap(), &state);
    view.borrow_mut().set_layout(Point::ZERO, 100, 100);
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&view, &mut observer, scene, false);
    observer.dispatch_pre_draw();
    assert_eq!(view.borrow().pipeline().buffer_size(), Some((25, 25)));

    let mut canvas = PixmapCanvas::new(100, 100);
    view.borrow_mut().draw(&mut canvas).unwrap();
    let center = canvas.pixmap().pixel(50, 50);
    assert!(center.r.abs_diff(127) <= 2, "{center:?}");
    assert_eq!((center.g, center.b, center.a), (0, 0, 255));
    assert_eq!(canvas.pixmap().pixel(2, 2).a, 0);
}

#[test]
fn border_color_follows_state() {
    let state = RenderingState::new();
    let scene = Scene::new(palette::css::BLACK);
    let config = BlurConfig {
        radius: 4.0,
        down_sample_factor: 2.0,
        shape: BlurShape::Oval,
        border_width: 4.0,
        border_color: StateColors::single(palette::css::WHITE)
            .with_state(ViewState::PRESSED, palette::css::BLUE),
        ..BlurConfig::default()
    };
    let view = view(config, &state);
    view.borrow_mut().set_layout(Point::ZERO, 60, 40);
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&view, &mut observer, scene, false);
    observer.dispatch_pre_draw();
    let mut view = view.borrow_mut();
    view.take_invalidation();

    let mut canvas = PixmapCanvas::new(60, 40);
    view.draw(&mut canvas).unwrap();
    assert_close(canvas.pixmap().pixel(30, 2), premul(palette::css::WHITE));

    view.set_state(ViewState::PRESSED.union(ViewState::ENABLED));
    assert!(view.take_invalidation());
    let mut canvas = PixmapCanvas::new(60, 40);
    view.draw(&mut canvas).unwrap();
    assert_close(canvas.pixmap().pixel(30, 2), premul(palette::css::BLUE));
}

#[test]
fn cpu_backend_in_a_view() {
    let scene = Scene::new(palette::css::BLACK);
    scene.add_rect(Rect::new(0.0, 0.0, 100.0, 200.0), palette::css::WHITE);
    let view = BlurView::with_options(
        BlurConfig {
            radius: 8.0,
            down_sample_factor: 2.0,
            ..BlurConfig::default()
        },
        CpuBlur::new(),
        options(),
    )
    .unwrap()
    .map_pipeline(|pipeline| pipeline.with_rendering_state(RenderingState::new()));
    let view = std::rc::Rc::new(std::cell::RefCell::new(view));
    view.borrow_mut().set_layout(Point::ZERO, 200, 200);
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&view, &mut observer, scene, false);
    observer.dispatch_pre_draw();

    let view = view.borrow();
    let blurred = view.pipeline().blurred().unwrap().pixmap;
    assert_eq!(blurred.size(), (100, 100));
    // Far from the edge the halves keep their colors, across it they mix.
    assert!(blurred.pixel(25, 50).r >= 250);
    assert!(blurred.pixel(75, 50).r <= 5);
    let edge = blurred.pixel(50, 50).r;
    assert!(edge > 30 && edge < 225, "edge value {edge}");
    assert!(blurred.pixel(48, 50).r > blurred.pixel(52, 50).r);
}

#[test]
fn full_frame_renders_blur_in_place() {
    let state = RenderingState::new();
    let scene = Scene::new(palette::css::RED);
    let view = view(rounded(0.0), &state);
    view.borrow_mut().set_layout(Point::new(20.0, 20.0), 40, 40);
    scene.add_blur(&view, Vec2::new(20.0, 20.0));
    scene.add_rect(Rect::new(0.0, 0.0, 10.0, 10.0), palette::css::LIME);
    view.borrow_mut().set_overlay_color(palette::css::BLUE.with_alpha(1.0));
    let mut observer = PreDrawObserver::new();
    BlurView::attach(&view, &mut observer, scene.clone(), false);
    observer.dispatch_pre_draw();

    let frame = render(&scene, 80, 80);
    assert_close(frame.pixel(40, 40), premul(palette::css::BLUE));
    assert_close(frame.pixel(70, 70), premul(palette::css::RED));
    assert_close(frame.pixel(5, 5), premul(palette::css::LIME));
}
