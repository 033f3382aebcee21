// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A tiny retained scene to host blur views in.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use shape_blur::color::PremulRgba8;
use shape_blur::kurbo::{Point, Rect, Vec2};
use shape_blur::peniko::Color;
use shape_blur::{
    BackendError, BlurBackend, BlurConfig, BlurView, Canvas, DrawError, DrawGate, DrawPermit,
    PipelineOptions, Pixmap, PixmapCanvas, PixmapExt, RenderingState, SnapshotSource,
};

/// A backend which copies instead of blurring, so that pixels stay predictable.
#[derive(Debug, Default)]
pub(crate) struct CopyBackend {
    pub(crate) prepares: Vec<((u16, u16), f32)>,
    pub(crate) blurs: usize,
    pub(crate) releases: usize,
}

impl BlurBackend for CopyBackend {
    fn prepare(&mut self, buffer: &Pixmap, radius: f32) -> Result<(), BackendError> {
        self.prepares.push((buffer.size(), radius));
        Ok(())
    }

    fn blur(&mut self, input: &Pixmap, output: &mut Pixmap) -> Result<(), BackendError> {
        self.blurs += 1;
        output.data_mut().copy_from_slice(input.data());
        Ok(())
    }

    fn release(&mut self) {
        self.releases += 1;
    }
}

pub(crate) type TestView = BlurView<CopyBackend>;

pub(crate) fn options() -> PipelineOptions {
    PipelineOptions {
        escalate_backend_errors: false,
        ..PipelineOptions::default()
    }
}

/// A view with its own rendering state, so tests don't observe each other.
pub(crate) fn view(config: BlurConfig, state: &RenderingState) -> Rc<RefCell<TestView>> {
    let state = state.clone();
    let view = BlurView::with_options(config, CopyBackend::default(), options())
        .unwrap()
        .map_pipeline(|pipeline| pipeline.with_rendering_state(state));
    Rc::new(RefCell::new(view))
}

pub(crate) fn premul(color: Color) -> PremulRgba8 {
    color.premultiply().to_rgba8()
}

/// Compare pixels which went through image sampling or antialiasing.
#[track_caller]
pub(crate) fn assert_close(actual: PremulRgba8, expected: PremulRgba8) {
    let near = |a: u8, b: u8| a.abs_diff(b) <= 2;
    assert!(
        near(actual.r, expected.r)
            && near(actual.g, expected.g)
            && near(actual.b, expected.b)
            && near(actual.a, expected.a),
        "{actual:?} is not close to {expected:?}"
    );
}

pub(crate) enum Child {
    /// A rectangle in scene coordinates.
    Rect(Rect, Color),
    /// A blur view placed at an offset from the scene origin.
    Blur {
        gate: DrawGate,
        view: Weak<RefCell<TestView>>,
        offset: Vec2,
    },
}

/// A scene root that draws a background and its children in order.
pub(crate) struct Scene {
    pub(crate) origin: Cell<Point>,
    pub(crate) background: Color,
    pub(crate) children: RefCell<Vec<Child>>,
    pub(crate) invalidations: Cell<usize>,
    pub(crate) skipped: Cell<usize>,
}

impl Scene {
    pub(crate) fn new(background: Color) -> Rc<Self> {
        Rc::new(Self {
            origin: Cell::new(Point::ZERO),
            background,
            children: RefCell::new(Vec::new()),
            invalidations: Cell::new(0),
            skipped: Cell::new(0),
        })
    }

    pub(crate) fn add_rect(&self, rect: Rect, color: Color) {
        self.children.borrow_mut().push(Child::Rect(rect, color));
    }

    pub(crate) fn add_blur(&self, view: &Rc<RefCell<TestView>>, offset: Vec2) {
        let gate = view.borrow().draw_gate();
        self.children.borrow_mut().push(Child::Blur {
            gate,
            view: Rc::downgrade(view),
            offset,
        });
    }
}

impl SnapshotSource for Scene {
    fn origin_on_screen(&self) -> Point {
        self.origin.get()
    }

    fn draw_background(&self, canvas: &mut dyn Canvas) -> Result<(), DrawError> {
        canvas.fill_rect(Rect::new(-1e4, -1e4, 1e4, 1e4), &self.background.into())
    }

    fn draw(&self, canvas: &mut dyn Canvas) -> Result<(), DrawError> {
        for child in self.children.borrow().iter() {
            match child {
                Child::Rect(rect, color) => canvas.fill_rect(*rect, &(*color).into())?,
                Child::Blur { gate, view, offset } => {
                    if gate.check()? == DrawPermit::Skip {
                        self.skipped.set(self.skipped.get() + 1);
                        continue;
                    }
                    let Some(view) = view.upgrade() else {
                        continue;
                    };
                    let mark = canvas.save();
                    canvas.translate(offset.x, offset.y);
                    let drawn = view.borrow_mut().draw(canvas);
                    canvas.restore_to_count(mark);
                    drawn?;
                }
            }
        }
        Ok(())
    }

    fn invalidate(&self) {
        self.invalidations.set(self.invalidations.get() + 1);
    }
}

/// Draw a full frame of `scene` into a new pixmap.
pub(crate) fn render(scene: &Scene, width: u16, height: u16) -> Pixmap {
    let mut canvas = PixmapCanvas::new(width, height);
    scene.draw_background(&mut canvas).unwrap();
    scene.draw(&mut canvas).unwrap();
    canvas.into_pixmap()
}
