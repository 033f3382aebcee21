// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Protection against a blur view drawing into its own snapshot.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::ReentrancyViolation;

thread_local! {
    static CURRENT: RenderingState = RenderingState::new();
}

/// The number of blur views currently snapshotting their ancestors.
///
/// Cloning gives another handle onto the same counter. Views created with
/// [`ReentrancyGuard::new`] share the render thread's [`current`](Self::current) state.
#[derive(Debug, Clone, Default)]
pub struct RenderingState {
    count: Rc<Cell<usize>>,
}

impl RenderingState {
    /// Create a fresh counter, shared with nobody.
    pub fn new() -> Self {
        Self::default()
    }

    /// The counter shared by every blur view on this thread.
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    /// How many views are snapshotting right now.
    pub fn count(&self) -> usize {
        self.count.get()
    }

    /// Whether `self` and `other` are handles onto the same counter.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.count, &other.count)
    }
}

/// The outcome of [`ReentrancyGuard::check_draw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPermit {
    /// Nothing is snapshotting, draw normally.
    Draw,
    /// Another blur view is snapshotting; draw nothing and report success.
    Skip,
}

/// Per-view snapshot flag, combined with the shared [`RenderingState`].
#[derive(Debug)]
pub struct ReentrancyGuard {
    snapshotting: Rc<Cell<bool>>,
    state: RenderingState,
}

impl Default for ReentrancyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ReentrancyGuard {
    /// A guard sharing this thread's [`RenderingState::current`].
    pub fn new() -> Self {
        Self::with_state(RenderingState::current())
    }

    /// A guard counting into `state`.
    pub fn with_state(state: RenderingState) -> Self {
        Self {
            snapshotting: Rc::new(Cell::new(false)),
            state,
        }
    }

    /// The shared counter.
    pub fn state(&self) -> &RenderingState {
        &self.state
    }

    /// Whether this view is snapshotting.
    pub fn is_snapshotting(&self) -> bool {
        self.snapshotting.get()
    }

    /// Mark this view as snapshotting until the returned scope is dropped.
    pub fn begin_snapshot(&self) -> SnapshotScope<'_> {
        let was_snapshotting = self.snapshotting.replace(true);
        debug_assert!(!was_snapshotting, "snapshot scopes must not nest");
        self.state.count.set(self.state.count.get() + 1);
        SnapshotScope {
            guard: self,
            was_snapshotting,
        }
    }

    /// Decide whether this view may draw.
    pub fn check_draw(&self) -> Result<DrawPermit, ReentrancyViolation> {
        check(&self.snapshotting, &self.state)
    }

    /// A handle which can run [`check_draw`](Self::check_draw) without access to the
    /// guard.
    pub fn gate(&self) -> DrawGate {
        DrawGate {
            snapshotting: self.snapshotting.clone(),
            state: self.state.clone(),
        }
    }
}

fn check(
    snapshotting: &Cell<bool>,
    state: &RenderingState,
) -> Result<DrawPermit, ReentrancyViolation> {
    if snapshotting.get() {
        Err(ReentrancyViolation)
    } else if state.count() > 0 {
        Ok(DrawPermit::Skip)
    } else {
        Ok(DrawPermit::Draw)
    }
}

/// Scope of one snapshot, see [`ReentrancyGuard::begin_snapshot`].
///
/// Dropping the scope clears the flag and decrements the counter, including during
/// unwinding.
#[derive(Debug)]
#[must_use = "the snapshot ends when the scope is dropped"]
pub struct SnapshotScope<'a> {
    guard: &'a ReentrancyGuard,
    was_snapshotting: bool,
}

impl Drop for SnapshotScope<'_> {
    fn drop(&mut self) {
        self.guard.snapshotting.set(self.was_snapshotting);
        let count = &self.guard.state.count;
        count.set(count.get().saturating_sub(1));
    }
}

/// A clonable handle onto a [`ReentrancyGuard`]'s flag and counter.
///
/// Hosts which keep views behind a `RefCell` can check a view while it is borrowed by its
/// own pre-draw handler.
#[derive(Debug, Clone)]
pub struct DrawGate {
    snapshotting: Rc<Cell<bool>>,
    state: RenderingState,
}

impl DrawGate {
    /// Same as [`ReentrancyGuard::check_draw`].
    pub fn check(&self) -> Result<DrawPermit, ReentrancyViolation> {
        check(&self.snapshotting, &self.state)
    }
}
