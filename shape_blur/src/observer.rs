// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The "about to draw a frame" notification.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::debug;

/// Reacts to the host being about to draw a frame.
pub trait PreDrawListener {
    /// Called once per frame before anything is drawn. Returning `false` asks the host to
    /// skip the frame.
    fn on_pre_draw(&mut self) -> bool;
}

/// Identifies a registration with a [`PreDrawObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Dispatches pre-draw notifications to registered listeners.
///
/// Listeners are held weakly; dropped listeners are forgotten on the next dispatch.
#[derive(Default)]
pub struct PreDrawObserver {
    listeners: Vec<(ListenerId, Weak<RefCell<dyn PreDrawListener>>)>,
    next_id: u64,
}

impl core::fmt::Debug for PreDrawObserver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PreDrawObserver")
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl PreDrawObserver {
    /// Create an observer without listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`.
    pub fn add_listener<L: PreDrawListener + 'static>(
        &mut self,
        listener: &Rc<RefCell<L>>,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        let weak = Rc::downgrade(listener);
        let weak: Weak<RefCell<dyn PreDrawListener>> = weak;
        self.listeners.push((id, weak));
        id
    }

    /// Unregister a listener. Returns whether it was registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(other, _)| *other != id);
        self.listeners.len() != before
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.listeners
            .iter()
            .filter(|(_, listener)| listener.strong_count() > 0)
            .count()
    }

    /// Whether no live listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify every listener. Returns `false` if any listener asked to skip the frame.
    ///
    /// A listener which is already borrowed (because the notification was triggered from
    /// inside it) is skipped.
    pub fn dispatch_pre_draw(&mut self) -> bool {
        self.listeners
            .retain(|(_, listener)| listener.strong_count() > 0);
        let mut proceed = true;
        for (id, listener) in &self.listeners {
            let Some(listener) = listener.upgrade() else {
                continue;
            };
            let Ok(mut listener) = listener.try_borrow_mut() else {
                debug!("Skipping pre-draw listener {id:?}, it is already running");
                continue;
            };
            proceed &= listener.on_pre_draw();
        }
        proceed
    }
}
