// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer events and the document-level input source contacts subscribe to.
//!
//! A press is delivered to a session by the host's element-level hit testing
//! (see [`GestureSession::handle_press`](crate::GestureSession::handle_press)).
//! Every later move or release for that pointer may happen anywhere, so the
//! host feeds all of them into one [`InputSource`], which fans them out to the
//! contacts currently subscribed. Each contact owns its [`Subscription`] and
//! drops it when it is destroyed.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use kurbo::Point;
use smallvec::SmallVec;

/// Identifier of one pointer (mouse, touch point or pen).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u64);

impl PointerId {
    /// The synthetic identifier shared by every mouse contact.
    ///
    /// Only one mouse contact can be active at a time.
    pub const MOUSE: Self = Self(u64::MAX);
}

/// Kind of device that produced a pointer event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// Mouse.
    #[default]
    Mouse,
    /// Touch point.
    Touch,
    /// Pen or stylus.
    Pen,
}

/// Button associated with a press.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// Primary (usually left) button, or a touch/pen contact.
    #[default]
    Primary,
    /// Secondary (usually right) button.
    Secondary,
    /// Auxiliary (usually middle) button.
    Auxiliary,
    /// Any other button, by platform index.
    Other(u16),
}

/// One raw pointer event in global (viewport) coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    /// Pointer identifier.
    pub pointer: PointerId,
    /// Device kind.
    pub kind: PointerKind,
    /// Button for presses; [`PointerButton::Primary`] otherwise.
    pub button: PointerButton,
    /// Position in global coordinates.
    pub position: Point,
    /// Host timestamp in milliseconds.
    pub timestamp: f64,
}

impl PointerEvent {
    /// A primary-button mouse event.
    #[must_use]
    pub fn mouse(position: Point, timestamp: f64) -> Self {
        Self {
            pointer: PointerId::MOUSE,
            kind: PointerKind::Mouse,
            button: PointerButton::Primary,
            position,
            timestamp,
        }
    }

    /// A touch event for the platform-assigned touch `id`.
    #[must_use]
    pub fn touch(id: u64, position: Point, timestamp: f64) -> Self {
        Self {
            pointer: PointerId(id),
            kind: PointerKind::Touch,
            button: PointerButton::Primary,
            position,
            timestamp,
        }
    }

    /// A pen event for the platform-assigned pointer `id`.
    #[must_use]
    pub fn pen(id: u64, position: Point, timestamp: f64) -> Self {
        Self {
            kind: PointerKind::Pen,
            ..Self::touch(id, position, timestamp)
        }
    }

    /// Returns a copy with a different button.
    #[must_use]
    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }
}

/// Receiver of document-level pointer events.
pub(crate) trait PointerSink {
    fn pointer_moved(self: Rc<Self>, event: &PointerEvent);
    fn pointer_released(self: Rc<Self>, event: &PointerEvent);
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    sinks: Vec<(u64, Weak<dyn PointerSink>)>,
}

/// Document-level pointer event fan-out.
///
/// Cloning an `InputSource` yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct InputSource {
    registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSource")
            .field("subscriptions", &self.subscription_count())
            .finish_non_exhaustive()
    }
}

impl InputSource {
    /// Creates an input source with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a move to every subscribed contact.
    pub fn pointer_move(&self, event: &PointerEvent) {
        for sink in self.live_sinks() {
            sink.pointer_moved(event);
        }
    }

    /// Delivers a release to every subscribed contact.
    pub fn pointer_up(&self, event: &PointerEvent) {
        for sink in self.live_sinks() {
            sink.pointer_released(event);
        }
    }

    /// Delivers a cancellation; contacts treat it exactly like a release.
    pub fn pointer_cancel(&self, event: &PointerEvent) {
        self.pointer_up(event);
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.registry.borrow().sinks.len()
    }

    pub(crate) fn subscribe(&self, sink: Weak<dyn PointerSink>) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.sinks.push((id, sink));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    // Upgraded before dispatch so sinks may (un)subscribe while handling.
    fn live_sinks(&self) -> SmallVec<[Rc<dyn PointerSink>; 4]> {
        self.registry
            .borrow()
            .sinks
            .iter()
            .filter_map(|(_, sink)| sink.upgrade())
            .collect()
    }
}

/// Registration of one contact with an [`InputSource`].
///
/// Cancelled explicitly by [`Subscription::cancel`] or when dropped.
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// Removes the registration; later events are no longer delivered.
    pub fn cancel(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().sinks.retain(|(id, _)| *id != self.id);
        }
        self.registry = Weak::new();
    }

    /// Returns `true` until cancelled (or the input source is gone).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.borrow().sinks.iter().any(|(id, _)| *id == self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct Counter {
        moves: Cell<u32>,
        ups: Cell<u32>,
    }

    impl PointerSink for Counter {
        fn pointer_moved(self: Rc<Self>, _: &PointerEvent) {
            self.moves.set(self.moves.get() + 1);
        }
        fn pointer_released(self: Rc<Self>, _: &PointerEvent) {
            self.ups.set(self.ups.get() + 1);
        }
    }

    fn counter() -> Rc<Counter> {
        Rc::new(Counter {
            moves: Cell::new(0),
            ups: Cell::new(0),
        })
    }

    #[test]
    fn events_reach_subscribers_until_cancelled() {
        let input = InputSource::new();
        let sink = counter();
        let weak = Rc::downgrade(&sink);
        let weak: Weak<dyn PointerSink> = weak;
        let mut sub = input.subscribe(weak);
        let ev = PointerEvent::mouse(Point::new(1.0, 1.0), 0.0);

        input.pointer_move(&ev);
        input.pointer_cancel(&ev);
        assert_eq!(sink.moves.get(), 1);
        assert_eq!(sink.ups.get(), 1);
        assert!(sub.is_active());

        sub.cancel();
        input.pointer_move(&ev);
        assert_eq!(sink.moves.get(), 1);
        assert!(!sub.is_active());
        assert_eq!(input.subscription_count(), 0);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let input = InputSource::new();
        let sink = counter();
        let weak = Rc::downgrade(&sink);
        let weak: Weak<dyn PointerSink> = weak;
        {
            let _sub = input.subscribe(weak);
            assert_eq!(input.subscription_count(), 1);
        }
        assert_eq!(input.subscription_count(), 0);
    }

    #[test]
    fn dead_sinks_are_skipped() {
        let input = InputSource::new();
        let sink = counter();
        let weak = Rc::downgrade(&sink);
        let weak: Weak<dyn PointerSink> = weak;
        let _sub = input.subscribe(weak);
        drop(sink);
        input.pointer_move(&PointerEvent::touch(3, Point::ZERO, 0.0));
    }

    #[test]
    fn mouse_events_share_one_id() {
        let a = PointerEvent::mouse(Point::ZERO, 0.0);
        let b = PointerEvent::mouse(Point::new(5.0, 5.0), 1.0);
        assert_eq!(a.pointer, b.pointer);
        assert_eq!(PointerEvent::pen(7, Point::ZERO, 0.0).pointer, PointerId(7));
    }
}
