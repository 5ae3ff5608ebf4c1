// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contact tracker: one physical contact from press to release.
//!
//! ## Usage
//!
//! 1) Create a [`Contact`] from the press event with [`Contact::create`]; it
//!    records the first sample and subscribes to the [`InputSource`].
//! 2) Feed document-level moves and releases into the input source. Events
//!    whose pointer id differs from the contact's are ignored.
//! 3) The release appends an `End` sample, notifies listeners and destroys
//!    the contact, which cancels its subscription.
//!
//! ## Minimal example
//!
//! ```
//! use kurbo::Point;
//! use understory_gesture::contact::{Contact, ContactPhase};
//! use understory_gesture::input::{InputSource, PointerEvent};
//!
//! let input = InputSource::new();
//! let contact = Contact::create(&PointerEvent::touch(1, Point::new(10.0, 10.0), 0.0), &input);
//!
//! input.pointer_move(&PointerEvent::touch(1, Point::new(15.0, 12.0), 16.0));
//! // A different finger does not affect this contact.
//! input.pointer_move(&PointerEvent::touch(2, Point::new(90.0, 90.0), 16.0));
//!
//! assert!(contact.is_moving());
//! assert_eq!(contact.current_point(), Point::new(15.0, 12.0));
//!
//! input.pointer_up(&PointerEvent::touch(1, Point::new(15.0, 12.0), 32.0));
//! assert!(contact.is_destroyed());
//! assert_eq!(contact.path(None).len(), 3);
//! assert_eq!(contact.path(Some(ContactPhase::Move)).len(), 1);
//! ```

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Point;

use crate::input::{InputSource, PointerEvent, PointerId, PointerKind, PointerSink, Subscription};
use crate::listeners::{ListenerId, ListenerRegistry};

/// Lifecycle phase of a single contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContactPhase {
    /// The press.
    Start,
    /// Any movement after the press.
    Move,
    /// The release (or cancellation).
    End,
}

/// One recorded point of a contact's path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactSample {
    /// Position in global coordinates.
    pub point: Point,
    /// Event timestamp in milliseconds.
    pub timestamp: f64,
    /// Phase the sample was recorded in.
    pub phase: ContactPhase,
}

type ContactListener = dyn Fn(&Contact, &ContactSample);
type DestroyHook = Box<dyn FnOnce(&Contact)>;

/// Handle to one tracked contact.
///
/// Cloning yields another handle to the same contact; equality is identity.
#[derive(Clone)]
pub struct Contact {
    inner: Rc<ContactInner>,
}

struct ContactInner {
    pointer: PointerId,
    kind: PointerKind,
    path: RefCell<Vec<ContactSample>>,
    phase: Cell<ContactPhase>,
    moving: Cell<bool>,
    destroyed: Cell<bool>,
    listeners: RefCell<ListenerRegistry<ContactPhase, ContactListener>>,
    subscription: RefCell<Option<Subscription>>,
    on_destroy: RefCell<Option<DestroyHook>>,
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contact")
            .field("pointer", &self.inner.pointer)
            .field("kind", &self.inner.kind)
            .field("phase", &self.inner.phase.get())
            .field("samples", &self.inner.path.borrow().len())
            .field("moving", &self.inner.moving.get())
            .field("destroyed", &self.inner.destroyed.get())
            .finish_non_exhaustive()
    }
}

impl Contact {
    /// Starts tracking a contact from its press event.
    ///
    /// Records the `Start` sample and subscribes to `input` for the moves and
    /// the release of the same pointer.
    #[must_use]
    pub fn create(press: &PointerEvent, input: &InputSource) -> Self {
        let inner = Rc::new(ContactInner {
            pointer: press.pointer,
            kind: press.kind,
            path: RefCell::new(alloc::vec![ContactSample {
                point: press.position,
                timestamp: press.timestamp,
                phase: ContactPhase::Start,
            }]),
            phase: Cell::new(ContactPhase::Start),
            moving: Cell::new(false),
            destroyed: Cell::new(false),
            listeners: RefCell::default(),
            subscription: RefCell::new(None),
            on_destroy: RefCell::new(None),
        });
        let sink = Rc::downgrade(&inner);
        let sink: Weak<dyn PointerSink> = sink;
        *inner.subscription.borrow_mut() = Some(input.subscribe(sink));
        Self { inner }
    }

    /// Pointer identifier captured at the press.
    #[must_use]
    pub fn id(&self) -> PointerId {
        self.inner.pointer
    }

    /// Device kind captured at the press.
    #[must_use]
    pub fn kind(&self) -> PointerKind {
        self.inner.kind
    }

    /// Phase of the latest sample.
    #[must_use]
    pub fn phase(&self) -> ContactPhase {
        self.inner.phase.get()
    }

    /// Returns `true` once a move has been recorded.
    ///
    /// Informational: separates taps from drags.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.inner.moving.get()
    }

    /// Returns `true` after [`Contact::destroy`].
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Subscribes to one phase of this contact. Listeners run in
    /// subscription order.
    pub fn on_phase(
        &self,
        phase: ContactPhase,
        listener: impl Fn(&Self, &ContactSample) + 'static,
    ) -> ListenerId {
        self.inner
            .listeners
            .borrow_mut()
            .add(phase, Rc::new(listener))
    }

    /// Removes one listener, or every listener of `phase` when `id` is `None`.
    pub fn off_phase(&self, phase: ContactPhase, id: Option<ListenerId>) -> bool {
        self.inner.listeners.borrow_mut().remove(phase, id)
    }

    /// The recorded path, optionally filtered to one phase, oldest first.
    #[must_use]
    pub fn path(&self, phase: Option<ContactPhase>) -> Vec<ContactSample> {
        self.inner
            .path
            .borrow()
            .iter()
            .filter(|sample| phase.is_none_or(|phase| sample.phase == phase))
            .copied()
            .collect()
    }

    /// The latest sample, optionally of one phase.
    #[must_use]
    pub fn last_sample(&self, phase: Option<ContactPhase>) -> Option<ContactSample> {
        self.inner
            .path
            .borrow()
            .iter()
            .rev()
            .find(|sample| phase.is_none_or(|phase| sample.phase == phase))
            .copied()
    }

    /// Point of the press.
    #[must_use]
    pub fn start_point(&self) -> Point {
        self.inner.path.borrow()[0].point
    }

    /// Point of the latest sample.
    #[must_use]
    pub fn current_point(&self) -> Point {
        self.last_sample(None)
            .map_or_else(|| self.start_point(), |sample| sample.point)
    }

    /// Installs the hook run once when the contact is destroyed.
    pub(crate) fn set_on_destroy(&self, hook: impl FnOnce(&Self) + 'static) {
        *self.inner.on_destroy.borrow_mut() = Some(Box::new(hook));
    }

    /// Stops tracking: cancels the input subscription, runs the destroy hook
    /// and drops all listeners. Calling it again does nothing.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        drop(self.inner.subscription.borrow_mut().take());
        let hook = self.inner.on_destroy.borrow_mut().take();
        if let Some(hook) = hook {
            hook(self);
        }
        self.inner.listeners.borrow_mut().clear();
        self.inner.moving.set(false);
    }

    fn record(&self, event: &PointerEvent, phase: ContactPhase) -> ContactSample {
        let sample = ContactSample {
            point: event.position,
            timestamp: event.timestamp,
            phase,
        };
        self.inner.path.borrow_mut().push(sample);
        self.inner.phase.set(phase);
        tracing::trace!(
            pointer = ?self.inner.pointer,
            ?phase,
            x = sample.point.x,
            y = sample.point.y,
            "contact sample"
        );
        sample
    }

    fn dispatch(&self, phase: ContactPhase, sample: &ContactSample) {
        let listeners = self.inner.listeners.borrow().snapshot(phase);
        for listener in listeners {
            listener(self, sample);
        }
    }

    fn accepts(&self, event: &PointerEvent) -> bool {
        !self.is_destroyed() && event.pointer == self.inner.pointer
    }
}

impl PointerSink for ContactInner {
    fn pointer_moved(self: Rc<Self>, event: &PointerEvent) {
        let contact = Contact { inner: self };
        if !contact.accepts(event) {
            return;
        }
        let sample = contact.record(event, ContactPhase::Move);
        contact.inner.moving.set(true);
        contact.dispatch(ContactPhase::Move, &sample);
    }

    fn pointer_released(self: Rc<Self>, event: &PointerEvent) {
        let contact = Contact { inner: self };
        if !contact.accepts(event) {
            return;
        }
        let sample = contact.record(event, ContactPhase::End);
        contact.dispatch(ContactPhase::End, &sample);
        contact.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn touch(id: u64, x: f64, y: f64, t: f64) -> PointerEvent {
        PointerEvent::touch(id, Point::new(x, y), t)
    }

    #[test]
    fn press_records_start_sample_and_subscribes() {
        let input = InputSource::new();
        let contact = Contact::create(&touch(4, 1.0, 2.0, 5.0), &input);

        assert_eq!(contact.id(), PointerId(4));
        assert_eq!(contact.phase(), ContactPhase::Start);
        assert!(!contact.is_moving());
        assert_eq!(
            contact.last_sample(None),
            Some(ContactSample {
                point: Point::new(1.0, 2.0),
                timestamp: 5.0,
                phase: ContactPhase::Start,
            })
        );
        assert_eq!(input.subscription_count(), 1);
    }

    #[test]
    fn listeners_see_their_own_phase_in_order() {
        let input = InputSource::new();
        let contact = Contact::create(&touch(1, 0.0, 0.0, 0.0), &input);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = seen.clone();
        contact.on_phase(ContactPhase::Move, move |_, s| log.borrow_mut().push(("a", s.phase)));
        let log = seen.clone();
        contact.on_phase(ContactPhase::Move, move |_, s| log.borrow_mut().push(("b", s.phase)));
        let log = seen.clone();
        contact.on_phase(ContactPhase::End, move |c, s| {
            // Listeners run before the contact tears itself down.
            assert!(!c.is_destroyed());
            log.borrow_mut().push(("end", s.phase));
        });

        input.pointer_move(&touch(1, 3.0, 0.0, 10.0));
        input.pointer_up(&touch(1, 3.0, 0.0, 20.0));

        assert_eq!(
            *seen.borrow(),
            vec![
                ("a", ContactPhase::Move),
                ("b", ContactPhase::Move),
                ("end", ContactPhase::End),
            ]
        );
    }

    #[test]
    fn foreign_pointer_events_are_ignored() {
        let input = InputSource::new();
        let contact = Contact::create(&touch(1, 0.0, 0.0, 0.0), &input);

        input.pointer_move(&touch(2, 9.0, 9.0, 1.0));
        input.pointer_up(&touch(2, 9.0, 9.0, 2.0));

        assert!(!contact.is_destroyed());
        assert!(!contact.is_moving());
        assert_eq!(contact.path(None).len(), 1);
    }

    #[test]
    fn release_destroys_and_unsubscribes() {
        let input = InputSource::new();
        let contact = Contact::create(&PointerEvent::mouse(Point::ZERO, 0.0), &input);
        let destroyed = Rc::new(Cell::new(0));
        let count = destroyed.clone();
        contact.set_on_destroy(move |_| count.set(count.get() + 1));

        input.pointer_up(&PointerEvent::mouse(Point::new(1.0, 1.0), 5.0));

        assert!(contact.is_destroyed());
        assert_eq!(destroyed.get(), 1);
        assert_eq!(input.subscription_count(), 0);
        assert_eq!(contact.phase(), ContactPhase::End);
    }

    #[test]
    fn events_after_destroy_are_ignored() {
        let input = InputSource::new();
        let contact = Contact::create(&touch(1, 0.0, 0.0, 0.0), &input);
        contact.destroy();

        input.pointer_move(&touch(1, 5.0, 5.0, 1.0));
        input.pointer_up(&touch(1, 5.0, 5.0, 2.0));

        assert_eq!(contact.path(None).len(), 1);
        assert_eq!(contact.current_point(), Point::ZERO);
    }

    #[test]
    fn destroy_twice_is_a_no_op() {
        let input = InputSource::new();
        let contact = Contact::create(&touch(1, 0.0, 0.0, 0.0), &input);
        let destroyed = Rc::new(Cell::new(0));
        let count = destroyed.clone();
        contact.set_on_destroy(move |_| count.set(count.get() + 1));

        contact.destroy();
        contact.destroy();

        assert_eq!(destroyed.get(), 1);
        assert!(contact.is_destroyed());
    }

    #[test]
    fn moving_flag_is_informational() {
        let input = InputSource::new();
        let tap = Contact::create(&touch(1, 0.0, 0.0, 0.0), &input);
        let drag = Contact::create(&touch(2, 0.0, 0.0, 0.0), &input);

        input.pointer_move(&touch(2, 4.0, 0.0, 1.0));

        assert!(!tap.is_moving());
        assert!(drag.is_moving());
        assert_eq!(drag.last_sample(Some(ContactPhase::Start)).unwrap().point, Point::ZERO);
        assert_eq!(tap.last_sample(Some(ContactPhase::Move)), None);
    }
}
