// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composite session: one master session fanned out to several recognizers.
//!
//! The master owns the contacts. Every member recognizer is attached in
//! passive mode to the same element and is driven with the master's phase
//! and contact set:
//!
//! - `Start`, `End` and `AllEnd` reach every member.
//! - `Move` reaches every member, except that with a single contact and a
//!   [`Drag`] member present only the drag member moves. One finger then
//!   translates without also rotating or scaling.
//!
//! Members keep their own pose history, so with inertia enabled each member
//! continues only its own axis.
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//!
//! use kurbo::{Point, Size};
//! use understory_gesture::codec::StyledElement;
//! use understory_gesture::composite::Composite;
//! use understory_gesture::frame::ManualFrameClock;
//! use understory_gesture::input::{InputSource, PointerEvent};
//! use understory_gesture::{GestureHost, GestureKind, SessionOptions};
//!
//! let input = InputSource::new();
//! let host = GestureHost::new(input.clone(), Rc::new(ManualFrameClock::new()));
//! let element = Rc::new(RefCell::new(StyledElement::new(0.0, 0.0, Size::new(100.0, 100.0))));
//! let composite = Composite::attach(
//!     element.clone(),
//!     &host,
//!     SessionOptions::default(),
//!     &[GestureKind::Drag, GestureKind::Rotate, GestureKind::Scale],
//! );
//!
//! // Pinch out: the two contacts end twice as far apart.
//! composite.handle_press(&PointerEvent::touch(1, Point::new(40.0, 50.0), 0.0));
//! composite.handle_press(&PointerEvent::touch(2, Point::new(60.0, 50.0), 0.0));
//! input.pointer_move(&PointerEvent::touch(1, Point::new(30.0, 50.0), 16.0));
//! input.pointer_move(&PointerEvent::touch(2, Point::new(70.0, 50.0), 16.0));
//!
//! assert_eq!(element.borrow().transform, "rotate(0deg) scale(2)");
//! assert_eq!(element.borrow().left, 0.0);
//! ```

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::compose::GestureKind;
use crate::contact::Contact;
use crate::element::GestureElement;
use crate::host::GestureHost;
use crate::input::PointerEvent;
use crate::listeners::ListenerId;
use crate::recognizer::{Drag, Recognizer, Rotate, Scale};
use crate::session::{ContactLimit, GestureSession, Phase, SessionOptions};

type Members<E> = Rc<[(GestureKind, Box<dyn Recognizer<E>>)]>;

/// A master session routing into one recognizer per requested gesture.
pub struct Composite<E> {
    master: GestureSession<E>,
    members: Members<E>,
}

impl<E> fmt::Debug for Composite<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("master", &self.master)
            .field(
                "members",
                &self.members.iter().map(|(kind, _)| kind).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<E: GestureElement + 'static> Composite<E> {
    /// Attaches a master session and one member per distinct entry of
    /// `kinds`.
    ///
    /// The master accepts any number of contacts and never runs inertia
    /// itself; `options.inertial` applies to the members. Members are always
    /// passive.
    pub fn attach(
        element: Rc<RefCell<E>>,
        host: &GestureHost,
        options: SessionOptions<E>,
        kinds: &[GestureKind],
    ) -> Self {
        let master = GestureSession::attach(
            element.clone(),
            host,
            options
                .clone()
                .with_max_contacts(ContactLimit::Unbounded)
                .with_inertial(false),
        );

        let mut members: Vec<(GestureKind, Box<dyn Recognizer<E>>)> = Vec::new();
        for &kind in kinds {
            if members.iter().any(|(existing, _)| *existing == kind) {
                continue;
            }
            let member_options = options.clone().with_passive(true);
            let element = element.clone();
            let member: Box<dyn Recognizer<E>> = match kind {
                GestureKind::Drag => Box::new(Drag::attach(element, host, member_options)),
                GestureKind::Rotate => Box::new(Rotate::attach(element, host, member_options)),
                GestureKind::Scale => Box::new(Scale::attach(element, host, member_options)),
            };
            members.push((kind, member));
        }
        let members: Members<E> = members.into();

        for phase in [Phase::Start, Phase::Move, Phase::End, Phase::AllEnd] {
            let members = members.clone();
            master.add_event_listener(phase, move |contacts| route(&members, phase, contacts));
        }
        tracing::debug!(members = members.len(), "composite attached");

        Self { master, members }
    }

    /// Offers a press to the master session.
    pub fn handle_press(&self, press: &PointerEvent) -> bool {
        self.master.handle_press(press)
    }

    /// Subscribes to a phase of the master session.
    pub fn add_event_listener(
        &self,
        phase: Phase,
        listener: impl Fn(&[Contact]) + 'static,
    ) -> ListenerId {
        self.master.add_event_listener(phase, listener)
    }

    /// Removes a master listener, or all listeners of `phase` when `id` is
    /// `None`.
    ///
    /// The routing listeners are registered first, so clearing a whole phase
    /// also stops routing it.
    pub fn remove_event_listener(&self, phase: Phase, id: Option<ListenerId>) -> bool {
        self.master.remove_event_listener(phase, id)
    }

    /// Enables or disables the master and every member.
    pub fn set_enabled(&self, enabled: bool) {
        self.master.set_enabled(enabled);
        for (_, member) in self.members.iter() {
            member.session().set_enabled(enabled);
        }
    }

    /// Switches the master's press handling off (`true`) or on (`false`).
    pub fn set_passive(&self, passive: bool) {
        self.master.set_passive(passive);
    }

    /// Detaches the master and every member.
    pub fn detach(&self) {
        self.master.detach();
        for (_, member) in self.members.iter() {
            member.session().detach();
        }
    }

    /// The master session.
    #[must_use]
    pub fn master(&self) -> &GestureSession<E> {
        &self.master
    }

    /// The member recognizers, in request order.
    pub fn members(&self) -> impl Iterator<Item = (GestureKind, &dyn Recognizer<E>)> + '_ {
        self.members
            .iter()
            .map(|(kind, member)| (*kind, member.as_ref()))
    }

    /// The member for `kind`, if it was requested.
    #[must_use]
    pub fn member(&self, kind: GestureKind) -> Option<&dyn Recognizer<E>> {
        self.members()
            .find(|(member_kind, _)| *member_kind == kind)
            .map(|(_, member)| member)
    }
}

fn route<E: GestureElement + 'static>(members: &Members<E>, phase: Phase, contacts: &[Contact]) {
    let drag_only = phase == Phase::Move
        && contacts.len() <= 1
        && members.iter().any(|(kind, _)| *kind == GestureKind::Drag);
    for (kind, member) in members.iter() {
        if drag_only && *kind != GestureKind::Drag {
            continue;
        }
        member.session().drive(phase, contacts);
    }
}
