// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gesture session: the interaction state of one element across all of its
//! concurrent contacts.
//!
//! ## Lifecycle
//!
//! `Start → Move ⇄ Move → End → (Inertial → InertialEnd)? → AllEnd`
//!
//! - A press delivered through [`GestureSession::handle_press`] admits a new
//!   [`Contact`] (up to [`SessionOptions::max_contacts`]), records a `Start`
//!   pose record and fires `Start` with the whole contact set.
//! - Every move of any owned contact fires `Move`, again with the whole set,
//!   so listeners recompute geometry from all contacts each time.
//! - A release fires `End` while the ending contact is still in the set. When
//!   the set drops to empty, `AllEnd` fires exactly once.
//! - With [`SessionOptions::inertial`], an `End` continues the last throw
//!   along each changed axis (see [`crate::inertia`]), writing poses in the
//!   `Inertial` phase once per frame until `InertialEnd`. A new press
//!   interrupts the tail.
//!
//! Passive sessions ignore presses and are driven with
//! [`GestureSession::drive`]; the composite session uses this seam to route
//! one master session into its members.
//!
//! Sessions never hold a borrow across a listener call, so listeners may
//! freely call back into the session (write poses, add listeners, trigger).

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::{Point, Rect};

use crate::contact::{Contact, ContactPhase};
use crate::element::GestureElement;
use crate::host::GestureHost;
use crate::inertia::{AxisSet, Deceleration, InertialMotion};
use crate::input::{PointerButton, PointerEvent, PointerKind};
use crate::listeners::{ListenerId, ListenerRegistry};
use crate::pose::{Pose, PoseHistory, PoseRecord, PoseUpdate};

/// Phase of a gesture session, also used to key session events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// A contact was admitted.
    Start,
    /// An owned contact moved.
    Move,
    /// An owned contact was released.
    End,
    /// An inertial frame was written.
    Inertial,
    /// The inertial tail stopped.
    InertialEnd,
    /// The last owned contact was released.
    AllEnd,
}

/// How many contacts a session may own at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContactLimit {
    /// At most this many.
    Bounded(usize),
    /// No limit.
    Unbounded,
}

impl Default for ContactLimit {
    fn default() -> Self {
        Self::Bounded(1)
    }
}

impl ContactLimit {
    /// Maps a signed count; any negative value means unbounded.
    #[must_use]
    pub fn from_count(count: i64) -> Self {
        usize::try_from(count).map_or(Self::Unbounded, Self::Bounded)
    }

    /// Returns `true` if one more contact fits next to `active` ones.
    #[must_use]
    pub fn admits(self, active: usize) -> bool {
        match self {
            Self::Bounded(max) => active < max,
            Self::Unbounded => true,
        }
    }
}

/// Pose read override.
pub type GetPoseFn<E> = Rc<dyn Fn(&E) -> Pose>;
/// Pose write override.
pub type SetPoseFn<E> = Rc<dyn Fn(&mut E, &PoseUpdate)>;

type SessionListener = dyn Fn(&[Contact]);

/// Construction options of a [`GestureSession`].
pub struct SessionOptions<E> {
    /// Contact capacity. Defaults to one.
    pub max_contacts: ContactLimit,
    /// Continue throws with an inertial tail after `End`.
    pub inertial: bool,
    /// Ignore presses; the session is driven with [`GestureSession::drive`].
    pub passive: bool,
    /// Axes an inertial tail may continue.
    pub inertial_axes: AxisSet,
    /// Inertial deceleration constants.
    pub deceleration: Deceleration,
    /// Replaces [`GestureElement::pose`] for reads.
    pub get_pose: Option<GetPoseFn<E>>,
    /// Replaces [`GestureElement::apply_pose`] for writes.
    pub set_pose: Option<SetPoseFn<E>>,
    /// Receives the `End` write instead of the normal write path.
    ///
    /// In-flight writes can then be a cheap preview while the expensive
    /// commit happens once at gesture end.
    pub set_pose_on_end: Option<SetPoseFn<E>>,
}

impl<E> Default for SessionOptions<E> {
    fn default() -> Self {
        Self {
            max_contacts: ContactLimit::default(),
            inertial: false,
            passive: false,
            inertial_axes: AxisSet::all(),
            deceleration: Deceleration::default(),
            get_pose: None,
            set_pose: None,
            set_pose_on_end: None,
        }
    }
}

impl<E> Clone for SessionOptions<E> {
    fn clone(&self) -> Self {
        Self {
            max_contacts: self.max_contacts,
            inertial: self.inertial,
            passive: self.passive,
            inertial_axes: self.inertial_axes,
            deceleration: self.deceleration,
            get_pose: self.get_pose.clone(),
            set_pose: self.set_pose.clone(),
            set_pose_on_end: self.set_pose_on_end.clone(),
        }
    }
}

impl<E> fmt::Debug for SessionOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("max_contacts", &self.max_contacts)
            .field("inertial", &self.inertial)
            .field("passive", &self.passive)
            .field("inertial_axes", &self.inertial_axes)
            .field("deceleration", &self.deceleration)
            .field("get_pose", &self.get_pose.is_some())
            .field("set_pose", &self.set_pose.is_some())
            .field("set_pose_on_end", &self.set_pose_on_end.is_some())
            .finish()
    }
}

impl<E> SessionOptions<E> {
    /// Sets the contact capacity.
    #[must_use]
    pub fn with_max_contacts(mut self, limit: ContactLimit) -> Self {
        self.max_contacts = limit;
        self
    }

    /// Enables or disables inertial tails.
    #[must_use]
    pub fn with_inertial(mut self, inertial: bool) -> Self {
        self.inertial = inertial;
        self
    }

    /// Makes the session passive.
    #[must_use]
    pub fn with_passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    /// Restricts the axes inertia may continue.
    #[must_use]
    pub fn with_inertial_axes(mut self, axes: AxisSet) -> Self {
        self.inertial_axes = axes;
        self
    }

    /// Sets the deceleration constants.
    #[must_use]
    pub fn with_deceleration(mut self, deceleration: Deceleration) -> Self {
        self.deceleration = deceleration;
        self
    }

    /// Overrides pose reads.
    #[must_use]
    pub fn with_get_pose(mut self, get_pose: impl Fn(&E) -> Pose + 'static) -> Self {
        self.get_pose = Some(Rc::new(get_pose));
        self
    }

    /// Overrides pose writes.
    #[must_use]
    pub fn with_set_pose(mut self, set_pose: impl Fn(&mut E, &PoseUpdate) + 'static) -> Self {
        self.set_pose = Some(Rc::new(set_pose));
        self
    }

    /// Routes `End` writes to `set_pose_on_end`.
    #[must_use]
    pub fn with_set_pose_on_end(
        mut self,
        set_pose_on_end: impl Fn(&mut E, &PoseUpdate) + 'static,
    ) -> Self {
        self.set_pose_on_end = Some(Rc::new(set_pose_on_end));
        self
    }
}

struct SessionInner<E> {
    element: Rc<RefCell<E>>,
    host: GestureHost,
    options: SessionOptions<E>,
    contacts: RefCell<Vec<Contact>>,
    history: RefCell<PoseHistory>,
    listeners: RefCell<ListenerRegistry<Phase, SessionListener>>,
    phase: Cell<Phase>,
    enabled: Cell<bool>,
    passive: Cell<bool>,
    attached: Cell<bool>,
    inertia_generation: Cell<u64>,
    inertia_running: Cell<bool>,
}

/// Interaction state of one element.
///
/// Cloning yields another handle to the same session.
pub struct GestureSession<E> {
    inner: Rc<SessionInner<E>>,
}

impl<E> Clone for GestureSession<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> fmt::Debug for GestureSession<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;
        f.debug_struct("GestureSession")
            .field("phase", &inner.phase.get())
            .field("contacts", &inner.contacts.borrow().len())
            .field("records", &inner.history.borrow().len())
            .field("enabled", &inner.enabled.get())
            .field("passive", &inner.passive.get())
            .field("attached", &inner.attached.get())
            .field("inertia_running", &inner.inertia_running.get())
            .field("options", &inner.options)
            .finish_non_exhaustive()
    }
}

/// Non-owning handle to a [`GestureSession`].
pub struct WeakSession<E> {
    inner: Weak<SessionInner<E>>,
}

impl<E> Clone for WeakSession<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> fmt::Debug for WeakSession<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSession")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

impl<E> WeakSession<E> {
    /// Returns the session if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<GestureSession<E>> {
        self.inner.upgrade().map(|inner| GestureSession { inner })
    }
}

impl<E: GestureElement + 'static> GestureSession<E> {
    /// Attaches a session to `element`.
    ///
    /// Unless [`SessionOptions::passive`] is set, the session then accepts
    /// presses through [`GestureSession::handle_press`].
    pub fn attach(element: Rc<RefCell<E>>, host: &GestureHost, options: SessionOptions<E>) -> Self {
        let passive = options.passive;
        Self {
            inner: Rc::new(SessionInner {
                element,
                host: host.clone(),
                options,
                contacts: RefCell::default(),
                history: RefCell::default(),
                listeners: RefCell::default(),
                phase: Cell::new(Phase::End),
                enabled: Cell::new(true),
                passive: Cell::new(passive),
                attached: Cell::new(true),
                inertia_generation: Cell::new(0),
                inertia_running: Cell::new(false),
            }),
        }
    }

    /// Returns a non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakSession<E> {
        WeakSession {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Offers a press that hit the element.
    ///
    /// Returns `true` if a contact was admitted. Presses are ignored when the
    /// session is detached, disabled or passive, for non-primary mouse
    /// buttons, for a pointer that is already active, and at capacity.
    pub fn handle_press(&self, press: &PointerEvent) -> bool {
        let inner = &self.inner;
        if !inner.attached.get() || !inner.enabled.get() || inner.passive.get() {
            return false;
        }
        if press.kind == PointerKind::Mouse && press.button != PointerButton::Primary {
            return false;
        }
        let active = {
            let contacts = inner.contacts.borrow();
            if contacts.iter().any(|contact| contact.id() == press.pointer) {
                return false;
            }
            contacts.len()
        };
        if !inner.options.max_contacts.admits(active) {
            tracing::debug!(
                pointer = ?press.pointer,
                active,
                limit = ?inner.options.max_contacts,
                "press rejected at contact limit"
            );
            return false;
        }

        self.cancel_inertia();
        if active == 0 {
            inner.history.borrow_mut().clear();
        }
        let pose = self.pose();
        inner.history.borrow_mut().push(PoseRecord {
            pose,
            phase: Phase::Start,
            time: press.timestamp,
        });

        let contact = Contact::create(press, inner.host.input());
        let weak = self.downgrade();
        {
            let weak = weak.clone();
            contact.on_phase(ContactPhase::Move, move |_, _| {
                if let Some(session) = weak.upgrade() {
                    session.contact_moved();
                }
            });
        }
        {
            let weak = weak.clone();
            contact.on_phase(ContactPhase::End, move |_, _| {
                if let Some(session) = weak.upgrade() {
                    session.contact_ended();
                }
            });
        }
        contact.set_on_destroy(move |contact| {
            if let Some(session) = weak.upgrade() {
                session.release_contact(contact);
            }
        });
        inner.contacts.borrow_mut().push(contact);
        tracing::debug!(pointer = ?press.pointer, active = active + 1, "contact admitted");

        inner.phase.set(Phase::Start);
        self.trigger(Phase::Start, None);
        true
    }

    fn contact_moved(&self) {
        self.inner.phase.set(Phase::Move);
        self.trigger(Phase::Move, None);
    }

    fn contact_ended(&self) {
        self.trigger(Phase::End, None);
        self.settle_end();
    }

    /// Moves to `End` after an `End` dispatch, starting a tail when enabled.
    ///
    /// A tail still running from an earlier `End` keeps going untouched.
    fn settle_end(&self) {
        let inner = &self.inner;
        if inner.inertia_running.get() {
            return;
        }
        inner.phase.set(Phase::End);
        if inner.options.inertial {
            self.begin_inertia();
        }
    }

    fn release_contact(&self, contact: &Contact) {
        let remaining = {
            let mut contacts = self.inner.contacts.borrow_mut();
            let Some(index) = contacts.iter().position(|owned| owned == contact) else {
                return;
            };
            contacts.remove(index);
            contacts.len()
        };
        tracing::debug!(pointer = ?contact.id(), remaining, "contact released");
        if remaining == 0 && self.inner.attached.get() {
            if !self.inner.inertia_running.get() {
                self.inner.phase.set(Phase::AllEnd);
            }
            self.trigger(Phase::AllEnd, None);
        }
    }

    /// Starts an inertial tail from the last two `Move` records.
    ///
    /// Returns `false` if there are fewer than two `Move` records since the
    /// latest `Start`, an earlier tail already continued them, or none of the
    /// allowed axes changed between them.
    pub fn begin_inertia(&self) -> bool {
        let inner = &self.inner;
        let motion = {
            let history = inner.history.borrow();
            let Some((before, last)) = history.pending_throw() else {
                return false;
            };
            InertialMotion::from_records(
                before,
                last,
                inner.options.inertial_axes,
                &inner.options.deceleration,
            )
        };
        let Some(motion) = motion else {
            return false;
        };

        let generation = inner.inertia_generation.get() + 1;
        inner.inertia_generation.set(generation);
        inner.inertia_running.set(true);
        inner.phase.set(Phase::Inertial);
        tracing::debug!(
            duration = motion.duration(),
            axes = ?motion.axes(),
            speeds = ?motion.speeds().collect::<Vec<_>>(),
            "inertia started"
        );
        let start = inner.host.clock().now();
        self.schedule_inertia_frame(Rc::new(motion), start, generation);
        true
    }

    fn schedule_inertia_frame(&self, motion: Rc<InertialMotion>, start: f64, generation: u64) {
        let weak = self.downgrade();
        self.inner
            .host
            .clock()
            .request_frame(Box::new(move |now| {
                if let Some(session) = weak.upgrade() {
                    session.inertia_frame(motion, start, generation, now);
                }
            }));
    }

    fn inertia_frame(&self, motion: Rc<InertialMotion>, start: f64, generation: u64, now: f64) {
        let inner = &self.inner;
        if inner.inertia_generation.get() != generation || !inner.inertia_running.get() {
            return;
        }
        if matches!(inner.phase.get(), Phase::Start | Phase::Move) {
            tracing::debug!("inertia interrupted");
            inner.inertia_running.set(false);
            return;
        }

        let elapsed = now - start;
        if motion.is_finished(elapsed) {
            inner.inertia_running.set(false);
            self.set_pose(&motion.sample(motion.duration()), Some(Phase::Inertial));
            inner.phase.set(Phase::InertialEnd);
            tracing::debug!(elapsed, "inertia finished");
            self.trigger(Phase::InertialEnd, None);
            if inner.phase.get() == Phase::InertialEnd && inner.contacts.borrow().is_empty() {
                inner.phase.set(Phase::AllEnd);
            }
            return;
        }

        let update = motion.sample(elapsed);
        tracing::trace!(elapsed, ?update, "inertia frame");
        self.set_pose(&update, Some(Phase::Inertial));
        self.trigger(Phase::Inertial, None);
        self.schedule_inertia_frame(motion, start, generation);
    }

    /// Stops a running inertial tail without firing `InertialEnd`.
    pub fn cancel_inertia(&self) {
        let inner = &self.inner;
        if inner.inertia_running.replace(false) {
            inner
                .inertia_generation
                .set(inner.inertia_generation.get() + 1);
            tracing::debug!("inertia cancelled");
        }
    }

    /// Returns `true` while an inertial tail is running.
    #[must_use]
    pub fn is_inertia_running(&self) -> bool {
        self.inner.inertia_running.get()
    }

    /// Writes a partial pose.
    ///
    /// With `Some(Phase::End)` and a [`SessionOptions::set_pose_on_end`] hook,
    /// only the hook runs. Otherwise the write goes through
    /// [`SessionOptions::set_pose`] or [`GestureElement::apply_pose`], and a
    /// phase other than `End` appends a pose record holding the full pose
    /// after the write.
    pub fn set_pose(&self, update: &PoseUpdate, phase: Option<Phase>) {
        let inner = &self.inner;
        if phase == Some(Phase::End) {
            if let Some(on_end) = &inner.options.set_pose_on_end {
                on_end(&mut *inner.element.borrow_mut(), update);
                return;
            }
        }
        {
            let mut element = inner.element.borrow_mut();
            match &inner.options.set_pose {
                Some(set_pose) => set_pose(&mut *element, update),
                None => element.apply_pose(update),
            }
        }
        if let Some(phase) = phase.filter(|phase| *phase != Phase::End) {
            let pose = self.pose().merged(update);
            let time = inner.host.clock().now();
            tracing::trace!(?phase, time, "pose recorded");
            inner
                .history
                .borrow_mut()
                .push(PoseRecord { pose, phase, time });
        }
    }

    /// Reads the current pose.
    #[must_use]
    pub fn pose(&self) -> Pose {
        let element = self.inner.element.borrow();
        match &self.inner.options.get_pose {
            Some(get_pose) => get_pose(&*element),
            None => element.pose(),
        }
    }

    /// Bounding rect of the element in global coordinates.
    #[must_use]
    pub fn bounding_rect(&self) -> Rect {
        self.inner.element.borrow().bounding_rect()
    }

    /// The pose with position and size taken from the global bounding rect.
    #[must_use]
    pub fn global_pose(&self) -> Pose {
        let rect = self.bounding_rect();
        Pose {
            position: Point::new(rect.x0, rect.y0),
            width: rect.width(),
            height: rect.height(),
            ..self.pose()
        }
    }

    /// Subscribes to a session phase. Listeners run in subscription order
    /// and receive the current contact set.
    pub fn add_event_listener(
        &self,
        phase: Phase,
        listener: impl Fn(&[Contact]) + 'static,
    ) -> ListenerId {
        self.inner
            .listeners
            .borrow_mut()
            .add(phase, Rc::new(listener))
    }

    /// Removes one listener, or every listener of `phase` when `id` is `None`.
    pub fn remove_event_listener(&self, phase: Phase, id: Option<ListenerId>) -> bool {
        self.inner.listeners.borrow_mut().remove(phase, id)
    }

    /// Number of listeners subscribed to `phase`.
    #[must_use]
    pub fn listener_count(&self, phase: Phase) -> usize {
        self.inner.listeners.borrow().count(phase)
    }

    /// Fires the listeners of `phase` with `contacts`, or with the session's
    /// own contacts when `None`. Does nothing while disabled.
    pub fn trigger(&self, phase: Phase, contacts: Option<&[Contact]>) {
        if !self.inner.enabled.get() {
            return;
        }
        let contacts = match contacts {
            Some(contacts) => contacts.to_vec(),
            None => self.contacts(),
        };
        let listeners = self.inner.listeners.borrow().snapshot(phase);
        for listener in listeners {
            listener(&contacts);
        }
    }

    /// Drives the session from outside, as if its own contacts had produced
    /// `phase`.
    ///
    /// `Start` interrupts inertia and records a `Start` pose (clearing the
    /// history first when `contacts` holds at most one contact); `End`
    /// starts an inertial tail when enabled. Does nothing while disabled.
    pub fn drive(&self, phase: Phase, contacts: &[Contact]) {
        let inner = &self.inner;
        if !inner.enabled.get() {
            return;
        }
        match phase {
            Phase::Start => {
                self.cancel_inertia();
                if contacts.len() <= 1 {
                    inner.history.borrow_mut().clear();
                }
                let pose = self.pose();
                let time = inner.host.clock().now();
                inner.history.borrow_mut().push(PoseRecord {
                    pose,
                    phase: Phase::Start,
                    time,
                });
                inner.phase.set(Phase::Start);
                self.trigger(Phase::Start, Some(contacts));
            }
            Phase::End => {
                self.trigger(Phase::End, Some(contacts));
                self.settle_end();
            }
            Phase::AllEnd => {
                if !inner.inertia_running.get() {
                    inner.phase.set(Phase::AllEnd);
                }
                self.trigger(Phase::AllEnd, Some(contacts));
            }
            Phase::Move | Phase::Inertial | Phase::InertialEnd => {
                inner.phase.set(phase);
                self.trigger(phase, Some(contacts));
            }
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    /// Overrides the current phase.
    pub fn set_phase(&self, phase: Phase) {
        self.inner.phase.set(phase);
    }

    /// Snapshot of the owned contacts, in admission order.
    #[must_use]
    pub fn contacts(&self) -> Vec<Contact> {
        self.inner.contacts.borrow().clone()
    }

    /// Number of owned contacts.
    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.inner.contacts.borrow().len()
    }

    /// Copy of the pose history, oldest first.
    #[must_use]
    pub fn pose_records(&self) -> Vec<PoseRecord> {
        self.inner.history.borrow().records().to_vec()
    }

    /// Enables or disables the session. A disabled session ignores presses
    /// and suppresses every trigger.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.set(enabled);
    }

    /// Shorthand for `set_enabled(false)`.
    pub fn set_disabled(&self) {
        self.set_enabled(false);
    }

    /// Returns `true` unless disabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    /// Switches press handling off (`true`) or on (`false`).
    pub fn set_passive(&self, passive: bool) {
        self.inner.passive.set(passive);
    }

    /// Returns `true` if presses are ignored.
    #[must_use]
    pub fn is_passive(&self) -> bool {
        self.inner.passive.get()
    }

    /// Returns `true` until [`GestureSession::detach`].
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.attached.get()
    }

    /// The element this session drives.
    #[must_use]
    pub fn element(&self) -> &Rc<RefCell<E>> {
        &self.inner.element
    }

    /// The host capabilities this session uses.
    #[must_use]
    pub fn host(&self) -> &GestureHost {
        &self.inner.host
    }

    /// The options the session was attached with.
    #[must_use]
    pub fn options(&self) -> &SessionOptions<E> {
        &self.inner.options
    }

    /// Tears the session down: destroys all contacts without firing
    /// `AllEnd`, cancels inertia, drops listeners and history, and stops
    /// accepting presses.
    pub fn detach(&self) {
        let inner = &self.inner;
        if !inner.attached.replace(false) {
            return;
        }
        self.cancel_inertia();
        let contacts = core::mem::take(&mut *inner.contacts.borrow_mut());
        for contact in &contacts {
            contact.destroy();
        }
        inner.listeners.borrow_mut().clear();
        inner.history.borrow_mut().clear();
        inner.phase.set(Phase::End);
        tracing::debug!(destroyed = contacts.len(), "session detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StyledElement;
    use crate::frame::ManualFrameClock;
    use crate::input::InputSource;
    use alloc::vec;
    use kurbo::Size;

    struct Rig {
        session: GestureSession<StyledElement>,
        input: InputSource,
        clock: Rc<ManualFrameClock>,
    }

    fn rig(options: SessionOptions<StyledElement>) -> Rig {
        let input = InputSource::new();
        let clock = Rc::new(ManualFrameClock::new());
        let host = GestureHost::new(input.clone(), clock.clone());
        let element = Rc::new(RefCell::new(StyledElement::new(0.0, 0.0, Size::new(100.0, 100.0))));
        Rig {
            session: GestureSession::attach(element, &host, options),
            input,
            clock,
        }
    }

    fn touch(id: u64, x: f64, y: f64) -> PointerEvent {
        PointerEvent::touch(id, Point::new(x, y), 0.0)
    }

    fn log_phases(session: &GestureSession<StyledElement>) -> Rc<RefCell<Vec<(Phase, usize)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for phase in [
            Phase::Start,
            Phase::Move,
            Phase::End,
            Phase::Inertial,
            Phase::InertialEnd,
            Phase::AllEnd,
        ] {
            let log = log.clone();
            session.add_event_listener(phase, move |contacts| {
                log.borrow_mut().push((phase, contacts.len()));
            });
        }
        log
    }

    #[test]
    fn press_move_release_fires_full_lifecycle() {
        let rig = rig(SessionOptions::default());
        let log = log_phases(&rig.session);

        assert!(rig.session.handle_press(&touch(1, 10.0, 10.0)));
        assert_eq!(rig.session.phase(), Phase::Start);
        rig.input.pointer_move(&touch(1, 12.0, 10.0));
        assert_eq!(rig.session.phase(), Phase::Move);
        rig.input.pointer_up(&touch(1, 12.0, 10.0));

        assert_eq!(
            *log.borrow(),
            vec![
                (Phase::Start, 1),
                (Phase::Move, 1),
                (Phase::End, 1),
                (Phase::AllEnd, 0),
            ]
        );
        assert_eq!(rig.session.phase(), Phase::AllEnd);
        assert_eq!(rig.session.contact_count(), 0);
        assert_eq!(rig.input.subscription_count(), 0);
    }

    #[test]
    fn contact_limit_is_enforced() {
        let rig = rig(SessionOptions::default().with_max_contacts(ContactLimit::Bounded(2)));
        assert!(rig.session.handle_press(&touch(1, 0.0, 0.0)));
        assert!(rig.session.handle_press(&touch(2, 0.0, 0.0)));
        assert!(!rig.session.handle_press(&touch(3, 0.0, 0.0)));
        assert_eq!(rig.session.contact_count(), 2);

        rig.input.pointer_up(&touch(1, 0.0, 0.0));
        assert!(rig.session.handle_press(&touch(3, 0.0, 0.0)));
        assert_eq!(rig.session.contact_count(), 2);
    }

    #[test]
    fn zero_limit_admits_nothing_and_negative_is_unbounded() {
        assert!(!ContactLimit::Bounded(0).admits(0));
        assert_eq!(ContactLimit::from_count(-1), ContactLimit::Unbounded);
        assert_eq!(ContactLimit::from_count(3), ContactLimit::Bounded(3));
        assert!(ContactLimit::Unbounded.admits(usize::MAX - 1));
    }

    #[test]
    fn duplicate_pointer_and_secondary_button_are_ignored() {
        let rig = rig(SessionOptions::default().with_max_contacts(ContactLimit::Unbounded));
        assert!(rig.session.handle_press(&touch(1, 0.0, 0.0)));
        assert!(!rig.session.handle_press(&touch(1, 5.0, 0.0)));
        let right = PointerEvent::mouse(Point::ZERO, 0.0).with_button(PointerButton::Secondary);
        assert!(!rig.session.handle_press(&right));
        assert_eq!(rig.session.contact_count(), 1);
    }

    #[test]
    fn disabled_session_swallows_presses_and_triggers() {
        let rig = rig(SessionOptions::default());
        let log = log_phases(&rig.session);
        rig.session.set_disabled();

        assert!(!rig.session.handle_press(&touch(1, 0.0, 0.0)));
        rig.session.trigger(Phase::Move, None);
        assert!(log.borrow().is_empty());

        rig.session.set_enabled(true);
        rig.session.trigger(Phase::Move, Some(&[]));
        assert_eq!(*log.borrow(), vec![(Phase::Move, 0)]);
    }

    #[test]
    fn passive_session_ignores_presses_but_can_be_driven() {
        let rig = rig(SessionOptions::default().with_passive(true));
        let log = log_phases(&rig.session);
        assert!(!rig.session.handle_press(&touch(1, 0.0, 0.0)));

        rig.session.drive(Phase::Start, &[]);
        assert_eq!(rig.session.phase(), Phase::Start);
        assert_eq!(rig.session.pose_records().len(), 1);

        rig.session.set_passive(false);
        assert!(rig.session.handle_press(&touch(1, 0.0, 0.0)));
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn set_pose_records_full_pose_after_partial_write() {
        let rig = rig(SessionOptions::default());
        rig.clock.set_now(42.0);
        rig.session.set_pose(
            &PoseUpdate::default().with_position(Point::new(5.0, 6.0)),
            Some(Phase::Move),
        );
        let records = rig.session.pose_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pose.position, Point::new(5.0, 6.0));
        assert_eq!(records[0].pose.scale, Some(1.0));
        assert_eq!(records[0].pose.width, 100.0);
        assert_eq!(records[0].time, 42.0);

        // Untagged writes are not recorded.
        rig.session
            .set_pose(&PoseUpdate::default().with_rotation(3.0), None);
        assert_eq!(rig.session.pose_records().len(), 1);
        assert_eq!(rig.session.pose().rotation, Some(3.0));
    }

    #[test]
    fn end_writes_go_to_the_end_hook_when_present() {
        let committed = Rc::new(RefCell::new(Vec::new()));
        let sink = committed.clone();
        let rig = rig(SessionOptions::default().with_set_pose_on_end(move |_, update: &PoseUpdate| {
            sink.borrow_mut().push(update.clone());
        }));
        let update = PoseUpdate::default().with_position(Point::new(9.0, 9.0));

        rig.session.set_pose(&update, Some(Phase::End));
        assert_eq!(*committed.borrow(), vec![update]);
        assert_eq!(rig.session.pose().position, Point::ZERO);
        assert!(rig.session.pose_records().is_empty());
    }

    #[test]
    fn end_writes_fall_through_without_hook() {
        let rig = rig(SessionOptions::default());
        rig.session.set_pose(
            &PoseUpdate::default().with_position(Point::new(9.0, 9.0)),
            Some(Phase::End),
        );
        assert_eq!(rig.session.pose().position, Point::new(9.0, 9.0));
        assert!(rig.session.pose_records().is_empty());
    }

    #[test]
    fn overrides_replace_element_reads_and_writes() {
        let writes = Rc::new(Cell::new(0));
        let count = writes.clone();
        let rig = rig(
            SessionOptions::default()
                .with_get_pose(|_| Pose::default().with_scale(7.0))
                .with_set_pose(move |_, _| count.set(count.get() + 1)),
        );
        rig.session
            .set_pose(&PoseUpdate::default().with_scale(2.0), None);
        assert_eq!(writes.get(), 1);
        assert_eq!(rig.session.pose().scale, Some(7.0));
        assert_eq!(rig.session.element().borrow().transform, "");
    }

    #[test]
    fn global_pose_uses_bounding_rect() {
        let rig = rig(SessionOptions::default());
        rig.session.element().borrow_mut().origin = Point::new(100.0, 50.0);
        rig.session
            .set_pose(&PoseUpdate::default().with_scale(2.0), None);
        let global = rig.session.global_pose();
        assert_eq!(global.position, Point::new(50.0, 0.0));
        assert_eq!(global.size(), Size::new(200.0, 200.0));
        assert_eq!(global.scale, Some(2.0));
    }

    #[test]
    fn listener_can_be_removed_by_id_or_phase() {
        let rig = rig(SessionOptions::default());
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = rig
            .session
            .add_event_listener(Phase::Move, move |_| h.set(h.get() + 1));
        let h = hits.clone();
        rig.session
            .add_event_listener(Phase::Move, move |_| h.set(h.get() + 10));

        assert!(rig.session.remove_event_listener(Phase::Move, Some(id)));
        rig.session.trigger(Phase::Move, None);
        assert_eq!(hits.get(), 10);

        assert!(rig.session.remove_event_listener(Phase::Move, None));
        assert_eq!(rig.session.listener_count(Phase::Move), 0);
    }

    #[test]
    fn inertia_runs_to_inertial_end_then_settles() {
        let rig = rig(SessionOptions::default().with_inertial(true));
        let log = log_phases(&rig.session);
        let session = rig.session.clone();
        rig.session.add_event_listener(Phase::Move, move |contacts| {
            let delta = contacts[0].current_point() - contacts[0].start_point();
            session.set_pose(
                &PoseUpdate::default().with_position(delta.to_point()),
                Some(Phase::Move),
            );
        });

        rig.session.handle_press(&touch(1, 0.0, 0.0));
        rig.clock.set_now(10.0);
        rig.input.pointer_move(&touch(1, 10.0, 0.0));
        rig.clock.set_now(20.0);
        rig.input.pointer_move(&touch(1, 20.0, 0.0));
        rig.input.pointer_up(&touch(1, 20.0, 0.0));

        assert!(rig.session.is_inertia_running());
        assert_eq!(rig.session.phase(), Phase::Inertial);
        // AllEnd fires on release even though the tail keeps running.
        assert!(log.borrow().contains(&(Phase::AllEnd, 0)));

        let frames = rig.clock.run_until_idle(16.0, 1000);
        assert!(frames > 1);
        assert!(!rig.session.is_inertia_running());
        assert_eq!(rig.session.phase(), Phase::AllEnd);
        let last = *log.borrow().last().unwrap();
        assert_eq!(last, (Phase::InertialEnd, 0));

        // 1 px/ms at 0.007 px/ms² travels 1/0.014 px past the release point.
        let x = rig.session.pose().position.x;
        assert!((x - (20.0 + 1.0 / 0.014)).abs() < 1e-6);
    }

    #[test]
    fn new_press_interrupts_inertia() {
        let rig = rig(SessionOptions::default().with_inertial(true));
        let session = rig.session.clone();
        rig.session.add_event_listener(Phase::Move, move |contacts| {
            let delta = contacts[0].current_point() - contacts[0].start_point();
            session.set_pose(
                &PoseUpdate::default().with_position(delta.to_point()),
                Some(Phase::Move),
            );
        });
        let inertial_ends = Rc::new(Cell::new(0));
        let ends = inertial_ends.clone();
        rig.session
            .add_event_listener(Phase::InertialEnd, move |_| ends.set(ends.get() + 1));

        rig.session.handle_press(&touch(1, 0.0, 0.0));
        rig.clock.set_now(10.0);
        rig.input.pointer_move(&touch(1, 10.0, 0.0));
        rig.clock.set_now(20.0);
        rig.input.pointer_move(&touch(1, 20.0, 0.0));
        rig.input.pointer_up(&touch(1, 20.0, 0.0));
        rig.clock.advance(16.0);
        rig.clock.run_frame();
        assert!(rig.session.is_inertia_running());

        assert!(rig.session.handle_press(&touch(2, 50.0, 50.0)));
        assert!(!rig.session.is_inertia_running());
        let x = rig.session.pose().position.x;
        rig.clock.run_until_idle(16.0, 1000);
        assert_eq!(rig.session.pose().position.x, x);
        assert_eq!(inertial_ends.get(), 0);
    }

    #[test]
    fn detach_destroys_contacts_without_all_end() {
        let rig = rig(SessionOptions::default().with_max_contacts(ContactLimit::Unbounded));
        let log = log_phases(&rig.session);
        rig.session.handle_press(&touch(1, 0.0, 0.0));
        rig.session.handle_press(&touch(2, 0.0, 0.0));
        let contacts = rig.session.contacts();

        rig.session.detach();
        assert!(contacts.iter().all(Contact::is_destroyed));
        assert_eq!(rig.input.subscription_count(), 0);
        assert_eq!(rig.session.listener_count(Phase::Start), 0);
        assert!(!rig.session.handle_press(&touch(3, 0.0, 0.0)));
        assert!(!log.borrow().iter().any(|(phase, _)| *phase == Phase::AllEnd));
    }
}
