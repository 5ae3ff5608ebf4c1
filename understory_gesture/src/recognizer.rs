// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-purpose recognizers built on a [`GestureSession`].
//!
//! Each recognizer owns a session configured for its gesture and listens to
//! its phases:
//!
//! - `Start` snapshots an anchor: the pose, the global center of the element
//!   and the position of every contact. A new contact joining mid-gesture
//!   takes a fresh snapshot, so adding a finger never makes the element jump.
//! - `Move` recomputes the recognizer's axis from the anchor and the current
//!   contacts and writes it in the `Move` phase.
//! - `End` commits the last written value in the `End` phase, which reaches
//!   [`SessionOptions::set_pose_on_end`] when one is configured.
//! - `InertialEnd` commits the settled pose through the same hook.
//!
//! | Recognizer    | Contacts  | Axis               |
//! |---------------|-----------|--------------------|
//! | [`Drag`]      | unbounded | position           |
//! | [`Rotate`]    | 2         | rotation           |
//! | [`Scale`]     | 2         | scale              |
//! | [`Transform`] | unbounded | all, via [`compose`](crate::compose) |
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//!
//! use kurbo::{Point, Size};
//! use understory_gesture::codec::StyledElement;
//! use understory_gesture::frame::ManualFrameClock;
//! use understory_gesture::input::{InputSource, PointerEvent};
//! use understory_gesture::recognizer::{Drag, Recognizer};
//! use understory_gesture::{GestureHost, SessionOptions};
//!
//! let input = InputSource::new();
//! let host = GestureHost::new(input.clone(), Rc::new(ManualFrameClock::new()));
//! let element = Rc::new(RefCell::new(StyledElement::new(0.0, 0.0, Size::new(100.0, 100.0))));
//! let drag = Drag::attach(element.clone(), &host, SessionOptions::default());
//!
//! drag.session().handle_press(&PointerEvent::mouse(Point::new(50.0, 50.0), 0.0));
//! input.pointer_move(&PointerEvent::mouse(Point::new(60.0, 50.0), 16.0));
//! input.pointer_up(&PointerEvent::mouse(Point::new(60.0, 50.0), 32.0));
//!
//! assert_eq!(element.borrow().left, 10.0);
//! assert_eq!(element.borrow().top, 0.0);
//! ```

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use kurbo::{Point, Vec2};
use smallvec::SmallVec;

use crate::compose::{ComposeOptions, TouchFrame, keep_touches_relative};
use crate::contact::Contact;
use crate::element::GestureElement;
use crate::host::GestureHost;
use crate::inertia::AxisSet;
use crate::input::PointerId;
use crate::pose::{Pose, PoseUpdate, angle_about, pair_angle, pair_distance, wrap_degrees};
use crate::session::{ContactLimit, GestureSession, Phase, SessionOptions};

/// A gesture strategy driving one session.
pub trait Recognizer<E>: fmt::Debug {
    /// The session this recognizer listens to and writes through.
    fn session(&self) -> &GestureSession<E>;

    /// Pose axes this recognizer writes.
    fn axes(&self) -> AxisSet;
}

type Points = SmallVec<[Point; 4]>;

/// Pose and contact positions captured at the latest `Start`.
#[derive(Clone, Debug, Default)]
struct Anchor {
    pose: Pose,
    center: Point,
    points: SmallVec<[(PointerId, Point); 4]>,
}

impl Anchor {
    fn capture<E: GestureElement + 'static>(
        session: &GestureSession<E>,
        contacts: &[Contact],
    ) -> Self {
        Self {
            pose: session.pose(),
            center: session.bounding_rect().center(),
            points: contacts
                .iter()
                .map(|contact| (contact.id(), contact.current_point()))
                .collect(),
        }
    }

    /// Start and current points of the contacts present in both the anchor
    /// and `contacts`, in contact order.
    fn matched(&self, contacts: &[Contact]) -> (Points, Points) {
        contacts
            .iter()
            .filter_map(|contact| {
                self.points
                    .iter()
                    .find(|(id, _)| *id == contact.id())
                    .map(|(_, start)| (*start, contact.current_point()))
            })
            .unzip()
    }
}

#[derive(Debug, Default)]
struct Tracking {
    anchor: Anchor,
    last: Option<PoseUpdate>,
    complete: bool,
}

fn listen<E, S>(
    session: &GestureSession<E>,
    state: &Rc<S>,
    phase: Phase,
    handler: fn(&GestureSession<E>, &S, &[Contact]),
) where
    E: GestureElement + 'static,
    S: 'static,
{
    let weak = session.downgrade();
    let state = state.clone();
    session.add_event_listener(phase, move |contacts| {
        if let Some(session) = weak.upgrade() {
            handler(&session, &state, contacts);
        }
    });
}

fn write<E: GestureElement + 'static>(
    session: &GestureSession<E>,
    tracking: &RefCell<Tracking>,
    update: PoseUpdate,
) {
    session.set_pose(&update, Some(Phase::Move));
    tracking.borrow_mut().last = Some(update);
}

fn commit_last<E: GestureElement + 'static>(
    session: &GestureSession<E>,
    tracking: &RefCell<Tracking>,
) {
    let last = tracking.borrow_mut().last.take();
    if let Some(last) = last {
        session.set_pose(&last, Some(Phase::End));
    }
}

/// Hands the settled pose to the end hook, if there is one.
fn commit_settled<E: GestureElement + 'static>(session: &GestureSession<E>, axes: AxisSet) {
    if session.options().set_pose_on_end.is_none() {
        return;
    }
    let pose = session.pose();
    let mut update = PoseUpdate::default();
    if axes.contains(AxisSet::POSITION) {
        update.position = Some(pose.position);
    }
    if axes.contains(AxisSet::ROTATION) {
        update.rotation = pose.rotation;
    }
    if axes.contains(AxisSet::SCALE) {
        update.scale = pose.scale;
    }
    session.set_pose(&update, Some(Phase::End));
}

fn restart<E: GestureElement + 'static>(
    session: &GestureSession<E>,
    tracking: &RefCell<Tracking>,
    contacts: &[Contact],
) {
    let anchor = Anchor::capture(session, contacts);
    let mut tracking = tracking.borrow_mut();
    tracking.anchor = anchor;
    tracking.last = None;
    tracking.complete = false;
}

macro_rules! recognizer_debug {
    ($name:ident) => {
        impl<E> fmt::Debug for $name<E> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("session", &self.session)
                    .finish()
            }
        }
    };
}

/// Translation by the average displacement of the contacts.
///
/// Once any contact ends, the drag stops following the others until the
/// next press.
pub struct Drag<E> {
    session: GestureSession<E>,
}

recognizer_debug!(Drag);

impl<E: GestureElement + 'static> Drag<E> {
    /// Attaches a drag recognizer. The contact limit is lifted and inertia,
    /// if enabled, only continues the position.
    pub fn attach(element: Rc<RefCell<E>>, host: &GestureHost, options: SessionOptions<E>) -> Self {
        let options = options
            .with_max_contacts(ContactLimit::Unbounded)
            .with_inertial_axes(AxisSet::POSITION);
        let session = GestureSession::attach(element, host, options);
        let tracking = Rc::new(RefCell::new(Tracking::default()));
        listen(&session, &tracking, Phase::Start, |session, tracking, contacts| {
            restart(session, tracking, contacts);
        });
        listen(&session, &tracking, Phase::Move, Self::moved);
        listen(&session, &tracking, Phase::End, |session, tracking, _| {
            commit_last(session, tracking);
            tracking.borrow_mut().complete = true;
        });
        listen(&session, &tracking, Phase::InertialEnd, |session, _, _| {
            commit_settled(session, AxisSet::POSITION);
        });
        Self { session }
    }

    fn moved(session: &GestureSession<E>, tracking: &RefCell<Tracking>, contacts: &[Contact]) {
        let update = {
            let tracking = tracking.borrow();
            if tracking.complete {
                return;
            }
            let (start, current) = tracking.anchor.matched(contacts);
            if start.is_empty() {
                return;
            }
            let total = start
                .iter()
                .zip(&current)
                .fold(Vec2::ZERO, |sum, (s, c)| sum + (*c - *s));
            let shift = total / start.len() as f64;
            PoseUpdate::default().with_position(tracking.anchor.pose.position + shift)
        };
        write(session, tracking, update);
    }
}

impl<E> Recognizer<E> for Drag<E> {
    fn session(&self) -> &GestureSession<E> {
        &self.session
    }

    fn axes(&self) -> AxisSet {
        AxisSet::POSITION
    }
}

/// Rotation by one contact around the element center, or by the pair angle
/// of two contacts.
pub struct Rotate<E> {
    session: GestureSession<E>,
}

recognizer_debug!(Rotate);

impl<E: GestureElement + 'static> Rotate<E> {
    /// Attaches a rotate recognizer limited to two contacts. Inertia, if
    /// enabled, only continues the rotation.
    pub fn attach(element: Rc<RefCell<E>>, host: &GestureHost, options: SessionOptions<E>) -> Self {
        let options = options
            .with_max_contacts(ContactLimit::Bounded(2))
            .with_inertial_axes(AxisSet::ROTATION);
        let session = GestureSession::attach(element, host, options);
        let tracking = Rc::new(RefCell::new(Tracking::default()));
        listen(&session, &tracking, Phase::Start, |session, tracking, contacts| {
            if session.phase() == Phase::Start {
                restart(session, tracking, contacts);
            }
        });
        listen(&session, &tracking, Phase::Move, Self::moved);
        listen(&session, &tracking, Phase::Inertial, Self::moved);
        listen(&session, &tracking, Phase::End, |session, tracking, _| {
            commit_last(session, tracking);
        });
        listen(&session, &tracking, Phase::InertialEnd, |session, _, _| {
            commit_settled(session, AxisSet::ROTATION);
        });
        Self { session }
    }

    fn moved(session: &GestureSession<E>, tracking: &RefCell<Tracking>, contacts: &[Contact]) {
        if !matches!(session.phase(), Phase::Move | Phase::Inertial) {
            return;
        }
        let update = {
            let tracking = tracking.borrow();
            let anchor = &tracking.anchor;
            let delta = match anchor.matched(contacts) {
                (start, current) if start.len() == 1 => {
                    angle_about(anchor.center, start[0], current[0])
                }
                (start, current) if start.len() >= 2 => wrap_degrees(
                    (pair_angle(current[0], current[1]) - pair_angle(start[0], start[1]))
                        .to_degrees(),
                ),
                _ => return,
            };
            PoseUpdate::default().with_rotation(anchor.pose.rotation_or_default() + delta)
        };
        write(session, tracking, update);
    }
}

impl<E> Recognizer<E> for Rotate<E> {
    fn session(&self) -> &GestureSession<E> {
        &self.session
    }

    fn axes(&self) -> AxisSet {
        AxisSet::ROTATION
    }
}

/// Scale by the distance of one contact to the element center, or by the
/// distance between two contacts.
///
/// Like [`Drag`], stops following once any contact ends.
pub struct Scale<E> {
    session: GestureSession<E>,
}

recognizer_debug!(Scale);

impl<E: GestureElement + 'static> Scale<E> {
    /// Attaches a scale recognizer limited to two contacts. Inertia, if
    /// enabled, only continues the scale.
    pub fn attach(element: Rc<RefCell<E>>, host: &GestureHost, options: SessionOptions<E>) -> Self {
        let options = options
            .with_max_contacts(ContactLimit::Bounded(2))
            .with_inertial_axes(AxisSet::SCALE);
        let session = GestureSession::attach(element, host, options);
        let tracking = Rc::new(RefCell::new(Tracking::default()));
        listen(&session, &tracking, Phase::Start, |session, tracking, contacts| {
            restart(session, tracking, contacts);
        });
        listen(&session, &tracking, Phase::Move, Self::moved);
        listen(&session, &tracking, Phase::End, |session, tracking, _| {
            commit_last(session, tracking);
            tracking.borrow_mut().complete = true;
        });
        listen(&session, &tracking, Phase::InertialEnd, |session, _, _| {
            commit_settled(session, AxisSet::SCALE);
        });
        Self { session }
    }

    fn moved(session: &GestureSession<E>, tracking: &RefCell<Tracking>, contacts: &[Contact]) {
        let update = {
            let tracking = tracking.borrow();
            if tracking.complete {
                return;
            }
            let anchor = &tracking.anchor;
            let (from, to) = match anchor.matched(contacts) {
                (start, current) if start.len() == 1 => (
                    pair_distance(start[0], anchor.center),
                    pair_distance(current[0], anchor.center),
                ),
                (start, current) if start.len() >= 2 => (
                    pair_distance(start[0], start[1]),
                    pair_distance(current[0], current[1]),
                ),
                _ => return,
            };
            if from <= 0.0 {
                return;
            }
            PoseUpdate::default().with_scale(anchor.pose.scale_or_default() * to / from)
        };
        write(session, tracking, update);
    }
}

impl<E> Recognizer<E> for Scale<E> {
    fn session(&self) -> &GestureSession<E> {
        &self.session
    }

    fn axes(&self) -> AxisSet {
        AxisSet::SCALE
    }
}

struct TransformState {
    tracking: RefCell<Tracking>,
    options: ComposeOptions,
}

/// Free transform: runs the [transform composer](crate::compose) on every
/// move so the contacts stay where they touched the element.
///
/// With [`ComposeOptions::drag_only`] this is a plain draggable, with
/// [`ComposeOptions::rotate_only`] a rotatable.
///
/// When a contact lifts while others stay down, the remaining contacts are
/// composed against the anchor taken when the last contact joined. Going
/// from two contacts to one therefore switches rules without continuity.
pub struct Transform<E> {
    session: GestureSession<E>,
    state: Rc<TransformState>,
    axes: AxisSet,
}

impl<E> fmt::Debug for Transform<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("session", &self.session)
            .field("options", &self.state.options)
            .field("axes", &self.axes)
            .finish()
    }
}

impl<E: GestureElement + 'static> Transform<E> {
    /// Attaches a transform recognizer. The contact limit is lifted and
    /// inertia, if enabled, continues the enabled axes.
    pub fn attach(
        element: Rc<RefCell<E>>,
        host: &GestureHost,
        options: SessionOptions<E>,
        compose: ComposeOptions,
    ) -> Self {
        let mut axes = AxisSet::empty();
        axes.set(AxisSet::POSITION, compose.enable_move);
        axes.set(AxisSet::ROTATION, compose.enable_rotate);
        axes.set(AxisSet::SCALE, compose.enable_scale);
        let options = options
            .with_max_contacts(ContactLimit::Unbounded)
            .with_inertial_axes(axes);
        let session = GestureSession::attach(element, host, options);
        let state = Rc::new(TransformState {
            tracking: RefCell::default(),
            options: compose,
        });
        listen(&session, &state, Phase::Start, |session, state, contacts| {
            restart(session, &state.tracking, contacts);
        });
        listen(&session, &state, Phase::Move, Self::moved);
        listen(&session, &state, Phase::End, |session, state, _| {
            commit_last(session, &state.tracking);
        });
        listen(&session, &state, Phase::InertialEnd, move |session, _, _| {
            commit_settled(session, session.options().inertial_axes);
        });
        Self {
            session,
            state,
            axes,
        }
    }

    fn moved(session: &GestureSession<E>, state: &TransformState, contacts: &[Contact]) {
        let update = {
            let tracking = state.tracking.borrow();
            let anchor = &tracking.anchor;
            let (start, current) = anchor.matched(contacts);
            let frame = TouchFrame::new(anchor.pose, &start, &current).with_origin(anchor.center);
            let Some(pose) = keep_touches_relative(&frame, &state.options) else {
                return;
            };
            state.options.update_for(&pose)
        };
        write(session, &state.tracking, update);
    }

    /// The composer options.
    #[must_use]
    pub fn compose_options(&self) -> &ComposeOptions {
        &self.state.options
    }
}

impl<E> Recognizer<E> for Transform<E> {
    fn session(&self) -> &GestureSession<E> {
        &self.session
    }

    fn axes(&self) -> AxisSet {
        self.axes
    }
}
