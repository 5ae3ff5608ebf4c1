// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Gesture: multi-contact pointer gestures for positioned elements.
//!
//! This crate turns raw pointer input into drag, rotate and scale gestures on
//! an element that exposes a [`Pose`] (position, rotation, scale and size).
//! It is built from a few layers:
//!
//! - **Input** ([`InputSource`], [`PointerEvent`]): The document-level stream
//!   of pointer moves, releases and cancellations.
//! - **Contacts** ([`Contact`]): One pointer from press to release, with its
//!   recorded path and per-phase listeners.
//! - **Sessions** ([`GestureSession`]): Owns the active contacts for one
//!   element, keeps a pose history, dispatches [`Phase`] events and runs
//!   inertia on a [`FrameClock`](frame::FrameClock).
//! - **Composition** ([`compose::keep_touches_relative`]): Computes the pose that
//!   keeps the contact points fixed relative to the element.
//! - **Recognizers** ([`recognizer::Drag`], [`recognizer::Rotate`],
//!   [`recognizer::Scale`], [`recognizer::Transform`]): Sessions with gesture
//!   semantics attached.
//! - **Composite** ([`composite::Composite`]): One master session routing its
//!   contacts into several recognizers at once.
//!
//! Elements plug in through [`GestureElement`]. The [`codec`] module provides
//! [`StyledElement`](codec::StyledElement), which stores rotation and scale
//! inside a CSS-like transform string.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use kurbo::{Point, Size};
//! use understory_gesture::codec::StyledElement;
//! use understory_gesture::frame::ManualFrameClock;
//! use understory_gesture::recognizer::{Recognizer, Transform};
//! use understory_gesture::{
//!     ComposeOptions, GestureHost, InputSource, Phase, PointerEvent, SessionOptions,
//! };
//!
//! let input = InputSource::new();
//! let clock = Rc::new(ManualFrameClock::new());
//! let host = GestureHost::new(input.clone(), clock.clone());
//! let element = Rc::new(RefCell::new(StyledElement::new(0.0, 0.0, Size::new(50.0, 50.0))));
//!
//! let transform = Transform::attach(
//!     element.clone(),
//!     &host,
//!     SessionOptions::default(),
//!     ComposeOptions::default(),
//! );
//! transform.session().add_event_listener(Phase::End, |contacts| {
//!     assert_eq!(contacts.len(), 1);
//! });
//!
//! // Press, move 10px to the right and release. One contact drags.
//! transform.session().handle_press(&PointerEvent::mouse(Point::new(5.0, 5.0), 0.0));
//! clock.set_now(16.0);
//! input.pointer_move(&PointerEvent::mouse(Point::new(15.0, 5.0), 16.0));
//! input.pointer_up(&PointerEvent::mouse(Point::new(15.0, 5.0), 32.0));
//!
//! assert_eq!(element.borrow().left, 10.0);
//! assert_eq!(transform.session().phase(), Phase::AllEnd);
//! ```
//!
//! ## Inertia
//!
//! With [`SessionOptions::inertial`] set, releasing the last contact extrapolates
//! the last recorded movement. Each axis decelerates uniformly at the rate in
//! [`Deceleration`] and the session emits [`Phase::Inertial`] on every frame,
//! then [`Phase::InertialEnd`] and finally [`Phase::AllEnd`]. A new press on
//! the element interrupts the motion.
//!
//! Frames come from the host's [`FrameClock`](frame::FrameClock). Tests and
//! headless hosts use [`ManualFrameClock`](frame::ManualFrameClock) and step it
//! by hand.
//!
//! ## Threading
//!
//! Sessions, contacts and input sources are single-threaded handles built on
//! `Rc` and `RefCell`. Listeners run synchronously on the thread that feeds
//! the input. No borrow is held while a listener runs, so listeners may call
//! back into the session that invoked them.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. Floating point math needs either
//! the `std` or the `libm` feature.
//!
//! ## Features
//!
//! - `std` (default): Use the standard library for floating point math.
//! - `libm`: Use `libm` for floating point math in `no_std` builds.

#![no_std]

extern crate alloc;

pub mod codec;
pub mod compose;
pub mod composite;
pub mod contact;
mod element;
pub mod frame;
mod host;
pub mod inertia;
pub mod input;
mod listeners;
pub mod pose;
pub mod recognizer;
mod session;

pub use compose::{ComposeError, ComposeOptions, GestureKind};
pub use contact::{Contact, ContactPhase, ContactSample};
pub use element::GestureElement;
pub use host::GestureHost;
pub use inertia::{AxisSet, Deceleration};
pub use input::{InputSource, PointerEvent, PointerId};
pub use listeners::ListenerId;
pub use pose::{Pose, PoseUpdate};
pub use session::{
    ContactLimit, GestureSession, GetPoseFn, Phase, SessionOptions, SetPoseFn, WeakSession,
};
