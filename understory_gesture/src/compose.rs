// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform composer: keeps the contacts at the same place on the element.
//!
//! Given the pose at gesture start, the points where the contacts started and
//! where they are now, [`try_keep_touches_relative`] computes the new pose.
//!
//! - With one contact, the first entry of
//!   [`ComposeOptions::single_finger_priority`] whose axis is enabled is the
//!   only gesture performed.
//! - With two or more contacts, the first two points of each set form the
//!   anchor pair for rotation and scale, while translation follows the
//!   centroid of all points. Every enabled axis is applied at once.
//!
//! The result is always computed from the start snapshot, never
//! incrementally. Going from one contact to two mid-gesture therefore jumps
//! from the single-contact rule to the pair rule without smoothing.
//!
//! ```
//! use kurbo::{Point, Size};
//! use understory_gesture::compose::{keep_touches_relative, ComposeOptions, TouchFrame};
//! use understory_gesture::pose::Pose;
//!
//! let initial = Pose::new(Point::ZERO, Size::new(100.0, 100.0));
//! let start = [Point::new(60.0, 50.0), Point::new(70.0, 50.0)];
//! let current = [Point::new(100.0, 50.0), Point::new(110.0, 50.0)];
//!
//! let frame = TouchFrame::new(initial, &start, &current);
//! let pose = keep_touches_relative(&frame, &ComposeOptions::default()).unwrap();
//! assert_eq!(pose.position, Point::new(40.0, 0.0));
//! assert_eq!(pose.scale, Some(1.0));
//! assert_eq!(pose.rotation, Some(0.0));
//! ```

use alloc::string::String;
use core::fmt;

use kurbo::Point;
use smallvec::{SmallVec, smallvec};

use crate::pose::{Pose, PoseUpdate, angle_about, centroid, pair_angle, pair_distance, wrap_degrees};

/// A single-axis gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureKind {
    /// Translation.
    Drag,
    /// Rotation.
    Rotate,
    /// Uniform scale.
    Scale,
}

/// Options of the transform composer.
#[derive(Clone, Debug, PartialEq)]
pub struct ComposeOptions {
    /// Allow translation.
    pub enable_move: bool,
    /// Allow scaling.
    pub enable_scale: bool,
    /// Allow rotation.
    pub enable_rotate: bool,
    /// Single-contact gesture order; the first enabled entry wins.
    pub single_finger_priority: SmallVec<[GestureKind; 3]>,
    /// Transform origin hint written with every pose.
    pub transform_origin: Option<String>,
    /// Transition hint written with every pose.
    pub transition: Option<String>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            enable_move: true,
            enable_scale: true,
            enable_rotate: true,
            single_finger_priority: smallvec![GestureKind::Drag],
            transform_origin: Some(String::from("center center")),
            transition: None,
        }
    }
}

impl ComposeOptions {
    /// Translation only.
    #[must_use]
    pub fn drag_only() -> Self {
        Self {
            enable_scale: false,
            enable_rotate: false,
            ..Self::default()
        }
    }

    /// Rotation only; a single contact rotates around the origin.
    #[must_use]
    pub fn rotate_only() -> Self {
        Self {
            enable_move: false,
            enable_scale: false,
            single_finger_priority: smallvec![GestureKind::Rotate],
            ..Self::default()
        }
    }

    /// Sets the single-contact priority list.
    #[must_use]
    pub fn with_priority(mut self, priority: impl IntoIterator<Item = GestureKind>) -> Self {
        self.single_finger_priority = priority.into_iter().collect();
        self
    }

    /// Sets the transform origin hint.
    #[must_use]
    pub fn with_transform_origin(mut self, origin: impl Into<String>) -> Self {
        self.transform_origin = Some(origin.into());
        self
    }

    /// Sets the transition hint.
    #[must_use]
    pub fn with_transition(mut self, transition: impl Into<String>) -> Self {
        self.transition = Some(transition.into());
        self
    }

    /// Returns `true` if `kind` may change the pose.
    #[must_use]
    pub fn allows(&self, kind: GestureKind) -> bool {
        match kind {
            GestureKind::Drag => self.enable_move,
            GestureKind::Rotate => self.enable_rotate,
            GestureKind::Scale => self.enable_scale,
        }
    }

    /// The single-contact gesture these options perform, if any.
    #[must_use]
    pub fn single_finger_gesture(&self) -> Option<GestureKind> {
        self.single_finger_priority
            .iter()
            .copied()
            .find(|kind| self.allows(*kind))
    }

    /// Full pose write of `pose` carrying the styling hints.
    #[must_use]
    pub fn update_for(&self, pose: &Pose) -> PoseUpdate {
        PoseUpdate {
            transform_origin: self.transform_origin.clone(),
            transition: self.transition.clone(),
            ..PoseUpdate::from_pose(pose)
        }
    }
}

/// Input of one composer call.
#[derive(Clone, Copy, Debug)]
pub struct TouchFrame<'a> {
    /// Pose at gesture start.
    pub initial: Pose,
    /// Pivot for single-contact scale and rotation.
    pub origin: Point,
    /// Contact positions at gesture start.
    pub start: &'a [Point],
    /// Current contact positions, in the same order as `start`.
    pub current: &'a [Point],
}

impl<'a> TouchFrame<'a> {
    /// Creates a frame pivoting on the center of `initial`.
    #[must_use]
    pub fn new(initial: Pose, start: &'a [Point], current: &'a [Point]) -> Self {
        Self {
            initial,
            origin: initial.center(),
            start,
            current,
        }
    }

    /// Sets the single-contact pivot, e.g. the center of the global
    /// bounding rect.
    #[must_use]
    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }
}

/// Point sets the composer cannot pair up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComposeError {
    /// One of the point sets is empty.
    EmptyPointSet,
    /// The sets hold different numbers of points.
    MismatchedPointSets {
        /// Number of start points.
        start: usize,
        /// Number of current points.
        current: usize,
    },
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPointSet => write!(f, "no contact points to compose"),
            Self::MismatchedPointSets { start, current } => write!(
                f,
                "cannot pair {start} start points with {current} current points"
            ),
        }
    }
}

impl core::error::Error for ComposeError {}

/// Computes the pose that keeps the contacts where they touched the element.
///
/// The returned pose always carries a rotation and a scale.
pub fn try_keep_touches_relative(
    frame: &TouchFrame<'_>,
    options: &ComposeOptions,
) -> Result<Pose, ComposeError> {
    let (start, current) = (frame.start, frame.current);
    if start.is_empty() || current.is_empty() {
        return Err(ComposeError::EmptyPointSet);
    }
    if start.len() != current.len() {
        return Err(ComposeError::MismatchedPointSets {
            start: start.len(),
            current: current.len(),
        });
    }
    let initial = frame.initial;
    let mut pose = initial
        .with_rotation(initial.rotation_or_default())
        .with_scale(initial.scale_or_default());

    match (start, current) {
        ([s], [c]) => match options.single_finger_gesture() {
            Some(GestureKind::Drag) => pose.position = initial.position + (*c - *s),
            Some(GestureKind::Scale) => {
                let from = pair_distance(*s, frame.origin);
                if from > 0.0 {
                    let ratio = pair_distance(*c, frame.origin) / from;
                    pose.scale = Some(initial.scale_or_default() * ratio);
                }
            }
            Some(GestureKind::Rotate) => {
                let delta = angle_about(frame.origin, *s, *c);
                pose.rotation = Some(initial.rotation_or_default() + delta);
            }
            None => {}
        },
        ([s0, s1, ..], [c0, c1, ..]) => {
            if options.enable_rotate {
                let turn = pair_angle(*c0, *c1) - pair_angle(*s0, *s1);
                let delta = wrap_degrees(turn.to_degrees());
                pose.rotation = Some(initial.rotation_or_default() + delta);
            }
            if options.enable_scale {
                let from = pair_distance(*s0, *s1);
                if from > 0.0 {
                    let ratio = pair_distance(*c0, *c1) / from;
                    pose.scale = Some(initial.scale_or_default() * ratio);
                }
            }
            if options.enable_move {
                if let (Some(from), Some(to)) = (centroid(start), centroid(current)) {
                    pose.position = initial.position + (to - from);
                }
            }
        }
        _ => {
            return Err(ComposeError::MismatchedPointSets {
                start: start.len(),
                current: current.len(),
            });
        }
    }
    Ok(pose)
}

/// Like [`try_keep_touches_relative`], but treats unusable point sets as a
/// no-op.
///
/// Empty sets return `None` quietly; mismatched sets are logged with
/// `tracing::warn!` and also return `None`, so one bad frame never breaks
/// the gesture stream.
pub fn keep_touches_relative(frame: &TouchFrame<'_>, options: &ComposeOptions) -> Option<Pose> {
    match try_keep_touches_relative(frame, options) {
        Ok(pose) => Some(pose),
        Err(ComposeError::EmptyPointSet) => None,
        Err(error) => {
            tracing::warn!(%error, "skipping composer frame");
            None
        }
    }
}
