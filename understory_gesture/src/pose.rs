// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pose snapshots, partial pose updates and the point math shared by the
//! composer and the recognizers.
//!
//! A [`Pose`] is a plain `Copy` value: reading an element produces a snapshot
//! that later writes to the element can never change.
//!
//! ```
//! use kurbo::{Point, Size};
//! use understory_gesture::pose::{Pose, PoseUpdate};
//!
//! let pose = Pose::new(Point::new(10.0, 20.0), Size::new(100.0, 50.0)).with_rotation(30.0);
//! let moved = pose.merged(&PoseUpdate::default().with_position(Point::new(15.0, 20.0)));
//!
//! assert_eq!(moved.position, Point::new(15.0, 20.0));
//! assert_eq!(moved.rotation, Some(30.0));
//! // The earlier snapshot is untouched.
//! assert_eq!(pose.position, Point::new(10.0, 20.0));
//! ```

use alloc::string::String;
use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, Point, Size, Vec2};

use crate::session::Phase;

/// Position, rotation, scale and size of an element at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    /// Top-left position (left/top equivalent coordinates).
    pub position: Point,
    /// Rotation in degrees, if the element carries one.
    pub rotation: Option<f64>,
    /// Uniform scale factor, if the element carries one.
    pub scale: Option<f64>,
    /// Layout width, before scaling.
    pub width: f64,
    /// Layout height, before scaling.
    pub height: f64,
}

impl Pose {
    /// Creates an unrotated, unscaled pose.
    #[must_use]
    pub const fn new(position: Point, size: Size) -> Self {
        Self {
            position,
            rotation: None,
            scale: None,
            width: size.width,
            height: size.height,
        }
    }

    /// Returns a copy with the given rotation in degrees.
    #[must_use]
    pub const fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = Some(degrees);
        self
    }

    /// Returns a copy with the given scale factor.
    #[must_use]
    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Layout size of the element.
    #[must_use]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Rotation in degrees, `0.0` when absent.
    #[must_use]
    pub fn rotation_or_default(&self) -> f64 {
        self.rotation.unwrap_or(0.0)
    }

    /// Scale factor, `1.0` when absent.
    #[must_use]
    pub fn scale_or_default(&self) -> f64 {
        self.scale.unwrap_or(1.0)
    }

    /// Geometric center in the same space as [`Pose::position`].
    #[must_use]
    pub fn center(&self) -> Point {
        self.position + Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Returns this pose with every field present in `update` replaced.
    #[must_use]
    pub fn merged(&self, update: &PoseUpdate) -> Self {
        let mut pose = *self;
        if let Some(position) = update.position {
            pose.position = position;
        }
        if let Some(rotation) = update.rotation {
            pose.rotation = Some(rotation);
        }
        if let Some(scale) = update.scale {
            pose.scale = Some(scale);
        }
        if let Some(size) = update.size {
            pose.width = size.width;
            pose.height = size.height;
        }
        pose
    }

    /// Transform matrix `translate(position) * rotate(rotation) * scale(scale)`.
    #[must_use]
    pub fn to_affine(&self) -> Affine {
        Affine::translate(self.position.to_vec2())
            * Affine::rotate(self.rotation_or_default().to_radians())
            * Affine::scale(self.scale_or_default())
    }

    /// Difference needed to go from `self` to `other`.
    #[must_use]
    pub fn delta_to(&self, other: &Self) -> PoseDelta {
        let from_scale = self.scale_or_default();
        PoseDelta {
            translation: other.position - self.position,
            scale_ratio: if from_scale == 0.0 {
                1.0
            } else {
                other.scale_or_default() / from_scale
            },
            rotation: other.rotation_or_default() - self.rotation_or_default(),
        }
    }

    /// Expresses a point in the element's own frame.
    ///
    /// The offset from [`Pose::center`] is un-rotated and un-scaled, then
    /// divided by the layout size to give a fraction of width and height.
    #[must_use]
    pub fn relative_position(&self, point: Point) -> RelativePosition {
        let offset = point - self.center();
        let radians = self.rotation_or_default().to_radians();
        let (sin, cos) = (radians.sin(), radians.cos());
        let scale = self.scale_or_default();
        let scale = if scale == 0.0 { 1.0 } else { scale };
        let local = Vec2::new(
            (offset.x * cos + offset.y * sin) / scale,
            (-offset.x * sin + offset.y * cos) / scale,
        );
        let fraction = Vec2::new(
            if self.width == 0.0 { 0.0 } else { local.x / self.width },
            if self.height == 0.0 { 0.0 } else { local.y / self.height },
        );
        RelativePosition {
            offset,
            local,
            fraction,
        }
    }
}

/// Per-axis difference between two poses. See [`Pose::delta_to`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseDelta {
    /// Position change.
    pub translation: Vec2,
    /// Ratio of the target scale to the source scale.
    pub scale_ratio: f64,
    /// Rotation change in degrees.
    pub rotation: f64,
}

/// A point expressed relative to an element. See [`Pose::relative_position`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelativePosition {
    /// Offset from the element center, in global units.
    pub offset: Vec2,
    /// Offset from the center in the element's unrotated, unscaled frame.
    pub local: Vec2,
    /// `local` as a fraction of the layout width and height.
    pub fraction: Vec2,
}

/// A partial pose write.
///
/// Only the fields that are `Some` are written. `transform_origin` and
/// `transition` are styling hints passed through to the element and have no
/// geometric meaning.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoseUpdate {
    /// New position.
    pub position: Option<Point>,
    /// New rotation in degrees.
    pub rotation: Option<f64>,
    /// New scale factor.
    pub scale: Option<f64>,
    /// New layout size.
    pub size: Option<Size>,
    /// Transform origin hint, e.g. `"center center"`.
    pub transform_origin: Option<String>,
    /// Transition hint.
    pub transition: Option<String>,
}

impl PoseUpdate {
    /// An update that writes position, rotation and scale of `pose`.
    ///
    /// Size is left out: gestures never resize an element.
    #[must_use]
    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            position: Some(pose.position),
            rotation: pose.rotation,
            scale: pose.scale,
            ..Self::default()
        }
    }

    /// Sets the position.
    #[must_use]
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    /// Sets the rotation in degrees.
    #[must_use]
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = Some(degrees);
        self
    }

    /// Sets the scale factor.
    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Sets the layout size.
    #[must_use]
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
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

    /// Returns `true` if no geometric field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position.is_none()
            && self.rotation.is_none()
            && self.scale.is_none()
            && self.size.is_none()
    }
}

/// One entry of a session's pose history.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseRecord {
    /// Full pose after the write.
    pub pose: Pose,
    /// Phase the write happened in.
    pub phase: Phase,
    /// Clock time of the write, in milliseconds.
    pub time: f64,
}

/// Append-only pose history of one session.
///
/// Records are never removed one by one; the whole history is cleared when a
/// fresh gesture starts or the session is detached.
#[derive(Clone, Debug, Default)]
pub struct PoseHistory {
    records: Vec<PoseRecord>,
}

impl PoseHistory {
    /// Creates an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Appends a record.
    pub fn push(&mut self, record: PoseRecord) {
        self.records.push(record);
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// All records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[PoseRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the history holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Like [`PoseHistory::last_two_moves`], but only while the newest
    /// record is a [`Phase::Move`].
    ///
    /// Once an inertial tail has written a record, the moves before it have
    /// been continued and do not start another tail.
    #[must_use]
    pub fn pending_throw(&self) -> Option<(&PoseRecord, &PoseRecord)> {
        if self.records.last()?.phase != Phase::Move {
            return None;
        }
        self.last_two_moves()
    }

    /// The last [`Phase::Move`] record written since the latest
    /// [`Phase::Start`] record, paired with the most recent earlier `Move`
    /// record stamped strictly before it, as `(before_last, last)`.
    ///
    /// Records sharing the last timestamp are skipped, so several contacts
    /// moving in one frame still yield a usable pair.
    #[must_use]
    pub fn last_two_moves(&self) -> Option<(&PoseRecord, &PoseRecord)> {
        let mut moves = self
            .records
            .iter()
            .rev()
            .take_while(|record| record.phase != Phase::Start)
            .filter(|record| record.phase == Phase::Move);
        let last = moves.next()?;
        let before_last = moves.find(|record| record.time < last.time)?;
        Some((before_last, last))
    }
}

/// Arithmetic mean of a point set, `None` when empty.
#[must_use]
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vec2::ZERO, |sum, point| sum + point.to_vec2());
    Some((sum / points.len() as f64).to_point())
}

/// Angle in radians of the vector `a - b`.
#[must_use]
pub fn pair_angle(a: Point, b: Point) -> f64 {
    (a - b).atan2()
}

/// Distance between two points.
#[must_use]
pub fn pair_distance(a: Point, b: Point) -> f64 {
    (a - b).hypot()
}

/// Rotation in degrees that carries `from` onto `to` around `center`,
/// wrapped to `(-180, 180]`.
#[must_use]
pub fn angle_about(center: Point, from: Point, to: Point) -> f64 {
    wrap_degrees(((to - center).atan2() - (from - center).atan2()).to_degrees())
}

/// Maps an angle difference to `(-180, 180]` degrees.
#[must_use]
pub fn wrap_degrees(delta: f64) -> f64 {
    let wrapped = delta % 360.0;
    if wrapped > 180.0 {
        wrapped - 360.0
    } else if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}
