// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Constant-deceleration inertial tails.
//!
//! After the last contact of a throw is released, the last two `Move` pose
//! records give a per-axis speed. Each axis that changed between them decays
//! independently along `offset(t) = v·t − ½·a·t²` until its velocity reaches
//! zero at `t = v / a`. A purely rotational throw therefore only keeps
//! rotating; a purely translational throw only keeps moving.
//!
//! ```
//! use kurbo::{Point, Size};
//! use understory_gesture::inertia::{AxisSet, Deceleration, InertialMotion};
//! use understory_gesture::pose::{Pose, PoseRecord};
//! use understory_gesture::Phase;
//!
//! let size = Size::new(10.0, 10.0);
//! let record = |x: f64, time: f64| PoseRecord {
//!     pose: Pose::new(Point::new(x, 0.0), size),
//!     phase: Phase::Move,
//!     time,
//! };
//! let (before, last) = (record(0.0, 0.0), record(7.0, 10.0));
//!
//! let decel = Deceleration::default();
//! let motion = InertialMotion::from_records(&before, &last, AxisSet::all(), &decel).unwrap();
//! // 0.7 px/ms decelerating at 0.007 px/ms² stops after 100 ms.
//! assert!((motion.duration() - 100.0).abs() < 1e-9);
//! let end = motion.sample(motion.duration()).position.unwrap();
//! assert!((end.x - 42.0).abs() < 1e-9);
//! ```

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Vec2};
use smallvec::SmallVec;

use crate::pose::{PoseRecord, PoseUpdate, wrap_degrees};

bitflags::bitflags! {
    /// Pose axes an inertial tail may continue.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct AxisSet: u8 {
        /// Position (linear displacement).
        const POSITION = 1 << 0;
        /// Rotation.
        const ROTATION = 1 << 1;
        /// Uniform scale.
        const SCALE    = 1 << 2;
    }
}

impl Default for AxisSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Per-axis deceleration constants and limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Deceleration {
    /// Linear deceleration in px/ms².
    pub translation: f64,
    /// Angular deceleration in deg/ms².
    pub rotation: f64,
    /// Scale deceleration in 1/ms².
    pub scale: f64,
    /// Largest cumulative relative scale change a tail may apply.
    pub max_scale_change: f64,
    /// Last-move distances at or below this (in px) do not start a
    /// translation tail.
    pub min_translation: f64,
}

impl Default for Deceleration {
    fn default() -> Self {
        Self {
            translation: 0.007,
            rotation: 0.0005,
            scale: 1e-7,
            max_scale_change: 10.0,
            min_translation: 1.0,
        }
    }
}

/// One decaying scalar: `offset(t) = v·t − ½·a·t²` for `t ∈ [0, v/a]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Kinematics {
    speed: f64,
    deceleration: f64,
}

impl Kinematics {
    /// Creates a tail from an initial speed (its magnitude is used) and a
    /// positive deceleration.
    #[must_use]
    pub fn new(speed: f64, deceleration: f64) -> Self {
        Self {
            speed: speed.abs(),
            deceleration: deceleration.abs(),
        }
    }

    /// Time until the velocity reaches zero.
    #[must_use]
    pub fn duration(&self) -> f64 {
        if self.deceleration == 0.0 {
            0.0
        } else {
            self.speed / self.deceleration
        }
    }

    /// Distance covered after `elapsed` milliseconds.
    ///
    /// `elapsed` is clamped to `[0, duration]`, so past the end the tail stays
    /// at its peak.
    #[must_use]
    pub fn offset(&self, elapsed: f64) -> f64 {
        let t = elapsed.clamp(0.0, self.duration());
        self.speed * t - 0.5 * self.deceleration * t * t
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Tail {
    Position {
        from: Point,
        direction: Vec2,
        kinematics: Kinematics,
    },
    Rotation {
        from: f64,
        sign: f64,
        kinematics: Kinematics,
    },
    Scale {
        from: f64,
        sign: f64,
        cap: f64,
        kinematics: Kinematics,
    },
}

impl Tail {
    fn kinematics(&self) -> &Kinematics {
        match self {
            Self::Position { kinematics, .. }
            | Self::Rotation { kinematics, .. }
            | Self::Scale { kinematics, .. } => kinematics,
        }
    }

    fn apply(&self, elapsed: f64, update: &mut PoseUpdate) {
        let offset = self.kinematics().offset(elapsed);
        match *self {
            Self::Position {
                from, direction, ..
            } => update.position = Some(from + direction * offset),
            Self::Rotation { from, sign, .. } => update.rotation = Some(from + sign * offset),
            Self::Scale {
                from, sign, cap, ..
            } => {
                let change = (sign * offset).clamp(-cap, cap);
                update.scale = Some(from * (1.0 + change).max(0.01));
            }
        }
    }
}

/// The independent per-axis tails started by one release.
#[derive(Clone, Debug, PartialEq)]
pub struct InertialMotion {
    tails: SmallVec<[Tail; 3]>,
    duration: f64,
}

impl InertialMotion {
    /// Builds the tails from two `Move` records.
    ///
    /// Returns `None` when the records are not strictly ordered in time or no
    /// axis in `axes` changed between them.
    #[must_use]
    pub fn from_records(
        before: &PoseRecord,
        last: &PoseRecord,
        axes: AxisSet,
        deceleration: &Deceleration,
    ) -> Option<Self> {
        let dt = last.time - before.time;
        if dt.is_nan() || dt <= 0.0 {
            return None;
        }
        let mut tails: SmallVec<[Tail; 3]> = SmallVec::new();

        if axes.contains(AxisSet::POSITION) {
            let delta = last.pose.position - before.pose.position;
            let distance = delta.hypot();
            if distance > deceleration.min_translation {
                tails.push(Tail::Position {
                    from: last.pose.position,
                    direction: delta / distance,
                    kinematics: Kinematics::new(distance / dt, deceleration.translation),
                });
            }
        }

        if axes.contains(AxisSet::ROTATION) {
            if let (Some(from), Some(to)) = (before.pose.rotation, last.pose.rotation) {
                let delta = wrap_degrees(to - from);
                if delta != 0.0 {
                    tails.push(Tail::Rotation {
                        from: to,
                        sign: delta.signum(),
                        kinematics: Kinematics::new(delta / dt, deceleration.rotation),
                    });
                }
            }
        }

        if axes.contains(AxisSet::SCALE) {
            if let (Some(from), Some(to)) = (before.pose.scale, last.pose.scale) {
                let delta = to - from;
                if delta != 0.0 {
                    tails.push(Tail::Scale {
                        from: to,
                        sign: delta.signum(),
                        cap: deceleration.max_scale_change,
                        kinematics: Kinematics::new(delta / dt, deceleration.scale),
                    });
                }
            }
        }

        if tails.is_empty() {
            return None;
        }
        let duration = tails
            .iter()
            .map(|tail| tail.kinematics().duration())
            .fold(0.0, f64::max);
        Some(Self { tails, duration })
    }

    /// Time until the slowest axis stops.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Returns `true` once every axis has stopped.
    #[must_use]
    pub fn is_finished(&self, elapsed: f64) -> bool {
        elapsed > self.duration
    }

    /// Axes with a running tail.
    #[must_use]
    pub fn axes(&self) -> AxisSet {
        self.tails.iter().fold(AxisSet::empty(), |axes, tail| {
            axes | match tail {
                Tail::Position { .. } => AxisSet::POSITION,
                Tail::Rotation { .. } => AxisSet::ROTATION,
                Tail::Scale { .. } => AxisSet::SCALE,
            }
        })
    }

    /// Initial speed of each running axis, in its own units per ms.
    pub fn speeds(&self) -> impl Iterator<Item = (AxisSet, f64)> + '_ {
        self.tails.iter().map(|tail| {
            let axis = match tail {
                Tail::Position { .. } => AxisSet::POSITION,
                Tail::Rotation { .. } => AxisSet::ROTATION,
                Tail::Scale { .. } => AxisSet::SCALE,
            };
            (axis, tail.kinematics().speed)
        })
    }

    /// Partial pose for `elapsed` milliseconds after the tail started.
    ///
    /// Only the axes with a tail are set.
    #[must_use]
    pub fn sample(&self, elapsed: f64) -> PoseUpdate {
        let mut update = PoseUpdate::default();
        for tail in &self.tails {
            tail.apply(elapsed, &mut update);
        }
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;
    use crate::session::Phase;
    use kurbo::Size;

    fn record(pose: Pose, time: f64) -> PoseRecord {
        PoseRecord {
            pose,
            phase: Phase::Move,
            time,
        }
    }

    fn at(x: f64, y: f64) -> Pose {
        Pose::new(Point::new(x, y), Size::new(10.0, 10.0))
            .with_rotation(0.0)
            .with_scale(1.0)
    }

    #[test]
    fn kinematics_peaks_at_duration_and_holds() {
        let k = Kinematics::new(-2.0, 0.5);
        assert_eq!(k.duration(), 4.0);
        assert_eq!(k.offset(0.0), 0.0);
        assert_eq!(k.offset(4.0), 4.0);
        assert_eq!(k.offset(10.0), 4.0);
        assert_eq!(k.offset(-1.0), 0.0);
    }

    #[test]
    fn unchanged_axes_get_no_tail() {
        let a = record(at(0.0, 0.0), 0.0);
        let b = record(at(0.0, 0.0).with_rotation(10.0), 20.0);
        let motion =
            InertialMotion::from_records(&a, &b, AxisSet::all(), &Deceleration::default()).unwrap();
        assert_eq!(motion.axes(), AxisSet::ROTATION);
        let update = motion.sample(5.0);
        assert!(update.position.is_none());
        assert!(update.scale.is_none());
        assert!(update.rotation.unwrap() > 10.0);
    }

    #[test]
    fn no_motion_or_bad_timing_yields_none() {
        let d = Deceleration::default();
        let a = record(at(0.0, 0.0), 5.0);
        assert!(InertialMotion::from_records(&a, &a, AxisSet::all(), &d).is_none());
        let b = record(at(50.0, 0.0), 5.0);
        assert!(InertialMotion::from_records(&a, &b, AxisSet::all(), &d).is_none());
        // Sub-pixel moves do not throw.
        let c = record(at(0.5, 0.0), 10.0);
        assert!(InertialMotion::from_records(&a, &c, AxisSet::all(), &d).is_none());
    }

    #[test]
    fn axis_filter_limits_tails() {
        let a = record(at(0.0, 0.0), 0.0);
        let b = record(at(20.0, 0.0).with_scale(1.2), 10.0);
        let d = Deceleration::default();
        let only_scale = InertialMotion::from_records(&a, &b, AxisSet::SCALE, &d).unwrap();
        assert_eq!(only_scale.axes(), AxisSet::SCALE);
        assert!(InertialMotion::from_records(&a, &b, AxisSet::ROTATION, &d).is_none());
    }

    #[test]
    fn translation_follows_the_throw_direction() {
        let a = record(at(0.0, 0.0), 0.0);
        let b = record(at(-3.0, -4.0), 10.0);
        let motion =
            InertialMotion::from_records(&a, &b, AxisSet::all(), &Deceleration::default()).unwrap();
        let p = motion.sample(10.0).position.unwrap();
        assert!(p.x < -3.0 && p.y < -4.0);
        assert!(((p.y + 4.0) / (p.x + 3.0) - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn rotation_takes_the_short_way_round() {
        let a = record(at(0.0, 0.0).with_rotation(350.0), 0.0);
        let b = record(at(0.0, 0.0).with_rotation(355.0), 10.0);
        let motion =
            InertialMotion::from_records(&a, &b, AxisSet::all(), &Deceleration::default()).unwrap();
        assert!(motion.sample(5.0).rotation.unwrap() > 355.0);
    }

    #[test]
    fn scale_change_is_capped() {
        let a = record(at(0.0, 0.0).with_scale(1.0), 0.0);
        let b = record(at(0.0, 0.0).with_scale(2.0), 1.0);
        let d = Deceleration {
            max_scale_change: 0.5,
            ..Deceleration::default()
        };
        let motion = InertialMotion::from_records(&a, &b, AxisSet::all(), &d).unwrap();
        let late = motion.sample(motion.duration()).scale.unwrap();
        assert!((late - 3.0).abs() < 1e-9);

        let shrink = record(at(0.0, 0.0).with_scale(0.5), 1.0);
        let motion = InertialMotion::from_records(&a, &shrink, AxisSet::all(), &d).unwrap();
        let late = motion.sample(motion.duration()).scale.unwrap();
        assert!((late - 0.25).abs() < 1e-9);
    }

    #[test]
    fn duration_is_that_of_the_slowest_axis() {
        let a = record(at(0.0, 0.0), 0.0);
        let b = record(at(7.0, 0.0).with_rotation(1.0), 10.0);
        let d = Deceleration::default();
        let motion = InertialMotion::from_records(&a, &b, AxisSet::all(), &d).unwrap();
        // 0.7/0.007 = 100 ms, 0.1/0.0005 = 200 ms.
        assert!((motion.duration() - 200.0).abs() < 1e-9);
        assert!(!motion.is_finished(150.0));
        assert!(motion.is_finished(200.5));
    }
}
