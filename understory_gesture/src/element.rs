// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Rect;

use crate::pose::{Pose, PoseUpdate};

/// The pose and geometry adapter a gesture session drives.
///
/// Sessions never touch an element except through this trait (or the
/// per-session overrides in [`SessionOptions`](crate::SessionOptions)).
/// [`StyledElement`](crate::codec::StyledElement) is a headless reference
/// implementation that stores its pose as left/top plus a transform string.
pub trait GestureElement {
    /// Reads a snapshot of the current pose.
    fn pose(&self) -> Pose;

    /// Writes the fields present in `update`, leaving the others alone.
    fn apply_pose(&mut self, update: &PoseUpdate);

    /// Axis-aligned bounding box in the global (viewport) coordinate space.
    fn bounding_rect(&self) -> Rect;
}
