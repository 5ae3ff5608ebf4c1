// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Default pose codec: position as left/top, rotation and scale inside a
//! transform string.
//!
//! Writes replace the existing `rotate(..)` / `scale(..)` functions in place
//! and only append when the function is missing, so repeated writes never
//! stack transforms.
//!
//! ```
//! use understory_gesture::codec::{read_rotation, read_scale, write_rotation};
//!
//! let mut transform = String::from("rotate(10deg) scale(2)");
//! write_rotation(&mut transform, 45.0);
//! write_rotation(&mut transform, 50.0);
//!
//! assert_eq!(transform, "rotate(50deg) scale(2)");
//! assert_eq!(read_rotation(&transform), Some(50.0));
//! assert_eq!(read_scale(&transform), Some(2.0));
//! ```

use alloc::format;
use alloc::string::String;
use core::ops::Range;

use kurbo::{Affine, Point, Rect, Size, Vec2};

use crate::element::GestureElement;
use crate::pose::{Pose, PoseUpdate};

/// A headless element whose pose lives in style-like fields.
///
/// `left`/`top` are relative to `origin`, the position of the containing
/// block in global coordinates. Transforms apply around the element center.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyledElement {
    /// Global position of the containing block.
    pub origin: Point,
    /// Left offset inside the containing block.
    pub left: f64,
    /// Top offset inside the containing block.
    pub top: f64,
    /// Layout width.
    pub width: f64,
    /// Layout height.
    pub height: f64,
    /// Transform string, e.g. `"rotate(30deg) scale(1.5)"`.
    pub transform: String,
    /// Last transform origin hint written.
    pub transform_origin: Option<String>,
    /// Last transition hint written.
    pub transition: Option<String>,
}

impl StyledElement {
    /// Creates an untransformed element at `left`/`top` with the given size.
    #[must_use]
    pub fn new(left: f64, top: f64, size: Size) -> Self {
        Self {
            left,
            top,
            width: size.width,
            height: size.height,
            ..Self::default()
        }
    }

    /// Sets the containing block origin.
    #[must_use]
    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the transform string.
    #[must_use]
    pub fn with_transform(mut self, transform: impl Into<String>) -> Self {
        self.transform = transform.into();
        self
    }
}

impl GestureElement for StyledElement {
    fn pose(&self) -> Pose {
        Pose {
            position: Point::new(self.left, self.top),
            rotation: Some(read_rotation(&self.transform).unwrap_or(0.0)),
            scale: Some(read_scale(&self.transform).unwrap_or(1.0)),
            width: self.width,
            height: self.height,
        }
    }

    fn apply_pose(&mut self, update: &PoseUpdate) {
        if let Some(position) = update.position {
            self.left = position.x;
            self.top = position.y;
        }
        if let Some(rotation) = update.rotation {
            write_rotation(&mut self.transform, rotation);
        }
        if let Some(scale) = update.scale {
            write_scale(&mut self.transform, scale);
        }
        if let Some(size) = update.size {
            self.width = size.width;
            self.height = size.height;
        }
        if let Some(origin) = &update.transform_origin {
            self.transform_origin = Some(origin.clone());
        }
        if let Some(transition) = &update.transition {
            self.transition = Some(transition.clone());
        }
    }

    fn bounding_rect(&self) -> Rect {
        let half = Vec2::new(self.width / 2.0, self.height / 2.0);
        let center = self.origin + Vec2::new(self.left, self.top) + half;
        let rotation = read_rotation(&self.transform).unwrap_or(0.0);
        let scale = read_scale(&self.transform).unwrap_or(1.0);
        let transform = Affine::translate(center.to_vec2())
            * Affine::rotate(rotation.to_radians())
            * Affine::scale(scale);
        transform.transform_rect_bbox(Rect::new(-half.x, -half.y, half.x, half.y))
    }
}

/// Reads the angle of a `rotate(<n>deg)` function, in degrees.
#[must_use]
pub fn read_rotation(transform: &str) -> Option<f64> {
    let (_, args) = find_function(transform, "rotate")?;
    args.trim().strip_suffix("deg")?.trim().parse().ok()
}

/// Reads the factor of a `scale(<n>)` function.
#[must_use]
pub fn read_scale(transform: &str) -> Option<f64> {
    let (_, args) = find_function(transform, "scale")?;
    args.trim().parse().ok()
}

/// Replaces (or appends) the `rotate(..)` function.
pub fn write_rotation(transform: &mut String, degrees: f64) {
    replace_function(transform, "rotate", &format!("rotate({degrees}deg)"));
}

/// Replaces (or appends) the `scale(..)` function.
pub fn write_scale(transform: &mut String, scale: f64) {
    replace_function(transform, "scale", &format!("scale({scale})"));
}

fn replace_function(transform: &mut String, name: &str, encoded: &str) {
    match find_function(transform, name) {
        Some((range, _)) => transform.replace_range(range, encoded),
        None => {
            if !transform.trim().is_empty() {
                transform.push(' ');
            }
            transform.push_str(encoded);
        }
    }
}

/// Finds `name(args)`, returning the byte range of the whole call and the args.
fn find_function<'a>(transform: &'a str, name: &str) -> Option<(Range<usize>, &'a str)> {
    let mut from = 0;
    while let Some(found) = transform[from..].find(name) {
        let start = from + found;
        let after_name = start + name.len();
        let boundary = transform[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '-');
        if boundary && transform[after_name..].starts_with('(') {
            let close = transform[after_name..].find(')')? + after_name;
            return Some((start..close + 1, &transform[after_name + 1..close]));
        }
        from = after_name;
    }
    None
}
