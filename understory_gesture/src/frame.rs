// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame scheduling for inertial tails.
//!
//! Hosts implement [`FrameClock`] on top of their repaint primitive (for
//! example a `requestAnimationFrame`-style callback or a compositor tick).
//! [`ManualFrameClock`] is a deterministic clock for tests and headless use.
//!
//! ```
//! use understory_gesture::frame::{FrameClock, ManualFrameClock};
//!
//! let clock = ManualFrameClock::new();
//! clock.request_frame(Box::new(|now| assert_eq!(now, 16.0)));
//! clock.advance(16.0);
//! assert_eq!(clock.run_frame(), 1);
//! assert_eq!(clock.pending_frames(), 0);
//! ```

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::cell::{Cell, RefCell};
use core::fmt;

/// Callback run once on the next frame with the frame time in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Clock and "run before next repaint" primitive.
pub trait FrameClock {
    /// Current time in milliseconds, on the same timeline as pointer event
    /// timestamps.
    fn now(&self) -> f64;

    /// Runs `callback` once before the next repaint.
    fn request_frame(&self, callback: FrameCallback);
}

/// A [`FrameClock`] whose time and frames advance only when told to.
#[derive(Default)]
pub struct ManualFrameClock {
    now: Cell<f64>,
    queue: RefCell<VecDeque<FrameCallback>>,
}

impl fmt::Debug for ManualFrameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualFrameClock")
            .field("now", &self.now.get())
            .field("pending_frames", &self.pending_frames())
            .finish_non_exhaustive()
    }
}

impl ManualFrameClock {
    /// Creates a clock at time zero with no pending frames.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time.
    pub fn set_now(&self, now: f64) {
        self.now.set(now);
    }

    /// Moves the current time forward by `dt` milliseconds.
    pub fn advance(&self, dt: f64) {
        self.now.set(self.now.get() + dt);
    }

    /// Runs the callbacks queued before this call and returns how many ran.
    ///
    /// Callbacks requested while the frame runs wait for the next frame.
    pub fn run_frame(&self) -> usize {
        let batch: VecDeque<FrameCallback> = core::mem::take(&mut *self.queue.borrow_mut());
        let now = self.now.get();
        let count = batch.len();
        for callback in batch {
            callback(now);
        }
        count
    }

    /// Number of callbacks waiting for the next frame.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Advances by `step` and runs frames until nothing is pending, at most
    /// `max_frames` times. Returns the number of frames run.
    pub fn run_until_idle(&self, step: f64, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.pending_frames() > 0 {
            self.advance(step);
            self.run_frame();
            frames += 1;
        }
        frames
    }
}

impl FrameClock for ManualFrameClock {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn request_frame(&self, callback: FrameCallback) {
        self.queue.borrow_mut().push_back(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec::Vec;

    #[test]
    fn callbacks_requested_during_a_frame_wait_for_the_next() {
        let clock = Rc::new(ManualFrameClock::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner_clock = clock.clone();
        let log = seen.clone();
        clock.request_frame(Box::new(move |now| {
            log.borrow_mut().push(now);
            let log = log.clone();
            inner_clock.request_frame(Box::new(move |now| log.borrow_mut().push(now)));
        }));

        clock.advance(10.0);
        assert_eq!(clock.run_frame(), 1);
        assert_eq!(clock.pending_frames(), 1);
        clock.advance(10.0);
        assert_eq!(clock.run_frame(), 1);
        assert_eq!(*seen.borrow(), [10.0, 20.0]);
    }

    #[test]
    fn run_until_idle_respects_frame_cap() {
        fn forever(clock: Rc<ManualFrameClock>) {
            let next = clock.clone();
            clock.request_frame(Box::new(move |_| forever(next)));
        }
        let clock = Rc::new(ManualFrameClock::new());
        forever(clock.clone());
        assert_eq!(clock.run_until_idle(16.0, 5), 5);
        assert_eq!(clock.now(), 80.0);
    }
}
