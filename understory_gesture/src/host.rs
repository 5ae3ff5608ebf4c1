// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use core::fmt;

use crate::frame::FrameClock;
use crate::input::InputSource;

/// Host capabilities a session needs: the document-level input source its
/// contacts subscribe to, and the frame clock that drives inertia.
#[derive(Clone)]
pub struct GestureHost {
    input: InputSource,
    clock: Rc<dyn FrameClock>,
}

impl fmt::Debug for GestureHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureHost")
            .field("input", &self.input)
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}

impl GestureHost {
    /// Bundles an input source and a frame clock.
    pub fn new(input: InputSource, clock: Rc<dyn FrameClock>) -> Self {
        Self { input, clock }
    }

    /// The document-level input source.
    #[must_use]
    pub fn input(&self) -> &InputSource {
        &self.input
    }

    /// The frame clock.
    #[must_use]
    pub fn clock(&self) -> &Rc<dyn FrameClock> {
        &self.clock
    }
}
