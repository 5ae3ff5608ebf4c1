// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;

/// Handle returned when registering a listener; used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Listeners keyed by phase, kept in subscription order.
pub(crate) struct ListenerRegistry<P, F: ?Sized> {
    next_id: u64,
    entries: Vec<(P, ListenerId, Rc<F>)>,
}

impl<P, F: ?Sized> Default for ListenerRegistry<P, F> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<P: fmt::Debug, F: ?Sized> fmt::Debug for ListenerRegistry<P, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(phase, id, _)| (phase, id)))
            .finish()
    }
}

impl<P: Copy + PartialEq, F: ?Sized> ListenerRegistry<P, F> {
    pub(crate) fn add(&mut self, phase: P, listener: Rc<F>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((phase, id, listener));
        id
    }

    /// Removes one listener, or every listener of `phase` when `id` is `None`.
    pub(crate) fn remove(&mut self, phase: P, id: Option<ListenerId>) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|(p, i, _)| *p != phase || id.is_some_and(|id| id != *i));
        self.entries.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn count(&self, phase: P) -> usize {
        self.entries.iter().filter(|(p, ..)| *p == phase).count()
    }

    /// Listeners of `phase`, cloned out so callers can dispatch without
    /// holding a borrow of the registry.
    pub(crate) fn snapshot(&self, phase: P) -> SmallVec<[Rc<F>; 4]> {
        self.entries
            .iter()
            .filter(|(p, ..)| *p == phase)
            .map(|(_, _, listener)| listener.clone())
            .collect()
    }
}
