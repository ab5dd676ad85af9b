//! Allocation scopes for decoded values.
//!
//! A [`LazyField`](crate::LazyField) obtains storage for its decoded value from
//! a [`Scope`]. The default, [`Heap`], boxes each value and the container frees
//! it. A borrowed [`Arena`] instead owns every value allocated through it; the
//! container never frees one individually and all of them are dropped together
//! with the arena. The borrow checker ties arena-scoped containers to the
//! arena's lifetime, so none can outlive the memory it points into.

use alloc::{boxed::Box, vec::Vec};
use core::{cell::RefCell, fmt, ops::DerefMut, ptr::NonNull};

/// Where decoded values live.
pub trait Scope<M>: Copy {
    /// Handle to one allocated value.
    type Slot: DerefMut<Target = M>;

    /// Allocate `value` in this scope.
    fn alloc(self, value: M) -> Self::Slot;

    /// Whether values are owned by something other than the container.
    fn is_external(self) -> bool;
}

/// Container-owned storage: each decoded value is boxed and freed with its
/// container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Heap;

impl<M> Scope<M> for Heap {
    type Slot = Box<M>;

    #[inline]
    fn alloc(self, value: M) -> Box<M> {
        Box::new(value)
    }

    fn is_external(self) -> bool {
        false
    }
}

impl<'a, M> Scope<M> for &'a Arena<M> {
    type Slot = &'a mut M;

    #[inline]
    fn alloc(self, value: M) -> &'a mut M {
        Arena::alloc(self, value)
    }

    fn is_external(self) -> bool {
        true
    }
}

/// Owns values of one type until it is dropped.
///
/// Allocation goes through `&self`, so many containers can share one arena.
/// The arena is neither `Send` nor `Sync`: it belongs to a single
/// construction/traversal context.
pub struct Arena<M> {
    slots: RefCell<Vec<NonNull<M>>>,
}

impl<M> Arena<M> {
    /// Create an empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
        }
    }

    /// Move `value` into the arena and return exclusive access to it.
    ///
    /// The value lives until the arena is dropped; the returned reference is
    /// the only path to it.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc(&self, value: M) -> &mut M {
        let mut slot = NonNull::from(Box::leak(Box::new(value)));
        self.slots.borrow_mut().push(slot);
        // SAFETY: `slot` comes from a leaked box that is only freed in `Drop`,
        // which cannot run while `&self` is borrowed. The pointer is handed out
        // exactly once, so the returned reference is unique.
        unsafe { slot.as_mut() }
    }

    /// Number of values allocated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Whether nothing has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<M> Default for Arena<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Drop for Arena<M> {
    fn drop(&mut self) {
        for slot in self.slots.get_mut().drain(..) {
            // SAFETY: every slot was produced by `Box::leak` in `alloc` and is
            // reclaimed exactly once here; all borrows handed out by `alloc`
            // have ended because `drop` holds `&mut self`.
            drop(unsafe { Box::from_raw(slot.as_ptr()) });
        }
    }
}

impl<M> fmt::Debug for Arena<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena").field("len", &self.len()).finish()
    }
}
