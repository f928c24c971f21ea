// A duplicate slot is a full-size private copy of the grid.
//
// Exclusive ownership of a slot is established at runtime with the `claimed`
// flag: a SlotGuard only exists while it holds the flag, and only a guard
// hands out mutable access to the cells (while workers are running). Once
// the accumulate phase is over, the owner of the ScatterBuffer has `&mut`
// access to every slot and can use them without the flag.

use alloc::boxed::Box;
use alloc::vec;
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::element::Element;

pub(crate) struct DuplicateSlot<T> {
    cells: UnsafeCell<Box<[T]>>,
    claimed: AtomicBool,
    // set whenever the slot gets claimed. An untouched slot is known to
    // hold zeros
    touched: AtomicBool,
}

// SAFETY: the cells are only mutated through `&mut DuplicateSlot` or through
// a SlotGuard. At most one SlotGuard exists per slot at a time (the
// compare-exchange in `try_claim` guarantees it) and the Acquire/Release
// pair on `claimed` orders the writes of consecutive owners.
unsafe impl<T: Send> Sync for DuplicateSlot<T> {}

impl<T: Element> DuplicateSlot<T> {
    pub(crate) fn new(n_cells: usize) -> Self {
        DuplicateSlot {
            cells: UnsafeCell::new(vec![T::zero(); n_cells].into_boxed_slice()),
            claimed: AtomicBool::new(false),
            touched: AtomicBool::new(false),
        }
    }

    /// Try to take exclusive ownership of the slot. This never blocks.
    pub(crate) fn try_claim(&self) -> Option<SlotGuard<'_, T>> {
        self.claimed
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()?;
        self.touched.store(true, Ordering::Relaxed);
        Some(SlotGuard { slot: self })
    }

    /// the cells, if the slot has been claimed since the last call to
    /// `clear` (otherwise, every cell is known to be zero)
    pub(crate) fn touched_cells(&mut self) -> Option<&mut [T]> {
        if *self.touched.get_mut() {
            Some(self.cells.get_mut())
        } else {
            None
        }
    }

    /// zero the cells (if needed)
    pub(crate) fn clear(&mut self) {
        if let Some(cells) = self.touched_cells() {
            cells.fill(T::zero());
        }
        *self.touched.get_mut() = false;
    }

    /// Mark the slot as holding zeros (the caller is responsible for actually
    /// zeroing the cells)
    pub(crate) fn mark_untouched(&mut self) {
        *self.touched.get_mut() = false;
    }

    #[cfg(test)]
    pub(crate) fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Relaxed)
    }
}

/// Exclusive ownership of a duplicate slot. Dropping the guard releases the
/// slot.
pub(crate) struct SlotGuard<'a, T> {
    slot: &'a DuplicateSlot<T>,
}

impl<T> SlotGuard<'_, T> {
    #[inline(always)]
    pub(crate) fn cells(&mut self) -> &mut [T] {
        // SAFETY: the guard holds the claim on the slot, so no other guard
        // exists. Nobody can get `&mut DuplicateSlot` while the guard
        // borrows it, and the returned reference can't outlive `&mut self`.
        unsafe { &mut *self.slot.cells.get() }
    }
}

impl<T> Drop for SlotGuard<'_, T> {
    fn drop(&mut self) {
        self.slot.claimed.store(false, Ordering::Release);
    }
}
