use crate::element::{AtomicCell, Element};
use crate::error::ScatterError;
use crate::grid::GridShape;
use crate::slot::SlotGuard;

/// Where an AccessHandle writes its contributions
pub(crate) enum HandleCells<'a, T: Element> {
    /// the buffer's atomic cells (shared by every handle)
    Atomic(&'a [T::Atomic]),
    /// a duplicate slot (owned by this handle until it's dropped)
    Slot {
        index: usize,
        guard: SlotGuard<'a, T>,
    },
}

/// A short-lived proxy that a worker uses to add contributions into a
/// [`crate::ScatterBuffer`].
///
/// Handles are obtained with [`crate::ScatterBuffer::access`]. A handle
/// borrows the buffer, so every handle must be dropped before the buffer can
/// be contributed (or reset).
///
/// The slot that a handle writes to is fixed for the handle's lifetime, but
/// two handles obtained by the same worker may be bound to different slots.
pub struct AccessHandle<'a, T: Element> {
    shape: &'a GridShape,
    cells: HandleCells<'a, T>,
}

impl<'a, T: Element> AccessHandle<'a, T> {
    pub(crate) fn new(shape: &'a GridShape, cells: HandleCells<'a, T>) -> Self {
        AccessHandle { shape, cells }
    }

    /// Add `delta` to the cell at `coords`
    ///
    /// Fails with [`ScatterError::OutOfBoundsIndex`] (without modifying
    /// anything) when `coords` lies outside of the grid.
    #[inline]
    pub fn accumulate(&mut self, coords: &[usize], delta: T) -> Result<(), ScatterError> {
        let offset = self.shape.offset(coords)?;
        match &mut self.cells {
            HandleCells::Atomic(cells) => cells[offset].atomic_add(delta),
            HandleCells::Slot { guard, .. } => T::add_into(&mut guard.cells()[offset], delta),
        }
        Ok(())
    }

    /// The index of the duplicate slot that this handle writes to (`None`
    /// for the atomic strategy)
    pub fn slot_index(&self) -> Option<usize> {
        match &self.cells {
            HandleCells::Atomic(_) => None,
            HandleCells::Slot { index, .. } => Some(*index),
        }
    }

    pub fn shape(&self) -> &[usize] {
        self.shape.extents()
    }
}
