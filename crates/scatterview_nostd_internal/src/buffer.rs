//! The race-free intermediate storage used while scattering contributions.
//!
//! A [`ScatterBuffer`] is used in "episodes." An episode consists of:
//! 1. [`ScatterBuffer::reset`]
//! 2. an accumulate phase, where any number of workers concurrently call
//!    [`ScatterBuffer::access`] and add contributions through the returned
//!    [`AccessHandle`]s
//! 3. [`ScatterBuffer::contribute`] (or [`ScatterBuffer::contribute_with`]),
//!    which folds everything that was accumulated into an
//!    [`AccumulationTarget`]
//!
//! The barriers between the phases are expressed through borrowing: `reset`
//! and `contribute` take `&mut self` while `access` takes `&self`. Since an
//! [`AccessHandle`] borrows the buffer, the compiler won't let a buffer be
//! contributed while a handle is still alive. Executors join every worker
//! before [`crate::Executor::submit`] returns, which makes all writes from
//! the accumulate phase visible to the reduction.
//!
//! The remaining discipline rules (reset before access, contribute at most
//! once per episode) are checked at runtime.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::num::NonZeroUsize;

use crate::access::{AccessHandle, HandleCells};
use crate::element::{AtomicCell, Element};
use crate::error::ScatterError;
use crate::grid::{AccumulationTarget, GridShape};
use crate::parallel::{BackendProps, Executor, TeamMemberProp};
use crate::slot::DuplicateSlot;
use crate::strategy::Strategy;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EpisodeState {
    /// reset hasn't been called since the buffer was constructed
    Idle,
    /// reset has been called. Handles can be acquired
    Ready,
    /// the episode's contributions have been folded into a target
    Contributed,
}

enum Storage<T: Element> {
    /// the atomic strategy's cells. They always hold zeros outside of an
    /// episode (contribute drains them)
    Atomic(Box<[T::Atomic]>),
    /// the duplicate slots (there's exactly 1 for the serial strategy)
    Slots(Box<[DuplicateSlot<T>]>),
}

/// Race-free intermediate accumulation structure.
///
/// See the module-level documentation for a description of the lifecycle.
pub struct ScatterBuffer<T: Element> {
    shape: GridShape,
    strategy: Strategy,
    storage: Storage<T>,
    state: EpisodeState,
}

impl<T: Element> ScatterBuffer<T> {
    /// Construct a buffer that can be contributed to `target` (or any other
    /// target with the same shape)
    pub fn new(target: &AccumulationTarget<T>, strategy: Strategy) -> Result<Self, ScatterError> {
        Self::with_shape(target.grid_shape().clone(), strategy)
    }

    pub fn with_shape(shape: GridShape, strategy: Strategy) -> Result<Self, ScatterError> {
        strategy.check_element::<T>()?;
        let n_cells = shape.n_cells();
        let storage = match strategy {
            Strategy::Atomic => {
                let mut cells = Vec::with_capacity(n_cells);
                for _ in 0..n_cells {
                    let cell = T::Atomic::zeroed().ok_or(ScatterError::UnsupportedStrategy {
                        strategy: "atomic",
                        reason: "the element type has no atomic add",
                    })?;
                    cells.push(cell);
                }
                Storage::Atomic(cells.into_boxed_slice())
            }
            Strategy::Duplicated { n_duplicates } => Storage::Slots(
                (0..n_duplicates.get())
                    .map(|_| DuplicateSlot::new(n_cells))
                    .collect(),
            ),
            Strategy::Serial => Storage::Slots(vec![DuplicateSlot::new(n_cells)].into_boxed_slice()),
        };
        Ok(ScatterBuffer {
            shape,
            strategy,
            storage,
            state: EpisodeState::Idle,
        })
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn shape(&self) -> &[usize] {
        self.shape.extents()
    }

    /// The number of duplicate slots (0 for the atomic strategy)
    pub fn n_slots(&self) -> usize {
        match &self.storage {
            Storage::Atomic(_) => 0,
            Storage::Slots(slots) => slots.len(),
        }
    }

    /// Returns an error unless the buffer can serve every worker of a backend
    /// described by `backend` at once.
    ///
    /// With fewer slots than concurrent workers, whether [`Self::access`]
    /// runs out of slots would depend on thread timing. Any executor that
    /// drives this buffer should pass this check.
    pub fn check_backend(&self, backend: &BackendProps) -> Result<(), ScatterError> {
        let concurrency = backend.concurrency.get();
        match &self.storage {
            Storage::Atomic(_) => Ok(()),
            Storage::Slots(slots) if concurrency > slots.len() => {
                Err(ScatterError::TooManyWorkers {
                    concurrency,
                    n_slots: slots.len(),
                })
            }
            Storage::Slots(_) => Ok(()),
        }
    }

    /// Whether the buffer has been reset and hasn't been contributed yet
    pub fn is_ready(&self) -> bool {
        self.state == EpisodeState::Ready
    }

    /// Start a new episode.
    ///
    /// The duplicate slots that were touched since the last reset are zeroed
    /// (untouched slots already hold zeros). The atomic cells are drained by
    /// every contribute, so they only need to be zeroed when the last episode
    /// was abandoned before it was contributed.
    pub fn reset(&mut self) {
        match &mut self.storage {
            Storage::Atomic(cells) => {
                if self.state == EpisodeState::Ready {
                    for cell in cells.iter() {
                        cell.swap_zero();
                    }
                }
            }
            Storage::Slots(slots) => {
                for slot in slots.iter_mut() {
                    slot.clear();
                }
            }
        }
        self.state = EpisodeState::Ready;
    }

    /// Obtain a handle for the worker described by `member`.
    ///
    /// For the atomic strategy, every handle writes to the same atomic cells.
    /// Otherwise, the handle claims a duplicate slot: the preferred slot is
    /// `member.get_id() % self.n_slots()`. When another live handle holds
    /// it, the remaining slots are tried in order. This never blocks, but it
    /// fails with [`ScatterError::SlotsExhausted`] if every slot is held
    /// (i.e. there are more live handles than the executor's concurrency).
    ///
    /// Each worker must hold at most one handle at a time, and the executor's
    /// concurrency must not exceed the number of slots (see
    /// [`Self::check_backend`]). Otherwise, the outcome depends on timing.
    pub fn access<M: TeamMemberProp>(&self, member: &M) -> Result<AccessHandle<'_, T>, ScatterError> {
        if self.state != EpisodeState::Ready {
            return Err(ScatterError::UninitializedBuffer);
        }
        let cells = match &self.storage {
            Storage::Atomic(cells) => HandleCells::Atomic(&cells[..]),
            Storage::Slots(slots) => {
                let n_slots = slots.len();
                let preferred = (member.get_id() as usize) % n_slots;
                (0..n_slots)
                    .map(|k| (preferred + k) % n_slots)
                    .find_map(|index| {
                        slots[index]
                            .try_claim()
                            .map(|guard| HandleCells::Slot { index, guard })
                    })
                    .ok_or(ScatterError::SlotsExhausted { n_slots })?
            }
        };
        Ok(AccessHandle::new(&self.shape, cells))
    }

    /// Fold the episode's contributions into `target` on the calling thread.
    pub fn contribute(&mut self, target: &mut AccumulationTarget<T>) -> Result<(), ScatterError> {
        self.contribute_impl(target, |cells, f| f(0, cells))
    }

    /// Fold the episode's contributions into `target`, using `executor` to
    /// process disjoint blocks of (at most) `block_len` cells concurrently.
    pub fn contribute_with<E: Executor>(
        &mut self,
        target: &mut AccumulationTarget<T>,
        executor: &E,
        block_len: NonZeroUsize,
    ) -> Result<(), ScatterError> {
        self.contribute_impl(target, |cells, f| {
            executor.for_each_block(cells, block_len, f)
        })
    }

    // `run_blocks` is responsible for calling the provided closure on
    // disjoint blocks that cover the full slice that it receives
    fn contribute_impl<R>(
        &mut self,
        target: &mut AccumulationTarget<T>,
        run_blocks: R,
    ) -> Result<(), ScatterError>
    where
        R: FnOnce(&mut [T], &(dyn Fn(usize, &mut [T]) + Sync)),
    {
        match self.state {
            EpisodeState::Idle => return Err(ScatterError::UninitializedBuffer),
            EpisodeState::Contributed => return Err(ScatterError::DoubleContribution),
            EpisodeState::Ready => (),
        }
        self.shape.check_same(target.grid_shape())?;

        let target_cells = target.as_mut_slice();
        match (&mut self.storage, self.strategy) {
            (Storage::Atomic(cells), _) => {
                let cells: &[T::Atomic] = cells;
                run_blocks(target_cells, &|offset: usize, block: &mut [T]| {
                    for (dst, cell) in block.iter_mut().zip(&cells[offset..]) {
                        T::add_into(dst, cell.swap_zero());
                    }
                });
            }
            (Storage::Slots(slots), Strategy::Serial) => {
                // the serial slot is drained right away, which keeps the
                // next reset cheap. There's only 1 worker, so there isn't
                // much point in splitting this up
                let slot = &mut slots[0];
                if let Some(slot_cells) = slot.touched_cells() {
                    for (dst, src) in target_cells.iter_mut().zip(slot_cells.iter_mut()) {
                        T::add_into(dst, *src);
                        *src = T::zero();
                    }
                }
                slot.mark_untouched();
            }
            (Storage::Slots(slots), _) => {
                // untouched slots hold nothing but zeros, so we skip them
                let touched: Vec<&[T]> = slots
                    .iter_mut()
                    .filter_map(|slot| slot.touched_cells().map(|cells| &*cells))
                    .collect();
                if !touched.is_empty() {
                    run_blocks(target_cells, &|offset: usize, block: &mut [T]| {
                        for slot_cells in touched.iter() {
                            let src = &slot_cells[offset..offset + block.len()];
                            for (dst, &value) in block.iter_mut().zip(src) {
                                T::add_into(dst, value);
                            }
                        }
                    });
                }
            }
        }
        self.state = EpisodeState::Contributed;
        Ok(())
    }
}
