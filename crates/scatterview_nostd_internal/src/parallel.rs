//! Our parallelism abstractions use the concepts of workers & executors
//!
//! A scatter operation is an unordered collection of independent work items
//! (usually one per contribution). An executor dispatches the work items
//! across 1 or more concurrent workers. We make no promises about the order
//! in which items run or about which worker runs a given item.
//!
//! Workers are described by [`TeamMemberProp`]. On CPUs, a worker usually
//! corresponds to a thread. A worker could also be a SIMD lane driven by a
//! single thread (in which case, private copies of the grid are cheap to
//! make locally).
//!
//! The only thing that the scatter machinery needs to know about a worker is
//! its id. That id is used to pick a preferred duplicate slot in a
//! [`crate::ScatterBuffer`].

use core::num::NonZeroUsize;

use crate::error::ScatterError;

/// Used to describes the properties of a worker (aka a team member).
pub trait TeamMemberProp {
    const IS_VECTOR_PROCESSOR: bool;

    /// when SELF::IS_VECTOR_PROCESSOR is `true`, this will return 0
    fn get_id(&self) -> u32;
}

/// A worker that corresponds to a full thread
#[derive(Clone, Copy, Debug)]
pub struct ThreadMember(u32);

impl ThreadMember {
    pub fn new(rank: u32) -> Self {
        ThreadMember(rank)
    }
}

impl TeamMemberProp for ThreadMember {
    const IS_VECTOR_PROCESSOR: bool = false;

    fn get_id(&self) -> u32 {
        self.0
    }
}

/// Describes the parallelism characteristics of an executor.
///
/// This is the only information about a backend that goes into choosing a
/// scatter strategy (see [`crate::select_strategy`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendProps {
    /// the maximum number of workers that may run at the same time. Worker
    /// ids are always smaller than this number.
    pub concurrency: NonZeroUsize,
    /// whether the workers are vector lanes driven by a single thread
    pub is_vector_processor: bool,
    /// whether private copies of the grid are cheap for this backend
    pub favors_duplication: bool,
}

impl BackendProps {
    /// properties of a backend with a single worker
    pub fn serial() -> Self {
        BackendProps {
            concurrency: NonZeroUsize::MIN,
            is_vector_processor: false,
            favors_duplication: false,
        }
    }
}

/// a trait for expressing how to launch parallel work
///
/// We implement this for each parallelism "backend," so we have a uniform
/// interface for easily switching between backends. The scatter machinery
/// never spawns work on its own.
pub trait Executor {
    /// The choice of type indicates whether the workers correspond to
    /// individual threads OR the lanes driven by a single thread
    type MemberPropType: TeamMemberProp;

    fn backend_props(&self) -> BackendProps;

    /// Calls `op(i, member)` for every `i` in `0..n_items`.
    ///
    /// `member` describes the worker executing the item. The items may run
    /// concurrently and in any order. When an item fails, the executor stops
    /// launching new items (items that already started run to completion) and
    /// returns an error from one of the failed items.
    ///
    /// Every call to `op` has finished (and its writes are visible) by the
    /// time this returns.
    fn submit<F>(&self, n_items: usize, op: F) -> Result<(), ScatterError>
    where
        F: Fn(usize, &Self::MemberPropType) -> Result<(), ScatterError> + Sync;

    /// Splits `data` into contiguous blocks of (at most) `block_len`
    /// elements and calls `f(offset, block)` for each of them, where `offset`
    /// is the index of the block's first element within `data`.
    ///
    /// The blocks are disjoint, so they may be processed concurrently.
    fn for_each_block<T, F>(&self, data: &mut [T], block_len: NonZeroUsize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync;
}
