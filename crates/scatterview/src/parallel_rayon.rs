//! Implements a backend on top of a dedicated rayon thread pool

use rayon::prelude::*;
use scatterview_nostd_internal::{BackendProps, Executor, ScatterError, ThreadMember};
use std::num::{NonZeroU32, NonZeroUsize};

use crate::error::Error;

/// Runs work items on a rayon thread pool that is owned by the executor.
///
/// The worker id handed to each item is the index of the pool thread that
/// runs it, so ids are always smaller than the pool's thread count.
#[derive(Debug)]
pub struct RayonExecutor {
    pool: rayon::ThreadPool,
    favors_duplication: bool,
}

impl RayonExecutor {
    pub fn new(n_threads: NonZeroU32) -> Result<Self, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads.get() as usize)
            .thread_name(|i| format!("scatterview-{i}"))
            .build()
            .map_err(|err| Error::thread_pool(err.to_string()))?;
        Ok(RayonExecutor {
            pool,
            favors_duplication: false,
        })
    }

    /// Tell strategy selection that private copies of the grid are cheap
    pub fn with_favors_duplication(mut self, favors_duplication: bool) -> Self {
        self.favors_duplication = favors_duplication;
        self
    }

    pub fn n_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Executor for RayonExecutor {
    type MemberPropType = ThreadMember;

    fn backend_props(&self) -> BackendProps {
        BackendProps {
            concurrency: NonZeroUsize::new(self.n_threads()).unwrap_or(NonZeroUsize::MIN),
            is_vector_processor: false,
            favors_duplication: self.favors_duplication,
        }
    }

    fn submit<F>(&self, n_items: usize, op: F) -> Result<(), ScatterError>
    where
        F: Fn(usize, &ThreadMember) -> Result<(), ScatterError> + Sync,
    {
        self.pool.install(|| {
            (0..n_items).into_par_iter().try_for_each(|i| {
                // inside of `install`, we're always on one of the pool's
                // threads
                let rank = rayon::current_thread_index().unwrap_or(0);
                op(i, &ThreadMember::new(rank as u32))
            })
        })
    }

    fn for_each_block<T, F>(&self, data: &mut [T], block_len: NonZeroUsize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync,
    {
        let block_len = block_len.get();
        self.pool.install(|| {
            data.par_chunks_mut(block_len)
                .enumerate()
                .for_each(|(i, block)| f(i * block_len, block));
        });
    }
}
