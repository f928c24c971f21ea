//! Implements a backend built on scoped OS threads.
//!
//! Every call to [`Executor::submit`] spawns a fresh set of threads inside of
//! [`std::thread::scope`] and joins them before returning. The work items are
//! split into contiguous partitions, one per thread. There's no load
//! balancing, which is fine for the uniform workloads we care about (use the
//! rayon backend otherwise).

use scatterview_nostd_internal::{BackendProps, Executor, ScatterError, ThreadMember};
use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Copy, Debug)]
pub struct ThreadExecutor {
    n_threads: NonZeroU32,
    favors_duplication: bool,
}

impl ThreadExecutor {
    pub fn new(n_threads: NonZeroU32) -> Self {
        ThreadExecutor {
            n_threads,
            favors_duplication: false,
        }
    }

    /// Tell strategy selection that private copies of the grid are cheap
    pub fn with_favors_duplication(mut self, favors_duplication: bool) -> Self {
        self.favors_duplication = favors_duplication;
        self
    }

    pub fn n_threads(&self) -> NonZeroU32 {
        self.n_threads
    }
}

impl Executor for ThreadExecutor {
    type MemberPropType = ThreadMember;

    fn backend_props(&self) -> BackendProps {
        BackendProps {
            concurrency: NonZeroUsize::new(self.n_threads.get() as usize)
                .unwrap_or(NonZeroUsize::MIN),
            is_vector_processor: false,
            favors_duplication: self.favors_duplication,
        }
    }

    fn submit<F>(&self, n_items: usize, op: F) -> Result<(), ScatterError>
    where
        F: Fn(usize, &ThreadMember) -> Result<(), ScatterError> + Sync,
    {
        if n_items == 0 {
            return Ok(());
        }
        let n_threads = (self.n_threads.get() as usize).min(n_items);
        let items_per_thread = n_items.div_ceil(n_threads);

        // set by the first thread that hits an error, so that the others
        // stop early
        let abort = AtomicBool::new(false);

        let results: Vec<Result<(), ScatterError>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..n_threads)
                .map(|rank| {
                    let op = &op;
                    let abort = &abort;
                    s.spawn(move || {
                        let member = ThreadMember::new(rank as u32);
                        let start = rank * items_per_thread;
                        let stop = n_items.min(start + items_per_thread);
                        for i in start..stop {
                            if abort.load(Ordering::Relaxed) {
                                break;
                            }
                            if let Err(err) = op(i, &member) {
                                abort.store(true, Ordering::Relaxed);
                                return Err(err);
                            }
                        }
                        Ok(())
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        });
        results.into_iter().collect()
    }

    fn for_each_block<T, F>(&self, data: &mut [T], block_len: NonZeroUsize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync,
    {
        let block_len = block_len.get();
        let n_blocks = data.len().div_ceil(block_len);
        let n_threads = (self.n_threads.get() as usize).min(n_blocks);
        if n_threads <= 1 {
            for (i, block) in data.chunks_mut(block_len).enumerate() {
                f(i * block_len, block);
            }
            return;
        }

        // deal the blocks out round-robin
        let mut per_thread: Vec<Vec<(usize, &mut [T])>> = (0..n_threads).map(|_| Vec::new()).collect();
        for (i, block) in data.chunks_mut(block_len).enumerate() {
            per_thread[i % n_threads].push((i * block_len, block));
        }

        // the scope joins every thread (and re-raises their panics)
        std::thread::scope(|s| {
            for blocks in per_thread {
                let f = &f;
                s.spawn(move || {
                    for (offset, block) in blocks {
                        f(offset, block);
                    }
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scatterview_nostd_internal::TeamMemberProp;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn executor(n_threads: u32) -> ThreadExecutor {
        ThreadExecutor::new(NonZeroU32::new(n_threads).unwrap())
    }

    #[test]
    fn every_item_runs_once() {
        for n_threads in [1, 3, 8] {
            let seen = Mutex::new(vec![0_u32; 100]);
            executor(n_threads)
                .submit(100, |i, member| {
                    assert!(member.get_id() < n_threads);
                    seen.lock().unwrap()[i] += 1;
                    Ok(())
                })
                .unwrap();
            assert!(seen.into_inner().unwrap().iter().all(|&count| count == 1));
        }
    }

    #[test]
    fn more_threads_than_items() {
        let n_calls = AtomicUsize::new(0);
        executor(16)
            .submit(3, |_, _| {
                n_calls.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
            .unwrap();
        assert_eq!(n_calls.into_inner(), 3);
        assert_eq!(executor(16).submit(0, |_, _| unreachable!()), Ok(()));
    }

    #[test]
    fn error_is_reported() {
        let result = executor(4).submit(1000, |i, _| {
            if i == 500 {
                Err(ScatterError::DoubleContribution)
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err(ScatterError::DoubleContribution));
    }

    #[test]
    #[should_panic]
    fn panic_is_propagated() {
        let _ = executor(2).submit(4, |i, _| {
            if i == 3 {
                panic!("boom");
            }
            Ok(())
        });
    }

    #[test]
    fn blocks_cover_data() {
        let mut data = vec![0_usize; 103];
        executor(4).for_each_block(&mut data, NonZeroUsize::new(10).unwrap(), |offset, block| {
            for (k, v) in block.iter_mut().enumerate() {
                *v += offset + k;
            }
        });
        assert_eq!(data, (0..103).collect::<Vec<_>>());
    }

    #[test]
    fn backend_props() {
        let props = executor(6).with_favors_duplication(true).backend_props();
        assert_eq!(props.concurrency.get(), 6);
        assert!(props.favors_duplication);
        assert!(!props.is_vector_processor);
    }
}
