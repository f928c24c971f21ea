//! Implements the "serial" backend

use scatterview_nostd_internal::{BackendProps, Executor, ScatterError, ThreadMember};
use std::num::NonZeroUsize;

/// Runs every work item, in order, on the calling thread.
///
/// This is mostly useful as a reference (the results of the other backends
/// should always match it) and for debugging.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialExecutor;

impl Executor for SerialExecutor {
    type MemberPropType = ThreadMember;

    fn backend_props(&self) -> BackendProps {
        BackendProps::serial()
    }

    fn submit<F>(&self, n_items: usize, op: F) -> Result<(), ScatterError>
    where
        F: Fn(usize, &ThreadMember) -> Result<(), ScatterError> + Sync,
    {
        let member = ThreadMember::new(0);
        for i in 0..n_items {
            op(i, &member)?;
        }
        Ok(())
    }

    fn for_each_block<T, F>(&self, data: &mut [T], block_len: NonZeroUsize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync,
    {
        let block_len = block_len.get();
        for (i, block) in data.chunks_mut(block_len).enumerate() {
            f(i * block_len, block);
        }
    }
}
