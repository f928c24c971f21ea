//! The explicit execution context.
//!
//! An [`ExecutionContext`] owns the executor for one of the named backends and
//! the settings that go along with it. It's created (and dropped) by the
//! caller; nothing in this crate relies on global state.

use scatterview_nostd_internal::{
    AccessHandle, AccumulationTarget, BackendProps, Element, Executor, ScatterBuffer,
    ScatterError, StrategyHint, select_strategy,
};
use std::num::{NonZeroU32, NonZeroUsize};
use tracing::{debug, debug_span, trace, warn};

use crate::error::Error;
use crate::parallel_rayon::RayonExecutor;
use crate::parallel_serial::SerialExecutor;
use crate::parallel_threads::ThreadExecutor;

/// The names of the backends known to [`ContextBuilder::backend`]
pub const BACKEND_NAMES: [&str; 3] = ["serial", "threads", "rayon"];

const DEFAULT_REDUCE_BLOCK_LEN: usize = 4096;

/// Parse a strategy hint from its name (see [`StrategyHint::NAMES`])
pub fn strategy_hint_from_name(name: &str) -> Result<StrategyHint, Error> {
    StrategyHint::from_name(name)
        .ok_or_else(|| Error::strategy_name(name.to_string(), &StrategyHint::NAMES))
}

#[derive(Debug)]
enum Backend {
    Serial(SerialExecutor),
    Threads(ThreadExecutor),
    Rayon(RayonExecutor),
}

/// Configures an [`ExecutionContext`]
///
/// # Example
/// ```
/// use scatterview::ContextBuilder;
/// let ctx = ContextBuilder::new()
///     .backend("threads")
///     .n_threads(4)
///     .build()
///     .unwrap();
/// assert_eq!(ctx.backend_props().concurrency.get(), 4);
/// ```
#[derive(Clone, Debug)]
pub struct ContextBuilder {
    backend: String,
    n_threads: Option<usize>,
    favor_duplication: bool,
    reduce_block_len: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    /// By default, we use the serial backend
    pub fn new() -> Self {
        ContextBuilder {
            backend: "serial".to_string(),
            n_threads: None,
            favor_duplication: false,
            reduce_block_len: DEFAULT_REDUCE_BLOCK_LEN,
        }
    }

    /// one of [`BACKEND_NAMES`]
    pub fn backend(mut self, name: &str) -> Self {
        self.backend = name.to_string();
        self
    }

    /// The number of threads used by the "threads" & "rayon" backends. When
    /// this isn't specified, we use [`std::thread::available_parallelism`].
    pub fn n_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = Some(n_threads);
        self
    }

    /// Report that private copies of the grid are cheap, which makes
    /// automatic strategy selection prefer the duplicated strategy
    pub fn favor_duplication(mut self, favor_duplication: bool) -> Self {
        self.favor_duplication = favor_duplication;
        self
    }

    /// The number of cells handled at a time while folding a buffer into a
    /// target
    pub fn reduce_block_len(mut self, reduce_block_len: usize) -> Self {
        self.reduce_block_len = reduce_block_len;
        self
    }

    pub fn build(self) -> Result<ExecutionContext, Error> {
        let reduce_block_len = NonZeroUsize::new(self.reduce_block_len).ok_or_else(|| {
            Error::integer_range("reduce_block_len", 0, 1, i64::MAX)
        })?;

        let n_threads = match self.n_threads {
            Some(n) => u32::try_from(n)
                .ok()
                .and_then(NonZeroU32::new)
                .ok_or_else(|| {
                    Error::integer_range(
                        "n_threads",
                        i64::try_from(n).unwrap_or(i64::MAX),
                        1,
                        u32::MAX as i64,
                    )
                })?,
            None => std::thread::available_parallelism()
                .ok()
                .and_then(|n| u32::try_from(n.get()).ok())
                .and_then(NonZeroU32::new)
                .unwrap_or(NonZeroU32::MIN),
        };

        let backend = match self.backend.as_str() {
            "serial" => {
                if n_threads.get() > 1 && self.n_threads.is_some() {
                    warn!(n_threads = n_threads.get(), "the serial backend ignores n_threads");
                }
                Backend::Serial(SerialExecutor)
            }
            "threads" => Backend::Threads(
                ThreadExecutor::new(n_threads).with_favors_duplication(self.favor_duplication),
            ),
            "rayon" => Backend::Rayon(
                RayonExecutor::new(n_threads)?.with_favors_duplication(self.favor_duplication),
            ),
            other => return Err(Error::backend_name(other.to_string(), &BACKEND_NAMES)),
        };

        let ctx = ExecutionContext {
            backend,
            reduce_block_len,
        };
        let props = ctx.backend_props();
        debug!(
            backend = ctx.backend_name(),
            concurrency = props.concurrency.get(),
            favors_duplication = props.favors_duplication,
            "built execution context"
        );
        Ok(ctx)
    }
}

/// Owns an executor and drives scatter episodes with it.
#[derive(Debug)]
pub struct ExecutionContext {
    backend: Backend,
    reduce_block_len: NonZeroUsize,
}

impl ExecutionContext {
    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Serial(_) => "serial",
            Backend::Threads(_) => "threads",
            Backend::Rayon(_) => "rayon",
        }
    }

    pub fn backend_props(&self) -> BackendProps {
        match &self.backend {
            Backend::Serial(executor) => executor.backend_props(),
            Backend::Threads(executor) => executor.backend_props(),
            Backend::Rayon(executor) => executor.backend_props(),
        }
    }

    /// Create a zero-filled target with the specified extents
    pub fn create_target<T: Element>(
        &self,
        extents: &[usize],
    ) -> Result<AccumulationTarget<T>, Error> {
        Ok(AccumulationTarget::new(extents)?)
    }

    /// Create a buffer for `target`, using the strategy that `hint` resolves
    /// to on this context's backend
    pub fn create_scatter_buffer<T: Element>(
        &self,
        target: &AccumulationTarget<T>,
        hint: StrategyHint,
    ) -> Result<ScatterBuffer<T>, Error> {
        let props = self.backend_props();
        let strategy = select_strategy::<T>(hint, &props)?;
        debug!(
            element = T::NAME,
            ?hint,
            strategy = strategy.name(),
            concurrency = props.concurrency.get(),
            shape = ?target.shape(),
            "selected scatter strategy"
        );
        Ok(ScatterBuffer::new(target, strategy)?)
    }

    /// Run a full episode: reset `buffer`, call `op(i, handle)` for every
    /// `i` in `0..n_items` (concurrently, in no particular order) and then
    /// fold the buffer into `target`.
    ///
    /// When any call to `op` fails, the episode is abandoned and the error
    /// is returned without touching `target`. A buffer with fewer duplicate
    /// slots than this context's concurrency (e.g. one that was created by a
    /// smaller context) is rejected with [`ScatterError::TooManyWorkers`]
    /// before anything runs.
    pub fn run_episode<T, F>(
        &self,
        buffer: &mut ScatterBuffer<T>,
        target: &mut AccumulationTarget<T>,
        n_items: usize,
        op: F,
    ) -> Result<(), Error>
    where
        T: Element,
        F: Fn(usize, &mut AccessHandle<'_, T>) -> Result<(), ScatterError> + Sync,
    {
        let block_len = self.reduce_block_len;
        match &self.backend {
            Backend::Serial(executor) => {
                episode(executor, buffer, target, n_items, block_len, op)
            }
            Backend::Threads(executor) => {
                episode(executor, buffer, target, n_items, block_len, op)
            }
            Backend::Rayon(executor) => {
                episode(executor, buffer, target, n_items, block_len, op)
            }
        }
    }
}

fn episode<T, E, F>(
    executor: &E,
    buffer: &mut ScatterBuffer<T>,
    target: &mut AccumulationTarget<T>,
    n_items: usize,
    block_len: NonZeroUsize,
    op: F,
) -> Result<(), Error>
where
    T: Element,
    E: Executor,
    F: Fn(usize, &mut AccessHandle<'_, T>) -> Result<(), ScatterError> + Sync,
{
    let span = debug_span!("episode", strategy = buffer.strategy().name(), n_items);
    let _guard = span.enter();

    buffer.check_backend(&executor.backend_props())?;

    buffer.reset();
    trace!("buffer reset");

    let shared: &ScatterBuffer<T> = buffer;
    let result = executor.submit(n_items, |i, member| {
        let mut handle = shared.access(member)?;
        op(i, &mut handle)
    });
    if let Err(err) = result {
        warn!(%err, "episode aborted before contribute");
        return Err(err.into());
    }

    buffer.contribute_with(target, executor, block_len)?;
    trace!("contributed to target");
    Ok(())
}
