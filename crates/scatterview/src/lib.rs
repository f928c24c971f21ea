/*!
Conflict-free scattering of contributions into a shared grid from many
concurrent workers.

<div class="warning">

This crate is still in early development.

</div>

# High-Level: Scatter Operations

Many particle & grid codes (e.g. histogramming, particle-in-cell deposition,
finite-element assembly) consist of a large number of independent work items
that each add a value into some cell of a grid. When the work items run in
parallel, two of them may hit the same cell at the same time. Resolving those
conflicts can be done in a few ways (atomic adds, private per-worker copies of
the grid that get summed afterwards, or just running serially), and the best
choice depends on the element type and on the hardware.

This crate hides that choice behind a [`ScatterBuffer`]. Usage looks like:

```
use scatterview::{ContextBuilder, StrategyHint};

let ctx = ContextBuilder::new()
    .backend("threads")
    .n_threads(4)
    .build()
    .unwrap();
let mut target = ctx.create_target::<f64>(&[4, 4]).unwrap();
let mut buffer = ctx
    .create_scatter_buffer(&target, StrategyHint::Automatic)
    .unwrap();

ctx.run_episode(&mut buffer, &mut target, 16, |i, handle| {
    handle.accumulate(&[i % 4, i / 4], 0.5)
})
.unwrap();
assert_eq!(target.total(), 8.0);
```

# Developer Guide

The strategies and the episode lifecycle live in
[`scatterview_nostd_internal`]. This crate supplies the concrete executors,
the [`ExecutionContext`] and the public [`Error`] type.
*/

#![deny(rustdoc::broken_intra_doc_links)]

// inform build-system of the crates in this package
mod context;
mod deposit;
mod error;
mod parallel_rayon;
mod parallel_serial;
mod parallel_threads;

// pull in symbols that visible outside of the package
pub use context::{BACKEND_NAMES, ContextBuilder, ExecutionContext, strategy_hint_from_name};
pub use deposit::deposit;
pub use error::Error;
pub use num_complex::Complex;
pub use parallel_rayon::RayonExecutor;
pub use parallel_serial::SerialExecutor;
pub use parallel_threads::ThreadExecutor;
pub use scatterview_nostd_internal::{
    AccessHandle, AccumulationTarget, AtomicSupport, BackendProps, Element, Executor, GridShape,
    ScatterBuffer, ScatterError, Strategy, StrategyHint, TeamMemberProp, ThreadMember,
    select_strategy,
};
