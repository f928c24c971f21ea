use scatterview::{
    AccumulationTarget, ContextBuilder, ExecutionContext, ScatterBuffer, ScatterError, Strategy,
    StrategyHint, ThreadMember,
};

mod common;

use common::{all_contexts, init_logging};

fn context(backend: &str, n_threads: usize) -> ExecutionContext {
    ContextBuilder::new()
        .backend(backend)
        .n_threads(n_threads)
        .build()
        .unwrap()
}

#[test]
fn single_worker_scenario() {
    init_logging();
    let contribs: [([usize; 3], i32); 4] =
        [([0, 0, 0], 1), ([0, 0, 1], 2), ([1, 0, 0], 3), ([1, 1, 1], 4)];
    for ctx in all_contexts() {
        for hint in [
            StrategyHint::Automatic,
            StrategyHint::Atomic,
            StrategyHint::Duplicated,
        ] {
            let mut target = ctx.create_target::<i32>(&[2, 2, 2]).unwrap();
            let mut buffer = ctx.create_scatter_buffer(&target, hint).unwrap();
            ctx.run_episode(&mut buffer, &mut target, contribs.len(), |i, handle| {
                handle.accumulate(&contribs[i].0, contribs[i].1)
            })
            .unwrap();
            assert_eq!(target.as_slice(), &[1, 2, 0, 0, 3, 0, 0, 4]);
        }
    }
}

#[test]
fn same_cell_any_worker_count() {
    init_logging();
    let values = [1.5_f64, 2.5];
    for n_workers in [1, 4, 64] {
        for backend in ["threads", "rayon"] {
            let ctx = context(backend, n_workers);
            for hint in [
                StrategyHint::Automatic,
                StrategyHint::Atomic,
                StrategyHint::Duplicated,
            ] {
                let mut target = ctx.create_target::<f64>(&[3, 3, 3]).unwrap();
                let mut buffer = ctx.create_scatter_buffer(&target, hint).unwrap();
                ctx.run_episode(&mut buffer, &mut target, values.len(), |i, handle| {
                    handle.accumulate(&[0, 0, 0], values[i])
                })
                .unwrap();
                assert_eq!(target.get(&[0, 0, 0]).unwrap(), 4.0);
                assert_eq!(target.total(), 4.0);
            }
        }
    }
}

#[test]
fn out_of_bounds_leaves_target_unmodified() {
    for ctx in all_contexts() {
        let mut target = AccumulationTarget::from_elem(&[2, 2, 2], 7_i64).unwrap();
        let mut buffer = ctx
            .create_scatter_buffer(&target, StrategyHint::Automatic)
            .unwrap();
        let err = ctx
            .run_episode(&mut buffer, &mut target, 10, |i, handle| {
                let coords = if i == 6 { [0, 2, 0] } else { [1, 1, 1] };
                handle.accumulate(&coords, 1)
            })
            .unwrap_err();
        assert_eq!(
            err.scatter_error(),
            Some(&ScatterError::OutOfBoundsIndex {
                coords: vec![0, 2, 0],
                shape: vec![2, 2, 2],
            })
        );
        assert!(target.as_slice().iter().all(|&v| v == 7));
    }
}

#[test]
fn empty_episode_is_identity() {
    for ctx in all_contexts() {
        let mut target = AccumulationTarget::from_elem(&[3, 5], 2.5_f32).unwrap();
        let before = target.clone();
        let mut buffer = ctx
            .create_scatter_buffer(&target, StrategyHint::Automatic)
            .unwrap();
        ctx.run_episode(&mut buffer, &mut target, 0, |_, _| unreachable!())
            .unwrap();
        assert_eq!(target.as_slice(), before.as_slice());

        // a manual reset followed by contribute does the same
        buffer.reset();
        buffer.contribute(&mut target).unwrap();
        assert_eq!(target.as_slice(), before.as_slice());
    }
}

#[test]
fn episodes_add_onto_target() {
    let ctx = context("rayon", 3);
    let mut target = ctx.create_target::<u64>(&[4]).unwrap();
    let mut buffer = ctx
        .create_scatter_buffer(&target, StrategyHint::Duplicated)
        .unwrap();
    for _ in 0..3 {
        ctx.run_episode(&mut buffer, &mut target, 40, |i, handle| {
            handle.accumulate(&[i % 4], 1)
        })
        .unwrap();
    }
    assert_eq!(target.as_slice(), &[30, 30, 30, 30]);
}

#[test]
fn buffer_from_a_smaller_context() {
    let small = context("rayon", 2);
    let big = context("rayon", 16);
    let mut target = small.create_target::<i64>(&[64]).unwrap();
    for hint in [StrategyHint::Duplicated, StrategyHint::Automatic] {
        let small_buffer = ContextBuilder::new()
            .backend("threads")
            .n_threads(2)
            .favor_duplication(true)
            .build()
            .unwrap()
            .create_scatter_buffer(&target, hint)
            .unwrap();
        for mut buffer in [
            small.create_scatter_buffer(&target, StrategyHint::Duplicated).unwrap(),
            small_buffer,
        ] {
            assert_eq!(buffer.n_slots(), 2);
            // the outcome must not depend on how the threads interleave
            for _ in 0..20 {
                let err = big
                    .run_episode(&mut buffer, &mut target, 20000, |i, handle| {
                        handle.accumulate(&[i % 64], 1)
                    })
                    .unwrap_err();
                assert_eq!(
                    err.scatter_error(),
                    Some(&ScatterError::TooManyWorkers {
                        concurrency: 16,
                        n_slots: 2,
                    })
                );
            }
            assert_eq!(target.total(), 0);

            // the buffer still works with the context that it was made for
            small
                .run_episode(&mut buffer, &mut target, 640, |i, handle| {
                    handle.accumulate(&[i % 64], 1)
                })
                .unwrap();
            assert_eq!(target.get(&[5]).unwrap(), 10);
            target.fill(0);
        }
    }

    // a serial buffer can't be driven by a multi-threaded context
    let mut serial = context("serial", 1)
        .create_scatter_buffer(&target, StrategyHint::Automatic)
        .unwrap();
    assert_eq!(serial.strategy(), Strategy::Serial);
    let err = big
        .run_episode(&mut serial, &mut target, 10, |i, handle| {
            handle.accumulate(&[i], 1)
        })
        .unwrap_err();
    assert!(matches!(
        err.scatter_error(),
        Some(ScatterError::TooManyWorkers { n_slots: 1, .. })
    ));

    // more slots than workers is fine, and so is the atomic strategy
    for mut buffer in [
        big.create_scatter_buffer(&target, StrategyHint::Duplicated).unwrap(),
        big.create_scatter_buffer(&target, StrategyHint::Atomic).unwrap(),
    ] {
        target.fill(0);
        small
            .run_episode(&mut buffer, &mut target, 640, |i, handle| {
                handle.accumulate(&[i % 64], 1)
            })
            .unwrap();
        assert_eq!(target.total(), 640);
    }
}

#[test]
fn manual_episode_with_executor() {
    use scatterview::{Executor, ThreadExecutor};
    use std::num::{NonZeroU32, NonZeroUsize};

    let executor = ThreadExecutor::new(NonZeroU32::new(4).unwrap());
    let mut target = AccumulationTarget::<i32>::new(&[8]).unwrap();
    let strategy =
        scatterview::select_strategy::<i32>(StrategyHint::Duplicated, &executor.backend_props())
            .unwrap();
    let mut buffer = ScatterBuffer::new(&target, strategy).unwrap();
    buffer.check_backend(&executor.backend_props()).unwrap();
    let wide = ThreadExecutor::new(NonZeroU32::new(8).unwrap());
    assert!(buffer.check_backend(&wide.backend_props()).is_err());

    buffer.reset();
    let shared = &buffer;
    executor
        .submit(800, |i, member| {
            let mut handle = shared.access(member)?;
            handle.accumulate(&[i % 8], 1)
        })
        .unwrap();
    buffer
        .contribute_with(&mut target, &executor, NonZeroUsize::new(3).unwrap())
        .unwrap();
    assert_eq!(target.as_slice(), &[100; 8]);
}

#[test]
fn discipline_errors() {
    // access/contribute before reset
    let mut target = AccumulationTarget::<i32>::new(&[2]).unwrap();
    let mut buffer = ScatterBuffer::new(&target, Strategy::Atomic).unwrap();
    assert!(matches!(
        buffer.access(&ThreadMember::new(0)),
        Err(ScatterError::UninitializedBuffer)
    ));
    assert_eq!(
        buffer.contribute(&mut target),
        Err(ScatterError::UninitializedBuffer)
    );

    // double contribution
    buffer.reset();
    buffer.contribute(&mut target).unwrap();
    assert_eq!(
        buffer.contribute(&mut target),
        Err(ScatterError::DoubleContribution)
    );

    // mismatched target
    let mut other = AccumulationTarget::<i32>::new(&[3]).unwrap();
    buffer.reset();
    assert!(matches!(
        buffer.contribute(&mut other),
        Err(ScatterError::ShapeMismatch { .. })
    ));

    // serial strategy with more than 1 worker
    let ctx = context("threads", 2);
    let err = ctx
        .create_scatter_buffer(&target, StrategyHint::Serial)
        .err()
        .unwrap();
    assert!(matches!(
        err.scatter_error(),
        Some(ScatterError::UnsupportedStrategy {
            strategy: "serial",
            ..
        })
    ));

    // atomic strategy with an element type that has no atomic add
    let complex_target = ctx
        .create_target::<scatterview::Complex<f64>>(&[2])
        .unwrap();
    let err = ctx
        .create_scatter_buffer(&complex_target, StrategyHint::Atomic)
        .err()
        .unwrap();
    assert!(matches!(
        err.scatter_error(),
        Some(ScatterError::UnsupportedStrategy {
            strategy: "atomic",
            ..
        })
    ));

    // two simultaneously live handles on a serial buffer
    let mut serial = ScatterBuffer::new(&target, Strategy::Serial).unwrap();
    serial.reset();
    let _first = serial.access(&ThreadMember::new(0)).unwrap();
    assert!(matches!(
        serial.access(&ThreadMember::new(0)),
        Err(ScatterError::SlotsExhausted { n_slots: 1 })
    ));
}
