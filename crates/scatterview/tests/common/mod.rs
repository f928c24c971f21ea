// the reason this is named mod.rs has to do with some complexities of how
// testing is handled
//
// we are following the advice of the rust book
// https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests

#![allow(dead_code)]

use rand::distr::{Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;
use scatterview::{ContextBuilder, ExecutionContext};

// based on numpy!
// https://numpy.org/doc/stable/reference/generated/numpy.isclose.html
pub fn isclose(actual: f64, ref_val: f64, rtol: f64, atol: f64) -> bool {
    let actual_nan = actual.is_nan();
    let ref_nan = ref_val.is_nan();
    if actual_nan || ref_nan {
        actual_nan && ref_nan
    } else {
        (actual - ref_val).abs() <= (atol + rtol * ref_val.abs())
    }
}

/// install a subscriber so that RUST_LOG controls what the tests print
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A list of contributions (a flattened cell coordinate for every
/// contribution & an integer-valued weight)
pub struct Contributions {
    pub extents: Vec<usize>,
    pub coords: Vec<usize>,
    pub values: Vec<i32>,
}

impl Contributions {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn coords(&self, i: usize) -> &[usize] {
        let ndim = self.extents.len();
        &self.coords[i * ndim..(i + 1) * ndim]
    }

    /// the expected grid, computed directly (row-major)
    pub fn reference(&self) -> Vec<i64> {
        let mut out = vec![0_i64; self.extents.iter().product()];
        for i in 0..self.len() {
            let mut offset = 0;
            for (&c, &extent) in self.coords(i).iter().zip(&self.extents) {
                offset = offset * extent + c;
            }
            out[offset] += self.values[i] as i64;
        }
        out
    }
}

/// generate random contributions
pub fn random_contributions(seed: u64, extents: &[usize], n: usize) -> Contributions {
    let mut my_rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    // we intentionally use integers so that floating point sums are
    // associative
    let value_dist = Uniform::try_from(-5..10).unwrap();

    let mut coords = Vec::with_capacity(n * extents.len());
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        for &extent in extents {
            let dist = Uniform::try_from(0..extent).unwrap();
            coords.push(dist.sample(&mut my_rng));
        }
        values.push(value_dist.sample(&mut my_rng));
    }
    Contributions {
        extents: extents.to_vec(),
        coords,
        values,
    }
}

/// every backend configuration that we want to check results for
pub fn all_contexts() -> Vec<ExecutionContext> {
    let mut out = vec![ContextBuilder::new().backend("serial").build().unwrap()];
    for n_threads in [1, 4, 7] {
        for backend in ["threads", "rayon"] {
            out.push(
                ContextBuilder::new()
                    .backend(backend)
                    .n_threads(n_threads)
                    .reduce_block_len(5)
                    .build()
                    .unwrap(),
            );
        }
    }
    out
}
