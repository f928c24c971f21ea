//! Choosing how concurrent contributions to a single cell are resolved.
//!
//! There are 3 strategies:
//! - **Atomic**: every contribution is an atomic add on a shared copy of the
//!   grid. This needs no extra memory, but contended cells get slow (and
//!   floating point adds are emulated with compare-exchange loops).
//! - **Duplicated**: every concurrent worker gets a private copy (a
//!   "duplicate slot") of the grid and uses ordinary adds. The copies are
//!   summed together at the end. This costs `D` copies of the grid.
//! - **Serial**: ordinary adds on a single copy. Only valid when there is a
//!   single worker.

use core::num::NonZeroUsize;

use crate::element::{AtomicSupport, Element};
use crate::error::ScatterError;
use crate::parallel::BackendProps;

/// The strategy requested by a caller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrategyHint {
    /// let [`select_strategy`] pick, based on the element type & backend
    #[default]
    Automatic,
    Atomic,
    Duplicated,
    Serial,
}

impl StrategyHint {
    /// The names accepted by [`StrategyHint::from_name`]
    pub const NAMES: [&'static str; 4] = ["auto", "atomic", "duplicated", "serial"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "auto" | "automatic" => Some(StrategyHint::Automatic),
            "atomic" => Some(StrategyHint::Atomic),
            "duplicated" => Some(StrategyHint::Duplicated),
            "serial" => Some(StrategyHint::Serial),
            _ => None,
        }
    }
}

/// A resolved strategy (i.e. one that a ScatterBuffer can be built with)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Atomic,
    Duplicated { n_duplicates: NonZeroUsize },
    Serial,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Atomic => "atomic",
            Strategy::Duplicated { .. } => "duplicated",
            Strategy::Serial => "serial",
        }
    }

    /// Returns an error if the strategy can't be used for the element type
    pub fn check_element<T: Element>(&self) -> Result<(), ScatterError> {
        match (self, T::ATOMIC_SUPPORT) {
            (Strategy::Atomic, AtomicSupport::Unsupported) => {
                Err(ScatterError::UnsupportedStrategy {
                    strategy: "atomic",
                    reason: "the element type has no atomic add",
                })
            }
            _ => Ok(()),
        }
    }
}

/// Pick the strategy to use for element type `T` on a backend described by
/// `backend`.
///
/// This is a pure function of its inputs. The automatic choice:
/// 1. uses the serial strategy when the backend only has 1 worker
/// 2. uses the atomic strategy when `T` has a native (hardware) atomic add
///    and the backend doesn't favor duplication (vector processors always
///    favor duplication)
/// 3. otherwise uses the duplicated strategy with 1 slot per worker
pub fn select_strategy<T: Element>(
    hint: StrategyHint,
    backend: &BackendProps,
) -> Result<Strategy, ScatterError> {
    let concurrency = backend.concurrency;
    let strategy = match hint {
        StrategyHint::Atomic => Strategy::Atomic,
        StrategyHint::Duplicated => Strategy::Duplicated {
            n_duplicates: concurrency,
        },
        StrategyHint::Serial => {
            if concurrency.get() > 1 {
                return Err(ScatterError::UnsupportedStrategy {
                    strategy: "serial",
                    reason: "the backend runs more than 1 worker at a time",
                });
            }
            Strategy::Serial
        }
        StrategyHint::Automatic => {
            let cheap_duplicates = backend.favors_duplication || backend.is_vector_processor;
            if concurrency.get() == 1 {
                Strategy::Serial
            } else if T::ATOMIC_SUPPORT == AtomicSupport::Native && !cheap_duplicates {
                Strategy::Atomic
            } else {
                Strategy::Duplicated {
                    n_duplicates: concurrency,
                }
            }
        }
    };
    strategy.check_element::<T>()?;
    Ok(strategy)
}
