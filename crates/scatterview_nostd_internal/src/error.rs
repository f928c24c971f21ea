// Error kinds produced by the core machinery.
//
// The public crate wraps these inside its own `Error` type. We avoid the
// `&'static str` errors that used to be common in this crate because callers
// (and the tests) really need to distinguish between the kinds, e.g. a
// discipline error is handled very differently from an out-of-bounds index.

use alloc::vec::Vec;
use core::fmt;

/// The ways that an operation on a grid or a scatter buffer can fail.
///
/// None of these errors are transient. Every operation is deterministic given
/// its inputs, so an error always points to misuse (or bad input data).
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScatterError {
    /// The extents of two grids (or of a grid and some input) disagree
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    /// The shape used to construct a grid has no axes, has a zero extent or
    /// has more cells than can be addressed
    InvalidShape { extents: Vec<usize> },
    /// A coordinate lies outside of the grid (or has the wrong number of
    /// axes)
    OutOfBoundsIndex {
        coords: Vec<usize>,
        shape: Vec<usize>,
    },
    /// `access()` (or `contribute()`) was called before `reset()` in the
    /// current episode
    UninitializedBuffer,
    /// `contribute()` was called a second time without an intervening
    /// `reset()`
    DoubleContribution,
    /// The requested strategy can't be used with the element type or the
    /// backend
    UnsupportedStrategy {
        strategy: &'static str,
        reason: &'static str,
    },
    /// Every slot of the buffer is held by a live [`crate::AccessHandle`]
    SlotsExhausted { n_slots: usize },
    /// The executor may run more workers at once than the buffer has slots
    TooManyWorkers { concurrency: usize, n_slots: usize },
}

impl fmt::Display for ScatterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScatterError::ShapeMismatch { expected, actual } => write!(
                f,
                "shape mismatch: expected extents {expected:?}, got {actual:?}"
            ),
            ScatterError::InvalidShape { extents } => write!(
                f,
                "invalid grid extents {extents:?}: a grid needs at least 1 axis, \
                 every extent must be positive and the number of cells must fit \
                 in an isize"
            ),
            ScatterError::OutOfBoundsIndex { coords, shape } => write!(
                f,
                "the coordinates {coords:?} lie outside of a grid with extents {shape:?}"
            ),
            ScatterError::UninitializedBuffer => write!(
                f,
                "the scatter buffer must be reset before it is accessed in an episode"
            ),
            ScatterError::DoubleContribution => write!(
                f,
                "the scatter buffer was already contributed during this episode \
                 (call reset before contributing again)"
            ),
            ScatterError::UnsupportedStrategy { strategy, reason } => {
                write!(f, "the {strategy} strategy can't be used: {reason}")
            }
            ScatterError::SlotsExhausted { n_slots } => write!(
                f,
                "all {n_slots} slot(s) of the scatter buffer are held by live \
                 access handles"
            ),
            ScatterError::TooManyWorkers {
                concurrency,
                n_slots,
            } => write!(
                f,
                "the executor runs up to {concurrency} workers at once, but the \
                 scatter buffer only has {n_slots} slot(s)"
            ),
        }
    }
}

impl core::error::Error for ScatterError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn display_mentions_the_details() {
        let err = ScatterError::OutOfBoundsIndex {
            coords: vec![3, 0],
            shape: vec![2, 2],
        };
        let msg = err.to_string();
        assert!(msg.contains("[3, 0]"));
        assert!(msg.contains("[2, 2]"));

        let err = ScatterError::SlotsExhausted { n_slots: 4 };
        assert!(err.to_string().contains("all 4 slot(s)"));

        let err = ScatterError::TooManyWorkers {
            concurrency: 16,
            n_slots: 2,
        };
        assert!(err.to_string().contains("up to 16 workers"));
    }
}
