// We follow the same approach to errors as the rest of this family of crates:
// the core crate (`scatterview_nostd_internal`) defines its own error type
// and the public crate wraps it in an opaque `Error` type.
//
// The core error kinds are exposed through [`Error::scatter_error`] because
// callers genuinely need to tell them apart (an out-of-bounds coordinate is
// bad input data, while an uninitialized buffer is a bug in the caller).

use scatterview_nostd_internal::ScatterError;

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// The underlying internal error type
#[non_exhaustive]
#[derive(Clone, Debug)]
enum ErrorKind {
    /// An error that occurs when an unknown backend name is specified
    BackendName(NameError),
    /// An error that occurs when a floating point parameter isn't a positive,
    /// finite number
    FloatRange(FloatRangeError),
    /// An error that occurs when an integer lies outside of the acceptable
    /// range of values
    IntegerRange(IntegerRangeError),
    /// An error reported by the core scatter machinery
    Scatter(ScatterError),
    /// An error that occurs when an unknown strategy name is specified
    StrategyName(NameError),
    /// An error that occurs while building a thread pool
    ThreadPool(ThreadPoolError),
}

// define constructor methods for Error
impl Error {
    /// produce an error indicating that an unknown backend name was specified
    pub(crate) fn backend_name(actual: String, choices: &[&'static str]) -> Self {
        Error {
            kind: ErrorKind::BackendName(NameError {
                what: "backend",
                actual,
                choices: choices.to_vec(),
            }),
        }
    }

    /// produce an error indicating that a floating point parameter must be
    /// positive & finite
    pub(crate) fn float_range(description: &'static str, actual: f64) -> Self {
        Error {
            kind: ErrorKind::FloatRange(FloatRangeError {
                description,
                actual,
            }),
        }
    }

    /// produce an error indicating that an integer lies outside the acceptable
    /// range of values
    pub(crate) fn integer_range(
        description: &'static str,
        actual: i64,
        min_val: i64,
        max_val: i64,
    ) -> Self {
        Error {
            kind: ErrorKind::IntegerRange(IntegerRangeError {
                description,
                actual,
                min_val,
                max_val,
            }),
        }
    }

    /// produce an error indicating that an unknown strategy name was specified
    pub(crate) fn strategy_name(actual: String, choices: &[&'static str]) -> Self {
        Error {
            kind: ErrorKind::StrategyName(NameError {
                what: "strategy",
                actual,
                choices: choices.to_vec(),
            }),
        }
    }

    /// wraps the message from a failure to build a thread pool
    pub(crate) fn thread_pool(message: String) -> Self {
        Error {
            kind: ErrorKind::ThreadPool(ThreadPoolError(message)),
        }
    }

    /// Returns the error reported by the core scatter machinery, if that's
    /// what this error is.
    pub fn scatter_error(&self) -> Option<&ScatterError> {
        match &self.kind {
            ErrorKind::Scatter(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ScatterError> for Error {
    fn from(err: ScatterError) -> Self {
        Error {
            kind: ErrorKind::Scatter(err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Scatter(err) => Some(err),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.kind.fmt(f)
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            ErrorKind::BackendName(ref err) => err.fmt(f),
            ErrorKind::FloatRange(ref err) => err.fmt(f),
            ErrorKind::IntegerRange(ref err) => err.fmt(f),
            ErrorKind::Scatter(ref err) => err.fmt(f),
            ErrorKind::StrategyName(ref err) => err.fmt(f),
            ErrorKind::ThreadPool(ref err) => err.fmt(f),
        }
    }
}

/// An error that occurs when an unknown name is specified
#[derive(Clone, Debug)]
struct NameError {
    what: &'static str,
    actual: String,
    choices: Vec<&'static str>,
}

impl core::fmt::Display for NameError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} is not a {} name. Choices include: {:?}",
            self.actual, self.what, self.choices
        )
    }
}

/// A floating point parameter that isn't a positive, finite number
#[derive(Clone, Debug)]
struct FloatRangeError {
    description: &'static str,
    actual: f64,
}

impl core::fmt::Display for FloatRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} has a value of {}. It must be positive and finite",
            self.description, self.actual
        )
    }
}

/// An error that occurs when an integer lies outside of the acceptable
/// range of values
#[derive(Clone, Debug)]
struct IntegerRangeError {
    description: &'static str,
    actual: i64,
    min_val: i64,
    max_val: i64,
}

impl core::fmt::Display for IntegerRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} has a value of {}. The value should be no less than {} and \
             not exceed {}",
            self.description, self.actual, self.min_val, self.max_val
        )
    }
}

/// wraps the message from rayon's `ThreadPoolBuildError`
#[derive(Clone, Debug)]
struct ThreadPoolError(String);

impl core::fmt::Display for ThreadPoolError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unable to build the thread pool: {}", self.0)
    }
}
