use ren_abi::{RenContextHandle, RenEngineHandle};
use ren_values::{Kind, LoadError, ValueError};
use thiserror::Error;

/// Why one native invocation failed.
///
/// Raised by the binding through [`crate::native::raise`] and picked up by
/// the call site when the shim answers `RenResult::Failure`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NativeFailure {
    #[error("argument {index} expected {expected}, found {found}")]
    TypeMismatch {
        index: usize,
        expected: String,
        found: Kind,
    },

    #[error("argument {index}: {error}")]
    BadArgument { index: usize, error: ValueError },

    #[error("expected {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },

    #[error("{0}")]
    Callable(String),

    #[error("native panicked: {0}")]
    Panicked(String),

    #[error("shim was called before it captured an identity")]
    UnboundShim,

    #[error("engine {0:?} no longer exists")]
    EngineGone(RenEngineHandle),

    #[error("no dispatch entry for shim id {0}")]
    UnknownShimId(u32),
}

impl NativeFailure {
    /// Attach the argument position to a decode error.
    pub fn argument(index: usize, error: ValueError) -> Self {
        match error {
            ValueError::TypeMismatch { expected, found } => NativeFailure::TypeMismatch {
                index,
                expected,
                found,
            },
            other => NativeFailure::BadArgument { index, error: other },
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{0} has no value")]
    NoValue(String),

    #[error("{function} is missing its argument {expected}")]
    NotEnoughArguments { function: String, expected: String },

    #[error("{function} failed: {failure}")]
    Native {
        function: String,
        failure: NativeFailure,
    },

    #[error("not a function of this engine: {0}")]
    InvalidFunction(String),

    #[error("invalid context {0:?}")]
    InvalidContext(RenContextHandle),

    #[error("evaluation nested deeper than {0}")]
    DepthExceeded(usize),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("no engine available")]
    NoEngine,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}
