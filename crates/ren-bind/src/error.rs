use ren_abi::RenContextHandle;
use ren_engine::SpecError;
use thiserror::Error;

/// Registration errors. Invocation failures are reported through
/// [`ren_engine::NativeFailure`] instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("concurrency violation: {0}")]
    ConcurrencyViolation(String),

    #[error("invalid specification: {0}")]
    Spec(#[from] SpecError),

    #[error("no engine available for registration")]
    NoEngine,

    #[error("invalid context {0:?}")]
    InvalidContext(RenContextHandle),
}
