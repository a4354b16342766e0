//! Reference Ren runtime.
//!
//! Implements the runtime side of the native ABI: engines addressed by
//! handle, a cell heap for series, native records created by
//! [`Engine::finish_init`], a call site that builds argument stacks and calls
//! shims, and a small prefix evaluator so natives can be exercised from
//! source text.

mod config;
mod engine;
mod error;
mod eval;
mod heap;
pub mod native;
pub mod spec;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::{clear_finder, run_finder, set_finder, Engine, NativeRecord};
pub use error::{EngineError, EvalError, NativeFailure};
pub use eval::{evaluate, Loadable};
pub use spec::{Param, PassingMode, SpecBuilder, SpecError, Specification};

pub use ren_abi::{RenContextHandle, RenEngineHandle};
pub use ren_values::{Function, Kind, Value};
