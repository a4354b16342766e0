//! Native extension functions for embedded Ren runtimes.
//!
//! The runtime calls natives through a flat cell stack and a bare C function
//! pointer. This crate lets a host register ordinary typed Rust callables
//! instead: arguments are decoded from the stack according to the callable's
//! parameter types, the result is encoded into the return slot, and each
//! callable is reached through its own trampoline and a per-signature
//! dispatch table.
//!
//! # Example
//!
//! ```ignore
//! use ren_bind::{make_function, Engine, EngineConfig, Loadable};
//!
//! let engine = Engine::create(EngineConfig::default())?;
//! let add = make_function!(&engine, "a [integer!] b [integer!]", |a: i64, b: i64| a + b)?;
//! engine.set_word(engine.user_context(), "add", add.into())?;
//! let seven = engine.evaluate(&[Loadable::from("add 3 4")])?;
//! ```
//!
//! # Trampolines
//!
//! Every registration needs a distinct trampoline from [`ren_shim!`];
//! [`make_function!`] supplies one per expansion. Reusing a trampoline for a
//! second registration is rejected with [`BindError::Configuration`].

mod error;
mod function;
mod invoke;
mod natives;

pub mod identity;
pub mod signature;
pub mod spec;
pub mod table;

pub use error::BindError;
pub use function::{
    make_function, make_function_in, make_function_spec, make_function_with, register,
    Registration,
};
pub use identity::ShimId;
pub use natives::{bind_natives, native_definitions, NativeDefinition};
pub use signature::{FromStack, HostFunction, HostParam, IntoReturn};
pub use spec::{Param, PassingMode, SpecBuilder, SpecError, Specification, SpecificationExt};
pub use table::{SignatureTable, TableEntry};

pub use ren_abi as abi;
pub use ren_engine::{
    native, Engine, EngineConfig, EvalError, Loadable, NativeFailure, RenContextHandle,
    RenEngineHandle,
};
pub use ren_values::{Function, Kind, Unset, Value, Word};

#[doc(hidden)]
pub use inventory;
