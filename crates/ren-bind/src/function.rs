//! Registration façade.
//!
//! Turns a typed host callable plus a trampoline into a runtime function:
//! deduce the signature, validate the specification, bind the trampoline to
//! a fresh slot of the signature's dispatch table and let the engine create
//! the native record.

use std::sync::Arc;

use log::debug;
use ren_abi::RenShimPointer;
use ren_engine::{run_finder, Engine};
use ren_values::Function;

use crate::identity::{CaptureWindow, Dispatch, ShimId};
use crate::signature::{host_params, signature_name, HostFunction};
use crate::spec::{Specification, SpecificationExt};
use crate::table::SignatureTable;
use crate::BindError;

/// Outcome of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub function: Function,
    /// Slot in the signature's dispatch table.
    pub id: ShimId,
}

/// Register `fun` with `engine`, returning the table id alongside the function.
pub fn register<M, F>(
    engine: &Engine,
    spec: &Specification,
    shim: RenShimPointer,
    fun: F,
) -> Result<Registration, BindError>
where
    F: HostFunction<M>,
{
    spec.check(&host_params(&fun))?;

    let table = SignatureTable::<F::Args, F::Output>::shared();
    let dispatcher: Arc<dyn Dispatch> = table.clone();

    let id = {
        let window = CaptureWindow::open(dispatcher, || table.next_id())?;
        let expected = window.id();
        window.capture(shim)?;
        let id = table.insert(engine, Arc::new(move |args: F::Args| fun.invoke(args)));
        if id != expected {
            return Err(BindError::ConcurrencyViolation(format!(
                "table handed out id {id} while shim captured id {expected}"
            )));
        }
        id
    };

    debug!(
        "registered native shim id={id} signature={} engine={}",
        signature_name::<M, F>(),
        engine.handle().0
    );
    let function = engine.finish_init(spec.clone(), shim);
    Ok(Registration { function, id })
}

/// Engine and pre-built specification given explicitly.
pub fn make_function_with<M, F>(
    engine: &Engine,
    spec: &Specification,
    shim: RenShimPointer,
    fun: F,
) -> Result<Function, BindError>
where
    F: HostFunction<M>,
{
    register(engine, spec, shim, fun).map(|r| r.function)
}

/// Explicit engine, textual specification.
pub fn make_function_in<M, F>(
    engine: &Engine,
    spec: &str,
    shim: RenShimPointer,
    fun: F,
) -> Result<Function, BindError>
where
    F: HostFunction<M>,
{
    let spec = Specification::parse(spec)?;
    make_function_with(engine, &spec, shim, fun)
}

/// Engine from the engine finder, pre-built specification.
pub fn make_function_spec<M, F>(
    spec: &Specification,
    shim: RenShimPointer,
    fun: F,
) -> Result<Function, BindError>
where
    F: HostFunction<M>,
{
    let engine = run_finder().ok_or(BindError::NoEngine)?;
    make_function_with(&engine, spec, shim, fun)
}

/// Engine from the engine finder, textual specification.
pub fn make_function<M, F>(spec: &str, shim: RenShimPointer, fun: F) -> Result<Function, BindError>
where
    F: HostFunction<M>,
{
    let spec = Specification::parse(spec)?;
    make_function_spec(&spec, shim, fun)
}

/// `make_function` with a fresh trampoline per expansion.
///
/// ```ignore
/// let add = make_function!(&engine, "a [integer!] b [integer!]", |a: i64, b: i64| a + b)?;
/// let hello = make_function!("", || "hello")?;
/// ```
#[macro_export]
macro_rules! make_function {
    ($engine:expr, $spec:expr, $fun:expr $(,)?) => {
        $crate::make_function_in($engine, $spec, $crate::ren_shim!(), $fun)
    };
    ($spec:expr, $fun:expr $(,)?) => {
        $crate::make_function($spec, $crate::ren_shim!(), $fun)
    };
}
