use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use ren_abi::{stack_return, RenCell, RenResult};
use ren_engine::{native, NativeFailure};
use ren_values::{CellHeap, IntoCell};

use crate::identity::ShimId;
use crate::signature::FromStack;
use crate::table::SignatureTable;

/// Run entry `id` of `table` against `stack`.
///
/// On failure the return slot is left as it was and the detail is raised on
/// the native-failure channel. Panics do not cross the shim.
///
/// # Safety
/// `stack` must be a live argument stack with `Args::ARITY` arguments.
pub(crate) unsafe fn invoke<Args, R>(
    table: &SignatureTable<Args, R>,
    id: ShimId,
    stack: *mut RenCell,
) -> RenResult
where
    Args: FromStack + 'static,
    R: IntoCell + 'static,
{
    match catch_unwind(AssertUnwindSafe(|| run(table, id, stack))) {
        Ok(Ok(())) => RenResult::Success,
        Ok(Err(failure)) => {
            native::raise(failure);
            RenResult::Failure
        }
        Err(payload) => {
            native::raise(NativeFailure::Panicked(panic_message(payload.as_ref())));
            RenResult::Failure
        }
    }
}

unsafe fn run<Args, R>(
    table: &SignatureTable<Args, R>,
    id: ShimId,
    stack: *mut RenCell,
) -> Result<(), NativeFailure>
where
    Args: FromStack + 'static,
    R: IntoCell + 'static,
{
    let entry = table.lookup(id).ok_or(NativeFailure::UnknownShimId(id.0))?;
    let engine = entry
        .live_engine()
        .ok_or(NativeFailure::EngineGone(entry.engine))?;
    let heap: &dyn CellHeap = &*engine;

    let args = Args::from_stack(stack, heap)?;
    let result = (entry.fun)(args)?;
    *stack_return(stack) = result.into_cell(heap);
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
