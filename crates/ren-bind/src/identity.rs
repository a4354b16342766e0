//! Shim identity capture.
//!
//! The runtime calls natives through a bare `extern "C" fn(*mut RenCell)`,
//! so a trampoline has no closure state to tell it which registration it
//! belongs to. Each trampoline instead owns a [`ShimSlot`] that is filled
//! exactly once: the registration publishes `(id, dispatcher)` in a pending
//! slot, calls the trampoline with a null stack, and the trampoline copies
//! the pending pair into its own slot. Later calls read only their own slot.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, MutexGuard};
use ren_abi::{RenCell, RenResult, RenShimPointer};
use ren_engine::{native, NativeFailure};

use crate::BindError;

/// Index of a registration within its signature table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShimId(pub u32);

impl fmt::Display for ShimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something that can run a registration given its id and a call stack.
pub trait Dispatch: Send + Sync {
    /// # Safety
    /// `stack` must be a live argument stack laid out for this registration.
    unsafe fn dispatch(&self, id: ShimId, stack: *mut RenCell) -> RenResult;
}

type Binding = (ShimId, Arc<dyn Dispatch>);

// Serialises capture windows.
static WINDOW: Mutex<()> = Mutex::new(());
// Read by a trampoline answering the capture request.
static PENDING: Mutex<Option<Binding>> = Mutex::new(None);

/// Per-trampoline identity, written once during capture.
pub struct ShimSlot {
    bound: OnceCell<Binding>,
}

impl ShimSlot {
    pub const fn new() -> Self {
        ShimSlot {
            bound: OnceCell::new(),
        }
    }

    pub fn id(&self) -> Option<ShimId> {
        self.bound.get().map(|(id, _)| *id)
    }

    /// Trampoline body. A null `stack` is the capture request.
    ///
    /// # Safety
    /// A non-null `stack` must be a live argument stack from the runtime.
    #[doc(hidden)]
    pub unsafe fn enter(&self, stack: *mut RenCell) -> RenResult {
        if stack.is_null() {
            return self.capture();
        }
        match self.bound.get() {
            Some((id, dispatcher)) => dispatcher.dispatch(*id, stack),
            None => {
                native::raise(NativeFailure::UnboundShim);
                RenResult::Failure
            }
        }
    }

    fn capture(&self) -> RenResult {
        if self.bound.get().is_some() {
            return RenResult::ShimAlreadyBound;
        }
        let Some(pending) = PENDING.lock().clone() else {
            native::raise(NativeFailure::UnboundShim);
            return RenResult::Failure;
        };
        match self.bound.set(pending) {
            Ok(()) => RenResult::ShimInitialized,
            Err(_) => RenResult::ShimAlreadyBound,
        }
    }
}

impl Default for ShimSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// An open capture window. Only one exists at a time in the process; the
/// pending slot is cleared when it is dropped.
pub(crate) struct CaptureWindow {
    id: ShimId,
    _guard: MutexGuard<'static, ()>,
}

impl CaptureWindow {
    /// Open the window and publish `dispatcher` under the id `next_id`
    /// reports. `next_id` runs with the window held, so an id read there
    /// stays valid until the window closes.
    pub(crate) fn open(
        dispatcher: Arc<dyn Dispatch>,
        next_id: impl FnOnce() -> ShimId,
    ) -> Result<Self, BindError> {
        let guard = WINDOW.lock();
        let id = next_id();
        let mut pending = PENDING.lock();
        if let Some((held, _)) = pending.as_ref() {
            return Err(BindError::ConcurrencyViolation(format!(
                "capture window for shim id {held} is still pending while opening id {id}"
            )));
        }
        *pending = Some((id, dispatcher));
        Ok(CaptureWindow { id, _guard: guard })
    }

    pub(crate) fn id(&self) -> ShimId {
        self.id
    }

    /// Make `shim` adopt the pending identity.
    pub(crate) fn capture(&self, shim: RenShimPointer) -> Result<(), BindError> {
        match shim(ptr::null_mut()) {
            RenResult::ShimInitialized => Ok(()),
            RenResult::ShimAlreadyBound => Err(BindError::Configuration(format!(
                "shim already belongs to another registration (wanted id {}); \
                 each registration needs its own ren_shim!()",
                self.id
            ))),
            other => Err(BindError::Configuration(format!(
                "shim answered {other:?} to the capture request"
            ))),
        }
    }
}

impl Drop for CaptureWindow {
    fn drop(&mut self) {
        *PENDING.lock() = None;
    }
}

/// Expands to a fresh trampoline, as a [`RenShimPointer`].
///
/// Every expansion is a distinct function with its own identity slot, so use
/// one expansion per registration.
#[macro_export]
macro_rules! ren_shim {
    () => {{
        extern "C" fn __ren_shim(stack: *mut $crate::abi::RenCell) -> $crate::abi::RenResult {
            static SLOT: $crate::identity::ShimSlot = $crate::identity::ShimSlot::new();
            unsafe { SLOT.enter(stack) }
        }
        __ren_shim as $crate::abi::RenShimPointer
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    // Windows are process-wide; keep these tests from overlapping.
    static SERIAL: Mutex<()> = Mutex::new(());

    struct Recorder(AtomicU32);

    impl Dispatch for Recorder {
        unsafe fn dispatch(&self, id: ShimId, _stack: *mut RenCell) -> RenResult {
            self.0.store(id.0, Ordering::SeqCst);
            RenResult::Success
        }
    }

    #[test]
    fn capture_binds_once() {
        let _serial = SERIAL.lock();
        let shim = crate::ren_shim!();
        let recorder = Arc::new(Recorder(AtomicU32::new(u32::MAX)));

        {
            let window = CaptureWindow::open(recorder.clone(), || ShimId(5)).unwrap();
            window.capture(shim).unwrap();
        }
        assert!(PENDING.lock().is_none());

        let mut cells = [RenCell::UNSET; 2];
        assert_eq!(shim(cells.as_mut_ptr()), RenResult::Success);
        assert_eq!(recorder.0.load(Ordering::SeqCst), 5);

        // A second registration with the same trampoline is refused
        let window = CaptureWindow::open(recorder.clone(), || ShimId(6)).unwrap();
        assert!(matches!(window.capture(shim), Err(BindError::Configuration(_))));
        drop(window);
        assert_eq!(shim(ptr::null_mut()), RenResult::ShimAlreadyBound);
    }

    #[test]
    fn unbound_shim_fails_calls() {
        let _serial = SERIAL.lock();
        let shim = crate::ren_shim!();
        let mut cells = [RenCell::UNSET; 2];
        assert_eq!(shim(cells.as_mut_ptr()), RenResult::Failure);
        assert_eq!(native::take_failure(), Some(NativeFailure::UnboundShim));
        // Outside a window there is nothing to capture
        assert_eq!(shim(ptr::null_mut()), RenResult::Failure);
        assert_eq!(native::take_failure(), Some(NativeFailure::UnboundShim));
    }

    #[test]
    fn stale_pending_slot_is_a_violation() {
        let _serial = SERIAL.lock();
        let recorder: Arc<dyn Dispatch> = Arc::new(Recorder(AtomicU32::new(0)));
        *PENDING.lock() = Some((ShimId(1), recorder.clone()));
        let err = CaptureWindow::open(recorder, || ShimId(2)).err();
        assert!(matches!(err, Some(BindError::ConcurrencyViolation(_))));
        *PENDING.lock() = None;
    }
}
